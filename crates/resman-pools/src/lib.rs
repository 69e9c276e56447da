//! # resman-pools
//!
//! The pool allocation engine. Pools hand out typed resources under
//! caller-supplied tags:
//!
//! - [`SetPool`]: a finite inventory created up front; each resource is
//!   either free or claimed.
//! - [`SingletonPool`]: one blueprint resource, copied for every tag that
//!   claims it.
//!
//! Every operation runs inside a store transaction opened by
//! [`with_transaction`], or joins one supplied by the caller through the
//! `_in` variants.

pub mod catalog;
pub mod context;
pub mod pool;
pub mod properties;
pub mod transaction;

pub use catalog::ResourceCatalog;
pub use context::RequestContext;
pub use pool::{Pool, PoolFactory, PoolHandle, ResourceKey, SetPool, SingletonPool};
pub use properties::{RawResourceProps, raw_props};
pub use transaction::with_transaction;
