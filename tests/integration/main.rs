//! Integration tests for the pool allocation engine.

mod helpers;

mod catalog_test;
mod factory_test;
mod postgres_test;
mod set_pool_test;
mod singleton_pool_test;
mod transaction_test;
