//! Unit-of-work wrapper around a store transaction.
//!
//! [`with_transaction`] commits when the work succeeds and rolls back on
//! every other exit: an error, a panic inside the work, or cancellation
//! of the request. A panic is re-raised after the rollback completes.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use resman_core::error::AppError;
use resman_core::result::AppResult;
use resman_database::{EntityStore, StoreTransaction};

use crate::context::RequestContext;

enum Outcome<T> {
    Finished(AppResult<T>),
    Panicked(Box<dyn std::any::Any + Send>),
    Cancelled,
}

/// Run `work` inside a new store transaction.
///
/// The closure receives the transaction-scoped store handle and must
/// return a boxed future borrowing it; state it needs from the caller is
/// moved in. Nothing is committed once the request is cancelled.
pub async fn with_transaction<T, F>(
    store: &dyn EntityStore,
    ctx: &RequestContext,
    work: F,
) -> AppResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, AppResult<T>> + Send,
{
    if ctx.is_cancelled() {
        return Err(AppError::cancelled("Request cancelled before the transaction started"));
    }

    let mut tx = store.begin().await?;

    let outcome = {
        let unit = AssertUnwindSafe(work(tx.as_mut())).catch_unwind();
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Outcome::Cancelled,
            result = unit => match result {
                Ok(result) => Outcome::Finished(result),
                Err(payload) => Outcome::Panicked(payload),
            },
        }
    };

    match outcome {
        Outcome::Finished(Ok(value)) => {
            if ctx.is_cancelled() {
                let err = AppError::cancelled("Request cancelled before commit");
                return Err(rollback_with(tx, err).await);
            }
            tx.commit().await?;
            debug!(request_id = %ctx.request_id, "Transaction committed");
            Ok(value)
        }
        Outcome::Finished(Err(err)) => Err(rollback_with(tx, err).await),
        Outcome::Cancelled => {
            let err = AppError::cancelled("Request cancelled during the transaction");
            Err(rollback_with(tx, err).await)
        }
        Outcome::Panicked(payload) => {
            if let Err(e) = tx.rollback().await {
                error!(request_id = %ctx.request_id, error = %e, "Rollback after panic failed");
            }
            std::panic::resume_unwind(payload)
        }
    }
}

/// [`with_transaction`] for work that needs an owned value and context.
///
/// `subject` and a clone of `ctx` are moved into the unit of work, which
/// lets methods on cheaply clonable handles run transactionally.
pub(crate) async fn with_owned_transaction<S, T, F>(
    store: &dyn EntityStore,
    ctx: &RequestContext,
    subject: S,
    work: F,
) -> AppResult<T>
where
    S: Send + 'static,
    T: Send,
    F: for<'t> FnOnce(S, RequestContext, &'t mut dyn StoreTransaction) -> BoxFuture<'t, AppResult<T>>
        + Send,
{
    let owned = ctx.clone();
    with_transaction(store, ctx, move |tx| work(subject, owned, tx)).await
}

/// Roll back and return `err`, attaching a rollback failure as its secondary cause.
async fn rollback_with(tx: Box<dyn StoreTransaction>, err: AppError) -> AppError {
    match tx.rollback().await {
        Ok(()) => err,
        Err(rollback) => {
            warn!(error = %rollback, "Transaction rollback failed");
            err.with_secondary(rollback)
        }
    }
}
