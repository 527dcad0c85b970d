//! Atomic unit-of-work execution

use futures::future::BoxFuture;
use monicu_core::{Store, UnitOfWork};

use super::error::{SyncError, SyncResult};
use super::shutdown::Shutdown;

/// Run `work` inside one unit of work
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`, and
/// abandons the unit of work (dropping it rolls back) when shutdown fires
/// first. The closure must own what it captures.
///
/// ```rust,ignore
/// let key = run_in_transaction(store, shutdown, move |tx| {
///     Box::pin(async move { Ok::<_, SyncError>(tx.find_or_create_user(user).await?) })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<T, F>(store: &dyn Store, shutdown: &Shutdown, work: F) -> SyncResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn UnitOfWork) -> BoxFuture<'t, SyncResult<T>> + Send,
{
    if shutdown.is_triggered() {
        return Err(SyncError::Cancelled);
    }

    let mut uow = store.begin().await?;
    let outcome = tokio::select! {
        biased;
        () = shutdown.cancelled() => Err(SyncError::Cancelled),
        result = work(uow.as_mut()) => result,
    };

    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(SyncError::Cancelled) => {
            drop(uow);
            Err(SyncError::Cancelled)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_core::{DomainError, Snowflake, UserRepository};
    use monicu_db::MemoryStore;

    #[tokio::test]
    async fn test_commit_on_ok() {
        let store = MemoryStore::new();
        let shutdown = Shutdown::new();

        let key = run_in_transaction(&store, &shutdown, |tx| {
            Box::pin(async move {
                Ok::<_, SyncError>(tx.find_or_create_user(Snowflake::new(444)).await?)
            })
        })
        .await
        .unwrap();

        assert!(key > 0);
        assert_eq!(store.counts().await.users, 1);
    }

    #[tokio::test]
    async fn test_rollback_on_err() {
        let store = MemoryStore::new();
        let shutdown = Shutdown::new();

        let result: SyncResult<()> = run_in_transaction(&store, &shutdown, |tx| {
            Box::pin(async move {
                tx.find_or_create_user(Snowflake::new(444)).await?;
                Err::<(), _>(SyncError::from(DomainError::InternalError("boom".to_string())))
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(store.counts().await.users, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = MemoryStore::new();
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let result = run_in_transaction(&store, &shutdown, |tx| {
            Box::pin(async move {
                Ok::<_, SyncError>(tx.find_or_create_user(Snowflake::new(1)).await?)
            })
        })
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(store.counts().await.users, 0);
    }
}
