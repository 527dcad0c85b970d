//! Sync engine services
//!
//! Each service borrows the shared [`SyncContext`] and is cheap to construct
//! per event.

pub mod backfill;
pub mod cache;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod pending;
pub mod post;
pub mod reaction;
pub mod scope;
pub mod shutdown;
pub mod transaction;

pub use backfill::{BackfillCoordinator, BackfillReport};
pub use cache::ChannelCommunityCache;
pub use context::{SyncContext, SyncContextBuilder};
pub use dispatcher::EventDispatcher;
pub use error::{SyncError, SyncResult};
pub use identity::IdentityResolver;
pub use pending::{PendingEdits, Promotion};
pub use post::{PostReconciler, Reconciled};
pub use reaction::ReactionReconciler;
pub use scope::ScopeFilter;
pub use shutdown::Shutdown;
pub use transaction::run_in_transaction;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
