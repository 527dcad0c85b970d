//! # monicu-sync
//!
//! The synchronization engine: decides which gateway events are in scope and
//! reconciles them against the store, one unit of work per event, plus a
//! one-time history backfill per tracked channel.

pub mod services;

pub use services::{
    run_in_transaction, BackfillCoordinator, BackfillReport, ChannelCommunityCache,
    EventDispatcher, IdentityResolver, PendingEdits, PostReconciler, ReactionReconciler,
    Reconciled, ScopeFilter, Shutdown, SyncContext, SyncContextBuilder, SyncError, SyncResult,
};
