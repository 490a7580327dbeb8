//! Townhall Sync - shared session state across devices
//!
//! Keeps a local [`SessionRegistry`] converged with a realtime document
//! store under a last-write-wins, whole-document overwrite model:
//! - [`SessionFacade`] applies local mutations optimistically and pushes
//!   the full updated session to the store
//! - [`SyncHandle`] feeds store snapshots back into the registry
//! - [`SessionStore`] is the store contract; [`MemoryStore`] implements it
//!   in-process
//!
//! # Example
//!
//! ```rust,ignore
//! use townhall_sync::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LiveConfig::new();
//! let store = Arc::new(MemoryStore::new());
//! let facade = SessionFacade::new(Arc::new(SessionRegistry::new(&config)), store, config);
//! let sync = facade.start_sync()?;
//!
//! let joined = facade.create_session("Standup");
//! facade.add_question(&joined.session.code, "When is the deploy?", Some("Ann"))?;
//! facade.flush().await;
//! sync.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod registry;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use config::{LiveConfig, LoggingConfig};
pub use error::{ConfigError, MutationError, StoreError};
pub use facade::{JoinedSession, Mutation, SessionFacade, WriteStats};
pub use registry::SessionRegistry;
pub use store::{
    DocumentPath, MemoryStore, SessionMap, SessionStore, Snapshot, Subscription, SubscriptionId,
};
pub use sync::SyncHandle;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring a live session client
    pub use crate::{
        JoinedSession, LiveConfig, MemoryStore, Mutation, MutationError, SessionFacade,
        SessionRegistry, SessionStore, SyncHandle,
    };
    pub use std::sync::Arc;
    pub use townhall_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
