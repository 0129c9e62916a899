//! Votectl - Election Administration Client
//!
//! Client core for a national election-management backend. It authenticates
//! election officials, drives elections through their lifecycle and checks
//! that individual votes are recorded on the backend's ledger.
//!
//! # Architecture
//!
//! Every backend call goes through one [`api::RequestPipeline`], which
//! attaches the official's access token and, when the backend answers 401,
//! asks the [`session::SessionManager`] for a refresh before retrying once.
//! Concurrent refresh requests collapse into a single backend call.
//!
//! # Features
//!
//! - Persisted session (SQLite) restored on startup
//! - Single-flight token refresh with transparent retry
//! - Election lifecycle controller with monotonic snapshots
//! - Vote verification by hash or receipt token
//! - Ledger statistics and chain validation

pub mod api;
pub mod client;
pub mod config;
pub mod election;
pub mod error;
pub mod session;
pub mod verification;

pub use client::AdminClient;
pub use config::VotectlConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{ApiRequest, ApiResponse, RequestPipeline, Transport};
    pub use crate::client::AdminClient;
    pub use crate::config::VotectlConfig;
    pub use crate::election::{Election, ElectionStatus, LifecycleController, Turnout};
    pub use crate::error::{Error, Result};
    pub use crate::session::{AdminRole, AdminUser, Session, SessionEvent, SessionManager};
    pub use crate::verification::{VerificationResult, VerifyMode};
}
