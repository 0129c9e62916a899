//! Election Module
//!
//! Election snapshots, the `/elections` endpoints and the per-election
//! lifecycle controller.

mod controller;
mod model;
mod service;

pub use controller::LifecycleController;
pub use model::{
    compute_turnout, Candidate, Election, ElectionStatus, ElectionType, LifecycleAction,
    NewElection, Page, Party, Turnout,
};
pub use service::ElectionService;
