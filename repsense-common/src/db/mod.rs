//! Database models and queries

pub mod init;
pub mod models;
pub mod reps;
pub mod sessions;
pub mod sets;

pub use init::*;
pub use models::*;
