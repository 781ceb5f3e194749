//! HTTP control API and SSE observer channel

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, AppContext};
