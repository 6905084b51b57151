//! HTTP front end
//!
//! Streams analysis events to clients as Server-Sent Events.

pub mod routes;

pub use routes::{router, serve, AppState};
