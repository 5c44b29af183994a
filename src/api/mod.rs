//! HTTP boundary: the attendance mutation and the caller's event options.

pub mod public;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{app, serve};
pub use state::{AppState, SharedState, StartupError};
