//! Quality Desk backend library
//!
//! In-memory data-quality service: exceptions, corporate-action events,
//! quality rules and multi-source comparisons, all synthesized at startup.
//! The binary and the integration tests both build on [`build_router`].

pub mod api;
pub mod config;
pub mod filter;
pub mod middleware;
pub mod mock;
pub mod models;
pub mod store;

pub use api::{build_router, AppState};
pub use config::ServerConfig;
