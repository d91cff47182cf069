pub mod compare;
pub mod dashboard;
pub mod events;
pub mod exceptions;
pub mod routes;
pub mod rules;

pub use routes::{
    build_router, ActionBody, ActionResponse, ApiError, AppState, FilterQuery, StatusAck,
};
