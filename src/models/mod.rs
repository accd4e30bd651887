//! Models Module
//!
//! Request and response DTOs for the cache administration API.

mod requests;
mod responses;

pub use requests::{InvalidateRequest, RefreshRequest};
pub use responses::{
    ClearResponse, HealthResponse, InvalidateResponse, PreloadResponse, StatsResponse,
};
