//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `ANY /api/*path` - Cached proxy to the upstream API
//! - `GET /cache/stats` - Cache statistics
//! - `POST /cache/refresh` - Refetch one cached request
//! - `POST /cache/invalidate` - Drop keys matching a pattern
//! - `POST /cache/preload` - Warm the critical endpoints
//! - `DELETE /cache` - Clear every tier
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
