//! API Module
//!
//! HTTP handlers and routing for the cache admin and monitoring API, the
//! surface an operational dashboard reads from.
//!
//! # Endpoints
//! - `PUT /set`, `GET /get/:key`, `DELETE /del/:key`
//! - `DELETE /namespace/:namespace`, `POST /invalidate`, `POST /clear`
//! - `GET /stats`, `/stats/detailed`, `/stats/performance`, `/stats/by-type`
//! - `GET /health`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
