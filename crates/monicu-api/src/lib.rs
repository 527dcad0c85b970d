//! # monicu-api
//!
//! Read-only HTTP API over the mirrored posts, built with Axum.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
