//! HTTP layer for the bug tracker: configuration, error mapping, routing,
//! and the request handlers that drive the bug and tag repositories.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
