//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers validate the payload, delegate to the matching repository in
//! `bugtrack_db`, and map errors via [`AppError`](crate::error::AppError).

pub mod bugs;
pub mod tags;
