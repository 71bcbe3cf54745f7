//! Domain types and pure logic for the bug tracker.
//!
//! Nothing in this crate touches the database or HTTP; the `bugtrack-db` and
//! `bugtrack-api` crates build on it.

pub mod bug;
pub mod error;
pub mod tagging;
pub mod types;
