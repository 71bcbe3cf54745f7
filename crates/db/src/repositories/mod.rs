//! Repository layer.
//!
//! Each repository is a zero-sized struct whose associated functions take a
//! pool (reads, transactional writes) or a connection (steps that must join
//! a caller's transaction).

pub mod bug_repo;
pub mod tag_repo;

pub use bug_repo::BugRepo;
pub use tag_repo::TagRepo;
