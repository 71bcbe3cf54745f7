//! Row structs and request DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the payloads that write it, if any

pub mod bug;
pub mod tag;
