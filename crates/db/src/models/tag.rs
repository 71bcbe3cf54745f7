//! Tag model.

use bugtrack_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `tags` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Tag {
    pub id: DbId,
    pub name: String,
}

/// A tag joined with one bug it is linked to, for loading many bugs' tags at once.
#[derive(Debug, Clone, FromRow)]
pub struct BugTagRow {
    pub bug_id: DbId,
    pub tag_id: DbId,
    pub name: String,
}

impl BugTagRow {
    pub fn into_tag(self) -> Tag {
        Tag {
            id: self.tag_id,
            name: self.name,
        }
    }
}
