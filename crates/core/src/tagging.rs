//! Pure tag set logic shared by the tag registry and the tag associator.
//!
//! The database layer does the I/O; everything here works on names and ids
//! so the dedup and merge rules can be tested without storage.

use std::collections::HashSet;

use crate::bug::Operation;
use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of a single tag name (characters).
pub const MAX_TAG_NAME_LENGTH: usize = 64;

/// Validate every requested tag name: non-blank and within the length limit.
pub fn validate_tag_names(names: &[String]) -> Result<(), CoreError> {
    for name in names {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("Tag names must not be empty".into()));
        }
        if name.chars().count() > MAX_TAG_NAME_LENGTH {
            return Err(CoreError::Validation(format!(
                "Tag name '{name}' exceeds maximum length of {MAX_TAG_NAME_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Collapse duplicate names, keeping the order of first appearance.
pub fn unique_names(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Names from `requested` that are not in `existing`, in request order.
///
/// `requested` is expected to be deduplicated already (see [`unique_names`]),
/// so each missing name appears exactly once.
pub fn missing_names<'a>(requested: &[&'a str], existing: &HashSet<&str>) -> Vec<&'a str> {
    requested
        .iter()
        .copied()
        .filter(|name| !existing.contains(name))
        .collect()
}

/// Outcome of assigning a resolved tag list to a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssignment {
    /// The bug's tag ids after the assignment.
    pub tag_ids: Vec<DbId>,
    /// Links to insert.
    pub added: Vec<DbId>,
    /// Links to delete. Always empty for [`Operation::Patch`].
    pub removed: Vec<DbId>,
}

/// Compute a bug's new tag set from its `current` ids and the `resolved` ids.
///
/// - `Create` / `Put`: the result is exactly `resolved` (deduplicated).
/// - `Patch`: the result is `current` followed by every resolved id not
///   already present. Nothing is ever removed.
pub fn assign_tag_ids(current: &[DbId], resolved: &[DbId], op: Operation) -> TagAssignment {
    let current_set: HashSet<DbId> = current.iter().copied().collect();

    let mut seen = HashSet::with_capacity(resolved.len());
    let resolved: Vec<DbId> = resolved
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let added: Vec<DbId> = resolved
        .iter()
        .copied()
        .filter(|id| !current_set.contains(id))
        .collect();

    if op.is_full_replace() {
        let removed = current
            .iter()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        TagAssignment {
            tag_ids: resolved,
            added,
            removed,
        }
    } else {
        let mut tag_ids = current.to_vec();
        tag_ids.extend(&added);
        TagAssignment {
            tag_ids,
            added,
            removed: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
