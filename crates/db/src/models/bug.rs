//! Bug entity model, DTOs, and the field applicator.

use bugtrack_core::bug::{self, next_updated_at, submitter_or_default, Priority, Severity, Status};
use bugtrack_core::error::CoreError;
use bugtrack_core::tagging;
use bugtrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::tag::Tag;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `bugs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Bug {
    pub id: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: Status,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub assigned_to: Option<String>,
    pub submitter: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Bug {
    /// Build a record that has not been inserted yet (`id` is 0).
    ///
    /// `created_at` and `updated_at` are both set to `now`.
    pub fn new_unsaved(input: &CreateBug, now: Timestamp) -> Self {
        Self {
            id: 0,
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status,
            priority: input.priority,
            severity: input.severity,
            assigned_to: input.assigned_to.clone(),
            submitter: submitter_or_default(input.submitter.as_deref()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A bug with its tags eagerly loaded. This is the API response shape.
#[derive(Debug, Clone, Serialize)]
pub struct BugWithTags {
    #[serde(flatten)]
    pub bug: Bug,
    pub tags: Vec<Tag>,
}

impl BugWithTags {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// Full payload for `POST /bugs` and `PUT /bugs/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBug {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub severity: Severity,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Falls back to [`bug::DEFAULT_SUBMITTER`] when absent or null.
    #[serde(default)]
    pub submitter: Option<String>,
    /// `None` leaves tags alone; `Some(vec![])` clears them on PUT.
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,
}

impl CreateBug {
    /// Run every request-boundary check for a full payload.
    pub fn validate_input(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        bug::validate_title(&self.title)?;
        bug::validate_description(&self.description)?;
        if let Some(ref tags) = self.tags {
            tagging::validate_tag_names(tags)?;
        }
        Ok(())
    }
}

/// Partial payload for `PATCH /bugs/{id}`. Every field is optional.
///
/// For the nullable columns the outer `Option` records whether the field was
/// sent at all: `Some(None)` means an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBug {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub submitter: Option<Option<String>>,
    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,
}

impl UpdateBug {
    /// Number of fields the caller explicitly set, `tags` included.
    pub fn fields_set(&self) -> usize {
        [
            self.title.is_some(),
            self.description.is_some(),
            self.status.is_some(),
            self.priority.is_some(),
            self.severity.is_some(),
            self.assigned_to.is_some(),
            self.submitter.is_some(),
            self.tags.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Run every request-boundary check for a partial payload.
    ///
    /// Rejects a payload that sets no fields at all.
    pub fn validate_input(&self) -> Result<(), CoreError> {
        bug::validate_patch_field_count(self.fields_set())?;
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if let Some(ref title) = self.title {
            bug::validate_title(title)?;
        }
        if let Some(ref description) = self.description {
            bug::validate_description(description)?;
        }
        if let Some(ref tags) = self.tags {
            tagging::validate_tag_names(tags)?;
        }
        Ok(())
    }
}

/// Maps a present field (even `null`) to `Some`, so a missing field stays `None`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Field applicator
// ---------------------------------------------------------------------------

/// An incoming change-set, tagged with its write semantics.
#[derive(Debug, Clone, Copy)]
pub enum BugChanges<'a> {
    /// CREATE / PUT: the payload overwrites every scalar field.
    Full(&'a CreateBug),
    /// PATCH: only the fields the caller set are written.
    Partial(&'a UpdateBug),
}

/// Copy scalar fields from `changes` onto `bug`. Tags are never touched here.
///
/// A full replace keeps `id` and `created_at` and overwrites everything else,
/// resetting `assigned_to` to null and `submitter` to the default when the
/// payload omits them. A partial merge writes only the fields that were set.
/// Both advance `updated_at` past its previous value; an empty partial
/// payload (which validation rejects) leaves the record untouched.
///
/// Returns the number of scalar fields written.
pub fn apply_bug_data(bug: &mut Bug, changes: BugChanges<'_>, now: Timestamp) -> usize {
    match changes {
        BugChanges::Full(input) => {
            let replaced = Bug {
                id: bug.id,
                created_at: bug.created_at,
                updated_at: next_updated_at(bug.updated_at, now),
                ..Bug::new_unsaved(input, now)
            };
            *bug = replaced;
            7
        }
        BugChanges::Partial(input) => {
            let mut applied = 0;

            if let Some(ref title) = input.title {
                bug.title = title.clone();
                applied += 1;
            }
            if let Some(ref description) = input.description {
                bug.description = description.clone();
                applied += 1;
            }
            if let Some(status) = input.status {
                bug.status = status;
                applied += 1;
            }
            if let Some(priority) = input.priority {
                bug.priority = priority;
                applied += 1;
            }
            if let Some(severity) = input.severity {
                bug.severity = severity;
                applied += 1;
            }
            if let Some(ref assigned_to) = input.assigned_to {
                bug.assigned_to = assigned_to.clone();
                applied += 1;
            }
            if let Some(ref submitter) = input.submitter {
                bug.submitter = submitter_or_default(submitter.as_deref());
                applied += 1;
            }

            if input.fields_set() > 0 {
                bug.updated_at = next_updated_at(bug.updated_at, now);
            }
            applied
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
