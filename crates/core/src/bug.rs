//! Bug enumerations, operation modes, and field validation.
//!
//! The enums are closed sets with explicit string encodings. The same strings
//! are used on the wire (JSON) and in the `TEXT` columns of the `bugs` table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Wire enums
// ---------------------------------------------------------------------------

macro_rules! define_wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// The wire / column encoding of this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{}'. Must be one of: {:?}",
                        $label,
                        other,
                        [$( $wire ),+]
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

define_wire_enum! {
    /// Lifecycle status of a bug.
    Status ("status") {
        Open = "OPEN",
        Closed = "CLOSED",
        InProgress = "IN_PROGRESS",
    }
}

define_wire_enum! {
    /// How soon a bug should be worked on.
    Priority ("priority") {
        Low = "LOW",
        Medium = "MEDIUM",
        High = "HIGH",
    }
}

define_wire_enum! {
    /// How much damage a bug does.
    Severity ("severity") {
        Minor = "MINOR",
        Major = "MAJOR",
        Critical = "CRITICAL",
    }
}

// ---------------------------------------------------------------------------
// Operation modes
// ---------------------------------------------------------------------------

/// Governs full-replace vs partial-merge semantics for fields and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// New record; everything in the payload is written.
    Create,
    /// Partial merge; only explicitly set fields are written, tags only grow.
    Patch,
    /// Full replace; the payload overwrites the record, tags included.
    Put,
}

impl Operation {
    /// `true` for the modes that overwrite rather than merge.
    pub fn is_full_replace(self) -> bool {
        matches!(self, Operation::Create | Operation::Put)
    }
}

// ---------------------------------------------------------------------------
// Field constants
// ---------------------------------------------------------------------------

/// Stored when a bug is written without a submitter.
pub const DEFAULT_SUBMITTER: &str = "???";

/// Resolve an optional submitter to the stored value.
pub fn submitter_or_default(submitter: Option<&str>) -> String {
    submitter.unwrap_or(DEFAULT_SUBMITTER).to_string()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a title is not empty or whitespace-only.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    Ok(())
}

/// Validate that a description is not empty or whitespace-only.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation("Description must not be empty".into()));
    }
    Ok(())
}

/// Reject a partial update that sets no fields at all.
pub fn validate_patch_field_count(fields_set: usize) -> Result<(), CoreError> {
    if fields_set == 0 {
        return Err(CoreError::Validation(
            "At least one field must be provided for a partial update".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Compute the next `updated_at` value.
///
/// Returns `now` unless the clock has not moved past `previous`, in which
/// case the previous value is advanced by one microsecond. The result is
/// always strictly greater than `previous`.
pub fn next_updated_at(previous: Timestamp, now: Timestamp) -> Timestamp {
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
