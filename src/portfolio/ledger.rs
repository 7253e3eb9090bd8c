//! Tombstone state shared by every trashable row.
//!
//! Rows are never destroyed by the normal delete path; they carry a nullable
//! `deleted_at` timestamp and queries pick one of three visibility modes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Accommodation, Expense, Property, Stay, Tenant};

/// Read access to a row's tombstone.
pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_trashed(&self) -> bool {
        self.deleted_at().is_some()
    }
}

impl SoftDeletable for Property {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl SoftDeletable for Accommodation {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl SoftDeletable for Stay {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl SoftDeletable for Tenant {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl SoftDeletable for Expense {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Query mode applied to every fetch and listing.
///
/// There is no global scope override: each relation lookup states its mode
/// explicitly, and parent-ward lookups pass [`Visibility::WithTrashed`] so a
/// child's history stays inspectable after the parent is trashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Live rows only; tombstoned rows are invisible.
    Default,
    /// Tombstoned rows only, the trash screen partition.
    OnlyTrashed,
    /// Both live and tombstoned rows.
    WithTrashed,
}

impl Visibility {
    pub fn admits<R: SoftDeletable>(self, row: &R) -> bool {
        match self {
            Self::Default => !row.is_trashed(),
            Self::OnlyTrashed => row.is_trashed(),
            Self::WithTrashed => true,
        }
    }
}
