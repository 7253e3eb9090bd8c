//! Rental portfolio core: entities, stay scheduling, and the trash
//! lifecycle.
//!
//! The portfolio is an ownership tree — a Property owns Accommodations and
//! direct Expenses, an Accommodation owns Stays and Expenses, a Stay owns
//! Tenants — and deletion is non-destructive: rows are tombstoned, listed on
//! a trash screen, restorable, and only removed for good through an explicit
//! hard delete. Stay categories and expense categories are plain lookup
//! tables outside the lifecycle.

pub mod cascade;
pub mod contact;
pub mod domain;
pub mod import;
pub mod ledger;
pub mod schedule;
pub mod store;
pub mod trash;

#[cfg(test)]
mod tests;

pub use cascade::{CascadeEngine, CascadeError, CascadeOutcome};
pub use domain::{
    Accommodation, AccommodationId, AccommodationInput, EntityKind, EntityRef, Expense,
    ExpenseCategory, ExpenseCategoryId, ExpenseId, ExpenseInput, Property, PropertyId,
    PropertyInput, Stay, StayCategory, StayCategoryId, StayId, StayInput, Tenant, TenantId,
    TenantInput,
};
pub use import::{load_snapshot, Snapshot, SnapshotImportError};
pub use ledger::{SoftDeletable, Visibility};
pub use schedule::{
    classify, find_active_stay, find_conflict, occupancy, overlaps, Occupancy, OccupancySources,
    StayStatus,
};
pub use store::{Datastore, MemoryStore, StoreError};
pub use trash::{
    SortDirection, TrashKind, TrashListing, TrashPage, TrashQuery, TrashQueryService,
};
