//! Cascading delete and restore across the ownership tree.
//!
//! Ownership edges: Property owns Accommodations and direct Expenses; an
//! Accommodation owns Stays and Expenses; a Stay owns Tenants. The cascade
//! is an explicit, synchronous call tree (not lifecycle hooks), so ordering
//! and atomicity are auditable: children are tombstoned before the parent's
//! own tombstone is written, everything inside one transaction, and every
//! row in one operation carries the same timestamp.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{AccommodationId, EntityKind, EntityRef, ExpenseId, PropertyId, StayId, TenantId};
use super::ledger::{SoftDeletable, Visibility};
use super::store::{Datastore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },
    #[error("trash operation aborted: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for CascadeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Storage(other),
        }
    }
}

/// What a cascade changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Rows whose tombstone actually flipped. Zero means the target was
    /// already in the requested state and nothing was touched.
    pub affected: usize,
}

/// Propagates soft delete and restore over the ownership tree.
pub struct CascadeEngine<S> {
    store: S,
}

impl<S: Datastore> CascadeEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tombstone the target and every live descendant, all stamped with the
    /// current instant.
    pub fn soft_delete(&self, target: EntityRef) -> Result<CascadeOutcome, CascadeError> {
        self.soft_delete_at(target, Utc::now())
    }

    /// Tombstone the target and every live descendant at `at`.
    ///
    /// An already-tombstoned target is a no-op: the cascade is not re-run
    /// and existing tombstone timestamps are left untouched.
    pub fn soft_delete_at(
        &self,
        target: EntityRef,
        at: DateTime<Utc>,
    ) -> Result<CascadeOutcome, CascadeError> {
        match self
            .store
            .with_transaction(|store| delete_entity(store, target, at))
        {
            Ok(affected) => {
                info!(entity = %target, affected, "soft delete cascade committed");
                Ok(CascadeOutcome { affected })
            }
            Err(err) => {
                warn!(entity = %target, error = %err, "soft delete cascade rolled back");
                Err(err.into())
            }
        }
    }

    /// Clear the target's tombstone and, recursively, the tombstone of every
    /// trashed descendant — including descendants that were trashed
    /// independently before the target was. Restoring an already-active
    /// target is a no-op.
    pub fn restore(&self, target: EntityRef) -> Result<CascadeOutcome, CascadeError> {
        match self
            .store
            .with_transaction(|store| restore_entity(store, target))
        {
            Ok(affected) => {
                info!(entity = %target, affected, "restore cascade committed");
                Ok(CascadeOutcome { affected })
            }
            Err(err) => {
                warn!(entity = %target, error = %err, "restore cascade rolled back");
                Err(err.into())
            }
        }
    }

    /// Permanently remove a trashed row and its whole subtree.
    ///
    /// Only reachable from the trash partition; a live target is NotFound.
    /// The engine's own cascade is skipped entirely — descendant removal is
    /// the storage layer's referential cascade.
    pub fn hard_delete(&self, target: EntityRef) -> Result<(), CascadeError> {
        ensure_trashed(&self.store, target)?;
        self.store.purge(target)?;
        info!(entity = %target, "hard delete completed");
        Ok(())
    }
}

fn ensure_trashed<S: Datastore>(store: &S, target: EntityRef) -> Result<(), CascadeError> {
    match target {
        EntityRef::Property(id) => store.property(id, Visibility::OnlyTrashed).map(|_| ())?,
        EntityRef::Accommodation(id) => {
            store.accommodation(id, Visibility::OnlyTrashed).map(|_| ())?
        }
        EntityRef::Stay(id) => store.stay(id, Visibility::OnlyTrashed).map(|_| ())?,
        EntityRef::Tenant(id) => store.tenant(id, Visibility::OnlyTrashed).map(|_| ())?,
        EntityRef::Expense(id) => store.expense(id, Visibility::OnlyTrashed).map(|_| ())?,
    }
    Ok(())
}

fn delete_entity<S: Datastore>(
    store: &S,
    target: EntityRef,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    match target {
        EntityRef::Property(id) => delete_property(store, id, at),
        EntityRef::Accommodation(id) => delete_accommodation(store, id, at),
        EntityRef::Stay(id) => delete_stay(store, id, at),
        EntityRef::Tenant(id) => delete_tenant(store, id, at),
        EntityRef::Expense(id) => delete_expense(store, id, at),
    }
}

fn delete_property<S: Datastore>(
    store: &S,
    id: PropertyId,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let property = store.property(id, Visibility::WithTrashed)?;
    if property.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for accommodation in store.accommodations_of(id, Visibility::Default)? {
        affected += delete_accommodation(store, accommodation.id, at)?;
    }
    for expense in store.property_expenses(id, Visibility::Default)? {
        affected += delete_expense(store, expense.id, at)?;
    }
    store.set_deleted(EntityRef::Property(id), Some(at))?;
    Ok(affected + 1)
}

fn delete_accommodation<S: Datastore>(
    store: &S,
    id: AccommodationId,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let accommodation = store.accommodation(id, Visibility::WithTrashed)?;
    if accommodation.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for stay in store.stays_of(id, Visibility::Default)? {
        affected += delete_stay(store, stay.id, at)?;
    }
    for expense in store.accommodation_expenses(id, Visibility::Default)? {
        affected += delete_expense(store, expense.id, at)?;
    }
    store.set_deleted(EntityRef::Accommodation(id), Some(at))?;
    Ok(affected + 1)
}

fn delete_stay<S: Datastore>(
    store: &S,
    id: StayId,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let stay = store.stay(id, Visibility::WithTrashed)?;
    if stay.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for tenant in store.tenants_of(id, Visibility::Default)? {
        affected += delete_tenant(store, tenant.id, at)?;
    }
    store.set_deleted(EntityRef::Stay(id), Some(at))?;
    Ok(affected + 1)
}

fn delete_tenant<S: Datastore>(
    store: &S,
    id: TenantId,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let tenant = store.tenant(id, Visibility::WithTrashed)?;
    if tenant.is_trashed() {
        return Ok(0);
    }
    store.set_deleted(EntityRef::Tenant(id), Some(at))?;
    Ok(1)
}

fn delete_expense<S: Datastore>(
    store: &S,
    id: ExpenseId,
    at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let expense = store.expense(id, Visibility::WithTrashed)?;
    if expense.is_trashed() {
        return Ok(0);
    }
    store.set_deleted(EntityRef::Expense(id), Some(at))?;
    Ok(1)
}

fn restore_entity<S: Datastore>(store: &S, target: EntityRef) -> Result<usize, StoreError> {
    match target {
        EntityRef::Property(id) => restore_property(store, id),
        EntityRef::Accommodation(id) => restore_accommodation(store, id),
        EntityRef::Stay(id) => restore_stay(store, id),
        EntityRef::Tenant(id) => restore_tenant(store, id),
        EntityRef::Expense(id) => restore_expense(store, id),
    }
}

fn restore_property<S: Datastore>(store: &S, id: PropertyId) -> Result<usize, StoreError> {
    let property = store.property(id, Visibility::WithTrashed)?;
    if !property.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for accommodation in store.accommodations_of(id, Visibility::WithTrashed)? {
        affected += restore_accommodation(store, accommodation.id)?;
    }
    for expense in store.property_expenses(id, Visibility::WithTrashed)? {
        affected += restore_expense(store, expense.id)?;
    }
    store.set_deleted(EntityRef::Property(id), None)?;
    Ok(affected + 1)
}

fn restore_accommodation<S: Datastore>(
    store: &S,
    id: AccommodationId,
) -> Result<usize, StoreError> {
    let accommodation = store.accommodation(id, Visibility::WithTrashed)?;
    if !accommodation.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for stay in store.stays_of(id, Visibility::WithTrashed)? {
        affected += restore_stay(store, stay.id)?;
    }
    for expense in store.accommodation_expenses(id, Visibility::WithTrashed)? {
        affected += restore_expense(store, expense.id)?;
    }
    store.set_deleted(EntityRef::Accommodation(id), None)?;
    Ok(affected + 1)
}

fn restore_stay<S: Datastore>(store: &S, id: StayId) -> Result<usize, StoreError> {
    let stay = store.stay(id, Visibility::WithTrashed)?;
    if !stay.is_trashed() {
        return Ok(0);
    }

    let mut affected = 0;
    for tenant in store.tenants_of(id, Visibility::WithTrashed)? {
        affected += restore_tenant(store, tenant.id)?;
    }
    store.set_deleted(EntityRef::Stay(id), None)?;
    Ok(affected + 1)
}

fn restore_tenant<S: Datastore>(store: &S, id: TenantId) -> Result<usize, StoreError> {
    let tenant = store.tenant(id, Visibility::WithTrashed)?;
    if !tenant.is_trashed() {
        return Ok(0);
    }
    store.set_deleted(EntityRef::Tenant(id), None)?;
    Ok(1)
}

fn restore_expense<S: Datastore>(store: &S, id: ExpenseId) -> Result<usize, StoreError> {
    let expense = store.expense(id, Visibility::WithTrashed)?;
    if !expense.is_trashed() {
        return Ok(0);
    }
    store.set_deleted(EntityRef::Expense(id), None)?;
    Ok(1)
}
