//! Storage boundary and the in-memory reference store.
//!
//! [`Datastore`] is the contract the cascade engine runs against: partition-
//! scoped fetches, child listings per ownership edge, tombstone writes, a
//! referential purge, and a transaction wrapper. [`MemoryStore`] implements
//! it with plain tables and snapshot-rollback transactions, and additionally
//! carries the validated write path (contact normalization, uniqueness, stay
//! overlap) the way the original back office enforces it before rows land.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};

use super::contact;
use super::domain::{
    Accommodation, AccommodationId, AccommodationInput, EntityKind, EntityRef, Expense,
    ExpenseCategory, ExpenseCategoryId, ExpenseId, ExpenseInput, Property, PropertyId,
    PropertyInput, Stay, StayCategory, StayCategoryId, StayId, StayInput, Tenant, TenantId,
    TenantInput,
};
use super::ledger::{SoftDeletable, Visibility};
use super::schedule;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },
    #[error("stay category {0} not found")]
    StayCategoryNotFound(StayCategoryId),
    #[error("expense category {0} not found")]
    ExpenseCategoryNotFound(ExpenseCategoryId),
    #[error("{field} already in use")]
    Conflict { field: &'static str },
    #[error("accommodation is already booked from {start} to {end}")]
    StayOverlap { start: NaiveDate, end: NaiveDate },
    #[error("due day {0} is outside 1-31")]
    DueDateOutOfRange(u8),
    #[error("stay ends before it starts")]
    NegativeStayRange,
    #[error("category is still referenced by {count} stays")]
    CategoryInUse { count: usize },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations the cascade engine requires.
///
/// Fetches are partition-scoped: a row outside the requested [`Visibility`]
/// is a [`StoreError::NotFound`], which is how "restore something that is not
/// trashed" surfaces. Child listings follow the ownership edges of the
/// portfolio tree.
pub trait Datastore {
    fn property(&self, id: PropertyId, visibility: Visibility) -> Result<Property, StoreError>;
    fn accommodation(
        &self,
        id: AccommodationId,
        visibility: Visibility,
    ) -> Result<Accommodation, StoreError>;
    fn stay(&self, id: StayId, visibility: Visibility) -> Result<Stay, StoreError>;
    fn tenant(&self, id: TenantId, visibility: Visibility) -> Result<Tenant, StoreError>;
    fn expense(&self, id: ExpenseId, visibility: Visibility) -> Result<Expense, StoreError>;

    fn accommodations_of(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<Accommodation>, StoreError>;
    fn stays_of(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<Stay>, StoreError>;
    fn tenants_of(&self, stay: StayId, visibility: Visibility) -> Result<Vec<Tenant>, StoreError>;
    /// Every expense charged to the property, including ones also tied to an
    /// accommodation.
    fn property_expenses(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<Expense>, StoreError>;
    fn accommodation_expenses(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<Expense>, StoreError>;

    /// Write or clear one row's tombstone timestamp.
    fn set_deleted(&self, target: EntityRef, at: Option<DateTime<Utc>>) -> Result<(), StoreError>;

    /// Permanently remove the row and, through referential cascade, every
    /// row that references it, regardless of tombstone state.
    fn purge(&self, target: EntityRef) -> Result<(), StoreError>;

    /// Run `op` atomically: if it fails, no write it performed remains
    /// visible afterward.
    fn with_transaction<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, StoreError>;
}

#[derive(Debug, Default, Clone)]
struct Tables {
    next_id: u64,
    properties: BTreeMap<u64, Property>,
    accommodations: BTreeMap<u64, Accommodation>,
    stays: BTreeMap<u64, Stay>,
    tenants: BTreeMap<u64, Tenant>,
    expenses: BTreeMap<u64, Expense>,
    stay_categories: BTreeMap<u64, StayCategory>,
    expense_categories: BTreeMap<u64, ExpenseCategory>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn fetch<R>(
    table: &BTreeMap<u64, R>,
    id: u64,
    visibility: Visibility,
    kind: EntityKind,
) -> Result<R, StoreError>
where
    R: Clone + SoftDeletable,
{
    table
        .get(&id)
        .filter(|row| visibility.admits(*row))
        .cloned()
        .ok_or(StoreError::NotFound { kind, id })
}

fn collect<R, F>(table: &BTreeMap<u64, R>, visibility: Visibility, belongs: F) -> Vec<R>
where
    R: Clone + SoftDeletable,
    F: Fn(&R) -> bool,
{
    table
        .values()
        .filter(|row| belongs(row) && visibility.admits(*row))
        .cloned()
        .collect()
}

/// In-memory reference implementation of the storage boundary.
///
/// Tables are keyed by id in ordered maps, so listings have a stable id
/// order. Transactions snapshot the tables and roll back on error; two
/// simultaneous cascades on the same rows are last-write-wins on the
/// tombstone timestamp, the same race the relational layer would have.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detached copy of the current tables, for transaction wrappers layered
    /// on top of this store.
    pub(crate) fn checkpoint(&self) -> MemoryStore {
        MemoryStore {
            inner: Arc::new(Mutex::new(self.lock().clone())),
        }
    }

    /// Replace the tables with a previously taken checkpoint.
    pub(crate) fn restore_from(&self, checkpoint: &MemoryStore) {
        let tables = checkpoint.lock().clone();
        *self.lock() = tables;
    }

    pub fn create_property(&self, input: PropertyInput) -> Result<Property, StoreError> {
        let mut tables = self.lock();
        let id = tables.allocate();
        let property = Property {
            id: PropertyId(id),
            label: input.label,
            address: input.address,
            description: input.description,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.properties.insert(id, property.clone());
        Ok(property)
    }

    pub fn update_property(
        &self,
        id: PropertyId,
        input: PropertyInput,
    ) -> Result<Property, StoreError> {
        let mut tables = self.lock();
        let row = tables
            .properties
            .get_mut(&id.0)
            .filter(|row| !row.is_trashed())
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Property,
                id: id.0,
            })?;
        row.label = input.label;
        row.address = input.address;
        row.description = input.description;
        Ok(row.clone())
    }

    pub fn create_accommodation(
        &self,
        input: AccommodationInput,
    ) -> Result<Accommodation, StoreError> {
        let mut tables = self.lock();
        if !tables.properties.contains_key(&input.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: input.property_id.0,
            });
        }
        let id = tables.allocate();
        let accommodation = Accommodation {
            id: AccommodationId(id),
            property_id: input.property_id,
            label: input.label,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.accommodations.insert(id, accommodation.clone());
        Ok(accommodation)
    }

    pub fn update_accommodation(
        &self,
        id: AccommodationId,
        input: AccommodationInput,
    ) -> Result<Accommodation, StoreError> {
        let mut tables = self.lock();
        if !tables.properties.contains_key(&input.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: input.property_id.0,
            });
        }
        let row = tables
            .accommodations
            .get_mut(&id.0)
            .filter(|row| !row.is_trashed())
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Accommodation,
                id: id.0,
            })?;
        row.property_id = input.property_id;
        row.label = input.label;
        Ok(row.clone())
    }

    pub fn create_stay(&self, input: StayInput) -> Result<Stay, StoreError> {
        let mut tables = self.lock();
        if !tables.accommodations.contains_key(&input.accommodation_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Accommodation,
                id: input.accommodation_id.0,
            });
        }
        if !tables.stay_categories.contains_key(&input.stay_category_id.0) {
            return Err(StoreError::StayCategoryNotFound(input.stay_category_id));
        }
        validate_stay_window(&input)?;
        check_overlap(&tables, &input, None)?;

        let id = tables.allocate();
        let stay = Stay {
            id: StayId(id),
            accommodation_id: input.accommodation_id,
            stay_category_id: input.stay_category_id,
            start_date: input.start_date,
            end_date: input.end_date,
            due_date: input.due_date,
            price_cents: input.price_cents,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.stays.insert(id, stay.clone());
        Ok(stay)
    }

    pub fn update_stay(&self, id: StayId, input: StayInput) -> Result<Stay, StoreError> {
        let mut tables = self.lock();
        if !tables.accommodations.contains_key(&input.accommodation_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Accommodation,
                id: input.accommodation_id.0,
            });
        }
        if !tables.stay_categories.contains_key(&input.stay_category_id.0) {
            return Err(StoreError::StayCategoryNotFound(input.stay_category_id));
        }
        validate_stay_window(&input)?;
        check_overlap(&tables, &input, Some(id))?;

        let row = tables
            .stays
            .get_mut(&id.0)
            .filter(|row| !row.is_trashed())
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Stay,
                id: id.0,
            })?;
        row.accommodation_id = input.accommodation_id;
        row.stay_category_id = input.stay_category_id;
        row.start_date = input.start_date;
        row.end_date = input.end_date;
        row.due_date = input.due_date;
        row.price_cents = input.price_cents;
        Ok(row.clone())
    }

    pub fn create_tenant(&self, input: TenantInput) -> Result<Tenant, StoreError> {
        let mut tables = self.lock();
        if !tables.stays.contains_key(&input.stay_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Stay,
                id: input.stay_id.0,
            });
        }

        let email = normalize_email(input.email);
        let phone = input.phone.as_deref().and_then(contact::normalize_digits);
        let cpf = input.cpf.as_deref().and_then(contact::normalize_digits);
        check_tenant_uniqueness(&tables, email.as_deref(), cpf.as_deref(), None)?;

        let id = tables.allocate();
        let tenant = Tenant {
            id: TenantId(id),
            stay_id: input.stay_id,
            name: input.name,
            email,
            phone,
            cpf,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.tenants.insert(id, tenant.clone());
        Ok(tenant)
    }

    pub fn update_tenant(&self, id: TenantId, input: TenantInput) -> Result<Tenant, StoreError> {
        let mut tables = self.lock();
        if !tables.stays.contains_key(&input.stay_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Stay,
                id: input.stay_id.0,
            });
        }

        let email = normalize_email(input.email);
        let phone = input.phone.as_deref().and_then(contact::normalize_digits);
        let cpf = input.cpf.as_deref().and_then(contact::normalize_digits);
        check_tenant_uniqueness(&tables, email.as_deref(), cpf.as_deref(), Some(id))?;

        let row = tables
            .tenants
            .get_mut(&id.0)
            .filter(|row| !row.is_trashed())
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Tenant,
                id: id.0,
            })?;
        row.stay_id = input.stay_id;
        row.name = input.name;
        row.email = email;
        row.phone = phone;
        row.cpf = cpf;
        Ok(row.clone())
    }

    pub fn create_expense(&self, input: ExpenseInput) -> Result<Expense, StoreError> {
        let mut tables = self.lock();
        if !tables.properties.contains_key(&input.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: input.property_id.0,
            });
        }
        if let Some(accommodation_id) = input.accommodation_id {
            if !tables.accommodations.contains_key(&accommodation_id.0) {
                return Err(StoreError::NotFound {
                    kind: EntityKind::Accommodation,
                    id: accommodation_id.0,
                });
            }
        }
        if let Some(category_id) = input.expense_category_id {
            if !tables.expense_categories.contains_key(&category_id.0) {
                return Err(StoreError::ExpenseCategoryNotFound(category_id));
            }
        }

        let id = tables.allocate();
        let expense = Expense {
            id: ExpenseId(id),
            property_id: input.property_id,
            accommodation_id: input.accommodation_id,
            expense_category_id: input.expense_category_id,
            label: input.label,
            price_cents: input.price_cents,
            date: input.date,
            description: input.description,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.expenses.insert(id, expense.clone());
        Ok(expense)
    }

    pub fn update_expense(&self, id: ExpenseId, input: ExpenseInput) -> Result<Expense, StoreError> {
        let mut tables = self.lock();
        if !tables.properties.contains_key(&input.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: input.property_id.0,
            });
        }
        if let Some(accommodation_id) = input.accommodation_id {
            if !tables.accommodations.contains_key(&accommodation_id.0) {
                return Err(StoreError::NotFound {
                    kind: EntityKind::Accommodation,
                    id: accommodation_id.0,
                });
            }
        }
        if let Some(category_id) = input.expense_category_id {
            if !tables.expense_categories.contains_key(&category_id.0) {
                return Err(StoreError::ExpenseCategoryNotFound(category_id));
            }
        }

        let row = tables
            .expenses
            .get_mut(&id.0)
            .filter(|row| !row.is_trashed())
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Expense,
                id: id.0,
            })?;
        row.property_id = input.property_id;
        row.accommodation_id = input.accommodation_id;
        row.expense_category_id = input.expense_category_id;
        row.label = input.label;
        row.price_cents = input.price_cents;
        row.date = input.date;
        row.description = input.description;
        Ok(row.clone())
    }

    pub fn create_stay_category(&self, label: impl Into<String>) -> StayCategory {
        let mut tables = self.lock();
        let id = tables.allocate();
        let category = StayCategory {
            id: StayCategoryId(id),
            label: label.into(),
            created_at: Utc::now(),
        };
        tables.stay_categories.insert(id, category.clone());
        category
    }

    pub fn create_expense_category(&self, label: impl Into<String>) -> ExpenseCategory {
        let mut tables = self.lock();
        let id = tables.allocate();
        let category = ExpenseCategory {
            id: ExpenseCategoryId(id),
            label: label.into(),
            created_at: Utc::now(),
        };
        tables.expense_categories.insert(id, category.clone());
        category
    }

    pub fn stay_category(&self, id: StayCategoryId) -> Result<StayCategory, StoreError> {
        self.lock()
            .stay_categories
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::StayCategoryNotFound(id))
    }

    pub fn expense_category(&self, id: ExpenseCategoryId) -> Result<ExpenseCategory, StoreError> {
        self.lock()
            .expense_categories
            .get(&id.0)
            .cloned()
            .ok_or(StoreError::ExpenseCategoryNotFound(id))
    }

    /// Stay categories are constrained: removal is refused while any stay,
    /// trashed or not, still references the category.
    pub fn remove_stay_category(&self, id: StayCategoryId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.stay_categories.contains_key(&id.0) {
            return Err(StoreError::StayCategoryNotFound(id));
        }
        let count = tables
            .stays
            .values()
            .filter(|stay| stay.stay_category_id == id)
            .count();
        if count > 0 {
            return Err(StoreError::CategoryInUse { count });
        }
        tables.stay_categories.remove(&id.0);
        Ok(())
    }

    /// Expense categories are set-null on destroy: referencing expenses lose
    /// the category but survive.
    pub fn remove_expense_category(&self, id: ExpenseCategoryId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.expense_categories.remove(&id.0).is_none() {
            return Err(StoreError::ExpenseCategoryNotFound(id));
        }
        for expense in tables.expenses.values_mut() {
            if expense.expense_category_id == Some(id) {
                expense.expense_category_id = None;
            }
        }
        Ok(())
    }

    pub fn list_properties(&self, visibility: Visibility) -> Vec<Property> {
        collect(&self.lock().properties, visibility, |_| true)
    }

    pub fn list_accommodations(&self, visibility: Visibility) -> Vec<Accommodation> {
        collect(&self.lock().accommodations, visibility, |_| true)
    }

    pub fn list_stays(&self, visibility: Visibility) -> Vec<Stay> {
        collect(&self.lock().stays, visibility, |_| true)
    }

    pub fn list_tenants(&self, visibility: Visibility) -> Vec<Tenant> {
        collect(&self.lock().tenants, visibility, |_| true)
    }

    pub fn list_expenses(&self, visibility: Visibility) -> Vec<Expense> {
        collect(&self.lock().expenses, visibility, |_| true)
    }

    pub fn list_stay_categories(&self) -> Vec<StayCategory> {
        self.lock().stay_categories.values().cloned().collect()
    }

    pub fn list_expense_categories(&self) -> Vec<ExpenseCategory> {
        self.lock().expense_categories.values().cloned().collect()
    }

    pub(crate) fn seed_property(&self, row: Property) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.properties.contains_key(&row.id.0) {
            return Err(StoreError::Conflict {
                field: "property id",
            });
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.properties.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_accommodation(&self, row: Accommodation) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.accommodations.contains_key(&row.id.0) {
            return Err(StoreError::Conflict {
                field: "accommodation id",
            });
        }
        if !tables.properties.contains_key(&row.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: row.property_id.0,
            });
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.accommodations.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_stay(&self, row: Stay) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.stays.contains_key(&row.id.0) {
            return Err(StoreError::Conflict { field: "stay id" });
        }
        if !tables.accommodations.contains_key(&row.accommodation_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Accommodation,
                id: row.accommodation_id.0,
            });
        }
        if !tables.stay_categories.contains_key(&row.stay_category_id.0) {
            return Err(StoreError::StayCategoryNotFound(row.stay_category_id));
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.stays.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_tenant(&self, mut row: Tenant) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.tenants.contains_key(&row.id.0) {
            return Err(StoreError::Conflict { field: "tenant id" });
        }
        if !tables.stays.contains_key(&row.stay_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Stay,
                id: row.stay_id.0,
            });
        }
        row.email = normalize_email(row.email);
        row.phone = row.phone.as_deref().and_then(contact::normalize_digits);
        row.cpf = row.cpf.as_deref().and_then(contact::normalize_digits);
        check_tenant_uniqueness(&tables, row.email.as_deref(), row.cpf.as_deref(), None)?;
        tables.next_id = tables.next_id.max(row.id.0);
        tables.tenants.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_expense(&self, row: Expense) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.expenses.contains_key(&row.id.0) {
            return Err(StoreError::Conflict { field: "expense id" });
        }
        if !tables.properties.contains_key(&row.property_id.0) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Property,
                id: row.property_id.0,
            });
        }
        if let Some(accommodation_id) = row.accommodation_id {
            if !tables.accommodations.contains_key(&accommodation_id.0) {
                return Err(StoreError::NotFound {
                    kind: EntityKind::Accommodation,
                    id: accommodation_id.0,
                });
            }
        }
        if let Some(category_id) = row.expense_category_id {
            if !tables.expense_categories.contains_key(&category_id.0) {
                return Err(StoreError::ExpenseCategoryNotFound(category_id));
            }
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.expenses.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_stay_category(&self, row: StayCategory) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.stay_categories.contains_key(&row.id.0) {
            return Err(StoreError::Conflict {
                field: "stay category id",
            });
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.stay_categories.insert(row.id.0, row);
        Ok(())
    }

    pub(crate) fn seed_expense_category(&self, row: ExpenseCategory) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.expense_categories.contains_key(&row.id.0) {
            return Err(StoreError::Conflict {
                field: "expense category id",
            });
        }
        tables.next_id = tables.next_id.max(row.id.0);
        tables.expense_categories.insert(row.id.0, row);
        Ok(())
    }
}

fn validate_stay_window(input: &StayInput) -> Result<(), StoreError> {
    if input.end_date < input.start_date {
        return Err(StoreError::NegativeStayRange);
    }
    if let Some(day) = input.due_date {
        if !(1..=31).contains(&day) {
            return Err(StoreError::DueDateOutOfRange(day));
        }
    }
    Ok(())
}

fn check_overlap(
    tables: &Tables,
    input: &StayInput,
    exclude: Option<StayId>,
) -> Result<(), StoreError> {
    let siblings = tables
        .stays
        .values()
        .filter(|stay| stay.accommodation_id == input.accommodation_id && !stay.is_trashed());
    if let Some(conflict) =
        schedule::find_conflict(siblings, input.start_date, input.end_date, exclude)
    {
        return Err(StoreError::StayOverlap {
            start: conflict.start_date,
            end: conflict.end_date,
        });
    }
    Ok(())
}

fn normalize_email(raw: Option<String>) -> Option<String> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Email and CPF are unique across the whole table, tombstoned rows
/// included: trashing a tenant does not release their contact identity.
fn check_tenant_uniqueness(
    tables: &Tables,
    email: Option<&str>,
    cpf: Option<&str>,
    exclude: Option<TenantId>,
) -> Result<(), StoreError> {
    for tenant in tables.tenants.values() {
        if exclude == Some(tenant.id) {
            continue;
        }
        if let (Some(candidate), Some(existing)) = (email, tenant.email.as_deref()) {
            if candidate.eq_ignore_ascii_case(existing) {
                return Err(StoreError::Conflict { field: "email" });
            }
        }
        if let (Some(candidate), Some(existing)) = (cpf, tenant.cpf.as_deref()) {
            if candidate == existing {
                return Err(StoreError::Conflict { field: "cpf" });
            }
        }
    }
    Ok(())
}

impl Datastore for MemoryStore {
    fn property(&self, id: PropertyId, visibility: Visibility) -> Result<Property, StoreError> {
        fetch(&self.lock().properties, id.0, visibility, EntityKind::Property)
    }

    fn accommodation(
        &self,
        id: AccommodationId,
        visibility: Visibility,
    ) -> Result<Accommodation, StoreError> {
        fetch(
            &self.lock().accommodations,
            id.0,
            visibility,
            EntityKind::Accommodation,
        )
    }

    fn stay(&self, id: StayId, visibility: Visibility) -> Result<Stay, StoreError> {
        fetch(&self.lock().stays, id.0, visibility, EntityKind::Stay)
    }

    fn tenant(&self, id: TenantId, visibility: Visibility) -> Result<Tenant, StoreError> {
        fetch(&self.lock().tenants, id.0, visibility, EntityKind::Tenant)
    }

    fn expense(&self, id: ExpenseId, visibility: Visibility) -> Result<Expense, StoreError> {
        fetch(&self.lock().expenses, id.0, visibility, EntityKind::Expense)
    }

    fn accommodations_of(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<Accommodation>, StoreError> {
        Ok(collect(&self.lock().accommodations, visibility, |row| {
            row.property_id == property
        }))
    }

    fn stays_of(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<Stay>, StoreError> {
        Ok(collect(&self.lock().stays, visibility, |row| {
            row.accommodation_id == accommodation
        }))
    }

    fn tenants_of(&self, stay: StayId, visibility: Visibility) -> Result<Vec<Tenant>, StoreError> {
        Ok(collect(&self.lock().tenants, visibility, |row| {
            row.stay_id == stay
        }))
    }

    fn property_expenses(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<Expense>, StoreError> {
        Ok(collect(&self.lock().expenses, visibility, |row| {
            row.property_id == property
        }))
    }

    fn accommodation_expenses(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<Expense>, StoreError> {
        Ok(collect(&self.lock().expenses, visibility, |row| {
            row.accommodation_id == Some(accommodation)
        }))
    }

    fn set_deleted(&self, target: EntityRef, at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let missing = StoreError::NotFound {
            kind: target.kind(),
            id: target.raw_id(),
        };
        match target {
            EntityRef::Property(id) => {
                tables.properties.get_mut(&id.0).ok_or(missing)?.deleted_at = at;
            }
            EntityRef::Accommodation(id) => {
                tables
                    .accommodations
                    .get_mut(&id.0)
                    .ok_or(missing)?
                    .deleted_at = at;
            }
            EntityRef::Stay(id) => {
                tables.stays.get_mut(&id.0).ok_or(missing)?.deleted_at = at;
            }
            EntityRef::Tenant(id) => {
                tables.tenants.get_mut(&id.0).ok_or(missing)?.deleted_at = at;
            }
            EntityRef::Expense(id) => {
                tables.expenses.get_mut(&id.0).ok_or(missing)?.deleted_at = at;
            }
        }
        Ok(())
    }

    fn purge(&self, target: EntityRef) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let missing = StoreError::NotFound {
            kind: target.kind(),
            id: target.raw_id(),
        };
        match target {
            EntityRef::Property(id) => {
                tables.properties.remove(&id.0).ok_or(missing)?;
                let owned: Vec<u64> = tables
                    .accommodations
                    .values()
                    .filter(|row| row.property_id == id)
                    .map(|row| row.id.0)
                    .collect();
                for accommodation_id in owned {
                    purge_accommodation(&mut tables, accommodation_id);
                }
                tables.expenses.retain(|_, row| row.property_id != id);
            }
            EntityRef::Accommodation(id) => {
                tables.accommodations.remove(&id.0).ok_or(missing)?;
                purge_accommodation_children(&mut tables, id);
            }
            EntityRef::Stay(id) => {
                tables.stays.remove(&id.0).ok_or(missing)?;
                tables.tenants.retain(|_, row| row.stay_id != id);
            }
            EntityRef::Tenant(id) => {
                tables.tenants.remove(&id.0).ok_or(missing)?;
            }
            EntityRef::Expense(id) => {
                tables.expenses.remove(&id.0).ok_or(missing)?;
            }
        }
        Ok(())
    }

    fn with_transaction<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError>,
    {
        let checkpoint = self.lock().clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self.lock() = checkpoint;
                Err(err)
            }
        }
    }
}

fn purge_accommodation(tables: &mut Tables, id: u64) {
    tables.accommodations.remove(&id);
    purge_accommodation_children(tables, AccommodationId(id));
}

fn purge_accommodation_children(tables: &mut Tables, id: AccommodationId) {
    let stay_ids: Vec<u64> = tables
        .stays
        .values()
        .filter(|row| row.accommodation_id == id)
        .map(|row| row.id.0)
        .collect();
    for stay_id in &stay_ids {
        tables.stays.remove(stay_id);
    }
    tables
        .tenants
        .retain(|_, row| !stay_ids.contains(&row.stay_id.0));
    tables.expenses.retain(|_, row| row.accommodation_id != Some(id));
}
