use std::cell::Cell;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::portfolio::cascade::CascadeEngine;
use crate::portfolio::domain::{
    AccommodationId, AccommodationInput, EntityRef, ExpenseCategoryId, ExpenseId, ExpenseInput,
    PropertyId, PropertyInput, StayCategoryId, StayId, StayInput, TenantId, TenantInput,
};
use crate::portfolio::ledger::Visibility;
use crate::portfolio::store::{Datastore, MemoryStore, StoreError};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn instant(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid instant")
}

/// Reference date every fixture stay is positioned around.
pub(super) fn today() -> NaiveDate {
    date(2025, 6, 15)
}

pub(super) fn property_input(label: &str, address: &str) -> PropertyInput {
    PropertyInput {
        label: label.to_string(),
        address: address.to_string(),
        description: None,
    }
}

pub(super) fn accommodation_input(property_id: PropertyId, label: &str) -> AccommodationInput {
    AccommodationInput {
        property_id,
        label: label.to_string(),
    }
}

pub(super) fn stay_input(
    accommodation_id: AccommodationId,
    stay_category_id: StayCategoryId,
    start: NaiveDate,
    end: NaiveDate,
) -> StayInput {
    StayInput {
        accommodation_id,
        stay_category_id,
        start_date: start,
        end_date: end,
        due_date: Some(5),
        price_cents: 150_000,
    }
}

pub(super) fn tenant_input(stay_id: StayId, name: &str) -> TenantInput {
    TenantInput {
        stay_id,
        name: name.to_string(),
        email: None,
        phone: None,
        cpf: None,
    }
}

pub(super) fn expense_input(
    property_id: PropertyId,
    accommodation_id: Option<AccommodationId>,
    category_id: Option<ExpenseCategoryId>,
    label: &str,
) -> ExpenseInput {
    ExpenseInput {
        property_id,
        accommodation_id,
        expense_category_id: category_id,
        label: label.to_string(),
        price_cents: 80_000,
        date: date(2025, 5, 10),
        description: None,
    }
}

/// One property with two accommodations; the first hosts a past and an
/// active stay (one tenant each) and carries an expense, the property has a
/// direct expense, and a second empty property sits alongside.
pub(super) struct Fixture {
    pub(super) store: MemoryStore,
    pub(super) engine: CascadeEngine<MemoryStore>,
    pub(super) property: PropertyId,
    pub(super) other_property: PropertyId,
    pub(super) accommodation: AccommodationId,
    pub(super) sibling_accommodation: AccommodationId,
    pub(super) active_stay: StayId,
    pub(super) past_stay: StayId,
    pub(super) tenant: TenantId,
    pub(super) past_tenant: TenantId,
    pub(super) property_expense: ExpenseId,
    pub(super) accommodation_expense: ExpenseId,
    pub(super) season_category: StayCategoryId,
}

impl Fixture {
    pub(super) fn subtree(&self) -> Vec<EntityRef> {
        vec![
            EntityRef::Property(self.property),
            EntityRef::Accommodation(self.accommodation),
            EntityRef::Accommodation(self.sibling_accommodation),
            EntityRef::Stay(self.active_stay),
            EntityRef::Stay(self.past_stay),
            EntityRef::Tenant(self.tenant),
            EntityRef::Tenant(self.past_tenant),
            EntityRef::Expense(self.property_expense),
            EntityRef::Expense(self.accommodation_expense),
        ]
    }

    pub(super) fn is_trashed(&self, target: EntityRef) -> bool {
        let store = &self.store;
        let found = match target {
            EntityRef::Property(id) => store.property(id, Visibility::OnlyTrashed).is_ok(),
            EntityRef::Accommodation(id) => {
                store.accommodation(id, Visibility::OnlyTrashed).is_ok()
            }
            EntityRef::Stay(id) => store.stay(id, Visibility::OnlyTrashed).is_ok(),
            EntityRef::Tenant(id) => store.tenant(id, Visibility::OnlyTrashed).is_ok(),
            EntityRef::Expense(id) => store.expense(id, Visibility::OnlyTrashed).is_ok(),
        };
        found
    }
}

pub(super) fn fixture() -> Fixture {
    let store = MemoryStore::new();

    let season_category = store.create_stay_category("Season").id;
    let maintenance = store.create_expense_category("Maintenance").id;

    let property = store
        .create_property(property_input("Casa Azul", "Rua das Flores 12"))
        .expect("property created")
        .id;
    let other_property = store
        .create_property(property_input("Sobrado", "Av. Central 4"))
        .expect("property created")
        .id;

    let accommodation = store
        .create_accommodation(accommodation_input(property, "Suite 1"))
        .expect("accommodation created")
        .id;
    let sibling_accommodation = store
        .create_accommodation(accommodation_input(property, "Suite 2"))
        .expect("accommodation created")
        .id;

    let active_stay = store
        .create_stay(stay_input(
            accommodation,
            season_category,
            date(2025, 6, 1),
            date(2025, 6, 30),
        ))
        .expect("active stay created")
        .id;
    let past_stay = store
        .create_stay(stay_input(
            accommodation,
            season_category,
            date(2025, 1, 1),
            date(2025, 1, 31),
        ))
        .expect("past stay created")
        .id;

    let tenant = store
        .create_tenant(TenantInput {
            email: Some("ana@example.com".to_string()),
            phone: Some("(11) 91234-5678".to_string()),
            cpf: Some("123.456.789-01".to_string()),
            ..tenant_input(active_stay, "Ana Souza")
        })
        .expect("tenant created")
        .id;
    let past_tenant = store
        .create_tenant(tenant_input(past_stay, "Bruno Lima"))
        .expect("tenant created")
        .id;

    let property_expense = store
        .create_expense(expense_input(property, None, Some(maintenance), "IPTU"))
        .expect("expense created")
        .id;
    let accommodation_expense = store
        .create_expense(expense_input(
            property,
            Some(accommodation),
            Some(maintenance),
            "Repairs",
        ))
        .expect("expense created")
        .id;

    let engine = CascadeEngine::new(store.clone());

    Fixture {
        store,
        engine,
        property,
        other_property,
        accommodation,
        sibling_accommodation,
        active_stay,
        past_stay,
        tenant,
        past_tenant,
        property_expense,
        accommodation_expense,
        season_category,
    }
}

/// Store double that fails tombstone writes once a budget is spent, to
/// exercise mid-cascade rollback.
pub(super) struct FlakyStore {
    inner: MemoryStore,
    remaining_writes: Cell<usize>,
}

impl FlakyStore {
    pub(super) fn new(inner: MemoryStore, budget: usize) -> Self {
        Self {
            inner,
            remaining_writes: Cell::new(budget),
        }
    }
}

impl Datastore for FlakyStore {
    fn property(
        &self,
        id: PropertyId,
        visibility: Visibility,
    ) -> Result<crate::portfolio::domain::Property, StoreError> {
        self.inner.property(id, visibility)
    }

    fn accommodation(
        &self,
        id: AccommodationId,
        visibility: Visibility,
    ) -> Result<crate::portfolio::domain::Accommodation, StoreError> {
        self.inner.accommodation(id, visibility)
    }

    fn stay(
        &self,
        id: StayId,
        visibility: Visibility,
    ) -> Result<crate::portfolio::domain::Stay, StoreError> {
        self.inner.stay(id, visibility)
    }

    fn tenant(
        &self,
        id: TenantId,
        visibility: Visibility,
    ) -> Result<crate::portfolio::domain::Tenant, StoreError> {
        self.inner.tenant(id, visibility)
    }

    fn expense(
        &self,
        id: ExpenseId,
        visibility: Visibility,
    ) -> Result<crate::portfolio::domain::Expense, StoreError> {
        self.inner.expense(id, visibility)
    }

    fn accommodations_of(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<crate::portfolio::domain::Accommodation>, StoreError> {
        self.inner.accommodations_of(property, visibility)
    }

    fn stays_of(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<crate::portfolio::domain::Stay>, StoreError> {
        self.inner.stays_of(accommodation, visibility)
    }

    fn tenants_of(
        &self,
        stay: StayId,
        visibility: Visibility,
    ) -> Result<Vec<crate::portfolio::domain::Tenant>, StoreError> {
        self.inner.tenants_of(stay, visibility)
    }

    fn property_expenses(
        &self,
        property: PropertyId,
        visibility: Visibility,
    ) -> Result<Vec<crate::portfolio::domain::Expense>, StoreError> {
        self.inner.property_expenses(property, visibility)
    }

    fn accommodation_expenses(
        &self,
        accommodation: AccommodationId,
        visibility: Visibility,
    ) -> Result<Vec<crate::portfolio::domain::Expense>, StoreError> {
        self.inner.accommodation_expenses(accommodation, visibility)
    }

    fn set_deleted(
        &self,
        target: EntityRef,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let remaining = self.remaining_writes.get();
        if remaining == 0 {
            return Err(StoreError::Unavailable("write budget exhausted".to_string()));
        }
        self.remaining_writes.set(remaining - 1);
        self.inner.set_deleted(target, at)
    }

    fn purge(&self, target: EntityRef) -> Result<(), StoreError> {
        self.inner.purge(target)
    }

    fn with_transaction<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError>,
    {
        let checkpoint = self.inner.checkpoint();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.inner.restore_from(&checkpoint);
                Err(err)
            }
        }
    }
}
