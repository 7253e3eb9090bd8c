use super::common::{
    accommodation_input, date, expense_input, fixture, property_input, stay_input, tenant_input,
};
use crate::portfolio::domain::{EntityRef, StayInput, TenantInput};
use crate::portfolio::ledger::{SoftDeletable, Visibility};
use crate::portfolio::store::{Datastore, MemoryStore, StoreError};

#[test]
fn visibility_modes_partition_every_kind() {
    let fx = fixture();
    fx.engine
        .soft_delete(EntityRef::Accommodation(fx.accommodation))
        .expect("cascade succeeds");

    assert_eq!(fx.store.list_accommodations(Visibility::Default).len(), 1);
    assert_eq!(
        fx.store.list_accommodations(Visibility::OnlyTrashed).len(),
        1
    );
    assert_eq!(fx.store.list_accommodations(Visibility::WithTrashed).len(), 2);

    assert_eq!(fx.store.list_stays(Visibility::Default).len(), 0);
    assert_eq!(fx.store.list_stays(Visibility::OnlyTrashed).len(), 2);
    assert_eq!(fx.store.list_tenants(Visibility::OnlyTrashed).len(), 2);
    assert_eq!(fx.store.list_expenses(Visibility::Default).len(), 1);
    assert_eq!(fx.store.list_expenses(Visibility::OnlyTrashed).len(), 1);
}

#[test]
fn trashed_parents_resolve_through_soft_foreign_keys() {
    let fx = fixture();
    fx.engine
        .soft_delete(EntityRef::Property(fx.property))
        .expect("cascade succeeds");

    // The trashed stay still reaches its trashed accommodation and from
    // there the trashed property.
    let stay = fx
        .store
        .stay(fx.active_stay, Visibility::WithTrashed)
        .expect("stay resolves");
    let accommodation = fx
        .store
        .accommodation(stay.accommodation_id, Visibility::WithTrashed)
        .expect("trashed accommodation resolves");
    assert!(accommodation.is_trashed());
    let property = fx
        .store
        .property(accommodation.property_id, Visibility::WithTrashed)
        .expect("trashed property resolves");
    assert!(property.is_trashed());

    // A default-scoped lookup of the same rows reports not found.
    assert!(matches!(
        fx.store.accommodation(stay.accommodation_id, Visibility::Default),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn tenant_contact_fields_are_normalized_on_write() {
    let fx = fixture();
    let tenant = fx
        .store
        .create_tenant(TenantInput {
            email: Some("  carla@example.com ".to_string()),
            phone: Some("+55 (21) 99876-5432".to_string()),
            cpf: Some("987.654.321-00".to_string()),
            ..tenant_input(fx.past_stay, "Carla Nunes")
        })
        .expect("tenant created");

    assert_eq!(tenant.email.as_deref(), Some("carla@example.com"));
    assert_eq!(tenant.phone.as_deref(), Some("5521998765432"));
    assert_eq!(tenant.cpf.as_deref(), Some("98765432100"));
}

#[test]
fn empty_contact_fields_normalize_to_absence() {
    let fx = fixture();
    let tenant = fx
        .store
        .create_tenant(TenantInput {
            email: Some("   ".to_string()),
            phone: Some("".to_string()),
            cpf: Some("".to_string()),
            ..tenant_input(fx.past_stay, "Diego Prado")
        })
        .expect("tenant created");

    assert_eq!(tenant.email, None);
    assert_eq!(tenant.phone, None);
    assert_eq!(tenant.cpf, None);
}

#[test]
fn tenant_uniqueness_spans_trashed_rows() {
    let fx = fixture();
    fx.engine
        .soft_delete(EntityRef::Tenant(fx.tenant))
        .expect("tenant trashed");

    // The trashed tenant still owns ana@example.com and the CPF.
    match fx.store.create_tenant(TenantInput {
        email: Some("ANA@example.com".to_string()),
        ..tenant_input(fx.past_stay, "Impostora")
    }) {
        Err(StoreError::Conflict { field: "email" }) => {}
        other => panic!("expected an email conflict, got {other:?}"),
    }
    match fx.store.create_tenant(TenantInput {
        cpf: Some("12345678901".to_string()),
        ..tenant_input(fx.past_stay, "Impostora")
    }) {
        Err(StoreError::Conflict { field: "cpf" }) => {}
        other => panic!("expected a cpf conflict, got {other:?}"),
    }
}

#[test]
fn tenant_update_does_not_conflict_with_itself() {
    let fx = fixture();
    let updated = fx
        .store
        .update_tenant(
            fx.tenant,
            TenantInput {
                email: Some("ana@example.com".to_string()),
                phone: Some("11 2345-6789".to_string()),
                cpf: Some("123.456.789-01".to_string()),
                ..tenant_input(fx.active_stay, "Ana Souza")
            },
        )
        .expect("update keeps its own email and cpf");
    assert_eq!(updated.phone.as_deref(), Some("1123456789"));
}

#[test]
fn overlapping_stays_are_rejected_at_write_time() {
    let fx = fixture();

    // Shares the active stay's last day.
    match fx.store.create_stay(stay_input(
        fx.accommodation,
        fx.season_category,
        date(2025, 6, 30),
        date(2025, 7, 15),
    )) {
        Err(StoreError::StayOverlap { start, end }) => {
            assert_eq!(start, date(2025, 6, 1));
            assert_eq!(end, date(2025, 6, 30));
        }
        other => panic!("expected an overlap rejection, got {other:?}"),
    }

    // Starting the day after the active stay ends is fine.
    fx.store
        .create_stay(stay_input(
            fx.accommodation,
            fx.season_category,
            date(2025, 7, 1),
            date(2025, 7, 15),
        ))
        .expect("adjacent-but-disjoint stay is accepted");
}

#[test]
fn trashed_stays_do_not_block_new_bookings() {
    let fx = fixture();
    fx.engine
        .soft_delete(EntityRef::Stay(fx.active_stay))
        .expect("stay trashed");

    fx.store
        .create_stay(stay_input(
            fx.accommodation,
            fx.season_category,
            date(2025, 6, 10),
            date(2025, 6, 20),
        ))
        .expect("window freed by the trashed stay");
}

#[test]
fn stay_updates_check_overlap_excluding_themselves() {
    let fx = fixture();

    // Growing the active stay by two weeks only collides with itself.
    fx.store
        .update_stay(
            fx.active_stay,
            stay_input(
                fx.accommodation,
                fx.season_category,
                date(2025, 6, 1),
                date(2025, 7, 14),
            ),
        )
        .expect("extension is accepted");

    // Stretching the past stay into June collides with the active one.
    match fx.store.update_stay(
        fx.past_stay,
        stay_input(
            fx.accommodation,
            fx.season_category,
            date(2025, 1, 1),
            date(2025, 6, 1),
        ),
    ) {
        Err(StoreError::StayOverlap { .. }) => {}
        other => panic!("expected an overlap rejection, got {other:?}"),
    }
}

#[test]
fn stay_window_validation_rejects_bad_input() {
    let fx = fixture();

    match fx.store.create_stay(stay_input(
        fx.accommodation,
        fx.season_category,
        date(2025, 8, 10),
        date(2025, 8, 1),
    )) {
        Err(StoreError::NegativeStayRange) => {}
        other => panic!("expected a range rejection, got {other:?}"),
    }

    match fx.store.create_stay(StayInput {
        due_date: Some(32),
        ..stay_input(
            fx.accommodation,
            fx.season_category,
            date(2025, 8, 1),
            date(2025, 8, 10),
        )
    }) {
        Err(StoreError::DueDateOutOfRange(32)) => {}
        other => panic!("expected a due-date rejection, got {other:?}"),
    }
}

#[test]
fn updates_through_the_default_scope_miss_trashed_rows() {
    let fx = fixture();
    fx.engine
        .soft_delete(EntityRef::Property(fx.property))
        .expect("cascade succeeds");

    match fx
        .store
        .update_property(fx.property, property_input("Renamed", "Nowhere 1"))
    {
        Err(StoreError::NotFound { .. }) => {}
        other => panic!("expected not found for a trashed row, got {other:?}"),
    }
}

#[test]
fn destroying_an_expense_category_detaches_its_expenses() {
    let fx = fixture();
    let category = fx
        .store
        .expense_category(
            fx.store
                .expense(fx.property_expense, Visibility::Default)
                .expect("expense loads")
                .expense_category_id
                .expect("fixture expense has a category"),
        )
        .expect("category loads");

    fx.store
        .remove_expense_category(category.id)
        .expect("category removed");

    let expense = fx
        .store
        .expense(fx.property_expense, Visibility::Default)
        .expect("expense survives");
    assert_eq!(expense.expense_category_id, None);
}

#[test]
fn stay_categories_cannot_be_removed_while_referenced() {
    let fx = fixture();

    match fx.store.remove_stay_category(fx.season_category) {
        Err(StoreError::CategoryInUse { count: 2 }) => {}
        other => panic!("expected the category to be busy, got {other:?}"),
    }

    let spare = fx.store.create_stay_category("Spare");
    fx.store
        .remove_stay_category(spare.id)
        .expect("unused category removed");
}

#[test]
fn creating_children_under_missing_parents_fails() {
    let store = MemoryStore::new();

    match store.create_accommodation(accommodation_input(
        crate::portfolio::domain::PropertyId(1),
        "Orphan",
    )) {
        Err(StoreError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn expenses_validate_their_references() {
    let fx = fixture();

    match fx.store.create_expense(expense_input(
        fx.property,
        None,
        Some(crate::portfolio::domain::ExpenseCategoryId(999)),
        "Ghost",
    )) {
        Err(StoreError::ExpenseCategoryNotFound(_)) => {}
        other => panic!("expected a category error, got {other:?}"),
    }
}

#[test]
fn transactions_roll_back_on_error() {
    let fx = fixture();
    let result: Result<(), StoreError> = fx.store.with_transaction(|store| {
        store.set_deleted(EntityRef::Property(fx.property), Some(chrono::Utc::now()))?;
        Err(StoreError::Unavailable("forced".to_string()))
    });

    assert!(result.is_err());
    assert!(fx
        .store
        .property(fx.property, Visibility::Default)
        .is_ok(), "the tombstone write was rolled back");
}
