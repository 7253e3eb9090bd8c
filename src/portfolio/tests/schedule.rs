use super::common::{date, fixture, today};
use crate::portfolio::domain::{Stay, StayId};
use crate::portfolio::ledger::Visibility;
use crate::portfolio::schedule::{
    classify, find_active_stay, find_conflict, occupancy, overlaps, Occupancy, OccupancySources,
    StayStatus,
};
use crate::portfolio::store::Datastore;

fn span(id: u64, start: (i32, u32, u32), end: (i32, u32, u32)) -> Stay {
    Stay {
        id: StayId(id),
        accommodation_id: crate::portfolio::domain::AccommodationId(1),
        stay_category_id: crate::portfolio::domain::StayCategoryId(1),
        start_date: date(start.0, start.1, start.2),
        end_date: date(end.0, end.1, end.2),
        due_date: None,
        price_cents: 100_000,
        created_at: chrono::Utc::now(),
        deleted_at: None,
    }
}

#[test]
fn classification_is_inclusive_on_both_ends() {
    let stay = span(1, (2024, 1, 1), (2024, 1, 31));

    assert_eq!(classify(&stay, date(2024, 1, 1)), StayStatus::Active);
    assert_eq!(classify(&stay, date(2024, 1, 31)), StayStatus::Active);
    assert_eq!(classify(&stay, date(2023, 12, 31)), StayStatus::Future);
    assert_eq!(classify(&stay, date(2024, 2, 1)), StayStatus::Past);
}

#[test]
fn find_active_stay_returns_the_first_match() {
    let stays = vec![
        span(1, (2024, 1, 1), (2024, 1, 5)),
        span(2, (2024, 1, 4), (2024, 1, 10)),
        span(3, (2024, 2, 1), (2024, 2, 10)),
    ];

    // Two stays cover Jan 4 (the write-time rule was violated upstream);
    // the resolver tolerates it and takes the first.
    let active = find_active_stay(&stays, date(2024, 1, 4)).expect("one stay is active");
    assert_eq!(active.id, StayId(1));

    assert!(find_active_stay(&stays, date(2024, 3, 1)).is_none());
}

#[test]
fn shared_boundary_days_count_as_overlap() {
    assert!(overlaps(
        date(2024, 1, 1),
        date(2024, 1, 10),
        date(2024, 1, 10),
        date(2024, 1, 20),
    ));
    assert!(!overlaps(
        date(2024, 1, 1),
        date(2024, 1, 9),
        date(2024, 1, 10),
        date(2024, 1, 20),
    ));
}

#[test]
fn conflicts_skip_the_excluded_stay() {
    let stays = vec![span(1, (2024, 1, 1), (2024, 1, 10))];

    let conflict = find_conflict(&stays, date(2024, 1, 10), date(2024, 1, 20), None);
    assert_eq!(conflict.map(|stay| stay.id), Some(StayId(1)));

    // Updating stay 1 against its own window is not a conflict.
    let conflict = find_conflict(&stays, date(2024, 1, 5), date(2024, 1, 12), Some(StayId(1)));
    assert!(conflict.is_none());
}

#[test]
fn occupancy_projects_the_active_stay() {
    let fx = fixture();
    let stays = fx
        .store
        .stays_of(fx.accommodation, Visibility::Default)
        .expect("stays load");
    let mut tenants = Vec::new();
    for stay in &stays {
        tenants.extend(
            fx.store
                .tenants_of(stay.id, Visibility::Default)
                .expect("tenants load"),
        );
    }
    let categories = fx.store.list_stay_categories();

    let sources = OccupancySources {
        stays: &stays,
        tenants: &tenants,
        categories: &categories,
    };
    let badge = occupancy(&sources, today());

    assert!(badge.occupied);
    assert_eq!(badge.active_stay, Some(fx.active_stay));
    assert_eq!(badge.active_tenant_count, 1);
    assert_eq!(badge.active_category.as_deref(), Some("Season"));
    assert_eq!(badge.active_stay_end, Some(date(2025, 6, 30)));
}

#[test]
fn occupancy_defaults_when_nothing_is_active() {
    let sources = OccupancySources {
        stays: &[],
        tenants: &[],
        categories: &[],
    };
    let badge = occupancy(&sources, today());

    assert_eq!(badge, Occupancy::vacant());
    assert!(!badge.occupied);
    assert_eq!(badge.active_tenant_count, 0);
    assert_eq!(badge.active_category, None);
    assert_eq!(badge.active_stay_end, None);
}

#[test]
fn tenants_of_other_stays_do_not_count_toward_occupancy() {
    let fx = fixture();
    let stays = fx
        .store
        .stays_of(fx.accommodation, Visibility::Default)
        .expect("stays load");
    let tenants = fx.store.list_tenants(Visibility::Default);
    let categories = fx.store.list_stay_categories();

    let sources = OccupancySources {
        stays: &stays,
        tenants: &tenants,
        categories: &categories,
    };
    let badge = occupancy(&sources, today());

    // The past stay's tenant is loaded but not active.
    assert_eq!(badge.active_tenant_count, 1);
}
