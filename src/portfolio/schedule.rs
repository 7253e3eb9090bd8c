//! Temporal resolution for stays: activity classification, active-stay
//! selection, overlap detection, and occupancy projection.
//!
//! Every function takes an explicit reference date. Callers capture "today"
//! once per top-level operation and thread the same date through the whole
//! view so classification stays consistent mid-computation.

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Stay, StayCategory, StayId, Tenant};

/// Where a stay sits relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StayStatus {
    Active,
    Past,
    Future,
}

impl StayStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Past => "past",
            Self::Future => "future",
        }
    }
}

/// Classify a stay against a reference date. The interval is inclusive on
/// both ends: a stay is active on its first and on its last day.
pub fn classify(stay: &Stay, on: NaiveDate) -> StayStatus {
    if stay.end_date < on {
        StayStatus::Past
    } else if stay.start_date > on {
        StayStatus::Future
    } else {
        StayStatus::Active
    }
}

/// First active stay under the caller-supplied ordering, if any.
///
/// The non-overlap rule is enforced at write time, not guaranteed by
/// storage, so multiple active stays are tolerated and the first one wins.
pub fn find_active_stay<'a, I>(stays: I, on: NaiveDate) -> Option<&'a Stay>
where
    I: IntoIterator<Item = &'a Stay>,
{
    stays
        .into_iter()
        .find(|stay| classify(stay, on) == StayStatus::Active)
}

impl Stay {
    pub fn is_active_on(&self, on: NaiveDate) -> bool {
        classify(self, on) == StayStatus::Active
    }
}

/// Closed-interval overlap: `start_a <= end_b && end_a >= start_b`. A stay
/// ending on day X and another starting on day X do overlap.
pub fn overlaps(
    start_a: NaiveDate,
    end_a: NaiveDate,
    start_b: NaiveDate,
    end_b: NaiveDate,
) -> bool {
    start_a <= end_b && end_a >= start_b
}

/// Find a stay whose interval collides with the candidate window, skipping
/// `exclude` so updates do not conflict with themselves.
pub fn find_conflict<'a, I>(
    existing: I,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<StayId>,
) -> Option<&'a Stay>
where
    I: IntoIterator<Item = &'a Stay>,
{
    existing
        .into_iter()
        .filter(|stay| exclude != Some(stay.id))
        .find(|stay| overlaps(stay.start_date, stay.end_date, start, end))
}

/// Pre-fetched rows an occupancy projection is computed from. Requiring the
/// data up front keeps "not loaded" unrepresentable: an empty slice always
/// means "fetched and empty".
#[derive(Debug, Clone, Copy)]
pub struct OccupancySources<'a> {
    pub stays: &'a [Stay],
    pub tenants: &'a [Tenant],
    pub categories: &'a [StayCategory],
}

/// Occupancy badge data for one accommodation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub occupied: bool,
    pub active_stay: Option<StayId>,
    pub active_tenant_count: usize,
    pub active_category: Option<String>,
    pub active_stay_end: Option<NaiveDate>,
}

impl Occupancy {
    pub fn vacant() -> Self {
        Self {
            occupied: false,
            active_stay: None,
            active_tenant_count: 0,
            active_category: None,
            active_stay_end: None,
        }
    }
}

/// Project occupancy from pre-fetched relations at a reference date.
pub fn occupancy(sources: &OccupancySources<'_>, on: NaiveDate) -> Occupancy {
    let Some(stay) = find_active_stay(sources.stays, on) else {
        return Occupancy::vacant();
    };

    let active_tenant_count = sources
        .tenants
        .iter()
        .filter(|tenant| tenant.stay_id == stay.id)
        .count();
    let active_category = sources
        .categories
        .iter()
        .find(|category| category.id == stay.stay_category_id)
        .map(|category| category.label.clone());

    Occupancy {
        occupied: true,
        active_stay: Some(stay.id),
        active_tenant_count,
        active_category,
        active_stay_end: Some(stay.end_date),
    }
}
