//! Read side of the trash screen: list tombstoned rows of one kind with
//! kind-specific search, an allow-listed sort, and fixed-size pages.
//!
//! Each kind carries its own strategy (search fields and sort keys) through
//! one private trait, so dispatch is by enum rather than by string-matching
//! on model names. Relations on the views are loaded with-trashed: a trashed
//! stay still shows its — possibly also trashed — accommodation and property.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Accommodation, Expense, ExpenseCategory, Property, Stay, StayCategory, Tenant,
};
use super::ledger::Visibility;
use super::store::{Datastore, MemoryStore};

pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Which trash partition to list. Parsing never fails: unknown kinds fall
/// back to the property listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashKind {
    Properties,
    Accommodations,
    Stays,
    Tenants,
    Expenses,
}

impl TrashKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accommodations" => Self::Accommodations,
            "stays" => Self::Stays,
            "tenants" => Self::Tenants,
            "expenses" => Self::Expenses,
            _ => Self::Properties,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Accommodations => "accommodations",
            Self::Stays => "stays",
            Self::Tenants => "tenants",
            Self::Expenses => "expenses",
        }
    }
}

/// Sort direction; anything that is not `asc` falls back to descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrashQuery {
    pub kind: TrashKind,
    pub search: String,
    pub sort_by: String,
    pub sort_dir: SortDirection,
    /// 1-based page number.
    pub page: usize,
}

impl Default for TrashQuery {
    fn default() -> Self {
        Self {
            kind: TrashKind::Properties,
            search: String::new(),
            sort_by: String::new(),
            sort_dir: SortDirection::Desc,
            page: 1,
        }
    }
}

impl TrashQuery {
    pub fn for_kind(kind: TrashKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub last_page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashedProperty {
    pub property: Property,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashedAccommodation {
    pub accommodation: Accommodation,
    pub property: Option<Property>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashedStay {
    pub stay: Stay,
    pub accommodation: Option<Accommodation>,
    pub property: Option<Property>,
    pub category: Option<StayCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashedTenant {
    pub tenant: Tenant,
    pub stay: Option<Stay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrashedExpense {
    pub expense: Expense,
    pub property: Option<Property>,
    pub accommodation: Option<Accommodation>,
    pub category: Option<ExpenseCategory>,
}

/// One page of trash for a single kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "page")]
pub enum TrashListing {
    Properties(TrashPage<TrashedProperty>),
    Accommodations(TrashPage<TrashedAccommodation>),
    Stays(TrashPage<TrashedStay>),
    Tenants(TrashPage<TrashedTenant>),
    Expenses(TrashPage<TrashedExpense>),
}

impl TrashListing {
    pub fn total(&self) -> usize {
        match self {
            Self::Properties(page) => page.total,
            Self::Accommodations(page) => page.total,
            Self::Stays(page) => page.total,
            Self::Tenants(page) => page.total,
            Self::Expenses(page) => page.total,
        }
    }
}

/// Per-kind listing strategy: search predicate and sort allow-list.
trait TrashRow {
    fn matches(&self, needle: &str) -> bool;
    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering>;
    fn trashed_at(&self) -> Option<DateTime<Utc>>;
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn optional_label(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

impl TrashRow for TrashedProperty {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.property.label, needle) || contains(&self.property.address, needle)
    }

    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering> {
        match field {
            "label" => Some(|a, b| a.property.label.cmp(&b.property.label)),
            "address" => Some(|a, b| a.property.address.cmp(&b.property.address)),
            "created_at" => Some(|a, b| a.property.created_at.cmp(&b.property.created_at)),
            "deleted_at" => Some(|a, b| a.property.deleted_at.cmp(&b.property.deleted_at)),
            _ => None,
        }
    }

    fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.property.deleted_at
    }
}

impl TrashRow for TrashedAccommodation {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.accommodation.label, needle)
    }

    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering> {
        match field {
            "label" => Some(|a, b| a.accommodation.label.cmp(&b.accommodation.label)),
            "property" => Some(|a, b| {
                optional_label(a.property.as_ref().map(|p| p.label.as_str()))
                    .cmp(optional_label(b.property.as_ref().map(|p| p.label.as_str())))
            }),
            "created_at" => {
                Some(|a, b| a.accommodation.created_at.cmp(&b.accommodation.created_at))
            }
            "deleted_at" => {
                Some(|a, b| a.accommodation.deleted_at.cmp(&b.accommodation.deleted_at))
            }
            _ => None,
        }
    }

    fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.accommodation.deleted_at
    }
}

impl TrashRow for TrashedStay {
    /// Stays are searched through their accommodation's label.
    fn matches(&self, needle: &str) -> bool {
        self.accommodation
            .as_ref()
            .is_some_and(|accommodation| contains(&accommodation.label, needle))
    }

    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering> {
        match field {
            "category" => Some(|a, b| {
                optional_label(a.category.as_ref().map(|c| c.label.as_str()))
                    .cmp(optional_label(b.category.as_ref().map(|c| c.label.as_str())))
            }),
            "property" => Some(|a, b| {
                optional_label(a.property.as_ref().map(|p| p.label.as_str()))
                    .cmp(optional_label(b.property.as_ref().map(|p| p.label.as_str())))
            }),
            "accommodation" => Some(|a, b| {
                optional_label(a.accommodation.as_ref().map(|x| x.label.as_str())).cmp(
                    optional_label(b.accommodation.as_ref().map(|x| x.label.as_str())),
                )
            }),
            "start_date" => Some(|a, b| a.stay.start_date.cmp(&b.stay.start_date)),
            "end_date" => Some(|a, b| a.stay.end_date.cmp(&b.stay.end_date)),
            "due_date" => Some(|a, b| a.stay.due_date.cmp(&b.stay.due_date)),
            "price" => Some(|a, b| a.stay.price_cents.cmp(&b.stay.price_cents)),
            "created_at" => Some(|a, b| a.stay.created_at.cmp(&b.stay.created_at)),
            "deleted_at" => Some(|a, b| a.stay.deleted_at.cmp(&b.stay.deleted_at)),
            _ => None,
        }
    }

    fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.stay.deleted_at
    }
}

impl TrashRow for TrashedTenant {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.tenant.name, needle)
            || self
                .tenant
                .email
                .as_deref()
                .is_some_and(|email| contains(email, needle))
            || self
                .tenant
                .cpf
                .as_deref()
                .is_some_and(|cpf| contains(cpf, needle))
    }

    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering> {
        match field {
            "name" => Some(|a, b| a.tenant.name.cmp(&b.tenant.name)),
            "email" => Some(|a, b| a.tenant.email.cmp(&b.tenant.email)),
            "cpf" => Some(|a, b| a.tenant.cpf.cmp(&b.tenant.cpf)),
            "created_at" => Some(|a, b| a.tenant.created_at.cmp(&b.tenant.created_at)),
            "deleted_at" => Some(|a, b| a.tenant.deleted_at.cmp(&b.tenant.deleted_at)),
            _ => None,
        }
    }

    fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.tenant.deleted_at
    }
}

impl TrashRow for TrashedExpense {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.expense.label, needle)
            || self
                .expense
                .description
                .as_deref()
                .is_some_and(|description| contains(description, needle))
    }

    fn comparator(field: &str) -> Option<fn(&Self, &Self) -> Ordering> {
        match field {
            "label" => Some(|a, b| a.expense.label.cmp(&b.expense.label)),
            "description" => Some(|a, b| a.expense.description.cmp(&b.expense.description)),
            "price" => Some(|a, b| a.expense.price_cents.cmp(&b.expense.price_cents)),
            "category" => Some(|a, b| {
                optional_label(a.category.as_ref().map(|c| c.label.as_str()))
                    .cmp(optional_label(b.category.as_ref().map(|c| c.label.as_str())))
            }),
            "property" => Some(|a, b| {
                optional_label(a.property.as_ref().map(|p| p.label.as_str()))
                    .cmp(optional_label(b.property.as_ref().map(|p| p.label.as_str())))
            }),
            "accommodation" => Some(|a, b| {
                optional_label(a.accommodation.as_ref().map(|x| x.label.as_str())).cmp(
                    optional_label(b.accommodation.as_ref().map(|x| x.label.as_str())),
                )
            }),
            "created_at" => Some(|a, b| a.expense.created_at.cmp(&b.expense.created_at)),
            "deleted_at" => Some(|a, b| a.expense.deleted_at.cmp(&b.expense.deleted_at)),
            _ => None,
        }
    }

    fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.expense.deleted_at
    }
}

/// Lists the trash partition of any kind over a [`MemoryStore`].
pub struct TrashQueryService {
    store: MemoryStore,
    per_page: usize,
}

impl TrashQueryService {
    pub fn new(store: MemoryStore) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: MemoryStore, per_page: usize) -> Self {
        Self {
            store,
            per_page: per_page.max(1),
        }
    }

    pub fn list(&self, query: &TrashQuery) -> TrashListing {
        match query.kind {
            TrashKind::Properties => {
                TrashListing::Properties(self.assemble(self.trashed_properties(), query))
            }
            TrashKind::Accommodations => {
                TrashListing::Accommodations(self.assemble(self.trashed_accommodations(), query))
            }
            TrashKind::Stays => TrashListing::Stays(self.assemble(self.trashed_stays(), query)),
            TrashKind::Tenants => {
                TrashListing::Tenants(self.assemble(self.trashed_tenants(), query))
            }
            TrashKind::Expenses => {
                TrashListing::Expenses(self.assemble(self.trashed_expenses(), query))
            }
        }
    }

    fn trashed_properties(&self) -> Vec<TrashedProperty> {
        self.store
            .list_properties(Visibility::OnlyTrashed)
            .into_iter()
            .map(|property| TrashedProperty { property })
            .collect()
    }

    fn trashed_accommodations(&self) -> Vec<TrashedAccommodation> {
        self.store
            .list_accommodations(Visibility::OnlyTrashed)
            .into_iter()
            .map(|accommodation| {
                let property = self
                    .store
                    .property(accommodation.property_id, Visibility::WithTrashed)
                    .ok();
                TrashedAccommodation {
                    accommodation,
                    property,
                }
            })
            .collect()
    }

    fn trashed_stays(&self) -> Vec<TrashedStay> {
        self.store
            .list_stays(Visibility::OnlyTrashed)
            .into_iter()
            .map(|stay| {
                let accommodation = self
                    .store
                    .accommodation(stay.accommodation_id, Visibility::WithTrashed)
                    .ok();
                let property = accommodation.as_ref().and_then(|accommodation| {
                    self.store
                        .property(accommodation.property_id, Visibility::WithTrashed)
                        .ok()
                });
                let category = self.store.stay_category(stay.stay_category_id).ok();
                TrashedStay {
                    stay,
                    accommodation,
                    property,
                    category,
                }
            })
            .collect()
    }

    fn trashed_tenants(&self) -> Vec<TrashedTenant> {
        self.store
            .list_tenants(Visibility::OnlyTrashed)
            .into_iter()
            .map(|tenant| {
                let stay = self.store.stay(tenant.stay_id, Visibility::WithTrashed).ok();
                TrashedTenant { tenant, stay }
            })
            .collect()
    }

    fn trashed_expenses(&self) -> Vec<TrashedExpense> {
        self.store
            .list_expenses(Visibility::OnlyTrashed)
            .into_iter()
            .map(|expense| {
                let property = self
                    .store
                    .property(expense.property_id, Visibility::WithTrashed)
                    .ok();
                let accommodation = expense.accommodation_id.and_then(|id| {
                    self.store.accommodation(id, Visibility::WithTrashed).ok()
                });
                let category = expense
                    .expense_category_id
                    .and_then(|id| self.store.expense_category(id).ok());
                TrashedExpense {
                    expense,
                    property,
                    accommodation,
                    category,
                }
            })
            .collect()
    }

    fn assemble<T: TrashRow>(&self, mut rows: Vec<T>, query: &TrashQuery) -> TrashPage<T> {
        let needle = query.search.trim().to_lowercase();
        if !needle.is_empty() {
            rows.retain(|row| row.matches(&needle));
        }

        match T::comparator(query.sort_by.trim()) {
            Some(compare) => rows.sort_by(|a, b| query.sort_dir.apply(compare(a, b))),
            // Unknown sort keys degrade to most-recently-trashed first.
            None => rows.sort_by(|a, b| b.trashed_at().cmp(&a.trashed_at())),
        }

        paginate(rows, query.page.max(1), self.per_page)
    }
}

fn paginate<T>(rows: Vec<T>, page: usize, per_page: usize) -> TrashPage<T> {
    let total = rows.len();
    let last_page = total.div_ceil(per_page).max(1);
    let items = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    TrashPage {
        items,
        total,
        page,
        per_page,
        last_page,
    }
}
