use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::contact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccommodationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpenseId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StayCategoryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpenseCategoryId(pub u64);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AccommodationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StayCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExpenseCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five entity kinds that participate in the trash lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Property,
    Accommodation,
    Stay,
    Tenant,
    Expense,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Accommodation => "accommodation",
            Self::Stay => "stay",
            Self::Tenant => "tenant",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A typed reference to one trashable row, used to address delete/restore
/// requests without string-keyed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum EntityRef {
    Property(PropertyId),
    Accommodation(AccommodationId),
    Stay(StayId),
    Tenant(TenantId),
    Expense(ExpenseId),
}

impl EntityRef {
    pub const fn kind(self) -> EntityKind {
        match self {
            Self::Property(_) => EntityKind::Property,
            Self::Accommodation(_) => EntityKind::Accommodation,
            Self::Stay(_) => EntityKind::Stay,
            Self::Tenant(_) => EntityKind::Tenant,
            Self::Expense(_) => EntityKind::Expense,
        }
    }

    pub const fn raw_id(self) -> u64 {
        match self {
            Self::Property(id) => id.0,
            Self::Accommodation(id) => id.0,
            Self::Stay(id) => id.0,
            Self::Tenant(id) => id.0,
            Self::Expense(id) => id.0,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw_id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub label: String,
    pub address: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    pub id: AccommodationId,
    pub property_id: PropertyId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub id: StayId,
    pub accommodation_id: AccommodationId,
    pub stay_category_id: StayCategoryId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Day of month (1-31) when rent is due.
    pub due_date: Option<u8>,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Stay {
    /// Length of the stay in days, end exclusive.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn price_per_day(&self) -> f64 {
        let days = self.days();
        if days > 0 {
            self.price_cents as f64 / 100.0 / days as f64
        } else {
            0.0
        }
    }

    pub fn price_display(&self) -> String {
        cents_to_display(self.price_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub stay_id: StayId,
    pub name: String,
    pub email: Option<String>,
    /// Digits only; formatting is applied on read.
    pub phone: Option<String>,
    /// Digits only; formatting is applied on read.
    pub cpf: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn cpf_formatted(&self) -> Option<String> {
        self.cpf.as_deref().and_then(contact::format_cpf)
    }

    pub fn phone_formatted(&self) -> Option<String> {
        self.phone.as_deref().and_then(contact::format_phone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub property_id: PropertyId,
    pub accommodation_id: Option<AccommodationId>,
    pub expense_category_id: Option<ExpenseCategoryId>,
    pub label: String,
    pub price_cents: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn price_display(&self) -> String {
        cents_to_display(self.price_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayCategory {
    pub id: StayCategoryId,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: ExpenseCategoryId,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    pub label: String,
    pub address: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccommodationInput {
    pub property_id: PropertyId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayInput {
    pub accommodation_id: AccommodationId,
    pub stay_category_id: StayCategoryId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub due_date: Option<u8>,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantInput {
    pub stay_id: StayId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub property_id: PropertyId,
    pub accommodation_id: Option<AccommodationId>,
    pub expense_category_id: Option<ExpenseCategoryId>,
    pub label: String,
    pub price_cents: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// Render integer cents as a two-fraction-digit decimal string.
pub fn cents_to_display(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
