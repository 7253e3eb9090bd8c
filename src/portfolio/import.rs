//! CSV snapshot import.
//!
//! Loads a directory of per-table CSV exports into a [`MemoryStore`] so the
//! console and test fixtures can run against real data. One file per table
//! (`properties.csv`, `accommodations.csv`, `stays.csv`, `tenants.csv`,
//! `expenses.csv`, `stay_categories.csv`, `expense_categories.csv`); a
//! missing file is an empty table. Tombstones travel with the rows through
//! the `deleted_at` column.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{
    Accommodation, AccommodationId, Expense, ExpenseCategory, ExpenseCategoryId, ExpenseId,
    Property, PropertyId, Stay, StayCategory, StayCategoryId, StayId, Tenant, TenantId,
};
use super::store::{MemoryStore, StoreError};

#[derive(Debug)]
pub enum SnapshotImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid { file: &'static str, detail: String },
    Store(StoreError),
}

impl fmt::Display for SnapshotImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotImportError::Io(err) => write!(f, "failed to read snapshot: {}", err),
            SnapshotImportError::Csv(err) => write!(f, "invalid snapshot CSV data: {}", err),
            SnapshotImportError::Invalid { file, detail } => {
                write!(f, "invalid row in {}: {}", file, detail)
            }
            SnapshotImportError::Store(err) => {
                write!(f, "could not load snapshot into the store: {}", err)
            }
        }
    }
}

impl std::error::Error for SnapshotImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotImportError::Io(err) => Some(err),
            SnapshotImportError::Csv(err) => Some(err),
            SnapshotImportError::Invalid { .. } => None,
            SnapshotImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SnapshotImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for SnapshotImportError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// A parsed snapshot, not yet loaded into a store.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub properties: Vec<Property>,
    pub accommodations: Vec<Accommodation>,
    pub stays: Vec<Stay>,
    pub tenants: Vec<Tenant>,
    pub expenses: Vec<Expense>,
    pub stay_categories: Vec<StayCategory>,
    pub expense_categories: Vec<ExpenseCategory>,
}

impl Snapshot {
    /// Seed a fresh store, parents before children so references resolve.
    pub fn into_store(self) -> Result<MemoryStore, SnapshotImportError> {
        let store = MemoryStore::new();
        for row in self.stay_categories {
            store.seed_stay_category(row)?;
        }
        for row in self.expense_categories {
            store.seed_expense_category(row)?;
        }
        for row in self.properties {
            store.seed_property(row)?;
        }
        for row in self.accommodations {
            store.seed_accommodation(row)?;
        }
        for row in self.stays {
            store.seed_stay(row)?;
        }
        for row in self.tenants {
            store.seed_tenant(row)?;
        }
        for row in self.expenses {
            store.seed_expense(row)?;
        }
        Ok(store)
    }
}

/// Read every table file under `dir` and load the result into a store.
pub fn load_snapshot(dir: &Path) -> Result<MemoryStore, SnapshotImportError> {
    let snapshot = read_snapshot_dir(dir)?;
    let store = snapshot.into_store()?;
    tracing::info!(dir = %dir.display(), "snapshot loaded");
    Ok(store)
}

fn read_snapshot_dir(dir: &Path) -> Result<Snapshot, SnapshotImportError> {
    Ok(Snapshot {
        properties: read_table(dir, "properties.csv", read_properties)?,
        accommodations: read_table(dir, "accommodations.csv", read_accommodations)?,
        stays: read_table(dir, "stays.csv", read_stays)?,
        tenants: read_table(dir, "tenants.csv", read_tenants)?,
        expenses: read_table(dir, "expenses.csv", read_expenses)?,
        stay_categories: read_table(dir, "stay_categories.csv", read_stay_categories)?,
        expense_categories: read_table(dir, "expense_categories.csv", read_expense_categories)?,
    })
}

fn read_table<T, F>(dir: &Path, name: &str, parse: F) -> Result<Vec<T>, SnapshotImportError>
where
    F: FnOnce(File) -> Result<Vec<T>, SnapshotImportError>,
{
    match File::open(dir.join(name)) {
        Ok(file) => parse(file),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    id: u64,
    label: String,
    address: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deleted_at: Option<String>,
}

pub fn read_properties<R: Read>(reader: R) -> Result<Vec<Property>, SnapshotImportError> {
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<PropertyRow>() {
        let row = record?;
        rows.push(Property {
            id: PropertyId(row.id),
            label: row.label,
            address: row.address,
            description: row.description,
            created_at: created_at(row.created_at.as_deref(), "properties.csv", row.id)?,
            deleted_at: deleted_at(row.deleted_at.as_deref(), "properties.csv", row.id)?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct AccommodationRow {
    id: u64,
    property_id: u64,
    label: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deleted_at: Option<String>,
}

pub fn read_accommodations<R: Read>(reader: R) -> Result<Vec<Accommodation>, SnapshotImportError> {
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<AccommodationRow>() {
        let row = record?;
        rows.push(Accommodation {
            id: AccommodationId(row.id),
            property_id: PropertyId(row.property_id),
            label: row.label,
            created_at: created_at(row.created_at.as_deref(), "accommodations.csv", row.id)?,
            deleted_at: deleted_at(row.deleted_at.as_deref(), "accommodations.csv", row.id)?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct StayRow {
    id: u64,
    accommodation_id: u64,
    stay_category_id: u64,
    start_date: String,
    end_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    due_date: Option<String>,
    price: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deleted_at: Option<String>,
}

pub fn read_stays<R: Read>(reader: R) -> Result<Vec<Stay>, SnapshotImportError> {
    const FILE: &str = "stays.csv";
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<StayRow>() {
        let row = record?;
        let due_date = match row.due_date.as_deref() {
            Some(raw) => Some(raw.trim().parse::<u8>().map_err(|_| invalid(FILE, row.id, "due_date"))?),
            None => None,
        };
        rows.push(Stay {
            id: StayId(row.id),
            accommodation_id: AccommodationId(row.accommodation_id),
            stay_category_id: StayCategoryId(row.stay_category_id),
            start_date: parse_date(&row.start_date).ok_or_else(|| invalid(FILE, row.id, "start_date"))?,
            end_date: parse_date(&row.end_date).ok_or_else(|| invalid(FILE, row.id, "end_date"))?,
            due_date,
            price_cents: parse_price_cents(&row.price).ok_or_else(|| invalid(FILE, row.id, "price"))?,
            created_at: created_at(row.created_at.as_deref(), FILE, row.id)?,
            deleted_at: deleted_at(row.deleted_at.as_deref(), FILE, row.id)?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct TenantRow {
    id: u64,
    stay_id: u64,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cpf: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deleted_at: Option<String>,
}

pub fn read_tenants<R: Read>(reader: R) -> Result<Vec<Tenant>, SnapshotImportError> {
    const FILE: &str = "tenants.csv";
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<TenantRow>() {
        let row = record?;
        rows.push(Tenant {
            id: TenantId(row.id),
            stay_id: StayId(row.stay_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            cpf: row.cpf,
            created_at: created_at(row.created_at.as_deref(), FILE, row.id)?,
            deleted_at: deleted_at(row.deleted_at.as_deref(), FILE, row.id)?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    id: u64,
    property_id: u64,
    #[serde(default)]
    accommodation_id: Option<u64>,
    #[serde(default)]
    expense_category_id: Option<u64>,
    label: String,
    price: String,
    date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deleted_at: Option<String>,
}

pub fn read_expenses<R: Read>(reader: R) -> Result<Vec<Expense>, SnapshotImportError> {
    const FILE: &str = "expenses.csv";
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<ExpenseRow>() {
        let row = record?;
        rows.push(Expense {
            id: ExpenseId(row.id),
            property_id: PropertyId(row.property_id),
            accommodation_id: row.accommodation_id.map(AccommodationId),
            expense_category_id: row.expense_category_id.map(ExpenseCategoryId),
            label: row.label,
            price_cents: parse_price_cents(&row.price).ok_or_else(|| invalid(FILE, row.id, "price"))?,
            date: parse_date(&row.date).ok_or_else(|| invalid(FILE, row.id, "date"))?,
            description: row.description,
            created_at: created_at(row.created_at.as_deref(), FILE, row.id)?,
            deleted_at: deleted_at(row.deleted_at.as_deref(), FILE, row.id)?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    id: u64,
    label: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
}

pub fn read_stay_categories<R: Read>(reader: R) -> Result<Vec<StayCategory>, SnapshotImportError> {
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<CategoryRow>() {
        let row = record?;
        rows.push(StayCategory {
            id: StayCategoryId(row.id),
            label: row.label,
            created_at: created_at(row.created_at.as_deref(), "stay_categories.csv", row.id)?,
        });
    }
    Ok(rows)
}

pub fn read_expense_categories<R: Read>(
    reader: R,
) -> Result<Vec<ExpenseCategory>, SnapshotImportError> {
    let mut rows = Vec::new();
    let mut reader = csv_reader(reader);
    for record in reader.deserialize::<CategoryRow>() {
        let row = record?;
        rows.push(ExpenseCategory {
            id: ExpenseCategoryId(row.id),
            label: row.label,
            created_at: created_at(row.created_at.as_deref(), "expense_categories.csv", row.id)?,
        });
    }
    Ok(rows)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn invalid(file: &'static str, id: u64, field: &str) -> SnapshotImportError {
    SnapshotImportError::Invalid {
        file,
        detail: format!("row {id}: unparseable {field}"),
    }
}

fn created_at(
    raw: Option<&str>,
    file: &'static str,
    id: u64,
) -> Result<DateTime<Utc>, SnapshotImportError> {
    match raw {
        // Rows exported without timestamps are stamped at import time.
        None => Ok(Utc::now()),
        Some(value) => parse_timestamp(value).ok_or_else(|| invalid(file, id, "created_at")),
    }
}

fn deleted_at(
    raw: Option<&str>,
    file: &'static str,
    id: u64,
) -> Result<Option<DateTime<Utc>>, SnapshotImportError> {
    match raw {
        None => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| invalid(file, id, "deleted_at")),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse a two-fraction-digit decimal into integer cents. `"1234"`,
/// `"1234.5"`, and `"1234.56"` are accepted; more precision is not.
fn parse_price_cents(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;

    let fraction_cents = match fraction.len() {
        0 => 0,
        1 | 2 if fraction.chars().all(|c| c.is_ascii_digit()) => {
            let parsed: i64 = fraction.parse().ok()?;
            if fraction.len() == 1 {
                parsed * 10
            } else {
                parsed
            }
        }
        _ => return None,
    };

    let cents = whole.checked_mul(100)?.checked_add(fraction_cents)?;
    Some(if negative { -cents } else { cents })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
