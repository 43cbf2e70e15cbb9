use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Axis-aligned rectangle in page pixel coordinates (300 DPI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// One horizontal slice of a table (the space between two rule lines),
/// with the cell spans detected inside it. Section-title rows are merged
/// across the table and therefore carry a single span.
#[derive(Debug, Clone)]
pub struct RowBand {
    pub y0: u32,
    pub y1: u32,
    /// Left/right pixel bounds of each cell, left to right.
    pub cell_spans: Vec<(u32, u32)>,
}

/// A transaction table found on a rendered page. Immutable once computed.
#[derive(Debug, Clone)]
pub struct TableRegion {
    pub page_index: usize,
    pub bounds: Rect,
    pub bands: Vec<RowBand>,
}

impl TableRegion {
    /// Column count of the widest band. Title bands are merged and report a
    /// single span, so data bands decide the layout.
    pub fn column_count(&self) -> usize {
        self.bands.iter().map(|b| b.cell_spans.len()).max().unwrap_or(0)
    }
}

/// Best-effort recognition output for a single cell.
#[derive(Debug, Clone)]
pub struct RawCell {
    pub row: usize,
    pub column: usize,
    pub text: String,
    /// Fraction of recognized characters matching the column role's
    /// expected charset, 0.0–1.0.
    pub confidence: f32,
}

/// Outcome of the pixel-level charge/credit marker analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sign {
    Positive,
    Negative,
    /// No usable marker signal; the sign is decided downstream by the
    /// category default.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PlanType {
    Installment,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CardholderType {
    Primary,
    Secondary,
}

/// Which statement section a row was physically read from. Attached at
/// extraction time so classification never has to infer position after the
/// fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionContext {
    /// `None` for a headerless continuation table with no preceding section.
    pub plan: Option<PlanType>,
    pub cardholder: CardholderType,
}

/// Where a row sits in the source document, for report entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowPosition {
    pub page: usize,
    pub region: usize,
    pub row: usize,
}

/// Extra columns only present in installment tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallmentDetail {
    pub outstanding_balance: Option<Decimal>,
    pub required_payment: Option<Decimal>,
    /// e.g. "3 de 6"; kept as cleaned text.
    pub payment_number: String,
    /// e.g. "0%"; kept as cleaned text.
    pub interest_rate: String,
}

/// A fully corrected and typed transaction row.
///
/// Invariants: `amount` always carries exactly two fraction digits; dates
/// fall inside the plausible statement period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    pub transaction_date: NaiveDate,
    /// Installment rows print a single date, so this is optional.
    pub posting_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Decimal,
    pub sign_source: Sign,
    pub installment: Option<InstallmentDetail>,
    pub position: RowPosition,
}

/// A normalized row plus its category assignment and the two blank fields
/// reserved for manual completion downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRow {
    #[serde(flatten)]
    pub row: NormalizedRow,
    pub plan: PlanType,
    pub cardholder: CardholderType,
    /// Always empty; filled in by hand in the spreadsheet.
    pub who_paid: String,
    /// Always empty; filled in by hand in the spreadsheet.
    pub comment: String,
}

/// Bucket key: one per (plan, cardholder) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CategoryKey {
    pub plan: PlanType,
    pub cardholder: CardholderType,
}

impl CategoryKey {
    pub fn new(plan: PlanType, cardholder: CardholderType) -> Self {
        CategoryKey { plan, cardholder }
    }
}

/// Category-partitioned output: one ordered bucket per key, plus the derived
/// merged view over all regular rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTables {
    #[serde(serialize_with = "buckets_with_string_keys")]
    pub buckets: BTreeMap<CategoryKey, Vec<ClassifiedRow>>,
}

/// JSON maps need string keys, so buckets serialize under
/// "Installment/Primary"-style names.
fn buckets_with_string_keys<S>(
    buckets: &BTreeMap<CategoryKey, Vec<ClassifiedRow>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(buckets.len()))?;
    for (key, rows) in buckets {
        map.serialize_entry(&format!("{:?}/{:?}", key.plan, key.cardholder), rows)?;
    }
    map.end()
}

impl CategoryTables {
    pub fn bucket(&self, key: CategoryKey) -> &[ClassifiedRow] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The consolidated "regular, all cardholders" view: primary rows first,
    /// then secondary, each in original document order. Derived on demand,
    /// never stored as an independent bucket.
    pub fn merged_regular(&self) -> Vec<&ClassifiedRow> {
        let mut merged = Vec::new();
        for cardholder in [CardholderType::Primary, CardholderType::Secondary] {
            merged.extend(self.bucket(CategoryKey::new(PlanType::Regular, cardholder)));
        }
        merged
    }

    pub fn row_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}
