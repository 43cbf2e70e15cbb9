//! Stable grouping of classified rows into category buckets.

use crate::models::{CategoryKey, CategoryTables, ClassifiedRow, NormalizedRow};
use crate::classification::RowClass;

/// Collects classified rows in document order. Each row lands in exactly one
/// bucket; the merged regular view is derived by `CategoryTables`, never
/// stored.
#[derive(Debug, Default)]
pub struct TableAssembler {
    tables: CategoryTables,
}

impl TableAssembler {
    pub fn new() -> Self {
        TableAssembler::default()
    }

    pub fn push(&mut self, row: NormalizedRow, class: RowClass) {
        let key = CategoryKey::new(class.plan, class.cardholder);
        self.tables.buckets.entry(key).or_default().push(ClassifiedRow {
            row,
            plan: class.plan,
            cardholder: class.cardholder,
            who_paid: String::new(),
            comment: String::new(),
        });
    }

    pub fn finish(self) -> CategoryTables {
        self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardholderType, PlanType, RowPosition, Sign};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn row(day: u32, desc: &str) -> NormalizedRow {
        NormalizedRow {
            transaction_date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            posting_date: None,
            description: desc.to_string(),
            amount: dec!(10.00),
            sign_source: Sign::Unknown,
            installment: None,
            position: RowPosition { page: 0, region: 0, row: day as usize },
        }
    }

    fn class(plan: PlanType, cardholder: CardholderType) -> RowClass {
        RowClass { plan, cardholder, ambiguous: false }
    }

    #[test]
    fn buckets_preserve_document_order() {
        let mut assembler = TableAssembler::new();
        assembler.push(row(3, "B"), class(PlanType::Regular, CardholderType::Primary));
        assembler.push(row(1, "A"), class(PlanType::Regular, CardholderType::Primary));
        let tables = assembler.finish();

        let bucket = tables.bucket(CategoryKey::new(PlanType::Regular, CardholderType::Primary));
        let order: Vec<&str> = bucket.iter().map(|r| r.row.description.as_str()).collect();
        // Insertion order, not date order.
        assert_eq!(order, ["B", "A"]);
    }

    #[test]
    fn every_row_lands_in_exactly_one_bucket() {
        let mut assembler = TableAssembler::new();
        assembler.push(row(1, "a"), class(PlanType::Installment, CardholderType::Primary));
        assembler.push(row(2, "b"), class(PlanType::Regular, CardholderType::Primary));
        assembler.push(row(3, "c"), class(PlanType::Regular, CardholderType::Secondary));
        let tables = assembler.finish();

        assert_eq!(tables.row_count(), 3);
        for bucket in tables.buckets.values() {
            for row in bucket {
                let appearances = tables
                    .buckets
                    .values()
                    .flat_map(|b| b.iter())
                    .filter(|r| r.row.position == row.row.position)
                    .count();
                assert_eq!(appearances, 1);
            }
        }
    }

    #[test]
    fn merged_view_holds_regular_rows_primary_first() {
        let mut assembler = TableAssembler::new();
        assembler.push(row(5, "sec"), class(PlanType::Regular, CardholderType::Secondary));
        assembler.push(row(2, "pri-1"), class(PlanType::Regular, CardholderType::Primary));
        assembler.push(row(9, "msi"), class(PlanType::Installment, CardholderType::Primary));
        assembler.push(row(4, "pri-2"), class(PlanType::Regular, CardholderType::Primary));
        let tables = assembler.finish();

        let merged: Vec<&str> = tables
            .merged_regular()
            .iter()
            .map(|r| r.row.description.as_str())
            .collect();
        assert_eq!(merged, ["pri-1", "pri-2", "sec"]);
    }

    #[test]
    fn blank_manual_fields_stay_blank() {
        let mut assembler = TableAssembler::new();
        assembler.push(row(1, "x"), class(PlanType::Regular, CardholderType::Primary));
        let tables = assembler.finish();
        let bucket = tables.bucket(CategoryKey::new(PlanType::Regular, CardholderType::Primary));
        assert_eq!(bucket[0].who_paid, "");
        assert_eq!(bucket[0].comment, "");
    }
}
