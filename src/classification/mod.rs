//! Section and row classification.
//!
//! The statement groups transactions into visually separate tables, one per
//! (plan, cardholder) combination, each introduced by a merged title row.
//! Classification is therefore primarily positional: the title text decides
//! the section, and every row carries that `SectionContext` from extraction
//! time. A content fallback catches installment rows that ended up in an
//! ambiguous section.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{CardholderType, PlanType, SectionContext};

lazy_static! {
    /// Installment descriptions carry a payment-progress marker ("3 DE 6")
    /// or an explicit MSI tag; regular charges never do.
    static ref INSTALLMENT_MARKER: Regex =
        Regex::new(r"(?i)\b\d{1,2}\s+DE\s+\d{1,2}\b|\bMSI\b|MESES\s+SIN\s+INTERESES").unwrap();
}

/// Keywords that identify a column-caption row rather than data.
const HEADER_KEYWORDS: [&str; 9] = [
    "fecha",
    "descripción",
    "monto",
    "saldo",
    "pago",
    "movimiento",
    "tasa",
    "interés",
    "cargo",
];

/// Classify a table from its merged title text. `None` plan means the title
/// did not mention either section: the table is a continuation of whatever
/// came before it.
pub fn classify_section(title: &str) -> Option<SectionContext> {
    let upper = title.to_uppercase();
    let plan = if upper.contains("MESES SIN INTERESES") || upper.contains("DIFERIDOS") {
        Some(PlanType::Installment)
    } else if upper.contains("NO A MESES") || upper.contains("REGULARES") {
        Some(PlanType::Regular)
    } else {
        None
    };
    let cardholder = if upper.contains("ADICIONAL") {
        CardholderType::Secondary
    } else {
        CardholderType::Primary
    };
    plan.map(|plan| SectionContext { plan: Some(plan), cardholder })
}

/// A column-caption row repeats several field names; two or more hits is
/// enough to tell it apart from a transaction.
pub fn is_header_row(cells: &[String]) -> bool {
    let text = cells.join(" ").to_lowercase();
    HEADER_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count() >= 2
}

/// Total/summary rows close out each section and are not transactions.
/// They carry no date, and some cell leads with the total caption; a dated
/// row keeps its transaction status even when a merchant name contains
/// "TOTAL".
pub fn is_total_row(cells: &[String]) -> bool {
    match cells.first() {
        Some(date_cell) if date_cell.trim().is_empty() => {}
        _ => return false,
    }
    cells
        .iter()
        .any(|c| c.trim().to_lowercase().starts_with("total"))
}

/// Outcome of classifying one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowClass {
    pub plan: PlanType,
    pub cardholder: CardholderType,
    /// Set when the classification is a best guess that needs review.
    pub ambiguous: bool,
}

/// Assign (plan, cardholder) to a row given its section context and
/// description. Positional context wins; the installment content marker can
/// upgrade a positionally regular row; unresolved rows default to regular
/// and are flagged, since installment rows have the rarer, stronger
/// signature.
pub fn classify_row(description: &str, context: SectionContext) -> RowClass {
    match context.plan {
        Some(PlanType::Installment) => RowClass {
            plan: PlanType::Installment,
            cardholder: context.cardholder,
            ambiguous: false,
        },
        Some(PlanType::Regular) => {
            let plan = if INSTALLMENT_MARKER.is_match(description) {
                PlanType::Installment
            } else {
                PlanType::Regular
            };
            RowClass { plan, cardholder: context.cardholder, ambiguous: false }
        }
        None => {
            if INSTALLMENT_MARKER.is_match(description) {
                RowClass {
                    plan: PlanType::Installment,
                    cardholder: context.cardholder,
                    ambiguous: false,
                }
            } else {
                RowClass {
                    plan: PlanType::Regular,
                    cardholder: context.cardholder,
                    ambiguous: true,
                }
            }
        }
    }
}
