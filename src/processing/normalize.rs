//! Recognition-error correction and typed field parsing.
//!
//! The recognition engine makes systematic, enumerable mistakes on this
//! statement format: day digits misread as letters, border rule lines bleeding
//! into the crop as `[`/`|`, an extra digit glued onto a two-digit day. The
//! correction set is a single ordered table of (scope, pattern, replacement)
//! entries evaluated in fixed priority order, so it can be tested in
//! isolation and reasoned about as data.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{
    ColumnRole, InstallmentDetail, NormalizedRow, QuarantineReason, RowPosition, Sign,
};

/// Which fields a correction rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Every recognized cell, before role-specific rules.
    AnyText,
    Date,
    Amount,
}

pub struct CorrectionRule {
    pub scope: RuleScope,
    pub pattern: Regex,
    pub replacement: &'static str,
}

/// Spanish month abbreviations as printed on the statement.
const MONTHS: &str = "Ene|Feb|Mar|Abr|May|Jun|Jul|Ago|Sep|Oct|Nov|Dic";

lazy_static! {
    /// The correction table, in evaluation order. Earlier entries run first;
    /// later entries see the already-corrected text.
    pub static ref CORRECTION_TABLE: Vec<CorrectionRule> = vec![
        // Rule lines caught by the padded crop show up as bracket/pipe noise
        // at the string edges.
        CorrectionRule {
            scope: RuleScope::AnyText,
            pattern: Regex::new(r"[\[\]|\\]").unwrap(),
            replacement: " ",
        },
        // '7' in the day position misread as 'f' ("2f-Ene" -> "27-Ene").
        CorrectionRule {
            scope: RuleScope::Date,
            pattern: Regex::new(&format!(r"(\d)f(-(?i:{}))", MONTHS)).unwrap(),
            replacement: "${1}7${2}",
        },
        // Same glyph sometimes comes back as '/' instead.
        CorrectionRule {
            scope: RuleScope::Date,
            pattern: Regex::new(&format!(r"(\d)/(-(?i:{}))", MONTHS)).unwrap(),
            replacement: "${1}7${2}",
        },
        // Duplicate digit glued onto a two-digit day ("298-Ene" -> "29-Ene").
        CorrectionRule {
            scope: RuleScope::Date,
            pattern: Regex::new(&format!(r"\b(\d{{2}})\d(-(?i:{}))", MONTHS)).unwrap(),
            replacement: "${1}${2}",
        },
        // Letter-for-digit confusions inside numeric cells.
        CorrectionRule {
            scope: RuleScope::Amount,
            pattern: Regex::new(r"[Oo]").unwrap(),
            replacement: "0",
        },
        CorrectionRule {
            scope: RuleScope::Amount,
            pattern: Regex::new(r"[lI]").unwrap(),
            replacement: "1",
        },
    ];

    static ref DATE_FULL: Regex =
        Regex::new(&format!(r"(\d{{1,2}})-((?i:{}))-(\d{{4}})", MONTHS)).unwrap();
    static ref DATE_DAY_MONTH: Regex =
        Regex::new(&format!(r"(\d{{1,2}})-((?i:{}))", MONTHS)).unwrap();
    static ref AMOUNT_DIGITS: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    static ref PERCENTAGE: Regex = Regex::new(r"\d+\.?\d*%?").unwrap();
}

fn scopes_for(role: ColumnRole) -> &'static [RuleScope] {
    match role {
        ColumnRole::Date => &[RuleScope::AnyText, RuleScope::Date],
        ColumnRole::Amount | ColumnRole::Percentage => &[RuleScope::AnyText, RuleScope::Amount],
        _ => &[RuleScope::AnyText],
    }
}

/// Run the correction table over `text` for the given role. Returns the
/// corrected text and how many individual corrections fired.
pub fn apply_corrections(text: &str, role: ColumnRole) -> (String, usize) {
    let scopes = scopes_for(role);
    let mut current = text.to_string();
    let mut fired = 0;
    for rule in CORRECTION_TABLE.iter() {
        if !scopes.contains(&rule.scope) {
            continue;
        }
        let hits = rule.pattern.find_iter(&current).count();
        if hits > 0 {
            fired += hits;
            current = rule.pattern.replace_all(&current, rule.replacement).into_owned();
        }
    }
    (collapse_whitespace(&current), fired)
}

/// How many corrections the table would make. The cell reader uses this to
/// break ties between recognition attempts.
pub fn correction_count(text: &str, role: ColumnRole) -> usize {
    apply_corrections(text, role).1
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_ascii_lowercase().as_str() {
        "ene" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "abr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "ago" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dic" => Some(12),
        _ => None,
    }
}

/// Maps corrected cell text into validated typed values. Holds the statement
/// year, learned from the first fully dated cell, so day-month-only dates
/// and plausibility checks have an anchor.
#[derive(Debug, Default)]
pub struct FieldNormalizer {
    statement_year: Option<i32>,
}

impl FieldNormalizer {
    pub fn new() -> Self {
        FieldNormalizer::default()
    }

    /// Parse a date cell. Corrections first, then `DD-Mon-YYYY`; a date
    /// without a year is resolved against the statement year when one is
    /// known. Dates outside the plausible statement period are rejected.
    pub fn parse_date(&mut self, raw: &str) -> Result<NaiveDate, QuarantineReason> {
        let (corrected, _) = apply_corrections(raw, ColumnRole::Date);
        if corrected.is_empty() {
            return Err(QuarantineReason::MissingField { role: ColumnRole::Date });
        }

        let (day, month, year) = if let Some(caps) = DATE_FULL.captures(&corrected) {
            let day = caps[1].parse::<u32>().unwrap_or(0);
            let month = month_number(&caps[2]);
            let year = caps[3].parse::<i32>().unwrap_or(0);
            (day, month, year)
        } else if let (Some(caps), Some(year)) =
            (DATE_DAY_MONTH.captures(&corrected), self.statement_year)
        {
            let day = caps[1].parse::<u32>().unwrap_or(0);
            (day, month_number(&caps[2]), year)
        } else {
            return Err(QuarantineReason::UnparseableDate { text: corrected });
        };

        let month = month.ok_or_else(|| QuarantineReason::UnparseableDate {
            text: corrected.clone(),
        })?;
        if !self.plausible_year(year) {
            return Err(QuarantineReason::ImplausibleDate { text: corrected });
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(QuarantineReason::UnparseableDate { text: corrected })?;

        if self.statement_year.is_none() {
            self.statement_year = Some(year);
        }
        Ok(date)
    }

    /// Like `parse_date` but an empty cell is acceptable.
    pub fn parse_optional_date(&mut self, raw: &str) -> Result<Option<NaiveDate>, QuarantineReason> {
        let (corrected, _) = apply_corrections(raw, ColumnRole::Date);
        if corrected.is_empty() {
            return Ok(None);
        }
        self.parse_date(raw).map(Some)
    }

    /// A statement covers one billing month; anything outside the year of
    /// the statement (give or take one, for December/January spill) is an
    /// OCR artifact, not a transaction.
    fn plausible_year(&self, year: i32) -> bool {
        match self.statement_year {
            Some(anchor) => (anchor - 1..=anchor + 1).contains(&year),
            None => (2000..=2099).contains(&year),
        }
    }

    /// Parse an amount cell and combine it with the detected sign. The
    /// magnitude always carries exactly two fraction digits; extra fraction
    /// digits are duplicate-glyph noise and get collapsed.
    pub fn parse_amount(&self, raw: &str, sign: Sign) -> Result<Decimal, QuarantineReason> {
        let magnitude = self.parse_magnitude(raw)?;
        Ok(match sign {
            Sign::Negative => -magnitude,
            // Unknown defaults to a charge; the classifier's category rule
            // had its chance to say otherwise before we get here.
            Sign::Positive | Sign::Unknown => magnitude,
        })
    }

    /// Secondary installment columns: best effort, `None` instead of
    /// quarantine when unreadable.
    pub fn parse_secondary_amount(&self, raw: &str) -> Option<Decimal> {
        self.parse_magnitude(raw).ok()
    }

    fn parse_magnitude(&self, raw: &str) -> Result<Decimal, QuarantineReason> {
        let (corrected, _) = apply_corrections(raw, ColumnRole::Amount);
        let stripped: String = corrected
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' ' | '-'))
            .collect();
        if stripped.is_empty() {
            return Err(QuarantineReason::MissingField { role: ColumnRole::Amount });
        }

        let digits = AMOUNT_DIGITS
            .find(&stripped)
            .map(|m| m.as_str())
            .ok_or_else(|| QuarantineReason::UnparseableAmount { text: corrected.clone() })?;

        let mut value = Decimal::from_str(digits)
            .map_err(|_| QuarantineReason::UnparseableAmount { text: corrected.clone() })?;
        if value.scale() > 2 {
            value = value.trunc_with_scale(2);
        }
        value.rescale(2);
        Ok(value)
    }

    /// Strip border bleed and collapse whitespace in free-text cells.
    pub fn clean_description(&self, raw: &str) -> String {
        apply_corrections(raw, ColumnRole::Description).0
    }

    /// Keep the numeric percentage pattern, e.g. "0%" or "12.5%".
    pub fn clean_percentage(&self, raw: &str) -> String {
        let (corrected, _) = apply_corrections(raw, ColumnRole::Percentage);
        let compact: String = corrected.chars().filter(|c| !c.is_whitespace()).collect();
        PERCENTAGE
            .find(&compact)
            .map(|m| m.as_str().to_string())
            .unwrap_or(compact)
    }

    /// Normalize one 5-column regular row: operation date, posting date,
    /// description, (sign marker handled by the detector), amount.
    pub fn normalize_regular_row(
        &mut self,
        cells: &[String],
        sign: Sign,
        position: RowPosition,
    ) -> Result<NormalizedRow, QuarantineReason> {
        let transaction_date = self.parse_date(cell(cells, 0))?;
        let posting_date = self.parse_optional_date(cell(cells, 1))?;
        let description = self.clean_description(cell(cells, 2));
        let amount = self.parse_amount(cell(cells, 4), sign)?;
        Ok(NormalizedRow {
            transaction_date,
            posting_date,
            description,
            amount,
            sign_source: sign,
            installment: None,
            position,
        })
    }

    /// Normalize one 7-column installment row. Installment purchases are
    /// always charges; there is no marker column.
    pub fn normalize_installment_row(
        &mut self,
        cells: &[String],
        position: RowPosition,
    ) -> Result<NormalizedRow, QuarantineReason> {
        let transaction_date = self.parse_date(cell(cells, 0))?;
        let description = self.clean_description(cell(cells, 1));
        let amount = self.parse_amount(cell(cells, 2), Sign::Unknown)?;
        let detail = InstallmentDetail {
            outstanding_balance: self.parse_secondary_amount(cell(cells, 3)),
            required_payment: self.parse_secondary_amount(cell(cells, 4)),
            payment_number: self.clean_description(cell(cells, 5)),
            interest_rate: self.clean_percentage(cell(cells, 6)),
        };
        Ok(NormalizedRow {
            transaction_date,
            posting_date: None,
            description,
            amount,
            sign_source: Sign::Unknown,
            installment: Some(detail),
            position,
        })
    }
}

fn cell(cells: &[String], index: usize) -> &str {
    cells.get(index).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pos() -> RowPosition {
        RowPosition { page: 0, region: 0, row: 0 }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_digit_misread_as_f_is_recovered() {
        let mut n = FieldNormalizer::new();
        assert_eq!(n.parse_date("2f-Ene-2026").unwrap(), date(2026, 1, 27));
    }

    #[test]
    fn day_digit_misread_as_slash_is_recovered() {
        let mut n = FieldNormalizer::new();
        assert_eq!(n.parse_date("2/-Ene-2026").unwrap(), date(2026, 1, 27));
    }

    #[test]
    fn trailing_duplicate_day_digit_is_collapsed() {
        let mut n = FieldNormalizer::new();
        assert_eq!(n.parse_date("298-Ene-2026").unwrap(), date(2026, 1, 29));
    }

    #[test]
    fn border_bleed_is_stripped_from_dates() {
        let mut n = FieldNormalizer::new();
        assert_eq!(n.parse_date("[17-Ene-2026 |").unwrap(), date(2026, 1, 17));
    }

    #[test]
    fn day_month_only_borrows_the_statement_year() {
        let mut n = FieldNormalizer::new();
        n.parse_date("10-Feb-2026").unwrap();
        assert_eq!(n.parse_date("12-Feb").unwrap(), date(2026, 2, 12));
    }

    #[test]
    fn day_month_only_without_anchor_is_quarantined() {
        let mut n = FieldNormalizer::new();
        assert!(matches!(
            n.parse_date("12-Feb"),
            Err(QuarantineReason::UnparseableDate { .. })
        ));
    }

    #[test]
    fn dates_outside_the_statement_period_are_rejected() {
        let mut n = FieldNormalizer::new();
        n.parse_date("10-Feb-2026").unwrap();
        assert!(matches!(
            n.parse_date("10-Feb-1998"),
            Err(QuarantineReason::ImplausibleDate { .. })
        ));
    }

    #[test]
    fn impossible_calendar_dates_are_quarantined() {
        let mut n = FieldNormalizer::new();
        assert!(matches!(
            n.parse_date("31-Feb-2026"),
            Err(QuarantineReason::UnparseableDate { .. })
        ));
    }

    #[test]
    fn confusable_glyph_in_amount_round_trips() {
        // An 'l' standing in for the leading '1' must recover exactly.
        let n = FieldNormalizer::new();
        assert_eq!(n.parse_amount("l50.00", Sign::Unknown).unwrap(), dec!(150.00));
    }

    #[test]
    fn letter_o_in_amount_reads_as_zero() {
        let n = FieldNormalizer::new();
        assert_eq!(n.parse_amount("$21,O98.0O", Sign::Positive).unwrap(), dec!(21098.00));
    }

    #[test]
    fn amounts_always_carry_two_fraction_digits() {
        let n = FieldNormalizer::new();
        for (raw, expected) in [("75.5", dec!(75.50)), ("100", dec!(100.00)), ("12.345", dec!(12.34))] {
            let parsed = n.parse_amount(raw, Sign::Positive).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.scale(), 2);
        }
    }

    #[test]
    fn negative_sign_comes_from_the_detector_not_the_text() {
        let n = FieldNormalizer::new();
        assert_eq!(n.parse_amount("75.50", Sign::Negative).unwrap(), dec!(-75.50));
        // A stray '-' in the text is ignored; the detector owns the sign.
        assert_eq!(n.parse_amount("-75.50", Sign::Positive).unwrap(), dec!(75.50));
    }

    #[test]
    fn unknown_sign_defaults_to_a_charge() {
        let n = FieldNormalizer::new();
        assert_eq!(n.parse_amount("75.50", Sign::Unknown).unwrap(), dec!(75.50));
    }

    #[test]
    fn unreadable_amount_is_quarantined() {
        let n = FieldNormalizer::new();
        assert!(matches!(
            n.parse_amount("###", Sign::Positive),
            Err(QuarantineReason::UnparseableAmount { .. })
        ));
        assert!(matches!(
            n.parse_amount("", Sign::Positive),
            Err(QuarantineReason::MissingField { role: ColumnRole::Amount })
        ));
    }

    #[test]
    fn correction_count_reflects_pending_fixes() {
        assert_eq!(correction_count("17-Ene-2026", ColumnRole::Date), 0);
        assert_eq!(correction_count("2f-Ene-2026", ColumnRole::Date), 1);
        assert_eq!(correction_count("l5O.00", ColumnRole::Amount), 2);
    }

    #[test]
    fn correction_table_is_ordered_bleed_before_confusions() {
        let bleed = CORRECTION_TABLE
            .iter()
            .position(|r| r.scope == RuleScope::AnyText)
            .unwrap();
        let confusion = CORRECTION_TABLE
            .iter()
            .position(|r| r.scope == RuleScope::Amount)
            .unwrap();
        assert!(bleed < confusion);
    }

    #[test]
    fn regular_row_normalizes_end_to_end() {
        let mut n = FieldNormalizer::new();
        let cells = vec![
            "[17-Ene-2026".to_string(),
            "18-Ene-2026".to_string(),
            "OXXO  CENTRO |".to_string(),
            "-".to_string(),
            "1,234.56".to_string(),
        ];
        let row = n.normalize_regular_row(&cells, Sign::Negative, pos()).unwrap();
        assert_eq!(row.transaction_date, date(2026, 1, 17));
        assert_eq!(row.posting_date, Some(date(2026, 1, 18)));
        assert_eq!(row.description, "OXXO CENTRO");
        assert_eq!(row.amount, dec!(-1234.56));
    }

    #[test]
    fn installment_row_keeps_secondary_columns_best_effort() {
        let mut n = FieldNormalizer::new();
        let cells = vec![
            "05-Feb-2026".to_string(),
            "MUEBLERIA NORTE".to_string(),
            "9,000.00".to_string(),
            "6,000.00".to_string(),
            "???".to_string(),
            "3 de 6".to_string(),
            "0 %".to_string(),
        ];
        let row = n.normalize_installment_row(&cells, pos()).unwrap();
        assert_eq!(row.amount, dec!(9000.00));
        let detail = row.installment.unwrap();
        assert_eq!(detail.outstanding_balance, Some(dec!(6000.00)));
        assert_eq!(detail.required_payment, None);
        assert_eq!(detail.payment_number, "3 de 6");
        assert_eq!(detail.interest_rate, "0%");
    }

    #[test]
    fn unreadable_date_quarantines_the_row() {
        let mut n = FieldNormalizer::new();
        let cells = vec![
            "??##".to_string(),
            "18-Ene-2026".to_string(),
            "STORE".to_string(),
            "+".to_string(),
            "10.00".to_string(),
        ];
        assert!(n.normalize_regular_row(&cells, Sign::Unknown, pos()).is_err());
    }
}
