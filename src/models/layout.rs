//! Fixed layout assumptions for the supported statement format.
//!
//! The statement prints transactions in two table shapes: installment
//! purchases ("meses sin intereses", 7 columns) and regular charges
//! ("no a meses", 5 columns with a narrow +/- marker column). Column roles
//! are compile-time constants, not configuration.

use serde::Serialize;

/// Resolution every page is rasterized at before cell extraction.
pub const RENDER_DPI: u32 = 300;

/// What kind of content a column is expected to hold. Drives the
/// recognition charset preference and the normalizer's correction scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnRole {
    Date,
    Description,
    Amount,
    /// The narrow +/- column; read by pixel analysis, not OCR.
    SignMarker,
    Percentage,
    FreeText,
}

impl ColumnRole {
    /// Whether `c` belongs to the charset this role is expected to produce.
    /// Used to score competing recognition attempts.
    pub fn expects_char(&self, c: char) -> bool {
        match self {
            ColumnRole::Date => c.is_ascii_digit() || c.is_ascii_alphabetic() || c == '-',
            ColumnRole::Amount => c.is_ascii_digit() || matches!(c, '.' | ',' | '$' | '-'),
            ColumnRole::Percentage => c.is_ascii_digit() || matches!(c, '.' | '%'),
            ColumnRole::SignMarker => matches!(c, '+' | '-'),
            ColumnRole::Description | ColumnRole::FreeText => {
                c.is_alphanumeric() || c.is_ascii_punctuation() || c == ' '
            }
        }
    }
}

/// The two table shapes the locator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementLayout {
    /// Fecha operación, fecha cargo, descripción, +/- marker, monto.
    Regular,
    /// Fecha, descripción, monto original, saldo pendiente, pago requerido,
    /// núm. de pago, tasa de interés.
    Installment,
}

impl StatementLayout {
    pub const REGULAR_ROLES: [ColumnRole; 5] = [
        ColumnRole::Date,
        ColumnRole::Date,
        ColumnRole::Description,
        ColumnRole::SignMarker,
        ColumnRole::Amount,
    ];

    pub const INSTALLMENT_ROLES: [ColumnRole; 7] = [
        ColumnRole::Date,
        ColumnRole::Description,
        ColumnRole::Amount,
        ColumnRole::Amount,
        ColumnRole::Amount,
        ColumnRole::FreeText,
        ColumnRole::Percentage,
    ];

    pub fn from_column_count(count: usize) -> Option<StatementLayout> {
        match count {
            5 => Some(StatementLayout::Regular),
            7 => Some(StatementLayout::Installment),
            _ => None,
        }
    }

    pub fn roles(&self) -> &'static [ColumnRole] {
        match self {
            StatementLayout::Regular => &Self::REGULAR_ROLES,
            StatementLayout::Installment => &Self::INSTALLMENT_ROLES,
        }
    }

    pub fn column_count(&self) -> usize {
        self.roles().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_from_column_count() {
        assert_eq!(StatementLayout::from_column_count(5), Some(StatementLayout::Regular));
        assert_eq!(StatementLayout::from_column_count(7), Some(StatementLayout::Installment));
        assert_eq!(StatementLayout::from_column_count(4), None);
        assert_eq!(StatementLayout::from_column_count(6), None);
    }

    #[test]
    fn date_role_charset() {
        assert!("17-Ene-2026".chars().all(|c| ColumnRole::Date.expects_char(c)));
        assert!(!ColumnRole::Date.expects_char('$'));
        assert!(!ColumnRole::Amount.expects_char('E'));
    }
}
