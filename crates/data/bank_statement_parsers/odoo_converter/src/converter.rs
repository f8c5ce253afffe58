use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use models::{CellValue, ConverterSettings, InputColumns, InputRow, OutputRow, StatementTable};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::error::{ConversionError, Result};

/// Fraction digits carried by every Odoo amount.
pub const AMOUNT_SCALE: u32 = 2;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const UNAMBIGUOUS_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
const MONTH_FIRST_FORMATS: [&str; 2] = ["%m/%d/%Y", "%m-%d-%Y"];
const DAY_FIRST_FORMATS: [&str; 2] = ["%d/%m/%Y", "%d-%m-%Y"];

/// Years an Excel 1900-system workbook can hold.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

/// Result of converting one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub rows: Vec<OutputRow>,
    /// Rows with every source field empty.
    pub skipped_rows: usize,
    /// Non-blank rows without an operation date, e.g. "Total" footers.
    pub undated_rows: usize,
}

/// Maps the original five-column bank layout onto the Odoo layout.
pub struct StatementConverter {
    pub columns: InputColumns,
    pub day_first: bool,
}

impl Default for StatementConverter {
    fn default() -> Self {
        Self::new(&ConverterSettings::default())
    }
}

impl StatementConverter {
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            columns: settings.columns.clone(),
            day_first: settings.day_first,
        }
    }

    /// Converts every dated row. Blank rows and rows with an empty operation
    /// date are counted and left out; a date that is present but unreadable
    /// aborts the whole conversion.
    pub fn convert(&self, table: &StatementTable) -> Result<Conversion> {
        let input = self.extract_rows(table)?;

        let mut rows = Vec::with_capacity(input.len());
        let mut skipped_rows = 0usize;
        let mut undated_rows = 0usize;

        for row in &input {
            if row.is_blank() {
                skipped_rows += 1;
                continue;
            }
            if row.operation_date.is_blank() {
                warn!(
                    row = row.row_number,
                    label = %cell_text(&row.description),
                    "row has no operation date, skipping"
                );
                undated_rows += 1;
                continue;
            }
            rows.push(self.convert_row(row)?);
        }

        info!(rows = rows.len(), skipped_rows, undated_rows, "converted statement");
        Ok(Conversion {
            rows,
            skipped_rows,
            undated_rows,
        })
    }

    /// Picks the five source fields out of each table row.
    pub fn extract_rows(&self, table: &StatementTable) -> Result<Vec<InputRow>> {
        let [c_date, c_desc, c_ref, c_debit, c_credit] = self.column_indices(table)?;

        let rows = (0..table.rows.len())
            .map(|i| InputRow {
                row_number: table.sheet_row_number(i),
                operation_date: table.cell(i, c_date).clone(),
                description: table.cell(i, c_desc).clone(),
                reference: table.cell(i, c_ref).clone(),
                debit: table.cell(i, c_debit).clone(),
                credit: table.cell(i, c_credit).clone(),
            })
            .collect();

        Ok(rows)
    }

    pub fn convert_row(&self, row: &InputRow) -> Result<OutputRow> {
        let date = parse_operation_date(&row.operation_date, self.day_first)
            .filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&d.year()))
            .ok_or_else(|| ConversionError::InvalidDate {
                row: row.row_number,
                value: cell_text(&row.operation_date),
            })?;

        let debit = normalize_amount(&row.debit);
        let credit = normalize_amount(&row.credit);

        if !debit.is_zero() && !credit.is_zero() {
            debug!(row = row.row_number, %debit, %credit, "both debit and credit set, debit wins");
        }

        Ok(OutputRow {
            date,
            label: cell_text(&row.description),
            reference: cell_text(&row.reference),
            amount: compute_amount(debit, credit),
        })
    }

    fn column_indices(&self, table: &StatementTable) -> Result<[usize; 5]> {
        let mut indices = [0usize; 5];
        let mut missing = Vec::new();

        for (slot, name) in indices.iter_mut().zip(self.columns.required()) {
            match table.column_index(name) {
                Some(idx) => *slot = idx,
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ConversionError::MissingColumns(missing));
        }
        Ok(indices)
    }
}

/// Required column names absent from the table header, in reporting order.
pub fn missing_columns(table: &StatementTable, columns: &InputColumns) -> Vec<String> {
    columns
        .required()
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

/// Debit wins when non-zero and becomes negative; otherwise the credit is used as is.
pub fn compute_amount(debit: Decimal, credit: Decimal) -> Decimal {
    let raw = if !debit.is_zero() { -debit } else { credit };

    let mut amount = raw.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven);
    if amount.is_zero() {
        amount.set_sign_positive(true);
    }
    amount.rescale(AMOUNT_SCALE);
    amount
}

/// Parses a Debit/Credit cell. Anything that cannot be read as a number is zero.
pub fn normalize_amount(cell: &CellValue) -> Decimal {
    match cell {
        CellValue::Number(v) => decimal_from_f64(*v),
        CellValue::Bool(b) => {
            if *b {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }
        }
        CellValue::Text(s) => normalize_amount_text(s),
        CellValue::Empty | CellValue::Date(_) => Decimal::ZERO,
    }
}

/// Handles text amounts like:
/// - "1234.56"
/// - "1 234,56" (space or NBSP thousands, comma decimal)
/// - "665,00 credit"
fn normalize_amount_text(s: &str) -> Decimal {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{00a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(&cleaned) {
        Ok(d) => d,
        Err(e) => {
            warn!(value = s, cleaned = %cleaned, error = %e, "unreadable amount, using 0");
            Decimal::ZERO
        }
    }
}

// Goes through the shortest round-trip text so 4631.36 stays 4631.36.
fn decimal_from_f64(v: f64) -> Decimal {
    if !v.is_finite() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(&v.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(v))
    {
        Some(d) => d,
        None => {
            warn!(value = v, "amount out of decimal range, using 0");
            Decimal::ZERO
        }
    }
}

/// Handles dates that may come as:
/// - a native spreadsheet date
/// - Excel serial number
/// - text: "2026-02-24", "2026-02-24 00:00:00", "24.02.2026", "02/24/2026", ...
pub fn parse_operation_date(cell: &CellValue, day_first: bool) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(v) => excel_serial_to_date(*v),
        CellValue::Text(s) => parse_date_text(s, day_first),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

fn parse_date_text(s: &str, day_first: bool) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    // Ambiguous slash/dash dates fall back to the other order when the preferred one is impossible.
    let (preferred, fallback) = if day_first {
        (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
    } else {
        (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
    };
    let formats = UNAMBIGUOUS_DATE_FORMATS
        .iter()
        .chain(preferred.iter())
        .chain(fallback.iter());
    for fmt in formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // "24/02/2026 10:15" and similar
    match s.split_once(char::is_whitespace) {
        Some((date_part, _)) => parse_date_text(date_part, day_first),
        None => None,
    }
}

/// Excel serial date conversion using 1899-12-30 base (common convention).
pub fn excel_serial_to_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(v.floor() as u64))
}

/// Text copy of a cell for Label/Reference.
pub fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Number(v) => v.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}
