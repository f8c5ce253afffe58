use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Input table models

/// A single spreadsheet cell, independent of the reader that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
	Empty,
	Text(String),
	Number(f64),
	Bool(bool),
	Date(NaiveDate),
}

impl CellValue {
	/// Empty cells and whitespace-only text both count as blank.
	pub fn is_blank(&self) -> bool {
		match self {
			CellValue::Empty => true,
			CellValue::Text(s) => s.trim().is_empty(),
			_ => false,
		}
	}
}

impl From<&str> for CellValue {
	fn from(s: &str) -> Self {
		CellValue::Text(s.to_string())
	}
}

impl From<f64> for CellValue {
	fn from(v: f64) -> Self {
		CellValue::Number(v)
	}
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(CellValue::Empty)
	}
}

/// Header row plus data rows, as read from the original statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTable {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<CellValue>>,
	/// 1-based spreadsheet row number of the header, used to number data rows in errors.
	pub header_row: usize,
}

impl StatementTable {
	pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
		Self {
			headers,
			rows,
			header_row: 1,
		}
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.headers.iter().position(|h| h.trim() == name)
	}

	/// Short rows are padded with `CellValue::Empty`.
	pub fn cell(&self, row: usize, col: usize) -> &CellValue {
		const EMPTY: &CellValue = &CellValue::Empty;
		self.rows
			.get(row)
			.and_then(|r| r.get(col))
			.unwrap_or(EMPTY)
	}

	/// Spreadsheet row number (1-based) of the data row at `row`.
	pub fn sheet_row_number(&self, row: usize) -> usize {
		self.header_row + row + 1
	}
}

/// The five source fields of one statement line.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
	pub row_number: usize,
	pub operation_date: CellValue,
	pub description: CellValue,
	pub reference: CellValue,
	pub debit: CellValue,
	pub credit: CellValue,
}

impl InputRow {
	pub fn is_blank(&self) -> bool {
		[
			&self.operation_date,
			&self.description,
			&self.reference,
			&self.debit,
			&self.credit,
		]
		.iter()
		.all(|c| c.is_blank())
	}
}

// Output models

/// One line of the Odoo bank statement layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
	#[serde(rename = "Date")]
	pub date: NaiveDate,
	#[serde(rename = "Label")]
	pub label: String,
	#[serde(rename = "Reference")]
	pub reference: String,
	#[serde(rename = "Amount")]
	pub amount: Decimal,
}

impl OutputRow {
	pub const HEADERS: [&'static str; 4] = ["Date", "Label", "Reference", "Amount"];

	/// Date as `YYYY-MM-DD`.
	pub fn formatted_date(&self) -> String {
		self.date.format("%Y-%m-%d").to_string()
	}
}

// Settings models

/// Header names of the original statement layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputColumns {
	pub operation_date: String,
	pub description: String,
	pub reference: String,
	pub debit: String,
	pub credit: String,
}

impl Default for InputColumns {
	fn default() -> Self {
		Self {
			operation_date: "Operation DT".to_string(),
			description: "Detailed description".to_string(),
			reference: "Reference".to_string(),
			debit: "Debit".to_string(),
			credit: "Credit".to_string(),
		}
	}
}

impl InputColumns {
	/// Required names in reporting order.
	pub fn required(&self) -> [&str; 5] {
		[
			&self.operation_date,
			&self.description,
			&self.reference,
			&self.debit,
			&self.credit,
		]
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
	pub columns: InputColumns,
	/// Sheet to read; the first sheet when not set.
	pub input_sheet: Option<String>,
	pub output_sheet: String,
	pub output_file_name: String,
	/// Read ambiguous `01/02/2026` style dates as day first.
	pub day_first: bool,
	pub csv_delimiter: char,
}

impl Default for ConverterSettings {
	fn default() -> Self {
		Self {
			columns: InputColumns::default(),
			input_sheet: None,
			output_sheet: "OdooStatement".to_string(),
			output_file_name: "Odoo_bank_statement.xlsx".to_string(),
			day_first: false,
			csv_delimiter: ',',
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_cell_pads_short_rows() {
		let table = StatementTable::new(
			vec!["A".to_string(), "B".to_string()],
			vec![vec![CellValue::from("x")]],
		);
		assert_eq!(table.cell(0, 0), &CellValue::Text("x".to_string()));
		assert_eq!(table.cell(0, 1), &CellValue::Empty);
		assert_eq!(table.cell(5, 0), &CellValue::Empty);
	}

	#[test]
	fn test_column_index_trims_headers() {
		let table = StatementTable::new(vec![" Debit ".to_string(), "Credit".to_string()], vec![]);
		assert_eq!(table.column_index("Debit"), Some(0));
		assert_eq!(table.column_index("Credit"), Some(1));
		assert_eq!(table.column_index("debit"), None);
	}

	#[test]
	fn test_sheet_row_number() {
		let mut table = StatementTable::new(vec![], vec![]);
		assert_eq!(table.sheet_row_number(0), 2);
		table.header_row = 4;
		assert_eq!(table.sheet_row_number(2), 7);
	}

	#[test]
	fn test_input_row_blank() {
		let row = InputRow {
			row_number: 2,
			operation_date: CellValue::Empty,
			description: CellValue::from("   "),
			reference: CellValue::Empty,
			debit: CellValue::Empty,
			credit: CellValue::Empty,
		};
		assert!(row.is_blank());

		let row = InputRow {
			credit: CellValue::Number(0.0),
			..row
		};
		assert!(!row.is_blank());
	}

	#[test]
	fn test_output_row_serializes_odoo_columns() {
		let row = OutputRow {
			date: NaiveDate::from_ymd_opt(2026, 2, 24).unwrap(),
			label: "Foo".to_string(),
			reference: "R1".to_string(),
			amount: Decimal::from_str("-50.00").unwrap(),
		};
		let json = serde_json::to_value(&row).unwrap();
		assert_eq!(json["Date"], "2026-02-24");
		assert_eq!(json["Label"], "Foo");
		assert_eq!(json["Reference"], "R1");
		assert_eq!(json["Amount"], "-50.00");
		assert_eq!(row.formatted_date(), "2026-02-24");
	}

	#[test]
	fn test_settings_defaults_fill_missing_fields() {
		let settings: ConverterSettings =
			serde_json::from_str(r#"{ "columns": { "debit": "Dare" }, "day_first": true }"#).unwrap();
		assert_eq!(settings.columns.debit, "Dare");
		assert_eq!(settings.columns.credit, "Credit");
		assert_eq!(settings.columns.operation_date, "Operation DT");
		assert!(settings.day_first);
		assert_eq!(settings.output_sheet, "OdooStatement");
		assert_eq!(settings.csv_delimiter, ',');
	}
}
