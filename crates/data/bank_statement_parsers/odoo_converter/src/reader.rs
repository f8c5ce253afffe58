use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use models::{CellValue, ConverterSettings, InputColumns, StatementTable};
use tracing::{debug, info};

use crate::converter::cell_text;
use crate::error::{ConversionError, Result};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Workbook,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Ok(InputFormat::Workbook)
        } else if ext == "csv" {
            Ok(InputFormat::Csv)
        } else {
            Err(ConversionError::read(
                path.display().to_string(),
                format!("unsupported file extension '{}' (expected xlsx, xls, ods or csv)", ext),
            ))
        }
    }
}

/// Reads an original bank statement into a header + rows table.
pub struct StatementReader {
    pub columns: InputColumns,
    pub sheet: Option<String>,
    pub csv_delimiter: char,
}

impl Default for StatementReader {
    fn default() -> Self {
        Self::new(&ConverterSettings::default())
    }
}

impl StatementReader {
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            columns: settings.columns.clone(),
            sheet: settings.input_sheet.clone(),
            csv_delimiter: settings.csv_delimiter,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<StatementTable> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let table = match InputFormat::from_path(path)? {
            InputFormat::Workbook => {
                let mut workbook =
                    open_workbook_auto(path).map_err(|e| ConversionError::read(&source, e))?;
                self.read_workbook(&mut workbook, &source)?
            }
            InputFormat::Csv => self.read_csv(path)?,
        };

        info!(
            path = %source,
            header_row = table.header_row,
            rows = table.rows.len(),
            "read statement"
        );
        Ok(table)
    }

    /// Reads a workbook held in memory (xlsx, xls, xlsb or ods, detected from content).
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<StatementTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ConversionError::read("<memory>", e))?;
        self.read_workbook(&mut workbook, "<memory>")
    }

    fn read_workbook<RS: Read + Seek>(&self, workbook: &mut Sheets<RS>, source: &str) -> Result<StatementTable> {
        let sheet_names = workbook.sheet_names();

        let sheet_name = match &self.sheet {
            Some(name) if sheet_names.contains(name) => name.clone(),
            Some(name) => {
                return Err(ConversionError::read(
                    source,
                    format!("sheet '{}' not found (available: {})", name, sheet_names.join(", ")),
                ))
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ConversionError::read(source, "no sheets found in workbook"))?,
        };

        debug!(sheet = %sheet_name, "reading worksheet");
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ConversionError::read(source, e))?;

        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        Ok(self.table_from_rows(range_to_cells(&range), first_row))
    }

    fn read_csv(&self, path: &Path) -> Result<StatementTable> {
        let source = path.display().to_string();
        let delimiter = u8::try_from(self.csv_delimiter).map_err(|_| {
            ConversionError::read(
                &source,
                format!("csv delimiter '{}' is not a single-byte character", self.csv_delimiter),
            )
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ConversionError::read(&source, e))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ConversionError::read(&source, e))?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(self.table_from_rows(rows, 0))
    }

    /// Splits raw rows into header and data. `first_row` is the 0-based sheet
    /// row of `rows[0]`.
    pub fn table_from_rows(&self, mut rows: Vec<Vec<CellValue>>, first_row: usize) -> StatementTable {
        let Some(header_idx) = self.find_header_row(&rows) else {
            return StatementTable::default();
        };

        let data = rows.split_off(header_idx + 1);
        let headers = rows[header_idx]
            .iter()
            .map(|c| cell_text(c).trim().to_string())
            .collect();

        StatementTable {
            headers,
            rows: data,
            header_row: first_row + header_idx + 1,
        }
    }

    /// First row carrying every required column name; otherwise the first
    /// non-blank row, so the converter can report what is missing.
    fn find_header_row(&self, rows: &[Vec<CellValue>]) -> Option<usize> {
        let required = self.columns.required();

        let full_match = rows.iter().position(|row| {
            let names: Vec<String> = row.iter().map(|c| cell_text(c).trim().to_string()).collect();
            required.iter().all(|r| names.iter().any(|n| n.as_str() == *r))
        });

        full_match.or_else(|| rows.iter().position(|row| row.iter().any(|c| !c.is_blank())))
    }
}

fn range_to_cells(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    range
        .rows()
        .map(|row| row.iter().map(to_cell_value).collect())
        .collect()
}

/// Handles cells that may come as:
/// - text, numbers, booleans
/// - Excel date-time (serial number in the 1900 or 1904 system)
/// - ISO date-time strings
fn to_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // as_datetime honours the workbook's 1900/1904 date system
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::Date(d.date()))
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|s| CellValue::from(*s)).collect()
    }

    #[test]
    fn test_input_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("a.xlsx")).unwrap(), InputFormat::Workbook);
        assert_eq!(InputFormat::from_path(Path::new("a.XLS")).unwrap(), InputFormat::Workbook);
        assert_eq!(InputFormat::from_path(Path::new("a.ods")).unwrap(), InputFormat::Workbook);
        assert_eq!(InputFormat::from_path(Path::new("a.csv")).unwrap(), InputFormat::Csv);

        let err = InputFormat::from_path(Path::new("statement.pdf")).unwrap_err();
        assert!(matches!(err, ConversionError::ReadFailure { .. }));
        assert!(InputFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_header_row_found_below_preamble() {
        let rows = vec![
            text_row(&["Intesa Sanpaolo - Lista movimenti"]),
            vec![],
            text_row(&["Operation DT", "Detailed description", "Reference", "Debit", "Credit"]),
            text_row(&["2026-02-24", "Foo", "R1", "50", ""]),
        ];
        let table = StatementReader::default().table_from_rows(rows, 0);
        assert_eq!(table.header_row, 3);
        assert_eq!(table.headers[0], "Operation DT");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.sheet_row_number(0), 4);
    }

    #[test]
    fn test_header_row_falls_back_to_first_non_blank() {
        let rows = vec![
            vec![CellValue::Empty, CellValue::Empty],
            text_row(&["Date", "Amount"]),
            text_row(&["2026-02-24", "1"]),
        ];
        let table = StatementReader::default().table_from_rows(rows, 10);
        assert_eq!(table.headers, vec!["Date", "Amount"]);
        assert_eq!(table.header_row, 12);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_empty_sheet_gives_empty_table() {
        let table = StatementReader::default().table_from_rows(vec![], 0);
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_header_cells_are_trimmed() {
        let rows = vec![text_row(&[
            " Operation DT ",
            "Detailed description",
            "Reference",
            "Debit ",
            "Credit",
        ])];
        let table = StatementReader::default().table_from_rows(rows, 0);
        assert_eq!(table.header_row, 1);
        assert_eq!(table.column_index("Debit"), Some(3));
    }

    #[test]
    fn test_to_cell_value() {
        assert_eq!(to_cell_value(&Data::String("x".into())), CellValue::from("x"));
        assert_eq!(to_cell_value(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(to_cell_value(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(to_cell_value(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(to_cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(
            to_cell_value(&Data::DateTimeIso("2026-02-24T00:00:00".into())),
            CellValue::from("2026-02-24T00:00:00")
        );
    }

    #[test]
    fn test_read_csv_with_semicolons() {
        let dir = std::env::temp_dir().join(format!("odoo_converter_reader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("statement.csv");
        std::fs::write(
            &path,
            "Operation DT;Detailed description;Reference;Debit;Credit\n\
             24/02/2026;Foo;R1;665,00;\n\
             25/02/2026;Bar;R2;;1 234,50\n",
        )
        .unwrap();

        let mut settings = ConverterSettings::default();
        settings.csv_delimiter = ';';
        let table = StatementReader::new(&settings).read_file(&path).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][3], CellValue::from("665,00"));
        assert_eq!(table.rows[0][4], CellValue::Empty);
        assert_eq!(table.rows[1][4], CellValue::from("1 234,50"));
    }

    #[test]
    fn test_read_missing_file_is_read_failure() {
        let err = StatementReader::default()
            .read_file("/definitely/not/here/statement.xlsx")
            .unwrap_err();
        assert!(matches!(err, ConversionError::ReadFailure { .. }));
    }

    #[test]
    fn test_read_bytes_rejects_garbage() {
        let err = StatementReader::default().read_bytes(b"not a workbook").unwrap_err();
        assert!(matches!(err, ConversionError::ReadFailure { .. }));
    }
}
