use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Datelike;
use clap::ValueEnum;
use models::{ConverterSettings, OutputRow};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};
use tracing::info;

use crate::error::{ConversionError, Result};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const AMOUNT_FORMAT: &str = "0.00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    /// Format implied by the file extension; unknown extensions mean xlsx.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Xlsx,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Writes converted rows in the Odoo layout.
pub struct StatementWriter {
    pub sheet_name: String,
}

impl Default for StatementWriter {
    fn default() -> Self {
        Self::new(&ConverterSettings::default())
    }
}

impl StatementWriter {
    pub fn new(settings: &ConverterSettings) -> Self {
        Self {
            sheet_name: settings.output_sheet.clone(),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, rows: &[OutputRow], path: P, format: OutputFormat) -> Result<PathBuf> {
        let path = path.as_ref();
        let target = path.display().to_string();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConversionError::write(&target, e))?;
        }

        match format {
            OutputFormat::Xlsx => self.write_xlsx(rows, path)?,
            OutputFormat::Csv => {
                let file = File::create(path).map_err(|e| ConversionError::write(&target, e))?;
                self.write_csv(rows, file)
                    .map_err(|e| ConversionError::write(&target, e))?;
            }
            OutputFormat::Json => {
                let file = File::create(path).map_err(|e| ConversionError::write(&target, e))?;
                self.write_json(rows, file)
                    .map_err(|e| ConversionError::write(&target, e))?;
            }
        }

        info!(path = %target, rows = rows.len(), format = format.extension(), "wrote Odoo statement");
        Ok(path.to_path_buf())
    }

    pub fn write_xlsx(&self, rows: &[OutputRow], path: &Path) -> Result<()> {
        let target = path.display().to_string();
        let mut workbook = self
            .build_workbook(rows)
            .map_err(|e| ConversionError::write(&target, e))?;
        workbook
            .save(path)
            .map_err(|e| ConversionError::write(&target, e))
    }

    /// The xlsx file as bytes, ready to be handed out as a download.
    pub fn xlsx_to_buffer(&self, rows: &[OutputRow]) -> Result<Vec<u8>> {
        let mut workbook = self
            .build_workbook(rows)
            .map_err(|e| ConversionError::write("<memory>", e))?;
        workbook
            .save_to_buffer()
            .map_err(|e| ConversionError::write("<memory>", e))
    }

    pub fn write_csv<W: Write>(&self, rows: &[OutputRow], out: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        if rows.is_empty() {
            wtr.write_record(OutputRow::HEADERS)?;
        }
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, rows: &[OutputRow], out: W) -> serde_json::Result<()> {
        let mut out = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut out, rows)?;
        out.flush().map_err(serde_json::Error::io)
    }

    fn build_workbook(&self, rows: &[OutputRow]) -> std::result::Result<Workbook, XlsxError> {
        let mut workbook = Workbook::new();

        let header_format = Format::new().set_bold();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        let amount_format = Format::new().set_num_format(AMOUNT_FORMAT);

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, header) in OutputRow::HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (idx, row) in rows.iter().enumerate() {
            let r = (idx + 1) as u32;

            // from_ymd rejects years outside Excel's 1900..=9999
            let year = row.date.year().clamp(0, i32::from(u16::MAX)) as u16;
            let date = ExcelDateTime::from_ymd(year, row.date.month() as u8, row.date.day() as u8)?;
            worksheet.write_datetime_with_format(r, 0, &date, &date_format)?;

            worksheet.write_string(r, 1, &row.label)?;
            worksheet.write_string(r, 2, &row.reference)?;

            // nearest f64 to the two-decimal amount
            let amount = f64::from_str(&row.amount.to_string()).unwrap_or_default();
            worksheet.write_number_with_format(r, 3, amount, &amount_format)?;
        }

        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();

        Ok(workbook)
    }
}
