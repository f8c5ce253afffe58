pub mod converter;
pub mod error;
pub mod reader;
pub mod writer;

use std::path::{Path, PathBuf};

use models::ConverterSettings;
use tracing::info;

pub use crate::converter::{
    cell_text, compute_amount, missing_columns, normalize_amount, parse_operation_date, Conversion,
    StatementConverter,
};
pub use crate::error::{ConversionError, Result};
pub use crate::reader::{InputFormat, StatementReader};
pub use crate::writer::{OutputFormat, StatementWriter};

pub const PARSER_NAME: &str = "odoo_converter";

/// Outcome of a file-to-file conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub conversion: Conversion,
    pub output_path: PathBuf,
}

/// Reads `input`, converts it to the Odoo layout and writes it to `output`.
/// Nothing is written when reading or converting fails, or when `output`
/// names the input file itself.
pub fn convert_file(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    settings: &ConverterSettings,
) -> Result<ConversionSummary> {
    if same_file(input, output) {
        return Err(ConversionError::write(
            output.display().to_string(),
            "output would overwrite the input file",
        ));
    }

    info!(parser = PARSER_NAME, input = %input.display(), output = %output.display(), "converting statement");
    let table = StatementReader::new(settings).read_file(input)?;
    let conversion = StatementConverter::new(settings).convert(&table)?;
    let output_path = StatementWriter::new(settings).write(&conversion.rows, output, format)?;

    Ok(ConversionSummary {
        conversion,
        output_path,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
