use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use models::{ConverterSettings, OutputRow};
use tracing::debug;

use odoo_converter::{convert_file, OutputFormat, PARSER_NAME};

/// Transform an original bank statement (Excel or CSV) into the Odoo format.
#[derive(Debug, Parser)]
#[command(name = PARSER_NAME, version, about)]
struct Cli {
    /// Original bank statement (.xlsx, .xls, .ods or .csv)
    input: PathBuf,

    /// Output file. Defaults to the configured output name next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format. Inferred from the output extension when omitted.
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Sheet to read instead of the first one
    #[arg(long)]
    sheet: Option<String>,

    /// Settings JSON (column names, sheet names, date order)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of converted rows to print (0 disables the preview)
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let mut settings = settings_loader::load_settings_with_fallback(cli.settings.as_ref())?;
    if let Some(sheet) = &cli.sheet {
        settings.input_sheet = Some(sheet.clone());
    }
    debug!(?settings, "effective settings");

    let (output, format) = resolve_output(&cli.input, cli.output.as_deref(), cli.format, &settings);

    println!("📖 [{}] Reading {}", PARSER_NAME, cli.input.display());
    let summary = convert_file(&cli.input, &output, format, &settings)
        .with_context(|| format!("Failed converting {}", cli.input.display()))?;

    let rows = &summary.conversion.rows;
    if cli.preview > 0 && !rows.is_empty() {
        print_preview(rows, cli.preview);
    }

    println!("\n📊 Summary:");
    println!("✓ Rows converted: {}", rows.len());
    if summary.conversion.skipped_rows > 0 {
        println!("✓ Blank rows skipped: {}", summary.conversion.skipped_rows);
    }
    if summary.conversion.undated_rows > 0 {
        println!("⚠️  Rows without a date skipped: {}", summary.conversion.undated_rows);
    }
    println!("✅ Odoo statement written to: {}", summary.output_path.display());

    Ok(())
}

/// Explicit output wins. Otherwise the configured file name is placed next to
/// the input, with its extension following `--format` when one is given.
fn resolve_output(
    input: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    settings: &ConverterSettings,
) -> (PathBuf, OutputFormat) {
    if let Some(path) = output {
        let format = format.unwrap_or_else(|| OutputFormat::from_path(path));
        return (path.to_path_buf(), format);
    }

    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let mut path = dir.join(&settings.output_file_name);

    match format {
        Some(format) => {
            path.set_extension(format.extension());
            (path, format)
        }
        None => {
            let format = OutputFormat::from_path(&path);
            (path, format)
        }
    }
}

fn print_preview(rows: &[OutputRow], limit: usize) {
    println!("\n### Converted (Odoo) format, first {} row(s)", limit.min(rows.len()));
    println!(
        "  {:<10}  {:<40}  {:<16}  {:>12}",
        OutputRow::HEADERS[0],
        OutputRow::HEADERS[1],
        OutputRow::HEADERS[2],
        OutputRow::HEADERS[3]
    );
    for row in rows.iter().take(limit) {
        println!(
            "  {:<10}  {:<40}  {:<16}  {:>12}",
            row.formatted_date(),
            truncate(&row.label, 40),
            truncate(&row.reference, 16),
            row.amount.to_string()
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_resolve_output_explicit_path() {
        let settings = ConverterSettings::default();
        let (path, format) = resolve_output(
            Path::new("in/statement.xlsx"),
            Some(Path::new("out/odoo.csv")),
            None,
            &settings,
        );
        assert_eq!(path, PathBuf::from("out/odoo.csv"));
        assert_eq!(format, OutputFormat::Csv);
    }

    #[test]
    fn test_resolve_output_default_next_to_input() {
        let settings = ConverterSettings::default();
        let (path, format) = resolve_output(Path::new("in/statement.xls"), None, None, &settings);
        assert_eq!(path, PathBuf::from("in/Odoo_bank_statement.xlsx"));
        assert_eq!(format, OutputFormat::Xlsx);
    }

    #[test]
    fn test_resolve_output_format_changes_extension() {
        let settings = ConverterSettings::default();
        let (path, format) = resolve_output(
            Path::new("statement.xlsx"),
            None,
            Some(OutputFormat::Json),
            &settings,
        );
        assert_eq!(path, PathBuf::from("Odoo_bank_statement.json"));
        assert_eq!(format, OutputFormat::Json);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["odoo_converter", "in.xlsx", "-f", "csv", "--preview", "0", "-vv"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Csv));
        assert_eq!(cli.preview, 0);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_is_named_after_parser() {
        assert_eq!(Cli::command().get_name(), PARSER_NAME);
        Cli::command().debug_assert();
    }
}
