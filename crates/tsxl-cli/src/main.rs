//! tsxl CLI - run and check Excel command files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tsxl::prelude::*;
use tsxl_core::NameScope;
use tsxl_xlsx::XlsxReader;

#[derive(Parser)]
#[command(name = "tsxl")]
#[command(author, version, about = "Run Excel command files")]
struct Cli {
    /// Debug logging; RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command file
    Run {
        /// Command file
        file: PathBuf,

        /// Directory relative paths resolve against (default: the command
        /// file's directory)
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// Set a property before running, as Name=Value
        #[arg(short, long = "property", value_parser = parse_property)]
        properties: Vec<(String, String)>,

        /// Keep going after a failed command
        #[arg(long)]
        continue_on_error: bool,

        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },

    /// Show the sheets, tables and names of a workbook
    Info {
        /// Input workbook (xlsx)
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check every command in a command file without running it
    Check {
        /// Command file
        file: PathBuf,
    },
}

fn parse_property(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected Name=Value, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose > 0 { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            file,
            working_dir,
            properties,
            continue_on_error,
            strict,
        } => run(&file, working_dir, properties, continue_on_error, strict),
        Commands::Info { input, json } => show_info(&input, json),
        Commands::Check { file } => check(&file),
    }
}

fn read_command_file(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read command file '{}'", file.display()))
}

fn print_records(summary: &RunSummary, all: bool) {
    for record in &summary.records {
        let severity = record.status.severity();
        if severity == Severity::Success && !all {
            continue;
        }
        eprintln!("{} line {}: {}", severity, record.line, record.text);
        for message in record.status.messages() {
            eprintln!("    {}", message.message);
        }
    }
}

fn run(
    file: &Path,
    working_dir: Option<PathBuf>,
    properties: Vec<(String, String)>,
    continue_on_error: bool,
    strict: bool,
) -> Result<()> {
    let working_dir = match working_dir {
        Some(dir) => dir,
        None => file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or(std::env::current_dir()?),
    };

    let mut config = ProcessorConfig::default()
        .with_working_dir(working_dir)
        .continue_on_error(continue_on_error)
        .warnings_fail(strict);
    for (name, value) in properties {
        config = config.with_property(name, TableValue::String(value));
    }
    let mut processor = CommandProcessor::new(config);
    let summary = processor
        .run_file(file)
        .with_context(|| format!("Failed to read command file '{}'", file.display()))?;

    // Workbooks left open by KeepOpen=True are still written
    let open = processor.registry().open_paths();
    if !open.is_empty() {
        for path in &open {
            log::warn!("{} was never closed; writing it now", path.display());
        }
        processor
            .registry()
            .close_all()
            .context("Failed to write workbooks left open")?;
    }

    print_records(&summary, true);
    eprintln!(
        "{} commands: {} warning(s), {} failure(s){}",
        summary.records.len(),
        summary.count(Severity::Warning),
        summary.count(Severity::Failure),
        if summary.exited { " (exited)" } else { "" }
    );
    if summary.severity() == Severity::Failure {
        bail!("command file '{}' failed", file.display());
    }
    Ok(())
}

fn check(file: &Path) -> Result<()> {
    let text = read_command_file(file)?;
    let working_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
    let processor = CommandProcessor::new(ProcessorConfig::default().with_working_dir(working_dir));
    let summary = processor.check_script(&text);
    print_records(&summary, false);
    let failures = summary.count(Severity::Failure);
    if failures > 0 {
        bail!("{} of {} commands have problems", failures, summary.records.len());
    }
    println!("{} commands OK", summary.records.len());
    Ok(())
}

#[derive(Serialize)]
struct WorkbookInfo {
    file: String,
    date_1904: bool,
    sheets: Vec<SheetInfo>,
    names: Vec<NameInfo>,
}

#[derive(Serialize)]
struct SheetInfo {
    name: String,
    used_range: Option<String>,
    tables: Vec<TableInfo>,
    conditional_formats: usize,
    freeze_pane: Option<String>,
}

#[derive(Serialize)]
struct TableInfo {
    name: String,
    range: String,
    columns: Vec<String>,
}

#[derive(Serialize)]
struct NameInfo {
    name: String,
    refers_to: String,
    sheet: Option<String>,
}

fn workbook_info(input: &Path, workbook: &Workbook) -> WorkbookInfo {
    let sheets = workbook
        .worksheets()
        .map(|sheet| SheetInfo {
            name: sheet.name().to_string(),
            used_range: sheet.used_range().map(|r| r.to_string()),
            tables: sheet
                .tables()
                .iter()
                .map(|t| TableInfo {
                    name: t.name.clone(),
                    range: t.area.to_string(),
                    columns: t.columns.clone(),
                })
                .collect(),
            conditional_formats: sheet.conditional_formats().len(),
            freeze_pane: sheet
                .freeze_pane()
                .map(|f| f.top_left_cell().to_a1_string()),
        })
        .collect();
    let names = workbook
        .names()
        .iter()
        .filter(|n| !n.is_builtin())
        .map(|n| NameInfo {
            name: n.name.clone(),
            refers_to: n.refers_to.clone(),
            sheet: match n.scope {
                NameScope::Workbook => None,
                NameScope::Sheet(i) => workbook.worksheet(i).map(|s| s.name().to_string()),
            },
        })
        .collect();
    WorkbookInfo {
        file: input.display().to_string(),
        date_1904: workbook.is_date_1904(),
        sheets,
        names,
    }
}

fn show_info(input: &Path, json: bool) -> Result<()> {
    let workbook = XlsxReader::read_file(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;
    let info = workbook_info(input, &workbook);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", info.file);
    println!("Sheets: {}", info.sheets.len());
    for (i, sheet) in info.sheets.iter().enumerate() {
        println!();
        println!("  Sheet {}: \"{}\"", i, sheet.name);
        match &sheet.used_range {
            Some(range) => println!("    Used range: {}", range),
            None => println!("    Used range: empty"),
        }
        for table in &sheet.tables {
            println!("    Table {} ({}): {}", table.name, table.range, table.columns.join(", "));
        }
        if sheet.conditional_formats > 0 {
            println!("    Conditional formats: {}", sheet.conditional_formats);
        }
        if let Some(cell) = &sheet.freeze_pane {
            println!("    Frozen at: {}", cell);
        }
    }
    if !info.names.is_empty() {
        println!();
        println!("Names:");
        for name in &info.names {
            match &name.sheet {
                Some(sheet) => println!("  {} = {} (sheet {})", name.name, name.refers_to, sheet),
                None => println!("  {} = {}", name.name, name.refers_to),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsxl_xlsx::XlsxWriter;

    #[test]
    fn test_parse_property() {
        assert_eq!(parse_property("Year=2020"), Ok(("Year".into(), "2020".into())));
        assert_eq!(parse_property("Path=a=b"), Ok(("Path".into(), "a=b".into())));
        assert!(parse_property("=1").is_err());
        assert!(parse_property("nothing").is_err());
    }

    #[test]
    fn test_workbook_info() {
        let mut workbook = Workbook::new();
        workbook.define_name("Flows", "Sheet1!$A$1:$A$3").unwrap();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(2, 1, 5.0).unwrap();
        sheet.set_freeze_panes(0, 1).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.xlsx");
        XlsxWriter::write_file(&workbook, &path).unwrap();
        let read = XlsxReader::read_file(&path).unwrap();
        let info = workbook_info(&path, &read);

        assert_eq!(info.sheets[0].used_range.as_deref(), Some("B3"));
        assert_eq!(info.sheets[0].freeze_pane.as_deref(), Some("A2"));
        assert_eq!(info.names.len(), 1);
        assert_eq!(info.names[0].refers_to, "Sheet1!$A$1:$A$3");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["sheets"][0]["name"], "Sheet1");
    }
}
