//! Table commands for delimited (CSV) files

use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::table::delimited::{
    DelimitedReadOptions, DelimitedReader, DelimitedWriteOptions, DelimitedWriter,
};

/// `Delimiter` as one byte; `Tab` and `\t` mean a tab
fn parse_delimiter(value: &str) -> std::result::Result<u8, String> {
    if value.eq_ignore_ascii_case("tab") || value == "\\t" {
        return Ok(b'\t');
    }
    match value.as_bytes() {
        [b] if b.is_ascii() && !b.is_ascii_alphanumeric() && *b != b'"' => Ok(*b),
        _ => Err("expected a single punctuation character or Tab".to_string()),
    }
}

fn delimiter(args: &Args<'_>) -> Result<u8> {
    // Raw value: a lone space is a valid delimiter
    match args.get_raw("Delimiter").filter(|v| !v.is_empty()) {
        None => Ok(b','),
        Some(v) => parse_delimiter(&v).map_err(|e| CommandError::invalid_value(v, e)),
    }
}

command_struct!(
    /// `ReadTableFromDelimitedFile`: read a CSV file into a table
    ///
    /// The first non-comment line holds the column names; column types are
    /// detected from the values.
    ReadTableFromDelimitedFile,
    "ReadTableFromDelimitedFile"
);

impl Command for ReadTableFromDelimitedFile {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["TableID", "InputFile", "Delimiter", "Comment"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("TableID")
            .require("InputFile")
            .validate("Delimiter", parse_delimiter)
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, _status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let table_id = args.require("TableID")?;
        let path = args.require_path("InputFile")?;
        if !path.exists() {
            return Err(CommandError::FileNotFound(path));
        }
        let options = DelimitedReadOptions {
            delimiter: delimiter(&args)?,
            comment: args.get("Comment").unwrap_or_else(|| "#".to_string()),
            ..Default::default()
        };
        let table = DelimitedReader::read_file(&path, &table_id, &options)?;
        log::info!(
            "read table {} ({} rows) from {}",
            table_id,
            table.row_count(),
            path.display()
        );
        processor.set_table(table);
        Ok(())
    }
}

command_struct!(
    /// `WriteTableToDelimitedFile`: write a table as CSV with a header row
    WriteTableToDelimitedFile,
    "WriteTableToDelimitedFile"
);

impl Command for WriteTableToDelimitedFile {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["TableID", "OutputFile", "Delimiter"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("TableID")
            .require("OutputFile")
            .validate("Delimiter", parse_delimiter)
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, _status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let table = processor.require_table(&args.require("TableID")?)?;
        let path = args.require_path("OutputFile")?;
        let options = DelimitedWriteOptions {
            delimiter: delimiter(&args)?,
            ..Default::default()
        };
        DelimitedWriter::write_file(table, &path, &options)?;
        log::info!(
            "wrote table {} ({} rows) to {}",
            table.id(),
            table.row_count(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::create_command;
    use crate::processor::ProcessorConfig;
    use crate::table::{FieldType, TableValue};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("Tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(" "), Ok(b' '));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("x").is_err());
    }

    #[test]
    fn test_read_then_write() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("in.csv"),
            "// units: cfs\nStation;Flow\nA;1.5\nB;2\n",
        )
        .unwrap();
        let mut p = CommandProcessor::new(ProcessorConfig::default().with_working_dir(dir.path()));
        create_command(r#"ReadTableFromDelimitedFile(TableID="Flows",InputFile="in.csv",Delimiter=";",Comment="//")"#)
            .unwrap()
            .run(&mut p)
            .unwrap();
        let table = p.table("flows").unwrap();
        assert_eq!(table.field_names(), vec!["Station", "Flow"]);
        assert_eq!(table.fields()[1].field_type, FieldType::Double);
        assert_eq!(table.value(1, 1), Some(&TableValue::Double(2.0)));

        create_command(r#"WriteTableToDelimitedFile(TableID="Flows",OutputFile="out.csv")"#)
            .unwrap()
            .run(&mut p)
            .unwrap();
        let text = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(text, "Station,Flow\nA,1.5\nB,2.0\n");
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let mut p = CommandProcessor::new(ProcessorConfig::default().with_working_dir(dir.path()));
        let mut command =
            create_command(r#"ReadTableFromDelimitedFile(TableID="T",InputFile="none.csv")"#).unwrap();
        assert!(matches!(command.run(&mut p), Err(CommandError::FileNotFound(_))));
    }
}
