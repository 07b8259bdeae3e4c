//! Opening, creating and closing workbooks in the registry

use tsxl_core::Workbook;

use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::Result;
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;

command_struct!(
    /// `NewExcelWorkbook`: create a workbook with the listed sheets
    NewExcelWorkbook,
    "NewExcelWorkbook"
);

impl Command for NewExcelWorkbook {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["OutputFile", "Worksheets", "KeepOpen"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("OutputFile")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let mut names = args.list("Worksheets");
        if names.is_empty() {
            names.push("Sheet1".to_string());
        }

        let mut workbook = Workbook::empty();
        for name in &names {
            workbook.add_worksheet_with_name(name.as_str())?;
        }

        let registry = processor.registry();
        if registry.discard(&path) {
            status.warn(format!(
                "{} was already open; the open workbook is replaced without being written",
                path.display()
            ));
        }
        log::info!("new workbook {} with sheets {}", path.display(), names.join(", "));
        registry.release(&path, workbook, OpenMode::Write, keep_open)
    }
}

command_struct!(
    /// `ReadExcelWorkbook`: open an existing workbook
    ///
    /// With `KeepOpen=True` the workbook is registered read-only for later
    /// commands; otherwise this only confirms the file can be read.
    ReadExcelWorkbook,
    "ReadExcelWorkbook"
);

impl Command for ReadExcelWorkbook {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["InputFile", "KeepOpen"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("InputFile")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("InputFile")?;
        let keep_open = args.keep_open()?;

        let registry = processor.registry();
        if let Some(mode) = registry.mode(&path) {
            status.warn(format!(
                "{} is already open ({}); using the open workbook",
                path.display(),
                mode
            ));
            return Ok(());
        }
        let open = registry.open_for_read(&path)?;
        log::info!(
            "read {} with {} worksheet(s)",
            path.display(),
            open.workbook.sheet_count()
        );
        registry.release(&path, open.workbook, open.mode, keep_open)
    }
}

command_struct!(
    /// `CloseExcelWorkbook`: write and unregister an open workbook
    CloseExcelWorkbook,
    "CloseExcelWorkbook"
);

impl Command for CloseExcelWorkbook {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["OutputFile", "NewOutputFile", "WriteFile"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("OutputFile")
            .boolean("WriteFile")
            .unknown(self.valid_parameters());
        if check.args().get("NewOutputFile").is_some()
            && check.args().get("WriteFile").is_some_and(|w| w.eq_ignore_ascii_case("false"))
        {
            check.warning("NewOutputFile is ignored when WriteFile=False");
        }
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let new_path = args.path("NewOutputFile");
        let write = args.flag("WriteFile", true)?;

        let registry = processor.registry();
        let Some(mode) = registry.mode(&path) else {
            status.warn(format!("{} is not open; nothing to close", path.display()));
            return Ok(());
        };
        if !write {
            registry.discard(&path);
            log::info!("closed {} without writing", path.display());
            return Ok(());
        }
        // Saving a read-only workbook under a new name writes the copy
        if mode == OpenMode::Read && new_path.is_some() {
            let open = registry.open_for_read(&path)?;
            registry.put(&path, open.workbook, OpenMode::Write);
        }
        registry.close(&path, new_path.as_deref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{create_command, Severity};
    use crate::processor::ProcessorConfig;
    use crate::registry::WorkbookRegistry;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tsxl_xlsx::XlsxReader;

    fn processor(dir: &std::path::Path) -> CommandProcessor {
        CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir)
                .with_registry(Arc::new(WorkbookRegistry::new())),
        )
    }

    fn run(processor: &mut CommandProcessor, text: &str) -> CommandStatus {
        let mut command = create_command(text).unwrap();
        command.run(processor).unwrap()
    }

    #[test]
    fn test_new_workbook_written_immediately() {
        let dir = tempdir().unwrap();
        let mut p = processor(dir.path());
        run(&mut p, r#"NewExcelWorkbook(OutputFile="new.xlsx",Worksheets="Flows, Notes")"#);
        let wb = XlsxReader::read_file(dir.path().join("new.xlsx")).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Flows", "Notes"]);
        assert!(p.registry().open_paths().is_empty());
    }

    #[test]
    fn test_keep_open_then_close_to_new_file() {
        let dir = tempdir().unwrap();
        let mut p = processor(dir.path());
        run(&mut p, r#"NewExcelWorkbook(OutputFile="a.xlsx",KeepOpen=True)"#);
        let path = dir.path().join("a.xlsx");
        assert_eq!(p.registry().mode(&path), Some(OpenMode::Write));
        assert!(!path.exists());

        run(&mut p, r#"CloseExcelWorkbook(OutputFile="a.xlsx",NewOutputFile="b.xlsx")"#);
        assert!(!p.registry().is_open(&path));
        assert!(dir.path().join("b.xlsx").exists());
        assert!(!path.exists());

        let status = run(&mut p, r#"CloseExcelWorkbook(OutputFile="a.xlsx")"#);
        assert_eq!(status.severity(), Severity::Warning);
    }

    #[test]
    fn test_read_keep_open_and_discard() {
        let dir = tempdir().unwrap();
        let mut p = processor(dir.path());
        run(&mut p, r#"NewExcelWorkbook(OutputFile="in.xlsx")"#);
        run(&mut p, r#"ReadExcelWorkbook(InputFile="in.xlsx",KeepOpen=True)"#);
        let path = dir.path().join("in.xlsx");
        assert_eq!(p.registry().mode(&path), Some(OpenMode::Read));

        run(&mut p, r#"CloseExcelWorkbook(OutputFile="in.xlsx",WriteFile=False)"#);
        assert!(!p.registry().is_open(&path));

        let mut missing = create_command(r#"ReadExcelWorkbook(InputFile="none.xlsx")"#).unwrap();
        assert!(missing.run(&mut p).is_err());
    }
}
