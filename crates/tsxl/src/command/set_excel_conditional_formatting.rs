//! `SetExcelConditionalFormatting`

use std::sync::Arc;

use crate::area::{self, ExcelArea};
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::styles::{Condition, StyleTable};

command_struct!(
    /// `SetExcelConditionalFormatting`: add a native conditional format rule
    ///
    /// The rule keeps evaluating in Excel as cell values change, unlike the
    /// `ConditionTableID` styling of the write commands. For an Excel table
    /// the rule covers the data rows only.
    SetExcelConditionalFormatting,
    "SetExcelConditionalFormatting"
);

impl Command for SetExcelConditionalFormatting {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "OutputFile",
            "Worksheet",
            "ExcelAddress",
            "ExcelNamedRange",
            "ExcelTableName",
            "Condition",
            "StyleTableID",
            "StyleID",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("OutputFile")
            .area()
            .require("Condition")
            .validate("Condition", Condition::parse)
            .require("StyleTableID")
            .require("StyleID")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, _status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let worksheet = args.worksheet();
        let area = args.area()?;
        let condition = Condition::parse(&args.require("Condition")?)?;
        let table_id = args.require("StyleTableID")?;
        let style_id = args.require("StyleID")?;
        let styles = StyleTable::from_table(processor.require_table(&table_id)?)?;
        let style = styles.get(&style_id).cloned().ok_or_else(|| {
            CommandError::other(format!("style {} is not in table {}", style_id, table_id))
        })?;

        let registry = Arc::clone(&processor.config().registry);
        let range = registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            let (sheet_index, range) = match &area {
                ExcelArea::Address(range) => {
                    (area::sheet_index_or_create(workbook, worksheet.as_deref())?, range.to_relative())
                }
                _ => {
                    let resolved = area::resolve(workbook, worksheet.as_deref(), &area)?;
                    let range = match &resolved.table {
                        Some(table) => table.data_range(),
                        None => resolved.range,
                    };
                    let range = range.ok_or_else(|| {
                        CommandError::AreaNotFound(format!("{} holds no cells to format", area))
                    })?;
                    (resolved.sheet_index, range)
                }
            };
            let rule = condition.to_rule(range).with_format(style);
            workbook
                .worksheet_mut(sheet_index)
                .ok_or_else(|| CommandError::other("output worksheet is missing"))?
                .add_conditional_format(rule);
            Ok(range)
        })?;
        log::info!("added conditional format over {} in {}", range, path.display());
        Ok(())
    }
}
