//! `SetExcelWorksheetViewProperties`

use std::sync::Arc;

use tsxl_core::{CellAddress, Worksheet};

use crate::area;
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;

command_struct!(
    /// `SetExcelWorksheetViewProperties`: freeze panes, zoom and gridlines
    ///
    /// The freeze split is given as the first unfrozen column (letters) and
    /// the first unfrozen row (1-based). `A` and `1` clear the split.
    /// `Worksheet=*` applies to every sheet.
    SetExcelWorksheetViewProperties,
    "SetExcelWorksheetViewProperties"
);

#[derive(Debug, Default)]
struct ViewChanges {
    freeze: Option<(u16, u32)>,
    zoom: Option<u16>,
    gridlines: Option<bool>,
}

impl ViewChanges {
    fn apply(&self, sheet: &mut Worksheet) -> Result<()> {
        if let Some((cols, rows)) = self.freeze {
            sheet.set_freeze_panes(cols, rows)?;
        }
        if let Some(zoom) = self.zoom {
            sheet.view_mut().set_zoom(zoom)?;
        }
        if let Some(show) = self.gridlines {
            sheet.view_mut().show_gridlines = show;
        }
        Ok(())
    }
}

fn split_column(letters: &str) -> std::result::Result<u16, String> {
    if !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("expected column letters".to_string());
    }
    CellAddress::letters_to_column(letters).map_err(|e| e.to_string())
}

fn split_row(row: &str) -> std::result::Result<u32, String> {
    match row.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err("expected a row number of 1 or more".to_string()),
    }
}

impl Command for SetExcelWorksheetViewProperties {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "OutputFile",
            "Worksheet",
            "FreezePaneColumnRightOfSplit",
            "FreezePaneRowBelowSplit",
            "ZoomScale",
            "ShowGridlines",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("OutputFile")
            .validate("FreezePaneColumnRightOfSplit", split_column)
            .validate("FreezePaneRowBelowSplit", split_row)
            .integer("ZoomScale", 10..=400)
            .boolean("ShowGridlines")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let worksheet = args.worksheet();

        let column = args
            .get("FreezePaneColumnRightOfSplit")
            .map(|v| split_column(&v).map_err(|e| CommandError::invalid_value(&v, e)))
            .transpose()?;
        let row = args
            .get("FreezePaneRowBelowSplit")
            .map(|v| split_row(&v).map_err(|e| CommandError::invalid_value(&v, e)))
            .transpose()?;
        let changes = ViewChanges {
            freeze: (column.is_some() || row.is_some())
                .then(|| (column.unwrap_or(0), row.unwrap_or(0))),
            zoom: args.parse("ZoomScale")?,
            gridlines: match args.get("ShowGridlines") {
                Some(_) => Some(args.flag("ShowGridlines", true)?),
                None => None,
            },
        };
        if changes.freeze.is_none() && changes.zoom.is_none() && changes.gridlines.is_none() {
            status.warn("no view properties are set");
        }

        let registry = Arc::clone(&processor.config().registry);
        let count = registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            if worksheet.as_deref() == Some("*") {
                for sheet in workbook.worksheets_mut() {
                    changes.apply(sheet)?;
                }
                return Ok(workbook.sheet_count());
            }
            let index = area::sheet_index(workbook, worksheet.as_deref())?;
            let sheet = workbook
                .worksheet_mut(index)
                .ok_or_else(|| CommandError::other("worksheet is missing"))?;
            changes.apply(sheet)?;
            Ok(1)
        })?;
        log::info!("set view properties on {} worksheet(s) of {}", count, path.display());
        Ok(())
    }
}
