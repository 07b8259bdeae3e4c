//! Commands and the command framework
//!
//! Every command is a struct holding its [`CommandParameters`]. A command is
//! checked with [`Command::check_parameters`], which reports every problem
//! at once, then run against a [`CommandProcessor`]. Commands serialize back
//! to the text they were parsed from with [`Command::to_command_string`].

use std::fmt;

use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;

/// The struct, constructor and name of a command
macro_rules! command_struct {
    ($(#[$meta:meta])* $ty:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $ty {
            parameters: $crate::command::CommandParameters,
        }

        impl $ty {
            pub const NAME: &'static str = $name;

            pub fn new(parameters: $crate::command::CommandParameters) -> Self {
                Self { parameters }
            }
        }
    };
}

/// The accessor methods of [`Command`] shared by every command
macro_rules! command_accessors {
    () => {
        fn name(&self) -> &'static str {
            Self::NAME
        }

        fn parameters(&self) -> &$crate::command::CommandParameters {
            &self.parameters
        }

        fn parameters_mut(&mut self) -> &mut $crate::command::CommandParameters {
            &mut self.parameters
        }
    };
}

mod check;
mod output;
mod parameters;
mod status;

mod delimited;
mod excel_workbook;
mod exit;
mod new_pattern_time_series;
mod read_table_from_excel;
mod set_excel_cell;
mod set_excel_conditional_formatting;
mod set_excel_worksheet_view_properties;
mod set_property;
mod write_table_cells_to_excel;
mod write_table_to_excel;
mod write_time_series_to_excel;

pub use check::{Args, CheckResult, ParameterCheck, AREA_PARAMETERS};
pub use parameters::{format_command_text, parse_command_text, CommandParameters};
pub use status::{CommandMessage, CommandStatus, Severity};

pub use delimited::{ReadTableFromDelimitedFile, WriteTableToDelimitedFile};
pub use excel_workbook::{CloseExcelWorkbook, NewExcelWorkbook, ReadExcelWorkbook};
pub use exit::Exit;
pub use new_pattern_time_series::NewPatternTimeSeries;
pub use read_table_from_excel::ReadTableFromExcel;
pub use set_excel_cell::SetExcelCell;
pub use set_excel_conditional_formatting::SetExcelConditionalFormatting;
pub use set_excel_worksheet_view_properties::SetExcelWorksheetViewProperties;
pub use set_property::SetProperty;
pub use write_table_cells_to_excel::WriteTableCellsToExcel;
pub use write_table_to_excel::WriteTableToExcel;
pub use write_time_series_to_excel::WriteTimeSeriesToExcel;

/// A command in a command file
pub trait Command: fmt::Debug + Send {
    /// Command name as written in command files
    fn name(&self) -> &'static str;

    fn parameters(&self) -> &CommandParameters;

    fn parameters_mut(&mut self) -> &mut CommandParameters;

    /// Recognized parameters, in the order they are written out
    fn valid_parameters(&self) -> &'static [&'static str];

    /// Check every parameter, collecting all problems
    ///
    /// Unknown parameters are warnings, not problems.
    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult;

    /// Do the work. Only called after the check passed.
    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()>;

    /// Check, then execute
    ///
    /// Fails with [`CommandError::InvalidParameters`] without doing anything
    /// if the check finds a problem.
    fn run(&mut self, processor: &mut CommandProcessor) -> Result<CommandStatus> {
        let warnings = self.check_parameters(processor).into_result()?;
        let mut status = CommandStatus::new();
        for warning in warnings {
            status.warn(format!("{}: {}", self.name(), warning));
        }
        self.execute(processor, &mut status)?;
        Ok(status)
    }

    /// Command text: known parameters in order, then unknown ones
    fn to_command_string(&self) -> String {
        format_command_text(self.name(), self.parameters(), self.valid_parameters())
    }
}

/// Names of every command [`create_command`] knows
pub const COMMAND_NAMES: &[&str] = &[
    NewExcelWorkbook::NAME,
    ReadExcelWorkbook::NAME,
    CloseExcelWorkbook::NAME,
    ReadTableFromExcel::NAME,
    WriteTableToExcel::NAME,
    WriteTableCellsToExcel::NAME,
    WriteTimeSeriesToExcel::NAME,
    SetExcelCell::NAME,
    SetExcelConditionalFormatting::NAME,
    SetExcelWorksheetViewProperties::NAME,
    ReadTableFromDelimitedFile::NAME,
    WriteTableToDelimitedFile::NAME,
    NewPatternTimeSeries::NAME,
    SetProperty::NAME,
    Exit::NAME,
];

/// Parse command text and build the command it names
///
/// Command names are matched ignoring case.
pub fn create_command(text: &str) -> Result<Box<dyn Command>> {
    let (name, parameters) = parse_command_text(text)?;
    let canonical = COMMAND_NAMES
        .iter()
        .find(|n| n.eq_ignore_ascii_case(&name))
        .ok_or_else(|| CommandError::UnknownCommand(name.clone()))?;
    let command: Box<dyn Command> = match *canonical {
        NewExcelWorkbook::NAME => Box::new(NewExcelWorkbook::new(parameters)),
        ReadExcelWorkbook::NAME => Box::new(ReadExcelWorkbook::new(parameters)),
        CloseExcelWorkbook::NAME => Box::new(CloseExcelWorkbook::new(parameters)),
        ReadTableFromExcel::NAME => Box::new(ReadTableFromExcel::new(parameters)),
        WriteTableToExcel::NAME => Box::new(WriteTableToExcel::new(parameters)),
        WriteTableCellsToExcel::NAME => Box::new(WriteTableCellsToExcel::new(parameters)),
        WriteTimeSeriesToExcel::NAME => Box::new(WriteTimeSeriesToExcel::new(parameters)),
        SetExcelCell::NAME => Box::new(SetExcelCell::new(parameters)),
        SetExcelConditionalFormatting::NAME => {
            Box::new(SetExcelConditionalFormatting::new(parameters))
        }
        SetExcelWorksheetViewProperties::NAME => {
            Box::new(SetExcelWorksheetViewProperties::new(parameters))
        }
        ReadTableFromDelimitedFile::NAME => Box::new(ReadTableFromDelimitedFile::new(parameters)),
        WriteTableToDelimitedFile::NAME => Box::new(WriteTableToDelimitedFile::new(parameters)),
        NewPatternTimeSeries::NAME => Box::new(NewPatternTimeSeries::new(parameters)),
        SetProperty::NAME => Box::new(SetProperty::new(parameters)),
        Exit::NAME => Box::new(Exit::new(parameters)),
        _ => return Err(CommandError::UnknownCommand(name)),
    };
    Ok(command)
}
