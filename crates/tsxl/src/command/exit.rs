//! `Exit`

use crate::command::{CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::Result;
use crate::processor::CommandProcessor;

command_struct!(
    /// `Exit`: stop processing after this command
    Exit,
    "Exit"
);

impl Command for Exit {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check.unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, _status: &mut CommandStatus) -> Result<()> {
        log::info!("exit requested");
        processor.request_exit();
        Ok(())
    }
}
