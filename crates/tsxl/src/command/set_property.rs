//! `SetProperty`

use crate::coerce::convert;
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::table::{FieldType, TableValue};

command_struct!(
    /// `SetProperty`: set a processor property for `${Name}` expansion
    ///
    /// `PropertyType` defaults to `String`; an empty string value is allowed.
    SetProperty,
    "SetProperty"
);

fn typed_value(text: &str, field_type: FieldType) -> std::result::Result<TableValue, String> {
    convert(TableValue::String(text.trim().to_string()), field_type)
}

impl Command for SetProperty {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["PropertyName", "PropertyType", "PropertyValue"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("PropertyName")
            .enumeration("PropertyType", &["String", "Integer", "Double", "Boolean", "DateTime"])
            .unknown(self.valid_parameters());
        let args = check.args();
        let field_type = args
            .get("PropertyType")
            .and_then(|t| t.parse::<FieldType>().ok())
            .unwrap_or(FieldType::String);
        let value = args.get_raw("PropertyValue");
        match value {
            None => {
                check.problem("PropertyValue must be specified");
            }
            Some(v) if field_type != FieldType::String && !v.contains("${") => {
                if let Err(e) = typed_value(&v, field_type) {
                    check.problem(format!("PropertyValue is invalid: {}", e));
                }
            }
            Some(_) => {}
        }
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, _status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let name = args.require("PropertyName")?;
        let field_type: FieldType = args.parse("PropertyType")?.unwrap_or(FieldType::String);
        let text = args
            .get_raw("PropertyValue")
            .ok_or_else(|| CommandError::InvalidParameters(vec!["PropertyValue must be specified".into()]))?;
        let value = match field_type {
            FieldType::String => TableValue::String(text),
            _ => typed_value(&text, field_type).map_err(|e| CommandError::invalid_value(&text, e))?,
        };
        processor.set_property(name, value);
        Ok(())
    }
}
