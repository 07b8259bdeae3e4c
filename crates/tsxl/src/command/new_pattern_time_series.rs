//! `NewPatternTimeSeries`

use std::str::FromStr;

use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::datetime::DateTimeValue;
use crate::error::{CommandError, Result};
use crate::pattern::split_list;
use crate::processor::CommandProcessor;
use crate::timeseries::{TimeSeries, TsIdent};

/// Pattern values; `M` or `NaN` are missing
fn parse_pattern(text: &str) -> std::result::Result<Vec<Option<f64>>, String> {
    let values = split_list(text)
        .iter()
        .map(|v| {
            if v.eq_ignore_ascii_case("M") || v.eq_ignore_ascii_case("NaN") {
                Ok(None)
            } else {
                v.parse::<f64>()
                    .map(Some)
                    .map_err(|_| format!("'{}' is not a number", v))
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err("no values".to_string());
    }
    Ok(values)
}

command_struct!(
    /// `NewPatternTimeSeries`: a regular series repeating a list of values
    NewPatternTimeSeries,
    "NewPatternTimeSeries"
);

impl Command for NewPatternTimeSeries {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "Alias",
            "NewTSID",
            "Description",
            "SetStart",
            "SetEnd",
            "Units",
            "PatternValues",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("NewTSID")
            .validate("NewTSID", TsIdent::from_str)
            .require("SetStart")
            .validate("SetStart", DateTimeValue::from_str)
            .require("SetEnd")
            .validate("SetEnd", DateTimeValue::from_str)
            .require("PatternValues")
            .validate("PatternValues", parse_pattern)
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let ident: TsIdent = args.require("NewTSID")?.parse()?;
        let start: DateTimeValue = args.require("SetStart")?.parse()?;
        let end: DateTimeValue = args.require("SetEnd")?.parse()?;
        let pattern_text = args.require("PatternValues")?;
        let pattern =
            parse_pattern(&pattern_text).map_err(|e| CommandError::invalid_value(&pattern_text, e))?;
        if end.value() < start.value() {
            return Err(CommandError::other(format!(
                "SetEnd {} is before SetStart {}",
                end, start
            )));
        }

        let mut ts = TimeSeries::new(ident, start.value(), end.value())?;
        ts.alias = args.get("Alias").unwrap_or_default();
        ts.description = args.get("Description").unwrap_or_default();
        ts.units = args.get("Units").unwrap_or_default();
        let dates: Vec<_> = ts.dates().collect();
        for (i, dt) in dates.into_iter().enumerate() {
            ts.set_value(dt, pattern[i % pattern.len()])?;
        }
        if processor
            .time_series()
            .iter()
            .any(|other| other.tsid() == ts.tsid() && other.alias == ts.alias)
        {
            status.warn(format!("a time series {} already exists; both are kept", ts.display_name()));
        }
        log::info!("created {} with {} values", ts.display_name(), ts.len());
        processor.add_time_series(ts);
        Ok(())
    }
}
