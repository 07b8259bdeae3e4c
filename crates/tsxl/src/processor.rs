//! Command processor: shared state and script execution
//!
//! A [`CommandProcessor`] owns the tables, time series and properties that
//! commands read and write, and runs command files one line at a time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use lazy_regex::regex_replace_all;

use crate::command::{create_command, Command, CommandStatus, Severity};
use crate::error::{CommandError, Result};
use crate::pattern::Glob;
use crate::registry::WorkbookRegistry;
use crate::table::{DataTable, TableValue};
use crate::timeseries::TimeSeries;

/// How a processor runs
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Relative paths resolve against this directory
    pub working_dir: PathBuf,
    /// Properties set before the first command
    pub properties: Vec<(String, TableValue)>,
    /// Treat warnings as failures when deciding whether to stop
    pub warnings_fail: bool,
    /// Keep running after a failed command
    pub continue_on_error: bool,
    pub registry: Arc<WorkbookRegistry>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            properties: Vec::new(),
            warnings_fail: false,
            continue_on_error: false,
            registry: WorkbookRegistry::global(),
        }
    }
}

impl ProcessorConfig {
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: TableValue) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    pub fn with_registry(mut self, registry: Arc<WorkbookRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn warnings_fail(mut self, yes: bool) -> Self {
        self.warnings_fail = yes;
        self
    }

    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }
}

/// One command of a command file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// 1-based line the command starts on
    pub line: usize,
    pub text: String,
}

/// Split a command file into commands
///
/// Skips blank lines, `#` comment lines and `/* ... */` blocks (the block
/// markers start a line). A trailing `\` joins a line with the next.
pub fn parse_command_file(text: &str) -> Vec<CommandLine> {
    let mut commands = Vec::new();
    let mut in_block = false;
    let mut pending: Option<CommandLine> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if pending.is_none() {
            if in_block {
                if line.contains("*/") {
                    in_block = false;
                }
                continue;
            }
            if line.starts_with("/*") {
                in_block = !line[2..].contains("*/");
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
        }

        let (body, continued) = match line.strip_suffix('\\') {
            Some(body) => (body.trim_end(), true),
            None => (line, false),
        };
        let current = pending.get_or_insert_with(|| CommandLine {
            line: i + 1,
            text: String::new(),
        });
        current.text.push_str(body);
        if !continued {
            commands.extend(pending.take());
        }
    }
    if let Some(last) = pending {
        log::warn!("line {} ends with a continuation but the file ends", last.line);
        commands.push(last);
    }
    commands
}

/// Result of one command in a run
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub line: usize,
    pub text: String,
    pub status: CommandStatus,
}

/// Results of running or checking a command file
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub records: Vec<CommandRecord>,
    /// Processing ended at `Exit()`
    pub exited: bool,
    /// Processing ended early at a failure
    pub stopped: bool,
}

impl RunSummary {
    /// Worst severity over all commands
    pub fn severity(&self) -> Severity {
        self.records
            .iter()
            .map(|r| r.status.severity())
            .max()
            .unwrap_or_default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|r| r.status.severity() == severity)
            .count()
    }
}

/// Shared state for a run of commands
#[derive(Debug)]
pub struct CommandProcessor {
    config: ProcessorConfig,
    tables: Vec<DataTable>,
    time_series: Vec<TimeSeries>,
    properties: AHashMap<String, (String, TableValue)>,
    exit_requested: bool,
}

impl CommandProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        let mut processor = Self {
            tables: Vec::new(),
            time_series: Vec::new(),
            properties: AHashMap::new(),
            exit_requested: false,
            config,
        };
        for (name, value) in processor.config.properties.clone() {
            processor.set_property(name, value);
        }
        processor
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkbookRegistry {
        &self.config.registry
    }

    pub fn working_dir(&self) -> &Path {
        &self.config.working_dir
    }

    /// Replace `${Name}` with property values
    ///
    /// `${WorkingDir}` is always defined. Unknown properties are left as
    /// written.
    pub fn expand(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        regex_replace_all!(r"\$\{([^}]+)\}", text, |whole: &str, name: &str| {
            if name.eq_ignore_ascii_case("WorkingDir") {
                return self.config.working_dir.display().to_string();
            }
            match self.property(name) {
                Some(value) => value.to_string(),
                None => whole.to_string(),
            }
        })
        .into_owned()
    }

    /// Expand properties and resolve a relative path against the working
    /// directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let expanded = PathBuf::from(self.expand(path.trim()));
        if expanded.is_absolute() {
            expanded
        } else {
            self.config.working_dir.join(expanded)
        }
    }

    pub fn property(&self, name: &str) -> Option<&TableValue> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: TableValue) {
        let name = name.into();
        log::debug!("property {} = {}", name, value);
        self.properties
            .insert(name.to_ascii_lowercase(), (name, value));
    }

    /// Property names as they were set, sorted
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.properties.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable_by_key(|n| n.to_ascii_lowercase());
        names
    }

    /// Table by id, ignoring case
    pub fn table(&self, id: &str) -> Option<&DataTable> {
        self.tables.iter().find(|t| t.id().eq_ignore_ascii_case(id))
    }

    pub fn table_mut(&mut self, id: &str) -> Option<&mut DataTable> {
        self.tables
            .iter_mut()
            .find(|t| t.id().eq_ignore_ascii_case(id))
    }

    /// Table by id, or [`CommandError::TableNotFound`]
    pub fn require_table(&self, id: &str) -> Result<&DataTable> {
        self.table(id)
            .ok_or_else(|| CommandError::TableNotFound(id.to_string()))
    }

    /// Add a table, replacing one with the same id
    pub fn set_table(&mut self, table: DataTable) {
        match self
            .tables
            .iter()
            .position(|t| t.id().eq_ignore_ascii_case(table.id()))
        {
            Some(i) => {
                log::info!("replacing table {}", table.id());
                self.tables[i] = table;
            }
            None => self.tables.push(table),
        }
    }

    pub fn remove_table(&mut self, id: &str) -> Option<DataTable> {
        let i = self
            .tables
            .iter()
            .position(|t| t.id().eq_ignore_ascii_case(id))?;
        Some(self.tables.remove(i))
    }

    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    pub fn add_time_series(&mut self, ts: TimeSeries) {
        self.time_series.push(ts);
    }

    pub fn time_series(&self) -> &[TimeSeries] {
        &self.time_series
    }

    /// Series whose alias or TSID matches a `*` pattern
    pub fn find_time_series(&self, pattern: &str) -> Result<Vec<&TimeSeries>> {
        let glob = Glob::new(pattern)?;
        Ok(self
            .time_series
            .iter()
            .filter(|ts| ts.matches(&glob))
            .collect())
    }

    /// Stop after the current command
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Check and run one command
    ///
    /// Errors become a failure status; this never stops the caller.
    pub fn run_command(&mut self, command: &mut dyn Command) -> CommandStatus {
        log::info!("running {}", command.to_command_string());
        match command.run(self) {
            Ok(status) => status,
            Err(e) => {
                let mut status = CommandStatus::new();
                status.fail(format!("{} failed: {}", command.name(), e));
                status
            }
        }
    }

    fn should_stop(&self, status: &CommandStatus) -> bool {
        match status.severity() {
            Severity::Failure => true,
            Severity::Warning => self.config.warnings_fail,
            Severity::Success => false,
        }
    }

    /// Run every command in `text`
    pub fn run_script(&mut self, text: &str) -> RunSummary {
        self.exit_requested = false;
        let mut summary = RunSummary::default();
        for line in parse_command_file(text) {
            let status = match create_command(&line.text) {
                Ok(mut command) => self.run_command(command.as_mut()),
                Err(e) => {
                    let mut status = CommandStatus::new();
                    status.fail(format!("line {}: {}", line.line, e));
                    status
                }
            };
            let stop = self.should_stop(&status);
            summary.records.push(CommandRecord {
                line: line.line,
                text: line.text,
                status,
            });
            if self.exit_requested {
                log::info!("exit requested; skipping remaining commands");
                summary.exited = true;
                break;
            }
            if stop && !self.config.continue_on_error {
                log::error!("stopping at line {}", line.line);
                summary.stopped = true;
                break;
            }
        }
        summary
    }

    /// Read and run a command file
    ///
    /// The working directory is not changed; set it in the config when the
    /// file's paths are relative to the file.
    pub fn run_file(&mut self, path: &Path) -> Result<RunSummary> {
        let text = fs::read_to_string(path)?;
        log::info!("running command file {}", path.display());
        Ok(self.run_script(&text))
    }

    /// Parse and check every command in `text` without running anything
    pub fn check_script(&self, text: &str) -> RunSummary {
        let mut summary = RunSummary::default();
        for line in parse_command_file(text) {
            let mut status = CommandStatus::new();
            match create_command(&line.text) {
                Ok(command) => {
                    let check = command.check_parameters(self);
                    for warning in check.warnings {
                        status.warn(format!("line {}: {}", line.line, warning));
                    }
                    for problem in check.problems {
                        status.fail(format!("line {}: {}", line.line, problem));
                    }
                }
                Err(e) => status.fail(format!("line {}: {}", line.line, e)),
            }
            summary.records.push(CommandRecord {
                line: line.line,
                text: line.text,
                status,
            });
        }
        summary
    }
}
