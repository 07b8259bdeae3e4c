//! Outcome of checking and running a command

use std::fmt;

/// Severity of a command message; ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Success,
    Warning,
    Failure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Failure => "FAILURE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    pub severity: Severity,
    pub message: String,
}

/// Messages collected while a command is checked and run
///
/// The overall severity is the worst message, or success when there are none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStatus {
    messages: Vec<CommandMessage>,
}

impl CommandStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.push(Severity::Warning, message);
    }

    /// Record a failure and log it
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.push(Severity::Failure, message);
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.messages.push(CommandMessage {
            severity,
            message: message.into(),
        });
    }

    pub fn severity(&self) -> Severity {
        self.messages
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or_default()
    }

    pub fn messages(&self) -> &[CommandMessage] {
        &self.messages
    }

    pub fn is_failure(&self) -> bool {
        self.severity() == Severity::Failure
    }

    pub fn merge(&mut self, other: CommandStatus) {
        self.messages.extend(other.messages);
    }
}
