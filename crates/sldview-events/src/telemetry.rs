use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const TELEMETRY_TARGET: &str = "sldview::events::telemetry";

pub const CMD_UPDATE_SWITCH_STATE: &str = "UpdateSwitchState";
pub const CMD_FETCH_SVG: &str = "FetchSvg";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandLifecycle {
    Start,
    Success,
    Failure,
}

impl fmt::Display for CommandLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "command_start",
            Self::Success => "command_success",
            Self::Failure => "command_failure",
        };
        f.write_str(name)
    }
}

/// One logged lifecycle step of a collaborator command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRecord {
    pub correlation_id: String,
    pub command: String,
    pub lifecycle: CommandLifecycle,
    pub error_reason: Option<String>,
    pub duration_ms: Option<u128>,
}

/// A fetch or switch mutation between its start and its outcome.
///
/// Every record of a span shares its correlation id, so a failed breaker
/// click can be traced from the click to the rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpan {
    command: &'static str,
    correlation_id: String,
    started: Instant,
}

impl CommandSpan {
    /// Log the start of `command` under a fresh correlation id.
    pub fn start(command: &'static str) -> Self {
        let span = Self {
            command,
            correlation_id: Uuid::new_v4().to_string(),
            started: Instant::now(),
        };
        info!(
            target: TELEMETRY_TARGET,
            command = span.command,
            correlation_id = %span.correlation_id,
            lifecycle = %CommandLifecycle::Start,
            "command_start"
        );
        span
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn succeed(&self) -> CommandRecord {
        let record = self.record(CommandLifecycle::Success, None);
        info!(
            target: TELEMETRY_TARGET,
            command = %record.command,
            correlation_id = %record.correlation_id,
            lifecycle = %record.lifecycle,
            duration_ms = ?record.duration_ms,
            "command_success"
        );
        record
    }

    /// Failures are recoverable here (rollback, error shell), so they log
    /// at warn.
    pub fn fail(&self, reason: impl Into<String>) -> CommandRecord {
        let record = self.record(CommandLifecycle::Failure, Some(reason.into()));
        warn!(
            target: TELEMETRY_TARGET,
            command = %record.command,
            correlation_id = %record.correlation_id,
            lifecycle = %record.lifecycle,
            duration_ms = ?record.duration_ms,
            error = record.error_reason.as_deref().unwrap_or("unclassified"),
            "command_failure"
        );
        record
    }

    pub fn note(&self, context: &str) {
        debug!(
            target: TELEMETRY_TARGET,
            command = self.command,
            correlation_id = %self.correlation_id,
            context,
            "command_context"
        );
    }

    fn record(&self, lifecycle: CommandLifecycle, error_reason: Option<String>) -> CommandRecord {
        CommandRecord {
            correlation_id: self.correlation_id.clone(),
            command: self.command.to_string(),
            lifecycle,
            error_reason,
            duration_ms: Some(self.started.elapsed().as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_uuids() {
        let span = CommandSpan::start(CMD_FETCH_SVG);
        assert_eq!(span.correlation_id().len(), 36);
        assert!(Uuid::parse_str(span.correlation_id()).is_ok());
        assert_ne!(
            span.correlation_id(),
            CommandSpan::start(CMD_FETCH_SVG).correlation_id()
        );
    }

    #[test]
    fn test_span_records_share_correlation_id() {
        let span = CommandSpan::start(CMD_UPDATE_SWITCH_STATE);
        let success = span.succeed();
        let failure = span.fail("Forbidden");

        assert_eq!(success.lifecycle, CommandLifecycle::Success);
        assert_eq!(success.command, "UpdateSwitchState");
        assert!(success.duration_ms.is_some());
        assert!(success.error_reason.is_none());
        assert_eq!(failure.lifecycle, CommandLifecycle::Failure);
        assert_eq!(failure.error_reason.as_deref(), Some("Forbidden"));
        assert_eq!(failure.correlation_id, success.correlation_id);
    }

    #[test]
    fn test_lifecycle_names() {
        assert_eq!(CommandLifecycle::Failure.to_string(), "command_failure");
    }
}
