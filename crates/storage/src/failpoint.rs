//! Fail points for injecting command errors
//!
//! Mirrors the server's `failCommand` fail point so contention errors
//! (write conflicts, transient transaction errors) can be produced on demand:
//!
//! ```text
//! {configureFailPoint: "failCommand",
//!  mode: {times: 3} | "alwaysOn" | "off",
//!  data: {errorCode: 112, failCommands: ["insert"], errorLabels: [...]}}
//! ```

use fsm_core::error::{CommandError, CommandResult, ErrorCode};
use fsm_core::value::{Document, Value};
use parking_lot::Mutex;

/// Name of the only supported fail point
pub const FAIL_COMMAND: &str = "failCommand";

/// Activation mode of a fail point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPointMode {
    /// Disabled
    Off,
    /// Fire on every matching command
    AlwaysOn,
    /// Fire on the next `n` matching commands, then switch off
    Times(u64),
}

#[derive(Debug, Clone)]
struct FailCommand {
    mode: FailPointMode,
    code: ErrorCode,
    commands: Vec<String>,
    labels: Vec<String>,
}

/// Registry of active fail points for one server
#[derive(Debug, Default)]
pub struct FailPoints {
    fail_command: Mutex<Option<FailCommand>>,
}

impl FailPoints {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `configureFailPoint` command
    ///
    /// # Errors
    ///
    /// Returns `BAD_VALUE` for unknown fail points or malformed modes.
    pub fn configure(&self, command: &Document) -> CommandResult<()> {
        let name = command
            .get("configureFailPoint")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name != FAIL_COMMAND {
            return Err(CommandError::new(
                ErrorCode::BAD_VALUE,
                format!("unknown fail point: {}", name),
            ));
        }

        let mode = parse_mode(command.get("mode"))?;
        if mode == FailPointMode::Off {
            *self.fail_command.lock() = None;
            return Ok(());
        }

        let empty = Document::new();
        let data = command.get("data").and_then(Value::as_object).unwrap_or(&empty);
        let code = data
            .get("errorCode")
            .and_then(Value::as_int)
            .ok_or_else(|| CommandError::new(ErrorCode::BAD_VALUE, "failCommand needs data.errorCode"))?;
        let commands = string_list(data.get("failCommands"));
        let labels = string_list(data.get("errorLabels"));

        tracing::debug!(code, ?commands, ?mode, "failCommand fail point enabled");
        *self.fail_command.lock() = Some(FailCommand {
            mode,
            code: ErrorCode(code as i32),
            commands,
            labels,
        });
        Ok(())
    }

    /// Check whether `command` should fail now, consuming one activation
    ///
    /// # Errors
    ///
    /// Returns the configured error when the fail point fires.
    pub fn check(&self, command: &str) -> CommandResult<()> {
        let mut guard = self.fail_command.lock();
        let Some(fp) = guard.as_mut() else {
            return Ok(());
        };
        if !fp.commands.is_empty() && !fp.commands.iter().any(|c| c == command) {
            return Ok(());
        }

        let mut err = CommandError::new(
            fp.code,
            format!("Failing command {} via 'failCommand' failpoint", command),
        );
        for label in &fp.labels {
            err = err.with_label(label.clone());
        }

        let exhausted = match fp.mode {
            FailPointMode::Off => return Ok(()),
            FailPointMode::AlwaysOn => false,
            FailPointMode::Times(n) if n <= 1 => true,
            FailPointMode::Times(n) => {
                fp.mode = FailPointMode::Times(n - 1);
                false
            }
        };
        if exhausted {
            *guard = None;
        }
        Err(err)
    }
}

fn parse_mode(mode: Option<&Value>) -> CommandResult<FailPointMode> {
    match mode {
        Some(Value::String(s)) if s == "alwaysOn" => Ok(FailPointMode::AlwaysOn),
        Some(Value::String(s)) if s == "off" => Ok(FailPointMode::Off),
        Some(Value::Object(o)) => match o.get("times").and_then(Value::as_int) {
            Some(n) if n > 0 => Ok(FailPointMode::Times(n as u64)),
            Some(_) => Ok(FailPointMode::Off),
            None => Err(CommandError::new(ErrorCode::BAD_VALUE, "mode document needs 'times'")),
        },
        _ => Err(CommandError::new(ErrorCode::BAD_VALUE, "invalid fail point mode")),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
