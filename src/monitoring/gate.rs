//! Send gate
//!
//! Final say before a notification leaves the process. Which gate a run uses
//! follows from its `RunMode`; the processor itself is identical across modes.

use std::io::{self, BufRead, Write};
use tracing::{info, warn};

use crate::config::RunMode;
use crate::monitoring::notification::Notification;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Send,
    Skip,
}

pub trait SendGate {
    fn decide(&mut self, notification: &Notification) -> Result<GateDecision, AppError>;

    /// Whether the run may persist history afterwards
    fn persists(&self) -> bool {
        true
    }
}

/// Sends everything
#[derive(Debug, Default)]
pub struct AutoGate;

impl SendGate for AutoGate {
    fn decide(&mut self, _notification: &Notification) -> Result<GateDecision, AppError> {
        Ok(GateDecision::Send)
    }
}

/// Logs what would be sent and sends nothing
#[derive(Debug, Default)]
pub struct DryRunGate;

impl SendGate for DryRunGate {
    fn decide(&mut self, notification: &Notification) -> Result<GateDecision, AppError> {
        info!(
            service = %notification.service,
            kind = %notification.kind,
            count = notification.count(),
            headline = %notification.headline(),
            events = %notification.itemized(),
            "Dry run: would send notification"
        );
        Ok(GateDecision::Skip)
    }

    fn persists(&self) -> bool {
        false
    }
}

/// Asks `y/N` before each notification
pub struct PromptGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptGate<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> SendGate for PromptGate<R, W> {
    fn decide(&mut self, notification: &Notification) -> Result<GateDecision, AppError> {
        write!(
            self.output,
            "{}\n{}\nSend this notification? [y/N]: ",
            notification.headline(),
            notification.itemized()
        )
        .and_then(|_| self.output.flush())
        .map_err(|e| AppError::Prompt(format!("Failed to write prompt: {}", e)))?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .map_err(|e| AppError::Prompt(format!("Failed to read answer: {}", e)))?;

        if read == 0 {
            warn!("No answer on stdin, treating as 'no'");
            return Ok(GateDecision::Skip);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(GateDecision::Send),
            _ => {
                info!(service = %notification.service, kind = %notification.kind, "Notification declined");
                Ok(GateDecision::Skip)
            }
        }
    }
}

/// Gate for a run mode
///
/// `TestNotify` never reaches the processor; it maps to `AutoGate`.
pub fn gate_for(mode: RunMode) -> Box<dyn SendGate> {
    match mode {
        RunMode::Auto | RunMode::TestNotify => Box::new(AutoGate),
        RunMode::Interactive => Box::new(PromptGate::stdio()),
        RunMode::DryRun => Box::new(DryRunGate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};
    use chrono::{FixedOffset, Utc};
    use std::io::Cursor;

    fn notification() -> Notification {
        Notification::new(
            "cloud",
            EventKind::Maintenance,
            vec![Event {
                service: "cloud".to_string(),
                kind: EventKind::Maintenance,
                title: "Network maintenance".to_string(),
                start_time: Utc::now(),
                end_time: None,
                detail_url: None,
            }],
            FixedOffset::east_opt(9 * 3600).expect("valid offset"),
        )
    }

    fn prompt(answer: &str) -> (GateDecision, String) {
        let mut output = Vec::new();
        let decision = {
            let mut gate = PromptGate::new(Cursor::new(answer.as_bytes().to_vec()), &mut output);
            gate.decide(&notification()).expect("prompt should succeed")
        };
        (decision, String::from_utf8(output).expect("utf8"))
    }

    #[test]
    fn should_send_on_yes() {
        // Arrange & Act
        let (lower, printed) = prompt("y\n");
        let (upper, _) = prompt("YES\n");

        // Assert
        assert_eq!(lower, GateDecision::Send);
        assert_eq!(upper, GateDecision::Send);
        assert!(printed.contains("Network maintenance"));
        assert!(printed.ends_with("[y/N]: "));
    }

    #[test]
    fn should_skip_by_default() {
        // Arrange & Act
        let (empty, _) = prompt("\n");
        let (no, _) = prompt("n\n");
        let (eof, _) = prompt("");

        // Assert
        assert_eq!(empty, GateDecision::Skip);
        assert_eq!(no, GateDecision::Skip);
        assert_eq!(eof, GateDecision::Skip);
    }

    #[test]
    fn should_always_send_in_auto_mode() {
        // Arrange
        let mut gate = AutoGate;

        // Act
        let decision = gate.decide(&notification()).expect("decide");

        // Assert
        assert_eq!(decision, GateDecision::Send);
        assert!(gate.persists());
    }

    #[test]
    fn should_never_send_or_persist_in_dry_run() {
        // Arrange
        let mut gate = DryRunGate;

        // Act
        let decision = gate.decide(&notification()).expect("decide");

        // Assert
        assert_eq!(decision, GateDecision::Skip);
        assert!(!gate.persists());
    }

    #[test]
    fn should_map_dry_run_mode_to_non_persisting_gate() {
        // Arrange & Act
        let gate = gate_for(RunMode::DryRun);

        // Assert
        assert!(!gate.persists());
    }
}
