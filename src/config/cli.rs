use clap::{Parser, ValueEnum};

/// How a run interacts with the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Send without confirmation (scheduled runs)
    Auto,
    /// Ask on stdin before each notification
    Interactive,
    /// Evaluate and log only; nothing is sent or saved
    DryRun,
    /// Send one sample message to verify the webhook
    TestNotify,
}

/// Poll the status feed and forward new maintenance/incident events to Slack
#[derive(Debug, Parser)]
#[command(name = "status-notifier", version)]
pub struct Cli {
    /// Run mode. Defaults to `auto` when AUTO_MODE=1, otherwise `interactive`.
    #[arg(value_enum)]
    pub mode: Option<RunMode>,
}

impl Cli {
    /// Resolve the effective mode from the CLI argument and `AUTO_MODE`
    pub fn resolve_mode(&self, auto_mode: bool) -> RunMode {
        match self.mode {
            Some(mode) => mode,
            None if auto_mode => RunMode::Auto,
            None => RunMode::Interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_interactive() {
        // Arrange
        let cli = Cli::parse_from(["status-notifier"]);

        // Act & Assert
        assert_eq!(cli.resolve_mode(false), RunMode::Interactive);
    }

    #[test]
    fn should_use_auto_when_auto_mode_env_set() {
        // Arrange
        let cli = Cli::parse_from(["status-notifier"]);

        // Act & Assert
        assert_eq!(cli.resolve_mode(true), RunMode::Auto);
    }

    #[test]
    fn should_prefer_explicit_mode_argument() {
        // Arrange
        let cli = Cli::parse_from(["status-notifier", "dry-run"]);

        // Act & Assert
        assert_eq!(cli.resolve_mode(true), RunMode::DryRun);
    }

    #[test]
    fn should_parse_all_modes() {
        // Arrange & Act & Assert
        for (arg, mode) in [
            ("auto", RunMode::Auto),
            ("interactive", RunMode::Interactive),
            ("dry-run", RunMode::DryRun),
            ("test-notify", RunMode::TestNotify),
        ] {
            let cli = Cli::parse_from(["status-notifier", arg]);
            assert_eq!(cli.mode, Some(mode));
        }
    }

    #[test]
    fn should_reject_unknown_mode() {
        // Arrange & Act
        let result = Cli::try_parse_from(["status-notifier", "manual"]);

        // Assert
        assert!(result.is_err());
    }
}
