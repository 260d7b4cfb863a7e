//! Text command surface.
//!
//! Commands only read and drive the [`Shaper`] API; they hold no state of their
//! own. A console integration parses the user's input with [`str::parse`] and
//! prints the returned [`CommandOutcome`].

use std::{fmt, str::FromStr, time::Instant};

use nexus_core::error::ErrorKind;
use nexus_utilities::format_bytes;

use crate::{diagnostics::TestStatus, shaper::Shaper, world::WorldState};

/// A shaper console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show version, connectivity, key settings and the quality score
    Status,
    /// Start a diagnostics campaign
    Test,
    /// Show the last diagnostics report, or progress while one runs
    Report,
    /// Toggle the stats overlay
    Stats,
}

/// Message produced by a command, tagged by severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Informational output
    Info(String),
    /// The command took effect
    Success(String),
    /// The command could not take effect
    Error(String),
}

impl CommandOutcome {
    /// The message text.
    pub fn message(&self) -> &str {
        match self {
            CommandOutcome::Info(msg) | CommandOutcome::Success(msg) | CommandOutcome::Error(msg) => {
                msg
            }
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Input that names no known command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command '{}', expected one of: status, test, report, stats", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Accepts the bare command name, optionally prefixed with `nexus`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut words = input.split_whitespace();
        let mut name = words.next().unwrap_or_default();
        if name.eq_ignore_ascii_case("nexus") {
            name = words.next().unwrap_or_default();
        }
        match name.to_ascii_lowercase().as_str() {
            "status" => Ok(Command::Status),
            "test" => Ok(Command::Test),
            "report" => Ok(Command::Report),
            "stats" => Ok(Command::Stats),
            _ => Err(UnknownCommand(input.trim().to_owned())),
        }
    }
}

impl Command {
    /// Runs the command against `shaper` at `now`.
    pub fn execute(self, shaper: &mut Shaper, now: Instant, world: &dyn WorldState) -> CommandOutcome {
        match self {
            Command::Status => CommandOutcome::Info(status_text(shaper, world)),
            Command::Test => {
                if shaper.diagnostics().status() == TestStatus::Running {
                    return CommandOutcome::Info("Test already running...".to_owned());
                }
                match shaper.start_diagnostics(now, world) {
                    Ok(()) => CommandOutcome::Success(
                        "Starting network performance test (5 seconds)...\n\
                         Use 'nexus report' to view results when complete."
                            .to_owned(),
                    ),
                    Err(ErrorKind::NotConnected(_)) => CommandOutcome::Error(
                        "Failed to start test. Make sure you're connected to a server.".to_owned(),
                    ),
                    Err(err) => CommandOutcome::Error(format!("Failed to start test: {}", err)),
                }
            }
            Command::Report => {
                let diagnostics = shaper.diagnostics();
                if diagnostics.status() == TestStatus::Running {
                    let percent = diagnostics.progress(now) * 100.0;
                    return CommandOutcome::Info(format!("Test in progress... {:.0}%", percent));
                }
                CommandOutcome::Info(diagnostics.report())
            }
            Command::Stats => {
                let shown = shaper.toggle_overlay();
                CommandOutcome::Success(format!(
                    "Stats overlay: {}",
                    if shown { "Shown" } else { "Hidden" }
                ))
            }
        }
    }
}

fn status_text(shaper: &Shaper, world: &dyn WorldState) -> String {
    let config = shaper.config();
    [
        "Nexus Network Shaper".to_owned(),
        format!("Version: {}", env!("CARGO_PKG_VERSION")),
        format!("Connected: {}", if world.is_connected() { "Yes" } else { "No" }),
        format!("Send Limit: {} bytes/s", config.send_rate_limit),
        format!(
            "Compression: {}",
            if shaper.compression().is_compression_enabled() { "Enabled" } else { "Disabled" }
        ),
        format!("Update Rate: {}%", config.default_update_rate),
        format!("Max Queue: {}", format_bytes(config.max_queue_size as u64)),
        format!("Quality Score: {}/100", shaper.quality().quality_score()),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nexus_core::config::Config;

    use super::*;
    use crate::world::WorldSnapshot;

    #[test]
    fn test_parse_commands() {
        assert_eq!("status".parse::<Command>(), Ok(Command::Status));
        assert_eq!("nexus test".parse::<Command>(), Ok(Command::Test));
        assert_eq!("  REPORT ".parse::<Command>(), Ok(Command::Report));
        assert_eq!("Nexus Stats".parse::<Command>(), Ok(Command::Stats));
        assert_eq!("reboot".parse::<Command>(), Err(UnknownCommand("reboot".to_owned())));
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn test_status_lists_settings() {
        let mut shaper = Shaper::new(Config { send_rate_limit: 256_000, ..Config::default() });
        let now = shaper.now();
        let outcome = Command::Status.execute(&mut shaper, now, &WorldSnapshot::offline());

        let CommandOutcome::Info(text) = outcome else { panic!("status should be informational") };
        assert!(text.contains("Connected: No"));
        assert!(text.contains("Send Limit: 256000 bytes/s"));
        assert!(text.contains("Compression: Enabled"));
        assert!(text.contains("Max Queue: 128.00 KB"));
        assert!(text.contains("Quality Score: 100/100"));
    }

    #[test]
    fn test_test_command_requires_connection() {
        let mut shaper = Shaper::default();
        let now = shaper.now();
        let outcome = Command::Test.execute(&mut shaper, now, &WorldSnapshot::offline());
        assert!(matches!(outcome, CommandOutcome::Error(_)));

        let report = Command::Report.execute(&mut shaper, now, &WorldSnapshot::offline());
        assert_eq!(
            report.message(),
            "Test failed: Not connected to a server. Join a world first."
        );
    }

    #[test]
    fn test_report_shows_progress_while_running() {
        let mut shaper = Shaper::default();
        let world = WorldSnapshot::connected(10);
        let now = shaper.now();

        assert!(matches!(Command::Test.execute(&mut shaper, now, &world), CommandOutcome::Success(_)));
        assert_eq!(
            Command::Test.execute(&mut shaper, now, &world),
            CommandOutcome::Info("Test already running...".to_owned())
        );

        let later = now + Duration::from_millis(1250);
        assert_eq!(
            Command::Report.execute(&mut shaper, later, &world).message(),
            "Test in progress... 25%"
        );
    }

    #[test]
    fn test_stats_toggles_overlay() {
        let mut shaper = Shaper::default();
        let now = shaper.now();
        let world = WorldSnapshot::offline();
        assert_eq!(Command::Stats.execute(&mut shaper, now, &world).message(), "Stats overlay: Shown");
        assert_eq!(Command::Stats.execute(&mut shaper, now, &world).message(), "Stats overlay: Hidden");
    }
}
