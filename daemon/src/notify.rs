//! Operator notifications for a pending reboot.
//!
//! Delivery is fire-and-forget: a failing notifier is logged and never delays
//! the state machine.

use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use rebooter_core::Mbps;
use tracing::{debug, info, warn};

pub trait Notifier {
    fn send(&mut self, subject: &str, body: &str);
}

/// Subject and body announcing a pending reboot.
#[must_use]
pub fn warn_message(speed: Mbps, timeout: Duration) -> (String, String) {
    let subject = "Speedtest rebooter: slow connection".to_owned();
    let body = format!(
        "Download speed {speed} Mbit/s is below the threshold. The modem and router \
         will be power-cycled in {} seconds unless the button is pressed.",
        timeout.as_secs()
    );
    (subject, body)
}

/// Runs an external program with the subject and body appended as its last
/// two arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    /// Splits `command_line` on whitespace. Returns `None` for a blank line.
    #[must_use]
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn command(&self, subject: &str, body: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(subject)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        command
    }
}

impl Notifier for CommandNotifier {
    fn send(&mut self, subject: &str, body: &str) {
        let mut child = match self.command(subject, body).spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!("notify: cannot run program={} error={err}", self.program);
                return;
            }
        };

        let program = self.program.clone();
        let reaper = thread::Builder::new()
            .name("notify".into())
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => debug!("notify: delivered program={program}"),
                Ok(status) => warn!("notify: program={program} exited with {status}"),
                Err(err) => warn!("notify: lost program={program} error={err}"),
            });
        if let Err(err) = reaper {
            warn!("notify: cannot watch program={} error={err}", self.program);
        }
    }
}

/// Notification backend selected by the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notifications {
    /// Messages only reach the log.
    Log,
    Command(CommandNotifier),
}

impl Notifications {
    #[must_use]
    pub fn from_settings(notify_command: Option<&str>) -> Self {
        notify_command
            .and_then(CommandNotifier::from_command_line)
            .map_or(Notifications::Log, Notifications::Command)
    }
}

impl Notifier for Notifications {
    fn send(&mut self, subject: &str, body: &str) {
        info!("notify: {subject}: {body}");
        if let Notifications::Command(command) = self {
            command.send(subject, body);
        }
    }
}
