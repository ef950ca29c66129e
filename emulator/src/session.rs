use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::Add;
use std::path::Path;
use std::time::Duration;

use embedded_hal_async::delay::DelayNs;
use futures::executor::block_on;
use rebooter_core::Mbps;
use rebooter_core::button::{ButtonEvent, ButtonMonitor};
use rebooter_core::config::RebooterConfig;
use rebooter_core::machine::{
    Action, BlinkRate, IndicatorCommand, IndicatorRole, Reaction, RebooterEvent, RebooterMachine,
};
use rebooter_core::sequence::{PowerAction, PowerDriver, PowerError, PowerLine, execute};

use crate::commands::{self, Command, CommandError, HELP_TOPICS};

/// Button sampling period, matching the daemon's poller.
const SAMPLE_PERIOD: Duration = Duration::from_millis(10);
const SHORT_PRESS: Duration = Duration::from_millis(200);

/// Simulated time since the session started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl SimInstant {
    pub const fn since_start(self) -> Duration {
        self.0
    }

    fn until(self, later: SimInstant) -> Duration {
        later.0.saturating_sub(self.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

/// Delay that completes immediately and records how long it was asked to
/// wait.
#[derive(Debug, Default)]
struct SimDelay {
    requested: Duration,
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.requested += Duration::from_nanos(u64::from(ns));
    }
}

/// Relay stand-in that remembers every write.
#[derive(Debug)]
struct RecordingPower {
    writes: Vec<(PowerLine, PowerAction)>,
    modem_on: bool,
    router_on: bool,
}

impl RecordingPower {
    const fn new() -> Self {
        Self {
            writes: Vec::new(),
            modem_on: true,
            router_on: true,
        }
    }
}

impl PowerDriver for RecordingPower {
    fn apply(&mut self, line: PowerLine, action: PowerAction) -> Result<(), PowerError> {
        let on = matches!(action, PowerAction::On);
        match line {
            PowerLine::Modem => self.modem_on = on,
            PowerLine::Router => self.router_on = on,
        }
        self.writes.push((line, action));
        Ok(())
    }

    fn release_all(&mut self) {
        self.modem_on = true;
        self.router_on = true;
    }
}

pub struct Session {
    config: RebooterConfig,
    machine: RebooterMachine<SimInstant>,
    button: ButtonMonitor<SimInstant>,
    power: RecordingPower,
    now: SimInstant,
    hour: u8,
    buzzer: bool,
    indicators: [IndicatorCommand; 3],
    display: Option<Mbps>,
    blink: BlinkRate,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    #[must_use]
    pub fn new(config: RebooterConfig, hour: u8, transcript: Option<TranscriptLogger>) -> Self {
        Self {
            config,
            machine: RebooterMachine::from_config(&config),
            button: ButtonMonitor::new(config.button_timing()),
            power: RecordingPower::new(),
            now: SimInstant::default(),
            hour,
            buzzer: false,
            indicators: [IndicatorCommand::Off; 3],
            display: None,
            blink: BlinkRate::Off,
            transcript,
        }
    }

    /// Applies the initial state's entry effects.
    ///
    /// # Errors
    ///
    /// Returns any error from writing the transcript.
    pub fn start(&mut self) -> io::Result<Vec<String>> {
        let mut out = Vec::new();
        let reaction = self.machine.start(self.now);
        self.apply(reaction, &mut out);
        out.push(format!(
            "state {} (slow below {} Mbit/s)",
            self.machine.state(),
            self.config.slow_speed
        ));
        self.record_output(&out)?;
        Ok(out)
    }

    /// Runs one REPL line and returns the lines to print.
    ///
    /// # Errors
    ///
    /// Returns any error from writing the transcript.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(self.now.since_start(), TranscriptRole::Host, trimmed)?;
        }

        let mut out = Vec::new();
        match commands::parse(trimmed) {
            Ok(command) => self.execute(command, &mut out),
            Err(CommandError::Unknown(word)) => {
                out.push(format!("ERR unknown command `{word}` (try `help`)"));
            }
            Err(CommandError::Usage(usage)) => out.push(format!("ERR usage: {usage}")),
        }

        self.record_output(&out)?;
        Ok(out)
    }

    fn execute(&mut self, command: Command<'_>, out: &mut Vec<String>) {
        match command {
            Command::Speed(mbps) => {
                if mbps.is_finite() && mbps >= 0.0 {
                    self.dispatch(RebooterEvent::Update(Mbps::new(mbps)), out);
                } else {
                    out.push("ERR speed must be a non-negative number".to_owned());
                }
            }
            Command::Press => {
                let press = SHORT_PRESS.min(self.config.manual_reboot_hold / 2);
                self.press_for(press, out);
            }
            Command::Hold => {
                let hold = self.config.manual_reboot_hold + SAMPLE_PERIOD * 2;
                self.press_for(hold, out);
            }
            Command::Advance(duration) => {
                self.advance(duration, out);
                out.push(format!("clock {}", clock(self.now)));
            }
            Command::Expire => match self.machine.warn_timer().armed() {
                Some(armed) => {
                    let wait = self.now.until(armed.deadline);
                    self.advance(wait, out);
                }
                None => out.push("warn timer is not armed".to_owned()),
            },
            Command::Hour(hour) => {
                self.hour = hour;
                let quiet = if self.config.quiet_hours.contains(hour) {
                    " (quiet)"
                } else {
                    ""
                };
                out.push(format!("hour {hour}{quiet}"));
            }
            Command::Status => self.status(out),
            Command::History => self.history(out),
            Command::Help(topic) => help(topic, out),
            Command::Exit => out.push("Session closed.".to_owned()),
        }
    }

    fn dispatch(&mut self, event: RebooterEvent, out: &mut Vec<String>) {
        let reaction = self.machine.handle(event, self.now);
        self.apply(reaction, out);
    }

    fn apply(&mut self, mut reaction: Reaction<SimInstant>, out: &mut Vec<String>) {
        loop {
            if let Some(transition) = reaction.transition {
                out.push(format!(
                    "state {} -> {} ({})",
                    transition.from, transition.to, transition.trigger
                ));
            }
            for action in &reaction.actions {
                self.perform(*action, out);
            }

            if !reaction.requests_reboot() {
                break;
            }
            self.reboot(out);
            reaction = self.machine.finish_reboot(self.now);
        }
    }

    fn perform(&mut self, action: Action<SimInstant>, out: &mut Vec<String>) {
        match action {
            Action::Indicator { role, command } => {
                let slot = &mut self.indicators[role.as_index()];
                if *slot != command {
                    *slot = command;
                    out.push(format!("led {} {}", role.name(), describe(command)));
                }
            }
            Action::BuzzerStart => {
                if self.config.quiet_hours.contains(self.hour) {
                    out.push(format!(
                        "buzzer silenced (quiet hours {}, hour {})",
                        self.config.quiet_hours, self.hour
                    ));
                } else {
                    self.buzzer = true;
                    out.push(format!("buzzer on {} Hz", self.config.buzzer_frequency_hz));
                }
            }
            Action::BuzzerStop => {
                if self.buzzer {
                    self.buzzer = false;
                    out.push("buzzer off".to_owned());
                }
            }
            Action::DisplayBlink(rate) => {
                if rate != self.blink {
                    self.blink = rate;
                    out.push(format!("display blink {}", blink_name(rate)));
                }
            }
            Action::ShowSpeed(speed) => {
                self.display = Some(speed);
                out.push(format!("display {speed}"));
            }
            Action::ArmWarnTimer(armed) => out.push(format!(
                "warn timer armed, fires at {}",
                clock(armed.deadline)
            )),
            Action::CancelWarnTimer(_) => out.push("warn timer cancelled".to_owned()),
            Action::NotifyWarn { speed, timeout } => out.push(format!(
                "notify: download {speed} Mbit/s is below {} Mbit/s, rebooting in {}s",
                self.config.slow_speed,
                timeout.as_secs()
            )),
            Action::RunRebootSequence => out.push("reboot sequence started".to_owned()),
        }
    }

    fn reboot(&mut self, out: &mut Vec<String>) {
        let plan = self.config.reboot_plan();
        let mut delay = SimDelay::default();
        self.power.writes.clear();

        let report = block_on(execute(&plan, &mut self.power, &mut delay));

        let mut offset = self.now;
        for (step, (line, action)) in plan.steps().iter().zip(&self.power.writes) {
            out.push(format!("power {line} {action} at {}", clock(offset)));
            offset = offset + step.hold_for;
        }

        self.now = self.now + delay.requested;
        out.push(format!(
            "reboot sequence finished steps={} failures={} waited={}s",
            report.applied,
            report.failures.len(),
            report.waited.as_secs()
        ));
    }

    /// Moves the clock forward, firing the warn timer if its deadline falls
    /// inside the interval.
    fn advance(&mut self, duration: Duration, out: &mut Vec<String>) {
        let target = self.now + duration;

        while let Some(armed) = self.machine.warn_timer().armed() {
            if armed.deadline > target {
                break;
            }
            self.now = self.now.max(armed.deadline);
            out.push(format!("warn timer expired at {}", clock(self.now)));
            self.dispatch(RebooterEvent::WarnTimerExpired(armed.token), out);

            if self.machine.warn_timer().is_current(armed.token) {
                break;
            }
        }

        self.now = self.now.max(target);
    }

    fn press_for(&mut self, duration: Duration, out: &mut Vec<String>) {
        let mut held = Duration::ZERO;
        while held < duration {
            self.sample_button(true, out);
            held += SAMPLE_PERIOD;
        }

        let settle = self.button.timing().debounce + SAMPLE_PERIOD;
        let mut released = Duration::ZERO;
        while released <= settle {
            self.sample_button(false, out);
            released += SAMPLE_PERIOD;
        }
    }

    fn sample_button(&mut self, pressed: bool, out: &mut Vec<String>) {
        self.advance(SAMPLE_PERIOD, out);
        let Some(event) = self.button.sample(pressed, self.now) else {
            return;
        };

        match event {
            ButtonEvent::Pressed => out.push("button pressed".to_owned()),
            ButtonEvent::HeldFor(held) => {
                out.push(format!("button held {}s", held.as_secs_f32()));
            }
        }
        self.dispatch(event.into(), out);
    }

    fn status(&self, out: &mut Vec<String>) {
        let quiet = if self.config.quiet_hours.contains(self.hour) {
            " (quiet)"
        } else {
            ""
        };
        out.push(format!(
            "state={} last_speed={} slow_speed={} clock={} hour={}{quiet}",
            self.machine.state(),
            self.machine.last_speed(),
            self.config.slow_speed,
            clock(self.now),
            self.hour
        ));

        let led = |role: IndicatorRole| describe(self.indicators[role.as_index()]);
        out.push(format!(
            "leds normal={} slow={} rebooting={} buzzer={}",
            led(IndicatorRole::Normal),
            led(IndicatorRole::Low),
            led(IndicatorRole::Rebooting),
            on_off(self.buzzer)
        ));
        out.push(format!(
            "display value={} blink={}",
            self.display
                .map_or_else(|| "-".to_owned(), |speed| speed.to_string()),
            blink_name(self.blink)
        ));

        match self.machine.warn_timer().armed() {
            Some(armed) => out.push(format!(
                "warn timer armed, {}s left",
                self.now.until(armed.deadline).as_secs()
            )),
            None => out.push("warn timer idle".to_owned()),
        }
        out.push(format!(
            "power modem={} router={}",
            on_off(self.power.modem_on),
            on_off(self.power.router_on)
        ));
    }

    fn history(&self, out: &mut Vec<String>) {
        let history = self.machine.history();
        if history.is_empty() {
            out.push("no transitions yet".to_owned());
            return;
        }

        for record in history.oldest_first() {
            let transition = record.transition;
            out.push(format!(
                "{} {} -> {} ({})",
                clock(record.at),
                transition.from,
                transition.to,
                transition.trigger
            ));
        }
        out.push(format!(
            "{} shown, {} since start",
            history.len(),
            history.total()
        ));
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let Some(transcript) = self.transcript.as_mut() else {
            return Ok(());
        };
        for line in lines {
            transcript.append_line(self.now.since_start(), TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn help(topic: Option<&str>, out: &mut Vec<String>) {
    match topic {
        None => {
            out.push("Commands:".to_owned());
            out.extend(HELP_TOPICS.iter().map(|(_, text)| format!("  {text}")));
        }
        Some(topic) => match commands::usage(topic) {
            Some(text) => out.push(text.to_owned()),
            None => out.push(format!(
                "ERR no help for `{topic}`; topics: {}",
                help_topic_list()
            )),
        },
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn clock(instant: SimInstant) -> String {
    format!("+{:.1}s", instant.since_start().as_secs_f32())
}

fn describe(command: IndicatorCommand) -> String {
    match command {
        IndicatorCommand::Off => "off".to_owned(),
        IndicatorCommand::On => "on".to_owned(),
        IndicatorCommand::Flash(pattern) => format!(
            "flash {}ms/{}ms",
            pattern.on.as_millis(),
            pattern.off.as_millis()
        ),
    }
}

const fn blink_name(rate: BlinkRate) -> &'static str {
    match rate {
        BlinkRate::Off => "off",
        BlinkRate::Slow => "slow",
        BlinkRate::Fast => "fast",
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Timestamped log of everything typed and printed.
pub struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    /// Creates (or truncates) the transcript at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from creating the file or its parent directory.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Speedtest rebooter emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since session start"
        )?;
        self.writer.flush()
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>8} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Copy, Clone)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    const fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use rebooter_core::quiet::QuietHours;

    use super::*;

    fn config() -> RebooterConfig {
        RebooterConfig {
            slow_speed: Mbps::new(10.0),
            reboot_delay: Duration::from_secs(5),
            router_delay: Duration::from_secs(20),
            quiet_hours: QuietHours::new(22, 8).expect("valid hours"),
            ..RebooterConfig::default()
        }
    }

    fn session() -> Session {
        let mut session = Session::new(config(), 12, None);
        session.start().expect("start");
        session
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("command")
    }

    fn contains(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn start_lights_the_normal_indicator() {
        let mut session = Session::new(config(), 12, None);
        let lines = session.start().expect("start");
        assert_eq!(lines[0], "led normal on");
        assert!(contains(&lines, "state normal"));
    }

    #[test]
    fn warn_timeout_reboots_and_returns_to_normal() {
        let mut session = session();

        let lines = run(&mut session, "speed 4");
        assert!(contains(&lines, "state normal -> low (update)"));
        assert!(contains(&lines, "display 4.00"));

        let lines = run(&mut session, "speed 3");
        assert!(contains(&lines, "state low -> warn_reboot (update)"));
        assert!(contains(&lines, "buzzer on 10000 Hz"));
        assert!(contains(&lines, "led slow flash 500ms/500ms"));

        let lines = run(&mut session, "advance 30s");
        let expected = [
            "warn timer expired at +30.0s",
            "state warn_reboot -> rebooting (warn_expired)",
            "power modem off at +30.0s",
            "power router off at +30.0s",
            "power modem on at +35.0s",
            "power router on at +55.0s",
            "state rebooting -> normal (reboot_finished)",
        ];
        let mut position = 0;
        for needle in expected {
            let found = lines[position..]
                .iter()
                .position(|line| line.contains(needle))
                .unwrap_or_else(|| panic!("missing `{needle}` in {lines:#?}"));
            position += found + 1;
        }

        let lines = run(&mut session, "status");
        assert!(contains(&lines, "state=normal"));
        assert!(contains(&lines, "power modem=on router=on"));
        assert!(contains(&lines, "warn timer idle"));
    }

    #[test]
    fn press_during_warning_cancels_the_reboot() {
        let mut session = session();
        run(&mut session, "speed 2");
        run(&mut session, "speed 2");

        let lines = run(&mut session, "press");
        assert!(contains(&lines, "button pressed"));
        assert!(contains(&lines, "warn timer cancelled"));
        assert!(contains(&lines, "state warn_reboot -> normal (button_pressed)"));
        assert!(!contains(&lines, "reboot sequence started"));

        let lines = run(&mut session, "expire");
        assert_eq!(lines, ["warn timer is not armed"]);
    }

    #[test]
    fn hold_forces_a_reboot_from_normal() {
        let mut session = session();
        let lines = run(&mut session, "hold");
        assert!(contains(&lines, "button held 3s"));
        assert!(contains(&lines, "state normal -> rebooting (button_held)"));
        assert!(contains(&lines, "reboot sequence finished steps=4 failures=0 waited=25s"));
        assert!(contains(&lines, "state rebooting -> normal (reboot_finished)"));
        assert!(!contains(&lines, "button pressed"));
    }

    #[test]
    fn quiet_hours_silence_only_the_buzzer() {
        let mut session = session();
        assert_eq!(run(&mut session, "hour 23"), ["hour 23 (quiet)"]);
        run(&mut session, "speed 1");

        let lines = run(&mut session, "speed 1");
        assert!(contains(&lines, "buzzer silenced (quiet hours 22:00-08:00, hour 23)"));
        assert!(contains(&lines, "led slow flash"));
        assert!(!contains(&lines, "buzzer on"));
    }

    #[test]
    fn history_lists_transitions_in_order() {
        let mut session = session();
        assert_eq!(run(&mut session, "history"), ["no transitions yet"]);

        run(&mut session, "speed 1");
        run(&mut session, "speed 50");
        let lines = run(&mut session, "history");
        assert_eq!(
            lines,
            [
                "+0.0s normal -> low (update)",
                "+0.0s low -> normal (update)",
                "2 shown, 2 since start",
            ]
        );
    }

    #[test]
    fn reports_bad_input() {
        let mut session = session();
        assert_eq!(
            run(&mut session, "reboot"),
            ["ERR unknown command `reboot` (try `help`)"]
        );
        assert!(run(&mut session, "hour 99")[0].starts_with("ERR usage: hour <0-23>"));
        assert!(run(&mut session, "help nothing")[0].starts_with("ERR no help for `nothing`"));
        assert!(run(&mut session, "").is_empty());
    }
}
