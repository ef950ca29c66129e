#![allow(clippy::module_name_repetitions)]

//! Typed configuration and the INI loader that produces it.
//!
//! The file holds a single `[Config]` section of `KEY = value` entries. Keys
//! match case-insensitively; `#` and `;` start comments. Anything outside the
//! `[Config]` section is ignored so the file can carry notes for other tools.
//!
//! Parsing borrows from the source text and never allocates; callers that
//! need owned strings copy the few text fields out of [`Config`].

use core::fmt;
use core::time::Duration;

use winnow::ascii::{digit1, float, space0};
use winnow::combinator::{alt, delimited, eof, opt, preceded, separated_pair, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_while};

use crate::Mbps;
use crate::button::ButtonTiming;
use crate::machine::OperatingState;
use crate::quiet::QuietHours;
use crate::sequence::RebootPlan;
use crate::timer::DEFAULT_WARN_TIMEOUT;

/// Section holding every recognised key.
pub const SECTION: &str = "Config";
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_SPEEDTEST_COMMAND: &str = "speedtest-cli --simple";
pub const DEFAULT_BUZZER_FREQUENCY_HZ: u32 = 10_000;
/// Longest interval, delay or timeout the file may ask for.
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Timing and threshold settings consumed by the state machine and tasks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RebooterConfig {
    pub slow_speed: Mbps,
    pub check_interval: Duration,
    pub check_interval_after_low: Option<Duration>,
    pub manual_reboot_hold: Duration,
    pub reboot_delay: Duration,
    pub router_delay: Duration,
    pub warn_timeout: Duration,
    pub quiet_hours: QuietHours,
    pub buzzer_frequency_hz: u32,
}

impl RebooterConfig {
    /// Sleep between measurements while the machine is in `state`.
    ///
    /// The shorter after-low interval, when configured, applies while the
    /// link is degraded (`Low` and `WarnReboot`).
    #[must_use]
    pub fn sampling_interval(&self, state: OperatingState) -> Duration {
        match (state, self.check_interval_after_low) {
            (OperatingState::Low | OperatingState::WarnReboot, Some(after_low)) => after_low,
            _ => self.check_interval,
        }
    }

    #[must_use]
    pub const fn reboot_plan(&self) -> RebootPlan {
        RebootPlan::new(self.reboot_delay, self.router_delay)
    }

    #[must_use]
    pub const fn button_timing(&self) -> ButtonTiming {
        ButtonTiming::new(self.manual_reboot_hold)
    }
}

impl Default for RebooterConfig {
    fn default() -> Self {
        Self {
            slow_speed: Mbps::new(5.0),
            check_interval: Duration::from_secs(30 * 60),
            check_interval_after_low: None,
            manual_reboot_hold: Duration::from_secs(3),
            reboot_delay: Duration::from_secs(30),
            router_delay: Duration::from_secs(60),
            warn_timeout: DEFAULT_WARN_TIMEOUT,
            quiet_hours: QuietHours::NEVER,
            buzzer_frequency_hz: DEFAULT_BUZZER_FREQUENCY_HZ,
        }
    }
}

/// GPIO line offsets and polarity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinAssignments {
    pub button: u32,
    pub buzzer: u32,
    pub modem: u32,
    pub router: u32,
    pub normal_led: u32,
    pub slow_led: u32,
    pub rebooting_led: u32,
    /// Power is on while the relay line is driven low.
    pub power_active_low: bool,
    /// Button pulls its line low when pressed.
    pub button_active_low: bool,
}

impl PinAssignments {
    /// Every output/input offset paired with its key, in declaration order.
    #[must_use]
    pub const fn lines(&self) -> [(ConfigKey, u32); 7] {
        [
            (ConfigKey::ButtonPin, self.button),
            (ConfigKey::BuzzerPin, self.buzzer),
            (ConfigKey::ModemPin, self.modem),
            (ConfigKey::RouterPin, self.router),
            (ConfigKey::NormalLedPin, self.normal_led),
            (ConfigKey::SlowLedPin, self.slow_led),
            (ConfigKey::RebootingLedPin, self.rebooting_led),
        ]
    }
}

/// Fully validated configuration file.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config<'a> {
    pub rebooter: RebooterConfig,
    pub pins: PinAssignments,
    pub gpio_chip: &'a str,
    pub speedtest_command: &'a str,
    pub notify_command: Option<&'a str>,
    /// Sysfs PWM channel that drives the buzzer instead of its GPIO line.
    pub buzzer_pwm: Option<&'a str>,
}

impl<'a> Config<'a> {
    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed lines, unknown or repeated keys,
    /// missing required keys, and values that fail validation.
    pub fn parse(text: &'a str) -> Result<Self, ConfigError> {
        let entries = Entries::collect(text)?;
        entries.build()
    }
}

macro_rules! config_keys {
    ($($variant:ident => $name:literal,)+) => {
        /// Keys recognised in the `[Config]` section.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum ConfigKey {
            $($variant,)+
        }

        impl ConfigKey {
            pub const ALL: &'static [ConfigKey] = &[$(ConfigKey::$variant,)+];

            /// Canonical upper-case spelling.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(ConfigKey::$variant => $name,)+
                }
            }
        }
    };
}

config_keys! {
    SlowSpeed => "SLOW_SPEED",
    CheckIntervalMinutes => "CHECK_INTERVAL_MINUTES",
    CheckIntervalMinutesAfterLow => "CHECK_INTERVAL_MINUTES_AFTER_LOW",
    ManualRebootSeconds => "MANUAL_REBOOT_SECONDS",
    RebootDelaySeconds => "REBOOT_DELAY_SECONDS",
    RouterDelaySeconds => "ROUTER_DELAY_SECONDS",
    WarnTimeoutSeconds => "WARN_TIMEOUT_SECONDS",
    QuietHoursRange => "QUIET_HOURS_RANGE",
    BuzzerFrequencyHz => "BUZZER_FREQUENCY_HZ",
    ButtonPin => "BUTTON_PIN",
    BuzzerPin => "BUZZER_PIN",
    ModemPin => "MODEM_PIN",
    RouterPin => "ROUTER_PIN",
    NormalLedPin => "NORMAL_LED_PIN",
    SlowLedPin => "SLOW_LED_PIN",
    RebootingLedPin => "REBOOTING_LED_PIN",
    PowerActiveLow => "POWER_ACTIVE_LOW",
    ButtonActiveLow => "BUTTON_ACTIVE_LOW",
    GpioChip => "GPIO_CHIP",
    SpeedtestCommand => "SPEEDTEST_COMMAND",
    NotifyCommand => "NOTIFY_COMMAND",
    BuzzerPwm => "BUZZER_PWM",
}

const KEY_COUNT: usize = ConfigKey::ALL.len();

impl ConfigKey {
    /// Looks a key up by name, ignoring ASCII case.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration failures. Line numbers are 1-based.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The line is neither a comment, a section header, nor `key = value`.
    Syntax { line: usize },
    /// An entry appeared before the first section header.
    EntryOutsideSection { line: usize },
    /// The file has no `[Config]` section.
    MissingSection,
    UnknownKey { line: usize },
    DuplicateKey { key: ConfigKey, line: usize },
    Missing(ConfigKey),
    InvalidValue(ConfigKey),
    OutOfRange(ConfigKey),
    /// Two keys name the same GPIO line.
    PinConflict { first: ConfigKey, second: ConfigKey },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Syntax { line } => write!(f, "line {line}: unrecognised syntax"),
            ConfigError::EntryOutsideSection { line } => {
                write!(f, "line {line}: entry appears before any section header")
            }
            ConfigError::MissingSection => write!(f, "missing [{SECTION}] section"),
            ConfigError::UnknownKey { line } => write!(f, "line {line}: unknown key"),
            ConfigError::DuplicateKey { key, line } => {
                write!(f, "line {line}: {key} is set more than once")
            }
            ConfigError::Missing(key) => write!(f, "{key} is required"),
            ConfigError::InvalidValue(key) => write!(f, "{key} has an unreadable value"),
            ConfigError::OutOfRange(key) => write!(f, "{key} is out of range"),
            ConfigError::PinConflict { first, second } => {
                write!(f, "{first} and {second} use the same GPIO line")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Line<'a> {
    Blank,
    Section(&'a str),
    Entry { key: &'a str, value: &'a str },
}

struct Entries<'a> {
    values: [Option<&'a str>; KEY_COUNT],
}

impl<'a> Entries<'a> {
    fn collect(text: &'a str) -> Result<Self, ConfigError> {
        let mut values = [None; KEY_COUNT];
        let mut section: Option<&'a str> = None;
        let mut saw_config = false;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            match line_parser()
                .parse(raw)
                .map_err(|_| ConfigError::Syntax { line })?
            {
                Line::Blank => {}
                Line::Section(name) => {
                    saw_config |= name == SECTION;
                    section = Some(name);
                }
                Line::Entry { key, value } => {
                    let Some(current) = section else {
                        return Err(ConfigError::EntryOutsideSection { line });
                    };
                    if current != SECTION {
                        continue;
                    }
                    let key = ConfigKey::lookup(key).ok_or(ConfigError::UnknownKey { line })?;
                    let slot = &mut values[key.index()];
                    if slot.is_some() {
                        return Err(ConfigError::DuplicateKey { key, line });
                    }
                    *slot = Some(value);
                }
            }
        }

        if saw_config {
            Ok(Self { values })
        } else {
            Err(ConfigError::MissingSection)
        }
    }

    fn get(&self, key: ConfigKey) -> Option<&'a str> {
        self.values[key.index()]
    }

    fn parse_with<O>(
        &self,
        key: ConfigKey,
        mut parser: impl Parser<&'a str, O, ContextError>,
    ) -> Result<Option<O>, ConfigError> {
        self.get(key)
            .map(|raw| {
                parser
                    .parse(raw)
                    .map_err(|_| ConfigError::InvalidValue(key))
            })
            .transpose()
    }

    fn required<O>(
        &self,
        key: ConfigKey,
        parser: impl Parser<&'a str, O, ContextError>,
    ) -> Result<O, ConfigError> {
        self.parse_with(key, parser)?
            .ok_or(ConfigError::Missing(key))
    }

    fn minutes(&self, key: ConfigKey) -> Result<Option<Duration>, ConfigError> {
        self.parse_with(key, float)?
            .map(|minutes: f32| positive_duration(key, minutes * 60.0))
            .transpose()
    }

    fn seconds(&self, key: ConfigKey) -> Result<Option<Duration>, ConfigError> {
        self.parse_with(key, unsigned())?
            .map(|secs| bounded(key, Duration::from_secs(u64::from(secs))))
            .transpose()
    }

    fn pin(&self, key: ConfigKey) -> Result<u32, ConfigError> {
        self.required(key, unsigned())
    }

    fn build(&self) -> Result<Config<'a>, ConfigError> {
        let slow_speed: f32 = self.required(ConfigKey::SlowSpeed, float)?;
        if !slow_speed.is_finite() || slow_speed <= 0.0 {
            return Err(ConfigError::OutOfRange(ConfigKey::SlowSpeed));
        }

        let check_interval = self
            .minutes(ConfigKey::CheckIntervalMinutes)?
            .ok_or(ConfigError::Missing(ConfigKey::CheckIntervalMinutes))?;
        let check_interval_after_low = self.minutes(ConfigKey::CheckIntervalMinutesAfterLow)?;

        let manual_reboot_hold = self
            .seconds(ConfigKey::ManualRebootSeconds)?
            .ok_or(ConfigError::Missing(ConfigKey::ManualRebootSeconds))?;
        if manual_reboot_hold.is_zero() {
            return Err(ConfigError::OutOfRange(ConfigKey::ManualRebootSeconds));
        }

        let reboot_delay = self
            .seconds(ConfigKey::RebootDelaySeconds)?
            .ok_or(ConfigError::Missing(ConfigKey::RebootDelaySeconds))?;
        let router_delay = self
            .seconds(ConfigKey::RouterDelaySeconds)?
            .ok_or(ConfigError::Missing(ConfigKey::RouterDelaySeconds))?;

        let warn_timeout = self
            .seconds(ConfigKey::WarnTimeoutSeconds)?
            .unwrap_or(DEFAULT_WARN_TIMEOUT);
        if warn_timeout.is_zero() {
            return Err(ConfigError::OutOfRange(ConfigKey::WarnTimeoutSeconds));
        }

        let (start, end) = self.required(ConfigKey::QuietHoursRange, hour_range())?;
        let quiet_hours = QuietHours::new(start, end)
            .map_err(|_| ConfigError::OutOfRange(ConfigKey::QuietHoursRange))?;

        let buzzer_frequency_hz = self
            .parse_with(ConfigKey::BuzzerFrequencyHz, unsigned())?
            .unwrap_or(DEFAULT_BUZZER_FREQUENCY_HZ);
        if buzzer_frequency_hz == 0 {
            return Err(ConfigError::OutOfRange(ConfigKey::BuzzerFrequencyHz));
        }

        let pins = PinAssignments {
            button: self.pin(ConfigKey::ButtonPin)?,
            buzzer: self.pin(ConfigKey::BuzzerPin)?,
            modem: self.pin(ConfigKey::ModemPin)?,
            router: self.pin(ConfigKey::RouterPin)?,
            normal_led: self.pin(ConfigKey::NormalLedPin)?,
            slow_led: self.pin(ConfigKey::SlowLedPin)?,
            rebooting_led: self.pin(ConfigKey::RebootingLedPin)?,
            power_active_low: self
                .parse_with(ConfigKey::PowerActiveLow, boolean())?
                .unwrap_or(false),
            button_active_low: self
                .parse_with(ConfigKey::ButtonActiveLow, boolean())?
                .unwrap_or(true),
        };
        check_distinct(&pins)?;

        Ok(Config {
            rebooter: RebooterConfig {
                slow_speed: Mbps::new(slow_speed),
                check_interval,
                check_interval_after_low,
                manual_reboot_hold,
                reboot_delay,
                router_delay,
                warn_timeout,
                quiet_hours,
                buzzer_frequency_hz,
            },
            pins,
            gpio_chip: self.text(ConfigKey::GpioChip)?.unwrap_or(DEFAULT_GPIO_CHIP),
            speedtest_command: self
                .text(ConfigKey::SpeedtestCommand)?
                .unwrap_or(DEFAULT_SPEEDTEST_COMMAND),
            notify_command: self.text(ConfigKey::NotifyCommand)?,
            buzzer_pwm: self.text(ConfigKey::BuzzerPwm)?,
        })
    }

    fn text(&self, key: ConfigKey) -> Result<Option<&'a str>, ConfigError> {
        match self.get(key) {
            Some("") => Err(ConfigError::InvalidValue(key)),
            other => Ok(other),
        }
    }
}

fn positive_duration(key: ConfigKey, secs: f32) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::OutOfRange(key));
    }
    Duration::try_from_secs_f32(secs)
        .map_err(|_| ConfigError::OutOfRange(key))
        .and_then(|duration| bounded(key, duration))
}

fn bounded(key: ConfigKey, duration: Duration) -> Result<Duration, ConfigError> {
    if duration > MAX_DURATION {
        Err(ConfigError::OutOfRange(key))
    } else {
        Ok(duration)
    }
}

fn check_distinct(pins: &PinAssignments) -> Result<(), ConfigError> {
    let lines = pins.lines();
    for (index, (first, offset)) in lines.iter().enumerate() {
        if let Some((second, _)) = lines[index + 1..].iter().find(|(_, other)| other == offset) {
            return Err(ConfigError::PinConflict {
                first: *first,
                second: *second,
            });
        }
    }
    Ok(())
}

fn line_parser<'a>() -> impl Parser<&'a str, Line<'a>, ContextError> {
    alt((
        (space0, eof).value(Line::Blank),
        (space0, one_of(['#', ';']), rest).value(Line::Blank),
        delimited(
            (space0, '['),
            take_while(1.., |c: char| c != ']'),
            (']', space0, eof),
        )
        .map(|name: &str| Line::Section(name.trim())),
        entry(),
    ))
}

fn entry<'a>() -> impl Parser<&'a str, Line<'a>, ContextError> {
    move |input: &mut &'a str| {
        let key = preceded(
            space0,
            take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
        )
        .parse_next(input)?;
        (space0, one_of(['=', ':'])).parse_next(input)?;
        let value = rest.parse_next(input)?;
        Ok(Line::Entry {
            key,
            value: strip_inline_comment(value).trim(),
        })
    }
}

/// Drops a trailing `; comment` or `# comment` preceded by whitespace.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (index, window) in bytes.windows(2).enumerate() {
        if window[0].is_ascii_whitespace() && matches!(window[1], b'#' | b';') {
            return &value[..index];
        }
    }
    value
}

fn unsigned<'a>() -> impl Parser<&'a str, u32, ContextError> {
    digit1.verify_map(|digits: &str| digits.parse::<u32>().ok())
}

fn hour<'a>() -> impl Parser<&'a str, u8, ContextError> {
    digit1.verify_map(|digits: &str| digits.parse::<u8>().ok())
}

/// `(22, 8)`, `22, 8`, or `22-8`.
fn hour_range<'a>() -> impl Parser<&'a str, (u8, u8), ContextError> {
    move |input: &mut &'a str| {
        let open = opt(terminated('(', space0)).parse_next(input)?;
        let range = separated_pair(hour(), (space0, one_of([',', '-']), space0), hour())
            .parse_next(input)?;
        if open.is_some() {
            (space0, ')').parse_next(input)?;
        }
        Ok(range)
    }
}

fn boolean<'a>() -> impl Parser<&'a str, bool, ContextError> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric()).verify_map(|word: &str| {
        const TRUE: [&str; 4] = ["true", "yes", "on", "1"];
        const FALSE: [&str; 4] = ["false", "no", "off", "0"];
        if TRUE.iter().any(|t| word.eq_ignore_ascii_case(t)) {
            Some(true)
        } else if FALSE.iter().any(|f| word.eq_ignore_ascii_case(f)) {
            Some(false)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::String;

    const SAMPLE: &str = "\
# speed test rebooter
[Config]
SLOW_SPEED = 5.5
CHECK_INTERVAL_MINUTES = 30
CHECK_INTERVAL_MINUTES_AFTER_LOW = 2.5
MANUAL_REBOOT_SECONDS = 3
REBOOT_DELAY_SECONDS = 30
ROUTER_DELAY_SECONDS = 60
QUIET_HOURS_RANGE = (22, 8)
BUTTON_PIN = 17
BUZZER_PIN = 18
MODEM_PIN = 23
ROUTER_PIN = 24
NORMAL_LED_PIN = 5
SLOW_LED_PIN = 6
REBOOTING_LED_PIN = 13 ; red
";

    #[test]
    fn parses_sample_file_with_defaults() {
        let config = Config::parse(SAMPLE).expect("valid config");
        let rebooter = config.rebooter;

        assert_eq!(rebooter.slow_speed, Mbps::new(5.5));
        assert_eq!(rebooter.check_interval, Duration::from_secs(1_800));
        assert_eq!(rebooter.check_interval_after_low, Some(Duration::from_secs(150)));
        assert_eq!(rebooter.manual_reboot_hold, Duration::from_secs(3));
        assert_eq!(rebooter.warn_timeout, Duration::from_secs(30));
        assert_eq!(rebooter.quiet_hours, QuietHours::new(22, 8).expect("range"));
        assert_eq!(rebooter.buzzer_frequency_hz, 10_000);
        assert_eq!(config.pins.rebooting_led, 13);
        assert!(!config.pins.power_active_low);
        assert!(config.pins.button_active_low);
        assert_eq!(config.gpio_chip, DEFAULT_GPIO_CHIP);
        assert_eq!(config.speedtest_command, DEFAULT_SPEEDTEST_COMMAND);
        assert_eq!(config.notify_command, None);
        assert_eq!(config.buzzer_pwm, None);
    }

    #[test]
    fn sampling_interval_shortens_while_degraded() {
        let rebooter = Config::parse(SAMPLE).expect("valid config").rebooter;
        assert_eq!(
            rebooter.sampling_interval(OperatingState::Normal),
            Duration::from_secs(1_800)
        );
        assert_eq!(
            rebooter.sampling_interval(OperatingState::WarnReboot),
            Duration::from_secs(150)
        );

        let plain = RebooterConfig {
            check_interval_after_low: None,
            ..rebooter
        };
        assert_eq!(
            plain.sampling_interval(OperatingState::Low),
            Duration::from_secs(1_800)
        );
    }

    #[test]
    fn keys_are_case_insensitive_and_optional_keys_apply() {
        let text = SAMPLE.replace("SLOW_SPEED", "slow_speed");
        let text = format_extra(
            &text,
            "warn_timeout_seconds: 45\nPOWER_ACTIVE_LOW = yes\nNOTIFY_COMMAND = mail -s rebooter root\nbuzzer_pwm = /sys/class/pwm/pwmchip0/pwm0\n",
        );
        let config = Config::parse(&text).expect("valid config");

        assert_eq!(config.rebooter.warn_timeout, Duration::from_secs(45));
        assert!(config.pins.power_active_low);
        assert_eq!(config.notify_command, Some("mail -s rebooter root"));
        assert_eq!(config.buzzer_pwm, Some("/sys/class/pwm/pwmchip0/pwm0"));
    }

    #[test]
    fn quiet_range_accepts_alternate_spellings() {
        for spelling in ["22,8", "22 - 8", "( 22 , 8 )"] {
            let text = SAMPLE.replace("(22, 8)", spelling);
            let config = Config::parse(&text).expect("valid config");
            assert_eq!(config.rebooter.quiet_hours.start(), 22);
            assert_eq!(config.rebooter.quiet_hours.end(), 8);
        }
    }

    #[test]
    fn reports_missing_and_invalid_values() {
        let text = SAMPLE.replace("SLOW_SPEED = 5.5\n", "");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::Missing(ConfigKey::SlowSpeed))
        );

        let text = SAMPLE.replace("= 5.5", "= fast");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::InvalidValue(ConfigKey::SlowSpeed))
        );

        let text = SAMPLE.replace("= 5.5", "= -1");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::SlowSpeed))
        );

        let text = SAMPLE.replace("(22, 8)", "(22, 24)");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::QuietHoursRange))
        );

        let text = SAMPLE.replace("MANUAL_REBOOT_SECONDS = 3", "MANUAL_REBOOT_SECONDS = 0");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::ManualRebootSeconds))
        );
    }

    #[test]
    fn rejects_intervals_longer_than_a_week() {
        let text = SAMPLE.replace("CHECK_INTERVAL_MINUTES = 30", "CHECK_INTERVAL_MINUTES = 1e15");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::CheckIntervalMinutes))
        );

        let text = SAMPLE.replace("= 2.5", "= 10081");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::CheckIntervalMinutesAfterLow))
        );

        let text = SAMPLE.replace("ROUTER_DELAY_SECONDS = 60", "ROUTER_DELAY_SECONDS = 4000000000");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::OutOfRange(ConfigKey::RouterDelaySeconds))
        );

        let text = SAMPLE.replace("CHECK_INTERVAL_MINUTES = 30", "CHECK_INTERVAL_MINUTES = 10080");
        let config = Config::parse(&text).expect("a week is allowed");
        assert_eq!(config.rebooter.check_interval, MAX_DURATION);
    }

    #[test]
    fn rejects_unknown_and_duplicate_keys() {
        let text = format_extra(SAMPLE, "SLOW_SPEEDS = 4\n");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::UnknownKey { line: 17 })
        );

        let text = format_extra(SAMPLE, "slow_speed = 4\n");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::DuplicateKey {
                key: ConfigKey::SlowSpeed,
                line: 17,
            })
        );
    }

    #[test]
    fn rejects_structural_problems() {
        assert_eq!(
            Config::parse("SLOW_SPEED = 3\n[Config]\n"),
            Err(ConfigError::EntryOutsideSection { line: 1 })
        );
        assert_eq!(
            Config::parse("[Other]\nFOO = 1\n"),
            Err(ConfigError::MissingSection)
        );
        assert_eq!(
            Config::parse("[Config]\nthis is not ini\n"),
            Err(ConfigError::Syntax { line: 2 })
        );
    }

    #[test]
    fn other_sections_are_ignored() {
        let text = format_extra(SAMPLE, "[Notes]\nANYTHING = goes\n");
        assert!(Config::parse(&text).is_ok());
    }

    #[test]
    fn rejects_shared_pins() {
        let text = SAMPLE.replace("SLOW_LED_PIN = 6", "SLOW_LED_PIN = 5");
        assert_eq!(
            Config::parse(&text),
            Err(ConfigError::PinConflict {
                first: ConfigKey::NormalLedPin,
                second: ConfigKey::SlowLedPin,
            })
        );
    }

    #[test]
    fn strips_inline_comments_only_after_whitespace() {
        assert_eq!(strip_inline_comment("13 ; red"), "13");
        assert_eq!(strip_inline_comment("a#b"), "a#b");
    }

    fn format_extra(base: &str, extra: &str) -> String {
        let mut text = String::from(base);
        text.push_str(extra);
        text
    }
}
