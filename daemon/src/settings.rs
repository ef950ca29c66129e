//! Owned copy of the parsed configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use rebooter_core::config::{Config, PinAssignments, RebooterConfig};
use tracing::info;

use crate::error::DaemonError;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub path: PathBuf,
    pub rebooter: RebooterConfig,
    pub pins: PinAssignments,
    pub gpio_chip: PathBuf,
    pub speedtest_command: String,
    pub notify_command: Option<String>,
    pub buzzer_pwm: Option<PathBuf>,
}

impl Settings {
    /// Reads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::ReadConfig`] when the file cannot be read and
    /// [`DaemonError::Config`] when its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = fs::read_to_string(path).map_err(|source| DaemonError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(path, &text)
    }

    /// # Errors
    ///
    /// Returns [`DaemonError::Config`] when `text` is not a valid configuration.
    pub fn from_text(path: &Path, text: &str) -> Result<Self, DaemonError> {
        let config = Config::parse(text).map_err(|source| DaemonError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            rebooter: config.rebooter,
            pins: config.pins,
            gpio_chip: PathBuf::from(config.gpio_chip),
            speedtest_command: config.speedtest_command.to_owned(),
            notify_command: config.notify_command.map(str::to_owned),
            buzzer_pwm: config.buzzer_pwm.map(PathBuf::from),
        })
    }

    pub fn log_summary(&self) {
        let rebooter = &self.rebooter;
        info!(
            "config: loaded path={} slow_speed_mbps={} check_interval_s={} after_low_s={} warn_timeout_s={}",
            self.path.display(),
            rebooter.slow_speed,
            rebooter.check_interval.as_secs(),
            rebooter
                .check_interval_after_low
                .map_or_else(|| "-".to_owned(), |interval| interval.as_secs().to_string()),
            rebooter.warn_timeout.as_secs(),
        );
        info!(
            "config: reboot hold_s={} reboot_delay_s={} router_delay_s={} quiet_hours={} buzzer_hz={}",
            rebooter.manual_reboot_hold.as_secs(),
            rebooter.reboot_delay.as_secs(),
            rebooter.router_delay.as_secs(),
            rebooter.quiet_hours,
            rebooter.buzzer_frequency_hz,
        );

        let pins = &self.pins;
        info!(
            "config: pins chip={} button={} buzzer={} modem={} router={} leds={}/{}/{} power_active_low={} button_active_low={}",
            self.gpio_chip.display(),
            pins.button,
            pins.buzzer,
            pins.modem,
            pins.router,
            pins.normal_led,
            pins.slow_led,
            pins.rebooting_led,
            pins.power_active_low,
            pins.button_active_low,
        );
        if let Some(channel) = &self.buzzer_pwm {
            info!("config: buzzer pwm channel={}", channel.display());
        }
        info!(
            "config: commands speedtest=`{}` notify={}",
            self.speedtest_command,
            self.notify_command.as_deref().unwrap_or("log only"),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::CONFIG_EXIT_CODE;

    const SAMPLE: &str = "\
[Config]
SLOW_SPEED = 20
CHECK_INTERVAL_MINUTES = 15
MANUAL_REBOOT_SECONDS = 5
REBOOT_DELAY_SECONDS = 10
ROUTER_DELAY_SECONDS = 45
QUIET_HOURS_RANGE = (23, 7)
BUTTON_PIN = 17
BUZZER_PIN = 18
MODEM_PIN = 23
ROUTER_PIN = 24
NORMAL_LED_PIN = 5
SLOW_LED_PIN = 6
REBOOTING_LED_PIN = 13
NOTIFY_COMMAND = /usr/local/bin/notify-phone
BUZZER_PWM = /sys/class/pwm/pwmchip0/pwm1
";

    #[test]
    fn copies_text_fields_out_of_the_file() {
        let settings = Settings::from_text(Path::new("test.ini"), SAMPLE).expect("valid");
        assert_eq!(settings.path, PathBuf::from("test.ini"));
        assert_eq!(settings.gpio_chip, PathBuf::from("/dev/gpiochip0"));
        assert_eq!(settings.speedtest_command, "speedtest-cli --simple");
        assert_eq!(
            settings.notify_command.as_deref(),
            Some("/usr/local/bin/notify-phone")
        );
        assert_eq!(settings.rebooter.check_interval, Duration::from_secs(900));
        assert_eq!(settings.pins.router, 24);
        assert_eq!(
            settings.buzzer_pwm,
            Some(PathBuf::from("/sys/class/pwm/pwmchip0/pwm1"))
        );
    }

    #[test]
    fn invalid_text_is_a_config_error() {
        let err = Settings::from_text(Path::new("bad.ini"), "[Config]\nSLOW_SPEED = 20\n")
            .expect_err("incomplete file");
        assert!(matches!(err, DaemonError::Config { .. }));
        assert_eq!(err.exit_code(), CONFIG_EXIT_CODE);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Settings::load(Path::new("/nonexistent/rebooter/config.ini"))
            .expect_err("no such file");
        assert!(matches!(err, DaemonError::ReadConfig { .. }));
        assert_eq!(err.exit_code(), CONFIG_EXIT_CODE);
    }
}
