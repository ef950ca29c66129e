use rebooter_core::machine::BlinkRate;
use tracing::{debug, info};

/// Numeric status display.
pub trait SpeedDisplay {
    fn show_float(&mut self, value: f32, decimals: u8);
    fn clear(&mut self);
    fn set_blink_rate(&mut self, rate: BlinkRate);
}

/// Display stand-in that reports what a panel would show through the log.
#[derive(Debug, Default)]
pub struct LogDisplay {
    text: String,
    blink: BlinkRate,
}

impl LogDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeedDisplay for LogDisplay {
    fn show_float(&mut self, value: f32, decimals: u8) {
        let text = format!("{value:.prec$}", prec = usize::from(decimals));
        if text != self.text {
            info!("display: show value={text}");
            self.text = text;
        }
    }

    fn clear(&mut self) {
        if !self.text.is_empty() {
            debug!("display: clear");
            self.text.clear();
        }
        self.blink = BlinkRate::Off;
    }

    fn set_blink_rate(&mut self, rate: BlinkRate) {
        if rate != self.blink {
            debug!("display: blink rate={rate:?}");
            self.blink = rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_requested_precision() {
        let mut display = LogDisplay::new();
        display.show_float(93.456, 2);
        assert_eq!(display.text, "93.46");
        display.show_float(7.0, 0);
        assert_eq!(display.text, "7");
    }

    #[test]
    fn clear_resets_text_and_blink() {
        let mut display = LogDisplay::new();
        display.show_float(1.5, 2);
        display.set_blink_rate(BlinkRate::Fast);
        assert_eq!(display.blink, BlinkRate::Fast);

        display.clear();
        assert!(display.text.is_empty());
        assert_eq!(display.blink, BlinkRate::Off);
    }
}
