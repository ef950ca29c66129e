//! Output pin that records every level written to it. Clones share the log.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, PinState};

#[derive(Clone, Debug, Default)]
pub struct RecordingPin {
    levels: Arc<Mutex<Vec<PinState>>>,
}

impl RecordingPin {
    #[must_use]
    pub fn levels(&self) -> Vec<PinState> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, state: PinState) {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state);
    }
}

impl ErrorType for RecordingPin {
    type Error = ErrorKind;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.push(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.push(PinState::High);
        Ok(())
    }
}
