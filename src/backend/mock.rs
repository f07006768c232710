use log::debug;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AppError;
use crate::relay::DigitalOutputSink;

#[derive(Default)]
pub struct MockOutputSink {
    pins: RwLock<FxHashMap<u32, bool>>, // keyed by pin number, present while configured
    failing: RwLock<FxHashSet<u32>>,
}

impl MockOutputSink {
    pub fn fail_writes_to(&self, pin: u32) {
        self.failing.write().insert(pin);
    }

    pub fn is_configured(&self, pin: u32) -> bool {
        self.pins.read().contains_key(&pin)
    }

    pub fn level(&self, pin: u32) -> Option<bool> {
        self.pins.read().get(&pin).copied()
    }
}

impl DigitalOutputSink for MockOutputSink {
    fn configure(&self, pin: u32) -> Result<(), AppError> {
        self.pins.write().entry(pin).or_insert(false);
        debug!("mock pin {pin} configured as output");

        Ok(())
    }

    fn write(&self, pin: u32, value: bool) -> Result<(), AppError> {
        if self.failing.read().contains(&pin) {
            return Err(AppError::Gpio(format!("write to pin {pin} failed")));
        }

        let mut pins = self.pins.write();
        let level = pins
            .get_mut(&pin)
            .ok_or_else(|| AppError::Gpio(format!("pin {pin} not configured as output")))?;
        *level = value;

        Ok(())
    }

    fn release_all(&self) -> Result<(), AppError> {
        self.pins.write().clear();

        Ok(())
    }
}
