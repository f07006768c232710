use log::debug;
use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};
use parking_lot::{FairMutex, RwLock, RwLockUpgradableReadGuard};
use rustc_hash::FxHashMap;

use crate::error::AppError;
use crate::relay::DigitalOutputSink;

pub struct LibgpiodOutputSink {
    chip: String,
    lines: RwLock<FxHashMap<u32, FairMutex<request::Request>>>, // keyed by line offset
}

impl LibgpiodOutputSink {
    pub fn new(chip: impl Into<String>) -> Result<Self, AppError> {
        let chip = chip.into();
        // fail at startup rather than on the first relay command
        Self::open_chip(&chip)?;

        Ok(Self {
            chip,
            lines: RwLock::new(FxHashMap::default()),
        })
    }

    fn open_chip(path: &str) -> Result<Chip, AppError> {
        let p = PathBuf::from(path);
        Chip::open(&p).map_err(|e| AppError::Gpio(format!("open chip {path}: {e}")))
    }

    fn make_line_config(offset: u32) -> Result<line::Config, AppError> {
        let mut ls =
            line::Settings::new().map_err(|e| AppError::Gpio(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Output)
            .map_err(|e| AppError::Gpio(format!("set direction: {e}")))?;
        ls.set_drive(line::Drive::PushPull)
            .map_err(|e| AppError::Gpio(format!("set drive: {e}")))?;

        let mut cfg =
            line::Config::new().map_err(|e| AppError::Gpio(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], ls)
            .map_err(|e| AppError::Gpio(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn request_line(&self, offset: u32) -> Result<request::Request, AppError> {
        let chip = Self::open_chip(&self.chip)?;
        let line_cfg = Self::make_line_config(offset)?;

        let mut req_cfg =
            request::Config::new().map_err(|e| AppError::Gpio(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| AppError::Gpio(format!("request consumer: {e}")))?;
        chip.request_lines(Some(&req_cfg), &line_cfg)
            .map_err(|e| AppError::Gpio(format!("request lines: {e}")))
    }
}

impl DigitalOutputSink for LibgpiodOutputSink {
    fn configure(&self, pin: u32) -> Result<(), AppError> {
        let lines = self.lines.upgradable_read();
        if lines.contains_key(&pin) {
            return Ok(());
        }

        let request = self.request_line(pin)?;
        RwLockUpgradableReadGuard::upgrade(lines).insert(pin, FairMutex::new(request));
        debug!("line {pin} on {} requested as output", self.chip);

        Ok(())
    }

    fn write(&self, pin: u32, value: bool) -> Result<(), AppError> {
        let lines = self.lines.read();
        let request = lines
            .get(&pin)
            .ok_or_else(|| AppError::Gpio(format!("line {pin} not configured as output")))?;

        request
            .lock()
            .set_value(
                pin,
                if value {
                    line::Value::Active
                } else {
                    line::Value::InActive
                },
            )
            .map_err(|e| AppError::Gpio(format!("set value on line {pin}: {e}")))?;
        Ok(())
    }

    fn release_all(&self) -> Result<(), AppError> {
        // dropping a request hands its line back to the kernel
        self.lines.write().clear();

        Ok(())
    }
}
