#[cfg(feature = "hardware-gpio")]
pub mod libgpiod;
pub mod mock;

#[cfg(feature = "hardware-gpio")]
pub use libgpiod::LibgpiodOutputSink;
pub use mock::MockOutputSink;

use crate::config::{GpioConfig, SinkKind};
use crate::error::AppError;
use crate::relay::DigitalOutputSink;

pub fn open_sink(cfg: &GpioConfig) -> Result<Box<dyn DigitalOutputSink>, AppError> {
    match cfg.backend {
        SinkKind::Mock => Ok(Box::new(MockOutputSink::default())),
        #[cfg(feature = "hardware-gpio")]
        SinkKind::Libgpiod => Ok(Box::new(LibgpiodOutputSink::new(cfg.chip.clone())?)),
        #[cfg(not(feature = "hardware-gpio"))]
        SinkKind::Libgpiod => Err(AppError::Config(
            "gpio backend 'libgpiod' requires the hardware-gpio feature".into(),
        )),
    }
}
