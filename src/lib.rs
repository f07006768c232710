pub mod api;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod panel;
pub mod relay;
pub mod routes;

pub use config::{AppConfig, PinMap, SinkKind};
pub use error::{AppError, CommandError};
pub use relay::{DigitalOutputSink, RelayController};
pub use routes::{AppState, api_scope};

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodOutputSink;
pub use backend::MockOutputSink;
