use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

use crate::config::LoggingConfig;
use crate::error::AppError;

struct LogSink {
    file: Option<File>,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

pub fn level_filter(level: &str) -> Result<LevelFilter, AppError> {
    match level.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => Ok(LevelFilter::Error),
        "WARNING" | "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        "TRACE" | "NOTSET" => Ok(LevelFilter::Trace),
        "OFF" => Ok(LevelFilter::Off),
        other => Err(AppError::Config(format!("Unknown log level: {other}"))),
    }
}

pub fn init(cfg: &LoggingConfig) -> Result<(), AppError> {
    let level = level_filter(&cfg.level)?;
    let file = cfg
        .file
        .as_ref()
        .map(|path| OpenOptions::new().create(true).append(true).open(path))
        .transpose()?;

    Builder::new()
        .filter_level(level)
        .parse_env(Env::default())
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}]: {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(LogSink { file })))
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to install logger: {e}")))
}
