//! A minimal [`log`](log) backend writing one line per record, either into
//! a trace file or onto stderr.
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::LoggerError;

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

pub struct FileLogger {
    level: LevelFilter,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl FileLogger {
    pub fn new(writer: Box<dyn Write + Send>, level: LevelFilter) -> Self {
        Self {
            level,
            writer: Mutex::new(writer),
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut writer = self.writer.lock();
        // a failing log sink must never stop the machine
        let _ = writeln!(
            writer,
            "{:<5} [{}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = self.writer.lock().flush();
    }
}

/// Installs the global logger. Records go into the file at `path` or onto
/// stderr if no path is given. Can only be called once per process.
pub fn init(path: Option<&Path>, level: LevelFilter) -> Result<(), LoggerError> {
    let writer: Box<dyn Write + Send> = match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stderr()),
    };

    LOGGER
        .set(FileLogger::new(writer, level))
        .map_err(|_| LoggerError::AlreadyInstalled)?;
    let logger = LOGGER.get().ok_or(LoggerError::AlreadyInstalled)?;

    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Flushes the installed logger, buffered file output is lost otherwise.
pub fn flush() {
    log::logger().flush();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use log::Level;

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn content(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_writes_enabled_records() {
        let buffer = Buffer::default();
        let logger = FileLogger::new(Box::new(buffer.clone()), LevelFilter::Debug);

        logger.log(
            &Record::builder()
                .args(format_args!("{:#06X}", 0x200))
                .level(Level::Debug)
                .target("chip")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("hidden"))
                .level(Level::Trace)
                .target("chip")
                .build(),
        );
        logger.flush();

        assert_eq!(buffer.content(), "DEBUG [chip] 0x0200\n");
    }

    #[test]
    fn test_level_filter() {
        let logger = FileLogger::new(Box::new(io::sink()), LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }
}
