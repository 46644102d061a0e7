use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use crate::CliError;

/// Install the global subscriber: stderr by default, appended to `log_file`
/// when given, JSON lines when `json` is set.
pub fn init_logging(log_file: Option<&Path>, json: bool) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let make_writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file = Arc::new(Mutex::new(file));
            BoxMakeWriter::new(move || SharedWriter {
                file: Arc::clone(&file),
            })
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(make_writer);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer.with_ansi(log_file.is_none())).try_init()
    };
    result.map_err(|err| CliError::Logging(err.to_string()))
}

struct SharedWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("failed to lock log file"))?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("failed to lock log file"))?;
        file.flush()
    }
}
