use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(path).map_err(CliError::Io)?;
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true);
        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("global logger installs once");
        });
    }

    #[test]
    #[serial]
    fn log_macros_work_after_initialization() {
        ensure_global_logger_is_set();
        warn!("warning line");
        info!("info line");
        debug!("debug line");
    }

    #[test]
    #[serial]
    fn file_layer_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let file = File::create(&path).unwrap();
        let file_layer = fmt::layer().with_writer(file).with_ansi(false);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            info!("file-only message");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("file-only message"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_propagates_io_error() {
        let dir = Path::new("/");
        if cfg!(unix) && dir.is_dir() {
            let result = setup_logging(0, false, Some(dir));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
