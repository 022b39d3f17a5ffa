use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Sends each record to the console logger and, when present, to a log file
/// logger. Each side keeps its own filter.
pub struct TeeLogger {
    console: env_logger::Logger,
    file: Option<env_logger::Logger>,
}

impl TeeLogger {
    pub fn new(console: env_logger::Logger, file: Option<env_logger::Logger>) -> Self {
        Self { console, file }
    }

    pub fn max_level(&self) -> LevelFilter {
        let file_level = self.file.as_ref().map_or(LevelFilter::Off, |f| f.filter());
        self.console.filter().max(file_level)
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || self.file.as_ref().is_some_and(|f| f.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if let Some(file) = &self.file {
            if file.matches(record) {
                file.log(record);
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

/// Console logger honouring `RUST_LOG`, falling back to `default_filter`.
pub fn console_logger(default_filter: &str) -> env_logger::Logger {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).build()
}

/// Appending, uncoloured logger writing to `path` at `level`.
pub fn file_logger(path: &Path, level: LevelFilter) -> std::io::Result<env_logger::Logger> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(env_logger::Builder::new()
        .filter_level(level)
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .build())
}

/// Installs the global logger: console at `warn` (`debug` when verbose), and
/// a persistent log file at `info` (`debug` when verbose) if `log_path` is
/// set and can be opened.
pub fn init_logging(verbose: bool, log_path: Option<&Path>) {
    let console = console_logger(if verbose { "debug" } else { "warn" });
    let file_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut open_error = None;
    let file = log_path.and_then(|path| match file_logger(path, file_level) {
        Ok(logger) => Some(logger),
        Err(e) => {
            open_error = Some(format!("Cannot open log file {}: {}", path.display(), e));
            None
        }
    });

    let logger = TeeLogger::new(console, file);
    let max_level = logger.max_level();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }

    if let Some(message) = open_error {
        log::warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use tempfile::TempDir;

    fn record_at(logger: &TeeLogger, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .args(format_args!("{}", message))
                .level(level)
                .target("backstop_lib::engine")
                .build(),
        );
    }

    #[test]
    fn test_file_receives_info_while_console_stays_at_warn() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/backstop.log");

        let file = file_logger(&path, LevelFilter::Info).unwrap();
        let console = env_logger::Builder::new().filter_level(LevelFilter::Warn).build();
        let logger = TeeLogger::new(console, Some(file));

        assert_eq!(logger.max_level(), LevelFilter::Info);
        let info = Metadata::builder().level(Level::Info).target("backstop").build();
        assert!(logger.enabled(&info));

        record_at(&logger, Level::Info, "smart backup finished");
        record_at(&logger, Level::Debug, "classifier detail");
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("smart backup finished"));
        assert!(!contents.contains("classifier detail"));
    }

    #[test]
    fn test_file_logger_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backstop.log");
        fs::write(&path, "earlier run\n").unwrap();

        let file = file_logger(&path, LevelFilter::Info).unwrap();
        let console = env_logger::Builder::new().filter_level(LevelFilter::Off).build();
        let logger = TeeLogger::new(console, Some(file));
        record_at(&logger, Level::Warn, "later run");
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier run\n"));
        assert!(contents.contains("later run"));
    }

    #[test]
    fn test_console_only_max_level() {
        let console = env_logger::Builder::new().filter_level(LevelFilter::Warn).build();
        let logger = TeeLogger::new(console, None);
        assert_eq!(logger.max_level(), LevelFilter::Warn);
    }
}
