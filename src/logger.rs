use {
    backtrace::Backtrace,
    log::{Level, LevelFilter, Log, Metadata, Record},
    std::{
        cell::RefCell,
        io::{self, Write},
        panic::PanicHookInfo,
        time::SystemTime,
    },
    thiserror::Error,
    uapi::{Fd, OwnedFd},
};

thread_local! {
    static LINE: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Could not duplicate stderr")]
    DupStderr(#[source] io::Error),
    #[error("A logger has already been installed")]
    AlreadyInstalled,
}

/// Writes one line per record to a private duplicate of stderr.
pub struct Logger {
    filter: LevelFilter,
    out: OwnedFd,
}

impl Logger {
    /// Installs the process-wide logger and a panic hook that logs the panic with a
    /// backtrace.
    pub fn install_stderr(level: Level) -> Result<(), LoggerError> {
        let out = uapi::fcntl_dupfd_cloexec(2, 0)
            .map_err(|e| LoggerError::DupStderr(io::Error::from_raw_os_error(e.0)))?;
        let logger = Self {
            filter: level.to_level_filter(),
            out,
        };
        log::set_boxed_logger(Box::new(logger))
            .map_err(|_| LoggerError::AlreadyInstalled)?;
        log::set_max_level(level.to_level_filter());
        std::panic::set_hook(Box::new(log_panic));
        Ok(())
    }

    fn write_record(&self, record: &Record) {
        LINE.with_borrow_mut(|line| {
            line.clear();
            let time = humantime::format_rfc3339_millis(SystemTime::now());
            let _ = writeln!(
                line,
                "[{} {:5} {}] {}",
                time,
                record.level(),
                record.target(),
                record.args(),
            );
            let _ = Fd::new(self.out.raw()).write_all(line);
        });
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.write_record(record);
        }
    }

    fn flush(&self) {}
}

fn log_panic(info: &PanicHookInfo<'_>) {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("<no message>");
    match info.location() {
        Some(loc) => log::error!(
            "Panic at {}:{}:{}: {}",
            loc.file(),
            loc.line(),
            loc.column(),
            message,
        ),
        None => log::error!("Panic at unknown location: {}", message),
    }
    log::error!("Backtrace:\n{:?}", Backtrace::new());
}
