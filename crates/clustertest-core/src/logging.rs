use crate::constants::env_vars;
use crate::errors::SpecError;
use chrono::Local;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<u8> for LogLevel {
    fn from(val: u8) -> Self {
        match val {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl LogLevel {
    /// Level for a `-v` count; the baseline is `Info`.
    pub fn from_verbosity(count: u8) -> Self {
        LogLevel::from(count.saturating_add(LogLevel::Info as u8))
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

static DEFAULT_LOG_LEVEL: Mutex<LogLevel> = Mutex::new(LogLevel::Info);

pub fn set_log_level(level: LogLevel) {
    if let Ok(mut default_level) = DEFAULT_LOG_LEVEL.lock() {
        *default_level = level;
    }
}

pub fn set_log_level_from_env() {
    if let Some(level) = env::var(env_vars::LOG_LEVEL)
        .ok()
        .and_then(|v| LogLevel::parse(&v))
    {
        set_log_level(level);
    }
}

fn get_default_log_level() -> Level {
    DEFAULT_LOG_LEVEL
        .lock()
        .map(|level| (*level).into())
        .unwrap_or(Level::INFO)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(get_default_log_level().to_string()))
}

struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

struct CustomFormatter {
    workspace_root: PathBuf,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for CustomFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(writer, "[")?;
        LocalTimeFormatter.format_time(&mut writer)?;
        write!(writer, "] ")?;
        write!(writer, "[{:5}] ", metadata.level())?;

        if let Some(file) = metadata.file() {
            let display_path = Path::new(file)
                .strip_prefix(&self.workspace_root)
                .map(|rel| rel.to_string_lossy().to_string())
                .unwrap_or_else(|_| file.to_string());
            write!(writer, "{}:{} ", display_path, metadata.line().unwrap_or(0))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Logs to stderr with colors, plus `log_file` in plain text when given.
pub fn init_logger(log_file: Option<&Path>) -> Result<(), SpecError> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTimeFormatter)
        .with_ansi(true)
        .with_target(false)
        .with_line_number(false)
        .with_file(false)
        .with_level(true);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(stderr_layer)
            .init();
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    let file = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let workspace_root = env::current_dir().unwrap_or_default();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .event_format(CustomFormatter { workspace_root });

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::info!("--- Logger Initialized ({}) ---", path.display());
    Ok(())
}

fn format_command_for_display(command: &std::process::Command) -> String {
    let program = command.get_program().to_string_lossy();
    let args = command
        .get_args()
        .map(|arg| {
            let s = arg.to_string_lossy();
            if s.contains(char::is_whitespace) || s.is_empty() {
                format!("'{}'", s)
            } else {
                s.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", program, args)
}

pub fn log_and_print_command(command: &std::process::Command) {
    let command_str = format_command_for_display(command);
    tracing::debug!("[CMD] {}", command_str);
}
