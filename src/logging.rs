use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

fn filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs to stderr. Used when no terminal view is drawn.
pub fn init_logger(directives: &str) {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .with_target(false);
    tracing_subscriber::fmt()
        .event_format(format)
        .with_env_filter(filter(directives))
        .with_writer(io::stderr)
        .init();
}

/// Logs to `path`, truncating it, so the terminal view keeps the screen.
pub fn init_file_logger(directives: &str, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339());
    tracing_subscriber::fmt()
        .with_ansi(false)
        .event_format(format)
        .with_env_filter(filter(directives))
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
