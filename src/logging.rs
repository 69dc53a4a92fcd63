use tracing::Level;
use tracing_web::MakeWebConsoleWriter;

/// Routes `tracing` output to the browser console. The browser has no
/// wall clock for `fmt`, so timestamps are left out.
pub fn setup_logging() {
    let level = if cfg!(debug_assertions) { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new())
        .init();
}
