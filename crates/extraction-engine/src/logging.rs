//! Logging Setup

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a global `fmt` subscriber at `level`.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging(level: Level) -> bool {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

/// Same as [`init_logging`] with JSON-formatted events
pub fn init_json_logging(level: Level) -> bool {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
