//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize logging with a default level when `RUST_LOG` is unset
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}
