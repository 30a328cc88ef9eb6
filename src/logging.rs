use log::LevelFilter;

/// Environment variable read by [`init_logging`].
pub const LOG_ENV: &str = "RACOON_LOG";

/// Install an `env_logger` backend.
///
/// `default_filter` (e.g. `"error,racoon=info"`) applies unless `RACOON_LOG`
/// is set. Returns `false` when a logger was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, default_filter))
        .try_init()
        .is_ok()
}
