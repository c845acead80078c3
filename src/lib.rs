pub mod api;
pub mod config;
pub mod core;

use log::LevelFilter;

pub fn init_logging(level: LevelFilter) {
    // RUST_LOG 优先，其次是命令行给出的级别
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init();
}
