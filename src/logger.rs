use std::env;

const LIBS_DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Warn;

/// Initializes logger for current environment.
///
/// All output goes to stderr so that it never mixes with data written to
/// stdout. `verbose` lowers the level of this crate from info to debug.
pub fn init(verbose: bool) -> Result<(), log::SetLoggerError> {
    let base_logger = fern::Dispatch::new();
    let env_specific_logger = init_env_specific(base_logger);
    let crate_log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_specific_logger
        .level(libs_log_level())
        .level_for("fiberprocess", crate_log_level)
        .chain(std::io::stderr())
        .apply()
}

fn libs_log_level() -> log::LevelFilter {
    env::var("FP_LIBS_LOG_LEVEL")
        .map(|libs_log_level| match libs_log_level.as_str() {
            "error" => log::LevelFilter::Error,
            "warning" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            "off" => log::LevelFilter::Off,
            _ => LIBS_DEFAULT_LOG_LEVEL,
        })
        .unwrap_or(LIBS_DEFAULT_LOG_LEVEL)
}

#[cfg(debug_assertions)]
fn init_env_specific(base_logger: fern::Dispatch) -> fern::Dispatch {
    use fern::colors::{Color, ColoredLevelConfig};

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Cyan)
        .debug(Color::BrightWhite)
        .trace(Color::White);

    base_logger.format(move |out, message, record| {
        out.finish(format_args!(
            "{} [{}] [{}] {}",
            chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
            record.target(),
            colors.color(record.level()),
            message
        ))
    })
}

#[cfg(not(debug_assertions))]
fn init_env_specific(base_logger: fern::Dispatch) -> fern::Dispatch {
    base_logger.format(move |out, message, record| {
        out.finish(format_args!(
            "{} [{}] {}",
            chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
            record.level(),
            message
        ))
    })
}
