use simplelog::{ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Map repeated `-v` flags to a log level. Warnings are always shown.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn start_logger(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Error)
        .build();
    // Fails only if a logger is already installed, which leaves that one in place.
    if TermLogger::init(level, config, TerminalMode::Mixed).is_err() {
        log::debug!("Logger already started");
    }
}
