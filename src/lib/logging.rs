/// Logging initialization module
///
/// Handles initialization of env_logger based on CLI arguments and environment variables.
/// The RUST_LOG environment variable takes precedence over CLI flags.
use crate::args::RangeToolArgs;
use env_logger::Builder;
use log::LevelFilter;

/// Map a textual level to a filter, `None` for RUST_LOG-style directives
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Initialize logging based on CLI arguments and environment variables
///
/// # Log Level Selection Priority
///
/// 1. RUST_LOG environment variable (highest priority)
/// 2. --verbose-level flag
/// 3. -q flag (quiet, only show errors)
/// 4. Count of -v flags (-v = debug, -vv = trace)
/// 5. Default (info level)
pub fn init_logging(args: &RangeToolArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::new();

    let level_str = args.effective_log_level();
    match parse_level(&level_str) {
        Some(level_filter) => {
            builder.filter_level(level_filter);
        }
        None => {
            // RUST_LOG format with module names
            builder.filter_level(LevelFilter::Info);
            builder.parse_filters(&level_str);
        }
    }

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });

    builder
        .try_init()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    Ok(())
}
