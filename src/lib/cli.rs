/// Shared entry point of the `copy_pua` and `merge_fonts` binaries
use crate::args::{usage_text, RangeToolArgs};
use crate::config::ToolConfig;
use crate::engine::TrueTypeFont;
use crate::logging::init_logging;
use crate::range::OperationMode;
use crate::tool;
use clap::error::ErrorKind;
use clap::Parser;
use log::{debug, error, info};
use std::process;

/// Parse the command line, run `mode` and exit the process
pub fn main_for(mode: OperationMode) -> ! {
    let args = match RangeToolArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage_text(mode));
            process::exit(1);
        }
    };

    // Initialize logging based on CLI arguments and RUST_LOG environment variable
    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    debug!("Parsed arguments: {:?}", args);

    let config = ToolConfig::resolve(mode, &args);
    match tool::run::<TrueTypeFont>(&config) {
        Ok(report) => {
            info!(
                "{} completed: {} cleared, {} transplanted",
                mode.name(),
                report.cleared,
                report.transplanted
            );
            process::exit(0);
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
