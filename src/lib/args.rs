/// Command-line argument parsing module
///
/// This module defines the CLI structure shared by both binaries using clap
/// with derive macros. It supports:
/// - Positional paths: primary font, secondary font, optional output
/// - Standard verbosity flags: -v, -vv
/// - Quiet flag: -q
/// - Verbose level flag: --verbose-level=LEVEL
/// - Environment variable RUST_LOG integration
use crate::range::OperationMode;
use clap::Parser;
use std::path::PathBuf;

/// Transplant glyphs from a secondary TrueType font into a primary one
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct RangeToolArgs {
    /// Font to receive the glyphs
    #[arg(value_name = "PRIMARY")]
    pub primary: PathBuf,

    /// Font the glyphs are taken from
    #[arg(value_name = "SECONDARY")]
    pub secondary: PathBuf,

    /// Output path; derived from the two input names when omitted
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease verbosity level (suppress most output except errors)
    #[arg(short)]
    pub quiet: bool,

    /// Set explicit verbosity level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub verbose_level: Option<String>,
}

impl RangeToolArgs {
    /// Determine the effective log level based on CLI flags and environment variables
    ///
    /// Priority:
    /// 1. RUST_LOG environment variable (highest priority)
    /// 2. --verbose-level flag
    /// 3. -q flag, then the count of -v flags (lowest priority)
    pub fn effective_log_level(&self) -> String {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            return rust_log;
        }

        if let Some(level) = &self.verbose_level {
            return level.clone();
        }

        if self.quiet {
            return "error".to_string();
        }

        match self.verbose {
            0 => "info".to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

/// Usage block printed when the positional arguments are missing
pub fn usage_text(mode: OperationMode) -> String {
    let (bin, default_output) = match mode {
        OperationMode::RangeCopy => ("copy_pua", "inputfont+CafeX(PUA).ttf"),
        OperationMode::FullMerge => ("merge_fonts", "inputfont+CafeX.ttf"),
    };

    format!(
        "
Usage: {bin} inputfont.ttf  CafeX.ttf  [outputfont.ttf]

Required arguments:  inputfont.ttf  CafeX.ttf

where 'CafeX.ttf' is one of: 'CafeCn.ttf'
                             'CafeKr.ttf'
                             'CafeStd.ttf'
                             'CafeTw.ttf'

When outputfont.ttf is omitted, '{default_output}' is written
to the current directory.
"
    )
}
