//! Run configuration.
//!
//! Everything a run needs comes from the command line: the operation mode is
//! fixed by the binary, the paths come from the positional arguments. When no
//! output path is given, one is derived from the two input file stems.

use crate::args::RangeToolArgs;
use crate::range::OperationMode;
use std::path::{Path, PathBuf};

/// Primary font, secondary (donor) font and resolved output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTriple {
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub output: PathBuf,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub mode: OperationMode,
    pub paths: PathTriple,
}

impl ToolConfig {
    /// Build a configuration, deriving the output path when `output` is `None`
    pub fn new(
        mode: OperationMode,
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
        output: Option<PathBuf>,
    ) -> Self {
        let primary = primary.into();
        let secondary = secondary.into();
        let output =
            output.unwrap_or_else(|| default_output_path(&primary, &secondary, mode));

        ToolConfig {
            mode,
            paths: PathTriple {
                primary,
                secondary,
                output,
            },
        }
    }

    /// Resolve the configuration from parsed command-line arguments
    pub fn resolve(mode: OperationMode, args: &RangeToolArgs) -> Self {
        ToolConfig::new(
            mode,
            args.primary.clone(),
            args.secondary.clone(),
            args.output.clone(),
        )
    }
}

/// Derive `"<primaryStem>+<secondaryStem><suffix>.ttf"` in the working directory
pub fn default_output_path(primary: &Path, secondary: &Path, mode: OperationMode) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    PathBuf::from(format!(
        "{}+{}{}.ttf",
        stem(primary),
        stem(secondary),
        mode.output_suffix()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_for_merge() {
        let out = default_output_path(
            Path::new("A.ttf"),
            Path::new("B.ttf"),
            OperationMode::FullMerge,
        );
        assert_eq!(out, PathBuf::from("A+B.ttf"));
    }

    #[test]
    fn test_default_output_for_range_copy() {
        let out = default_output_path(
            Path::new("fonts/Inter.ttf"),
            Path::new("/opt/cafe/CafeStd.ttf"),
            OperationMode::RangeCopy,
        );
        assert_eq!(out, PathBuf::from("Inter+CafeStd(PUA).ttf"));
    }

    #[test]
    fn test_explicit_output_wins() {
        let config = ToolConfig::new(
            OperationMode::RangeCopy,
            "A.ttf",
            "B.ttf",
            Some(PathBuf::from("out/custom.ttf")),
        );
        assert_eq!(config.paths.output, PathBuf::from("out/custom.ttf"));
        assert_eq!(config.paths.primary, PathBuf::from("A.ttf"));
    }

    #[test]
    fn test_stem_keeps_inner_dots() {
        let out = default_output_path(
            Path::new("My.Font.v2.ttf"),
            Path::new("B.otf"),
            OperationMode::FullMerge,
        );
        assert_eq!(out, PathBuf::from("My.Font.v2+B.ttf"));
    }
}
