//! font_range_tool transplants glyphs between two TrueType fonts.
//!
//! Two operations are supported, each shipped as its own binary:
//!
//! - `copy_pua` replaces the Private Use Area block (U+E000..=U+E099) of a
//!   primary font with the glyphs of a secondary font.
//! - `merge_fonts` fills every codepoint the primary font lacks with the
//!   corresponding glyph of the secondary font.
//!
//! Both run the same linear pipeline:
//!
//! ```text
//! +--------+    +-----------------+    +--------------+    +-------------+    +--------+
//! |  LOAD  | -> | CLEAR PUA block | -> | HARMONIZE em | -> | TRANSPLANT  | -> | EXPORT |
//! | 2 ttfs |    |  (best effort)  |    | primary.em = |    | range/merge |    |  .ttf  |
//! +--------+    +-----------------+    | secondary.em |    +-------------+    +--------+
//!                                      +--------------+
//! ```
//!
//! The library can also be driven directly:
//! ```no_run
//! use font_range_tool::config::ToolConfig;
//! use font_range_tool::engine::TrueTypeFont;
//! use font_range_tool::range::OperationMode;
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     let config = ToolConfig::new(OperationMode::FullMerge, "A.ttf", "B.ttf", None);
//!     let report = font_range_tool::tool::run::<TrueTypeFont>(&config)?;
//!     println!("merged {} glyphs into {}", report.transplanted, report.output.display());
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod range;
pub mod tool;

use range::CodepointRange;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while transplanting glyphs between fonts.
#[derive(Debug)]
pub enum FontToolError {
    /// Wrong command-line arguments
    Usage { message: String },
    /// The font maps no codepoint inside the requested range
    RangeNotPresent { range: CodepointRange },
    /// A font file could not be read or the output could not be written
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Any other failure reported by the font engine, e.g. a malformed font
    Engine { message: String },
}

impl Error for FontToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FontToolError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for FontToolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FontToolError::Usage { message } => {
                write!(f, "Usage Error: {}", message)?;
                write!(f, "\nSuggestion: pass two input fonts and an optional output path")
            }
            FontToolError::RangeNotPresent { range } => {
                write!(f, "Range Error: no glyphs mapped in {}", range)
            }
            FontToolError::Io { path, source } => {
                write!(f, "File Error: {}", source)?;
                write!(f, "\nPath: {}", path.display())?;
                write!(
                    f,
                    "\nSuggestion: check that the file exists and the directory is writable"
                )
            }
            FontToolError::Engine { message } => {
                write!(f, "Font Error: {}", message)?;
                write!(
                    f,
                    "\nSuggestion: make sure both inputs are TrueType (glyf) fonts"
                )
            }
        }
    }
}

impl FontToolError {
    /// Creates an engine error from any message
    pub fn engine(message: impl Into<String>) -> Self {
        FontToolError::Engine {
            message: message.into(),
        }
    }

    /// Wraps an I/O error together with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FontToolError::Io {
            path: path.into(),
            source,
        }
    }

    /// Cursor reads past the end of a table mean the font is malformed
    pub fn truncated(table: &str, source: std::io::Error) -> Self {
        FontToolError::engine(format!("truncated '{}' table: {}", table, source))
    }

    /// Whether the pipeline may log this error and carry on
    pub fn is_range_not_present(&self) -> bool {
        matches!(self, FontToolError::RangeNotPresent { .. })
    }
}

impl From<read_fonts::ReadError> for FontToolError {
    fn from(e: read_fonts::ReadError) -> Self {
        FontToolError::engine(format!("failed to parse font: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, FontToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_not_present_is_tolerated() {
        let err = FontToolError::RangeNotPresent {
            range: range::PUA_RANGE,
        };
        assert!(err.is_range_not_present());
        assert!(!FontToolError::engine("boom").is_range_not_present());
    }

    #[test]
    fn test_io_error_display_mentions_path() {
        let err = FontToolError::io(
            "missing/font.ttf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let text = err.to_string();
        assert!(text.contains("missing/font.ttf"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_range_error_display() {
        let err = FontToolError::RangeNotPresent {
            range: range::PUA_RANGE,
        };
        assert_eq!(err.to_string(), "Range Error: no glyphs mapped in U+E000..=U+E099");
    }
}
