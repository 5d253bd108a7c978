/// Codepoint ranges and operation modes
///
/// The Private Use Area block handled by both binaries is a fixed constant;
/// only the operation mode differs between them.
use std::fmt;

/// A closed interval of Unicode codepoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodepointRange {
    pub start: u32,
    pub end: u32,
}

/// The Private Use Area subset used for custom icon glyphs
pub const PUA_RANGE: CodepointRange = CodepointRange::new(0xE000, 0xE099);

impl CodepointRange {
    pub const fn new(start: u32, end: u32) -> Self {
        CodepointRange { start, end }
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        (self.start..=self.end).contains(&codepoint)
    }

    /// Number of codepoints in the interval
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for CodepointRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "U+{:04X}..=U+{:04X}", self.start, self.end)
    }
}

/// Which glyphs are transplanted from the secondary font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Copy only the glyphs of [`PUA_RANGE`]
    RangeCopy,
    /// Copy every glyph the primary font is missing
    FullMerge,
}

impl OperationMode {
    /// Suffix appended to the derived output file stem
    pub fn output_suffix(&self) -> &'static str {
        match self {
            OperationMode::RangeCopy => "(PUA)",
            OperationMode::FullMerge => "",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OperationMode::RangeCopy => "range copy",
            OperationMode::FullMerge => "full merge",
        }
    }
}
