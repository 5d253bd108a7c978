/// Font engine module
///
/// This module contains the glyph-level font editing used by the tools:
/// - `FontResource`: the operations the pipeline needs from a font
/// - `font`: the TrueType implementation of those operations
/// - `glyf`: glyph record decoding and encoding
/// - `cmap`: character map construction
/// - `metrics`: header table templates, patching and rescaling
/// - `sfnt`: font file assembly
pub mod cmap;
pub mod font;
pub mod glyf;
pub mod metrics;
pub mod sfnt;

pub use font::{Clipboard, Glyph, TrueTypeFont};
pub use glyf::{Bbox, Component, Contour, Outline, Point, Transform};

use crate::range::CodepointRange;
use crate::Result;
use std::path::Path;

/// Codepoints of a font picked out of a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    range: CodepointRange,
    codepoints: Vec<u32>,
}

impl Selection {
    pub fn new(range: CodepointRange, mut codepoints: Vec<u32>) -> Self {
        codepoints.sort_unstable();
        codepoints.dedup();
        Selection { range, codepoints }
    }

    pub fn range(&self) -> CodepointRange {
        self.range
    }

    /// Selected codepoints in ascending order
    pub fn codepoints(&self) -> &[u32] {
        &self.codepoints
    }

    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }
}

/// A font the glyph transplant pipeline can operate on
///
/// A selection or clipboard taken from one font stays valid after that font
/// is modified, and can be applied to any other font of the same type.
pub trait FontResource: Sized {
    /// Glyphs copied out of a font, independent of their source
    type Clipboard;

    /// Load a font file
    fn open(path: &Path) -> Result<Self>;

    /// Family name, for log output
    fn name(&self) -> String;

    fn glyph_count(&self) -> usize;

    fn units_per_em(&self) -> u16;

    /// Rescale the whole font to a new em size
    fn set_units_per_em(&mut self, units_per_em: u16) -> Result<()>;

    /// Select every mapped codepoint inside `range`
    ///
    /// Fails with `RangeNotPresent` when nothing in the range is mapped.
    fn select(&self, range: CodepointRange) -> Result<Selection>;

    /// Remove the selected glyphs, returning how many codepoints were unmapped
    fn clear(&mut self, selection: &Selection) -> usize;

    /// Copy the selected glyphs together with the glyphs they are built from
    fn copy(&self, selection: &Selection) -> Result<Self::Clipboard>;

    /// Insert copied glyphs, replacing whatever those codepoints mapped to
    fn paste(&mut self, clipboard: &Self::Clipboard) -> Result<usize>;

    /// Copy in every glyph of `donor` whose codepoint is missing here
    fn merge_from(&mut self, donor: &Self) -> Result<usize>;

    /// Write the font to `path`
    fn generate(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_sorted_and_unique() {
        let selection = Selection::new(
            CodepointRange::new(0xE000, 0xE099),
            vec![0xE002, 0xE000, 0xE002],
        );
        assert_eq!(selection.codepoints(), &[0xE000, 0xE002]);
        assert_eq!(selection.len(), 2);
        assert!(!selection.is_empty());
    }
}
