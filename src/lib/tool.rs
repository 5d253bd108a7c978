/// Glyph transplant pipeline
///
/// One run loads both fonts, clears the Private Use Area block of the
/// primary font, brings the primary font to the secondary font's em size,
/// transplants glyphs according to the operation mode and writes the result.
use crate::config::ToolConfig;
use crate::engine::FontResource;
use crate::range::{CodepointRange, OperationMode, PUA_RANGE};
use crate::Result;
use log::{debug, info, warn};
use std::path::PathBuf;

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Codepoints unmapped from the primary font before transplanting
    pub cleared: usize,
    /// (old, new) units per em of the primary font, when it was rescaled
    pub em_change: Option<(u16, u16)>,
    /// Codepoints copied in from the secondary font
    pub transplanted: usize,
    pub output: PathBuf,
}

/// Execute one run of the pipeline
pub fn run<F: FontResource>(config: &ToolConfig) -> Result<RunReport> {
    let paths = &config.paths;
    info!(
        "{}: {} <- {}",
        config.mode.name(),
        paths.primary.display(),
        paths.secondary.display()
    );

    let mut primary = F::open(&paths.primary)?;
    info!(
        "Primary font '{}' loaded with {} glyphs",
        primary.name(),
        primary.glyph_count()
    );
    let secondary = F::open(&paths.secondary)?;
    info!(
        "Secondary font '{}' loaded with {} glyphs",
        secondary.name(),
        secondary.glyph_count()
    );

    let cleared = clear_range(&mut primary, PUA_RANGE)?;
    let em_change = harmonize_em(&mut primary, &secondary)?;

    let transplanted = match config.mode {
        OperationMode::RangeCopy => copy_range(&mut primary, &secondary, PUA_RANGE)?,
        OperationMode::FullMerge => {
            let merged = primary.merge_from(&secondary)?;
            info!("Merged {} glyphs from '{}'", merged, secondary.name());
            merged
        }
    };

    primary.generate(&paths.output)?;
    info!("Font written to {}", paths.output.display());

    Ok(RunReport {
        cleared,
        em_change,
        transplanted,
        output: paths.output.clone(),
    })
}

/// Remove the glyphs of `range`; a font without that block is left as is
pub fn clear_range<F: FontResource>(font: &mut F, range: CodepointRange) -> Result<usize> {
    match font.select(range) {
        Ok(selection) => {
            let cleared = font.clear(&selection);
            info!("Cleared {} glyphs in {}", cleared, range);
            Ok(cleared)
        }
        Err(e) if e.is_range_not_present() => {
            warn!("Nothing to clear in '{}': {}", font.name(), e);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Give `primary` the em size of `secondary`
pub fn harmonize_em<F: FontResource>(primary: &mut F, secondary: &F) -> Result<Option<(u16, u16)>> {
    let from = primary.units_per_em();
    let to = secondary.units_per_em();
    if from == to {
        debug!("Both fonts use {} units per em", to);
        return Ok(None);
    }
    info!("Rescaling '{}' from {} to {} units per em", primary.name(), from, to);
    primary.set_units_per_em(to)?;
    Ok(Some((from, to)))
}

/// Copy the glyphs of `range` from `secondary` into `primary`
///
/// A secondary font without glyphs in `range` copies nothing; the primary
/// keeps its cleared block.
pub fn copy_range<F: FontResource>(
    primary: &mut F,
    secondary: &F,
    range: CodepointRange,
) -> Result<usize> {
    let selection = match secondary.select(range) {
        Ok(selection) => selection,
        Err(e) if e.is_range_not_present() => {
            warn!("Nothing to copy from '{}': {}", secondary.name(), e);
            return Ok(0);
        }
        Err(e) => return Err(e),
    };
    debug!(
        "Selected {} of {} codepoints in {}",
        selection.len(),
        range.len(),
        range
    );
    let clipboard = secondary.copy(&selection)?;
    let pasted = primary.paste(&clipboard)?;
    info!("Copied {} glyphs in {} from '{}'", pasted, range, secondary.name());
    Ok(pasted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Selection;
    use crate::FontToolError;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Text-backed font: an `em` line followed by `<hex codepoint> <glyph>` lines
    #[derive(Debug, Clone, PartialEq)]
    struct FakeFont {
        em: u16,
        glyphs: BTreeMap<u32, String>,
    }

    impl FontResource for FakeFont {
        type Clipboard = Vec<(u32, String)>;

        fn open(path: &Path) -> Result<Self> {
            let text = fs::read_to_string(path).map_err(|e| FontToolError::io(path, e))?;
            let mut lines = text.lines();
            let em = lines
                .next()
                .and_then(|l| l.strip_prefix("em "))
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| FontToolError::engine("missing em line"))?;
            let mut glyphs = BTreeMap::new();
            for line in lines {
                let (cp, glyph) = line
                    .split_once(' ')
                    .ok_or_else(|| FontToolError::engine("bad glyph line"))?;
                let cp = u32::from_str_radix(cp, 16)
                    .map_err(|e| FontToolError::engine(e.to_string()))?;
                glyphs.insert(cp, glyph.to_string());
            }
            Ok(FakeFont { em, glyphs })
        }

        fn name(&self) -> String {
            "fake".to_string()
        }

        fn glyph_count(&self) -> usize {
            self.glyphs.len()
        }

        fn units_per_em(&self) -> u16 {
            self.em
        }

        fn set_units_per_em(&mut self, units_per_em: u16) -> Result<()> {
            for glyph in self.glyphs.values_mut() {
                *glyph = format!("{}@{}", glyph, units_per_em);
            }
            self.em = units_per_em;
            Ok(())
        }

        fn select(&self, range: CodepointRange) -> Result<Selection> {
            let codepoints: Vec<u32> = self
                .glyphs
                .keys()
                .copied()
                .filter(|&cp| range.contains(cp))
                .collect();
            if codepoints.is_empty() {
                return Err(FontToolError::RangeNotPresent { range });
            }
            Ok(Selection::new(range, codepoints))
        }

        fn clear(&mut self, selection: &Selection) -> usize {
            selection
                .codepoints()
                .iter()
                .filter(|cp| self.glyphs.remove(*cp).is_some())
                .count()
        }

        fn copy(&self, selection: &Selection) -> Result<Self::Clipboard> {
            Ok(selection
                .codepoints()
                .iter()
                .filter_map(|cp| self.glyphs.get(cp).map(|g| (*cp, g.clone())))
                .collect())
        }

        fn paste(&mut self, clipboard: &Self::Clipboard) -> Result<usize> {
            self.glyphs.extend(clipboard.iter().cloned());
            Ok(clipboard.len())
        }

        fn merge_from(&mut self, donor: &Self) -> Result<usize> {
            let mut merged = 0;
            for (cp, glyph) in &donor.glyphs {
                if !self.glyphs.contains_key(cp) {
                    self.glyphs.insert(*cp, glyph.clone());
                    merged += 1;
                }
            }
            Ok(merged)
        }

        fn generate(&self, path: &Path) -> Result<()> {
            let mut text = format!("em {}\n", self.em);
            for (cp, glyph) in &self.glyphs {
                text.push_str(&format!("{:X} {}\n", cp, glyph));
            }
            fs::write(path, text).map_err(|e| FontToolError::io(path, e))
        }
    }

    fn write_font(dir: &Path, name: &str, em: u16, glyphs: &[(u32, &str)]) -> PathBuf {
        let path = dir.join(name);
        let font = FakeFont {
            em,
            glyphs: glyphs.iter().map(|(cp, g)| (*cp, g.to_string())).collect(),
        };
        font.generate(&path).unwrap();
        path
    }

    fn config(mode: OperationMode, dir: &Path, primary: &Path, secondary: &Path) -> ToolConfig {
        ToolConfig::new(mode, primary, secondary, Some(dir.join("out.txt")))
    }

    #[test]
    fn test_merge_rescales_and_fills_missing() {
        let dir = TempDir::new().unwrap();
        let a = write_font(dir.path(), "A", 1000, &[(0x41, "a")]);
        let b = write_font(dir.path(), "B", 2048, &[(0x41, "b"), (0xE050, "pua")]);

        let report = run::<FakeFont>(&config(OperationMode::FullMerge, dir.path(), &a, &b)).unwrap();
        assert_eq!(report.em_change, Some((1000, 2048)));
        assert_eq!(report.transplanted, 1);
        assert_eq!(report.cleared, 0);

        let out = FakeFont::open(&report.output).unwrap();
        assert_eq!(out.em, 2048);
        assert_eq!(out.glyphs[&0x41], "a@2048");
        assert_eq!(out.glyphs[&0xE050], "pua");
    }

    #[test]
    fn test_range_copy_replaces_block_only() {
        let dir = TempDir::new().unwrap();
        let a = write_font(
            dir.path(),
            "A",
            1000,
            &[(0x41, "a"), (0xE000, "old0"), (0xE001, "old1")],
        );
        let b = write_font(
            dir.path(),
            "B",
            1000,
            &[(0x42, "b"), (0xE000, "new0"), (0xE099, "new99")],
        );

        let report = run::<FakeFont>(&config(OperationMode::RangeCopy, dir.path(), &a, &b)).unwrap();
        assert_eq!(report.cleared, 2);
        assert_eq!(report.transplanted, 2);
        assert_eq!(report.em_change, None);

        let out = FakeFont::open(&report.output).unwrap();
        let expected: BTreeMap<u32, String> = [(0x41, "a"), (0xE000, "new0"), (0xE099, "new99")]
            .iter()
            .map(|(cp, g)| (*cp, g.to_string()))
            .collect();
        assert_eq!(out.glyphs, expected);
    }

    #[test]
    fn test_primary_without_block_still_completes() {
        let dir = TempDir::new().unwrap();
        let a = write_font(dir.path(), "A", 1000, &[(0x41, "a")]);
        let b = write_font(dir.path(), "B", 1000, &[(0x42, "b")]);

        let report = run::<FakeFont>(&config(OperationMode::FullMerge, dir.path(), &a, &b)).unwrap();
        assert_eq!(report.cleared, 0);
        assert!(report.output.exists());
    }

    #[test]
    fn test_range_copy_from_secondary_without_block_leaves_it_empty() {
        let dir = TempDir::new().unwrap();
        let a = write_font(dir.path(), "A", 1000, &[(0x41, "a"), (0xE000, "old")]);
        let b = write_font(dir.path(), "B", 1000, &[(0x42, "b")]);

        let report = run::<FakeFont>(&config(OperationMode::RangeCopy, dir.path(), &a, &b)).unwrap();
        assert_eq!(report.cleared, 1);
        assert_eq!(report.transplanted, 0);

        let out = FakeFont::open(&report.output).unwrap();
        let expected: BTreeMap<u32, String> = [(0x41, "a".to_string())].into_iter().collect();
        assert_eq!(out.glyphs, expected);
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let b = write_font(dir.path(), "B", 1000, &[(0x42, "b")]);
        let missing = dir.path().join("missing");

        let err = run::<FakeFont>(&config(OperationMode::FullMerge, dir.path(), &missing, &b))
            .unwrap_err();
        assert!(matches!(err, FontToolError::Io { ref path, .. } if *path == missing));
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = TempDir::new().unwrap();
        let a = write_font(dir.path(), "A", 1000, &[(0x41, "a")]);
        let b = write_font(dir.path(), "B", 1000, &[(0x42, "b")]);
        let output = dir.path().join("no-such-dir").join("out.txt");

        let config = ToolConfig::new(OperationMode::FullMerge, &a, &b, Some(output));
        let err = run::<FakeFont>(&config).unwrap_err();
        assert!(matches!(err, FontToolError::Io { .. }));
    }
}
