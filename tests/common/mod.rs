/// Synthetic fonts shared by the binary integration tests
use font_range_tool::engine::{Glyph, Outline, Point, TrueTypeFont};
use std::path::{Path, PathBuf};

/// A square outline of side `size` at the origin
pub fn square(size: i16) -> Outline {
    Outline::simple(vec![vec![
        Point::on(0, 0),
        Point::on(0, size),
        Point::on(size, size),
        Point::on(size, 0),
    ]])
}

/// Write a font mapping each codepoint to a square of the given size
pub fn write_font(dir: &Path, file: &str, units_per_em: u16, glyphs: &[(u32, i16)]) -> PathBuf {
    let mut font = TrueTypeFont::new(file, units_per_em).unwrap();
    for &(codepoint, size) in glyphs {
        font.insert_glyph(codepoint, Glyph::new(square(size), size as u16 + 50))
            .unwrap();
    }
    let path = dir.join(file);
    std::fs::write(&path, font.to_bytes().unwrap()).unwrap();
    path
}

pub fn read_font(path: &Path) -> TrueTypeFont {
    TrueTypeFont::from_bytes(&std::fs::read(path).unwrap()).unwrap()
}
