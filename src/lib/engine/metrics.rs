/// Font-wide metric tables
///
/// Patches the fixed-layout header tables (`head`, `hhea`, `OS/2`, `post`,
/// `cvt `) in place and builds `maxp`. All offsets are from the OpenType
/// table layouts.
use super::glyf::{scale_i16, Bbox};
use crate::{FontToolError, Result};
use byteorder::{BigEndian, ByteOrder};
use std::collections::BTreeMap;

pub type TableTag = [u8; 4];

pub const HEAD: &TableTag = b"head";
pub const HHEA: &TableTag = b"hhea";
pub const MAXP: &TableTag = b"maxp";
pub const OS2: &TableTag = b"OS/2";
pub const POST: &TableTag = b"post";
pub const CVT: &TableTag = b"cvt ";

const HEAD_LEN: usize = 54;
const HHEA_LEN: usize = 36;
const POST_HEADER_LEN: usize = 32;

mod head {
    pub const CHECKSUM_ADJUSTMENT: usize = 8;
    pub const UNITS_PER_EM: usize = 18;
    pub const X_MIN: usize = 36;
    pub const Y_MIN: usize = 38;
    pub const X_MAX: usize = 40;
    pub const Y_MAX: usize = 42;
    pub const INDEX_TO_LOC_FORMAT: usize = 50;
}

mod hhea {
    pub const ASCENDER: usize = 4;
    pub const DESCENDER: usize = 6;
    pub const LINE_GAP: usize = 8;
    pub const ADVANCE_WIDTH_MAX: usize = 10;
    pub const MIN_LEFT_SIDE_BEARING: usize = 12;
    pub const MIN_RIGHT_SIDE_BEARING: usize = 14;
    pub const X_MAX_EXTENT: usize = 16;
    pub const CARET_OFFSET: usize = 22;
    pub const NUMBER_OF_H_METRICS: usize = 34;
}

mod os2 {
    pub const VERSION: usize = 0;
    pub const X_AVG_CHAR_WIDTH: usize = 2;
    /// ySubscriptXSize through yStrikeoutPosition, ten consecutive FWORDs
    pub const SCRIPT_AND_STRIKEOUT: std::ops::Range<usize> = 10..30;
    pub const FIRST_CHAR_INDEX: usize = 64;
    pub const LAST_CHAR_INDEX: usize = 66;
    /// sTypoAscender, sTypoDescender, sTypoLineGap
    pub const TYPO_METRICS: std::ops::Range<usize> = 68..74;
    pub const WIN_ASCENT: usize = 74;
    pub const WIN_DESCENT: usize = 76;
    pub const X_HEIGHT: usize = 86;
    pub const CAP_HEIGHT: usize = 88;
}

mod post {
    pub const UNDERLINE_POSITION: usize = 8;
    pub const UNDERLINE_THICKNESS: usize = 10;
}

/// Valid `unitsPerEm` values
pub fn check_units_per_em(units_per_em: u16) -> Result<()> {
    if (16..=16384).contains(&units_per_em) {
        Ok(())
    } else {
        Err(FontToolError::engine(format!(
            "units per em {} outside 16..=16384",
            units_per_em
        )))
    }
}

/// Minimal `head` for a fresh font
pub fn head_template(units_per_em: u16) -> Vec<u8> {
    let mut data = vec![0u8; HEAD_LEN];
    BigEndian::write_u32(&mut data[0..], 0x0001_0000); // version
    BigEndian::write_u32(&mut data[4..], 0x0001_0000); // fontRevision
    BigEndian::write_u32(&mut data[12..], 0x5F0F_3CF5); // magicNumber
    // baseline at y=0, lsb at x=0, integer ppem scaling
    BigEndian::write_u16(&mut data[16..], 0x000B);
    BigEndian::write_u16(&mut data[head::UNITS_PER_EM..], units_per_em);
    BigEndian::write_u16(&mut data[46..], 8); // lowestRecPPEM
    BigEndian::write_i16(&mut data[48..], 2); // fontDirectionHint
    data
}

/// Minimal `hhea` for a fresh font
pub fn hhea_template(units_per_em: u16) -> Vec<u8> {
    let mut data = vec![0u8; HHEA_LEN];
    let em = units_per_em as f64;
    BigEndian::write_u32(&mut data[0..], 0x0001_0000);
    BigEndian::write_i16(&mut data[hhea::ASCENDER..], (em * 0.8).round() as i16);
    BigEndian::write_i16(&mut data[hhea::DESCENDER..], -(em * 0.2).round() as i16);
    BigEndian::write_i16(&mut data[18..], 1); // caretSlopeRise
    data
}

/// Read `numberOfHMetrics` from raw `hhea`
pub fn number_of_h_metrics(hhea: &[u8]) -> Result<u16> {
    read_u16_at(hhea, hhea::NUMBER_OF_H_METRICS, "hhea")
}

fn read_u16_at(data: &[u8], offset: usize, table: &str) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(BigEndian::read_u16)
        .ok_or_else(|| FontToolError::engine(format!("'{}' table is too short", table)))
}

fn scale_at(data: &mut [u8], offset: usize, factor: f64) {
    if let Some(field) = data.get_mut(offset..offset + 2) {
        let value = BigEndian::read_i16(field);
        BigEndian::write_i16(field, scale_i16(value, factor));
    }
}

fn scale_unsigned_at(data: &mut [u8], offset: usize, factor: f64) {
    if let Some(field) = data.get_mut(offset..offset + 2) {
        let value = BigEndian::read_u16(field) as f64 * factor;
        BigEndian::write_u16(field, value.round().clamp(0.0, u16::MAX as f64) as u16);
    }
}

/// Scale every font-unit field of the header tables that are kept
pub fn scale_tables(tables: &mut BTreeMap<TableTag, Vec<u8>>, factor: f64) {
    if let Some(data) = tables.get_mut(HHEA) {
        for offset in [
            hhea::ASCENDER,
            hhea::DESCENDER,
            hhea::LINE_GAP,
            hhea::CARET_OFFSET,
        ] {
            scale_at(data, offset, factor);
        }
    }

    if let Some(data) = tables.get_mut(OS2) {
        scale_at(data, os2::X_AVG_CHAR_WIDTH, factor);
        for offset in os2::SCRIPT_AND_STRIKEOUT.step_by(2) {
            scale_at(data, offset, factor);
        }
        for offset in os2::TYPO_METRICS.step_by(2) {
            scale_at(data, offset, factor);
        }
        scale_unsigned_at(data, os2::WIN_ASCENT, factor);
        scale_unsigned_at(data, os2::WIN_DESCENT, factor);

        let version = data
            .get(os2::VERSION..os2::VERSION + 2)
            .map_or(0, BigEndian::read_u16);
        if version >= 2 {
            scale_at(data, os2::X_HEIGHT, factor);
            scale_at(data, os2::CAP_HEIGHT, factor);
        }
    }

    if let Some(data) = tables.get_mut(POST) {
        scale_at(data, post::UNDERLINE_POSITION, factor);
        scale_at(data, post::UNDERLINE_THICKNESS, factor);
    }

    if let Some(data) = tables.get_mut(CVT) {
        for offset in (0..data.len() / 2).map(|i| i * 2) {
            scale_at(data, offset, factor);
        }
    }
}

/// Per-glyph horizontal extents used to refresh `hhea`
#[derive(Debug, Default, Clone, Copy)]
pub struct HorizontalExtents {
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    seen_outline: bool,
}

impl HorizontalExtents {
    /// Fold one glyph's metrics into the running extents
    pub fn add(&mut self, advance: u16, lsb: i16, bbox: Option<Bbox>) {
        self.advance_width_max = self.advance_width_max.max(advance);
        let Some(bbox) = bbox else {
            return;
        };
        let rsb = (advance as i32 - lsb as i32 - bbox.width()).clamp(i16::MIN as i32, 0x7FFF);
        let extent = (lsb as i32 + bbox.width()).clamp(i16::MIN as i32, 0x7FFF);
        if !self.seen_outline {
            self.seen_outline = true;
            self.min_left_side_bearing = lsb;
            self.min_right_side_bearing = rsb as i16;
            self.x_max_extent = extent as i16;
        } else {
            self.min_left_side_bearing = self.min_left_side_bearing.min(lsb);
            self.min_right_side_bearing = self.min_right_side_bearing.min(rsb as i16);
            self.x_max_extent = self.x_max_extent.max(extent as i16);
        }
    }
}

/// Refresh `head` for the glyph set being written
pub fn patch_head(
    template: &[u8],
    units_per_em: u16,
    bbox: Bbox,
    loca_format: i16,
) -> Result<Vec<u8>> {
    if template.len() < HEAD_LEN {
        return Err(FontToolError::engine("'head' table is too short"));
    }
    let mut data = template.to_vec();
    BigEndian::write_u32(&mut data[head::CHECKSUM_ADJUSTMENT..], 0);
    BigEndian::write_u16(&mut data[head::UNITS_PER_EM..], units_per_em);
    BigEndian::write_i16(&mut data[head::X_MIN..], bbox.x_min);
    BigEndian::write_i16(&mut data[head::Y_MIN..], bbox.y_min);
    BigEndian::write_i16(&mut data[head::X_MAX..], bbox.x_max);
    BigEndian::write_i16(&mut data[head::Y_MAX..], bbox.y_max);
    BigEndian::write_i16(&mut data[head::INDEX_TO_LOC_FORMAT..], loca_format);
    Ok(data)
}

/// Refresh `hhea` extents and the long-metric count
pub fn patch_hhea(
    template: &[u8],
    extents: HorizontalExtents,
    number_of_h_metrics: u16,
) -> Result<Vec<u8>> {
    if template.len() < HHEA_LEN {
        return Err(FontToolError::engine("'hhea' table is too short"));
    }
    let mut data = template.to_vec();
    BigEndian::write_u16(&mut data[hhea::ADVANCE_WIDTH_MAX..], extents.advance_width_max);
    BigEndian::write_i16(
        &mut data[hhea::MIN_LEFT_SIDE_BEARING..],
        extents.min_left_side_bearing,
    );
    BigEndian::write_i16(
        &mut data[hhea::MIN_RIGHT_SIDE_BEARING..],
        extents.min_right_side_bearing,
    );
    BigEndian::write_i16(&mut data[hhea::X_MAX_EXTENT..], extents.x_max_extent);
    BigEndian::write_u16(&mut data[hhea::NUMBER_OF_H_METRICS..], number_of_h_metrics);
    Ok(data)
}

/// Refresh the first/last character indices of `OS/2`
pub fn patch_os2(template: &[u8], first_char: u32, last_char: u32) -> Vec<u8> {
    let mut data = template.to_vec();
    if data.len() >= os2::LAST_CHAR_INDEX + 2 {
        BigEndian::write_u16(
            &mut data[os2::FIRST_CHAR_INDEX..],
            first_char.min(0xFFFF) as u16,
        );
        BigEndian::write_u16(
            &mut data[os2::LAST_CHAR_INDEX..],
            last_char.min(0xFFFF) as u16,
        );
    }
    data
}

/// `post` format 3 keeping the header of the existing table
pub fn build_post(template: Option<&[u8]>) -> Vec<u8> {
    let mut data = vec![0u8; POST_HEADER_LEN];
    if let Some(template) = template {
        let len = template.len().min(POST_HEADER_LEN);
        data[..len].copy_from_slice(&template[..len]);
    }
    BigEndian::write_u32(&mut data[0..], 0x0003_0000);
    data
}

/// Outline statistics for `maxp` version 1.0
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaxpStats {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

/// Build `maxp` 1.0, keeping the hinting limits of the existing table
pub fn build_maxp(template: Option<&[u8]>, num_glyphs: u16, stats: MaxpStats) -> Vec<u8> {
    let mut data = vec![0u8; 32];
    BigEndian::write_u32(&mut data[0..], 0x0001_0000);
    BigEndian::write_u16(&mut data[4..], num_glyphs);
    BigEndian::write_u16(&mut data[6..], stats.max_points);
    BigEndian::write_u16(&mut data[8..], stats.max_contours);
    BigEndian::write_u16(&mut data[10..], stats.max_composite_points);
    BigEndian::write_u16(&mut data[12..], stats.max_composite_contours);

    // maxZones .. maxStackElements come from the hinting program
    match template.filter(|t| t.len() >= 32) {
        Some(template) => data[14..26].copy_from_slice(&template[14..26]),
        None => BigEndian::write_u16(&mut data[14..], 1), // maxZones
    }
    let existing_instructions = template
        .filter(|t| t.len() >= 32)
        .map_or(0, |t| BigEndian::read_u16(&t[26..]));
    BigEndian::write_u16(
        &mut data[26..],
        stats.max_size_of_instructions.max(existing_instructions),
    );
    BigEndian::write_u16(&mut data[28..], stats.max_component_elements);
    BigEndian::write_u16(&mut data[30..], stats.max_component_depth);
    data
}
