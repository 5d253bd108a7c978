//! Character map construction.
//!
//! The rebuilt `cmap` carries a format 4 subtable for the Basic Multilingual
//! Plane and, when the font maps supplementary-plane codepoints, a format 12
//! subtable covering everything. Both are registered under the Unicode and
//! Windows platforms.

use log::warn;
use std::collections::BTreeMap;

/// Largest byte length a format 4 subtable can declare
const FORMAT4_MAX_LEN: usize = u16::MAX as usize;

enum Segment {
    /// glyph = codepoint + delta (mod 65536)
    Delta { start: u16, end: u16, delta: i16 },
    /// glyphs listed explicitly in glyphIdArray
    Array { start: u16, end: u16, gids: Vec<u16> },
}

impl Segment {
    fn start(&self) -> u16 {
        match self {
            Segment::Delta { start, .. } | Segment::Array { start, .. } => *start,
        }
    }

    fn end(&self) -> u16 {
        match self {
            Segment::Delta { end, .. } | Segment::Array { end, .. } => *end,
        }
    }
}

/// Build a complete `cmap` table from codepoint → glyph id mappings
pub fn build_cmap(mappings: &BTreeMap<u32, u16>) -> Vec<u8> {
    let has_supplementary = mappings.keys().any(|&cp| cp > 0xFFFF);
    let format4 = build_format4(mappings);

    // (platform, encoding, subtable index)
    let mut records: Vec<(u16, u16, usize)> = Vec::new();
    let mut subtables: Vec<Vec<u8>> = Vec::new();

    match format4 {
        Some(subtable) => {
            subtables.push(subtable);
            records.push((0, 3, 0));
            records.push((3, 1, 0));
            if has_supplementary {
                subtables.push(build_format12(mappings));
                records.push((0, 4, 1));
                records.push((3, 10, 1));
            }
        }
        None => {
            warn!("BMP mappings overflow a format 4 subtable, writing format 12 only");
            subtables.push(build_format12(mappings));
            records.push((0, 4, 0));
            records.push((3, 10, 0));
        }
    }
    records.sort();

    let header_len = 4 + records.len() * 8;
    let mut subtable_offsets = Vec::with_capacity(subtables.len());
    let mut offset = header_len;
    for subtable in &subtables {
        subtable_offsets.push(offset as u32);
        offset += subtable.len();
    }

    let mut out = Vec::with_capacity(offset);
    out.extend_from_slice(&0u16.to_be_bytes()); // version
    out.extend_from_slice(&(records.len() as u16).to_be_bytes());
    for (platform, encoding, index) in &records {
        out.extend_from_slice(&platform.to_be_bytes());
        out.extend_from_slice(&encoding.to_be_bytes());
        out.extend_from_slice(&subtable_offsets[*index].to_be_bytes());
    }
    for subtable in subtables {
        out.extend_from_slice(&subtable);
    }
    out
}

/// Format 4 subtable for the BMP, `None` when it would exceed 64 KiB
fn build_format4(mappings: &BTreeMap<u32, u16>) -> Option<Vec<u8>> {
    let bmp: Vec<(u16, u16)> = mappings
        .iter()
        .filter(|(&cp, _)| cp < 0xFFFF)
        .map(|(&cp, &gid)| (cp as u16, gid))
        .collect();

    let mut segments = Vec::new();
    let mut run_start = 0;
    for i in 1..=bmp.len() {
        let run_ends = i == bmp.len() || bmp[i].0 != bmp[i - 1].0 + 1;
        if run_ends {
            push_run_segments(&bmp[run_start..i], &mut segments);
            run_start = i;
        }
    }
    segments.push(Segment::Delta {
        start: 0xFFFF,
        end: 0xFFFF,
        delta: 1,
    });

    let seg_count = segments.len();
    let array_len: usize = segments
        .iter()
        .map(|s| match s {
            Segment::Array { gids, .. } => gids.len(),
            Segment::Delta { .. } => 0,
        })
        .sum();
    let length = 16 + seg_count * 8 + array_len * 2;
    if length > FORMAT4_MAX_LEN {
        return None;
    }

    let seg_count_x2 = (seg_count * 2) as u16;
    let mut entry_selector = 0u16;
    while (1usize << (entry_selector + 1)) <= seg_count {
        entry_selector += 1;
    }
    let search_range = (1u16 << entry_selector) * 2;
    let range_shift = seg_count_x2 - search_range;

    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(&4u16.to_be_bytes());
    out.extend_from_slice(&(length as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // language
    out.extend_from_slice(&seg_count_x2.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    for segment in &segments {
        out.extend_from_slice(&segment.end().to_be_bytes());
    }
    out.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
    for segment in &segments {
        out.extend_from_slice(&segment.start().to_be_bytes());
    }
    for segment in &segments {
        let delta = match segment {
            Segment::Delta { delta, .. } => *delta,
            Segment::Array { .. } => 0,
        };
        out.extend_from_slice(&delta.to_be_bytes());
    }

    let mut glyph_ids: Vec<u16> = Vec::with_capacity(array_len);
    for (i, segment) in segments.iter().enumerate() {
        let range_offset = match segment {
            Segment::Delta { .. } => 0,
            Segment::Array { gids, .. } => {
                // distance from this idRangeOffset entry to the segment's glyph ids
                let offset = ((seg_count - i) + glyph_ids.len()) * 2;
                glyph_ids.extend_from_slice(gids);
                offset as u16
            }
        };
        out.extend_from_slice(&range_offset.to_be_bytes());
    }
    for gid in glyph_ids {
        out.extend_from_slice(&gid.to_be_bytes());
    }

    Some(out)
}

/// Split a run of consecutive codepoints into the cheaper segment encoding
fn push_run_segments(run: &[(u16, u16)], segments: &mut Vec<Segment>) {
    let Some(&(first_cp, _)) = run.first() else {
        return;
    };
    let delta_of = |(cp, gid): (u16, u16)| gid.wrapping_sub(cp) as i16;

    let mut groups: Vec<(u16, u16, i16)> = Vec::new();
    for &entry in run {
        let delta = delta_of(entry);
        match groups.last_mut() {
            Some(last) if last.2 == delta => last.1 = entry.0,
            _ => groups.push((entry.0, entry.0, delta)),
        }
    }

    let delta_cost = groups.len() * 8;
    let array_cost = 8 + run.len() * 2;
    if delta_cost <= array_cost {
        segments.extend(
            groups
                .into_iter()
                .map(|(start, end, delta)| Segment::Delta { start, end, delta }),
        );
    } else {
        segments.push(Segment::Array {
            start: first_cp,
            end: first_cp + (run.len() as u16 - 1),
            gids: run.iter().map(|&(_, gid)| gid).collect(),
        });
    }
}

/// Format 12 subtable covering every mapping
fn build_format12(mappings: &BTreeMap<u32, u16>) -> Vec<u8> {
    let mut groups: Vec<(u32, u32, u32)> = Vec::new();
    for (&cp, &gid) in mappings {
        let gid = gid as u32;
        match groups.last_mut() {
            Some(last) if last.1 + 1 == cp && last.2 + (last.1 - last.0) + 1 == gid => {
                last.1 = cp
            }
            _ => groups.push((cp, cp, gid)),
        }
    }

    let length = 16 + groups.len() * 12;
    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(&12u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // reserved
    out.extend_from_slice(&(length as u32).to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // language
    out.extend_from_slice(&(groups.len() as u32).to_be_bytes());
    for (start, end, gid) in groups {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&end.to_be_bytes());
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}
