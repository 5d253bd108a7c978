/// TrueType font model
///
/// A `TrueTypeFont` owns decoded glyphs, its character map and the raw bytes
/// of every other table. Glyph ids are stable while editing: cleared glyphs
/// become empty placeholders and transplanted glyphs are appended, so
/// composite references never need to be rewritten inside one font.
use super::glyf::{decode_glyph, encode_glyph, scale_i16, Bbox, LocaOffsets, Outline};
use super::metrics::{
    self, HorizontalExtents, MaxpStats, TableTag, HEAD, HHEA, MAXP, OS2, POST,
};
use super::{cmap, sfnt, FontResource, Selection};
use crate::range::CodepointRange;
use crate::{FontToolError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, info, trace, warn};
use read_fonts::{FontRef, TableProvider};
use skrifa::string::StringId;
use skrifa::MetadataProvider;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::Path;

const GLYF: &TableTag = b"glyf";
const LOCA: &TableTag = b"loca";
const HMTX: &TableTag = b"hmtx";
const CMAP: &TableTag = b"cmap";
const CFF: &TableTag = b"CFF ";
const CFF2: &TableTag = b"CFF2";

/// Tables that would describe the old glyph set and are not rebuilt
const ALWAYS_DROPPED: [&TableTag; 14] = [
    b"DSIG", b"hdmx", b"LTSH", b"VDMX", b"vhea", b"vmtx", b"fvar", b"gvar", b"avar", b"cvar",
    b"HVAR", b"VVAR", b"MVAR", b"STAT",
];

/// Tables holding font-unit values that are not rescaled with the outlines
const UNSCALED_TABLES: [&TableTag; 4] = [b"GPOS", b"kern", b"BASE", b"MATH"];

/// Limit on composite nesting, also catches reference cycles
const MAX_COMPONENT_DEPTH: u16 = 64;

const MAX_GLYPHS: usize = u16::MAX as usize;

/// One glyph with its horizontal metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub outline: Outline,
    pub advance_width: u16,
    /// Recomputed from the outline when the font is written
    pub lsb: i16,
}

impl Glyph {
    pub fn new(outline: Outline, advance_width: u16) -> Self {
        Glyph {
            outline,
            advance_width,
            lsb: 0,
        }
    }

    /// A glyph without an outline, such as a space
    pub fn empty(advance_width: u16) -> Self {
        Glyph::new(Outline::Empty, advance_width)
    }

    fn scale(&mut self, factor: f64) {
        self.outline.scale(factor);
        self.advance_width = (self.advance_width as f64 * factor)
            .round()
            .clamp(0.0, u16::MAX as f64) as u16;
        self.lsb = scale_i16(self.lsb, factor);
    }
}

/// Glyphs copied out of a `TrueTypeFont`
///
/// Component references point into `glyphs`, so the clipboard carries
/// every glyph its composites are built from.
#[derive(Debug, Clone)]
pub struct Clipboard {
    units_per_em: u16,
    glyphs: Vec<Glyph>,
    entries: Vec<(u32, u16)>,
}

impl Clipboard {
    /// Number of codepoints on the clipboard
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of glyphs, including composite dependencies
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }
}

/// An editable TrueType font
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    name: String,
    units_per_em: u16,
    glyphs: Vec<Glyph>,
    cmap: BTreeMap<u32, u16>,
    /// Raw bytes of all tables not held in decoded form above
    tables: BTreeMap<TableTag, Vec<u8>>,
}

impl TrueTypeFont {
    /// A font holding only an empty `.notdef` glyph
    pub fn new(name: impl Into<String>, units_per_em: u16) -> Result<Self> {
        metrics::check_units_per_em(units_per_em)?;
        let mut tables = BTreeMap::new();
        tables.insert(*HEAD, metrics::head_template(units_per_em));
        tables.insert(*HHEA, metrics::hhea_template(units_per_em));
        Ok(TrueTypeFont {
            name: name.into(),
            units_per_em,
            glyphs: vec![Glyph::empty(units_per_em / 2)],
            cmap: BTreeMap::new(),
            tables,
        })
    }

    /// Parse a font from memory
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let font = FontRef::new(data)?;
        let head = font.head()?;
        let units_per_em = head.units_per_em();
        let loca_format = head.index_to_loc_format();
        let num_glyphs = font.maxp()?.num_glyphs();

        let mut tables: BTreeMap<TableTag, Vec<u8>> = BTreeMap::new();
        for record in font.table_directory.table_records() {
            let tag = record.tag();
            if let Some(table) = font.table_data(tag) {
                tables.insert(tag.to_be_bytes(), table.as_bytes().to_vec());
            }
        }

        if tables.contains_key(CFF) || tables.contains_key(CFF2) {
            return Err(FontToolError::engine(
                "font has CFF outlines, only TrueType 'glyf' outlines can be edited",
            ));
        }

        let loca = LocaOffsets::from_bytes(required(&tables, LOCA)?, num_glyphs, loca_format)?;
        let horizontal = read_hmtx(
            required(&tables, HMTX)?,
            metrics::number_of_h_metrics(required(&tables, HHEA)?)?,
            num_glyphs,
        )?;

        let glyf = required(&tables, GLYF)?;
        let mut glyphs = Vec::with_capacity(num_glyphs as usize);
        for (glyph_id, (advance_width, lsb)) in (0..num_glyphs).zip(horizontal) {
            let range = loca
                .glyph_range(glyph_id)
                .filter(|range| range.end <= glyf.len())
                .ok_or_else(|| {
                    FontToolError::engine(format!(
                        "glyph {} lies outside the 'glyf' table",
                        glyph_id
                    ))
                })?;
            let outline = decode_glyph(&glyf[range])?;
            if let Some(bad) = outline
                .component_ids()
                .into_iter()
                .find(|&id| id >= num_glyphs)
            {
                return Err(FontToolError::engine(format!(
                    "glyph {} references missing component {}",
                    glyph_id, bad
                )));
            }
            glyphs.push(Glyph {
                outline,
                advance_width,
                lsb,
            });
        }

        let (name, cmap) = read_charmap(data, num_glyphs)?;
        for tag in [GLYF, LOCA, HMTX, CMAP] {
            tables.remove(tag);
        }

        debug!(
            "Parsed '{}': {} glyphs, {} mapped codepoints, {} units per em",
            name,
            glyphs.len(),
            cmap.len(),
            units_per_em
        );

        Ok(TrueTypeFont {
            name,
            units_per_em,
            glyphs,
            cmap,
            tables,
        })
    }

    /// Map `codepoint` to a new glyph, returning its glyph id
    ///
    /// Component references of the glyph must already exist in this font.
    pub fn insert_glyph(&mut self, codepoint: u32, glyph: Glyph) -> Result<u16> {
        if self.glyphs.len() >= MAX_GLYPHS {
            return Err(FontToolError::engine("font already holds 65535 glyphs"));
        }
        if let Some(bad) = glyph
            .outline
            .component_ids()
            .into_iter()
            .find(|&id| id as usize >= self.glyphs.len())
        {
            return Err(FontToolError::engine(format!(
                "component glyph {} does not exist",
                bad
            )));
        }
        let glyph_id = self.glyphs.len() as u16;
        self.glyphs.push(glyph);
        self.cmap.insert(codepoint, glyph_id);
        Ok(glyph_id)
    }

    pub fn glyph_id(&self, codepoint: u32) -> Option<u16> {
        self.cmap.get(&codepoint).copied()
    }

    pub fn glyph(&self, glyph_id: u16) -> Option<&Glyph> {
        self.glyphs.get(glyph_id as usize)
    }

    pub fn glyph_for(&self, codepoint: u32) -> Option<&Glyph> {
        self.glyph_id(codepoint).and_then(|id| self.glyph(id))
    }

    /// Mapped codepoints in ascending order
    pub fn codepoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.cmap.keys().copied()
    }

    /// Serialize into a TrueType font file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bboxes = self.glyph_bboxes();

        let mut glyf = Vec::new();
        let mut lengths = Vec::with_capacity(self.glyphs.len());
        let mut horizontal = Vec::with_capacity(self.glyphs.len());
        let mut extents = HorizontalExtents::default();
        let mut font_bbox: Option<Bbox> = None;
        for (glyph, bbox) in self.glyphs.iter().zip(&bboxes) {
            let record = encode_glyph(&glyph.outline, bbox.unwrap_or_default());
            lengths.push(record.len());
            glyf.extend_from_slice(&record);

            let lsb = bbox.map_or(glyph.lsb, |b| b.x_min);
            extents.add(glyph.advance_width, lsb, *bbox);
            horizontal.push((glyph.advance_width, lsb));
            if let Some(bbox) = bbox {
                font_bbox = Some(font_bbox.map_or(*bbox, |acc| acc.union(*bbox)));
            }
        }
        let loca = LocaOffsets::from_glyph_lengths(lengths);
        let (hmtx, number_of_h_metrics) = build_hmtx(&horizontal);

        let mut out: BTreeMap<TableTag, Vec<u8>> = BTreeMap::new();
        for (tag, data) in &self.tables {
            if ALWAYS_DROPPED.contains(&tag) {
                warn!("Dropping '{}' table", String::from_utf8_lossy(tag));
                continue;
            }
            out.insert(*tag, data.clone());
        }

        out.insert(
            *HEAD,
            metrics::patch_head(
                required(&self.tables, HEAD)?,
                self.units_per_em,
                font_bbox.unwrap_or_default(),
                loca.format,
            )?,
        );
        out.insert(
            *HHEA,
            metrics::patch_hhea(required(&self.tables, HHEA)?, extents, number_of_h_metrics)?,
        );
        out.insert(
            *MAXP,
            metrics::build_maxp(
                self.tables.get(MAXP).map(Vec::as_slice),
                self.glyphs.len() as u16,
                self.maxp_stats(),
            ),
        );
        out.insert(
            *POST,
            metrics::build_post(self.tables.get(POST).map(Vec::as_slice)),
        );
        if let Some(os2) = self.tables.get(OS2) {
            let first = self.cmap.keys().next().copied().unwrap_or(0xFFFF);
            let last = self.cmap.keys().next_back().copied().unwrap_or(0);
            out.insert(*OS2, metrics::patch_os2(os2, first, last));
        }
        out.insert(*CMAP, cmap::build_cmap(&self.cmap));
        out.insert(*LOCA, loca.to_bytes());
        out.insert(*GLYF, glyf);
        out.insert(*HMTX, hmtx);

        Ok(sfnt::assemble(&out))
    }

    /// Bounding box of every glyph, composites resolved through their components
    fn glyph_bboxes(&self) -> Vec<Option<Bbox>> {
        let mut cache = vec![None; self.glyphs.len()];
        (0..self.glyphs.len())
            .map(|glyph_id| self.bbox_of(glyph_id as u16, &mut cache, 0))
            .collect()
    }

    fn bbox_of(&self, glyph_id: u16, cache: &mut [Option<Option<Bbox>>], depth: u16) -> Option<Bbox> {
        if let Some(known) = cache.get(glyph_id as usize).copied().flatten() {
            return known;
        }
        if depth > MAX_COMPONENT_DEPTH {
            return None;
        }
        let bbox = match &self.glyph(glyph_id)?.outline {
            Outline::Empty => None,
            Outline::Simple { contours, .. } => Bbox::from_points(
                contours
                    .iter()
                    .flatten()
                    .map(|p| (p.x as f64, p.y as f64)),
            ),
            Outline::Composite { components, .. } => {
                let mut acc: Option<Bbox> = None;
                for component in components {
                    let Some(child) = self.bbox_of(component.glyph_id, cache, depth + 1) else {
                        continue;
                    };
                    let [xx, xy, yx, yy] = component.transform.matrix();
                    let (dx, dy) = if component.has_xy_offset() {
                        (component.arg1 as f64, component.arg2 as f64)
                    } else {
                        (0.0, 0.0)
                    };
                    let corners = [
                        (child.x_min, child.y_min),
                        (child.x_min, child.y_max),
                        (child.x_max, child.y_min),
                        (child.x_max, child.y_max),
                    ]
                    .map(|(x, y)| {
                        let (x, y) = (x as f64, y as f64);
                        (xx * x + yx * y + dx, xy * x + yy * y + dy)
                    });
                    if let Some(placed) = Bbox::from_points(corners) {
                        acc = Some(acc.map_or(placed, |a| a.union(placed)));
                    }
                }
                acc
            }
        };
        if let Some(slot) = cache.get_mut(glyph_id as usize) {
            *slot = Some(bbox);
        }
        bbox
    }

    fn maxp_stats(&self) -> MaxpStats {
        let mut stats = MaxpStats::default();
        let mut cache = vec![None; self.glyphs.len()];
        let clamp = |v: u32| v.min(u16::MAX as u32) as u16;
        for (glyph_id, glyph) in self.glyphs.iter().enumerate() {
            let instructions = clamp(glyph.outline.instructions().len() as u32);
            stats.max_size_of_instructions = stats.max_size_of_instructions.max(instructions);
            match &glyph.outline {
                Outline::Empty => {}
                Outline::Simple { contours, .. } => {
                    let points: usize = contours.iter().map(Vec::len).sum();
                    stats.max_points = stats.max_points.max(clamp(points as u32));
                    stats.max_contours = stats.max_contours.max(clamp(contours.len() as u32));
                }
                Outline::Composite { components, .. } => {
                    let (points, contours, depth) =
                        self.flattened_size(glyph_id as u16, &mut cache, 0);
                    stats.max_composite_points = stats.max_composite_points.max(clamp(points));
                    stats.max_composite_contours =
                        stats.max_composite_contours.max(clamp(contours));
                    stats.max_component_depth = stats.max_component_depth.max(depth);
                    stats.max_component_elements = stats
                        .max_component_elements
                        .max(clamp(components.len() as u32));
                }
            }
        }
        stats
    }

    /// (points, contours, nesting depth) of a glyph with components expanded
    fn flattened_size(
        &self,
        glyph_id: u16,
        cache: &mut [Option<(u32, u32, u16)>],
        depth: u16,
    ) -> (u32, u32, u16) {
        if let Some(known) = cache.get(glyph_id as usize).copied().flatten() {
            return known;
        }
        if depth > MAX_COMPONENT_DEPTH {
            return (0, 0, 0);
        }
        let size = match self.glyph(glyph_id).map(|g| &g.outline) {
            None | Some(Outline::Empty) => (0, 0, 0),
            Some(Outline::Simple { contours, .. }) => (
                contours.iter().map(Vec::len).sum::<usize>() as u32,
                contours.len() as u32,
                0,
            ),
            Some(Outline::Composite { components, .. }) => {
                components
                    .iter()
                    .fold((0u32, 0u32, 1u16), |(p, c, d), component| {
                        let (cp, cc, cd) =
                            self.flattened_size(component.glyph_id, cache, depth + 1);
                        (p.saturating_add(cp), c.saturating_add(cc), d.max(cd + 1))
                    })
            }
        };
        if let Some(slot) = cache.get_mut(glyph_id as usize) {
            *slot = Some(size);
        }
        size
    }

    /// Copy `glyph_id` and its components onto `out`, returning its slot there
    fn copy_glyph(
        &self,
        glyph_id: u16,
        slots: &mut HashMap<u16, u16>,
        out: &mut Vec<Glyph>,
        depth: u16,
    ) -> Result<u16> {
        if let Some(&slot) = slots.get(&glyph_id) {
            return Ok(slot);
        }
        if depth > MAX_COMPONENT_DEPTH {
            return Err(FontToolError::engine(format!(
                "composite glyph {} nests deeper than {} levels",
                glyph_id, MAX_COMPONENT_DEPTH
            )));
        }
        let glyph = self
            .glyph(glyph_id)
            .ok_or_else(|| FontToolError::engine(format!("glyph {} does not exist", glyph_id)))?;

        let mut component_slots = Vec::new();
        for component in glyph.outline.component_ids() {
            component_slots.push(self.copy_glyph(component, slots, out, depth + 1)?);
        }
        let mut copied = glyph.clone();
        let mut next_slot = component_slots.into_iter();
        copied
            .outline
            .remap_components(|old| next_slot.next().unwrap_or(old));

        let slot = out.len() as u16;
        out.push(copied);
        slots.insert(glyph_id, slot);
        trace!("Copied glyph {} to clipboard slot {}", glyph_id, slot);
        Ok(slot)
    }
}

impl FontResource for TrueTypeFont {
    type Clipboard = Clipboard;

    fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| FontToolError::io(path, e))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        TrueTypeFont::from_bytes(&data)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn set_units_per_em(&mut self, units_per_em: u16) -> Result<()> {
        metrics::check_units_per_em(units_per_em)?;
        if units_per_em == self.units_per_em {
            return Ok(());
        }
        let factor = units_per_em as f64 / self.units_per_em as f64;
        for glyph in &mut self.glyphs {
            glyph.scale(factor);
        }
        metrics::scale_tables(&mut self.tables, factor);
        for tag in UNSCALED_TABLES {
            if self.tables.remove(tag).is_some() {
                warn!(
                    "Dropping '{}' table, its values do not follow the new em size",
                    String::from_utf8_lossy(tag)
                );
            }
        }
        debug!(
            "Rescaled '{}' from {} to {} units per em",
            self.name, self.units_per_em, units_per_em
        );
        self.units_per_em = units_per_em;
        Ok(())
    }

    fn select(&self, range: CodepointRange) -> Result<Selection> {
        if range.is_empty() {
            return Err(FontToolError::RangeNotPresent { range });
        }
        let codepoints: Vec<u32> = self
            .cmap
            .range(range.start..=range.end)
            .map(|(&cp, _)| cp)
            .collect();
        if codepoints.is_empty() {
            return Err(FontToolError::RangeNotPresent { range });
        }
        Ok(Selection::new(range, codepoints))
    }

    fn clear(&mut self, selection: &Selection) -> usize {
        let mut released = Vec::new();
        for cp in selection.codepoints() {
            if let Some(glyph_id) = self.cmap.remove(cp) {
                released.push(glyph_id);
            }
        }
        let cleared = released.len();

        let still_used: HashSet<u16> = self
            .cmap
            .values()
            .copied()
            .chain(self.glyphs.iter().flat_map(|g| g.outline.component_ids()))
            .collect();
        for glyph_id in released {
            if glyph_id != 0 && !still_used.contains(&glyph_id) {
                if let Some(glyph) = self.glyphs.get_mut(glyph_id as usize) {
                    *glyph = Glyph::empty(0);
                }
            }
        }
        cleared
    }

    fn copy(&self, selection: &Selection) -> Result<Clipboard> {
        let mut clipboard = Clipboard {
            units_per_em: self.units_per_em,
            glyphs: Vec::new(),
            entries: Vec::new(),
        };
        let mut slots = HashMap::new();
        for &cp in selection.codepoints() {
            let Some(glyph_id) = self.glyph_id(cp) else {
                continue;
            };
            let slot = self.copy_glyph(glyph_id, &mut slots, &mut clipboard.glyphs, 0)?;
            clipboard.entries.push((cp, slot));
        }
        Ok(clipboard)
    }

    fn paste(&mut self, clipboard: &Clipboard) -> Result<usize> {
        let base = self.glyphs.len();
        if base + clipboard.glyphs.len() > MAX_GLYPHS {
            return Err(FontToolError::engine(format!(
                "adding {} glyphs to {} would exceed 65535 glyphs",
                clipboard.glyphs.len(),
                base
            )));
        }
        let factor = (clipboard.units_per_em != self.units_per_em)
            .then(|| self.units_per_em as f64 / clipboard.units_per_em as f64);

        let offset = base as u16;
        for glyph in &clipboard.glyphs {
            let mut glyph = glyph.clone();
            glyph.outline.remap_components(|slot| slot + offset);
            if let Some(factor) = factor {
                glyph.scale(factor);
            }
            self.glyphs.push(glyph);
        }
        for &(cp, slot) in &clipboard.entries {
            self.cmap.insert(cp, offset + slot);
        }
        Ok(clipboard.entries.len())
    }

    fn merge_from(&mut self, donor: &Self) -> Result<usize> {
        let missing: Vec<u32> = donor
            .codepoints()
            .filter(|cp| !self.cmap.contains_key(cp))
            .collect();
        if missing.is_empty() {
            info!("'{}' already covers every codepoint of '{}'", self.name, donor.name);
            return Ok(0);
        }
        debug!("{} codepoints missing from '{}'", missing.len(), self.name);
        let selection = Selection::new(CodepointRange::new(0, 0x10FFFF), missing);
        let clipboard = donor.copy(&selection)?;
        self.paste(&clipboard)
    }

    fn generate(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating output directory {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| FontToolError::io(parent, e))?;
            }
        }
        fs::write(path, &bytes).map_err(|e| FontToolError::io(path, e))?;
        info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

fn required<'a>(tables: &'a BTreeMap<TableTag, Vec<u8>>, tag: &TableTag) -> Result<&'a [u8]> {
    tables.get(tag).map(Vec::as_slice).ok_or_else(|| {
        FontToolError::engine(format!(
            "font has no '{}' table",
            String::from_utf8_lossy(tag)
        ))
    })
}

/// (advance width, left side bearing) of every glyph
fn read_hmtx(data: &[u8], number_of_h_metrics: u16, num_glyphs: u16) -> Result<Vec<(u16, i16)>> {
    if number_of_h_metrics == 0 && num_glyphs > 0 {
        return Err(FontToolError::engine("'hhea' declares no horizontal metrics"));
    }
    let long = number_of_h_metrics.min(num_glyphs);
    let mut cursor = Cursor::new(data);
    let mut horizontal = Vec::with_capacity(num_glyphs as usize);
    let mut advance = 0;
    for glyph_id in 0..num_glyphs {
        if glyph_id < long {
            advance = cursor
                .read_u16::<BigEndian>()
                .map_err(|e| FontToolError::truncated("hmtx", e))?;
        }
        let lsb = cursor
            .read_i16::<BigEndian>()
            .map_err(|e| FontToolError::truncated("hmtx", e))?;
        horizontal.push((advance, lsb));
    }
    Ok(horizontal)
}

/// Encode `hmtx`, folding the trailing run of equal advances
fn build_hmtx(horizontal: &[(u16, i16)]) -> (Vec<u8>, u16) {
    let last_advance = horizontal.last().map_or(0, |&(advance, _)| advance);
    let mut long = horizontal.len();
    while long > 1 && horizontal[long - 2].0 == last_advance {
        long -= 1;
    }

    let mut data = Vec::with_capacity(long * 4 + (horizontal.len() - long) * 2);
    for (i, (advance, lsb)) in horizontal.iter().enumerate() {
        if i < long {
            data.extend_from_slice(&advance.to_be_bytes());
        }
        data.extend_from_slice(&lsb.to_be_bytes());
    }
    (data, long as u16)
}

/// Family name and codepoint mappings, skipping `.notdef` and bad glyph ids
fn read_charmap(data: &[u8], num_glyphs: u16) -> Result<(String, BTreeMap<u32, u16>)> {
    let font = skrifa::FontRef::new(data)
        .map_err(|e| FontToolError::engine(format!("failed to parse font: {}", e)))?;

    let mut mappings = BTreeMap::new();
    let mut skipped = 0usize;
    for (codepoint, glyph_id) in font.charmap().mappings() {
        let glyph_id = glyph_id.to_u32();
        if glyph_id == 0 {
            continue;
        }
        if glyph_id >= num_glyphs as u32 {
            skipped += 1;
            continue;
        }
        mappings.insert(codepoint, glyph_id as u16);
    }
    if skipped > 0 {
        warn!("Ignored {} cmap entries pointing past the last glyph", skipped);
    }

    let name = font
        .localized_strings(StringId::FAMILY_NAME)
        .english_or_first()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Untitled".to_string());
    Ok((name, mappings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Component, Point};
    use crate::range::PUA_RANGE;
    use tempfile::TempDir;

    fn square(size: i16) -> Outline {
        Outline::simple(vec![vec![
            Point::on(0, 0),
            Point::on(0, size),
            Point::on(size, size),
            Point::on(size, 0),
        ]])
    }

    fn font_with(units_per_em: u16, codepoints: &[u32]) -> TrueTypeFont {
        let mut font = TrueTypeFont::new("Test", units_per_em).unwrap();
        for (i, &cp) in codepoints.iter().enumerate() {
            font.insert_glyph(cp, Glyph::new(square(100 + i as i16), 500))
                .unwrap();
        }
        font
    }

    #[test]
    fn test_new_font_has_notdef_only() {
        let font = TrueTypeFont::new("Empty", 1000).unwrap();
        assert_eq!(font.glyph_count(), 1);
        assert_eq!(font.codepoints().count(), 0);
        assert!(TrueTypeFont::new("Bad", 4).is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let mut font = font_with(1000, &[0x41, 0xE000, 0xE001]);
        let base = font.glyph_id(0x41).unwrap();
        let accent = font
            .insert_glyph(
                0xC0,
                Glyph::new(
                    Outline::Composite {
                        components: vec![Component::offset(base, 10, 20)],
                        instructions: Vec::new(),
                    },
                    500,
                ),
            )
            .unwrap();

        let parsed = TrueTypeFont::from_bytes(&font.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.glyph_count(), font.glyph_count());
        assert_eq!(
            parsed.codepoints().collect::<Vec<_>>(),
            vec![0x41, 0xC0, 0xE000, 0xE001]
        );
        assert_eq!(parsed.glyph_for(0x41).unwrap().outline, square(100));
        assert_eq!(parsed.glyph_for(0x41).unwrap().advance_width, 500);
        assert_eq!(
            parsed.glyph(accent).unwrap().outline.component_ids(),
            vec![base]
        );
        assert_eq!(parsed.units_per_em(), 1000);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(TrueTypeFont::from_bytes(b"not a font").is_err());
    }

    #[test]
    fn test_select_missing_range() {
        let font = font_with(1000, &[0x41]);
        let err = font.select(PUA_RANGE).unwrap_err();
        assert!(err.is_range_not_present());

        let inverted = CodepointRange::new(0xE099, 0xE000);
        assert!(font.select(inverted).unwrap_err().is_range_not_present());
    }

    #[test]
    fn test_clear_unmaps_and_empties() {
        let mut font = font_with(1000, &[0x41, 0xE000, 0xE050, 0xE0A0]);
        let selection = font.select(PUA_RANGE).unwrap();
        assert_eq!(selection.codepoints(), &[0xE000, 0xE050]);

        let cleared_id = font.glyph_id(0xE000).unwrap();
        assert_eq!(font.clear(&selection), 2);
        assert!(font.glyph_id(0xE000).is_none());
        assert!(font.glyph(cleared_id).unwrap().outline.is_empty());
        // outside the range nothing changes
        assert!(font.glyph_id(0xE0A0).is_some());
        assert!(font.select(PUA_RANGE).is_err());
    }

    #[test]
    fn test_clear_keeps_glyphs_used_as_components() {
        let mut font = font_with(1000, &[0xE000]);
        let part = font.glyph_id(0xE000).unwrap();
        font.insert_glyph(
            0x41,
            Glyph::new(
                Outline::Composite {
                    components: vec![Component::offset(part, 0, 0)],
                    instructions: Vec::new(),
                },
                500,
            ),
        )
        .unwrap();

        let selection = font.select(PUA_RANGE).unwrap();
        font.clear(&selection);
        assert!(!font.glyph(part).unwrap().outline.is_empty());
    }

    #[test]
    fn test_copy_paste_carries_components() {
        let mut donor = font_with(1000, &[0x41]);
        let base = donor.glyph_id(0x41).unwrap();
        donor
            .insert_glyph(
                0xE001,
                Glyph::new(
                    Outline::Composite {
                        components: vec![Component::offset(base, 0, 0)],
                        instructions: Vec::new(),
                    },
                    600,
                ),
            )
            .unwrap();

        let clipboard = donor.copy(&donor.select(PUA_RANGE).unwrap()).unwrap();
        assert_eq!(clipboard.len(), 1);
        assert_eq!(clipboard.glyph_count(), 2);

        let mut target = font_with(1000, &[0x30, 0x31]);
        assert_eq!(target.paste(&clipboard).unwrap(), 1);
        let pasted = target.glyph_for(0xE001).unwrap();
        let component = pasted.outline.component_ids()[0];
        assert_eq!(target.glyph(component).unwrap().outline, square(100));
        // 0x41 came along as a dependency but stays unmapped
        assert!(target.glyph_id(0x41).is_none());
    }

    #[test]
    fn test_paste_rescales_from_other_em() {
        let donor = font_with(2048, &[0xE000]);
        let clipboard = donor.copy(&donor.select(PUA_RANGE).unwrap()).unwrap();

        let mut target = font_with(1000, &[]);
        target.paste(&clipboard).unwrap();
        let glyph = target.glyph_for(0xE000).unwrap();
        // 500 * 1000/2048 = 244.14
        assert_eq!(glyph.advance_width, 244);
        assert_eq!(glyph.outline, {
            let mut expected = square(100);
            expected.scale(1000.0 / 2048.0);
            expected
        });
    }

    #[test]
    fn test_set_units_per_em_scales_everything() {
        let mut font = font_with(1000, &[0x41]);
        font.tables.insert(*b"kern", vec![0; 4]);
        font.set_units_per_em(2000).unwrap();

        assert_eq!(font.units_per_em(), 2000);
        assert_eq!(font.glyph_for(0x41).unwrap().outline, square(200));
        assert_eq!(font.glyph_for(0x41).unwrap().advance_width, 1000);
        assert!(!font.tables.contains_key(b"kern"));

        let parsed = TrueTypeFont::from_bytes(&font.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.units_per_em(), 2000);
    }

    #[test]
    fn test_merge_fills_only_missing() {
        let mut primary = font_with(1000, &[0x41, 0x42]);
        let donor = font_with(1000, &[0x42, 0x43, 0xE000]);
        let original_b = primary.glyph_for(0x42).cloned();

        assert_eq!(primary.merge_from(&donor).unwrap(), 2);
        assert_eq!(primary.glyph_for(0x42).cloned(), original_b);
        assert!(primary.glyph_id(0x43).is_some());
        assert!(primary.glyph_id(0xE000).is_some());

        assert_eq!(primary.merge_from(&donor).unwrap(), 0);
    }

    #[test]
    fn test_maxp_stats_saturate_on_deep_shared_components() {
        let mut font = font_with(1000, &[0x41]);
        let mut previous = font.glyph_id(0x41).unwrap();
        // each level doubles the expanded point count: 4 * 2^40 points
        for level in 0..40u32 {
            previous = font
                .insert_glyph(
                    0xE000 + level,
                    Glyph::new(
                        Outline::Composite {
                            components: vec![
                                Component::offset(previous, 0, 0),
                                Component::offset(previous, 100, 0),
                            ],
                            instructions: Vec::new(),
                        },
                        500,
                    ),
                )
                .unwrap();
        }

        let stats = font.maxp_stats();
        assert_eq!(stats.max_composite_points, u16::MAX);
        assert_eq!(stats.max_composite_contours, u16::MAX);
        assert_eq!(stats.max_component_depth, 40);
        assert_eq!(stats.max_component_elements, 2);
    }

    #[test]
    fn test_cycle_is_rejected_on_copy() {
        let mut font = font_with(1000, &[]);
        let a = font.glyphs.len() as u16;
        font.glyphs.push(Glyph::new(
            Outline::Composite {
                components: vec![Component::offset(a + 1, 0, 0)],
                instructions: Vec::new(),
            },
            0,
        ));
        font.glyphs.push(Glyph::new(
            Outline::Composite {
                components: vec![Component::offset(a, 0, 0)],
                instructions: Vec::new(),
            },
            0,
        ));
        font.cmap.insert(0xE000, a);

        let selection = font.select(PUA_RANGE).unwrap();
        assert!(font.copy(&selection).is_err());
    }

    #[test]
    fn test_hmtx_folds_trailing_advances() {
        let (data, long) = build_hmtx(&[(500, 0), (600, 10), (600, 20), (600, 30)]);
        assert_eq!(long, 2);
        assert_eq!(data.len(), 2 * 4 + 2 * 2);

        let parsed = read_hmtx(&data, long, 4).unwrap();
        assert_eq!(parsed, vec![(500, 0), (600, 10), (600, 20), (600, 30)]);
    }

    #[test]
    fn test_generate_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.ttf");
        font_with(1000, &[0xE000]).generate(&path).unwrap();

        let reopened = TrueTypeFont::open(&path).unwrap();
        assert_eq!(reopened.glyph_count(), 2);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = TrueTypeFont::open(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, FontToolError::Io { .. }));
    }
}
