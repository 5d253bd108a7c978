/// Low-level glyf/loca binary handling
///
/// Decodes TrueType glyph records into an owned outline model and encodes
/// them back. Simple glyphs are fully decoded to points so they can be
/// rescaled; composite glyphs keep their component records so references
/// can be renumbered when glyphs move between fonts.
use crate::{FontToolError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

const ON_CURVE_POINT: u8 = 0x01;
const X_SHORT_VECTOR: u8 = 0x02;
const Y_SHORT_VECTOR: u8 = 0x04;
const REPEAT_FLAG: u8 = 0x08;
const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;
const OVERLAP_SIMPLE: u8 = 0x40;

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
pub const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Component flags that carry meaning on their own; the layout flags are
/// recomputed on encode.
const PRESERVED_COMPONENT_FLAGS: u16 = 0x0002 | 0x0004 | 0x0200 | 0x0400 | 0x0800 | 0x1000;

/// A point of a simple glyph contour, in font units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
    pub on_curve: bool,
}

impl Point {
    pub fn on(x: i16, y: i16) -> Self {
        Point {
            x,
            y,
            on_curve: true,
        }
    }

    pub fn off(x: i16, y: i16) -> Self {
        Point {
            x,
            y,
            on_curve: false,
        }
    }
}

pub type Contour = Vec<Point>;

/// Component transform, values kept as raw F2Dot14
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Scale(i16),
    XyScale(i16, i16),
    TwoByTwo([i16; 4]),
}

impl Transform {
    /// The transform as `[xx, xy, yx, yy]` floats
    pub fn matrix(&self) -> [f64; 4] {
        let f = |v: i16| v as f64 / 16384.0;
        match *self {
            Transform::Identity => [1.0, 0.0, 0.0, 1.0],
            Transform::Scale(s) => [f(s), 0.0, 0.0, f(s)],
            Transform::XyScale(x, y) => [f(x), 0.0, 0.0, f(y)],
            Transform::TwoByTwo([a, b, c, d]) => [f(a), f(b), f(c), f(d)],
        }
    }
}

/// One component record of a composite glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub glyph_id: u16,
    pub flags: u16,
    /// x offset, or parent point number when the args are not XY values
    pub arg1: i32,
    /// y offset, or child point number when the args are not XY values
    pub arg2: i32,
    pub transform: Transform,
}

impl Component {
    /// A component placed at an offset with no transform
    pub fn offset(glyph_id: u16, dx: i16, dy: i16) -> Self {
        Component {
            glyph_id,
            flags: ARGS_ARE_XY_VALUES,
            arg1: dx as i32,
            arg2: dy as i32,
            transform: Transform::Identity,
        }
    }

    pub fn has_xy_offset(&self) -> bool {
        self.flags & ARGS_ARE_XY_VALUES != 0
    }
}

/// Outline data of a glyph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outline {
    Empty,
    Simple {
        contours: Vec<Contour>,
        instructions: Vec<u8>,
        overlap: bool,
    },
    Composite {
        components: Vec<Component>,
        instructions: Vec<u8>,
    },
}

impl Outline {
    /// A simple outline without hinting instructions
    pub fn simple(contours: Vec<Contour>) -> Self {
        if contours.iter().all(|c| c.is_empty()) {
            return Outline::Empty;
        }
        Outline::Simple {
            contours,
            instructions: Vec::new(),
            overlap: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outline::Empty)
    }

    pub fn component_ids(&self) -> Vec<u16> {
        match self {
            Outline::Composite { components, .. } => {
                components.iter().map(|c| c.glyph_id).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Renumber component references through `map`
    pub fn remap_components(&mut self, mut map: impl FnMut(u16) -> u16) {
        if let Outline::Composite { components, .. } = self {
            for component in components.iter_mut() {
                component.glyph_id = map(component.glyph_id);
            }
        }
    }

    /// Scale coordinates by `factor`; transforms are scale-free and kept
    pub fn scale(&mut self, factor: f64) {
        match self {
            Outline::Empty => {}
            Outline::Simple { contours, .. } => {
                for point in contours.iter_mut().flatten() {
                    point.x = scale_i16(point.x, factor);
                    point.y = scale_i16(point.y, factor);
                }
            }
            Outline::Composite { components, .. } => {
                for component in components.iter_mut().filter(|c| c.has_xy_offset()) {
                    component.arg1 = scale_i16(component.arg1 as i16, factor) as i32;
                    component.arg2 = scale_i16(component.arg2 as i16, factor) as i32;
                }
            }
        }
    }

    pub fn instructions(&self) -> &[u8] {
        match self {
            Outline::Empty => &[],
            Outline::Simple { instructions, .. } | Outline::Composite { instructions, .. } => {
                instructions
            }
        }
    }
}

/// Scale a font-unit value, rounding and saturating to the i16 range
pub fn scale_i16(value: i16, factor: f64) -> i16 {
    (value as f64 * factor)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Glyph bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bbox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl Bbox {
    /// Smallest box around the points, rounded outward
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (x, y, x, y);
        for (x, y) in iter {
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }
        let clamp = |v: f64| v.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        Some(Bbox {
            x_min: clamp(x_min.floor()),
            y_min: clamp(y_min.floor()),
            x_max: clamp(x_max.ceil()),
            y_max: clamp(y_max.ceil()),
        })
    }

    pub fn union(self, other: Bbox) -> Bbox {
        Bbox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn width(&self) -> i32 {
        self.x_max as i32 - self.x_min as i32
    }
}

/// Offsets from the loca table
#[derive(Debug)]
pub struct LocaOffsets {
    /// Offsets of each glyph in the glyf table, plus the end offset
    pub offsets: Vec<u32>,
    /// Format: 0 for short offsets (divided by 2), 1 for long offsets
    pub format: i16,
}

impl LocaOffsets {
    /// Parse the loca table from raw bytes
    pub fn from_bytes(data: &[u8], num_glyphs: u16, format: i16) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);

        for _ in 0..=num_glyphs {
            let offset = if format == 0 {
                cursor.read_u16::<BigEndian>().map(|o| o as u32 * 2)
            } else {
                cursor.read_u32::<BigEndian>()
            }
            .map_err(|e| FontToolError::truncated("loca", e))?;
            offsets.push(offset);
        }

        Ok(LocaOffsets { offsets, format })
    }

    /// Build offsets from the encoded glyph records, picking the format
    pub fn from_glyph_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let mut offsets = vec![0u32];
        let mut end = 0u32;
        for len in lengths {
            end += len as u32;
            offsets.push(end);
        }
        let format = if end > 0x1FFFE { 1 } else { 0 };
        LocaOffsets { offsets, format }
    }

    /// Byte range of a glyph inside the glyf table
    pub fn glyph_range(&self, glyph_id: u16) -> Option<std::ops::Range<usize>> {
        let start = *self.offsets.get(glyph_id as usize)? as usize;
        let end = *self.offsets.get(glyph_id as usize + 1)? as usize;
        (start <= end).then_some(start..end)
    }

    /// Serialize back to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for offset in &self.offsets {
            if self.format == 0 {
                buf.extend_from_slice(&((offset / 2) as u16).to_be_bytes());
            } else {
                buf.extend_from_slice(&offset.to_be_bytes());
            }
        }
        buf
    }
}

/// Decode one glyph record
pub fn decode_glyph(data: &[u8]) -> Result<Outline> {
    if data.is_empty() {
        return Ok(Outline::Empty);
    }
    let truncated = |e| FontToolError::truncated("glyf", e);

    let mut cursor = Cursor::new(data);
    let num_contours = cursor.read_i16::<BigEndian>().map_err(truncated)?;
    // bbox is recomputed on encode
    cursor.set_position(10);

    if num_contours >= 0 {
        decode_simple(&mut cursor, num_contours as usize)
    } else {
        decode_composite(&mut cursor).map_err(truncated)
    }
}

fn decode_simple(cursor: &mut Cursor<&[u8]>, num_contours: usize) -> Result<Outline> {
    let truncated = |e| FontToolError::truncated("glyf", e);

    if num_contours == 0 {
        return Ok(Outline::Empty);
    }

    let mut end_points = Vec::with_capacity(num_contours);
    for _ in 0..num_contours {
        end_points.push(cursor.read_u16::<BigEndian>().map_err(truncated)? as usize);
    }
    if end_points.windows(2).any(|w| w[1] < w[0]) {
        return Err(FontToolError::engine(
            "simple glyph contour end points are not increasing",
        ));
    }
    let num_points = end_points.last().map_or(0, |last| last + 1);

    let instruction_length = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
    let mut instructions = vec![0u8; instruction_length];
    cursor.read_exact(&mut instructions).map_err(truncated)?;

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = cursor.read_u8().map_err(truncated)?;
        flags.push(flag);
        if flag & REPEAT_FLAG != 0 {
            let count = cursor.read_u8().map_err(truncated)?;
            for _ in 0..count {
                flags.push(flag);
            }
        }
    }
    flags.truncate(num_points);

    let xs = read_coordinates(cursor, &flags, X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE)
        .map_err(truncated)?;
    let ys = read_coordinates(cursor, &flags, Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE)
        .map_err(truncated)?;

    let mut contours = Vec::with_capacity(num_contours);
    let mut start = 0;
    for end in end_points {
        let contour = (start..=end)
            .map(|i| Point {
                x: xs[i],
                y: ys[i],
                on_curve: flags[i] & ON_CURVE_POINT != 0,
            })
            .collect();
        contours.push(contour);
        start = end + 1;
    }

    Ok(Outline::Simple {
        contours,
        instructions,
        overlap: flags.first().is_some_and(|f| f & OVERLAP_SIMPLE != 0),
    })
}

fn read_coordinates(
    cursor: &mut Cursor<&[u8]>,
    flags: &[u8],
    short_flag: u8,
    same_or_positive: u8,
) -> std::io::Result<Vec<i16>> {
    let mut values = Vec::with_capacity(flags.len());
    let mut current: i16 = 0;
    for &flag in flags {
        let delta = if flag & short_flag != 0 {
            let v = cursor.read_u8()? as i16;
            if flag & same_or_positive != 0 {
                v
            } else {
                -v
            }
        } else if flag & same_or_positive != 0 {
            0
        } else {
            cursor.read_i16::<BigEndian>()?
        };
        current = current.wrapping_add(delta);
        values.push(current);
    }
    Ok(values)
}

fn decode_composite(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Outline> {
    let mut components = Vec::new();
    let mut has_instructions = false;

    loop {
        let flags = cursor.read_u16::<BigEndian>()?;
        let glyph_id = cursor.read_u16::<BigEndian>()?;

        let (arg1, arg2) = match (
            flags & ARG_1_AND_2_ARE_WORDS != 0,
            flags & ARGS_ARE_XY_VALUES != 0,
        ) {
            (true, true) => (
                cursor.read_i16::<BigEndian>()? as i32,
                cursor.read_i16::<BigEndian>()? as i32,
            ),
            (true, false) => (
                cursor.read_u16::<BigEndian>()? as i32,
                cursor.read_u16::<BigEndian>()? as i32,
            ),
            (false, true) => (cursor.read_i8()? as i32, cursor.read_i8()? as i32),
            (false, false) => (cursor.read_u8()? as i32, cursor.read_u8()? as i32),
        };

        let transform = if flags & WE_HAVE_A_SCALE != 0 {
            Transform::Scale(cursor.read_i16::<BigEndian>()?)
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            Transform::XyScale(
                cursor.read_i16::<BigEndian>()?,
                cursor.read_i16::<BigEndian>()?,
            )
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            Transform::TwoByTwo([
                cursor.read_i16::<BigEndian>()?,
                cursor.read_i16::<BigEndian>()?,
                cursor.read_i16::<BigEndian>()?,
                cursor.read_i16::<BigEndian>()?,
            ])
        } else {
            Transform::Identity
        };

        components.push(Component {
            glyph_id,
            flags: flags & PRESERVED_COMPONENT_FLAGS,
            arg1,
            arg2,
            transform,
        });

        has_instructions |= flags & WE_HAVE_INSTRUCTIONS != 0;
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    let mut instructions = Vec::new();
    if has_instructions {
        let len = cursor.read_u16::<BigEndian>()? as usize;
        instructions = vec![0u8; len];
        cursor.read_exact(&mut instructions)?;
    }

    Ok(Outline::Composite {
        components,
        instructions,
    })
}

/// Encode a glyph record with the given bounding box, padded to 4 bytes
pub fn encode_glyph(outline: &Outline, bbox: Bbox) -> Vec<u8> {
    let mut out = Vec::new();
    match outline {
        Outline::Empty => return out,
        Outline::Simple {
            contours,
            instructions,
            overlap,
        } => {
            write_header(&mut out, contours.len() as i16, bbox);
            encode_simple(&mut out, contours, instructions, *overlap);
        }
        Outline::Composite {
            components,
            instructions,
        } => {
            write_header(&mut out, -1, bbox);
            encode_composite(&mut out, components, instructions);
        }
    }
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

fn write_header(out: &mut Vec<u8>, num_contours: i16, bbox: Bbox) {
    out.extend_from_slice(&num_contours.to_be_bytes());
    out.extend_from_slice(&bbox.x_min.to_be_bytes());
    out.extend_from_slice(&bbox.y_min.to_be_bytes());
    out.extend_from_slice(&bbox.x_max.to_be_bytes());
    out.extend_from_slice(&bbox.y_max.to_be_bytes());
}

fn encode_simple(out: &mut Vec<u8>, contours: &[Contour], instructions: &[u8], overlap: bool) {
    let mut end = 0usize;
    for contour in contours {
        end += contour.len();
        out.extend_from_slice(&(end.saturating_sub(1) as u16).to_be_bytes());
    }
    out.extend_from_slice(&(instructions.len() as u16).to_be_bytes());
    out.extend_from_slice(instructions);

    let mut flags = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut prev_x, mut prev_y) = (0i16, 0i16);

    for (i, point) in contours.iter().flatten().enumerate() {
        let mut flag = if point.on_curve { ON_CURVE_POINT } else { 0 };
        if i == 0 && overlap {
            flag |= OVERLAP_SIMPLE;
        }
        flag |= push_delta(
            &mut xs,
            point.x.wrapping_sub(prev_x),
            X_SHORT_VECTOR,
            X_IS_SAME_OR_POSITIVE,
        );
        flag |= push_delta(
            &mut ys,
            point.y.wrapping_sub(prev_y),
            Y_SHORT_VECTOR,
            Y_IS_SAME_OR_POSITIVE,
        );
        flags.push(flag);
        prev_x = point.x;
        prev_y = point.y;
    }

    let mut i = 0;
    while i < flags.len() {
        let flag = flags[i];
        let mut run = 0;
        while i + run + 1 < flags.len() && flags[i + run + 1] == flag && run < 255 {
            run += 1;
        }
        if run > 0 {
            out.push(flag | REPEAT_FLAG);
            out.push(run as u8);
        } else {
            out.push(flag);
        }
        i += run + 1;
    }

    out.extend_from_slice(&xs);
    out.extend_from_slice(&ys);
}

fn push_delta(buf: &mut Vec<u8>, delta: i16, short_flag: u8, same_or_positive: u8) -> u8 {
    if delta == 0 {
        same_or_positive
    } else if delta.unsigned_abs() <= 255 {
        buf.push(delta.unsigned_abs() as u8);
        if delta > 0 {
            short_flag | same_or_positive
        } else {
            short_flag
        }
    } else {
        buf.extend_from_slice(&delta.to_be_bytes());
        0
    }
}

fn encode_composite(out: &mut Vec<u8>, components: &[Component], instructions: &[u8]) {
    let last = components.len().saturating_sub(1);
    for (i, component) in components.iter().enumerate() {
        let xy = component.has_xy_offset();
        let fits_bytes = if xy {
            [component.arg1, component.arg2]
                .iter()
                .all(|v| (i8::MIN as i32..=i8::MAX as i32).contains(v))
        } else {
            [component.arg1, component.arg2]
                .iter()
                .all(|v| (0..=u8::MAX as i32).contains(v))
        };

        let mut flags = component.flags & PRESERVED_COMPONENT_FLAGS;
        if !fits_bytes {
            flags |= ARG_1_AND_2_ARE_WORDS;
        }
        flags |= match component.transform {
            Transform::Identity => 0,
            Transform::Scale(_) => WE_HAVE_A_SCALE,
            Transform::XyScale(..) => WE_HAVE_AN_X_AND_Y_SCALE,
            Transform::TwoByTwo(_) => WE_HAVE_A_TWO_BY_TWO,
        };
        if i < last {
            flags |= MORE_COMPONENTS;
        } else if !instructions.is_empty() {
            flags |= WE_HAVE_INSTRUCTIONS;
        }

        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&component.glyph_id.to_be_bytes());
        for arg in [component.arg1, component.arg2] {
            match (fits_bytes, xy) {
                (true, true) => out.push(arg as i8 as u8),
                (true, false) => out.push(arg as u8),
                (false, true) => out.extend_from_slice(&(arg as i16).to_be_bytes()),
                (false, false) => out.extend_from_slice(&(arg as u16).to_be_bytes()),
            }
        }
        match component.transform {
            Transform::Identity => {}
            Transform::Scale(s) => out.extend_from_slice(&s.to_be_bytes()),
            Transform::XyScale(x, y) => {
                out.extend_from_slice(&x.to_be_bytes());
                out.extend_from_slice(&y.to_be_bytes());
            }
            Transform::TwoByTwo(m) => {
                for v in m {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
    }

    if !instructions.is_empty() {
        out.extend_from_slice(&(instructions.len() as u16).to_be_bytes());
        out.extend_from_slice(instructions);
    }
}
