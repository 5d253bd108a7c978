/// Font file assembly
///
/// Tables are laid out by write-fonts' `FontBuilder`; the `head`
/// checkSumAdjustment is then settled over the finished file.
use super::metrics::{TableTag, HEAD};
use byteorder::{BigEndian, ByteOrder};
use std::collections::BTreeMap;
use write_fonts::{types::Tag, FontBuilder};

const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// Serialize raw tables into a TrueType font file
pub fn assemble(tables: &BTreeMap<TableTag, Vec<u8>>) -> Vec<u8> {
    let mut builder = FontBuilder::new();
    for (tag, data) in tables {
        builder.add_raw(Tag::new(tag), data.clone());
    }
    let mut output = builder.build();
    fix_head_checksum(&mut output);
    output
}

/// Sum of big-endian u32 words, zero-padding the tail
pub fn table_checksum(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(4);
    let mut sum = chunks
        .by_ref()
        .fold(0u32, |sum, word| sum.wrapping_add(BigEndian::read_u32(word)));
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut last = [0u8; 4];
        last[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

/// (directory record position, table offset, table length)
fn find_record(data: &[u8], tag: &TableTag) -> Option<(usize, usize, usize)> {
    let num_tables = BigEndian::read_u16(data.get(4..6)?) as usize;
    (0..num_tables).find_map(|i| {
        let record = 12 + i * 16;
        let entry = data.get(record..record + 16)?;
        (&entry[..4] == tag).then(|| {
            (
                record,
                BigEndian::read_u32(&entry[8..]) as usize,
                BigEndian::read_u32(&entry[12..]) as usize,
            )
        })
    })
}

fn fix_head_checksum(output: &mut [u8]) {
    let Some((record, offset, length)) = find_record(output, HEAD) else {
        return;
    };
    if offset + length > output.len() || length < 12 {
        return;
    }

    BigEndian::write_u32(&mut output[offset + 8..], 0);
    let head_checksum = table_checksum(&output[offset..offset + length]);
    BigEndian::write_u32(&mut output[record + 4..], head_checksum);

    let adjustment = CHECKSUM_MAGIC.wrapping_sub(table_checksum(output));
    BigEndian::write_u32(&mut output[offset + 8..], adjustment);
}
