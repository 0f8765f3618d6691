//! Low-level protobuf wire format walking.
//!
//! prost decodes the fields the engine understands but discards everything
//! else. This module walks the same bytes field by field so unknown fields can
//! be kept verbatim and written back on encode.
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3/4: SGROUP/EGROUP (deprecated groups, kept whole up to the matching end)
//! - 5: I32 (fixed32, sfixed32, float)

use crate::error::{Error, Result};
use std::ops::Range;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    fn from_tag(tag: u64, offset: usize) -> Result<Self> {
        match tag & 0x07 {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            other => Err(Error::invalid_wire_format(
                offset,
                format!("unknown wire type: {}", other),
            )),
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub(crate) const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Nesting limit for groups, matching prost's recursion limit
const MAX_GROUP_DEPTH: usize = 100;

/// Location of one field inside a message buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldSpan {
    /// Field number from the tag
    pub(crate) number: u32,
    /// Wire type from the tag
    pub(crate) wire_type: WireType,
    /// Whole field, tag included
    pub(crate) range: Range<usize>,
    /// Value bytes only; for LEN fields the length prefix is excluded
    pub(crate) value: Range<usize>,
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub(crate) fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::invalid_wire_format(offset + i, "varint longer than 10 bytes"));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::invalid_wire_format(offset + data.len(), "truncated varint"))
}

/// Consume a single protobuf field starting at `offset`.
pub(crate) fn consume_field(data: &[u8], offset: usize) -> Result<FieldSpan> {
    consume(data, offset, 0)
}

fn consume(data: &[u8], offset: usize, depth: usize) -> Result<FieldSpan> {
    let rest = &data[offset..];
    if rest.is_empty() {
        return Err(Error::invalid_wire_format(offset, "empty data"));
    }

    let (tag, tag_len) = decode_varint(rest, offset)?;
    let wire_type = WireType::from_tag(tag, offset)?;
    let number = tag >> 3;

    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(Error::invalid_wire_format(
            offset,
            format!("invalid field number {}", number),
        ));
    }

    let start = offset + tag_len;
    let (value, end) = match wire_type {
        WireType::Varint => {
            let (_, len) = decode_varint(&data[start..], start)?;
            (start..start + len, start + len)
        }
        WireType::I64 => {
            let value = fixed(data, start, 8)?;
            let end = value.end;
            (value, end)
        }
        WireType::I32 => {
            let value = fixed(data, start, 4)?;
            let end = value.end;
            (value, end)
        }
        WireType::Len => {
            let (length, prefix_len) = decode_varint(&data[start..], start)?;
            let value_start = start + prefix_len;
            let available = data.len() - value_start;
            if length > available as u64 {
                return Err(Error::invalid_wire_format(
                    start,
                    format!(
                        "not enough bytes for LEN field (need {}, have {})",
                        length, available
                    ),
                ));
            }
            let end = value_start + length as usize;
            (value_start..end, end)
        }
        WireType::StartGroup => {
            let (value_end, end) = skip_group(data, start, number, depth + 1)?;
            (start..value_end, end)
        }
        WireType::EndGroup => {
            return Err(Error::invalid_wire_format(
                offset,
                format!("end group {} without a matching start", number),
            ));
        }
    };

    Ok(FieldSpan {
        number: number as u32,
        wire_type,
        range: offset..end,
        value,
    })
}

/// Walks a group body starting at `start`.
///
/// Returns the offset of the matching end-group tag and the offset just past
/// it.
fn skip_group(data: &[u8], start: usize, number: u64, depth: usize) -> Result<(usize, usize)> {
    if depth > MAX_GROUP_DEPTH {
        return Err(Error::invalid_wire_format(start, "groups nested too deeply"));
    }

    let mut position = start;
    loop {
        if position >= data.len() {
            return Err(Error::invalid_wire_format(
                position,
                format!("group {} is not terminated", number),
            ));
        }

        let (tag, tag_len) = decode_varint(&data[position..], position)?;
        if WireType::from_tag(tag, position)? == WireType::EndGroup {
            if tag >> 3 != number {
                return Err(Error::invalid_wire_format(
                    position,
                    format!("group {} closed by end group {}", number, tag >> 3),
                ));
            }
            return Ok((position, position + tag_len));
        }

        position = consume(data, position, depth)?.range.end;
    }
}

fn fixed(data: &[u8], start: usize, width: usize) -> Result<Range<usize>> {
    if data.len() < start + width {
        return Err(Error::invalid_wire_format(
            start,
            format!("not enough bytes for {}-byte fixed field", width),
        ));
    }
    Ok(start..start + width)
}

/// Iterator over the top-level fields of a message buffer.
///
/// Stops after the first framing error.
pub(crate) struct Fields<'a> {
    data: &'a [u8],
    position: usize,
    failed: bool,
}

pub(crate) fn fields(data: &[u8]) -> Fields<'_> {
    Fields {
        data,
        position: 0,
        failed: false,
    }
}

impl Iterator for Fields<'_> {
    type Item = Result<FieldSpan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }
        match consume_field(self.data, self.position) {
            Ok(span) => {
                self.position = span.range.end;
                Some(Ok(span))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
