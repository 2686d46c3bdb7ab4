//! Base64 VLQ codec for the `mappings` field of version 3 source maps

use crate::SourceMapError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const CONTINUATION_BIT: u32 = 1 << 5;
const VALUE_MASK: u32 = CONTINUATION_BIT - 1;

/// A position in one of the map's sources
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Original {
    pub source: u32,
    pub line: u32,
    pub column: u32,
    pub name: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub generated_column: u32,
    pub original: Option<Original>,
}

fn digit(c: u8) -> Result<u32, SourceMapError> {
    match c {
        b'A'..=b'Z' => Ok(u32::from(c - b'A')),
        b'a'..=b'z' => Ok(u32::from(c - b'a') + 26),
        b'0'..=b'9' => Ok(u32::from(c - b'0') + 52),
        b'+' => Ok(62),
        b'/' => Ok(63),
        _ => Err(SourceMapError::InvalidBase64(char::from(c))),
    }
}

fn decode_value(bytes: &[u8], pos: &mut usize) -> Result<i64, SourceMapError> {
    let mut result: i64 = 0;
    let mut shift = 0_u32;

    loop {
        let Some(&c) = bytes.get(*pos) else {
            return Err(SourceMapError::UnterminatedVlq);
        };
        *pos += 1;

        let d = digit(c)?;
        if shift > 60 {
            return Err(SourceMapError::VlqOverflow);
        }
        result += i64::from(d & VALUE_MASK) << shift;
        shift += 5;

        if d & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let negative = result & 1 == 1;
    result >>= 1;

    Ok(if negative { -result } else { result })
}

fn apply_delta(base: &mut i64, delta: i64) -> Result<u32, SourceMapError> {
    *base += delta;
    u32::try_from(*base).map_err(|_| SourceMapError::NegativeIndex)
}

/// Decode `mappings` into one list of segments per generated line
pub(crate) fn decode(mappings: &str) -> Result<Vec<Vec<Segment>>, SourceMapError> {
    let bytes = mappings.as_bytes();
    let mut lines = vec![Vec::new()];

    let mut source = 0_i64;
    let mut line = 0_i64;
    let mut column = 0_i64;
    let mut name = 0_i64;

    let mut pos = 0;
    let mut generated_column = 0_i64;

    while pos < bytes.len() {
        match bytes[pos] {
            b';' => {
                lines.push(Vec::new());
                generated_column = 0;
                pos += 1;
                continue;
            }
            b',' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let mut fields = Vec::with_capacity(5);
        while pos < bytes.len() && bytes[pos] != b',' && bytes[pos] != b';' {
            fields.push(decode_value(bytes, &mut pos)?);
        }

        let segment = match fields[..] {
            [col] => Segment {
                generated_column: apply_delta(&mut generated_column, col)?,
                original: None,
            },
            [col, src, src_line, src_col] | [col, src, src_line, src_col, _] => Segment {
                generated_column: apply_delta(&mut generated_column, col)?,
                original: Some(Original {
                    source: apply_delta(&mut source, src)?,
                    line: apply_delta(&mut line, src_line)?,
                    column: apply_delta(&mut column, src_col)?,
                    name: match fields.get(4) {
                        Some(&n) => Some(apply_delta(&mut name, n)?),
                        None => None,
                    },
                }),
            },
            _ => return Err(SourceMapError::InvalidSegment(fields.len())),
        };

        if let Some(last) = lines.last_mut() {
            last.push(segment);
        }
    }

    Ok(lines)
}

fn encode_value(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut d = (vlq & i64::from(VALUE_MASK)) as usize;
        vlq >>= 5;
        if vlq > 0 {
            d |= CONTINUATION_BIT as usize;
        }
        out.push(char::from(ALPHABET[d]));

        if vlq == 0 {
            break;
        }
    }
}

pub(crate) fn encode(lines: &[Vec<Segment>]) -> String {
    let mut out = String::new();

    let mut source = 0_i64;
    let mut line = 0_i64;
    let mut column = 0_i64;
    let mut name = 0_i64;

    for (idx, segments) in lines.iter().enumerate() {
        if idx > 0 {
            out.push(';');
        }

        let mut generated_column = 0_i64;

        for (seg_idx, segment) in segments.iter().enumerate() {
            if seg_idx > 0 {
                out.push(',');
            }

            encode_value(i64::from(segment.generated_column) - generated_column, &mut out);
            generated_column = i64::from(segment.generated_column);

            if let Some(original) = segment.original {
                encode_value(i64::from(original.source) - source, &mut out);
                source = i64::from(original.source);
                encode_value(i64::from(original.line) - line, &mut out);
                line = i64::from(original.line);
                encode_value(i64::from(original.column) - column, &mut out);
                column = i64::from(original.column);

                if let Some(n) = original.name {
                    encode_value(i64::from(n) - name, &mut out);
                    name = i64::from(n);
                }
            }
        }
    }

    out
}
