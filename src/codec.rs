use std::io::{self, Read, Write};

use crate::{
    error::{CodecError, PublishError},
    record::{MetricRecord, MetricValue, Namespace, NamespaceSegment, Tags},
    BINARY_CONTENT_TYPE,
};

const SEGMENT_LITERAL: u8 = 0;
const SEGMENT_DYNAMIC: u8 = 1;

const VALUE_INT: u8 = 0;
const VALUE_UINT: u8 = 1;
const VALUE_FLOAT: u8 = 2;
const VALUE_BOOL: u8 = 3;
const VALUE_STR: u8 = 4;

/// Upper bound on speculative allocation driven by counts read off the wire
const MAX_PREALLOC: usize = 1024;

/// Decodes a whole batch. Nothing is returned unless every record decodes.
pub fn decode(content_type: &str, content: &[u8]) -> Result<Vec<MetricRecord>, PublishError> {
    if content_type != BINARY_CONTENT_TYPE {
        return Err(PublishError::UnsupportedFormat {
            content_type: content_type.to_owned(),
        });
    }
    Ok(decode_records(content)?)
}

pub fn encode_records(records: &[MetricRecord]) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![];
    let count = u32::try_from(records.len()).map_err(|_| CodecError::TooLong {
        len: records.len(),
    })?;
    buf.write_all(&count.to_be_bytes())?;
    for record in records {
        encode_record(&mut buf, record)?;
    }
    Ok(buf)
}
pub fn decode_records(content: &[u8]) -> Result<Vec<MetricRecord>, CodecError> {
    let mut rdr = io::Cursor::new(content);
    let count = read_u32(&mut rdr)?;
    let mut records = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
    for _ in 0..count {
        records.push(decode_record(&mut rdr)?);
    }
    let trailing = content.len() - rdr.position() as usize;
    if trailing != 0 {
        return Err(CodecError::TrailingBytes(trailing));
    }
    Ok(records)
}

pub fn encode_record(wtr: &mut impl Write, record: &MetricRecord) -> Result<(), CodecError> {
    let segments = record.namespace.segments();
    wtr.write_all(&encode_count(segments.len())?)?;
    for segment in segments {
        match segment {
            NamespaceSegment::Literal(text) => {
                wtr.write_all(&[SEGMENT_LITERAL])?;
                encode_str(wtr, text)?;
            }
            NamespaceSegment::Dynamic { name, value } => {
                wtr.write_all(&[SEGMENT_DYNAMIC])?;
                encode_str(wtr, name)?;
                encode_str(wtr, value)?;
            }
        }
    }
    wtr.write_all(&encode_count(record.tags.len())?)?;
    for (key, value) in &record.tags {
        encode_str(wtr, key)?;
        encode_str(wtr, value)?;
    }
    encode_value(wtr, &record.value)?;
    wtr.write_all(&record.timestamp.to_be_bytes())?;
    Ok(())
}
pub fn decode_record(rdr: &mut impl Read) -> Result<MetricRecord, CodecError> {
    let segment_count = read_u16(rdr)?;
    let mut segments = Vec::with_capacity(usize::from(segment_count).min(MAX_PREALLOC));
    for _ in 0..segment_count {
        let segment = match read_u8(rdr)? {
            SEGMENT_LITERAL => NamespaceSegment::Literal(decode_str(rdr)?),
            SEGMENT_DYNAMIC => {
                let name = decode_str(rdr)?;
                let value = decode_str(rdr)?;
                NamespaceSegment::Dynamic { name, value }
            }
            kind => return Err(CodecError::UnknownSegmentKind(kind)),
        };
        segments.push(segment);
    }
    let tag_count = read_u16(rdr)?;
    let mut tags = Tags::new();
    for _ in 0..tag_count {
        let key = decode_str(rdr)?;
        let value = decode_str(rdr)?;
        tags.insert(key, value);
    }
    let value = decode_value(rdr)?;
    let timestamp = read_u64(rdr)?;
    Ok(MetricRecord {
        namespace: Namespace::new(segments),
        tags,
        value,
        timestamp,
    })
}

fn encode_value(wtr: &mut impl Write, value: &MetricValue) -> Result<(), CodecError> {
    match value {
        MetricValue::Int(v) => {
            wtr.write_all(&[VALUE_INT])?;
            wtr.write_all(&v.to_be_bytes())?;
        }
        MetricValue::Uint(v) => {
            wtr.write_all(&[VALUE_UINT])?;
            wtr.write_all(&v.to_be_bytes())?;
        }
        MetricValue::Float(v) => {
            wtr.write_all(&[VALUE_FLOAT])?;
            wtr.write_all(&v.to_be_bytes())?;
        }
        MetricValue::Bool(v) => {
            wtr.write_all(&[VALUE_BOOL, u8::from(*v)])?;
        }
        MetricValue::Str(v) => {
            wtr.write_all(&[VALUE_STR])?;
            encode_str(wtr, v)?;
        }
    }
    Ok(())
}
fn decode_value(rdr: &mut impl Read) -> Result<MetricValue, CodecError> {
    let value = match read_u8(rdr)? {
        VALUE_INT => MetricValue::Int(i64::from_be_bytes(read_array(rdr)?)),
        VALUE_UINT => MetricValue::Uint(read_u64(rdr)?),
        VALUE_FLOAT => MetricValue::Float(f64::from_be_bytes(read_array(rdr)?)),
        VALUE_BOOL => MetricValue::Bool(read_u8(rdr)? != 0),
        VALUE_STR => MetricValue::Str(decode_str(rdr)?),
        kind => return Err(CodecError::UnknownValueKind(kind)),
    };
    Ok(value)
}

pub fn encode_str(wtr: &mut impl Write, s: &str) -> Result<(), CodecError> {
    wtr.write_all(&encode_count(s.len())?)?;
    wtr.write_all(s.as_bytes())?;
    Ok(())
}
pub fn decode_str(rdr: &mut impl Read) -> Result<String, CodecError> {
    let len = read_u16(rdr)?;
    let mut buf = vec![0; usize::from(len)];
    rdr.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn encode_count(count: usize) -> Result<[u8; 2], CodecError> {
    let count = u16::try_from(count).map_err(|_| CodecError::TooLong { len: count })?;
    Ok(count.to_be_bytes())
}

fn read_array<const N: usize>(rdr: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0; N];
    rdr.read_exact(&mut buf)?;
    Ok(buf)
}
fn read_u8(rdr: &mut impl Read) -> io::Result<u8> {
    let [byte] = read_array(rdr)?;
    Ok(byte)
}
fn read_u16(rdr: &mut impl Read) -> io::Result<u16> {
    Ok(u16::from_be_bytes(read_array(rdr)?))
}
fn read_u32(rdr: &mut impl Read) -> io::Result<u32> {
    Ok(u32::from_be_bytes(read_array(rdr)?))
}
fn read_u64(rdr: &mut impl Read) -> io::Result<u64> {
    Ok(u64::from_be_bytes(read_array(rdr)?))
}
