// Wed Oct 14 2026 - Alex

use crate::layout::node::{Category, LayoutResult, Location, Node};
use crate::layout::LayoutError;
use bytes::{Buf, BufMut, BytesMut};
use std::path::Path;

pub const ARTIFACT_VERSION: i32 = 1;

const MAX_DECODE_DEPTH: usize = 512;

/// Little-endian artifact: `i32` version, the file table (`u32` count and
/// varint prefixed strings), then the root node encoded recursively. A result
/// without a root stops after the file table.
pub struct LayoutSerializer;

impl LayoutSerializer {
    pub fn encode(result: &LayoutResult) -> BytesMut {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_i32_le(ARTIFACT_VERSION);
        buf.put_u32_le(result.files.len() as u32);
        for file in &result.files {
            put_string(&mut buf, file);
        }
        if let Some(root) = &result.root {
            put_node(&mut buf, root);
        }
        buf
    }

    pub fn write_to_file(result: &LayoutResult, path: &Path) -> Result<usize, LayoutError> {
        let encoded = Self::encode(result);
        std::fs::write(path, &encoded).map_err(|source| LayoutError::SerializationFailure {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote {} bytes to {}", encoded.len(), path.display());
        Ok(encoded.len())
    }

    pub fn decode(data: &[u8]) -> Result<LayoutResult, LayoutError> {
        let mut reader = ArtifactReader { buf: data };
        let version = reader.i32()?;
        if version != ARTIFACT_VERSION {
            return Err(malformed(format!("unsupported version {}", version)));
        }
        let file_count = reader.u32()?;
        let mut files = Vec::new();
        for _ in 0..file_count {
            files.push(reader.string()?);
        }
        let root = if reader.buf.has_remaining() {
            Some(reader.node(0)?)
        } else {
            None
        };
        if reader.buf.has_remaining() {
            return Err(malformed(format!("{} trailing bytes", reader.buf.remaining())));
        }
        Ok(LayoutResult { root, files })
    }

    pub fn read_from_file(path: &Path) -> Result<LayoutResult, LayoutError> {
        let data = std::fs::read(path)?;
        Self::decode(&data)
    }
}

pub fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    put_varint(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

fn put_location(buf: &mut BytesMut, location: &Location) {
    if !location.is_valid() {
        buf.put_i32_le(location.file_index.min(-1));
        return;
    }
    buf.put_i32_le(location.file_index);
    buf.put_u32_le(location.line);
    buf.put_u32_le(location.column);
}

fn put_node(buf: &mut BytesMut, node: &Node) {
    put_string(buf, &node.type_name);
    put_string(buf, &node.member_name);
    buf.put_i64_le(node.offset);
    buf.put_i64_le(node.size);
    buf.put_i64_le(node.align);
    buf.put_u8(node.category.as_u8());
    put_location(buf, &node.type_location);
    put_location(buf, &node.field_location);
    buf.put_u32_le(node.children.len() as u32);
    for child in &node.children {
        put_node(buf, child);
    }
}

fn malformed(reason: String) -> LayoutError {
    LayoutError::MalformedArtifact(reason)
}

struct ArtifactReader<'a> {
    buf: &'a [u8],
}

impl<'a> ArtifactReader<'a> {
    fn need(&self, len: usize) -> Result<(), LayoutError> {
        if self.buf.remaining() < len {
            return Err(malformed(format!(
                "needed {} bytes, {} left",
                len,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, LayoutError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn i32(&mut self) -> Result<i32, LayoutError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn u32(&mut self) -> Result<u32, LayoutError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn i64(&mut self) -> Result<i64, LayoutError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    fn varint(&mut self) -> Result<u64, LayoutError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(malformed("varint longer than 64 bits".to_string()))
    }

    fn string(&mut self) -> Result<String, LayoutError> {
        let len = self.varint()? as usize;
        self.need(len)?;
        let data: &'a [u8] = self.buf;
        let (head, tail) = data.split_at(len);
        self.buf = tail;
        String::from_utf8(head.to_vec()).map_err(|e| malformed(e.to_string()))
    }

    fn location(&mut self) -> Result<Location, LayoutError> {
        let file_index = self.i32()?;
        if file_index < 0 {
            return Ok(Location::invalid());
        }
        let line = self.u32()?;
        let column = self.u32()?;
        Ok(Location::new(file_index, line, column))
    }

    fn node(&mut self, depth: usize) -> Result<Node, LayoutError> {
        if depth > MAX_DECODE_DEPTH {
            return Err(malformed("node nesting too deep".to_string()));
        }
        let type_name = self.string()?;
        let member_name = self.string()?;
        let offset = self.i64()?;
        let size = self.i64()?;
        let align = self.i64()?;
        let raw_category = self.u8()?;
        let category =
            Category::from_u8(raw_category).ok_or_else(|| malformed(format!("unknown category {}", raw_category)))?;
        let type_location = self.location()?;
        let field_location = self.location()?;
        let child_count = self.u32()?;
        let mut children = Vec::new();
        for _ in 0..child_count {
            children.push(self.node(depth + 1)?);
        }
        Ok(Node {
            type_name,
            member_name,
            offset,
            size,
            align,
            category,
            type_location,
            field_location,
            children,
        })
    }
}
