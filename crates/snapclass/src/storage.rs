//! Knowledge file reader/writer: persists the store across restarts.
//!
//! Layout: fixed 64-byte little-endian header (magic, version, counts,
//! timestamps, payload length) followed by a JSON payload of the store.

use std::io::{Read, Write};
use std::path::Path;

use crate::types::{ClassifyError, ClassifyResult, KnowledgeStore};

/// Magic bytes: "SNAP"
const SNAP_MAGIC: u32 = 0x534E_4150;

/// Current format version.
const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 64;

/// Writer for knowledge files.
pub struct KnowledgeWriter;

/// Reader for knowledge files.
pub struct KnowledgeReader;

impl KnowledgeWriter {
    /// Write a knowledge store to a file, creating parent directories.
    pub fn write_to_file(store: &KnowledgeStore, path: &Path) -> ClassifyResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(path)?;
        Self::write_to(store, &mut file)
    }

    /// Write a knowledge store to any writer.
    pub fn write_to<W: Write>(store: &KnowledgeStore, writer: &mut W) -> ClassifyResult<()> {
        let payload = serde_json::to_vec(store)
            .map_err(|e| ClassifyError::Storage(format!("serialization failed: {e}")))?;

        let mut header = [0u8; HEADER_SIZE];
        write_u32(&mut header[0..4], SNAP_MAGIC);
        write_u16(&mut header[4..6], FORMAT_VERSION);
        write_u16(&mut header[6..8], 0); // flags
        write_u64(&mut header[8..16], store.label_count() as u64);
        write_u64(&mut header[16..24], store.example_count() as u64);
        write_u64(&mut header[24..32], store.created_at);
        write_u64(&mut header[32..40], store.updated_at);
        write_u64(&mut header[40..48], payload.len() as u64);

        writer.write_all(&header)?;
        writer.write_all(&payload)?;
        Ok(())
    }
}

impl KnowledgeReader {
    /// Read a knowledge store from a file.
    pub fn read_from_file(path: &Path) -> ClassifyResult<KnowledgeStore> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }

    /// Read a knowledge store from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> ClassifyResult<KnowledgeStore> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let magic = read_u32(&header[0..4]);
        if magic != SNAP_MAGIC {
            return Err(ClassifyError::Storage(format!(
                "invalid magic: expected 0x{SNAP_MAGIC:08X}, got 0x{magic:08X}"
            )));
        }

        let version = read_u16(&header[4..6]);
        if version != FORMAT_VERSION {
            return Err(ClassifyError::Storage(format!(
                "unsupported version: {version}"
            )));
        }

        let payload_len = read_u64(&header[40..48]) as usize;
        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        let store: KnowledgeStore = serde_json::from_slice(&payload)
            .map_err(|e| ClassifyError::Storage(format!("deserialization failed: {e}")))?;
        Ok(store)
    }
}

// Little-endian byte helpers
fn write_u16(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_le_bytes());
}
fn write_u32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}
fn write_u64(buf: &mut [u8], val: u64) {
    buf[..8].copy_from_slice(&val.to_le_bytes());
}
fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}
fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}
fn read_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}
