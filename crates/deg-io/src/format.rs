//! Header of the graph file.

use crate::{IoError, Result};
use deg_feature::ComponentType;
use std::path::Path;

/// Size of the encoded [`Header`] in bytes.
pub const HEADER_SIZE: usize = 8;

/// Fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub metric: u8,
    pub dims: u16,
    pub vertex_count: u32,
    pub edges_per_vertex: u8,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.metric;
        buf[1..3].copy_from_slice(&self.dims.to_le_bytes());
        buf[3..7].copy_from_slice(&self.vertex_count.to_le_bytes());
        buf[7] = self.edges_per_vertex;
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(IoError::Format(format!(
                "file too short for header: {} bytes",
                bytes.len()
            )));
        }
        Ok(Self {
            metric: bytes[0],
            dims: u16::from_le_bytes([bytes[1], bytes[2]]),
            vertex_count: u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
            edges_per_vertex: bytes[7],
        })
    }

    /// Bytes per vertex record without the feature.
    pub fn edge_record_size(&self) -> usize {
        self.edges_per_vertex as usize * 8 + 4
    }

    /// Feature size derived from the total file size.
    pub fn feature_byte_size(&self, file_size: usize) -> Result<usize> {
        let count = self.vertex_count as usize;
        if count == 0 {
            return Ok(0);
        }
        let records = file_size
            .checked_sub(HEADER_SIZE + self.edge_record_size() * count)
            .ok_or_else(|| {
                IoError::Format(format!(
                    "file of {} bytes too short for {} vertices",
                    file_size, count
                ))
            })?;
        if records % count != 0 {
            return Err(IoError::Format(format!(
                "{} feature bytes do not divide into {} vertices",
                records, count
            )));
        }
        Ok(records / count)
    }
}

/// Component type encoded in a file name like `graph.float.deg`.
pub fn component_from_path(path: &Path) -> Option<ComponentType> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.rsplit('.');
    parts.next()?;
    ComponentType::from_name(parts.next()?)
}
