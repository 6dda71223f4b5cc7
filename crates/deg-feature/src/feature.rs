//! Feature vectors.
//!
//! A [`FeatureVector`] is an immutable array of primitive components shared
//! behind an `Arc`, so cloning a feature into a graph vertex, a queued task or
//! a search request never copies the component data.

use crate::{FeatureError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Element type of a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    /// Unsigned 8 bit integer components.
    Byte,
    /// Signed 16 bit integer components.
    Short,
    /// Signed 32 bit integer components.
    Int,
    /// 32 bit float components.
    Float,
    /// 64 bit float components.
    Double,
    /// Opaque bytes, interpreted only by a custom [`FeatureSpace`](crate::FeatureSpace).
    Custom,
}

impl ComponentType {
    /// Size of a single component in bytes, `None` for custom features.
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            Self::Byte => Some(1),
            Self::Short => Some(2),
            Self::Int | Self::Float => Some(4),
            Self::Double => Some(8),
            Self::Custom => None,
        }
    }

    /// Name used in graph file names (`graph.float.deg`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Custom => "custom",
        }
    }

    /// Parse a component name as produced by [`ComponentType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "byte" | "u8" => Some(Self::Byte),
            "short" | "i16" => Some(Self::Short),
            "int" | "i32" => Some(Self::Int),
            "float" | "f32" => Some(Self::Float),
            "double" | "f64" => Some(Self::Double),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Whether the components are a primitive type known to this crate.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Custom)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Component storage of a feature vector.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureData {
    Byte(Arc<[u8]>),
    Short(Arc<[i16]>),
    Int(Arc<[i32]>),
    Float(Arc<[f32]>),
    Double(Arc<[f64]>),
    Custom { dims: usize, bytes: Bytes },
}

/// An immutable feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    data: FeatureData,
}

impl FeatureVector {
    /// Wrap existing component storage.
    pub fn new(data: FeatureData) -> Self {
        Self { data }
    }

    /// Create an opaque feature with `dims` logical dimensions.
    pub fn custom(dims: usize, bytes: impl Into<Bytes>) -> Self {
        Self {
            data: FeatureData::Custom {
                dims,
                bytes: bytes.into(),
            },
        }
    }

    /// Component storage.
    pub fn data(&self) -> &FeatureData {
        &self.data
    }

    /// Number of components.
    pub fn dims(&self) -> usize {
        match &self.data {
            FeatureData::Byte(v) => v.len(),
            FeatureData::Short(v) => v.len(),
            FeatureData::Int(v) => v.len(),
            FeatureData::Float(v) => v.len(),
            FeatureData::Double(v) => v.len(),
            FeatureData::Custom { dims, .. } => *dims,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match &self.data {
            FeatureData::Byte(_) => ComponentType::Byte,
            FeatureData::Short(_) => ComponentType::Short,
            FeatureData::Int(_) => ComponentType::Int,
            FeatureData::Float(_) => ComponentType::Float,
            FeatureData::Double(_) => ComponentType::Double,
            FeatureData::Custom { .. } => ComponentType::Custom,
        }
    }

    /// Size of the serialized feature in bytes.
    pub fn byte_size(&self) -> usize {
        match &self.data {
            FeatureData::Custom { bytes, .. } => bytes.len(),
            _ => self.dims() * self.component_type().byte_size().unwrap_or(0),
        }
    }

    /// Float components, if this is a float feature.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            FeatureData::Float(v) => Some(&v[..]),
            _ => None,
        }
    }

    /// Returns the index of the first NaN or infinite component.
    pub fn first_non_finite(&self) -> Option<usize> {
        match &self.data {
            FeatureData::Float(v) => v.iter().position(|x| !x.is_finite()),
            FeatureData::Double(v) => v.iter().position(|x| !x.is_finite()),
            _ => None,
        }
    }

    /// Append the little-endian encoding of the components to `out`.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        out.reserve(self.byte_size());
        match &self.data {
            FeatureData::Byte(v) => out.extend_from_slice(v),
            FeatureData::Short(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            FeatureData::Int(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            FeatureData::Float(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            FeatureData::Double(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes()))
            }
            FeatureData::Custom { bytes, .. } => out.extend_from_slice(bytes),
        }
    }

    /// Decode a little-endian feature of the given component type.
    ///
    /// For primitive components `bytes` must hold exactly
    /// `dims * component_size` bytes; custom features take the slice as is.
    pub fn read_le(component: ComponentType, dims: usize, bytes: &[u8]) -> Result<Self> {
        if let Some(size) = component.byte_size() {
            if bytes.len() != dims * size {
                return Err(FeatureError::InvalidFeature(format!(
                    "expected {} bytes for {} {} components, got {}",
                    dims * size,
                    dims,
                    component,
                    bytes.len()
                )));
            }
        }

        let data = match component {
            ComponentType::Byte => FeatureData::Byte(Arc::from(bytes)),
            ComponentType::Short => FeatureData::Short(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            ComponentType::Int => FeatureData::Int(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ComponentType::Float => FeatureData::Float(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ComponentType::Double => FeatureData::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(c);
                        f64::from_le_bytes(buf)
                    })
                    .collect(),
            ),
            ComponentType::Custom => FeatureData::Custom {
                dims,
                bytes: Bytes::copy_from_slice(bytes),
            },
        };

        Ok(Self { data })
    }
}

impl From<Vec<u8>> for FeatureVector {
    fn from(v: Vec<u8>) -> Self {
        Self::new(FeatureData::Byte(v.into()))
    }
}

impl From<Vec<i16>> for FeatureVector {
    fn from(v: Vec<i16>) -> Self {
        Self::new(FeatureData::Short(v.into()))
    }
}

impl From<Vec<i32>> for FeatureVector {
    fn from(v: Vec<i32>) -> Self {
        Self::new(FeatureData::Int(v.into()))
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(v: Vec<f32>) -> Self {
        Self::new(FeatureData::Float(v.into()))
    }
}

impl From<&[f32]> for FeatureVector {
    fn from(v: &[f32]) -> Self {
        Self::new(FeatureData::Float(Arc::from(v)))
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(v: Vec<f64>) -> Self {
        Self::new(FeatureData::Double(v.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_and_byte_size() {
        let f = FeatureVector::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(f.dims(), 3);
        assert_eq!(f.component_type(), ComponentType::Float);
        assert_eq!(f.byte_size(), 12);

        let s = FeatureVector::from(vec![1i16, -2]);
        assert_eq!(s.byte_size(), 4);

        let c = FeatureVector::custom(8, vec![0u8; 3]);
        assert_eq!(c.dims(), 8);
        assert_eq!(c.byte_size(), 3);
    }

    #[test]
    fn test_little_endian_layout() {
        let f = FeatureVector::from(vec![1.0f32, -2.5]);
        let mut out = Vec::new();
        f.write_le(&mut out);

        assert_eq!(&out[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&out[4..8], &(-2.5f32).to_le_bytes());

        let back = FeatureVector::read_le(ComponentType::Float, 2, &out).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_read_double_and_short() {
        let mut out = Vec::new();
        FeatureVector::from(vec![0.5f64, 7.25]).write_le(&mut out);
        let back = FeatureVector::read_le(ComponentType::Double, 2, &out).unwrap();
        assert_eq!(back.dims(), 2);
        assert!(matches!(back.data(), FeatureData::Double(v) if v[1] == 7.25));

        let mut out = Vec::new();
        FeatureVector::from(vec![-3i16]).write_le(&mut out);
        let back = FeatureVector::read_le(ComponentType::Short, 1, &out).unwrap();
        assert!(matches!(back.data(), FeatureData::Short(v) if v[0] == -3));
    }

    #[test]
    fn test_read_wrong_length() {
        let result = FeatureVector::read_le(ComponentType::Float, 3, &[0u8; 8]);
        assert!(matches!(result, Err(FeatureError::InvalidFeature(_))));
    }

    #[test]
    fn test_first_non_finite() {
        assert_eq!(FeatureVector::from(vec![1.0f32, f32::NAN]).first_non_finite(), Some(1));
        assert_eq!(FeatureVector::from(vec![1.0f32, 2.0]).first_non_finite(), None);
        assert_eq!(FeatureVector::from(vec![1u8]).first_non_finite(), None);
    }

    #[test]
    fn test_component_names() {
        for c in [
            ComponentType::Byte,
            ComponentType::Short,
            ComponentType::Int,
            ComponentType::Float,
            ComponentType::Double,
            ComponentType::Custom,
        ] {
            assert_eq!(ComponentType::from_name(c.name()), Some(c));
        }
        assert_eq!(ComponentType::from_name("FLOAT"), Some(ComponentType::Float));
        assert_eq!(ComponentType::from_name("half"), None);
    }
}
