//! # smb_lib
//!
//! smb_lib decodes SMB mesh container files, a proprietary binary format
//! for 3d model geometry, into plain Rust types suitable for conversion to
//! standard interchange formats.
//!
//! ## Features
//! - Decoding of material names, submesh metadata and interleaved
//!   vertex/normal/UV/index data, including the format's packed 16 bit
//!   texture coordinates
//! - Bounds checked reads with typed errors instead of undefined behavior
//!   on malformed files
//! - Recoverable oddities such as unknown stride markers or dangling
//!   material indices reported as warnings alongside the decoded data
//!
//! ## Getting Started
//! [MeshDocument::decode] runs both decoding passes over a buffered file.
//! The per-pass API ([MeshHeader::read], [extract_geometry]) stays public
//! for callers that want submesh metadata before committing to a full
//! decode.
/*!
```no_run
use smb_lib::MeshDocument;

# fn main() -> Result<(), smb_lib::DecodeError> {
let document = MeshDocument::from_file("model.smb")?;
for submesh in &document.submeshes {
    println!("{}: {} vertices", submesh.name, submesh.vertices.len());
}
# Ok(())
# }
```
 */
pub mod geometry;
pub mod header;
pub mod layout;

use std::fmt;
use std::fs;
use std::path::Path;

use binrw::io::{Read, Seek};
use binrw::{BinRead, BinResult, ReadOptions};
use thiserror::Error;

pub use geometry::{extract_geometry, SubmeshGeometry, Triangle, Vertex};
pub use header::{MeshHeader, SubmeshDescriptor, DEFAULT_VERTEX_STRIDE, UNKNOWN_MATERIAL};
pub use layout::RecordCounts;

/// Errors while decoding an SMB file.
///
/// Fatal conditions abort the whole conversion; no partial result is
/// produced. Recoverable conditions are reported as [DecodeWarning]
/// instead and never appear here.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The buffer ends before the fixed file header does.
    #[error("file of {len} bytes is too small to hold the 64 byte header")]
    TruncatedHeader { len: usize },

    /// A computed read range extends past the end of the buffer.
    #[error("read of {len} bytes at offset {offset:#x} runs past the end of the {available} byte buffer")]
    BufferOverrun {
        offset: u64,
        len: u64,
        available: usize,
    },

    #[error(transparent)]
    BinRead(#[from] binrw::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recoverable conditions noticed while decoding.
///
/// Warnings never stop a conversion. They accumulate in the order they
/// were found and are returned alongside the decoded data for the caller
/// to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// A submesh header carried a stride marker that matched no known
    /// value, so [DEFAULT_VERTEX_STRIDE] was assumed.
    UnknownStrideMarker { submesh: String, marker: u32 },

    /// A submesh referenced a material slot past the end of the name
    /// table, so [UNKNOWN_MATERIAL] was substituted.
    UnresolvedMaterialIndex { submesh: String, index: u32 },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::UnknownStrideMarker { submesh, marker } => write!(
                f,
                "unknown stride marker {:#x} in submesh \"{}\", assuming a stride of {}",
                marker, submesh, DEFAULT_VERTEX_STRIDE
            ),
            DecodeWarning::UnresolvedMaterialIndex { submesh, index } => write!(
                f,
                "material index {} in submesh \"{}\" is out of range, using {}",
                index, submesh, UNKNOWN_MATERIAL
            ),
        }
    }
}

/// A 16 bit floating point value packed into vertex records.
///
/// The format stores texture coordinates in a 1-5-10 sign, exponent and
/// fraction layout. A zero exponent selects the subnormal range scaled by
/// 2^-14 and an all ones exponent encodes infinities and NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Half(u16);

impl Half {
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn to_bits(self) -> u16 {
        self.0
    }

    /// Expands the packed value to a 32 bit float. Total over all 65536
    /// bit patterns.
    pub fn to_f32(self) -> f32 {
        let sign = if self.0 & 0x8000 != 0 { -1f32 } else { 1f32 };
        let exponent = (self.0 >> 10) & 0x1F;
        let fraction = self.0 & 0x03FF;
        match exponent {
            0 => sign * 2f32.powi(-14) * (f32::from(fraction) / 1024f32),
            0x1F if fraction != 0 => f32::NAN,
            0x1F => sign * f32::INFINITY,
            _ => {
                sign * 2f32.powi(i32::from(exponent) - 15)
                    * (1f32 + f32::from(fraction) / 1024f32)
            }
        }
    }
}

impl BinRead for Half {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        args: Self::Args,
    ) -> BinResult<Self> {
        let bits = u16::read_options(reader, options, args)?;
        Ok(Self(bits))
    }
}

impl From<Half> for f32 {
    fn from(value: Half) -> Self {
        value.to_f32()
    }
}

/// 2 contiguous floats for encoding UV data.
#[derive(BinRead, Debug, PartialEq, Clone, Copy)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Vector2 {
        Vector2 { x, y }
    }
}

/// 3 contiguous floats for encoding XYZ data.
#[derive(BinRead, Debug, PartialEq, Clone, Copy)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Vector3 {
        Vector3 { x, y, z }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }
}

/// A fully decoded SMB file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDocument {
    /// Material names in file order. Submeshes reference this table by
    /// index.
    pub materials: Vec<String>,
    /// Decoded geometry, one entry per submesh in file order.
    pub submeshes: Vec<SubmeshGeometry>,
    /// Recoverable conditions found while decoding.
    pub warnings: Vec<DecodeWarning>,
}

impl MeshDocument {
    /// Reads and decodes the file at `path`.
    /// The entire file is buffered before decoding begins.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        Self::decode(&fs::read(path)?)
    }

    /// Decodes a complete SMB file from `data`.
    ///
    /// Runs the header pass and the geometry pass in order. A fatal error
    /// in either pass fails the whole file; no partial document is
    /// returned.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let header = MeshHeader::read(data)?;
        let submeshes = geometry::extract_geometry(data, &header)?;
        Ok(Self {
            materials: header.materials,
            submeshes,
            warnings: header.warnings,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_file {
    //! Builds synthetic SMB buffers for tests.

    use half::f16;

    /// Fills unread regions so tests notice if they are ever decoded.
    const JUNK: u8 = 0xCD;

    pub(crate) struct SmbBuilder {
        collision_meshes: u32,
        tags: u32,
        materials: Vec<String>,
        submeshes: Vec<SubmeshData>,
    }

    pub(crate) struct SubmeshData {
        name: String,
        material_index: u32,
        stride_marker: u32,
        vertices: Vec<([f32; 3], [f32; 3], [f32; 2])>,
        faces: Vec<[u16; 3]>,
    }

    impl SubmeshData {
        pub(crate) fn vertex(
            mut self,
            position: [f32; 3],
            normal: [f32; 3],
            uv: [f32; 2],
        ) -> Self {
            self.vertices.push((position, normal, uv));
            self
        }

        pub(crate) fn face(mut self, v0: u16, v1: u16, v2: u16) -> Self {
            self.faces.push([v0, v1, v2]);
            self
        }

        fn stride(&self) -> usize {
            match self.stride_marker {
                0x40 => 68,
                0x38 => 60,
                _ => 64,
            }
        }
    }

    impl SmbBuilder {
        pub(crate) fn new() -> Self {
            Self {
                collision_meshes: 0,
                tags: 0,
                materials: Vec::new(),
                submeshes: Vec::new(),
            }
        }

        pub(crate) fn tags(mut self, count: u32) -> Self {
            self.tags = count;
            self
        }

        pub(crate) fn collision_meshes(mut self, count: u32) -> Self {
            self.collision_meshes = count;
            self
        }

        pub(crate) fn material(mut self, name: &str) -> Self {
            self.materials.push(name.to_string());
            self
        }

        pub(crate) fn submesh<F>(
            mut self,
            name: &str,
            material_index: u32,
            stride_marker: u32,
            configure: F,
        ) -> Self
        where
            F: FnOnce(SubmeshData) -> SubmeshData,
        {
            let submesh = SubmeshData {
                name: name.to_string(),
                material_index,
                stride_marker,
                vertices: Vec::new(),
                faces: Vec::new(),
            };
            self.submeshes.push(configure(submesh));
            self
        }

        pub(crate) fn build(&self) -> Vec<u8> {
            let mut data = vec![0u8; 40];
            data.extend_from_slice(&(self.submeshes.len() as u32).to_le_bytes());
            data.extend_from_slice(&self.collision_meshes.to_le_bytes());
            data.extend_from_slice(&self.tags.to_le_bytes());
            data.extend_from_slice(&(self.materials.len() as u32).to_le_bytes());
            data.extend_from_slice(&[0u8; 8]);

            for name in &self.materials {
                let padded = (name.len() + 1 + 3) / 4 * 4;
                data.extend_from_slice(name.as_bytes());
                data.extend(std::iter::repeat(0).take(padded - name.len()));
            }

            let section = if self.tags > 0 {
                self.tags as usize * 48 + 24
            } else if self.collision_meshes > 0 {
                self.collision_meshes as usize * 428 + 24
            } else {
                24
            };
            data.extend(std::iter::repeat(0).take(section));

            for submesh in &self.submeshes {
                let start = data.len();
                data.resize(start + 368, 0);
                let name = submesh.name.as_bytes();
                data[start..start + name.len()].copy_from_slice(name);
                data[start + 48..start + 52]
                    .copy_from_slice(&submesh.material_index.to_le_bytes());
                data[start + 220..start + 224]
                    .copy_from_slice(&submesh.stride_marker.to_le_bytes());
                data[start + 352..start + 356]
                    .copy_from_slice(&(submesh.vertices.len() as u32).to_le_bytes());
                data[start + 356..start + 360]
                    .copy_from_slice(&(submesh.faces.len() as u32).to_le_bytes());
            }

            while data.len() % 16 != 0 {
                data.push(0);
            }

            for submesh in &self.submeshes {
                for (position, normal, uv) in &submesh.vertices {
                    let start = data.len();
                    data.resize(start + submesh.stride(), JUNK);
                    let mut cursor = start;
                    for value in position.iter().chain(normal.iter()) {
                        data[cursor..cursor + 4].copy_from_slice(&value.to_le_bytes());
                        cursor += 4;
                    }
                    for value in uv {
                        let bits = f16::from_f32(*value).to_bits();
                        data[cursor..cursor + 2].copy_from_slice(&bits.to_le_bytes());
                        cursor += 2;
                    }
                }
                for face in &submesh.faces {
                    for index in face {
                        data.extend_from_slice(&index.to_le_bytes());
                    }
                }
            }

            data
        }
    }
}
