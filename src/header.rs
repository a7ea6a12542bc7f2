//! The first decoding pass: the material name table and per submesh
//! metadata.

use binrw::io::{Cursor, Seek, SeekFrom};
use binrw::{BinRead, BinReaderExt};

use crate::layout::{self, RecordCounts};
use crate::{DecodeError, DecodeWarning};

/// Vertex stride assumed when a header carries an unknown stride marker.
pub const DEFAULT_VERTEX_STRIDE: u32 = 64;

/// Material name reported for indices past the end of the name table.
pub const UNKNOWN_MATERIAL: &str = "Unknown";

/// Metadata for one submesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmeshDescriptor {
    pub name: String,
    /// Index into the material name table.
    pub material_index: u32,
    /// The referenced material name, or [UNKNOWN_MATERIAL] if the index
    /// does not resolve.
    pub material_name: String,
    pub vertex_count: u32,
    pub face_count: u32,
    /// Byte distance between consecutive vertex records.
    pub vertex_stride: u32,
}

/// The decoded header section: everything before the vertex data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshHeader {
    pub counts: RecordCounts,
    /// Material names in file order.
    pub materials: Vec<String>,
    /// One descriptor per submesh, in file order.
    pub submeshes: Vec<SubmeshDescriptor>,
    /// Recoverable conditions found while decoding.
    pub warnings: Vec<DecodeWarning>,
    /// Offset of the first vertex record as computed by this pass.
    pub(crate) vertex_data_offset: u64,
}

/// One raw 368 byte submesh header record. Only a handful of fields are
/// understood; the pad attributes step over the rest.
#[derive(BinRead, Debug)]
struct RawSubmeshHeader {
    #[br(count = 48)]
    name: Vec<u8>,
    material_index: u32,
    #[br(pad_before = 168)]
    stride_marker: u32,
    #[br(pad_before = 128)]
    vertex_count: u32,
    #[br(pad_after = 8)]
    face_count: u32,
}

impl RawSubmeshHeader {
    fn into_descriptor(
        self,
        materials: &[String],
        warnings: &mut Vec<DecodeWarning>,
    ) -> SubmeshDescriptor {
        let name = fixed_name(&self.name);

        let vertex_stride = match self.stride_marker {
            0x40 => 68,
            0x3C => 64,
            0x38 => 60,
            marker => {
                warnings.push(DecodeWarning::UnknownStrideMarker {
                    submesh: name.clone(),
                    marker,
                });
                DEFAULT_VERTEX_STRIDE
            }
        };

        let material_name = match materials.get(self.material_index as usize) {
            Some(material) => material.clone(),
            None => {
                warnings.push(DecodeWarning::UnresolvedMaterialIndex {
                    submesh: name.clone(),
                    index: self.material_index,
                });
                UNKNOWN_MATERIAL.to_string()
            }
        };

        SubmeshDescriptor {
            name,
            material_index: self.material_index,
            material_name,
            vertex_count: self.vertex_count,
            face_count: self.face_count,
            vertex_stride,
        }
    }
}

impl MeshHeader {
    /// Decodes the header section of a complete SMB file.
    ///
    /// Unknown stride markers and unresolvable material indices are
    /// recorded as [warnings](Self::warnings) and never stop decoding.
    pub fn read(data: &[u8]) -> Result<Self, DecodeError> {
        let counts = RecordCounts::read(data)?;
        let mut warnings = Vec::new();

        let mut offset = layout::NAME_TABLE_OFFSET;
        let mut materials = Vec::new();
        for _ in 0..counts.materials {
            let (raw, next) = layout::split_name(data, offset)?;
            materials.push(String::from_utf8_lossy(raw).into_owned());
            offset = next;
        }

        offset += counts.tag_section_len();

        let header_block = u64::from(counts.submeshes) * layout::SUBMESH_HEADER_LEN;
        layout::check_range(data, offset, header_block)?;

        let mut reader = Cursor::new(data);
        let mut submeshes = Vec::with_capacity(counts.submeshes as usize);
        for _ in 0..counts.submeshes {
            reader.seek(SeekFrom::Start(offset))?;
            let raw = reader.read_le::<RawSubmeshHeader>()?;
            submeshes.push(raw.into_descriptor(&materials, &mut warnings));
            offset += layout::SUBMESH_HEADER_LEN;
        }

        Ok(Self {
            counts,
            materials,
            submeshes,
            warnings,
            vertex_data_offset: layout::align_up(offset, layout::VERTEX_DATA_ALIGN),
        })
    }
}

/// Interprets a fixed size name field, stopping at the first null byte.
fn fixed_name(raw: &[u8]) -> String {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..len]).into_owned()
}
