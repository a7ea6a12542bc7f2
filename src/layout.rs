//! Offset arithmetic for the variable length file layout.
//!
//! An SMB file is a sequence of records whose positions depend on every
//! record before them:
//!
//! ```text
//! [40 bytes]  preamble (opaque)
//! [16 bytes]  record counts: submeshes, collision meshes, tags, materials
//! [8 bytes]   opaque
//! [variable]  material name table, each name padded to 4 bytes
//! [variable]  tag or collision section (mutually exclusive) + 24 byte trailer
//! [368 × n]   submesh headers
//! [padding]   up to the next 16 byte boundary
//! [variable]  interleaved vertex records and index triples per submesh
//! ```
//!
//! The format carries no marker for the start of the vertex data, so both
//! decoding passes have to land on the same offset by arithmetic alone.
//! Every offset either pass uses is derived from the functions here.

use binrw::io::{Cursor, Seek, SeekFrom};
use binrw::{BinRead, BinReaderExt};

use crate::DecodeError;

/// Fixed bytes before the record counts. Opaque to the decoder.
pub(crate) const PREAMBLE_LEN: u64 = 40;

/// Smallest buffer that can hold the fixed header.
pub(crate) const HEADER_MIN_LEN: usize = 64;

/// Start of the material name table: the preamble, the four counts and an
/// opaque 8 byte field.
pub(crate) const NAME_TABLE_OFFSET: u64 = 64;

/// Size of one submesh header record.
pub(crate) const SUBMESH_HEADER_LEN: u64 = 368;

/// Bytes of one vertex record that hold data. The stride may be larger;
/// the trailing bytes are padding and are never read.
pub(crate) const VERTEX_DATA_LEN: u64 = 28;

/// Size of one triangle index record.
pub(crate) const TRIANGLE_LEN: u64 = 6;

/// Alignment of the first vertex record.
pub(crate) const VERTEX_DATA_ALIGN: u64 = 16;

const TAG_LEN: u64 = 48;
const COLLISION_MESH_LEN: u64 = 428;
const SECTION_TRAILER_LEN: u64 = 24;

/// The per-record-type element counts stored after the preamble.
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCounts {
    pub submeshes: u32,
    pub collision_meshes: u32,
    pub tags: u32,
    pub materials: u32,
}

impl RecordCounts {
    /// Reads the counts from their fixed position after the preamble.
    pub fn read(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_MIN_LEN {
            return Err(DecodeError::TruncatedHeader { len: data.len() });
        }
        let mut reader = Cursor::new(data);
        reader.seek(SeekFrom::Start(PREAMBLE_LEN))?;
        Ok(reader.read_le::<RecordCounts>()?)
    }

    /// Size in bytes of the section between the material names and the
    /// submesh headers. Tag and collision data are mutually exclusive in
    /// this format; tags win if a file sets both counts.
    pub fn tag_section_len(&self) -> u64 {
        if self.tags > 0 {
            u64::from(self.tags) * TAG_LEN + SECTION_TRAILER_LEN
        } else if self.collision_meshes > 0 {
            u64::from(self.collision_meshes) * COLLISION_MESH_LEN + SECTION_TRAILER_LEN
        } else {
            SECTION_TRAILER_LEN
        }
    }
}

/// Returns the name starting at `offset` and the offset of the record
/// after it.
///
/// Stored names are null terminated and occupy a multiple of 4 bytes,
/// terminator included.
pub(crate) fn split_name(data: &[u8], offset: u64) -> Result<(&[u8], u64), DecodeError> {
    let start = offset as usize;
    let len = data
        .get(start..)
        .and_then(|rest| rest.iter().position(|&b| b == 0))
        .ok_or(DecodeError::BufferOverrun {
            offset,
            len: (data.len() as u64).saturating_sub(offset) + 1,
            available: data.len(),
        })?;
    let padded = padded_name_len(len as u64 + 1);
    check_range(data, offset, padded)?;
    Ok((&data[start..start + len], offset + padded))
}

/// Stored length of a name whose raw length, terminator included, is `len`.
pub(crate) fn padded_name_len(len: u64) -> u64 {
    (len + 3) / 4 * 4
}

/// Rounds `offset` up to the next multiple of `align`.
pub(crate) fn align_up(offset: u64, align: u64) -> u64 {
    (offset + align - 1) / align * align
}

/// Fails with [DecodeError::BufferOverrun] unless `len` bytes at `offset`
/// lie within `data`.
pub(crate) fn check_range(data: &[u8], offset: u64, len: u64) -> Result<(), DecodeError> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() as u64 => Ok(()),
        _ => Err(DecodeError::BufferOverrun {
            offset,
            len,
            available: data.len(),
        }),
    }
}

/// Offset of the first vertex record: past the name table, the tag or
/// collision section and the submesh headers, rounded up to 16 bytes.
pub fn vertex_data_offset(data: &[u8]) -> Result<u64, DecodeError> {
    let counts = RecordCounts::read(data)?;
    let mut offset = NAME_TABLE_OFFSET;
    for _ in 0..counts.materials {
        let (_, next) = split_name(data, offset)?;
        offset = next;
    }
    offset += counts.tag_section_len();
    offset += u64::from(counts.submeshes) * SUBMESH_HEADER_LEN;
    Ok(align_up(offset, VERTEX_DATA_ALIGN))
}
