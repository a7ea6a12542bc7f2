//! The second decoding pass: vertex, normal, UV and index data for each
//! submesh.

use binrw::io::{Cursor, Seek, SeekFrom};
use binrw::{BinRead, BinReaderExt};

use crate::header::{MeshHeader, SubmeshDescriptor};
use crate::layout;
use crate::{DecodeError, Half, Vector2, Vector3};

/// One decoded vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub uv: Vector2,
}

/// Three indices into the owning submesh's vertex list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub v0: u16,
    pub v1: u16,
    pub v2: u16,
}

/// The decoded geometry of one submesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmeshGeometry {
    pub name: String,
    pub material_name: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

/// The data bytes at the start of one vertex record.
#[derive(BinRead, Debug)]
struct RawVertex {
    position: Vector3,
    normal: Vector3,
    u: Half,
    v: Half,
}

impl From<RawVertex> for Vertex {
    // The file stores meshes with mirrored handedness, so X is negated on
    // positions and normals.
    fn from(raw: RawVertex) -> Self {
        Self {
            position: Vector3::new(-raw.position.x, raw.position.y, raw.position.z),
            normal: Vector3::new(-raw.normal.x, raw.normal.y, raw.normal.z),
            uv: Vector2::new(raw.u.to_f32(), raw.v.to_f32()),
        }
    }
}

#[derive(BinRead, Debug)]
struct RawTriangle {
    v0: u16,
    v1: u16,
    v2: u16,
}

impl From<RawTriangle> for Triangle {
    // Negating X mirrors the mesh, which inverts triangle winding. Swapping
    // the last two indices restores outward facing normals.
    fn from(raw: RawTriangle) -> Self {
        Self {
            v0: raw.v0,
            v1: raw.v2,
            v2: raw.v1,
        }
    }
}

/// Decodes the geometry for every submesh described by `header`.
///
/// `header` must be the output of [MeshHeader::read] over the same `data`.
/// The vertex data offset is recomputed from the record counts rather than
/// taken from the header pass; both walks derive it from [crate::layout],
/// so they agree by construction.
///
/// Any out of bounds read fails the whole file with
/// [DecodeError::BufferOverrun]; a partial list of submeshes is never
/// returned.
pub fn extract_geometry(
    data: &[u8],
    header: &MeshHeader,
) -> Result<Vec<SubmeshGeometry>, DecodeError> {
    let mut offset = layout::vertex_data_offset(data)?;
    let mut submeshes = Vec::with_capacity(header.submeshes.len());
    for descriptor in &header.submeshes {
        let vertices = read_vertices(data, offset, descriptor)?;
        offset += u64::from(descriptor.vertex_count) * u64::from(descriptor.vertex_stride);

        let triangles = read_triangles(data, offset, descriptor)?;
        offset += u64::from(descriptor.face_count) * layout::TRIANGLE_LEN;

        submeshes.push(SubmeshGeometry {
            name: descriptor.name.clone(),
            material_name: descriptor.material_name.clone(),
            vertices,
            triangles,
        });
    }
    Ok(submeshes)
}

fn read_vertices(
    data: &[u8],
    offset: u64,
    descriptor: &SubmeshDescriptor,
) -> Result<Vec<Vertex>, DecodeError> {
    let count = u64::from(descriptor.vertex_count);
    let stride = u64::from(descriptor.vertex_stride);
    if count > 0 {
        // Only the leading 28 bytes of each record are read, so the final
        // record's padding may fall outside the buffer.
        layout::check_range(data, offset + (count - 1) * stride, layout::VERTEX_DATA_LEN)?;
    }

    let mut reader = Cursor::new(data);
    let mut vertices = Vec::with_capacity(descriptor.vertex_count as usize);
    for i in 0..count {
        reader.seek(SeekFrom::Start(offset + i * stride))?;
        vertices.push(reader.read_le::<RawVertex>()?.into());
    }
    Ok(vertices)
}

fn read_triangles(
    data: &[u8],
    offset: u64,
    descriptor: &SubmeshDescriptor,
) -> Result<Vec<Triangle>, DecodeError> {
    let count = u64::from(descriptor.face_count);
    layout::check_range(data, offset, count * layout::TRIANGLE_LEN)?;

    let mut reader = Cursor::new(data);
    reader.seek(SeekFrom::Start(offset))?;
    let mut triangles = Vec::with_capacity(descriptor.face_count as usize);
    for _ in 0..count {
        triangles.push(reader.read_le::<RawTriangle>()?.into());
    }
    Ok(triangles)
}
