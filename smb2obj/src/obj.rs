//! Wavefront OBJ text emission for decoded mesh documents.

use std::io::Write;

use smb_lib::SubmeshGeometry;

/// Writes `submeshes` as OBJ text.
///
/// Object names have spaces replaced with underscores and the submesh's
/// position appended so they stay unique under duplicate input names. The
/// V texture coordinate is flipped for the OBJ convention. OBJ face
/// indices are 1 based and global to the file, so each submesh's indices
/// are offset by the number of vertices written before it.
pub fn write_obj<W: Write>(writer: &mut W, submeshes: &[SubmeshGeometry]) -> std::io::Result<()> {
    writeln!(writer, "# exported by smb2obj")?;

    let mut base_index = 1usize;
    for (i, submesh) in submeshes.iter().enumerate() {
        writeln!(writer, "o {}_{}", submesh.name.replace(' ', "_"), i)?;

        for vertex in &submesh.vertices {
            let p = vertex.position;
            writeln!(writer, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
        }
        for vertex in &submesh.vertices {
            writeln!(writer, "vt {:.6} {:.6}", vertex.uv.x, 1.0 - vertex.uv.y)?;
        }
        for vertex in &submesh.vertices {
            let n = vertex.normal;
            writeln!(writer, "vn {:.6} {:.6} {:.6}", n.x, n.y, n.z)?;
        }

        for triangle in &submesh.triangles {
            let v0 = base_index + triangle.v0 as usize;
            let v1 = base_index + triangle.v1 as usize;
            let v2 = base_index + triangle.v2 as usize;
            writeln!(
                writer,
                "f {0}/{0}/{0} {1}/{1}/{1} {2}/{2}/{2}",
                v0, v1, v2
            )?;
        }

        base_index += submesh.vertices.len();
    }

    Ok(())
}
