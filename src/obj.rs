//! Wavefront OBJ text output.
//!
//! Vertices are written in input order with no deduplication: a glTF
//! primitive already has one vertex per unique attribute combination, so
//! positions, texcoords and normals share a single index per face corner.
//!
//! ```text
//! v 0.000000 0.000000 0.000000
//! vt 0.000000 1.000000
//! vn 0.000000 0.000000 1.000000
//! f 1/1/1 2/2/2 3/3/3
//! ```

use std::fmt::Write as FmtWrite;

use crate::error::{Result, TopologyError};
use crate::gltf::mesh::check_triangle_list;
use crate::gltf::{Document, MeshData};

/// Serializes a triangle list as OBJ text.
///
/// Lines are emitted as `v`, then `vt`, then `vn`, then `f`. Attribute
/// directives appear only for attributes that are present.
pub fn serialize(
    positions: &[[f32; 3]],
    normals: Option<&[[f32; 3]]>,
    texcoords: Option<&[[f32; 2]]>,
    indices: &[u32],
) -> Result<String, TopologyError> {
    check_triangle_list(positions.len(), normals, texcoords, indices)?;
    Ok(write_obj(positions, normals, texcoords, indices))
}

fn write_obj(
    positions: &[[f32; 3]],
    normals: Option<&[[f32; 3]]>,
    texcoords: Option<&[[f32; 2]]>,
    indices: &[u32],
) -> String {
    let mut obj = String::new();
    for position in positions {
        write_directive(&mut obj, "v", position);
    }
    for texcoord in texcoords.unwrap_or_default() {
        write_directive(&mut obj, "vt", texcoord);
    }
    for normal in normals.unwrap_or_default() {
        write_directive(&mut obj, "vn", normal);
    }

    let corner = |obj: &mut String, index: u32| {
        let index = u64::from(index) + 1;
        // Writing to a String cannot fail.
        let _ = match (texcoords.is_some(), normals.is_some()) {
            (false, false) => write!(obj, " {index}"),
            (true, false) => write!(obj, " {index}/{index}"),
            (false, true) => write!(obj, " {index}//{index}"),
            (true, true) => write!(obj, " {index}/{index}/{index}"),
        };
    };
    for triangle in indices.chunks_exact(3) {
        obj.push('f');
        for &index in triangle {
            corner(&mut obj, index);
        }
        obj.push('\n');
    }
    obj
}

/// Decodes mesh `mesh_index` of the document and serializes it.
pub fn mesh_to_obj(document: &Document, mesh_index: usize) -> Result<String> {
    // Every primitive was checked while decoding.
    let mesh = MeshData::from_document(document, mesh_index)?;
    let obj = write_obj(
        &mesh.positions,
        mesh.normals.as_deref(),
        mesh.texcoords.as_deref(),
        &mesh.indices,
    );
    tracing::debug!(
        "mesh {mesh_index}: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.indices.len() / 3
    );
    Ok(obj)
}

impl MeshData {
    pub fn to_obj(&self) -> Result<String, TopologyError> {
        serialize(
            &self.positions,
            self.normals.as_deref(),
            self.texcoords.as_deref(),
            &self.indices,
        )
    }
}

fn write_directive(obj: &mut String, directive: &str, values: &[f32]) {
    obj.push_str(directive);
    for &value in values {
        obj.push(' ');
        push_number(obj, value);
    }
    obj.push('\n');
}

/// Six decimal places; values that round to zero are written unsigned.
fn push_number(obj: &mut String, value: f32) {
    let start = obj.len();
    let _ = write!(obj, "{value:.6}");
    if &obj[start..] == "-0.000000" {
        obj.replace_range(start..start + 1, "");
    }
}
