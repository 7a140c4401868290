use crate::error::{Error, Result, TopologyError};
use crate::gltf::{decode, Document, Elements, Primitive, Semantic, MODE_TRIANGLES};

/// The decoded attributes of a mesh, with all primitives concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub texcoords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn from_document(document: &Document, mesh_index: usize) -> Result<MeshData> {
        let mesh = document.mesh(mesh_index)?;
        let primitives = mesh
            .primitives
            .iter()
            .enumerate()
            .map(|(i, primitive)| read_primitive(document, mesh_index, i, primitive))
            .collect::<Result<Vec<_>>>()?;
        merge(mesh_index, primitives)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn check(&self) -> Result<(), TopologyError> {
        check_triangle_list(
            self.positions.len(),
            self.normals.as_deref(),
            self.texcoords.as_deref(),
            &self.indices,
        )
    }
}

/// Checks that `indices` is a triangle list over `vertex_count` vertices and
/// that every optional attribute has one element per vertex.
pub fn check_triangle_list(
    vertex_count: usize,
    normals: Option<&[[f32; 3]]>,
    texcoords: Option<&[[f32; 2]]>,
    indices: &[u32],
) -> Result<(), TopologyError> {
    let counts = [
        (Semantic::Normal, normals.map(<[_]>::len)),
        (Semantic::Texcoord0, texcoords.map(<[_]>::len)),
    ];
    for (semantic, count) in counts {
        if let Some(found) = count.filter(|&found| found != vertex_count) {
            return Err(TopologyError::AttributeCount {
                semantic,
                expected: vertex_count,
                found,
            });
        }
    }
    if indices.len() % 3 != 0 {
        return Err(TopologyError::IndexCount(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(TopologyError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}

fn read_primitive(
    document: &Document,
    mesh: usize,
    index: usize,
    primitive: &Primitive,
) -> Result<MeshData> {
    if primitive.mode != MODE_TRIANGLES {
        return Err(TopologyError::UnsupportedMode(primitive.mode).in_primitive(mesh, index));
    }
    let position = primitive
        .attributes
        .position
        .ok_or(Error::MissingRequiredAttribute {
            mesh,
            primitive: index,
            semantic: Semantic::Position,
        })?;

    let in_primitive = |err: Error| err.in_primitive(mesh, index);
    let positions = read_attribute(document, position, Elements::to_vec3, "POSITION must be VEC3")
        .map_err(in_primitive)?;
    let normals = primitive
        .attributes
        .normal
        .map(|accessor| read_attribute(document, accessor, Elements::to_vec3, "NORMAL must be VEC3"))
        .transpose()
        .map_err(in_primitive)?;
    let texcoords = primitive
        .attributes
        .texcoord_0
        .map(|accessor| {
            read_attribute(document, accessor, Elements::to_vec2, "TEXCOORD_0 must be VEC2")
        })
        .transpose()
        .map_err(in_primitive)?;
    let indices = match primitive.indices {
        Some(accessor) => read_attribute(
            document,
            accessor,
            Elements::to_indices,
            "indices must be unsigned scalars",
        )
        .map_err(in_primitive)?,
        None => (0..positions.len() as u32).collect(),
    };

    let data = MeshData {
        positions,
        normals,
        texcoords,
        indices,
    };
    data.check().map_err(|err| err.in_primitive(mesh, index))?;
    Ok(data)
}

fn read_attribute<T>(
    document: &Document,
    accessor: usize,
    convert: impl FnOnce(&Elements) -> Option<T>,
    reason: &'static str,
) -> Result<T> {
    let elements = decode(document, accessor)?;
    convert(&elements).ok_or_else(|| {
        let declared = &document.accessors[accessor];
        Error::UnsupportedComponentType {
            accessor,
            component_type: declared.component_type,
            element_type: declared.element_type,
            reason,
        }
    })
}

fn merge(mesh: usize, mut primitives: Vec<MeshData>) -> Result<MeshData> {
    if primitives.len() == 1 {
        return Ok(primitives.remove(0));
    }
    let keep_normals = primitives.iter().all(|p| p.normals.is_some());
    let keep_texcoords = primitives.iter().all(|p| p.texcoords.is_some());
    for (semantic, kept, present) in [
        (
            Semantic::Normal,
            keep_normals,
            primitives.iter().any(|p| p.normals.is_some()),
        ),
        (
            Semantic::Texcoord0,
            keep_texcoords,
            primitives.iter().any(|p| p.texcoords.is_some()),
        ),
    ] {
        if present && !kept {
            tracing::warn!("mesh {mesh}: dropping {semantic}, not every primitive has it");
        }
    }

    let mut merged = MeshData {
        normals: keep_normals.then(Vec::new),
        texcoords: keep_texcoords.then(Vec::new),
        ..MeshData::default()
    };
    for primitive in primitives {
        let base = u32::try_from(merged.positions.len())
            .map_err(|_| crate::error::malformed(format!("mesh {mesh} has too many vertices")))?;
        merged
            .indices
            .extend(primitive.indices.iter().map(|&index| index + base));
        merged.positions.extend(primitive.positions);
        if let (Some(all), Some(normals)) = (&mut merged.normals, primitive.normals) {
            all.extend(normals);
        }
        if let (Some(all), Some(texcoords)) = (&mut merged.texcoords, primitive.texcoords) {
            all.extend(texcoords);
        }
    }
    Ok(merged)
}
