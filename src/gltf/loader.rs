use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use tinyjson::JsonValue;

use crate::error::{malformed, Result};
use crate::gltf::{
    Accessor, Attributes, BufferView, ComponentType, Document, ElementType, LocalTransform, Mesh,
    Node, Primitive, Scene, Semantic, MODE_TRIANGLES,
};

type Object = HashMap<String, JsonValue>;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;

impl Document {
    /// Parses a glTF JSON document whose buffer 0 is `blob`.
    pub fn from_json(json: &str, blob: Vec<u8>) -> Result<Document> {
        let gltf: JsonValue = json
            .parse()
            .map_err(|err| malformed(format!("invalid JSON: {err}")))?;
        let gltf = take_object(&gltf, "document")?;

        for (i, buffer) in optional_array(gltf, "buffers")?.iter().enumerate() {
            let buffer = take_object(buffer, "buffers[]")?;
            let byte_length = take_usize(require(buffer, "byteLength", "buffers[]")?, "byteLength")?;
            if i == 0 && byte_length > blob.len() {
                return Err(malformed(format!(
                    "buffer 0 declares {byte_length} bytes but the blob has {}",
                    blob.len()
                )));
            }
        }

        let buffer_views = optional_array(gltf, "bufferViews")?
            .iter()
            .enumerate()
            .map(|(i, view)| load_buffer_view(i, view))
            .collect::<Result<Vec<_>>>()?;

        let accessors = optional_array(gltf, "accessors")?
            .iter()
            .enumerate()
            .map(|(i, accessor)| load_accessor(i, accessor))
            .collect::<Result<Vec<_>>>()?;

        let meshes = optional_array(gltf, "meshes")?
            .iter()
            .enumerate()
            .map(|(i, mesh)| load_mesh(i, mesh))
            .collect::<Result<Vec<_>>>()?;

        let nodes = optional_array(gltf, "nodes")?
            .iter()
            .enumerate()
            .map(|(i, node)| load_node(i, node))
            .collect::<Result<Vec<_>>>()?;

        let mut scenes = Vec::new();
        for scene in optional_array(gltf, "scenes")? {
            let scene = take_object(scene, "scenes[]")?;
            let node_indices = optional_array(scene, "nodes")?
                .iter()
                .map(|index| take_usize(index, "scenes[].nodes[]"))
                .collect::<Result<Vec<_>>>()?;
            scenes.push(Scene { node_indices });
        }
        let scene = gltf
            .get("scene")
            .map(|scene| take_usize(scene, "scene"))
            .transpose()?;

        let document = Document {
            scene,
            scenes,
            nodes,
            meshes,
            accessors,
            buffer_views,
            blob,
        };
        document.check_references()?;
        Ok(document)
    }

    /// Splits a binary glTF container into its JSON and BIN chunks.
    pub fn from_glb(glb: &[u8]) -> Result<Document> {
        let magic = read_u32(glb, 0)?;
        let version = read_u32(glb, 4)?;
        if magic != GLB_MAGIC {
            return Err(malformed("not a binary glTF container"));
        }
        if version != 2 {
            return Err(malformed(format!("unsupported GLB version {version}")));
        }
        let total_length = (read_u32(glb, 8)? as usize).min(glb.len());

        let mut json = None;
        let mut blob = Vec::new();
        let mut offset = 12;
        while offset + 8 <= total_length {
            let chunk_length = read_u32(glb, offset)? as usize;
            let chunk_type = read_u32(glb, offset + 4)?;
            let start = offset + 8;
            let end = start
                .checked_add(chunk_length)
                .filter(|&end| end <= total_length)
                .ok_or_else(|| malformed(format!("GLB chunk at byte {offset} is truncated")))?;
            match chunk_type {
                GLB_CHUNK_JSON if json.is_none() => {
                    let text = std::str::from_utf8(&glb[start..end])
                        .map_err(|err| malformed(format!("GLB JSON chunk is not UTF-8: {err}")))?;
                    json = Some(text);
                }
                GLB_CHUNK_BIN if blob.is_empty() => blob = glb[start..end].to_vec(),
                _ => {}
            }
            offset = end;
        }

        let json = json.ok_or_else(|| malformed("GLB has no JSON chunk"))?;
        Document::from_json(json, blob)
    }

    fn check_references(&self) -> Result<()> {
        let dangling = |owner: String, kind: &str, index: usize| {
            malformed(format!("{owner} refers to {kind} {index}, which does not exist"))
        };
        for (i, accessor) in self.accessors.iter().enumerate() {
            if let Some(view) = accessor.buffer_view.filter(|&v| v >= self.buffer_views.len()) {
                return Err(dangling(format!("accessor {i}"), "buffer view", view));
            }
        }
        for (i, mesh) in self.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                let attributes = Semantic::ALL
                    .into_iter()
                    .filter_map(|semantic| primitive.attributes.get(semantic));
                for accessor in attributes.chain(primitive.indices) {
                    if accessor >= self.accessors.len() {
                        return Err(dangling(format!("mesh {i}"), "accessor", accessor));
                    }
                }
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(mesh) = node.mesh_index.filter(|&m| m >= self.meshes.len()) {
                return Err(dangling(format!("node {i}"), "mesh", mesh));
            }
            for &child in &node.child_node_indices {
                if child >= self.nodes.len() {
                    return Err(dangling(format!("node {i}"), "node", child));
                }
            }
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            for &node in &scene.node_indices {
                if node >= self.nodes.len() {
                    return Err(dangling(format!("scene {i}"), "node", node));
                }
            }
        }
        if let Some(scene) = self.scene.filter(|&s| s >= self.scenes.len()) {
            return Err(malformed(format!("default scene {scene} does not exist")));
        }
        Ok(())
    }
}

fn load_buffer_view(index: usize, view: &JsonValue) -> Result<BufferView> {
    let what = format!("bufferViews[{index}]");
    let view = take_object(view, &what)?;
    let buffer = optional_usize(view, "buffer", &what)?.unwrap_or(0);
    if buffer != 0 {
        return Err(malformed(format!(
            "{what} points into buffer {buffer}, only buffer 0 is supported"
        )));
    }
    Ok(BufferView {
        byte_offset: optional_usize(view, "byteOffset", &what)?.unwrap_or(0),
        byte_length: take_usize(require(view, "byteLength", &what)?, &what)?,
        byte_stride: optional_usize(view, "byteStride", &what)?,
    })
}

fn load_accessor(index: usize, accessor: &JsonValue) -> Result<Accessor> {
    let what = format!("accessors[{index}]");
    let accessor = take_object(accessor, &what)?;

    let code = take_usize(require(accessor, "componentType", &what)?, &what)?;
    let component_type = u32::try_from(code)
        .ok()
        .and_then(ComponentType::from_code)
        .ok_or_else(|| malformed(format!("{what} has unknown componentType {code}")))?;

    let type_ = take_string(require(accessor, "type", &what)?, &what)?;
    let element_type = ElementType::from_name(type_)
        .ok_or_else(|| malformed(format!("{what} has unknown type \"{type_}\"")))?;

    let normalized = match accessor.get("normalized") {
        Some(value) => *value
            .get::<bool>()
            .ok_or_else(|| malformed(format!("{what}.normalized is not a boolean")))?,
        None => false,
    };

    Ok(Accessor {
        buffer_view: optional_usize(accessor, "bufferView", &what)?,
        byte_offset: optional_usize(accessor, "byteOffset", &what)?.unwrap_or(0),
        component_type,
        element_type,
        count: take_usize(require(accessor, "count", &what)?, &what)?,
        normalized,
        sparse: accessor.contains_key("sparse"),
    })
}

fn load_mesh(index: usize, mesh: &JsonValue) -> Result<Mesh> {
    let what = format!("meshes[{index}]");
    let mesh = take_object(mesh, &what)?;
    let primitives_json = take_array(require(mesh, "primitives", &what)?, &what)?;
    let mut primitives = Vec::with_capacity(primitives_json.len());
    for (i, primitive) in primitives_json.iter().enumerate() {
        let what = format!("{what}.primitives[{i}]");
        let primitive = take_object(primitive, &what)?;
        let attributes_json = take_object(require(primitive, "attributes", &what)?, &what)?;
        let mut attributes = Attributes::default();
        for (name, accessor) in attributes_json {
            match Semantic::from_name(name) {
                Some(semantic) => attributes.set(semantic, take_usize(accessor, &what)?),
                None => tracing::debug!("{what}: ignoring attribute {name}"),
            }
        }
        let mode = optional_usize(primitive, "mode", &what)?
            .map(|mode| u32::try_from(mode).unwrap_or(u32::MAX))
            .unwrap_or(MODE_TRIANGLES);
        primitives.push(Primitive {
            attributes,
            indices: optional_usize(primitive, "indices", &what)?,
            mode,
        });
    }
    Ok(Mesh { primitives })
}

fn load_node(index: usize, node: &JsonValue) -> Result<Node> {
    let what = format!("nodes[{index}]");
    let node = take_object(node, &what)?;
    let child_node_indices = optional_array(node, "children")?
        .iter()
        .map(|child| take_usize(child, &what))
        .collect::<Result<Vec<_>>>()?;
    let mesh_index = optional_usize(node, "mesh", &what)?;
    let transform = if let Some(matrix) = node.get("matrix") {
        let matrix = take_f32s::<16>(matrix, &format!("{what}.matrix"))?;
        LocalTransform::Matrix(Mat4::from_cols_array(&matrix))
    } else {
        let translation = match node.get("translation") {
            Some(value) => Vec3::from_array(take_f32s(value, &format!("{what}.translation"))?),
            None => Vec3::ZERO,
        };
        let rotation = match node.get("rotation") {
            Some(value) => Quat::from_array(take_f32s(value, &format!("{what}.rotation"))?),
            None => Quat::IDENTITY,
        };
        let scale = match node.get("scale") {
            Some(value) => Vec3::from_array(take_f32s(value, &format!("{what}.scale"))?),
            None => Vec3::ONE,
        };
        LocalTransform::Trs {
            translation,
            rotation,
            scale,
        }
    };
    Ok(Node {
        mesh_index,
        child_node_indices,
        transform,
    })
}

fn require<'a>(object: &'a Object, key: &str, what: &str) -> Result<&'a JsonValue> {
    object
        .get(key)
        .ok_or_else(|| malformed(format!("{what} is missing \"{key}\"")))
}

fn take_object<'a>(json_value: &'a JsonValue, what: &str) -> Result<&'a Object> {
    json_value
        .get::<Object>()
        .ok_or_else(|| malformed(format!("{what} is not an object")))
}

fn take_array<'a>(json_value: &'a JsonValue, what: &str) -> Result<&'a [JsonValue]> {
    json_value
        .get::<Vec<JsonValue>>()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(format!("{what} is not an array")))
}

fn take_string<'a>(json_value: &'a JsonValue, what: &str) -> Result<&'a str> {
    json_value
        .get::<String>()
        .map(String::as_str)
        .ok_or_else(|| malformed(format!("{what} is not a string")))
}

/// Array under `key`, or an empty slice if the key is absent.
fn optional_array<'a>(object: &'a Object, key: &str) -> Result<&'a [JsonValue]> {
    match object.get(key) {
        Some(value) => take_array(value, key),
        None => Ok(&[]),
    }
}

fn optional_usize(object: &Object, key: &str, what: &str) -> Result<Option<usize>> {
    object
        .get(key)
        .map(|value| take_usize(value, &format!("{what}.{key}")))
        .transpose()
}

/// Return usize if JsonValue is a non-negative whole number.
fn take_usize(json_value: &JsonValue, what: &str) -> Result<usize> {
    match json_value.get::<f64>() {
        Some(&n) if n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 => Ok(n as usize),
        _ => Err(malformed(format!("{what} is not a valid index or count"))),
    }
}

/// Return exactly N numbers from a JsonValue array.
fn take_f32s<const N: usize>(json_value: &JsonValue, what: &str) -> Result<[f32; N]> {
    let values = take_array(json_value, what)?;
    if values.len() != N {
        return Err(malformed(format!(
            "{what} has {} numbers, expected {N}",
            values.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value
            .get::<f64>()
            .ok_or_else(|| malformed(format!("{what} contains a non-number")))? as f32;
    }
    Ok(out)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| malformed("GLB header is truncated"))
}
