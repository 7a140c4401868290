//! File-level conversion: load a document, write its meshes and transforms.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Deserialize;

use crate::gltf::{self, Document};
use crate::obj;
use crate::transforms::TransformTable;

/// How meshes are named on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MeshNames {
    /// Mesh `i` is written as `names[i]`; meshes past the list are skipped.
    List { names: Vec<String> },
    /// `{}` in the pattern is replaced by the mesh index.
    Pattern { pattern: String },
}

impl Default for MeshNames {
    fn default() -> Self {
        MeshNames::Pattern {
            pattern: "mesh{}.obj".to_string(),
        }
    }
}

impl MeshNames {
    /// The (mesh index, file name) pairs to write for a document with `mesh_count` meshes.
    pub fn targets(&self, mesh_count: usize) -> Result<Vec<(usize, String)>> {
        match self {
            MeshNames::List { names } => {
                if names.len() > mesh_count {
                    bail!(
                        "{} mesh names given but the document has only {} meshes",
                        names.len(),
                        mesh_count
                    );
                }
                Ok(names.iter().cloned().enumerate().collect())
            }
            MeshNames::Pattern { pattern } => {
                if !pattern.contains("{}") {
                    bail!("mesh name pattern {:?} has no {{}} placeholder", pattern);
                }
                Ok((0..mesh_count)
                    .map(|i| (i, pattern.replace("{}", &i.to_string())))
                    .collect())
            }
        }
    }
}

/// Loads a `.glb`, or a `.gltf` with its companion binary.
///
/// When `binary` is not given, `<document>.bin` is used if it exists.
pub fn load_document(document: &Path, binary: Option<&Path>) -> Result<Document> {
    let is_glb = document
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"));

    let loaded = if is_glb {
        let bytes =
            fs::read(document).with_context(|| format!("Failed to read GLB: {:?}", document))?;
        Document::from_glb(&bytes)
    } else {
        let json = fs::read_to_string(document)
            .with_context(|| format!("Failed to read glTF: {:?}", document))?;
        let binary = match binary {
            Some(binary) => Some(binary.to_path_buf()),
            None => Some(document.with_extension("bin")).filter(|path| path.exists()),
        };
        let blob = match &binary {
            Some(binary) => fs::read(binary)
                .with_context(|| format!("Failed to read binary: {:?}", binary))?,
            None => Vec::new(),
        };
        Document::from_json(&json, blob)
    };
    let loaded = loaded.with_context(|| format!("Failed to load {:?}", document))?;

    tracing::info!(
        "Loaded {:?}: {} meshes, {} nodes, {} accessors",
        document,
        loaded.meshes.len(),
        loaded.nodes.len(),
        loaded.accessors.len()
    );
    Ok(loaded)
}

/// Serializes the named meshes in parallel, then writes them in mesh order.
pub fn export_meshes(
    document: &Document,
    output_dir: &Path,
    names: &MeshNames,
) -> Result<Vec<PathBuf>> {
    let targets = names.targets(document.meshes.len())?;
    let objs: Vec<_> = targets
        .par_iter()
        .map(|&(mesh, _)| obj::mesh_to_obj(document, mesh))
        .collect();

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    let mut written = Vec::with_capacity(targets.len());
    for ((mesh, name), obj) in targets.into_iter().zip(objs) {
        let obj = obj.with_context(|| format!("Failed to convert mesh {mesh} ({name})"))?;
        let path = output_dir.join(&name);
        fs::write(&path, obj).with_context(|| format!("Failed to write OBJ: {:?}", path))?;
        tracing::info!("Wrote mesh {mesh} -> {:?}", path);
        written.push(path);
    }
    Ok(written)
}

/// Walks the document's scene and renders its transform table.
pub fn export_transforms(document: &Document, dedup: bool, width: usize) -> Result<String> {
    let instances = gltf::walk(document).context("Failed to walk the scene graph")?;
    let table = TransformTable::collect(&instances, dedup);
    tracing::info!(
        "{} mesh instances, {} transforms{}",
        instances.len(),
        table.len(),
        if dedup { " after deduplication" } else { "" }
    );
    Ok(table.to_c_array(width))
}
