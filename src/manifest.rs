//! Per-model bake manifests.
//!
//! ```toml
//! document = "scene.gltf"
//! binary = "scene.bin"
//! output = "../assets/craftsman"
//!
//! [meshes]
//! names = ["anvil.obj", "smith.obj"]
//!
//! [[textures]]
//! input = "textures/08_-_Default_baseColor.png"
//! output = "spark_diffuse.tga"
//! size = 128
//!
//! [transforms]
//! output = "transforms.inc"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::bake::{self, MeshNames};
use crate::texture;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub document: PathBuf,
    #[serde(default)]
    pub binary: Option<PathBuf>,
    pub output: PathBuf,
    #[serde(default)]
    pub meshes: MeshNames,
    #[serde(default)]
    pub textures: Vec<TextureEntry>,
    #[serde(default)]
    pub transforms: Option<TransformsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureEntry {
    pub input: PathBuf,
    /// Relative to the manifest's `output` directory.
    pub output: PathBuf,
    #[serde(default = "default_texture_size")]
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformsConfig {
    /// Relative to the manifest's `output` directory. Printed to stdout if absent.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_dedup")]
    pub dedup: bool,
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_texture_size() -> u32 {
    texture::DEFAULT_SIZE
}

fn default_dedup() -> bool {
    true
}

fn default_width() -> usize {
    10
}

impl Manifest {
    pub fn from_toml(text: &str) -> Result<Manifest> {
        toml::from_str(text).context("Invalid manifest")
    }

    /// Makes every input path and the output directory relative to `base`.
    pub fn resolve(mut self, base: &Path) -> Manifest {
        self.document = base.join(&self.document);
        self.binary = self.binary.map(|binary| base.join(binary));
        self.output = base.join(&self.output);
        for entry in &mut self.textures {
            entry.input = base.join(&entry.input);
        }
        self
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest =
        Manifest::from_toml(&text).with_context(|| format!("Failed to parse {:?}", path))?;
    let base = path.parent().unwrap_or(Path::new(""));
    Ok(manifest.resolve(base))
}

/// Checks that every input the manifest names exists.
pub fn validate(manifest: &Manifest) -> Result<()> {
    let inputs = std::iter::once(&manifest.document)
        .chain(&manifest.binary)
        .chain(manifest.textures.iter().map(|entry| &entry.input));
    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input not found: {:?}", input);
        }
    }
    for entry in &manifest.textures {
        if entry.size == 0 {
            anyhow::bail!("Texture {:?} has size 0", entry.input);
        }
    }
    Ok(())
}

/// Bakes meshes, textures and the transform table. `output` overrides the
/// manifest's output directory.
pub fn build_all(manifest: &Manifest, output: Option<&Path>) -> Result<()> {
    validate(manifest)?;
    let output = output.unwrap_or(manifest.output.as_path());

    let document = bake::load_document(&manifest.document, manifest.binary.as_deref())?;
    let meshes = bake::export_meshes(&document, output, &manifest.meshes)?;

    for entry in &manifest.textures {
        texture::convert_file(&entry.input, &output.join(&entry.output), entry.size)?;
    }

    if let Some(config) = &manifest.transforms {
        let table = bake::export_transforms(&document, config.dedup, config.width)?;
        match &config.output {
            Some(path) => {
                let path = output.join(path);
                std::fs::write(&path, table)
                    .with_context(|| format!("Failed to write transforms: {:?}", path))?;
                tracing::info!("Wrote transforms -> {:?}", path);
            }
            None => print!("{table}"),
        }
    }

    tracing::info!(
        "Baked {} meshes and {} textures into {:?}",
        meshes.len(),
        manifest.textures.len(),
        output
    );
    Ok(())
}
