//! gltf-bake
//!
//! Turns glTF scenes into the flat assets a software renderer loads: one OBJ
//! file per mesh, a table of per-instance world transforms, and square TGA
//! textures.

pub mod bake;
pub mod error;
pub mod gltf;
pub mod manifest;
pub mod obj;
pub mod texture;
pub mod transforms;

pub use error::{Error, Location, Result, TopologyError};
pub use gltf::{Document, MeshData, MeshInstance};
pub use transforms::TransformTable;
