//! The subset of a glTF document needed to bake meshes and transforms.
//!
//! Everything here is plain data produced by [`loader`] and read by the
//! accessor decoder, the scene walker and the mesh assembler. Nothing is
//! mutated after loading.

use std::fmt;

use glam::{Mat4, Quat, Vec3};

pub mod accessor;
mod loader;
pub mod mesh;
pub mod scene;

pub use accessor::{decode, resolve, AccessorValues, Elements};
pub use mesh::MeshData;
pub use scene::{walk, walk_scene, MeshInstance};

pub struct Document {
    /// The default scene, if the document names one.
    pub scene: Option<usize>,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    /// Contents of buffer 0, the only buffer bufferViews may point into.
    pub blob: Vec<u8>,
}

pub struct Scene {
    pub node_indices: Vec<usize>,
}

pub struct Node {
    pub mesh_index: Option<usize>,
    pub child_node_indices: Vec<usize>,
    pub transform: LocalTransform,
}

/// A node's transform relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalTransform {
    Matrix(Mat4),
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
}

impl LocalTransform {
    pub const IDENTITY: LocalTransform = LocalTransform::Trs {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Scale, then rotate, then translate, unless an explicit matrix was given.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            LocalTransform::Matrix(matrix) => matrix,
            LocalTransform::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(scale, rotation, translation),
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        LocalTransform::IDENTITY
    }
}

pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

pub struct Primitive {
    pub attributes: Attributes,
    pub indices: Option<usize>,
    pub mode: u32,
}

/// glTF primitive mode for triangle lists, the default.
pub const MODE_TRIANGLES: u32 = 4;

/// The vertex attribute semantics this crate reads. Others are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Texcoord0,
}

impl Semantic {
    pub const ALL: [Semantic; 3] = [Semantic::Position, Semantic::Normal, Semantic::Texcoord0];

    pub fn name(self) -> &'static str {
        match self {
            Semantic::Position => "POSITION",
            Semantic::Normal => "NORMAL",
            Semantic::Texcoord0 => "TEXCOORD_0",
        }
    }

    pub fn from_name(name: &str) -> Option<Semantic> {
        Semantic::ALL.into_iter().find(|semantic| semantic.name() == name)
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accessor indices for the supported semantics of one primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub texcoord_0: Option<usize>,
}

impl Attributes {
    pub fn get(&self, semantic: Semantic) -> Option<usize> {
        match semantic {
            Semantic::Position => self.position,
            Semantic::Normal => self.normal,
            Semantic::Texcoord0 => self.texcoord_0,
        }
    }

    pub(crate) fn set(&mut self, semantic: Semantic, accessor: usize) {
        match semantic {
            Semantic::Position => self.position = Some(accessor),
            Semantic::Normal => self.normal = Some(accessor),
            Semantic::Texcoord0 => self.texcoord_0 = Some(accessor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView {
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    /// Accessors without a view read as all zeros.
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub count: usize,
    pub normalized: bool,
    pub sparse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<ComponentType> {
        match code {
            5120 => Some(ComponentType::I8),
            5121 => Some(ComponentType::U8),
            5122 => Some(ComponentType::I16),
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn from_name(name: &str) -> Option<ElementType> {
        match name {
            "SCALAR" => Some(ElementType::Scalar),
            "VEC2" => Some(ElementType::Vec2),
            "VEC3" => Some(ElementType::Vec3),
            "VEC4" => Some(ElementType::Vec4),
            "MAT2" => Some(ElementType::Mat2),
            "MAT3" => Some(ElementType::Mat3),
            "MAT4" => Some(ElementType::Mat4),
            _ => None,
        }
    }

    /// Number of components per element.
    pub fn arity(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 | ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }
}

impl Accessor {
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.element_type.arity()
    }
}

impl Document {
    pub fn accessor(&self, index: usize) -> crate::Result<&Accessor> {
        self.accessors
            .get(index)
            .ok_or_else(|| crate::error::malformed(format!("accessor {index} does not exist")))
    }

    pub fn buffer_view(&self, index: usize) -> crate::Result<&BufferView> {
        self.buffer_views
            .get(index)
            .ok_or_else(|| crate::error::malformed(format!("buffer view {index} does not exist")))
    }

    pub fn mesh(&self, index: usize) -> crate::Result<&Mesh> {
        self.meshes
            .get(index)
            .ok_or_else(|| crate::error::malformed(format!("mesh {index} does not exist")))
    }

    pub fn node(&self, index: usize) -> crate::Result<&Node> {
        self.nodes
            .get(index)
            .ok_or_else(|| crate::error::malformed(format!("node {index} does not exist")))
    }
}
