use std::fmt;

use crate::gltf::{ComponentType, ElementType, Semantic};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What a byte range was being read for, used to locate `OutOfBounds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    BufferView(usize),
    Accessor(usize),
    /// An accessor whose buffer view does not fit in the blob.
    AccessorView { accessor: usize, view: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::BufferView(index) => write!(f, "buffer view {index}"),
            Location::Accessor(index) => write!(f, "accessor {index}"),
            Location::AccessorView { accessor, view } => {
                write!(f, "accessor {accessor} through buffer view {view}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{location}: byte range {start}..{end} exceeds the {limit} bytes available")]
    OutOfBounds {
        location: Location,
        start: usize,
        end: usize,
        limit: usize,
    },

    #[error("accessor {accessor}: {component_type:?} {element_type:?} is not supported ({reason})")]
    UnsupportedComponentType {
        accessor: usize,
        component_type: ComponentType,
        element_type: ElementType,
        reason: &'static str,
    },

    #[error("mesh {mesh} primitive {primitive}: {source}")]
    InvalidTopology {
        mesh: usize,
        primitive: usize,
        #[source]
        source: TopologyError,
    },

    #[error("node {node} is reachable from itself through its children")]
    CyclicGraph { node: usize },

    #[error("mesh {mesh} primitive {primitive} has no {semantic} accessor")]
    MissingRequiredAttribute {
        mesh: usize,
        primitive: usize,
        semantic: Semantic,
    },

    /// An accessor error met while reading a mesh primitive.
    #[error("mesh {mesh} primitive {primitive}: {source}")]
    InPrimitive {
        mesh: usize,
        primitive: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("accessor {accessor} is sparse, which is not supported")]
    SparseAccessor { accessor: usize },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Problems with the shape of a triangle list, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("{0} indices do not form a triangle list")]
    IndexCount(usize),

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{semantic} has {found} elements but there are {expected} positions")]
    AttributeCount {
        semantic: Semantic,
        expected: usize,
        found: usize,
    },

    #[error("primitive mode {0} is not a triangle list")]
    UnsupportedMode(u32),
}

impl TopologyError {
    pub(crate) fn in_primitive(self, mesh: usize, primitive: usize) -> Error {
        Error::InvalidTopology {
            mesh,
            primitive,
            source: self,
        }
    }
}

impl Error {
    pub(crate) fn in_primitive(self, mesh: usize, primitive: usize) -> Error {
        Error::InPrimitive {
            mesh,
            primitive,
            source: Box::new(self),
        }
    }
}

pub(crate) fn malformed(message: impl Into<String>) -> Error {
    Error::Malformed(message.into())
}
