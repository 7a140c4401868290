//! Reading typed arrays out of the binary blob.
//!
//! [`resolve`] turns a buffer view into a byte window and [`decode`] reads an
//! accessor's elements from that window. The component type is matched once
//! per accessor; the per-element loop is generic over [`Component`].

use glam::Mat4;

use crate::error::{malformed, Error, Location, Result};
use crate::gltf::{Accessor, BufferView, ComponentType, Document, ElementType};

/// Returns the bytes covered by `view`, which is buffer view number `index`.
pub fn resolve<'a>(blob: &'a [u8], view: &BufferView, index: usize) -> Result<&'a [u8]> {
    let out_of_bounds = |end| Error::OutOfBounds {
        location: Location::BufferView(index),
        start: view.byte_offset,
        end,
        limit: blob.len(),
    };
    let end = view
        .byte_offset
        .checked_add(view.byte_length)
        .ok_or_else(|| out_of_bounds(usize::MAX))?;
    blob.get(view.byte_offset..end)
        .ok_or_else(|| out_of_bounds(end))
}

/// Decoded accessor data, one variant per component type.
///
/// Normalized integer accessors decode to `F32`.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorValues {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl AccessorValues {
    /// Number of components (not elements).
    pub fn len(&self) -> usize {
        match self {
            AccessorValues::I8(values) => values.len(),
            AccessorValues::U8(values) => values.len(),
            AccessorValues::I16(values) => values.len(),
            AccessorValues::U16(values) => values.len(),
            AccessorValues::U32(values) => values.len(),
            AccessorValues::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every component converted to f32, without rescaling.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            AccessorValues::I8(values) => values.iter().map(|&v| f32::from(v)).collect(),
            AccessorValues::U8(values) => values.iter().map(|&v| f32::from(v)).collect(),
            AccessorValues::I16(values) => values.iter().map(|&v| f32::from(v)).collect(),
            AccessorValues::U16(values) => values.iter().map(|&v| f32::from(v)).collect(),
            AccessorValues::U32(values) => values.iter().map(|&v| v as f32).collect(),
            AccessorValues::F32(values) => values.clone(),
        }
    }
}

/// The elements of one accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Elements {
    pub element_type: ElementType,
    pub values: AccessorValues,
}

impl Elements {
    pub fn len(&self) -> usize {
        self.values.len() / self.element_type.arity()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Elements as `N`-tuples of f32, or None if the arity is not `N`.
    pub fn to_tuples<const N: usize>(&self) -> Option<Vec<[f32; N]>> {
        if self.element_type.arity() != N || self.element_type == ElementType::Mat2 {
            return None;
        }
        let tuples = self
            .values
            .to_f32()
            .chunks_exact(N)
            .map(|chunk| {
                let mut tuple = [0.0; N];
                tuple.copy_from_slice(chunk);
                tuple
            })
            .collect();
        Some(tuples)
    }

    pub fn to_vec2(&self) -> Option<Vec<[f32; 2]>> {
        self.to_tuples()
    }

    pub fn to_vec3(&self) -> Option<Vec<[f32; 3]>> {
        self.to_tuples()
    }

    pub fn to_vec4(&self) -> Option<Vec<[f32; 4]>> {
        self.to_tuples()
    }

    /// Column-major matrices, for MAT4 float accessors.
    pub fn to_mat4(&self) -> Option<Vec<Mat4>> {
        match (&self.element_type, &self.values) {
            (ElementType::Mat4, AccessorValues::F32(values)) => Some(
                values
                    .chunks_exact(16)
                    .map(Mat4::from_cols_slice)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Scalar unsigned integers widened to u32, for index accessors.
    pub fn to_indices(&self) -> Option<Vec<u32>> {
        if self.element_type != ElementType::Scalar {
            return None;
        }
        match &self.values {
            AccessorValues::U8(values) => Some(values.iter().map(|&v| u32::from(v)).collect()),
            AccessorValues::U16(values) => Some(values.iter().map(|&v| u32::from(v)).collect()),
            AccessorValues::U32(values) => Some(values.clone()),
            _ => None,
        }
    }
}

/// A little-endian component type that can be read out of the blob.
trait Component: Copy + Default {
    fn read_le(bytes: &[u8]) -> Self;
    /// Rescale to [-1, 1] or [0, 1].
    fn normalize(self) -> f32;
}

macro_rules! impl_int_component {
    ($($ty:ty),*) => {$(
        impl Component for $ty {
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }

            fn normalize(self) -> f32 {
                (self as f32 / <$ty>::MAX as f32).max(-1.0)
            }
        }
    )*};
}

impl_int_component!(i8, u8, i16, u16, u32);

impl Component for f32 {
    fn read_le(bytes: &[u8]) -> Self {
        f32::from_bits(u32::read_le(bytes))
    }

    fn normalize(self) -> f32 {
        self
    }
}

/// Where each element starts in the view's byte window.
struct Layout {
    offset: usize,
    stride: usize,
    count: usize,
    components: usize,
}

fn read<T: Component>(window: &[u8], layout: &Layout) -> Vec<T> {
    let size = std::mem::size_of::<T>();
    let mut values = Vec::with_capacity(layout.count * layout.components);
    for i in 0..layout.count {
        let start = layout.offset + i * layout.stride;
        let element = &window[start..start + size * layout.components];
        values.extend(element.chunks_exact(size).map(T::read_le));
    }
    values
}

fn read_normalized<T: Component>(window: &[u8], layout: &Layout) -> Vec<f32> {
    read::<T>(window, layout)
        .into_iter()
        .map(Component::normalize)
        .collect()
}

/// Reads a normalized integer accessor as f32.
type NormalizedReader = fn(&[u8], &Layout) -> Vec<f32>;

/// Rejects combinations the decoder does not handle. Returns the reader to use
/// when the accessor is normalized.
fn check_supported(index: usize, accessor: &Accessor) -> Result<Option<NormalizedReader>> {
    let normalized = match accessor.component_type {
        ComponentType::I8 => Some(read_normalized::<i8> as NormalizedReader),
        ComponentType::U8 => Some(read_normalized::<u8> as NormalizedReader),
        ComponentType::I16 => Some(read_normalized::<i16> as NormalizedReader),
        ComponentType::U16 => Some(read_normalized::<u16> as NormalizedReader),
        ComponentType::U32 | ComponentType::F32 => None,
    };
    let reason = match (accessor.element_type, accessor.component_type) {
        (ElementType::Mat2 | ElementType::Mat3, _) => Some("only MAT4 matrices are supported"),
        (ElementType::Mat4, ComponentType::F32) => None,
        (ElementType::Mat4, _) => Some("matrices must be 32-bit floats"),
        _ => None,
    };
    let reason = reason.or_else(|| {
        (accessor.normalized && normalized.is_none())
            .then_some("only 8 and 16 bit integers can be normalized")
    });
    match reason {
        Some(reason) => Err(Error::UnsupportedComponentType {
            accessor: index,
            component_type: accessor.component_type,
            element_type: accessor.element_type,
            reason,
        }),
        None => Ok(normalized.filter(|_| accessor.normalized)),
    }
}

/// Decodes all elements of accessor `index`.
pub fn decode(document: &Document, index: usize) -> Result<Elements> {
    let accessor = document.accessor(index)?;
    let normalized = check_supported(index, accessor)?;
    if accessor.sparse {
        return Err(Error::SparseAccessor { accessor: index });
    }

    let components = accessor.element_type.arity();
    let element_size = accessor.element_size();
    let Some(view_index) = accessor.buffer_view else {
        return zeroed(index, accessor);
    };
    let view = document.buffer_view(view_index)?;
    let window = resolve(&document.blob, view, view_index).map_err(|err| match err {
        Error::OutOfBounds {
            start, end, limit, ..
        } => Error::OutOfBounds {
            location: Location::AccessorView {
                accessor: index,
                view: view_index,
            },
            start,
            end,
            limit,
        },
        err => err,
    })?;

    let stride = view.byte_stride.filter(|&stride| stride != 0).unwrap_or(element_size);
    if stride < element_size {
        return Err(malformed(format!(
            "buffer view {view_index} has stride {stride}, smaller than the {element_size} byte elements of accessor {index}"
        )));
    }

    if accessor.count > 0 {
        let end = (accessor.count - 1)
            .checked_mul(stride)
            .and_then(|last| last.checked_add(accessor.byte_offset))
            .and_then(|last| last.checked_add(element_size));
        match end {
            Some(end) if end <= window.len() => {}
            end => {
                return Err(Error::OutOfBounds {
                    location: Location::Accessor(index),
                    start: accessor.byte_offset,
                    end: end.unwrap_or(usize::MAX),
                    limit: window.len(),
                })
            }
        }
    }

    let layout = Layout {
        offset: accessor.byte_offset,
        stride,
        count: accessor.count,
        components,
    };
    let values = match normalized {
        Some(read_normalized) => AccessorValues::F32(read_normalized(window, &layout)),
        None => match accessor.component_type {
            ComponentType::I8 => AccessorValues::I8(read(window, &layout)),
            ComponentType::U8 => AccessorValues::U8(read(window, &layout)),
            ComponentType::I16 => AccessorValues::I16(read(window, &layout)),
            ComponentType::U16 => AccessorValues::U16(read(window, &layout)),
            ComponentType::U32 => AccessorValues::U32(read(window, &layout)),
            ComponentType::F32 => AccessorValues::F32(read(window, &layout)),
        },
    };

    Ok(Elements {
        element_type: accessor.element_type,
        values,
    })
}

/// Most components an accessor without a buffer view may zero-fill.
const MAX_ZEROED_COMPONENTS: usize = 1 << 26;

/// Accessors without a buffer view are all zeros.
fn zeroed(index: usize, accessor: &Accessor) -> Result<Elements> {
    let len = accessor
        .count
        .checked_mul(accessor.element_type.arity())
        .filter(|&len| len <= MAX_ZEROED_COMPONENTS)
        .ok_or_else(|| {
            malformed(format!(
                "accessor {index} has no buffer view and too many elements to zero-fill ({})",
                accessor.count
            ))
        })?;
    let values = if accessor.normalized {
        AccessorValues::F32(vec![0.0; len])
    } else {
        match accessor.component_type {
            ComponentType::I8 => AccessorValues::I8(vec![0; len]),
            ComponentType::U8 => AccessorValues::U8(vec![0; len]),
            ComponentType::I16 => AccessorValues::I16(vec![0; len]),
            ComponentType::U16 => AccessorValues::U16(vec![0; len]),
            ComponentType::U32 => AccessorValues::U32(vec![0; len]),
            ComponentType::F32 => AccessorValues::F32(vec![0.0; len]),
        }
    };
    Ok(Elements {
        element_type: accessor.element_type,
        values,
    })
}
