//! Vertex attribute layouts.
//!
//! A [`VertexLayout`] describes one fixed-stride vertex record as a set of
//! attributes, each naming the shader input slot it feeds, where in the
//! record it starts, and how many components of which type it holds. All
//! attributes are sourced from a single interleaved buffer.
//!
//! Layouts are validated on construction (unique slots, attributes inside
//! the stride) and can be checked against a linked program's declared
//! inputs with [`VertexLayout::check_against`].

use super::gpu::{ComponentType, Gpu};
use bytemuck::{Pod, Zeroable};
use std::collections::HashSet;
use std::mem::{offset_of, size_of};
use thiserror::Error;

/// Errors in a vertex layout description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("vertex layout has no attributes")]
    Empty,

    #[error("slot {0} is bound more than once")]
    DuplicateSlot(u32),

    #[error("attribute at slot {slot} must have 1 to 4 components, got {components}")]
    InvalidComponents { slot: u32, components: u8 },

    #[error("attribute at slot {slot} ends at byte {end}, past the {stride}-byte stride")]
    AttributeOutOfBounds {
        slot: u32,
        end: usize,
        stride: usize,
    },
}

/// One attribute within a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location this attribute feeds.
    pub slot: u32,
    /// Byte offset from the start of the record.
    pub offset: usize,
    pub component_type: ComponentType,
    /// Number of components, 1 to 4.
    pub components: u8,
}

impl VertexAttribute {
    /// An attribute of `components` 32-bit floats.
    pub fn f32(slot: u32, offset: usize, components: u8) -> Self {
        Self {
            slot,
            offset,
            component_type: ComponentType::F32,
            components,
        }
    }

    /// Bytes occupied within the record.
    pub fn size(&self) -> usize {
        self.component_type.size() * usize::from(self.components)
    }
}

/// A disagreement between a layout and a program's vertex inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutMismatch {
    /// The layout feeds a slot the program does not read.
    UnusedSlot(u32),
    /// The program reads an input no attribute feeds.
    MissingInput { name: String, location: u32 },
}

/// A validated description of one interleaved vertex record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    stride: usize,
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Builds a layout for records of `stride` bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if `attributes` is empty, binds a slot
    /// twice, has an attribute with 0 or more than 4 components, or has an
    /// attribute reaching past `stride`.
    pub fn new(stride: usize, attributes: Vec<VertexAttribute>) -> Result<Self, LayoutError> {
        if attributes.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::with_capacity(attributes.len());
        for attribute in &attributes {
            if !seen.insert(attribute.slot) {
                return Err(LayoutError::DuplicateSlot(attribute.slot));
            }
            if !(1..=4).contains(&attribute.components) {
                return Err(LayoutError::InvalidComponents {
                    slot: attribute.slot,
                    components: attribute.components,
                });
            }
            let end = attribute.offset.checked_add(attribute.size());
            if !end.is_some_and(|end| end <= stride) {
                return Err(LayoutError::AttributeOutOfBounds {
                    slot: attribute.slot,
                    end: end.unwrap_or(usize::MAX),
                    stride,
                });
            }
        }

        Ok(Self { stride, attributes })
    }

    /// Builds a layout whose stride is `size_of::<V>()`.
    ///
    /// # Errors
    ///
    /// See [`VertexLayout::new`].
    pub fn of<V>(attributes: Vec<VertexAttribute>) -> Result<Self, LayoutError> {
        Self::new(size_of::<V>(), attributes)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Configures the currently bound vertex array to read this layout from
    /// the currently bound vertex buffer.
    pub fn apply<G: Gpu>(&self, gpu: &G) {
        for attribute in &self.attributes {
            gpu.vertex_attribute(
                attribute.slot,
                attribute.components,
                attribute.component_type,
                self.stride,
                attribute.offset,
            );
        }
    }

    /// Compares the layout's slots with a program's active inputs.
    ///
    /// Returns every slot the program does not read and every input the
    /// layout does not feed; an empty result means the two agree.
    pub fn check_against(&self, inputs: &[(String, u32)]) -> Vec<LayoutMismatch> {
        let slots: HashSet<u32> = self.attributes.iter().map(|a| a.slot).collect();
        let locations: HashSet<u32> = inputs.iter().map(|(_, loc)| *loc).collect();

        let mut mismatches: Vec<LayoutMismatch> = self
            .attributes
            .iter()
            .filter(|a| !locations.contains(&a.slot))
            .map(|a| LayoutMismatch::UnusedSlot(a.slot))
            .collect();

        let missing = inputs
            .iter()
            .filter(|(_, loc)| !slots.contains(loc))
            .map(|(name, loc)| LayoutMismatch::MissingInput {
                name: name.clone(),
                location: *loc,
            });
        mismatches.extend(missing);

        for mismatch in &mismatches {
            log::warn!("vertex layout does not match program inputs: {mismatch:?}");
        }
        mismatches
    }
}

/// A vertex record type with a known attribute layout.
pub trait Vertex: Pod {
    /// The layout of `Self`, with slots numbered from 0 in field order.
    fn layout() -> VertexLayout;
}

/// Builds the layout of a built-in record. The built-in records are
/// `repr(C)` float arrays, so their attributes always fit.
fn builtin_layout<V>(attributes: Vec<VertexAttribute>) -> VertexLayout {
    let stride = size_of::<V>();
    VertexLayout { stride, attributes }
}

/// 2D position with an RGB color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex for ColorVertex {
    fn layout() -> VertexLayout {
        builtin_layout::<Self>(vec![
            VertexAttribute::f32(0, offset_of!(ColorVertex, position), 2),
            VertexAttribute::f32(1, offset_of!(ColorVertex, color), 3),
        ])
    }
}

/// 3D position, RGB color and texture coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex for TexturedVertex {
    fn layout() -> VertexLayout {
        builtin_layout::<Self>(vec![
            VertexAttribute::f32(0, offset_of!(TexturedVertex, position), 3),
            VertexAttribute::f32(1, offset_of!(TexturedVertex, color), 3),
            VertexAttribute::f32(2, offset_of!(TexturedVertex, uv), 2),
        ])
    }
}

/// Textured vertex with a surface normal for lighting.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct LitVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for LitVertex {
    fn layout() -> VertexLayout {
        builtin_layout::<Self>(vec![
            VertexAttribute::f32(0, offset_of!(LitVertex, position), 3),
            VertexAttribute::f32(1, offset_of!(LitVertex, color), 3),
            VertexAttribute::f32(2, offset_of!(LitVertex, uv), 2),
            VertexAttribute::f32(3, offset_of!(LitVertex, normal), 3),
        ])
    }
}

/// Bare position, as used by the light cube.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl Vertex for PositionVertex {
    fn layout() -> VertexLayout {
        builtin_layout::<Self>(vec![VertexAttribute::f32(
            0,
            offset_of!(PositionVertex, position),
            3,
        )])
    }
}
