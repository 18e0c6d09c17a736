//! Write-once GPU buffers for vertex and index data.
//!
//! A [`GpuBuffer`] uploads a typed slice exactly once with a static usage
//! hint and owns the resulting buffer object until it is dropped. There is
//! no update, resize or read-back path. [`VertexBuffer`] and [`IndexBuffer`]
//! wrap it with what a vertex array needs from each side: the record stride
//! and the index count, type and topology.

use super::gpu::{BufferTarget, Gpu, IndexType, Topology};
use crate::error::SandboxError;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::mem::size_of;

/// An integer type that can be stored in an index buffer.
pub trait IndexElement: Pod {
    const INDEX_TYPE: IndexType;
}

impl IndexElement for u8 {
    const INDEX_TYPE: IndexType = IndexType::U8;
}

impl IndexElement for u16 {
    const INDEX_TYPE: IndexType = IndexType::U16;
}

impl IndexElement for u32 {
    const INDEX_TYPE: IndexType = IndexType::U32;
}

/// One GPU buffer object holding `len` elements of `T`.
///
/// Not `Clone`: the buffer object is released exactly once, when this
/// value is dropped.
pub struct GpuBuffer<'gl, G: Gpu, T: Pod> {
    gpu: &'gl G,
    handle: G::Buffer,
    target: BufferTarget,
    len: usize,
    _element: PhantomData<T>,
}

impl<'gl, G: Gpu, T: Pod> GpuBuffer<'gl, G, T> {
    /// Creates a buffer bound to `target` and uploads `data` into it.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::EmptyBuffer` if `data` is empty, or
    /// `SandboxError::Backend` if the context cannot create the buffer.
    pub fn new(gpu: &'gl G, target: BufferTarget, data: &[T]) -> Result<Self, SandboxError> {
        if data.is_empty() {
            return Err(SandboxError::EmptyBuffer(match target {
                BufferTarget::Vertex => "vertex",
                BufferTarget::Index => "index",
            }));
        }

        let handle = gpu.create_buffer().map_err(SandboxError::Backend)?;
        gpu.upload_static(target, handle, bytemuck::cast_slice(data));
        log::debug!(
            "created {target:?} buffer {handle:?}: {} elements, {} bytes",
            data.len(),
            std::mem::size_of_val(data)
        );

        Ok(Self {
            gpu,
            handle,
            target,
            len: data.len(),
            _element: PhantomData,
        })
    }

    /// The backend handle, for binding elsewhere.
    pub fn handle(&self) -> G::Buffer {
        self.handle
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Number of elements uploaded.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: empty buffers are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes uploaded, `len() * size_of::<T>()`.
    pub fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }
}

impl<G: Gpu, T: Pod> Drop for GpuBuffer<'_, G, T> {
    fn drop(&mut self) {
        log::trace!("deleting {:?} buffer {:?}", self.target, self.handle);
        self.gpu.delete_buffer(self.handle);
    }
}

/// A buffer of interleaved vertex records of type `V`.
///
/// The stride is always `size_of::<V>()`, so the binding configured from it
/// matches the record layout on the CPU side.
pub struct VertexBuffer<'gl, G: Gpu, V: Pod> {
    buffer: GpuBuffer<'gl, G, V>,
}

impl<'gl, G: Gpu, V: Pod> VertexBuffer<'gl, G, V> {
    /// Uploads `vertices`.
    ///
    /// # Errors
    ///
    /// See [`GpuBuffer::new`].
    pub fn new(gpu: &'gl G, vertices: &[V]) -> Result<Self, SandboxError> {
        Ok(Self {
            buffer: GpuBuffer::new(gpu, BufferTarget::Vertex, vertices)?,
        })
    }

    pub fn handle(&self) -> G::Buffer {
        self.buffer.handle()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes between consecutive records.
    pub fn stride(&self) -> usize {
        size_of::<V>()
    }

    pub fn buffer(&self) -> &GpuBuffer<'gl, G, V> {
        &self.buffer
    }
}

/// A buffer of element indices with the primitive topology they describe.
pub struct IndexBuffer<'gl, G: Gpu, I: IndexElement> {
    buffer: GpuBuffer<'gl, G, I>,
    topology: Topology,
}

impl<'gl, G: Gpu, I: IndexElement> IndexBuffer<'gl, G, I> {
    /// Uploads `indices` as a triangle list.
    ///
    /// # Errors
    ///
    /// See [`GpuBuffer::new`].
    pub fn new(gpu: &'gl G, indices: &[I]) -> Result<Self, SandboxError> {
        Self::with_topology(gpu, indices, Topology::Triangles)
    }

    /// Uploads `indices` to be drawn as `topology`.
    ///
    /// # Errors
    ///
    /// See [`GpuBuffer::new`].
    pub fn with_topology(
        gpu: &'gl G,
        indices: &[I],
        topology: Topology,
    ) -> Result<Self, SandboxError> {
        Ok(Self {
            buffer: GpuBuffer::new(gpu, BufferTarget::Index, indices)?,
            topology,
        })
    }

    pub fn handle(&self) -> G::Buffer {
        self.buffer.handle()
    }

    /// Number of indices, i.e. the element count of an indexed draw.
    pub fn count(&self) -> usize {
        self.buffer.len()
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn index_type(&self) -> IndexType {
        I::INDEX_TYPE
    }

    pub fn buffer(&self) -> &GpuBuffer<'gl, G, I> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{GpuCall, ObjectKind, RecordingGpu};
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Clone, Copy, Zeroable, Pod)]
    struct Record {
        position: [f32; 3],
        color: [f32; 3],
    }

    #[test]
    fn element_count_matches_input() {
        let gpu = RecordingGpu::new();
        let data = [Record::zeroed(); 7];
        let buffer = GpuBuffer::new(&gpu, BufferTarget::Vertex, &data).unwrap();
        assert_eq!(buffer.len(), 7);
        assert_eq!(buffer.byte_len(), 7 * 24);
    }

    #[test]
    fn upload_writes_exactly_the_input_bytes() {
        let gpu = RecordingGpu::new();
        let data: [u32; 6] = [0, 1, 2, 1, 2, 3];
        let buffer = GpuBuffer::new(&gpu, BufferTarget::Index, &data).unwrap();
        let stored = gpu.buffer_contents(buffer.handle()).unwrap();
        assert_eq!(stored.len(), 6 * 4);
        assert_eq!(stored.as_slice(), bytemuck::cast_slice::<u32, u8>(&data));
    }

    #[test]
    fn upload_happens_once_with_the_buffer_target() {
        let gpu = RecordingGpu::new();
        let buffer = GpuBuffer::new(&gpu, BufferTarget::Index, &[1u16, 2, 3]).unwrap();
        let uploads: Vec<_> = gpu
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GpuCall::UploadStatic { .. }))
            .collect();
        assert_eq!(
            uploads,
            vec![GpuCall::UploadStatic {
                target: BufferTarget::Index,
                buffer: buffer.handle(),
                len: 6,
            }]
        );
    }

    #[test]
    fn empty_slice_is_rejected_without_allocating() {
        let gpu = RecordingGpu::new();
        let result = GpuBuffer::<_, f32>::new(&gpu, BufferTarget::Vertex, &[]);
        assert!(matches!(result, Err(SandboxError::EmptyBuffer("vertex"))));
        assert_eq!(gpu.created(ObjectKind::Buffer), 0);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let gpu = RecordingGpu::new();
        {
            let _buffer = GpuBuffer::new(&gpu, BufferTarget::Vertex, &[1.0f32, 2.0]).unwrap();
            assert_eq!(gpu.live(ObjectKind::Buffer), 1);
        }
        assert_eq!(gpu.live(ObjectKind::Buffer), 0);
        assert_eq!(gpu.deleted(ObjectKind::Buffer), 1);
        assert_eq!(gpu.invalid_deletes(), 0);
    }

    #[test]
    fn moving_a_buffer_does_not_release_it() {
        let gpu = RecordingGpu::new();
        let buffer = GpuBuffer::new(&gpu, BufferTarget::Vertex, &[1.0f32]).unwrap();
        let moved = vec![buffer];
        assert_eq!(gpu.live(ObjectKind::Buffer), 1);
        drop(moved);
        assert_eq!(gpu.deleted(ObjectKind::Buffer), 1);
    }

    #[test]
    fn thousand_buffers_neither_leak_nor_double_free() {
        let gpu = RecordingGpu::new();
        for i in 0..1000u32 {
            let _buffer = GpuBuffer::new(&gpu, BufferTarget::Index, &[i]).unwrap();
        }
        assert_eq!(gpu.created(ObjectKind::Buffer), 1000);
        assert_eq!(gpu.deleted(ObjectKind::Buffer), 1000);
        assert_eq!(gpu.live(ObjectKind::Buffer), 0);
        assert_eq!(gpu.invalid_deletes(), 0);
    }

    #[test]
    fn vertex_buffer_stride_is_record_size() {
        let gpu = RecordingGpu::new();
        let vertices = VertexBuffer::new(&gpu, &[Record::zeroed(); 3]).unwrap();
        assert_eq!(vertices.stride(), size_of::<Record>());
        assert_eq!(vertices.len(), 3);
    }

    #[test]
    fn index_buffer_defaults_to_triangles() {
        let gpu = RecordingGpu::new();
        let indices = IndexBuffer::new(&gpu, &[0u32, 1, 2, 1, 2, 3]).unwrap();
        assert_eq!(indices.count(), 6);
        assert_eq!(indices.topology(), Topology::Triangles);
        assert_eq!(indices.index_type(), IndexType::U32);
    }

    #[test]
    fn index_type_follows_element_width() {
        let gpu = RecordingGpu::new();
        let narrow = IndexBuffer::new(&gpu, &[0u8, 1, 2]).unwrap();
        let medium = IndexBuffer::with_topology(&gpu, &[0u16, 1], Topology::Lines).unwrap();
        assert_eq!(narrow.index_type(), IndexType::U8);
        assert_eq!(medium.index_type(), IndexType::U16);
        assert_eq!(medium.topology(), Topology::Lines);
    }
}
