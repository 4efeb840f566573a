//! wgpu-backed render scene.
//!
//! The reference [`RenderScene`] implementation: per-mesh vertex and index
//! buffers with manually managed lifetimes, a shared texture-atlas bind
//! group, and capacity-aware geometry swaps that reuse buffers via
//! `Queue::write_buffer` whenever the new data fits.
//!
//! The compositing pipeline is not part of this crate; an external renderer
//! binds [`WgpuScene::material_bind_group`], iterates the visible meshes and
//! issues the draws. Everything here stops at resource ownership.

use std::collections::HashMap;

use image::RgbaImage;
use log::{debug, info};
use thiserror::Error;
use wgpu::util::DeviceExt;

use super::meshing::mesh::GeometryBuffer;
use super::scene::{MeshDescriptor, RenderScene};
use crate::config::AtlasLayout;
use crate::core::StResource;

/// A vertex in the chunk rendering pipeline.
///
/// Interleaved from the geometry buffer's position/normal/uv arrays for
/// upload. The layout matches [`Vertex::desc`].
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the mesh origin.
    pub position: [f32; 3],
    /// Outward face normal.
    pub normal: [f32; 3],
    /// Atlas texture coordinates.
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// The vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: normal (vec3<f32>)
    /// - `location = 2`: tex_coords (vec2<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Interleaves a geometry buffer into upload-ready vertices.
fn interleave(geometry: &GeometryBuffer) -> Vec<Vertex> {
    let count = geometry.vertex_count();
    let mut vertices = Vec::with_capacity(count);
    for i in 0..count {
        vertices.push(Vertex {
            position: [
                geometry.positions[i * 3],
                geometry.positions[i * 3 + 1],
                geometry.positions[i * 3 + 2],
            ],
            normal: [
                geometry.normals[i * 3],
                geometry.normals[i * 3 + 1],
                geometry.normals[i * 3 + 2],
            ],
            tex_coords: [geometry.uvs[i * 2], geometry.uvs[i * 2 + 1]],
        });
    }
    vertices
}

/// The texture atlas with its view and sampler.
pub struct AtlasTexture {
    /// The underlying texture resource.
    pub texture: wgpu::Texture,
    /// View used when binding the atlas.
    pub view: wgpu::TextureView,
    /// Nearest-filter sampler; voxel tiles must not bleed into each other.
    pub sampler: wgpu::Sampler,
}

impl AtlasTexture {
    /// Uploads an RGBA atlas image.
    fn from_rgba(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage) -> Self {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Chunk Atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        AtlasTexture {
            texture,
            view,
            sampler,
        }
    }
}

/// Errors raised while bringing the wgpu scene up.
#[derive(Debug, Error)]
pub enum SceneInitError {
    /// No suitable GPU adapter was found.
    #[error("no suitable gpu adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// The adapter refused the device request.
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    /// The atlas image does not match the configured layout.
    #[error("atlas image is {got_width}x{got_height}, expected {expected_width}x{expected_height}")]
    AtlasSizeMismatch {
        /// Width of the provided image.
        got_width: u32,
        /// Height of the provided image.
        got_height: u32,
        /// Width the layout expects.
        expected_width: u32,
        /// Height the layout expects.
        expected_height: u32,
    },
}

/// One chunk mesh's GPU-side state.
struct GpuMesh {
    descriptor: MeshDescriptor,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_capacity: u64,
    index_count: u32,
    visible: bool,
}

/// Aggregate resource counters for logging and inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneReport {
    /// Live mesh objects.
    pub meshes: usize,
    /// Currently visible mesh objects.
    pub visible: usize,
    /// Bytes allocated across vertex buffers.
    pub vertex_bytes: u64,
    /// Bytes allocated across index buffers.
    pub index_bytes: u64,
}

/// The wgpu-backed [`RenderScene`].
pub struct WgpuScene {
    device: StResource<wgpu::Device>,
    queue: StResource<wgpu::Queue>,
    atlas: AtlasTexture,
    material_layout: wgpu::BindGroupLayout,
    material_bind_group: wgpu::BindGroup,
    meshes: HashMap<u64, GpuMesh>,
    next_handle: u64,
}

impl WgpuScene {
    /// Brings up an adapter and device, then builds the scene around them.
    pub fn new(atlas_image: RgbaImage, layout: &AtlasLayout) -> Result<Self, SceneInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        info!("wgpu scene on adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            label: None,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        }))?;

        Self::with_device(device, queue, atlas_image, layout)
    }

    /// Builds the scene on an existing device and queue.
    pub fn with_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        atlas_image: RgbaImage,
        layout: &AtlasLayout,
    ) -> Result<Self, SceneInitError> {
        if atlas_image.width() != layout.width || atlas_image.height() != layout.height {
            return Err(SceneInitError::AtlasSizeMismatch {
                got_width: atlas_image.width(),
                got_height: atlas_image.height(),
                expected_width: layout.width,
                expected_height: layout.height,
            });
        }

        let atlas = AtlasTexture::from_rgba(&device, &queue, &atlas_image);

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Chunk Material Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Chunk Material"),
            layout: &material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas.sampler),
                },
            ],
        });

        Ok(WgpuScene {
            device: StResource::new(device),
            queue: StResource::new(queue),
            atlas,
            material_layout,
            material_bind_group,
            meshes: HashMap::new(),
            next_handle: 0,
        })
    }

    /// The bind group layout external pipelines build against.
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    /// The shared atlas bind group; both material kinds sample it.
    pub fn material_bind_group(&self) -> &wgpu::BindGroup {
        &self.material_bind_group
    }

    /// The atlas texture resources.
    pub fn atlas(&self) -> &AtlasTexture {
        &self.atlas
    }

    /// Resource counters across every live mesh.
    pub fn report(&self) -> SceneReport {
        let mut report = SceneReport {
            meshes: self.meshes.len(),
            ..SceneReport::default()
        };
        for mesh in self.meshes.values() {
            if mesh.visible {
                report.visible += 1;
            }
            report.vertex_bytes += mesh.vertex_capacity;
            report.index_bytes += mesh.index_capacity;
        }
        report
    }

    fn create_mesh_buffers(&self, label: &str, vertices: &[Vertex], indices: &[u32]) -> (wgpu::Buffer, wgpu::Buffer) {
        let device = self.device.get();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex Buffer {}", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Index Buffer {}", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });
        (vertex_buffer, index_buffer)
    }
}

impl RenderScene for WgpuScene {
    type MeshHandle = u64;

    fn add_mesh(
        &mut self,
        descriptor: MeshDescriptor,
        geometry: &GeometryBuffer,
    ) -> Self::MeshHandle {
        let vertices = interleave(geometry);
        let indices = &geometry.indices;
        let (vertex_buffer, index_buffer) =
            self.create_mesh_buffers(&descriptor.label, &vertices, indices);

        let handle = self.next_handle;
        self.next_handle += 1;
        debug!("created mesh {} ({})", handle, descriptor.label);

        self.meshes.insert(
            handle,
            GpuMesh {
                descriptor,
                vertex_buffer,
                index_buffer,
                vertex_capacity: (vertices.len() * std::mem::size_of::<Vertex>()) as u64,
                index_capacity: (indices.len() * std::mem::size_of::<u32>()) as u64,
                index_count: indices.len() as u32,
                visible: true,
            },
        );
        handle
    }

    fn replace_geometry(&mut self, handle: &Self::MeshHandle, geometry: &GeometryBuffer) {
        let vertices = interleave(geometry);
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&geometry.indices);

        // Split borrows: buffer recreation needs &self while the mesh entry
        // stays mutably borrowed, so gather the new buffers first.
        let needs_realloc = match self.meshes.get(handle) {
            Some(mesh) => {
                vertex_bytes.len() as u64 > mesh.vertex_capacity
                    || index_bytes.len() as u64 > mesh.index_capacity
            }
            None => return,
        };

        if needs_realloc {
            let label = self.meshes[handle].descriptor.label.clone();
            let (vertex_buffer, index_buffer) =
                self.create_mesh_buffers(&label, &vertices, &geometry.indices);
            let mesh = self.meshes.get_mut(handle).expect("checked above");
            std::mem::replace(&mut mesh.vertex_buffer, vertex_buffer).destroy();
            std::mem::replace(&mut mesh.index_buffer, index_buffer).destroy();
            mesh.vertex_capacity = vertex_bytes.len() as u64;
            mesh.index_capacity = index_bytes.len() as u64;
            mesh.index_count = geometry.indices.len() as u32;
        } else {
            let queue = self.queue.get();
            let mesh = self.meshes.get_mut(handle).expect("checked above");
            queue.write_buffer(&mesh.vertex_buffer, 0, vertex_bytes);
            queue.write_buffer(&mesh.index_buffer, 0, index_bytes);
            mesh.index_count = geometry.indices.len() as u32;
        }
    }

    fn set_visible(&mut self, handle: &Self::MeshHandle, visible: bool) {
        if let Some(mesh) = self.meshes.get_mut(handle) {
            mesh.visible = visible;
        }
    }

    fn remove_mesh(&mut self, handle: Self::MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle) {
            debug!("destroying mesh {} ({})", handle, mesh.descriptor.label);
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
    }
}
