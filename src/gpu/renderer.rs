//! Frame plan executor
//!
//! Walks a [`FramePlan`] in order and records every pass into one command
//! encoder: per eye, the three wall passes into the wall targets, then the
//! composed pass into that eye's half of the eye buffer. All per-draw
//! uniforms of a frame go into one buffer addressed with dynamic offsets.

use std::num::NonZeroU64;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use log::{debug, info};
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline};

use crate::cave::Wall;
use crate::config::CaveConfig;
use crate::driver::FramePlan;
use crate::error::GpuError;
use crate::hmd::Eye;
use crate::scene::{MeshKind, SceneDraw};

use super::mesh::{self, LineVertex, MeshVertex, TexturedVertex, CUBE_VERTEX_COUNT, QUAD_VERTEX_COUNT};
use super::targets::{EyeBuffers, WallTargets, COLOR_FORMAT, DEPTH_FORMAT};
use super::GpuContext;

// Per-draw uniforms, mirrored by `Draw` in the shaders
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DrawUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    params: [u32; 4], // x = sky variant
}

impl DrawUniforms {
    fn new(view_proj: Mat4, model: Mat4, color: [f32; 4], sky: u32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            color,
            params: [sky, 0, 0, 0],
        }
    }
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;
const INITIAL_UNIFORM_SLOTS: u64 = 64;
const INITIAL_LINE_VERTICES: u64 = 64;

/// CPU-side staging of one frame's uniforms at aligned offsets
struct UniformArena {
    stride: u64,
    data: Vec<u8>,
}

impl UniformArena {
    fn new(alignment: u32) -> Self {
        Self { stride: align_to(UNIFORM_SIZE, alignment as u64), data: Vec::new() }
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    /// Append `uniforms`, returning its dynamic offset
    fn push(&mut self, uniforms: DrawUniforms) -> u32 {
        let offset = self.data.len();
        self.data.extend_from_slice(bytemuck::bytes_of(&uniforms));
        self.data.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    fn len(&self) -> usize {
        self.data.len() / self.stride as usize
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }
}

fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineKind {
    Mesh,
    Sky,
}

#[derive(Debug, Clone, Copy)]
struct StagedDraw {
    pipeline: PipelineKind,
    offset: u32,
}

struct StagedWall {
    wall: Wall,
    draws: Vec<StagedDraw>,
}

struct StagedLines {
    offset: u32,
    vertices: Range<u32>,
}

struct StagedEye {
    eye: Eye,
    walls: Vec<StagedWall>,
    draws: Vec<StagedDraw>,
    cave: u32,
    lines: Option<StagedLines>,
}

/// A frame plan resolved to uniform offsets and line vertices
struct StagedFrame {
    eyes: Vec<StagedEye>,
    lines: Vec<LineVertex>,
}

fn stage_draw(arena: &mut UniformArena, view_proj: Mat4, draw: &SceneDraw) -> StagedDraw {
    let (pipeline, sky) = match draw.mesh {
        MeshKind::Sky(variant) => (PipelineKind::Sky, variant.id()),
        MeshKind::Cube | MeshKind::Cursor => (PipelineKind::Mesh, 0),
    };
    StagedDraw { pipeline, offset: arena.push(DrawUniforms::new(view_proj, draw.model, draw.color, sky)) }
}

fn stage_frame(arena: &mut UniformArena, plan: &FramePlan) -> StagedFrame {
    let mut lines = Vec::new();
    let eyes = plan
        .eyes
        .iter()
        .map(|eye_plan| {
            let walls = eye_plan
                .walls
                .iter()
                .map(|pass| StagedWall {
                    wall: pass.wall,
                    draws: pass
                        .draws
                        .iter()
                        .map(|draw| stage_draw(arena, pass.off_axis.view_projection, draw))
                        .collect(),
                })
                .collect();

            let composed = &eye_plan.composed;
            let view_proj = composed.projection * composed.view;
            let draws = composed.draws.iter().map(|draw| stage_draw(arena, view_proj, draw)).collect();
            let cave = arena.push(DrawUniforms::new(view_proj, composed.cave_model, [1.0; 4], 0));

            let staged_lines = if composed.lines.is_empty() {
                None
            } else {
                let start = lines.len() as u32;
                lines.extend(composed.lines.iter().flat_map(LineVertex::from_line));
                Some(StagedLines {
                    offset: arena.push(DrawUniforms::new(view_proj, Mat4::IDENTITY, [1.0; 4], 0)),
                    vertices: start..lines.len() as u32,
                })
            };

            StagedEye { eye: eye_plan.eye, walls, draws, cave, lines: staged_lines }
        })
        .collect();

    StagedFrame { eyes, lines }
}

/// GPU side of the simulator: pipelines, meshes and targets
pub struct Renderer {
    mesh_pipeline: RenderPipeline,
    sky_pipeline: RenderPipeline,
    cave_pipeline: RenderPipeline,
    line_pipeline: RenderPipeline,

    uniform_layout: BindGroupLayout,
    uniform_buffer: Buffer,
    uniform_capacity: u64,
    uniform_bind_group: BindGroup,
    arena: UniformArena,

    cube_buffer: Buffer,
    cave_buffer: Buffer,
    line_buffer: Buffer,
    line_capacity: u64,

    walls: WallTargets,
    eye_buffers: EyeBuffers,
}

impl Renderer {
    pub fn new(gpu: &GpuContext, config: &CaveConfig, eye_size: (u32, u32)) -> Result<Self, GpuError> {
        let device = &gpu.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Wall Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
        });
        let cave_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cave Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/cave.wgsl").into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/line.wgsl").into()),
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let cave_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cave Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            device,
            &PipelineSpec {
                label: "Mesh Pipeline",
                layout: &scene_layout,
                shader: &scene_shader,
                fragment_entry: "fs_mesh",
                vertex: MeshVertex::layout(),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        );
        let sky_pipeline = create_pipeline(
            device,
            &PipelineSpec {
                label: "Sky Pipeline",
                layout: &scene_layout,
                shader: &scene_shader,
                fragment_entry: "fs_sky",
                vertex: MeshVertex::layout(),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        );
        let cave_pipeline = create_pipeline(
            device,
            &PipelineSpec {
                label: "Cave Pipeline",
                layout: &cave_layout,
                shader: &cave_shader,
                fragment_entry: "fs_main",
                vertex: TexturedVertex::layout(),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        );
        let line_pipeline = create_pipeline(
            device,
            &PipelineSpec {
                label: "Line Pipeline",
                layout: &scene_layout,
                shader: &line_shader,
                fragment_entry: "fs_main",
                vertex: LineVertex::layout(),
                topology: wgpu::PrimitiveTopology::LineList,
            },
        );

        let arena = UniformArena::new(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_capacity = INITIAL_UNIFORM_SLOTS * arena.stride;
        let uniform_buffer = create_uniform_buffer(device, uniform_capacity);
        let uniform_bind_group = create_uniform_bind_group(device, &uniform_layout, &uniform_buffer);

        let cube_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Vertices"),
            contents: bytemuck::cast_slice(&mesh::cube()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cave_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cave Quad Vertices"),
            contents: bytemuck::cast_slice(&mesh::cave_quads()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let line_capacity = INITIAL_LINE_VERTICES;
        let line_buffer = create_line_buffer(device, line_capacity);

        let walls = WallTargets::new(gpu, config.wall_resolution, &texture_layout)?;
        let eye_buffers = EyeBuffers::new(gpu, eye_size.0, eye_size.1)?;

        info!(
            "Renderer ready: walls {}x{}, eye buffer {}x{}",
            config.wall_resolution,
            config.wall_resolution,
            eye_buffers.size().0,
            eye_buffers.size().1
        );

        Ok(Self {
            mesh_pipeline,
            sky_pipeline,
            cave_pipeline,
            line_pipeline,
            uniform_layout,
            uniform_buffer,
            uniform_capacity,
            uniform_bind_group,
            arena,
            cube_buffer,
            cave_buffer,
            line_buffer,
            line_capacity,
            walls,
            eye_buffers,
        })
    }

    pub fn eye_buffers(&self) -> &EyeBuffers {
        &self.eye_buffers
    }

    /// Execute `plan` and return the filled eye buffer
    pub fn render(&mut self, gpu: &GpuContext, plan: &FramePlan) -> &EyeBuffers {
        self.arena.clear();
        let staged = stage_frame(&mut self.arena, plan);
        self.reserve(&gpu.device, staged.lines.len() as u64);

        gpu.queue.write_buffer(&self.uniform_buffer, 0, self.arena.bytes());
        if !staged.lines.is_empty() {
            gpu.queue.write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&staged.lines));
        }

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cave Frame Encoder"),
        });

        for eye in &staged.eyes {
            for wall in &eye.walls {
                let mut pass = self.walls.begin_wall_pass(&mut encoder, wall.wall, plan.wall_clear_color);
                for draw in &wall.draws {
                    self.draw_cube(&mut pass, draw);
                }
            }

            // Skybox, cave, lines, cursors
            let mut pass = self.eye_buffers.begin_eye_pass(&mut encoder, eye.eye, plan.eye_clear_color);
            let (skies, cursors): (Vec<&StagedDraw>, Vec<&StagedDraw>) =
                eye.draws.iter().partition(|d| d.pipeline == PipelineKind::Sky);
            for draw in skies {
                self.draw_cube(&mut pass, draw);
            }
            self.draw_cave(&mut pass, eye.cave);
            if let Some(lines) = &eye.lines {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[lines.offset]);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(lines.vertices.clone(), 0..1);
            }
            for draw in cursors {
                self.draw_cube(&mut pass, draw);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        &self.eye_buffers
    }

    /// Every wall quad, textured with that wall's target
    fn draw_cave(&self, pass: &mut wgpu::RenderPass<'_>, offset: u32) {
        pass.set_pipeline(&self.cave_pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
        pass.set_vertex_buffer(0, self.cave_buffer.slice(..));
        for wall in Wall::ALL {
            let first = mesh::cave_quad_offset(wall);
            pass.set_bind_group(1, self.walls.bind_group(wall), &[]);
            pass.draw(first..first + QUAD_VERTEX_COUNT, 0..1);
        }
    }

    fn draw_cube(&self, pass: &mut wgpu::RenderPass<'_>, draw: &StagedDraw) {
        let pipeline = match draw.pipeline {
            PipelineKind::Mesh => &self.mesh_pipeline,
            PipelineKind::Sky => &self.sky_pipeline,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[draw.offset]);
        pass.set_vertex_buffer(0, self.cube_buffer.slice(..));
        pass.draw(0..CUBE_VERTEX_COUNT, 0..1);
    }

    /// Grow the uniform and line buffers to fit the staged frame
    fn reserve(&mut self, device: &Device, line_vertices: u64) {
        let uniform_bytes = self.arena.bytes().len() as u64;
        if uniform_bytes > self.uniform_capacity {
            self.uniform_capacity = uniform_bytes.next_power_of_two();
            debug!("Growing uniform buffer to {} bytes ({} draws)", self.uniform_capacity, self.arena.len());
            self.uniform_buffer = create_uniform_buffer(device, self.uniform_capacity);
            self.uniform_bind_group = create_uniform_bind_group(device, &self.uniform_layout, &self.uniform_buffer);
        }
        if line_vertices > self.line_capacity {
            self.line_capacity = line_vertices.next_power_of_two();
            debug!("Growing line buffer to {} vertices", self.line_capacity);
            self.line_buffer = create_line_buffer(device, self.line_capacity);
        }
    }
}

struct PipelineSpec<'a> {
    label: &'static str,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    fragment_entry: &'static str,
    vertex: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
}

fn create_pipeline(device: &Device, spec: &PipelineSpec<'_>) -> RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: &[spec.vertex.clone()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some(spec.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        // Skyboxes are seen from inside and walls from both sides
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_uniform_buffer(device: &Device, size: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniforms"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(device: &Device, layout: &BindGroupLayout, buffer: &Buffer) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(UNIFORM_SIZE),
            }),
        }],
    })
}

fn create_line_buffer(device: &Device, vertices: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Debug Line Vertices"),
        size: vertices * std::mem::size_of::<LineVertex>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
