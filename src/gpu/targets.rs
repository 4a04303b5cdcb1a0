//! Off-screen render targets
//!
//! One color + depth target per wall, shared by both eyes (each eye's wall
//! passes run right before that eye's composed pass), and the side-by-side
//! stereo eye buffer handed to the compositor.

use log::info;

use crate::cave::Wall;
use crate::error::GpuError;
use crate::hmd::Eye;

use super::GpuContext;

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Color + depth attachment pair
pub struct RenderTarget {
    label: &'static str,
    width: u32,
    height: u32,
    #[allow(dead_code)]
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    #[allow(dead_code)]
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn new(gpu: &GpuContext, label: &'static str, width: u32, height: u32) -> Result<Self, GpuError> {
        check_size(label, width, height, gpu.max_texture_size())?;

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let color = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let error = pollster::block_on(gpu.device.pop_error_scope());
        validation_result(label, error.map(|e| e.to_string()))?;

        info!("Created render target '{}' ({}x{})", label, width, height);
        Ok(Self { label, width, height, color, color_view, depth, depth_view })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// Start a pass on this target. `clear` = None keeps existing contents.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: Option<[f32; 4]>,
    ) -> wgpu::RenderPass<'e> {
        let (color_load, depth_load) = match clear {
            Some([r, g, b, a]) => (
                wgpu::LoadOp::Clear(wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }),
                wgpu::LoadOp::Clear(1.0),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

/// Reject target sizes the device cannot allocate
fn check_size(label: &'static str, width: u32, height: u32, max: u32) -> Result<(), GpuError> {
    if width == 0 || height == 0 {
        return Err(GpuError::IncompleteTarget {
            label: label.to_string(),
            reason: format!("zero-sized {}x{}", width, height),
        });
    }
    if width > max || height > max {
        return Err(GpuError::IncompleteTarget {
            label: label.to_string(),
            reason: format!("{}x{} exceeds device limit {}", width, height, max),
        });
    }
    Ok(())
}

/// Map a validation error raised while allocating `label` to a target error
fn validation_result(label: &'static str, error: Option<String>) -> Result<(), GpuError> {
    match error {
        Some(reason) => Err(GpuError::IncompleteTarget { label: label.to_string(), reason }),
        None => Ok(()),
    }
}

/// Width of the side-by-side buffer holding both eyes
fn stereo_width(eye_width: u32) -> Result<u32, GpuError> {
    eye_width.checked_mul(2).ok_or_else(|| GpuError::IncompleteTarget {
        label: "Eye Buffer".to_string(),
        reason: format!("eye width {} overflows a side-by-side buffer", eye_width),
    })
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(self.x, self.y, self.width, self.height, 0.0, 1.0);
    }
}

/// The three square wall textures plus their sampling bind groups
pub struct WallTargets {
    targets: [RenderTarget; 3],
    bind_groups: [wgpu::BindGroup; 3],
    resolution: u32,
}

impl WallTargets {
    pub fn new(gpu: &GpuContext, resolution: u32, layout: &wgpu::BindGroupLayout) -> Result<Self, GpuError> {
        let targets = [
            RenderTarget::new(gpu, Wall::Left.label(), resolution, resolution)?,
            RenderTarget::new(gpu, Wall::Right.label(), resolution, resolution)?,
            RenderTarget::new(gpu, Wall::Bottom.label(), resolution, resolution)?,
        ];

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Wall Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_groups = Wall::ALL.map(|wall| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(wall.label()),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(targets[wall.index()].color_view()),
                    },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&sampler) },
                ],
            })
        });

        Ok(Self { targets, bind_groups, resolution })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn target(&self, wall: Wall) -> &RenderTarget {
        &self.targets[wall.index()]
    }

    /// Texture + sampler of `wall` for the composed pass
    pub fn bind_group(&self, wall: Wall) -> &wgpu::BindGroup {
        &self.bind_groups[wall.index()]
    }

    /// Clear `wall`'s target and set the full-texture viewport
    pub fn begin_wall_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        wall: Wall,
        clear: [f32; 4],
    ) -> wgpu::RenderPass<'e> {
        let mut pass = self.target(wall).begin_pass(encoder, Some(clear));
        let size = self.resolution as f32;
        Viewport { x: 0.0, y: 0.0, width: size, height: size }.apply(&mut pass);
        pass
    }
}

/// Side-by-side stereo eye buffer, left eye in the left half
pub struct EyeBuffers {
    target: RenderTarget,
    eye_width: u32,
    eye_height: u32,
}

impl EyeBuffers {
    pub fn new(gpu: &GpuContext, eye_width: u32, eye_height: u32) -> Result<Self, GpuError> {
        let target = RenderTarget::new(gpu, "Eye Buffer", stereo_width(eye_width)?, eye_height)?;
        Ok(Self { target, eye_width, eye_height })
    }

    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        self.target.color_view()
    }

    pub fn viewport(&self, eye: Eye) -> Viewport {
        eye_viewport(eye, self.eye_width, self.eye_height)
    }

    /// Start `eye`'s composed pass. The whole buffer is cleared once, by the
    /// left eye; the right eye loads it.
    pub fn begin_eye_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        eye: Eye,
        clear: [f32; 4],
    ) -> wgpu::RenderPass<'e> {
        let load = match eye {
            Eye::Left => Some(clear),
            Eye::Right => None,
        };
        let mut pass = self.target.begin_pass(encoder, load);
        self.viewport(eye).apply(&mut pass);
        pass
    }
}

fn eye_viewport(eye: Eye, eye_width: u32, eye_height: u32) -> Viewport {
    Viewport {
        x: (eye.index() as u32 * eye_width) as f32,
        y: 0.0,
        width: eye_width as f32,
        height: eye_height as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_size_rejects_oversized_and_empty() {
        assert!(check_size("Left Wall", 2048, 2048, 8192).is_ok());
        match check_size("Left Wall", 16384, 16384, 8192) {
            Err(GpuError::IncompleteTarget { label, .. }) => assert_eq!(label, "Left Wall"),
            other => panic!("expected incomplete target, got {:?}", other),
        }
        assert!(check_size("Eye Buffer", 0, 10, 8192).is_err());
    }

    #[test]
    fn test_validation_error_marks_target_incomplete() {
        assert!(validation_result("Right Wall", None).is_ok());
        match validation_result("Right Wall", Some("Texture format not renderable".to_string())) {
            Err(GpuError::IncompleteTarget { label, reason }) => {
                assert_eq!(label, "Right Wall");
                assert!(reason.contains("not renderable"));
            }
            other => panic!("expected incomplete target, got {:?}", other),
        }
    }

    #[test]
    fn test_stereo_width_rejects_overflow() {
        assert_eq!(stereo_width(1344).ok(), Some(2688));
        match stereo_width(u32::MAX / 2 + 1) {
            Err(GpuError::IncompleteTarget { label, .. }) => assert_eq!(label, "Eye Buffer"),
            other => panic!("expected incomplete target, got {:?}", other),
        }
    }

    #[test]
    fn test_eye_viewports_split_buffer() {
        let left = eye_viewport(Eye::Left, 1344, 1600);
        let right = eye_viewport(Eye::Right, 1344, 1600);
        assert_eq!(left, Viewport { x: 0.0, y: 0.0, width: 1344.0, height: 1600.0 });
        assert_eq!(right.x, 1344.0);
        assert_eq!(right.width, left.width);
    }
}
