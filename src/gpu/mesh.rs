//! Vertex formats and built-in meshes
//!
//! Everything in the scene is either a unit cube (skyboxes, cubes, cursors),
//! a wall quad or a line segment, so the meshes are generated here instead
//! of loaded from files.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::cave::{Cave, Wall};
use crate::scene::DebugLine;

/// Position + normal
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position + texture coordinate
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position + color
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn from_line(line: &DebugLine) -> [LineVertex; 2] {
        [
            LineVertex { position: line.start.to_array(), color: line.color },
            LineVertex { position: line.end.to_array(), color: line.color },
        ]
    }
}

pub const CUBE_VERTEX_COUNT: u32 = 36;
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Cube spanning -1..1 on every axis, two triangles per face
pub fn cube() -> Vec<MeshVertex> {
    // (normal, tangent u, tangent v) per face
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(CUBE_VERTEX_COUNT as usize);
    for (normal, u, v) in faces {
        let corner = |su: f32, sv: f32| MeshVertex {
            position: (normal + u * su + v * sv).to_array(),
            normal: normal.to_array(),
        };
        let (a, b, c, d) = (corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0));
        vertices.extend_from_slice(&[a, b, c, c, d, a]);
    }
    vertices
}

/// The three wall quads back to back, in `Wall::ALL` order
pub fn cave_quads() -> Vec<TexturedVertex> {
    Wall::ALL
        .iter()
        .flat_map(|&wall| Cave::quad(wall))
        .map(|v| TexturedVertex { position: v.position.to_array(), uv: v.uv.to_array() })
        .collect()
}

/// First vertex of `wall`'s quad in [`cave_quads`]
pub fn cave_quad_offset(wall: Wall) -> u32 {
    wall.index() as u32 * QUAD_VERTEX_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_is_closed_unit_box() {
        let cube = cube();
        assert_eq!(cube.len(), CUBE_VERTEX_COUNT as usize);
        for v in &cube {
            let p = Vec3::from_array(v.position);
            assert!((p.abs().max_element() - 1.0).abs() < 1e-6);
            // Every vertex lies on the face its normal names
            assert!((p.dot(Vec3::from_array(v.normal)) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cave_quads_are_laid_out_per_wall() {
        let quads = cave_quads();
        assert_eq!(quads.len(), 3 * QUAD_VERTEX_COUNT as usize);
        let bottom = cave_quad_offset(Wall::Bottom) as usize;
        // Bottom wall sits on y = -2
        assert!(quads[bottom..bottom + 6].iter().all(|v| v.position[1] == -2.0));
        let left = cave_quad_offset(Wall::Left) as usize;
        assert!(quads[left..left + 6].iter().all(|v| v.position[0] == -2.0));
    }

    #[test]
    fn test_vertex_sizes_match_layouts() {
        assert_eq!(MeshVertex::layout().array_stride, 24);
        assert_eq!(TexturedVertex::layout().array_stride, 20);
        assert_eq!(LineVertex::layout().array_stride, 28);
    }
}
