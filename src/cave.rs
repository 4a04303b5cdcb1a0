//! Cave geometry module
//!
//! The three projection walls share one local frame (a 4m cube centered on
//! the origin) and one world transform. Each wall is described once in
//! [`WALLS`]; the off-axis solver, the composed quads and the debug lines
//! all read their corners from that table.

use glam::{Mat4, Vec2, Vec3};

/// One of the three CAVE projection surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wall {
    Left,
    Right,
    Bottom,
}

impl Wall {
    pub const ALL: [Wall; 3] = [Wall::Left, Wall::Right, Wall::Bottom];

    pub fn index(self) -> usize {
        match self {
            Wall::Left => 0,
            Wall::Right => 1,
            Wall::Bottom => 2,
        }
    }

    pub fn spec(self) -> &'static WallSpec {
        &WALLS[self.index()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Wall::Left => "Left Wall",
            Wall::Right => "Right Wall",
            Wall::Bottom => "Bottom Wall",
        }
    }
}

/// Named wall corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

/// Static description of a wall
#[derive(Debug)]
pub struct WallSpec {
    pub wall: Wall,
    /// Bottom-left, bottom-right, top-left in the cave frame
    pub local_corners: [Vec3; 3],
    /// Corners that get a debug line from the eye
    pub debug_corners: &'static [Corner],
}

pub const WALLS: [WallSpec; 3] = [
    WallSpec {
        wall: Wall::Left,
        local_corners: [
            Vec3::new(-2.0, -2.0, 2.0),
            Vec3::new(-2.0, -2.0, -2.0),
            Vec3::new(-2.0, 2.0, 2.0),
        ],
        debug_corners: &[Corner::TopLeft, Corner::BottomLeft],
    },
    WallSpec {
        wall: Wall::Right,
        local_corners: [
            Vec3::new(-2.0, -2.0, -2.0),
            Vec3::new(2.0, -2.0, -2.0),
            Vec3::new(-2.0, 2.0, -2.0),
        ],
        debug_corners: &[Corner::TopLeft, Corner::BottomLeft, Corner::TopRight, Corner::BottomRight],
    },
    WallSpec {
        wall: Wall::Bottom,
        local_corners: [
            Vec3::new(-2.0, -2.0, 2.0),
            Vec3::new(2.0, -2.0, 2.0),
            Vec3::new(-2.0, -2.0, -2.0),
        ],
        debug_corners: &[Corner::BottomRight],
    },
];

/// Wall corners in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallCorners {
    pub pa: Vec3,
    pub pb: Vec3,
    pub pc: Vec3,
}

impl WallCorners {
    /// Fourth corner, completing the parallelogram
    pub fn pd(&self) -> Vec3 {
        self.pb + (self.pc - self.pa)
    }

    pub fn corner(&self, corner: Corner) -> Vec3 {
        match corner {
            Corner::BottomLeft => self.pa,
            Corner::BottomRight => self.pb,
            Corner::TopLeft => self.pc,
            Corner::TopRight => self.pd(),
        }
    }
}

/// Textured quad vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

/// The cave: walls plus their shared world transform
#[derive(Debug, Clone)]
pub struct Cave {
    pub to_world: Mat4,
}

impl Default for Cave {
    fn default() -> Self {
        Self { to_world: Mat4::IDENTITY }
    }
}

impl Cave {
    /// Cave rotated about the vertical axis
    pub fn with_yaw_degrees(degrees: f32) -> Self {
        Self { to_world: Mat4::from_rotation_y(degrees.to_radians()) }
    }

    /// World-space reference corners of `wall` under the current transform
    pub fn world_corners(&self, wall: Wall) -> WallCorners {
        let [pa, pb, pc] = wall.spec().local_corners.map(|p| self.to_world.transform_point3(p));
        WallCorners { pa, pb, pc }
    }

    /// Two triangles in the cave frame. Texture space has its origin at the
    /// top-left, so `pa` (NDC -1,-1 in the wall pass) samples at uv (0, 1).
    pub fn quad(wall: Wall) -> [QuadVertex; 6] {
        let [pa, pb, pc] = wall.spec().local_corners;
        let pd = pb + (pc - pa);
        let a = QuadVertex { position: pa, uv: Vec2::new(0.0, 1.0) };
        let b = QuadVertex { position: pb, uv: Vec2::new(1.0, 1.0) };
        let c = QuadVertex { position: pc, uv: Vec2::new(0.0, 0.0) };
        let d = QuadVertex { position: pd, uv: Vec2::new(1.0, 0.0) };
        [a, b, d, d, c, a]
    }
}
