//! Off-axis projection module
//!
//! Generalized perspective projection for a flat display surface seen from an
//! arbitrary eye position. The surface is described by three of its corners:
//! bottom-left `pa`, bottom-right `pb` and top-left `pc`.
//!
//! All matrices target wgpu clip space (right-handed, depth in 0..1).

use glam::{Mat4, Vec3, Vec4};

/// Near-plane bounds of an asymmetric frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

/// Result of solving one (eye, surface) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffAxis {
    /// Off-center perspective matrix `P`
    pub projection: Mat4,
    /// World-to-surface basis change `transpose(M)`
    pub rotation: Mat4,
    /// `P * transpose(M) * translate(-eye)`
    pub view_projection: Mat4,
    pub bounds: FrustumBounds,
    /// Surface normal, pointing from the surface toward the eye side
    pub normal: Vec3,
    /// Perpendicular distance from the eye to the surface plane
    pub distance: f32,
}

/// Surface basis: right, up and normal axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBasis {
    pub right: Vec3,
    pub up: Vec3,
    pub normal: Vec3,
}

impl SurfaceBasis {
    pub fn from_corners(pa: Vec3, pb: Vec3, pc: Vec3) -> Self {
        let right = (pb - pa).normalize();
        let up = (pc - pa).normalize();
        let normal = right.cross(up).normalize();
        Self { right, up, normal }
    }
}

/// Off-center perspective frustum, same parameters as `glFrustum` but with
/// depth mapped to 0..1.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let x_scale = 2.0 * near / (right - left);
    let y_scale = 2.0 * near / (top - bottom);
    let x_offset = (right + left) / (right - left);
    let y_offset = (top + bottom) / (top - bottom);
    let z_scale = far / (near - far);
    let z_offset = near * far / (near - far);

    Mat4::from_cols(
        Vec4::new(x_scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y_scale, 0.0, 0.0),
        Vec4::new(x_offset, y_offset, z_scale, -1.0),
        Vec4::new(0.0, 0.0, z_offset, 0.0),
    )
}

/// Solve the off-axis projection of the surface `(pa, pb, pc)` for `eye`.
///
/// The eye must not lie on the surface plane: with `d == 0` every bound is a
/// division by zero. Room geometry and head travel are expected to keep the
/// eye strictly inside the CAVE, so this is checked in debug builds only.
pub fn solve(eye: Vec3, pa: Vec3, pb: Vec3, pc: Vec3, near: f32, far: f32) -> OffAxis {
    let SurfaceBasis { right: vr, up: vu, normal: vn } = SurfaceBasis::from_corners(pa, pb, pc);

    // Eye to corners
    let va = pa - eye;
    let vb = pb - eye;
    let vc = pc - eye;

    let d = -vn.dot(va);
    debug_assert!(d != 0.0, "eye lies on the surface plane");

    let scale = near / d;
    let bounds = FrustumBounds {
        left: vr.dot(va) * scale,
        right: vr.dot(vb) * scale,
        bottom: vu.dot(va) * scale,
        top: vu.dot(vc) * scale,
        near,
        far,
    };

    let projection = frustum(bounds.left, bounds.right, bounds.bottom, bounds.top, near, far);

    // Columns vr, vu, vn; the transpose maps world vectors into surface space
    let m = Mat4::from_cols(vr.extend(0.0), vu.extend(0.0), vn.extend(0.0), Vec4::W);
    let rotation = m.transpose();

    let translation = Mat4::from_translation(-eye);

    OffAxis {
        projection,
        rotation,
        view_projection: projection * rotation * translation,
        bounds,
        normal: vn,
        distance: d,
    }
}
