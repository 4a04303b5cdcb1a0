//! Scene content module
//!
//! What gets drawn inside the walls (skybox and cubes) and what gets drawn
//! around them in the composed view (debug lines and cursors). Produces draw
//! lists only; the GPU side turns them into passes.

use glam::{Mat4, Vec3};

use crate::cave::{WallCorners, WALLS};
use crate::config::CaveConfig;
use crate::hmd::{Buttons, Eye, Hand, InputState};

/// Procedural skybox look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyVariant {
    /// Stereo skybox half seen by the left eye inside the walls
    LeftEye,
    RightEye,
    /// Room skybox around the cave in the composed view
    Custom,
}

impl SkyVariant {
    pub fn for_eye(eye: Eye) -> Self {
        match eye {
            Eye::Left => SkyVariant::LeftEye,
            Eye::Right => SkyVariant::RightEye,
        }
    }

    /// Shader selector
    pub fn id(self) -> u32 {
        match self {
            SkyVariant::LeftEye => 0,
            SkyVariant::RightEye => 1,
            SkyVariant::Custom => 2,
        }
    }
}

/// Mesh drawn by a scene draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    Sky(SkyVariant),
    Cube,
    Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneDraw {
    pub mesh: MeshKind,
    pub model: Mat4,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub start: Vec3,
    pub end: Vec3,
    pub color: [f32; 4],
}

const CUBE_COLOR: [f32; 4] = [0.85, 0.55, 0.2, 1.0];
const CURSOR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const LEFT_EYE_LINE: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const RIGHT_EYE_LINE: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Scene state
pub struct Scene {
    cube_positions: Vec<Vec3>,
    home_positions: Vec<Vec3>,
    cube_size: f32,
    default_cube_size: f32,
    cube_size_min: f32,
    cube_size_max: f32,
    cube_step: f32,
    stick_threshold: f32,
    skybox_scale: f32,
    cursor_scale: f32,

    // Per-eye debug state, rebuilt every frame
    lines: [Vec<DebugLine>; 2],
    eye_cursors: [Option<Vec3>; 2],
    controller_cursor: Vec3,
}

impl Scene {
    pub fn new(config: &CaveConfig) -> Self {
        Self {
            cube_positions: config.cube_positions.clone(),
            home_positions: config.cube_positions.clone(),
            cube_size: config.cube_size,
            default_cube_size: config.cube_size,
            cube_size_min: config.cube_size_min,
            cube_size_max: config.cube_size_max,
            cube_step: config.cube_step,
            stick_threshold: config.stick_threshold,
            skybox_scale: config.skybox_scale,
            cursor_scale: config.cursor_scale,
            lines: [Vec::new(), Vec::new()],
            eye_cursors: [None, None],
            controller_cursor: Vec3::ZERO,
        }
    }

    pub fn cube_size(&self) -> f32 {
        self.cube_size
    }

    pub fn cube_positions(&self) -> &[Vec3] {
        &self.cube_positions
    }

    /// Thumbstick cube controls.
    /// Left stick X resizes, left click resets the size.
    /// Right stick X/Y moves along X/Z, right click resets positions.
    pub fn apply_input(&mut self, input: &InputState) {
        let t = self.stick_threshold;

        if input.buttons.contains(Buttons::LTHUMB) {
            self.cube_size = self.default_cube_size;
        } else {
            let stick = input.stick(Hand::Left);
            if stick.x > t && self.cube_size < self.cube_size_max {
                self.cube_size = (self.cube_size + self.cube_step).min(self.cube_size_max);
            } else if stick.x < -t && self.cube_size > self.cube_size_min {
                self.cube_size = (self.cube_size - self.cube_step).max(self.cube_size_min);
            }
        }

        if input.buttons.contains(Buttons::RTHUMB) {
            self.cube_positions.clone_from(&self.home_positions);
        } else {
            let stick = input.stick(Hand::Right);
            let mut delta = Vec3::ZERO;
            if stick.x > t {
                delta.x += self.cube_step;
            } else if stick.x < -t {
                delta.x -= self.cube_step;
            }
            if stick.y > t {
                delta.z += self.cube_step;
            } else if stick.y < -t {
                delta.z -= self.cube_step;
            }
            if delta != Vec3::ZERO {
                for position in &mut self.cube_positions {
                    *position += delta;
                }
            }
        }
    }

    pub fn set_controller_cursor(&mut self, position: Vec3) {
        self.controller_cursor = position;
    }

    /// Content rendered into each wall for `eye`
    pub fn wall_draws(&self, eye: Eye) -> Vec<SceneDraw> {
        let mut draws = Vec::with_capacity(1 + self.cube_positions.len());
        draws.push(self.sky(SkyVariant::for_eye(eye)));
        draws.extend(self.cube_positions.iter().map(|&position| SceneDraw {
            mesh: MeshKind::Cube,
            model: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(self.cube_size)),
            color: CUBE_COLOR,
        }));
        draws
    }

    fn sky(&self, variant: SkyVariant) -> SceneDraw {
        SceneDraw {
            mesh: MeshKind::Sky(variant),
            model: Mat4::from_scale(Vec3::splat(self.skybox_scale)),
            color: [1.0; 4],
        }
    }

    fn cursor(&self, position: Vec3) -> SceneDraw {
        SceneDraw {
            mesh: MeshKind::Cursor,
            model: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(self.cursor_scale)),
            color: CURSOR_COLOR,
        }
    }

    /// Rebuild `eye`'s projection lines from its wall-pass eye position
    pub fn update_eye_debug(&mut self, eye: Eye, eye_position: Vec3, walls: &[WallCorners; 3]) {
        let color = match eye {
            Eye::Left => LEFT_EYE_LINE,
            Eye::Right => RIGHT_EYE_LINE,
        };
        let lines = &mut self.lines[eye.index()];
        lines.clear();
        for (spec, corners) in WALLS.iter().zip(walls) {
            lines.extend(spec.debug_corners.iter().map(|&corner| DebugLine {
                start: corners.corner(corner),
                end: eye_position,
                color,
            }));
        }
        self.eye_cursors[eye.index()] = Some(eye_position);
    }

    pub fn eye_lines(&self, eye: Eye) -> &[DebugLine] {
        &self.lines[eye.index()]
    }

    /// Customized skybox plus cursors for the composed view
    pub fn composed_draws(&self, show_debug: bool) -> Vec<SceneDraw> {
        let mut draws = vec![self.sky(SkyVariant::Custom)];
        if show_debug {
            draws.extend(self.eye_cursors.iter().flatten().map(|&p| self.cursor(p)));
        }
        draws.push(self.cursor(self.controller_cursor));
        draws
    }

    /// Both eyes' projection lines, when shown
    pub fn composed_lines(&self, show_debug: bool) -> Vec<DebugLine> {
        if !show_debug {
            return Vec::new();
        }
        self.lines.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cave::{Cave, Wall};
    use glam::Vec2;

    fn sticks(left: Vec2, right: Vec2, buttons: Buttons) -> InputState {
        InputState { buttons, hand_trigger: [0.0; 2], thumbstick: [left, right] }
    }

    #[test]
    fn test_wall_draws_use_eye_skybox() {
        let scene = Scene::new(&CaveConfig::default());
        let left = scene.wall_draws(Eye::Left);
        let right = scene.wall_draws(Eye::Right);
        assert_eq!(left[0].mesh, MeshKind::Sky(SkyVariant::LeftEye));
        assert_eq!(right[0].mesh, MeshKind::Sky(SkyVariant::RightEye));
        assert_eq!(left.iter().filter(|d| d.mesh == MeshKind::Cube).count(), 2);
    }

    #[test]
    fn test_cube_size_grows_and_clamps() {
        let config = CaveConfig::default();
        let mut scene = Scene::new(&config);
        let push_right = sticks(Vec2::new(1.0, 0.0), Vec2::ZERO, Buttons::NONE);
        scene.apply_input(&push_right);
        assert!((scene.cube_size() - 0.101).abs() < 1e-6);

        for _ in 0..1000 {
            scene.apply_input(&push_right);
        }
        assert_eq!(scene.cube_size(), config.cube_size_max);

        scene.apply_input(&sticks(Vec2::ZERO, Vec2::ZERO, Buttons::LTHUMB));
        assert_eq!(scene.cube_size(), config.cube_size);
    }

    #[test]
    fn test_small_stick_deflection_is_ignored() {
        let mut scene = Scene::new(&CaveConfig::default());
        let before = scene.cube_positions().to_vec();
        scene.apply_input(&sticks(Vec2::new(0.4, 0.0), Vec2::new(0.3, -0.5), Buttons::NONE));
        assert_eq!(scene.cube_positions(), &before[..]);
        assert_eq!(scene.cube_size(), 0.1);
    }

    #[test]
    fn test_right_stick_moves_cubes_and_click_resets() {
        let mut scene = Scene::new(&CaveConfig::default());
        let home = scene.cube_positions().to_vec();
        scene.apply_input(&sticks(Vec2::ZERO, Vec2::new(0.9, 0.9), Buttons::NONE));
        for (moved, start) in scene.cube_positions().iter().zip(&home) {
            assert!((*moved - *start).abs_diff_eq(Vec3::new(0.001, 0.0, 0.001), 1e-6));
        }
        scene.apply_input(&sticks(Vec2::ZERO, Vec2::ZERO, Buttons::RTHUMB));
        assert_eq!(scene.cube_positions(), &home[..]);
    }

    #[test]
    fn test_debug_lines_hidden_unless_requested() {
        let mut scene = Scene::new(&CaveConfig::default());
        let cave = Cave::default();
        let walls = Wall::ALL.map(|w| cave.world_corners(w));
        scene.update_eye_debug(Eye::Left, Vec3::ZERO, &walls);
        scene.update_eye_debug(Eye::Right, Vec3::X * 0.1, &walls);

        assert!(scene.composed_lines(false).is_empty());
        let lines = scene.composed_lines(true);
        assert_eq!(lines.len(), 14);
        assert!(lines.iter().take(7).all(|l| l.color == LEFT_EYE_LINE && l.end == Vec3::ZERO));
        assert!(lines.iter().skip(7).all(|l| l.color == RIGHT_EYE_LINE));

        // Controller cursor is always drawn, eye cursors only with debug
        let cursors = |draws: Vec<SceneDraw>| draws.iter().filter(|d| d.mesh == MeshKind::Cursor).count();
        assert_eq!(cursors(scene.composed_draws(false)), 1);
        assert_eq!(cursors(scene.composed_draws(true)), 3);
    }

    #[test]
    fn test_debug_lines_rebuilt_each_frame() {
        let mut scene = Scene::new(&CaveConfig::default());
        let cave = Cave::default();
        let walls = Wall::ALL.map(|w| cave.world_corners(w));
        scene.update_eye_debug(Eye::Left, Vec3::ZERO, &walls);
        scene.update_eye_debug(Eye::Left, Vec3::Y, &walls);
        assert_eq!(scene.eye_lines(Eye::Left).len(), 7);
        assert!(scene.eye_lines(Eye::Left).iter().all(|l| l.end == Vec3::Y));
    }
}
