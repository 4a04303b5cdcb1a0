//! Stereo render driver
//!
//! Turns one tracking sample into the ordered list of passes for a frame.
//! For each eye, in order:
//!
//! 1. resolve the eye position through the viewpoint state machine
//! 2. solve the off-axis projection of every wall and record its pass
//!    (content suppressed for the disabled projector)
//! 3. record the composed pass that shows the wall textures from the HMD's
//!    true eye pose
//!
//! The plan is plain data. The GPU executor walks it front to back, which is
//! what guarantees each eye's walls are written before its composed pass
//! samples them.

use glam::{Mat4, Vec3};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cave::{Cave, Wall, WallCorners};
use crate::config::CaveConfig;
use crate::hmd::{Eye, TrackingSample};
use crate::projection::{self, OffAxis};
use crate::scene::{DebugLine, Scene, SceneDraw};
use crate::viewpoint::{pass_slot, EyeViewpoint, ViewpointState};

/// Off-screen pass into one wall's render target
#[derive(Debug, Clone)]
pub struct WallPass {
    pub eye: Eye,
    pub wall: Wall,
    pub slot: usize,
    pub corners: WallCorners,
    pub off_axis: OffAxis,
    /// True when this slot is the disabled projector; `draws` is then empty
    pub disabled: bool,
    pub draws: Vec<SceneDraw>,
}

/// Final pass into the eye's half of the HMD eye buffer
#[derive(Debug, Clone)]
pub struct ComposedPass {
    pub eye: Eye,
    pub projection: Mat4,
    pub view: Mat4,
    pub cave_model: Mat4,
    pub draws: Vec<SceneDraw>,
    pub lines: Vec<DebugLine>,
}

#[derive(Debug, Clone)]
pub struct EyePlan {
    pub eye: Eye,
    pub viewpoint: EyeViewpoint,
    pub walls: Vec<WallPass>,
    pub composed: ComposedPass,
}

/// Every pass of one frame, in execution order
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub frame: u64,
    pub eyes: Vec<EyePlan>,
    pub wall_clear_color: [f32; 4],
    pub eye_clear_color: [f32; 4],
}

impl FramePlan {
    pub fn wall_passes(&self) -> impl Iterator<Item = &WallPass> {
        self.eyes.iter().flat_map(|eye| eye.walls.iter())
    }

    pub fn eye(&self, eye: Eye) -> &EyePlan {
        &self.eyes[eye.index()]
    }
}

/// Frame orchestration state
pub struct StereoDriver<R: Rng = StdRng> {
    config: CaveConfig,
    cave: Cave,
    scene: Scene,
    viewpoint: ViewpointState,
    rng: R,
}

impl StereoDriver<StdRng> {
    pub fn new(config: CaveConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: CaveConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> StereoDriver<R> {
    pub fn with_rng(config: CaveConfig, rng: R) -> Self {
        Self {
            cave: Cave::with_yaw_degrees(config.cave_yaw_degrees),
            scene: Scene::new(&config),
            viewpoint: ViewpointState::new(),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &CaveConfig {
        &self.config
    }

    pub fn cave(&self) -> &Cave {
        &self.cave
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewpoint(&self) -> &ViewpointState {
        &self.viewpoint
    }

    /// Plan one stereo frame from `sample`
    pub fn render_frame(&mut self, sample: &TrackingSample) -> FramePlan {
        let dominant = self.config.dominant_hand;
        self.viewpoint
            .update(&sample.input, dominant, self.config.trigger_threshold, &mut self.rng);
        self.scene.apply_input(&sample.input);
        self.scene.set_controller_cursor(sample.hand(dominant).position);

        let eyes = Eye::ALL
            .into_iter()
            .map(|eye| self.plan_eye(eye, sample))
            .collect();

        FramePlan {
            frame: sample.frame,
            eyes,
            wall_clear_color: self.config.wall_clear_color,
            eye_clear_color: self.config.eye_clear_color,
        }
    }

    fn plan_eye(&mut self, eye: Eye, sample: &TrackingSample) -> EyePlan {
        let viewpoint = self.viewpoint.resolve_eye(eye, sample, self.config.dominant_hand);
        let corners = Wall::ALL.map(|wall| self.cave.world_corners(wall));

        let walls = Wall::ALL
            .into_iter()
            .zip(corners)
            .map(|(wall, corners)| self.plan_wall(eye, wall, corners, viewpoint.position))
            .collect();

        self.scene.update_eye_debug(eye, viewpoint.position, &corners);

        let show_debug = self.viewpoint.modes.show_debug;
        let composed = ComposedPass {
            eye,
            projection: sample.eye_projections[eye.index()],
            view: sample.eye_poses[eye.index()].view(),
            cave_model: self.cave.to_world,
            draws: self.scene.composed_draws(show_debug),
            lines: self.scene.composed_lines(show_debug),
        };

        EyePlan { eye, viewpoint, walls, composed }
    }

    fn plan_wall(&self, eye: Eye, wall: Wall, corners: WallCorners, eye_position: Vec3) -> WallPass {
        let off_axis = projection::solve(
            eye_position,
            corners.pa,
            corners.pb,
            corners.pc,
            self.config.near,
            self.config.far,
        );
        let disabled = self.viewpoint.is_pass_disabled(eye, wall);
        if disabled {
            debug!("Skipping content for {:?} eye, {}", eye, wall.label());
        }

        WallPass {
            eye,
            wall,
            slot: pass_slot(eye, wall),
            corners,
            off_axis,
            disabled,
            draws: if disabled { Vec::new() } else { self.scene.wall_draws(eye) },
        }
    }
}
