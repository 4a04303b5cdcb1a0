//! Configuration module
//!
//! Room geometry, render target sizes and interaction tuning. Loaded from an
//! optional JSON file; every field falls back to its default.

use std::path::Path;

use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{CaveError, CaveResult};
use crate::hmd::Hand;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    /// Square resolution of each wall render target
    pub wall_resolution: u32,
    pub near: f32,
    pub far: f32,
    /// Hand trigger value above which the viewpoint follows the controller
    pub trigger_threshold: f32,
    pub dominant_hand: Hand,
    /// Rotation of the cave about the vertical axis
    pub cave_yaw_degrees: f32,
    pub skybox_scale: f32,
    pub cube_size: f32,
    pub cube_size_min: f32,
    pub cube_size_max: f32,
    /// Per-frame change of cube size and position while a stick is pushed
    pub cube_step: f32,
    pub cube_positions: Vec<Vec3>,
    pub cursor_scale: f32,
    /// Stick deflection that counts as pushed
    pub stick_threshold: f32,
    pub wall_clear_color: [f32; 4],
    pub eye_clear_color: [f32; 4],
    pub simulator: SimulatorConfig,
}

/// Desktop HMD simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Inter-pupillary distance in meters
    pub ipd: f32,
    pub eye_width: u32,
    pub eye_height: u32,
    /// Half-angle tangents of the per-eye field of view
    pub fov_up: f32,
    pub fov_down: f32,
    pub fov_inner: f32,
    pub fov_outer: f32,
    /// Standing eye height
    pub head_height: f32,
    /// Meters per second
    pub move_speed: f32,
    /// Radians per second
    pub turn_speed: f32,
    /// Controller rest position relative to the head
    pub hand_offset: Vec3,
    pub refresh_rate: f32,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            wall_resolution: 2048,
            near: 0.01,
            far: 1000.0,
            trigger_threshold: 0.5,
            dominant_hand: Hand::Right,
            cave_yaw_degrees: -45.0,
            skybox_scale: 5.0,
            cube_size: 0.1,
            cube_size_min: 0.005,
            cube_size_max: 0.25,
            cube_step: 0.001,
            cube_positions: vec![Vec3::new(0.0, 0.0, -0.3), Vec3::new(0.0, 0.0, -0.9)],
            cursor_scale: 0.01,
            stick_threshold: 0.5,
            wall_clear_color: [0.0, 0.0, 0.0, 1.0],
            eye_clear_color: [0.1, 0.1, 0.1, 1.0],
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ipd: 0.064,
            eye_width: 1344,
            eye_height: 1600,
            fov_up: 1.33,
            fov_down: 1.33,
            fov_inner: 1.06,
            fov_outer: 1.29,
            head_height: 0.0,
            move_speed: 1.0,
            turn_speed: 1.2,
            hand_offset: Vec3::new(0.2, -0.3, -0.35),
            refresh_rate: 90.0,
        }
    }
}

impl CaveConfig {
    /// Load from `path` if given, otherwise the defaults
    pub fn load(path: Option<&Path>) -> CaveResult<Self> {
        let config = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                let text = std::fs::read_to_string(path)?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> CaveResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> CaveResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> CaveResult<()> {
        if self.wall_resolution == 0 {
            return Err(CaveError::Config("wall_resolution must be positive".into()));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(CaveError::Config(format!(
                "clip planes must satisfy 0 < near < far (near={}, far={})",
                self.near, self.far
            )));
        }
        if !(self.trigger_threshold > 0.0 && self.trigger_threshold < 1.0) {
            return Err(CaveError::Config(format!(
                "trigger_threshold {} outside (0, 1)",
                self.trigger_threshold
            )));
        }
        if !(self.cube_size_min <= self.cube_size && self.cube_size <= self.cube_size_max) {
            return Err(CaveError::Config(format!(
                "cube_size {} outside [{}, {}]",
                self.cube_size, self.cube_size_min, self.cube_size_max
            )));
        }
        if self.simulator.ipd < 0.0 || self.simulator.eye_width == 0 || self.simulator.eye_height == 0 {
            return Err(CaveError::Config("invalid simulator eye parameters".into()));
        }
        Ok(())
    }
}
