//! HMD collaborator interfaces
//!
//! The core never talks to a headset SDK directly. It consumes poses, input
//! and per-eye parameters through [`Tracking`] and hands finished eye buffers
//! to a [`Compositor`].

pub mod sim;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::error::CaveResult;
use crate::gpu::{EyeBuffers, GpuContext};

/// Stereo eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const ALL: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// Tracked controller hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

/// Tracked pose in room space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose { position: Vec3::ZERO, orientation: Quat::IDENTITY };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, orientation: Quat::IDENTITY }
    }

    /// Pose-to-world transform (translation * rotation)
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// World-to-pose transform
    pub fn view(&self) -> Mat4 {
        self.matrix().inverse()
    }
}

/// Controller button bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(pub u32);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);
    /// Show projection lines and eye cursors while held
    pub const A: Buttons = Buttons(1 << 0);
    /// Freeze toggle
    pub const B: Buttons = Buttons(1 << 1);
    /// Disabled projector toggle
    pub const X: Buttons = Buttons(1 << 2);
    /// Left stick click: reset cube size
    pub const LTHUMB: Buttons = Buttons(1 << 4);
    /// Right stick click: reset cube positions
    pub const RTHUMB: Buttons = Buttons(1 << 5);

    pub fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn set(&mut self, other: Buttons, pressed: bool) {
        if pressed {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl std::ops::BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

/// Raw controller state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub buttons: Buttons,
    /// Hand trigger analog value per hand, 0..1
    pub hand_trigger: [f32; 2],
    /// Thumbstick per hand, -1..1 (y up)
    pub thumbstick: [Vec2; 2],
}

impl InputState {
    pub fn trigger(&self, hand: Hand) -> f32 {
        self.hand_trigger[hand.index()]
    }

    pub fn stick(&self, hand: Hand) -> Vec2 {
        self.thumbstick[hand.index()]
    }
}

/// Tracking collaborator: head, eyes and controllers
pub trait Tracking {
    /// Per-eye poses predicted for `display_time` (eye offsets already applied)
    fn eye_poses(&mut self, display_time: f64) -> [Pose; 2];

    fn controller_pose(&self, hand: Hand) -> Pose;

    fn input_state(&self) -> InputState;

    /// Horizontal offset of `eye` from the head center, in meters
    fn default_eye_offset(&self, eye: Eye) -> f32;

    /// FOV-derived projection for `eye`
    fn eye_projection(&self, eye: Eye, near: f32, far: f32) -> Mat4;

    fn recenter(&mut self);
}

/// Compositor collaborator: receives the finished stereo eye buffer
pub trait Compositor {
    fn predicted_display_time(&self, frame: u64) -> f64;

    fn submit_frame(&mut self, frame: u64, gpu: &GpuContext, eyes: &EyeBuffers) -> CaveResult<()>;
}

/// Everything the driver needs from tracking for one frame
#[derive(Debug, Clone, Copy)]
pub struct TrackingSample {
    pub frame: u64,
    pub display_time: f64,
    pub eye_poses: [Pose; 2],
    pub eye_projections: [Mat4; 2],
    pub eye_offsets: [f32; 2],
    pub hands: [Pose; 2],
    pub input: InputState,
}

impl TrackingSample {
    /// Sample all tracking state once; nothing is re-read mid-frame
    pub fn capture(
        tracking: &mut dyn Tracking,
        frame: u64,
        display_time: f64,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            frame,
            display_time,
            eye_poses: tracking.eye_poses(display_time),
            eye_projections: Eye::ALL.map(|eye| tracking.eye_projection(eye, near, far)),
            eye_offsets: Eye::ALL.map(|eye| tracking.default_eye_offset(eye)),
            hands: [tracking.controller_pose(Hand::Left), tracking.controller_pose(Hand::Right)],
            input: tracking.input_state(),
        }
    }

    pub fn hand(&self, hand: Hand) -> Pose {
        self.hands[hand.index()]
    }
}
