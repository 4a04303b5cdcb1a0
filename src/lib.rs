//! CAVE simulator
//!
//! Simulates a three-wall CAVE (left, right and floor projection surfaces)
//! inside a stereo headset. Each frame every wall is rendered with an
//! off-axis projection from the viewer's eye into its own texture, and the
//! textured walls are then shown from the headset's true eye pose. The
//! eye used for the wall passes can be frozen, moved to the hand controller,
//! or have one of its six projector passes disabled, to show the
//! artifacts a real CAVE produces when the tracked viewer and the actual
//! viewer differ.

pub mod app;
pub mod cave;
pub mod config;
pub mod driver;
pub mod error;
pub mod gpu;
pub mod hmd;
pub mod projection;
pub mod scene;
pub mod viewpoint;

pub use cave::{Cave, Wall};
pub use config::CaveConfig;
pub use driver::{FramePlan, StereoDriver};
pub use error::{CaveError, CaveResult};
pub use hmd::{Compositor, Eye, Hand, Tracking, TrackingSample};
