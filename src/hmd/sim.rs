//! Desktop HMD simulator
//!
//! Drives the head, the controllers and the Touch-style buttons from the
//! keyboard and, when one is connected, a gamepad read through gilrs.
//!
//! Keyboard layout:
//!
//! | keys | action |
//! |---|---|
//! | W/S, A/D, Q/E | move head forward/back, left/right, down/up |
//! | arrows | turn head (yaw/pitch) |
//! | I/K, J/L, U/O | move controllers forward/back, left/right, down/up |
//! | Space | dominant hand trigger (hand viewpoint) |
//! | 1, 2, 3 | A (debug lines), B (freeze), X (disable projector) |
//! | T/G, F/H | right thumbstick (move cubes) |
//! | Z/C | left thumbstick X (resize cubes) |
//! | V, N | left / right stick click |

use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;

use gilrs::{Axis, Button, Event, EventType, Gilrs};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use log::{debug, info};
use winit::keyboard::KeyCode;

use crate::config::SimulatorConfig;
use crate::projection;

use super::{Buttons, Eye, Hand, InputState, Pose, Tracking};

const STICK_DEADZONE: f32 = 0.1;
const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;

/// Gamepad state mapped onto the Touch layout
#[derive(Debug, Clone, Copy, Default)]
struct PadState {
    buttons: Buttons,
    triggers: [f32; 2],
    sticks: [Vec2; 2],
}

impl PadState {
    fn apply(&mut self, event: EventType) {
        match event {
            EventType::ButtonPressed(button, _) => self.set_button(button, true),
            EventType::ButtonReleased(button, _) => self.set_button(button, false),
            EventType::ButtonChanged(Button::LeftTrigger2, value, _) => self.triggers[Hand::Left.index()] = value,
            EventType::ButtonChanged(Button::RightTrigger2, value, _) => self.triggers[Hand::Right.index()] = value,
            EventType::AxisChanged(axis, value, _) => self.set_axis(axis, value),
            _ => {}
        }
    }

    // gilrs reports stick Y with up positive, matching InputState
    fn set_axis(&mut self, axis: Axis, value: f32) {
        let value = if value.abs() < STICK_DEADZONE { 0.0 } else { value };
        match axis {
            Axis::LeftStickX => self.sticks[Hand::Left.index()].x = value,
            Axis::LeftStickY => self.sticks[Hand::Left.index()].y = value,
            Axis::RightStickX => self.sticks[Hand::Right.index()].x = value,
            Axis::RightStickY => self.sticks[Hand::Right.index()].y = value,
            _ => {}
        }
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        let mapped = match button {
            Button::South => Buttons::A,
            Button::East => Buttons::B,
            Button::West => Buttons::X,
            Button::LeftThumb => Buttons::LTHUMB,
            Button::RightThumb => Buttons::RTHUMB,
            _ => return,
        };
        self.buttons.set(mapped, pressed);
    }
}

/// Simulated headset: a [`Tracking`] source fed by keyboard and gamepad
pub struct SimulatedHmd {
    config: SimulatorConfig,
    dominant: Hand,
    gilrs: Option<Gilrs>,
    pad: PadState,
    keys: HashSet<KeyCode>,

    head_position: Vec3,
    yaw: f32,
    pitch: f32,
    // Controller displacement from the rest offset, in head-yaw space
    hand_shift: Vec3,
    last_time: Option<f64>,
}

impl SimulatedHmd {
    pub fn new(config: SimulatorConfig, dominant: Hand) -> Self {
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Gamepad system initialized");
                for (_id, gamepad) in g.gamepads() {
                    info!("Gamepad connected: {}", gamepad.name());
                }
                Some(g)
            }
            Err(e) => {
                info!("No gamepad support: {:?}", e);
                None
            }
        };
        Self { gilrs, ..Self::without_gamepad(config, dominant) }
    }

    /// Keyboard-only simulator
    pub fn without_gamepad(config: SimulatorConfig, dominant: Hand) -> Self {
        Self {
            head_position: Vec3::new(0.0, config.head_height, 0.0),
            config,
            dominant,
            gilrs: None,
            pad: PadState::default(),
            keys: HashSet::new(),
            yaw: 0.0,
            pitch: 0.0,
            hand_shift: Vec3::ZERO,
            last_time: None,
        }
    }

    /// Per-eye render size requested from the renderer
    pub fn eye_resolution(&self) -> (u32, u32) {
        (self.config.eye_width, self.config.eye_height)
    }

    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.keys.insert(code);
        } else {
            self.keys.remove(&code);
        }
    }

    pub fn head_pose(&self) -> Pose {
        Pose::new(self.head_position, self.orientation())
    }

    fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    fn held(&self, code: KeyCode) -> bool {
        self.keys.contains(&code)
    }

    /// -1, 0 or 1 from a pair of opposing keys
    fn key_axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        match (self.held(negative), self.held(positive)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    fn poll_gamepad(&mut self) {
        let Some(gilrs) = &mut self.gilrs else {
            return;
        };
        while let Some(Event { id: _, event, .. }) = gilrs.next_event() {
            debug!("Gamepad event: {:?}", event);
            self.pad.apply(event);
        }
    }

    /// Integrate held keys over `dt` seconds
    fn advance(&mut self, dt: f32) {
        let turn = self.config.turn_speed * dt;
        self.yaw -= self.key_axis(KeyCode::ArrowLeft, KeyCode::ArrowRight) * turn;
        self.pitch = (self.pitch + self.key_axis(KeyCode::ArrowDown, KeyCode::ArrowUp) * turn)
            .clamp(-MAX_PITCH, MAX_PITCH);

        let step = self.config.move_speed * dt;
        let yaw = Quat::from_rotation_y(self.yaw);
        let head = Vec3::new(
            self.key_axis(KeyCode::KeyA, KeyCode::KeyD),
            self.key_axis(KeyCode::KeyQ, KeyCode::KeyE),
            self.key_axis(KeyCode::KeyW, KeyCode::KeyS),
        );
        self.head_position += yaw * head * step;

        self.hand_shift += Vec3::new(
            self.key_axis(KeyCode::KeyJ, KeyCode::KeyL),
            self.key_axis(KeyCode::KeyU, KeyCode::KeyO),
            self.key_axis(KeyCode::KeyI, KeyCode::KeyK),
        ) * step;
    }

    fn key_buttons(&self) -> Buttons {
        [
            (KeyCode::Digit1, Buttons::A),
            (KeyCode::Digit2, Buttons::B),
            (KeyCode::Digit3, Buttons::X),
            (KeyCode::KeyV, Buttons::LTHUMB),
            (KeyCode::KeyN, Buttons::RTHUMB),
        ]
        .into_iter()
        .filter(|(code, _)| self.held(*code))
        .fold(Buttons::NONE, |acc, (_, button)| acc | button)
    }
}

impl Tracking for SimulatedHmd {
    fn eye_poses(&mut self, display_time: f64) -> [Pose; 2] {
        self.poll_gamepad();
        let dt = self.last_time.map_or(0.0, |last| (display_time - last).max(0.0)) as f32;
        self.last_time = Some(display_time);
        self.advance(dt);

        let orientation = self.orientation();
        Eye::ALL.map(|eye| {
            let offset = Vec3::new(self.default_eye_offset(eye), 0.0, 0.0);
            Pose::new(self.head_position + orientation * offset, orientation)
        })
    }

    fn controller_pose(&self, hand: Hand) -> Pose {
        let mut offset = self.config.hand_offset + self.hand_shift;
        // Rest offset is for the right hand; the left one mirrors it
        if hand == Hand::Left {
            offset.x = -offset.x;
        }
        let yaw = Quat::from_rotation_y(self.yaw);
        Pose::new(self.head_position + yaw * offset, yaw)
    }

    fn input_state(&self) -> InputState {
        let mut hand_trigger = self.pad.triggers;
        if self.held(KeyCode::Space) {
            hand_trigger[self.dominant.index()] = 1.0;
        }

        let key_left = Vec2::new(self.key_axis(KeyCode::KeyZ, KeyCode::KeyC), 0.0);
        let key_right = Vec2::new(
            self.key_axis(KeyCode::KeyF, KeyCode::KeyH),
            self.key_axis(KeyCode::KeyG, KeyCode::KeyT),
        );
        let clamp = |v: Vec2| v.clamp(Vec2::NEG_ONE, Vec2::ONE);

        InputState {
            buttons: self.pad.buttons | self.key_buttons(),
            hand_trigger,
            thumbstick: [
                clamp(self.pad.sticks[Hand::Left.index()] + key_left),
                clamp(self.pad.sticks[Hand::Right.index()] + key_right),
            ],
        }
    }

    fn default_eye_offset(&self, eye: Eye) -> f32 {
        match eye {
            Eye::Left => -self.config.ipd / 2.0,
            Eye::Right => self.config.ipd / 2.0,
        }
    }

    fn eye_projection(&self, eye: Eye, near: f32, far: f32) -> Mat4 {
        let c = &self.config;
        let (left, right) = match eye {
            Eye::Left => (c.fov_outer, c.fov_inner),
            Eye::Right => (c.fov_inner, c.fov_outer),
        };
        projection::frustum(-left * near, right * near, -c.fov_down * near, c.fov_up * near, near, far)
    }

    fn recenter(&mut self) {
        info!("Recentering tracking");
        self.head_position = Vec3::new(0.0, self.config.head_height, 0.0);
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.hand_shift = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hmd() -> SimulatedHmd {
        SimulatedHmd::without_gamepad(SimulatorConfig::default(), Hand::Right)
    }

    #[test]
    fn test_eye_poses_straddle_head() {
        let mut hmd = hmd();
        let [left, right] = hmd.eye_poses(0.0);
        assert!((left.position.x + 0.032).abs() < 1e-6);
        assert!((right.position.x - 0.032).abs() < 1e-6);
        assert_eq!(left.orientation, right.orientation);
    }

    #[test]
    fn test_held_key_moves_head_over_time() {
        let mut hmd = hmd();
        hmd.eye_poses(0.0);
        hmd.handle_key(KeyCode::KeyW, true);
        hmd.eye_poses(0.5);
        // move_speed 1 m/s forward for half a second
        assert!((hmd.head_pose().position.z + 0.5).abs() < 1e-5);

        hmd.handle_key(KeyCode::KeyW, false);
        hmd.eye_poses(1.0);
        assert!((hmd.head_pose().position.z + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_recenter_resets_pose() {
        let mut hmd = hmd();
        hmd.eye_poses(0.0);
        hmd.handle_key(KeyCode::ArrowLeft, true);
        hmd.handle_key(KeyCode::KeyD, true);
        hmd.eye_poses(1.0);
        assert_ne!(hmd.head_pose(), Pose::IDENTITY);

        hmd.recenter();
        assert_eq!(hmd.head_pose(), Pose::IDENTITY);
    }

    #[test]
    fn test_keys_map_to_touch_buttons_and_trigger() {
        let mut hmd = hmd();
        hmd.handle_key(KeyCode::Digit2, true);
        hmd.handle_key(KeyCode::Space, true);
        let input = hmd.input_state();
        assert!(input.buttons.contains(Buttons::B));
        assert!(!input.buttons.contains(Buttons::A));
        assert_eq!(input.trigger(Hand::Right), 1.0);
        assert_eq!(input.trigger(Hand::Left), 0.0);
    }

    #[test]
    fn test_controllers_mirror_rest_offset() {
        let hmd = hmd();
        let right = hmd.controller_pose(Hand::Right).position;
        let left = hmd.controller_pose(Hand::Left).position;
        assert!(right.abs_diff_eq(Vec3::new(0.2, -0.3, -0.35), 1e-6));
        assert!(left.abs_diff_eq(Vec3::new(-0.2, -0.3, -0.35), 1e-6));
    }

    #[test]
    fn test_eye_projection_is_asymmetric_toward_nose() {
        let hmd = hmd();
        let near = 0.01;
        let left = hmd.eye_projection(Eye::Left, near, 1000.0);
        // Outer edge of the left eye's frustum maps to NDC x = -1
        let outer = left.project_point3(Vec3::new(-1.29 * near, 0.0, -near));
        let inner = left.project_point3(Vec3::new(1.06 * near, 0.0, -near));
        assert!((outer.x + 1.0).abs() < 1e-4);
        assert!((inner.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_pad_state_maps_to_touch_layout() {
        let mut pad = PadState::default();
        pad.set_button(Button::West, true);
        pad.set_axis(Axis::RightStickX, 0.8);
        pad.set_axis(Axis::LeftStickY, 0.05);
        assert!(pad.buttons.contains(Buttons::X));
        assert_eq!(pad.sticks[Hand::Right.index()].x, 0.8);
        assert_eq!(pad.sticks[Hand::Left.index()].y, 0.0);
    }
}
