//! Viewpoint mode state machine
//!
//! Decides, once per frame, which eye position drives the off-axis solve and
//! which (eye, wall) render pass is suppressed. Three independent axes:
//!
//! - head vs. hand: level-triggered by the dominant hand trigger
//! - live vs. frozen: toggled when B is released
//! - all walls vs. one disabled projector: toggled when X is released
//!
//! Button edges come from comparing this frame's raw bitmask with the
//! previous one. There is no debouncing beyond that.

use glam::Vec3;
use log::info;
use rand::Rng;

use crate::cave::Wall;
use crate::hmd::{Buttons, Eye, Hand, InputState, Pose, TrackingSample};

/// Number of (eye, wall) render passes per frame
pub const WALL_PASS_COUNT: usize = 6;

/// Slot index of an (eye, wall) pass
pub fn pass_slot(eye: Eye, wall: Wall) -> usize {
    eye.index() * Wall::ALL.len() + wall.index()
}

/// Mode flags and the button state they were derived from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Modes {
    pub freeze: bool,
    pub hand_control: bool,
    /// Projection lines and eye cursors (A held)
    pub show_debug: bool,
    pub disabled_slot: Option<usize>,
    previous_buttons: Buttons,
}

/// Which pose an eye position was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSource {
    Head,
    Hand,
}

/// Eye used for one eye's wall passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeViewpoint {
    pub eye: Eye,
    pub source: ViewSource,
    pub position: Vec3,
    pub frozen: bool,
}

impl Modes {
    fn released(&self, input: &InputState, button: Buttons) -> bool {
        self.previous_buttons.contains(button) && !input.buttons.contains(button)
    }

    /// Pure transition. `roll` picks a slot in `0..WALL_PASS_COUNT` and is
    /// called only when the disabled projector switches on.
    pub fn next(
        self,
        input: &InputState,
        trigger_hand: Hand,
        trigger_threshold: f32,
        roll: impl FnOnce() -> usize,
    ) -> Modes {
        let freeze = if self.released(input, Buttons::B) { !self.freeze } else { self.freeze };

        let disabled_slot = if self.released(input, Buttons::X) {
            match self.disabled_slot {
                Some(_) => None,
                None => Some(roll() % WALL_PASS_COUNT),
            }
        } else {
            self.disabled_slot
        };

        Modes {
            freeze,
            hand_control: input.trigger(trigger_hand) > trigger_threshold,
            show_debug: input.buttons.contains(Buttons::A),
            disabled_slot,
            previous_buttons: input.buttons,
        }
    }

    pub fn is_pass_disabled(&self, eye: Eye, wall: Wall) -> bool {
        self.disabled_slot == Some(pass_slot(eye, wall))
    }
}

/// Last live poses, kept while frozen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseCache {
    eyes: [Option<Pose>; 2],
    hand: Option<Vec3>,
}

impl PoseCache {
    /// Store live values unless frozen. The first sample is always stored.
    pub fn observe(&mut self, eye: Eye, live_eye: Pose, live_hand: Vec3, frozen: bool) {
        let slot = &mut self.eyes[eye.index()];
        if !frozen || slot.is_none() {
            *slot = Some(live_eye);
        }
        if !frozen || self.hand.is_none() {
            self.hand = Some(live_hand);
        }
    }

    pub fn eye(&self, eye: Eye) -> Option<Pose> {
        self.eyes[eye.index()]
    }

    pub fn hand(&self) -> Option<Vec3> {
        self.hand
    }
}

/// Full viewpoint state carried across frames
#[derive(Debug, Clone, Default)]
pub struct ViewpointState {
    pub modes: Modes,
    pub cache: PoseCache,
}

impl ViewpointState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this frame's raw input
    pub fn update<R: Rng>(
        &mut self,
        input: &InputState,
        trigger_hand: Hand,
        trigger_threshold: f32,
        rng: &mut R,
    ) {
        let before = self.modes;
        self.modes = before.next(input, trigger_hand, trigger_threshold, || rng.gen_range(0..WALL_PASS_COUNT));

        if before.freeze != self.modes.freeze {
            info!("Freeze mode: {}", if self.modes.freeze { "on" } else { "off" });
        }
        if before.hand_control != self.modes.hand_control {
            info!(
                "Viewpoint: {}",
                if self.modes.hand_control { "hand controller" } else { "head" }
            );
        }
        if before.disabled_slot != self.modes.disabled_slot {
            match self.modes.disabled_slot {
                Some(slot) => info!("Disabled projector: slot {}", slot),
                None => info!("All projectors enabled"),
            }
        }
    }

    /// Eye position for `eye`'s wall passes this frame
    pub fn resolve_eye(&mut self, eye: Eye, sample: &TrackingSample, dominant: Hand) -> EyeViewpoint {
        let frozen = self.modes.freeze;
        let live_eye = sample.eye_poses[eye.index()];
        let live_hand = sample.hand(dominant).position;
        self.cache.observe(eye, live_eye, live_hand, frozen);

        let (source, pose) = if self.modes.hand_control {
            // Un-rotated basis at the controller, eyes split along X
            let anchor = self.cache.hand().unwrap_or(live_hand);
            let offset = Vec3::X * sample.eye_offsets[eye.index()];
            (ViewSource::Hand, Pose::from_position(anchor + offset))
        } else {
            (ViewSource::Head, self.cache.eye(eye).unwrap_or(live_eye))
        };

        EyeViewpoint {
            eye,
            source,
            position: pose.position,
            frozen,
        }
    }

    pub fn is_pass_disabled(&self, eye: Eye, wall: Wall) -> bool {
        self.modes.is_pass_disabled(eye, wall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat, Vec2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn input(buttons: Buttons, right_trigger: f32) -> InputState {
        InputState {
            buttons,
            hand_trigger: [0.0, right_trigger],
            thumbstick: [Vec2::ZERO; 2],
        }
    }

    fn sample(head: Vec3, hand: Vec3) -> TrackingSample {
        let eye_offsets = [-0.032, 0.032];
        TrackingSample {
            frame: 0,
            display_time: 0.0,
            eye_poses: [
                Pose::new(head + Vec3::X * eye_offsets[0], Quat::from_rotation_y(0.3)),
                Pose::new(head + Vec3::X * eye_offsets[1], Quat::from_rotation_y(0.3)),
            ],
            eye_projections: [Mat4::IDENTITY; 2],
            eye_offsets,
            hands: [Pose::IDENTITY, Pose::from_position(hand)],
            input: InputState::default(),
        }
    }

    fn press_and_release(state: &mut ViewpointState, button: Buttons, rng: &mut StdRng) {
        state.update(&input(button, 0.0), Hand::Right, 0.5, rng);
        state.update(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, rng);
    }

    #[test]
    fn test_freeze_toggles_on_release_not_press() {
        let modes = Modes::default();
        let pressed = modes.next(&input(Buttons::B, 0.0), Hand::Right, 0.5, || 0);
        assert!(!pressed.freeze);
        let held = pressed.next(&input(Buttons::B, 0.0), Hand::Right, 0.5, || 0);
        assert!(!held.freeze);
        let released = held.next(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, || 0);
        assert!(released.freeze);
        let idle = released.next(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, || 0);
        assert!(idle.freeze);
    }

    #[test]
    fn test_hand_control_is_level_triggered() {
        let modes = Modes::default();
        let on = modes.next(&input(Buttons::NONE, 0.8), Hand::Right, 0.5, || 0);
        assert!(on.hand_control);
        let still = on.next(&input(Buttons::NONE, 0.51), Hand::Right, 0.5, || 0);
        assert!(still.hand_control);
        let at_threshold = still.next(&input(Buttons::NONE, 0.5), Hand::Right, 0.5, || 0);
        assert!(!at_threshold.hand_control);
    }

    #[test]
    fn test_show_debug_follows_a_button() {
        let modes = Modes::default().next(&input(Buttons::A, 0.0), Hand::Right, 0.5, || 0);
        assert!(modes.show_debug);
        let modes = modes.next(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, || 0);
        assert!(!modes.show_debug);
    }

    #[test]
    fn test_disabled_slot_rolled_once_per_session() {
        let mut rolls = 0;
        let mut modes = Modes::default();
        modes = modes.next(&input(Buttons::X, 0.0), Hand::Right, 0.5, || unreachable!());
        modes = modes.next(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, || {
            rolls += 1;
            4
        });
        assert_eq!(modes.disabled_slot, Some(4));

        // Other buttons and idle frames keep the slot without rolling again
        for buttons in [Buttons::NONE, Buttons::B, Buttons::NONE, Buttons::A] {
            modes = modes.next(&input(buttons, 0.9), Hand::Right, 0.5, || unreachable!());
            assert_eq!(modes.disabled_slot, Some(4));
        }
        assert_eq!(rolls, 1);

        // Toggle off
        modes = modes.next(&input(Buttons::X, 0.0), Hand::Right, 0.5, || unreachable!());
        modes = modes.next(&input(Buttons::NONE, 0.0), Hand::Right, 0.5, || unreachable!());
        assert_eq!(modes.disabled_slot, None);
    }

    #[test]
    fn test_disabled_slot_can_change_across_sessions() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = ViewpointState::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..40 {
            press_and_release(&mut state, Buttons::X, &mut rng);
            let slot = state.modes.disabled_slot.expect("toggled on");
            assert!(slot < WALL_PASS_COUNT);
            seen.insert(slot);
            press_and_release(&mut state, Buttons::X, &mut rng);
            assert_eq!(state.modes.disabled_slot, None);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_exactly_one_pass_disabled() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = ViewpointState::new();
        press_and_release(&mut state, Buttons::X, &mut rng);
        let disabled = Eye::ALL
            .iter()
            .flat_map(|&eye| Wall::ALL.map(move |wall| (eye, wall)))
            .filter(|&(eye, wall)| state.is_pass_disabled(eye, wall))
            .count();
        assert_eq!(disabled, 1);
    }

    #[test]
    fn test_head_mode_uses_live_eye_pose() {
        let mut state = ViewpointState::new();
        let s = sample(Vec3::new(0.1, 0.2, 0.3), Vec3::new(1.0, 0.0, 0.0));
        let left = state.resolve_eye(Eye::Left, &s, Hand::Right);
        assert_eq!(left.source, ViewSource::Head);
        assert_eq!(left.position, s.eye_poses[0].position);
    }

    #[test]
    fn test_freeze_holds_head_position() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = ViewpointState::new();
        let first = sample(Vec3::new(0.0, 0.1, 0.0), Vec3::ZERO);
        let pinned = state.resolve_eye(Eye::Right, &first, Hand::Right).position;

        press_and_release(&mut state, Buttons::B, &mut rng);
        assert!(state.modes.freeze);

        for step in 1..10 {
            let moved = sample(Vec3::new(step as f32 * 0.1, 0.5, -0.2), Vec3::ZERO);
            let resolved = state.resolve_eye(Eye::Right, &moved, Hand::Right);
            assert_eq!(resolved.position, pinned);
            assert!(resolved.frozen);
        }

        press_and_release(&mut state, Buttons::B, &mut rng);
        let live = sample(Vec3::new(0.7, 0.0, 0.0), Vec3::ZERO);
        let resolved = state.resolve_eye(Eye::Right, &live, Hand::Right);
        assert_eq!(resolved.position, live.eye_poses[1].position);
    }

    #[test]
    fn test_hand_mode_offsets_eyes_along_x() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = ViewpointState::new();
        state.update(&input(Buttons::NONE, 1.0), Hand::Right, 0.5, &mut rng);

        let hand = Vec3::new(0.4, -0.2, -0.5);
        let s = sample(Vec3::ZERO, hand);
        let left = state.resolve_eye(Eye::Left, &s, Hand::Right);
        let right = state.resolve_eye(Eye::Right, &s, Hand::Right);
        assert_eq!(left.source, ViewSource::Hand);
        assert!(left.position.abs_diff_eq(hand + Vec3::new(-0.032, 0.0, 0.0), 1e-6));
        assert!(right.position.abs_diff_eq(hand + Vec3::new(0.032, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_freeze_holds_hand_position() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = ViewpointState::new();
        state.update(&input(Buttons::NONE, 1.0), Hand::Right, 0.5, &mut rng);
        let before = state.resolve_eye(Eye::Left, &sample(Vec3::ZERO, Vec3::new(0.2, 0.0, 0.0)), Hand::Right);

        state.update(&input(Buttons::B, 1.0), Hand::Right, 0.5, &mut rng);
        state.update(&input(Buttons::NONE, 1.0), Hand::Right, 0.5, &mut rng);
        assert!(state.modes.freeze && state.modes.hand_control);

        let after = state.resolve_eye(Eye::Left, &sample(Vec3::ZERO, Vec3::new(-1.0, 0.3, 0.9)), Hand::Right);
        assert_eq!(after.position, before.position);
    }

    #[test]
    fn test_pass_slots_cover_six_distinct_indices() {
        let mut slots: Vec<usize> = Eye::ALL
            .iter()
            .flat_map(|&eye| Wall::ALL.map(move |wall| pass_slot(eye, wall)))
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    }
}
