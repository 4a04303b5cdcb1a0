//! Frame planning scenarios driven through the `Tracking` interface

use cave_vr::cave::Wall;
use cave_vr::config::CaveConfig;
use cave_vr::driver::{FramePlan, StereoDriver};
use cave_vr::hmd::{Buttons, Eye, Hand, InputState, Pose, Tracking, TrackingSample};
use cave_vr::projection;
use cave_vr::viewpoint::ViewSource;
use glam::{Mat4, Vec2, Vec3};

const IPD: f32 = 0.064;

/// Tracking source whose state the test sets directly
struct ScriptedTracking {
    head: Vec3,
    hand: Vec3,
    input: InputState,
}

impl ScriptedTracking {
    fn new() -> Self {
        Self { head: Vec3::ZERO, hand: Vec3::new(0.2, -0.3, -0.35), input: InputState::default() }
    }

    fn press(&mut self, buttons: Buttons) {
        self.input.buttons = buttons;
    }

    fn trigger(&mut self, value: f32) {
        self.input.hand_trigger[Hand::Right.index()] = value;
    }
}

impl Tracking for ScriptedTracking {
    fn eye_poses(&mut self, _display_time: f64) -> [Pose; 2] {
        Eye::ALL.map(|eye| Pose::from_position(self.head + Vec3::X * self.default_eye_offset(eye)))
    }

    fn controller_pose(&self, hand: Hand) -> Pose {
        match hand {
            Hand::Right => Pose::from_position(self.hand),
            Hand::Left => Pose::from_position(self.hand * Vec3::new(-1.0, 1.0, 1.0)),
        }
    }

    fn input_state(&self) -> InputState {
        self.input
    }

    fn default_eye_offset(&self, eye: Eye) -> f32 {
        match eye {
            Eye::Left => -IPD / 2.0,
            Eye::Right => IPD / 2.0,
        }
    }

    fn eye_projection(&self, _eye: Eye, near: f32, far: f32) -> Mat4 {
        projection::frustum(-near, near, -near, near, near, far)
    }

    fn recenter(&mut self) {
        self.head = Vec3::ZERO;
    }
}

struct Harness {
    driver: StereoDriver,
    tracking: ScriptedTracking,
    frame: u64,
}

impl Harness {
    fn new(seed: u64) -> Self {
        Self { driver: StereoDriver::with_seed(CaveConfig::default(), seed), tracking: ScriptedTracking::new(), frame: 0 }
    }

    fn step(&mut self) -> FramePlan {
        let config = self.driver.config().clone();
        let sample = TrackingSample::capture(
            &mut self.tracking,
            self.frame,
            self.frame as f64 / 90.0,
            config.near,
            config.far,
        );
        self.frame += 1;
        self.driver.render_frame(&sample)
    }

    fn click(&mut self, buttons: Buttons) -> FramePlan {
        self.tracking.press(buttons);
        self.step();
        self.tracking.press(Buttons::NONE);
        self.step()
    }
}

fn wall_matrices(plan: &FramePlan) -> Vec<Mat4> {
    plan.wall_passes().map(|pass| pass.off_axis.view_projection).collect()
}

#[test]
fn test_plan_orders_walls_per_eye() {
    let mut harness = Harness::new(1);
    let plan = harness.step();

    assert_eq!(plan.eyes.len(), 2);
    for (eye_plan, eye) in plan.eyes.iter().zip(Eye::ALL) {
        assert_eq!(eye_plan.eye, eye);
        let walls: Vec<Wall> = eye_plan.walls.iter().map(|w| w.wall).collect();
        assert_eq!(walls, Wall::ALL.to_vec());
        assert_eq!(eye_plan.composed.eye, eye);
    }
    let slots: Vec<usize> = plan.wall_passes().map(|w| w.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    assert!(plan.wall_passes().all(|w| !w.disabled && !w.draws.is_empty()));
}

#[test]
fn test_left_wall_frames_its_corners() {
    let mut harness = Harness::new(1);
    let plan = harness.step();
    let pass = &plan.eye(Eye::Left).walls[Wall::Left.index()];

    // Every wall corner lands on an NDC corner from the tracked eye
    let vp = pass.off_axis.view_projection;
    let a = vp.project_point3(pass.corners.pa);
    let b = vp.project_point3(pass.corners.pb);
    let c = vp.project_point3(pass.corners.pc);
    assert!((a.x + 1.0).abs() < 1e-3 && (a.y + 1.0).abs() < 1e-3);
    assert!((b.x - 1.0).abs() < 1e-3 && (b.y + 1.0).abs() < 1e-3);
    assert!((c.x + 1.0).abs() < 1e-3 && (c.y - 1.0).abs() < 1e-3);

    assert_eq!(plan.eye(Eye::Left).viewpoint.source, ViewSource::Head);
    assert!(plan.eye(Eye::Left).viewpoint.position.abs_diff_eq(Vec3::new(-IPD / 2.0, 0.0, 0.0), 1e-6));
}

#[test]
fn test_head_mode_follows_tracking() {
    let mut harness = Harness::new(1);
    let before = wall_matrices(&harness.step());
    harness.tracking.head = Vec3::new(0.3, 0.1, -0.2);
    let after = wall_matrices(&harness.step());
    assert!(before.iter().zip(&after).all(|(a, b)| a != b));
}

#[test]
fn test_hand_tracked_and_frozen_walls_stay_fixed() {
    let mut harness = Harness::new(1);
    harness.tracking.trigger(0.9);
    let plan = harness.click(Buttons::B);
    assert_eq!(plan.eye(Eye::Right).viewpoint.source, ViewSource::Hand);
    assert!(plan.eye(Eye::Right).viewpoint.frozen);

    let frozen = wall_matrices(&harness.step());
    for i in 1..=5 {
        harness.tracking.head = Vec3::new(0.1 * i as f32, 0.0, 0.05);
        harness.tracking.hand = Vec3::new(-0.1, 0.2 * i as f32, -0.5);
        assert_eq!(wall_matrices(&harness.step()), frozen);
    }
}

#[test]
fn test_hand_mode_places_eyes_around_controller() {
    let mut harness = Harness::new(1);
    harness.tracking.trigger(0.6);
    let plan = harness.step();

    let hand = harness.tracking.hand;
    let left = plan.eye(Eye::Left).viewpoint;
    let right = plan.eye(Eye::Right).viewpoint;
    assert_eq!(left.source, ViewSource::Hand);
    assert!(left.position.abs_diff_eq(hand - Vec3::X * IPD / 2.0, 1e-6));
    assert!(right.position.abs_diff_eq(hand + Vec3::X * IPD / 2.0, 1e-6));

    // Releasing the trigger returns to the head
    harness.tracking.trigger(0.2);
    let plan = harness.step();
    assert_eq!(plan.eye(Eye::Left).viewpoint.source, ViewSource::Head);
}

#[test]
fn test_composed_pass_uses_live_pose_while_frozen() {
    let mut harness = Harness::new(1);
    harness.click(Buttons::B);
    harness.tracking.head = Vec3::new(0.0, 0.0, 0.5);
    let plan = harness.step();

    let composed = &plan.eye(Eye::Left).composed;
    let live = Pose::from_position(Vec3::new(-IPD / 2.0, 0.0, 0.5));
    assert!(composed.view.abs_diff_eq(live.view(), 1e-6));
    // Wall passes still use the cached eye
    assert!(plan.eye(Eye::Left).viewpoint.position.abs_diff_eq(Vec3::new(-IPD / 2.0, 0.0, 0.0), 1e-6));
}

#[test]
fn test_disabled_projector_blanks_one_pass() {
    let mut harness = Harness::new(42);
    let plan = harness.click(Buttons::X);

    let disabled: Vec<_> = plan.wall_passes().filter(|w| w.disabled).collect();
    assert_eq!(disabled.len(), 1);
    assert!(disabled[0].draws.is_empty());
    assert_eq!(plan.wall_passes().filter(|w| w.draws.is_empty()).count(), 1);
    // The composed passes still show every wall
    assert!(plan.eyes.iter().all(|e| !e.composed.draws.is_empty()));

    // Stays disabled until X is clicked again
    let slot = disabled[0].slot;
    let next = harness.step();
    assert_eq!(next.wall_passes().find(|w| w.disabled).map(|w| w.slot), Some(slot));
    let cleared = harness.click(Buttons::X);
    assert!(cleared.wall_passes().all(|w| !w.disabled));
}

#[test]
fn test_same_seed_disables_same_slot() {
    let slot = |seed| {
        let mut harness = Harness::new(seed);
        let plan = harness.click(Buttons::X);
        let slot = plan.wall_passes().find(|w| w.disabled).map(|w| w.slot);
        slot
    };
    assert_eq!(slot(7), slot(7));
    assert!(slot(7).is_some());
}

#[test]
fn test_debug_lines_only_while_a_held() {
    let mut harness = Harness::new(1);
    assert!(harness.step().eye(Eye::Right).composed.lines.is_empty());

    harness.tracking.press(Buttons::A);
    let plan = harness.step();
    let lines = &plan.eye(Eye::Right).composed.lines;
    assert_eq!(lines.len(), 14);
    let left_eye = plan.eye(Eye::Left).viewpoint.position;
    assert_eq!(lines.iter().filter(|l| l.end == left_eye).count(), 7);
}

#[test]
fn test_thumbsticks_drive_cubes() {
    let mut harness = Harness::new(1);
    let home = harness.driver.scene().cube_positions().to_vec();
    harness.tracking.input.thumbstick = [Vec2::new(1.0, 0.0), Vec2::new(-1.0, 0.0)];
    harness.step();
    assert!(harness.driver.scene().cube_size() > 0.1);
    assert!(harness.driver.scene().cube_positions()[0].x < home[0].x);
}
