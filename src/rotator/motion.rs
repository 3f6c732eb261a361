// Rotator motion state machine
//
// A move request only sets the target. Each timer tick then advances the
// current angle by a fixed step along the shorter arc, snapping onto the
// target once |target - current| is within one step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ROTATION_RATE;

/// Motion status reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotatorStatus {
    #[default]
    Idle,
    Busy,
}

/// Operations a host can invoke on a rotator
pub trait MotionControllable {
    /// Accept a new target. Returns immediately with the resulting status.
    fn move_rotator(&mut self, angle: f64) -> RotatorStatus;
    fn sync_rotator(&mut self, angle: f64) -> bool;
    fn abort_rotator(&mut self) -> bool;
    fn reverse_rotator(&mut self, enabled: bool) -> bool;
    /// Advance one step. Cheap and non-blocking.
    fn tick(&mut self) -> RotatorStatus;
}

/// Wrap an angle into [0, 360). Non-finite input maps to 0.
pub fn range360(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// +1 to step up through the angles, -1 to step down
pub fn step_direction(current: f64, target: f64) -> f64 {
    let d = target - current;
    if (0.0..=180.0).contains(&d) || (-360.0..=-180.0).contains(&d) {
        1.0
    } else {
        -1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionController {
    current: f64,
    target: Option<f64>,
    status: RotatorStatus,
    reversed: bool,
    step_size: f64,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionController {
    pub fn new() -> Self {
        Self::with_step_size(ROTATION_RATE)
    }

    pub fn with_step_size(step_size: f64) -> Self {
        Self {
            current: 0.0,
            target: None,
            status: RotatorStatus::Idle,
            reversed: false,
            step_size,
        }
    }

    /// Start from a known position instead of 0°
    pub fn starting_at(mut self, angle: f64) -> Self {
        self.current = range360(angle);
        self
    }

    pub fn current_angle(&self) -> f64 {
        self.current
    }

    /// Last requested destination, `None` until the first move
    pub fn target_angle(&self) -> Option<f64> {
        self.target
    }

    pub fn status(&self) -> RotatorStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == RotatorStatus::Busy
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }
}

impl MotionControllable for MotionController {
    fn move_rotator(&mut self, angle: f64) -> RotatorStatus {
        let target = if self.reversed {
            range360(360.0 - angle)
        } else {
            range360(angle)
        };
        debug!("Target {:.2} (requested {:.2})", target, angle);
        self.target = Some(target);
        self.status = RotatorStatus::Busy;
        self.status
    }

    // Calibration hook only, position is not changed
    fn sync_rotator(&mut self, _angle: f64) -> bool {
        true
    }

    fn abort_rotator(&mut self) -> bool {
        self.status = RotatorStatus::Idle;
        true
    }

    fn reverse_rotator(&mut self, enabled: bool) -> bool {
        self.reversed = enabled;
        true
    }

    fn tick(&mut self) -> RotatorStatus {
        if self.status != RotatorStatus::Busy {
            return self.status;
        }
        let Some(target) = self.target else {
            self.status = RotatorStatus::Idle;
            return self.status;
        };

        // Raw difference, so a move across the 0° seam steps through it
        // before snapping
        if (target - self.current).abs() <= self.step_size {
            self.current = target;
            self.status = RotatorStatus::Idle;
        } else {
            let sign = step_direction(self.current, target);
            self.current = range360(self.current + sign * self.step_size);
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_idle(ctl: &mut MotionController) -> usize {
        let mut ticks = 0;
        while ctl.is_busy() {
            ctl.tick();
            ticks += 1;
            assert!(ticks <= 100, "controller never settled");
        }
        ticks
    }

    #[test]
    fn test_range360() {
        assert_eq!(range360(0.0), 0.0);
        assert_eq!(range360(360.0), 0.0);
        assert_eq!(range360(370.0), 10.0);
        assert_eq!(range360(-10.0), 350.0);
        assert_eq!(range360(-720.0), 0.0);
        assert_eq!(range360(f64::NAN), 0.0);
        assert!(range360(-1e-17) < 360.0);
    }

    #[test]
    fn test_range360_congruent() {
        for x in [-1234.5, -360.0, -0.25, 0.0, 15.0, 359.99, 721.0, 1e6] {
            let r = range360(x);
            assert!((0.0..360.0).contains(&r), "{} -> {}", x, r);
            let k = ((x - r) / 360.0).round();
            assert!((x - r - k * 360.0).abs() < 1e-6, "{} not congruent to {}", r, x);
        }
    }

    #[test]
    fn test_step_direction() {
        assert_eq!(step_direction(0.0, 90.0), 1.0);
        assert_eq!(step_direction(90.0, 0.0), -1.0);
        assert_eq!(step_direction(0.0, 180.0), 1.0);
        assert_eq!(step_direction(180.0, 0.0), 1.0);
        assert_eq!(step_direction(350.0, 10.0), 1.0);
        assert_eq!(step_direction(10.0, 350.0), -1.0);
    }

    #[test]
    fn test_initial_state() {
        let ctl = MotionController::new();
        assert_eq!(ctl.status(), RotatorStatus::Idle);
        assert_eq!(ctl.target_angle(), None);
        assert_eq!(ctl.current_angle(), 0.0);
        assert!(!ctl.is_reversed());
    }

    #[test]
    fn test_move_sets_busy_and_normalizes() {
        let mut ctl = MotionController::new();
        assert_eq!(ctl.move_rotator(450.0), RotatorStatus::Busy);
        assert_eq!(ctl.target_angle(), Some(90.0));
        assert_eq!(ctl.move_rotator(-30.0), RotatorStatus::Busy);
        assert_eq!(ctl.target_angle(), Some(330.0));
    }

    #[test]
    fn test_wraps_upward_through_zero() {
        let mut ctl = MotionController::new().starting_at(350.0);
        ctl.move_rotator(10.0);
        ctl.tick();
        assert_eq!(ctl.current_angle(), 0.0);
        assert!(ctl.is_busy());
        ctl.tick();
        assert_eq!(ctl.current_angle(), 10.0);
        assert_eq!(ctl.status(), RotatorStatus::Idle);
    }

    #[test]
    fn test_snaps_exactly_onto_target() {
        let mut ctl = MotionController::new();
        ctl.move_rotator(25.0);
        assert_eq!(run_to_idle(&mut ctl), 3);
        assert_eq!(ctl.current_angle(), 25.0);
    }

    #[test]
    fn test_steps_through_seam_before_snapping() {
        let mut ctl = MotionController::new().starting_at(359.0);
        ctl.move_rotator(1.0);
        assert_eq!(ctl.tick(), RotatorStatus::Busy);
        assert_eq!(ctl.current_angle(), 9.0);
        assert_eq!(ctl.tick(), RotatorStatus::Idle);
        assert_eq!(ctl.current_angle(), 1.0);
    }

    #[test]
    fn test_steps_down_through_seam_before_snapping() {
        let mut ctl = MotionController::new().starting_at(5.0);
        ctl.move_rotator(355.0);
        assert_eq!(ctl.tick(), RotatorStatus::Busy);
        assert_eq!(ctl.current_angle(), 355.0);
        assert_eq!(ctl.tick(), RotatorStatus::Idle);
        assert_eq!(ctl.current_angle(), 355.0);
    }

    #[test]
    fn test_half_turn_across_seam_takes_extra_tick() {
        let mut ctl = MotionController::new().starting_at(180.0);
        ctl.move_rotator(0.0);
        for _ in 0..18 {
            ctl.tick();
        }
        assert_eq!(ctl.current_angle(), 0.0);
        assert!(ctl.is_busy());
        assert_eq!(ctl.tick(), RotatorStatus::Idle);
    }

    #[test]
    fn test_converges_without_reversing() {
        // ceil(180 / step) steps, plus one when the last step crosses the seam
        let max_ticks = (180.0_f64 / ROTATION_RATE).ceil() as usize + 1;
        for start in (0..360).step_by(7) {
            for target in (0..360).step_by(11) {
                let mut ctl = MotionController::new().starting_at(start as f64 + 0.5);
                ctl.move_rotator(target as f64);
                let sign = step_direction(ctl.current_angle(), target as f64);
                let mut ticks = 0;
                while ctl.is_busy() {
                    let before = ctl.current_angle();
                    ctl.tick();
                    ticks += 1;
                    if ctl.is_busy() {
                        let moved = range360(ctl.current_angle() - before);
                        let expected = range360(sign * ROTATION_RATE);
                        assert_eq!(moved, expected, "changed direction mid-move");
                    }
                }
                assert!(ticks <= max_ticks, "{} -> {} took {} ticks", start, target, ticks);
                assert_eq!(ctl.current_angle(), target as f64);
            }
        }
    }

    #[test]
    fn test_reverse_transforms_new_targets_only() {
        let mut ctl = MotionController::new();
        ctl.move_rotator(90.0);
        ctl.reverse_rotator(true);
        assert_eq!(ctl.target_angle(), Some(90.0));

        ctl.move_rotator(30.0);
        assert_eq!(ctl.target_angle(), Some(330.0));

        ctl.move_rotator(0.0);
        assert_eq!(ctl.target_angle(), Some(0.0));
    }

    #[test]
    fn test_abort_idle_is_noop() {
        let mut ctl = MotionController::new().starting_at(42.0);
        assert!(ctl.abort_rotator());
        assert_eq!(ctl.status(), RotatorStatus::Idle);
        assert_eq!(ctl.current_angle(), 42.0);
    }

    #[test]
    fn test_abort_busy_stops_in_place() {
        let mut ctl = MotionController::new();
        ctl.move_rotator(120.0);
        ctl.tick();
        ctl.tick();
        assert!(ctl.abort_rotator());
        assert_eq!(ctl.status(), RotatorStatus::Idle);
        assert_eq!(ctl.current_angle(), 20.0);

        // Further ticks do nothing once aborted
        ctl.tick();
        assert_eq!(ctl.current_angle(), 20.0);
    }

    #[test]
    fn test_sync_does_not_move() {
        let mut ctl = MotionController::new().starting_at(15.0);
        assert!(ctl.sync_rotator(200.0));
        assert_eq!(ctl.current_angle(), 15.0);
        assert_eq!(ctl.status(), RotatorStatus::Idle);
    }

    #[test]
    fn test_repeat_move_to_current_angle_resolves_next_tick() {
        let mut ctl = MotionController::new();
        ctl.move_rotator(20.0);
        run_to_idle(&mut ctl);

        assert_eq!(ctl.move_rotator(20.0), RotatorStatus::Busy);
        assert_eq!(ctl.tick(), RotatorStatus::Idle);
        assert_eq!(ctl.current_angle(), 20.0);
    }

    #[test]
    fn test_new_move_overwrites_target() {
        let mut ctl = MotionController::new();
        ctl.move_rotator(100.0);
        ctl.tick();
        ctl.move_rotator(340.0);
        ctl.tick();
        assert_eq!(ctl.current_angle(), 0.0);
        assert_eq!(ctl.target_angle(), Some(340.0));
    }
}
