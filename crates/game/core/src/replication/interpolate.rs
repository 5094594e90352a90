use std::time::Duration;

use crate::state::Kinematics;

/// Smooths a mirror toward the latest snapshot of its owner.
///
/// Position is continuous and chased exponentially; direction, speed and the
/// moving flag are discrete and overwritten on arrival. Between snapshots the
/// target is dead-reckoned along its last known velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolator {
    current: Kinematics,
    target: Kinematics,
}

impl Interpolator {
    pub fn new(kinematics: Kinematics) -> Self {
        Self {
            current: kinematics,
            target: kinematics,
        }
    }

    pub fn retarget(&mut self, target: Kinematics) {
        self.target = target;
        self.current.direction = target.direction;
        self.current.moving = target.moving;
        self.current.speed = target.speed;
    }

    pub fn advance(&mut self, dt: Duration, smoothing: f32) -> Kinematics {
        if self.target.moving {
            self.target.position += self.target.direction * self.target.speed * dt.as_secs_f32();
        }
        let alpha = smoothing.clamp(0.0, 1.0);
        self.current.position = self.current.position.lerp(self.target.position, alpha);
        self.current
    }

    pub fn current(&self) -> Kinematics {
        self.current
    }

    pub fn target(&self) -> Kinematics {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn full_smoothing_snaps_to_target() {
        let mut interpolator = Interpolator::new(Kinematics::at(Vec3::ZERO));
        interpolator.retarget(Kinematics::at(Vec3::new(4.0, 0.0, 0.0)));
        let now = interpolator.advance(Duration::from_millis(16), 1.0);
        assert_eq!(now.position, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn partial_smoothing_closes_part_of_the_gap() {
        let mut interpolator = Interpolator::new(Kinematics::at(Vec3::ZERO));
        interpolator.retarget(Kinematics::at(Vec3::new(10.0, 0.0, 0.0)));
        let now = interpolator.advance(Duration::from_millis(16), 0.5);
        assert_eq!(now.position.x, 5.0);
    }

    #[test]
    fn moving_target_is_dead_reckoned() {
        let mut interpolator = Interpolator::new(Kinematics::at(Vec3::ZERO));
        interpolator.retarget(Kinematics {
            position: Vec3::ZERO,
            direction: Vec3::X,
            moving: true,
            speed: 10.0,
        });
        interpolator.advance(Duration::from_millis(500), 1.0);
        assert_eq!(interpolator.current().position, Vec3::new(5.0, 0.0, 0.0));
    }
}
