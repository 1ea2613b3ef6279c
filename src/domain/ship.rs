// Ship dynamics: smoothed speed/steering driven by raw control input, integrated in local units.

use crate::domain::components::{ShipControls, TransformInfo};
use crate::domain::scales::{to_local_vec, to_wire_vec};
use crate::domain::tuning::ShipTuning;
use glam::{DQuat, DVec3};

// 10^9 is already far past anything useful inside one solar system.
const MAX_WARP_SPEED: u32 = 9;

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// Simulation-only ship state held by the node that owns the ship's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipState {
    /// Local units.
    pub position: DVec3,
    pub rotation: DQuat,
    /// Local units per second.
    pub velocity: DVec3,

    pub target_speed: f64,
    pub current_speed: f64,
    pub target_steering: f64,
    pub current_steering: f64,

    /// Highest warp sequence already handled.
    pub last_warp_sequence: u64,
}

impl ShipState {
    pub fn at(position: DVec3, rotation: DQuat) -> Self {
        Self {
            position,
            rotation,
            velocity: DVec3::ZERO,
            target_speed: 0.0,
            current_speed: 0.0,
            target_steering: 0.0,
            current_steering: 0.0,
            last_warp_sequence: 0,
        }
    }

    /// Seeds the simulation from a replicated transform (wire units).
    pub fn from_transform(transform: &TransformInfo) -> Self {
        Self::at(to_local_vec(transform.position), transform.rotation)
    }

    /// Smooths the raw input into current speed and steering. Runs every tick before `integrate`.
    pub fn steer(&mut self, controls: &ShipControls, dt: f64) {
        let input_speed = f64::from(controls.target_speed).clamp(-1.0, 1.0);
        let input_steering = f64::from(controls.target_steering).clamp(-1.0, 1.0);

        // Decay toward rest; sharp turns bleed speed.
        self.target_speed = lerp(
            self.target_speed,
            0.0,
            dt * (0.5 + self.target_steering.abs()),
        );
        self.target_steering = lerp(self.target_steering, 0.0, dt * 3.0);

        self.target_speed += dt * input_speed;
        self.current_speed = lerp(self.current_speed, self.target_speed, dt * 5.0);

        // The slower the ship, the less it responds to steering.
        let authority = 0.1 + 0.9 * (self.current_speed + 0.1);
        self.target_steering =
            (self.target_steering + dt * 6.0 * input_steering * authority).clamp(-1.0, 1.0);
        self.current_steering = lerp(self.current_steering, self.target_steering, dt * 5.0);
    }

    /// Applies the velocity target as an instantaneous change, then moves the ship.
    pub fn integrate(&mut self, controls: &ShipControls, dt: f64, tuning: &ShipTuning) {
        let warp = 10f64.powi(controls.warp_speed.min(MAX_WARP_SPEED) as i32);
        let forward = self.rotation * DVec3::Z;
        self.velocity = forward * self.current_speed * tuning.movement_speed * warp;

        let yaw = self.current_steering * tuning.turning_speed * dt;
        self.rotation = (self.rotation * DQuat::from_rotation_y(yaw)).normalize();
        self.position += self.velocity * dt;
    }

    pub fn step(&mut self, controls: &ShipControls, dt: f64, tuning: &ShipTuning) {
        self.steer(controls, dt);
        self.integrate(controls, dt, tuning);
    }

    /// Teleports the ship and brings it to rest.
    pub fn relocate(&mut self, position: DVec3, rotation: DQuat) {
        let last_warp_sequence = self.last_warp_sequence;
        *self = Self::at(position, rotation);
        self.last_warp_sequence = last_warp_sequence;
    }

    pub fn to_transform(&self, scale: DVec3) -> TransformInfo {
        TransformInfo {
            position: to_wire_vec(self.position),
            rotation: self.rotation,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    fn controls(speed: f32, steering: f32) -> ShipControls {
        ShipControls {
            target_speed: speed,
            target_steering: steering,
            ..ShipControls::default()
        }
    }

    #[test]
    fn when_input_stops_then_speed_and_steering_decay_toward_zero() {
        let mut ship = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        for _ in 0..120 {
            ship.step(&controls(1.0, 1.0), DT, &ShipTuning::default());
        }
        let (speed, steering) = (ship.current_speed.abs(), ship.current_steering.abs());
        assert!(speed > 0.1);

        let mut previous = (speed, steering);
        for _ in 0..1200 {
            ship.step(&controls(0.0, 0.0), DT, &ShipTuning::default());
            let now = (ship.current_speed.abs(), ship.current_steering.abs());
            assert!(now.0 <= previous.0 + 1e-9);
            previous = now;
        }

        assert!(ship.current_speed.abs() < 1e-2);
        assert!(ship.current_steering.abs() < 1e-2);
    }

    #[test]
    fn when_ship_is_slow_then_steering_response_is_damped() {
        let mut slow = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        let mut fast = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        fast.current_speed = 1.0;
        fast.target_speed = 1.0;

        slow.steer(&controls(0.0, 1.0), DT);
        fast.steer(&controls(0.0, 1.0), DT);

        assert!(slow.target_steering > 0.0);
        assert!(fast.target_steering > slow.target_steering * 4.0);
    }

    #[test]
    fn when_throttle_is_held_then_ship_moves_forward_along_z() {
        let mut ship = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        for _ in 0..60 {
            ship.step(&controls(1.0, 0.0), DT, &ShipTuning::default());
        }

        assert!(ship.position.z > 0.0);
        assert_relative_eq!(ship.position.x, 0.0);
        assert_relative_eq!(ship.velocity.length(), ship.current_speed * 100.0, max_relative = 1e-9);
    }

    #[test]
    fn when_warp_speed_is_raised_then_velocity_scales_by_powers_of_ten() {
        let mut ship = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        ship.current_speed = 0.5;
        let mut warped = ship.clone();
        let boosted = ShipControls {
            warp_speed: 3,
            ..ShipControls::default()
        };

        ship.integrate(&ShipControls::default(), DT, &ShipTuning::default());
        warped.integrate(&boosted, DT, &ShipTuning::default());

        assert_relative_eq!(warped.velocity.length(), ship.velocity.length() * 1_000.0, max_relative = 1e-9);
    }

    #[test]
    fn when_relocated_then_ship_is_at_rest_and_keeps_warp_sequence() {
        let mut ship = ShipState::at(DVec3::ZERO, DQuat::IDENTITY);
        ship.velocity = DVec3::X;
        ship.current_speed = 0.7;
        ship.last_warp_sequence = 4;

        ship.relocate(DVec3::new(5.0, 0.0, 0.0), DQuat::IDENTITY);

        assert_eq!(ship.velocity, DVec3::ZERO);
        assert_eq!(ship.current_speed, 0.0);
        assert_eq!(ship.position, DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(ship.last_warp_sequence, 4);
    }

    #[test]
    fn when_transform_round_trips_then_position_is_kept_in_wire_units() {
        let ship = ShipState::at(DVec3::new(12_000.0, 0.0, -3_000.0), DQuat::IDENTITY);

        let transform = ship.to_transform(DVec3::ONE);
        let back = ShipState::from_transform(&transform);

        assert_relative_eq!(transform.position.x, 12.0);
        assert_relative_eq!(back.position.x, 12_000.0, max_relative = 1e-12);
    }
}
