use crate::input::route::{GeomSample, RouteModel, TrackId};
use crate::input::train::{CarConfig, ConfigError};
use crate::output::history::StepLog;
use crate::railway::airbrake::AirBrake;
use crate::railway::dispatch::{advance_follower, AdvanceOutcome, RouteState};
use crate::railway::handles::CarHoldBrake;

pub const GRAVITY: f64 = 9.80665;

// Rigid-roll suspension constants shared by all cars.
const ROLL_STIFFNESS: f64 = 4.0; // 1/s^2
const ROLL_DAMPING: f64 = 1.5; // 1/s

/// Which physical reference point a follower represents. Event dispatch
/// keys its behavior on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    FrontAxle,
    RearAxle,
    CarFront,
    CarRear,
    TrainFront,
    TrainRear,
    Camera,
}

/// A cursor along the route's track geometry.
#[derive(Debug, Clone)]
pub struct TrackFollower {
    pub track_index: TrackId,
    pub track_position: f64,
    pub trigger_type: TriggerType,
    /// Geometry at the current position, refreshed by
    /// `update_world_coordinates`.
    pub geometry: GeomSample,
}

impl TrackFollower {
    pub fn new(track_index: TrackId, track_position: f64, trigger_type: TriggerType) -> TrackFollower {
        TrackFollower {
            track_index,
            track_position,
            trigger_type,
            geometry: GeomSample::default(),
        }
    }

    pub fn update_world_coordinates(&mut self, model: &RouteModel) {
        self.geometry = model.geometry_at(self.track_index, self.track_position);
    }
}

#[derive(Debug, Clone)]
pub struct Axle {
    /// Offset from the car center, positive toward the front.
    pub position: f64,
    pub follower: TrackFollower,
}

#[derive(Debug, Clone)]
pub struct Car {
    pub specs: CarConfig,
    pub air_brake: AirBrake,
    pub hold_brake: CarHoldBrake,
    pub front_axle: Axle,
    pub rear_axle: Axle,
    /// Signed velocity along increasing track position, m/s.
    pub speed: f64,
    pub acceleration: f64,
    pub roll_angle: f64,
    pub roll_velocity: f64,
    pub currently_visible: bool,
    pub derailed: bool,
    pub topples: bool,
}

impl Car {
    /// `center` is the car center's track position at load time.
    pub fn new(
        cfg: CarConfig,
        index: usize,
        track: TrackId,
        center: f64,
    ) -> Result<Car, ConfigError> {
        cfg.validate(index)?;
        let air_brake = AirBrake::new(cfg.air_brake.clone())?;
        let hold_brake = CarHoldBrake::new(cfg.hold_brake_update_interval);
        let front_axle = Axle {
            position: cfg.front_axle_offset,
            follower: TrackFollower::new(track, center + cfg.front_axle_offset, TriggerType::FrontAxle),
        };
        let rear_axle = Axle {
            position: cfg.rear_axle_offset,
            follower: TrackFollower::new(track, center + cfg.rear_axle_offset, TriggerType::RearAxle),
        };
        Ok(Car {
            specs: cfg,
            air_brake,
            hold_brake,
            front_axle,
            rear_axle,
            speed: 0.0,
            acceleration: 0.0,
            roll_angle: 0.0,
            roll_velocity: 0.0,
            currently_visible: true,
            derailed: false,
            topples: false,
        })
    }

    pub fn derail(&mut self) {
        self.derailed = true;
    }

    /// Integrate speed from the tractive acceleration and the brake
    /// deceleration. Brakes oppose motion and never push the car through
    /// zero speed.
    pub fn update_motion(&mut self, dt: f64, traction: f64, hold_output: f64) {
        if dt <= 0.0 {
            return;
        }
        let deceleration = if self.derailed {
            // Sliding on the ballast.
            2.0
        } else {
            self.air_brake.cylinder_fraction()
                * self.specs.brake_deceleration_at_service_maximum_pressure
                + hold_output
        };
        let traction = if self.derailed { 0.0 } else { traction };
        let mut v = self.speed + traction * dt;
        let brake_dv = deceleration * dt;
        if v > 0.0 {
            v = (v - brake_dv).max(0.0);
        } else if v < 0.0 {
            v = (v + brake_dv).min(0.0);
        }
        self.acceleration = (v - self.speed) / dt;
        self.speed = v;
    }

    /// Advance both axle followers, triggering crossed route events.
    pub fn update_position(
        &mut self,
        dt: f64,
        model: &RouteModel,
        state: &mut RouteState,
        log: &mut StepLog,
    ) -> AdvanceOutcome {
        let dx = self.speed * dt;
        let mut out = advance_follower(&mut self.front_axle.follower, dx, model, state, log);
        out.merge(advance_follower(&mut self.rear_axle.follower, dx, model, state, log));
        out
    }

    /// Roll integration from cant and centrifugal acceleration. Returns
    /// (newly derailed, newly toppled).
    pub fn update_toppling(&mut self, dt: f64) -> (bool, bool) {
        if dt <= 0.0 || self.topples {
            // A toppled car stays toppled.
            return (false, false);
        }
        let front = self.front_axle.follower.geometry;
        let rear = self.rear_axle.follower.geometry;
        let curvature = 0.5 * (front.curvature + rear.curvature);
        let cant = 0.5 * (front.cant + rear.cant);
        let unbalanced = self.speed * self.speed * curvature - GRAVITY * cant.sin();
        let cog = self.specs.center_of_gravity_height.max(0.1);
        let roll_accel = unbalanced / cog
            - ROLL_STIFFNESS * self.roll_angle
            - ROLL_DAMPING * self.roll_velocity;
        self.roll_velocity += roll_accel * dt;
        self.roll_angle += self.roll_velocity * dt;

        let mut newly_derailed = false;
        let mut newly_toppled = false;
        let lateral_displacement = cog * self.roll_angle.sin();
        if !self.derailed && lateral_displacement.abs() > self.specs.derailment_tolerance {
            self.derail();
            newly_derailed = true;
        }
        if self.roll_angle.abs() >= self.specs.critical_toppling_angle {
            self.topples = true;
            newly_toppled = true;
            if !self.derailed {
                self.derail();
                newly_derailed = true;
            }
        }
        (newly_derailed, newly_toppled)
    }

    pub fn front_position(&self) -> f64 {
        self.front_axle.follower.track_position - self.front_axle.position + 0.5 * self.specs.length
    }

    pub fn rear_position(&self) -> f64 {
        self.rear_axle.follower.track_position - self.rear_axle.position - 0.5 * self.specs.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::train::CarConfig;

    fn test_car() -> Car {
        Car::new(CarConfig::default(), 0, 0, 100.0).unwrap()
    }

    #[test]
    fn brakes_never_reverse_the_car() {
        let mut car = test_car();
        car.speed = 0.5;
        car.air_brake.brake_cylinder_pressure =
            car.air_brake.config().brake_cylinder_service_maximum_pressure;
        car.update_motion(10.0, 0.0, 0.0);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn toppling_latches() {
        let mut car = test_car();
        car.speed = 40.0;
        // Hard curve, no cant: the unbalanced acceleration rolls the car
        // over.
        car.front_axle.follower.geometry.curvature = 0.02;
        car.rear_axle.follower.geometry.curvature = 0.02;
        let mut toppled = false;
        for _ in 0..200 {
            let (_, t) = car.update_toppling(0.05);
            toppled |= t;
        }
        assert!(toppled);
        assert!(car.topples);
        assert!(car.derailed);
        // Terminal: the flag survives benign geometry.
        car.front_axle.follower.geometry.curvature = 0.0;
        car.rear_axle.follower.geometry.curvature = 0.0;
        car.speed = 0.0;
        for _ in 0..200 {
            car.update_toppling(0.05);
        }
        assert!(car.topples);
    }

    #[test]
    fn derailed_car_produces_no_traction() {
        let mut car = test_car();
        car.speed = 10.0;
        car.derail();
        car.update_motion(1.0, 1.0, 0.0);
        assert!(car.speed < 10.0);
    }
}
