use log::debug;

use crate::input::route::{RouteModel, SwitchId};
use crate::input::train::{ConfigError, HandleDelays, SafetySystemMode, TrainConfig};
use crate::output::history::{StepLog, TrainLogEvent};
use crate::railway::airbrake::BrakeDemand;
use crate::railway::car::{Car, TrackFollower, TriggerType};
use crate::railway::dispatch::{advance_follower, RouteState};
use crate::railway::handles::{
    BrakeHandle, EmergencyHandle, HoldBrakeHandle, PowerHandle, ReverserHandle,
};
use crate::sim::SimOptions;

// Time constant for the jerk average, seconds.
const JERK_SMOOTHING: f64 = 0.5;

/// Door state of the whole train, written by the door collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Closed,
    LeftOpen,
    RightOpen,
    BothOpen,
}

/// Watches door-state transitions and drives the pilot lamp; the lamp
/// lighting and darkening are the sound cues downstream audio reacts to.
#[derive(Debug, Clone)]
pub struct PilotLamp {
    old_state: DoorState,
    pub lit: bool,
}

impl PilotLamp {
    pub fn new() -> PilotLamp {
        PilotLamp {
            old_state: DoorState::Closed,
            lit: true,
        }
    }

    pub fn update(&mut self, new_state: DoorState, log: &mut StepLog) {
        if self.old_state != DoorState::Closed && new_state == DoorState::Closed {
            self.lit = true;
            log.train_event(TrainLogEvent::PilotLamp(true));
        } else if self.old_state == DoorState::Closed && new_state != DoorState::Closed {
            self.lit = false;
            log.train_event(TrainLogEvent::PilotLamp(false));
        }
        if self.old_state != new_state {
            log.train_event(TrainLogEvent::Doors(new_state));
        }
        self.old_state = new_state;
    }
}

/// The five handle machines of one train.
#[derive(Debug, Clone)]
pub struct TrainHandles {
    pub power: PowerHandle,
    pub brake: BrakeHandle,
    pub reverser: ReverserHandle,
    pub emergency: EmergencyHandle,
    pub hold_brake: HoldBrakeHandle,
}

impl TrainHandles {
    pub fn new(cfg: &TrainConfig) -> TrainHandles {
        TrainHandles {
            power: PowerHandle::new(cfg.maximum_power_notch, &cfg.delays),
            brake: BrakeHandle::new(cfg.maximum_brake_notch, &cfg.delays),
            reverser: ReverserHandle::new(&cfg.delays),
            emergency: EmergencyHandle::new(),
            hold_brake: HoldBrakeHandle::default(),
        }
    }

    pub fn update(&mut self, now: f64) {
        self.power.update(now);
        self.brake.update(now);
        self.reverser.update(now);
        self.emergency.update(now);
        self.hold_brake.update();
    }
}

/// Train-level quantities; total mass is fixed at load, the averages are
/// recomputed every step.
#[derive(Debug, Clone)]
pub struct TrainSpecs {
    pub total_mass: f64,
    pub current_average_acceleration: f64,
    pub current_average_jerk: f64,
    pub safety_system: SafetySystemMode,
    pub delays: HandleDelays,
}

#[derive(Debug)]
pub struct Train {
    pub cars: Vec<Car>,
    pub handles: TrainHandles,
    pub specs: TrainSpecs,
    pub doors: DoorState,
    pub pilot_lamp: PilotLamp,
    pub front_follower: TrackFollower,
    pub rear_follower: TrackFollower,
    /// The switch that last routed this train, claimed during triggering.
    pub switch: Option<SwitchId>,
    emergency_was_applied: bool,
}

impl Train {
    pub fn new(cfg: &TrainConfig, model: &RouteModel) -> Result<Train, ConfigError> {
        cfg.validate()?;
        if cfg.initial_track >= model.tracks.len() {
            return Err(ConfigError::UnknownTrack(cfg.initial_track));
        }

        // Cars are placed nose to tail behind the lead car's front axle.
        let mut cars = Vec::with_capacity(cfg.cars.len());
        let mut center = cfg.initial_position - cfg.cars[0].front_axle_offset;
        for (i, car_cfg) in cfg.cars.iter().enumerate() {
            if i > 0 {
                center -= 0.5 * (cfg.cars[i - 1].length + car_cfg.length);
            }
            let mut car = Car::new(car_cfg.clone(), i, cfg.initial_track, center)?;
            car.front_axle.follower.update_world_coordinates(model);
            car.rear_axle.follower.update_world_coordinates(model);
            cars.push(car);
        }

        let total_mass = cars.iter().map(|c| c.specs.mass).sum();
        let front = cars[0].front_position();
        let rear = cars.last().unwrap().rear_position();
        Ok(Train {
            handles: TrainHandles::new(cfg),
            specs: TrainSpecs {
                total_mass,
                current_average_acceleration: 0.0,
                current_average_jerk: 0.0,
                safety_system: cfg.safety_system,
                delays: cfg.delays,
            },
            doors: DoorState::Closed,
            pilot_lamp: PilotLamp::new(),
            front_follower: TrackFollower::new(cfg.initial_track, front, TriggerType::TrainFront),
            rear_follower: TrackFollower::new(cfg.initial_track, rear, TriggerType::TrainRear),
            switch: None,
            emergency_was_applied: false,
            cars,
        })
    }

    /// One simulation step for this train. Handles update first so the
    /// brake model reads this tick's actual values; the brake model before
    /// motion; motion and triggering before the aggregates.
    pub fn update(
        &mut self,
        dt: f64,
        now: f64,
        model: &RouteModel,
        state: &mut RouteState,
        options: &SimOptions,
        log: &mut StepLog,
    ) {
        self.handles.update(now);
        if self.handles.emergency.actual != self.emergency_was_applied {
            self.emergency_was_applied = self.handles.emergency.actual;
            log.train_event(TrainLogEvent::EmergencyBrake(self.emergency_was_applied));
        }

        let reverser_sign = self.handles.reverser.actual.sign();
        let power_fraction = if self.handles.power.maximum == 0 {
            0.0
        } else {
            self.handles.power.actual as f64 / self.handles.power.maximum as f64
        };
        let demand = BrakeDemand {
            notch: self.handles.brake.actual,
            maximum_notch: self.handles.brake.maximum,
            emergency: self.handles.emergency.actual,
        };
        let hold_active = self.handles.hold_brake.actual;

        let mut acceleration_sum = 0.0;
        for (i, car) in self.cars.iter_mut().enumerate() {
            if let Some(sound) = car.air_brake.update(dt, &demand) {
                log.train_event(TrainLogEvent::ReleaseAir(i, sound));
            }
            let hold_output = if hold_active {
                car.hold_brake.update(
                    now,
                    car.speed,
                    car.specs.brake_deceleration_at_service_maximum_pressure,
                )
            } else {
                car.hold_brake.reset();
                0.0
            };
            let traction = if car.specs.is_motor_car {
                reverser_sign * power_fraction * car.specs.maximum_acceleration
            } else {
                0.0
            };
            car.update_motion(dt, traction, hold_output);

            let out = car.update_position(dt, model, state, log);
            if out.left_model && car.currently_visible {
                car.currently_visible = false;
                log.train_event(TrainLogEvent::LeftModel(i));
            }
            if out.switch_conflict && options.derail_on_switch_conflict && !car.derailed {
                car.derail();
                log.train_event(TrainLogEvent::Derailed(i));
            }
            let (newly_derailed, newly_toppled) = car.update_toppling(dt);
            if newly_derailed {
                log.train_event(TrainLogEvent::Derailed(i));
            }
            if newly_toppled {
                log.train_event(TrainLogEvent::Toppled(i));
            }
            acceleration_sum += car.acceleration;
        }

        // Whole-train followers move with their end cars and claim
        // switches for this train.
        let front_dx = self.cars[0].speed * dt;
        let rear_dx = self.cars.last().map(|c| c.speed).unwrap_or(0.0) * dt;
        let front_out = advance_follower(&mut self.front_follower, front_dx, model, state, log);
        let rear_out = advance_follower(&mut self.rear_follower, rear_dx, model, state, log);
        for out in [front_out, rear_out].iter() {
            if let Some(sw) = out.claim_switch {
                debug!("switch {} claimed", sw);
                self.switch = Some(sw);
                log.train_event(TrainLogEvent::SwitchClaimed(sw));
            }
            for s in out.stations.iter() {
                log.train_event(TrainLogEvent::StationPassed(*s));
            }
        }

        let average = acceleration_sum / self.cars.len() as f64;
        if dt > 0.0 {
            let raw = (average - self.specs.current_average_acceleration) / dt;
            let alpha = dt / (dt + JERK_SMOOTHING);
            self.specs.current_average_jerk += alpha * (raw - self.specs.current_average_jerk);
        }
        self.specs.current_average_acceleration = average;

        self.pilot_lamp.update(self.doors, log);
    }

    /// Gauge accessors read by rendering and audio.
    pub fn brake_pipe_pressure(&self) -> f64 {
        self.cars[0].air_brake.brake_pipe_pressure
    }

    pub fn brake_cylinder_pressure(&self) -> f64 {
        self.cars[0].air_brake.brake_cylinder_pressure
    }

    pub fn main_reservoir_pressure(&self) -> f64 {
        self.cars[0].air_brake.main_reservoir_pressure
    }

    pub fn speed(&self) -> f64 {
        self.cars[0].speed
    }

    pub fn derailed(&self) -> bool {
        self.cars.iter().any(|c| c.derailed)
    }
}
