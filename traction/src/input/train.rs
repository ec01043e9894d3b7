use failure_derive::Fail;

use crate::input::route::TrackId;

pub type Notch = usize;

#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "train has no cars")]
    EmptyTrain,
    #[fail(display = "{}: negative value {}", _0, _1)]
    Negative(&'static str, f64),
    #[fail(display = "{}: rates must satisfy emergency >= service >= charge", _0)]
    RateOrdering(&'static str),
    #[fail(display = "{}: pressure bounds inverted", _0)]
    PressureBounds(&'static str),
    #[fail(display = "handle must have at least one notch")]
    NoNotches,
    #[fail(display = "car {}: axles must lie within the car body", _0)]
    AxlePlacement(usize),
    #[fail(display = "unknown track {}", _0)]
    UnknownTrack(TrackId),
    #[fail(display = "unknown switch {}", _0)]
    UnknownSwitch(usize),
    #[fail(display = "unknown section {}", _0)]
    UnknownSection(usize),
    #[fail(display = "unknown station {}", _0)]
    UnknownStation(usize),
    #[fail(display = "track {}: event at position {} outside track", _0, _1)]
    EventOutsideTrack(TrackId, f64),
}

/// The closed set of brake systems a car can carry. Parsers map the
/// train.dat brake type field onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeSystem {
    ElectricCommand,
    AutomaticAir,
    ElectromagneticStraightAir,
}

/// Air-brake parameters for one car. Pressures in Pa, rates in Pa/s.
/// Immutable once the car is built.
#[derive(Debug, Clone)]
pub struct AirBrakeConfig {
    pub system: BrakeSystem,
    pub main_reservoir_minimum_pressure: f64,
    pub main_reservoir_maximum_pressure: f64,
    pub air_compressor_rate: f64,
    pub main_reservoir_equalizing_reservoir_coefficient: f64,
    pub main_reservoir_brake_pipe_coefficient: f64,
    pub equalizing_reservoir_normal_pressure: f64,
    pub equalizing_reservoir_charge_rate: f64,
    pub equalizing_reservoir_service_rate: f64,
    pub equalizing_reservoir_emergency_rate: f64,
    pub brake_pipe_normal_pressure: f64,
    pub brake_pipe_charge_rate: f64,
    pub brake_pipe_service_rate: f64,
    pub brake_pipe_emergency_rate: f64,
    pub auxiliary_reservoir_maximum_pressure: f64,
    pub auxiliary_reservoir_charge_rate: f64,
    pub auxiliary_reservoir_brake_pipe_coefficient: f64,
    pub auxiliary_reservoir_brake_cylinder_coefficient: f64,
    pub brake_cylinder_service_maximum_pressure: f64,
    pub brake_cylinder_emergency_maximum_pressure: f64,
    pub brake_cylinder_service_charge_rate: f64,
    pub brake_cylinder_emergency_charge_rate: f64,
    pub brake_cylinder_release_rate: f64,
    pub straight_air_pipe_service_rate: f64,
    pub straight_air_pipe_emergency_rate: f64,
    pub straight_air_pipe_release_rate: f64,
    /// Brake cylinder pressure drop below which no release sound is
    /// triggered.
    pub release_sound_threshold: f64,
}

impl Default for AirBrakeConfig {
    fn default() -> AirBrakeConfig {
        AirBrakeConfig {
            system: BrakeSystem::ElectricCommand,
            main_reservoir_minimum_pressure: 690_000.0,
            main_reservoir_maximum_pressure: 780_000.0,
            air_compressor_rate: 5_000.0,
            main_reservoir_equalizing_reservoir_coefficient: 0.01,
            main_reservoir_brake_pipe_coefficient: 0.5,
            equalizing_reservoir_normal_pressure: 490_000.0,
            equalizing_reservoir_charge_rate: 100_000.0,
            equalizing_reservoir_service_rate: 150_000.0,
            equalizing_reservoir_emergency_rate: 250_000.0,
            brake_pipe_normal_pressure: 490_000.0,
            brake_pipe_charge_rate: 300_000.0,
            brake_pipe_service_rate: 1_500_000.0,
            brake_pipe_emergency_rate: 5_000_000.0,
            auxiliary_reservoir_maximum_pressure: 490_000.0,
            auxiliary_reservoir_charge_rate: 200_000.0,
            auxiliary_reservoir_brake_pipe_coefficient: 0.5,
            auxiliary_reservoir_brake_cylinder_coefficient: 1.0,
            brake_cylinder_service_maximum_pressure: 440_000.0,
            brake_cylinder_emergency_maximum_pressure: 440_000.0,
            brake_cylinder_service_charge_rate: 300_000.0,
            brake_cylinder_emergency_charge_rate: 400_000.0,
            brake_cylinder_release_rate: 200_000.0,
            straight_air_pipe_service_rate: 300_000.0,
            straight_air_pipe_emergency_rate: 400_000.0,
            straight_air_pipe_release_rate: 200_000.0,
            release_sound_threshold: 1_000.0,
        }
    }
}

impl AirBrakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("air_compressor_rate", self.air_compressor_rate),
            ("equalizing_reservoir_charge_rate", self.equalizing_reservoir_charge_rate),
            ("equalizing_reservoir_service_rate", self.equalizing_reservoir_service_rate),
            ("equalizing_reservoir_emergency_rate", self.equalizing_reservoir_emergency_rate),
            ("brake_pipe_charge_rate", self.brake_pipe_charge_rate),
            ("brake_pipe_service_rate", self.brake_pipe_service_rate),
            ("brake_pipe_emergency_rate", self.brake_pipe_emergency_rate),
            ("auxiliary_reservoir_charge_rate", self.auxiliary_reservoir_charge_rate),
            ("brake_cylinder_service_charge_rate", self.brake_cylinder_service_charge_rate),
            ("brake_cylinder_emergency_charge_rate", self.brake_cylinder_emergency_charge_rate),
            ("brake_cylinder_release_rate", self.brake_cylinder_release_rate),
            ("straight_air_pipe_service_rate", self.straight_air_pipe_service_rate),
            ("straight_air_pipe_emergency_rate", self.straight_air_pipe_emergency_rate),
            ("straight_air_pipe_release_rate", self.straight_air_pipe_release_rate),
            ("release_sound_threshold", self.release_sound_threshold),
        ];
        for &(name, rate) in rates.iter() {
            if rate < 0.0 {
                return Err(ConfigError::Negative(name, rate));
            }
        }
        let pressures = [
            ("main_reservoir_minimum_pressure", self.main_reservoir_minimum_pressure),
            ("main_reservoir_maximum_pressure", self.main_reservoir_maximum_pressure),
            ("equalizing_reservoir_normal_pressure", self.equalizing_reservoir_normal_pressure),
            ("brake_pipe_normal_pressure", self.brake_pipe_normal_pressure),
            ("auxiliary_reservoir_maximum_pressure", self.auxiliary_reservoir_maximum_pressure),
            ("brake_cylinder_service_maximum_pressure", self.brake_cylinder_service_maximum_pressure),
            ("brake_cylinder_emergency_maximum_pressure", self.brake_cylinder_emergency_maximum_pressure),
        ];
        for &(name, p) in pressures.iter() {
            if p < 0.0 {
                return Err(ConfigError::Negative(name, p));
            }
        }
        if self.main_reservoir_minimum_pressure > self.main_reservoir_maximum_pressure {
            return Err(ConfigError::PressureBounds("main_reservoir"));
        }
        if self.brake_cylinder_service_maximum_pressure > self.brake_cylinder_emergency_maximum_pressure {
            return Err(ConfigError::PressureBounds("brake_cylinder"));
        }
        if self.equalizing_reservoir_emergency_rate < self.equalizing_reservoir_service_rate
            || self.equalizing_reservoir_service_rate < self.equalizing_reservoir_charge_rate
        {
            return Err(ConfigError::RateOrdering("equalizing_reservoir"));
        }
        if self.brake_pipe_emergency_rate < self.brake_pipe_service_rate
            || self.brake_pipe_service_rate < self.brake_pipe_charge_rate
        {
            return Err(ConfigError::RateOrdering("brake_pipe"));
        }
        if self.brake_cylinder_emergency_charge_rate < self.brake_cylinder_service_charge_rate {
            return Err(ConfigError::RateOrdering("brake_cylinder"));
        }
        if self.straight_air_pipe_emergency_rate < self.straight_air_pipe_service_rate {
            return Err(ConfigError::RateOrdering("straight_air_pipe"));
        }
        Ok(())
    }
}

/// Physical and performance parameters for one car.
#[derive(Debug, Clone)]
pub struct CarConfig {
    pub mass: f64,
    pub length: f64,
    /// Axle offsets from the car center; front positive, rear negative.
    pub front_axle_offset: f64,
    pub rear_axle_offset: f64,
    pub center_of_gravity_height: f64,
    pub critical_toppling_angle: f64,
    /// Lateral displacement beyond which the car derails.
    pub derailment_tolerance: f64,
    pub is_motor_car: bool,
    /// Acceleration at full power notch, m/s^2.
    pub maximum_acceleration: f64,
    pub brake_deceleration_at_service_maximum_pressure: f64,
    pub hold_brake_update_interval: f64,
    pub air_brake: AirBrakeConfig,
}

impl Default for CarConfig {
    fn default() -> CarConfig {
        CarConfig {
            mass: 40_000.0,
            length: 20.0,
            front_axle_offset: 8.0,
            rear_axle_offset: -8.0,
            center_of_gravity_height: 1.5,
            critical_toppling_angle: 0.35,
            derailment_tolerance: 0.3,
            is_motor_car: true,
            maximum_acceleration: 1.0,
            brake_deceleration_at_service_maximum_pressure: 1.2,
            hold_brake_update_interval: 0.5,
            air_brake: AirBrakeConfig::default(),
        }
    }
}

impl CarConfig {
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let positive = [
            ("mass", self.mass),
            ("length", self.length),
            ("center_of_gravity_height", self.center_of_gravity_height),
            ("critical_toppling_angle", self.critical_toppling_angle),
            ("derailment_tolerance", self.derailment_tolerance),
            ("maximum_acceleration", self.maximum_acceleration),
            ("brake_deceleration_at_service_maximum_pressure",
             self.brake_deceleration_at_service_maximum_pressure),
            ("hold_brake_update_interval", self.hold_brake_update_interval),
        ];
        for &(name, v) in positive.iter() {
            if v < 0.0 {
                return Err(ConfigError::Negative(name, v));
            }
        }
        let half = 0.5 * self.length;
        if self.front_axle_offset > half || self.rear_axle_offset < -half
            || self.front_axle_offset < self.rear_axle_offset
        {
            return Err(ConfigError::AxlePlacement(index));
        }
        self.air_brake.validate()
    }
}

/// Delay constants applied between a demanded handle value and the value
/// physically acting on the train. Seconds.
#[derive(Debug, Clone, Copy)]
pub struct HandleDelays {
    pub power_start: f64,
    pub power_stop: f64,
    pub brake_start: f64,
    pub brake_end: f64,
    pub service_brake: f64,
    pub emergency_brake: f64,
    pub reverser: f64,
}

impl Default for HandleDelays {
    fn default() -> HandleDelays {
        HandleDelays {
            power_start: 0.0,
            power_stop: 0.0,
            brake_start: 0.0,
            brake_end: 0.0,
            service_brake: 0.0,
            emergency_brake: 0.0,
            reverser: 0.0,
        }
    }
}

impl HandleDelays {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delays = [
            ("power_start", self.power_start),
            ("power_stop", self.power_stop),
            ("brake_start", self.brake_start),
            ("brake_end", self.brake_end),
            ("service_brake", self.service_brake),
            ("emergency_brake", self.emergency_brake),
            ("reverser", self.reverser),
        ];
        for &(name, d) in delays.iter() {
            if d < 0.0 {
                return Err(ConfigError::Negative(name, d));
            }
        }
        Ok(())
    }
}

/// Which stock safety system the train runs under. The safety system
/// itself is an external collaborator writing handle overrides; the mode is
/// carried for its benefit and for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetySystemMode {
    None,
    AtsSn,
    AtsP,
    Atc,
}

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub cars: Vec<CarConfig>,
    pub maximum_power_notch: Notch,
    pub maximum_brake_notch: Notch,
    pub has_hold_brake: bool,
    pub delays: HandleDelays,
    pub safety_system: SafetySystemMode,
    /// Placement of the lead car's front axle at load time.
    pub initial_track: TrackId,
    pub initial_position: f64,
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            cars: vec![CarConfig::default(), CarConfig::default()],
            maximum_power_notch: 5,
            maximum_brake_notch: 8,
            has_hold_brake: false,
            delays: HandleDelays::default(),
            safety_system: SafetySystemMode::None,
            initial_track: 0,
            initial_position: 50.0,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cars.is_empty() {
            return Err(ConfigError::EmptyTrain);
        }
        if self.maximum_power_notch == 0 || self.maximum_brake_notch == 0 {
            return Err(ConfigError::NoNotches);
        }
        for (i, car) in self.cars.iter().enumerate() {
            car.validate(i)?;
        }
        self.delays.validate()
    }
}
