use crate::input::train::{AirBrakeConfig, BrakeSystem, ConfigError, Notch};

/// Move a pressure toward a target at a linear rate, clamping so the step
/// never overshoots the target and never crosses zero.
pub fn charge_or_discharge(
    current: f64,
    target: f64,
    charge_rate: f64,
    discharge_rate: f64,
    dt: f64,
) -> f64 {
    let next = if current < target {
        let p = current + charge_rate * dt;
        if p > target { target } else { p }
    } else {
        let p = current - discharge_rate * dt;
        if p < target { target } else { p }
    };
    if next < 0.0 { 0.0 } else { next }
}

/// Air sound cue selected when the brake cylinder releases pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirSound {
    Zero,
    Normal,
    High,
}

/// What the brake model needs to know about the handles this tick.
#[derive(Debug, Clone, Copy)]
pub struct BrakeDemand {
    pub notch: Notch,
    pub maximum_notch: Notch,
    pub emergency: bool,
}

impl BrakeDemand {
    pub fn service_fraction(&self) -> f64 {
        if self.maximum_notch == 0 {
            0.0
        } else {
            self.notch as f64 / self.maximum_notch as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    pub enabled: bool,
    pub minimum_pressure: f64,
    pub maximum_pressure: f64,
    pub rate: f64,
}

impl Compressor {
    /// Hysteresis: run until the maximum threshold, stay off until the
    /// pressure falls under the minimum threshold.
    pub fn update(&mut self, dt: f64, main_reservoir: &mut f64) {
        if self.enabled {
            *main_reservoir += self.rate * dt;
            if *main_reservoir >= self.maximum_pressure {
                *main_reservoir = self.maximum_pressure;
                self.enabled = false;
            }
        } else if *main_reservoir < self.minimum_pressure {
            self.enabled = true;
        }
    }
}

/// Per-car pneumatic state. Rate and threshold constants are fixed at
/// construction; only the pressures evolve.
#[derive(Debug, Clone)]
pub struct AirBrake {
    pub system: BrakeSystem,
    pub compressor: Compressor,
    pub main_reservoir_pressure: f64,
    pub equalizing_reservoir_pressure: f64,
    pub brake_pipe_pressure: f64,
    pub auxiliary_reservoir_pressure: f64,
    pub brake_cylinder_pressure: f64,
    pub straight_air_pipe_pressure: f64,
    sound_played_for_pressure: f64,
    cfg: AirBrakeConfig,
}

impl AirBrake {
    /// Build a charged brake (running-ready state: pipes at normal
    /// pressure, cylinder empty).
    pub fn new(cfg: AirBrakeConfig) -> Result<AirBrake, ConfigError> {
        cfg.validate()?;
        Ok(AirBrake {
            system: cfg.system,
            compressor: Compressor {
                enabled: false,
                minimum_pressure: cfg.main_reservoir_minimum_pressure,
                maximum_pressure: cfg.main_reservoir_maximum_pressure,
                rate: cfg.air_compressor_rate,
            },
            main_reservoir_pressure: cfg.main_reservoir_maximum_pressure,
            equalizing_reservoir_pressure: cfg.equalizing_reservoir_normal_pressure,
            brake_pipe_pressure: cfg.brake_pipe_normal_pressure,
            auxiliary_reservoir_pressure: cfg.auxiliary_reservoir_maximum_pressure,
            brake_cylinder_pressure: 0.0,
            straight_air_pipe_pressure: 0.0,
            sound_played_for_pressure: 0.0,
            cfg,
        })
    }

    pub fn config(&self) -> &AirBrakeConfig {
        &self.cfg
    }

    /// Brake cylinder fill as a fraction of the service maximum. May exceed
    /// one under emergency application.
    pub fn cylinder_fraction(&self) -> f64 {
        if self.cfg.brake_cylinder_service_maximum_pressure <= 0.0 {
            0.0
        } else {
            self.brake_cylinder_pressure / self.cfg.brake_cylinder_service_maximum_pressure
        }
    }

    /// Advance all reservoirs by `dt`. Returns the air sound cue to play,
    /// if the cylinder released enough pressure this step.
    pub fn update(&mut self, dt: f64, demand: &BrakeDemand) -> Option<AirSound> {
        if dt <= 0.0 {
            return None;
        }
        self.compressor.update(dt, &mut self.main_reservoir_pressure);
        match self.system {
            BrakeSystem::AutomaticAir => self.update_automatic_air(dt, demand),
            BrakeSystem::ElectricCommand => self.update_electric_command(dt, demand),
            BrakeSystem::ElectromagneticStraightAir => self.update_straight_air(dt, demand),
        }
        self.charge_auxiliary_reservoir(dt);
        self.release_sound(demand)
    }

    /// Classic automatic air brake: the handle commands the equalizing
    /// reservoir, the brake pipe chases it, and the triple valve trades
    /// auxiliary-reservoir air into the cylinder on pipe pressure drops.
    fn update_automatic_air(&mut self, dt: f64, demand: &BrakeDemand) {
        // Equalizing reservoir follows the handle. Notches lap the
        // reservoir at proportional reductions of the normal pressure.
        let er_target = if demand.emergency {
            0.0
        } else {
            self.cfg.equalizing_reservoir_normal_pressure * (1.0 - demand.service_fraction())
        };
        if er_target < self.equalizing_reservoir_pressure {
            let rate = if demand.emergency {
                self.cfg.equalizing_reservoir_emergency_rate
            } else {
                self.cfg.equalizing_reservoir_service_rate
            };
            self.equalizing_reservoir_pressure =
                charge_or_discharge(self.equalizing_reservoir_pressure, er_target, 0.0, rate, dt);
        } else {
            // Recharge is fed from the main reservoir.
            let before = self.equalizing_reservoir_pressure;
            let mut after = charge_or_discharge(
                before,
                er_target,
                self.cfg.equalizing_reservoir_charge_rate,
                0.0,
                dt,
            );
            let coefficient = self.cfg.main_reservoir_equalizing_reservoir_coefficient;
            let available = if coefficient > 0.0 {
                self.main_reservoir_pressure / coefficient
            } else {
                f64::INFINITY
            };
            if after - before > available {
                after = before + available;
            }
            self.main_reservoir_pressure =
                (self.main_reservoir_pressure - (after - before) * coefficient).max(0.0);
            self.equalizing_reservoir_pressure = after;
        }

        // Brake pipe chases the equalizing reservoir.
        self.approach_brake_pipe(dt, self.equalizing_reservoir_pressure, demand.emergency);

        // Triple valve: auxiliary air flows into the cylinder while the
        // pipe is below the auxiliary pressure, and the valve laps once the
        // auxiliary has fallen to the pipe. Cylinder pressure therefore
        // tracks the pipe reduction.
        if self.brake_pipe_pressure + 1.0 < self.auxiliary_reservoir_pressure {
            let (rate, limit) = if demand.emergency {
                (
                    self.cfg.brake_cylinder_emergency_charge_rate,
                    self.cfg.brake_cylinder_emergency_maximum_pressure,
                )
            } else {
                (
                    self.cfg.brake_cylinder_service_charge_rate,
                    self.cfg.brake_cylinder_service_maximum_pressure,
                )
            };
            let coefficient = self.cfg.auxiliary_reservoir_brake_cylinder_coefficient.max(0.01);
            let d = (rate * dt)
                .min(limit - self.brake_cylinder_pressure)
                .min((self.auxiliary_reservoir_pressure - self.brake_pipe_pressure) / coefficient);
            if d > 0.0 {
                self.brake_cylinder_pressure += d;
                self.auxiliary_reservoir_pressure =
                    (self.auxiliary_reservoir_pressure - d * coefficient).max(0.0);
            }
        } else if self.brake_pipe_pressure + 1.0 >= self.cfg.brake_pipe_normal_pressure {
            // Release: pipe back at normal pressure vents the cylinder.
            self.brake_cylinder_pressure = charge_or_discharge(
                self.brake_cylinder_pressure,
                0.0,
                0.0,
                self.cfg.brake_cylinder_release_rate,
                dt,
            );
        }
        // In between the valve laps and the cylinder holds.
    }

    /// Electric command brake: the cylinder is commanded directly from the
    /// notch; the brake pipe is held at normal pressure for the gauges.
    fn update_electric_command(&mut self, dt: f64, demand: &BrakeDemand) {
        self.approach_brake_pipe(dt, self.cfg.brake_pipe_normal_pressure, false);

        let (target, rate) = if demand.emergency {
            (
                self.cfg.brake_cylinder_emergency_maximum_pressure,
                self.cfg.brake_cylinder_emergency_charge_rate,
            )
        } else {
            (
                self.cfg.brake_cylinder_service_maximum_pressure * demand.service_fraction(),
                self.cfg.brake_cylinder_service_charge_rate,
            )
        };
        self.fill_cylinder_from_auxiliary(dt, target, rate);
    }

    /// Electromagnetic straight air brake: the straight air pipe is
    /// commanded from the notch and the cylinder follows the pipe.
    fn update_straight_air(&mut self, dt: f64, demand: &BrakeDemand) {
        self.approach_brake_pipe(dt, self.cfg.brake_pipe_normal_pressure, false);

        let (target, apply_rate) = if demand.emergency {
            (
                self.cfg.brake_cylinder_emergency_maximum_pressure,
                self.cfg.straight_air_pipe_emergency_rate,
            )
        } else {
            (
                self.cfg.brake_cylinder_service_maximum_pressure * demand.service_fraction(),
                self.cfg.straight_air_pipe_service_rate,
            )
        };
        self.straight_air_pipe_pressure = charge_or_discharge(
            self.straight_air_pipe_pressure,
            target,
            apply_rate,
            self.cfg.straight_air_pipe_release_rate,
            dt,
        );
        let rate = if demand.emergency {
            self.cfg.brake_cylinder_emergency_charge_rate
        } else {
            self.cfg.brake_cylinder_service_charge_rate
        };
        self.fill_cylinder_from_auxiliary(dt, self.straight_air_pipe_pressure, rate);
    }

    /// Move the brake pipe toward `target`, charging from the main
    /// reservoir and discharging to atmosphere.
    fn approach_brake_pipe(&mut self, dt: f64, target: f64, emergency: bool) {
        let cfg = &self.cfg;
        if self.brake_pipe_pressure > target {
            let rate = if emergency {
                cfg.brake_pipe_emergency_rate
            } else {
                cfg.brake_pipe_service_rate
            };
            self.brake_pipe_pressure =
                charge_or_discharge(self.brake_pipe_pressure, target, 0.0, rate, dt);
        } else if self.brake_pipe_pressure < target {
            let before = self.brake_pipe_pressure;
            let mut after =
                charge_or_discharge(before, target, cfg.brake_pipe_charge_rate, 0.0, dt);
            let coefficient = cfg.main_reservoir_brake_pipe_coefficient;
            let available = if coefficient > 0.0 {
                self.main_reservoir_pressure / coefficient
            } else {
                f64::INFINITY
            };
            if after - before > available {
                after = before + available;
            }
            self.main_reservoir_pressure =
                (self.main_reservoir_pressure - (after - before) * coefficient).max(0.0);
            self.brake_pipe_pressure = after;
        }
    }

    /// Charge the cylinder toward `target` with auxiliary-reservoir air,
    /// or vent it at the release rate when over target.
    fn fill_cylinder_from_auxiliary(&mut self, dt: f64, target: f64, rate: f64) {
        let cfg = &self.cfg;
        if self.brake_cylinder_pressure < target {
            let coefficient = cfg.auxiliary_reservoir_brake_cylinder_coefficient.max(0.0);
            let mut d = (rate * dt).min(target - self.brake_cylinder_pressure);
            if coefficient > 0.0 {
                d = d.min(self.auxiliary_reservoir_pressure / coefficient);
            }
            if d > 0.0 {
                self.brake_cylinder_pressure += d;
                self.auxiliary_reservoir_pressure =
                    (self.auxiliary_reservoir_pressure - d * coefficient).max(0.0);
            }
        } else if self.brake_cylinder_pressure > target {
            self.brake_cylinder_pressure = charge_or_discharge(
                self.brake_cylinder_pressure,
                target,
                0.0,
                cfg.brake_cylinder_release_rate,
                dt,
            );
        }
    }

    /// Auxiliary reservoir recharges from the brake pipe whenever the pipe
    /// carries the higher pressure.
    fn charge_auxiliary_reservoir(&mut self, dt: f64) {
        let cfg = &self.cfg;
        if self.brake_pipe_pressure > self.auxiliary_reservoir_pressure
            && self.auxiliary_reservoir_pressure < cfg.auxiliary_reservoir_maximum_pressure
        {
            let before = self.auxiliary_reservoir_pressure;
            let limit = cfg
                .auxiliary_reservoir_maximum_pressure
                .min(self.brake_pipe_pressure);
            let after = charge_or_discharge(
                before,
                limit,
                cfg.auxiliary_reservoir_charge_rate,
                0.0,
                dt,
            );
            let coefficient = cfg.auxiliary_reservoir_brake_pipe_coefficient.max(0.0);
            self.auxiliary_reservoir_pressure = after;
            self.brake_pipe_pressure =
                (self.brake_pipe_pressure - (after - before) * coefficient).max(0.0);
        }
    }

    /// Release sound bookkeeping: a drop larger than the configured
    /// threshold below the last played pressure emits a cue; drops smaller
    /// than the threshold stay silent.
    fn release_sound(&mut self, _demand: &BrakeDemand) -> Option<AirSound> {
        let bc = self.brake_cylinder_pressure;
        if bc > self.sound_played_for_pressure {
            self.sound_played_for_pressure = bc;
            None
        } else if self.sound_played_for_pressure - bc > self.cfg.release_sound_threshold {
            let sound = if bc <= self.cfg.release_sound_threshold {
                AirSound::Zero
            } else if self.sound_played_for_pressure - bc
                > 0.5 * self.cfg.brake_cylinder_service_maximum_pressure
            {
                AirSound::High
            } else {
                AirSound::Normal
            };
            self.sound_played_for_pressure = bc;
            Some(sound)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::train::AirBrakeConfig;

    #[test]
    fn charge_is_linear_and_clamps_at_target() {
        // 0 bar toward 5 bar at 1 bar/s.
        let p = charge_or_discharge(0.0, 500_000.0, 100_000.0, 0.0, 2.0);
        assert_eq!(p, 200_000.0);
        let p = charge_or_discharge(p, 500_000.0, 100_000.0, 0.0, 10.0);
        assert_eq!(p, 500_000.0);
    }

    #[test]
    fn discharge_never_crosses_zero() {
        let p = charge_or_discharge(30_000.0, 0.0, 0.0, 100_000.0, 4.0);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn compressor_hysteresis() {
        let mut compressor = Compressor {
            enabled: true,
            minimum_pressure: 690_000.0,
            maximum_pressure: 780_000.0,
            rate: 10_000.0,
        };
        let mut main = 779_000.0;
        compressor.update(1.0, &mut main);
        assert_eq!(main, 780_000.0);
        assert!(!compressor.enabled);
        // Stays off above the minimum threshold.
        main = 700_000.0;
        compressor.update(1.0, &mut main);
        assert!(!compressor.enabled);
        assert_eq!(main, 700_000.0);
        // Restarts below it.
        main = 689_000.0;
        compressor.update(1.0, &mut main);
        assert!(compressor.enabled);
    }

    #[test]
    fn emergency_fills_cylinder_and_release_vents_it() {
        let cfg = AirBrakeConfig {
            system: BrakeSystem::AutomaticAir,
            ..AirBrakeConfig::default()
        };
        let mut brake = AirBrake::new(cfg).unwrap();
        let emergency = BrakeDemand { notch: 0, maximum_notch: 8, emergency: true };
        for _ in 0..600 {
            brake.update(0.1, &emergency);
        }
        assert!(brake.brake_cylinder_pressure > 0.9 * brake.cfg.brake_cylinder_service_maximum_pressure);
        assert!(brake.brake_pipe_pressure < 10_000.0);

        let released = BrakeDemand { notch: 0, maximum_notch: 8, emergency: false };
        let mut sounds = Vec::new();
        for _ in 0..1200 {
            if let Some(s) = brake.update(0.1, &released) {
                sounds.push(s);
            }
        }
        assert!(brake.brake_cylinder_pressure < 1_000.0);
        assert!(!sounds.is_empty());
        assert_eq!(*sounds.last().unwrap(), AirSound::Zero);
    }

    #[test]
    fn pressures_stay_bounded() {
        let mut brake = AirBrake::new(AirBrakeConfig::default()).unwrap();
        let full = BrakeDemand { notch: 8, maximum_notch: 8, emergency: false };
        let none = BrakeDemand { notch: 0, maximum_notch: 8, emergency: false };
        for i in 0..2000 {
            let demand = if i % 40 < 20 { &full } else { &none };
            brake.update(0.25, demand);
            assert!(brake.brake_cylinder_pressure >= 0.0);
            assert!(brake.brake_cylinder_pressure
                <= brake.cfg.brake_cylinder_emergency_maximum_pressure + 1e-9);
            assert!(brake.brake_pipe_pressure >= 0.0);
            assert!(brake.main_reservoir_pressure <= brake.cfg.main_reservoir_maximum_pressure + 1e-9);
            assert!(brake.auxiliary_reservoir_pressure >= 0.0);
            assert!(brake.auxiliary_reservoir_pressure
                <= brake.cfg.auxiliary_reservoir_maximum_pressure + 1e-9);
        }
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let mut brake = AirBrake::new(AirBrakeConfig::default()).unwrap();
        let demand = BrakeDemand { notch: 4, maximum_notch: 8, emergency: false };
        brake.update(1.0, &demand);
        let snapshot = brake.clone();
        brake.update(0.0, &demand);
        assert_eq!(brake.brake_cylinder_pressure, snapshot.brake_cylinder_pressure);
        assert_eq!(brake.brake_pipe_pressure, snapshot.brake_pipe_pressure);
        assert_eq!(brake.equalizing_reservoir_pressure, snapshot.equalizing_reservoir_pressure);
    }
}
