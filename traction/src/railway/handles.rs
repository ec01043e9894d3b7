use crate::input::train::{HandleDelays, Notch};

/// The single pending delayed change of a handle. At most one change is in
/// flight; a newer demand replaces it, so the latest command wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition<T> {
    Idle,
    Pending { target: T, effective: f64 },
}

impl<T: Copy + PartialEq> Transition<T> {
    /// Step 2 of the handle update: reconcile the pending slot with the
    /// demanded value.
    fn demand(&mut self, demanded: T, actual: T, now: f64, delay: f64) {
        if demanded == actual {
            *self = Transition::Idle;
            return;
        }
        match *self {
            Transition::Pending { target, .. } if target == demanded => {}
            _ => {
                *self = Transition::Pending {
                    target: demanded,
                    effective: now + delay,
                };
            }
        }
    }

    /// Step 3: take the pending change once its effective time has come.
    fn poll(&mut self, now: f64) -> Option<T> {
        match *self {
            Transition::Pending { target, effective } if effective <= now => {
                *self = Transition::Idle;
                Some(target)
            }
            _ => None,
        }
    }
}

/// Power handle: the safety system may cap the notch (e.g. an ATC speed
/// restriction), never raise it.
#[derive(Debug, Clone)]
pub struct PowerHandle {
    pub driver: Notch,
    pub safety_ceiling: Option<Notch>,
    pub actual: Notch,
    pub maximum: Notch,
    transition: Transition<Notch>,
    delay_start: f64,
    delay_stop: f64,
}

impl PowerHandle {
    pub fn new(maximum: Notch, delays: &HandleDelays) -> PowerHandle {
        PowerHandle {
            driver: 0,
            safety_ceiling: None,
            actual: 0,
            maximum,
            transition: Transition::Idle,
            delay_start: delays.power_start,
            delay_stop: delays.power_stop,
        }
    }

    pub fn demanded(&self) -> Notch {
        let d = self.driver.min(self.maximum);
        match self.safety_ceiling {
            Some(c) => d.min(c),
            None => d,
        }
    }

    pub fn update(&mut self, now: f64) {
        let demanded = self.demanded();
        let delay = if demanded > self.actual {
            self.delay_start
        } else {
            self.delay_stop
        };
        self.transition.demand(demanded, self.actual, now, delay);
        if let Some(v) = self.transition.poll(now) {
            self.actual = v;
        }
    }
}

/// Brake handle: the safety system may demand a minimum application, never
/// a weaker one.
#[derive(Debug, Clone)]
pub struct BrakeHandle {
    pub driver: Notch,
    pub safety_floor: Option<Notch>,
    pub actual: Notch,
    pub maximum: Notch,
    transition: Transition<Notch>,
    delay_start: f64,
    delay_end: f64,
    delay_service: f64,
}

impl BrakeHandle {
    pub fn new(maximum: Notch, delays: &HandleDelays) -> BrakeHandle {
        BrakeHandle {
            driver: 0,
            safety_floor: None,
            actual: 0,
            maximum,
            transition: Transition::Idle,
            delay_start: delays.brake_start,
            delay_end: delays.brake_end,
            delay_service: delays.service_brake,
        }
    }

    pub fn demanded(&self) -> Notch {
        let d = self.driver.min(self.maximum);
        match self.safety_floor {
            Some(f) => d.max(f.min(self.maximum)),
            None => d,
        }
    }

    pub fn update(&mut self, now: f64) {
        let demanded = self.demanded();
        // First application from released uses the application delay;
        // re-grading between service notches the service delay; any
        // reduction the release delay.
        let delay = if demanded > self.actual {
            if self.actual == 0 {
                self.delay_start
            } else {
                self.delay_service
            }
        } else {
            self.delay_end
        };
        self.transition.demand(demanded, self.actual, now, delay);
        if let Some(v) = self.transition.poll(now) {
            self.actual = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverserPosition {
    Reverse,
    Neutral,
    Forward,
}

impl ReverserPosition {
    pub fn sign(self) -> f64 {
        match self {
            ReverserPosition::Reverse => -1.0,
            ReverserPosition::Neutral => 0.0,
            ReverserPosition::Forward => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverserSafety {
    NoOverride,
    Impose(ReverserPosition),
}

#[derive(Debug, Clone)]
pub struct ReverserHandle {
    pub driver: ReverserPosition,
    pub safety: ReverserSafety,
    pub actual: ReverserPosition,
    transition: Transition<ReverserPosition>,
    delay: f64,
}

impl ReverserHandle {
    pub fn new(delays: &HandleDelays) -> ReverserHandle {
        ReverserHandle {
            driver: ReverserPosition::Neutral,
            safety: ReverserSafety::NoOverride,
            actual: ReverserPosition::Neutral,
            transition: Transition::Idle,
            delay: delays.reverser,
        }
    }

    pub fn demanded(&self) -> ReverserPosition {
        match self.safety {
            ReverserSafety::NoOverride => self.driver,
            ReverserSafety::Impose(p) => p,
        }
    }

    pub fn update(&mut self, now: f64) {
        let demanded = self.demanded();
        self.transition.demand(demanded, self.actual, now, self.delay);
        if let Some(v) = self.transition.poll(now) {
            self.actual = v;
        }
    }
}

/// Emergency brake. Application waits for the stored application time;
/// release is immediate. The asymmetry is how the real equipment behaves
/// and is kept on purpose.
#[derive(Debug, Clone)]
pub struct EmergencyHandle {
    pub driver: bool,
    pub safety: bool,
    pub actual: bool,
    pub application_time: f64,
}

impl EmergencyHandle {
    pub fn new() -> EmergencyHandle {
        EmergencyHandle {
            driver: false,
            safety: false,
            actual: false,
            application_time: f64::INFINITY,
        }
    }

    /// Driver demand: applies at `time` (a past time applies on the next
    /// update).
    pub fn apply(&mut self, time: f64) {
        self.driver = true;
        self.apply_at(time);
    }

    /// Safety-system demand.
    pub fn apply_at(&mut self, time: f64) {
        self.safety = true;
        if time < self.application_time {
            self.application_time = time;
        }
    }

    pub fn release(&mut self) {
        self.driver = false;
        self.safety = false;
    }

    pub fn update(&mut self, now: f64) {
        if self.safety && !self.actual {
            if self.application_time <= now {
                self.actual = true;
                self.application_time = f64::INFINITY;
            }
        } else if !self.safety {
            self.actual = false;
            self.application_time = f64::INFINITY;
        }
    }
}

impl Default for EmergencyHandle {
    fn default() -> EmergencyHandle {
        EmergencyHandle::new()
    }
}

/// Hold brake handle: no lag, the actual state mirrors the driver.
#[derive(Debug, Clone, Default)]
pub struct HoldBrakeHandle {
    pub driver: bool,
    pub actual: bool,
}

impl HoldBrakeHandle {
    pub fn update(&mut self) {
        self.actual = self.driver;
    }
}

/// Per-car hold brake device: re-evaluates its output at a fixed interval,
/// ramping toward whatever deceleration keeps the car stationary.
#[derive(Debug, Clone)]
pub struct CarHoldBrake {
    pub current_acceleration_output: f64,
    next_update_time: f64,
    update_interval: f64,
}

impl CarHoldBrake {
    pub fn new(update_interval: f64) -> CarHoldBrake {
        CarHoldBrake {
            current_acceleration_output: 0.0,
            next_update_time: 0.0,
            update_interval,
        }
    }

    /// Returns the deceleration to apply. `maximum` is the car's service
    /// brake deceleration.
    pub fn update(&mut self, now: f64, speed: f64, maximum: f64) -> f64 {
        if now >= self.next_update_time {
            self.next_update_time = now + self.update_interval;
            if speed.abs() > 0.01 {
                self.current_acceleration_output =
                    (self.current_acceleration_output + 0.1 * maximum).min(maximum);
            } else {
                self.current_acceleration_output *= 0.5;
            }
        }
        self.current_acceleration_output
    }

    pub fn reset(&mut self) {
        self.current_acceleration_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::train::HandleDelays;

    fn delays(v: f64) -> HandleDelays {
        HandleDelays {
            power_start: v,
            power_stop: v,
            brake_start: v,
            brake_end: v,
            service_brake: v,
            emergency_brake: v,
            reverser: v,
        }
    }

    #[test]
    fn zero_delay_applies_on_the_same_tick() {
        let mut reverser = ReverserHandle::new(&delays(0.0));
        reverser.driver = ReverserPosition::Forward;
        reverser.update(12.5);
        assert_eq!(reverser.actual, ReverserPosition::Forward);
    }

    #[test]
    fn delayed_change_applies_at_its_effective_time() {
        let mut power = PowerHandle::new(5, &delays(2.0));
        power.driver = 3;
        power.update(0.0);
        assert_eq!(power.actual, 0);
        power.update(1.9);
        assert_eq!(power.actual, 0);
        power.update(2.0);
        assert_eq!(power.actual, 3);
    }

    #[test]
    fn last_write_wins_within_the_delay_window() {
        let mut power = PowerHandle::new(5, &delays(2.0));
        power.driver = 3;
        power.update(0.0);
        power.driver = 1;
        power.update(1.0);
        // The first command never lands; the second lands at 1.0 + 2.0.
        power.update(2.5);
        assert_eq!(power.actual, 0);
        power.update(3.0);
        assert_eq!(power.actual, 1);
        power.update(10.0);
        assert_eq!(power.actual, 1);
    }

    #[test]
    fn returning_to_actual_cancels_the_pending_change() {
        let mut power = PowerHandle::new(5, &delays(2.0));
        power.driver = 3;
        power.update(0.0);
        power.driver = 0;
        power.update(1.0);
        power.update(5.0);
        assert_eq!(power.actual, 0);
    }

    #[test]
    fn safety_ceiling_caps_power() {
        let mut power = PowerHandle::new(5, &delays(0.0));
        power.driver = 5;
        power.safety_ceiling = Some(2);
        power.update(0.0);
        assert_eq!(power.actual, 2);
    }

    #[test]
    fn safety_floor_raises_brake() {
        let mut brake = BrakeHandle::new(8, &delays(0.0));
        brake.driver = 1;
        brake.safety_floor = Some(6);
        brake.update(0.0);
        assert_eq!(brake.actual, 6);
    }

    #[test]
    fn emergency_applies_at_application_time_and_releases_instantly() {
        let mut eb = EmergencyHandle::new();
        eb.apply_at(5.0);
        eb.update(4.0);
        assert!(!eb.actual);
        eb.update(5.0);
        assert!(eb.actual);
        eb.update(6.0);
        assert!(eb.actual);
        eb.release();
        eb.update(6.0);
        assert!(!eb.actual);
    }

    #[test]
    fn emergency_past_application_time_applies_immediately() {
        let mut eb = EmergencyHandle::new();
        eb.apply(0.0);
        eb.update(100.0);
        assert!(eb.actual);
    }
}
