use log::warn;

use crate::input::route::{RouteModel, SwitchId, TrackId};
use crate::input::train::{ConfigError, TrainConfig};
use crate::output::history::{History, InfrastructureLogEvent, StepLog};
use crate::railway::dispatch::RouteState;
use crate::railway::train::Train;

pub type TrainId = usize;

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Whether a switch set against a facing move derails the train. The
    /// run-through is recorded either way.
    pub derail_on_switch_conflict: bool,
}

impl Default for SimOptions {
    fn default() -> SimOptions {
        SimOptions {
            derail_on_switch_conflict: true,
        }
    }
}

/// The frame-stepped simulation: one route, any number of trains, a
/// single clock. All mutation happens inside `advance`; between calls the
/// host may write handle values, door state and switch settings.
pub struct Simulation {
    pub time: f64,
    pub model: RouteModel,
    pub state: RouteState,
    pub trains: Vec<Train>,
    pub options: SimOptions,
    pub history: History,
}

impl Simulation {
    pub fn new(mut model: RouteModel, options: SimOptions) -> Result<Simulation, ConfigError> {
        model.prepare();
        model.validate()?;
        let state = RouteState::new(&model);
        Ok(Simulation {
            time: 0.0,
            model,
            state,
            trains: Vec::new(),
            options,
            history: History::default(),
        })
    }

    pub fn add_train(&mut self, cfg: &TrainConfig) -> Result<TrainId, ConfigError> {
        let train = Train::new(cfg, &self.model)?;
        self.history.trains.push(Vec::new());
        self.trains.push(train);
        Ok(self.trains.len() - 1)
    }

    /// Advance every train by `dt` seconds. Trains step strictly in
    /// sequence; switches are shared between them.
    pub fn advance(&mut self, dt: f64) {
        if dt < 0.0 {
            warn!("ignoring negative time step {}", dt);
            return;
        }
        self.time += dt;
        let now = self.time;
        for (id, train) in self.trains.iter_mut().enumerate() {
            let mut log = StepLog {
                now,
                infrastructure: &mut self.history.infrastructure,
                train: &mut self.history.trains[id],
            };
            train.update(dt, now, &self.model, &mut self.state, &self.options, &mut log);
        }
    }

    /// External switch control, observed by dispatch at the next tick.
    pub fn set_switch(&mut self, switch: SwitchId, track: TrackId) -> Result<(), ConfigError> {
        if switch >= self.state.switches.len() {
            return Err(ConfigError::UnknownSwitch(switch));
        }
        if track >= self.model.tracks.len() {
            return Err(ConfigError::UnknownTrack(track));
        }
        self.state.switches[switch].currently_set_track = track;
        self.history
            .infrastructure
            .push((self.time, InfrastructureLogEvent::SetTrack(switch, track)));
        Ok(())
    }

    pub fn train(&self, id: TrainId) -> &Train {
        &self.trains[id]
    }

    pub fn train_mut(&mut self, id: TrainId) -> &mut Train {
        &mut self.trains[id]
    }
}
