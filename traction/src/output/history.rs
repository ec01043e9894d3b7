use crate::input::route::{SectionId, StationId, SwitchId, TrackId};
use crate::railway::airbrake::AirSound;
use crate::railway::train::DoorState;

/// Events attributed to one train; consumed by sound-cue logic and
/// diagnostic display.
#[derive(Debug, Clone, Copy)]
pub enum TrainLogEvent {
    ReleaseAir(usize, AirSound), // car index
    EmergencyBrake(bool),
    PilotLamp(bool),
    Doors(DoorState),
    Derailed(usize), // car index
    Toppled(usize),  // car index
    StationPassed(StationId),
    SwitchClaimed(SwitchId),
    LeftModel(usize), // car index
}

/// Events on shared route state.
#[derive(Debug, Clone, Copy)]
pub enum InfrastructureLogEvent {
    Occupied(SectionId, bool),
    RunThrough(SwitchId),
    SetTrack(SwitchId, TrackId),
}

/// Timestamped record of everything that happened over a run.
#[derive(Debug, Default)]
pub struct History {
    pub infrastructure: Vec<(f64, InfrastructureLogEvent)>,
    pub trains: Vec<Vec<(f64, TrainLogEvent)>>,
}

/// Write access to the history for the train currently being stepped.
pub struct StepLog<'a> {
    pub now: f64,
    pub infrastructure: &'a mut Vec<(f64, InfrastructureLogEvent)>,
    pub train: &'a mut Vec<(f64, TrainLogEvent)>,
}

impl<'a> StepLog<'a> {
    pub fn inf(&mut self, event: InfrastructureLogEvent) {
        self.infrastructure.push((self.now, event));
    }

    pub fn train_event(&mut self, event: TrainLogEvent) {
        self.train.push((self.now, event));
    }
}
