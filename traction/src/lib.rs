pub mod input;
pub mod output;
pub mod railway;
pub mod sim;

pub mod ffi;

#[cfg(test)]
mod tests;

pub use crate::sim::{SimOptions, Simulation, TrainId};

use crate::input::route::{
    ClaimEnd, Direction, GeomSample, RouteModel, Station, SwitchDef, Track, TrackEvent,
    TrackEventKind,
};
use crate::input::train::{ConfigError, TrainConfig};

pub type AppResult<T> = Result<T, failure::Error>;

/// Built-in demonstration layout: a main line with one facing switch to a
/// branch, two block sections and a halt, plus a two-car train at the
/// start. Used by the CLI, the FFI surface and the scenario tests; real
/// hosts build their `RouteModel` from a route loader instead.
pub fn demonstration_scenario() -> Result<Simulation, ConfigError> {
    let junction = TrackEvent {
        position: 600.0,
        kind: TrackEventKind::Switch { id: 0, claim: Some(ClaimEnd::Front) },
    };
    let main_line = Track {
        length: 2000.0,
        events: vec![
            junction,
            TrackEvent {
                position: 200.0,
                kind: TrackEventKind::SectionLimit { enter: Some(0), exit: None },
            },
            TrackEvent {
                position: 1000.0,
                kind: TrackEventKind::SectionLimit { enter: Some(1), exit: Some(0) },
            },
            TrackEvent {
                position: 1800.0,
                kind: TrackEventKind::SectionLimit { enter: None, exit: Some(1) },
            },
            TrackEvent {
                position: 1200.0,
                kind: TrackEventKind::StationStop { id: 0 },
            },
        ],
        geometry: vec![
            GeomSample { position: 800.0, curvature: 0.0008, cant: 0.08 },
            GeomSample { position: 1600.0, curvature: 0.0, cant: 0.0 },
        ],
    };

    let mut branch = Track::plain(2000.0);
    branch.events.push(junction);

    let model = RouteModel {
        tracks: vec![main_line, branch],
        switches: vec![SwitchDef {
            // Facing for forward moves: trains run onto the toe rail, and
            // the set track matters only for moves off the branch.
            direction: Direction::Reverse,
            toe_rail: 0,
            initial_set_track: 1,
        }],
        section_count: 2,
        stations: vec![Station { name: "Halt".to_string() }],
    };

    let mut sim = Simulation::new(model, SimOptions::default())?;
    sim.add_train(&TrainConfig::default())?;
    Ok(sim)
}
