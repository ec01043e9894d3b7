use ordered_float::OrderedFloat;

use crate::input::train::ConfigError;

pub type TrackId = usize;
pub type SwitchId = usize;
pub type SectionId = usize;
pub type StationId = usize;

/// Direction of travel along increasing track position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Which end of a passing train claims a switch for route display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEnd {
    Front,
    Rear,
}

/// Plan-view geometry at a point of the track, sampled piecewise from the
/// route builder. Curvature in 1/m, cant in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeomSample {
    pub position: f64,
    pub curvature: f64,
    pub cant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEventKind {
    Switch {
        id: SwitchId,
        claim: Option<ClaimEnd>,
    },
    /// Section boundary: front axles occupy `enter`, rear axles release
    /// `exit`.
    SectionLimit {
        enter: Option<SectionId>,
        exit: Option<SectionId>,
    },
    StationStop {
        id: StationId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackEvent {
    pub position: f64,
    pub kind: TrackEventKind,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub length: f64,
    pub events: Vec<TrackEvent>,
    pub geometry: Vec<GeomSample>,
}

impl Track {
    pub fn plain(length: f64) -> Track {
        Track {
            length,
            events: Vec::new(),
            geometry: Vec::new(),
        }
    }
}

/// Static definition of a switch; the movable state lives in the route
/// state registry.
#[derive(Debug, Clone)]
pub struct SwitchDef {
    /// The direction a follower must travel for the crossing to be a
    /// trailing move through the points.
    pub direction: Direction,
    pub toe_rail: TrackId,
    pub initial_set_track: TrackId,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
}

/// The already-parsed route graph handed over by the route loader.
#[derive(Debug, Clone)]
pub struct RouteModel {
    pub tracks: Vec<Track>,
    pub switches: Vec<SwitchDef>,
    pub section_count: usize,
    pub stations: Vec<Station>,
}

impl RouteModel {
    /// Sort per-track events by position. Loaders emit events in file
    /// order, not track order.
    pub fn prepare(&mut self) {
        for track in self.tracks.iter_mut() {
            track.events.sort_by_key(|e| OrderedFloat(e.position));
            track.geometry.sort_by_key(|g| OrderedFloat(g.position));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, track) in self.tracks.iter().enumerate() {
            if track.length < 0.0 {
                return Err(ConfigError::Negative("track length", track.length));
            }
            for ev in track.events.iter() {
                if ev.position < 0.0 || ev.position > track.length {
                    return Err(ConfigError::EventOutsideTrack(i, ev.position));
                }
                match ev.kind {
                    TrackEventKind::Switch { id, .. } => {
                        let def = self.switches.get(id).ok_or(ConfigError::UnknownSwitch(id))?;
                        if def.toe_rail >= self.tracks.len() {
                            return Err(ConfigError::UnknownTrack(def.toe_rail));
                        }
                        if def.initial_set_track >= self.tracks.len() {
                            return Err(ConfigError::UnknownTrack(def.initial_set_track));
                        }
                    }
                    TrackEventKind::SectionLimit { enter, exit } => {
                        for s in enter.iter().chain(exit.iter()) {
                            if *s >= self.section_count {
                                return Err(ConfigError::UnknownSection(*s));
                            }
                        }
                    }
                    TrackEventKind::StationStop { id } => {
                        if id >= self.stations.len() {
                            return Err(ConfigError::UnknownStation(id));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Geometry at a position: the last sample at or before it, or a
    /// straight flat default where the track carries no samples.
    pub fn geometry_at(&self, track: TrackId, position: f64) -> GeomSample {
        let samples = match self.tracks.get(track) {
            Some(t) => &t.geometry,
            None => return GeomSample::default(),
        };
        let mut current = GeomSample::default();
        for s in samples.iter() {
            if s.position <= position {
                current = *s;
            } else {
                break;
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_lookup_is_piecewise() {
        let mut model = RouteModel {
            tracks: vec![Track {
                length: 100.0,
                events: vec![],
                geometry: vec![
                    GeomSample { position: 50.0, curvature: 0.01, cant: 0.05 },
                    GeomSample { position: 20.0, curvature: 0.002, cant: 0.0 },
                ],
            }],
            switches: vec![],
            section_count: 0,
            stations: vec![],
        };
        model.prepare();
        assert_eq!(model.geometry_at(0, 10.0), GeomSample::default());
        assert_eq!(model.geometry_at(0, 30.0).curvature, 0.002);
        assert_eq!(model.geometry_at(0, 80.0).curvature, 0.01);
    }

    #[test]
    fn validate_rejects_dangling_switch() {
        let mut model = RouteModel {
            tracks: vec![Track {
                length: 100.0,
                events: vec![TrackEvent {
                    position: 10.0,
                    kind: TrackEventKind::Switch { id: 3, claim: None },
                }],
                geometry: vec![],
            }],
            switches: vec![],
            section_count: 0,
            stations: vec![],
        };
        model.prepare();
        assert!(model.validate().is_err());
    }
}
