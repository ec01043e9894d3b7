use log::warn;
use smallvec::SmallVec;

use crate::input::route::{
    ClaimEnd, Direction, RouteModel, SectionId, StationId, SwitchId, TrackEventKind, TrackId,
};
use crate::output::history::{InfrastructureLogEvent, StepLog};
use crate::railway::car::{TrackFollower, TriggerType};

/// Movable state of one switch. The definition (facing direction, toe
/// rail) is static route data; this part is written between ticks by
/// external switch control and read by the crossing protocol.
#[derive(Debug, Clone)]
pub struct SwitchState {
    pub currently_set_track: TrackId,
    /// A follower ran through the points against their setting.
    pub run_through: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SectionState {
    /// Number of train ends currently inside; the section shows occupied
    /// while this is nonzero.
    pub occupancy: usize,
}

/// Mutable route state: the switch registry and section occupancy. Owned
/// by the simulation and passed by reference into dispatch; shared by every
/// train in step order.
#[derive(Debug, Clone)]
pub struct RouteState {
    pub switches: Vec<SwitchState>,
    pub sections: Vec<SectionState>,
}

impl RouteState {
    pub fn new(model: &RouteModel) -> RouteState {
        RouteState {
            switches: model
                .switches
                .iter()
                .map(|def| SwitchState {
                    currently_set_track: def.initial_set_track,
                    run_through: false,
                })
                .collect(),
            sections: vec![SectionState::default(); model.section_count],
        }
    }
}

/// What one event crossing asks of the caller. Dispatch never reaches back
/// into the train; derailment policy and switch claims are applied a level
/// up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerOutcome {
    pub switch_conflict: bool,
    pub claim_switch: Option<SwitchId>,
    pub station: Option<StationId>,
}

/// Accumulated outcome of one follower advancement.
#[derive(Debug, Clone, Default)]
pub struct AdvanceOutcome {
    pub switch_conflict: bool,
    pub claim_switch: Option<SwitchId>,
    pub stations: SmallVec<[StationId; 2]>,
    pub left_model: bool,
}

impl AdvanceOutcome {
    pub fn merge(&mut self, other: AdvanceOutcome) {
        self.switch_conflict |= other.switch_conflict;
        if other.claim_switch.is_some() {
            self.claim_switch = other.claim_switch;
        }
        self.stations.extend(other.stations);
        self.left_model |= other.left_model;
    }
}

/// Resolve a single event crossing.
pub fn trigger(
    kind: TrackEventKind,
    direction: Direction,
    follower: &mut TrackFollower,
    model: &RouteModel,
    state: &mut RouteState,
    log: &mut StepLog,
) -> TriggerOutcome {
    let mut out = TriggerOutcome::default();
    match kind {
        TrackEventKind::Switch { id, claim } => match follower.trigger_type {
            TriggerType::FrontAxle
            | TriggerType::RearAxle
            | TriggerType::CarFront
            | TriggerType::CarRear => {
                let def = match model.switches.get(id) {
                    Some(d) => d,
                    None => {
                        warn!("switch event references unknown switch {}", id);
                        return out;
                    }
                };
                let sw = match state.switches.get_mut(id) {
                    Some(s) => s,
                    None => return out,
                };
                if direction == def.direction {
                    // Trailing through the points is always safe and puts
                    // the follower on the set track.
                    follower.track_index = sw.currently_set_track;
                } else {
                    if follower.track_index != sw.currently_set_track
                        && follower.track_index != def.toe_rail
                    {
                        // Neither the set track nor the toe rail: the
                        // switch is against us.
                        out.switch_conflict = true;
                        if !sw.run_through {
                            log.inf(InfrastructureLogEvent::RunThrough(id));
                        }
                        sw.run_through = true;
                        warn!("switch {} run through against the points", id);
                    }
                    follower.track_index = def.toe_rail;
                }
                follower.update_world_coordinates(model);
            }
            TriggerType::TrainFront => {
                if claim == Some(ClaimEnd::Front) {
                    out.claim_switch = Some(id);
                }
            }
            TriggerType::TrainRear => {
                if claim == Some(ClaimEnd::Rear) {
                    out.claim_switch = Some(id);
                }
            }
            TriggerType::Camera => {}
        },
        TrackEventKind::SectionLimit { enter, exit } => match follower.trigger_type {
            TriggerType::FrontAxle => {
                if let Some(s) = enter {
                    occupy(state, s, log);
                }
            }
            TriggerType::RearAxle => {
                if let Some(s) = exit {
                    release(state, s, log);
                }
            }
            _ => {}
        },
        TrackEventKind::StationStop { id } => {
            if follower.trigger_type == TriggerType::TrainFront {
                out.station = Some(id);
            }
        }
    }
    out
}

fn occupy(state: &mut RouteState, section: SectionId, log: &mut StepLog) {
    if let Some(sec) = state.sections.get_mut(section) {
        sec.occupancy += 1;
        if sec.occupancy == 1 {
            log.inf(InfrastructureLogEvent::Occupied(section, true));
        }
    }
}

fn release(state: &mut RouteState, section: SectionId, log: &mut StepLog) {
    if let Some(sec) = state.sections.get_mut(section) {
        if sec.occupancy > 0 {
            sec.occupancy -= 1;
            if sec.occupancy == 0 {
                log.inf(InfrastructureLogEvent::Occupied(section, false));
            }
        }
    }
}

/// Move a follower by `dx`, triggering every event boundary it crosses in
/// order. A switch crossing may change the follower's track; remaining
/// events are then taken from the new track.
pub fn advance_follower(
    follower: &mut TrackFollower,
    dx: f64,
    model: &RouteModel,
    state: &mut RouteState,
    log: &mut StepLog,
) -> AdvanceOutcome {
    let mut out = AdvanceOutcome::default();
    if dx == 0.0 {
        return out;
    }
    let direction = if dx > 0.0 {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    let end = follower.track_position + dx;
    let mut pos = follower.track_position;
    let mut hops = 0;
    loop {
        let next = {
            let track = match model.tracks.get(follower.track_index) {
                Some(t) => t,
                None => break,
            };
            match direction {
                Direction::Forward => track
                    .events
                    .iter()
                    .find(|e| e.position > pos && e.position <= end)
                    .cloned(),
                Direction::Reverse => track
                    .events
                    .iter()
                    .rev()
                    .find(|e| e.position < pos && e.position >= end)
                    .cloned(),
            }
        };
        let ev = match next {
            Some(e) => e,
            None => break,
        };
        let track_before = follower.track_index;
        follower.track_position = ev.position;
        let o = trigger(ev.kind, direction, follower, model, state, log);
        out.switch_conflict |= o.switch_conflict;
        if o.claim_switch.is_some() {
            out.claim_switch = o.claim_switch;
        }
        if let Some(s) = o.station {
            out.stations.push(s);
        }
        pos = ev.position;
        if follower.track_index != track_before {
            hops += 1;
            if hops > 8 {
                warn!("follower crossed more than 8 switches in one step; truncating");
                break;
            }
        }
    }
    follower.track_position = end;
    if let Some(track) = model.tracks.get(follower.track_index) {
        if end < 0.0 || end > track.length {
            out.left_model = true;
        }
    }
    // Recomputed even when nothing changed, so cached geometry follows any
    // track-shape edits made upstream.
    follower.update_world_coordinates(model);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::route::{SwitchDef, Track, TrackEvent};
    use crate::output::history::History;

    fn model_with_switch(direction: Direction) -> RouteModel {
        // The junction event is replicated on every rail meeting at the
        // points, the way the route builder lays them out.
        let junction = TrackEvent {
            position: 500.0,
            kind: TrackEventKind::Switch { id: 0, claim: Some(ClaimEnd::Front) },
        };
        let mut model = RouteModel {
            tracks: (0..3)
                .map(|_| Track {
                    length: 1000.0,
                    events: vec![junction],
                    geometry: vec![],
                })
                .collect(),
            switches: vec![SwitchDef {
                direction,
                toe_rail: 0,
                initial_set_track: 1,
            }],
            section_count: 0,
            stations: vec![],
        };
        model.prepare();
        model
    }

    fn step<'a>(history: &'a mut History) -> StepLog<'a> {
        history.trains.push(Vec::new());
        let train = history.trains.last_mut().unwrap();
        StepLog { now: 0.0, infrastructure: &mut history.infrastructure, train }
    }

    #[test]
    fn trailing_crossing_lands_on_the_set_track() {
        let model = model_with_switch(Direction::Forward);
        let mut state = RouteState::new(&model);
        let mut history = History::default();
        let mut log = step(&mut history);
        // Prior track index is irrelevant for a trailing move.
        let mut follower = TrackFollower::new(2, 490.0, TriggerType::FrontAxle);
        let out = advance_follower(&mut follower, 20.0, &model, &mut state, &mut log);
        assert_eq!(follower.track_index, 1);
        assert!(!out.switch_conflict);
        assert!(!state.switches[0].run_through);
    }

    #[test]
    fn facing_crossing_on_set_track_lands_on_the_toe_rail() {
        let model = model_with_switch(Direction::Reverse);
        let mut state = RouteState::new(&model);
        state.switches[0].currently_set_track = 0;
        let mut history = History::default();
        let mut log = step(&mut history);
        let mut follower = TrackFollower::new(0, 490.0, TriggerType::FrontAxle);
        let out = advance_follower(&mut follower, 20.0, &model, &mut state, &mut log);
        assert_eq!(follower.track_index, 0); // toe rail
        assert!(!out.switch_conflict);
    }

    #[test]
    fn facing_crossing_against_the_points_runs_through() {
        let model = model_with_switch(Direction::Reverse);
        let mut state = RouteState::new(&model);
        // Follower approaches on track 2: neither the set track (1) nor
        // the toe rail (0).
        let mut history = History::default();
        let mut log = step(&mut history);
        let mut follower = TrackFollower::new(2, 490.0, TriggerType::FrontAxle);
        let out = advance_follower(&mut follower, 20.0, &model, &mut state, &mut log);
        assert!(out.switch_conflict);
        assert!(state.switches[0].run_through);
        assert_eq!(follower.track_index, 0); // still continues onto the toe rail
    }

    #[test]
    fn train_front_claims_the_switch() {
        let model = model_with_switch(Direction::Forward);
        let mut state = RouteState::new(&model);
        let mut history = History::default();
        let mut log = step(&mut history);
        let mut follower = TrackFollower::new(0, 490.0, TriggerType::TrainFront);
        let out = advance_follower(&mut follower, 20.0, &model, &mut state, &mut log);
        assert_eq!(out.claim_switch, Some(0));
        // Whole-train triggers do not touch routing.
        assert_eq!(follower.track_index, 0);
    }

    #[test]
    fn section_limits_follow_front_and_rear_axles() {
        let mut model = RouteModel {
            tracks: vec![Track {
                length: 1000.0,
                events: vec![
                    TrackEvent {
                        position: 200.0,
                        kind: TrackEventKind::SectionLimit { enter: Some(0), exit: None },
                    },
                    TrackEvent {
                        position: 800.0,
                        kind: TrackEventKind::SectionLimit { enter: None, exit: Some(0) },
                    },
                ],
                geometry: vec![],
            }],
            switches: vec![],
            section_count: 1,
            stations: vec![],
        };
        model.prepare();
        let mut state = RouteState::new(&model);
        let mut history = History::default();
        let mut log = step(&mut history);

        let mut front = TrackFollower::new(0, 150.0, TriggerType::FrontAxle);
        advance_follower(&mut front, 100.0, &model, &mut state, &mut log);
        assert_eq!(state.sections[0].occupancy, 1);

        let mut rear = TrackFollower::new(0, 750.0, TriggerType::RearAxle);
        advance_follower(&mut rear, 100.0, &model, &mut state, &mut log);
        assert_eq!(state.sections[0].occupancy, 0);
    }
}
