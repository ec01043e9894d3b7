use crate::input::route::{
    Direction, RouteModel, SwitchDef, Track, TrackEvent, TrackEventKind,
};
use crate::input::train::{ConfigError, TrainConfig};
use crate::railway::handles::ReverserPosition;
use crate::sim::{SimOptions, Simulation};

fn accelerate(sim: &mut Simulation, steps: usize, dt: f64) {
    {
        let train = sim.train_mut(0);
        train.handles.reverser.driver = ReverserPosition::Forward;
        train.handles.power.driver = 3;
        train.handles.brake.driver = 0;
    }
    for _ in 0..steps {
        sim.advance(dt);
    }
}

#[test]
fn train_pulls_away_and_moves() {
    let mut sim = crate::demonstration_scenario().unwrap();
    let start = sim.train(0).cars[0].front_axle.follower.track_position;
    accelerate(&mut sim, 100, 0.25);
    let train = sim.train(0);
    assert!(train.speed() > 1.0);
    assert!(train.cars[0].front_axle.follower.track_position > start);
    // Both cars move together.
    assert_eq!(train.cars[0].speed, train.cars[1].speed);
    assert!(train.specs.total_mass > 0.0);
}

#[test]
fn advance_zero_changes_nothing() {
    let mut sim = crate::demonstration_scenario().unwrap();
    accelerate(&mut sim, 100, 0.25);

    let train = sim.train(0);
    let speed = train.speed();
    let position = train.cars[0].front_axle.follower.track_position;
    let brake_pipe = train.brake_pipe_pressure();
    let cylinder = train.brake_cylinder_pressure();
    let power = train.handles.power.actual;
    let time = sim.time;

    sim.advance(0.0);

    let train = sim.train(0);
    assert_eq!(sim.time, time);
    assert_eq!(train.speed(), speed);
    assert_eq!(train.cars[0].front_axle.follower.track_position, position);
    assert_eq!(train.brake_pipe_pressure(), brake_pipe);
    assert_eq!(train.brake_cylinder_pressure(), cylinder);
    assert_eq!(train.handles.power.actual, power);
}

#[test]
fn emergency_brake_stops_the_train() {
    let mut sim = crate::demonstration_scenario().unwrap();
    accelerate(&mut sim, 100, 0.25);
    assert!(sim.train(0).speed() > 0.0);

    let now = sim.time;
    {
        let train = sim.train_mut(0);
        train.handles.power.driver = 0;
        train.handles.emergency.apply(now);
    }
    for _ in 0..2000 {
        sim.advance(0.25);
        if sim.train(0).speed() == 0.0 {
            break;
        }
    }
    assert_eq!(sim.train(0).speed(), 0.0);
    assert!(sim.history.trains[0].iter().any(|&(_, e)| match e {
        crate::output::history::TrainLogEvent::EmergencyBrake(true) => true,
        _ => false,
    }));
}

#[test]
fn sections_and_station_are_reported_along_the_run() {
    let mut sim = crate::demonstration_scenario().unwrap();
    // Run long enough to pass the halt at 1200 m.
    accelerate(&mut sim, 2400, 0.25);

    let occupied = sim.history.infrastructure.iter().any(|&(_, e)| match e {
        crate::output::history::InfrastructureLogEvent::Occupied(0, true) => true,
        _ => false,
    });
    assert!(occupied);
    let station = sim.history.trains[0].iter().any(|&(_, e)| match e {
        crate::output::history::TrainLogEvent::StationPassed(0) => true,
        _ => false,
    });
    assert!(station);
    // The junction claims the train as its front passes.
    assert_eq!(sim.train(0).switch, Some(0));
}

fn against_the_points() -> RouteModel {
    // A train starting on track 2 meets a switch whose setting (track 1)
    // and toe rail (track 0) both exclude it.
    let junction = TrackEvent {
        position: 100.0,
        kind: TrackEventKind::Switch { id: 0, claim: None },
    };
    RouteModel {
        tracks: (0..3)
            .map(|_| Track {
                length: 1000.0,
                events: vec![junction],
                geometry: vec![],
            })
            .collect(),
        switches: vec![SwitchDef {
            direction: Direction::Reverse,
            toe_rail: 0,
            initial_set_track: 1,
        }],
        section_count: 0,
        stations: vec![],
    }
}

#[test]
fn run_through_derails_when_the_policy_says_so() {
    let mut sim = Simulation::new(against_the_points(), SimOptions::default()).unwrap();
    let cfg = TrainConfig {
        initial_track: 2,
        initial_position: 50.0,
        ..TrainConfig::default()
    };
    sim.add_train(&cfg).unwrap();
    accelerate(&mut sim, 400, 0.25);

    assert!(sim.state.switches[0].run_through);
    assert!(sim.train(0).derailed());
    // The follower still continues onto the toe rail.
    assert_eq!(sim.train(0).cars[0].front_axle.follower.track_index, 0);
}

#[test]
fn run_through_without_derailment_when_disabled() {
    let options = SimOptions { derail_on_switch_conflict: false };
    let mut sim = Simulation::new(against_the_points(), options).unwrap();
    let cfg = TrainConfig {
        initial_track: 2,
        initial_position: 50.0,
        ..TrainConfig::default()
    };
    sim.add_train(&cfg).unwrap();
    accelerate(&mut sim, 400, 0.25);

    assert!(sim.state.switches[0].run_through);
    assert!(!sim.train(0).derailed());
    assert_eq!(sim.train(0).cars[0].front_axle.follower.track_index, 0);
}

#[test]
fn external_switch_writes_are_seen_next_tick() {
    let mut sim = Simulation::new(against_the_points(), SimOptions::default()).unwrap();
    let cfg = TrainConfig {
        initial_track: 2,
        initial_position: 50.0,
        ..TrainConfig::default()
    };
    sim.add_train(&cfg).unwrap();
    // Point the switch at the train's rail between ticks: the crossing is
    // then clean.
    sim.set_switch(0, 2).unwrap();
    accelerate(&mut sim, 400, 0.25);

    assert!(!sim.state.switches[0].run_through);
    assert!(!sim.train(0).derailed());
    assert_eq!(sim.train(0).cars[0].front_axle.follower.track_index, 0);
}

#[test]
fn invalid_configuration_is_rejected_at_construction() {
    let mut sim = crate::demonstration_scenario().unwrap();
    let mut cfg = TrainConfig::default();
    cfg.cars.clear();
    match sim.add_train(&cfg) {
        Err(ConfigError::EmptyTrain) => {}
        other => panic!("expected EmptyTrain, got {:?}", other.map(|_| ())),
    }

    let mut cfg = TrainConfig::default();
    cfg.cars[0].air_brake.brake_pipe_service_rate = -1.0;
    assert!(sim.add_train(&cfg).is_err());
}
