use failure::Error;
use std::io;

use super::history::{History, InfrastructureLogEvent, TrainLogEvent};

/// Dump the run history as JSON for the timeline viewer.
pub fn json_history<W: io::Write>(history: &History, f: &mut W) -> Result<(), Error> {
    write!(f, "{{ \"infrastructure\": [")?;
    for (i, &(t, ev)) in history.infrastructure.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        infrastructure_event(f, t, ev)?;
    }
    write!(f, "], \"trains\": [")?;
    for (i, events) in history.trains.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "[")?;
        for (j, &(t, ev)) in events.iter().enumerate() {
            if j > 0 {
                write!(f, ", ")?;
            }
            train_event(f, t, ev)?;
        }
        write!(f, "]")?;
    }
    write!(f, "] }}")?;
    Ok(())
}

/// Same history wrapped in a `var data = ...;` assignment for direct
/// inclusion in a viewer page.
pub fn javascript_history<W: io::Write>(history: &History, f: &mut W) -> Result<(), Error> {
    write!(f, "var data = ")?;
    json_history(history, f)?;
    write!(f, ";")?;
    Ok(())
}

fn infrastructure_event<W: io::Write>(
    f: &mut W,
    t: f64,
    ev: InfrastructureLogEvent,
) -> Result<(), Error> {
    let w = |f: &mut W, e: &str, r: usize, v: String| {
        write!(
            f,
            "{{ \"time\": {}, \"event\": \"{}\", \"ref\": {}, \"value\": {} }}",
            t, e, r, v
        )
    };
    match ev {
        InfrastructureLogEvent::Occupied(s, b) => w(f, "occupied", s, format!("{}", b))?,
        InfrastructureLogEvent::RunThrough(sw) => w(f, "runthrough", sw, "true".to_string())?,
        InfrastructureLogEvent::SetTrack(sw, track) => w(f, "settrack", sw, format!("{}", track))?,
    }
    Ok(())
}

fn train_event<W: io::Write>(f: &mut W, t: f64, ev: TrainLogEvent) -> Result<(), Error> {
    let w = |f: &mut W, e: &str, r: usize, v: String| {
        write!(
            f,
            "{{ \"time\": {}, \"event\": \"{}\", \"ref\": {}, \"value\": {} }}",
            t, e, r, v
        )
    };
    match ev {
        TrainLogEvent::ReleaseAir(car, sound) => w(f, "releaseair", car, format!("\"{:?}\"", sound))?,
        TrainLogEvent::EmergencyBrake(b) => w(f, "emergencybrake", 0, format!("{}", b))?,
        TrainLogEvent::PilotLamp(b) => w(f, "pilotlamp", 0, format!("{}", b))?,
        TrainLogEvent::Doors(d) => w(f, "doors", 0, format!("\"{:?}\"", d))?,
        TrainLogEvent::Derailed(car) => w(f, "derailed", car, "true".to_string())?,
        TrainLogEvent::Toppled(car) => w(f, "toppled", car, "true".to_string())?,
        TrainLogEvent::StationPassed(s) => w(f, "station", s, "true".to_string())?,
        TrainLogEvent::SwitchClaimed(sw) => w(f, "switchclaimed", sw, "true".to_string())?,
        TrainLogEvent::LeftModel(car) => w(f, "leftmodel", car, "true".to_string())?,
    }
    Ok(())
}
