use std::path::PathBuf;
use structopt::StructOpt;

use traction::railway::handles::ReverserPosition;
use traction::railway::train::DoorState;
use traction::{AppResult, Simulation};

/// Traction -- train physical-state simulation
#[derive(StructOpt, Debug)]
#[structopt(name = "traction")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Simulated duration in seconds
    #[structopt(short = "t", long = "duration", default_value = "180.0")]
    duration: f64,

    /// Simulation time step in seconds
    #[structopt(short = "d", long = "time-step", default_value = "0.1")]
    timestep: f64,

    /// Output JSON history file
    #[structopt(short = "j", long = "json", parse(from_os_str))]
    json: Option<PathBuf>,

    /// Output JSON history as JavaScript
    #[structopt(short = "J", long = "javascript", parse(from_os_str))]
    javascript: Option<PathBuf>,
}

/// The canned driving sequence for the demonstration scenario: pull away,
/// coast through the junction, brake for the halt, work the doors, then
/// test the emergency brake on departure.
fn drive(sim: &mut Simulation, t: f64) {
    let train = sim.train_mut(0);
    if t < 0.5 {
        train.handles.reverser.driver = ReverserPosition::Forward;
        train.handles.brake.driver = 0;
        train.handles.power.driver = 3;
    }
    if t >= 40.0 && t < 70.0 {
        train.handles.power.driver = 0;
    }
    if t >= 70.0 && t < 100.0 {
        train.handles.brake.driver = 8;
    }
    if t >= 100.0 && t < 110.0 && train.speed() == 0.0 {
        train.doors = DoorState::BothOpen;
    }
    if t >= 110.0 {
        train.doors = DoorState::Closed;
        train.handles.brake.driver = 0;
        train.handles.power.driver = 2;
    }
    if t >= 140.0 && !train.handles.emergency.safety {
        train.handles.emergency.apply(t);
    }
}

fn run(opt: &Opt) -> AppResult<()> {
    let mut sim = traction::demonstration_scenario()?;

    if opt.verbose >= 2 {
        println!("Route:");
        for (i, track) in sim.model.tracks.iter().enumerate() {
            println!("  track {}: {:?}", i, track);
        }
        for (i, sw) in sim.model.switches.iter().enumerate() {
            println!("  switch {}: {:?}", i, sw);
        }
    }

    while sim.time < opt.duration {
        let t = sim.time;
        drive(&mut sim, t);
        sim.advance(opt.timestep);
        if opt.verbose >= 1 {
            let train = sim.train(0);
            println!(
                "t={:7.2} v={:6.2} bp={:9.0} bc={:9.0} notch p{}/b{}",
                sim.time,
                train.speed(),
                train.brake_pipe_pressure(),
                train.brake_cylinder_pressure(),
                train.handles.power.actual,
                train.handles.brake.actual,
            );
        }
    }

    println!("# Infrastructure history:");
    for x in &sim.history.infrastructure {
        println!("> {:?}", x);
    }
    for (i, events) in sim.history.trains.iter().enumerate() {
        println!("## Train {}:", i);
        for x in events {
            println!("> {:?}", x);
        }
    }

    if let Some(ref json) = opt.json {
        use std::fs::File;
        use std::io::BufWriter;
        let file = File::create(json)?;
        let mut writer = BufWriter::new(&file);
        traction::output::json::json_history(&sim.history, &mut writer)?;
    }

    if let Some(ref javascript) = opt.javascript {
        use std::fs::File;
        use std::io::BufWriter;
        let file = File::create(javascript)?;
        let mut writer = BufWriter::new(&file);
        traction::output::json::javascript_history(&sim.history, &mut writer)?;
    }

    Ok(())
}

pub fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    match run(&opt) {
        Ok(()) => {}
        Err(e) => {
            println!("Error:\n{}", e);
            std::process::exit(1);
        }
    }
}
