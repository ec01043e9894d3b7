use super::*;

#[no_mangle]
pub unsafe extern "C" fn traction_demonstration_new() -> *mut Simulation {
    match demonstration_scenario() {
        Ok(sim) => Box::into_raw(Box::new(sim)),
        Err(e) => {
            println!("Error building demonstration scenario: {}", e);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_advance(sim: *mut Simulation, dt: f64) {
    if let Some(sim) = sim.as_mut() {
        sim.advance(dt);
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_time(sim: *const Simulation) -> f64 {
    match sim.as_ref() {
        Some(sim) => sim.time,
        None => 0.0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_speed(sim: *const Simulation, train: usize) -> f64 {
    match sim.as_ref().and_then(|s| s.trains.get(train)) {
        Some(t) => t.speed(),
        None => 0.0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_brake_pipe_pressure(
    sim: *const Simulation,
    train: usize,
    car: usize,
) -> f64 {
    match sim
        .as_ref()
        .and_then(|s| s.trains.get(train))
        .and_then(|t| t.cars.get(car))
    {
        Some(c) => c.air_brake.brake_pipe_pressure,
        None => 0.0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_brake_cylinder_pressure(
    sim: *const Simulation,
    train: usize,
    car: usize,
) -> f64 {
    match sim
        .as_ref()
        .and_then(|s| s.trains.get(train))
        .and_then(|t| t.cars.get(car))
    {
        Some(c) => c.air_brake.brake_cylinder_pressure,
        None => 0.0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn traction_free(sim: *mut Simulation) {
    if !sim.is_null() {
        Box::from_raw(sim);
    }
}
