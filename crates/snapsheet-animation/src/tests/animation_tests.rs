use super::*;

use crate::settle::SettleAnimation;
use snapsheet_core::{DefaultScheduler, Runtime};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

const FRAME_NANOS: u64 = 16_666_667; // ~60 FPS

#[test]
fn spring_spec_default_is_critically_damped() {
    let spec = SpringSpec::default();
    assert_eq!(spec.damping_ratio, 1.0);
    assert_eq!(spec.mass, 1.0);
}

#[test]
fn spring_spec_bouncy_has_low_damping() {
    let spec = SpringSpec::bouncy();
    assert_eq!(spec.damping_ratio, 0.5);
    assert!(
        spec.damping_ratio < 1.0,
        "Bouncy spring should be under-damped"
    );
}

#[test]
fn spring_spec_stiff_has_high_stiffness() {
    let spec = SpringSpec::stiff();
    assert_eq!(spec.stiffness, 3000.0);
    assert!(spec.stiffness > SpringSpec::default().stiffness);
}

#[test]
fn damping_coefficient_follows_ratio() {
    let spec = SpringSpec::default_spring();
    let expected = 2.0 * (spec.stiffness * spec.mass).sqrt();
    assert!((spec.damping() - expected).abs() < 1e-3);
}

#[test]
fn simulation_converges_to_target() {
    let mut simulation = SpringSimulation::new(SpringSpec::default_spring(), 120.0, 0.0, 320.0);

    let mut steps = 0;
    while simulation.advance(0.016) {
        steps += 1;
        assert!(steps < 1000, "spring should settle");
    }
    simulation.finish();

    assert_eq!(simulation.position(), 320.0);
    assert_eq!(simulation.velocity(), 0.0);
}

#[test]
fn underdamped_spring_overshoots() {
    let mut simulation = SpringSimulation::new(SpringSpec::bouncy(), 0.0, 0.0, 100.0);

    let mut max_position = 0.0f32;
    for _ in 0..1000 {
        if !simulation.advance(0.016) {
            break;
        }
        max_position = max_position.max(simulation.position());
    }

    assert!(
        max_position > 100.0,
        "under-damped spring should overshoot, peaked at {max_position}"
    );
}

#[test]
fn initial_velocity_pushes_past_target() {
    // Start on the target with outward velocity: the spring must move away
    // before coming back, preserving gesture momentum.
    let mut simulation = SpringSimulation::new(SpringSpec::default_spring(), 200.0, 900.0, 200.0);

    simulation.advance(0.016);
    assert!(simulation.position() > 200.0);
}

#[test]
fn zero_dt_does_not_move_the_spring() {
    let mut simulation = SpringSimulation::new(SpringSpec::default_spring(), 0.0, 0.0, 100.0);

    let still_moving = simulation.advance(0.0);
    assert!(still_moving);
    assert_eq!(simulation.position(), 0.0);
}

#[test]
fn long_frame_gaps_are_capped() {
    let spec = SpringSpec::default_spring();
    let mut capped = SpringSimulation::new(spec, 0.0, 0.0, 100.0);
    let mut paused = SpringSimulation::new(spec, 0.0, 0.0, 100.0);

    capped.advance(0.25);
    paused.advance(10.0);

    assert_eq!(capped.position(), paused.position());
    assert_eq!(capped.velocity(), paused.velocity());
}

#[test]
fn retargeting_keeps_position_and_velocity() {
    let mut simulation = SpringSimulation::new(SpringSpec::default_spring(), 0.0, 0.0, 100.0);
    for _ in 0..4 {
        simulation.advance(0.016);
    }
    let position = simulation.position();
    let velocity = simulation.velocity();

    simulation.set_target(-50.0);

    assert_eq!(simulation.position(), position);
    assert_eq!(simulation.velocity(), velocity);
    assert_eq!(simulation.target(), -50.0);
}

fn drive_to_rest(runtime: &Runtime, settle: &SettleAnimation, max_frames: u32) {
    let handle = runtime.handle();
    let mut frame_time = 0u64;
    for _ in 0..max_frames {
        if !settle.is_running() {
            break;
        }
        frame_time += FRAME_NANOS;
        handle.drain_frame_callbacks(frame_time);
    }
}

#[test]
fn settle_reaches_target_exactly_and_ends_once() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let settle = SettleAnimation::new(runtime.handle());
    let positions = Rc::new(RefCell::new(Vec::new()));
    let ended = Rc::new(RefCell::new(Vec::new()));

    let frames = Rc::clone(&positions);
    let ends = Rc::clone(&ended);
    settle.start(
        120.0,
        0.0,
        320.0,
        SpringSpec::default_spring(),
        move |position| frames.borrow_mut().push(position),
        move |final_position| ends.borrow_mut().push(final_position),
    );
    assert!(settle.is_running());
    assert_eq!(settle.target(), Some(320.0));

    drive_to_rest(&runtime, &settle, 240);

    assert!(!settle.is_running());
    assert_eq!(ended.borrow().as_slice(), &[320.0]);
    assert_eq!(positions.borrow().last(), Some(&320.0));
    assert!(
        positions.borrow().len() > 2,
        "settle should report intermediate positions"
    );
}

#[test]
fn settle_already_at_rest_completes_immediately() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let settle = SettleAnimation::new(runtime.handle());
    let ended = Rc::new(Cell::new(false));

    let flag = Rc::clone(&ended);
    settle.start(
        140.0,
        0.0,
        140.0,
        SpringSpec::default_spring(),
        |_| {},
        move |_| flag.set(true),
    );

    assert!(ended.get());
    assert!(!settle.is_running());
}

#[test]
fn interrupt_reports_in_flight_motion_and_suppresses_on_end() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let handle = runtime.handle();
    let settle = SettleAnimation::new(handle.clone());
    let ended = Rc::new(Cell::new(false));

    let flag = Rc::clone(&ended);
    settle.start(
        0.0,
        0.0,
        300.0,
        SpringSpec::default_spring(),
        |_| {},
        move |_| flag.set(true),
    );

    handle.drain_frame_callbacks(FRAME_NANOS);
    handle.drain_frame_callbacks(2 * FRAME_NANOS);

    let interrupt = settle.interrupt().expect("settle was running");
    assert!(interrupt.position > 0.0 && interrupt.position < 300.0);
    assert!(interrupt.velocity > 0.0);
    assert!(!settle.is_running());

    for frame in 3..40 {
        handle.drain_frame_callbacks(frame * FRAME_NANOS);
    }
    assert!(!ended.get(), "interrupted settle must not complete");
}

#[test]
fn retarget_redirects_running_settle() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let handle = runtime.handle();
    let settle = SettleAnimation::new(handle.clone());
    let ended = Rc::new(RefCell::new(Vec::new()));

    let ends = Rc::clone(&ended);
    settle.start(
        100.0,
        0.0,
        400.0,
        SpringSpec::default_spring(),
        |_| {},
        move |final_position| ends.borrow_mut().push(final_position),
    );

    handle.drain_frame_callbacks(FRAME_NANOS);
    handle.drain_frame_callbacks(2 * FRAME_NANOS);
    assert!(settle.retarget(160.0));
    assert_eq!(settle.target(), Some(160.0));

    drive_to_rest(&runtime, &settle, 240);

    assert_eq!(ended.borrow().as_slice(), &[160.0]);
}

#[test]
fn cancel_stops_frames() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let handle = runtime.handle();
    let settle = SettleAnimation::new(handle.clone());
    let frames = Rc::new(Cell::new(0u32));

    let counter = Rc::clone(&frames);
    settle.start(
        0.0,
        0.0,
        300.0,
        SpringSpec::default_spring(),
        move |_| counter.set(counter.get() + 1),
        |_| {},
    );
    settle.cancel();

    for frame in 1..10 {
        handle.drain_frame_callbacks(frame * FRAME_NANOS);
    }

    assert_eq!(frames.get(), 0);
    assert!(!settle.is_running());
    assert_eq!(settle.target(), None);
    assert!(settle.interrupt().is_none());
}
