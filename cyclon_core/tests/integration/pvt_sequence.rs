//! Integration test: synchronized multi-axis PVT run.
//!
//! Validates: execute → axes at start → trigger pulse at each waypoint of
//! the first axis → both sequences played in lockstep on the motion task →
//! controller idle with every axis at its final waypoint; fieldbus loss
//! mid-run aborts the group; a disabled axis blocks the start.

use cyclon_common::motion::error::{ERROR_PVT_CTRL_ABORTED, ERROR_PVT_CTRL_AXIS_NOT_READY};
use cyclon_core::pvt::{PvtAxis, PvtState};

use super::common::{Rig, TWO_AXES};

#[test]
fn sequences_run_to_final_waypoints() {
    let mut rig = Rig::start(TWO_AXES);
    let pvt = rig.pvt.clone().unwrap();
    assert!(rig.axes.iter().all(|a| a.pvt_valid()));
    rig.step_until(10, |r| r.axes.iter().all(|a| a.enabled()));

    pvt.set_execute(true);
    rig.step_until(10, |_| pvt.busy());

    let mut pulses = Vec::new();
    let mut level = false;
    let mut cycles = 0;
    while pvt.busy() {
        rig.step();
        let trigger = rig.bit("io.pvt_trigger");
        if trigger && !level {
            pulses.push(rig.value("pvtctrl.point_id"));
        }
        level = trigger;
        cycles += 1;
        assert!(cycles < 3000, "PVT did not finish");
    }

    // ax1 waypoints at 0 s, 1 s and 2 s.
    assert_eq!(pulses, vec![0.0, 1.0, 2.0]);
    assert_eq!(pvt.point_id(), 2);
    assert_eq!(pvt.trigger_id(), 3);
    assert_eq!(pvt.state(), PvtState::Idle);
    assert_eq!(pvt.error_code(), 0);
    assert!(pvt.current_time() >= 2.0);
    assert!((rig.axes[0].actual_position() - 10.0).abs() < 0.05);
    assert!((rig.axes[1].actual_position() + 5.0).abs() < 0.05);
    assert!(rig.axes.iter().all(|a| a.error_code() == 0));
}

#[test]
fn fieldbus_loss_aborts_running_sequence() {
    let mut rig = Rig::start(TWO_AXES);
    let pvt = rig.pvt.clone().unwrap();
    rig.step_until(10, |r| r.axes.iter().all(|a| a.enabled()));
    pvt.set_execute(true);
    rig.step_until(100, |_| pvt.state() == PvtState::ExecutePvt);
    rig.steps(200);
    assert!(pvt.busy());

    rig.cycle.fieldbus_mut().set_link_ok(false);
    rig.step_until(10, |_| pvt.state() == PvtState::Error);
    assert!(!pvt.busy());
    assert_eq!(pvt.error_code(), ERROR_PVT_CTRL_ABORTED);
    assert_eq!(rig.cycle.scheduler().last_error(1), ERROR_PVT_CTRL_ABORTED);

    let frozen = rig.axes[0].actual_position();
    rig.steps(10);
    assert_eq!(rig.axes[0].actual_position(), frozen);

    rig.cycle.fieldbus_mut().set_link_ok(true);
    pvt.set_execute(false);
    pvt.error_reset();
    rig.step_until(10, |_| pvt.state() == PvtState::Idle);
    assert_eq!(pvt.error_code(), 0);
}

#[test]
fn disabled_axis_blocks_start() {
    let mut rig = Rig::start(TWO_AXES);
    let pvt = rig.pvt.clone().unwrap();
    rig.step_until(10, |r| r.axes.iter().all(|a| a.enabled()));
    rig.axes[1].set_enable(false);
    rig.step_until(10, |r| !r.axes[1].enabled());
    let start = rig.axes[0].actual_position();

    pvt.set_execute(true);
    rig.step_until(10, |_| pvt.state() == PvtState::Error);
    assert_eq!(pvt.error_code(), ERROR_PVT_CTRL_AXIS_NOT_READY);
    assert!(!pvt.busy());
    // Nothing was commanded.
    rig.steps(10);
    assert_eq!(rig.axes[0].actual_position(), start);

    rig.axes[1].set_enable(true);
    rig.step_until(10, |r| r.axes[1].enabled());
    pvt.set_execute(false);
    pvt.error_reset();
    rig.step_until(10, |_| pvt.state() == PvtState::Idle);
    pvt.set_execute(true);
    rig.step_until(10, |_| pvt.busy());
}
