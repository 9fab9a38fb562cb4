mod common;

use common::{RecordingMotor, UnpluggedMouse};
use evdev::{KeyCode, KeyEvent, RelativeAxisCode, RelativeAxisEvent};
use mousecar::input::{CollectorError, CollectorHandle, InputEvent, MouseButton};
use mousecar::{Config, DriveError, Vehicle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[test]
fn unavailable_hardware_fails_creation() {
    let result = Vehicle::create(Box::new(RecordingMotor::failing_init()), &Config::default());
    assert!(matches!(result, Err(DriveError::HardwareUnavailable(_))));
}

#[test]
fn invalid_sensitivity_fails_creation() {
    let mut config = Config::default();
    config.drive.turn_sensitivity = 1.0;

    let motor = RecordingMotor::new();
    let result = Vehicle::create(Box::new(motor.clone()), &config);
    assert!(matches!(result, Err(DriveError::Config(_))));
    assert_eq!(motor.channel_writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn lost_source_stops_motors_before_reporting() {
    let motor = RecordingMotor::new();
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    tx.send(InputEvent::button(MouseButton::Middle, true))
        .await
        .unwrap();
    drop(tx);

    let result = vehicle
        .run_until_shutdown(rx, CancellationToken::new())
        .await;

    assert!(matches!(result, Err(DriveError::EventSourceLost(_))));
    assert!(motor.outputs().is_idle());
    assert_eq!(motor.shutdowns(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_halts_even_while_cruising() {
    let motor = RecordingMotor::new();
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let session = tokio::spawn(vehicle.run_until_shutdown(rx, shutdown.clone()));

    tx.send(InputEvent::button(MouseButton::Middle, true))
        .await
        .unwrap();
    tx.send(InputEvent::scroll(1.0)).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(!motor.outputs().is_idle());

    shutdown.cancel();
    let stopped = session.await.unwrap().unwrap();

    assert!(motor.outputs().is_idle());
    assert_eq!(motor.shutdowns(), 1);
    assert!(!stopped.context().spin_state().active);
}

#[tokio::test(start_paused = true)]
async fn spin_expires_inside_running_vehicle() {
    let motor = RecordingMotor::new();
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let session = tokio::spawn(vehicle.run_until_shutdown(rx, shutdown.clone()));

    tx.send(InputEvent::scroll(-1.0)).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(!motor.outputs().is_idle());

    sleep(Duration::from_millis(250)).await;
    assert!(motor.outputs().is_idle());
    assert_eq!(motor.shutdowns(), 0);

    shutdown.cancel();
    session.await.unwrap().unwrap();
    assert_eq!(motor.shutdowns(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_watchdog_write_ends_session() {
    // 4 writes to initialize, 4 for the spin, then the watchdog's stop fails
    let motor = RecordingMotor::failing_after(8);
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    tx.send(InputEvent::scroll(1.0)).await.unwrap();

    let result = vehicle
        .run_until_shutdown(rx, CancellationToken::new())
        .await;

    assert!(matches!(result, Err(DriveError::HardwareUnavailable(_))));
    assert_eq!(motor.shutdowns(), 1);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn failed_button_write_ends_session() {
    let motor = RecordingMotor::failing_after(4);
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    tx.send(InputEvent::button(MouseButton::Left, true))
        .await
        .unwrap();

    let result = vehicle
        .run_until_shutdown(rx, CancellationToken::new())
        .await;

    assert!(matches!(result, Err(DriveError::HardwareUnavailable(_))));
    assert_eq!(motor.shutdowns(), 1);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn unplugged_mouse_reports_collector_cause() {
    let motor = RecordingMotor::new();
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    let collector = CollectorHandle::spawn(
        "unplugged",
        UnpluggedMouse::after([
            *KeyEvent::new(KeyCode::BTN_MIDDLE, 1),
            *RelativeAxisEvent::new(RelativeAxisCode::REL_WHEEL, 1),
        ]),
        tx,
    );

    let session = vehicle
        .run_until_shutdown(rx, CancellationToken::new())
        .await;
    assert!(matches!(session, Err(DriveError::EventSourceLost(_))));

    match collector.finish(session).await {
        Err(DriveError::Collector(CollectorError::Read(e))) => {
            assert_eq!(e.raw_os_error(), Some(19));
        }
        other => panic!("expected collector read error, got {:?}", other.err()),
    }
    assert!(motor.outputs().is_idle());
    assert_eq!(motor.shutdowns(), 1);
}

#[tokio::test(start_paused = true)]
async fn finished_session_stops_collector() {
    let motor = RecordingMotor::new();
    let vehicle = Vehicle::create(Box::new(motor.clone()), &Config::default())
        .unwrap()
        .start();

    let (tx, rx) = mpsc::channel(8);
    let collector = CollectorHandle::spawn("quiet", UnpluggedMouse::immediately(), tx.clone());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let session = vehicle.run_until_shutdown(rx, shutdown).await;
    assert!(collector.finish(session).await.is_ok());
    drop(tx);
}
