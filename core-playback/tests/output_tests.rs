//! Direct-mode output tests against a mocked driver.

use std::sync::{Arc, Mutex};

use core_playback::{
    Driver, DriverRegistry, Encoding, EncodingMask, ErrorCode, OpenRequest, OutputConfig,
    OutputError, OutputFlags, OutputHandle, OutputState, Param, Result,
};
use mockall::mock;

mock! {
    pub Device {}

    impl Driver for Device {
        fn open(&mut self, request: &OpenRequest) -> Result<()>;
        fn formats(&mut self, request: &OpenRequest) -> EncodingMask;
        fn write(&mut self, data: &[u8]) -> Result<usize>;
        fn close(&mut self) -> Result<()>;
        fn flush(&mut self);
        fn drain(&mut self);
        fn deinit(&mut self);
    }
}

/// Registry whose `name` hands out `mock` once.
fn registry_with(name: &str, mock: MockDevice) -> DriverRegistry {
    let slot = Arc::new(Mutex::new(Some(mock)));
    let mut registry = DriverRegistry::new();
    registry.register(name, move || {
        slot.lock()
            .unwrap()
            .take()
            .map(|mock| Box::new(mock) as Box<dyn Driver>)
            .ok_or_else(|| OutputError::BadDriver("mock already handed out".to_string()))
    });
    registry
}

fn output_with(name: &str, mock: MockDevice) -> OutputHandle {
    OutputHandle::with_registry(OutputConfig::default(), registry_with(name, mock)).unwrap()
}

/// Mock that accepts everything and swallows writes.
fn relaxed_device() -> MockDevice {
    let mut mock = MockDevice::new();
    mock.expect_open().returning(|_| Ok(()));
    mock.expect_close().returning(|| Ok(()));
    mock.expect_flush().return_const(());
    mock.expect_drain().return_const(());
    mock.expect_deinit().return_const(());
    mock
}

#[test]
fn test_probe_then_start_opens_with_format() {
    let requests = Arc::new(Mutex::new(Vec::<OpenRequest>::new()));
    let seen = requests.clone();

    let mut mock = MockDevice::new();
    mock.expect_open().times(2).returning(move |request| {
        seen.lock().unwrap().push(request.clone());
        Ok(())
    });
    mock.expect_close().times(2).returning(|| Ok(()));
    mock.expect_write().returning(|data| Ok(data.len()));
    mock.expect_drain().times(1).return_const(());
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card"), Some("hw:1")).unwrap();
    out.start(Encoding::S16, 2, 44100).unwrap();
    assert_eq!(out.play(&[0; 64]), 64);
    out.close();

    let requests = requests.lock().unwrap();
    assert!(requests[0].is_probe());
    assert_eq!(requests[0].device.as_deref(), Some("hw:1"));
    assert_eq!(requests[1].encoding, Some(Encoding::S16));
    assert_eq!(requests[1].channels, Some(2));
    assert_eq!(requests[1].rate, Some(44100));
}

#[test]
fn test_keep_playing_retries_partial_writes() {
    let mut mock = relaxed_device();
    mock.expect_write()
        .times(5)
        .returning(|data| Ok(data.len().min(4)));

    let mut out = output_with("card", mock);
    out.set_param(Param::Flags(OutputFlags::KEEP_PLAYING)).unwrap();
    out.open(Some("card"), None).unwrap();
    out.start(Encoding::S16, 2, 44100).unwrap();

    // Four writes of four bytes each.
    assert_eq!(out.play(&[0; 16]), 16);

    // Without the flag a partial write ends the call.
    out.set_param(Param::Flags(OutputFlags::empty())).unwrap();
    assert_eq!(out.play(&[0; 16]), 4);
    assert_eq!(out.errcode(), ErrorCode::Ok);
}

#[test]
fn test_write_failure_keeps_state() {
    let mut calls = 0;
    let mut mock = relaxed_device();
    mock.expect_write().times(2).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Ok(4)
        } else {
            Err(OutputError::Buffer("xrun".to_string()))
        }
    });

    let mut out = output_with("card", mock);
    out.set_param(Param::Flags(OutputFlags::KEEP_PLAYING | OutputFlags::QUIET))
        .unwrap();
    out.open(Some("card"), None).unwrap();
    out.start(Encoding::S16, 2, 44100).unwrap();

    assert_eq!(out.play(&[0; 12]), 4);
    assert_eq!(out.errcode(), ErrorCode::DevicePlay);
    assert!(matches!(out.last_error(), Some(OutputError::DevicePlay(_))));
    assert_eq!(out.state(), OutputState::Live);
}

#[test]
fn test_zero_progress_ends_keep_playing_loop() {
    let mut mock = relaxed_device();
    mock.expect_write().times(1).returning(|_| Ok(0));

    let mut out = output_with("card", mock);
    out.set_param(Param::Flags(OutputFlags::KEEP_PLAYING)).unwrap();
    out.open(Some("card"), None).unwrap();
    out.start(Encoding::U8, 1, 8000).unwrap();

    assert_eq!(out.play(&[0; 8]), 0);
    assert_eq!(out.errcode(), ErrorCode::Ok);
}

#[test]
fn test_start_failure_reports_device_open() {
    let mut mock = MockDevice::new();
    mock.expect_open().times(2).returning(|request| {
        if request.is_probe() {
            Ok(())
        } else {
            Err(OutputError::DeviceOpen("device busy".to_string()))
        }
    });
    // Only the probe is closed; the failed start never opened anything.
    mock.expect_close().times(1).returning(|| Ok(()));
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card"), None).unwrap();

    let err = out.start(Encoding::S16, 2, 44100).unwrap_err();
    assert_eq!(err, OutputError::DeviceOpen("device busy".to_string()));
    assert_eq!(out.errcode(), ErrorCode::DeviceOpen);
    assert_eq!(out.strerror(), "failed to open device");
    assert_eq!(out.state(), OutputState::Stopped);
}

#[test]
fn test_failed_probe_falls_through_quietly() {
    let quiet_flags = Arc::new(Mutex::new(Vec::new()));
    let seen = quiet_flags.clone();

    let mut mock = MockDevice::new();
    mock.expect_open().times(1).returning(move |request| {
        seen.lock().unwrap().push(request.params.quiet());
        Err(OutputError::DeviceOpen("no such card".to_string()))
    });
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card,test"), None).unwrap();

    assert_eq!(out.driver_info().unwrap().name, "test");
    assert_eq!(*quiet_flags.lock().unwrap(), vec![true]);
}

#[test]
fn test_last_candidate_failure_is_no_driver() {
    let mut mock = MockDevice::new();
    mock.expect_open()
        .times(1)
        .withf(|request| !request.params.quiet())
        .returning(|_| Err(OutputError::DeviceOpen("gone".to_string())));
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    assert!(matches!(
        out.open(Some("card"), None),
        Err(OutputError::NoDriver(_))
    ));
    assert_eq!(out.errcode(), ErrorCode::NoDriver);
    assert_eq!(out.state(), OutputState::Dead);
}

#[test]
fn test_encodings_query_opens_without_format() {
    let requests = Arc::new(Mutex::new(Vec::<OpenRequest>::new()));
    let seen = requests.clone();

    let mut mock = MockDevice::new();
    mock.expect_open().times(2).returning(move |request| {
        seen.lock().unwrap().push(request.clone());
        Ok(())
    });
    mock.expect_formats()
        .times(1)
        .returning(|_| EncodingMask::NONE | Encoding::S16 | Encoding::F32);
    mock.expect_close().times(2).returning(|| Ok(()));
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card"), None).unwrap();
    let mask = out.encodings(1, 48000).unwrap();

    assert!(mask.contains(Encoding::S16));
    assert!(mask.contains(Encoding::F32));
    assert!(!mask.contains(Encoding::U8));

    let requests = requests.lock().unwrap();
    assert_eq!(requests[1].encoding, None);
    assert_eq!(requests[1].channels, Some(1));
    assert_eq!(requests[1].rate, Some(48000));
}

#[test]
fn test_stop_then_close_closes_device_once() {
    let mut mock = MockDevice::new();
    mock.expect_open().times(2).returning(|_| Ok(()));
    // Probe plus stop; close after stop only deinitialises.
    mock.expect_close().times(2).returning(|| Ok(()));
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card"), None).unwrap();
    out.start(Encoding::S16, 2, 44100).unwrap();
    out.stop();
    assert_eq!(out.state(), OutputState::Stopped);

    out.close();
    out.close();
    assert_eq!(out.state(), OutputState::Dead);
    assert_eq!(out.errcode(), ErrorCode::Ok);
}

#[test]
fn test_drop_and_drain_reach_the_driver_when_live() {
    let mut mock = MockDevice::new();
    mock.expect_open().returning(|_| Ok(()));
    mock.expect_close().returning(|| Ok(()));
    mock.expect_flush().times(1).return_const(());
    // ndrain, drain, and the drain inside close.
    mock.expect_drain().times(3).return_const(());
    mock.expect_deinit().times(1).return_const(());

    let mut out = output_with("card", mock);
    out.open(Some("card"), None).unwrap();

    // Not live yet: nothing reaches the driver.
    out.drop_pending();
    out.drain();

    out.start(Encoding::S16, 2, 44100).unwrap();
    out.drop_pending();
    out.ndrain(1024);
    out.drain();
    out.close();
}

#[test]
fn test_pause_and_resume_only_toggle() {
    let mut out = OutputHandle::new(OutputConfig::testing()).unwrap();
    out.pause();
    assert_eq!(out.state(), OutputState::Dead);

    out.open(None, None).unwrap();
    out.resume();
    assert_eq!(out.state(), OutputState::Stopped);

    out.start(Encoding::S16, 2, 44100).unwrap();
    out.pause();
    out.pause();
    assert_eq!(out.state(), OutputState::Paused);
    out.resume();
    assert_eq!(out.state(), OutputState::Live);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: OutputConfig =
        serde_json::from_str(r#"{"default_driver": "card,test", "params": {"gain": 10}}"#)
            .unwrap();
    assert_eq!(config.default_driver.as_deref(), Some("card,test"));
    assert_eq!(config.buffer_bytes, 0);
    assert_eq!(config.params.gain, 10);
    assert_eq!(config.params.preload, 0.0);
    assert!(config.validate().is_ok());

    let config: OutputConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, OutputConfig::default());
}
