//! # Output Handle
//!
//! State machine that feeds PCM bytes to a driver, either directly or through
//! a buffer worker thread.
//!
//! ## Overview
//!
//! ```text
//! dead --open--> stopped --start--> live <--pause/resume--> paused
//!                   ^                 |                        |
//!                   +------stop-------+------------------------+
//! any --close--> dead
//! ```
//!
//! Every entry point clears the last error before doing anything and records a
//! new one only on failure, so `errcode()` always describes the latest call.
//! Operations that cannot meaningfully fail for the caller (`stop`, `pause`,
//! `drain`, `close`...) return nothing and only record the code.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{Encoding, OutputConfig, OutputHandle};
//!
//! let mut out = OutputHandle::new(OutputConfig::default())?;
//! out.open(Some("test"), None)?;
//! out.start(Encoding::S16, 2, 44100)?;
//! let written = out.play(&pcm);
//! out.close();
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::buffer::{BufferClient, Command, ExitMode, Reply};
use crate::config::{OutputConfig, MIN_BUFFER_BYTES};
use crate::driver::{Driver, DriverRegistry, OpenRequest, Resolved};
use crate::error::{ErrorCode, OutputError, Result};
use crate::format::{Encoding, EncodingMask, OutputFormat};
use crate::params::{OutputFlags, OutputParams, Param, ParamKind};

/// Lifecycle state of an output handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    /// No driver bound.
    #[default]
    Dead,
    /// Driver bound, device closed.
    Stopped,
    Live,
    Paused,
}

impl OutputState {
    /// Returns `true` while the device is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Live | Self::Paused)
    }
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputState::Dead => "dead",
            OutputState::Stopped => "stopped",
            OutputState::Live => "live",
            OutputState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Driver and device chosen by `open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub device: Option<String>,
}

fn device_open_error(err: OutputError) -> OutputError {
    match err {
        OutputError::DeviceOpen(_) => err,
        other => OutputError::DeviceOpen(other.to_string()),
    }
}

fn device_play_error(err: OutputError) -> OutputError {
    match err {
        OutputError::DevicePlay(_) => err,
        other => OutputError::DevicePlay(other.to_string()),
    }
}

fn protocol_error(command: &str) -> OutputError {
    OutputError::Buffer(format!("unexpected reply to {command}"))
}

/// Audio output handle.
pub struct OutputHandle {
    config: OutputConfig,
    registry: Arc<DriverRegistry>,
    params: OutputParams,
    driver: Option<Box<dyn Driver>>,
    driver_name: Option<String>,
    device: Option<String>,
    format: Option<OutputFormat>,
    state: OutputState,
    error: Option<OutputError>,
    buffer: Option<BufferClient>,
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("driver", &self.driver_name)
            .field("device", &self.device)
            .field("format", &self.format)
            .field("state", &self.state)
            .field("error", &self.error)
            .field("buffered", &self.buffer.is_some())
            .finish()
    }
}

impl OutputHandle {
    /// Create a handle that only knows the built-in drivers.
    pub fn new(config: OutputConfig) -> Result<Self> {
        Self::with_registry(config, DriverRegistry::new())
    }

    /// Create a handle resolving driver names through `registry`.
    ///
    /// A non-zero `buffer_bytes` starts the buffer worker right away.
    pub fn with_registry(config: OutputConfig, registry: DriverRegistry) -> Result<Self> {
        config.validate().map_err(OutputError::BadParam)?;
        let bytes = config.buffer_bytes;
        let mut handle = Self::direct(config, Arc::new(registry));
        if bytes > 0 {
            handle.set_buffer(bytes)?;
        }
        Ok(handle)
    }

    /// Handle that always talks to its driver itself.
    pub(crate) fn direct(mut config: OutputConfig, registry: Arc<DriverRegistry>) -> Self {
        config.buffer_bytes = 0;
        Self {
            params: config.params,
            config,
            registry,
            driver: None,
            driver_name: None,
            device: None,
            format: None,
            state: OutputState::Dead,
            error: None,
            buffer: None,
        }
    }

    // ========================================================================
    // Error Reporting
    // ========================================================================

    /// Code of the last failure, `ErrorCode::Ok` after a successful call.
    pub fn errcode(&self) -> ErrorCode {
        self.error.as_ref().map_or(ErrorCode::Ok, OutputError::code)
    }

    /// Fixed message for the current error code.
    pub fn strerror(&self) -> &'static str {
        self.errcode().message()
    }

    pub fn last_error(&self) -> Option<&OutputError> {
        self.error.as_ref()
    }

    pub(crate) fn take_error(&mut self) -> Option<OutputError> {
        self.error.take()
    }

    fn fail(&mut self, err: OutputError) -> OutputError {
        self.error = Some(err.clone());
        err
    }

    fn noquiet(&self) -> bool {
        !self.params.quiet()
    }

    /// Send `command` to the buffer worker. `None` in direct mode.
    fn forward(&mut self, command: Command) -> Option<Result<Reply>> {
        let result = self.buffer.as_ref()?.request(command);
        Some(result.map_err(|err| self.fail(err)))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn state(&self) -> OutputState {
        self.state
    }

    pub fn is_buffered(&self) -> bool {
        self.buffer.is_some()
    }

    /// Names `open` can resolve.
    pub fn drivers(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn driver_info(&mut self) -> Result<DriverInfo> {
        self.error = None;
        match &self.driver_name {
            Some(name) => Ok(DriverInfo {
                name: name.clone(),
                device: self.device.clone(),
            }),
            None => Err(self.fail(OutputError::NoDriver("no driver is open".to_string()))),
        }
    }

    /// Negotiated format while the device is open.
    pub fn format(&mut self) -> Result<OutputFormat> {
        self.error = None;
        match self.format {
            Some(format) if self.state.is_open() => Ok(format),
            _ => Err(self.fail(OutputError::NotLive)),
        }
    }

    pub(crate) fn framesize(&self) -> Option<usize> {
        self.format.map(|format| format.framesize)
    }

    /// Bytes waiting in the buffer worker's ring, 0 in direct mode.
    pub fn buffered(&self) -> usize {
        self.buffer.as_ref().map_or(0, BufferClient::fill)
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn params(&self) -> &OutputParams {
        &self.params
    }

    pub fn param(&self, kind: ParamKind) -> Param {
        self.params.get(kind)
    }

    pub fn set_param(&mut self, param: Param) -> Result<()> {
        self.error = None;
        if let Err(err) = self.params.set(param) {
            return Err(self.fail(err));
        }
        self.sync_params()
    }

    /// Take over every parameter of `other`.
    pub fn set_params_from(&mut self, other: &OutputHandle) -> Result<()> {
        self.error = None;
        self.params = other.params;
        self.sync_params()
    }

    pub(crate) fn replace_params(&mut self, params: OutputParams) {
        self.params = params;
    }

    fn sync_params(&mut self) -> Result<()> {
        match self.forward(Command::Params(self.params)) {
            Some(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Buffer Setup
    // ========================================================================

    /// Switch to buffered output with a ring of `bytes`, or back to direct
    /// output with 0. The output is closed first.
    #[instrument(skip(self))]
    pub fn set_buffer(&mut self, bytes: usize) -> Result<()> {
        self.error = None;
        if bytes != 0 && bytes < MIN_BUFFER_BYTES {
            return Err(self.fail(OutputError::BadParam(format!(
                "buffer must be 0 or at least {MIN_BUFFER_BYTES} bytes"
            ))));
        }

        self.close();
        if let Some(mut buffer) = self.buffer.take() {
            if let Err(err) = buffer.exit(ExitMode::Graceful) {
                warn!(error = %err, "Buffer worker did not shut down cleanly");
            }
        }

        if bytes > 0 {
            match BufferClient::spawn(bytes, &self.config, self.registry.clone(), self.params) {
                Ok(buffer) => self.buffer = Some(buffer),
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok(())
    }

    /// Shut the buffer worker down and fall back to direct output.
    ///
    /// `Rude` discards buffered audio instead of playing it. The output ends
    /// up dead either way.
    pub fn exit_buffer(&mut self, mode: ExitMode) -> Result<()> {
        self.error = None;
        let Some(mut buffer) = self.buffer.take() else {
            return Ok(());
        };
        let result = buffer.exit(mode);

        // The worker closed the device; forget it here too.
        self.driver = None;
        self.driver_name = None;
        self.device = None;
        self.format = None;
        self.state = OutputState::Dead;
        result.map_err(|err| self.fail(err))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind the first driver out of the comma separated `driver` list (or the
    /// configured default) that works with `device`.
    #[instrument(skip(self))]
    pub fn open(&mut self, driver: Option<&str>, device: Option<&str>) -> Result<()> {
        self.close();
        self.error = None;

        let names = match driver
            .map(str::to_owned)
            .or_else(|| self.config.default_driver.clone())
        {
            Some(names) if names.split(',').any(|name| !name.trim().is_empty()) => names,
            _ => {
                return Err(self.fail(OutputError::BadDriverName(
                    driver.unwrap_or_default().to_string(),
                )))
            }
        };

        let command = Command::Open {
            driver: names.clone(),
            device: device.map(str::to_owned),
        };
        match self.forward(command) {
            Some(Ok(Reply::Opened { driver, device })) => {
                self.driver_name = Some(driver);
                self.device = device;
                self.state = OutputState::Stopped;
                Ok(())
            }
            Some(Ok(_)) => Err(self.fail(protocol_error("open"))),
            Some(Err(err)) => Err(err),
            None => self.open_direct(&names, device),
        }
    }

    fn open_direct(&mut self, names: &str, device: Option<&str>) -> Result<()> {
        let candidates: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        self.device = device.map(str::to_owned);

        for (index, name) in candidates.iter().enumerate() {
            let last = index + 1 == candidates.len();
            if let Some(driver) = self.check_driver(name, last) {
                debug!(driver = name, device = ?self.device, "Output driver selected");
                self.driver = Some(driver);
                self.driver_name = Some(name.to_string());
                self.state = OutputState::Stopped;
                return Ok(());
            }
        }

        if self.noquiet() {
            error!(
                drivers = names,
                device = ?device,
                "Found no driver out of the list that works with the device"
            );
        }
        self.device = None;
        Err(self.fail(OutputError::NoDriver(format!(
            "none of [{names}] could be opened"
        ))))
    }

    /// Instantiate `name` and, unless built in, check that it can open the
    /// device. Only the last candidate reports problems.
    fn check_driver(&self, name: &str, last: bool) -> Option<Box<dyn Driver>> {
        if self.params.verbose_at(2) {
            debug!(driver = name, "Trying output driver");
        }
        let report = last && self.noquiet();

        match self.registry.resolve(name) {
            None => {
                if report {
                    warn!(driver = name, "Unknown output driver");
                }
                None
            }
            Some(Err(err)) => {
                if report {
                    warn!(driver = name, error = %err, "Cannot instantiate output driver");
                }
                None
            }
            Some(Ok(Resolved::Builtin(driver))) => Some(driver),
            Some(Ok(Resolved::External(mut driver))) => {
                let mut params = self.params;
                if !last {
                    params.flags.insert(OutputFlags::QUIET);
                }
                let probe = OpenRequest::probe(self.device.clone(), params);
                match driver.open(&probe) {
                    Ok(()) => {
                        if let Err(err) = driver.close() {
                            debug!(driver = name, error = %err, "Closing probed device failed");
                        }
                        Some(driver)
                    }
                    Err(err) => {
                        if report {
                            warn!(driver = name, error = %err, "Driver cannot open the device");
                        }
                        driver.deinit();
                        None
                    }
                }
            }
        }
    }

    /// Drain, release the driver and forget the device. Safe in any state.
    pub fn close(&mut self) {
        self.error = None;
        if self.state == OutputState::Dead {
            return;
        }
        self.drain();

        if self.forward(Command::Close).is_none() {
            if let Some(mut driver) = self.driver.take() {
                if self.state.is_open() {
                    if let Err(err) = driver.close() {
                        if !self.params.quiet() {
                            error!(error = %err, "Driver close failed");
                        }
                    }
                }
                driver.deinit();
            }
        }

        self.driver = None;
        self.driver_name = None;
        self.device = None;
        self.format = None;
        self.state = OutputState::Dead;
    }

    /// Open the device with the given format.
    #[instrument(skip(self))]
    pub fn start(&mut self, encoding: Encoding, channels: u16, rate: u32) -> Result<()> {
        self.stop();
        self.error = None;

        if self.state != OutputState::Stopped {
            return Err(self.fail(OutputError::NoDriver(
                "start needs an opened driver".to_string(),
            )));
        }
        if channels == 0 || rate == 0 {
            return Err(self.fail(OutputError::BadParam(format!(
                "unusable format: {channels} channels at {rate} Hz"
            ))));
        }

        let format = OutputFormat::new(encoding, channels, rate);
        if self.params.verbose_at(1) {
            debug!(%encoding, channels, rate, framesize = format.framesize, "Starting output");
        }

        if let Some(capacity) = self.buffer.as_ref().map(BufferClient::capacity) {
            if capacity < format.framesize {
                return Err(self.fail(OutputError::Buffer(format!(
                    "ring of {capacity} bytes cannot hold a {} byte frame",
                    format.framesize
                ))));
            }
        }

        match self.forward(Command::Start(format)) {
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err),
            None => {
                let request = OpenRequest {
                    device: self.device.clone(),
                    rate: Some(rate),
                    channels: Some(channels),
                    encoding: Some(encoding),
                    params: self.params,
                };
                let Some(driver) = self.driver.as_mut() else {
                    return Err(self.fail(OutputError::NoDriver("driver vanished".to_string())));
                };
                if let Err(err) = driver.open(&request) {
                    if self.noquiet() {
                        error!(error = %err, "Cannot open the device");
                    }
                    return Err(self.fail(device_open_error(err)));
                }
            }
        }

        self.format = Some(format);
        self.state = OutputState::Live;
        Ok(())
    }

    /// Close the device, keeping the driver.
    pub fn stop(&mut self) {
        self.error = None;
        if !self.state.is_open() {
            return;
        }

        if self.forward(Command::Stop).is_none() {
            if let Some(driver) = self.driver.as_mut() {
                if let Err(err) = driver.close() {
                    if !self.params.quiet() {
                        error!(error = %err, "Trouble closing the device");
                    }
                }
            }
        }
        self.state = OutputState::Stopped;
    }

    pub fn pause(&mut self) {
        self.error = None;
        if self.state != OutputState::Live {
            return;
        }
        if let Some(Err(_)) = self.forward(Command::Pause) {
            return;
        }
        self.state = OutputState::Paused;
    }

    /// Continue after `pause`.
    pub fn resume(&mut self) {
        self.error = None;
        if self.state != OutputState::Paused {
            return;
        }
        if let Some(Err(_)) = self.forward(Command::Continue) {
            return;
        }
        self.state = OutputState::Live;
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Write whole frames out of `data`, returning the number of bytes taken.
    ///
    /// Trailing bytes short of a frame are ignored. With
    /// [`OutputFlags::KEEP_PLAYING`] partial device writes are retried until
    /// everything is written or the device stops making progress.
    pub fn play(&mut self, data: &[u8]) -> usize {
        self.error = None;
        let format = match self.format {
            Some(format) if self.state == OutputState::Live => format,
            _ => {
                self.error = Some(OutputError::NotLive);
                return 0;
            }
        };

        let count = data.len() - data.len() % format.framesize;
        if count == 0 {
            return 0;
        }
        let data = &data[..count];
        let keep_playing = self.params.keep_playing();

        if let Some(buffer) = &self.buffer {
            let (written, err) = buffer.write(data, format.framesize, keep_playing);
            self.error = err;
            return written;
        }

        let Some(driver) = self.driver.as_mut() else {
            self.error = Some(OutputError::NoDriver("driver vanished".to_string()));
            return 0;
        };

        let mut written = 0;
        loop {
            match driver.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n.min(count - written),
                Err(err) => {
                    if !self.params.quiet() {
                        error!(error = %err, written, count, "Error in writing audio");
                    }
                    self.error = Some(device_play_error(err));
                    break;
                }
            }
            if written >= count || !keep_playing {
                break;
            }
        }
        written
    }

    /// Throw away audio that has not been played yet.
    pub fn drop_pending(&mut self) {
        self.error = None;
        if self.forward(Command::Drop).is_some() {
            return;
        }
        if self.state == OutputState::Live {
            if let Some(driver) = self.driver.as_mut() {
                driver.flush();
            }
        }
    }

    /// Block until all pending audio has been played.
    pub fn drain(&mut self) {
        self.error = None;
        if self.state != OutputState::Live {
            return;
        }
        if self.forward(Command::Drain).is_none() {
            if let Some(driver) = self.driver.as_mut() {
                driver.drain();
            }
        }
    }

    /// Block until at most `bytes` of pending audio have been played.
    pub fn ndrain(&mut self, bytes: usize) {
        self.error = None;
        if self.state != OutputState::Live {
            return;
        }
        if self.forward(Command::NDrain(bytes)).is_none() {
            if let Some(driver) = self.driver.as_mut() {
                driver.drain();
            }
        }
    }

    /// Encodings the driver supports for `channels` at `rate`.
    ///
    /// Stops playback first; needs an opened driver.
    #[instrument(skip(self))]
    pub fn encodings(&mut self, channels: u16, rate: u32) -> Result<EncodingMask> {
        self.stop();
        self.error = None;
        if self.state != OutputState::Stopped {
            return Err(self.fail(OutputError::NoDriver(
                "encoding query needs an opened driver".to_string(),
            )));
        }

        match self.forward(Command::Encodings { channels, rate }) {
            Some(Ok(Reply::Encodings(mask))) => Ok(mask),
            Some(Ok(_)) => Err(self.fail(protocol_error("encodings"))),
            Some(Err(err)) => Err(err),
            None => {
                let request = OpenRequest {
                    device: self.device.clone(),
                    rate: Some(rate),
                    channels: Some(channels),
                    encoding: None,
                    params: self.params,
                };
                let Some(driver) = self.driver.as_mut() else {
                    return Err(self.fail(OutputError::NoDriver("driver vanished".to_string())));
                };
                if let Err(err) = driver.open(&request) {
                    return Err(self.fail(device_open_error(err)));
                }
                let mask = driver.formats(&request);
                if let Err(err) = driver.close() {
                    debug!(error = %err, "Closing device after format query failed");
                }
                Ok(mask)
            }
        }
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.close();
        if let Some(mut buffer) = self.buffer.take() {
            if let Err(err) = buffer.exit(ExitMode::Graceful) {
                debug!(error = %err, "Buffer worker exit failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::TestDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_output() -> OutputHandle {
        OutputHandle::new(OutputConfig::testing()).unwrap()
    }

    #[test]
    fn test_lifecycle_with_test_driver() {
        let mut out = test_output();
        assert_eq!(out.state(), OutputState::Dead);

        out.open(None, None).unwrap();
        assert_eq!(out.state(), OutputState::Stopped);
        assert_eq!(out.driver_info().unwrap().name, "test");

        out.start(Encoding::S16, 2, 44100).unwrap();
        assert_eq!(out.state(), OutputState::Live);
        assert_eq!(out.play(&[0; 400]), 400);

        out.pause();
        assert_eq!(out.state(), OutputState::Paused);
        out.resume();
        assert_eq!(out.state(), OutputState::Live);

        out.stop();
        assert_eq!(out.state(), OutputState::Stopped);
        out.close();
        assert_eq!(out.state(), OutputState::Dead);
        assert_eq!(out.errcode(), ErrorCode::Ok);
    }

    #[test]
    fn test_play_truncates_to_frames() {
        let counter = Arc::new(AtomicUsize::new(0));
        let shared = counter.clone();
        let mut registry = DriverRegistry::new();
        registry.register("counting", move || {
            Ok(Box::new(TestDriver::with_counter(shared.clone())))
        });

        let mut out = OutputHandle::with_registry(OutputConfig::default(), registry).unwrap();
        out.open(Some("counting"), None).unwrap();
        out.start(Encoding::S24, 2, 48000).unwrap();

        assert_eq!(out.play(&[0; 13]), 12);
        assert_eq!(out.play(&[0; 5]), 0);
        assert_eq!(out.errcode(), ErrorCode::Ok);
        assert_eq!(counter.load(Ordering::Relaxed), 12);
    }

    #[test]
    fn test_play_outside_live_sets_not_live() {
        let mut out = test_output();
        assert_eq!(out.play(&[0; 4]), 0);
        assert_eq!(out.errcode(), ErrorCode::NotLive);
        assert_eq!(out.strerror(), "no active audio device");

        out.open(None, None).unwrap();
        assert_eq!(out.play(&[0; 4]), 0);
        assert_eq!(out.errcode(), ErrorCode::NotLive);

        out.start(Encoding::U8, 1, 8000).unwrap();
        out.pause();
        assert_eq!(out.play(&[0; 4]), 0);
        assert_eq!(out.errcode(), ErrorCode::NotLive);
    }

    #[test]
    fn test_open_without_names() {
        let mut out = OutputHandle::new(OutputConfig::default()).unwrap();
        assert!(matches!(out.open(None, None), Err(OutputError::BadDriverName(_))));
        assert_eq!(out.errcode(), ErrorCode::BadDriverName);
        assert_eq!(out.state(), OutputState::Dead);

        assert!(out.open(Some(" ,"), None).is_err());
        assert_eq!(out.errcode(), ErrorCode::BadDriverName);
    }

    #[test]
    fn test_open_unknown_drivers() {
        let mut out = test_output();
        assert!(matches!(
            out.open(Some("alsa,pulse"), None),
            Err(OutputError::NoDriver(_))
        ));
        assert_eq!(out.state(), OutputState::Dead);
        assert!(out.driver_info().is_err());

        // A working name later in the list still wins.
        out.open(Some("alsa,test"), Some("hw:0")).unwrap();
        let info = out.driver_info().unwrap();
        assert_eq!(info.name, "test");
        assert_eq!(info.device.as_deref(), Some("hw:0"));
    }

    #[test]
    fn test_start_requires_open_driver() {
        let mut out = test_output();
        assert!(matches!(
            out.start(Encoding::S16, 2, 44100),
            Err(OutputError::NoDriver(_))
        ));
        assert_eq!(out.errcode(), ErrorCode::NoDriver);

        out.open(None, None).unwrap();
        assert!(matches!(
            out.start(Encoding::S16, 0, 44100),
            Err(OutputError::BadParam(_))
        ));
        assert_eq!(out.state(), OutputState::Stopped);
    }

    #[test]
    fn test_format_only_while_open() {
        let mut out = test_output();
        out.open(None, None).unwrap();
        assert!(matches!(out.format(), Err(OutputError::NotLive)));

        out.start(Encoding::F32, 2, 48000).unwrap();
        let format = out.format().unwrap();
        assert_eq!(format.framesize, 8);
        assert_eq!(format.rate, 48000);

        out.pause();
        assert!(out.format().is_ok());
        out.stop();
        assert_eq!(out.format().unwrap_err().code(), ErrorCode::NotLive);
    }

    #[test]
    fn test_encodings_of_test_driver() {
        let mut out = test_output();
        assert!(out.encodings(2, 44100).is_err());
        assert_eq!(out.errcode(), ErrorCode::NoDriver);

        out.open(None, None).unwrap();
        out.start(Encoding::S16, 2, 44100).unwrap();
        assert_eq!(out.encodings(2, 44100).unwrap(), EncodingMask::ANY);
        // The query stops playback.
        assert_eq!(out.state(), OutputState::Stopped);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut out = test_output();
        out.close();
        out.close();
        assert_eq!(out.errcode(), ErrorCode::Ok);

        out.open(None, None).unwrap();
        out.start(Encoding::S16, 1, 22050).unwrap();
        out.close();
        out.close();
        assert_eq!(out.state(), OutputState::Dead);
        assert_eq!(out.errcode(), ErrorCode::Ok);
    }

    #[test]
    fn test_params_roundtrip() {
        let mut out = test_output();
        out.set_param(Param::Gain(50)).unwrap();
        out.set_param(Param::Verbose(3)).unwrap();
        assert_eq!(out.param(ParamKind::Gain), Param::Gain(50));

        assert!(out.set_param(Param::Preload(-0.1)).is_err());
        assert_eq!(out.errcode(), ErrorCode::BadParam);
        assert_eq!(out.params().preload, 0.0);

        let mut other = test_output();
        other.set_params_from(&out).unwrap();
        assert_eq!(other.params(), out.params());
    }

    #[test]
    fn test_exit_buffer_returns_to_direct_mode() {
        let mut out = test_output();
        out.exit_buffer(ExitMode::Graceful).unwrap();

        out.set_buffer(4096).unwrap();
        assert!(out.is_buffered());
        out.open(None, None).unwrap();
        out.start(Encoding::S16, 2, 44100).unwrap();
        assert_eq!(out.play(&[0; 64]), 64);

        out.exit_buffer(ExitMode::Rude).unwrap();
        assert!(!out.is_buffered());
        assert_eq!(out.state(), OutputState::Dead);
        out.open(None, None).unwrap();
        assert_eq!(out.driver_info().unwrap().name, "test");
    }

    #[test]
    fn test_set_buffer_rejects_tiny_ring() {
        let mut out = test_output();
        assert!(matches!(out.set_buffer(10), Err(OutputError::BadParam(_))));
        assert!(!out.is_buffered());
        assert_eq!(out.buffered(), 0);
    }
}
