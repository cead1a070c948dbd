//! # Buffered Output
//!
//! A worker thread owns a direct-mode [`OutputHandle`] and the real driver.
//! The producer side ([`BufferClient`], held by the caller's handle) writes
//! PCM bytes into a shared [`RingBuffer`] and sends every other operation as a
//! [`Command`], waiting for the worker's reply.
//!
//! ## Overview
//!
//! ```text
//! caller --play--> RingBuffer ----------> worker --play--> driver
//!        --Command--> channel --Reply--/
//! ```
//!
//! The worker plays frame-aligned chunks while the device is live. Playback
//! failures that happen between calls are latched and handed to the producer
//! on its next `play`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::OutputConfig;
use crate::driver::DriverRegistry;
use crate::error::{OutputError, Result};
use crate::format::{EncodingMask, OutputFormat};
use crate::output::{OutputHandle, OutputState};
use crate::params::OutputParams;
use crate::ring_buffer::RingBuffer;

/// How the worker should leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitMode {
    /// Play what is buffered, then close.
    Graceful,
    /// Discard what is buffered, then close.
    Rude,
}

/// Request sent to the worker.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Open {
        driver: String,
        device: Option<String>,
    },
    Start(OutputFormat),
    Stop,
    Pause,
    Continue,
    Drop,
    Drain,
    NDrain(usize),
    Close,
    Encodings {
        channels: u16,
        rate: u32,
    },
    Params(OutputParams),
    Exit(ExitMode),
}

/// Successful answer from the worker.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    Done,
    Opened {
        driver: String,
        device: Option<String>,
    },
    Encodings(EncodingMask),
}

type Latch = Arc<Mutex<Option<OutputError>>>;

fn worker_gone() -> OutputError {
    OutputError::Buffer("buffer worker is not running".to_string())
}

// ============================================================================
// Producer Side
// ============================================================================

pub(crate) struct BufferClient {
    ring: RingBuffer,
    commands: Sender<Command>,
    replies: Receiver<Result<Reply>>,
    latched: Latch,
    worker: Option<JoinHandle<()>>,
    poll: Duration,
}

impl BufferClient {
    /// Start a worker with a ring of `bytes`.
    pub(crate) fn spawn(
        bytes: usize,
        config: &OutputConfig,
        registry: Arc<DriverRegistry>,
        params: OutputParams,
    ) -> Result<Self> {
        let ring = RingBuffer::new(bytes);
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let latched: Latch = Arc::new(Mutex::new(None));

        let mut inner_config = config.clone();
        inner_config.params = params;
        let worker = Worker {
            output: OutputHandle::direct(inner_config, registry),
            ring: ring.clone(),
            commands: command_rx,
            replies: reply_tx,
            latched: latched.clone(),
            chunk: Vec::new(),
            chunk_bytes: config.worker_chunk_bytes,
            poll: config.worker_poll_interval,
            primed: false,
        };

        let handle = thread::Builder::new()
            .name("output-buffer".to_string())
            .spawn(move || worker.run())
            .map_err(|e| OutputError::Buffer(format!("cannot start buffer worker: {e}")))?;
        debug!(bytes, "Buffer worker started");

        Ok(Self {
            ring,
            commands: command_tx,
            replies: reply_rx,
            latched,
            worker: Some(handle),
            poll: config.worker_poll_interval,
        })
    }

    /// Send `command` and wait for the answer.
    pub(crate) fn request(&self, command: Command) -> Result<Reply> {
        if self.worker.is_none() {
            return Err(worker_gone());
        }
        self.commands.send(command).map_err(|_| worker_gone())?;
        // The worker may be waiting for ring data rather than commands.
        self.ring.notify();
        self.replies.recv().map_err(|_| worker_gone())?
    }

    /// Put whole frames of `data` into the ring.
    ///
    /// With `keep_playing` this blocks until everything is queued; otherwise
    /// it waits for at least one frame of space and queues what fits. Returns
    /// the queued byte count and the error that stopped it, if any.
    pub(crate) fn write(
        &self,
        data: &[u8],
        framesize: usize,
        keep_playing: bool,
    ) -> (usize, Option<OutputError>) {
        if let Some(err) = self.latched.lock().take() {
            return (0, Some(err));
        }

        let mut written = 0;
        while written < data.len() {
            if self.ring.is_closed() {
                return (written, Some(worker_gone()));
            }

            let room = self.ring.free_space();
            let take = (data.len() - written).min(room - room % framesize);
            if take > 0 {
                written += self.ring.write(&data[written..written + take]);
                continue;
            }
            if written > 0 && !keep_playing {
                break;
            }
            self.ring.wait_for_space(framesize, self.poll);
        }
        (written, None)
    }

    pub(crate) fn fill(&self) -> usize {
        self.ring.available()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Stop the worker and wait for the thread to end.
    pub(crate) fn exit(&mut self, mode: ExitMode) -> Result<()> {
        let result = self.request(Command::Exit(mode)).map(|_| ());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Buffer worker panicked");
            }
        }
        self.ring.close();
        result
    }
}

impl Drop for BufferClient {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.exit(ExitMode::Rude) {
                debug!(error = %err, "Buffer worker already gone");
            }
        }
    }
}

// ============================================================================
// Worker Side
// ============================================================================

/// Closes the ring when the worker ends, panics included.
struct CloseOnExit(RingBuffer);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

enum Progress {
    Played(usize),
    /// Not enough data in the ring.
    Starved,
    /// The device took nothing or failed.
    Stalled,
}

struct Worker {
    output: OutputHandle,
    ring: RingBuffer,
    commands: Receiver<Command>,
    replies: Sender<Result<Reply>>,
    latched: Latch,
    chunk: Vec<u8>,
    chunk_bytes: usize,
    poll: Duration,
    /// Preload reached since the last start or drop.
    primed: bool,
}

impl Worker {
    fn run(mut self) {
        let _close = CloseOnExit(self.ring.clone());

        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    self.shutdown(ExitMode::Graceful);
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            let progress = if self.output.state() == OutputState::Live {
                self.play_chunk(false, usize::MAX)
            } else {
                Progress::Stalled
            };

            match progress {
                Progress::Played(_) => {}
                Progress::Starved => {
                    let wanted = self.wanted();
                    self.ring.wait_for_data(wanted, self.poll);
                }
                Progress::Stalled => match self.commands.recv_timeout(self.poll) {
                    Ok(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        self.shutdown(ExitMode::Graceful);
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                },
            }
        }
        debug!("Buffer worker finished");
    }

    /// Execute one command and reply. Returns false when the worker must end.
    fn handle(&mut self, command: Command) -> bool {
        let mut running = true;
        let reply = match command {
            Command::Open { driver, device } => self
                .output
                .open(Some(driver.as_str()), device.as_deref())
                .and_then(|()| self.output.driver_info())
                .map(|info| Reply::Opened {
                    driver: info.name,
                    device: info.device,
                }),
            Command::Start(format) => {
                self.ring.clear();
                self.primed = false;
                self.chunk
                    .resize(self.chunk_bytes.max(format.framesize), 0);
                self.output
                    .start(format.encoding, format.channels, format.rate)
                    .map(|()| Reply::Done)
            }
            Command::Stop => {
                self.drain_ring(None);
                self.output.stop();
                self.ring.clear();
                self.done()
            }
            Command::Pause => {
                self.output.pause();
                self.done()
            }
            Command::Continue => {
                self.output.resume();
                self.done()
            }
            Command::Drop => {
                self.ring.clear();
                self.primed = false;
                self.output.drop_pending();
                self.done()
            }
            Command::Drain => {
                self.drain_ring(None);
                self.output.drain();
                self.done()
            }
            Command::NDrain(bytes) => {
                self.drain_ring(Some(bytes));
                self.output.ndrain(bytes);
                self.done()
            }
            Command::Close => {
                self.drain_ring(None);
                self.output.close();
                self.ring.clear();
                self.done()
            }
            Command::Encodings { channels, rate } => self
                .output
                .encodings(channels, rate)
                .map(Reply::Encodings),
            Command::Params(params) => {
                self.output.replace_params(params);
                Ok(Reply::Done)
            }
            Command::Exit(mode) => {
                running = false;
                self.shutdown(mode);
                Ok(Reply::Done)
            }
        };

        if self.replies.send(reply).is_err() {
            warn!("Buffer client went away before the reply");
            return false;
        }
        running
    }

    fn done(&mut self) -> Result<Reply> {
        match self.output.take_error() {
            Some(err) => Err(err),
            None => Ok(Reply::Done),
        }
    }

    fn shutdown(&mut self, mode: ExitMode) {
        match mode {
            ExitMode::Graceful => self.drain_ring(None),
            ExitMode::Rude => self.ring.clear(),
        }
        self.output.close();
        self.ring.clear();
    }

    /// Bytes the ring must hold before playing starts.
    fn wanted(&self) -> usize {
        let framesize = self.output.framesize().unwrap_or(1);
        if self.primed {
            return framesize;
        }
        let capacity = self.ring.capacity();
        let preload = (self.output.params().preload * capacity as f64) as usize;
        let preload = preload.min(capacity - capacity % framesize);
        preload.max(framesize)
    }

    /// Hand up to `limit` bytes from the ring to the device. Unless `force`,
    /// waits for the preload level first.
    fn play_chunk(&mut self, force: bool, limit: usize) -> Progress {
        let Some(framesize) = self.output.framesize() else {
            return Progress::Stalled;
        };
        let available = self.ring.available();
        if !force && available < self.wanted() {
            return Progress::Starved;
        }
        self.primed = true;

        let len = available.min(self.chunk.len()).min(limit);
        let len = len - len % framesize;
        if len == 0 {
            return Progress::Starved;
        }

        let len = self.ring.peek(&mut self.chunk[..len]);
        let written = self.output.play(&self.chunk[..len]);
        self.ring.consume(written);

        if let Some(err) = self.output.take_error() {
            if !self.output.params().quiet() {
                error!(error = %err, "Buffer worker lost its device, dropping buffered audio");
            }
            *self.latched.lock() = Some(err);
            self.ring.clear();
            return Progress::Stalled;
        }
        if written == 0 {
            Progress::Stalled
        } else {
            Progress::Played(written)
        }
    }

    /// Play buffered audio until the ring is empty or `limit` bytes are out.
    fn drain_ring(&mut self, limit: Option<usize>) {
        let mut played = 0;
        while self.output.state() == OutputState::Live {
            let remaining = match limit {
                Some(limit) if played >= limit => break,
                Some(limit) => limit - played,
                None => usize::MAX,
            };
            match self.play_chunk(true, remaining) {
                Progress::Played(written) => played += written,
                Progress::Starved => break,
                Progress::Stalled => {
                    if self.latched.lock().is_some() {
                        break;
                    }
                    thread::sleep(self.poll);
                }
            }
        }
    }
}
