//! The frame transport: a bounded drop-oldest queue in front of a TCP
//! writer thread.
//!
//! The tick loop calls [`FrameSink::submit`] synchronously; submission only
//! ever takes the queue lock for a push, so the simulation never waits on
//! the network.  When the renderer falls behind, the oldest queued frame is
//! discarded — stale frames are worthless anyway.

use std::collections::VecDeque;
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use crate::{RenderMessage, RenderResult};

/// Consumer of composed frames.  Implementations must not block the caller.
pub trait FrameSink {
    /// Hand over one frame (an ordered message list).
    fn submit(&mut self, frame: Vec<RenderMessage>);
}

// ── FrameQueue ────────────────────────────────────────────────────────────────

/// Bounded frame buffer shared between the tick loop and the writer thread.
pub(crate) struct FrameQueue {
    frames: Mutex<VecDeque<Vec<RenderMessage>>>,
    available: Condvar,
    capacity: usize,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl FrameQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame, discarding the oldest one when full.
    pub(crate) fn push(&self, frame: Vec<RenderMessage>) {
        let mut frames = self.frames.lock().unwrap();
        if frames.len() >= self.capacity {
            frames.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        frames.push_back(frame);
        drop(frames);
        self.available.notify_one();
    }

    /// Blocking pop with a timeout so the writer can observe `closed`.
    pub(crate) fn pop(&self, timeout: Duration) -> Option<Vec<RenderMessage>> {
        let mut frames = self.frames.lock().unwrap();
        loop {
            if let Some(frame) = frames.pop_front() {
                return Some(frame);
            }
            if self.closed.load(Ordering::Relaxed) {
                return None;
            }
            let (guard, result) = self.available.wait_timeout(frames, timeout).unwrap();
            frames = guard;
            if result.timed_out() && self.closed.load(Ordering::Relaxed) {
                return None;
            }
        }
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.available.notify_all();
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

// ── TcpSink ───────────────────────────────────────────────────────────────────

/// Ships frames as newline-delimited JSON over a TCP connection, from a
/// dedicated writer thread.
pub struct TcpSink {
    queue: Arc<FrameQueue>,
    writer: Option<JoinHandle<()>>,
}

impl TcpSink {
    /// Connect to `addr` (`host:port`) and start the writer thread.
    ///
    /// Connection failures here are errors (the operator asked for a
    /// renderer); failures after startup are transient — the frame is
    /// dropped, a reconnect is attempted, and the simulation never notices.
    pub fn connect(addr: &str, capacity: usize) -> RenderResult<Self> {
        let stream = TcpStream::connect(addr)?;
        info!(%addr, "render transport connected");

        let queue = Arc::new(FrameQueue::new(capacity));
        let writer_queue = Arc::clone(&queue);
        let addr = addr.to_string();
        let writer = std::thread::Builder::new()
            .name("render-writer".into())
            .spawn(move || write_loop(writer_queue, stream, addr))
            .expect("spawning the render writer thread");

        Ok(Self { queue, writer: Some(writer) })
    }

    /// Frames discarded because the renderer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.queue.dropped()
    }
}

impl FrameSink for TcpSink {
    fn submit(&mut self, frame: Vec<RenderMessage>) {
        self.queue.push(frame);
    }
}

impl Drop for TcpSink {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn write_loop(queue: Arc<FrameQueue>, mut stream: TcpStream, addr: String) {
    while let Some(frame) = queue.pop(Duration::from_millis(200)) {
        if let Err(e) = write_frame(&mut stream, &frame) {
            warn!(error = %e, "render frame dropped");
            // One reconnect attempt per failed frame; keep dropping quietly
            // until the renderer comes back.
            if let Ok(fresh) = TcpStream::connect(&addr) {
                info!(%addr, "render transport reconnected");
                stream = fresh;
            }
        }
    }
}

fn write_frame(stream: &mut TcpStream, frame: &[RenderMessage]) -> RenderResult<()> {
    let mut buffer = Vec::new();
    for message in frame {
        serde_json::to_writer(&mut buffer, message)?;
        buffer.push(b'\n');
    }
    stream.write_all(&buffer)?;
    stream.flush()?;
    Ok(())
}
