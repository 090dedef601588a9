//! Frame scheduling for the simulation loop
//!
//! The supervisor never loops on its own. After each tick it asks a
//! [`FrameScheduler`] to call it back on the next frame, which is the only
//! point where the simulation yields. Two schedulers are provided:
//!
//! - [`ManualScheduler`]: frames advance only when the caller says so. Used in
//!   tests and anywhere a deterministic, synchronous drive is wanted.
//! - [`IntervalScheduler`]: frames advance on a fixed wall-clock cadence,
//!   standing in for a display refresh in headless and native hosts.
//!
//! Both are single-threaded; callbacks run on the thread that drives frames.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Work to run on the next frame
pub type TickCallback = Box<dyn FnOnce()>;

/// Something that can run a callback on the next frame
pub trait FrameScheduler {
    /// Queue `callback` for the next frame
    fn request_next_tick(&self, callback: TickCallback);
}

/// Queue shared by the provided schedulers
#[derive(Default)]
struct FrameQueue {
    queue: RefCell<VecDeque<TickCallback>>,
    completed: Cell<u64>,
}

impl FrameQueue {
    fn push(&self, callback: TickCallback) {
        self.queue.borrow_mut().push_back(callback);
    }

    fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run everything queued before this frame began. Callbacks queued while
    /// the frame runs wait for the next one.
    fn run_frame(&self) -> usize {
        let due: Vec<TickCallback> = self.queue.borrow_mut().drain(..).collect();
        let count = due.len();
        for callback in due {
            callback();
        }
        self.completed.set(self.completed.get() + 1);
        count
    }
}

/// Scheduler whose frames are advanced explicitly by the caller
#[derive(Default)]
pub struct ManualScheduler {
    frames: FrameQueue,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frames.completed.get()
    }

    /// Run one frame; returns how many callbacks ran
    pub fn run_frame(&self) -> usize {
        self.frames.run_frame()
    }

    /// Run frames until nothing is queued or `max_frames` have run; returns
    /// the number of frames run
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pending() > 0 {
            self.run_frame();
            frames += 1;
        }
        frames
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_next_tick(&self, callback: TickCallback) {
        self.frames.push(callback);
    }
}

/// Default frame cadence of [`IntervalScheduler`]
pub const DEFAULT_FPS: f64 = 60.0;

/// Scheduler that runs one frame per fixed wall-clock interval
pub struct IntervalScheduler {
    frames: FrameQueue,
    interval: Duration,
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::with_fps(DEFAULT_FPS)
    }
}

impl IntervalScheduler {
    /// Scheduler with the given frame interval
    pub fn new(interval: Duration) -> Self {
        Self {
            frames: FrameQueue::default(),
            interval,
        }
    }

    /// Scheduler running `fps` frames per second; non-positive rates run
    /// frames back to back
    pub fn with_fps(fps: f64) -> Self {
        let interval = if fps > 0.0 && fps.is_finite() {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    /// Time between frames
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frames.completed.get()
    }

    /// Drive frames at the configured cadence until nothing is queued or
    /// `max_frames` have run; returns the number of frames run
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        let mut next_frame = Instant::now();

        while frames < max_frames && !self.frames.is_empty() {
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            }
            next_frame += self.interval;

            let ran = self.frames.run_frame();
            frames += 1;
            trace!(frame = self.frame_count(), callbacks = ran, "frame");
        }

        frames
    }
}

impl FrameScheduler for IntervalScheduler {
    fn request_next_tick(&self, callback: TickCallback) {
        self.frames.push(callback);
    }
}
