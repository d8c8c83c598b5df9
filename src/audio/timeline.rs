//! Sample-accurate output timeline.
//!
//! The playback thread renders the timeline one period at a time; the number
//! of frames rendered so far is the device clock that scheduling is measured
//! against.

use std::collections::VecDeque;
use std::sync::Arc;

struct ScheduledBuffer {
    start: u64,
    samples: Arc<[f32]>,
}

impl ScheduledBuffer {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// Mono timeline of scheduled buffers, ordered by start frame.
pub struct Timeline {
    sample_rate: u32,
    position: u64,
    queue: VecDeque<ScheduledBuffer>,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            position: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn current_time(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    /// Frame index for a time on this timeline.
    pub fn frame_at(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Schedule samples at `start_time` seconds. A start already in the past
    /// begins at the current position.
    pub fn insert(&mut self, start_time: f64, samples: Arc<[f32]>) {
        if samples.is_empty() {
            return;
        }
        let start = self.frame_at(start_time).max(self.position);
        let idx = self.queue.partition_point(|b| b.start <= start);
        self.queue.insert(idx, ScheduledBuffer { start, samples });
    }

    /// True when nothing is scheduled at or after the current position.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything not yet rendered.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Render the next `out.len()` frames: scheduled audio where it overlaps,
    /// silence elsewhere.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let window_start = self.position;
        let window_end = window_start + out.len() as u64;

        for buffer in &self.queue {
            if buffer.start >= window_end {
                break;
            }
            let from = buffer.start.max(window_start);
            let to = buffer.end().min(window_end);
            if from >= to {
                continue;
            }
            let src = (from - buffer.start) as usize;
            let dst = (from - window_start) as usize;
            let len = (to - from) as usize;
            for (o, s) in out[dst..dst + len]
                .iter_mut()
                .zip(&buffer.samples[src..src + len])
            {
                *o += *s;
            }
        }

        self.position = window_end;
        while self
            .queue
            .front()
            .is_some_and(|b| b.end() <= self.position)
        {
            self.queue.pop_front();
        }
        // out-of-order ends can linger behind a long buffer; sweep them too
        self.queue.retain(|b| b.end() > self.position);
    }
}
