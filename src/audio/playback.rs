//! Gapless scheduling of decoded frames onto an output device.
//!
//! Frames arrive at irregular intervals. Each one starts at
//! `max(device_now, cursor)` and pushes the cursor to its own end, so a
//! frame that arrives early queues behind the previous one and a late frame
//! plays immediately. Frames may leave gaps on underrun but never overlap.

use super::device::OutputDevice;
use super::pcm::{self, AudioFrame};
use crate::error::Result;

/// Where a frame landed on the device timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledFrame {
    pub start_time: f64,
    pub duration: f64,
}

impl ScheduledFrame {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Owns one output context and its playback cursor.
pub struct PlaybackScheduler {
    device: Box<dyn OutputDevice>,
    next_start_time: f64,
    sample_rate: u32,
    channels: u16,
}

impl PlaybackScheduler {
    /// The cursor starts at the device's current time and is never carried
    /// over from another context.
    pub fn new(device: Box<dyn OutputDevice>, sample_rate: u32, channels: u16) -> Self {
        let next_start_time = device.current_time();
        Self {
            device,
            next_start_time,
            sample_rate,
            channels,
        }
    }

    pub fn cursor(&self) -> f64 {
        self.next_start_time
    }

    /// Decode one inbound payload and schedule it. A payload that fails to
    /// decode is dropped and leaves the cursor where it was.
    pub fn enqueue(&mut self, data: &str) -> Result<ScheduledFrame> {
        let frame = pcm::decode_chunk(data, self.sample_rate, self.channels)?;
        Ok(self.enqueue_frame(frame))
    }

    pub fn enqueue_frame(&mut self, frame: AudioFrame) -> ScheduledFrame {
        let start_time = self.device.current_time().max(self.next_start_time);
        let duration = frame.duration();
        self.device.schedule(frame, start_time);
        self.next_start_time = start_time + duration;
        ScheduledFrame {
            start_time,
            duration,
        }
    }

    pub fn close(mut self) {
        self.device.close();
    }
}

/// One-shot playback: decode and start at the device's current time.
/// No cursor is kept.
pub fn play_once(
    device: &mut dyn OutputDevice,
    data: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<ScheduledFrame> {
    let frame = pcm::decode_chunk(data, sample_rate, channels)?;
    let start_time = device.current_time();
    let duration = frame.duration();
    device.schedule(frame, start_time);
    Ok(ScheduledFrame {
        start_time,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::{OUTPUT_SAMPLE_RATE, encode_block};
    use crate::error::LiveError;
    use crate::test_utils::ManualOutput;

    fn one_second_payload() -> String {
        encode_block(&vec![0.1f32; OUTPUT_SAMPLE_RATE as usize]).data
    }

    fn scheduler_at(output: &ManualOutput) -> PlaybackScheduler {
        PlaybackScheduler::new(Box::new(output.clone()), OUTPUT_SAMPLE_RATE, 1)
    }

    #[test]
    fn first_frame_starts_now() {
        let output = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        output.set_time(3.25);
        let mut scheduler = scheduler_at(&output);
        assert_eq!(scheduler.cursor(), 3.25);

        let scheduled = scheduler.enqueue(&one_second_payload()).unwrap();
        assert_eq!(scheduled.start_time, 3.25);
        assert!((scheduler.cursor() - 4.25).abs() < 1e-9);
    }

    #[test]
    fn bursty_arrivals_play_back_to_back() {
        let output = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        let mut scheduler = scheduler_at(&output);
        let payload = one_second_payload();

        let mut starts = Vec::new();
        for arrival in [0.0, 0.5, 2.5] {
            output.set_time(arrival);
            starts.push(scheduler.enqueue(&payload).unwrap().start_time);
        }

        assert_eq!(starts.len(), 3);
        assert!((starts[0] - 0.0).abs() < 1e-9);
        assert!((starts[1] - 1.0).abs() < 1e-9);
        assert!((starts[2] - 2.5).abs() < 1e-9);
        assert_eq!(output.scheduled_starts(), starts);
    }

    #[test]
    fn frames_never_overlap_for_arbitrary_arrivals() {
        let output = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        let mut scheduler = scheduler_at(&output);

        // deterministic pseudo-random arrival jitter and frame lengths
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        let mut clock = 0.0f64;
        let mut previous: Option<ScheduledFrame> = None;
        for _ in 0..500 {
            clock += (next() % 400) as f64 / 1000.0;
            output.set_time(clock);
            let samples = 240 + (next() % 9600) as usize;
            let frame = AudioFrame::new(vec![0.0; samples], OUTPUT_SAMPLE_RATE, 1);
            let scheduled = scheduler.enqueue_frame(frame);

            assert!(scheduled.start_time >= clock);
            if let Some(prev) = previous {
                assert!(scheduled.start_time >= prev.start_time);
                assert!(scheduled.start_time >= prev.end_time() - 1e-9);
            }
            assert!(scheduler.cursor() >= clock);
            previous = Some(scheduled);
        }
    }

    #[test]
    fn undecodable_frame_leaves_cursor_in_place() {
        let output = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        let mut scheduler = scheduler_at(&output);
        scheduler.enqueue(&one_second_payload()).unwrap();
        let cursor = scheduler.cursor();

        let err = scheduler.enqueue("%%%").unwrap_err();
        assert!(matches!(err, LiveError::Decode(_)));
        assert_eq!(scheduler.cursor(), cursor);
        assert_eq!(output.scheduled_starts().len(), 1);
    }

    #[test]
    fn new_context_starts_a_fresh_cursor() {
        let first = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        let mut scheduler = scheduler_at(&first);
        for _ in 0..3 {
            scheduler.enqueue(&one_second_payload()).unwrap();
        }
        assert!((scheduler.cursor() - 3.0).abs() < 1e-9);
        scheduler.close();
        assert_eq!(first.close_count(), 1);

        let second = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        second.set_time(0.5);
        let scheduler = scheduler_at(&second);
        assert_eq!(scheduler.cursor(), 0.5);
    }

    #[test]
    fn one_shot_plays_at_device_time() {
        let mut output = ManualOutput::new(OUTPUT_SAMPLE_RATE);
        output.set_time(7.0);
        let scheduled =
            play_once(&mut output, &one_second_payload(), OUTPUT_SAMPLE_RATE, 1).unwrap();
        assert_eq!(scheduled.start_time, 7.0);
        assert!((scheduled.duration - 1.0).abs() < 1e-9);
        assert_eq!(output.scheduled_starts(), vec![7.0]);
    }
}
