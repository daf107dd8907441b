//! Transport — the musical clock behind live and offline playback.
//!
//! Time advances in audio frames. Each advance converts the frames to ticks at
//! the current tempo, carrying the fractional tick forward, so a tempo change
//! only affects what comes after it and long sessions never drift.

use super::beat::{Beat, TICKS_PER_BEAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
}

/// The stretch of musical and wall-clock time one block covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    /// First beat inside the block.
    pub from: Beat,
    /// First beat after the block.
    pub to: Beat,
    /// Frames played since `play` when the block starts.
    pub start_frame: u64,
}

#[derive(Debug)]
pub struct Transport {
    bpm: f64,
    sample_rate: u32,
    channels: u16,
    state: PlayState,
    ticks: u64,
    carry: f64,
    frames_played: u64,
}

impl Transport {
    pub fn new(bpm: f64, sample_rate: u32, channels: u16) -> Self {
        Self {
            bpm,
            sample_rate,
            channels,
            state: PlayState::Stopped,
            ticks: 0,
            carry: 0.0,
            frames_played: 0,
        }
    }

    /// Start from the current position. The wall clock restarts at zero.
    pub fn play(&mut self) {
        self.frames_played = 0;
        self.state = PlayState::Playing;
    }

    /// Stop and rewind to the top.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.rewind();
    }

    /// Back to beat zero without touching the play state.
    pub fn rewind(&mut self) {
        self.ticks = 0;
        self.carry = 0.0;
    }

    /// Jump to `position`. The fractional carry is kept, so loop wraps stay
    /// sample-accurate over many passes.
    pub fn seek(&mut self, position: Beat) {
        self.ticks = position.ticks();
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn position(&self) -> Beat {
        Beat::from_ticks(self.ticks)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Applies from the next advance on; time already covered is unaffected.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames played since the last `play`.
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }

    /// Move forward by `frames`. `None` while stopped.
    pub fn advance(&mut self, frames: u32) -> Option<BlockWindow> {
        if !self.is_playing() {
            return None;
        }

        let beats = frames as f64 / self.sample_rate as f64 * self.bpm / 60.0;
        let exact = self.carry + beats * TICKS_PER_BEAT as f64;
        let whole = exact.floor();
        self.carry = exact - whole;

        let window = BlockWindow {
            from: self.position(),
            to: Beat::from_ticks(self.ticks + whole as u64),
            start_frame: self.frames_played,
        };
        self.ticks += whole as u64;
        self.frames_played += u64::from(frames);
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(bpm: f64) -> Transport {
        let mut t = Transport::new(bpm, 44100, 2);
        t.play();
        t
    }

    #[test]
    fn starts_stopped_at_zero() {
        let t = Transport::new(120.0, 44100, 2);
        assert_eq!(t.state(), PlayState::Stopped);
        assert_eq!(t.position(), Beat::ZERO);
        assert_eq!(t.channels(), 2);
    }

    #[test]
    fn stopped_transport_does_not_move() {
        let mut t = Transport::new(120.0, 44100, 2);
        assert!(t.advance(1024).is_none());
        assert_eq!(t.frames_played(), 0);
    }

    #[test]
    fn half_second_is_one_beat_at_120() {
        let mut t = playing(120.0);
        let w = t.advance(22050).unwrap();
        assert_eq!((w.from, w.to), (Beat::ZERO, Beat::ONE));
        assert_eq!(w.start_frame, 0);
        assert_eq!(t.frames_played(), 22050);
    }

    #[test]
    fn windows_are_contiguous() {
        let mut t = playing(97.0);
        let mut previous = t.advance(1024).unwrap();
        for _ in 0..50 {
            let next = t.advance(1024).unwrap();
            assert_eq!(next.from, previous.to);
            assert_eq!(next.start_frame, previous.start_frame + 1024);
            previous = next;
        }
    }

    #[test]
    fn stop_rewinds_and_play_restarts_the_clock() {
        let mut t = playing(120.0);
        t.advance(30000);
        t.stop();
        assert_eq!(t.position(), Beat::ZERO);
        assert!(!t.is_playing());

        t.play();
        assert_eq!(t.frames_played(), 0);
    }

    #[test]
    fn tempo_change_only_affects_later_time() {
        let mut t = playing(120.0);
        t.advance(22050);
        t.set_bpm(60.0);
        // One more second at 60 BPM is one more beat.
        let w = t.advance(44100).unwrap();
        assert_eq!(w.from, Beat::ONE);
        assert_eq!(w.to, Beat::from_beats(2));
    }

    #[test]
    fn seek_keeps_playing() {
        let mut t = playing(120.0);
        t.advance(40000);
        t.seek(Beat::from_beats_f64(0.5));
        assert!(t.is_playing());
        assert_eq!(t.advance(64).unwrap().from, Beat::from_beats_f64(0.5));
    }

    #[test]
    fn no_drift_over_long_sessions() {
        let mut t = playing(133.0);
        let (block, blocks) = (997u32, 20_000u64);
        for _ in 0..blocks {
            t.advance(block);
        }
        let expected = (block as f64 * blocks as f64 / 44100.0 * 133.0 / 60.0
            * TICKS_PER_BEAT as f64)
            .floor() as i64;
        let actual = t.position().ticks() as i64;
        assert!((actual - expected).abs() <= 1, "expected {expected}, got {actual}");
    }
}
