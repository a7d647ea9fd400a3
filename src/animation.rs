/// Whether the rig is being posed by hand or driven by the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Edit,
    Playback,
}

/// Playback clock - time in seconds, one keyframe slot per second
///
/// `time` stays within `[0, keyframe_count - 1]` while playing.
#[derive(Clone, Debug, Default)]
pub struct AnimationClock {
    pub mode: Mode,
    pub time: f32,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.mode == Mode::Playback
    }

    /// Last valid time for a timeline of `keyframe_count` slots
    pub fn max_time(keyframe_count: usize) -> f32 {
        keyframe_count.saturating_sub(1) as f32
    }

    /// Start playback from time 0; needs at least two keyframes to blend
    pub fn enter_playback(&mut self, keyframe_count: usize) -> bool {
        if keyframe_count < 2 {
            log::warn!(
                "Playback needs at least 2 keyframes, have {}",
                keyframe_count
            );
            return false;
        }
        self.mode = Mode::Playback;
        self.time = 0.0;
        log::info!("Playback started ({} keyframes)", keyframe_count);
        true
    }

    pub fn exit_playback(&mut self) {
        self.mode = Mode::Edit;
        log::info!("Playback stopped at {:.2}", self.time);
    }

    /// Flip between edit and playback, returns the resulting mode
    pub fn toggle(&mut self, keyframe_count: usize) -> Mode {
        match self.mode {
            Mode::Edit => {
                self.enter_playback(keyframe_count);
            }
            Mode::Playback => self.exit_playback(),
        }
        self.mode
    }

    /// Advance by `delta_seconds` while playing.
    ///
    /// Returns the time to sample the pose at, or None in edit mode. Once the
    /// sampled time reaches the end the clock rewinds to 0 and drops back to
    /// edit mode, so the last frame is still shown.
    pub fn tick(&mut self, delta_seconds: f32, keyframe_count: usize) -> Option<f32> {
        if self.mode != Mode::Playback {
            return None;
        }
        self.time += delta_seconds;
        let sample = self.time;

        if self.time >= Self::max_time(keyframe_count) {
            self.time = 0.0;
            self.mode = Mode::Edit;
            log::info!("Playback finished");
        }
        Some(sample)
    }

    pub fn status_line(&self, keyframe_count: usize) -> String {
        match self.mode {
            Mode::Edit => format!("edit: {} keyframes", keyframe_count),
            Mode::Playback => format!(
                "playback: {:.2} / {:.2}",
                self.time,
                Self::max_time(keyframe_count)
            ),
        }
    }
}
