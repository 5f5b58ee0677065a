use skirmish_sim::{AudioCue, AudioSink, CircleShape, ProgressBar, RectShape, RenderSurface, TextShape};
use tracing::trace;

/// Headless render target that only counts what a frame would draw.
#[derive(Debug, Default)]
pub(crate) struct FrameStats {
    pub(crate) rects: usize,
    pub(crate) circles: usize,
    pub(crate) bars: usize,
    pub(crate) texts: usize,
}

impl FrameStats {
    pub(crate) fn begin_frame(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn draw_calls(&self) -> usize {
        self.rects + self.circles + self.bars + self.texts
    }
}

impl RenderSurface for FrameStats {
    fn rect(&mut self, _shape: &RectShape) {
        self.rects += 1;
    }

    fn circle(&mut self, _shape: &CircleShape) {
        self.circles += 1;
    }

    fn progress_bar(&mut self, _bar: &ProgressBar) {
        self.bars += 1;
    }

    fn text(&mut self, _text: &TextShape<'_>) {
        self.texts += 1;
    }
}

/// Audio sink for headless runs: cues go to the trace log.
#[derive(Debug, Default)]
pub(crate) struct TracingAudio;

impl AudioSink for TracingAudio {
    fn play(&mut self, cue: AudioCue) {
        trace!(cue = ?cue, "audio_cue");
    }
}

#[cfg(test)]
mod tests {
    use skirmish_sim::{Session, SimConfig};

    use super::*;

    #[test]
    fn frame_counts_reset_between_frames() {
        let mut session = Session::new(SimConfig::seeded(2));
        session.start(false).expect("start");
        let mut stats = FrameStats::default();
        session.render(&mut stats);
        let first = stats.draw_calls();
        assert!(first > 0);
        assert_eq!(stats.texts, 6);

        stats.begin_frame();
        assert_eq!(stats.draw_calls(), 0);
        session.render(&mut stats);
        assert_eq!(stats.draw_calls(), first);
    }
}
