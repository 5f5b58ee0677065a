use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    Damage,
    Swing,
    Shoot,
    Roll,
    Upgrade,
}

/// Fire-and-forget sound output. Playback failures stay inside the sink.
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, _cue: AudioCue) {}
}

impl fmt::Debug for dyn AudioSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AudioSink")
    }
}
