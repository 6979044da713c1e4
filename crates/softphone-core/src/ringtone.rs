use std::sync::Arc;

use crate::transport::AudioSink;

/// Idempotent start/stop over a ringtone [`AudioSink`].
///
/// The sink only sees `play` on a stopped → playing edge and `pause` on a
/// playing → stopped edge.
pub struct RingtoneController {
    sink: Arc<dyn AudioSink>,
    playing: bool,
}

impl RingtoneController {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink, playing: false }
    }

    pub fn start(&mut self) {
        if self.playing {
            return;
        }
        self.sink.play();
        self.playing = true;
        tracing::debug!("ringtone started");
    }

    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.sink.pause();
        self.playing = false;
        tracing::debug!("ringtone stopped");
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
