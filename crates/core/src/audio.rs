//! Audio frame types
//!
//! The telephony bridge hands the runtime 16-bit PCM; frames keep samples in
//! an `Arc` slice so fan-out to STT never copies audio data.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - telephony
    Hz8000,
    /// 16kHz - standard speech recognition
    #[default]
    Hz16000,
    /// 44.1kHz - CD quality
    Hz44100,
    /// 48kHz - professional audio
    Hz48000,
}

impl SampleRate {
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Samples in a chunk of the given duration
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        (self.as_u32() as usize * ms as usize) / 1000
    }
}

/// Audio encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AudioEncoding {
    /// 16-bit signed PCM (little-endian)
    #[default]
    Pcm16,
    /// μ-law (telephony)
    Mulaw,
    /// A-law (telephony)
    Alaw,
}

impl AudioEncoding {
    /// MIME-style label used on the STT wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            AudioEncoding::Pcm16 => "audio/wav",
            AudioEncoding::Mulaw => "audio/mulaw",
            AudioEncoding::Alaw => "audio/alaw",
        }
    }
}

/// A frame of caller audio
#[derive(Clone)]
pub struct AudioFrame {
    /// PCM16 samples
    pub samples: Arc<[i16]>,
    pub sample_rate: SampleRate,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Duration of this frame
    pub duration: Duration,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: SampleRate, sequence: u64) -> Self {
        let duration = Duration::from_millis(
            (samples.len() as u64 * 1000) / sample_rate.as_u32() as u64,
        );
        Self {
            samples: samples.into(),
            sample_rate,
            sequence,
            duration,
        }
    }

    /// Samples as little-endian PCM16 bytes, the STT wire representation
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for s in self.samples.iter() {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_for_ms() {
        assert_eq!(SampleRate::Hz16000.samples_for_ms(100), 1600);
        assert_eq!(SampleRate::Hz8000.samples_for_ms(100), 800);
    }

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame::new(vec![0i16; 1600], SampleRate::Hz16000, 0);
        assert_eq!(frame.duration, Duration::from_millis(100));
    }

    #[test]
    fn test_le_bytes() {
        let frame = AudioFrame::new(vec![1i16, -2], SampleRate::Hz16000, 0);
        assert_eq!(frame.to_le_bytes(), vec![1, 0, 0xFE, 0xFF]);
    }
}
