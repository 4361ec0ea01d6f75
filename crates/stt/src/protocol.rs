//! STT vendor wire protocol
//!
//! Outbound audio frames are JSON with an `audio` payload and no `type`
//! field; only `end_of_stream` carries one. Inbound frames are tagged with
//! `type` and demultiplex into transcript, VAD, and error events.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Outbound audio payload
#[derive(Debug, Serialize)]
pub struct AudioPayload {
    pub data: String,
    pub encoding: String,
    pub sample_rate: u32,
}

/// Regular audio message. Deliberately has no `type` field.
#[derive(Debug, Serialize)]
pub struct AudioMessage {
    pub audio: AudioPayload,
}

/// End-of-stream marker, the only typed outbound message
#[derive(Debug, Serialize)]
pub struct EndOfStreamMessage {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

/// Encode a PCM16 chunk as the vendor's audio frame JSON
pub fn audio_message(pcm_le_bytes: &[u8], sample_rate: u32) -> String {
    let message = AudioMessage {
        audio: AudioPayload {
            data: base64::engine::general_purpose::STANDARD.encode(pcm_le_bytes),
            encoding: "audio/wav".to_string(),
            sample_rate,
        },
    };
    serde_json::to_string(&message).expect("audio message serializes")
}

pub fn end_of_stream_message() -> String {
    serde_json::to_string(&EndOfStreamMessage {
        message_type: "end_of_stream",
    })
    .expect("end_of_stream serializes")
}

#[derive(Debug, Deserialize)]
pub struct TranscriptData {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub speech_start: Option<u64>,
    #[serde(default)]
    pub speech_end: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct VadSignal {
    pub signal_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub message: String,
}

/// Inbound vendor frame
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "data")]
    Data { data: TranscriptData },
    #[serde(rename = "events")]
    Events { data: VadSignal },
    #[serde(rename = "error")]
    Error { data: ErrorData },
}

/// Transcript delivered to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub text: String,
    /// The vendor only emits finals
    pub is_final: bool,
    pub speech_start_ms: Option<u64>,
    pub speech_end_ms: Option<u64>,
}

/// Voice-activity event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    StartOfSpeech,
    EndOfSpeech,
}

/// Event stream consumed by the call session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttEvent {
    Transcript(TranscriptEvent),
    Vad(VadEvent),
    Error(String),
}

/// Demultiplex one raw inbound frame. Unknown frames return `None`.
pub fn demux(raw: &str) -> Option<SttEvent> {
    let message: InboundMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "unrecognized STT frame");
            return None;
        }
    };

    match message {
        InboundMessage::Data { data } => {
            if data.transcript.is_empty() {
                return None;
            }
            Some(SttEvent::Transcript(TranscriptEvent {
                text: data.transcript,
                is_final: true,
                speech_start_ms: data.speech_start,
                speech_end_ms: data.speech_end,
            }))
        }
        InboundMessage::Events { data } => match data.signal_type.as_str() {
            "START_SPEECH" => Some(SttEvent::Vad(VadEvent::StartOfSpeech)),
            "END_SPEECH" => Some(SttEvent::Vad(VadEvent::EndOfSpeech)),
            other => {
                tracing::debug!(signal = other, "unknown VAD signal");
                None
            }
        },
        InboundMessage::Error { data } => Some(SttEvent::Error(data.message)),
    }
}
