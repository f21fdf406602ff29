use std::time::Duration;

use base64::Engine as _;

use crate::{
    core::Speaker,
    encode::AudioFormat,
    error::{ChatreelError, ChatreelResult},
};

/// Per-request timeout for the HTTP synthesizer. The upstream service has no
/// bounded-wait guarantee of its own; without this an unresponsive endpoint
/// stalls the whole export attempt.
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Sample rate used by the offline silence synthesizer.
pub const SILENCE_SAMPLE_RATE: u32 = 8_000;

/// One synthesized clip: opaque audio bytes plus the exact spoken duration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedClip {
    pub audio: Vec<u8>,
    pub duration_ms: u64,
}

/// Voice ids applied per speaker side of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VoiceSelection {
    pub sender_voice: String,
    pub receiver_voice: String,
}

impl VoiceSelection {
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Sender => &self.sender_voice,
            Speaker::Receiver => &self.receiver_voice,
        }
    }
}

/// Speech synthesis boundary: text + voice id in, audio bytes + measured
/// duration out. Implementations are called strictly sequentially, one
/// message at a time; any failure aborts the whole export attempt and is not
/// retried by the core.
pub trait SpeechSynthesizer {
    fn synthesize(&mut self, text: &str, voice_id: &str) -> ChatreelResult<SynthesizedClip>;

    /// Container format of the clips this synthesizer emits. Uniform across
    /// one attempt; consumed by the encoder when concatenating segments.
    fn audio_format(&self) -> AudioFormat;
}

#[derive(serde::Serialize)]
struct SynthesisRequestBody<'a> {
    text: &'a str,
    voice_id: &'a str,
}

#[derive(serde::Deserialize)]
struct SynthesisResponseBody {
    audio_b64: String,
    duration_ms: u64,
}

/// HTTP adapter for the external synthesis service.
///
/// Tries the voice-specific endpoint first, then the generic fallback; a
/// non-success response from both is a terminal [`ChatreelError::Synthesis`].
/// Requests carry an explicit [`SYNTHESIS_TIMEOUT`] and are never retried
/// here; retry, if offered, is a full restart of the attempt by the caller.
pub struct HttpSynthesizer {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSynthesizer {
    pub fn new(base_url: impl Into<String>) -> ChatreelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()
            .map_err(|e| ChatreelError::synthesis(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoints(&self, voice_id: &str) -> [String; 2] {
        [
            format!("{}/v1/voices/{voice_id}/synthesize", self.base_url),
            format!("{}/v1/synthesize", self.base_url),
        ]
    }

    fn request_one(&self, url: &str, text: &str, voice_id: &str) -> ChatreelResult<SynthesizedClip> {
        let resp = self
            .client
            .post(url)
            .json(&SynthesisRequestBody { text, voice_id })
            .send()
            .map_err(|e| ChatreelError::synthesis(format!("request '{url}': {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatreelError::synthesis(format!(
                "'{url}' returned status {status}"
            )));
        }

        let body: SynthesisResponseBody = resp
            .json()
            .map_err(|e| ChatreelError::synthesis(format!("parse response from '{url}': {e}")))?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(&body.audio_b64)
            .map_err(|e| ChatreelError::synthesis(format!("decode audio payload: {e}")))?;

        if audio.is_empty() {
            return Err(ChatreelError::synthesis(format!(
                "'{url}' returned empty audio"
            )));
        }

        Ok(SynthesizedClip {
            audio,
            duration_ms: body.duration_ms,
        })
    }
}

impl SpeechSynthesizer for HttpSynthesizer {
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    fn synthesize(&mut self, text: &str, voice_id: &str) -> ChatreelResult<SynthesizedClip> {
        let mut last_err = None;
        for url in self.endpoints(voice_id) {
            match self.request_one(&url, text, voice_id) {
                Ok(clip) => return Ok(clip),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "synthesis endpoint failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ChatreelError::synthesis("no synthesis endpoint configured")))
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }
}

/// Offline synthesizer: silence whose duration is estimated from text length.
/// Lets the full export pipeline run without the HTTP service (CLI
/// `--offline`, tests).
pub struct SilenceSynthesizer {
    pub ms_per_char: f64,
    pub floor_ms: u64,
}

impl Default for SilenceSynthesizer {
    fn default() -> Self {
        Self {
            ms_per_char: 55.0,
            floor_ms: 600,
        }
    }
}

impl SpeechSynthesizer for SilenceSynthesizer {
    fn synthesize(&mut self, text: &str, _voice_id: &str) -> ChatreelResult<SynthesizedClip> {
        let chars = text.chars().count() as f64;
        let duration_ms = ((chars * self.ms_per_char).round() as u64).max(self.floor_ms);

        // Interleaved f32le mono zeros; byte-concatenation of segments stays a
        // valid raw PCM stream.
        let samples = (duration_ms * u64::from(SILENCE_SAMPLE_RATE)).div_ceil(1000) as usize;
        Ok(SynthesizedClip {
            audio: vec![0u8; samples * 4],
            duration_ms,
        })
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat::RawF32le {
            sample_rate: SILENCE_SAMPLE_RATE,
            channels: 1,
        }
    }
}
