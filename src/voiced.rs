use crate::{
    core::{CancelToken, MessageId},
    encode::AudioFormat,
    error::ChatreelResult,
    manifest::Message,
    synth::{SpeechSynthesizer, VoiceSelection},
};

/// Floor for a speech-measured delay, avoiding a zero-length reveal step.
pub const MIN_VOICED_DELAY_SECONDS: f64 = 0.01;

/// Audio for one message, produced once per export attempt. Never cached
/// across manifest changes: a changed voice or text invalidates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSegment {
    pub message_id: MessageId,
    pub bytes: Vec<u8>,
    pub duration_ms: u64,
}

/// Export-ready script: original messages with delays replaced by measured
/// speech durations, plus the per-message audio and the exact total length.
#[derive(Clone, Debug)]
pub struct VoicedScript {
    pub messages: Vec<Message>,
    pub segments: Vec<AudioSegment>,
    /// Sum of measured audio durations: the export duration, replacing the
    /// editorial per-message guesses.
    pub duration_ms: u64,
    pub audio_format: AudioFormat,
}

/// Convert a measured duration to the displayed delay: rounded to hundredths
/// of a second, floored at [`MIN_VOICED_DELAY_SECONDS`].
pub fn voiced_delay_seconds(duration_ms: u64) -> f64 {
    ((duration_ms as f64 / 10.0).round() / 100.0).max(MIN_VOICED_DELAY_SECONDS)
}

/// Synthesize every message in strict order and rebuild the delays from the
/// measured durations.
///
/// Requests run sequentially, never concurrently: the adapter may be
/// rate-limited and per-message ordering is part of the contract. Any
/// synthesis failure aborts the whole attempt with no partial script and no
/// retry here. Cancellation is honored between requests.
#[tracing::instrument(skip_all, fields(messages = messages.len()))]
pub fn build_voiced_script(
    messages: &[Message],
    voices: &VoiceSelection,
    synth: &mut dyn SpeechSynthesizer,
    cancel: &CancelToken,
) -> ChatreelResult<VoicedScript> {
    let mut voiced = Vec::with_capacity(messages.len());
    let mut segments = Vec::with_capacity(messages.len());
    let mut duration_ms: u64 = 0;

    for m in messages {
        cancel.bail_if_canceled()?;

        let clip = synth.synthesize(&m.text, voices.voice_for(m.speaker))?;
        tracing::debug!(id = m.id.as_str(), duration_ms = clip.duration_ms, "synthesized message");

        duration_ms = duration_ms.saturating_add(clip.duration_ms);
        voiced.push(Message {
            delay_seconds: Some(voiced_delay_seconds(clip.duration_ms)),
            ..m.clone()
        });
        segments.push(AudioSegment {
            message_id: m.id.clone(),
            bytes: clip.audio,
            duration_ms: clip.duration_ms,
        });
    }

    Ok(VoicedScript {
        messages: voiced,
        segments,
        duration_ms,
        audio_format: synth.audio_format(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MessageId, Speaker};
    use crate::error::ChatreelError;
    use crate::synth::SynthesizedClip;

    fn msg(id: &str, text: &str) -> Message {
        Message {
            id: MessageId::new(id),
            speaker: Speaker::Sender,
            text: text.to_string(),
            delay_seconds: Some(3.0),
            read_receipt: None,
            tapback: None,
        }
    }

    fn voices() -> VoiceSelection {
        VoiceSelection {
            sender_voice: "a".to_string(),
            receiver_voice: "b".to_string(),
        }
    }

    /// Scripted synthesizer: fixed durations per call, optional failure at a
    /// given call index.
    struct Scripted {
        durations: Vec<u64>,
        fail_at: Option<usize>,
        calls: usize,
    }

    impl SpeechSynthesizer for Scripted {
        fn synthesize(&mut self, _text: &str, _voice: &str) -> ChatreelResult<SynthesizedClip> {
            let i = self.calls;
            self.calls += 1;
            if self.fail_at == Some(i) {
                return Err(ChatreelError::synthesis("service unavailable"));
            }
            let duration_ms = self.durations[i];
            Ok(SynthesizedClip {
                audio: vec![0xAB; 8],
                duration_ms,
            })
        }

        fn audio_format(&self) -> AudioFormat {
            AudioFormat::Mp3
        }
    }

    #[test]
    fn delays_come_from_measured_durations() {
        let msgs = vec![msg("a", "one"), msg("b", "two")];
        let mut synth = Scripted {
            durations: vec![1234, 2000],
            fail_at: None,
            calls: 0,
        };
        let script =
            build_voiced_script(&msgs, &voices(), &mut synth, &CancelToken::new()).unwrap();

        let delays: Vec<f64> = script
            .messages
            .iter()
            .map(|m| m.delay_seconds.unwrap())
            .collect();
        assert_eq!(delays, vec![1.23, 2.0]);
        assert_eq!(script.duration_ms, 3234);
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.segments[0].duration_ms, 1234);
    }

    #[test]
    fn delay_floor_avoids_zero_length_reveal() {
        assert_eq!(voiced_delay_seconds(0), 0.01);
        assert_eq!(voiced_delay_seconds(3), 0.01);
        assert_eq!(voiced_delay_seconds(15), 0.02);
        assert_eq!(voiced_delay_seconds(1234), 1.23);
        assert_eq!(voiced_delay_seconds(2000), 2.0);
    }

    #[test]
    fn failure_aborts_whole_attempt() {
        let msgs: Vec<Message> = (0..5).map(|i| msg(&format!("m{i}"), "text")).collect();
        let mut synth = Scripted {
            durations: vec![100; 5],
            fail_at: Some(1),
            calls: 0,
        };
        let err =
            build_voiced_script(&msgs, &voices(), &mut synth, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ChatreelError::Synthesis(_)));
        // Strictly sequential: the failing call stops further requests.
        assert_eq!(synth.calls, 2);
    }

    #[test]
    fn cancel_stops_before_next_request() {
        let msgs = vec![msg("a", "x"), msg("b", "y")];
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut synth = Scripted {
            durations: vec![100, 100],
            fail_at: None,
            calls: 0,
        };
        let err = build_voiced_script(&msgs, &voices(), &mut synth, &cancel).unwrap_err();
        assert!(matches!(err, ChatreelError::Canceled));
        assert_eq!(synth.calls, 0);
    }

    #[test]
    fn only_delays_change_on_messages() {
        let mut original = msg("a", "hello");
        original.read_receipt = Some("Read".to_string());
        let mut synth = Scripted {
            durations: vec![500],
            fail_at: None,
            calls: 0,
        };
        let script = build_voiced_script(
            std::slice::from_ref(&original),
            &voices(),
            &mut synth,
            &CancelToken::new(),
        )
        .unwrap();
        let out = &script.messages[0];
        assert_eq!(out.id, original.id);
        assert_eq!(out.text, original.text);
        assert_eq!(out.read_receipt, original.read_receipt);
        assert_eq!(out.delay_seconds, Some(0.5));
    }
}
