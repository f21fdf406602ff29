use crate::{core::MessageId, manifest::Message};

/// Delay applied when a message carries no explicit `delay_seconds`.
pub const DEFAULT_DELAY_MS: u64 = 3000;

/// Boundary slack when counting visible entries, absorbing float/clock jitter
/// so a bubble never flickers at its exact reveal time.
pub const REVEAL_TOLERANCE_MS: f64 = 5.0;

/// Derived reveal time for one message. Never hand-edited; rebuilt from the
/// message list whenever delays change.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ScheduleEntry {
    pub message_id: MessageId,
    pub reveal_at_ms: u64,
}

/// Map a message list to cumulative reveal times.
///
/// Entry `i` reveals at the sum of delays of messages `0..i`; a message's own
/// delay only pushes the *next* entry. Pure: same input, same output, no I/O.
pub fn build_schedule(messages: &[Message]) -> Vec<ScheduleEntry> {
    let mut out = Vec::with_capacity(messages.len());
    let mut at: u64 = 0;
    for m in messages {
        out.push(ScheduleEntry {
            message_id: m.id.clone(),
            reveal_at_ms: at,
        });
        at = at.saturating_add(m.delay_ms());
    }
    out
}

/// Count of entries revealed at `time_ms`. Monotonically non-decreasing in
/// `time_ms`; relies on `reveal_at_ms` being non-decreasing in list order.
pub fn visible_count(schedule: &[ScheduleEntry], time_ms: f64) -> usize {
    schedule
        .iter()
        .take_while(|e| (e.reveal_at_ms as f64) <= time_ms + REVEAL_TOLERANCE_MS)
        .count()
}

/// Total timeline length implied by a message list: every message revealed and
/// the last one held for its own delay.
pub fn total_duration_ms(messages: &[Message]) -> u64 {
    messages.iter().fold(0u64, |acc, m| acc.saturating_add(m.delay_ms()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MessageId, Speaker};

    fn msg(id: &str, delay: Option<f64>) -> Message {
        Message {
            id: MessageId::new(id),
            speaker: Speaker::Receiver,
            text: String::new(),
            delay_seconds: delay,
            read_receipt: None,
            tapback: None,
        }
    }

    #[test]
    fn cumulative_reveal_times() {
        let msgs = vec![msg("a", Some(2.0)), msg("b", Some(5.0)), msg("c", None)];
        let s = build_schedule(&msgs);
        let at: Vec<u64> = s.iter().map(|e| e.reveal_at_ms).collect();
        assert_eq!(at, vec![0, 2000, 7000]);
    }

    #[test]
    fn visible_count_boundaries() {
        let msgs = vec![msg("a", Some(2.0)), msg("b", Some(5.0)), msg("c", None)];
        let s = build_schedule(&msgs);
        assert_eq!(visible_count(&s, 2500.0), 2);
        assert_eq!(visible_count(&s, 6999.0), 2);
        assert_eq!(visible_count(&s, 7000.0), 3);
    }

    #[test]
    fn visible_count_is_monotone_in_time() {
        let msgs: Vec<Message> = (0..8)
            .map(|i| msg(&format!("m{i}"), Some(0.5 + (i as f64) * 0.25)))
            .collect();
        let s = build_schedule(&msgs);
        let mut prev = 0;
        for t in (0..12_000).step_by(7) {
            let n = visible_count(&s, t as f64);
            assert!(n >= prev, "count regressed at t={t}");
            prev = n;
        }
        assert_eq!(visible_count(&s, s.last().unwrap().reveal_at_ms as f64), 8);
    }

    #[test]
    fn negative_delay_clamps_to_zero() {
        let msgs = vec![msg("a", Some(-3.0)), msg("b", Some(1.0))];
        let s = build_schedule(&msgs);
        assert_eq!(s[1].reveal_at_ms, 0);
    }

    #[test]
    fn empty_list_is_not_an_error() {
        let s = build_schedule(&[]);
        assert!(s.is_empty());
        assert_eq!(visible_count(&s, 10_000.0), 0);
    }

    #[test]
    fn schedule_is_idempotent() {
        let msgs = vec![msg("a", Some(1.0)), msg("b", None)];
        assert_eq!(build_schedule(&msgs), build_schedule(&msgs));
        let s = build_schedule(&msgs);
        assert_eq!(visible_count(&s, 1234.0), visible_count(&s, 1234.0));
    }

    #[test]
    fn total_duration_sums_every_delay() {
        let msgs = vec![msg("a", Some(2.0)), msg("b", Some(5.0)), msg("c", None)];
        assert_eq!(total_duration_ms(&msgs), 10_000);
        assert_eq!(total_duration_ms(&[]), 0);
    }
}
