use chatreel::{RenderManifest, build_schedule, present};

/// Manifest as the editor writes it: only the fields the user touched,
/// everything else defaulted.
const MINIMAL: &str = r#"{
  "canvas": { "width": 1080, "height": 1920, "fps": 30 },
  "messages": [
    { "id": "m0", "speaker": "sender", "text": "you up?", "delay_seconds": 2.0 },
    { "id": "m1", "speaker": "receiver", "text": "barely", "tapback": "haha" },
    { "id": "m2", "speaker": "sender", "text": "good", "read_receipt": "Read 9:41 AM" }
  ]
}"#;

#[test]
fn minimal_manifest_parses_with_defaults() {
    let m = RenderManifest::from_json(MINIMAL).unwrap();
    m.validate().unwrap();

    assert_eq!(m.messages.len(), 3);
    assert_eq!(m.background.rgb, [0, 0, 0]);
    assert_eq!(m.layout, chatreel::LayoutSettings::default());
    assert_eq!(m.meta.time_label, "");

    let schedule = build_schedule(&m.messages);
    let at: Vec<u64> = schedule.iter().map(|e| e.reveal_at_ms).collect();
    assert_eq!(at, vec![0, 2000, 5000]); // default 3s for the undelayed message
}

#[test]
fn manifest_roundtrip_preserves_surface_output() {
    let m = RenderManifest::from_json(MINIMAL).unwrap();
    let reparsed = RenderManifest::from_json(&m.to_json().unwrap()).unwrap();
    assert_eq!(reparsed, m);

    // The downloaded manifest is a standalone recipe: re-reading it must
    // reproduce the exact visual state at any time.
    for t in [0.0, 1999.0, 2004.0, 5000.0, 60_000.0] {
        assert_eq!(present(&reparsed, t), present(&m, t));
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let bad = MINIMAL.replace("\"m1\"", "\"m0\"");
    let m = RenderManifest::from_json(&bad).unwrap();
    let err = m.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate message id"));
}

#[test]
fn unknown_speaker_is_a_parse_error() {
    let bad = MINIMAL.replace("\"receiver\"", "\"narrator\"");
    assert!(RenderManifest::from_json(&bad).is_err());
}

#[test]
fn out_of_range_layout_values_render_clamped_not_rejected() {
    let wild = r#"{
      "canvas": { "width": 390, "height": 780, "fps": 30 },
      "layout": { "bubble_font_size": 10000.0, "max_bubble_width_ratio": 9.0 },
      "messages": [
        { "id": "m0", "speaker": "sender", "text": "hi" }
      ]
    }"#;
    let m = RenderManifest::from_json(wild).unwrap();
    m.validate().unwrap();

    let frame = present(&m, 1_000.0);
    let b = &frame.bubbles[0];
    // Clamped to the layout ceiling (64pt at reference scale), not the wild value.
    assert!(b.font_size_px <= 64.0 + 1e-9);
    assert!(b.width_px <= 390.0 * 0.95 + 1e-6);
}
