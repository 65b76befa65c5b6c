use super::*;

fn sample_frame() -> Frame {
    Frame::new(
        "id-1",
        7,
        42,
        SCENE_SYNC,
        serde_json::json!({
            "zoom": 1.25,
            "showGrid": true,
            "tokens": [{"name": "Goblin", "x": 3, "y": 4}],
            "nested": {"k": "v"},
            "fogData": null
        }),
    )
    .with_from("dm")
}

#[test]
fn encode_decode_round_trip_preserves_frame() {
    let frame = sample_frame();
    let bytes = encode_frame(&frame);
    let decoded = decode_frame(&bytes).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn encode_frame_outputs_non_empty_binary() {
    let bytes = encode_frame(&sample_frame());
    assert!(!bytes.is_empty());
}

#[test]
fn decode_rejects_garbage() {
    let err = decode_frame(&[0xff, 0xff, 0xff]).expect_err("garbage should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_rejects_empty_syscall() {
    let frame = Frame::new("id", 1, 0, "", serde_json::json!({}));
    let bytes = encode_frame(&frame);
    let err = decode_frame(&bytes).expect_err("empty syscall should fail");
    assert!(matches!(err, CodecError::MissingSyscall));
}

#[test]
fn integral_numbers_survive_as_integers() {
    let frame = Frame::new("id", 1, 0, SCENE_SYNC, serde_json::json!({"x": 5, "hp": 0}));
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data["x"].as_i64(), Some(5));
    assert_eq!(decoded.data["hp"].as_i64(), Some(0));
}

#[test]
fn fractional_numbers_stay_floats() {
    let frame = Frame::new("id", 1, 0, SCENE_SYNC, serde_json::json!({"panX": -0.125}));
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data["panX"].as_f64(), Some(-0.125));
}

#[test]
fn prefix_splits_on_colon() {
    assert_eq!(sample_frame().prefix(), "scene");
    let hello = Frame::new("id", 0, 0, VIEWER_HELLO, serde_json::json!({}));
    assert_eq!(hello.prefix(), "viewer");
}

#[test]
fn is_scene_sync_matches_only_sync_syscall() {
    assert!(sample_frame().is_scene_sync());
    let hello = Frame::new("id", 0, 0, VIEWER_HELLO, serde_json::json!({}));
    assert!(!hello.is_scene_sync());
}

#[test]
fn missing_data_decodes_as_empty_object() {
    let wire = WireFrame {
        id: "x".into(),
        seq: 1,
        ts: 0,
        from: None,
        syscall: SCENE_SYNC.into(),
        data: None,
    };
    let frame = wire_to_frame(wire);
    assert_eq!(frame.data, serde_json::json!({}));
}
