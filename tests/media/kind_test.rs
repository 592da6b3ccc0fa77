//! MIME classification helpers.

use chatbridge::media::{mime_subtype, MediaKind, MediaPayload};

#[test]
fn classifies_by_top_level_type() {
    assert_eq!(MediaKind::from_mime("audio/ogg"), MediaKind::Audio);
    assert_eq!(MediaKind::from_mime("image/jpeg"), MediaKind::Image);
    assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Other);
    assert_eq!(MediaKind::from_mime(""), MediaKind::Other);
}

#[test]
fn subtype_drops_parameters() {
    assert_eq!(mime_subtype("audio/ogg; codecs=opus"), "ogg");
    assert_eq!(mime_subtype("audio/x-wav"), "x-wav");
    assert_eq!(mime_subtype("mpeg"), "mpeg");
}

#[test]
fn payload_debug_hides_bytes() {
    let payload = MediaPayload::new(vec![1, 2, 3], "image/png");
    let debug = format!("{payload:?}");
    assert!(debug.contains("len: 3"));
    assert!(!debug.contains("[1, 2, 3]"));
}
