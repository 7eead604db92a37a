use pretty_assertions::assert_eq;
use yellboard_types::{
    GroupId, LibrarySnapshot, ServerFrame, SoundEntry, TypesError, PARTIAL_PREFIX,
};

#[test]
fn group_topics_are_scoped_by_id() {
    let group = GroupId::new("QmaGkAk6ZgMnJGiLuo").unwrap();
    let topics = group.topics();
    assert_eq!(topics.listing, "QmaGkAk6ZgMnJGiLuo.sounds");
    assert_eq!(topics.payload, "QmaGkAk6ZgMnJGiLuo.sounds.payload");
    assert_eq!(topics.playback, "QmaGkAk6ZgMnJGiLuo.playback");
}

#[test]
fn group_id_rejects_unusable_names() {
    for bad in ["", ".", "..", "a/b", "a\\b", "with space", "wild*", "tail>"] {
        assert!(
            matches!(GroupId::new(bad), Err(TypesError::InvalidGroupId(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn group_id_deserialize_validates() {
    let ok: GroupId = serde_json::from_str("\"office\"").unwrap();
    assert_eq!(ok.as_str(), "office");
    assert!(serde_json::from_str::<GroupId>("\"../etc\"").is_err());
}

#[test]
fn plain_file_names() {
    assert!(SoundEntry::new("airhorn.wav").is_plain_file_name());
    assert!(SoundEntry::new(".hidden.wav").is_plain_file_name());
    for bad in ["", ".", "..", "../secret", "dir/a.wav", "dir\\a.wav", "nul\0.wav"] {
        assert!(!SoundEntry::new(bad).is_plain_file_name(), "{bad:?}");
        assert!(matches!(SoundEntry::parse(bad), Err(TypesError::InvalidPath(_))));
    }
}

#[test]
fn partial_file_names_are_not_clips() {
    let name = format!("{PARTIAL_PREFIX}0f62fb0f-horn.wav");
    assert!(!SoundEntry::new(name.as_str()).is_plain_file_name());
    assert!(matches!(SoundEntry::parse(name), Err(TypesError::InvalidPath(_))));
    // Only the prefix is reserved.
    assert!(SoundEntry::new("horn.partial-1.wav").is_plain_file_name());
}

#[test]
fn entry_ordering_is_case_insensitive() {
    let mut entries = vec![
        SoundEntry::new("b.wav"),
        SoundEntry::new("C.wav"),
        SoundEntry::new("a.wav"),
    ];
    entries.sort();
    let paths: Vec<&str> = entries.iter().map(SoundEntry::path).collect();
    assert_eq!(paths, vec!["a.wav", "b.wav", "C.wav"]);
}

#[test]
fn salutation_frame_encoding() {
    let frame = ServerFrame::Salutation("hello, moto #office".into());
    assert_eq!(frame.to_json().unwrap(), r#"{"salutation":"hello, moto #office"}"#);
}

#[test]
fn playing_frame_encoding() {
    let frame = ServerFrame::Playing("airhorn.wav".into());
    assert_eq!(frame.to_json().unwrap(), r#"{"playing":"airhorn.wav"}"#);
}

#[test]
fn sounds_frame_encoding() {
    let snapshot: LibrarySnapshot = ["b.wav", "a.wav"].into_iter().map(SoundEntry::from).collect();
    let frame = ServerFrame::Sounds(snapshot);
    assert_eq!(
        frame.to_json().unwrap(),
        r#"{"sounds":[{"Path":"a.wav"},{"Path":"b.wav"}]}"#
    );
}
