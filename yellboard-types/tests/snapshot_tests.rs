use pretty_assertions::assert_eq;
use yellboard_types::{missing, LibrarySnapshot, SoundEntry, TypesError};

fn snapshot(paths: &[&str]) -> LibrarySnapshot {
    paths.iter().map(|p| SoundEntry::new(*p)).collect()
}

#[test]
fn missing_is_remote_minus_local() {
    let local = snapshot(&["a.wav", "b.wav"]);
    let remote = snapshot(&["b.wav", "c.wav", "d.wav"]);
    let diff: Vec<String> = missing(&local, &remote)
        .into_iter()
        .map(SoundEntry::into_path)
        .collect();
    assert_eq!(diff, vec!["c.wav".to_string(), "d.wav".to_string()]);
}

#[test]
fn missing_against_self_is_empty() {
    let s = snapshot(&["a.wav", "B.wav", "c.wav"]);
    assert!(missing(&s, &s).is_empty());
}

#[test]
fn missing_is_case_sensitive() {
    let local = snapshot(&["Kick.wav"]);
    let remote = snapshot(&["kick.wav"]);
    let diff = missing(&local, &remote);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff.iter().next().unwrap().path(), "kick.wav");
}

#[test]
fn serialize_sorts_case_insensitively() {
    let s = snapshot(&["zap.wav", "Bell.wav", "alarm.wav"]);
    let json = String::from_utf8(s.to_json_vec().unwrap()).unwrap();
    assert_eq!(
        json,
        r#"[{"Path":"alarm.wav"},{"Path":"Bell.wav"},{"Path":"zap.wav"}]"#
    );
}

#[test]
fn serialize_breaks_case_ties_deterministically() {
    let a = snapshot(&["a.wav", "A.wav"]);
    let b = snapshot(&["A.wav", "a.wav"]);
    assert_eq!(a.to_json_vec().unwrap(), b.to_json_vec().unwrap());
    assert_eq!(a.len(), 2);
}

#[test]
fn serialize_empty_snapshot() {
    assert_eq!(LibrarySnapshot::empty().to_json_vec().unwrap(), b"[]".to_vec());
}

#[test]
fn deserialize_collapses_duplicates() {
    let s = LibrarySnapshot::from_json_slice(
        br#"[{"Path":"a.wav"},{"Path":"a.wav"},{"Path":"b.wav"}]"#,
    )
    .unwrap();
    assert_eq!(s.len(), 2);
    assert!(s.contains_path("a.wav"));
    assert!(s.contains_path("b.wav"));
}

#[test]
fn deserialize_accepts_lowercase_key() {
    let s = LibrarySnapshot::from_json_slice(br#"[{"path":"b.wav"},{"path":"a.wav"}]"#).unwrap();
    assert_eq!(s, snapshot(&["a.wav", "b.wav"]));
}

#[test]
fn deserialize_rejects_malformed_input() {
    let inputs: [&[u8]; 4] = [
        b"not json",
        br#"{"Path":"a.wav"}"#,
        br#"[{"name":"a.wav"}]"#,
        b"[1,2]",
    ];
    for bad in inputs {
        let err = LibrarySnapshot::from_json_slice(bad).unwrap_err();
        assert!(matches!(err, TypesError::Serialization(_)), "input {bad:?}");
    }
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn names() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[A-Za-z0-9_]{1,8}\\.(wav|mp3|WAV)", 0..24)
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_membership(paths in names()) {
            let s: LibrarySnapshot = paths.iter().cloned().map(SoundEntry::new).collect();
            let back = LibrarySnapshot::from_json_slice(&s.to_json_vec().unwrap()).unwrap();
            prop_assert_eq!(back, s);
        }

        #[test]
        fn serialization_ignores_insertion_order(paths in names()) {
            let forward: LibrarySnapshot = paths.iter().cloned().map(SoundEntry::new).collect();
            let reversed: LibrarySnapshot =
                paths.iter().rev().cloned().map(SoundEntry::new).collect();
            prop_assert_eq!(forward.to_json_vec().unwrap(), reversed.to_json_vec().unwrap());
        }

        #[test]
        fn missing_matches_set_difference(a in names(), b in names()) {
            let local: LibrarySnapshot = a.iter().cloned().map(SoundEntry::new).collect();
            let remote: LibrarySnapshot = b.iter().cloned().map(SoundEntry::new).collect();
            let diff = missing(&local, &remote);
            for entry in diff.iter() {
                prop_assert!(remote.contains(entry));
                prop_assert!(!local.contains(entry));
            }
            let expected = remote.iter().filter(|e| !local.contains(e)).count();
            prop_assert_eq!(diff.len(), expected);
            prop_assert!(missing(&remote, &remote).is_empty());
        }
    }
}
