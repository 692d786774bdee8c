use keymapping::error::KeymapError;
use keymapping::keys::{Platform, PhysicalKey};
use keymapping::scancodes::{mac_virtual_key, windows_fixed_virtual_key, ScanCodeTable};
use rstest::rstest;
use strum::{EnumCount, IntoEnumIterator};

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_every_table_is_consistent(#[case] platform: Platform) {
    let table = ScanCodeTable::for_platform(platform).expect("table must be consistent");
    assert_eq!(table.platform(), platform);
    assert_eq!(table.entries().count(), PhysicalKey::COUNT);

    let keys: Vec<_> = table.entries().map(|(k, _)| k).collect();
    let canonical: Vec<_> = PhysicalKey::iter().collect();
    assert_eq!(keys, canonical);
}

#[rstest]
#[case(Platform::Windows, PhysicalKey::KeyA, Some(0x1e))]
#[case(Platform::Windows, PhysicalKey::NumpadEnter, Some(0xe01c))]
#[case(Platform::X11, PhysicalKey::KeyA, Some(38))]
#[case(Platform::X11, PhysicalKey::Space, Some(65))]
#[case(Platform::MacOs, PhysicalKey::KeyA, Some(0x00))]
#[case(Platform::MacOs, PhysicalKey::PrintScreen, None)]
fn test_known_codes(
    #[case] platform: Platform,
    #[case] key: PhysicalKey,
    #[case] expected: Option<u32>,
) {
    let table = ScanCodeTable::for_platform(platform).unwrap();
    assert_eq!(table.code(key), expected);
}

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_reverse_lookup_agrees(#[case] platform: Platform) {
    let table = ScanCodeTable::for_platform(platform).unwrap();
    for (key, code) in table.entries() {
        if let Some(code) = code {
            assert_eq!(table.key_for_code(code), Some(key), "{} on {}", key, platform);
        }
    }
}

#[test]
fn test_windows_and_x11_cover_every_key() {
    for platform in [Platform::Windows, Platform::X11] {
        let table = ScanCodeTable::for_platform(platform).unwrap();
        assert_eq!(table.mapped_count(), PhysicalKey::COUNT, "{}", platform);
    }
}

#[test]
fn test_macos_lacks_only_pc_keys() {
    let missing: Vec<_> = PhysicalKey::iter()
        .filter(|k| mac_virtual_key(*k).is_none())
        .collect();
    assert_eq!(
        missing,
        vec![
            PhysicalKey::PrintScreen,
            PhysicalKey::ScrollLock,
            PhysicalKey::Pause
        ]
    );
}

#[test]
fn test_duplicate_code_is_consistency_error() {
    let result = ScanCodeTable::from_fn(Platform::X11, |key| match key {
        PhysicalKey::KeyA | PhysicalKey::KeyB => Some(38),
        _ => None,
    });

    match result {
        Err(KeymapError::Consistency(msg)) => {
            assert!(msg.contains("KeyA"), "{}", msg);
            assert!(msg.contains("KeyB"), "{}", msg);
        }
        other => panic!("expected a consistency error, got {:?}", other),
    }
}

#[test]
fn test_consistency_is_not_recoverable() {
    let err = KeymapError::Consistency("x".into());
    assert!(!err.is_recoverable());
    assert!(KeymapError::SourceUnavailable("x".into()).is_recoverable());
}

#[rstest]
#[case(PhysicalKey::Numpad0, Some(0x60))]
#[case(PhysicalKey::Numpad5, Some(0x65))]
#[case(PhysicalKey::Numpad9, Some(0x69))]
#[case(PhysicalKey::NumpadDecimal, Some(0x6e))]
#[case(PhysicalKey::NumpadEnter, None)]
#[case(PhysicalKey::NumpadAdd, None)]
#[case(PhysicalKey::KeyA, None)]
fn test_numpad_virtual_keys_ignore_numlock(
    #[case] key: PhysicalKey,
    #[case] expected: Option<u32>,
) {
    assert_eq!(windows_fixed_virtual_key(key), expected);
}
