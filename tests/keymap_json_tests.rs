use keymapping::config::QueryConfig;
use keymapping::keymap::{KeyMap, KeyValue, KeyboardLayoutInfo};
use keymapping::keys::{ModifierState, Platform, PhysicalKey};
use keymapping::service::KeyboardService;
use keymapping::source::FixtureSource;
use serde_json::{json, Value};
use std::sync::Arc;
use strum::EnumCount;

fn french_map() -> KeyMap {
    let source = FixtureSource::new(Platform::X11)
        .with_literal(PhysicalKey::KeyQ, ModifierState::None, "a")
        .with_literal(PhysicalKey::KeyQ, ModifierState::Shift, "A")
        .with_dead_key(PhysicalKey::BracketLeft, ModifierState::None, '^');
    KeyboardService::new(Arc::new(source), QueryConfig::default())
        .unwrap()
        .get_key_map()
}

#[test]
fn test_entry_shape() {
    let value = serde_json::to_value(french_map()).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), PhysicalKey::COUNT);
    assert_eq!(entries[0]["code"], "KeyA");

    let q = entries
        .iter()
        .find(|e| e["code"] == "KeyQ")
        .unwrap();
    assert_eq!(
        q,
        &json!({
            "code": "KeyQ",
            "none": { "kind": "literal", "value": "a" },
            "shift": { "kind": "literal", "value": "A" },
        })
    );

    let bracket = entries
        .iter()
        .find(|e| e["code"] == "BracketLeft")
        .unwrap();
    assert_eq!(
        bracket["none"],
        json!({ "kind": "dead", "value": { "accent": "^" } })
    );
}

#[test]
fn test_unassigned_entry_shape() {
    let value = serde_json::to_value(KeyMap::empty()).unwrap();
    assert_eq!(
        value[0],
        json!({ "code": "KeyA", "none": { "kind": "unassigned" } })
    );
}

#[test]
fn test_vkey_serialized_only_when_known() {
    let source = FixtureSource::new(Platform::Windows)
        .with_literal(PhysicalKey::KeyQ, ModifierState::None, "q")
        .with_vkey(PhysicalKey::KeyQ, 0x51)
        .with_literal(PhysicalKey::KeyW, ModifierState::None, "w");
    let map = KeyboardService::new(Arc::new(source), QueryConfig::default())
        .unwrap()
        .get_key_map();
    let value = serde_json::to_value(map).unwrap();
    let entries = value.as_array().unwrap();

    let q = entries.iter().find(|e| e["code"] == "KeyQ").unwrap();
    assert_eq!(
        q,
        &json!({
            "code": "KeyQ",
            "vkey": 81,
            "none": { "kind": "literal", "value": "q" },
        })
    );
    let w = entries.iter().find(|e| e["code"] == "KeyW").unwrap();
    assert!(w.get("vkey").is_none());
}

#[test]
fn test_key_value_round_trip() {
    for v in [
        KeyValue::literal("é"),
        KeyValue::Dead { accent: None },
        KeyValue::Unassigned,
    ] {
        let text = serde_json::to_string(&v).unwrap();
        assert_eq!(serde_json::from_str::<KeyValue>(&text).unwrap(), v);
    }
}

#[test]
fn test_layout_info_is_camel_case() {
    let info = KeyboardLayoutInfo::new("com.apple.keylayout.US", "U.S.");
    let value: Value = serde_json::to_value(&info).unwrap();
    assert_eq!(
        value,
        json!({ "id": "com.apple.keylayout.US", "displayName": "U.S." })
    );
}
