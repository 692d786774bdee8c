use keymapping::config::QueryConfig;
use keymapping::error::{ErrorHook, KeymapError};
use keymapping::keymap::{KeyValue, KeyboardLayoutInfo};
use keymapping::keys::{ModifierState, Platform, PhysicalKey};
use keymapping::service::KeyboardService;
use keymapping::source::{FixtureSource, RawOutput};
use rstest::rstest;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use strum::EnumCount;

use PhysicalKey::*;

const TOP_ROW: [PhysicalKey; 10] = [KeyQ, KeyW, KeyE, KeyR, KeyT, KeyY, KeyU, KeyI, KeyO, KeyP];
const HOME_ROW: [PhysicalKey; 9] = [KeyA, KeyS, KeyD, KeyF, KeyG, KeyH, KeyJ, KeyK, KeyL];

fn us_layout(platform: Platform) -> FixtureSource {
    FixtureSource::new(platform)
        .with_layout("en-US", "U.S.")
        .with_rows(&TOP_ROW, "qwertyuiop", "QWERTYUIOP")
        .with_rows(&HOME_ROW, "asdfghjkl", "ASDFGHJKL")
        .with_literal(Digit1, ModifierState::None, "1")
        .with_literal(Digit1, ModifierState::Shift, "!")
}

fn service(source: FixtureSource) -> KeyboardService {
    KeyboardService::new(Arc::new(source), QueryConfig::default()).unwrap()
}

fn recording_hook() -> (ErrorHook, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let hook: ErrorHook = Arc::new(move |e: &KeymapError| {
        sink.lock().unwrap().push(e.to_string());
    });
    (hook, seen)
}

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_key_a_lower_and_upper(#[case] platform: Platform) {
    let map = service(us_layout(platform)).get_key_map();

    let a = map.get(KeyA).unwrap();
    assert_eq!(a.base(), &KeyValue::literal("a"));
    assert_eq!(a.value(ModifierState::Shift), Some(&KeyValue::literal("A")));
    assert_eq!(
        map.get(Digit1).unwrap().value(ModifierState::Shift),
        Some(&KeyValue::literal("!"))
    );
}

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_layout_round_trip(#[case] platform: Platform) {
    let svc = service(us_layout(platform));
    assert_eq!(
        svc.get_current_keyboard_layout(),
        Some(KeyboardLayoutInfo::new("en-US", "U.S."))
    );
    assert_eq!(svc.get_current_keyboard_layout_name(), "U.S.");
}

#[test]
fn test_one_entry_per_key_in_canonical_order() {
    let map = service(us_layout(Platform::Windows)).get_key_map();
    assert_eq!(map.len(), PhysicalKey::COUNT);
    for (i, entry) in map.iter().enumerate() {
        assert_eq!(entry.code.index(), i);
        assert!(entry.value(ModifierState::None).is_some());
    }
}

#[test]
fn test_queries_are_idempotent() {
    let svc = service(us_layout(Platform::X11));
    assert_eq!(svc.get_key_map(), svc.get_key_map());
    assert_eq!(
        svc.get_current_keyboard_layout(),
        svc.get_current_keyboard_layout()
    );
}

#[test]
fn test_same_layout_same_map_on_every_platform() {
    let windows = service(us_layout(Platform::Windows)).get_key_map();
    let x11 = service(us_layout(Platform::X11)).get_key_map();
    let mac = service(us_layout(Platform::MacOs)).get_key_map();
    assert_eq!(windows, x11);
    assert_eq!(windows, mac);
}

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_dead_key_on_every_platform(#[case] platform: Platform) {
    let source = us_layout(platform).with_dead_key(Quote, ModifierState::None, '^');
    let map = service(source).get_key_map();
    assert_eq!(
        map.get(Quote).unwrap().base(),
        &KeyValue::Dead {
            accent: Some("^".to_string())
        }
    );
}

#[rstest]
#[case(Platform::Windows)]
#[case(Platform::X11)]
#[case(Platform::MacOs)]
fn test_unavailable_source_degrades(#[case] platform: Platform) {
    let (hook, seen) = recording_hook();
    let svc = service(FixtureSource::unavailable(platform, "no display")).with_error_hook(hook);

    let map = svc.get_key_map();
    assert_eq!(map.len(), PhysicalKey::COUNT);
    assert!(map.is_empty_sentinel());
    assert_eq!(svc.get_current_keyboard_layout(), None);
    assert_eq!(svc.get_current_keyboard_layout_name(), "");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|m| m.contains("no display")));
}

#[test]
fn test_try_variants_surface_errors() {
    let svc = service(FixtureSource::unavailable(Platform::Windows, "locked"));
    assert!(matches!(
        svc.try_key_map(),
        Err(KeymapError::SourceUnavailable(_))
    ));
    assert!(matches!(
        svc.try_current_layout(),
        Err(KeymapError::SourceUnavailable(_))
    ));
}

#[test]
fn test_slow_source_times_out_within_bound() {
    let config = QueryConfig {
        timeout_ms: 50,
        ..QueryConfig::default()
    };
    let source = us_layout(Platform::Windows).with_delay(Duration::from_millis(1_000));
    let svc = KeyboardService::new(Arc::new(source), config).unwrap();

    let started = Instant::now();
    let result = svc.try_key_map();
    assert!(started.elapsed() < Duration::from_millis(800));
    assert!(matches!(result, Err(KeymapError::Timeout(d)) if d == Duration::from_millis(50)));

    let started = Instant::now();
    assert!(svc.get_key_map().is_empty_sentinel());
    assert!(svc.get_current_keyboard_layout().is_none());
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[test]
fn test_fast_source_beats_timeout() {
    let source = us_layout(Platform::MacOs).with_delay(Duration::from_millis(5));
    let svc = service(source);
    assert!(!svc.get_key_map().is_empty_sentinel());
}

#[test]
fn test_macos_option_fills_alt_and_altgr() {
    let source = FixtureSource::new(Platform::MacOs)
        .with_literal(KeyA, ModifierState::None, "a")
        .with_literal(KeyA, ModifierState::Alt, "å")
        .with_literal(KeyA, ModifierState::ShiftAlt, "Å")
        .with_literal(KeyA, ModifierState::AltGr, "å")
        .with_literal(KeyA, ModifierState::ShiftAltGr, "Å");
    let map = service(source).get_key_map();

    let a = map.get(KeyA).unwrap();
    assert_eq!(a.value(ModifierState::Alt), Some(&KeyValue::literal("å")));
    assert_eq!(a.value(ModifierState::ShiftAlt), Some(&KeyValue::literal("Å")));
    assert_eq!(a.value(ModifierState::Alt), a.value(ModifierState::AltGr));
    assert_eq!(a.value(ModifierState::ShiftAlt), a.value(ModifierState::ShiftAltGr));
}

#[test]
fn test_keys_absent_on_platform_are_unassigned() {
    let source = FixtureSource::new(Platform::MacOs).with_literal(
        PrintScreen,
        ModifierState::None,
        "p",
    );
    let map = service(source).get_key_map();
    assert_eq!(map.get(PrintScreen).unwrap().base(), &KeyValue::Unassigned);
}

#[rstest]
#[case(true, 1)]
#[case(false, 0)]
fn test_unresolved_cells_reach_hook_when_asked(#[case] report: bool, #[case] expected: usize) {
    let (hook, seen) = recording_hook();
    let config = QueryConfig {
        report_unresolved: report,
        ..QueryConfig::default()
    };
    let source = us_layout(Platform::Windows).with_raw(
        KeyA,
        ModifierState::AltGr,
        RawOutput::Unresolved,
    );
    let svc = KeyboardService::new(Arc::new(source), config)
        .unwrap()
        .with_error_hook(hook);

    let map = svc.get_key_map();
    assert_eq!(
        map.get(KeyA).unwrap().value(ModifierState::AltGr),
        Some(&KeyValue::Unassigned)
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), expected);
    if report {
        assert!(seen[0].contains("KeyA"));
    }
}

#[test]
fn test_zero_timeout_is_rejected() {
    let config = QueryConfig {
        timeout_ms: 0,
        ..QueryConfig::default()
    };
    let result = KeyboardService::new(Arc::new(FixtureSource::new(Platform::X11)), config);
    assert!(matches!(result, Err(KeymapError::Config(_))));
}

#[test]
fn test_overrunning_query_is_not_restarted() {
    let config = QueryConfig {
        timeout_ms: 10,
        ..QueryConfig::default()
    };
    let source = us_layout(Platform::Windows).with_delay(Duration::from_millis(400));
    let calls = source.clone();
    let svc = KeyboardService::new(Arc::new(source), config).unwrap();

    for _ in 0..40 {
        assert!(svc.get_key_map().is_empty_sentinel());
    }
    assert_eq!(calls.calls(), 1);

    // Layout queries have their own slot.
    assert!(svc.get_current_keyboard_layout().is_none());
    assert_eq!(calls.calls(), 2);

    thread::sleep(Duration::from_millis(700));
    assert!(matches!(svc.try_key_map(), Err(KeymapError::Timeout(_))));
    assert_eq!(calls.calls(), 3);
}

#[test]
fn test_clones_share_the_busy_slot() {
    let config = QueryConfig {
        timeout_ms: 10,
        ..QueryConfig::default()
    };
    let source = us_layout(Platform::X11).with_delay(Duration::from_millis(300));
    let calls = source.clone();
    let svc = KeyboardService::new(Arc::new(source), config).unwrap();
    let other = svc.clone();

    assert!(svc.try_key_map().is_err());
    assert!(other.try_key_map().is_err());
    assert_eq!(calls.calls(), 1);
}

#[test]
fn test_run_inline_ignores_timeout() {
    let config = QueryConfig {
        timeout_ms: 10,
        run_inline: true,
        ..QueryConfig::default()
    };
    let source = us_layout(Platform::MacOs).with_delay(Duration::from_millis(60));
    let svc = KeyboardService::new(Arc::new(source), config).unwrap();

    let map = svc.try_key_map().unwrap();
    assert_eq!(map.get(KeyA).unwrap().base(), &KeyValue::literal("a"));
    assert_eq!(svc.get_current_keyboard_layout_name(), "U.S.");
}

#[rstest]
#[case(Some(true))]
#[case(Some(false))]
#[case(None)]
fn test_iso_keyboard_reported(#[case] iso: Option<bool>) {
    let source = match iso {
        Some(iso) => us_layout(Platform::MacOs).with_iso_keyboard(iso),
        None => us_layout(Platform::Windows),
    };
    let svc = service(source);
    assert_eq!(svc.is_iso_keyboard(), iso);
    assert_eq!(svc.try_is_iso_keyboard().unwrap(), iso);
}

#[test]
fn test_iso_keyboard_unknown_when_unavailable() {
    let (hook, seen) = recording_hook();
    let source = FixtureSource::unavailable(Platform::MacOs, "no session");
    let svc = service(source).with_error_hook(hook);

    assert_eq!(svc.is_iso_keyboard(), None);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_virtual_keys_reach_the_map() {
    let source = us_layout(Platform::Windows)
        .with_vkey(KeyA, 0x41)
        .with_vkey(Numpad0, 0x60);
    let map = service(source).get_key_map();

    assert_eq!(map.get(KeyA).unwrap().vkey, Some(0x41));
    assert_eq!(map.get(Numpad0).unwrap().vkey, Some(0x60));
    assert_eq!(map.get(Numpad0).unwrap().base(), &KeyValue::Unassigned);
    assert_eq!(map.get(KeyS).unwrap().vkey, None);
}
