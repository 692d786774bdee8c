//! Process-wide facade over a single [`KeyboardService`].
//!
//! The platform source is selected on first use and cached. Hosts that want
//! different behaviour install their own source with [`install_source`].

use crate::config::QueryConfig;
use crate::error::{ErrorHook, KeymapError, KmResult};
use crate::keymap::{layout_name, KeyMap, KeyboardLayoutInfo};
use crate::keys::Platform;
use crate::service::KeyboardService;
use crate::source::{self, KeyboardSource};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info};

enum GlobalState {
    Uninitialized,
    Ready(KeyboardService),
    Unavailable(String),
}

/// Observable state of the process-wide service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Uninitialized,
    Ready(Platform),
    Unavailable(String),
}

static STATE: RwLock<GlobalState> = RwLock::new(GlobalState::Uninitialized);
static HOOK: RwLock<Option<ErrorHook>> = RwLock::new(None);

fn read_state() -> RwLockReadGuard<'static, GlobalState> {
    STATE.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state() -> RwLockWriteGuard<'static, GlobalState> {
    STATE.write().unwrap_or_else(PoisonError::into_inner)
}

fn status_of(state: &GlobalState) -> SourceStatus {
    match state {
        GlobalState::Uninitialized => SourceStatus::Uninitialized,
        GlobalState::Ready(service) => SourceStatus::Ready(service.platform()),
        GlobalState::Unavailable(reason) => SourceStatus::Unavailable(reason.clone()),
    }
}

/// Hands recovered errors to whichever hook is installed at call time, so
/// `set_error_hook` also applies to a service built earlier.
fn forwarding_hook() -> ErrorHook {
    Arc::new(notify)
}

fn notify(err: &KeymapError) {
    let hook = HOOK.read().unwrap_or_else(PoisonError::into_inner).clone();
    if let Some(hook) = hook {
        hook(err);
    }
}

fn build(source: Arc<dyn KeyboardSource>, config: QueryConfig) -> (GlobalState, KmResult<()>) {
    let platform = source.platform();
    match KeyboardService::new(source, config) {
        Ok(service) => {
            info!("Keyboard source ready: {}", platform);
            (
                GlobalState::Ready(service.with_error_hook(forwarding_hook())),
                Ok(()),
            )
        }
        Err(e) => {
            error!("Cannot start {} keyboard source: {}", platform, e);
            (GlobalState::Unavailable(e.to_string()), Err(e))
        }
    }
}

fn select() -> (GlobalState, KmResult<()>) {
    match source::select_platform_source() {
        Some(source) => build(source, QueryConfig::from_env()),
        None => {
            info!("No keyboard source for this platform");
            (
                GlobalState::Unavailable("no keyboard source for this platform".to_string()),
                Ok(()),
            )
        }
    }
}

/// Selects the platform source if that has not happened yet.
///
/// Returns the resulting status. A scan-code table inconsistency is returned
/// as an error and also leaves the facade `Unavailable`.
pub fn initialize() -> KmResult<SourceStatus> {
    let mut state = write_state();
    if !matches!(*state, GlobalState::Uninitialized) {
        return Ok(status_of(&state));
    }
    let (next, result) = select();
    *state = next;
    result.map(|_| status_of(&state))
}

/// Discards the current service and selects the platform source again.
pub fn reinitialize() -> KmResult<SourceStatus> {
    let mut state = write_state();
    let (next, result) = select();
    *state = next;
    result.map(|_| status_of(&state))
}

/// Replaces the process-wide source, e.g. with a
/// [`FixtureSource`](crate::source::FixtureSource).
pub fn install_source(source: Arc<dyn KeyboardSource>, config: QueryConfig) -> KmResult<()> {
    let (next, result) = build(source, config);
    *write_state() = next;
    result
}

/// Installs (or with `None`, removes) the recovered-error hook.
pub fn set_error_hook(hook: Option<ErrorHook>) {
    *HOOK.write().unwrap_or_else(PoisonError::into_inner) = hook;
}

pub fn status() -> SourceStatus {
    status_of(&read_state())
}

fn current() -> Result<KeyboardService, String> {
    if let Some(found) = ready_or_reason(&read_state()) {
        return found;
    }
    if let Err(e) = initialize() {
        debug!("Lazy initialization failed: {}", e);
    }
    ready_or_reason(&read_state()).unwrap_or_else(|| Err("not initialized".to_string()))
}

fn ready_or_reason(state: &GlobalState) -> Option<Result<KeyboardService, String>> {
    match state {
        GlobalState::Uninitialized => None,
        GlobalState::Ready(service) => Some(Ok(service.clone())),
        GlobalState::Unavailable(reason) => Some(Err(reason.clone())),
    }
}

fn unavailable(reason: String) {
    let err = KeymapError::SourceUnavailable(reason);
    debug!("{}", err);
    notify(&err);
}

/// The active layout's key map; the empty map when the OS cannot be read.
pub fn get_key_map() -> KeyMap {
    match current() {
        Ok(service) => service.get_key_map(),
        Err(reason) => {
            unavailable(reason);
            KeyMap::empty()
        }
    }
}

pub fn get_current_keyboard_layout() -> Option<KeyboardLayoutInfo> {
    match current() {
        Ok(service) => service.get_current_keyboard_layout(),
        Err(reason) => {
            unavailable(reason);
            None
        }
    }
}

/// `Some(true)` for an ISO-shaped keyboard; `None` when the platform cannot tell.
pub fn is_iso_keyboard() -> Option<bool> {
    match current() {
        Ok(service) => service.is_iso_keyboard(),
        Err(reason) => {
            unavailable(reason);
            None
        }
    }
}

pub fn get_current_keyboard_layout_name() -> String {
    layout_name(get_current_keyboard_layout().as_ref())
}
