//! The query service: bounded OS calls, normalization and error recovery.

use crate::config::QueryConfig;
use crate::error::{ErrorHook, KeymapError, KmResult};
use crate::keymap::{layout_name, KeyMap, KeyboardLayoutInfo};
use crate::keys::Platform;
use crate::normalizer;
use crate::scancodes::ScanCodeTable;
use crate::source::{KeyboardSource, RawKeyData};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
enum Query {
    KeyMap,
    Layout,
    IsoKeyboard,
}

impl Query {
    const COUNT: usize = 3;

    fn thread_name(self) -> &'static str {
        match self {
            Query::KeyMap => "keymap-query",
            Query::Layout => "layout-query",
            Query::IsoKeyboard => "iso-query",
        }
    }
}

/// Marks a query kind busy until the worker holding it exits.
struct InFlight {
    slots: Arc<[AtomicBool; Query::COUNT]>,
    query: Query,
}

impl InFlight {
    fn claim(slots: &Arc<[AtomicBool; Query::COUNT]>, query: Query) -> Option<Self> {
        if slots[query as usize].swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self {
            slots: Arc::clone(slots),
            query,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.slots[self.query as usize].store(false, Ordering::Release);
    }
}

/// Clones share the source, the table and the in-flight slots.
#[derive(Clone)]
pub struct KeyboardService {
    source: Arc<dyn KeyboardSource>,
    table: Arc<ScanCodeTable>,
    config: QueryConfig,
    hook: Option<ErrorHook>,
    in_flight: Arc<[AtomicBool; Query::COUNT]>,
}

impl KeyboardService {
    /// Fails only when the scan-code table for the source's platform is
    /// inconsistent, or the config is invalid.
    pub fn new(source: Arc<dyn KeyboardSource>, config: QueryConfig) -> KmResult<Self> {
        config.validate()?;
        let table = ScanCodeTable::for_platform(source.platform())?;
        Ok(Self {
            source,
            table: Arc::new(table),
            config,
            hook: None,
            in_flight: Arc::new(Default::default()),
        })
    }

    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn platform(&self) -> Platform {
        self.source.platform()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn scan_codes(&self) -> &ScanCodeTable {
        &self.table
    }

    /// Reads and normalizes the active layout's key map, surfacing failures.
    pub fn try_key_map(&self) -> KmResult<KeyMap> {
        let raw = self.bounded(Query::KeyMap, |source, table| source.raw_key_data(table))?;
        self.report_unresolved(&raw);
        Ok(normalizer::normalize(&raw))
    }

    pub fn try_current_layout(&self) -> KmResult<Option<KeyboardLayoutInfo>> {
        self.bounded(Query::Layout, |source, _| source.current_layout())
    }

    /// `Ok(None)` when the platform cannot tell the physical keyboard type.
    pub fn try_is_iso_keyboard(&self) -> KmResult<Option<bool>> {
        self.bounded(Query::IsoKeyboard, |source, _| source.is_iso_keyboard())
    }

    /// The key map, or the empty sentinel when the OS cannot be queried.
    pub fn get_key_map(&self) -> KeyMap {
        self.try_key_map().unwrap_or_else(|e| {
            self.recover(&e);
            KeyMap::empty()
        })
    }

    /// The active layout, or `None` when it cannot be determined.
    pub fn get_current_keyboard_layout(&self) -> Option<KeyboardLayoutInfo> {
        self.try_current_layout().unwrap_or_else(|e| {
            self.recover(&e);
            None
        })
    }

    /// Whether the keyboard has the ISO shape (extra key left of Z);
    /// `None` when unknown or unreadable.
    pub fn is_iso_keyboard(&self) -> Option<bool> {
        self.try_is_iso_keyboard().unwrap_or_else(|e| {
            self.recover(&e);
            None
        })
    }

    /// Display name of the active layout; empty when unknown.
    pub fn get_current_keyboard_layout_name(&self) -> String {
        layout_name(self.get_current_keyboard_layout().as_ref())
    }

    fn recover(&self, err: &KeymapError) {
        warn!("Keyboard query failed: {}", err);
        if let Some(hook) = &self.hook {
            hook(err);
        }
    }

    fn report_unresolved(&self, raw: &RawKeyData) {
        let unresolved: Vec<_> = raw.unresolved().collect();
        if unresolved.is_empty() {
            return;
        }
        debug!("{} key/modifier pairs could not be translated", unresolved.len());

        if !self.config.report_unresolved {
            return;
        }
        if let Some(hook) = &self.hook {
            for (key, modifiers) in unresolved {
                hook(&KeymapError::TranslationUnresolved { key, modifiers });
            }
        }
    }

    /// Runs `query` on a worker thread and waits at most the configured
    /// timeout. A worker that overruns is left to finish on its own and its
    /// result is dropped; until it exits, further queries of the same kind
    /// fail with `Timeout` without starting another worker.
    ///
    /// With `run_inline` the query runs on the calling thread, unbounded.
    fn bounded<T, F>(&self, query_kind: Query, query: F) -> KmResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyboardSource, &ScanCodeTable) -> KmResult<T> + Send + 'static,
    {
        if self.config.run_inline {
            return query(self.source.as_ref(), &self.table);
        }

        let name = query_kind.thread_name();
        let timeout = self.config.timeout();
        let Some(in_flight) = InFlight::claim(&self.in_flight, query_kind) else {
            debug!("{} from an earlier call is still running", name);
            return Err(KeymapError::Timeout(timeout));
        };

        let source = Arc::clone(&self.source);
        let table = Arc::clone(&self.table);
        let (tx, rx) = mpsc::channel();

        let started = Instant::now();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = query(source.as_ref(), &table);
                // Free the slot before answering so the caller's next query can claim it.
                drop(in_flight);
                let _ = tx.send(result);
            })
            .map_err(|e| KeymapError::unavailable(format!("cannot spawn {}: {}", name, e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => {
                debug!("{} finished in {:?}", name, started.elapsed());
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(KeymapError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(KeymapError::unavailable(format!(
                "{} worker exited without answering",
                name
            ))),
        }
    }
}

impl std::fmt::Debug for KeyboardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardService")
            .field("platform", &self.platform())
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
