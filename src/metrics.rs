//! Process wide counters for the menu engine.
//! Read by `radiomenu status` and by tests; nothing is exported over the network yet.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static DISPLAYS: AtomicU64 = AtomicU64::new(0);
static RESPONSES: AtomicU64 = AtomicU64::new(0);
static CALLBACK_FAILURES: AtomicU64 = AtomicU64::new(0);
static MALFORMED_RETURNS: AtomicU64 = AtomicU64::new(0);
static BUILD_FAILURES: AtomicU64 = AtomicU64::new(0);
static SENDS_IGNORED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_CREATED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_DROPPED: AtomicU64 = AtomicU64::new(0);
static WORLD_RESETS: AtomicU64 = AtomicU64::new(0);

static KIND_DISPLAYS: OnceLock<Mutex<HashMap<String, u64>>> = OnceLock::new();

/// Count one rendered menu, both in total and per menu kind.
pub fn record_display(kind: &str) -> u64 {
    DISPLAYS.fetch_add(1, Ordering::Relaxed);
    let mut guard = kind_lock().lock().unwrap_or_else(|p| p.into_inner());
    let count = guard.entry(kind.to_string()).or_default();
    *count = count.saturating_add(1);
    *count
}

pub fn inc_responses() {
    RESPONSES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_callback_failures() {
    CALLBACK_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_malformed_returns() {
    MALFORMED_RETURNS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_build_failures() {
    BUILD_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sends_ignored() {
    SENDS_IGNORED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sessions_created() {
    SESSIONS_CREATED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sessions_dropped() {
    SESSIONS_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_world_resets() {
    WORLD_RESETS.fetch_add(1, Ordering::Relaxed);
}

fn kind_lock() -> &'static Mutex<HashMap<String, u64>> {
    KIND_DISPLAYS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn kind_displays_snapshot() -> HashMap<String, u64> {
    kind_lock().lock().unwrap_or_else(|p| p.into_inner()).clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub displays: u64,
    pub responses: u64,
    pub callback_failures: u64,
    pub malformed_returns: u64,
    pub build_failures: u64,
    pub sends_ignored: u64,
    pub sessions_created: u64,
    pub sessions_dropped: u64,
    pub world_resets: u64,
}

impl Snapshot {
    /// Sessions created and not yet dropped.
    pub fn live_sessions(&self) -> u64 {
        self.sessions_created.saturating_sub(self.sessions_dropped)
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        displays: DISPLAYS.load(Ordering::Relaxed),
        responses: RESPONSES.load(Ordering::Relaxed),
        callback_failures: CALLBACK_FAILURES.load(Ordering::Relaxed),
        malformed_returns: MALFORMED_RETURNS.load(Ordering::Relaxed),
        build_failures: BUILD_FAILURES.load(Ordering::Relaxed),
        sends_ignored: SENDS_IGNORED.load(Ordering::Relaxed),
        sessions_created: SESSIONS_CREATED.load(Ordering::Relaxed),
        sessions_dropped: SESSIONS_DROPPED.load(Ordering::Relaxed),
        world_resets: WORLD_RESETS.load(Ordering::Relaxed),
    }
}
