//! Timing and naming constants shared across the engine

/// Seconds to wait after each kill-escalation stage before escalating further
pub const DEFAULT_DEVICE_FORCE_QUIT_SEC: f64 = 0.5;

/// Default bounded-blocking timeout applied to remote references (milliseconds)
pub const DEFAULT_CLIENT_WAIT_MS: u64 = 10_000;

/// Bounded-blocking override used when releasing a device during shutdown
pub const DEVICE_RELEASE_TIMEOUT_MS: u64 = 3_000;

/// Backoff between naming-tree lookups while connecting to the domain manager
pub const DOMAIN_CONNECT_RETRY_MS: u64 = 10;

/// Backoff between device-manager registration attempts
pub const DOMAIN_REGISTER_RETRY_MS: u64 = 100;

/// A registration-retry warning is emitted every this many attempts
pub const REGISTER_RETRY_WARN_EVERY: u64 = 10;

/// Poll interval while waiting for a composite parent to register
pub const COMPOSITE_IOR_POLL_MS: u64 = 100;

/// Slice used by bounded waits on the pending sets
pub const PENDING_WAIT_SLICE_MS: u64 = 100;

/// Event stream carrying device identity changes for the node
pub const IDM_CHANNEL_NAME: &str = "IDM_Channel";

/// Mode for the per-node cache directory tree (rwx/rwx/r-x)
pub const CACHE_DIR_MODE: u32 = 0o775;
