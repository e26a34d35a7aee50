//! System-wide default constants.
//!
//! Every tunable in [`SentinelConfig`](super::SentinelConfig) starts from one of
//! these. Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Sampling Loop
// ============================================================================

/// Interval between perturb-and-score cycles (ms).
pub const SAMPLING_INTERVAL_MS: u64 = 3_000;

// ============================================================================
// History
// ============================================================================

/// Number of verdicts retained before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 50;

// ============================================================================
// Remote Dispatcher
// ============================================================================

/// Upper bound on a remote scoring round trip (ms).
pub const REMOTE_TIMEOUT_MS: u64 = 10_000;

/// Upper bound on a remote health probe from the status endpoint (ms).
pub const HEALTH_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Artificial delay before answering from the local engine (ms).
///
/// Keeps the caller's loading state identical whichever path answered.
pub const FALLBACK_DELAY_MS: u64 = 1_500;
