//! Centralized limits and thresholds.

use std::time::Duration;

/// Positive cache TTL for a successfully-fetched class/function signature.
pub const SCHEMA_POSITIVE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Negative cache TTL for a kind that failed to resolve. Short, so a
/// transient catalogue outage self-heals.
pub const SCHEMA_NEGATIVE_TTL: Duration = Duration::from_secs(10 * 60);

/// Maximum number of scope lookup hops before we assume a cyclic parent
/// chain and bail rather than loop forever.
pub const MAX_SCOPE_WALK_ITERATIONS: usize = 10_000;

/// Maximum number of optimizer passes before giving up on reaching a fixed
/// point. The rewrite set is proven terminating so this is
/// a backstop against a regression, not a normal exit path.
pub const MAX_OPTIMIZER_PASSES: usize = 256;

/// Time parameters in the SMT encoding are seconds-since-midnight
///: `0 <= p <= 86400`.
pub const SMT_TIME_OF_DAY_MAX: i64 = 86_400;
