// -
// Metric names

pub(crate) const HANDLE_OUT: &str = "handle_out";
pub(crate) const HANDLE_DROPPED: &str = "handle_dropped";
pub(crate) const CONCLUDE_OUT: &str = "conclude_out";
pub(crate) const CONCLUDE_DROPPED: &str = "conclude_dropped";
pub(crate) const HANDLE_PROCESSING_ERRORS: &str = "handle_processing_errors";
pub(crate) const CONCLUDE_PROCESSING_ERRORS: &str = "conclude_processing_errors";
pub(crate) const CURRENT_GROUP_COUNT: &str = "current_group_count";
pub(crate) const RECORDS_IN: &str = "records_in";
pub(crate) const RECORDS_OUT: &str = "records_out";
pub(crate) const TIME_ELAPSED: &str = "time_elapsed_seconds";

// -
// Configuration

/// Prefix for environment variable overrides, e.g. `AGGREGATE__WINDOW=30s`
pub(crate) const ENV_PREFIX: &str = "AGGREGATE";
pub(crate) const ENV_SEPARATOR: &str = "__";

/// Env var naming an optional configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Default group window in seconds
pub(crate) const DEFAULT_WINDOW_SECS: u64 = 180;

// -
// Built-in action defaults

pub(crate) const DEFAULT_COUNT_KEY: &str = "aggr._count";

/// Prefix of the fields the `histogram` action writes
pub(crate) const DEFAULT_GENERATED_KEY_PREFIX: &str = "aggr._";

/// Event type assigned to events produced by conclude
pub(crate) const AGGREGATED_EVENT_TYPE: &str = "event";
