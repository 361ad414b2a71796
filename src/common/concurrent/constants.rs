/// The default refresh period and per-cycle deadline of `DefaultInvalidator`.
pub(crate) const DEFAULT_TIMEOUT_MILLIS: u64 = 1_000;

pub(crate) const THREAD_NAME_PREFIX: &str = "lexicache";
