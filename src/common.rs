pub(crate) mod base_cache;
pub(crate) mod builder_utils;
pub(crate) mod concurrent;
pub(crate) mod error;
