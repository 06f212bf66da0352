use std::{hash::Hash, num::NonZeroUsize};

use lru::LruCache;
use reqwest::Client;

use crate::prelude::*;

/// Days of prices kept per provider instance.
const DAY_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(9);

/// Build a short-lived client for a single fetch.
pub fn try_new() -> Result<Client> {
    Ok(Client::builder().build()?)
}

/// Least-recently-used per-day price cache.
#[must_use]
pub fn day_cache<K: Hash + Eq, V>() -> LruCache<K, V> {
    LruCache::new(DAY_CACHE_CAPACITY)
}
