/// Read-through caching around a fallible computation.
///
/// `$cache` is an `Option<&Cache>`. On a hit the cached value is returned as
/// `Ok`. On a miss, or when the cache is absent or unreachable, `$block` is
/// awaited; only an `Ok` result is written back. Cache failures are logged and
/// never turn into errors.
///
/// # Example
/// ```rust,ignore
/// let events: AppResult<Vec<CanonicalEvent>> = cached!(
///     self.cache.as_ref(),
///     CacheKey::EventSearch(query),
///     ttl,
///     async move { fetch().await }
/// );
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key: $crate::db::CacheKey = $key;

        let hit = match cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, bypassing cache");
                    None
                }
            },
            None => None,
        };

        match hit {
            Some(value) => Ok(value),
            None => {
                let result = $block.await;
                if let (Some(cache), Ok(value)) = (cache, &result) {
                    cache.set_in_background(&key, value, $ttl);
                }
                result
            }
        }
    }};
}
