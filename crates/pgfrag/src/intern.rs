//! Interning caches for immutable fragments.
//!
//! Three tiers, sized for how their keys behave:
//!
//! - a bounded cache from raw text to its `Raw` fragment (raw inputs are open
//!   ended, so the cache must not grow without bound),
//! - an unbounded map for single-piece template strings (keys are source
//!   literals, a small fixed set by construction),
//! - singletons for the constants every query mentions.
//!
//! The bounded cache is tuned to what interning actually needs: entries are
//! value-equal by key and cost one allocation to rebuild, so eviction
//! precision is worth nothing. The hot path is a hash probe plus a tick bump;
//! when the cache overflows it sheds the least recently touched quarter of
//! its entries in a single sweep and goes back to probing.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::fragment::{Fragment, Node};

/// Default capacity of the raw-text cache.
pub(crate) const RAW_CACHE_CAPACITY: usize = 10_000;

/// Raw cache statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Cache hit ratio (0.0 – 1.0). Returns 0.0 if no lookups have occurred.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded intern cache from raw SQL text to its fragment.
///
/// Everything, counters included, sits behind one mutex; there is a single
/// get-or-insert entry point and eviction runs as an occasional batch sweep.
#[derive(Debug)]
struct RawCache {
    capacity: usize,
    map: HashMap<String, Interned>,
    /// Monotonic touch clock; every lookup stamps its entry.
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

#[derive(Debug)]
struct Interned {
    frag: Fragment,
    touched: u64,
}

impl RawCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up `text`, constructing and caching its fragment on a miss.
    fn intern(&mut self, text: &str) -> Fragment {
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.map.get_mut(text) {
            entry.touched = tick;
            self.hits += 1;
            return entry.frag.clone();
        }

        self.misses += 1;
        let frag = Fragment::new(Node::Raw(text.to_string()));
        self.map.insert(
            text.to_string(),
            Interned {
                frag: frag.clone(),
                touched: tick,
            },
        );
        if self.map.len() > self.capacity {
            self.shed_oldest();
        }
        frag
    }

    /// Drop the least recently touched quarter of the entries (at least one)
    /// in a single sweep.
    fn shed_oldest(&mut self) {
        let mut touches: Vec<u64> = self.map.values().map(|e| e.touched).collect();
        touches.sort_unstable();
        // Touch stamps are unique, so the quartile stamp is a clean cutoff.
        let cutoff = touches[touches.len() / 4];

        let before = self.map.len();
        self.map.retain(|_, e| e.touched > cutoff);
        self.evictions += (before - self.map.len()) as u64;
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            size: self.map.len(),
            capacity: self.capacity,
        }
    }
}

fn raw_cache() -> &'static Mutex<RawCache> {
    static CACHE: OnceLock<Mutex<RawCache>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(RawCache::new(RAW_CACHE_CAPACITY)))
}

/// Interned `Raw` fragment for `text`.
///
/// Every raw-text path in the crate funnels through here; only the public
/// [`raw`](crate::raw) constructor carries the one-shot warning.
pub(crate) fn intern_raw(text: &str) -> Fragment {
    raw_cache().lock().expect("raw cache poisoned").intern(text)
}

/// Snapshot of the raw-cache counters.
pub fn raw_cache_stats() -> CacheStats {
    raw_cache().lock().expect("raw cache poisoned").stats()
}

/// Interned fragment for a single-piece template.
pub(crate) fn intern_template_text(text: &'static str) -> Fragment {
    static CACHE: OnceLock<Mutex<HashMap<&'static str, Fragment>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let mut cache = cache.lock().expect("template cache poisoned");
    if let Some(frag) = cache.get(text) {
        return frag.clone();
    }
    let frag = Fragment::new(Node::Raw(text.to_string()));
    cache.insert(text, frag.clone());
    frag
}

/// `TRUE` as an interned fragment.
pub fn sql_true() -> Fragment {
    static TRUE: OnceLock<Fragment> = OnceLock::new();
    TRUE.get_or_init(|| Fragment::new(Node::Raw("TRUE".to_string())))
        .clone()
}

/// `FALSE` as an interned fragment.
pub fn sql_false() -> Fragment {
    static FALSE: OnceLock<Fragment> = OnceLock::new();
    FALSE
        .get_or_init(|| Fragment::new(Node::Raw("FALSE".to_string())))
        .clone()
}

/// `NULL` as an interned fragment.
pub fn sql_null() -> Fragment {
    static NULL: OnceLock<Fragment> = OnceLock::new();
    NULL.get_or_init(|| Fragment::new(Node::Raw("NULL".to_string())))
        .clone()
}

/// The empty fragment.
pub fn blank() -> Fragment {
    static BLANK: OnceLock<Fragment> = OnceLock::new();
    BLANK
        .get_or_init(|| Fragment::new(Node::Query(Vec::new())))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_interning_returns_shared_nodes() {
        let a = intern_raw("select 1 -- intern test");
        let b = intern_raw("select 1 -- intern test");
        assert!(a.same_as(&b));
    }

    #[test]
    fn distinct_text_distinct_nodes() {
        let a = intern_raw("lhs");
        let b = intern_raw("rhs");
        assert!(!a.same_as(&b));
    }

    #[test]
    fn template_cache_is_stable_per_source_string() {
        let a = intern_template_text("select now()");
        let b = intern_template_text("select now()");
        assert!(a.same_as(&b));
    }

    #[test]
    fn singletons_are_singletons() {
        assert!(sql_true().same_as(&sql_true()));
        assert!(sql_false().same_as(&sql_false()));
        assert!(sql_null().same_as(&sql_null()));
        assert!(blank().same_as(&blank()));
        assert!(blank().is_blank());
    }

    #[test]
    fn intern_returns_the_first_fragment_for_a_key() {
        let mut cache = RawCache::new(8);
        let first = cache.intern("k");
        let second = cache.intern("k");
        assert!(first.same_as(&second));
    }

    #[test]
    fn shed_drops_least_recently_touched() {
        let mut cache = RawCache::new(4);
        for key in ["k0", "k1", "k2", "k3"] {
            cache.intern(key);
        }
        // Refresh k0, then overflow with k4: the sweep drops the two
        // stalest entries (k1, k2) and keeps the rest.
        cache.intern("k0");
        cache.intern("k4");

        assert!(cache.map.contains_key("k0"));
        assert!(!cache.map.contains_key("k1"));
        assert!(!cache.map.contains_key("k2"));
        assert!(cache.map.contains_key("k3"));
        assert!(cache.map.contains_key("k4"));

        let stats = cache.stats();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.size, 3);
        assert_eq!(stats.capacity, 4);
    }

    #[test]
    fn shed_keeps_the_entry_that_triggered_it() {
        let mut cache = RawCache::new(1);
        cache.intern("old");
        cache.intern("new");
        assert!(!cache.map.contains_key("old"));
        assert!(cache.map.contains_key("new"));
    }

    #[test]
    fn zero_capacity_retains_nothing_but_still_serves() {
        let mut cache = RawCache::new(0);
        let first = cache.intern("k");
        assert_eq!(cache.stats().size, 0);
        let second = cache.intern("k");
        assert!(!first.same_as(&second));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn hit_ratio_counts_lookups() {
        let mut cache = RawCache::new(8);
        cache.intern("k");
        cache.intern("k");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
