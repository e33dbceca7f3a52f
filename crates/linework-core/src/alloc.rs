//! Optimized collection types for linework.
//!
//! Re-exports hash collections backed by AHash. Code-point and name keyed
//! caches throughout the engine use these instead of the SipHash defaults.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert("layer", 7);
        assert_eq!(map.get("layer"), Some(&7));
    }
}
