//! DrapeId: Identifiers for render objects added at runtime.
//!
//! Identifiers come from one counter for the whole process. They are
//! handed out on the caller thread before the matching creation message
//! is posted, never reused and never reset.

use parking_lot::Mutex;

static LAST_ID: Mutex<u64> = Mutex::new(0);

/// Identifier of a route segment, preview segment or other object added
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrapeId(u64);

impl DrapeId {
    /// Take the next identifier. The first one is 1.
    pub fn generate() -> Self {
        let mut last = LAST_ID.lock();
        *last += 1;
        Self(*last)
    }

    /// Raw value, for crossing the C boundary.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Rebuild an identifier from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for DrapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_ids_increase() {
        let a = DrapeId::generate();
        let b = DrapeId::generate();
        assert!(b > a);
        assert!(a.get() >= 1);
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| (0..100).map(|_| DrapeId::generate()).collect::<Vec<_>>()))
            .collect();
        let mut all = Vec::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            // Each thread sees its own ids strictly increasing.
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            all.extend(ids);
        }
        let count = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), count);
    }
}
