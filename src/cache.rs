//! # Departure Cache
//!
//! The only state shared between the poll loop and the render loop. Writers
//! swap in a complete new list; readers get an `Arc` to whichever complete
//! list was current. The lock is held only for the pointer swap or clone,
//! never while fetching or drawing.

use crate::Departure;
use std::sync::{Arc, RwLock};

/// Latest successfully fetched and filtered departures.
///
/// Cloning the cache clones the handle, not the data: the poller and the
/// renderer each hold a clone of the same cache.
#[derive(Clone, Debug)]
pub struct DepartureCache {
    current: Arc<RwLock<Arc<[Departure]>>>,
}

impl DepartureCache {
    /// Create an empty cache, as seen before the first poll completes.
    pub fn new() -> Self {
        let empty: Arc<[Departure]> = Vec::new().into();
        Self {
            current: Arc::new(RwLock::new(empty)),
        }
    }

    /// Replace the whole cache contents.
    pub fn replace(&self, departures: Vec<Departure>) {
        let fresh: Arc<[Departure]> = departures.into();
        // A poisoned lock still guards a complete value, so keep going
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = fresh;
    }

    /// Immutable view of the current list. Never a mix of two lists.
    pub fn snapshot(&self) -> Arc<[Departure]> {
        let slot = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&slot)
    }
}

impl Default for DepartureCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn departure(line: &str, direction: &str, when: &str) -> Departure {
        Departure {
            line: line.to_string(),
            direction: direction.to_string(),
            when: Some(when.to_string()),
        }
    }

    #[test]
    fn test_starts_empty() {
        assert!(DepartureCache::new().snapshot().is_empty());
    }

    #[test]
    fn test_replace_then_snapshot() {
        let cache = DepartureCache::new();
        let list = vec![
            departure("U9", "S+U Osloer Str.", "2025-03-01T11:03:00Z"),
            departure("U9", "S+U Rathaus Steglitz", "2025-03-01T11:05:00Z"),
        ];
        cache.replace(list.clone());
        assert_eq!(&*cache.snapshot(), list.as_slice());

        cache.replace(Vec::new());
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn test_old_snapshot_survives_replace() {
        let cache = DepartureCache::new();
        cache.replace(vec![departure("U9", "Osloer", "2025-03-01T11:03:00Z")]);
        let before = cache.snapshot();

        cache.replace(vec![departure("U9", "Steglitz", "2025-03-01T11:09:00Z")]);

        assert_eq!(before[0].direction, "Osloer");
        assert_eq!(cache.snapshot()[0].direction, "Steglitz");
    }

    #[test]
    fn test_clones_share_contents() {
        let writer = DepartureCache::new();
        let reader = writer.clone();
        writer.replace(vec![departure("U9", "Osloer", "2025-03-01T11:03:00Z")]);
        assert_eq!(reader.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_lists() {
        let cache = DepartureCache::new();
        let short: Vec<Departure> = (0..2)
            .map(|i| departure("U9", "Osloer", &format!("2025-03-01T11:0{}:00Z", i)))
            .collect();
        let long: Vec<Departure> = (0..7)
            .map(|i| departure("U9", "Steglitz", &format!("2025-03-01T11:0{}:00Z", i)))
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snap = cache.snapshot();
                        // Every snapshot is one of the three whole lists
                        match snap.len() {
                            0 => {}
                            2 => assert!(snap.iter().all(|d| d.direction == "Osloer")),
                            7 => assert!(snap.iter().all(|d| d.direction == "Steglitz")),
                            n => panic!("torn snapshot of length {}", n),
                        }
                    }
                })
            })
            .collect();

        for i in 0..2_000 {
            if i % 2 == 0 {
                cache.replace(short.clone());
            } else {
                cache.replace(long.clone());
            }
        }

        for reader in readers {
            reader.join().unwrap();
        }

        cache.replace(short.clone());
        assert_eq!(&*cache.snapshot(), short.as_slice());
    }
}
