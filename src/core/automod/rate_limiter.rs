// Fixed-window rate limiter keyed by a dimension id (a user or a channel).
//
// The number of tracked dimensions is capped. Over the cap, expired buckets
// go first, then the ones that have been idle the longest.
//
// Windows are fixed, not sliding: a burst straddling a window boundary can
// let up to 2x `rate` events through before tripping. That is fine for abuse
// signaling and keeps the counters to one small bucket per dimension.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default cap on tracked dimensions per limiter.
pub const DEFAULT_MAX_BUCKETS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
    /// Most recent event, used to pick eviction victims when over the cap.
    last_seen: Instant,
}

impl Bucket {
    fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 1,
            last_seen: now,
        }
    }
}

/// Counts events per dimension inside a fixed window.
///
/// **DashMap:**
/// `record_and_check` goes through the map's entry API, which holds the
/// shard lock for that key while the bucket is read and updated. Two events
/// from the same user dispatched on different tasks are therefore serialized
/// and neither update is lost.
#[derive(Debug)]
pub struct RateLimiter {
    rate: u32,
    window: Duration,
    max_buckets: usize,
    buckets: DashMap<u64, Bucket>,
}

impl RateLimiter {
    pub fn new(rate: u32, window: Duration, max_buckets: usize) -> Self {
        Self {
            rate,
            window,
            max_buckets: max_buckets.max(1),
            buckets: DashMap::new(),
        }
    }

    /// Record one event for `dimension_id` at `now`.
    ///
    /// Returns `true` when this event pushes the dimension over `rate`
    /// within the current window. The first event of a window never trips.
    pub fn record_and_check(&self, dimension_id: u64, now: Instant) -> bool {
        let tripped = match self.buckets.entry(dimension_id) {
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                if now.saturating_duration_since(bucket.window_start) >= self.window {
                    *bucket = Bucket::starting_at(now);
                    false
                } else {
                    bucket.count = bucket.count.saturating_add(1);
                    bucket.last_seen = bucket.last_seen.max(now);
                    bucket.count > self.rate
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Bucket::starting_at(now));
                false
            }
        };

        // The entry guard is gone by now, so touching the whole map is safe.
        if self.buckets.len() > self.max_buckets {
            self.shrink_to_cap(now);
        }

        tripped
    }

    /// Drop every bucket whose window has elapsed. Returns how many were removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < self.window);
        before.saturating_sub(self.buckets.len())
    }

    /// Number of dimensions currently holding a bucket.
    pub fn tracked_dimensions(&self) -> usize {
        self.buckets.len()
    }

    /// Trim the map back under the cap: expired buckets first, then the
    /// least recently seen live ones. Live trimming goes down to 90% of the
    /// cap so a steady stream of new dimensions doesn't trim on every event.
    fn shrink_to_cap(&self, now: Instant) {
        let evicted = self.evict_expired(now);
        let len = self.buckets.len();
        if len <= self.max_buckets {
            tracing::debug!(evicted, remaining = len, "Evicted expired rate limit buckets");
            return;
        }

        let target = self.max_buckets - self.max_buckets / 10;
        let excess = len - target;

        let mut by_recency: Vec<(u64, Instant)> = self
            .buckets
            .iter()
            .map(|entry| (*entry.key(), entry.value().last_seen))
            .collect();
        if excess < by_recency.len() {
            by_recency.select_nth_unstable_by_key(excess - 1, |(_, seen)| *seen);
        }

        let mut dropped = 0;
        for (dimension_id, seen) in by_recency.into_iter().take(excess) {
            // Skip buckets that saw a new event since the snapshot.
            if self
                .buckets
                .remove_if(&dimension_id, |_, bucket| bucket.last_seen <= seen)
                .is_some()
            {
                dropped += 1;
            }
        }

        tracing::warn!(
            dropped,
            cap = self.max_buckets,
            "Rate limiter over capacity, dropped least recently seen buckets"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(rate: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(rate, Duration::from_secs(window_secs), DEFAULT_MAX_BUCKETS)
    }

    #[test]
    fn test_trips_after_rate_within_window() {
        let limiter = limiter(3, 5);
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(
                !limiter.record_and_check(1, t0 + Duration::from_millis(i * 100)),
                "event {} should not trip",
                i + 1
            );
        }
        assert!(limiter.record_and_check(1, t0 + Duration::from_secs(1)));
        assert!(limiter.record_and_check(1, t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_window_reset_starts_clean() {
        let limiter = limiter(3, 5);
        let t0 = Instant::now();

        for _ in 0..3 {
            limiter.record_and_check(1, t0);
        }

        // Exactly one window later counts as a fresh window.
        assert!(!limiter.record_and_check(1, t0 + Duration::from_secs(5)));
        assert!(!limiter.record_and_check(1, t0 + Duration::from_secs(6)));
        assert!(!limiter.record_and_check(1, t0 + Duration::from_secs(7)));
        assert!(limiter.record_and_check(1, t0 + Duration::from_secs(8)));
    }

    #[test]
    fn test_dimensions_are_independent() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();

        assert!(!limiter.record_and_check(1, t0));
        assert!(!limiter.record_and_check(2, t0));
        assert!(limiter.record_and_check(1, t0));
        assert!(!limiter.record_and_check(3, t0));
        assert_eq!(limiter.tracked_dimensions(), 3);
    }

    #[test]
    fn test_boundary_burst_admits_two_windows() {
        let limiter = limiter(2, 10);
        let t0 = Instant::now();

        assert!(!limiter.record_and_check(1, t0));
        assert!(!limiter.record_and_check(1, t0 + Duration::from_millis(9_900)));
        assert!(!limiter.record_and_check(1, t0 + Duration::from_secs(10)));
        assert!(!limiter.record_and_check(1, t0 + Duration::from_millis(10_100)));
    }

    #[test]
    fn test_evict_expired() {
        let limiter = limiter(5, 5);
        let t0 = Instant::now();

        limiter.record_and_check(1, t0);
        limiter.record_and_check(2, t0 + Duration::from_secs(4));

        assert_eq!(limiter.evict_expired(t0 + Duration::from_secs(6)), 1);
        assert_eq!(limiter.tracked_dimensions(), 1);
    }

    #[test]
    fn test_bucket_cap_is_enforced() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), 3);
        let t0 = Instant::now();

        for id in 0..10u64 {
            limiter.record_and_check(id, t0 + Duration::from_millis(id));
        }

        assert_eq!(limiter.tracked_dimensions(), 3);
        // The newest dimension survived the trim and keeps counting.
        assert!(!limiter.record_and_check(9, t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_cap_keeps_recently_active_dimensions() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), 3);
        let t0 = Instant::now();

        // Dimension 1 has the oldest window but stays busy.
        limiter.record_and_check(1, t0);
        limiter.record_and_check(2, t0 + Duration::from_secs(1));
        limiter.record_and_check(3, t0 + Duration::from_secs(2));
        assert!(limiter.record_and_check(1, t0 + Duration::from_secs(3)));

        // A fourth dimension pushes the limiter over its cap.
        limiter.record_and_check(4, t0 + Duration::from_secs(4));
        assert_eq!(limiter.tracked_dimensions(), 3);

        // Dimension 1 kept its count; dimension 2 was the idle one dropped.
        assert!(limiter.record_and_check(1, t0 + Duration::from_secs(5)));
        assert!(!limiter.record_and_check(2, t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_live_trim_leaves_headroom() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), 20);
        let t0 = Instant::now();

        for id in 0..21u64 {
            limiter.record_and_check(id, t0 + Duration::from_millis(id));
        }
        assert_eq!(limiter.tracked_dimensions(), 18);

        // The next two new dimensions fit without another trim.
        limiter.record_and_check(100, t0 + Duration::from_millis(50));
        limiter.record_and_check(101, t0 + Duration::from_millis(51));
        assert_eq!(limiter.tracked_dimensions(), 20);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let limiter = Arc::new(limiter(1_000, 60));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        limiter.record_and_check(42, now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 800 events recorded; the 801st is under the rate, the ones past 1000 trip.
        for _ in 0..200 {
            assert!(!limiter.record_and_check(42, now));
        }
        assert!(limiter.record_and_check(42, now));
    }
}
