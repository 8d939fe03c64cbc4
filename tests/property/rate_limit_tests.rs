//! Property-based tests for the sliding window rate limiter

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use leetcoach_gateway::{ClientKey, RateLimiter};

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(millis)
}

proptest! {
    /// Up to the limit, every request is admitted and remaining drops by one
    #[test]
    fn test_admits_up_to_limit(
        limit in 1u32..200,
        spacing_ms in 0i64..200,
    ) {
        let limiter = RateLimiter::new(limit, 60);
        let key = ClientKey::new("client");

        let mut previous = limit;
        for i in 0..limit as i64 {
            let admission = limiter.check_and_record(&key, at(i * spacing_ms % 59_000));
            prop_assert!(admission.allowed);
            prop_assert_eq!(admission.remaining, previous - 1);
            previous = admission.remaining;
        }
    }

    /// Never more than `limit` admissions inside any one window
    #[test]
    fn test_window_never_over_admits(
        limit in 1u32..20,
        mut offsets in prop::collection::vec(0i64..180_000, 1..300),
    ) {
        offsets.sort_unstable();
        let limiter = RateLimiter::new(limit, 60);
        let key = ClientKey::new("client");

        let admitted: Vec<i64> = offsets
            .iter()
            .copied()
            .filter(|&ms| limiter.check_and_record(&key, at(ms)).allowed)
            .collect();

        for (i, &start) in admitted.iter().enumerate() {
            let in_window = admitted[i..].iter().take_while(|&&t| t - start < 60_000).count();
            prop_assert!(in_window <= limit as usize);
        }
    }

    /// After a rejection, the same key is admitted again once the window has passed
    #[test]
    fn test_readmits_after_window(
        limit in 1u32..50,
        window in 1u64..600,
    ) {
        let limiter = RateLimiter::new(limit, window);
        let key = ClientKey::new("client");

        for _ in 0..limit {
            limiter.check_and_record(&key, at(0));
        }
        prop_assert!(!limiter.check_and_record(&key, at(1)).allowed);

        let later = at(window as i64 * 1000);
        let admission = limiter.check_and_record(&key, later);
        prop_assert!(admission.allowed);
        prop_assert_eq!(admission.remaining, limit - 1);
    }

    /// Traffic on one key never changes another key's outcome
    #[test]
    fn test_keys_independent(
        limit in 1u32..20,
        noise in 0usize..100,
    ) {
        let limiter = RateLimiter::new(limit, 60);
        let quiet = ClientKey::new("quiet");
        let noisy = ClientKey::new("noisy");

        for i in 0..noise {
            limiter.check_and_record(&noisy, at(i as i64));
        }

        let admission = limiter.check_and_record(&quiet, at(noise as i64));
        prop_assert!(admission.allowed);
        prop_assert_eq!(admission.remaining, limit - 1);
    }

    /// The reset instant is always one window after the check
    #[test]
    fn test_reset_is_now_plus_window(
        window in 1u64..3600,
        offset_ms in 0i64..1_000_000,
    ) {
        let limiter = RateLimiter::new(10, window);
        let now = at(offset_ms);
        let admission = limiter.check_and_record(&ClientKey::new("client"), now);

        prop_assert_eq!(admission.reset_at, now + TimeDelta::seconds(window as i64));
    }

    /// Sweeping never changes the outcome of a later check
    #[test]
    fn test_sweep_is_unobservable(
        limit in 1u32..10,
        offsets in prop::collection::vec(0i64..120_000, 1..50),
        sweep_at in 0i64..200_000,
        delay in 0i64..200_000,
    ) {
        let swept = RateLimiter::new(limit, 60);
        let unswept = RateLimiter::new(limit, 60);
        let key = ClientKey::new("client");

        let mut offsets = offsets;
        offsets.sort_unstable();
        for &ms in &offsets {
            swept.check_and_record(&key, at(ms));
            unswept.check_and_record(&key, at(ms));
        }

        let last = *offsets.last().unwrap();
        swept.sweep(at(last.max(sweep_at)));

        let check_at = at(last.max(sweep_at) + delay);
        prop_assert_eq!(
            swept.check_and_record(&key, check_at),
            unswept.check_and_record(&key, check_at)
        );
    }
}
