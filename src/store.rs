//! Process-lifetime in-memory store.
//!
//! Each resource sits behind its own lock. Handlers hold the write lock for
//! the whole read-modify-write of a mutation.

use crate::config::ServerConfig;
use crate::mock;
use crate::models::{Comparison, Event, Exception, Rule};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

pub struct MockStore {
    pub exceptions: RwLock<Vec<Exception>>,
    pub events: RwLock<Vec<Event>>,
    pub rules: RwLock<Vec<Rule>>,
    pub comparisons: RwLock<Vec<Comparison>>,
    rng: Mutex<ChaCha8Rng>,
}

impl MockStore {
    /// Seed every resource once. With `config.seed` set the data set is
    /// reproducible, apart from timestamps relative to `now`.
    pub fn seeded(config: &ServerConfig, now: DateTime<Utc>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let exceptions = mock::generate_exceptions(&mut rng, config.exception_count, now);
        let events = mock::generate_events(&mut rng, config.event_count, now);
        let rules = mock::seed_rules(now);
        let comparisons = mock::generate_comparisons(&mut rng, config.comparison_count, now);

        info!(
            exceptions = exceptions.len(),
            events = events.len(),
            rules = rules.len(),
            comparisons = comparisons.len(),
            seeded = config.seed.is_some(),
            "Mock store seeded"
        );

        Self {
            exceptions: RwLock::new(exceptions),
            events: RwLock::new(events),
            rules: RwLock::new(rules),
            comparisons: RwLock::new(comparisons),
            rng: Mutex::new(rng),
        }
    }

    /// Run `f` with the shared generator, for per-request synthetic data.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.rng.lock();
        f(&mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_config() {
        let config = ServerConfig {
            seed: Some(1),
            exception_count: 12,
            event_count: 7,
            comparison_count: 5,
            ..ServerConfig::default()
        };
        let store = MockStore::seeded(&config, Utc::now());
        assert_eq!(store.exceptions.read().len(), 12);
        assert_eq!(store.events.read().len(), 7);
        assert_eq!(store.rules.read().len(), 4);
        assert_eq!(store.comparisons.read().len(), 5);
    }

    #[test]
    fn test_seed_makes_store_reproducible() {
        let config = ServerConfig {
            seed: Some(99),
            ..ServerConfig::default()
        };
        let now = Utc::now();
        let a = MockStore::seeded(&config, now);
        let b = MockStore::seeded(&config, now);
        let codes = |s: &MockStore| -> Vec<String> {
            s.exceptions.read().iter().map(|e| e.stock_code.clone()).collect()
        };
        assert_eq!(codes(&a), codes(&b));
        assert_eq!(
            a.with_rng(|r| rand::Rng::gen::<u64>(r)),
            b.with_rng(|r| rand::Rng::gen::<u64>(r))
        );
    }
}
