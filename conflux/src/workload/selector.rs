//! Hot/cold biased key sampling.

use std::collections::BTreeSet;

use rand::Rng;

/// Controls how concentrated the workload's key accesses are.
#[derive(Debug, Clone)]
pub struct ContentionConfig {
    pub total_keys: usize,
    /// The first `hotset_size` keys form the hot set.
    pub hotset_size: usize,
    /// Probability that a single selection lands in the hot set.
    pub hotset_probability: f64,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            total_keys: 1000,
            hotset_size: 10,
            hotset_probability: 0.5,
        }
    }
}

/// Samples keys of the form `account_<i>` with a configurable hot-set bias.
pub struct KeySelector {
    config: ContentionConfig,
}

impl KeySelector {
    pub fn new(config: ContentionConfig) -> Self {
        Self { config }
    }

    pub fn select_key(&self, rng: &mut impl Rng) -> String {
        let idx = if rng.gen::<f64>() < self.config.hotset_probability {
            rng.gen_range(0..self.config.hotset_size)
        } else {
            rng.gen_range(0..self.config.total_keys)
        };
        format!("account_{idx}")
    }

    /// Sample until `n` distinct keys are collected, returned in sorted
    /// order. Loops forever if `n` exceeds `total_keys`; callers size
    /// their requests accordingly.
    pub fn select_distinct_keys(&self, rng: &mut impl Rng, n: usize) -> Vec<String> {
        let mut keys = BTreeSet::new();
        while keys.len() < n {
            keys.insert(self.select_key(rng));
        }
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_key_format() {
        let selector = KeySelector::new(ContentionConfig::default());
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let key = selector.select_key(&mut rng);
            let idx: usize = key
                .strip_prefix("account_")
                .expect("account_ prefix")
                .parse()
                .expect("numeric suffix");
            assert!(idx < 1000);
        }
    }

    #[test]
    fn test_distinct_keys_are_distinct_and_sorted() {
        let selector = KeySelector::new(ContentionConfig {
            total_keys: 50,
            hotset_size: 5,
            hotset_probability: 0.5,
        });
        let mut rng = StdRng::seed_from_u64(42);

        let keys = selector.select_distinct_keys(&mut rng, 10);
        assert_eq!(keys.len(), 10);

        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_hotset_probability_one_stays_hot() {
        let selector = KeySelector::new(ContentionConfig {
            total_keys: 1000,
            hotset_size: 3,
            hotset_probability: 1.0,
        });
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            let key = selector.select_key(&mut rng);
            let idx: usize = key.strip_prefix("account_").unwrap().parse().unwrap();
            assert!(idx < 3);
        }
    }

    #[test]
    fn test_hotset_probability_zero_spreads_out() {
        let selector = KeySelector::new(ContentionConfig {
            total_keys: 1000,
            hotset_size: 3,
            hotset_probability: 0.0,
        });
        let mut rng = StdRng::seed_from_u64(9);

        // With 500 uniform draws over 1000 keys, some must land outside
        // a 3-key hot set
        let outside = (0..500)
            .map(|_| selector.select_key(&mut rng))
            .filter(|key| {
                let idx: usize = key.strip_prefix("account_").unwrap().parse().unwrap();
                idx >= 3
            })
            .count();
        assert!(outside > 0);
    }
}
