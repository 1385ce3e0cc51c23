//! Transition matrix and weighted sampling
//!
//! Rows map a source state to `{next state -> weight}`. Weights need not be
//! normalized; sampling sums the row, draws uniformly from `[0, sum)` and
//! walks the cumulative weights. Rows are `BTreeMap`s so iteration order,
//! and therefore the sampled sequence under a fixed seed, is stable.

use fsm_core::ConfigError;
use rand::Rng;
use std::collections::BTreeMap;

/// Outgoing weights of one state
pub type TransitionRow = BTreeMap<String, f64>;

/// Transition matrix of a workload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    rows: BTreeMap<String, TransitionRow>,
}

impl TransitionTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight of `from -> to`, replacing any previous weight
    pub fn insert(&mut self, from: &str, to: &str, weight: f64) {
        self.rows
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), weight);
    }

    /// Replace the whole row of `from`
    pub fn set_row<I, S>(&mut self, from: &str, row: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let row = row.into_iter().map(|(to, w)| (to.into(), w)).collect();
        self.rows.insert(from.to_string(), row);
    }

    /// Row of `from`, if defined
    pub fn row(&self, from: &str) -> Option<&TransitionRow> {
        self.rows.get(from)
    }

    /// Remove the row of `name` and every edge pointing at it
    pub fn remove_state(&mut self, name: &str) {
        self.rows.remove(name);
        for row in self.rows.values_mut() {
            row.remove(name);
        }
    }

    /// Iterate over `(source, row)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TransitionRow)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `state` has at least one edge with positive weight
    pub fn has_exit(&self, state: &str) -> bool {
        self.rows
            .get(state)
            .map(|row| row.values().any(|w| w.is_finite() && *w > 0.0))
            .unwrap_or(false)
    }

    /// Pick the successor of `from`
    ///
    /// Returns `None` when `from` has no row, an empty row, or only zero
    /// weights: the state is terminal.
    pub fn sample_next<R: Rng>(&self, from: &str, rng: &mut R) -> Option<&str> {
        sample_weighted(self.rows.get(from)?, rng)
    }
}

/// Weighted pick from one row
///
/// Non-positive and non-finite weights never win. Weights are scaled by
/// the largest one so their sum stays finite.
pub fn sample_weighted<'a, R: Rng>(row: &'a TransitionRow, rng: &mut R) -> Option<&'a str> {
    let usable = |w: f64| w.is_finite() && w > 0.0;
    let max = row.values().copied().filter(|w| usable(*w)).fold(0.0, f64::max);
    if max <= 0.0 {
        return None;
    }
    let total: f64 = row.values().copied().filter(|w| usable(*w)).map(|w| w / max).sum();

    let draw = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last = None;
    for (state, &weight) in row {
        if !usable(weight) {
            continue;
        }
        cumulative += weight / max;
        last = Some(state.as_str());
        if draw < cumulative {
            return last;
        }
    }
    // Rounding can leave `draw` a hair above the final cumulative sum
    last
}

/// Uniform matrix over `states`: every state moves to every state with
/// equal probability
///
/// # Errors
///
/// Returns `ConfigError::InvalidSetting` when `states` is empty, since the
/// result would have no usable state.
pub fn uniform_dist_transitions<I, S>(states: I) -> Result<TransitionTable, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = states.into_iter().map(|s| s.as_ref().to_string()).collect();
    if names.is_empty() {
        return Err(ConfigError::InvalidSetting {
            key: "states".to_string(),
            reason: "uniform transitions need at least one state".to_string(),
        });
    }

    let weight = 1.0 / names.len() as f64;
    let mut table = TransitionTable::new();
    for from in &names {
        table.set_row(from, names.iter().map(|to| (to.clone(), weight)));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table(rows: &[(&str, &[(&str, f64)])]) -> TransitionTable {
        let mut t = TransitionTable::new();
        for (from, row) in rows {
            t.set_row(from, row.iter().map(|(to, w)| (to.to_string(), *w)));
        }
        t
    }

    #[test]
    fn test_ninety_ten_frequency() {
        let t = table(&[("s", &[("a", 0.9), ("b", 0.1)])]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trials = 100_000;
        let hits = (0..trials)
            .filter(|_| t.sample_next("s", &mut rng) == Some("a"))
            .count();
        let freq = hits as f64 / trials as f64;
        assert!((freq - 0.9).abs() < 0.01, "frequency of a was {}", freq);
    }

    #[test]
    fn test_unnormalized_weights() {
        let t = table(&[("s", &[("a", 3.0), ("b", 1.0)])]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let hits = (0..40_000)
            .filter(|_| t.sample_next("s", &mut rng) == Some("a"))
            .count();
        let freq = hits as f64 / 40_000.0;
        assert!((freq - 0.75).abs() < 0.01, "frequency of a was {}", freq);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let t = table(&[("s", &[("a", 0.5), ("b", 0.3), ("c", 0.2)])]);
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..200)
                .map(|_| t.sample_next("s", &mut rng).unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }

    #[test]
    fn test_terminal_rows() {
        let t = table(&[("empty", &[]), ("zero", &[("a", 0.0)])]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(t.sample_next("empty", &mut rng), None);
        assert_eq!(t.sample_next("zero", &mut rng), None);
        assert_eq!(t.sample_next("absent", &mut rng), None);
        assert!(!t.has_exit("zero"));
    }

    #[test]
    fn test_zero_weight_edge_never_taken() {
        let t = table(&[("s", &[("a", 0.0), ("b", 1.0), ("c", f64::NAN)])]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1000 {
            assert_eq!(t.sample_next("s", &mut rng), Some("b"));
        }
    }

    #[test]
    fn test_huge_weights_still_split() {
        let t = table(&[("s", &[("a", f64::MAX), ("b", f64::MAX)])]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let hits = (0..10_000)
            .filter(|_| t.sample_next("s", &mut rng) == Some("a"))
            .count();
        assert!((4_500..5_500).contains(&hits), "a won {} of 10000", hits);
    }

    #[test]
    fn test_uniform_dist_transitions() {
        let t = uniform_dist_transitions(["x", "y", "z"]).unwrap();
        for (_, row) in t.iter() {
            assert_eq!(row.len(), 3);
            let sum: f64 = row.values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        assert!(t.has_exit("x"));
    }

    #[test]
    fn test_uniform_dist_rejects_empty() {
        let none: [&str; 0] = [];
        assert!(uniform_dist_transitions(none).is_err());
    }

    #[test]
    fn test_remove_state_drops_inbound_edges() {
        let mut t = table(&[("a", &[("a", 1.0), ("b", 1.0)]), ("b", &[("a", 1.0)])]);
        t.remove_state("b");
        assert!(t.row("b").is_none());
        assert_eq!(t.row("a").unwrap().len(), 1);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sample_picks_usable_edge(
                weights in prop::collection::vec(-1.0f64..10.0, 1..8),
                seed in any::<u64>(),
            ) {
                let row: TransitionRow = weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| (format!("s{}", i), *w))
                    .collect();
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                match sample_weighted(&row, &mut rng) {
                    Some(name) => prop_assert!(row[name] > 0.0),
                    None => prop_assert!(row.values().all(|w| *w <= 0.0)),
                }
            }
        }
    }
}
