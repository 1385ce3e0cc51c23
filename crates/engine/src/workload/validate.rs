//! Config validation
//!
//! Runs before any setup or worker. A failure aborts the workload; it never
//! becomes a runtime error inside a worker.

use fsm_core::ConfigError;

use super::config::WorkloadConfig;

impl WorkloadConfig {
    /// Check the config's structural invariants
    ///
    /// On success returns warnings: states without a usable outgoing edge.
    /// Such a state is legal; a worker reaching it stops early.
    ///
    /// # Errors
    ///
    /// - `ZeroThreads` when `thread_count == 0`
    /// - `NoStates` when no state is defined
    /// - `UnknownStartState` when `start_state` is not a state
    /// - `UnknownTransitionSource` for a row keyed by an undefined state
    /// - `DanglingTransition` for an edge into an undefined state
    /// - `InvalidWeight` for a negative or non-finite weight
    /// - `InvalidWeightSum` when a state's weights sum to infinity
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let workload = || self.name.clone();

        if self.thread_count == 0 {
            return Err(ConfigError::ZeroThreads {
                workload: workload(),
            });
        }
        if self.states.is_empty() {
            return Err(ConfigError::NoStates {
                workload: workload(),
            });
        }
        if !self.states.contains_key(&self.start_state) {
            return Err(ConfigError::UnknownStartState {
                workload: workload(),
                state: self.start_state.clone(),
            });
        }

        for (from, row) in self.transitions.iter() {
            if !self.states.contains_key(from) {
                return Err(ConfigError::UnknownTransitionSource {
                    workload: workload(),
                    state: from.to_string(),
                });
            }
            for (to, weight) in row {
                if !self.states.contains_key(to) {
                    return Err(ConfigError::DanglingTransition {
                        workload: workload(),
                        from: from.to_string(),
                        to: to.clone(),
                    });
                }
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        workload: workload(),
                        from: from.to_string(),
                        to: to.clone(),
                        weight: weight.to_string(),
                    });
                }
            }
            let total: f64 = row.values().sum();
            if !total.is_finite() {
                return Err(ConfigError::InvalidWeightSum {
                    workload: workload(),
                    from: from.to_string(),
                    total: total.to_string(),
                });
            }
        }

        let warnings = self
            .state_names()
            .filter(|s| !self.transitions.has_exit(s))
            .map(|s| format!("state '{}' has no outgoing transitions; workers stop there", s))
            .collect();
        Ok(warnings)
    }
}
