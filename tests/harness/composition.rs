//! Properties of `extend_workload` chains

use crate::common::*;
use fsmharness::{extend_workload, Value, WorkloadConfig};
use proptest::prelude::*;

/// One extension step, drawn at random
#[derive(Debug, Clone)]
enum Step {
    AddState(String),
    RemoveState(usize),
    SetData(String, i64),
    RemoveData(usize),
    Reweight(usize, u32),
    MoveStart(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-e]{1,3}".prop_map(Step::AddState),
        any::<usize>().prop_map(Step::RemoveState),
        ("[a-z]{1,6}", any::<i64>()).prop_map(|(k, v)| Step::SetData(k, v)),
        any::<usize>().prop_map(Step::RemoveData),
        (any::<usize>(), 1u32..100).prop_map(|(i, w)| Step::Reweight(i, w)),
        any::<usize>().prop_map(Step::MoveStart),
    ]
}

fn nth_key<V>(map: &std::collections::BTreeMap<String, V>, i: usize) -> Option<String> {
    if map.is_empty() {
        None
    } else {
        map.keys().nth(i % map.len()).cloned()
    }
}

/// Apply a step the way a well-behaved mutator would: every edit keeps
/// states, transitions and the start state consistent
fn apply(config: &mut WorkloadConfig, step: &Step) {
    match step {
        Step::AddState(name) => {
            let target = config.start_state.clone();
            config.states.insert(name.clone(), std::sync::Arc::new(noop));
            config.transitions.insert(name, &target, 1.0);
            config.transitions.insert(&target, name, 1.0);
        }
        Step::RemoveState(i) => {
            if config.states.len() < 2 {
                return;
            }
            if let Some(name) = nth_key(&config.states, *i) {
                if name == config.start_state {
                    return;
                }
                config.states.remove(&name);
                config.transitions.remove_state(&name);
            }
        }
        Step::SetData(k, v) => {
            config.data.insert(k.clone(), Value::Int(*v));
        }
        Step::RemoveData(i) => {
            if let Some(k) = nth_key(&config.data, *i) {
                config.data.remove(&k);
            }
        }
        Step::Reweight(i, w) => {
            if let Some(from) = nth_key(&config.states, *i) {
                let to = config.start_state.clone();
                config.transitions.insert(&from, &to, f64::from(*w) / 10.0);
            }
        }
        Step::MoveStart(i) => {
            if let Some(name) = nth_key(&config.states, *i) {
                config.start_state = name;
            }
        }
    }
}

fn base() -> WorkloadConfig {
    uniform("base", &["s0", "s1", "s2"])
        .data("indexedField", "x")
        .data("shardKey", "x")
}

/// Comparable view of everything a mutator could touch
fn fingerprint(c: &WorkloadConfig) -> String {
    format!(
        "{:?}|{:?}|{:?}|{}",
        c.states.keys().collect::<Vec<_>>(),
        c.transitions,
        c.data,
        c.start_state
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_base_untouched_by_extension(steps in prop::collection::vec(step(), 1..20)) {
        let base = base();
        let before = fingerprint(&base);
        let derived = extend_workload(&base, |c, _| {
            for s in &steps {
                apply(c, s);
            }
        });
        prop_assert_eq!(fingerprint(&base), before);
        prop_assert!(derived.validate().is_ok());
    }

    #[test]
    fn prop_validity_preserved_along_chain(chain in prop::collection::vec(prop::collection::vec(step(), 0..5), 1..8)) {
        let mut config = base();
        let mut snapshots = vec![fingerprint(&config)];
        for steps in &chain {
            let parent = config.clone();
            config = extend_workload(&parent, |c, _| {
                for s in steps {
                    apply(c, s);
                }
            });
            prop_assert_eq!(fingerprint(&parent), snapshots.last().unwrap().clone());
            prop_assert!(config.validate().is_ok());
            prop_assert!(config.states.contains_key(&config.start_state));
            for (_, row) in config.transitions.iter() {
                for to in row.keys() {
                    prop_assert!(config.states.contains_key(to));
                }
            }
            snapshots.push(fingerprint(&config));
        }
    }
}

#[test]
fn test_super_delegation_runs_parent_setup() {
    use fsmharness::{HarnessResult, HookContext, RunOptions};
    use std::sync::Arc;

    let base = base().setup(|ctx| {
        ctx.data.set("parentRan", true);
        Ok(())
    });
    let derived = extend_workload(&base, |c, parent| {
        let parent = parent.clone();
        c.setup = Some(Arc::new(move |ctx: &HookContext<'_>| -> HarnessResult<()> {
            parent.run_setup(ctx)?;
            ctx.assert_always(ctx.data.get_bool("parentRan") == Some(true), || {
                "parent setup did not run".into()
            })?;
            ctx.data.set("childRan", true);
            Ok(())
        }));
        c.teardown = Some(Arc::new(|ctx: &HookContext<'_>| -> HarnessResult<()> {
            ctx.assert_always(ctx.data.get_bool("childRan") == Some(true), || {
                "child setup did not run".into()
            })
        }));
    });
    let (runner, _) = runner(RunOptions::with_seed(1));
    assert!(runner.run_workload(&derived).passed());
}
