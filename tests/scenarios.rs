use gpts_alloc::{
    Allocation, Combine, Environment, Error, ExperimentConfig, ExperimentDriver, ResponseCurve,
    TableEnvironment,
};
use std::collections::BTreeMap;

/// Deterministic stub: one allocation pays `value`, every other pays nothing.
struct SpikeEnv {
    target: Allocation,
    value: f64,
    rounds: usize,
}

impl Environment for SpikeEnv {
    type Error = std::convert::Infallible;

    fn round(&mut self, allocation: &Allocation) -> Result<f64, Self::Error> {
        self.rounds += 1;
        Ok(if *allocation == self.target { self.value } else { 0.0 })
    }

    fn opt(&mut self) -> Result<f64, Self::Error> {
        Ok(self.value)
    }
}

#[derive(Debug)]
struct Outage;

impl std::fmt::Display for Outage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cascade simulator unavailable")
    }
}

impl std::error::Error for Outage {}

/// Fails on the `fail_at`-th call to `round`.
struct FlakyEnv {
    calls: usize,
    fail_at: usize,
}

impl Environment for FlakyEnv {
    type Error = Outage;

    fn round(&mut self, _allocation: &Allocation) -> Result<f64, Outage> {
        self.calls += 1;
        if self.calls == self.fail_at {
            Err(Outage)
        } else {
            Ok(1.0)
        }
    }

    fn opt(&mut self) -> Result<f64, Outage> {
        Ok(1.0)
    }
}

#[test]
fn learner_converges_on_the_only_paying_allocation() {
    let cfg = ExperimentConfig {
        horizon: 250,
        n_experiments: 3,
        seed: 11,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let target = Allocation::new(vec![10, 0, 0]);
    let target_arm = driver.allocations().iter().position(|a| *a == target).unwrap();
    assert_eq!(target_arm, 68);

    let mut records = Vec::new();
    for e in 0..3 {
        let mut env = SpikeEnv {
            target: target.clone(),
            value: 5.0,
            rounds: 0,
        };
        let record = driver
            .run_experiment(e, driver.new_learner(e).unwrap(), &mut env)
            .unwrap();
        assert_eq!(env.rounds, 250);
        // Once explored, the paying arm dominates.
        let frac = record.pull_fraction(target_arm, 150..250);
        assert!(frac > 0.9, "experiment {e}: late pull fraction {frac}");
        assert_eq!(record.winner, target_arm);
        records.push(record);
    }

    let report = driver.aggregate(records).unwrap();
    assert_eq!(report.best_allocation, target);
    assert_eq!(report.optimum, 5.0);
    assert!((report.best_value - 5.0).abs() < 0.1, "value={}", report.best_value);
    // Late rounds pay almost every time, so regret flattens out.
    let late = report.regret[249] - report.regret[199];
    let early = report.regret[49];
    assert!(late < early, "late={late} early={early}");
}

#[test]
fn regret_is_nonnegative_when_opt_is_the_true_maximum() {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 30,
        n_experiments: 4,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let curves = [
        ResponseCurve { weight: 3.0, scale: 4.0 },
        ResponseCurve { weight: 2.0, scale: 1.0 },
    ];

    // Noise-free: every reward is at most the optimum, so each increment is >= 0.
    let mut env = TableEnvironment::from_response_curves(driver.allocations(), &curves, 0.0, 0).unwrap();
    let report = driver.run(&mut env).unwrap();
    assert_eq!(report.optimum, env.opt().unwrap());
    assert!(report.regret[0] >= 0.0);
    for w in report.regret.windows(2) {
        assert!(w[1] >= w[0] - 1e-12, "regret decreased: {w:?}");
    }

    // Noisy: non-negative in expectation, so the final value stays above a noise margin.
    let cfg = ExperimentConfig {
        n_experiments: 20,
        ..driver.config().clone()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let mut env = TableEnvironment::from_response_curves(driver.allocations(), &curves, 0.5, 3).unwrap();
    let report = driver.run(&mut env).unwrap();
    assert!(*report.regret.last().unwrap() > -2.0, "regret={:?}", report.regret);
}

#[test]
fn one_experiment_reports_its_own_value() {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 15,
        n_experiments: 1,
        value_aggregation: Combine::RunningMean,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let mut env = SpikeEnv {
        target: Allocation::new(vec![5, 5]),
        value: 3.0,
        rounds: 0,
    };
    let record = driver
        .run_experiment(0, driver.new_learner(0).unwrap(), &mut env)
        .unwrap();
    let report = driver.aggregate(vec![record.clone()]).unwrap();
    assert_eq!(report.best_value, record.winner_value);
    assert_eq!(report.values, BTreeMap::from([(record.winner, record.winner_value)]));
}

#[test]
fn environment_failure_aborts_the_run() {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 10,
        n_experiments: 2,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    // Call 14 is round 3 of the second experiment.
    let mut env = FlakyEnv { calls: 0, fail_at: 14 };
    match driver.run(&mut env) {
        Err(Error::Environment { experiment, round, source }) => {
            assert_eq!((experiment, round), (1, 3));
            assert_eq!(source.to_string(), "cascade simulator unavailable");
        }
        other => panic!("expected environment error, got {other:?}"),
    }
    assert_eq!(env.calls, 14);
}

#[test]
fn allocation_inputs_also_find_the_paying_arm() {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 100,
        n_experiments: 2,
        arm_encoding: gpts_alloc::ArmEncoding::Allocation,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let target = Allocation::new(vec![5, 5]);
    let report = driver
        .run_each(|_| SpikeEnv {
            target: target.clone(),
            value: 4.0,
            rounds: 0,
        })
        .unwrap();
    assert_eq!(report.best_allocation, target);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_run_matches_sequential_run() {
    let cfg = ExperimentConfig {
        n_campaigns: 2,
        horizon: 20,
        n_experiments: 6,
        ..ExperimentConfig::default()
    };
    let driver = ExperimentDriver::new(cfg).unwrap();
    let curves = [
        ResponseCurve { weight: 3.0, scale: 4.0 },
        ResponseCurve { weight: 2.0, scale: 1.0 },
    ];
    let make_env = |e: usize| {
        TableEnvironment::from_response_curves(driver.allocations(), &curves, 0.3, e as u64).unwrap()
    };
    let seq = driver.run_each(make_env).unwrap();
    let par = driver.run_parallel(make_env).unwrap();
    assert_eq!(seq, par);
}
