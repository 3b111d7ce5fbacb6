mod common;
use common::{assert_float_eq, reference_device, tiny_device};

use dslab_spindown::device::PowerState;
use dslab_spindown::error::SimError;
use dslab_spindown::moving_average::MovingAveragePolicy;
use dslab_spindown::pattern::{PatternCounts, PatternPolicy};
use dslab_spindown::policy::{
    default_policy_resolver, split_spec, AlwaysStandbyPolicy, FixedTimeoutPolicy, IdleSlot, ShortBurstPolicy,
    SpinDownPolicy,
};
use dslab_spindown::simulation::PolicySimulation;
use dslab_spindown::state::PowerStateMachine;
use dslab_spindown::supervised::{FeatureWindow, Predictor, SupervisedPolicy};
use dslab_spindown::trace::Workload;

#[test]
fn test_fixed_timeout_short_idle() {
    let mut machine = PowerStateMachine::new(reference_device());
    let mut policy = FixedTimeoutPolicy::new(1000);
    let c = machine.process_idle(500, &mut policy);
    assert_float_eq(c.energy, 1.75, 1e-9);
    assert_eq!(machine.shutdowns(), 0);
    assert_eq!(machine.state(), PowerState::Standby);
}

#[test]
fn test_fixed_timeout_long_idle() {
    let mut machine = PowerStateMachine::new(reference_device());
    let mut policy = FixedTimeoutPolicy::new(1000);
    let c = machine.process_idle(20000, &mut policy);
    let expected = 1000. * 0.0035 + 510. * 0.00212 + 18490. * 0.00075;
    assert_float_eq(c.energy, expected, 1e-9);
    assert_eq!(machine.shutdowns(), 1);
    assert_eq!(machine.state(), PowerState::Sleeping);
}

#[test]
fn test_short_burst() {
    let device = reference_device();
    let mut sim = PolicySimulation::new(device.clone(), Box::new(ShortBurstPolicy::new(100)));
    sim.process(50);
    let c = sim.process(-2000);
    assert_float_eq(c.energy, 510. * 0.00212 + 1490. * 0.00075, 1e-9);
    assert_eq!(sim.stats().shutdowns, 1);

    let mut sim = PolicySimulation::new(device, Box::new(ShortBurstPolicy::new(100)));
    sim.process(500);
    let c = sim.process(-2000);
    assert_float_eq(c.energy, 2000. * 0.0035, 1e-9);
    assert_eq!(sim.stats().shutdowns, 0);
}

#[test]
fn test_short_burst_first_idle_stays_in_standby() {
    let mut sim = PolicySimulation::new(reference_device(), Box::new(ShortBurstPolicy::new(100)));
    sim.process(-2000);
    assert_eq!(sim.stats().shutdowns, 0);
}

#[test]
fn test_pattern_predictor_learns_long_intervals() {
    let device = tiny_device();
    let mut machine = PowerStateMachine::new(device.clone());
    let mut policy = PatternPolicy::new(1, device.break_even_threshold());
    assert_eq!(policy.current_pattern(), None);

    machine.process_idle(20, &mut policy);
    assert_eq!(policy.current_pattern(), Some(1));
    assert_eq!(policy.counts(1), None);
    machine.process_idle(20, &mut policy);
    assert_eq!(machine.shutdowns(), 0);
    assert_eq!(policy.counts(1), Some(PatternCounts { short: 0, long: 1 }));

    machine.process_idle(20, &mut policy);
    assert_eq!(machine.shutdowns(), 1);
    assert_eq!(policy.counts(1), Some(PatternCounts { short: 0, long: 2 }));
}

#[test]
fn test_pattern_predictor_history() {
    let device = tiny_device();
    let mut machine = PowerStateMachine::new(device.clone());
    let mut policy = PatternPolicy::new(3, device.break_even_threshold());
    // long, short, long: most recent outcome in the lowest bit
    for len in [20, 2, 20] {
        machine.process_idle(len, &mut policy);
    }
    assert_eq!(policy.current_pattern(), Some(0b101));
    machine.process_idle(2, &mut policy);
    assert_eq!(policy.current_pattern(), Some(0b010));
    assert_eq!(policy.counts(0b101), Some(PatternCounts { short: 1, long: 0 }));
    assert_eq!(machine.shutdowns(), 0);
}

#[test]
fn test_pattern_counts_probability() {
    assert_eq!(PatternCounts::default().long_probability(), None);
    assert_eq!(PatternCounts { short: 1, long: 3 }.long_probability(), Some(0.75));
}

#[test]
fn test_stochastic_pattern_predictor_is_reproducible() {
    let device = tiny_device();
    let workload: Vec<i64> = (0..200).flat_map(|i| [if i % 3 == 0 { -2 } else { -40 }, 3]).collect();
    let workload = Workload::new(workload);
    let run = |seed| {
        let policy = PatternPolicy::with_sampling(2, device.break_even_threshold(), true, seed);
        PolicySimulation::new(device.clone(), Box::new(policy)).run(&workload)
    };
    assert_eq!(run(7), run(7));
    assert!(run(7).shutdowns > 0);
}

#[test]
fn test_moving_average() {
    let device = tiny_device();
    let mut sim = PolicySimulation::new(
        device.clone(),
        Box::new(MovingAveragePolicy::new(2, device.break_even_threshold(), true)),
    );
    sim.process(-100);
    sim.process(-100);
    assert_eq!(sim.stats().shutdowns, 0);
    sim.process(-5);
    assert_eq!(sim.stats().shutdowns, 1);

    let mut policy = MovingAveragePolicy::new(2, device.break_even_threshold(), true);
    assert_eq!(policy.average(), None);
    policy.observe_idle(100);
    policy.observe_idle(100);
    assert_eq!(policy.average(), Some(100.));
    policy.observe_idle(5);
    assert_float_eq(policy.average().unwrap(), 110. / 3., 1e-9);
}

#[test]
fn test_moving_average_adjusts_for_backlog() {
    let device = tiny_device();
    let idle = IdleSlot {
        interval: 12,
        remaining: 10,
    };
    assert_eq!(idle.spent(), 2);

    let mut adjusted = MovingAveragePolicy::new(1, device.break_even_threshold(), true);
    adjusted.observe_idle(12);
    let mut machine = PowerStateMachine::new(device.clone());
    adjusted.decide(idle, &mut machine);
    assert_eq!(machine.shutdowns(), 0);

    let mut plain = MovingAveragePolicy::new(1, device.break_even_threshold(), false);
    plain.observe_idle(12);
    let mut machine = PowerStateMachine::new(device);
    plain.decide(idle, &mut machine);
    assert_eq!(machine.shutdowns(), 1);
}

fn alternating_workload() -> Workload {
    let mut intervals = Vec::new();
    for _ in 0..60 {
        intervals.extend([-50, 100, -2, 10]);
    }
    Workload::new(intervals)
}

#[test]
fn test_supervised_policy() {
    let device = tiny_device();
    let workload = alternating_workload();
    let policy = SupervisedPolicy::train(2, device.break_even_threshold(), &workload);
    let model = match policy.predictor() {
        Predictor::Model(model) => model.clone(),
        p => panic!("expected a fitted model, got {:?}", p),
    };
    // long idle intervals follow short ones
    assert!(model.predict(&[0.5, -1., -1.]));
    assert!(!model.predict(&[0.5, 1., 1.]));

    let stats = PolicySimulation::new(device, Box::new(policy)).run(&workload);
    assert!(stats.shutdowns > 0);
}

#[test]
fn test_supervised_degenerate_training() {
    let device = tiny_device();
    let threshold = device.break_even_threshold();
    let short = Workload::new((0..20).flat_map(|_| [-2, 5]).collect());
    let policy = SupervisedPolicy::train(2, threshold, &short);
    assert_eq!(policy.predictor(), &Predictor::Constant(false));

    let long = Workload::new((0..20).flat_map(|_| [-50, 5]).collect());
    let policy = SupervisedPolicy::train(2, threshold, &long);
    assert_eq!(policy.predictor(), &Predictor::Constant(true));

    // too short to fill the windows
    let policy = SupervisedPolicy::train(5, threshold, &Workload::new(vec![-50, 5]));
    assert_eq!(policy.predictor(), &Predictor::Constant(false));
}

#[test]
fn test_feature_window() {
    let mut window = FeatureWindow::new(2, 10.);
    window.push_idle(20);
    window.push_busy(4);
    assert_eq!(window.features(), None);
    window.push_idle(5);
    window.push_busy(4);
    assert_eq!(window.features(), Some([0.5, 0., -1.]));
    // z-scores use up to 4 values, the long fraction only the last 2
    window.push_idle(30);
    let features = window.features().unwrap();
    assert_eq!(features[0], 0.5);
    assert_float_eq(features[2], 35. / 950f64.sqrt(), 1e-12);
}

#[test]
fn test_feature_window_length() {
    let mut window = FeatureWindow::new(2, 10.);
    for x in [20, 20, 20, 20] {
        window.push_idle(x);
    }
    for x in [100, 1, 1, 1, 9] {
        window.push_busy(x);
    }
    // the first busy value is out of the window: [1, 1, 1, 9] has mean 3 and std 2√3
    let features = window.features().unwrap();
    assert_eq!(features[0], 1.);
    assert_float_eq(features[1], 3f64.sqrt(), 1e-12);
    assert_eq!(features[2], 0.);

    window.push_idle(2);
    window.push_idle(2);
    let features = window.features().unwrap();
    assert_eq!(features[0], 0.);
    // [20, 20, 2, 2]
    assert_float_eq(features[2], -1., 1e-12);
}

#[test]
fn test_policy_names() {
    let device = reference_device();
    let workload = Workload::new(vec![-100, 5]);
    for spec in [
        "AlwaysStandby",
        "FixedTimeout[gamma=1000]",
        "PatternPredictor[history=4,stochastic=false,seed=123]",
        "MovingAverage[lookback=5,adjust=true]",
        "Supervised[lookback=10]",
        "ShortBurst[theta=100]",
    ] {
        let policy = default_policy_resolver(spec, &device, &workload).unwrap();
        assert_eq!(policy.to_string(), spec);
    }
    assert_eq!(AlwaysStandbyPolicy::default().to_string(), "AlwaysStandby");
}

#[test]
fn test_policy_resolver_defaults() {
    let device = reference_device();
    let workload = Workload::new(vec![-100, 5]);
    let policy = default_policy_resolver("PatternPredictor", &device, &workload).unwrap();
    assert_eq!(policy.to_string(), "PatternPredictor[history=4,stochastic=false,seed=123]");
    let policy = default_policy_resolver(" MovingAverage[lookback = 3] ", &device, &workload).unwrap();
    assert_eq!(policy.to_string(), "MovingAverage[lookback=3,adjust=true]");
}

#[test]
fn test_policy_resolver_errors() {
    let device = reference_device();
    let workload = Workload::new(vec![-100, 5]);
    for spec in [
        "Oracle",
        "FixedTimeout",
        "FixedTimeout[gamma=soon]",
        "FixedTimeout[gamma=1000",
        "MovingAverage[lookback=0]",
        "PatternPredictor[history=33]",
        "Supervised[lookback=0]",
    ] {
        let err = default_policy_resolver(spec, &device, &workload).err();
        assert!(matches!(err, Some(SimError::Config(_))), "{} resolved", spec);
    }
}

#[test]
fn test_split_spec() {
    let (name, opts) = split_spec("FixedTimeout[gamma=10, extra=x]").unwrap();
    assert_eq!(name, "FixedTimeout");
    assert_eq!(opts.get("gamma").map(String::as_str), Some("10"));
    assert_eq!(opts.get("extra").map(String::as_str), Some("x"));
    let (name, opts) = split_spec("AlwaysStandby").unwrap();
    assert_eq!(name, "AlwaysStandby");
    assert!(opts.is_empty());
}
