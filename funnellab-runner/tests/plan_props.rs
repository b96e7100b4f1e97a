//! Property tests for the funnel plan and the OOM gate.

use funnellab_runner::{
    build_plan, decide, estimate, FunnelConfig, GatePolicy, OomGateAction, StageConfig, StageName,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plan_rates_widen_towards_confirmation(
        base in 0.001f64..=1.0,
        k0 in 0usize..200,
        k1 in 0usize..200,
    ) {
        let plan = build_plan(base, k0, k1).unwrap();
        let rates: Vec<f64> = plan.stages().iter().map(|s| s.param_subsample_rate).collect();
        prop_assert_eq!(rates[0], base);
        prop_assert_eq!(rates[1], (2.0 * base).min(1.0));
        prop_assert_eq!(rates[2], 1.0);
        prop_assert!(rates[0] <= rates[1] && rates[1] <= rates[2]);
        prop_assert_eq!(plan.stage(StageName::Stage2Confirm).topk, None);
    }

    #[test]
    fn gate_never_raises_the_rate(
        params in 1usize..5000,
        bars in 1usize..5000,
        limit in 0.01f64..50.0,
        base in 0.01f64..=1.0,
    ) {
        let plan = build_plan(base, 10, 5).unwrap();
        let cfg = StageConfig::merge(
            &FunnelConfig::default(),
            plan.stage(StageName::Stage1Topk),
            bars,
            params,
            None,
        );
        let policy = GatePolicy {
            mem_limit_mb: limit,
            allow_auto_downsample: true,
            downsample_step: 0.5,
            downsample_min: 0.01,
        };
        let d = decide(&cfg, &policy).unwrap();
        prop_assert!(d.final_subsample <= d.planned_subsample);
        prop_assert_eq!(d.new_cfg.param_subsample_rate, d.final_subsample);
        match d.action {
            OomGateAction::Proceed => prop_assert_eq!(d.final_subsample, d.planned_subsample),
            OomGateAction::AutoDownsample => {
                prop_assert!(d.final_subsample < d.planned_subsample);
                prop_assert!(estimate(params, bars, d.final_subsample).mem_est_mb <= limit);
            }
            OomGateAction::Block => prop_assert_eq!(d.final_subsample, d.planned_subsample),
        }
    }
}
