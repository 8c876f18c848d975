use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::error::{Result, SimError};
use super::types::{
    MAX_HORIZON_YEARS, MAX_VOLATILITY_SCALE, MONTHS_PER_YEAR, ScenarioParams, SimulationResult,
};

/// Runs one scenario with a generator seeded from `params.seed`.
///
/// The generator lives only for the duration of this call, so equal seeds
/// reproduce equal paths no matter what else runs before, after or alongside.
pub fn simulate(params: ScenarioParams) -> Result<SimulationResult> {
    debug!(seed = params.seed, "seeding scenario generator");
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    simulate_with_rng(params, &mut rng)
}

/// Same recurrence as [`simulate`], drawing shocks from a caller-owned
/// generator. `params.seed` is ignored.
pub fn simulate_with_rng<R: Rng + ?Sized>(
    params: ScenarioParams,
    rng: &mut R,
) -> Result<SimulationResult> {
    validate_params(&params)?;

    let mu_month = params.asset.monthly_drift();
    let sigma_month = params.asset.monthly_volatility(params.volatility_scale);
    let shocks = Normal::new(mu_month, sigma_month)
        .map_err(|e| SimError::invalid_parameter(format!("monthly return distribution: {e}")))?;

    debug!(
        asset = %params.asset.name,
        horizon_years = params.horizon_years,
        mu_month,
        sigma_month,
        "simulating scenario"
    );

    let months = params.months();
    let mut capital_series = Vec::with_capacity(months + 1);
    let mut contribution_series = Vec::with_capacity(months + 1);

    let mut balance = params.initial_capital;
    let mut total_contributed = params.initial_capital;
    capital_series.push(balance);
    contribution_series.push(total_contributed);

    for month in 1..=months {
        let year_index = (month - 1) / MONTHS_PER_YEAR as usize;
        let Some(contribution) = params.contributions.monthly_amount(year_index) else {
            return Err(SimError::invalid_parameter(format!(
                "no contribution configured for year {}",
                year_index + 1
            )));
        };

        let r = shocks.sample(rng);
        balance = balance * (1.0 + r) + contribution;
        total_contributed += contribution;

        capital_series.push(balance);
        contribution_series.push(total_contributed);
    }

    Ok(SimulationResult {
        capital_series,
        contribution_series,
    })
}

pub fn validate_params(params: &ScenarioParams) -> Result<()> {
    if params.horizon_years == 0 || params.horizon_years > MAX_HORIZON_YEARS {
        return Err(SimError::invalid_parameter(format!(
            "horizon must be between 1 and {MAX_HORIZON_YEARS} years, got {}",
            params.horizon_years
        )));
    }

    if !params.initial_capital.is_finite() || params.initial_capital < 0.0 {
        return Err(SimError::invalid_parameter(
            "initial capital must be finite and >= 0",
        ));
    }

    if !params.asset.annual_mean_return.is_finite() {
        return Err(SimError::invalid_parameter(format!(
            "mean return of {} must be finite",
            params.asset.name
        )));
    }

    if !params.asset.annual_variance.is_finite() || params.asset.annual_variance < 0.0 {
        return Err(SimError::invalid_parameter(format!(
            "variance of {} must be finite and >= 0",
            params.asset.name
        )));
    }

    if params.contributions.len() != params.horizon_years as usize {
        return Err(SimError::invalid_parameter(format!(
            "contribution schedule covers {} years but the horizon is {} years",
            params.contributions.len(),
            params.horizon_years
        )));
    }

    if !(0.0..=MAX_VOLATILITY_SCALE).contains(&params.volatility_scale) {
        return Err(SimError::invalid_parameter(format!(
            "volatility scale must be between 0 and {MAX_VOLATILITY_SCALE}, got {}",
            params.volatility_scale
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::get_profile;
    use crate::core::types::{AssetProfile, ContributionSchedule};
    use proptest::prelude::{prop_assert, prop_assert_eq, prop_assume, proptest};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_params() -> ScenarioParams {
        ScenarioParams {
            horizon_years: 20,
            initial_capital: 100.0,
            contributions: ContributionSchedule::constant(300.0, 20).expect("valid schedule"),
            asset: get_profile("S&P 500").expect("catalog asset"),
            volatility_scale: 5.0,
            seed: 42,
        }
    }

    fn drift_only_params() -> ScenarioParams {
        ScenarioParams {
            horizon_years: 1,
            initial_capital: 100.0,
            contributions: ContributionSchedule::new(vec![0.0]).expect("valid schedule"),
            asset: AssetProfile::new("Fixed", 0.12, 0.0).expect("valid asset"),
            volatility_scale: 5.0,
            seed: 42,
        }
    }

    #[test]
    fn zero_variance_example_compounds_monthly_drift() {
        let result = simulate(drift_only_params()).expect("valid params");

        assert_eq!(result.capital_series.len(), 13);
        assert_eq!(result.contribution_series.len(), 13);
        assert_approx(result.capital_series[12], 100.0 * 1.01_f64.powi(12));
        assert_approx_tol(result.capital_series[12], 112.68, 0.01);
        assert!(result.contribution_series.iter().all(|&c| c == 100.0));
    }

    #[test]
    fn series_start_at_initial_capital() {
        let result = simulate(sample_params()).expect("valid params");
        assert_eq!(result.capital_series[0], 100.0);
        assert_eq!(result.contribution_series[0], 100.0);
    }

    #[test]
    fn contributions_follow_the_yearly_schedule() {
        let mut params = sample_params();
        params.horizon_years = 3;
        params.contributions =
            ContributionSchedule::new(vec![10.0, 20.0, 30.0]).expect("valid schedule");

        let result = simulate(params).expect("valid params");
        assert_approx(result.contribution_series[12], 100.0 + 12.0 * 10.0);
        assert_approx(result.contribution_series[13], 100.0 + 12.0 * 10.0 + 20.0);
        assert_approx(result.contribution_series[24], 100.0 + 12.0 * 30.0);
        assert_approx(result.contribution_series[36], 100.0 + 12.0 * 60.0);
    }

    #[test]
    fn zero_variance_matches_hand_recurrence_with_contributions() {
        let mut params = drift_only_params();
        params.horizon_years = 2;
        params.initial_capital = 1_000.0;
        params.contributions = ContributionSchedule::new(vec![50.0, 75.0]).expect("valid");
        let mu = params.asset.monthly_drift();

        let result = simulate(params).expect("valid params");
        for m in 1..result.capital_series.len() {
            let contribution = if m <= 12 { 50.0 } else { 75.0 };
            let expected = result.capital_series[m - 1] * (1.0 + mu) + contribution;
            assert_approx(result.capital_series[m], expected);
        }
    }

    #[test]
    fn same_seed_reruns_are_bit_identical() {
        let first = simulate(sample_params()).expect("valid params");
        let _unrelated = simulate(ScenarioParams {
            seed: 7,
            ..sample_params()
        })
        .expect("valid params");
        let second = simulate(sample_params()).expect("valid params");

        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_diverge_when_volatility_is_positive() {
        let a = simulate(sample_params()).expect("valid params");
        let b = simulate(ScenarioParams {
            seed: 43,
            ..sample_params()
        })
        .expect("valid params");

        assert_ne!(a.capital_series, b.capital_series);
        assert_eq!(a.contribution_series, b.contribution_series);
    }

    #[test]
    fn zero_volatility_scale_makes_seed_irrelevant() {
        let mut params = sample_params();
        params.volatility_scale = 0.0;
        let a = simulate(params.clone()).expect("valid params");
        params.seed = 999;
        let b = simulate(params).expect("valid params");

        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_runs_reproduce_sequential_runs() {
        let seeds = [1_u64, 2, 3, 42];
        let sequential: Vec<_> = seeds
            .iter()
            .map(|&seed| {
                simulate(ScenarioParams {
                    seed,
                    ..sample_params()
                })
                .expect("valid params")
            })
            .collect();

        let concurrent: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .iter()
                .map(|&seed| {
                    scope.spawn(move || {
                        simulate(ScenarioParams {
                            seed,
                            ..sample_params()
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked").expect("valid params"))
                .collect()
        });

        assert_eq!(sequential, concurrent);
    }

    #[test]
    fn caller_owned_generator_matches_seeded_run() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let with_rng = simulate_with_rng(sample_params(), &mut rng).expect("valid params");
        let seeded = simulate(sample_params()).expect("valid params");
        assert_eq!(with_rng, seeded);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_debug_log(run: impl FnOnce()) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, run);
        let bytes = log.0.lock().expect("log buffer").clone();
        String::from_utf8(bytes).expect("utf-8 log")
    }

    #[test]
    fn seed_is_logged_only_when_it_seeds_the_generator() {
        let params = ScenarioParams {
            seed: 777_777,
            ..sample_params()
        };

        let caller_owned = captured_debug_log(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            simulate_with_rng(params.clone(), &mut rng).expect("valid params");
        });
        assert!(caller_owned.contains("simulating scenario"));
        assert!(!caller_owned.contains("777777"));

        let seeded = captured_debug_log(|| {
            simulate(params.clone()).expect("valid params");
        });
        assert!(seeded.contains("seed=777777"));
    }

    #[test]
    fn rejects_zero_and_oversized_horizons() {
        let mut params = drift_only_params();
        params.horizon_years = 0;
        params.contributions = ContributionSchedule::new(vec![0.0]).expect("valid");
        let err = simulate(params).expect_err("zero horizon must fail");
        assert!(matches!(err, SimError::InvalidParameter { .. }));

        let mut params = sample_params();
        params.horizon_years = 51;
        params.contributions = ContributionSchedule::constant(0.0, 51).expect("valid");
        assert!(simulate(params).is_err());
    }

    #[test]
    fn rejects_negative_capital() {
        let mut params = sample_params();
        params.initial_capital = -1.0;
        let err = simulate(params).expect_err("negative capital must fail");
        assert!(err.to_string().contains("initial capital"));
    }

    #[test]
    fn rejects_negative_variance_on_hand_built_asset() {
        let mut params = sample_params();
        params.asset.annual_variance = -0.01;
        let err = simulate(params).expect_err("negative variance must fail");
        assert!(err.to_string().contains("variance"));
    }

    #[test]
    fn rejects_short_contribution_schedule() {
        let mut params = sample_params();
        params.contributions = ContributionSchedule::constant(300.0, 19).expect("valid");
        let err = simulate(params).expect_err("missing year must fail");
        assert!(err.to_string().contains("covers 19 years"));
    }

    #[test]
    fn rejects_volatility_scale_outside_domain() {
        for scale in [-0.5, 10.5, f64::NAN] {
            let mut params = sample_params();
            params.volatility_scale = scale;
            assert!(simulate(params).is_err(), "scale {scale} must fail");
        }
    }

    #[test]
    fn extreme_compounding_is_not_clamped() {
        let mut params = sample_params();
        params.horizon_years = 50;
        params.contributions = ContributionSchedule::constant(0.0, 50).expect("valid");
        params.asset = AssetProfile::new("Runaway", 1.0e6, 0.0).expect("valid asset");

        let result = simulate(params).expect("valid params");
        assert!(result.final_capital().is_infinite());
    }

    proptest! {
        #[test]
        fn prop_series_lengths_match_horizon(
            horizon in 1_u32..=50,
            seed in 0_u64..10_000,
            scale in 1.0_f64..=10.0,
        ) {
            let params = ScenarioParams {
                horizon_years: horizon,
                initial_capital: 1_000.0,
                contributions: ContributionSchedule::constant(100.0, horizon).expect("valid"),
                asset: get_profile("Gold").expect("catalog asset"),
                volatility_scale: scale,
                seed,
            };
            let result = simulate(params).expect("valid params");
            let expected = horizon as usize * 12 + 1;
            prop_assert_eq!(result.capital_series.len(), expected);
            prop_assert_eq!(result.contribution_series.len(), expected);
        }

        #[test]
        fn prop_contributions_are_non_decreasing(
            horizon in 1_u32..=20,
            amount in 0.0_f64..5_000.0,
            seed in 0_u64..10_000,
        ) {
            let params = ScenarioParams {
                horizon_years: horizon,
                initial_capital: 0.0,
                contributions: ContributionSchedule::constant(amount, horizon).expect("valid"),
                asset: get_profile("Tesla").expect("catalog asset"),
                volatility_scale: 10.0,
                seed,
            };
            let result = simulate(params).expect("valid params");
            prop_assert!(result.contribution_series.windows(2).all(|w| w[1] >= w[0]));
        }

        #[test]
        fn prop_same_seed_is_reproducible(
            seed in 0_u64..100_000,
            scale in 1.0_f64..=10.0,
        ) {
            let params = ScenarioParams {
                seed,
                volatility_scale: scale,
                ..sample_params()
            };
            let a = simulate(params.clone()).expect("valid params");
            let b = simulate(params).expect("valid params");
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_zero_variance_ignores_seed(
            seed_a in 0_u64..100_000,
            seed_b in 0_u64..100_000,
        ) {
            prop_assume!(seed_a != seed_b);
            let mut params = drift_only_params();
            params.seed = seed_a;
            let a = simulate(params.clone()).expect("valid params");
            params.seed = seed_b;
            let b = simulate(params).expect("valid params");
            prop_assert_eq!(a, b);
        }
    }
}
