pub mod catalog;
pub mod comparison;
mod engine;
mod error;
mod types;

pub use catalog::{DEFAULT_ASSET, get_profile, profiles};
pub use comparison::{
    AlignedSeries, Alignment, ComparisonReport, MAX_SCENARIOS, NamedScenario, ScenarioOutcome,
    ScenarioSummary, align_series, compare_scenarios,
};
pub use engine::{simulate, simulate_with_rng, validate_params};
pub use error::{Result, SimError};
pub use types::{
    AssetProfile, ContributionSchedule, DEFAULT_BLOCK_YEARS, MAX_HORIZON_YEARS,
    MAX_VOLATILITY_SCALE, MONTHS_PER_YEAR, NEUTRAL_VOLATILITY_SCALE, ScenarioParams,
    SimulationResult,
};
