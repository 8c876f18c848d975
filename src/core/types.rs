use serde::Serialize;

use super::error::{Result, SimError};

pub const MONTHS_PER_YEAR: u32 = 12;
pub const MAX_HORIZON_YEARS: u32 = 50;
pub const NEUTRAL_VOLATILITY_SCALE: f64 = 5.0;
pub const MAX_VOLATILITY_SCALE: f64 = 10.0;
pub const DEFAULT_BLOCK_YEARS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub name: String,
    pub annual_mean_return: f64,
    pub annual_variance: f64,
}

impl AssetProfile {
    /// Builds a profile outside the catalog, e.g. for a user-defined asset.
    pub fn new(
        name: impl Into<String>,
        annual_mean_return: f64,
        annual_variance: f64,
    ) -> Result<Self> {
        if !annual_mean_return.is_finite() {
            return Err(SimError::invalid_parameter(
                "annual mean return must be finite",
            ));
        }
        if !annual_variance.is_finite() || annual_variance < 0.0 {
            return Err(SimError::invalid_parameter(
                "annual variance must be finite and >= 0",
            ));
        }
        Ok(Self {
            name: name.into(),
            annual_mean_return,
            annual_variance,
        })
    }

    pub fn monthly_drift(&self) -> f64 {
        self.annual_mean_return / MONTHS_PER_YEAR as f64
    }

    /// Monthly standard deviation, scaled so that `NEUTRAL_VOLATILITY_SCALE`
    /// leaves the historical volatility untouched.
    pub fn monthly_volatility(&self, volatility_scale: f64) -> f64 {
        (self.annual_variance / MONTHS_PER_YEAR as f64).sqrt()
            * (volatility_scale / NEUTRAL_VOLATILITY_SCALE)
    }
}

/// Monthly contribution amount for each year of the horizon, indexed by
/// zero-based year.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSchedule {
    yearly: Vec<f64>,
}

#[allow(clippy::len_without_is_empty)]
impl ContributionSchedule {
    pub fn new(yearly: Vec<f64>) -> Result<Self> {
        if yearly.is_empty() {
            return Err(SimError::invalid_parameter(
                "contribution schedule must cover at least one year",
            ));
        }
        if let Some(year) = yearly.iter().position(|amount| !amount.is_finite()) {
            return Err(SimError::invalid_parameter(format!(
                "contribution for year {} must be finite",
                year + 1
            )));
        }
        Ok(Self { yearly })
    }

    pub fn constant(monthly_amount: f64, years: u32) -> Result<Self> {
        Self::new(vec![monthly_amount; years as usize])
    }

    /// Expands one amount per block of `block_years` years into a per-year
    /// schedule. The last block is clipped to the horizon.
    pub fn from_blocks(blocks: &[f64], block_years: u32, horizon_years: u32) -> Result<Self> {
        if block_years == 0 {
            return Err(SimError::invalid_parameter("block length must be >= 1 year"));
        }
        let expected = horizon_years.div_ceil(block_years) as usize;
        if blocks.len() != expected {
            return Err(SimError::invalid_parameter(format!(
                "expected {expected} contribution blocks of {block_years} years for a {horizon_years}-year horizon, got {}",
                blocks.len()
            )));
        }

        let mut yearly = Vec::with_capacity(horizon_years as usize);
        for (idx, &amount) in blocks.iter().enumerate() {
            let start = idx as u32 * block_years;
            let end = ((idx as u32 + 1) * block_years).min(horizon_years);
            yearly.extend(std::iter::repeat_n(amount, (end - start) as usize));
        }
        Self::new(yearly)
    }

    pub fn monthly_amount(&self, year_index: usize) -> Option<f64> {
        self.yearly.get(year_index).copied()
    }

    pub fn len(&self) -> usize {
        self.yearly.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.yearly
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParams {
    pub horizon_years: u32,
    pub initial_capital: f64,
    pub contributions: ContributionSchedule,
    pub asset: AssetProfile,
    pub volatility_scale: f64,
    pub seed: u64,
}

impl ScenarioParams {
    pub fn months(&self) -> usize {
        (self.horizon_years * MONTHS_PER_YEAR) as usize
    }
}

/// Month-indexed output of one run. Index 0 is the initial state, index `i`
/// the end of month `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub capital_series: Vec<f64>,
    pub contribution_series: Vec<f64>,
}

impl SimulationResult {
    pub fn months(&self) -> usize {
        self.capital_series.len().saturating_sub(1)
    }

    pub fn final_capital(&self) -> f64 {
        self.capital_series.last().copied().unwrap_or(0.0)
    }

    pub fn final_contributions(&self) -> f64 {
        self.contribution_series.last().copied().unwrap_or(0.0)
    }

    pub fn net_gain(&self) -> f64 {
        self.final_capital() - self.final_contributions()
    }
}
