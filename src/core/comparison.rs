use super::engine::simulate;
use super::error::{Result, SimError};
use super::types::{ScenarioParams, SimulationResult};

pub const MAX_SCENARIOS: usize = 3;

#[derive(Debug, Clone)]
pub struct NamedScenario {
    pub label: String,
    pub params: ScenarioParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioSummary {
    pub final_capital: f64,
    pub final_contributions: f64,
    pub net_gain: f64,
}

impl From<&SimulationResult> for ScenarioSummary {
    fn from(result: &SimulationResult) -> Self {
        Self {
            final_capital: result.final_capital(),
            final_contributions: result.final_contributions(),
            net_gain: result.net_gain(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub label: String,
    pub asset: String,
    pub seed: u64,
    pub result: SimulationResult,
    pub summary: ScenarioSummary,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Alignment {
    /// Extend shorter series with zeros up to the longest horizon.
    #[default]
    ZeroPad,
    /// Cut every series down to the shortest horizon.
    Truncate,
}

#[derive(Debug, Clone)]
pub struct AlignedSeries {
    pub label: String,
    pub capital_series: Vec<f64>,
    pub contribution_series: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub scenarios: Vec<ScenarioOutcome>,
    pub common_months: usize,
}

impl ComparisonReport {
    pub fn shortest_months(&self) -> usize {
        self.scenarios
            .iter()
            .map(|s| s.result.months())
            .min()
            .unwrap_or(0)
    }

    pub fn aligned(&self, alignment: Alignment) -> Vec<AlignedSeries> {
        let months = match alignment {
            Alignment::ZeroPad => self.common_months,
            Alignment::Truncate => self.shortest_months(),
        };
        self.scenarios
            .iter()
            .map(|s| AlignedSeries {
                label: s.label.clone(),
                capital_series: align_series(&s.result.capital_series, months, alignment),
                contribution_series: align_series(
                    &s.result.contribution_series,
                    months,
                    alignment,
                ),
            })
            .collect()
    }
}

/// Runs each scenario independently. Any failure aborts the comparison.
pub fn compare_scenarios(scenarios: Vec<NamedScenario>) -> Result<ComparisonReport> {
    let mut outcomes = Vec::with_capacity(scenarios.len());
    for NamedScenario { label, params } in scenarios {
        let asset = params.asset.name.clone();
        let seed = params.seed;
        let result = simulate(params).map_err(|e| label_error(&label, e))?;
        let summary = ScenarioSummary::from(&result);
        outcomes.push(ScenarioOutcome {
            label,
            asset,
            seed,
            result,
            summary,
        });
    }

    let common_months = outcomes
        .iter()
        .map(|o| o.result.months())
        .max()
        .unwrap_or(0);

    Ok(ComparisonReport {
        scenarios: outcomes,
        common_months,
    })
}

fn label_error(label: &str, err: SimError) -> SimError {
    match err {
        SimError::InvalidParameter { message } => {
            SimError::invalid_parameter(format!("{label}: {message}"))
        }
        SimError::NotFound { name } => SimError::not_found(format!("{name} ({label})")),
    }
}

/// Returns `series` resized to `months + 1` entries. Padding never truncates
/// and truncation never pads.
pub fn align_series(series: &[f64], months: usize, alignment: Alignment) -> Vec<f64> {
    let target = months + 1;
    match alignment {
        Alignment::ZeroPad => {
            let mut out = series.to_vec();
            if out.len() < target {
                out.resize(target, 0.0);
            }
            out
        }
        Alignment::Truncate => series[..series.len().min(target)].to_vec(),
    }
}
