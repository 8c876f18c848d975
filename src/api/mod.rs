use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Args;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::core::{
    AlignedSeries, Alignment, AssetProfile, ContributionSchedule, DEFAULT_ASSET,
    DEFAULT_BLOCK_YEARS, MAX_HORIZON_YEARS, MAX_SCENARIOS, MAX_VOLATILITY_SCALE, NamedScenario,
    ScenarioOutcome, ScenarioParams, ScenarioSummary, compare_scenarios, get_profile, profiles,
    simulate,
};

const MIN_VOLATILITY_SCALE: f64 = 1.0;
const RANDOM_SEED_UPPER: u64 = 100_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiAlignment {
    #[default]
    #[serde(alias = "zeroPad", alias = "zero_pad", alias = "pad")]
    ZeroPad,
    Truncate,
}

impl From<ApiAlignment> for Alignment {
    fn from(value: ApiAlignment) -> Self {
        match value {
            ApiAlignment::ZeroPad => Alignment::ZeroPad,
            ApiAlignment::Truncate => Alignment::Truncate,
        }
    }
}

/// One scenario as entered on the command line. API payloads are layered on
/// top of [`ScenarioArgs::default`].
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ScenarioArgs {
    #[arg(long, help = "Label shown next to the scenario's results")]
    pub label: Option<String>,
    #[arg(long, default_value = DEFAULT_ASSET, help = "Catalog asset name")]
    pub asset: String,
    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Annual mean return (%) of a custom asset; overrides --asset"
    )]
    pub custom_mean_return: Option<f64>,
    #[arg(long, help = "Annual volatility (%) of a custom asset")]
    pub custom_volatility: Option<f64>,
    #[arg(long, default_value_t = 20)]
    pub years: u32,
    #[arg(long, default_value_t = 100.0)]
    pub initial_capital: f64,
    #[arg(
        long,
        num_args = 1..,
        default_values_t = [300.0],
        allow_hyphen_values = true,
        help = "Monthly contribution per block of --block-years years; a single value applies to every block"
    )]
    pub monthly_contribution: Vec<f64>,
    #[arg(long, default_value_t = DEFAULT_BLOCK_YEARS)]
    pub block_years: u32,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Randomness level from 1 (calm) to 10 (wild); 5 uses the asset's historical volatility"
    )]
    pub volatility_scale: f64,
    #[arg(long, help = "Random seed; a random one is drawn when omitted")]
    pub seed: Option<u64>,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            label: None,
            asset: DEFAULT_ASSET.to_string(),
            custom_mean_return: None,
            custom_volatility: None,
            years: 20,
            initial_capital: 100.0,
            monthly_contribution: vec![300.0],
            block_years: DEFAULT_BLOCK_YEARS,
            volatility_scale: 5.0,
            seed: None,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioPayload {
    label: Option<String>,
    asset: Option<String>,
    custom_mean_return: Option<f64>,
    custom_volatility: Option<f64>,
    #[serde(alias = "horizonYears")]
    years: Option<u32>,
    initial_capital: Option<f64>,
    #[serde(alias = "contributions")]
    monthly_contribution: Option<Vec<f64>>,
    block_years: Option<u32>,
    #[serde(alias = "randomness")]
    volatility_scale: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompareRequest {
    seed: Option<u64>,
    alignment: Option<ApiAlignment>,
    scenarios: Vec<ScenarioPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResponse {
    pub label: String,
    pub asset: String,
    pub seed: u64,
    pub months: usize,
    pub capital_series: Vec<f64>,
    pub contribution_series: Vec<f64>,
    pub final_capital: f64,
    pub final_contributions: f64,
    pub net_gain: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub seed: u64,
    pub common_months: usize,
    pub alignment: ApiAlignment,
    pub scenarios: Vec<ScenarioResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_params(args: ScenarioArgs, fallback_seed: u64) -> Result<ScenarioParams, String> {
    if args.years == 0 || args.years > MAX_HORIZON_YEARS {
        return Err(format!("years must be between 1 and {MAX_HORIZON_YEARS}"));
    }

    if !args.initial_capital.is_finite() || args.initial_capital < 0.0 {
        return Err("initial capital must be >= 0".to_string());
    }

    if !(MIN_VOLATILITY_SCALE..=MAX_VOLATILITY_SCALE).contains(&args.volatility_scale) {
        return Err(format!(
            "volatility scale must be between {MIN_VOLATILITY_SCALE} and {MAX_VOLATILITY_SCALE}"
        ));
    }

    if args.block_years == 0 {
        return Err("block years must be >= 1".to_string());
    }

    let asset = match (args.custom_mean_return, args.custom_volatility) {
        (Some(mean), Some(vol)) => {
            if !vol.is_finite() || vol < 0.0 {
                return Err("custom volatility must be >= 0".to_string());
            }
            let vol = vol / 100.0;
            AssetProfile::new("Custom", mean / 100.0, vol * vol).map_err(|e| e.to_string())?
        }
        (Some(_), None) => {
            return Err(
                "custom volatility is required when a custom mean return is set".to_string(),
            );
        }
        (None, Some(_)) => {
            return Err(
                "custom mean return is required when a custom volatility is set".to_string(),
            );
        }
        (None, None) => get_profile(&args.asset).map_err(|e| e.to_string())?,
    };

    let contributions = match args.monthly_contribution.as_slice() {
        [] => return Err("monthly contribution needs at least one value".to_string()),
        [amount] => ContributionSchedule::constant(*amount, args.years),
        blocks => ContributionSchedule::from_blocks(blocks, args.block_years, args.years),
    }
    .map_err(|e| e.to_string())?;

    Ok(ScenarioParams {
        horizon_years: args.years,
        initial_capital: args.initial_capital,
        contributions,
        asset,
        volatility_scale: args.volatility_scale,
        seed: args.seed.unwrap_or(fallback_seed),
    })
}

pub fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..RANDOM_SEED_UPPER)
}

pub fn simulate_scenario(args: ScenarioArgs) -> Result<ScenarioResponse, String> {
    let label = args.label.clone().unwrap_or_else(|| "Scenario 1".to_string());
    let params = build_params(args, random_seed())?;
    let asset = params.asset.name.clone();
    let seed = params.seed;
    let result = simulate(params).map_err(|e| e.to_string())?;
    let summary = ScenarioSummary::from(&result);

    Ok(ScenarioResponse {
        label,
        asset,
        seed,
        months: result.months(),
        capital_series: result.capital_series,
        contribution_series: result.contribution_series,
        final_capital: summary.final_capital,
        final_contributions: summary.final_contributions,
        net_gain: summary.net_gain,
    })
}

pub fn compare(request: CompareRequest) -> Result<CompareResponse, String> {
    if request.scenarios.is_empty() {
        return Err("at least one scenario is required".to_string());
    }
    if request.scenarios.len() > MAX_SCENARIOS {
        return Err(format!("at most {MAX_SCENARIOS} scenarios can be compared"));
    }

    let shared_seed = request.seed.unwrap_or_else(random_seed);
    let alignment = request.alignment.unwrap_or_default();

    let mut scenarios = Vec::with_capacity(request.scenarios.len());
    for (idx, payload) in request.scenarios.into_iter().enumerate() {
        let args = args_from_payload(payload);
        let label = args
            .label
            .clone()
            .unwrap_or_else(|| format!("Scenario {}", idx + 1));
        let params = build_params(args, shared_seed).map_err(|msg| format!("{label}: {msg}"))?;
        scenarios.push(NamedScenario { label, params });
    }

    let report = compare_scenarios(scenarios).map_err(|e| e.to_string())?;
    let aligned = report.aligned(alignment.into());
    let scenarios = report
        .scenarios
        .iter()
        .zip(aligned)
        .map(|(outcome, series)| scenario_response(outcome, series))
        .collect();

    Ok(CompareResponse {
        seed: shared_seed,
        common_months: report.common_months,
        alignment,
        scenarios,
    })
}

pub fn compare_request_from_json(json: &str) -> Result<CompareRequest, String> {
    serde_json::from_str::<CompareRequest>(json)
        .map_err(|e| format!("Invalid compare JSON payload: {e}"))
}

fn scenario_response(outcome: &ScenarioOutcome, series: AlignedSeries) -> ScenarioResponse {
    ScenarioResponse {
        label: series.label,
        asset: outcome.asset.clone(),
        seed: outcome.seed,
        months: outcome.result.months(),
        capital_series: series.capital_series,
        contribution_series: series.contribution_series,
        final_capital: outcome.summary.final_capital,
        final_contributions: outcome.summary.final_contributions,
        net_gain: outcome.summary.net_gain,
    }
}

fn args_from_payload(payload: ScenarioPayload) -> ScenarioArgs {
    let mut args = ScenarioArgs::default();

    if let Some(v) = payload.label {
        args.label = Some(v);
    }
    if let Some(v) = payload.asset {
        args.asset = v;
    }
    if let Some(v) = payload.custom_mean_return {
        args.custom_mean_return = Some(v);
    }
    if let Some(v) = payload.custom_volatility {
        args.custom_volatility = Some(v);
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.initial_capital {
        args.initial_capital = v;
    }
    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if let Some(v) = payload.block_years {
        args.block_years = v;
    }
    if let Some(v) = payload.volatility_scale {
        args.volatility_scale = v;
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }

    args
}

pub fn asset_list() -> Vec<AssetProfile> {
    profiles().collect()
}

pub fn router() -> Router {
    Router::new()
        .route("/api/assets", get(assets_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "investment simulator API listening");
    info!("local access: http://127.0.0.1:{port}/api/assets");

    axum::serve(listener, router()).await
}

async fn assets_handler() -> Response {
    json_response(StatusCode::OK, asset_list())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(payload: Result<Json<ScenarioPayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_body("simulate", rejection),
    };
    let args = args_from_payload(payload);
    blocking_response(
        "simulate",
        tokio::task::spawn_blocking(move || simulate_scenario(args)).await,
    )
}

async fn compare_handler(request: Result<Json<CompareRequest>, JsonRejection>) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return rejected_body("compare", rejection),
    };
    blocking_response(
        "compare",
        tokio::task::spawn_blocking(move || compare(request)).await,
    )
}

fn rejected_body(route: &str, rejection: JsonRejection) -> Response {
    let msg = format!("Invalid {route} JSON payload: {}", rejection.body_text());
    warn!(error = %msg, "rejected {route} request");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

fn blocking_response<T: Serialize>(
    route: &str,
    outcome: Result<Result<T, String>, JoinError>,
) -> Response {
    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(msg)) => {
            warn!(error = %msg, "rejected {route} request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("{route} task failed: {e}"),
        ),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
