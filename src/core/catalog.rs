use super::error::{Result, SimError};
use super::types::AssetProfile;

/// (name, annualized mean return, annualized variance of returns)
static ASSET_TABLE: [(&str, f64, f64); 19] = [
    ("Airbus", 0.112, 0.14),
    ("Alphabet (Google)", 0.22, 0.1024),
    ("Amazon", 0.27, 0.16),
    ("Apple", 0.298, 0.1024),
    ("Aston Martin", -0.4321, 0.25),
    ("Bitcoin", 1.761, 2.25),
    ("Cocoa", 0.0961, 0.0628),
    ("Ferrari", 0.273, 0.0144),
    ("IBEX 35", 0.07, 0.04),
    ("Johnson & Johnson", 0.09, 0.03),
    ("Mercedes-Benz", 0.021, 0.0225),
    ("Microsoft", 0.174, 0.0625),
    ("NVIDIA", 0.472, 0.3025),
    ("Gold", 0.102, 0.0361),
    ("Crude Oil (WTI)", 0.12, 0.25),
    ("S&P 500", 0.09, 0.0324),
    ("Tesla", 0.3379, 0.25),
    ("TSMC", 0.1895, 0.10),
    ("Volkswagen", -0.0368, 0.01),
];

pub const DEFAULT_ASSET: &str = "S&P 500";

fn to_profile(&(name, mean, variance): &(&str, f64, f64)) -> AssetProfile {
    AssetProfile {
        name: name.to_string(),
        annual_mean_return: mean,
        annual_variance: variance,
    }
}

/// Resolves an asset by exact name, falling back to a case-insensitive match.
pub fn get_profile(name: &str) -> Result<AssetProfile> {
    let trimmed = name.trim();
    ASSET_TABLE
        .iter()
        .find(|(candidate, _, _)| *candidate == trimmed)
        .or_else(|| {
            ASSET_TABLE
                .iter()
                .find(|(candidate, _, _)| candidate.eq_ignore_ascii_case(trimmed))
        })
        .map(to_profile)
        .ok_or_else(|| SimError::not_found(name))
}

pub fn profiles() -> impl Iterator<Item = AssetProfile> {
    ASSET_TABLE.iter().map(to_profile)
}
