use std::{fmt::Display, path::Path, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Cost of a diagonal step in 8-connected mode
pub const DIAGONAL_COST: f64 = 1.41421356237;

/// Weight of the heuristic added on top of `g + h` to break ties towards the goal
pub const TIE_BREAK_EPS: f64 = 1e-6;

/// Accepted diagonal costs. Outside this range the octile heuristic overestimates.
pub const DIAGONAL_COST_RANGE: (f64, f64) = (1.0, 2.0);

/// Accepted tie-break weights. The found cost is within a factor `1 + eps` of the optimum.
pub const TIE_BREAK_EPS_RANGE: (f64, f64) = (0.0, 1e-3);

/// Which cells count as adjacent during search
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Connectivity {
    /// up, down, left, right
    #[default]
    #[serde(rename = "4")]
    Four,
    /// cardinal moves plus the four diagonals
    #[serde(rename = "8")]
    Eight,
}

impl Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Connectivity::Four => "4-connected",
                Connectivity::Eight => "8-connected",
            }
        )
    }
}

impl FromStr for Connectivity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" | "four" | "4-connected" => Ok(Connectivity::Four),
            "8" | "eight" | "8-connected" => Ok(Connectivity::Eight),
            _ => Err(anyhow::anyhow!("Invalid connectivity: {}", s)),
        }
    }
}

/// Parameters of a single search call.
///
/// Passed explicitly to every search so that calls with different settings
/// never observe each other.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub connectivity: Connectivity,
    pub diagonal_cost: f64,
    /// Allow a diagonal step between two blocked cells that share a corner
    pub allow_corner_cutting: bool,
    pub tie_break_eps: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::default(),
            diagonal_cost: DIAGONAL_COST,
            allow_corner_cutting: false,
            tie_break_eps: TIE_BREAK_EPS,
        }
    }
}

impl SearchConfig {
    pub fn with_connectivity(connectivity: Connectivity) -> Self {
        Self {
            connectivity,
            ..Default::default()
        }
    }

    /// Rejects parameters that would let the search return a path that is not the cheapest
    pub fn validate(&self) -> Result<(), PlanError> {
        check_range("diagonal_cost", self.diagonal_cost, DIAGONAL_COST_RANGE)?;
        check_range("tie_break_eps", self.tie_break_eps, TIE_BREAK_EPS_RANGE)
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), PlanError> {
    // NaN fails the range check too
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PlanError::InvalidConfig {
            field,
            value,
            min,
            max,
        })
    }
}

/// Everything `plan` needs besides the grid and the endpoints
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub search: SearchConfig,
    /// Run the waypoint simplifier on the raw path
    pub simplify: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            simplify: true,
        }
    }
}

impl PlannerConfig {
    /// Reads a (possibly partial) configuration from a JSON file and validates it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .search
            .validate()
            .with_context(|| format!("checking config {}", path.display()))?;
        Ok(config)
    }
}
