use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    /// Shared-quota model with the backend's default output resolution.
    #[default]
    Standard,
    /// Billable higher-fidelity model; always requests an explicit image size.
    Pro,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "standard" | "free" => Ok(Tier::Standard),
            "pro" => Ok(Tier::Pro),
            other => Err(anyhow!("Unknown tier '{other}' (expected standard or pro)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProfile {
    pub model: String,
    pub image_size: Option<String>,
}

impl TierProfile {
    pub fn new(model: &str, image_size: Option<&str>) -> Self {
        TierProfile {
            model: model.to_string(),
            image_size: image_size
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        }
    }
}

/// Backend selection keyed by tier. Request construction reads from here and
/// never branches on the tier itself.
#[derive(Debug, Clone)]
pub struct TierTable {
    standard: TierProfile,
    pro: TierProfile,
}

impl TierTable {
    pub fn new(standard: TierProfile, pro: TierProfile) -> Self {
        TierTable { standard, pro }
    }

    pub fn profile(&self, tier: Tier) -> &TierProfile {
        match tier {
            Tier::Standard => &self.standard,
            Tier::Pro => &self.pro,
        }
    }
}
