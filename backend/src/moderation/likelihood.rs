//! Likelihood ratings and the safe/unsafe verdict.
//!
//! The Video Intelligence API reports likelihoods either as enum names
//! (`"VERY_LIKELY"`) or as their numeric codes (`5`) depending on the
//! transport. Both are folded into [`Likelihood`] when deserializing, so the
//! rest of the crate only ever compares variants.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// How likely a frame is to contain the detected content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Likelihood {
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    /// Map the API's numeric code. Out-of-range codes are `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Likelihood::VeryUnlikely,
            2 => Likelihood::Unlikely,
            3 => Likelihood::Possible,
            4 => Likelihood::Likely,
            5 => Likelihood::VeryLikely,
            _ => Likelihood::Unknown,
        }
    }

    /// Map the API's enum name. Unrecognized names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "VERY_UNLIKELY" => Likelihood::VeryUnlikely,
            "UNLIKELY" => Likelihood::Unlikely,
            "POSSIBLE" => Likelihood::Possible,
            "LIKELY" => Likelihood::Likely,
            "VERY_LIKELY" => Likelihood::VeryLikely,
            _ => Likelihood::Unknown,
        }
    }

    /// Canonical API name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Likelihood::Unknown => "LIKELIHOOD_UNSPECIFIED",
            Likelihood::VeryUnlikely => "VERY_UNLIKELY",
            Likelihood::Unlikely => "UNLIKELY",
            Likelihood::Possible => "POSSIBLE",
            Likelihood::Likely => "LIKELY",
            Likelihood::VeryLikely => "VERY_LIKELY",
        }
    }

    /// `Likely` and `VeryLikely` make a video unsuitable for minors.
    pub fn is_unsafe(&self) -> bool {
        matches!(self, Likelihood::Likely | Likelihood::VeryLikely)
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Likelihood {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLikelihood {
    Code(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for Likelihood {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawLikelihood::deserialize(deserializer)? {
            RawLikelihood::Code(code) => Likelihood::from_code(code),
            RawLikelihood::Name(name) => Likelihood::from_name(&name),
        })
    }
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Unsafe,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe => f.write_str("SAFE"),
            Verdict::Unsafe => f.write_str("UNSAFE"),
        }
    }
}
