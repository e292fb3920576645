// src/models/family.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Test family. Each family owns a fixed set of dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[serde(alias = "pola")]
    Pattern,
    #[serde(alias = "gaya")]
    Style,
}

/// One axis of a family's weight vector.
///
/// Declaration order is the tie-break priority used by the scoring engine
/// and the iteration order of every `BTreeMap<Dimension, _>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Consistent,
    Fast,
    Reflective,
    Balanced,
    Visual,
    Auditori,
    Kinestetik,
}

const PATTERN_DIMENSIONS: [Dimension; 4] = [
    Dimension::Consistent,
    Dimension::Fast,
    Dimension::Reflective,
    Dimension::Balanced,
];

const STYLE_DIMENSIONS: [Dimension; 3] =
    [Dimension::Visual, Dimension::Auditori, Dimension::Kinestetik];

impl Family {
    pub const ALL: [Family; 2] = [Family::Pattern, Family::Style];

    /// Dimensions of this family, in priority order.
    pub fn dimensions(self) -> &'static [Dimension] {
        match self {
            Family::Pattern => &PATTERN_DIMENSIONS,
            Family::Style => &STYLE_DIMENSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Pattern => "pattern",
            Family::Style => "style",
        }
    }

    /// Name of the cached label column on `users`.
    pub fn profile_field(self) -> &'static str {
        match self {
            Family::Pattern => "learning_pattern",
            Family::Style => "learning_style",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown test family '{0}'")]
pub struct UnknownFamily(pub String);

impl FromStr for Family {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" | "pola" => Ok(Family::Pattern),
            "style" | "gaya" => Ok(Family::Style),
            _ => Err(UnknownFamily(s.to_string())),
        }
    }
}

impl Dimension {
    pub fn family(self) -> Family {
        if PATTERN_DIMENSIONS.contains(&self) {
            Family::Pattern
        } else {
            Family::Style
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Consistent => "consistent",
            Dimension::Fast => "fast",
            Dimension::Reflective => "reflective",
            Dimension::Balanced => "balanced",
            Dimension::Visual => "visual",
            Dimension::Auditori => "auditori",
            Dimension::Kinestetik => "kinestetik",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PATTERN_DIMENSIONS
            .iter()
            .chain(STYLE_DIMENSIONS.iter())
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeightVectorError {
    #[error("dimension '{dimension}' does not belong to the {family} family")]
    ForeignDimension { family: Family, dimension: Dimension },
    #[error("weight for '{0}' is missing")]
    MissingDimension(Dimension),
    #[error("weight vector is empty")]
    Empty,
}

/// Per-dimension weights of a single choice.
///
/// Always complete for exactly one family. Every way in, including
/// deserialization of stored JSON, goes through [`WeightVector::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Dimension, u32>",
    into = "BTreeMap<Dimension, u32>"
)]
pub struct WeightVector {
    family: Family,
    weights: BTreeMap<Dimension, u32>,
}

impl WeightVector {
    pub fn new(family: Family, weights: BTreeMap<Dimension, u32>) -> Result<Self, WeightVectorError> {
        if let Some(dimension) = weights.keys().find(|d| d.family() != family) {
            return Err(WeightVectorError::ForeignDimension {
                family,
                dimension: *dimension,
            });
        }
        if let Some(missing) = family.dimensions().iter().find(|d| !weights.contains_key(d)) {
            return Err(WeightVectorError::MissingDimension(*missing));
        }
        Ok(Self { family, weights })
    }

    /// Builds a vector from weights listed in the family's priority order.
    pub fn from_ordered(family: Family, weights: &[u32]) -> Result<Self, WeightVectorError> {
        let dims = family.dimensions();
        if weights.len() < dims.len() {
            return Err(WeightVectorError::MissingDimension(dims[weights.len()]));
        }
        Self::new(family, dims.iter().copied().zip(weights.iter().copied()).collect())
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn get(&self, dimension: Dimension) -> u32 {
        self.weights.get(&dimension).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.weights.values().map(|w| i64::from(*w)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, u32)> + '_ {
        self.weights.iter().map(|(d, w)| (*d, *w))
    }
}

/// The family is taken from the first key; [`WeightVector::new`] then
/// rejects anything that is not exactly that family's dimensions.
impl TryFrom<BTreeMap<Dimension, u32>> for WeightVector {
    type Error = WeightVectorError;

    fn try_from(weights: BTreeMap<Dimension, u32>) -> Result<Self, Self::Error> {
        let family = weights
            .keys()
            .next()
            .map(|d| d.family())
            .ok_or(WeightVectorError::Empty)?;
        Self::new(family, weights)
    }
}

impl From<WeightVector> for BTreeMap<Dimension, u32> {
    fn from(vector: WeightVector) -> Self {
        vector.weights
    }
}
