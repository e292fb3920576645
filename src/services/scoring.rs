// src/services/scoring.rs

//! Weighted-dimension scorer shared by both test families.

use std::collections::BTreeMap;

use crate::models::family::{Dimension, Family, WeightVector};

/// Totals per dimension and the dimension that wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub dimension_totals: BTreeMap<Dimension, i64>,
    pub dominant: Dimension,
}

/// Sums the weight vectors componentwise over the family's dimensions and
/// picks the maximum.
///
/// Ties go to the dimension that comes first in [`Family::dimensions`]. With no
/// vectors at all every total is zero and the first dimension wins.
pub fn score<'a, I>(family: Family, vectors: I) -> Score
where
    I: IntoIterator<Item = &'a WeightVector>,
{
    let mut dimension_totals: BTreeMap<Dimension, i64> =
        family.dimensions().iter().map(|d| (*d, 0)).collect();

    for vector in vectors {
        for (dimension, total) in dimension_totals.iter_mut() {
            *total += i64::from(vector.get(*dimension));
        }
    }

    let mut dominant = family.dimensions()[0];
    let mut best = i64::MIN;
    for dimension in family.dimensions() {
        let total = dimension_totals[dimension];
        // Strictly greater: an equal later total never displaces an earlier one.
        if total > best {
            best = total;
            dominant = *dimension;
        }
    }

    Score {
        dimension_totals,
        dominant,
    }
}

/// Share of each dimension in percent, rounded to the nearest integer
/// (halves round up). All zeros when nothing was scored.
pub fn percentages(totals: &BTreeMap<Dimension, i64>) -> BTreeMap<Dimension, u32> {
    let sum: i64 = totals.values().sum();
    totals
        .iter()
        .map(|(dimension, total)| {
            let pct = if sum > 0 {
                ((*total as f64 / sum as f64) * 100.0).round() as u32
            } else {
                0
            };
            (*dimension, pct)
        })
        .collect()
}
