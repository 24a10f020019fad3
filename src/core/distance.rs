use thiserror::Error;

/// Errors produced by the cost transform
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostError {
    #[error("Cost exponent must be at least 1")]
    ZeroExponent,

    #[error("Cost overflow: age difference {difference} raised to {exponent}")]
    Overflow { difference: u32, exponent: u32 },
}

/// Absolute age difference between two records
#[inline]
pub fn age_difference(a: u32, b: u32) -> u32 {
    a.abs_diff(b)
}

/// Edge cost between a subject and a comparison record
///
/// cost = |u_age - v_age|^k
///
/// # Arguments
/// * `u_age` - Age of the subject record
/// * `v_age` - Age of the comparison record
/// * `k` - Cost exponent (>= 1)
#[inline]
pub fn edge_cost(u_age: u32, v_age: u32, k: u32) -> Result<u64, CostError> {
    if k == 0 {
        return Err(CostError::ZeroExponent);
    }
    let difference = age_difference(u_age, v_age);
    u64::from(difference)
        .checked_pow(k)
        .ok_or(CostError::Overflow {
            difference,
            exponent: k,
        })
}

/// Recover an integer age gap from a cost: ceil(total^(1/k))
///
/// For a single edge this is the exact age gap. For a sum of several edge
/// costs with k > 1 it is only an approximation of the combined gap; it is
/// still the figure reported as the effective gap of a stratum.
///
/// The root is computed exactly on integers, so perfect powers never round
/// up past their root. An exponent of 0 or 1 returns `total` unchanged.
pub fn decode(total: u64, k: u32) -> u64 {
    if total == 0 || k <= 1 {
        return total;
    }

    // Float estimate, then corrected to the exact integer floor root
    let mut root = (total as f64).powf(1.0 / f64::from(k)).round() as u64;
    while root > 0 && !pow_at_most(root, k, total) {
        root -= 1;
    }
    while pow_at_most(root + 1, k, total) {
        root += 1;
    }

    if root.pow(k) == total {
        root
    } else {
        root + 1
    }
}

#[inline]
fn pow_at_most(base: u64, k: u32, limit: u64) -> bool {
    base.checked_pow(k).map_or(false, |p| p <= limit)
}
