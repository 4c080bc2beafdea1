//! Hypergeometric tail probabilities
//!
//! Answers "how likely is it to see at least `threshold` marked items among
//! `draws` items taken without replacement from a population of
//! `population` items, `marked` of which are marked?".
//!
//! Binomial coefficients are computed exactly with `num-bigint`; the only
//! floating-point step is the final division of the summed numerator by
//! `C(population, draws)`, done by `num-rational` so that ratios of numbers
//! far beyond `f64::MAX` still convert correctly.

use crate::error::{Error, Result};
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

/// Exact binomial coefficient `C(n, r)`; zero when `r > n`
pub fn binomial(n: u64, r: u64) -> BigUint {
    if r > n {
        return BigUint::zero();
    }

    let r = r.min(n - r);
    let mut result = BigUint::one();
    for i in 0..r {
        // result * (n - i) is always divisible by (i + 1)
        result = result * BigUint::from(n - i) / BigUint::from(i + 1);
    }
    result
}

struct Domain {
    population: u64,
    marked: u64,
    draws: u64,
}

fn validate(population: i64, marked: i64, draws: i64, threshold: i64) -> Result<Domain> {
    let invalid = population < 0
        || marked < 0
        || draws < 0
        || threshold < 0
        || marked > population
        || draws > population;

    if invalid {
        return Err(Error::InvalidDomain {
            population,
            marked,
            draws,
            threshold,
        });
    }

    Ok(Domain {
        population: population as u64,
        marked: marked as u64,
        draws: draws as u64,
    })
}

fn ratio_to_f64(numerator: BigUint, denominator: BigUint) -> Result<f64> {
    let ratio = BigRational::new(BigInt::from(numerator), BigInt::from(denominator));
    ratio
        .to_f64()
        .ok_or_else(|| Error::Statistics("probability is not representable as f64".to_string()))
}

/// Probability mass `P(X = x)`
pub fn probability_mass(population: i64, marked: i64, draws: i64, x: i64) -> Result<f64> {
    let domain = validate(population, marked, draws, x)?;
    let x = x as u64;

    if x > domain.marked.min(domain.draws) || domain.draws - x > domain.population - domain.marked
    {
        return Ok(0.0);
    }

    let numerator = binomial(domain.marked, x)
        * binomial(domain.population - domain.marked, domain.draws - x);
    ratio_to_f64(numerator, binomial(domain.population, domain.draws))
}

/// Upper tail `P(X >= threshold)` of the hypergeometric distribution
///
/// # Errors
///
/// [`Error::InvalidDomain`] when any argument is negative, when
/// `marked > population`, or when `draws > population`.
///
/// A threshold above `min(marked, draws)` is not an error: the summation
/// range is empty and the result is exactly `0.0`.
///
/// # Example
///
/// ```
/// use ecolabel::hypergeometric::tail_probability;
///
/// // Every outcome has at least zero marked items
/// assert_eq!(tail_probability(10, 3, 5, 0).unwrap(), 1.0);
/// // Only three marked items exist
/// assert_eq!(tail_probability(10, 3, 5, 4).unwrap(), 0.0);
/// ```
pub fn tail_probability(population: i64, marked: i64, draws: i64, threshold: i64) -> Result<f64> {
    let domain = validate(population, marked, draws, threshold)?;
    let threshold = threshold as u64;
    let upper = domain.marked.min(domain.draws);

    if threshold > upper {
        return Ok(0.0);
    }

    let unmarked = domain.population - domain.marked;
    let mut numerator = BigUint::zero();
    for x in threshold..=upper {
        // C(unmarked, draws - x) is zero when draws - x > unmarked
        numerator += binomial(domain.marked, x) * binomial(unmarked, domain.draws - x);
    }

    let denominator = binomial(domain.population, domain.draws);
    ratio_to_f64(numerator, denominator)
}
