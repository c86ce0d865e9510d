//! Arbitrary-precision comparisons for the number keywords.
//!
//! `serde_json`'s `arbitrary_precision` feature keeps a `Number`'s original
//! decimal text around instead of collapsing it into an `f64`, so `multipleOf`
//! and the min/max keywords can be evaluated as exact rationals rather than
//! drifting through floating point (e.g. `multipleOf: 0.1` against `1.2`).

use std::str::FromStr;

use fraction::BigFraction;
use serde_json::Number;

pub fn to_fraction(n: &Number) -> Option<BigFraction> {
    BigFraction::from_str(&n.to_string()).ok()
}

pub fn lt(a: &Number, b: &Number) -> Option<bool> {
    Some(to_fraction(a)? < to_fraction(b)?)
}

pub fn le(a: &Number, b: &Number) -> Option<bool> {
    Some(to_fraction(a)? <= to_fraction(b)?)
}

pub fn gt(a: &Number, b: &Number) -> Option<bool> {
    Some(to_fraction(a)? > to_fraction(b)?)
}

pub fn ge(a: &Number, b: &Number) -> Option<bool> {
    Some(to_fraction(a)? >= to_fraction(b)?)
}

/// `instance` passes `multipleOf: divisor` iff `instance / divisor` is an integer.
pub fn is_multiple_of(instance: &Number, divisor: &Number) -> Option<bool> {
    let instance = to_fraction(instance)?;
    let divisor = to_fraction(divisor)?;
    if divisor == BigFraction::from(0) {
        return Some(false);
    }
    let quotient = instance / divisor;
    Some(quotient.fract() == BigFraction::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Number {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn multiple_of_rational() {
        assert_eq!(is_multiple_of(&num("1.2"), &num("0.1")), Some(true));
        assert_eq!(is_multiple_of(&num("1.25"), &num("0.1")), Some(false));
    }

    #[test]
    fn multiple_of_integers() {
        assert_eq!(is_multiple_of(&num("9"), &num("3")), Some(true));
        assert_eq!(is_multiple_of(&num("10"), &num("3")), Some(false));
    }

    #[test]
    fn ordering() {
        assert_eq!(lt(&num("1"), &num("2")), Some(true));
        assert_eq!(ge(&num("2"), &num("2")), Some(true));
    }
}
