//! Exact musical time.
//!
//! A [`Tstamp`] is a rational number of beats with the fixed denominator
//! [`TSTAMP_BEAT`]. Values are always normalized so that `0 <= rem < BEAT`;
//! negative times carry the sign in `beats`.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Rem, Sub, SubAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::limits::TSTAMP_BEAT;

const BEAT: i128 = TSTAMP_BEAT as i128;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tstamp {
    beats: i64,
    rem: i64,
}

impl Tstamp {
    pub const ZERO: Tstamp = Tstamp { beats: 0, rem: 0 };
    /// The smallest positive time step.
    pub const EPSILON: Tstamp = Tstamp { beats: 0, rem: 1 };

    /// Build a normalized timestamp; `rem` may be of any sign or magnitude.
    pub fn new(beats: i64, rem: i64) -> Self {
        Self::from_rems(beats as i128 * BEAT + rem as i128)
    }

    pub const fn from_beats(beats: i64) -> Self {
        Self { beats, rem: 0 }
    }

    /// Nearest timestamp to a float number of beats.
    pub fn from_f64(beats: f64) -> Self {
        if !beats.is_finite() {
            return Self::ZERO;
        }
        let whole = beats.floor();
        let rem = ((beats - whole) * TSTAMP_BEAT as f64).round() as i64;
        Self::new(whole as i64, rem)
    }

    /// Build from a total count of `1 / BEAT` units.
    pub fn from_rems(total: i128) -> Self {
        let beats = total.div_euclid(BEAT);
        let rem = total.rem_euclid(BEAT);
        Self {
            beats: beats.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            rem: rem as i64,
        }
    }

    pub fn beats(self) -> i64 {
        self.beats
    }

    pub fn rem(self) -> i64 {
        self.rem
    }

    /// Total count of `1 / BEAT` units.
    pub fn to_rems(self) -> i128 {
        self.beats as i128 * BEAT + self.rem as i128
    }

    /// Float projection for display and pixel math only.
    pub fn to_f64(self) -> f64 {
        self.beats as f64 + self.rem as f64 / TSTAMP_BEAT as f64
    }

    pub fn is_negative(self) -> bool {
        self.beats < 0
    }

    /// `floor(self / other)`. Returns 0 when `other` is zero.
    pub fn floordiv(self, other: Tstamp) -> i64 {
        let divisor = other.to_rems();
        if divisor == 0 {
            return 0;
        }
        floor_div(self.to_rems(), divisor) as i64
    }

    /// Remainder in `[0, other)` for positive `other`.
    pub fn modulo(self, other: Tstamp) -> Tstamp {
        let divisor = other.to_rems();
        if divisor == 0 {
            return self;
        }
        let q = self.floordiv(other) as i128;
        Self::from_rems(self.to_rems() - q * divisor)
    }

    /// Scale by a float factor, rounding to the nearest unit.
    pub fn mul_f64(self, factor: f64) -> Tstamp {
        if !factor.is_finite() {
            return Self::ZERO;
        }
        let total = self.to_rems() as f64 * factor;
        Self::from_rems(total.round() as i128)
    }

    /// Rational quotient `self / other` as a timestamp.
    pub fn div_tstamp(self, other: Tstamp) -> Tstamp {
        let divisor = other.to_rems();
        if divisor == 0 {
            return Self::ZERO;
        }
        Self::from_rems(floor_div(self.to_rems() * BEAT, divisor))
    }

    pub fn clamp_to(self, min: Tstamp, max: Tstamp) -> Tstamp {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

impl fmt::Debug for Tstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tstamp({}, {})", self.beats, self.rem)
    }
}

impl fmt::Display for Tstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rem == 0 {
            write!(f, "{}", self.beats)
        } else {
            write!(f, "{:.3}", self.to_f64())
        }
    }
}

impl Add for Tstamp {
    type Output = Tstamp;
    fn add(self, other: Tstamp) -> Tstamp {
        Tstamp::from_rems(self.to_rems() + other.to_rems())
    }
}

impl AddAssign for Tstamp {
    fn add_assign(&mut self, other: Tstamp) {
        *self = *self + other;
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;
    fn sub(self, other: Tstamp) -> Tstamp {
        Tstamp::from_rems(self.to_rems() - other.to_rems())
    }
}

impl SubAssign for Tstamp {
    fn sub_assign(&mut self, other: Tstamp) {
        *self = *self - other;
    }
}

impl Neg for Tstamp {
    type Output = Tstamp;
    fn neg(self) -> Tstamp {
        Tstamp::from_rems(-self.to_rems())
    }
}

impl Mul<i64> for Tstamp {
    type Output = Tstamp;
    fn mul(self, factor: i64) -> Tstamp {
        Tstamp::from_rems(self.to_rems() * factor as i128)
    }
}

/// Both operands are treated as rationals.
impl Mul<Tstamp> for Tstamp {
    type Output = Tstamp;
    fn mul(self, other: Tstamp) -> Tstamp {
        Tstamp::from_rems((self.to_rems() * other.to_rems()).div_euclid(BEAT))
    }
}

/// Floor division by an integer; division by zero yields zero.
impl Div<i64> for Tstamp {
    type Output = Tstamp;
    fn div(self, divisor: i64) -> Tstamp {
        if divisor == 0 {
            return Tstamp::ZERO;
        }
        Tstamp::from_rems(floor_div(self.to_rems(), divisor as i128))
    }
}

impl Rem<Tstamp> for Tstamp {
    type Output = Tstamp;
    fn rem(self, other: Tstamp) -> Tstamp {
        self.modulo(other)
    }
}

impl From<i64> for Tstamp {
    fn from(beats: i64) -> Self {
        Tstamp::from_beats(beats)
    }
}

impl Serialize for Tstamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.beats, self.rem).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tstamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (beats, rem) = <(i64, i64)>::deserialize(deserializer)?;
        Ok(Tstamp::new(beats, rem))
    }
}

fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const B: i64 = TSTAMP_BEAT;

    #[test]
    fn normalizes_overflowing_rem() {
        let ts = Tstamp::new(1, B + 5);
        assert_eq!(ts.beats(), 2);
        assert_eq!(ts.rem(), 5);
    }

    #[test]
    fn normalizes_negative_rem() {
        let ts = Tstamp::new(0, -1);
        assert_eq!(ts.beats(), -1);
        assert_eq!(ts.rem(), B - 1);
        assert!(ts.is_negative());
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Tstamp::new(1, 0) > Tstamp::new(0, B - 1));
        assert!(Tstamp::new(-1, 5) < Tstamp::ZERO);
        assert!(Tstamp::new(2, 3) < Tstamp::new(2, 4));
    }

    #[test]
    fn arithmetic() {
        let a = Tstamp::new(1, B / 2);
        let b = Tstamp::new(0, B / 2);
        assert_eq!(a + b, Tstamp::new(2, 0));
        assert_eq!(a - b, Tstamp::new(1, 0));
        assert_eq!(b - a, Tstamp::new(-1, 0));
        assert_eq!(-b, Tstamp::new(-1, B / 2));
        assert_eq!(b * 3, Tstamp::new(1, B / 2));
        assert_eq!(a / 3, Tstamp::new(0, B / 2));
    }

    #[test]
    fn rational_multiplication() {
        let half = Tstamp::new(0, B / 2);
        assert_eq!(half * half, Tstamp::new(0, B / 4));
        assert_eq!(Tstamp::new(3, 0) * Tstamp::new(2, 0), Tstamp::new(6, 0));
    }

    #[test]
    fn floordiv_and_modulo() {
        let len = Tstamp::new(4, 0);
        assert_eq!(Tstamp::new(9, 1).floordiv(len), 2);
        assert_eq!(Tstamp::new(9, 1) % len, Tstamp::new(1, 1));
        assert_eq!(Tstamp::new(-1, 0).floordiv(len), -1);
        assert_eq!(Tstamp::new(-1, 0) % len, Tstamp::new(3, 0));
        assert_eq!(Tstamp::new(8, 0) % len, Tstamp::ZERO);
    }

    #[test]
    fn floordiv_by_zero_is_zero() {
        assert_eq!(Tstamp::new(3, 0).floordiv(Tstamp::ZERO), 0);
    }

    #[test]
    fn div_tstamp_is_rational_quotient() {
        let q = Tstamp::new(3, 0).div_tstamp(Tstamp::new(2, 0));
        assert_eq!(q, Tstamp::new(1, B / 2));
    }

    #[test]
    fn float_projection() {
        assert_eq!(Tstamp::new(2, B / 4).to_f64(), 2.25);
        assert_eq!(Tstamp::from_f64(1.75), Tstamp::new(1, 3 * B / 4));
        assert_eq!(Tstamp::from_f64(-0.5), Tstamp::new(-1, B / 2));
    }

    #[test]
    fn serde_form_is_pair() {
        let ts = Tstamp::new(3, 7);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "[3,7]");
        let back: Tstamp = serde_json::from_str("[0,882161281]").unwrap();
        assert_eq!(back, Tstamp::new(1, 1));
    }

    proptest! {
        #[test]
        fn always_normalized(beats in -10_000i64..10_000, rem in -4 * B..4 * B) {
            let ts = Tstamp::new(beats, rem);
            prop_assert!(ts.rem() >= 0 && ts.rem() < B);
            prop_assert_eq!(ts.to_rems(), beats as i128 * B as i128 + rem as i128);
        }

        #[test]
        fn float_matches_components(beats in 0i64..10_000, rem in 0..B) {
            let ts = Tstamp::new(beats, rem);
            let expected = beats as f64 + rem as f64 / B as f64;
            prop_assert!((ts.to_f64() - expected).abs() < 1e-9);
        }

        #[test]
        fn modulo_in_range(a in -1_000i64..1_000, ar in 0..B, b in 1i64..64, br in 0..B) {
            let x = Tstamp::new(a, ar);
            let m = Tstamp::new(b, br);
            let r = x % m;
            prop_assert!(r >= Tstamp::ZERO && r < m);
            prop_assert_eq!(m * x.floordiv(m) + r, x);
        }
    }
}
