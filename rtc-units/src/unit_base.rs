//! Shared arithmetic for the unit types.
//!
//! Every unit wraps an `i64`. `i64::MAX` and `i64::MIN` are reserved for
//! plus and minus infinity, and all arithmetic saturates at those values
//! instead of overflowing.

pub(crate) const PLUS_INFINITY: i64 = i64::MAX;
pub(crate) const MINUS_INFINITY: i64 = i64::MIN;

#[inline]
pub(crate) fn is_infinite(value: i64) -> bool {
    value == PLUS_INFINITY || value == MINUS_INFINITY
}

#[inline]
pub(crate) fn to_f64(value: i64) -> f64 {
    match value {
        PLUS_INFINITY => f64::INFINITY,
        MINUS_INFINITY => f64::NEG_INFINITY,
        v => v as f64,
    }
}

/// Rounds to the nearest integer, mapping out-of-range values to the
/// infinities. NaN maps to zero.
#[inline]
pub(crate) fn from_f64(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else if value >= PLUS_INFINITY as f64 {
        PLUS_INFINITY
    } else if value <= MINUS_INFINITY as f64 {
        MINUS_INFINITY
    } else {
        value.round() as i64
    }
}

/// Narrows a wide intermediate result, saturating at the infinities.
#[inline]
pub(crate) fn from_i128(value: i128) -> i64 {
    if value >= PLUS_INFINITY as i128 {
        PLUS_INFINITY
    } else if value <= MINUS_INFINITY as i128 {
        MINUS_INFINITY
    } else {
        value as i64
    }
}

#[inline]
pub(crate) fn add(lhs: i64, rhs: i64) -> i64 {
    if lhs == PLUS_INFINITY || rhs == PLUS_INFINITY {
        PLUS_INFINITY
    } else if lhs == MINUS_INFINITY || rhs == MINUS_INFINITY {
        MINUS_INFINITY
    } else {
        lhs.saturating_add(rhs)
    }
}

#[inline]
pub(crate) fn sub(lhs: i64, rhs: i64) -> i64 {
    if lhs == PLUS_INFINITY || rhs == MINUS_INFINITY {
        PLUS_INFINITY
    } else if lhs == MINUS_INFINITY || rhs == PLUS_INFINITY {
        MINUS_INFINITY
    } else {
        lhs.saturating_sub(rhs)
    }
}

#[inline]
pub(crate) fn scale(value: i64, scalar: f64) -> i64 {
    if is_infinite(value) {
        if scalar == 0.0 || scalar.is_nan() {
            return 0;
        }
        let positive = (value == PLUS_INFINITY) == (scalar > 0.0);
        return if positive { PLUS_INFINITY } else { MINUS_INFINITY };
    }
    from_f64(value as f64 * scalar)
}

#[inline]
pub(crate) fn mul_int(value: i64, scalar: i64) -> i64 {
    if is_infinite(value) {
        return scale(value, scalar as f64);
    }
    from_i128(value as i128 * scalar as i128)
}

/// Implements the constructors, predicates and formatting shared by every
/// unit, absolute or relative.
macro_rules! unit_base {
    ($name:ident, $suffix:expr) => {
        impl $name {
            /// The zero value.
            pub const fn zero() -> Self {
                Self(0)
            }

            pub const fn plus_infinity() -> Self {
                Self($crate::unit_base::PLUS_INFINITY)
            }

            pub const fn minus_infinity() -> Self {
                Self($crate::unit_base::MINUS_INFINITY)
            }

            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }

            pub const fn is_plus_infinity(&self) -> bool {
                self.0 == $crate::unit_base::PLUS_INFINITY
            }

            pub const fn is_minus_infinity(&self) -> bool {
                self.0 == $crate::unit_base::MINUS_INFINITY
            }

            pub const fn is_infinite(&self) -> bool {
                self.is_plus_infinity() || self.is_minus_infinity()
            }

            pub const fn is_finite(&self) -> bool {
                !self.is_infinite()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_plus_infinity() {
                    write!(f, "+inf {}", $suffix)
                } else if self.is_minus_infinity() {
                    write!(f, "-inf {}", $suffix)
                } else {
                    write!(f, "{} {}", self.0, $suffix)
                }
            }
        }
    };
}

/// Implements the arithmetic of a relative unit (a quantity, not a point in
/// time): sums, differences, scaling and ratios.
macro_rules! relative_unit {
    ($name:ident) => {
        impl std::ops::Add for $name {
            type Output = $name;

            fn add(self, rhs: $name) -> $name {
                $name($crate::unit_base::add(self.0, rhs.0))
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                *self = *self + rhs;
            }
        }

        impl std::ops::Sub for $name {
            type Output = $name;

            fn sub(self, rhs: $name) -> $name {
                $name($crate::unit_base::sub(self.0, rhs.0))
            }
        }

        impl std::ops::SubAssign for $name {
            fn sub_assign(&mut self, rhs: $name) {
                *self = *self - rhs;
            }
        }

        impl std::ops::Mul<f64> for $name {
            type Output = $name;

            fn mul(self, rhs: f64) -> $name {
                $name($crate::unit_base::scale(self.0, rhs))
            }
        }

        impl std::ops::Mul<$name> for f64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                rhs * self
            }
        }

        impl std::ops::Mul<i64> for $name {
            type Output = $name;

            fn mul(self, rhs: i64) -> $name {
                $name($crate::unit_base::mul_int(self.0, rhs))
            }
        }

        impl std::ops::Mul<$name> for i64 {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                rhs * self
            }
        }

        impl std::ops::Div<f64> for $name {
            type Output = $name;

            fn div(self, rhs: f64) -> $name {
                $name($crate::unit_base::from_f64(
                    $crate::unit_base::to_f64(self.0) / rhs,
                ))
            }
        }

        impl std::ops::Div<i64> for $name {
            type Output = $name;

            fn div(self, rhs: i64) -> $name {
                if self.is_infinite() || rhs == 0 {
                    return self / rhs as f64;
                }
                $name(self.0 / rhs)
            }
        }

        /// The ratio between two quantities of the same unit.
        impl std::ops::Div for $name {
            type Output = f64;

            fn div(self, rhs: $name) -> f64 {
                $crate::unit_base::to_f64(self.0) / $crate::unit_base::to_f64(rhs.0)
            }
        }
    };
}
