//! Fixed-point decimal as stored in ledger accounts: a signed 128-bit mantissa
//! and a base-10 scale, `value = mantissa / 10^scale`.
//!
//! Equality and ordering are defined on the represented value, so `1.50`
//! (`150`, scale 2) and `1.5` (`15`, scale 1) compare equal.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anchor_lang::prelude::borsh;
use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use num_traits::ToPrimitive;

use crate::errors::{LibraryError, LibraryResult};
use crate::math::safe_math::SafeMath;

/// Encoded width: 16-byte mantissa followed by a 4-byte scale.
pub const DECIMAL_SIZE: usize = 20;

/// Widest scale rendered positionally; larger scales print as `<mantissa>e-<scale>`.
const MAX_DISPLAY_SCALE: u32 = 64;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default)]
pub struct Decimal {
    pub mantissa: i128,
    pub scale: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    pub const fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub const fn from_integer(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    /// Mantissa re-expressed at a scale at least as large as the current one.
    pub fn rescale(&self, scale: u32) -> LibraryResult<i128> {
        let factor = 10_i128.safe_pow(scale.safe_sub(self.scale)?)?;
        self.mantissa.safe_mul(factor)
    }

    fn scaled_mantissa(&self, scale: u32) -> Option<i128> {
        let exp = scale.checked_sub(self.scale)?;
        self.mantissa.checked_mul(10_i128.checked_pow(exp)?)
    }

    /// Drops trailing zero digits from the mantissa.
    pub fn normalize(&self) -> Self {
        let mut out = *self;
        while out.scale > 0 && out.mantissa % 10 == 0 {
            out.mantissa /= 10;
            out.scale -= 1;
        }
        out
    }

    fn aligned(&self, other: &Self) -> LibraryResult<(i128, i128, u32)> {
        let scale = self.scale.max(other.scale);
        Ok((self.rescale(scale)?, other.rescale(scale)?, scale))
    }

    pub fn checked_add(&self, other: &Self) -> LibraryResult<Self> {
        let (a, b, scale) = self.aligned(other)?;
        Ok(Self::new(a.safe_add(b)?, scale))
    }

    pub fn checked_sub(&self, other: &Self) -> LibraryResult<Self> {
        let (a, b, scale) = self.aligned(other)?;
        Ok(Self::new(a.safe_sub(b)?, scale))
    }

    pub fn checked_mul(&self, other: &Self) -> LibraryResult<Self> {
        Ok(Self::new(
            self.mantissa.safe_mul(other.mantissa)?,
            self.scale.safe_add(other.scale)?,
        ))
    }

    pub fn checked_abs(&self) -> LibraryResult<Self> {
        match self.mantissa.checked_abs() {
            Some(mantissa) => Ok(Self::new(mantissa, self.scale)),
            None => Err(LibraryError::MathOverflow),
        }
    }

    /// Exact midpoint. An odd sum gains one digit of scale instead of rounding.
    pub fn midpoint(&self, other: &Self) -> LibraryResult<Self> {
        let sum = self.checked_add(other)?;
        if sum.mantissa % 2 == 0 {
            Ok(Self::new(sum.mantissa / 2, sum.scale))
        } else {
            Ok(Self::new(sum.mantissa.safe_mul(5)?, sum.scale.safe_add(1)?))
        }
    }

    /// Lossy conversion for logging and display-side arithmetic.
    pub fn to_f64(&self) -> f64 {
        let mantissa = self.mantissa.to_f64().unwrap_or(f64::NAN);
        mantissa / 10_f64.powi(self.scale.min(i32::MAX as u32) as i32)
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let signs = self.mantissa.signum().cmp(&other.mantissa.signum());
        if signs != Ordering::Equal || self.is_zero() {
            return signs;
        }

        let scale = self.scale.max(other.scale);
        match (self.scaled_mantissa(scale), other.scaled_mantissa(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            // an upscaled mantissa that leaves i128 is beyond anything the other side holds
            (None, _) if self.is_negative() => Ordering::Less,
            (None, _) => Ordering::Greater,
            (_, None) if other.is_negative() => Ordering::Greater,
            (_, None) => Ordering::Less,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.scale > MAX_DISPLAY_SCALE {
            return write!(f, "{sign}{digits}e-{}", self.scale);
        }
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

impl FromStr for Decimal {
    type Err = LibraryError;

    fn from_str(s: &str) -> LibraryResult<Self> {
        let invalid = || LibraryError::InvalidDecimal(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        if (int.is_empty() && frac.is_empty())
            || !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let magnitude: i128 = format!("{int}{frac}").parse().map_err(|_| invalid())?;
        let scale = u32::try_from(frac.len()).map_err(|_| invalid())?;
        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self::new(mantissa, scale))
    }
}
