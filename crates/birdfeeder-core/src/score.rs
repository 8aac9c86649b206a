//! # Score Module
//!
//! Classification confidence as integer basis points.
//!
//! The model backend reports scores as decimals in `[0, 1]`. The core never
//! does float arithmetic, so every score is parsed from its decimal text
//! straight into basis points (`0.7` -> `7000`). Digits past the fourth
//! decimal place are truncated.

use crate::error::{CoreError, Result};
use serde::de::{self, Visitor};
use serde::ser;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A confidence score in basis points, `0..=10000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(u16);

impl Score {
    /// The highest possible score (1.0).
    pub const MAX: Score = Score(10_000);

    /// The lowest possible score (0.0).
    pub const ZERO: Score = Score(0);

    /// Create a score from basis points, clamped to [`Score::MAX`].
    #[must_use]
    pub const fn from_bp(bp: u16) -> Self {
        if bp > Self::MAX.0 {
            Self::MAX
        } else {
            Self(bp)
        }
    }

    /// Raw basis points.
    #[must_use]
    pub fn bp(self) -> u16 {
        self.0
    }

    /// Whole percent, truncated.
    #[must_use]
    pub fn percent(self) -> u8 {
        (self.0 / 100) as u8
    }

    /// Lossless decimal rendering with four places (`"0.7304"`).
    #[must_use]
    pub fn to_decimal(self) -> String {
        format!("{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

impl FromStr for Score {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        parse_basis_points(s)
            .map(Score)
            .ok_or_else(|| CoreError::InvalidScore(s.to_string()))
    }
}

/// Two decimals, rounded half up, like `%.2f`.
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (u32::from(self.0) + 50) / 100;
        write!(f, "{}.{:02}", hundredths / 100, hundredths % 100)
    }
}

/// Parse decimal text (`"0.65"`, `".7"`, `"7e-1"`) into basis points.
fn parse_basis_points(text: &str) -> Option<u16> {
    let s = text.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], s[i + 1..].parse::<i64>().ok()?),
        None => (s, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(0);
    }

    // value = significant * 10^(exponent - frac_len); bp = value * 10^4
    let shift = exponent
        .checked_sub(i64::try_from(frac_part.len()).ok()?)?
        .checked_add(4)?;

    let kept = if shift >= 0 {
        significant
    } else {
        let drop = usize::try_from(shift.unsigned_abs()).ok()?;
        if drop >= significant.len() {
            return Some(0);
        }
        &significant[..significant.len() - drop]
    };

    let zeros = usize::try_from(shift.max(0)).ok()?;
    // 10000 has five digits; anything longer is out of range.
    if kept.len().saturating_add(zeros) > 5 {
        return None;
    }

    let mut value: u32 = kept.parse().ok()?;
    for _ in 0..zeros {
        value = value.checked_mul(10)?;
    }

    u16::try_from(value).ok().filter(|bp| *bp <= Score::MAX.0)
}

// =============================================================================
// SERDE
// =============================================================================

// A JSON number built from the exact decimal text; the shortest float
// rendering of four decimal places reads back to the same basis points.
impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let number: f64 = self
            .to_decimal()
            .parse()
            .map_err(|_| <S::Error as ser::Error>::custom("unrepresentable score"))?;
        serializer.serialize_f64(number)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ScoreVisitor)
    }
}

struct ScoreVisitor;

impl ScoreVisitor {
    fn parse<E: de::Error>(text: &str) -> std::result::Result<Score, E> {
        text.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(text), &"a decimal between 0 and 1"))
    }
}

impl Visitor<'_> for ScoreVisitor {
    type Value = Score;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a score between 0 and 1 as a number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Score, E> {
        Self::parse(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Score, E> {
        Self::parse(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Score, E> {
        Self::parse(&v.to_string())
    }

    // Shortest round-trip text of the float, so no arithmetic is needed.
    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Score, E> {
        Self::parse(&v.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
