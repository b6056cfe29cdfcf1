//! Comparison direction of the min/max statistic.

use std::fmt;
use std::str::FromStr;

use crate::error::PermTestError;

/// One-sided direction of the test.
///
/// - [`Mode::Greater`]: statistic is the *smallest* `mean(C) − mean(G)`;
///   the p-value counts null draws strictly above the observed value.
/// - [`Mode::Lesser`]: statistic is the *largest* `mean(C) − mean(G)`;
///   the p-value counts null draws strictly below the observed value.
///
/// # Examples
///
/// ```
/// use u_permtest::minmax::Mode;
///
/// let mode: Mode = "lesser".parse().unwrap();
/// assert_eq!(mode, Mode::Lesser);
/// assert!("both".parse::<Mode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Control mean exceeds every other group mean.
    Greater,
    /// Control mean is below every other group mean.
    Lesser,
}

impl Mode {
    /// Literal accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Greater => "greater",
            Mode::Lesser => "lesser",
        }
    }

    /// Reduces candidate differences to the directional extreme.
    ///
    /// The first occurrence wins on ties. Returns `None` for an empty input.
    pub fn extreme<I>(self, diffs: I) -> Option<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        diffs.into_iter().fold(None, |best, d| match best {
            None => Some(d),
            Some(b) if self.improves(d, b) => Some(d),
            keep => keep,
        })
    }

    /// Whether a null draw is strictly more extreme than `observed`.
    pub fn exceeds(self, null: f64, observed: f64) -> bool {
        match self {
            Mode::Greater => null > observed,
            Mode::Lesser => null < observed,
        }
    }

    fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            Mode::Greater => candidate < best,
            Mode::Lesser => candidate > best,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = PermTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater" => Ok(Mode::Greater),
            "lesser" => Ok(Mode::Lesser),
            other => Err(PermTestError::InvalidMode {
                mode: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for mode in [Mode::Greater, Mode::Lesser] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "Greater".parse::<Mode>().unwrap_err();
        assert_eq!(
            err,
            PermTestError::InvalidMode {
                mode: "Greater".into()
            }
        );
        assert!("".parse::<Mode>().is_err());
    }

    #[test]
    fn extreme_direction() {
        let d = [-4.0, -9.0, 2.0];
        assert_eq!(Mode::Greater.extreme(d), Some(-9.0));
        assert_eq!(Mode::Lesser.extreme(d), Some(2.0));
        assert_eq!(Mode::Greater.extreme(std::iter::empty()), None);
    }

    #[test]
    fn exceeds_is_strict() {
        assert!(Mode::Greater.exceeds(1.0, 0.0));
        assert!(!Mode::Greater.exceeds(0.0, 0.0));
        assert!(Mode::Lesser.exceeds(-1.0, 0.0));
        assert!(!Mode::Lesser.exceeds(0.0, 0.0));
    }
}
