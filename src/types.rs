// src/types.rs

use std::fmt;

/// Active change-detection mode of the daemon.
///
/// - `Notification`: kernel change notification on the spool directory.
/// - `Poll`: periodic directory listing. Chosen at startup when the
///   notification subscription cannot be installed, or permanently after a
///   notification read failure. A demoted run never promotes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Notification,
    Poll,
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchMode::Notification => write!(f, "notification"),
            WatchMode::Poll => write!(f, "poll"),
        }
    }
}

/// Which side of a call a CDR file describes.
///
/// Derived from the filename: a basename starting with `a_` is leg "a",
/// anything else (including names shorter than two characters) is leg "b".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    A,
    B,
}

impl Leg {
    pub fn from_basename(basename: &str) -> Self {
        if basename.starts_with("a_") {
            Leg::A
        } else {
            Leg::B
        }
    }

    /// Wire value handed to the importer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::A => "a",
            Leg::B => "b",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_a_requires_exact_prefix() {
        assert_eq!(Leg::from_basename("a_1700000000.123.cdr.xml"), Leg::A);
        assert_eq!(Leg::from_basename("b_1700000000.123.cdr.xml"), Leg::B);
        assert_eq!(Leg::from_basename("ab_something.cdr.xml"), Leg::B);
        assert_eq!(Leg::from_basename("A_upper.cdr.xml"), Leg::B);
    }

    #[test]
    fn short_basenames_are_leg_b() {
        assert_eq!(Leg::from_basename(""), Leg::B);
        assert_eq!(Leg::from_basename("a"), Leg::B);
        assert_eq!(Leg::from_basename("_"), Leg::B);
    }
}
