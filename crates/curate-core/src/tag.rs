//! Signed tags and predicate matching.
//!
//! A predicate is a conjunction of signed tags: `+name` requires the tag to be
//! present, `-name` requires it to be absent. Matching is a pure function of
//! the tag set.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Whether a signed tag adds (requires) or removes (forbids) a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Add,
    Remove,
}

impl Sign {
    const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Remove => '-',
        }
    }
}

/// A tag name with a sign, written `+name` or `-name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedTag {
    pub sign: Sign,
    pub name: String,
}

impl SignedTag {
    #[must_use]
    pub fn add(name: impl Into<String>) -> Self {
        Self {
            sign: Sign::Add,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            sign: Sign::Remove,
            name: name.into(),
        }
    }

    /// True if this single requirement holds for `tags`.
    #[must_use]
    pub fn holds<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        let present = tags.iter().any(|t| t.as_ref() == self.name);
        match self.sign {
            Sign::Add => present,
            Sign::Remove => !present,
        }
    }
}

/// Returns true if ALL predicates hold for `tags`.
#[must_use]
pub fn matches<S: AsRef<str>>(tags: &[S], predicates: &[SignedTag]) -> bool {
    predicates.iter().all(|p| p.holds(tags))
}

/// Error returned when text is not a valid signed tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTagError {
    pub got: String,
    pub reason: &'static str,
}

impl fmt::Display for ParseTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid signed tag '{}': {}", self.got, self.reason)
    }
}

impl std::error::Error for ParseTagError {}

impl FromStr for SignedTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseTagError {
            got: s.to_string(),
            reason,
        };
        let mut chars = s.chars();
        let sign = match chars.next() {
            Some('+') => Sign::Add,
            Some('-') => Sign::Remove,
            _ => return Err(err("must start with '+' or '-'")),
        };
        let name = chars.as_str();
        if name.is_empty() {
            return Err(err("tag name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(err("tag name contains whitespace"));
        }
        Ok(Self {
            sign,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SignedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign.symbol(), self.name)
    }
}

impl Serialize for SignedTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignedTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
