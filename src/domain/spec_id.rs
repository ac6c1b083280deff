use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use non_empty_string::NonEmptyString;

/// A validated specification identifier prefix.
///
/// Prefixes are two or more characters, start with an uppercase letter and
/// contain only uppercase letters and digits (e.g. `AUTH`, `API2`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Prefix(NonEmptyString);

impl Prefix {
    /// Creates a new `Prefix` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrefixError` if the string is shorter than two
    /// characters, does not start with an uppercase letter, or contains
    /// characters other than uppercase letters and digits.
    pub fn new(s: String) -> Result<Self, InvalidPrefixError> {
        let non_empty =
            NonEmptyString::new(s.clone()).map_err(|_| InvalidPrefixError(s.clone()))?;

        let mut chars = s.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        let rest_alphanumeric =
            chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());

        if s.len() < 2 || !starts_with_letter || !rest_alphanumeric {
            return Err(InvalidPrefixError(s));
        }

        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for Prefix {
    type Error = InvalidPrefixError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for Prefix {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Prefix {
    type Err = InvalidPrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Error returned when a string is not a valid identifier prefix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid prefix '{0}': must be 2+ characters, start with an uppercase letter, and contain \
     only uppercase letters and digits"
)]
pub struct InvalidPrefixError(String);

/// A specification identifier of the form `PREFIX-NNN`.
///
/// The numeric part is compared numerically, so `AUTH-001` and `AUTH-1` are
/// the same identifier. The zero-padded width seen when the identifier was
/// parsed is preserved for display only, so that re-serializing a parsed
/// identifier reproduces its source form exactly.
///
/// Examples: `AUTH-001`, `API2-42`, `STORE-0103`
#[derive(Debug, Clone)]
pub struct SpecId {
    prefix: Prefix,
    number: u32,
    /// Digit width of the source form. Display-only, never identity.
    width: usize,
}

impl SpecId {
    /// Create an identifier from pre-validated parts.
    ///
    /// The display width defaults to the natural width of `number`.
    #[must_use]
    pub fn new(prefix: Prefix, number: u32) -> Self {
        let width = decimal_width(number);
        Self {
            prefix,
            number,
            width,
        }
    }

    /// Returns the prefix component.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// Returns the numeric component.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }
}

const fn decimal_width(mut n: u32) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

impl PartialEq for SpecId {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.number == other.number
    }
}

impl Eq for SpecId {}

impl PartialOrd for SpecId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpecId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl Hash for SpecId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.as_str().hash(state);
        self.number.hash(state);
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{:0width$}",
            self.prefix,
            self.number,
            width = self.width
        )
    }
}

/// Errors that can occur during identifier parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Malformed structure (no dash separator, empty parts).
    #[error("Invalid identifier format: {0}")]
    Syntax(String),

    /// Invalid numeric part.
    #[error("Invalid number in identifier '{0}': expected digits, got {1}")]
    Number(String, String),

    /// Invalid prefix part.
    #[error(transparent)]
    Prefix(InvalidPrefixError),
}

impl From<InvalidPrefixError> for Error {
    fn from(err: InvalidPrefixError) -> Self {
        Self::Prefix(err)
    }
}

impl FromStr for SpecId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix_str, number_str)) = s.split_once('-') else {
            return Err(Error::Syntax(s.to_string()));
        };

        if prefix_str.is_empty() || number_str.is_empty() || number_str.contains('-') {
            return Err(Error::Syntax(s.to_string()));
        }

        if !number_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Number(s.to_string(), number_str.to_string()));
        }
        let number = number_str
            .parse::<u32>()
            .map_err(|_| Error::Number(s.to_string(), number_str.to_string()))?;

        let prefix = Prefix::new(prefix_str.to_string())?;

        Ok(Self {
            prefix,
            number,
            width: number_str.len(),
        })
    }
}

impl TryFrom<&str> for SpecId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}
