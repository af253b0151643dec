//! Country-code prefixed phone number type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default country calling code accepted by checkout.
pub const DEFAULT_COUNTRY_PREFIX: &str = "+94";

/// Number of subscriber digits following the country code.
pub const SUBSCRIBER_DIGITS: usize = 9;

/// `+94` followed by nine ASCII digits.
static DEFAULT_PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+94[0-9]{9}$").expect("Invalid regex"));

/// Pattern for `prefix` followed by [`SUBSCRIBER_DIGITS`] ASCII digits.
fn pattern_for(prefix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "^{}[0-9]{{{SUBSCRIBER_DIGITS}}}$",
        regex::escape(prefix)
    ))
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("Phone number is required")]
    Empty,
    /// The input is not the country prefix followed by nine digits.
    #[error("Invalid phone number (e.g., {example})")]
    InvalidFormat {
        /// Example of a well-formed number for the expected prefix.
        example: String,
    },
}

/// A phone number of the form `+<country code><9 digits>`, e.g. `+94771234567`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number with the default `+94` prefix.
    ///
    /// # Errors
    ///
    /// See [`PhoneNumber::parse_with_prefix`].
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        Self::parse_with_prefix(s, DEFAULT_COUNTRY_PREFIX)
    }

    /// Parse a phone number that must start with `prefix` followed by
    /// exactly nine ASCII digits.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::InvalidFormat`] for anything else that does not match.
    pub fn parse_with_prefix(s: &str, prefix: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let invalid = || PhoneError::InvalidFormat {
            example: format!("{prefix}771234567"),
        };
        let valid = if prefix == DEFAULT_COUNTRY_PREFIX {
            DEFAULT_PHONE_PATTERN.is_match(s)
        } else {
            pattern_for(prefix).map_err(|_| invalid())?.is_match(s)
        };

        if !valid {
            return Err(invalid());
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
