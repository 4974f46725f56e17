//! Normalisation of yes/no configuration tokens.
//!
//! Toggles may be written as strings (`"Yes"`, `"n"`, ...) or numbers (`1`, `0.0`). They are
//! turned into a plain `bool` as soon as they are read, so nothing downstream sees the tokens.
use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer};

/// Tokens which are read as `true`
const TRUE_TOKENS: [&str; 6] = ["Yes", "YES", "yes", "Y", "y", "1"];

/// Tokens which are read as `false`
const FALSE_TOKENS: [&str; 7] = ["No", "NO", "no", "N", "n", "0", "0.0"];

/// Parse a toggle token into a `bool`
pub fn parse_toggle(token: &str) -> Result<bool> {
    let token = token.trim();
    if TRUE_TOKENS.contains(&token) {
        Ok(true)
    } else if FALSE_TOKENS.contains(&token) {
        Ok(false)
    } else {
        bail!(
            "Invalid value for toggle: '{token}'. Expected one of {} (true) or {} (false)",
            TRUE_TOKENS.join(", "),
            FALSE_TOKENS.join(", ")
        )
    }
}

/// Parse a numeric toggle token into a `bool`
fn parse_numeric_toggle(value: f64) -> Result<bool> {
    if value == 1.0 {
        Ok(true)
    } else if value == 0.0 {
        Ok(false)
    } else {
        bail!("Invalid value for toggle: {value}. Expected 1 (true) or 0 (false)")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToggle {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Deserialise a toggle token (string, number or bool) into a `bool`
pub fn deserialise_toggle<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawToggle::deserialize(deserializer)?;
    let parsed = match raw {
        RawToggle::Bool(value) => Ok(value),
        // Integers are compared exactly; i64 -> f64 is lossless for the accepted values
        RawToggle::Integer(value) => parse_numeric_toggle(value as f64),
        RawToggle::Float(value) => parse_numeric_toggle(value),
        RawToggle::String(token) => parse_toggle(&token),
    };

    parsed.map_err(serde::de::Error::custom)
}
