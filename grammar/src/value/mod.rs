use std::fmt;

use crate::error::ConversionError;

/// Generates an integer accessor that goes through the decimal parse and
/// truncates toward zero.
macro_rules! integer_accessor {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<$ty, ConversionError> {
            let target = stringify!($ty);
            let d = self.decimal(target)?.trunc();
            // Exclusive upper bound: `i64::MAX as f64` already rounds up to 2^63
            if d < <$ty>::MIN as f64 || d >= <$ty>::MAX as f64 + 1.0 {
                return Err(ConversionError::OutOfRange {
                    text: self.text.clone(),
                    target,
                });
            }
            Ok(d as $ty)
        }
    };
}

/// An argument extracted from a line, or a constant compiled into a template.
///
/// The text carries no type; every accessor converts on demand, so one value
/// can be read as several types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    text: String,
}

impl Value {
    pub fn new(text: impl Into<String>) -> Self {
        Value { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// The same value with a leading `-`.
    pub fn negated(self) -> Self {
        Value {
            text: format!("-{}", self.text),
        }
    }

    /// `true`, `on`, `1`, `yes` and `false`, `off`, `0`, `no`; case-sensitive.
    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self.text.as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" => Ok(false),
            _ => Err(ConversionError::Invalid {
                text: self.text.clone(),
                target: "bool",
            }),
        }
    }

    pub fn as_f64(&self) -> Result<f64, ConversionError> {
        self.decimal("f64")
    }

    pub fn as_f32(&self) -> Result<f32, ConversionError> {
        self.decimal("f32").map(|d| d as f32)
    }

    integer_accessor!(as_i8, i8);
    integer_accessor!(as_u8, u8);
    integer_accessor!(as_i16, i16);
    integer_accessor!(as_i32, i32);
    integer_accessor!(as_i64, i64);
    integer_accessor!(as_u16, u16);
    integer_accessor!(as_u32, u32);
    integer_accessor!(as_u64, u64);

    fn decimal(&self, target: &'static str) -> Result<f64, ConversionError> {
        parse_decimal(&self.text).ok_or_else(|| ConversionError::Invalid {
            text: self.text.clone(),
            target,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::new(text)
    }
}

/// Plain decimal notation: `[-]digits[.digits[f]]`, at least one digit.
/// No exponent, no `+`.
fn parse_decimal(text: &str) -> Option<f64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (whole, fraction) = match body.split_once('.') {
        Some((w, f)) => (w, f.strip_suffix('f').unwrap_or(f)),
        None => (body, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    let magnitude: f64 = normalized.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
