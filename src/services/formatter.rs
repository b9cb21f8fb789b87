// Display formatting for result cells
use crate::models::SqlValue;
use rust_decimal::Decimal;

pub const NULL_MARKER: &str = "NULL";

/// Separators used when rendering numbers for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLocale {
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::en_us()
    }
}

impl NumberLocale {
    pub fn en_us() -> Self {
        Self {
            thousands_separator: ',',
            decimal_separator: '.',
        }
    }

    /// Resolves a locale tag such as `es-ES`, `de_DE.UTF-8` or `fr`.
    /// Unknown tags fall back to `en-US` separators.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "es" | "de" | "it" | "pt" | "nl" | "da" | "id" | "tr" => Self {
                thousands_separator: '.',
                decimal_separator: ',',
            },
            "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "uk" => Self {
                // Narrow no-break space
                thousands_separator: '\u{202f}',
                decimal_separator: ',',
            },
            _ => Self::en_us(),
        }
    }

    /// Host locale from `LC_ALL`, `LC_NUMERIC` or `LANG`
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_NUMERIC", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .map(|tag| Self::from_tag(&tag))
            .unwrap_or_default()
    }
}

/// Formats values for the result grid
#[derive(Debug, Clone, Default)]
pub struct ValueFormatter {
    locale: NumberLocale,
}

impl ValueFormatter {
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    pub fn format(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => NULL_MARKER.to_string(),
            SqlValue::Int(i) => self.format_integer(*i),
            SqlValue::Float(f) => self.format_float(*f),
            SqlValue::Decimal(d) => self.format_decimal(*d),
            SqlValue::Bool(true) => "TRUE".to_string(),
            SqlValue::Bool(false) => "FALSE".to_string(),
            SqlValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            other => other.to_native_string(),
        }
    }

    fn format_integer(&self, value: i64) -> String {
        let digits = value.unsigned_abs().to_string();
        let grouped = group_digits(&digits, self.locale.thousands_separator);
        if value < 0 {
            format!("-{}", grouped)
        } else {
            grouped
        }
    }

    fn format_float(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        // At most three fraction digits, trailing zeros dropped
        self.format_fixed(&format!("{:.3}", value.abs()), value < 0.0)
    }

    fn format_decimal(&self, value: Decimal) -> String {
        let rounded = value.round_dp(3).abs();
        self.format_fixed(&rounded.to_string(), value.is_sign_negative())
    }

    /// Groups an unsigned `int.frac` rendering and applies the locale separators
    fn format_fixed(&self, rendered: &str, negative: bool) -> String {
        let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered, ""));
        let frac_part = frac_part.trim_end_matches('0');

        let is_zero = int_part.trim_start_matches('0').is_empty() && frac_part.is_empty();
        let mut out = String::new();
        if negative && !is_zero {
            out.push('-');
        }
        out.push_str(&group_digits(int_part, self.locale.thousands_separator));
        if !frac_part.is_empty() {
            out.push(self.locale.decimal_separator);
            out.push_str(frac_part);
        }
        out
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Formats with `en-US` separators
pub fn format_value(value: &SqlValue) -> String {
    ValueFormatter::default().format(value)
}
