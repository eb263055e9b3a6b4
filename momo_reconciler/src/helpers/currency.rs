use momo_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::helpers::ExtractError;

/// Describes how amounts are written in the notifications of one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyGrammar {
    /// Currency symbols or codes that may appear before or after an amount. The first entry is used for formatting.
    pub markers: Vec<String>,
    pub decimal_separator: char,
    pub thousands_separator: Option<char>,
    /// The number of digits after the decimal separator that make up one minor unit. Kyat amounts are whole numbers,
    /// so the default is zero. At most [`MAX_MINOR_DIGITS`].
    pub minor_digits: u32,
    /// Labels that introduce an amount without a currency marker, e.g. `Amount: 5,000`.
    pub amount_labels: Vec<String>,
    /// Words that, when they shortly precede a number in the same sentence, mean it is not the transferred amount
    /// (e.g. a balance).
    pub ignored_labels: Vec<String>,
}

/// The most minor digits an amount in minor units (an `i64`) can carry.
pub const MAX_MINOR_DIGITS: u32 = 18;

impl Default for CurrencyGrammar {
    fn default() -> Self {
        Self {
            markers: ["MMK", "Ks", "Kyat", "Kyats"].into_iter().map(String::from).collect(),
            decimal_separator: '.',
            thousands_separator: Some(','),
            minor_digits: 0,
            amount_labels: ["Amount", "Amt"].into_iter().map(String::from).collect(),
            ignored_labels: ["balance", "bal", "fee", "fees", "charge", "charges"].into_iter().map(String::from).collect(),
        }
    }
}

impl CurrencyGrammar {
    /// The regex fragment for a number written in this grammar. The number is captured in the group `name`.
    pub(crate) fn number_pattern(&self, name: &str) -> String {
        let dec = regex::escape(&self.decimal_separator.to_string());
        match self.thousands_separator {
            Some(sep) => {
                let sep = regex::escape(&sep.to_string());
                format!(r"(?P<{name}>\d{{1,3}}(?:{sep}\d{{3}})+(?:{dec}\d+)?|\d+(?:{dec}\d+)?)")
            },
            None => format!(r"(?P<{name}>\d+(?:{dec}\d+)?)"),
        }
    }

    /// The regex fragment matching any of the currency markers, case-insensitively. A marker written before its number
    /// must start on a word boundary (so that `books 5` never reads as `ks 5`) but may be glued to the digits
    /// (`MMK500`). A `trailing` marker may be glued to the digits (`500Ks`) but must end on a word boundary.
    pub(crate) fn marker_pattern(&self, trailing: bool) -> String {
        let mut markers = self.markers.iter().filter(|m| !m.trim().is_empty()).collect::<Vec<_>>();
        markers.sort_by_key(|m| std::cmp::Reverse(m.len()));
        let alternatives = markers
            .iter()
            .map(|m| {
                let m = m.trim();
                let escaped = regex::escape(m);
                let starts_alnum = m.chars().next().map(char::is_alphanumeric).unwrap_or(false);
                let ends_alnum = m.chars().last().map(char::is_alphanumeric).unwrap_or(false);
                let start = if !trailing && starts_alnum { r"\b" } else { "" };
                let end = if trailing && ends_alnum { r"\b" } else { "" };
                let dot = if ends_alnum { r"\.?" } else { "" };
                format!("{start}{escaped}{end}{dot}")
            })
            .collect::<Vec<_>>()
            .join("|");
        format!("(?i:{alternatives})")
    }

    pub(crate) fn label_pattern(&self) -> String {
        let labels = self.amount_labels.iter().map(|l| regex::escape(l.trim())).collect::<Vec<_>>().join("|");
        format!(r"(?i:\b(?:{labels})\b)")
    }

    /// Converts the digits of a matched number into minor units, rounding half-up when the text carries more
    /// fractional digits than the currency has.
    pub fn parse_number(&self, number: &str) -> Result<MinorUnits, ExtractError> {
        let (int_part, frac_part) = match number.split_once(self.decimal_separator) {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        let int_digits = int_part.chars().filter(char::is_ascii_digit).collect::<String>();
        if int_digits.is_empty() {
            return Err(ExtractError::InvalidFormat(format!("'{number}' has no integer part")));
        }
        let overflow = || ExtractError::InvalidFormat(format!("'{number}' is too large"));
        let major = int_digits.parse::<i64>().map_err(|_| overflow())?;
        let minor_digits = self.minor_digits as usize;
        let frac_digits = frac_part.chars().filter(char::is_ascii_digit).collect::<Vec<_>>();
        let kept = (0..minor_digits).map(|i| frac_digits.get(i).copied().unwrap_or('0')).collect::<String>();
        let minor = if kept.is_empty() { 0 } else { kept.parse::<i64>().map_err(|_| overflow())? };
        let round_up = frac_digits.get(minor_digits).map(|d| *d >= '5').unwrap_or(false);
        let total = MinorUnits::from_major(major, self.minor_digits)
            .and_then(|m| m.value().checked_add(minor))
            .and_then(|v| v.checked_add(i64::from(round_up)))
            .ok_or_else(overflow)?;
        Ok(MinorUnits::from(total))
    }

    /// Renders an amount the way a notification in this grammar would write it, e.g. `MMK 500,000`.
    pub fn format(&self, amount: MinorUnits) -> String {
        let marker = self.markers.first().map(|m| m.trim()).unwrap_or_default();
        let value = amount.value();
        let sign = if value < 0 { "-" } else { "" };
        let abs = value.unsigned_abs();
        let (major, minor) = match 10u64.checked_pow(self.minor_digits) {
            Some(scale) => (abs / scale, abs % scale),
            None => (0, abs),
        };
        let major = major.to_string();
        let grouped = match self.thousands_separator {
            Some(sep) => group_digits(&major, sep),
            None => major,
        };
        let number = if self.minor_digits > 0 {
            let width = self.minor_digits as usize;
            format!("{grouped}{}{minor:0width$}", self.decimal_separator)
        } else {
            grouped
        };
        if marker.is_empty() {
            format!("{sign}{number}")
        } else {
            format!("{marker} {sign}{number}")
        }
    }
}

fn group_digits(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(sep);
        }
        result.push(c);
    }
    result
}
