use std::env;

use chrono::Duration;
use log::*;
use momo_common::helpers::{parse_boolean_flag, parse_list};

use crate::helpers::CurrencyGrammar;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/momo_store.db";
const DEFAULT_DEDUP_BUCKET_SECS: i64 = 300;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ReconciliationConfig {
    pub database_url: String,
    /// How far back, from the arrival of a notification, buffers are considered for matching. `None` means buffers
    /// never age out of matching.
    pub match_window: Option<Duration>,
    /// If true, a notification whose text repeats one received in the same time bucket is reported as a duplicate
    /// and not processed again.
    pub dedup_enabled: bool,
    pub dedup_bucket: Duration,
    /// The locale of the notifications: currency markers, separators and minor units.
    pub grammar: CurrencyGrammar,
    /// The channel capacity for each event hook.
    pub event_buffer_size: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            match_window: None,
            dedup_enabled: true,
            dedup_bucket: Duration::seconds(DEFAULT_DEDUP_BUCKET_SECS),
            grammar: CurrencyGrammar::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ReconciliationConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key-value source. Invalid values are logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let database_url = lookup("MOMO_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ MOMO_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            defaults.database_url.clone()
        });
        let match_window = lookup("MOMO_MATCH_WINDOW_HOURS").and_then(|s| parse_match_window(&s));
        let dedup_enabled = parse_boolean_flag(lookup("MOMO_DEDUP_ENABLED"), defaults.dedup_enabled);
        let dedup_bucket = lookup("MOMO_DEDUP_BUCKET_SECS")
            .map(|s| match s.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => Duration::seconds(secs),
                _ => {
                    warn!(
                        "🪛️ {s} is not a valid value for MOMO_DEDUP_BUCKET_SECS. Using the default, \
                         {DEFAULT_DEDUP_BUCKET_SECS}s, instead."
                    );
                    defaults.dedup_bucket
                },
            })
            .unwrap_or(defaults.dedup_bucket);
        let grammar = configure_grammar(&lookup);
        let event_buffer_size = lookup("MOMO_EVENT_BUFFER_SIZE")
            .map(|s| match s.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(
                        "🪛️ {s} is not a valid value for MOMO_EVENT_BUFFER_SIZE. Using the default, \
                         {DEFAULT_EVENT_BUFFER_SIZE}, instead."
                    );
                    DEFAULT_EVENT_BUFFER_SIZE
                },
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self { database_url, match_window, dedup_enabled, dedup_bucket, grammar, event_buffer_size }
    }
}

fn parse_match_window(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    match value.parse::<i64>() {
        Ok(0) => None,
        Ok(hours) if hours > 0 => Some(Duration::hours(hours)),
        _ => {
            warn!("🪛️ {value} is not a valid value for MOMO_MATCH_WINDOW_HOURS. Buffers will not age out of matching.");
            None
        },
    }
}

fn configure_grammar<F>(lookup: &F) -> CurrencyGrammar
where F: Fn(&str) -> Option<String> {
    let mut grammar = CurrencyGrammar::default();
    if let Some(markers) = lookup("MOMO_CURRENCY_MARKERS") {
        let markers = parse_list(&markers);
        if markers.is_empty() {
            warn!("🪛️ MOMO_CURRENCY_MARKERS is empty. Using the default markers.");
        } else {
            grammar.markers = markers;
        }
    }
    if let Some(labels) = lookup("MOMO_AMOUNT_LABELS") {
        grammar.amount_labels = parse_list(&labels);
    }
    if let Some(sep) = lookup("MOMO_DECIMAL_SEPARATOR") {
        match single_char(&sep) {
            Some(c) if !c.is_ascii_digit() => grammar.decimal_separator = c,
            _ => warn!("🪛️ '{sep}' is not a valid decimal separator. Using '{}'.", grammar.decimal_separator),
        }
    }
    if let Some(sep) = lookup("MOMO_THOUSANDS_SEPARATOR") {
        if sep.trim().is_empty() || sep.trim().eq_ignore_ascii_case("none") {
            grammar.thousands_separator = None;
        } else {
            match single_char(&sep) {
                Some(c) if !c.is_ascii_digit() => grammar.thousands_separator = Some(c),
                _ => warn!("🪛️ '{sep}' is not a valid thousands separator. Using the default."),
            }
        }
    }
    if grammar.thousands_separator == Some(grammar.decimal_separator) {
        warn!(
            "🪛️ The decimal and thousands separators are both '{}'. Thousands separators will not be recognised.",
            grammar.decimal_separator
        );
        grammar.thousands_separator = None;
    }
    if let Some(digits) = lookup("MOMO_MINOR_DIGITS") {
        match digits.trim().parse::<u32>() {
            Ok(d) if d <= 6 => grammar.minor_digits = d,
            _ => warn!("🪛️ {digits} is not a valid value for MOMO_MINOR_DIGITS. Using {}.", grammar.minor_digits),
        }
    }
    grammar
}

fn single_char(value: &str) -> Option<char> {
    // A lone space is a legitimate thousands separator, so only trim when there is more than one character
    let value = if value.chars().count() == 1 { value } else { value.trim() };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ReconciliationConfig {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        ReconciliationConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.database_url, "sqlite://data/momo_store.db");
        assert!(config.match_window.is_none());
        assert!(config.dedup_enabled);
        assert_eq!(config.dedup_bucket, Duration::seconds(300));
        assert_eq!(config.grammar.markers, vec!["MMK", "Ks", "Kyat", "Kyats"]);
        assert_eq!(config.event_buffer_size, 25);
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("MOMO_DATABASE_URL", "sqlite://momo.db"),
            ("MOMO_MATCH_WINDOW_HOURS", "72"),
            ("MOMO_DEDUP_ENABLED", "false"),
            ("MOMO_DEDUP_BUCKET_SECS", "60"),
            ("MOMO_CURRENCY_MARKERS", "USD, $"),
            ("MOMO_MINOR_DIGITS", "2"),
            ("MOMO_EVENT_BUFFER_SIZE", "5"),
        ]);
        assert_eq!(config.database_url, "sqlite://momo.db");
        assert_eq!(config.match_window, Some(Duration::hours(72)));
        assert!(!config.dedup_enabled);
        assert_eq!(config.dedup_bucket, Duration::seconds(60));
        assert_eq!(config.grammar.markers, vec!["USD", "$"]);
        assert_eq!(config.grammar.minor_digits, 2);
        assert_eq!(config.event_buffer_size, 5);
    }

    #[test]
    fn european_separators() {
        let config = config_from(&[("MOMO_DECIMAL_SEPARATOR", ","), ("MOMO_THOUSANDS_SEPARATOR", ".")]);
        assert_eq!(config.grammar.decimal_separator, ',');
        assert_eq!(config.grammar.thousands_separator, Some('.'));
        let config = config_from(&[("MOMO_THOUSANDS_SEPARATOR", " ")]);
        assert_eq!(config.grammar.thousands_separator, Some(' '));
        let config = config_from(&[("MOMO_THOUSANDS_SEPARATOR", "none")]);
        assert_eq!(config.grammar.thousands_separator, None);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("MOMO_MATCH_WINDOW_HOURS", "soon"),
            ("MOMO_DEDUP_BUCKET_SECS", "-5"),
            ("MOMO_DECIMAL_SEPARATOR", "dot"),
            ("MOMO_MINOR_DIGITS", "many"),
            ("MOMO_EVENT_BUFFER_SIZE", "0"),
        ]);
        assert!(config.match_window.is_none());
        assert_eq!(config.dedup_bucket, Duration::seconds(300));
        assert_eq!(config.grammar.decimal_separator, '.');
        assert_eq!(config.grammar.minor_digits, 0);
        assert_eq!(config.event_buffer_size, 25);
    }

    #[test]
    fn clashing_separators() {
        let config = config_from(&[("MOMO_DECIMAL_SEPARATOR", ",")]);
        assert_eq!(config.grammar.decimal_separator, ',');
        assert_eq!(config.grammar.thousands_separator, None);
    }

    #[test]
    fn zero_window_means_no_window() {
        assert!(config_from(&[("MOMO_MATCH_WINDOW_HOURS", "0")]).match_window.is_none());
        assert!(config_from(&[("MOMO_MATCH_WINDOW_HOURS", "none")]).match_window.is_none());
    }
}
