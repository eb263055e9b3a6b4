/// Parse a boolean flag from an (environment) string value. Unrecognised or missing values yield `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Splits a comma-separated configuration value into its trimmed, non-empty items.
pub fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Collapses runs of whitespace into single spaces and lower-cases the result. Used wherever free text typed by
/// humans (sender names, SMS bodies) has to be compared.
pub fn normalize_whitespace_lowercase(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some(" Yes ".into()), false));
        assert!(!parse_boolean_flag(Some("0".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn lists() {
        assert_eq!(parse_list("MMK, Ks,,Kyat "), vec!["MMK", "Ks", "Kyat"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn whitespace_normalisation() {
        assert_eq!(normalize_whitespace_lowercase("  Ko   AUNG\t"), "ko aung");
    }
}
