//! Recipient list clean-up.

use std::collections::HashSet;

/// Syntax check matching `local@domain.tld`: no whitespace, a non-empty
/// local part, and a domain with some dot that has text on both sides.
pub fn is_valid_email(address: &str) -> bool {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = address.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }

    domain
        .match_indices('.')
        .any(|(dot, _)| dot > 0 && dot + 1 < domain.len())
}

/// Trim, drop invalid addresses and remove duplicates, keeping first-seen order.
pub fn normalize_recipients(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|address| address.trim())
        .filter(|address| is_valid_email(address))
        .filter(|address| seen.insert(address.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.gr"));
        assert!(is_valid_email("a@x.com."));
        assert!(is_valid_email("a@.x.com"));
    }

    #[test]
    fn test_invalid_addresses() {
        for address in [
            "",
            "plain",
            "@x.com",
            "a@x",
            "a@.com",
            "a@x.",
            "a@.",
            "a@..",
            "a b@x.com",
            "a@@x.com",
            "a@b@x.com",
        ] {
            assert!(!is_valid_email(address), "{} should be invalid", address);
        }
    }

    #[test]
    fn test_normalize_recipients() {
        let raw = vec![
            " a@x.com ".to_string(),
            "broken".to_string(),
            "b@x.com".to_string(),
            "A@X.com".to_string(),
            "a@x.com".to_string(),
        ];
        assert_eq!(normalize_recipients(&raw), vec!["a@x.com", "b@x.com"]);
    }
}
