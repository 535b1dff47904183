//! Deliverability headers attached to every outgoing offer.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::*;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Value of the `X-Mailer` header.
pub const MAILER_NAME: &str = "OfferMailer/1.0";

/// Per-recipient unsubscribe token (base64 of the address).
pub fn unsubscribe_token(recipient: &str) -> String {
    BASE64_STANDARD.encode(recipient.as_bytes())
}

/// Unsubscribe link for `recipient` under `base_url`.
///
/// The token is query-encoded; if `base_url` does not parse, it is used as a
/// plain prefix.
pub fn unsubscribe_url(base_url: &str, recipient: &str) -> String {
    let token = unsubscribe_token(recipient);
    match url::Url::parse_with_params(base_url, &[("token", token.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}?token={}", base_url, token),
    }
}

/// Generate a unique Message-ID of the form `<millis>.<9 base36 chars>@<domain>`.
pub fn generate_message_id(sender_email: &str) -> String {
    let domain = sender_email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>'))
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..9)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect()
    };

    format!("<{}.{}@{}>", millis, suffix, domain)
}

/// Build the bulk-mail header set for one recipient.
pub fn build_headers(
    sender_email: &str,
    list_id: &str,
    unsubscribe_url: &str,
) -> Vec<(String, String)> {
    vec![
        ("Message-ID".to_string(), generate_message_id(sender_email)),
        ("List-ID".to_string(), format!("<{}>", list_id)),
        ("List-Unsubscribe".to_string(), format!("<{}>", unsubscribe_url)),
        (
            "List-Unsubscribe-Post".to_string(),
            "List-Unsubscribe=One-Click".to_string(),
        ),
        ("Precedence".to_string(), "bulk".to_string()),
        ("X-Mailer".to_string(), MAILER_NAME.to_string()),
    ]
}
