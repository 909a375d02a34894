//! Receiver mobile number canonicalisation and validation.
//!
//! The gateway only disburses to Kenyan mobile numbers in international
//! format without a leading `+`: `2547XXXXXXXX` for the classic Safaricom
//! range, `25410XXXXXXX` / `25411XXXXXXX` for the newer ranges. `sanitize`
//! is best-effort and never fails; callers must chain `validate` afterwards.

use once_cell::sync::Lazy;
use regex::Regex;

static LOCAL_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0\d{9}$").unwrap());
static SAFARICOM_MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^2547\d{8}$").unwrap());
static NEW_MOBILE_RANGES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^254(10|11)\d{7}$").unwrap());

/// Strips a leading `+` and all whitespace, and rewrites 10-digit local
/// numbers (`07XXXXXXXX`) into international form. Anything else is returned
/// unchanged; the result is not guaranteed to be valid.
pub fn sanitize(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let number = stripped.strip_prefix('+').unwrap_or(&stripped);

    if LOCAL_FORMAT.is_match(number) {
        format!("254{}", &number[1..])
    } else {
        number.to_string()
    }
}

/// Returns true iff `number` is a disbursable Kenyan mobile number in
/// canonical international form. Never mutates its input.
pub fn validate(number: &str) -> bool {
    if number.starts_with("2547") {
        SAFARICOM_MOBILE.is_match(number)
    } else {
        NEW_MOBILE_RANGES.is_match(number)
    }
}
