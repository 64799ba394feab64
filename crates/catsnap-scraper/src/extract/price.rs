//! Price parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// A number with the sign, if any, written directly in front of it.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([-\x{2212}])?(\d+(?:\.\d+)?)").expect("valid regex"));

/// Currency markers and unit suffixes removed before reading the number.
const PRICE_NOISE: &[&str] = &["₹", "$", "€", "£", "INR", "Rs.", "Rs", "/-"];

/// Parse a storefront price such as `"₹ 29,999/-"`, `"29999.00"` or `"Rs. 1,299"`.
///
/// Takes the first number after stripping currency symbols, thousands
/// separators and unit suffixes. Returns `None` unless the result
/// is strictly positive: a missing price is absent, never zero. A minus
/// sign (ASCII or U+2212) in front of the number makes it negative.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let mut cleaned = raw.replace(',', "");
    for marker in PRICE_NOISE {
        cleaned = cleaned.replace(marker, "");
    }

    let caps = NUMBER_RE.captures(&cleaned)?;
    if caps.get(1).is_some() {
        return None;
    }
    let value = Decimal::from_str(caps.get(2)?.as_str()).ok()?;
    (value > Decimal::ZERO).then(|| value.normalize())
}
