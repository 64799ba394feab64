//! Text cleanup and interpretation shared by the strategies.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr)\s*>").expect("valid regex")
});

/// Labels that swatch pickers render next to the real colour names.
const COLOR_LABELS: &[&str] = &[
    "color",
    "colour",
    "colors",
    "colours",
    "selectcolor",
    "selectcolour",
    "choosecolor",
    "choosecolour",
    "select",
];

const OUT_OF_STOCK_MARKERS: &[&str] = &[
    "outofstock",
    "soldout",
    "unavailable",
    "notifyme",
    "discontinued",
];

const IN_STOCK_MARKERS: &[&str] = &["instock", "addtocart", "buynow", "limitedavailability"];

/// Collapse every whitespace run to one space and trim.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert an HTML fragment to plain text.
///
/// Drops `<script>`/`<style>` blocks, turns `<br>` and closing block tags
/// into line breaks, strips the remaining markup, decodes entities, then
/// collapses whitespace within each line and drops empty lines.
#[must_use]
pub fn strip_html(input: &str) -> String {
    let text = if input.contains('<') || input.contains('&') {
        let without_scripts = SCRIPT_STYLE_RE.replace_all(input, "");
        let with_breaks = LINE_BREAK_RE.replace_all(&without_scripts, "\n");
        let fragment = Html::parse_fragment(&with_breaks);
        fragment.root_element().text().collect::<String>()
    } else {
        input.to_owned()
    };

    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interpret a stock indicator: a boolean, a schema.org availability URL, or
/// storefront button/label text.
#[must_use]
pub fn parse_availability(raw: &str) -> Option<bool> {
    let squashed: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();

    if squashed.is_empty() {
        return None;
    }

    if OUT_OF_STOCK_MARKERS.iter().any(|n| squashed.contains(n)) {
        return Some(false);
    }
    if IN_STOCK_MARKERS.iter().any(|p| squashed.contains(p)) {
        return Some(true);
    }
    match squashed.as_str() {
        "true" | "1" | "yes" | "available" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Whether `candidate` is a picker label such as "Select Colour" rather than
/// a colour name.
#[must_use]
pub fn is_color_label(candidate: &str) -> bool {
    let squashed: String = candidate
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    squashed.is_empty() || COLOR_LABELS.contains(&squashed.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_whitespace_trims_and_squeezes() {
        assert_eq!(collapse_whitespace("  Zeeta  Plus \n"), "Zeeta Plus");
    }

    #[test]
    fn strip_html_keeps_paragraph_breaks() {
        let html = "<p>Light   frame.</p><p>Fast&nbsp;charge<br>in 4 hours</p>";
        assert_eq!(strip_html(html), "Light frame.\nFast charge\nin 4 hours");
    }

    #[test]
    fn strip_html_drops_scripts_and_styles() {
        let html = "<style>.a{color:red}</style><div>Range: 60 km</div><script>var x = 1;</script>";
        assert_eq!(strip_html(html), "Range: 60 km");
    }

    #[test]
    fn strip_html_decodes_entities() {
        assert_eq!(strip_html("Tom &amp; Jerry &lt;3"), "Tom & Jerry <3");
    }

    #[test]
    fn strip_html_passes_plain_text_through() {
        assert_eq!(strip_html("  plain\n\n  text  "), "plain\ntext");
    }

    #[test]
    fn availability_understands_schema_org() {
        assert_eq!(parse_availability("https://schema.org/InStock"), Some(true));
        assert_eq!(parse_availability("http://schema.org/OutOfStock"), Some(false));
    }

    #[test]
    fn availability_understands_labels_and_flags() {
        assert_eq!(parse_availability("In Stock"), Some(true));
        assert_eq!(parse_availability("Sold out"), Some(false));
        assert_eq!(parse_availability("ADD TO CART"), Some(true));
        assert_eq!(parse_availability("true"), Some(true));
        assert_eq!(parse_availability("false"), Some(false));
        assert_eq!(parse_availability("Free shipping"), None);
        assert_eq!(parse_availability("   "), None);
    }

    #[test]
    fn color_labels_are_detected() {
        assert!(is_color_label("Select Colour"));
        assert!(is_color_label("COLOR:"));
        assert!(is_color_label("select"));
        assert!(!is_color_label("Matte Black"));
        assert!(!is_color_label("Red"));
    }
}
