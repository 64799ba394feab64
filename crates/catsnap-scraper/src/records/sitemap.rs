//! `<loc>` extraction from sitemap XML.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc[^>]*>\s*(.*?)\s*</loc>").expect("valid loc regex"));

/// Every `<loc>` value in document order.
///
/// Sitemaps in the wild are often not well-formed XML; when the XML reader
/// fails or finds nothing, a `<loc>` regex scan is used instead.
pub(crate) fn parse_sitemap(xml: &str) -> Vec<String> {
    match read_locs(xml) {
        Ok(locs) if !locs.is_empty() => locs,
        Ok(_) => scan_locs(xml),
        Err(e) => {
            tracing::debug!(error = %e, "sitemap is not well-formed XML, scanning for <loc>");
            scan_locs(xml)
        }
    }
}

fn read_locs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_owned());
                }
            }
            Event::Text(e) if in_loc => {
                current.push_str(&e.unescape()?);
            }
            Event::CData(e) if in_loc => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locs)
}

fn scan_locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|loc| !loc.is_empty())
        .collect()
}
