use crate::fetcher::types::RawPage;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

/// Bytes of the body scanned for `<meta>` charset hints.
const SNIFF_WINDOW: usize = 4096;

pub fn decode_page(
    url_final: Url,
    status: StatusCode,
    body_bytes: &[u8],
    content_type: &str,
) -> RawPage {
    let encoding = detect_charset(content_type, body_bytes);
    let markup = decode_to_utf8(body_bytes, encoding, &url_final);

    RawPage::new(url_final, Some(status), markup, encoding.name())
}

fn label_encoding(captures: Option<regex::Captures<'_>>) -> Option<&'static Encoding> {
    let label = captures?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

/// Header charset, then `<meta>` tags in the first 4KB, then chardetng.
pub fn detect_charset(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = label_encoding(CHARSET_REGEX.captures(content_type)) {
        return encoding;
    }

    let search_bytes = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let search_str = String::from_utf8_lossy(search_bytes);

    if let Some(encoding) = label_encoding(META_CHARSET_REGEX.captures(&search_str)) {
        return encoding;
    }
    if let Some(encoding) = label_encoding(META_HTTP_EQUIV_REGEX.captures(&search_str)) {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body_bytes, true);
    detector.guess(None, true)
}

/// Malformed sequences become U+FFFD; a page with a few bad bytes is still
/// worth reducing.
fn decode_to_utf8(body_bytes: &[u8], encoding: &'static Encoding, url: &Url) -> String {
    let (decoded, used, had_errors) = encoding.decode(body_bytes);

    if had_errors {
        warn!(url = %url, encoding = used.name(), "body had undecodable bytes");
    }
    decoded.into_owned()
}
