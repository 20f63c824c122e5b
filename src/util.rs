//! Text, encoding and media-type helpers shared across the crate.

use std::borrow::Cow;

/// Known media types and the file extension used when naming items.
///
/// Each media type maps to exactly one extension. Extension lookups in the
/// other direction accept the first entry listed.
const MEDIA_EXTENSIONS: &[(&str, &str)] = &[
    ("application/xhtml+xml", ".xhtml"),
    ("text/html", ".html"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/svg+xml", ".svg"),
    ("image/webp", ".webp"),
    ("image/tiff", ".tif"),
    ("text/css", ".css"),
    ("text/plain", ".txt"),
    ("application/javascript", ".js"),
    ("application/json", ".json"),
    ("application/pdf", ".pdf"),
    ("application/mathml+xml", ".mml"),
    ("application/xml", ".xml"),
    ("application/zip", ".zip"),
    ("application/vnd.ms-excel", ".xls"),
    ("application/msword", ".doc"),
    ("application/x-shockwave-flash", ".swf"),
    ("audio/mpeg", ".mp3"),
    ("audio/ogg", ".ogg"),
    ("audio/wav", ".wav"),
    ("video/mp4", ".mp4"),
    ("video/webm", ".webm"),
    ("video/quicktime", ".mov"),
    ("font/ttf", ".ttf"),
    ("font/otf", ".otf"),
    ("font/woff", ".woff"),
    ("font/woff2", ".woff2"),
];

/// File extension (with leading dot) for a media type.
///
/// Parameters such as `; charset=utf-8` are ignored.
pub fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .find(|(mt, _)| *mt == essence)
        .map(|(_, ext)| *ext)
}

/// Guess a media type from a file name's extension.
pub fn media_type_for_name(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    let ext = &lower[lower.rfind('.')?..];
    match ext {
        ".htm" => return Some("text/html"),
        ".jpeg" => return Some("image/jpeg"),
        ".tiff" => return Some("image/tiff"),
        _ => {}
    }
    MEDIA_EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(mt, _)| *mt)
}

/// Decode bytes to a string, handling various encodings.
///
/// Tries UTF-8 first (BOM aware), then the hint encoding, then Windows-1252.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a markup item, honouring an `encoding` pseudo-attribute in its XML declaration.
pub fn decode_markup(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract encoding from XML declaration.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Escape a string for use in XML attribute values or text.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape character data (no quote escaping).
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase hex SHA-1 digest.
pub fn sha1_hex(data: &[u8]) -> String {
    sha1_smol::Sha1::from(data).digest().to_string()
}

/// Final path segment of a slash-separated name.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
