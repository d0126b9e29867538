use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::debug;

/// How far into a document to look for a `<meta>` charset declaration.
const META_SNIFF_LIMIT: usize = 1024;

/// Decodes a fetched document to text.
///
/// The charset named by the `Content-Type` header wins, then a `<meta>`
/// declaration near the top of the body, then UTF-8. A body that claims
/// UTF-8 but does not decode cleanly is read as windows-1252, the superset
/// browsers use for ISO-8859-1 pages.
pub fn decode_document(body: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_label)
        .or_else(|| sniff_meta_charset(body))
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors && used == UTF_8 {
        debug!("document is not valid UTF-8, decoding as windows-1252");
        let (text, _, _) = WINDOWS_1252.decode(body);
        return text.into_owned();
    }
    text.into_owned()
}

/// Value of a `charset=` parameter, unquoted.
fn charset_label(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let label: String = lower[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'))
        .collect();
    (!label.is_empty()).then_some(label)
}

fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_LIMIT)]).to_ascii_lowercase();
    head.match_indices("<meta")
        .find_map(|(at, _)| {
            let tag = &head[at..];
            let end = tag.find('>').unwrap_or(tag.len());
            charset_label(&tag[..end])
        })
}
