use regex::Regex;
use std::sync::OnceLock;

/// Round a time value to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split a comma-separated language parameter into trimmed codes.
///
/// Returns `None` when nothing usable is left, so callers fall back to their defaults.
pub fn parse_languages(raw: Option<&str>) -> Option<Vec<String>> {
    let codes: Vec<String> = raw?
        .split(',')
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(|code| code.to_string())
        .collect();

    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

/// Decode XML/HTML character references (`&amp;`, `&#39;`, `&#x27;`, ...)
pub fn unescape_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let decoded = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let hex = number.strip_prefix('x').or_else(|| number.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Remove inline markup such as `<font color="#E5E5E5">` from caption text
pub fn strip_tags(input: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
    tags.replace_all(input, "").into_owned()
}

/// Mask a secret for display, keeping only a short prefix
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(3).collect();
    format!("{}***", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235001), 1.24);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(12.0), 12.0);
    }

    #[test]
    fn test_parse_languages() {
        assert_eq!(
            parse_languages(Some("en, es ,fr")),
            Some(vec!["en".to_string(), "es".to_string(), "fr".to_string()])
        );
        assert_eq!(parse_languages(Some("de")), Some(vec!["de".to_string()]));
        assert_eq!(parse_languages(Some(" , ")), None);
        assert_eq!(parse_languages(Some("")), None);
        assert_eq!(parse_languages(None), None);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_entities("it&#39;s"), "it's");
        assert_eq!(unescape_entities("it&#x27;s"), "it's");
        assert_eq!(unescape_entities("&lt;b&gt;"), "<b>");
        assert_eq!(unescape_entities("fish & chips"), "fish & chips");
        assert_eq!(unescape_entities("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn test_double_escaped_caption_text() {
        let once = unescape_entities("don&amp;#39;t");
        assert_eq!(once, "don&#39;t");
        assert_eq!(unescape_entities(&once), "don't");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<font color=\"#E5E5E5\">hello</font> world"), "hello world");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("supersecret"), "sup***");
        assert_eq!(mask_secret("ab"), "ab***");
    }
}
