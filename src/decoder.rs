use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// `\u` + 4 hex digits or `\x` + 2 hex digits. The two groups are mutually
/// exclusive, so every match fills exactly one of them.
const ESCAPE_PATTERN: &str = r"\\(?:u([0-9a-fA-F]{4})|x([0-9a-fA-F]{2}))";

fn escape_pattern() -> &'static Regex {
    static RE_ESCAPE: OnceLock<Regex> = OnceLock::new();
    RE_ESCAPE.get_or_init(|| Regex::new(ESCAPE_PATTERN).expect("valid escape pattern"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Escape {
    Unicode(u16),
    Hex(u8),
}

impl Escape {
    fn from_captures(caps: &Captures) -> Option<Self> {
        if let Some(unicode) = caps.get(1) {
            u16::from_str_radix(unicode.as_str(), 16).ok().map(Self::Unicode)
        } else if let Some(hex) = caps.get(2) {
            u8::from_str_radix(hex.as_str(), 16).ok().map(Self::Hex)
        } else {
            None
        }
    }

    fn to_char(self) -> Option<char> {
        match self {
            Self::Unicode(unit) => char::from_u32(u32::from(unit)),
            Self::Hex(byte) => Some(char::from(byte)),
        }
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..0xE000).contains(&unit)
}

/// Whether `text` holds at least one decodable escape.
pub fn contains_escape(text: &str) -> bool {
    escape_pattern().is_match(text)
}

/// Decodes a single matched escape token such as `\uXXXX` or `\xXX`.
///
/// Anything that is not exactly one escape, and any lone surrogate, comes back
/// unchanged.
pub fn decode_token(token: &str) -> String {
    escape_pattern()
        .captures(token)
        .filter(|caps| caps.get(0).is_some_and(|m| m.as_str().len() == token.len()))
        .and_then(|caps| decode_captures(&caps))
        .map(String::from)
        .unwrap_or_else(|| token.to_string())
}

fn decode_captures(caps: &Captures) -> Option<char> {
    Escape::from_captures(caps).and_then(Escape::to_char)
}

/// Replaces every escape in `text`, left to right, calling `on_substitution`
/// with the source token and its decoded character for each replacement.
///
/// A `\u` high surrogate directly followed by a `\u` low surrogate is decoded
/// as one character. Returns the input untouched when nothing was replaced.
pub fn decode_all<'t>(text: &'t str, mut on_substitution: impl FnMut(&str, char)) -> Cow<'t, str> {
    let matches: Vec<Captures<'t>> = escape_pattern().captures_iter(text).collect();
    if matches.is_empty() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    let mut changed = false;
    let mut idx = 0usize;

    while idx < matches.len() {
        let caps = &matches[idx];
        idx += 1;
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let mut end = whole.end();

        let decoded = match Escape::from_captures(caps) {
            Some(Escape::Unicode(high)) if is_high_surrogate(high) => {
                let low = matches.get(idx).and_then(|next| {
                    let next_whole = next.get(0)?;
                    match Escape::from_captures(next)? {
                        Escape::Unicode(low)
                            if is_low_surrogate(low) && next_whole.start() == end =>
                        {
                            Some((low, next_whole.end()))
                        }
                        _ => None,
                    }
                });
                low.and_then(|(low, low_end)| {
                    let ch = char::decode_utf16([high, low]).next()?.ok()?;
                    end = low_end;
                    idx += 1;
                    Some(ch)
                })
            }
            Some(escape) => escape.to_char(),
            None => None,
        };

        out.push_str(&text[cursor..whole.start()]);
        let token = &text[whole.start()..end];
        match decoded {
            Some(ch) => {
                on_substitution(token, ch);
                out.push(ch);
                changed = true;
            }
            None => out.push_str(token),
        }
        cursor = end;
    }

    if !changed {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[cursor..]);
    Cow::Owned(out)
}
