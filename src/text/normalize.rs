//! Canonicalization of free-form span text.
//!
//! Punctuation is replaced by a space rather than deleted so that
//! "collect/share" becomes two tokens instead of "collectshare".

/// Typographic punctuation that shows up in extracted policy text but is
/// outside the ASCII range.
const EXTRA_PUNCTUATION: &[char] = &[
    '\u{2018}', '\u{2019}', '\u{201A}', '\u{201C}', '\u{201D}', '\u{201E}', // quotes
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', // dashes
    '\u{2022}', '\u{2026}', '\u{00B7}', '\u{00A7}', '\u{00B6}', // bullets, ellipsis, section
    '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}', // guillemets
    '\u{00A1}', '\u{00BF}',
];

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c)
}

/// Lowercase, replace punctuation with spaces, collapse whitespace, trim.
///
/// Empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if is_punctuation(c) { ' ' } else { c })
        .collect();

    replaced
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize and split into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Hello,   WORLD!  "), "hello world");
    }

    #[test]
    fn test_punctuation_does_not_fuse_tokens() {
        assert_eq!(normalize("collect/share"), "collect share");
        assert_eq!(normalize("e-mail;phone"), "e mail phone");
    }

    #[test]
    fn test_typographic_punctuation() {
        assert_eq!(normalize("\u{201C}Sale\u{201D} \u{2014} opt\u{2011}out"), "sale opt out");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" ... "), "");
        assert!(tokenize("").is_empty());
        assert!(tokenize("?!").is_empty());
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("You may request deletion of your data."),
            vec!["you", "may", "request", "deletion", "of", "your", "data"]
        );
    }
}
