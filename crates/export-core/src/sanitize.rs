//! Filename sanitization for titles used as path components

/// Maximum length in bytes of a sanitized component
pub const MAX_COMPONENT_BYTES: usize = 200;

/// Device names Windows refuses as file stems
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Make a display string safe to use as a single path component.
///
/// Illegal characters become `_`, the result is capped at
/// [`MAX_COMPONENT_BYTES`], leading whitespace and trailing whitespace or dots
/// are removed, and reserved device names get a `_` appended to their stem.
/// `sanitize_filename(sanitize_filename(x)) == sanitize_filename(x)`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_illegal(c) { '_' } else { c })
        .collect();

    let trimmed = trim_component(truncate_to_boundary(&replaced, MAX_COMPONENT_BYTES));

    let stem = trimmed.split('.').next().unwrap_or("");
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        // The suffix must not push the name past the cap
        let suffixed = format!("{}_{}", stem, &trimmed[stem.len()..]);
        trim_component(truncate_to_boundary(&suffixed, MAX_COMPONENT_BYTES)).to_string()
    } else {
        trimmed.to_string()
    }
}

fn trim_component(s: &str) -> &str {
    s.trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_illegal_characters() {
        assert_eq!(sanitize_filename("My: Document? Test!"), "My_ Document_ Test!");
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_filename("<tag> \"quoted\" | *"), "_tag_ _quoted_ _ _");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn trims_whitespace_and_trailing_dots() {
        assert_eq!(sanitize_filename("  Release notes  "), "Release notes");
        assert_eq!(sanitize_filename("Ends with dots..."), "Ends with dots");
        assert_eq!(sanitize_filename(".hidden"), ".hidden");
    }

    #[test]
    fn dot_segments_become_empty() {
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("."), "");
        assert_eq!(sanitize_filename("   "), "");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn reserved_names_are_suffixed() {
        assert_eq!(sanitize_filename("CON"), "CON_");
        assert_eq!(sanitize_filename("nul.txt"), "nul_.txt");
        assert_eq!(sanitize_filename("Console"), "Console");
    }

    #[test]
    fn long_names_are_truncated_on_char_boundary() {
        let long = "é".repeat(150);
        let sanitized = sanitize_filename(&long);
        assert!(sanitized.len() <= MAX_COMPONENT_BYTES);
        assert_eq!(sanitized, "é".repeat(100));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "My: Document? Test!",
            "  padded . ",
            "con.pdf",
            "CON",
            "..",
            "tab\tand\nnewline",
            "a / b / c",
            "ümlaut: ñ",
            "x. . .",
            "trailing space before dot .pdf",
        ];

        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input {:?}", input);
        }

        let long = format!("{}   tail", "a".repeat(198));
        let once = sanitize_filename(&long);
        assert_eq!(sanitize_filename(&once), once);

        let reserved_at_cap = format!("con.{}", "a".repeat(197));
        let once = sanitize_filename(&reserved_at_cap);
        assert!(once.len() <= MAX_COMPONENT_BYTES);
        assert!(once.starts_with("con_.aaa"));
        assert_eq!(sanitize_filename(&once), once);
    }

    #[test]
    fn reserved_suffix_respects_length_cap() {
        let name = format!("LPT1.{}", "b".repeat(300));
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized.len(), MAX_COMPONENT_BYTES);
        assert_eq!(sanitized, format!("LPT1_.{}", "b".repeat(194)));

        // Trailing dots are gone before the suffix is added
        let short_tail = format!("aux.{}", ".".repeat(196));
        assert_eq!(sanitize_filename(&short_tail), "aux_");
    }
}
