//! Entry parsing from uploaded text content
//!
//! Input format: one candidate per line, either `email@domain.com` or
//! `email@domain.com:password`. Lines starting with `#` are comments.

/// One parsed input line.
///
/// The full original line is kept so password suffixes and surrounding
/// formatting come back unchanged in the result files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Candidate address (the part before the first `:`, if any).
    pub email: String,
    /// The original line, verbatim after trimming.
    pub line: String,
}

/// Parse text content into an ordered list of entries.
///
/// Skips empty lines and `#` comments. A line is accepted only if its
/// candidate address contains `@`; there is no further validation and no
/// dedup - the caller decides what an empty result means.
pub fn parse_entries(text: &str) -> Vec<Entry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let email = match line.split_once(':') {
            Some((before, _)) => before.trim(),
            None => line,
        };

        if email.contains('@') {
            entries.push(Entry {
                email: email.to_string(),
                line: line.to_string(),
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_suffixed() {
        let entries = parse_entries("a@b.com:pw\n# comment\n\nc@d.com");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].email, "a@b.com");
        assert_eq!(entries[0].line, "a@b.com:pw");
        assert_eq!(entries[1].email, "c@d.com");
        assert_eq!(entries[1].line, "c@d.com");
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let entries = parse_entries("# header\n\n   \n#x@y.com\nreal@mail.com\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].email, "real@mail.com");
    }

    #[test]
    fn test_parse_rejects_lines_without_at() {
        let entries = parse_entries("not-an-email\nuser:password\nok@mail.com");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].email, "ok@mail.com");
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let entries = parse_entries("a@b.com:pw:with:colons");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].email, "a@b.com");
        assert_eq!(entries[0].line, "a@b.com:pw:with:colons");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let entries = parse_entries("  padded@mail.com:secret  ");
        assert_eq!(entries[0].email, "padded@mail.com");
        assert_eq!(entries[0].line, "padded@mail.com:secret");
    }

    #[test]
    fn test_parse_keeps_input_order_and_duplicates() {
        let entries = parse_entries("x@y.com\nz@w.com\nx@y.com");
        let emails: Vec<&str> = entries.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["x@y.com", "z@w.com", "x@y.com"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_entries("").is_empty());
        assert!(parse_entries("\n\n# only comments\n").is_empty());
    }
}
