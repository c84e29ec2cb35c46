//! Result-file and summary rendering
//!
//! Pure functions over a [`ResultSet`]; timestamps are passed in by the
//! caller. Raw input lines are echoed verbatim, so password suffixes
//! survive into the output files.

use crate::batch::ResultSet;
use crate::classify::Outcome;

/// One downloadable result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub name: String,
    pub caption: String,
    pub body: String,
}

/// Status emoji for progress lines and captions.
pub fn emoji(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Registered => "\u{1F534}",
        Outcome::Available => "\u{1F7E2}",
        Outcome::Invalid => "\u{1F7E1}",
        Outcome::Error => "\u{26A0}\u{FE0F}",
    }
}

/// Human-readable status label.
pub fn label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Registered => "Registered",
        Outcome::Available => "Available",
        Outcome::Invalid => "Invalid email",
        Outcome::Error => "Error",
    }
}

/// Render the result files for a finished batch. Empty categories produce
/// no file; invalid and errored entries share one file.
///
/// `stamp` goes into file names (e.g. `20260808_143000`), `date` into the
/// commented headers (e.g. `2026-08-08 14:30:00`).
pub fn render_files(results: &ResultSet, stamp: &str, date: &str) -> Vec<ResultFile> {
    let mut files = Vec::new();

    if !results.registered.is_empty() {
        files.push(ResultFile {
            name: format!("registered_{stamp}.txt"),
            caption: format!(
                "{} Emails already REGISTERED ({})",
                emoji(Outcome::Registered),
                results.registered.len()
            ),
            body: category_body(
                "Emails REGISTERED on GitHub",
                &results.registered,
                Some(date),
            ),
        });
    }

    if !results.available.is_empty() {
        files.push(ResultFile {
            name: format!("available_{stamp}.txt"),
            caption: format!(
                "{} Emails NOT registered ({})",
                emoji(Outcome::Available),
                results.available.len()
            ),
            body: category_body(
                "Emails NOT registered on GitHub",
                &results.available,
                Some(date),
            ),
        });
    }

    if !results.invalid.is_empty() || !results.error.is_empty() {
        let mut body = String::new();
        if !results.invalid.is_empty() {
            body.push_str(&category_body("INVALID emails", &results.invalid, None));
            body.push_str("\n\n");
        }
        if !results.error.is_empty() {
            body.push_str(&category_body(
                "ERRORED emails (check failed)",
                &results.error,
                None,
            ));
        }

        files.push(ResultFile {
            name: format!("errors_{stamp}.txt"),
            caption: format!(
                "{} Invalid / errored emails ({})",
                emoji(Outcome::Error),
                results.invalid.len() + results.error.len()
            ),
            body,
        });
    }

    files
}

fn category_body(title: &str, lines: &[String], date: Option<&str>) -> String {
    let mut body = format!("# {title}\n# Total: {}\n", lines.len());
    if let Some(date) = date {
        body.push_str(&format!("# Date: {date}\n"));
    }
    body.push('\n');
    body.push_str(&lines.join("\n"));
    body
}

/// Final summary message (Telegram HTML).
pub fn render_summary(results: &ResultSet) -> String {
    let mut summary = format!(
        "\u{2705} <b>Check complete!</b>\n\n\
         \u{1F4CA} <b>Results:</b>\n\
         {} Available: <b>{}</b>\n\
         {} Registered: <b>{}</b>\n",
        emoji(Outcome::Available),
        results.available.len(),
        emoji(Outcome::Registered),
        results.registered.len(),
    );

    if !results.invalid.is_empty() {
        summary.push_str(&format!(
            "{} Invalid: <b>{}</b>\n",
            emoji(Outcome::Invalid),
            results.invalid.len()
        ));
    }
    if !results.error.is_empty() {
        summary.push_str(&format!(
            "{} Errors: <b>{}</b>\n",
            emoji(Outcome::Error),
            results.error.len()
        ));
    }

    summary.push_str(&format!(
        "\n\u{1F4C1} Total: <b>{}</b> emails",
        results.total()
    ));
    summary
}

/// One progress line for the live status message.
pub fn progress_line(email: &str, outcome: Outcome) -> String {
    format!("{} <code>{email}</code> - {}", emoji(outcome), label(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let mut results = ResultSet::default();
        results.push(Outcome::Registered, "a@x.com:pw".into());
        results.push(Outcome::Available, "b@x.com".into());
        results.push(Outcome::Invalid, "c@x".into());
        results
    }

    #[test]
    fn test_render_files_skips_empty_categories() {
        let mut results = ResultSet::default();
        results.push(Outcome::Available, "b@x.com".into());

        let files = render_files(&results, "20260101_000000", "2026-01-01 00:00:00");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "available_20260101_000000.txt");
    }

    #[test]
    fn test_render_files_preserves_raw_lines() {
        let files = render_files(&sample(), "s", "d");
        let registered = files.iter().find(|f| f.name.starts_with("registered")).unwrap();
        assert!(registered.body.ends_with("a@x.com:pw"));
        assert!(registered.body.contains("# Total: 1"));
        assert!(registered.body.contains("# Date: d"));
    }

    #[test]
    fn test_invalid_and_error_share_one_file() {
        let mut results = ResultSet::default();
        results.push(Outcome::Invalid, "c@x".into());
        results.push(Outcome::Error, "d@x.com".into());

        let files = render_files(&results, "s", "d");
        assert_eq!(files.len(), 1);
        assert!(files[0].name.starts_with("errors_"));
        assert!(files[0].body.contains("INVALID emails"));
        assert!(files[0].body.contains("ERRORED emails"));
        assert!(files[0].body.contains("c@x"));
        assert!(files[0].body.contains("d@x.com"));
    }

    #[test]
    fn test_summary_hides_empty_optional_counts() {
        let mut results = ResultSet::default();
        results.push(Outcome::Available, "b@x.com".into());

        let summary = render_summary(&results);
        assert!(summary.contains("Available: <b>1</b>"));
        assert!(summary.contains("Registered: <b>0</b>"));
        assert!(!summary.contains("Invalid:"));
        assert!(!summary.contains("Errors:"));
        assert!(summary.contains("Total: <b>1</b>"));
    }

    #[test]
    fn test_summary_shows_invalid_and_error_when_present() {
        let summary = render_summary(&sample());
        assert!(summary.contains("Invalid: <b>1</b>"));
        assert!(summary.contains("Total: <b>3</b>"));
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line("a@x.com", Outcome::Registered);
        assert!(line.contains("<code>a@x.com</code>"));
        assert!(line.contains("Registered"));
    }
}
