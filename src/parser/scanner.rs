//! Line-by-line INI scanning state machine
//!
//! [`scan`] classifies each physical line as blank, comment, continuation,
//! section header, or assignment, and emits one callback event per
//! recognized entry. Malformed input never aborts the pass; the first
//! offending line number is reported at the end.

use std::io;

use crate::parser::line_source::LineSource;

/// Behavior switches for a single parse pass.
///
/// The defaults match the classic INI dialect: `;` and `#` start full-line
/// comments, only a whitespace-preceded `;` starts an inline comment,
/// errors do not stop the pass, and every entry needs a value.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Abandon the pass at the first malformed line instead of scanning on.
    pub stop_on_first_error: bool,
    /// Accept a delimiter-less line as a name with no value.
    pub allow_no_value: bool,
    /// Ignore a UTF-8 byte order mark before the first line.
    pub allow_bom: bool,
    /// Characters opening a whole-line comment.
    pub start_comment_prefixes: String,
    /// Characters opening an inline comment when preceded by whitespace.
    pub inline_comment_prefixes: String,
    /// Physical line length bound in bytes, terminator included.
    pub max_line: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            stop_on_first_error: false,
            allow_no_value: false,
            allow_bom: true,
            start_comment_prefixes: ";#".to_string(),
            inline_comment_prefixes: ";".to_string(),
            max_line: 500,
        }
    }
}

/// Scan `source` to exhaustion, reporting each entry to `handler`.
///
/// The handler receives `(section, name, value)` and returns a continue
/// signal; a `false` return marks the current line as malformed. `value`
/// is `None` only for delimiter-less lines under
/// [`ParseOptions::allow_no_value`].
///
/// Returns `Ok(None)` for a clean pass or `Ok(Some(lineno))` with the
/// 1-based number of the first malformed line; entries on well-formed
/// lines are reported regardless. `Err` only reflects a failed read from
/// the source.
///
/// Section names keep their inner bytes verbatim: `[ db ]` names the
/// section `" db "`, not `"db"`.
pub fn scan<S, F>(source: &mut S, options: &ParseOptions, mut handler: F) -> io::Result<Option<usize>>
where
    S: LineSource + ?Sized,
    F: FnMut(&str, &str, Option<&str>) -> bool,
{
    let mut line = String::with_capacity(options.max_line);
    let mut section = String::new();
    let mut prev_name = String::new();
    let mut lineno: usize = 0;
    let mut first_error: Option<usize> = None;

    while source.next_line(&mut line, options.max_line)? {
        lineno += 1;

        let mut raw = line.as_str();
        if lineno == 1 && options.allow_bom {
            raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        }
        let indented = raw.starts_with(|c: char| c.is_ascii_whitespace());
        let start = raw.trim_ascii();

        if start.is_empty()
            || options
                .start_comment_prefixes
                .as_bytes()
                .contains(&start.as_bytes()[0])
        {
            // Blank lines and whole-line comments leave the continuation
            // anchor untouched.
        } else if !prev_name.is_empty() && indented {
            // Indented non-blank line directly after an assignment: a new
            // value for the same (section, name) pair.
            let value =
                strip_inline_comment(start, &options.inline_comment_prefixes).trim_ascii_end();
            if !handler(&section, &prev_name, Some(value)) && first_error.is_none() {
                first_error = Some(lineno);
            }
        } else if let Some(rest) = start.strip_prefix('[') {
            match find_delim_or_comment(rest, "]", &options.inline_comment_prefixes) {
                Some((at, b']')) => {
                    section.clear();
                    section.push_str(&rest[..at]);
                    prev_name.clear();
                }
                // Comment marker or end of line before the closing bracket.
                _ => {
                    if first_error.is_none() {
                        first_error = Some(lineno);
                    }
                }
            }
        } else {
            match find_delim_or_comment(start, "=:", &options.inline_comment_prefixes) {
                Some((at, b'=' | b':')) => {
                    let name = start[..at].trim_ascii_end();
                    let value = strip_inline_comment(&start[at + 1..], &options.inline_comment_prefixes)
                        .trim_ascii();
                    prev_name.clear();
                    prev_name.push_str(name);
                    if !handler(&section, name, Some(value)) && first_error.is_none() {
                        first_error = Some(lineno);
                    }
                }
                other => {
                    if options.allow_no_value {
                        // A bare name; it does not become a continuation
                        // anchor.
                        let end = other.map_or(start.len(), |(at, _)| at);
                        let name = start[..end].trim_ascii_end();
                        if !handler(&section, name, None) && first_error.is_none() {
                            first_error = Some(lineno);
                        }
                    } else if first_error.is_none() {
                        first_error = Some(lineno);
                    }
                }
            }
        }

        if first_error.is_some() && options.stop_on_first_error {
            break;
        }
    }

    Ok(first_error)
}

/// Find the first of `delims`, stopping early at an inline comment marker
/// preceded by whitespace. The scan starts in not-preceded-by-whitespace
/// state, so a marker in the very first column never counts as a comment.
fn find_delim_or_comment(s: &str, delims: &str, inline_prefixes: &str) -> Option<(usize, u8)> {
    let mut was_space = false;
    for (at, &b) in s.as_bytes().iter().enumerate() {
        if delims.as_bytes().contains(&b) || (was_space && inline_prefixes.as_bytes().contains(&b)) {
            return Some((at, b));
        }
        was_space = b.is_ascii_whitespace();
    }
    None
}

fn strip_inline_comment<'a>(s: &'a str, inline_prefixes: &str) -> &'a str {
    match find_delim_or_comment(s, "", inline_prefixes) {
        Some((at, _)) => &s[..at],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::line_source::BufferSource;

    type Event = (String, String, Option<String>);

    fn scan_text(text: &str, options: &ParseOptions) -> (Vec<Event>, Option<usize>) {
        let mut events = Vec::new();
        let mut source = BufferSource::new(text.as_bytes());
        let error = scan(&mut source, options, |section, name, value| {
            events.push((section.to_owned(), name.to_owned(), value.map(str::to_owned)));
            true
        })
        .unwrap();
        (events, error)
    }

    fn entry(section: &str, name: &str, value: &str) -> Event {
        (section.to_owned(), name.to_owned(), Some(value.to_owned()))
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert!(!options.stop_on_first_error);
        assert!(!options.allow_no_value);
        assert!(options.allow_bom);
        assert_eq!(options.start_comment_prefixes, ";#");
        assert_eq!(options.inline_comment_prefixes, ";");
        assert_eq!(options.max_line, 500);
    }

    #[test]
    fn test_sections_and_assignments() {
        let (events, error) = scan_text(
            "[server]\nport = 80\nhost : example.org\n",
            &ParseOptions::default(),
        );
        assert_eq!(error, None);
        assert_eq!(
            events,
            vec![
                entry("server", "port", "80"),
                entry("server", "host", "example.org"),
            ]
        );
    }

    #[test]
    fn test_default_section_is_empty_name() {
        let (events, error) = scan_text("key=1\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("", "key", "1")]);
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let (events, error) = scan_text(
            "; full line\n# also a comment\n\n   \n[s]\nk=v\n",
            &ParseOptions::default(),
        );
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("s", "k", "v")]);
    }

    #[test]
    fn test_inline_comment_requires_preceding_whitespace() {
        let (events, error) = scan_text(
            "url=http://host/;x\npin=80 ; local override\n",
            &ParseOptions::default(),
        );
        assert_eq!(error, None);
        assert_eq!(
            events,
            vec![
                entry("", "url", "http://host/;x"),
                entry("", "pin", "80"),
            ]
        );
    }

    #[test]
    fn test_value_of_only_a_comment_is_empty() {
        let (events, error) = scan_text("k= ;gone\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("", "k", "")]);
    }

    #[test]
    fn test_continuation_emits_same_name() {
        let (events, error) = scan_text("[s]\nkey=a\n  b ; tail\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("s", "key", "a"), entry("s", "key", "b")]);
    }

    #[test]
    fn test_comment_preserves_continuation_anchor() {
        let (events, error) = scan_text("[s]\nk=a\n; note\n  b\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("s", "k", "a"), entry("s", "k", "b")]);
    }

    #[test]
    fn test_section_header_clears_continuation_anchor() {
        let (events, error) = scan_text("[s]\nk=a\n[t]\n  b\n", &ParseOptions::default());
        assert_eq!(error, Some(4));
        assert_eq!(events, vec![entry("s", "k", "a")]);
    }

    #[test]
    fn test_unindented_line_without_delimiter_is_error() {
        let (events, error) = scan_text("[s]\na=1\ngarbage_no_delimiter\nb=2\n", &ParseOptions::default());
        assert_eq!(error, Some(3));
        assert_eq!(events, vec![entry("s", "a", "1"), entry("s", "b", "2")]);
    }

    #[test]
    fn test_malformed_section_header_keeps_scanning() {
        let (events, error) = scan_text("[unterminated\nk=v\n", &ParseOptions::default());
        assert_eq!(error, Some(1));
        // The entry lands in the still-current (default) section.
        assert_eq!(events, vec![entry("", "k", "v")]);
    }

    #[test]
    fn test_section_header_with_trailing_comment() {
        let (events, error) = scan_text("[s] ; note\nk=v\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("s", "k", "v")]);
    }

    #[test]
    fn test_comment_before_closing_bracket_is_error() {
        let (_, error) = scan_text("[s ; note]\n", &ParseOptions::default());
        assert_eq!(error, Some(1));
    }

    #[test]
    fn test_section_name_kept_verbatim() {
        let (events, _) = scan_text("[ db ]\nk=v\n", &ParseOptions::default());
        assert_eq!(events, vec![entry(" db ", "k", "v")]);
    }

    #[test]
    fn test_stop_on_first_error() {
        let text = "a=1\nbroken\nb=2\n";

        let (events, error) = scan_text(text, &ParseOptions::default());
        assert_eq!(error, Some(2));
        assert_eq!(events.len(), 2);

        let options = ParseOptions {
            stop_on_first_error: true,
            ..ParseOptions::default()
        };
        let (events, error) = scan_text(text, &options);
        assert_eq!(error, Some(2));
        assert_eq!(events, vec![entry("", "a", "1")]);
    }

    #[test]
    fn test_allow_no_value() {
        let options = ParseOptions {
            allow_no_value: true,
            ..ParseOptions::default()
        };
        let (events, error) = scan_text("flag ; comment\n", &options);
        assert_eq!(error, None);
        assert_eq!(events, vec![("".to_owned(), "flag".to_owned(), None)]);

        // A bare name is not a continuation anchor; the indented line is
        // another bare name, not a value for "flag".
        let (events, error) = scan_text("flag\n  tail\n", &options);
        assert_eq!(error, None);
        assert_eq!(
            events,
            vec![
                ("".to_owned(), "flag".to_owned(), None),
                ("".to_owned(), "tail".to_owned(), None),
            ]
        );
    }

    #[test]
    fn test_bom_stripped_on_first_line() {
        let (events, error) = scan_text("\u{feff}[s]\nk=v\n", &ParseOptions::default());
        assert_eq!(error, None);
        assert_eq!(events, vec![entry("s", "k", "v")]);

        let options = ParseOptions {
            allow_bom: false,
            ..ParseOptions::default()
        };
        let (_, error) = scan_text("\u{feff}[s]\nk=v\n", &options);
        assert_eq!(error, Some(1));
    }

    #[test]
    fn test_overlong_line_truncated_not_split() {
        let options = ParseOptions {
            max_line: 16,
            ..ParseOptions::default()
        };
        let (events, error) = scan_text("key=aaaaaaaaaaaaaaaaaaaa\nnext=1\n", &options);
        assert_eq!(error, None);
        assert_eq!(
            events,
            vec![entry("", "key", "aaaaaaaaaaa"), entry("", "next", "1")]
        );
    }

    #[test]
    fn test_callback_false_records_error_line() {
        let mut source = BufferSource::new(b"a=1\nb=2\nc=3\n");
        let error = scan(&mut source, &ParseOptions::default(), |_, name, _| name != "b").unwrap();
        assert_eq!(error, Some(2));
    }
}
