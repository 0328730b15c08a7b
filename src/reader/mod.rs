//! Queryable store over one parsed configuration
//!
//! [`IniReader`] owns the authoritative copy of the parsed entries for its
//! lifetime. It is populated by a single parse pass and read-only
//! afterwards; lookups never fail, they fall back to caller-supplied
//! defaults.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::parser::line_source::{BufferSource, LineSource, StreamSource};
use crate::parser::scanner::{self, ParseOptions};
use crate::utils::string::{parse_bool, parse_integer_prefix, parse_real_prefix};

/// Errors surfaced by [`IniReader`] constructors.
///
/// An unreadable source is distinct from a successful parse that recorded
/// malformed lines; the latter is reported through
/// [`IniReader::parse_error`].
#[derive(Error, Debug)]
pub enum IniReaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Case-insensitive key/value store with typed accessors.
///
/// Keys are the ASCII-lowered `section=name` pair. Assigning the same pair
/// twice appends the new value after a newline instead of overwriting.
///
/// The reader is move-only: the table transfers ownership on move and is
/// never duplicated implicitly.
#[derive(Debug)]
pub struct IniReader {
    options: ParseOptions,
    values: BTreeMap<String, String>,
    first_error_line: Option<usize>,
}

impl Default for IniReader {
    fn default() -> Self {
        Self::new()
    }
}

impl IniReader {
    /// Create an empty reader with default [`ParseOptions`].
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    /// Create an empty reader with explicit parse behavior.
    pub fn with_options(options: ParseOptions) -> Self {
        IniReader {
            options,
            values: BTreeMap::new(),
            first_error_line: None,
        }
    }

    /// Open and parse an INI file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IniReaderError> {
        Self::from_file_with(path, ParseOptions::default())
    }

    /// Open and parse an INI file with explicit parse behavior.
    ///
    /// An unopenable or unreadable file is an `Err`; malformed lines are
    /// not, they are reported via [`parse_error`](Self::parse_error).
    pub fn from_file_with<P: AsRef<Path>>(
        path: P,
        options: ParseOptions,
    ) -> Result<Self, IniReaderError> {
        let path = path.as_ref();
        debug!("loading INI file {}", path.display());

        let file = File::open(path).inspect_err(|e| {
            error!("failed to open INI file {}: {}", path.display(), e);
        })?;

        let mut reader = Self::with_options(options);
        reader.parse_source(&mut StreamSource::new(BufReader::new(file)))?;

        match reader.first_error_line {
            Some(lineno) => warn!("{}: first malformed line is {}", path.display(), lineno),
            None => info!("parsed INI file {}", path.display()),
        }
        Ok(reader)
    }

    /// Parse an already-open readable source.
    pub fn from_reader<R: Read>(input: R) -> Result<Self, IniReaderError> {
        let mut reader = Self::new();
        reader.parse_source(&mut StreamSource::new(BufReader::new(input)))?;
        Ok(reader)
    }

    /// Parse an explicit-length in-memory buffer.
    pub fn from_buffer(data: &[u8]) -> Self {
        Self::from_buffer_with(data, ParseOptions::default())
    }

    /// Parse an explicit-length in-memory buffer with explicit behavior.
    pub fn from_buffer_with(data: &[u8], options: ParseOptions) -> Self {
        let mut reader = Self::with_options(options);
        let mut source = BufferSource::new(data);
        // A buffer read cannot fail, so the I/O result is always Ok.
        if let Ok(first_error) = reader.scan_into(&mut source) {
            reader.first_error_line = first_error;
        }
        reader
    }

    fn parse_source<S: LineSource + ?Sized>(&mut self, source: &mut S) -> Result<(), IniReaderError> {
        self.first_error_line = self.scan_into(source)?;
        Ok(())
    }

    fn scan_into<S: LineSource + ?Sized>(&mut self, source: &mut S) -> io::Result<Option<usize>> {
        let options = &self.options;
        let values = &mut self.values;
        scanner::scan(source, options, |section, name, value| {
            record_entry(values, section, name, value)
        })
    }

    /// 1-based line number of the first malformed line, `None` after a
    /// clean parse. Entries from well-formed lines are queryable either way.
    pub fn parse_error(&self) -> Option<usize> {
        self.first_error_line
    }

    /// Look up a value, case-insensitively; `default` if missing.
    pub fn get<'a>(&'a self, section: &str, name: &str, default: &'a str) -> &'a str {
        self.values
            .get(&make_key(section, name))
            .map_or(default, String::as_str)
    }

    /// Like [`get`](Self::get), but an empty stored value also yields
    /// `default`.
    pub fn get_string<'a>(&'a self, section: &str, name: &str, default: &'a str) -> &'a str {
        match self.get(section, name, "") {
            "" => default,
            value => value,
        }
    }

    /// Look up an integer with `strtol(_, _, 0)` semantics: decimal,
    /// `0x` hex, or leading-`0` octal; `default` when no digits lead the
    /// stored text.
    pub fn get_integer(&self, section: &str, name: &str, default: i64) -> i64 {
        parse_integer_prefix(self.get(section, name, "")).unwrap_or(default)
    }

    /// Look up a float; `default` when the stored text does not begin with
    /// a floating-point literal.
    pub fn get_real(&self, section: &str, name: &str, default: f64) -> f64 {
        parse_real_prefix(self.get(section, name, "")).unwrap_or(default)
    }

    /// Look up a boolean keyword (`true`/`yes`/`on`/`1`,
    /// `false`/`no`/`off`/`0`, any case); `default` otherwise.
    pub fn get_boolean(&self, section: &str, name: &str, default: bool) -> bool {
        parse_bool(self.get(section, name, "")).unwrap_or(default)
    }

    /// True if any stored key belongs to `section`, case-insensitively.
    pub fn has_section(&self, section: &str) -> bool {
        let prefix = make_key(section, "");
        self.values
            .range::<str, _>((std::ops::Bound::Included(prefix.as_str()), std::ops::Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    /// Exact (section, name) membership test, case-insensitive.
    pub fn has_value(&self, section: &str, name: &str) -> bool {
        self.values.contains_key(&make_key(section, name))
    }

    /// Stored `(section, name, value)` triples in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.values.iter().map(|(key, value)| {
            // Names never contain the separator, so splitting at the last
            // one recovers the pair even when the section embeds a `=`.
            let (section, name) = key.rsplit_once('=').unwrap_or(("", key.as_str()));
            (section, name, value.as_str())
        })
    }
}

fn make_key(section: &str, name: &str) -> String {
    let mut key = String::with_capacity(section.len() + name.len() + 1);
    key.push_str(section);
    key.push('=');
    key.push_str(name);
    key.make_ascii_lowercase();
    key
}

fn record_entry(
    values: &mut BTreeMap<String, String>,
    section: &str,
    name: &str,
    value: Option<&str>,
) -> bool {
    let slot = values.entry(make_key(section, name)).or_default();
    if !slot.is_empty() {
        slot.push('\n');
    }
    slot.push_str(value.unwrap_or(""));
    true
}
