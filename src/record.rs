use std::cmp::Ordering;
use std::mem;

use crate::constants::RECORD_SEPARATOR;

/// A single line of the form `{number}. {text}`.
///
/// `raw` holds the exact input bytes (terminator stripped) so a record read
/// from disk is written back byte for byte. Records built with [`Record::new`]
/// carry the canonical formatting in `raw`.
#[derive(Debug, Clone)]
pub struct Record {
    pub number: i64,
    pub text: String,
    pub raw: String,
}

impl Record {
    pub fn new(number: i64, text: String) -> Self {
        let raw = format!("{}{}{}", number, RECORD_SEPARATOR, text);
        Self { number, text, raw }
    }

    /// Parses one line, already stripped of its terminator.
    ///
    /// A line is valid when it contains `". "` with a non-empty integer part
    /// before it: an optional minus followed by digits only, within i64 range.
    /// The remainder after the separator is the text and may be empty.
    pub fn parse(line: &str) -> Option<Self> {
        let separator = line.find(RECORD_SEPARATOR)?;
        if separator == 0 {
            return None;
        }

        let number_part = &line[..separator];
        if !is_plain_integer(number_part) {
            return None;
        }
        let number: i64 = number_part.parse().ok()?;

        let text = line[separator + RECORD_SEPARATOR.len()..].to_string();

        Some(Self {
            number,
            text,
            raw: line.to_string(),
        })
    }

    /// In-memory cost estimate used for the chunk budget: two bytes per raw
    /// byte plus a word of overhead. Over-counts rather than querying the
    /// allocator.
    pub fn estimated_size(&self) -> usize {
        self.raw.len() * 2 + mem::size_of::<usize>()
    }
}

/// `-?[0-9]+` and nothing else. `i64::from_str` also accepts a leading `+`,
/// which the record format does not.
fn is_plain_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text
            .as_bytes()
            .cmp(other.text.as_bytes())
            .then_with(|| self.number.cmp(&other.number))
    }
}

/// Strips a trailing `\n` and an optional `\r` before it, leaving every other
/// byte of the line untouched.
pub fn strip_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
