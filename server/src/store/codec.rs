//! Delimited-text encoding for attendee records.
//!
//! Fields are comma separated. A field is quoted, with inner quotes doubled,
//! only when it contains a comma, a quote or a newline. Decoding inverts this
//! exactly, so quoted newlines survive a round trip through the file.

use std::borrow::Cow;

use crate::models::Attendee;

pub const DELIMITER: char = ',';
pub const QUOTE: char = '"';
pub const HEADER: &str = "id,name,email,phone,consent,registeredAt";
pub const FIELD_COUNT: usize = 6;

/// Quotes a single field if it needs it.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(DELIMITER) || value.contains(QUOTE) || value.contains('\n') {
        let doubled = value.replace(QUOTE, "\"\"");
        Cow::Owned(format!("{QUOTE}{doubled}{QUOTE}"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Joins already-stringified fields into one line, escaping each.
pub fn encode_row<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut line = String::new();
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            line.push(DELIMITER);
        }
        line.push_str(&escape_field(field));
    }
    line
}

/// Encodes a record in persisted column order, without a line terminator.
pub fn encode_record(attendee: &Attendee) -> String {
    let consent = if attendee.consent { "true" } else { "false" };
    encode_row([
        attendee.id.as_str(),
        attendee.name.as_str(),
        attendee.email.as_str(),
        attendee.phone.as_str(),
        consent,
        attendee.registered_at.as_str(),
    ])
}

/// Renders a complete file: header plus one terminated line per record.
pub fn encode_document(records: &[Attendee]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + records.len() * 96);
    out.push_str(HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&encode_record(record));
        out.push('\n');
    }
    out
}

/// Splits file contents into logical records.
///
/// Newlines inside quoted fields belong to the field. A record spanning
/// several lines must still close its quotes and decode to exactly six
/// fields; otherwise only its first line is taken and scanning resumes on
/// the next one, so an unbalanced quote costs a single row. Empty lines are
/// dropped and a trailing `\r` is stripped from each record.
pub fn split_records(text: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (mut record, mut consumed, closed) = next_record(rest);
        if record.contains('\n') && (!closed || decode_fields(record).len() != FIELD_COUNT) {
            let line_end = rest.find('\n').unwrap_or(rest.len());
            record = &rest[..line_end];
            consumed = (line_end + 1).min(rest.len());
        }
        push_record(&mut records, record);
        rest = &rest[consumed..];
    }

    records
}

/// Scans one quote-aware record. Returns the record, the bytes consumed
/// including its terminator, and whether every quote was closed.
fn next_record(text: &str) -> (&str, usize, bool) {
    let mut in_quotes = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            '\n' if !in_quotes => return (&text[..idx], idx + 1, true),
            _ => {}
        }
    }
    (text, text.len(), !in_quotes)
}

fn push_record<'a>(records: &mut Vec<&'a str>, raw: &'a str) {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if !raw.is_empty() {
        records.push(raw);
    }
}

/// Splits one logical record into its unescaped fields.
pub fn decode_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
}

/// Decodes one record, or `None` when it has fewer than six fields.
pub fn decode_record(line: &str) -> Option<Attendee> {
    let mut fields = decode_fields(line);
    if fields.len() < FIELD_COUNT {
        return None;
    }
    fields.truncate(FIELD_COUNT);

    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();
    let id = next();
    let name = next();
    let email = next();
    let phone = next();
    let consent = next().eq_ignore_ascii_case("true");
    let registered_at = next();

    Some(Attendee {
        id,
        name,
        email,
        phone,
        consent,
        registered_at,
    })
}

/// Decodes a whole file, skipping the header and any short records.
pub fn decode_document(text: &str) -> Vec<Attendee> {
    split_records(text)
        .into_iter()
        .skip(1)
        .filter_map(|line| {
            let record = decode_record(line);
            if record.is_none() {
                tracing::debug!(line = %line, "Skipping malformed registration row");
            }
            record
        })
        .collect()
}
