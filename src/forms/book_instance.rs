//! Book instance form: sanitize, then validate into a draft

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::escape_html;
use crate::models::{BookInstanceDraft, BookInstanceStatus};

/// Raw form fields as posted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInstanceForm {
    pub book: Option<String>,
    pub imprint: Option<String>,
    pub status: Option<String>,
    pub due_back: Option<String>,
}

/// Delete confirmation form; the id travels in the body, not the path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteBookInstanceForm {
    pub bookinstanceid: Option<String>,
}

/// Trimmed and escaped form values, echoed back when the form is redisplayed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct SanitizedBookInstanceForm {
    #[validate(
        length(min = 1, message = "Book must be specified"),
        custom(function = "validate_book_id")
    )]
    pub book: String,
    #[validate(length(min = 1, message = "Imprint must be specified"))]
    pub imprint: String,
    #[validate(custom(function = "validate_status"))]
    pub status: String,
    #[validate(custom(function = "validate_iso8601"))]
    pub due_back: Option<String>,
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field errors in form order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages reported for `field`
    #[cfg(test)]
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl BookInstanceForm {
    /// Trim and escape every field. Never fails; an empty `due_back` counts as absent.
    pub fn sanitize(self) -> SanitizedBookInstanceForm {
        let clean = |value: Option<String>| escape_html(value.as_deref().unwrap_or_default().trim());

        SanitizedBookInstanceForm {
            book: clean(self.book),
            imprint: clean(self.imprint),
            status: clean(self.status),
            due_back: self
                .due_back
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

impl SanitizedBookInstanceForm {
    const FIELDS: [&'static str; 4] = ["book", "imprint", "status", "due_back"];

    /// Run every field rule and build the draft.
    ///
    /// All rules run; errors come back in form field order.
    pub fn validate_draft(&self) -> Result<BookInstanceDraft, FieldErrors> {
        if let Err(errors) = self.validate() {
            let by_field = errors.field_errors();
            let mut ordered = Vec::new();
            for field in Self::FIELDS {
                if let Some(field_errors) = by_field.get(field) {
                    for error in field_errors.iter() {
                        ordered.push(FieldError {
                            field,
                            message: error
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| error.code.to_string()),
                        });
                    }
                }
            }
            return Err(FieldErrors(ordered));
        }

        Ok(BookInstanceDraft {
            id: None,
            book: Uuid::parse_str(&self.book).ok(),
            imprint: Some(self.imprint.clone()),
            status: self.status.parse().ok(),
            due_back: self.due_back.as_deref().and_then(parse_iso8601),
        })
    }

    /// Book id to preselect when redisplaying the form
    pub fn selected_book(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.book).ok()
    }
}

/// Parse an ISO-8601 date or date-time into UTC.
///
/// Dates may be calendar (`2024-05-17`, `20240517`), reduced (`2024-05`,
/// `2024`), ordinal (`2024-138`) or week based (`2024-W20-5`), and land on
/// midnight UTC. Times follow a `T` or space: `10`, `10:30`, `1030`,
/// `10:30:15`, with an optional `.`/`,` fraction and a `Z`, `+02`, `+0200`
/// or `+02:00` offset. Times without an offset are taken as UTC.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if !value.is_ascii() {
        return None;
    }
    let (date_part, time_part) = match value.find(|c: char| c == 'T' || c == 't' || c == ' ') {
        Some(i) => (&value[..i], Some(&value[i + 1..])),
        None => (value, None),
    };

    let date = parse_iso_date(date_part)?;
    let Some(time_part) = time_part else {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    };

    let (clock, offset) = split_offset(time_part)?;
    let (time, next_day) = parse_iso_time(clock)?;
    let date = if next_day { date.succ_opt()? } else { date };

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// All-digit slice as a number
fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let year = digits(s.get(..4)?)? as i32;
    let rest = &s[4..];

    if let Some(week) = rest.strip_prefix("-W").or_else(|| rest.strip_prefix('W')) {
        let extended = rest.starts_with('-');
        let (week, day) = match (week.len(), extended) {
            (2, _) => (digits(week)?, 1),
            (4, true) if week.as_bytes()[2] == b'-' => (digits(&week[..2])?, digits(&week[3..])?),
            (3, false) => (digits(&week[..2])?, digits(&week[2..])?),
            _ => return None,
        };
        let weekday = *WEEKDAYS.get(day.checked_sub(1)? as usize)?;
        return NaiveDate::from_isoywd_opt(year, week, weekday);
    }

    match rest.len() {
        0 => NaiveDate::from_ymd_opt(year, 1, 1),
        // YYYY-MM
        3 if rest.starts_with('-') => NaiveDate::from_ymd_opt(year, digits(&rest[1..])?, 1),
        // YYYY-DDD
        4 if rest.starts_with('-') => NaiveDate::from_yo_opt(year, digits(&rest[1..])?),
        // YYYYDDD
        3 => NaiveDate::from_yo_opt(year, digits(rest)?),
        // YYYYMMDD
        4 => NaiveDate::from_ymd_opt(year, digits(&rest[..2])?, digits(&rest[2..])?),
        // YYYY-MM-DD
        6 if rest.starts_with('-') && rest.as_bytes()[3] == b'-' => {
            NaiveDate::from_ymd_opt(year, digits(&rest[1..3])?, digits(&rest[4..])?)
        }
        _ => None,
    }
}

/// Split a time into clock text and its UTC offset
fn split_offset(s: &str) -> Option<(&str, FixedOffset)> {
    if let Some(clock) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return Some((clock, FixedOffset::east_opt(0)?));
    }
    let Some(i) = s.rfind(|c: char| c == '+' || c == '-') else {
        return Some((s, FixedOffset::east_opt(0)?));
    };

    let (clock, offset) = (&s[..i], &s[i + 1..]);
    let (hours, minutes) = match offset.len() {
        2 => (digits(offset)?, 0),
        4 => (digits(&offset[..2])?, digits(&offset[2..])?),
        5 if offset.as_bytes()[2] == b':' => (digits(&offset[..2])?, digits(&offset[3..])?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = (hours * 3600 + minutes * 60) as i32;
    let offset = if s.as_bytes()[i] == b'-' {
        FixedOffset::west_opt(seconds)?
    } else {
        FixedOffset::east_opt(seconds)?
    };
    Some((clock, offset))
}

/// Clock time; `true` when it was `24:00`, the end of the day
fn parse_iso_time(s: &str) -> Option<(NaiveTime, bool)> {
    let (main, fraction) = match s.find(|c: char| c == '.' || c == ',') {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };

    let (hours, minutes, seconds) = match main.len() {
        2 => (digits(main)?, None, None),
        4 => (digits(&main[..2])?, Some(digits(&main[2..])?), None),
        5 if main.as_bytes()[2] == b':' => (digits(&main[..2])?, Some(digits(&main[3..])?), None),
        6 => (
            digits(&main[..2])?,
            Some(digits(&main[2..4])?),
            Some(digits(&main[4..])?),
        ),
        8 if main.as_bytes()[2] == b':' && main.as_bytes()[5] == b':' => (
            digits(&main[..2])?,
            Some(digits(&main[3..5])?),
            Some(digits(&main[6..])?),
        ),
        _ => return None,
    };

    if hours == 24 {
        let at_midnight = minutes.unwrap_or(0) == 0 && seconds.unwrap_or(0) == 0 && fraction.is_none();
        return at_midnight.then_some((NaiveTime::MIN, true));
    }
    if hours > 23 || minutes.unwrap_or(0) > 59 || seconds.unwrap_or(0) > 59 {
        return None;
    }

    // The fraction belongs to the last unit written
    let unit_secs: u64 = match (minutes, seconds) {
        (None, _) => 3600,
        (Some(_), None) => 60,
        (Some(_), Some(_)) => 1,
    };
    let fraction_nanos = match fraction {
        Some(f) => {
            if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let scaled: String = f.chars().chain(std::iter::repeat('0')).take(9).collect();
            u64::from(digits(&scaled)?) * unit_secs
        }
        None => 0,
    };

    let whole = u64::from(hours * 3600 + minutes.unwrap_or(0) * 60 + seconds.unwrap_or(0));
    let total = whole * 1_000_000_000 + fraction_nanos;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (total / 1_000_000_000) as u32,
        (total % 1_000_000_000) as u32,
    )?;
    Some((time, false))
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_book_id(value: &str) -> Result<(), ValidationError> {
    // Emptiness is reported by the length rule
    if value.is_empty() || Uuid::parse_str(value).is_ok() {
        Ok(())
    } else {
        Err(field_error("book_id", "Invalid book"))
    }
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.parse::<BookInstanceStatus>().is_ok() {
        Ok(())
    } else {
        Err(field_error("status", "Invalid status"))
    }
}

fn validate_iso8601(value: &str) -> Result<(), ValidationError> {
    match parse_iso8601(value) {
        Some(_) => Ok(()),
        None => Err(field_error("iso8601", "Invalid date")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn form(book: &str, imprint: &str, status: Option<&str>, due_back: Option<&str>) -> BookInstanceForm {
        BookInstanceForm {
            book: Some(book.to_string()),
            imprint: Some(imprint.to_string()),
            status: status.map(str::to_string),
            due_back: due_back.map(str::to_string),
        }
    }

    #[test]
    fn test_sanitize_trims_and_escapes() {
        let sanitized = form("  abc ", " <b>Penguin</b> ", Some(" Loaned "), Some("  ")).sanitize();
        assert_eq!(sanitized.book, "abc");
        assert_eq!(sanitized.imprint, "&lt;b&gt;Penguin&lt;&#x2F;b&gt;");
        assert_eq!(sanitized.status, "Loaned");
        assert_eq!(sanitized.due_back, None);
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let errors = BookInstanceForm::default().sanitize().validate_draft().unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| (e.field, e.message.as_str())).collect();
        assert_eq!(
            messages,
            vec![
                ("book", "Book must be specified"),
                ("imprint", "Imprint must be specified"),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_is_missing() {
        let book = Uuid::new_v4().to_string();
        let errors = form(&book, "   ", None, None).sanitize().validate_draft().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.for_field("imprint").collect::<Vec<_>>(),
            vec!["Imprint must be specified"]
        );
    }

    #[test]
    fn test_empty_book_reports_single_error() {
        let sanitized = form("", "Penguin", None, None).sanitize();
        let errors = sanitized.validate_draft().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.for_field("book").count(), 1);
        assert_eq!(sanitized.imprint, "Penguin");
    }

    #[test]
    fn test_malformed_book_id() {
        let errors = form("not-a-book", "Penguin", None, None)
            .sanitize()
            .validate_draft()
            .unwrap_err();
        assert_eq!(errors.for_field("book").collect::<Vec<_>>(), vec!["Invalid book"]);
    }

    #[test]
    fn test_invalid_date() {
        let book = Uuid::new_v4().to_string();
        for bad in ["tomorrow", "2024-13-01", "2024-02-30", "03/07/2024"] {
            let errors = form(&book, "Penguin", None, Some(bad))
                .sanitize()
                .validate_draft()
                .unwrap_err();
            assert_eq!(
                errors.for_field("due_back").collect::<Vec<_>>(),
                vec!["Invalid date"],
                "{bad}"
            );
        }
    }

    #[test]
    fn test_rules_do_not_short_circuit() {
        let errors = form("", "", Some("Lost"), Some("never"))
            .sanitize()
            .validate_draft()
            .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["book", "imprint", "status", "due_back"]);
    }

    #[test]
    fn test_valid_draft() {
        let book = Uuid::new_v4();
        let draft = form(&book.to_string(), "Penguin", Some("Reserved"), Some("2024-05-17"))
            .sanitize()
            .validate_draft()
            .unwrap();
        assert_eq!(draft.book, Some(book));
        assert_eq!(draft.imprint.as_deref(), Some("Penguin"));
        assert_eq!(draft.status, Some(BookInstanceStatus::Reserved));
        let due = draft.due_back.unwrap();
        assert_eq!((due.year(), due.month(), due.day()), (2024, 5, 17));
    }

    #[test]
    fn test_omitted_status_and_date_left_for_defaults() {
        let draft = form(&Uuid::new_v4().to_string(), "Penguin", None, Some(""))
            .sanitize()
            .validate_draft()
            .unwrap();
        assert_eq!(draft.status, None);
        assert_eq!(draft.due_back, None);
    }

    #[test]
    fn test_parse_iso8601_variants() {
        assert!(parse_iso8601("2024-01-31").is_some());
        assert!(parse_iso8601("2024-01-31T10:00:00Z").is_some());
        assert!(parse_iso8601("2024-01-31T10:00:00+02:00").is_some());
        assert!(parse_iso8601("2024-01-31T10:00").is_some());
        assert!(parse_iso8601("").is_none());
        assert!(parse_iso8601("31-01-2024").is_none());

        let utc = |y, m, d, h, min, sec| {
            Utc.from_utc_datetime(
                &NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(h, min, sec)
                    .unwrap(),
            )
        };

        // Reduced precision and basic format
        assert_eq!(parse_iso8601("2024-05"), Some(utc(2024, 5, 1, 0, 0, 0)));
        assert_eq!(parse_iso8601("2024"), Some(utc(2024, 1, 1, 0, 0, 0)));
        assert_eq!(parse_iso8601("20240517"), Some(utc(2024, 5, 17, 0, 0, 0)));
        assert_eq!(parse_iso8601("20240517T1030"), Some(utc(2024, 5, 17, 10, 30, 0)));
        assert_eq!(parse_iso8601("20240517T103015Z"), Some(utc(2024, 5, 17, 10, 30, 15)));

        // Ordinal and week dates
        assert_eq!(parse_iso8601("2024-138"), Some(utc(2024, 5, 17, 0, 0, 0)));
        assert_eq!(parse_iso8601("2024138"), Some(utc(2024, 5, 17, 0, 0, 0)));
        assert_eq!(parse_iso8601("2024-W20-5"), Some(utc(2024, 5, 17, 0, 0, 0)));
        assert_eq!(parse_iso8601("2024W205"), Some(utc(2024, 5, 17, 0, 0, 0)));
        assert_eq!(parse_iso8601("2024-W20"), Some(utc(2024, 5, 13, 0, 0, 0)));

        // Hour-only times and offsets in every form
        assert_eq!(parse_iso8601("2024-05-17T10"), Some(utc(2024, 5, 17, 10, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-17T10:00+0200"), Some(utc(2024, 5, 17, 8, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-17T10:00+02"), Some(utc(2024, 5, 17, 8, 0, 0)));
        assert_eq!(parse_iso8601("2024-05-17T10-05:30"), Some(utc(2024, 5, 17, 15, 30, 0)));
        assert_eq!(parse_iso8601("2024-05-17 10:30"), Some(utc(2024, 5, 17, 10, 30, 0)));

        // Fractions, with either separator, apply to the last unit
        assert_eq!(parse_iso8601("2024-05-17T10,5"), Some(utc(2024, 5, 17, 10, 30, 0)));
        assert_eq!(parse_iso8601("2024-05-17T10:30.5"), Some(utc(2024, 5, 17, 10, 30, 30)));
        let precise = parse_iso8601("2024-05-17T10:30:15,250Z").unwrap();
        assert_eq!(precise.timestamp_subsec_millis(), 250);

        // End of day rolls over
        assert_eq!(parse_iso8601("2024-02-29T24:00"), Some(utc(2024, 3, 1, 0, 0, 0)));

        // Impossible or malformed values stay rejected
        for bad in [
            "2024-02-30",
            "20240230",
            "2023-366",
            "2024-W54",
            "2024-W20-8",
            "202405",
            "2024-5",
            "2024-05-17T25",
            "2024-05-17T10:60",
            "2024-05-17T24:30",
            "2024-05-17T10:00+2",
            "2024-05-17T10:00+24:00",
            "2024-05-17T",
            "2024-05-17T10,",
        ] {
            assert!(parse_iso8601(bad).is_none(), "{bad} should be rejected");
        }
    }
}
