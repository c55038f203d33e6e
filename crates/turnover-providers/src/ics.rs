//! iCalendar feed parsing.
//!
//! This module parses a unit's iCalendar (RFC 5545) export into [`RawEvent`]s.
//! Only `VEVENT` components are read; everything else in the feed is ignored.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::{debug, trace};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::{RawEvent, RawEventTime};

/// Marker every calendar feed must contain.
const CALENDAR_ENVELOPE: &str = "BEGIN:VCALENDAR";

const CALENDAR: &str = "VCALENDAR";
const EVENT: &str = "VEVENT";

/// The events parsed from one feed.
///
/// A single-pass iterator over the feed's bookings, in feed order, with
/// duplicate UIDs already collapsed.
#[derive(Debug)]
pub struct ParsedFeed {
    events: std::vec::IntoIter<RawEvent>,
    incomplete: Vec<String>,
}

impl ParsedFeed {
    /// UIDs of `VEVENT`s skipped because their `DTSTART` is missing or unreadable.
    pub fn incomplete(&self) -> &[String] {
        &self.incomplete
    }
}

impl Iterator for ParsedFeed {
    type Item = RawEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl ExactSizeIterator for ParsedFeed {}

/// Parses a unit's feed.
///
/// Duplicate `UID`s collapse to the last occurrence, kept at the position of
/// the first. Events without a `UID` get one derived from the unit and their
/// position in the feed.
///
/// # Errors
///
/// Returns a parse error when the bytes are not UTF-8, carry no complete
/// `VCALENDAR` envelope, contain lines that are not content lines, or hold
/// `VEVENT`s the iCalendar parser could not read.
pub fn parse_feed(bytes: &[u8], unit_id: &str) -> ProviderResult<ParsedFeed> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ProviderError::parse("feed is not valid UTF-8")
            .with_unit(unit_id)
            .with_source(e)
    })?;
    let text = text.trim_start_matches('\u{feff}');

    if !text.contains(CALENDAR_ENVELOPE) {
        return Err(ProviderError::parse("feed has no VCALENDAR envelope").with_unit(unit_id));
    }

    let expected_events =
        check_structure(text).map_err(|msg| ProviderError::parse(msg).with_unit(unit_id))?;

    let calendar = text.parse::<Calendar>().map_err(|e| {
        ProviderError::parse(format!("invalid iCalendar data: {}", e)).with_unit(unit_id)
    })?;

    let mut events: Vec<RawEvent> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut incomplete = Vec::new();

    let vevents = calendar.iter().filter_map(|component| match component {
        CalendarComponent::Event(event) => Some(event),
        _ => None,
    });

    let vevents: Vec<&Event> = vevents.collect();
    if vevents.len() != expected_events {
        return Err(ProviderError::parse(format!(
            "read {} of {} VEVENTs",
            vevents.len(),
            expected_events
        ))
        .with_unit(unit_id));
    }

    for (index, event) in vevents.into_iter().enumerate() {
        let Some(raw) = parse_event(event, unit_id, index) else {
            incomplete.push(
                event
                    .get_uid()
                    .map(str::to_string)
                    .unwrap_or_else(|| synthetic_uid(unit_id, index)),
            );
            continue;
        };

        match positions.get(&raw.id) {
            Some(&pos) => {
                trace!(uid = %raw.id, unit = %unit_id, "Duplicate UID, keeping last seen");
                events[pos] = raw;
            }
            None => {
                positions.insert(raw.id.clone(), events.len());
                events.push(raw);
            }
        }
    }

    debug!(
        unit = %unit_id,
        events = events.len(),
        skipped = incomplete.len(),
        "Parsed feed"
    );

    Ok(ParsedFeed {
        events: events.into_iter(),
        incomplete,
    })
}

/// Parses a single VEVENT component into a RawEvent.
fn parse_event(event: &Event, unit_id: &str, index: usize) -> Option<RawEvent> {
    let start_dt = event.get_start()?;
    // A missing end makes the stay zero-length; the normalizer reports it.
    let end_dt = event.get_end().unwrap_or_else(|| start_dt.clone());

    let uid = event
        .get_uid()
        .filter(|uid| !uid.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| synthetic_uid(unit_id, index));

    let mut raw = RawEvent::new(
        uid,
        unit_id,
        convert_date_time(start_dt),
        convert_date_time(end_dt),
    );

    if let Some(summary) = event.get_summary() {
        raw = raw.with_summary(summary);
    }

    if let Some(status) = event.get_status() {
        raw = raw.with_status(format!("{:?}", status));
    }

    debug!(
        uid = %raw.id,
        unit = %unit_id,
        summary = %raw.effective_title(),
        start = ?raw.start,
        end = ?raw.end,
        "Parsed event from feed"
    );

    Some(raw)
}

/// Checks the line structure of a feed and counts its top-level `VEVENT`s.
///
/// Every unfolded line must be a `NAME[;PARAM]:VALUE` content line, all of
/// them inside one `VCALENDAR`, with `BEGIN`/`END` pairs balanced.
fn check_structure(text: &str) -> Result<usize, String> {
    let mut stack: Vec<String> = Vec::new();
    let mut closed = false;
    let mut events = 0;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        // Folded continuation.
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let Some((head, value)) = line.split_once(':') else {
            return Err(format!("line {} is not a content line", line_no));
        };
        let name = head.split(';').next().unwrap_or(head);
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("line {} is not a content line", line_no));
        }
        if closed {
            return Err(format!("line {} comes after END:VCALENDAR", line_no));
        }

        let value = value.trim().to_ascii_uppercase();
        if name.eq_ignore_ascii_case("BEGIN") {
            if stack.is_empty() && value != CALENDAR {
                return Err(format!("line {} is outside the VCALENDAR envelope", line_no));
            }
            if stack.len() == 1 && value == EVENT {
                events += 1;
            }
            stack.push(value);
        } else if name.eq_ignore_ascii_case("END") {
            match stack.pop() {
                Some(open) if open == value => closed = stack.is_empty(),
                Some(open) => {
                    return Err(format!(
                        "line {}: END:{} closes BEGIN:{}",
                        line_no, value, open
                    ));
                }
                None => return Err(format!("line {}: END:{} without BEGIN", line_no, value)),
            }
        } else if stack.is_empty() {
            return Err(format!("line {} is outside the VCALENDAR envelope", line_no));
        }
    }

    match stack.last() {
        Some(open) => Err(format!("feed ends before END:{}", open)),
        None => Ok(events),
    }
}

fn synthetic_uid(unit_id: &str, index: usize) -> String {
    format!("{}#{}", unit_id, index)
}

/// Converts icalendar DatePerhapsTime to RawEventTime.
///
/// `TZID`s that name an IANA zone are resolved to UTC. Floating times and
/// unknown zones stay as wall-clock times.
fn convert_date_time(dt: DatePerhapsTime) -> RawEventTime {
    match dt {
        DatePerhapsTime::Date(date) => RawEventTime::from_date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => RawEventTime::from_datetime(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            RawEventTime::from_local(naive)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => match tz.from_local_datetime(&date_time).earliest() {
                    Some(local) => RawEventTime::from_datetime(local.with_timezone(&Utc)),
                    None => RawEventTime::from_local(date_time),
                },
                Err(_) => {
                    trace!(tzid = %tzid, "Unknown TZID, treating as floating time");
                    RawEventTime::from_local(date_time)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn airbnb_export() -> &'static [u8] {
        include_bytes!("../fixtures/airbnb_export.ics")
    }

    fn timed_ics() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Test//Test//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:utc-1@example.com\r\n\
         DTSTART:20240301T150000Z\r\n\
         DTEND:20240304T100000Z\r\n\
         SUMMARY:Guest: J. Smith\r\n\
         END:VEVENT\r\n\
         BEGIN:VEVENT\r\n\
         UID:tz-1@example.com\r\n\
         DTSTART;TZID=Europe/London:20240701T160000\r\n\
         DTEND;TZID=Europe/London:20240705T110000\r\n\
         END:VEVENT\r\n\
         BEGIN:VEVENT\r\n\
         UID:floating-1@example.com\r\n\
         DTSTART:20240801T160000\r\n\
         DTEND:20240803T110000\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    #[test]
    fn parse_airbnb_export() {
        let events: Vec<RawEvent> = parse_feed(airbnb_export(), "Flat 7").unwrap().collect();

        assert_eq!(events.len(), 3);
        let first = &events[0];
        assert_eq!(first.id, "1418fb94e984-7f4a2b9c1d0e@airbnb.com");
        assert_eq!(first.unit_id, "Flat 7");
        assert_eq!(first.effective_title(), "Reserved");
        assert_eq!(first.start, RawEventTime::Date(date(2024, 1, 1)));
        assert_eq!(first.end, RawEventTime::Date(date(2024, 1, 5)));
        assert!(first.is_all_day());

        assert_eq!(events[2].effective_title(), "Airbnb (Not available)");
    }

    #[test]
    fn parse_timed_events() {
        let events: Vec<RawEvent> = parse_feed(timed_ics().as_bytes(), "Flat 8")
            .unwrap()
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].start,
            RawEventTime::DateTime("2024-03-01T15:00:00Z".parse().unwrap())
        );
        // BST is UTC+1.
        assert_eq!(
            events[1].start,
            RawEventTime::DateTime("2024-07-01T15:00:00Z".parse().unwrap())
        );
        assert_eq!(
            events[2].start,
            RawEventTime::Local(date(2024, 8, 1).and_hms_opt(16, 0, 0).unwrap())
        );
        assert_eq!(events[1].effective_title(), "(No title)");
    }

    #[test]
    fn duplicate_uid_last_seen_wins() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:dup@example.com\r\n\
                   DTSTART;VALUE=DATE:20240101\r\n\
                   DTEND;VALUE=DATE:20240103\r\n\
                   END:VEVENT\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:other@example.com\r\n\
                   DTSTART;VALUE=DATE:20240110\r\n\
                   DTEND;VALUE=DATE:20240112\r\n\
                   END:VEVENT\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:dup@example.com\r\n\
                   DTSTART;VALUE=DATE:20240101\r\n\
                   DTEND;VALUE=DATE:20240104\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR";

        let events: Vec<RawEvent> = parse_feed(ics.as_bytes(), "U1").unwrap().collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "dup@example.com");
        assert_eq!(events[0].end, RawEventTime::Date(date(2024, 1, 4)));
        assert_eq!(events[1].id, "other@example.com");
    }

    #[test]
    fn missing_uid_and_end_are_tolerated() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   DTSTART;VALUE=DATE:20240101\r\n\
                   SUMMARY:Owner block\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR";

        let events: Vec<RawEvent> = parse_feed(ics.as_bytes(), "U1").unwrap().collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "U1#0");
        assert_eq!(events[0].start, events[0].end);
    }

    #[test]
    fn event_without_start_is_reported() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:no-start@example.com\r\n\
                   DTEND;VALUE=DATE:20240103\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR";

        let feed = parse_feed(ics.as_bytes(), "U1").unwrap();

        assert_eq!(feed.incomplete(), ["no-start@example.com".to_string()]);
        assert_eq!(feed.count(), 0);
    }

    #[test]
    fn empty_calendar_has_no_events() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR";
        assert_eq!(parse_feed(ics.as_bytes(), "U1").unwrap().len(), 0);
    }

    mod malformed {
        use super::*;

        #[test]
        fn html_error_page() {
            let err = parse_feed(b"<html><body>Service Unavailable</body></html>", "U2")
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ParseError);
            assert_eq!(err.unit(), Some("U2"));
        }

        #[test]
        fn invalid_utf8() {
            let err = parse_feed(&[0x42, 0x45, 0xff, 0xfe, 0x00], "U2").unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ParseError);
            assert!(err.message().contains("UTF-8"));
        }

        #[test]
        fn garbage_after_envelope() {
            let err = parse_feed(
                b"BEGIN:VCALENDAR\r\nthis is not a calendar at all\r\n%%%%\r\n",
                "U2",
            )
            .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ParseError);
            assert_eq!(err.message(), "line 2 is not a content line");
        }

        #[test]
        fn missing_end() {
            let ics = "BEGIN:VCALENDAR\r\n\
                       VERSION:2.0\r\n\
                       BEGIN:VEVENT\r\n\
                       UID:cut@example.com\r\n\
                       DTSTART;VALUE=DATE:20240101\r\n\
                       DTEND;VALUE=DATE:20240103\r\n\
                       END:VEVENT\r\n";
            let err = parse_feed(ics.as_bytes(), "U2").unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ParseError);
            assert_eq!(err.message(), "feed ends before END:VCALENDAR");
        }

        #[test]
        fn truncated_inside_event() {
            let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:cut@example.com\r\n";
            let err = parse_feed(ics.as_bytes(), "U2").unwrap_err();
            assert_eq!(err.message(), "feed ends before END:VEVENT");
        }

        #[test]
        fn mismatched_end() {
            let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
            let err = parse_feed(ics.as_bytes(), "U2").unwrap_err();
            assert_eq!(err.message(), "line 3: END:VTODO closes BEGIN:VEVENT");
        }

        #[test]
        fn content_after_calendar() {
            let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\nX-TRAILER:1\r\n";
            let err = parse_feed(ics.as_bytes(), "U2").unwrap_err();
            assert_eq!(err.message(), "line 4 comes after END:VCALENDAR");
        }

        #[test]
        fn folded_lines_are_accepted() {
            let ics = "BEGIN:VCALENDAR\r\n\
                       VERSION:2.0\r\n\
                       BEGIN:VEVENT\r\n\
                       UID:fold@example.com\r\n\
                       DTSTART;VALUE=DATE:20240101\r\n\
                       DTEND;VALUE=DATE:20240103\r\n\
                       SUMMARY:Long\r\n \
                       stay\r\n\
                       END:VEVENT\r\n\
                       END:VCALENDAR";
            assert_eq!(parse_feed(ics.as_bytes(), "U1").unwrap().len(), 1);
        }

        #[test]
        fn empty_body() {
            let err = parse_feed(b"", "U2").unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ParseError);
        }
    }
}
