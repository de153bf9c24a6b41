use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::{add_days, exclusive_end, ics_date};
use crate::models::{
    resolve_cycle_length, resolve_period_length, CycleEvent, CyclePrediction, EventType,
    ResolvedProfile,
};
use crate::prediction::{
    accuracy_label, FERTILE_DAYS_AFTER_OVULATION, FERTILE_DAYS_BEFORE_OVULATION,
    LUTEAL_PHASE_DAYS,
};

const PRODUCT_ID: &str = "-//Cykel//Cycle Forecast//EN";
const CALENDAR_NAME: &str = "Cykel";
const UID_DOMAIN: &str = "cykel-forecast";
const GOOGLE_CALENDAR_URL: &str = "https://calendar.google.com/calendar/render";
/// RFC 5545 content lines are folded after this many octets.
const MAX_LINE_OCTETS: usize = 75;

/// Project `cycles_ahead` future cycles starting at `anchor`.
///
/// Each cycle yields a period, an ovulation and a fertile-window event, in that
/// order. The user-facing "months ahead" setting maps one-to-one onto cycles.
/// Lengths go through the same defaults and ranges as the profile, so ovulation
/// always falls after the period that opens its cycle. Projection stops early
/// rather than run past the last representable date.
pub fn project_events(
    anchor: NaiveDate,
    average_cycle_length: u32,
    average_period_length: u32,
    cycles_ahead: u32,
) -> Vec<CycleEvent> {
    let cycle_length = i64::from(resolve_cycle_length(Some(average_cycle_length)));
    let period_length = resolve_period_length(Some(average_period_length));

    let mut events = Vec::new();
    let mut cycle_start = anchor;

    for projected in 0..cycles_ahead {
        let Some(cycle) = project_cycle(cycle_start, cycle_length, period_length) else {
            log::warn!("stopping projection after {projected} cycles, dates out of range");
            break;
        };
        events.extend(cycle);

        match add_days(cycle_start, cycle_length) {
            Some(next) => cycle_start = next,
            None => break,
        }
    }

    events
}

fn project_cycle(
    cycle_start: NaiveDate,
    cycle_length: i64,
    period_length: u32,
) -> Option<[CycleEvent; 3]> {
    let ovulation_day = add_days(cycle_start, cycle_length - LUTEAL_PHASE_DAYS)?;

    Some([
        CycleEvent {
            title: "Period".into(),
            description: format!("Predicted period (day 1-{period_length} of cycle)"),
            start_date: cycle_start,
            end_date: add_days(cycle_start, i64::from(period_length) - 1)?,
            event_type: EventType::Period,
        },
        CycleEvent::single_day(
            "Ovulation Day",
            "Predicted ovulation, highest fertility",
            ovulation_day,
            EventType::Ovulation,
        ),
        CycleEvent {
            title: "Fertile Window".into(),
            description: "Fertile window, higher chance of conception".into(),
            start_date: add_days(ovulation_day, -FERTILE_DAYS_BEFORE_OVULATION)?,
            end_date: add_days(ovulation_day, FERTILE_DAYS_AFTER_OVULATION)?,
            event_type: EventType::Fertile,
        },
    ])
}

pub fn project_profile(
    anchor: NaiveDate,
    profile: &ResolvedProfile,
    cycles_ahead: u32,
) -> Vec<CycleEvent> {
    project_events(anchor, profile.cycle_length, profile.period_length, cycles_ahead)
}

/// Single-day event marking the engine's predicted next period.
pub fn prediction_event(prediction: &CyclePrediction) -> CycleEvent {
    CycleEvent::single_day(
        "Next Period (predicted)",
        format!(
            "Expected start of next period, {}% confidence ({})",
            prediction.accuracy_score,
            accuracy_label(prediction.accuracy_score)
        ),
        prediction.next_period_date,
        EventType::Prediction,
    )
}

/// Which event types survive export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventFilter {
    pub period: bool,
    pub fertile: bool,
    pub ovulation: bool,
    pub prediction: bool,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            period: true,
            fertile: true,
            ovulation: true,
            prediction: true,
        }
    }
}

impl EventFilter {
    pub fn allows(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::Period => self.period,
            EventType::Fertile => self.fertile,
            EventType::Ovulation => self.ovulation,
            EventType::Prediction => self.prediction,
        }
    }

    pub fn apply(&self, events: Vec<CycleEvent>) -> Vec<CycleEvent> {
        events
            .into_iter()
            .filter(|e| self.allows(e.event_type))
            .collect()
    }
}

/// Render events as an iCalendar document of all-day events.
///
/// `stamp` becomes every event's `DTSTAMP`. Lines end in CRLF and are folded
/// at 75 octets. `DTEND` is exclusive, one day past the event's last day.
pub fn to_ics(events: &[CycleEvent], stamp: DateTime<Utc>) -> String {
    let stamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{CALENDAR_NAME}"),
        "X-WR-TIMEZONE:UTC".to_string(),
    ];

    for event in events {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@{UID_DOMAIN}", Uuid::new_v4()));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", ics_date(event.start_date)));
        lines.push(format!(
            "DTEND;VALUE=DATE:{}",
            ics_date(exclusive_end(event.end_date))
        ));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        lines.push(format!("DESCRIPTION:{}", escape_text(&event.description)));
        lines.push(format!("CATEGORIES:{}", event.event_type.category()));
        lines.push("STATUS:CONFIRMED".to_string());
        lines.push("TRANSP:TRANSPARENT".to_string());
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Google Calendar "create event" link for one event.
pub fn deep_link(event: &CycleEvent) -> String {
    let dates = format!(
        "{}/{}",
        ics_date(event.start_date),
        ics_date(exclusive_end(event.end_date))
    );
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("action", "TEMPLATE")
        .append_pair("text", &event.title)
        .append_pair("dates", &dates)
        .append_pair("details", &event.description)
        .append_pair("trp", "false")
        .finish();

    format!("{GOOGLE_CALENDAR_URL}?{query}")
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    // continuation lines start with a space, which counts against the limit
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > budget {
            folded.push_str("\r\n ");
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        folded.push(c);
        used += c.len_utf8();
    }
    folded
}
