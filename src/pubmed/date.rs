//! Publication date resolution
//!
//! A MEDLINE record carries its publication date in one of three mutually
//! exclusive shapes: a structured `Year`/`Month`/`Day`, a `Year` plus `Season`,
//! or a free-text `MedlineDate`. Which one is present depends on the journal.
//! [`resolve_publication_date`] applies a fixed priority over these shapes and
//! falls back to the record's PubMed history date, the least preferred source
//! because it is when the record was indexed rather than published.

use std::sync::OnceLock;

use regex::Regex;
use time::{Date, Month, util::days_in_year_month};

use crate::pubmed::models::{DateSource, PublicationDate, ResolvedDate};

/// Year plus a three-letter month abbreviation, e.g. "1998 Dec-1999 Jan"
fn medline_year_month_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}) (\w{3})[\s-]").expect("Failed to compile MedlineDate month regex")
    })
}

/// Year plus a season (or any other) word, e.g. "2019 Spring-Summer"
fn medline_year_season_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}) (\w+)[\s-]").expect("Failed to compile MedlineDate season regex")
    })
}

fn medline_year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})").expect("Failed to compile MedlineDate year regex"))
}

/// Result of matching a `MedlineDate` prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedlineDateMatch {
    pub year: i32,
    pub month: Month,
}

/// Map a season name to the month that opens it.
///
/// Anything that is not one of the four seasons maps to January.
pub fn season_to_month(season: &str) -> Month {
    match season.trim().to_lowercase().as_str() {
        "spring" => Month::March,
        "summer" => Month::June,
        "fall" => Month::September,
        "winter" => Month::December,
        _ => Month::January,
    }
}

pub fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

/// Parse a month given as a number ("3", "03") or an English name or
/// abbreviation ("Mar", "March", "Mar-Apr")
pub fn parse_month(text: &str) -> Option<Month> {
    let text = text.trim();
    if let Ok(n) = text.parse::<u8>() {
        return Month::try_from(n).ok();
    }

    let prefix: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_lowercase();

    match prefix.as_str() {
        "jan" => Some(Month::January),
        "feb" => Some(Month::February),
        "mar" => Some(Month::March),
        "apr" => Some(Month::April),
        "may" => Some(Month::May),
        "jun" => Some(Month::June),
        "jul" => Some(Month::July),
        "aug" => Some(Month::August),
        "sep" => Some(Month::September),
        "oct" => Some(Month::October),
        "nov" => Some(Month::November),
        "dec" => Some(Month::December),
        _ => None,
    }
}

fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_day(text: &str) -> Option<u8> {
    text.trim().parse::<u8>().ok().filter(|d| *d > 0)
}

/// Match `MedlineDate` against `^(\d{4}) (\w{3})[\s-]`.
///
/// The three letters must name a month; "2019 1st-2nd" does not match.
pub fn parse_medline_year_month(text: &str) -> Option<MedlineDateMatch> {
    let caps = medline_year_month_regex().captures(text.trim())?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = parse_month(caps.get(2)?.as_str())?;
    Some(MedlineDateMatch { year, month })
}

/// Match `MedlineDate` against `^(\d{4}) (\w+)[\s-]`, mapping the word
/// through [`season_to_month`]
pub fn parse_medline_year_season(text: &str) -> Option<MedlineDateMatch> {
    let caps = medline_year_season_regex().captures(text.trim())?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = season_to_month(caps.get(2)?.as_str());
    Some(MedlineDateMatch { year, month })
}

/// Leading four-digit year of a `MedlineDate`, e.g. "2004" from "2004 Spring"
pub fn parse_medline_year(text: &str) -> Option<i32> {
    medline_year_regex()
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Build a date, clamping the day into the month ("Feb 30" becomes Feb 28/29)
fn calendar_date(year: i32, month: Month, day: Option<u8>) -> Option<Date> {
    let last_day = days_in_year_month(year, month);
    let day = day.unwrap_or(1).min(last_day);
    Date::from_calendar_date(year, month, day).ok()
}

fn resolved(
    year: Option<i32>,
    month: Month,
    day: Option<u8>,
    source: DateSource,
    month_resolved: bool,
) -> Option<ResolvedDate> {
    let date = calendar_date(year?, month, day)?;
    Some(ResolvedDate {
        date,
        source,
        month_resolved,
    })
}

/// Resolve the record's publication date fields into one calendar date.
///
/// First match wins:
/// 1. explicit month: `Year`/`Month`/`Day`, day defaulting to 1
/// 2. season: `Year` with the season's opening month, day 1
/// 3. `MedlineDate` "YYYY Mon" then "YYYY Word"; an explicit `Year` overrides
///    the matched year
/// 4. the PubMed history date
///
/// A step that yields no year falls through to the next one. When even the
/// history has no year, the explicit `Year` or the leading year of
/// `MedlineDate` is used on its own. `None` only when no field carries a year.
pub fn resolve_publication_date(pub_date: &PublicationDate) -> Option<ResolvedDate> {
    let explicit_year = parse_year(&pub_date.year);
    let month_text = pub_date.month.trim();
    let season = pub_date.season.trim();
    let medline_date = pub_date.medline_date.trim();

    if !month_text.is_empty() {
        let month = parse_month(month_text);
        let date = resolved(
            explicit_year,
            month.unwrap_or(Month::January),
            parse_day(&pub_date.day),
            DateSource::PubDate,
            month.is_some(),
        );
        if date.is_some() {
            return date;
        }
    } else if !season.is_empty() {
        let date = resolved(
            explicit_year,
            season_to_month(season),
            None,
            DateSource::Season,
            true,
        );
        if date.is_some() {
            return date;
        }
    } else if let Some(found) = parse_medline_year_month(medline_date) {
        return resolved(
            explicit_year.or(Some(found.year)),
            found.month,
            None,
            DateSource::MedlineMonth,
            true,
        );
    } else if let Some(found) = parse_medline_year_season(medline_date) {
        return resolved(
            explicit_year.or(Some(found.year)),
            found.month,
            None,
            DateSource::MedlineSeason,
            true,
        );
    }

    let history_month = parse_month(&pub_date.history_month);
    let history = resolved(
        parse_year(&pub_date.history_year),
        history_month.unwrap_or(Month::January),
        parse_day(&pub_date.history_day),
        DateSource::History,
        history_month.is_some(),
    );
    if history.is_some() {
        return history;
    }

    resolved(
        explicit_year.or_else(|| parse_medline_year(medline_date)),
        Month::January,
        None,
        DateSource::YearOnly,
        false,
    )
}
