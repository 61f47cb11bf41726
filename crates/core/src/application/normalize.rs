// Row Normalizer - raw row -> canonical item or typed rejection
//
// Pure: no I/O, no ambient clock or RNG. The only nondeterminism is the
// random day offset drawn from the caller's `rng`.

use crate::domain::{ImportProfile, NormalizedItem, RawPayload, RowErrorCode, RowRejection};
use chrono::{Duration, NaiveDate};
use rand::Rng;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize one raw row against the active import profile
pub fn normalize_row<R: Rng + ?Sized>(
    raw: &RawPayload,
    profile: &ImportProfile,
    today: NaiveDate,
    rng: &mut R,
) -> Result<NormalizedItem, RowRejection> {
    let title = field(raw, &profile.title_column).ok_or_else(|| {
        RowRejection::new(
            RowErrorCode::InvalidTitle,
            format!("{} is blank", profile.title_column),
        )
    })?;

    let year_hint = field(raw, &profile.year_column).and_then(parse_year);

    let explicit_date = profile
        .watch_date_column
        .as_deref()
        .and_then(|column| field(raw, column))
        .and_then(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok());

    let date = match explicit_date {
        Some(date) => date,
        None => random_watch_date(rng, today, year_hint, profile.min_watch_year),
    };

    Ok(NormalizedItem {
        title: title.to_string(),
        date,
        year_hint,
        source_reference: field(raw, &profile.source_link_column).map(str::to_string),
    })
}

/// Watch-date algorithm.
///
/// Floor is January 1 of `max(min_year, year_hint + 1)`; the result is a
/// uniformly random UTC calendar day in `[floor, today]`. A floor after
/// today collapses the range to `today`.
pub fn random_watch_date<R: Rng + ?Sized>(
    rng: &mut R,
    today: NaiveDate,
    year_hint: Option<i32>,
    min_year: i32,
) -> NaiveDate {
    let start_year = match year_hint {
        Some(year) => min_year.max(year.saturating_add(1)),
        None => min_year,
    };

    let floor = match NaiveDate::from_ymd_opt(start_year, 1, 1) {
        Some(floor) if floor <= today => floor,
        _ => return today,
    };

    let span_days = (today - floor).num_days();
    let offset = rng.gen_range(0..=span_days);
    floor + Duration::days(offset)
}

fn field<'a>(raw: &'a RawPayload, column: &str) -> Option<&'a str> {
    raw.get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Finite numeric year (fractions floored); anything else is no hint
fn parse_year(value: &str) -> Option<i32> {
    let year = value.parse::<f64>().ok().filter(|y| y.is_finite())?;
    let year = year.floor();
    if year < i32::MIN as f64 || year > i32::MAX as f64 {
        return None;
    }
    Some(year as i32)
}
