// crates/bimodal-core/src/holidays.rs

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::schema::TableName;
use crate::store::TableStore;

/// Source of public holiday dates for a set of years and a regional subdivision.
pub trait HolidayCalendar {
    fn holidays(&self, years: &[i32], subdivision: &str) -> BTreeMap<NaiveDate, String>;
}

/// A fixed date -> name table. Subdivision is ignored; years filter the entries.
impl HolidayCalendar for BTreeMap<NaiveDate, String> {
    fn holidays(&self, years: &[i32], _subdivision: &str) -> BTreeMap<NaiveDate, String> {
        self.iter()
            .filter(|(date, _)| years.contains(&date.year()))
            .map(|(date, name)| (*date, name.clone()))
            .collect()
    }
}

/// New Zealand statutory holidays plus regional anniversary days.
#[derive(Debug, Default, Clone, Copy)]
pub struct NewZealandCalendar;

impl HolidayCalendar for NewZealandCalendar {
    fn holidays(&self, years: &[i32], subdivision: &str) -> BTreeMap<NaiveDate, String> {
        let mut set = HolidaySet::default();
        for &year in years {
            national_holidays(year, &mut set);
            regional_holidays(year, subdivision, &mut set);
        }
        set.0
    }
}

#[derive(Default)]
struct HolidaySet(BTreeMap<NaiveDate, String>);

impl HolidaySet {
    fn add(&mut self, date: Option<NaiveDate>, name: &str) {
        let Some(date) = date else { return };
        self.0
            .entry(date)
            .and_modify(|existing| {
                if !existing.split("; ").any(|n| n == name) {
                    existing.push_str("; ");
                    existing.push_str(name);
                }
            })
            .or_insert_with(|| name.to_string());
    }

    /// Weekend holiday moves to the following Monday.
    fn add_mondayised(&mut self, date: Option<NaiveDate>, name: &str) {
        let Some(date) = date else { return };
        self.add(Some(date), name);
        let shift = match date.weekday() {
            Weekday::Sat => 2,
            Weekday::Sun => 1,
            _ => return,
        };
        self.add(Some(date + Duration::days(shift)), &format!("{name} (observed)"));
    }

    /// Two consecutive holidays; each one falling on a weekend takes the next free weekday.
    fn add_mondayised_pair(&mut self, first: Option<NaiveDate>, first_name: &str, second_name: &str) {
        let Some(first) = first else { return };
        let second = first + Duration::days(1);
        self.add(Some(first), first_name);
        self.add(Some(second), second_name);

        let mut next = second + Duration::days(1);
        for (date, name) in [(first, first_name), (second, second_name)] {
            if is_weekend(date) {
                while is_weekend(next) {
                    next += Duration::days(1);
                }
                self.add(Some(next), &format!("{name} (observed)"));
                next += Duration::days(1);
            }
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Gregorian Easter Sunday (anonymous algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

/// Monday closest to `month`/`day`; ties on Friday go forward.
fn nearest_monday(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = ymd(year, month, day)?;
    let offset = i64::from(date.weekday().num_days_from_monday());
    if offset <= 3 {
        Some(date - Duration::days(offset))
    } else {
        Some(date + Duration::days(7 - offset))
    }
}

fn matariki(year: i32) -> Option<NaiveDate> {
    match year {
        2022 => ymd(2022, 6, 24),
        2023 => ymd(2023, 7, 14),
        2024 => ymd(2024, 6, 28),
        2025 => ymd(2025, 6, 20),
        2026 => ymd(2026, 7, 10),
        _ => None,
    }
}

fn national_holidays(year: i32, set: &mut HolidaySet) {
    set.add_mondayised_pair(ymd(year, 1, 1), "New Year's Day", "Day after New Year's Day");

    if year >= 2014 {
        set.add_mondayised(ymd(year, 2, 6), "Waitangi Day");
        set.add_mondayised(ymd(year, 4, 25), "Anzac Day");
    } else {
        set.add(ymd(year, 2, 6), "Waitangi Day");
        set.add(ymd(year, 4, 25), "Anzac Day");
    }

    if let Some(easter) = easter_sunday(year) {
        set.add(Some(easter - Duration::days(2)), "Good Friday");
        set.add(Some(easter + Duration::days(1)), "Easter Monday");
    }

    let birthday = if year >= 2023 { "King's Birthday" } else { "Queen's Birthday" };
    set.add(NaiveDate::from_weekday_of_month_opt(year, 6, Weekday::Mon, 1), birthday);

    set.add(matariki(year), "Matariki");

    if year == 2022 {
        set.add(ymd(2022, 9, 26), "Queen Elizabeth II Memorial Day");
    }

    set.add(NaiveDate::from_weekday_of_month_opt(year, 10, Weekday::Mon, 4), "Labour Day");

    set.add_mondayised_pair(ymd(year, 12, 25), "Christmas Day", "Boxing Day");
}

fn regional_holidays(year: i32, subdivision: &str, set: &mut HolidaySet) {
    match subdivision {
        "WGN" => set.add(nearest_monday(year, 1, 22), "Wellington Anniversary Day"),
        "AUK" | "NTL" => set.add(nearest_monday(year, 1, 29), "Auckland Anniversary Day"),
        "NSN" => set.add(nearest_monday(year, 2, 1), "Nelson Anniversary Day"),
        "OTA" => set.add(nearest_monday(year, 3, 23), "Otago Anniversary Day"),
        _ => {}
    }
}

/// Builds the `{date, holiday_name}` table for the given years and subdivision.
pub fn build_holiday_table(
    calendar: &dyn HolidayCalendar,
    years: &[i32],
    subdivision: &str,
) -> Result<DataFrame> {
    let holidays = calendar.holidays(years, subdivision);
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

    let days: Vec<i32> = holidays
        .keys()
        .map(|date| (*date - epoch).num_days() as i32)
        .collect();
    let names: Vec<&str> = holidays.values().map(String::as_str).collect();

    let date = Series::new("date".into(), days).cast(&DataType::Date)?;
    let holiday_name = Series::new("holiday_name".into(), names);
    Ok(DataFrame::new(vec![date.into(), holiday_name.into()])?)
}

pub fn preprocess_holidays(
    store: &TableStore,
    calendar: &dyn HolidayCalendar,
    years: &[i32],
    subdivision: &str,
) -> Result<DataFrame> {
    let mut table = build_holiday_table(calendar, years, subdivision)?;
    store.write_table(TableName::Holidays, &mut table)?;
    info!(rows = table.height(), subdivision, "holiday table built");
    Ok(table)
}
