use std::fmt::Display;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, TimeZone};
use shared_types::Reservation;

use super::labels::Lang;

const SL_WEEKDAYS: [&str; 7] = [
    "ponedeljek", "torek", "sreda", "četrtek", "petek", "sobota", "nedelja",
];
const SL_MONTHS: [&str; 12] = [
    "januarja", "februarja", "marca", "aprila", "maja", "junija",
    "julija", "avgusta", "septembra", "oktobra", "novembra", "decembra",
];
const EN_WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];
const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// "ponedeljek, 6. maja 2024" / "Monday, 6 May 2024"
pub fn long_date(date: NaiveDate, lang: Lang) -> String {
    let weekday = date.weekday().num_days_from_monday() as usize;
    let month = date.month0() as usize;
    match lang {
        Lang::Sl => format!(
            "{}, {}. {} {}",
            SL_WEEKDAYS[weekday],
            date.day(),
            SL_MONTHS[month],
            date.year()
        ),
        Lang::En => format!(
            "{}, {} {} {}",
            EN_WEEKDAYS[weekday],
            date.day(),
            EN_MONTHS[month],
            date.year()
        ),
    }
}

pub fn clock_time<Tz>(at: &DateTime<FixedOffset>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%H:%M").to_string()
}

pub fn time_range<Tz>(reservation: &Reservation, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} - {}",
        clock_time(&reservation.start, tz),
        clock_time(&reservation.end, tz)
    )
}
