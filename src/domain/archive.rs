//! Calendar periods used by the date archives.

use std::fmt;

use time::{Date, Month, OffsetDateTime, Time};

use crate::domain::error::DomainError;

/// A year, a month of a year, or a single day, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePeriod {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl ArchivePeriod {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn month(year: i32, month: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn day(year: i32, month: u8, day: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }

    /// Half-open `[start, end)` range covered by the period.
    ///
    /// Impossible dates (month 13, February 30th, a day without a month)
    /// are reported as `NotFound` so callers can surface a plain 404.
    pub fn bounds(&self) -> Result<(OffsetDateTime, OffsetDateTime), DomainError> {
        let (start, end) = match (self.month, self.day) {
            (None, None) => {
                let start = first_of_month(self.year, Month::January)?;
                let next_year = self.year.checked_add(1).ok_or_else(invalid)?;
                let end = first_of_month(next_year, Month::January)?;
                (start, end)
            }
            (Some(month), None) => {
                let month = parse_month(month)?;
                let start = first_of_month(self.year, month)?;
                let next_year = if month == Month::December {
                    self.year.checked_add(1).ok_or_else(invalid)?
                } else {
                    self.year
                };
                let end = first_of_month(next_year, month.next())?;
                (start, end)
            }
            (Some(month), Some(day)) => {
                let month = parse_month(month)?;
                let start =
                    Date::from_calendar_date(self.year, month, day).map_err(|_| invalid())?;
                let end = start.next_day().ok_or_else(invalid)?;
                (start, end)
            }
            (None, Some(_)) => return Err(invalid()),
        };

        Ok((midnight(start), midnight(end)))
    }
}

impl fmt::Display for ArchivePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "/{month:02}")?;
        }
        if let Some(day) = self.day {
            write!(f, "/{day:02}")?;
        }
        Ok(())
    }
}

fn parse_month(month: u8) -> Result<Month, DomainError> {
    Month::try_from(month).map_err(|_| invalid())
}

fn first_of_month(year: i32, month: Month) -> Result<Date, DomainError> {
    Date::from_calendar_date(year, month, 1).map_err(|_| invalid())
}

fn midnight(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

fn invalid() -> DomainError {
    DomainError::not_found("archive period")
}
