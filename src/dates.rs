//! Civil-date ranges and quarter arithmetic.
//!
//! The archive is organized by calendar year and quarter, so everything the
//! planners do starts from a validated [`DateRange`] and the [`Quarter`] a
//! date falls into. All arithmetic stays on year/month/day triples; there is
//! no epoch math anywhere near a quarter boundary.
//!
//! Both traversals of a range are finite, ascending, and restartable:
//! [`DateRange::days`] walks every calendar day (daily-index work), and
//! [`DateRange::quarter_starts`] yields the first overlapping day of each
//! quarter the range touches (quarterly work).

use chrono::{Datelike, Local, NaiveDate};

use super::error::{MirrorError, Result};

/// A calendar quarter. Quarter N contains months 3N−2 through 3N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quarter {
    year: i32,
    number: u32,
}

impl Quarter {
    /// The quarter containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Quarter number, 1 through 4.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// First calendar day of the quarter.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, (self.number - 1) * 3 + 1, 1)
            .expect("quarter start is a valid date")
    }

    /// Last calendar day of the quarter.
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .expect("quarter end is a valid date")
    }

    /// The following quarter, rolling the year over after Q4.
    pub fn next(&self) -> Self {
        if self.number == 4 {
            Self {
                year: self.year + 1,
                number: 1,
            }
        } else {
            Self {
                year: self.year,
                number: self.number + 1,
            }
        }
    }

    /// Directory name the archive uses for this quarter (`QTR1`..`QTR4`).
    pub fn dir_name(&self) -> String {
        format!("QTR{}", self.number)
    }
}

/// A closed interval of calendar days.
///
/// Invariants enforced at construction: `begin ≤ end` and `end ≤ today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    begin: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, validating its invariants.
    ///
    /// # Errors
    ///
    /// * `MirrorError::InvalidInput` when `begin > end`
    /// * `MirrorError::OutOfRange` when `end` lies in the future
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self> {
        if begin > end {
            return Err(MirrorError::InvalidInput(format!(
                "range begin {begin} is after end {end}"
            )));
        }
        let today = Local::now().date_naive();
        if end > today {
            return Err(MirrorError::OutOfRange(format!(
                "range end {end} is in the future"
            )));
        }
        Ok(Self { begin, end })
    }

    /// Single-day range.
    pub fn single(date: NaiveDate) -> Result<Self> {
        Self::new(date, date)
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every calendar day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.begin.iter_days().take_while(move |d| *d <= end)
    }

    /// The first overlapping day of each quarter the range touches,
    /// ascending: the range begin for the first quarter, then the first day
    /// of every subsequent quarter up to the end.
    pub fn quarter_starts(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.begin), move |d| {
            let next = Quarter::of(*d).next().first_day();
            (next <= end).then_some(next)
        })
    }

    /// The quarters the range touches, ascending.
    pub fn quarters(&self) -> impl Iterator<Item = Quarter> {
        self.quarter_starts().map(Quarter::of)
    }

    /// Number of distinct quarters intersected by the range.
    pub fn quarters_touched(&self) -> usize {
        let begin = Quarter::of(self.begin);
        let end = Quarter::of(self.end);
        ((end.year - begin.year) * 4 + end.number as i32 - begin.number as i32 + 1) as usize
    }
}

/// Parses a calendar date, accepting `YYYY-MM-DD` and `YYYY-Mon-DD`.
///
/// Future dates are not rejected here; that is [`DateRange::new`]'s job, so
/// a parsed date can still be compared against the archive bounds.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%b-%d"))
        .map_err(|_| MirrorError::InvalidInput(format!("unparseable date {input:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarter_of_date() {
        assert_eq!(Quarter::of(d(2013, 10, 14)).number(), 4);
        assert_eq!(Quarter::of(d(2013, 1, 1)).number(), 1);
        assert_eq!(Quarter::of(d(2013, 3, 31)).number(), 1);
        assert_eq!(Quarter::of(d(2013, 4, 1)).number(), 2);
    }

    #[test]
    fn quarter_bounds() {
        let q = Quarter::of(d(2023, 8, 15));
        assert_eq!(q.first_day(), d(2023, 7, 1));
        assert_eq!(q.last_day(), d(2023, 9, 30));
        assert_eq!(q.dir_name(), "QTR3");
    }

    #[test]
    fn quarter_next_rolls_year() {
        let q4 = Quarter::of(d(2023, 12, 31));
        let q1 = q4.next();
        assert_eq!(q1.year(), 2024);
        assert_eq!(q1.number(), 1);
        assert_eq!(q1.first_day(), d(2024, 1, 1));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::new(d(2020, 5, 2), d(2020, 5, 1)).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_future_end() {
        let tomorrow = Local::now().date_naive().succ_opt().unwrap();
        let err = DateRange::new(d(2020, 1, 1), tomorrow).unwrap_err();
        assert!(matches!(err, MirrorError::OutOfRange(_)));
    }

    #[test]
    fn single_day_yields_one_element_in_both_enumerations() {
        let range = DateRange::single(d(2013, 10, 1)).unwrap();
        assert_eq!(range.days().count(), 1);
        assert_eq!(range.quarter_starts().count(), 1);
        assert_eq!(range.quarters_touched(), 1);
    }

    #[test]
    fn range_inside_one_quarter_yields_begin() {
        let range = DateRange::new(d(2013, 10, 9), d(2013, 10, 17)).unwrap();
        let starts: Vec<_> = range.quarter_starts().collect();
        assert_eq!(starts, vec![d(2013, 10, 9)]);
        assert_eq!(range.days().count(), 9);
    }

    #[test]
    fn range_spanning_quarters_yields_each_start() {
        // Dec 2020 through May 2021 touches Q4, Q1, Q2.
        let range = DateRange::new(d(2020, 12, 20), d(2021, 5, 21)).unwrap();
        let starts: Vec<_> = range.quarter_starts().collect();
        assert_eq!(starts, vec![d(2020, 12, 20), d(2021, 1, 1), d(2021, 4, 1)]);
        assert_eq!(range.quarters_touched(), 3);

        let quarters: Vec<_> = range.quarters().map(|q| (q.year(), q.number())).collect();
        assert_eq!(quarters, vec![(2020, 4), (2021, 1), (2021, 2)]);
    }

    #[test]
    fn enumeration_is_restartable() {
        let range = DateRange::new(d(2020, 12, 20), d(2021, 5, 21)).unwrap();
        let first: Vec<_> = range.quarter_starts().collect();
        let second: Vec<_> = range.quarter_starts().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn begin_on_quarter_boundary() {
        let range = DateRange::new(d(2021, 1, 1), d(2021, 1, 1)).unwrap();
        let starts: Vec<_> = range.quarter_starts().collect();
        assert_eq!(starts, vec![d(2021, 1, 1)]);
    }

    #[test]
    fn parses_both_date_spellings() {
        assert_eq!(parse_date("2013-10-14").unwrap(), d(2013, 10, 14));
        assert_eq!(parse_date("2013-Oct-14").unwrap(), d(2013, 10, 14));
        assert!(matches!(
            parse_date("not-a-date"),
            Err(MirrorError::InvalidInput(_))
        ));
    }
}
