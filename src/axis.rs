//! Period axis construction.
//!
//! Every table produced for a dataset uses the full contiguous run of
//! periods between the earliest and latest collection dates, so columns line
//! up across reports even where a period has no data.

use crate::types::Granularity;
use crate::util::{month_start, week_ending, DAY_FORMAT, MONTH_FORMAT};
use chrono::{Duration, Months, NaiveDate};

/// Ordered period labels covering `min..=max` at `granularity`.
///
/// - Month: every month from `min`'s month through `max`'s month.
/// - Day: every calendar day.
/// - Week: every Sunday from the week key of `min` through the week key of
///   `max`, matching the keys assigned by the normalizer.
///
/// Returns an empty axis when `min > max`.
pub fn build_axis(min: NaiveDate, max: NaiveDate, granularity: Granularity) -> Vec<String> {
    if min > max {
        return Vec::new();
    }
    match granularity {
        Granularity::Month => {
            let last = month_start(max);
            step_dates(month_start(min), last, |d| d.checked_add_months(Months::new(1)))
                .map(|d| d.format(MONTH_FORMAT).to_string())
                .collect()
        }
        Granularity::Day => step_dates(min, max, |d| d.succ_opt())
            .map(|d| d.format(DAY_FORMAT).to_string())
            .collect(),
        Granularity::Week => {
            let last = week_ending(max);
            step_dates(week_ending(min), last, |d| d.checked_add_signed(Duration::days(7)))
                .map(|d| d.format(DAY_FORMAT).to_string())
                .collect()
        }
    }
}

fn step_dates<F>(start: NaiveDate, last: NaiveDate, next: F) -> impl Iterator<Item = NaiveDate>
where
    F: Fn(NaiveDate) -> Option<NaiveDate>,
{
    std::iter::successors(Some(start), move |d| next(*d).filter(|n| *n <= last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_axis_includes_both_endpoint_months() {
        let axis = build_axis(d(2020, 11, 30), d(2021, 2, 1), Granularity::Month);
        assert_eq!(axis, vec!["2020/11", "2020/12", "2021/01", "2021/02"]);
    }

    #[test]
    fn day_axis_is_inclusive() {
        let axis = build_axis(d(2021, 2, 27), d(2021, 3, 2), Granularity::Day);
        assert_eq!(
            axis,
            vec!["2021/02/27", "2021/02/28", "2021/03/01", "2021/03/02"]
        );
    }

    #[test]
    fn week_axis_lists_sundays() {
        // Tuesday 2021-01-05 through Saturday 2021-01-23.
        let axis = build_axis(d(2021, 1, 5), d(2021, 1, 23), Granularity::Week);
        assert_eq!(axis, vec!["2021/01/10", "2021/01/17", "2021/01/24"]);
    }

    #[test]
    fn single_date_gives_single_label() {
        let day = d(2021, 6, 15);
        assert_eq!(build_axis(day, day, Granularity::Month), vec!["2021/06"]);
        assert_eq!(build_axis(day, day, Granularity::Day), vec!["2021/06/15"]);
        assert_eq!(build_axis(day, day, Granularity::Week), vec!["2021/06/20"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(build_axis(d(2021, 2, 1), d(2021, 1, 1), Granularity::Day).is_empty());
    }

    fn granularity() -> impl Strategy<Value = Granularity> {
        prop_oneof![
            Just(Granularity::Month),
            Just(Granularity::Day),
            Just(Granularity::Week),
        ]
    }

    proptest! {
        #[test]
        fn axis_is_strictly_increasing_and_bounded(
            start in 0i64..3000,
            span in 0i64..800,
            g in granularity(),
        ) {
            let min = d(2018, 1, 1) + Duration::days(start);
            let max = min + Duration::days(span);
            let axis = build_axis(min, max, g);

            prop_assert!(!axis.is_empty());
            prop_assert!(axis.windows(2).all(|w| w[0] < w[1]));

            let keys_min = crate::util::period_keys(min);
            let keys_max = crate::util::period_keys(max);
            prop_assert_eq!(axis.first().unwrap().as_str(), keys_min.key(g));
            prop_assert_eq!(axis.last().unwrap().as_str(), keys_max.key(g));
        }
    }
}
