//! Invariants of the cross-tabulation over generated event sets.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use statview::axis::build_axis;
use statview::crosstab::cross_tab;
use statview::types::{Event, Field, Geography, Granularity, Record, UNKNOWN};
use statview::util::period_keys;
use std::collections::{BTreeMap, HashMap};

fn event(region: &str, mutation: &str, offset: i64) -> Event {
    let date = NaiveDate::from_ymd_opt(2020, 12, 1).unwrap() + Duration::days(offset);
    Event {
        sample_id: format!("{region}:{mutation}:{offset}"),
        attributes: BTreeMap::from([(Field::Mutation, mutation.to_string())]),
        geo: Geography {
            region: region.to_string(),
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
        },
        periods: Some(period_keys(date)),
    }
}

fn events() -> impl Strategy<Value = Vec<Event>> {
    let region = prop::sample::select(vec!["Africa", "Asia", "EU", "NA", UNKNOWN]);
    let mutation = prop::sample::select(vec!["A1", "B2", "C3", "D614G"]);
    prop::collection::vec((region, mutation, 0i64..400), 1..60)
        .prop_map(|v| v.into_iter().map(|(r, m, o)| event(r, m, o)).collect())
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
    fn columns_are_the_global_axis(evs in events(), g in granularity()) {
        let table = cross_tab(&evs, Field::Region, Field::Mutation, g).unwrap();
        let dates = evs.iter().filter_map(|e| e.periods()).map(|p| p.date);
        let min = dates.clone().min().unwrap();
        let max = dates.max().unwrap();
        prop_assert_eq!(&table.axis, &build_axis(min, max, g));
        for row in &table.rows {
            prop_assert_eq!(row.counts.len(), table.axis.len());
        }
    }

    #[test]
    fn every_event_is_counted_once(evs in events(), g in granularity()) {
        let table = cross_tab(&evs, Field::Region, Field::Mutation, g).unwrap();
        let total: u64 = table.rows.iter().flat_map(|r| r.counts.iter()).sum();
        prop_assert_eq!(total as usize, evs.len());

        let mut expected: HashMap<(&str, &str), u64> = HashMap::new();
        for e in &evs {
            *expected.entry((e.field(Field::Region), e.field(Field::Mutation))).or_default() += 1;
        }
        prop_assert_eq!(table.rows.len(), expected.len());
        for row in &table.rows {
            let sum: u64 = row.counts.iter().sum();
            prop_assert_eq!(Some(&sum), expected.get(&(row.group.as_str(), row.row.as_str())));
        }
    }

    #[test]
    fn cells_match_direct_counts(evs in events(), g in granularity()) {
        let table = cross_tab(&evs, Field::Region, Field::Mutation, g).unwrap();
        for row in &table.rows {
            for (period, n) in table.axis.iter().zip(&row.counts) {
                let direct = evs
                    .iter()
                    .filter(|e| e.field(Field::Region) == row.group && e.field(Field::Mutation) == row.row)
                    .filter(|e| e.periods().map(|p| p.key(g)) == Some(period.as_str()))
                    .count() as u64;
                prop_assert_eq!(*n, direct);
            }
        }
    }

    #[test]
    fn output_ignores_input_order(evs in events(), g in granularity()) {
        let first = cross_tab(&evs, Field::Region, Field::Mutation, g).unwrap();
        let again = cross_tab(&evs, Field::Region, Field::Mutation, g).unwrap();
        let mut reversed = evs.clone();
        reversed.reverse();
        let flipped = cross_tab(&reversed, Field::Region, Field::Mutation, g).unwrap();
        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &flipped);
    }

    #[test]
    fn rows_sorted_by_group_then_row(evs in events()) {
        let table = cross_tab(&evs, Field::Region, Field::Mutation, Granularity::Month).unwrap();
        let keys: Vec<(&str, &str)> = table.rows.iter().map(|r| (r.group.as_str(), r.row.as_str())).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
