//! Period-bucketed cross-tabulation.
//!
//! `cross_tab` partitions records by a grouping field, pivots each partition
//! into a sparse (row value x period) count table, and folds the pivots into
//! one dense table whose columns are the full period axis of the input.
//!
//! Ordering is fixed by rule rather than by input order:
//! - groups ascending,
//! - row values ascending within a group,
//! - columns in axis order.

use crate::axis::build_axis;
use crate::error::{Result, StatError};
use crate::types::{Field, Granularity, Record};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse counts for one partition: row value -> period -> count.
pub type Pivot<'a> = BTreeMap<&'a str, BTreeMap<&'a str, u64>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTabRow {
    pub group: String,
    pub row: String,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTab {
    pub group_field: Field,
    pub row_field: Field,
    pub granularity: Granularity,
    pub axis: Vec<String>,
    pub rows: Vec<CrossTabRow>,
    /// Records left out of every period cell because they carry no date.
    pub undated: usize,
}

impl CrossTab {
    pub fn header(&self) -> Vec<String> {
        let mut h = vec![
            self.group_field.column_name().to_string(),
            self.row_field.column_name().to_string(),
        ];
        h.extend(self.axis.iter().cloned());
        h
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|r| {
            let mut rec = Vec::with_capacity(self.axis.len() + 2);
            rec.push(r.group.clone());
            rec.push(r.row.clone());
            rec.extend(r.counts.iter().map(u64::to_string));
            rec
        })
    }
}

/// One row per group value with its counts across the axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCounts {
    pub group_field: Field,
    pub granularity: Granularity,
    pub axis: Vec<String>,
    pub rows: Vec<(String, Vec<u64>)>,
    pub undated: usize,
}

impl PeriodCounts {
    pub fn header(&self) -> Vec<String> {
        let mut h = vec![self.group_field.column_name().to_string()];
        h.extend(self.axis.iter().cloned());
        h
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|(group, counts)| {
            let mut rec = Vec::with_capacity(counts.len() + 1);
            rec.push(group.clone());
            rec.extend(counts.iter().map(u64::to_string));
            rec
        })
    }
}

/// Full axis spanning every dated record in `records`.
pub fn axis_for<R: Record>(records: &[R], granularity: Granularity) -> Vec<String> {
    let mut dates = records.iter().filter_map(|r| r.periods()).map(|p| p.date);
    let Some(first) = dates.next() else {
        return Vec::new();
    };
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    build_axis(min, max, granularity)
}

/// Records grouped by the value of `field`, groups in ascending order and
/// input order kept inside each group.
pub fn partition<R: Record>(records: &[R], field: Field) -> BTreeMap<&str, Vec<&R>> {
    let mut groups: BTreeMap<&str, Vec<&R>> = BTreeMap::new();
    for r in records {
        groups.entry(r.field(field)).or_default().push(r);
    }
    groups
}

/// Sparse pivot of `records`: rows keyed by `row_field`, columns by the
/// period key at `granularity`. Undated records are skipped.
pub fn pivot<'a, R: Record>(
    records: &[&'a R],
    row_field: Field,
    granularity: Granularity,
) -> Pivot<'a> {
    let mut table: Pivot<'a> = BTreeMap::new();
    for &r in records {
        let Some(periods) = r.periods() else { continue };
        *table
            .entry(r.field(row_field))
            .or_default()
            .entry(periods.key(granularity))
            .or_insert(0) += 1;
    }
    table
}

fn column_index(axis: &[String]) -> HashMap<&str, usize> {
    axis.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect()
}

/// Dense counts for one pivot row, reindexed against the axis.
fn densify(
    cells: &BTreeMap<&str, u64>,
    axis: &[String],
    columns: &HashMap<&str, usize>,
) -> Result<Vec<u64>> {
    let mut counts = vec![0u64; axis.len()];
    for (period, n) in cells {
        let idx = columns
            .get(period)
            .copied()
            .ok_or_else(|| StatError::PeriodOutsideAxis {
                period: period.to_string(),
                first: axis.first().cloned().unwrap_or_default(),
                last: axis.last().cloned().unwrap_or_default(),
            })?;
        counts[idx] = *n;
    }
    Ok(counts)
}

/// Fold step: append one group's pivot to the accumulated table.
///
/// Rows come out in the pivot's own order and are tagged with `group`.
pub fn merge(mut acc: CrossTab, group: &str, pivot: &Pivot<'_>) -> Result<CrossTab> {
    let columns = column_index(&acc.axis);
    for (row, cells) in pivot {
        let counts = densify(cells, &acc.axis, &columns)?;
        acc.rows.push(CrossTabRow {
            group: group.to_string(),
            row: row.to_string(),
            counts,
        });
    }
    Ok(acc)
}

/// Cross-tabulate `records` by `group_field` and `row_field` over periods.
///
/// The result has one row per (group, row value) pair seen on a dated
/// record and one column per period of the axis derived from all records,
/// independent of how sparse any single group is. An empty input gives an
/// empty axis and no rows.
pub fn cross_tab<R: Record>(
    records: &[R],
    group_field: Field,
    row_field: Field,
    granularity: Granularity,
) -> Result<CrossTab> {
    let axis = axis_for(records, granularity);
    let undated = records.iter().filter(|r| r.periods().is_none()).count();
    let empty = CrossTab {
        group_field,
        row_field,
        granularity,
        axis,
        rows: Vec::new(),
        undated,
    };

    partition(records, group_field)
        .into_iter()
        .try_fold(empty, |acc, (group, subset)| {
            let p = pivot(&subset, row_field, granularity);
            merge(acc, group, &p)
        })
}

/// Count records per group value per period, zero-filled across the axis.
pub fn count_by_period<R: Record>(
    records: &[R],
    group_field: Field,
    granularity: Granularity,
) -> Result<PeriodCounts> {
    let axis = axis_for(records, granularity);
    let columns = column_index(&axis);
    let all: Vec<&R> = records.iter().collect();
    let table = pivot(&all, group_field, granularity);

    let mut rows = Vec::with_capacity(table.len());
    for (group, cells) in &table {
        rows.push((group.to_string(), densify(cells, &axis, &columns)?));
    }
    Ok(PeriodCounts {
        group_field,
        granularity,
        undated: records.iter().filter(|r| r.periods().is_none()).count(),
        axis,
        rows,
    })
}

/// Number of records per distinct value of `field`, values ascending.
pub fn count_by_group<R: Record>(records: &[R], field: Field) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        *counts.entry(r.field(field)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect()
}

/// Distinct (group, row) pairs ordered by group, then row.
pub fn distinct_pairs<R: Record>(
    records: &[R],
    group_field: Field,
    row_field: Field,
) -> Vec<(String, String)> {
    records
        .iter()
        .map(|r| (r.field(group_field), r.field(row_field)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|(g, r)| (g.to_string(), r.to_string()))
        .collect()
}

/// Records whose `field` equals `value`.
pub fn filter_records<R: Record + Clone>(records: &[R], field: Field, value: &str) -> Vec<R> {
    records
        .iter()
        .filter(|r| r.field(field) == value)
        .cloned()
        .collect()
}
