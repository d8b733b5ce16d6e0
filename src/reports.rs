//! Report definitions and the code that turns one definition into a table.
//!
//! The standard battery mirrors the stat views consumed by the web server.
//! Extra definitions can be loaded from JSON in the same shape.

use crate::crosstab::{count_by_group, count_by_period, cross_tab, distinct_pairs, filter_records};
use crate::error::{Result, StatError};
use crate::loader::Dataset;
use crate::types::{Field, Granularity, Record};
use chrono::{NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Samples,
    Variants,
    Clades,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Samples => "samples",
            Source::Variants => "variants",
            Source::Clades => "clades",
        }
    }

    /// Whether rows of this table carry `field`. Calls inherit the sample
    /// columns through the join.
    pub fn carries(self, field: Field) -> bool {
        match field {
            Field::SampleId | Field::Region | Field::Country | Field::City => true,
            Field::Mutation | Field::Gene | Field::Protein => self == Source::Variants,
            Field::CladeType | Field::CladeDetail => self == Source::Clades,
        }
    }

    /// Resolve a configured column name against this table.
    pub fn field(self, name: &str) -> Result<Field> {
        let field: Field = name.parse()?;
        if !self.carries(field) {
            return Err(StatError::FieldNotInSource { field, table: self.name() });
        }
        Ok(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

/// What a report computes. Column names and granularity are kept as
/// configured and resolved when the report runs, so a bad definition only
/// fails that report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportKind {
    BasicInfo,
    Listing {
        group: String,
        row: String,
    },
    CountsByGroup {
        group: String,
    },
    CountsByPeriod {
        group: String,
        granularity: String,
    },
    CrossTab {
        group: String,
        row: String,
        granularity: String,
    },
}

/// A report kind with its columns and granularity checked against the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    Listing { group: Field, row: Field },
    CountsByGroup { group: Field },
    CountsByPeriod { group: Field, granularity: Granularity },
    CrossTab { group: Field, row: Field, granularity: Granularity },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportSpec {
    pub index: String,
    pub label: String,
    pub source: Source,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(flatten)]
    pub kind: ReportKind,
}

impl ReportSpec {
    pub fn file_name(&self, version: &str, dataset: &str) -> String {
        format!("{}_{}_{}_{}.csv", self.index, self.label, version, dataset)
    }

    pub fn title(&self) -> String {
        format!("{}_{}", self.index, self.label)
    }

    /// `None` for basic info, which reads the whole dataset.
    fn query(&self) -> Result<Option<Query>> {
        let field = |name: &str| self.source.field(name);
        let query = match &self.kind {
            ReportKind::BasicInfo => return Ok(None),
            ReportKind::Listing { group, row } => Query::Listing {
                group: field(group)?,
                row: field(row)?,
            },
            ReportKind::CountsByGroup { group } => Query::CountsByGroup { group: field(group)? },
            ReportKind::CountsByPeriod { group, granularity } => Query::CountsByPeriod {
                group: field(group)?,
                granularity: granularity.parse()?,
            },
            ReportKind::CrossTab { group, row, granularity } => Query::CrossTab {
                group: field(group)?,
                row: field(row)?,
                granularity: granularity.parse()?,
            },
        };
        Ok(Some(query))
    }

    fn filter_on(&self) -> Result<Option<(Field, &str)>> {
        self.filter
            .as_ref()
            .map(|f| Ok((self.source.field(&f.field)?, f.value.as_str())))
            .transpose()
    }
}

/// A finished report: header row plus string cells, ready for CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Records that could not be placed in a period column.
    pub undated: usize,
}

const GEOGRAPHIES: [(&str, &str); 3] = [
    ("continent", "Geo_Region"),
    ("country", "Geo_Country"),
    ("city", "Geo_City"),
];

fn spec(index: &str, label: String, source: Source, kind: ReportKind) -> ReportSpec {
    ReportSpec {
        index: index.to_string(),
        label,
        source,
        filter: None,
        kind,
    }
}

pub static STANDARD_REPORTS: Lazy<Vec<ReportSpec>> = Lazy::new(|| {
    let mut reports = vec![
        // File name and spelling are what the stat server looks up.
        spec("00", "basic_infomaction".into(), Source::Samples, ReportKind::BasicInfo),
        spec(
            "00",
            "gene_variant".into(),
            Source::Variants,
            ReportKind::Listing { group: "Gene".into(), row: "Mutation".into() },
        ),
        ReportSpec {
            filter: Some(Filter { field: "Gene".into(), value: "ORF1ab".into() }),
            ..spec(
                "00",
                "ORF1ab_sub_variant".into(),
                Source::Variants,
                ReportKind::Listing { group: "Protein".into(), row: "Mutation".into() },
            )
        },
    ];

    for (name, field) in GEOGRAPHIES {
        reports.push(spec(
            "01",
            format!("{name}_samples"),
            Source::Samples,
            ReportKind::CountsByGroup { group: field.into() },
        ));
    }

    for (suffix, granularity, offset) in [("month", "YearMonth", 0u8), ("week", "Week", 3u8)] {
        for (base, what) in [(2u8, "samples_collection"), (3, "variants"), (4, "clade")] {
            let index = format!("{:02}", base + offset);
            for (name, field) in GEOGRAPHIES {
                let label = format!("{name}_{what}_{suffix}");
                let (group, granularity) = (field.to_string(), granularity.to_string());
                let (source, kind) = match what {
                    "samples_collection" => (
                        Source::Samples,
                        ReportKind::CountsByPeriod { group, granularity },
                    ),
                    "variants" => (
                        Source::Variants,
                        ReportKind::CrossTab { group, row: "Mutation".into(), granularity },
                    ),
                    _ => (
                        Source::Clades,
                        ReportKind::CrossTab { group, row: "Detail".into(), granularity },
                    ),
                };
                reports.push(spec(&index, label, source, kind));
            }
        }
    }
    reports.sort_by(|a, b| a.index.cmp(&b.index));
    reports
});

/// Parse extra report definitions from a JSON array.
pub fn load_extra_reports(path: &Path) -> Result<Vec<ReportSpec>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn pairs_table(group: Field, row: Field, pairs: Vec<(String, String)>) -> ReportTable {
    ReportTable {
        header: vec![group.column_name().into(), row.column_name().into()],
        rows: pairs.into_iter().map(|(g, r)| vec![g, r]).collect(),
        undated: 0,
    }
}

fn generate<R: Record + Clone>(
    query: Query,
    filter: Option<(Field, &str)>,
    records: &[R],
) -> Result<ReportTable> {
    let filtered;
    let records = match filter {
        Some((field, value)) => {
            filtered = filter_records(records, field, value);
            filtered.as_slice()
        }
        None => records,
    };

    match query {
        Query::Listing { group, row } => {
            Ok(pairs_table(group, row, distinct_pairs(records, group, row)))
        }
        Query::CountsByGroup { group } => Ok(ReportTable {
            header: vec![group.column_name().into(), "count".into()],
            rows: count_by_group(records, group)
                .into_iter()
                .map(|(g, n)| vec![g, n.to_string()])
                .collect(),
            undated: 0,
        }),
        Query::CountsByPeriod { group, granularity } => {
            let counts = count_by_period(records, group, granularity)?;
            Ok(ReportTable {
                header: counts.header(),
                rows: counts.records().collect(),
                undated: counts.undated,
            })
        }
        Query::CrossTab { group, row, granularity } => {
            let table = cross_tab(records, group, row, granularity)?;
            Ok(ReportTable {
                header: table.header(),
                rows: table.records().collect(),
                undated: table.undated,
            })
        }
    }
}

/// Timestamp in the form Python's `str(datetime)` gives: the fraction is
/// only printed when there are microseconds.
fn analyzed_date(at: NaiveDateTime) -> String {
    let format = if at.nanosecond() / 1_000 == 0 {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%Y-%m-%d %H:%M:%S%.6f"
    };
    at.format(format).to_string()
}

/// Release-level facts: run time, latest collection date, sample count and
/// number of distinct mutations.
pub fn generate_basic_info(data: &Dataset, analyzed_at: NaiveDateTime) -> ReportTable {
    let latest = data
        .samples
        .iter()
        .map(|s| s.raw_date.as_str())
        .max()
        .unwrap_or_default()
        .to_string();
    let mutations: HashSet<&str> = data
        .variants
        .iter()
        .map(|v| v.field(Field::Mutation))
        .collect();

    let row = |k: &str, v: String| vec![k.to_string(), v];
    ReportTable {
        header: vec!["0".into(), "1".into()],
        rows: vec![
            row("Analyzed Date", analyzed_date(analyzed_at)),
            row("Latest Collention Date", latest),
            row("Total Sample Number", data.samples.len().to_string()),
            row("Total Variant Number", mutations.len().to_string()),
        ],
        undated: 0,
    }
}

/// Compute one report against the joined dataset.
pub fn generate_report(
    spec: &ReportSpec,
    data: &Dataset,
    analyzed_at: NaiveDateTime,
) -> Result<ReportTable> {
    let Some(query) = spec.query()? else {
        return Ok(generate_basic_info(data, analyzed_at));
    };
    let filter = spec.filter_on()?;
    match spec.source {
        Source::Samples => generate(query, filter, &data.samples),
        Source::Variants => generate(query, filter, &data.variants),
        Source::Clades => generate(query, filter, &data.clades),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_from_readers;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const SAMPLES: &str = "sample\tCollection_Date\tGeo_Region\tGeo_Country\tGeo_City\n\
s1\t2021-01-05\tEU\tFrance\tParis\n\
s2\t2021-02-10\tEU\tFrance\tLyon\n\
s3\t2021-02-20\tNA\tUSA\t\n";
    const VARIANTS: &str = "Sample\tMutation\tGene\tProtein\n\
s1\tA1\tORF1ab\tnsp3\n\
s2\tA1\tORF1ab\tnsp3\n\
s3\tB2\tS\tS\n";
    const CLADES: &str = "Sample\tType\tDetail\n\
s1\tclade\tGR\n\
s3\tclade\tGH\n";

    fn dataset() -> Dataset {
        load_from_readers(SAMPLES.as_bytes(), VARIANTS.as_bytes(), CLADES.as_bytes())
            .unwrap()
            .0
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn find(label: &str) -> &'static ReportSpec {
        STANDARD_REPORTS.iter().find(|r| r.label == label).unwrap()
    }

    #[test]
    fn standard_battery_has_thirty_reports_in_index_order() {
        assert_eq!(STANDARD_REPORTS.len(), 30);
        let indices: Vec<&str> = STANDARD_REPORTS.iter().map(|r| r.index.as_str()).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted);
        let titles: HashSet<String> = STANDARD_REPORTS.iter().map(|r| r.title()).collect();
        assert_eq!(titles.len(), 30);
    }

    #[test]
    fn file_names_embed_index_label_version_dataset() {
        let r = find("continent_variants_month");
        assert_eq!(r.file_name("r18", "Full"), "03_continent_variants_month_r18_Full.csv");
        assert_eq!(find("city_clade_week").index, "07");
    }

    #[test]
    fn variants_by_continent_by_month() {
        let table = generate_report(find("continent_variants_month"), &dataset(), at()).unwrap();
        assert_eq!(table.header, vec!["Geo_Region", "Mutation", "2021/01", "2021/02"]);
        assert_eq!(
            table.rows,
            vec![vec!["EU", "A1", "1", "1"], vec!["NA", "B2", "0", "1"]]
        );
    }

    #[test]
    fn samples_by_city_include_unknown() {
        let table = generate_report(find("city_samples"), &dataset(), at()).unwrap();
        assert_eq!(table.header, vec!["Geo_City", "count"]);
        assert_eq!(
            table.rows,
            vec![vec!["Lyon", "1"], vec!["Paris", "1"], vec!["unknown", "1"]]
        );
    }

    #[test]
    fn samples_by_country_by_week() {
        let table = generate_report(find("country_samples_collection_week"), &dataset(), at()).unwrap();
        assert_eq!(
            table.header,
            vec!["Geo_Country", "2021/01/10", "2021/01/17", "2021/01/24", "2021/01/31", "2021/02/07", "2021/02/14", "2021/02/21"]
        );
        assert_eq!(table.rows[0], vec!["France", "1", "0", "0", "0", "0", "1", "0"]);
        assert_eq!(table.rows[1], vec!["USA", "0", "0", "0", "0", "0", "0", "1"]);
    }

    #[test]
    fn orf1ab_listing_is_filtered() {
        let table = generate_report(find("ORF1ab_sub_variant"), &dataset(), at()).unwrap();
        assert_eq!(table.header, vec!["Protein", "Mutation"]);
        assert_eq!(table.rows, vec![vec!["nsp3", "A1"]]);
    }

    #[test]
    fn basic_info_rows() {
        let table = generate_report(find("basic_infomaction"), &dataset(), at()).unwrap();
        assert_eq!(table.header, vec!["0", "1"]);
        assert_eq!(table.rows[0], vec!["Analyzed Date", "2021-03-01 09:30:00"]);
        assert_eq!(table.rows[1], vec!["Latest Collention Date", "2021-02-20"]);
        assert_eq!(table.rows[2], vec!["Total Sample Number", "3"]);
        assert_eq!(table.rows[3], vec!["Total Variant Number", "2"]);
    }

    #[test]
    fn analyzed_date_prints_microseconds_only_when_set() {
        let with_micros = at().with_nanosecond(250_000_000).unwrap();
        assert_eq!(analyzed_date(with_micros), "2021-03-01 09:30:00.250000");
        assert_eq!(analyzed_date(at()), "2021-03-01 09:30:00");
    }

    #[test]
    fn unknown_field_name_fails_the_report() {
        let mut spec = find("continent_samples").clone();
        spec.kind = ReportKind::CountsByGroup { group: "Geo_Planet".into() };
        let err = generate_report(&spec, &dataset(), at()).unwrap_err();
        assert!(matches!(err, StatError::UnknownField(ref f) if f == "Geo_Planet"));
    }

    #[test]
    fn field_missing_from_source_fails_the_report() {
        let mut spec = find("continent_samples").clone();
        spec.kind = ReportKind::CountsByGroup { group: "Mutation".into() };
        let err = generate_report(&spec, &dataset(), at()).unwrap_err();
        assert!(matches!(
            err,
            StatError::FieldNotInSource { field: Field::Mutation, table: "samples" }
        ));
        assert_eq!(err.to_string(), "samples rows have no Mutation column");

        let mut spec = find("continent_clade_month").clone();
        spec.filter = Some(Filter { field: "Gene".into(), value: "S".into() });
        let err = generate_report(&spec, &dataset(), at()).unwrap_err();
        assert!(matches!(err, StatError::FieldNotInSource { field: Field::Gene, table: "clades" }));
    }

    #[test]
    fn calls_carry_sample_columns() {
        assert!(Source::Variants.carries(Field::Country));
        assert!(Source::Clades.carries(Field::SampleId));
        assert!(!Source::Variants.carries(Field::CladeDetail));
        assert_eq!(Source::Clades.field("clade").unwrap(), Field::CladeDetail);
    }

    #[test]
    fn bad_granularity_fails_only_that_report() {
        let mut spec = find("continent_clade_month").clone();
        spec.kind = ReportKind::CrossTab {
            group: "Geo_Region".into(),
            row: "Detail".into(),
            granularity: "quarter".into(),
        };
        let err = generate_report(&spec, &dataset(), at()).unwrap_err();
        assert!(matches!(err, StatError::UnsupportedGranularity(_)));
    }

    #[test]
    fn extra_reports_parse_from_json() {
        let json = r#"[
            {"index": "08", "label": "gene_variants_day", "source": "variants",
             "kind": "cross_tab", "group": "Gene", "row": "Mutation", "granularity": "day"},
            {"index": "09", "label": "s_mutations", "source": "variants",
             "kind": "listing", "group": "Gene", "row": "Mutation",
             "filter": {"field": "Gene", "value": "S"}}
        ]"#;
        let specs: Vec<ReportSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].filter.as_ref().unwrap().field, "Gene");

        let table = generate_report(&specs[1], &dataset(), at()).unwrap();
        assert_eq!(table.rows, vec![vec!["S", "B2"]]);
    }
}
