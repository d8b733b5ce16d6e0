use crate::error::StatError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category substituted for every missing value.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Deserialize)]
pub struct RawSample {
    #[serde(rename = "sample", alias = "Sample")]
    pub sample: String,
    #[serde(rename = "Collection_Date")]
    pub collection_date: Option<String>,
    #[serde(rename = "Geo_Region")]
    pub region: Option<String>,
    #[serde(rename = "Geo_Country")]
    pub country: Option<String>,
    #[serde(rename = "Geo_City")]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawVariant {
    #[serde(rename = "Sample", alias = "sample")]
    pub sample: String,
    #[serde(rename = "Mutation")]
    pub mutation: Option<String>,
    #[serde(rename = "Gene")]
    pub gene: Option<String>,
    #[serde(rename = "Protein")]
    pub protein: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawClade {
    #[serde(rename = "Sample", alias = "sample")]
    pub sample: String,
    #[serde(rename = "Type")]
    pub clade_type: Option<String>,
    #[serde(rename = "Detail")]
    pub detail: Option<String>,
}

/// A column that reports can group, count or filter on.
///
/// The string form is the input column name, which is also the header
/// written for that column in every output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    SampleId,
    Region,
    Country,
    City,
    Mutation,
    Gene,
    Protein,
    CladeType,
    CladeDetail,
}

impl Field {
    pub fn column_name(self) -> &'static str {
        match self {
            Field::SampleId => "Sample",
            Field::Region => "Geo_Region",
            Field::Country => "Geo_Country",
            Field::City => "Geo_City",
            Field::Mutation => "Mutation",
            Field::Gene => "Gene",
            Field::Protein => "Protein",
            Field::CladeType => "Type",
            Field::CladeDetail => "Detail",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim() {
            "Sample" | "sample" => Field::SampleId,
            "Geo_Region" | "region" | "continent" => Field::Region,
            "Geo_Country" | "country" => Field::Country,
            "Geo_City" | "city" => Field::City,
            "Mutation" | "mutation" => Field::Mutation,
            "Gene" | "gene" => Field::Gene,
            "Protein" | "protein" => Field::Protein,
            "Type" | "type" => Field::CladeType,
            "Detail" | "detail" | "clade" => Field::CladeDetail,
            other => return Err(StatError::UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// Time bucket used for period keys and axis columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Month,
    Day,
    Week,
}

impl Granularity {
    pub fn label(self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Day => "day",
            Granularity::Week => "week",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" | "yearmonth" => Ok(Granularity::Month),
            "day" | "yearmonthday" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            _ => Err(StatError::UnsupportedGranularity(s.to_string())),
        }
    }
}

/// Period keys derived once from a collection date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKeys {
    pub date: NaiveDate,
    pub month: String,
    pub day: String,
    pub week: String,
}

impl PeriodKeys {
    pub fn key(&self, granularity: Granularity) -> &str {
        match granularity {
            Granularity::Month => &self.month,
            Granularity::Day => &self.day,
            Granularity::Week => &self.week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geography {
    pub region: String,
    pub country: String,
    pub city: String,
}

impl Geography {
    pub fn unknown() -> Self {
        Self {
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
        }
    }

    fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Region => Some(&self.region),
            Field::Country => Some(&self.country),
            Field::City => Some(&self.city),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub id: String,
    /// Collection date exactly as it appeared in the input.
    pub raw_date: String,
    pub geo: Geography,
    pub periods: PeriodKeys,
}

/// A mutation or clade call joined onto its sample.
///
/// `periods` is `None` when the call names a sample that is not in the
/// sample table; the inherited geography is then all `unknown`.
#[derive(Debug, Clone)]
pub struct Event {
    pub sample_id: String,
    pub attributes: BTreeMap<Field, String>,
    pub geo: Geography,
    pub periods: Option<PeriodKeys>,
}

/// Read access shared by samples and joined events, so one tabulation
/// routine serves every report.
pub trait Record {
    /// Value of `field`, or `unknown` when the record does not carry it.
    fn field(&self, field: Field) -> &str;
    fn periods(&self) -> Option<&PeriodKeys>;
}

impl Record for Sample {
    fn field(&self, field: Field) -> &str {
        if field == Field::SampleId {
            return &self.id;
        }
        self.geo.get(field).unwrap_or(UNKNOWN)
    }

    fn periods(&self) -> Option<&PeriodKeys> {
        Some(&self.periods)
    }
}

impl Record for Event {
    fn field(&self, field: Field) -> &str {
        if field == Field::SampleId {
            return &self.sample_id;
        }
        if let Some(v) = self.geo.get(field) {
            return v;
        }
        self.attributes
            .get(&field)
            .map(String::as_str)
            .unwrap_or(UNKNOWN)
    }

    fn periods(&self) -> Option<&PeriodKeys> {
        self.periods.as_ref()
    }
}
