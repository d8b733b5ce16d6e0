use crate::error::{Result, StatError};
use crate::types::{Event, Field, Geography, RawClade, RawSample, RawVariant, Sample};
use crate::util::{or_unknown, parse_collection_date, period_keys};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locations of the three input tables for one `(version, dataset)` pair.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub samples: PathBuf,
    pub variants: PathBuf,
    pub clades: PathBuf,
}

impl InputPaths {
    /// `<data_dir>/<version>/<dataset>/{samples,variant,clade}_<version>_<dataset>.tsv`
    pub fn new(data_dir: &Path, version: &str, dataset: &str) -> Self {
        let dir = data_dir.join(version).join(dataset);
        let file = |stem: &str| dir.join(format!("{stem}_{version}_{dataset}.tsv"));
        Self {
            samples: file("samples"),
            variants: file("variant"),
            clades: file("clade"),
        }
    }

    /// Fails on the first table that is missing, before anything is read.
    pub fn check_exist(&self) -> Result<()> {
        for p in [&self.samples, &self.variants, &self.clades] {
            if !p.is_file() {
                return Err(StatError::MissingInput(p.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub samples: usize,
    pub duplicate_samples: usize,
    pub variants: usize,
    pub unmatched_variants: usize,
    pub clades: usize,
    pub unmatched_clades: usize,
}

/// Normalized samples plus both event tables joined onto them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub samples: Vec<Sample>,
    pub variants: Vec<Event>,
    pub clades: Vec<Event>,
}

fn read_rows<T: DeserializeOwned, R: Read>(rdr: R) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(rdr);
    let mut rows = Vec::new();
    for result in rdr.deserialize::<T>() {
        rows.push(result?);
    }
    Ok(rows)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StatError::MissingInput(path.to_path_buf()),
        _ => StatError::Io(e),
    })
}

/// Fill missing geography with `unknown` and derive period keys.
///
/// A blank date or one that cannot be parsed aborts the whole load.
pub fn normalize_samples(raw: Vec<RawSample>) -> Result<Vec<Sample>> {
    raw.into_iter()
        .map(|row| {
            let raw_date = row.collection_date.unwrap_or_default().trim().to_string();
            let date = parse_collection_date(&raw_date).ok_or_else(|| StatError::MalformedDate {
                sample: row.sample.clone(),
                raw: raw_date.clone(),
            })?;
            Ok(Sample {
                id: row.sample.trim().to_string(),
                raw_date,
                geo: Geography {
                    region: or_unknown(row.region),
                    country: or_unknown(row.country),
                    city: or_unknown(row.city),
                },
                periods: period_keys(date),
            })
        })
        .collect()
}

/// Left join: every call is kept, and one whose sample is not in `index`
/// inherits `unknown` geography and no period keys.
fn join(
    sample_id: String,
    attributes: BTreeMap<Field, String>,
    index: &HashMap<&str, &Sample>,
) -> (Event, bool) {
    let sample_id = sample_id.trim().to_string();
    match index.get(sample_id.as_str()) {
        Some(s) => (
            Event {
                sample_id,
                attributes,
                geo: s.geo.clone(),
                periods: Some(s.periods.clone()),
            },
            true,
        ),
        None => (
            Event {
                sample_id,
                attributes,
                geo: Geography::unknown(),
                periods: None,
            },
            false,
        ),
    }
}

fn sample_index<'a>(samples: &'a [Sample], report: &mut LoadReport) -> HashMap<&'a str, &'a Sample> {
    let mut index = HashMap::with_capacity(samples.len());
    for s in samples {
        if index.contains_key(s.id.as_str()) {
            report.duplicate_samples += 1;
            continue;
        }
        index.insert(s.id.as_str(), s);
    }
    index
}

pub fn join_variants(
    raw: Vec<RawVariant>,
    index: &HashMap<&str, &Sample>,
) -> (Vec<Event>, usize) {
    let mut unmatched = 0usize;
    let events = raw
        .into_iter()
        .map(|v| {
            let attributes = BTreeMap::from([
                (Field::Mutation, or_unknown(v.mutation)),
                (Field::Gene, or_unknown(v.gene)),
                (Field::Protein, or_unknown(v.protein)),
            ]);
            let (ev, matched) = join(v.sample, attributes, index);
            if !matched {
                unmatched += 1;
            }
            ev
        })
        .collect();
    (events, unmatched)
}

pub fn join_clades(raw: Vec<RawClade>, index: &HashMap<&str, &Sample>) -> (Vec<Event>, usize) {
    let mut unmatched = 0usize;
    let events = raw
        .into_iter()
        .map(|c| {
            let attributes = BTreeMap::from([
                (Field::CladeType, or_unknown(c.clade_type)),
                (Field::CladeDetail, or_unknown(c.detail)),
            ]);
            let (ev, matched) = join(c.sample, attributes, index);
            if !matched {
                unmatched += 1;
            }
            ev
        })
        .collect();
    (events, unmatched)
}

/// Read, normalize and join the three tables from any readers.
pub fn load_from_readers<S: Read, V: Read, C: Read>(
    samples: S,
    variants: V,
    clades: C,
) -> Result<(Dataset, LoadReport)> {
    let samples = normalize_samples(read_rows::<RawSample, _>(samples)?)?;
    let raw_variants = read_rows::<RawVariant, _>(variants)?;
    let raw_clades = read_rows::<RawClade, _>(clades)?;

    let mut report = LoadReport {
        samples: samples.len(),
        variants: raw_variants.len(),
        clades: raw_clades.len(),
        ..Default::default()
    };
    let index = sample_index(&samples, &mut report);
    let (variants, unmatched_variants) = join_variants(raw_variants, &index);
    let (clades, unmatched_clades) = join_clades(raw_clades, &index);
    report.unmatched_variants = unmatched_variants;
    report.unmatched_clades = unmatched_clades;

    if report.duplicate_samples > 0 {
        warn!(
            duplicates = report.duplicate_samples,
            "duplicate sample ids; calls join to the first occurrence"
        );
    }
    debug!(?report, "tables joined");
    Ok((
        Dataset {
            samples,
            variants,
            clades,
        },
        report,
    ))
}

pub fn load_dataset(paths: &InputPaths) -> Result<(Dataset, LoadReport)> {
    paths.check_exist()?;
    load_from_readers(
        open(&paths.samples)?,
        open(&paths.variants)?,
        open(&paths.clades)?,
    )
}
