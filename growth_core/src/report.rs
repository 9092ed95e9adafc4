//! Batch computation of visit statistics from CSV.
//!
//! Input rows carry one visit each:
//! `sex,birth_date,visit_date,weight,length,head_circumference,measured,has_oedema`.
//! Dates are `YYYY-MM-DD` and may be empty; `head_circumference` and
//! `has_oedema` may be empty. Rows that cannot be parsed are logged and
//! skipped. Output rows use the wire attribute names of [`StatisticsRecord`].

use crate::indicators::calculate_scores_at;
use crate::measurement::require_finite;
use crate::reference::ReferenceSet;
use crate::{
    Error, MeasurementInput, MeasurementPosition, Result, Sex, StatisticsRecord, VisitStatistics,
};
use chrono::{NaiveDate, Utc};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row of the visits CSV
#[derive(Debug, serde::Deserialize)]
struct VisitRow {
    sex: String,
    birth_date: Option<String>,
    visit_date: Option<String>,
    weight: f64,
    length: f64,
    head_circumference: Option<f64>,
    measured: String,
    has_oedema: Option<String>,
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("invalid date {:?}: {}", v, e))),
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(Error::InvalidInput(format!("invalid flag {:?}", other))),
    }
}

impl TryFrom<VisitRow> for MeasurementInput {
    type Error = Error;

    fn try_from(row: VisitRow) -> Result<Self> {
        Ok(MeasurementInput {
            sex: row.sex.parse::<Sex>()?,
            birth_date: parse_date(row.birth_date.as_deref())?,
            visit_date: parse_date(row.visit_date.as_deref())?,
            weight_kg: require_finite(row.weight)?,
            length_or_height_cm: require_finite(row.length)?,
            head_circumference_cm: row.head_circumference.map(require_finite).transpose()?,
            measured: row.measured.parse::<MeasurementPosition>()?,
            has_oedema: parse_flag(row.has_oedema.as_deref())?,
        })
    }
}

/// Outcome of a batch run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub computed: usize,
    pub skipped: usize,
}

/// Parse visits from CSV; malformed rows are logged and counted as skipped.
pub fn read_visits<R: Read>(reader: R) -> Result<(Vec<MeasurementInput>, usize)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut visits = Vec::new();
    let mut skipped = 0;

    for (i, row) in csv_reader.deserialize::<VisitRow>().enumerate() {
        let line = i + 2;
        let parsed = row
            .map_err(Error::from)
            .and_then(MeasurementInput::try_from);

        match parsed {
            Ok(input) => visits.push(input),
            Err(e) => {
                tracing::warn!("Skipping visit on line {}: {}", line, e);
                skipped += 1;
            }
        }
    }

    Ok((visits, skipped))
}

/// Write statistics as CSV with a header row
pub fn write_statistics<W: Write>(writer: W, statistics: &[VisitStatistics]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for stats in statistics {
        let record: StatisticsRecord = stats.to_record();
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Compute statistics for every visit in `input` and write them to `output`.
///
/// The output file is replaced atomically once all rows are written.
pub fn compute_batch(
    input: &Path,
    output: &Path,
    references: &ReferenceSet,
) -> Result<BatchSummary> {
    let file = std::fs::File::open(input)?;
    let (visits, skipped) = read_visits(std::io::BufReader::new(file))?;

    let generated_date = Utc::now();
    let statistics: Vec<VisitStatistics> = visits
        .iter()
        .map(|visit| calculate_scores_at(visit, references, generated_date))
        .collect();

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        write_statistics(&mut writer, &statistics)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| Error::Io(e.error))?;

    tracing::info!(
        "Wrote statistics for {} visits to {:?} ({} skipped)",
        statistics.len(),
        output,
        skipped
    );

    Ok(BatchSummary {
        computed: statistics.len(),
        skipped,
    })
}
