//! WHO reference tables of Box-Cox (L, M, S) parameters.
//!
//! Each table is a CSV file with a header naming a `sex` column, one key
//! column (`age` in days, `length` or `height` in cm) and the `l`, `m`, `s`
//! columns. Extra columns (such as `loh`) are ignored.
//!
//! Lookups are exact: a key matches only a row whose key column parses to
//! the same `f64`. There is no interpolation between adjacent rows.

use crate::config::ReferenceConfig;
use crate::lms::Lms;
use crate::{Error, Result, Sex};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loaded reference sets, keyed by the configuration that produced them.
///
/// Entries are only ever added; a loaded set is immutable.
static SHARED_SETS: Lazy<RwLock<HashMap<ReferenceConfig, Arc<ReferenceSet>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// One of the WHO reference tables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dataset {
    WeightForAge,
    LengthOrHeightForAge,
    WeightForLength,
    WeightForHeight,
    BodyMassIndexForAge,
    HeadCircumferenceForAge,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::WeightForAge,
        Dataset::LengthOrHeightForAge,
        Dataset::WeightForLength,
        Dataset::WeightForHeight,
        Dataset::BodyMassIndexForAge,
        Dataset::HeadCircumferenceForAge,
    ];

    /// File name used by the WHO anthro distribution
    pub fn default_file_name(self) -> &'static str {
        match self {
            Dataset::WeightForAge => "weianthro.csv",
            Dataset::LengthOrHeightForAge => "lenanthro.csv",
            Dataset::WeightForLength => "wflanthro.csv",
            Dataset::WeightForHeight => "wfhanthro.csv",
            Dataset::BodyMassIndexForAge => "bmianthro.csv",
            Dataset::HeadCircumferenceForAge => "hcanthro.csv",
        }
    }

    /// Name of the column holding the lookup key
    pub fn key_column(self) -> &'static str {
        match self {
            Dataset::WeightForLength => "length",
            Dataset::WeightForHeight => "height",
            _ => "age",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ReferenceRow {
    sex: Sex,
    key: f64,
    lms: Lms,
}

/// A fully loaded reference table
#[derive(Clone, Debug)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
    /// (sex code, key bits) -> index of the first row with that key
    index: HashMap<(u8, u64), usize>,
}

/// Positions of the needed columns within a header
struct Columns {
    sex: usize,
    key: usize,
    l: usize,
    m: usize,
    s: usize,
}

impl Columns {
    fn from_headers(
        dataset: Dataset,
        headers: &csv::StringRecord,
        origin: &Path,
    ) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::dataset(origin, format!("missing column {:?}", name)))
        };

        Ok(Columns {
            sex: find("sex")?,
            key: find(dataset.key_column())?,
            l: find("l")?,
            m: find("m")?,
            s: find("s")?,
        })
    }
}

/// Bit pattern used as the exact-match key; `0.0` and `-0.0` compare equal
fn key_bits(key: f64) -> u64 {
    if key == 0.0 {
        0.0f64.to_bits()
    } else {
        key.to_bits()
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    column: usize,
    line: u64,
    origin: &Path,
) -> Result<T> {
    let raw = record.get(column).unwrap_or("").trim();
    raw.parse::<T>().map_err(|_| {
        Error::dataset(
            origin,
            format!("line {}: invalid value {:?} in column {}", line, raw, column + 1),
        )
    })
}

impl ReferenceTable {
    /// Read a complete table; `origin` is only used in error messages.
    pub fn from_reader<R: Read>(dataset: Dataset, reader: R, origin: &Path) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns = Columns::from_headers(dataset, csv_reader.headers()?, origin)?;

        let mut rows = Vec::new();
        let mut index = HashMap::new();

        for record in csv_reader.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let code: u8 = parse_field(&record, columns.sex, line, origin)?;
            let sex = Sex::from_code(code).ok_or_else(|| {
                Error::dataset(origin, format!("line {}: unknown sex code {}", line, code))
            })?;

            let row = ReferenceRow {
                sex,
                key: parse_field(&record, columns.key, line, origin)?,
                lms: Lms {
                    l: parse_field(&record, columns.l, line, origin)?,
                    m: parse_field(&record, columns.m, line, origin)?,
                    s: parse_field(&record, columns.s, line, origin)?,
                },
            };

            if row.key.is_finite() {
                index
                    .entry((row.sex.code(), key_bits(row.key)))
                    .or_insert(rows.len());
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(Error::dataset(origin, "table has no rows"));
        }

        Ok(Self { rows, index })
    }

    /// Load a table from a CSV file
    pub fn load(dataset: Dataset, path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::dataset(path, format!("cannot open: {}", e)))?;
        let table = Self::from_reader(dataset, std::io::BufReader::new(file), path)?;

        tracing::info!(
            "Loaded {} reference rows for {:?} from {:?}",
            table.len(),
            dataset,
            path
        );
        Ok(table)
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Parameters of the first row matching `sex` and exactly `key`
    pub fn lookup(&self, sex: Sex, key: f64) -> Option<Lms> {
        if !key.is_finite() {
            return None;
        }
        self.index
            .get(&(sex.code(), key_bits(key)))
            .map(|&i| self.rows[i].lms)
    }
}

/// The six tables needed to compute every indicator
#[derive(Clone, Debug)]
pub struct ReferenceSet {
    weight_for_age: ReferenceTable,
    length_or_height_for_age: ReferenceTable,
    weight_for_length: ReferenceTable,
    weight_for_height: ReferenceTable,
    body_mass_index_for_age: ReferenceTable,
    head_circumference_for_age: ReferenceTable,
}

impl ReferenceSet {
    /// Load every table named by `config`. Any missing or corrupt table fails the load.
    pub fn load(config: &ReferenceConfig) -> Result<Self> {
        let load = |dataset| ReferenceTable::load(dataset, &config.path_for(dataset));

        Ok(Self {
            weight_for_age: load(Dataset::WeightForAge)?,
            length_or_height_for_age: load(Dataset::LengthOrHeightForAge)?,
            weight_for_length: load(Dataset::WeightForLength)?,
            weight_for_height: load(Dataset::WeightForHeight)?,
            body_mass_index_for_age: load(Dataset::BodyMassIndexForAge)?,
            head_circumference_for_age: load(Dataset::HeadCircumferenceForAge)?,
        })
    }

    /// Load the tables from `dir` using the WHO file names
    pub fn load_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::load(&ReferenceConfig::with_data_dir(dir))
    }

    /// Process-wide shared set for `config`, loading it on first use.
    ///
    /// Concurrent first calls may both load; the first one stored wins.
    pub fn shared(config: &ReferenceConfig) -> Result<Arc<Self>> {
        {
            let sets = SHARED_SETS
                .read()
                .map_err(|_| Error::Other("reference cache lock poisoned".into()))?;
            if let Some(set) = sets.get(config) {
                return Ok(Arc::clone(set));
            }
        }

        let loaded = Arc::new(Self::load(config)?);

        let mut sets = SHARED_SETS
            .write()
            .map_err(|_| Error::Other("reference cache lock poisoned".into()))?;
        Ok(Arc::clone(sets.entry(config.clone()).or_insert(loaded)))
    }

    pub fn table(&self, dataset: Dataset) -> &ReferenceTable {
        match dataset {
            Dataset::WeightForAge => &self.weight_for_age,
            Dataset::LengthOrHeightForAge => &self.length_or_height_for_age,
            Dataset::WeightForLength => &self.weight_for_length,
            Dataset::WeightForHeight => &self.weight_for_height,
            Dataset::BodyMassIndexForAge => &self.body_mass_index_for_age,
            Dataset::HeadCircumferenceForAge => &self.head_circumference_for_age,
        }
    }

    pub fn lookup(&self, dataset: Dataset, sex: Sex, key: f64) -> Option<Lms> {
        self.table(dataset).lookup(sex, key)
    }
}

/// Small tables with hand-checkable parameters, written to a directory.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::Dataset;
    use std::path::Path;

    pub const WEIGHT_FOR_AGE: &str = "sex,age,l,m,s
1,0,0.3487,3.3464,0.14602
2,0,0.3809,3.2322,0.14171
2,734,-0.2024,10.9,0.10
2,735,-0.2024,11.0,0.10
2,1856,-0.2024,18.0,0.12
";

    pub const LENGTH_FOR_AGE: &str = "sex,age,l,m,s,loh
2,0,1,49.1477,0.0379,L
2,734,1,85.7,0.0359,H
2,735,1,85.8,0.0359,H
1,1856,1,110.0,0.04,H
";

    pub const WEIGHT_FOR_LENGTH: &str = "sex,length,l,m,s,lorh
2,50,1,10,0.1,L
2,74,1,10,0.1,L
2,74.1,-0.3833,9.0,0.08,L
";

    pub const WEIGHT_FOR_HEIGHT: &str = "sex,height,l,m,s,lorh
2,73.3,1,10,0.1,H
1,110,1,10,0.1,H
";

    pub const BMI_FOR_AGE: &str = "sex,age,l,m,s
2,734,1,15.5,0.08
2,735,1,15.6,0.08
";

    pub const HEAD_CIRCUMFERENCE_FOR_AGE: &str = "sex,age,l,m,s
2,734,1,46.0,0.03
2,0,1,33.9,0.035
";

    pub fn contents(dataset: Dataset) -> &'static str {
        match dataset {
            Dataset::WeightForAge => WEIGHT_FOR_AGE,
            Dataset::LengthOrHeightForAge => LENGTH_FOR_AGE,
            Dataset::WeightForLength => WEIGHT_FOR_LENGTH,
            Dataset::WeightForHeight => WEIGHT_FOR_HEIGHT,
            Dataset::BodyMassIndexForAge => BMI_FOR_AGE,
            Dataset::HeadCircumferenceForAge => HEAD_CIRCUMFERENCE_FOR_AGE,
        }
    }

    pub fn write_all(dir: &Path) {
        for dataset in Dataset::ALL {
            std::fs::write(dir.join(dataset.default_file_name()), contents(dataset)).unwrap();
        }
    }
}
