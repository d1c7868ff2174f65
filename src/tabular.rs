//! CSV tables and key-based outer joins

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("key column '{0}' not found")]
    MissingKey(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;

/// Headers plus rows of optional cells; an empty cell is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                    .collect(),
            );
        }
        Ok(Self { headers, rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_writer(File::create(path)?)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn key_column(&self, key: &str) -> Result<usize> {
        self.column(key)
            .ok_or_else(|| TableError::MissingKey(key.to_string()))
    }
}

fn cell(row: &[Option<String>], i: usize) -> Option<String> {
    row.get(i).cloned().flatten()
}

/// Sorts numerically when every key is a number, as text otherwise.
fn sort_keys(keys: &mut [String]) {
    let numeric = keys.iter().all(|k| k.trim().parse::<f64>().is_ok());
    if numeric {
        keys.sort_by(|a, b| {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(a), Ok(b)) => a.total_cmp(&b),
                _ => std::cmp::Ordering::Equal,
            }
        });
    } else {
        keys.sort();
    }
}

/// Full outer join of `left` and `right` on `key`.
///
/// Output columns are the left columns, key included, followed by the right
/// columns without the key. Names present on both sides get `_x` and `_y`
/// suffixes. Rows sharing a key are paired as a cartesian product, rows are
/// ordered by key, and rows with an empty key come last without matching
/// anything.
pub fn outer_join(left: &Table, right: &Table, key: &str) -> Result<Table> {
    let lk = left.key_column(key)?;
    let rk = right.key_column(key)?;

    let right_cols: Vec<usize> = (0..right.headers.len()).filter(|&i| i != rk).collect();

    let mut headers = Vec::with_capacity(left.headers.len() + right_cols.len());
    for (i, name) in left.headers.iter().enumerate() {
        let clash = i != lk && right_cols.iter().any(|&j| &right.headers[j] == name);
        headers.push(if clash { format!("{}_x", name) } else { name.clone() });
    }
    for &j in &right_cols {
        let name = &right.headers[j];
        let clash = left
            .headers
            .iter()
            .enumerate()
            .any(|(i, h)| i != lk && h == name);
        headers.push(if clash { format!("{}_y", name) } else { name.clone() });
    }

    let mut groups: HashMap<String, (Vec<usize>, Vec<usize>)> = HashMap::new();
    let mut keys = Vec::new();
    let mut left_null = Vec::new();
    let mut right_null = Vec::new();

    for (r, row) in left.rows.iter().enumerate() {
        match cell(row, lk) {
            Some(k) => {
                let entry = groups.entry(k.clone()).or_insert_with(|| {
                    keys.push(k);
                    (Vec::new(), Vec::new())
                });
                entry.0.push(r);
            }
            None => left_null.push(r),
        }
    }
    for (r, row) in right.rows.iter().enumerate() {
        match cell(row, rk) {
            Some(k) => {
                let entry = groups.entry(k.clone()).or_insert_with(|| {
                    keys.push(k);
                    (Vec::new(), Vec::new())
                });
                entry.1.push(r);
            }
            None => right_null.push(r),
        }
    }
    sort_keys(&mut keys);

    let left_part = |r: Option<usize>, k: &Option<String>| -> Vec<Option<String>> {
        (0..left.headers.len())
            .map(|i| {
                if i == lk {
                    k.clone()
                } else {
                    r.and_then(|r| cell(&left.rows[r], i))
                }
            })
            .collect()
    };
    let right_part = |r: Option<usize>| -> Vec<Option<String>> {
        right_cols
            .iter()
            .map(|&j| r.and_then(|r| cell(&right.rows[r], j)))
            .collect()
    };
    let joined = |l: Option<usize>, r: Option<usize>, k: &Option<String>| {
        let mut row = left_part(l, k);
        row.extend(right_part(r));
        row
    };

    let mut rows = Vec::new();
    for k in &keys {
        let Some((ls, rs)) = groups.get(k) else {
            continue;
        };
        let k = Some(k.clone());
        match (ls.is_empty(), rs.is_empty()) {
            (false, true) => rows.extend(ls.iter().map(|&l| joined(Some(l), None, &k))),
            (true, false) => rows.extend(rs.iter().map(|&r| joined(None, Some(r), &k))),
            _ => {
                for &l in ls {
                    rows.extend(rs.iter().map(|&r| joined(Some(l), Some(r), &k)));
                }
            }
        }
    }
    rows.extend(left_null.iter().map(|&l| joined(Some(l), None, &None)));
    rows.extend(right_null.iter().map(|&r| joined(None, Some(r), &None)));

    Ok(Table { headers, rows })
}

/// Reads both files, joins them on `key` and writes the result to `output`.
pub fn merge_files<P, Q, R>(left: P, right: Q, key: &str, output: R) -> Result<Table>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let left = Table::from_path(left)?;
    let right = Table::from_path(right)?;
    let merged = outer_join(&left, &right, key)?;
    merged.to_path(output.as_ref())?;

    info!(
        "merged {} and {} rows into {} rows at {}",
        left.rows().len(),
        right.rows().len(),
        merged.rows().len(),
        output.as_ref().display()
    );
    Ok(merged)
}
