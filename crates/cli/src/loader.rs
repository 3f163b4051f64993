//! Transaction CSV loading.
//!
//! Expects `CustomerID,Date,Product` headers (any column order, extra columns
//! ignored). A single malformed row rejects the whole file.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use freshcart_core::Transaction;
use thiserror::Error;

pub const CUSTOMER_COLUMN: &str = "CustomerID";
pub const DATE_COLUMN: &str = "Date";
pub const PRODUCT_COLUMN: &str = "Product";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open transactions file `{path}`: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("could not read CSV headers: {0}")]
    Headers(csv::Error),
    #[error("transactions file is missing the `{0}` column")]
    MissingColumn(&'static str),
    #[error("line {line}: could not read row: {source}")]
    Record { line: u64, source: csv::Error },
    #[error("line {line}: missing value for `{column}`")]
    MissingField { line: u64, column: &'static str },
    #[error("line {line}: invalid date `{value}` (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },
}

struct Columns {
    customer: usize,
    date: usize,
    product: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or(LoadError::MissingColumn(name))
        };
        Ok(Self {
            customer: find(CUSTOMER_COLUMN)?,
            date: find(DATE_COLUMN)?,
            product: find(PRODUCT_COLUMN)?,
        })
    }
}

pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open { path: path.to_path_buf(), source })?;
    read_transactions(reader)
}

pub fn parse_transactions<R: io::Read>(input: R) -> Result<Vec<Transaction>, LoadError> {
    read_transactions(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input))
}

fn read_transactions<R: io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<Transaction>, LoadError> {
    let headers = reader.headers().map_err(LoadError::Headers)?.clone();
    let columns = Columns::locate(&headers)?;

    let mut transactions = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        let line = reader.position().line();
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(source) => return Err(LoadError::Record { line, source }),
        }
        let line = record.position().map_or(line, csv::Position::line);

        let field = |index: usize, column: &'static str| {
            record
                .get(index)
                .filter(|value| !value.is_empty())
                .ok_or(LoadError::MissingField { line, column })
        };
        let customer = field(columns.customer, CUSTOMER_COLUMN)?;
        let raw_date = field(columns.date, DATE_COLUMN)?;
        let product = field(columns.product, PRODUCT_COLUMN)?;

        let date = parse_date(raw_date)
            .ok_or_else(|| LoadError::InvalidDate { line, value: raw_date.to_string() })?;
        transactions.push(Transaction::new(customer, date, product));
    }

    Ok(transactions)
}

/// `YYYY-MM-DD`, or an ISO datetime whose calendar date is kept
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|datetime| datetime.date())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value).ok().map(|datetime| datetime.date_naive())
        })
}
