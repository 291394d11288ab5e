//! Delimited text tables, one per entity type.
//!
//! The first line holds the column names, each following line one row. A value containing
//! the delimiter, a quote or a line break is wrapped in quotes with inner quotes doubled;
//! nulls render as empty fields. An empty row set is empty text.

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::EntityKind;
use crate::model::{dispatch_kind, dispatch_rows, EntityRecord, EntityRows};
use crate::AppError;

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("{entity}: {source}")]
    Csv {
        entity: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{entity}: header {found:?} does not match expected columns {expected:?}")]
    Header {
        entity: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("{entity}: table is not valid UTF-8")]
    Encoding { entity: &'static str },
}

impl From<TabularError> for AppError {
    fn from(error: TabularError) -> Self {
        match error {
            TabularError::Csv { entity, source } => {
                AppError::new("TABULAR/CSV", format!("Malformed {entity} table"))
                    .with_context("entity", entity)
                    .with_cause(source)
            }
            TabularError::Header {
                entity,
                expected,
                found,
            } => AppError::new("TABULAR/HEADER", format!("Unexpected columns in {entity} table"))
                .with_context("entity", entity)
                .with_context("expected", expected.join(","))
                .with_context("found", found.join(",")),
            TabularError::Encoding { entity } => {
                AppError::new("TABULAR/ENCODING", "Table is not valid UTF-8")
                    .with_context("entity", entity)
            }
        }
    }
}

fn encode_records<T: Serialize>(
    entity: &'static str,
    rows: &[T],
    delimiter: u8,
) -> Result<String, TabularError> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let csv_err = |source: csv::Error| TabularError::Csv { entity, source };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv_err(csv::Error::from(err.into_error())))?;
    String::from_utf8(bytes).map_err(|_| TabularError::Encoding { entity })
}

fn decode_records<T: DeserializeOwned>(
    entity: &'static str,
    columns: &[&str],
    text: &str,
    delimiter: u8,
) -> Result<Vec<T>, TabularError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let csv_err = |source: csv::Error| TabularError::Csv { entity, source };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let found: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    if found.iter().map(String::as_str).ne(columns.iter().copied()) {
        return Err(TabularError::Header {
            entity,
            expected: columns.iter().map(|c| c.to_string()).collect(),
            found,
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}

pub fn encode_rows(rows: &EntityRows, delimiter: u8) -> Result<String, TabularError> {
    let entity = rows.kind().table();
    dispatch_rows!(rows, rows => encode_records(entity, rows, delimiter))
}

pub fn decode_rows(
    kind: EntityKind,
    text: &str,
    delimiter: u8,
) -> Result<EntityRows, TabularError> {
    dispatch_kind!(kind, T => {
        decode_records::<T>(kind.table(), T::COLUMNS, text, delimiter).map(T::into_rows)
    })
}
