//! Record loaders: read columnar files into point-geometry datasets.

pub mod csv;
pub mod parquet;

use polars::prelude::PolarsError;

use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::preview::Preview;

pub use csv::CsvLoader;
pub use parquet::ParquetLoader;

/// Interface of every record loader.
pub trait Loader {
    /// Reads the configured file and produces a point-geometry dataset
    /// tagged with the configured coordinate reference system.
    fn load(&self) -> Result<GeoFrame>;

    /// Ascii or json summary of the loader configuration.
    fn preview(&self, format: &str) -> Result<Preview>;
}

/// A column requested from the reader but absent from the file is a
/// configuration problem, not a dataframe failure.
pub(crate) fn missing_column_as_validation(err: PolarsError) -> UrbanError {
    match err {
        PolarsError::ColumnNotFound(name) => {
            UrbanError::validation(format!("column not found in the loaded file: {name}"))
        }
        other => other.into(),
    }
}

/// Display form of an optional column subset for previews.
pub(crate) fn columns_label(columns: Option<&[String]>) -> String {
    match columns {
        Some(cols) => cols.join(", "),
        None => "all columns".to_string(),
    }
}

/// Json form of an optional column subset for previews.
pub(crate) fn columns_json(columns: Option<&[String]>) -> serde_json::Value {
    match columns {
        Some(cols) => serde_json::Value::from(cols.to_vec()),
        None => serde_json::Value::from("all columns"),
    }
}
