use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::config::{DEFAULT_CRS, DEFAULT_ENGINE};
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::loader::{columns_json, columns_label, missing_column_as_validation, Loader};
use crate::preview::{Preview, PreviewFormat};

/// Loader for Parquet files with latitude/longitude columns.
///
/// Both coordinate columns are mandatory for this loader; values that cannot
/// be parsed as numbers yield rows with missing geometry rather than a load
/// failure.
#[derive(Debug, Clone)]
pub struct ParquetLoader {
    file_path: PathBuf,
    latitude_column: Option<String>,
    longitude_column: Option<String>,
    coordinate_reference_system: String,
    engine: String,
    columns: Option<Vec<String>>,
}

impl ParquetLoader {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        ParquetLoader {
            file_path: file_path.as_ref().to_path_buf(),
            latitude_column: None,
            longitude_column: None,
            coordinate_reference_system: DEFAULT_CRS.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            columns: None,
        }
    }

    pub fn with_latitude_column(mut self, name: impl Into<String>) -> Self {
        self.latitude_column = Some(name.into());
        self
    }

    pub fn with_longitude_column(mut self, name: impl Into<String>) -> Self {
        self.longitude_column = Some(name.into());
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.coordinate_reference_system = crs.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Restricts the read to the given columns; all columns when unset.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    fn coordinate_columns(&self) -> Result<(&str, &str)> {
        match (self.latitude_column.as_deref(), self.longitude_column.as_deref()) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(UrbanError::validation(
                "latitude_column and longitude_column must both be set before loading",
            )),
        }
    }
}

impl Loader for ParquetLoader {
    fn load(&self) -> Result<GeoFrame> {
        let (lat, lon) = self.coordinate_columns()?;

        let file = File::open(&self.file_path)?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(missing_column_as_validation)?;

        let df = match &self.columns {
            Some(columns) => df
                .select(columns.iter().map(|c| c.as_str()))
                .map_err(missing_column_as_validation)?,
            None => df,
        };

        GeoFrame::from_coordinates(df, lon, lat, &self.coordinate_reference_system)
    }

    fn preview(&self, format: &str) -> Result<Preview> {
        match PreviewFormat::parse(format)? {
            PreviewFormat::Ascii => Ok(Preview::Ascii(format!(
                "Loader: ParquetLoader\n  File: {}\n  Latitude Column: {}\n  Longitude Column: {}\n  Engine: {}\n  Columns: {}\n  CRS: {}",
                self.file_path.display(),
                self.latitude_column.as_deref().unwrap_or("<unset>"),
                self.longitude_column.as_deref().unwrap_or("<unset>"),
                self.engine,
                columns_label(self.columns.as_deref()),
                self.coordinate_reference_system,
            ))),
            PreviewFormat::Json => Ok(Preview::Json(serde_json::json!({
                "loader": "ParquetLoader",
                "file": self.file_path.display().to_string(),
                "latitude_column": self.latitude_column,
                "longitude_column": self.longitude_column,
                "engine": self.engine,
                "columns": columns_json(self.columns.as_deref()),
                "coordinate_reference_system": self.coordinate_reference_system,
            }))),
        }
    }
}
