use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::config::{DEFAULT_CRS, DEFAULT_ENGINE};
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::loader::{columns_json, columns_label, missing_column_as_validation, Loader};
use crate::preview::{Preview, PreviewFormat};

/// Loader for CSV files with latitude/longitude columns. Same contract as
/// [`crate::loader::ParquetLoader`], over delimited text input.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    file_path: PathBuf,
    latitude_column: Option<String>,
    longitude_column: Option<String>,
    coordinate_reference_system: String,
    engine: String,
    columns: Option<Vec<String>>,
    separator: u8,
}

impl CsvLoader {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        CsvLoader {
            file_path: file_path.as_ref().to_path_buf(),
            latitude_column: None,
            longitude_column: None,
            coordinate_reference_system: DEFAULT_CRS.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            columns: None,
            separator: b',',
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

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
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

impl Loader for CsvLoader {
    fn load(&self) -> Result<GeoFrame> {
        let (lat, lon) = self.coordinate_columns()?;

        let file = File::open(&self.file_path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|opts| opts.with_separator(self.separator))
            .into_reader_with_file_handle(file)
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
                "Loader: CsvLoader\n  File: {}\n  Latitude Column: {}\n  Longitude Column: {}\n  Engine: {}\n  Columns: {}\n  CRS: {}",
                self.file_path.display(),
                self.latitude_column.as_deref().unwrap_or("<unset>"),
                self.longitude_column.as_deref().unwrap_or("<unset>"),
                self.engine,
                columns_label(self.columns.as_deref()),
                self.coordinate_reference_system,
            ))),
            PreviewFormat::Json => Ok(Preview::Json(serde_json::json!({
                "loader": "CsvLoader",
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_builds_point_geometry() {
        let file = write_csv("lon,lat,fare\n-74.0,40.7,12.5\n-73.9,40.8,8.0\n");

        let frame = CsvLoader::new(file.path())
            .with_latitude_column("lat")
            .with_longitude_column("lon")
            .load()
            .unwrap();

        assert_eq!(frame.height(), 2);
        let p = frame.geometry()[0].unwrap();
        assert!((p.x() - (-74.0)).abs() < 1e-12);
        assert!((p.y() - 40.7).abs() < 1e-12);
    }

    #[test]
    fn test_load_coerces_bad_values_to_missing_geometry() {
        let file = write_csv("lon,lat\n-74.0,40.7\n-73.9,bad\n-73.8,40.9\n");

        let frame = CsvLoader::new(file.path())
            .with_latitude_column("lat")
            .with_longitude_column("lon")
            .load()
            .unwrap();

        assert_eq!(frame.height(), 3);
        assert!(frame.geometry()[1].is_none());
    }

    #[test]
    fn test_load_missing_column_is_validation_error() {
        let file = write_csv("lon,value\n-74.0,1\n");

        let err = CsvLoader::new(file.path())
            .with_latitude_column("lat")
            .with_longitude_column("lon")
            .load()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_load_with_custom_separator() {
        let file = write_csv("lon;lat\n1.0;2.0\n");

        let frame = CsvLoader::new(file.path())
            .with_latitude_column("lat")
            .with_longitude_column("lon")
            .with_separator(b';')
            .load()
            .unwrap();
        assert_eq!(frame.height(), 1);
    }

    #[test]
    fn test_preview_roundtrip() {
        let loader = CsvLoader::new("trips.csv")
            .with_latitude_column("lat")
            .with_longitude_column("lon");

        let ascii = loader.preview("ascii").unwrap();
        let json = loader.preview("json").unwrap();
        assert!(ascii.as_ascii().unwrap().contains("trips.csv"));
        assert_eq!(json.as_json().unwrap()["file"], "trips.csv");
        assert!(loader.preview("yaml").unwrap_err().is_validation());
    }
}
