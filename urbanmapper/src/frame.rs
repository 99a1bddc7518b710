use geo::Point;
use polars::prelude::*;

use crate::error::{Result, UrbanError};

/// Point-geometry annotated dataset: a polars `DataFrame` with one optional
/// point geometry per row and a coordinate reference system tag.
///
/// Rows whose coordinates could not be coerced to numbers carry `None`
/// geometry; they stay in the dataset rather than failing the load.
#[derive(Debug, Clone)]
pub struct GeoFrame {
    data: DataFrame,
    geometry: Vec<Option<Point<f64>>>,
    crs: String,
}

impl GeoFrame {
    pub fn new(
        data: DataFrame,
        geometry: Vec<Option<Point<f64>>>,
        crs: impl Into<String>,
    ) -> Result<Self> {
        if geometry.len() != data.height() {
            return Err(UrbanError::validation(format!(
                "geometry length ({}) does not match dataframe height ({})",
                geometry.len(),
                data.height()
            )));
        }
        Ok(GeoFrame {
            data,
            geometry,
            crs: crs.into(),
        })
    }

    /// Builds a `GeoFrame` from a dataframe with named coordinate columns.
    ///
    /// Both columns are cast to `Float64` non-strictly, so values that cannot
    /// be parsed become nulls and the corresponding rows get `None` geometry.
    pub fn from_coordinates(
        mut data: DataFrame,
        longitude_column: &str,
        latitude_column: &str,
        crs: impl Into<String>,
    ) -> Result<Self> {
        for name in [latitude_column, longitude_column] {
            if !data.get_column_names_str().iter().any(|c| *c == name) {
                return Err(UrbanError::validation(format!(
                    "column '{name}' not found in the loaded data"
                )));
            }
        }

        for name in [latitude_column, longitude_column] {
            let coerced = data
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            data.with_column(coerced)?;
        }

        let lon = data
            .column(longitude_column)?
            .as_materialized_series()
            .f64()?
            .clone();
        let lat = data
            .column(latitude_column)?
            .as_materialized_series()
            .f64()?
            .clone();

        let geometry = lon
            .iter()
            .zip(lat.iter())
            .map(|pair| match pair {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                    Some(Point::new(x, y))
                }
                _ => None,
            })
            .collect();

        GeoFrame::new(data, geometry, crs)
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn geometry(&self) -> &[Option<Point<f64>>] {
        &self.geometry
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Copies the named column from `other` into this frame, replacing it if
    /// already present.
    pub(crate) fn adopt_column(&mut self, other: &GeoFrame, name: &str) -> Result<()> {
        let series = other
            .data
            .column(name)?
            .as_materialized_series()
            .clone();
        self.data.with_column(series)?;
        Ok(())
    }

    /// Returns a new frame with `series` appended (or replaced) as a column.
    pub(crate) fn with_series(&self, series: Series) -> Result<Self> {
        let mut data = self.data.clone();
        data.with_column(series)?;
        GeoFrame::new(data, self.geometry.clone(), self.crs.clone())
    }
}
