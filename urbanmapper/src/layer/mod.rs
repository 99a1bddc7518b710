//! Urban layers and the nearest-element mapping orchestrator.
//!
//! A layer owns a [`FeatureCollection`], a list of pending
//! [`MappingSpec`] entries and a single-use `has_mapped` guard. Concrete
//! layer kinds (streets, regions, points) provide the per-kind nearest
//! join; the orchestration contract lives in [`UrbanLayer::map_nearest_layer`].

pub mod features;
pub mod nearest;
pub mod points;
pub mod regions;
pub mod streets;

use std::collections::BTreeMap;

use geo::Geometry;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CRS;
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::geo_core::BoundingBox;
use crate::preview::{Preview, PreviewFormat};
use crate::render;

use features::{FeatureCollection, LayerFeature};

/// Free-form implementation-specific parameters, keyed by name.
pub type Kwargs = BTreeMap<String, serde_json::Value>;

/// One pending mapping configuration: which dataset columns hold the
/// coordinates, where to write the nearest-feature id, plus any
/// implementation-specific parameters.
///
/// Insertion order on the layer is significant: it decides join processing
/// order and which mapping counts as last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingSpec {
    pub longitude_column: Option<String>,
    pub latitude_column: Option<String>,
    pub output_column: Option<String>,
    #[serde(default)]
    pub kwargs: Kwargs,
}

impl MappingSpec {
    pub fn new(
        longitude_column: impl Into<String>,
        latitude_column: impl Into<String>,
        output_column: impl Into<String>,
    ) -> Self {
        MappingSpec {
            longitude_column: Some(longitude_column.into()),
            latitude_column: Some(latitude_column.into()),
            output_column: Some(output_column.into()),
            kwargs: Kwargs::new(),
        }
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// All three column names, or a validation error naming the gap.
    fn columns(&self) -> Result<(&str, &str, &str)> {
        match (
            self.longitude_column.as_deref(),
            self.latitude_column.as_deref(),
            self.output_column.as_deref(),
        ) {
            (Some(lon), Some(lat), Some(out)) => Ok((lon, lat, out)),
            _ => Err(UrbanError::validation(
                "each mapping must specify longitude_column, latitude_column and output_column",
            )),
        }
    }
}

/// Options handed to a per-kind nearest join after kwarg merging.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// Maximum distance (in CRS units) for a row to be mapped; rows with no
    /// feature within it keep a null output value.
    pub threshold_distance: Option<f64>,
    /// Remaining implementation-specific parameters.
    pub extra: Kwargs,
}

impl JoinOptions {
    /// Merges per-mapping kwargs with call-level parameters. A call-level
    /// `threshold_distance` overrides a per-mapping one; call-level extra
    /// kwargs merge on top of both.
    fn merge(mapping_kwargs: &Kwargs, threshold_distance: Option<f64>, extra: &Kwargs) -> Result<Self> {
        let mut merged = mapping_kwargs.clone();
        if let Some(threshold) = threshold_distance {
            merged.insert("threshold_distance".to_string(), threshold.into());
        }
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }

        let threshold = match merged.remove("threshold_distance") {
            None => None,
            Some(value) => Some(value.as_f64().ok_or_else(|| {
                UrbanError::validation("threshold_distance must be a number")
            })?),
        };

        Ok(JoinOptions {
            threshold_distance: threshold,
            extra: merged,
        })
    }
}

/// State shared by every concrete urban layer kind.
#[derive(Debug, Clone)]
pub struct LayerBase {
    pub layer: Option<FeatureCollection>,
    pub mappings: Vec<MappingSpec>,
    pub coordinate_reference_system: String,
    pub has_mapped: bool,
}

impl Default for LayerBase {
    fn default() -> Self {
        LayerBase {
            layer: None,
            mappings: Vec::new(),
            coordinate_reference_system: DEFAULT_CRS.to_string(),
            has_mapped: false,
        }
    }
}

/// Interface implemented by every urban layer kind.
///
/// `from_place`, `from_file` and `map_nearest_impl` are per-kind; the
/// orchestration, accessors and preview are shared.
pub trait UrbanLayer {
    fn base(&self) -> &LayerBase;

    fn base_mut(&mut self) -> &mut LayerBase;

    /// Short name of the layer kind, e.g. `"street_network"`.
    fn kind(&self) -> &'static str;

    /// Populates the layer from a place name via the configured place source.
    fn from_place(&mut self, place_name: &str, kwargs: &Kwargs) -> Result<()>;

    /// Populates the layer from a local spatial file.
    fn from_file(&mut self, file_path: &std::path::Path) -> Result<()>;

    /// Per-kind nearest join: writes the id of the nearest layer feature for
    /// every row of `data` into `output_column` (null when the row has no
    /// usable coordinates or no feature within `threshold_distance`), and
    /// returns the layer back, with ids renumbered `0..n` only when
    /// `reset_layer_index` is set.
    fn map_nearest_impl(
        &self,
        layer: &FeatureCollection,
        data: &GeoFrame,
        longitude_column: &str,
        latitude_column: &str,
        output_column: &str,
        options: &JoinOptions,
        reset_layer_index: bool,
    ) -> Result<(FeatureCollection, GeoFrame)>;

    /// Appends a mapping configuration; processed in insertion order by
    /// [`UrbanLayer::map_nearest_layer`].
    fn add_mapping(&mut self, spec: MappingSpec) {
        self.base_mut().mappings.push(spec);
    }

    /// Maps point records to their nearest elements in this layer.
    ///
    /// With any of the three column names given, all three must be given and
    /// exactly one join runs with them (override mode). With none given, the
    /// pending mapping specs run in insertion order over a copy of `data`
    /// (batch mode); only the last join may reset the layer index.
    ///
    /// Each instance may be mapped exactly once; remapping requires a fresh
    /// instance. The caller's `data` is never mutated.
    fn map_nearest_layer(
        &mut self,
        data: &GeoFrame,
        longitude_column: Option<&str>,
        latitude_column: Option<&str>,
        output_column: Option<&str>,
        threshold_distance: Option<f64>,
        extra: &Kwargs,
    ) -> Result<(FeatureCollection, GeoFrame)> {
        if self.base().layer.is_none() {
            return Err(UrbanError::state(
                "urban layer not built; call from_place() or from_file() first",
            ));
        }
        if self.base().has_mapped {
            return Err(UrbanError::state(
                "this layer has already been mapped; create a new instance to map again",
            ));
        }

        let any_override = longitude_column.is_some()
            || latitude_column.is_some()
            || output_column.is_some();
        if any_override {
            let (Some(lon), Some(lat), Some(out)) =
                (longitude_column, latitude_column, output_column)
            else {
                return Err(UrbanError::validation(
                    "when overriding mappings, longitude_column, latitude_column and \
                     output_column must all be specified",
                ));
            };

            let options = JoinOptions::merge(&Kwargs::new(), threshold_distance, extra)?;
            let (updated, joined) = {
                let layer = self.layer_ref()?;
                self.map_nearest_impl(layer, data, lon, lat, out, &options, true)?
            };
            let result_layer = updated.clone();
            let base = self.base_mut();
            base.layer = Some(updated);
            base.has_mapped = true;
            return Ok((result_layer, joined));
        }

        if self.base().mappings.is_empty() {
            return Err(UrbanError::validation(
                "no mappings defined; add a mapping during layer creation",
            ));
        }

        // Validate every spec before running any join, so a bad spec cannot
        // leave partially applied columns behind.
        let specs = self.base().mappings.clone();
        for spec in &specs {
            spec.columns()?;
        }

        let mut annotated = data.clone();
        let last = specs.len() - 1;
        for (i, spec) in specs.iter().enumerate() {
            let (lon, lat, out) = spec.columns()?;
            let options = JoinOptions::merge(&spec.kwargs, threshold_distance, extra)?;
            let reset_layer_index = i == last;
            if reset_layer_index {
                debug!("last mapping '{out}', resetting urban layer index");
            }

            let (updated, joined) = {
                let layer = self.layer_ref()?;
                self.map_nearest_impl(layer, &annotated, lon, lat, out, &options, reset_layer_index)?
            };
            self.base_mut().layer = Some(updated);
            annotated.adopt_column(&joined, out)?;
        }

        self.base_mut().has_mapped = true;
        let result_layer = self.layer_ref()?.clone();
        Ok((result_layer, annotated))
    }

    /// Returns the geometric collection; state error if the layer has not
    /// been built.
    fn get_layer(&self) -> Result<&FeatureCollection> {
        self.layer_ref()
    }

    /// `(min_x, min_y, max_x, max_y)` over all features; state error if the
    /// layer has not been built.
    fn get_layer_bounding_box(&self) -> Result<BoundingBox> {
        let layer = self.layer_ref()?;
        layer.bounding_box().ok_or_else(|| {
            UrbanError::Geometry("layer has no features with an extent".to_string())
        })
    }

    /// SVG rendering of the layer geometry; state error if the layer has not
    /// been built.
    fn static_render(&self) -> Result<String> {
        let layer = self.layer_ref()?;
        Ok(render::layer_svg(layer, 600, 600))
    }

    /// Ascii or json summary of the layer configuration state.
    fn preview(&self, format: &str) -> Result<Preview> {
        let format = PreviewFormat::parse(format)?;
        let base = self.base();
        let feature_count = base.layer.as_ref().map(|l| l.len());

        match format {
            PreviewFormat::Ascii => {
                let features = feature_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "not built".to_string());
                Ok(Preview::Ascii(format!(
                    "Urban layer: {}\n  CRS: {}\n  Features: {}\n  Mappings: {}\n  Mapped: {}",
                    self.kind(),
                    base.coordinate_reference_system,
                    features,
                    base.mappings.len(),
                    base.has_mapped,
                )))
            }
            PreviewFormat::Json => Ok(Preview::Json(serde_json::json!({
                "urban_layer": self.kind(),
                "coordinate_reference_system": base.coordinate_reference_system,
                "features": feature_count,
                "mappings": base.mappings.len(),
                "has_mapped": base.has_mapped,
            }))),
        }
    }

    #[doc(hidden)]
    fn layer_ref(&self) -> Result<&FeatureCollection> {
        self.base().layer.as_ref().ok_or_else(|| {
            UrbanError::state("urban layer not built; call from_place() or from_file() first")
        })
    }
}

/// Checks that every feature geometry satisfies the layer kind's predicate.
pub(crate) fn ensure_geometry_kind(
    features: &[LayerFeature],
    accept: fn(&Geometry<f64>) -> bool,
    kind: &str,
    expected: &str,
) -> Result<()> {
    for feature in features {
        if !accept(&feature.geometry) {
            return Err(UrbanError::validation(format!(
                "{kind} layer expects {expected} geometries; feature {} has a different type",
                feature.id
            )));
        }
    }
    Ok(())
}
