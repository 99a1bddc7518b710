use std::path::Path;

use geo::Geometry;

use crate::collect::PlaceSource;
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::layer::features::{FeatureCollection, LayerFeature};
use crate::layer::nearest::{annotate_nearest, RegionIndex};
use crate::layer::{ensure_geometry_kind, JoinOptions, Kwargs, LayerBase, UrbanLayer};

/// Region layer: polygon features such as neighbourhoods, districts or
/// administrative boundaries. A point inside a polygon maps to it; a point
/// outside every polygon maps to the one with the nearest boundary.
pub struct RegionLayer {
    base: LayerBase,
    place_source: Option<Box<dyn PlaceSource>>,
}

impl RegionLayer {
    pub fn new() -> Self {
        RegionLayer {
            base: LayerBase::default(),
            place_source: None,
        }
    }

    pub fn with_place_source(mut self, source: Box<dyn PlaceSource>) -> Self {
        self.place_source = Some(source);
        self
    }

    fn accepts(geometry: &Geometry<f64>) -> bool {
        matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    fn set_layer(&mut self, features: Vec<LayerFeature>) -> Result<()> {
        ensure_geometry_kind(&features, Self::accepts, self.kind(), "polygon")?;
        let crs = self.base.coordinate_reference_system.clone();
        self.base.layer = Some(FeatureCollection::new(features, crs));
        Ok(())
    }
}

impl Default for RegionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrbanLayer for RegionLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "regions"
    }

    fn from_place(&mut self, place_name: &str, kwargs: &Kwargs) -> Result<()> {
        let source = self.place_source.as_ref().ok_or_else(|| {
            UrbanError::validation(
                "no place source configured; use with_place_source() or from_file()",
            )
        })?;
        let collection = source.fetch_place(place_name, kwargs)?;
        ensure_geometry_kind(collection.features(), Self::accepts, self.kind(), "polygon")?;
        self.base.coordinate_reference_system = collection.crs().to_string();
        self.base.layer = Some(collection);
        Ok(())
    }

    fn from_file(&mut self, file_path: &Path) -> Result<()> {
        let features = crate::collect::read_geojson_features(file_path)?;
        self.set_layer(features)
    }

    fn map_nearest_impl(
        &self,
        layer: &FeatureCollection,
        data: &GeoFrame,
        longitude_column: &str,
        latitude_column: &str,
        output_column: &str,
        options: &JoinOptions,
        reset_layer_index: bool,
    ) -> Result<(FeatureCollection, GeoFrame)> {
        let index = RegionIndex::build(layer)?;
        let joined = annotate_nearest(
            layer,
            data,
            longitude_column,
            latitude_column,
            output_column,
            options,
            &index,
        )?;
        let mut updated = layer.clone();
        if reset_layer_index {
            updated.reset_index();
        }
        Ok((updated, joined))
    }
}
