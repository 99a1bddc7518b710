use std::path::Path;

use geo::Geometry;

use crate::collect::PlaceSource;
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::layer::features::{FeatureCollection, LayerFeature};
use crate::layer::nearest::{annotate_nearest, SegmentIndex};
use crate::layer::{ensure_geometry_kind, JoinOptions, Kwargs, LayerBase, UrbanLayer};

/// Street network layer: line features, one per street segment or way.
/// Points map to the street whose geometry is closest.
pub struct StreetNetworkLayer {
    base: LayerBase,
    place_source: Option<Box<dyn PlaceSource>>,
}

impl StreetNetworkLayer {
    pub fn new() -> Self {
        StreetNetworkLayer {
            base: LayerBase::default(),
            place_source: None,
        }
    }

    /// Configures the collaborator used by `from_place`.
    pub fn with_place_source(mut self, source: Box<dyn PlaceSource>) -> Self {
        self.place_source = Some(source);
        self
    }

    fn accepts(geometry: &Geometry<f64>) -> bool {
        matches!(
            geometry,
            Geometry::LineString(_) | Geometry::MultiLineString(_)
        )
    }

    fn set_layer(&mut self, features: Vec<LayerFeature>) -> Result<()> {
        ensure_geometry_kind(&features, Self::accepts, self.kind(), "line")?;
        let crs = self.base.coordinate_reference_system.clone();
        self.base.layer = Some(FeatureCollection::new(features, crs));
        Ok(())
    }
}

impl Default for StreetNetworkLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrbanLayer for StreetNetworkLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "street_network"
    }

    fn from_place(&mut self, place_name: &str, kwargs: &Kwargs) -> Result<()> {
        let source = self.place_source.as_ref().ok_or_else(|| {
            UrbanError::validation(
                "no place source configured; use with_place_source() or from_file()",
            )
        })?;
        let collection = source.fetch_place(place_name, kwargs)?;
        ensure_geometry_kind(collection.features(), Self::accepts, self.kind(), "line")?;
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
        let index = SegmentIndex::build(layer)?;
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
