use std::path::Path;

use geo::Geometry;

use crate::collect::PlaceSource;
use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::layer::features::{FeatureCollection, LayerFeature};
use crate::layer::nearest::{annotate_nearest, PointIndex};
use crate::layer::{ensure_geometry_kind, JoinOptions, Kwargs, LayerBase, UrbanLayer};

/// Custom point layer: arbitrary point features such as transit stops,
/// amenities or sensor sites.
pub struct PointLayer {
    base: LayerBase,
    place_source: Option<Box<dyn PlaceSource>>,
}

impl PointLayer {
    pub fn new() -> Self {
        PointLayer {
            base: LayerBase::default(),
            place_source: None,
        }
    }

    pub fn with_place_source(mut self, source: Box<dyn PlaceSource>) -> Self {
        self.place_source = Some(source);
        self
    }

    fn accepts(geometry: &Geometry<f64>) -> bool {
        matches!(geometry, Geometry::Point(_) | Geometry::MultiPoint(_))
    }

    fn set_layer(&mut self, features: Vec<LayerFeature>) -> Result<()> {
        ensure_geometry_kind(&features, Self::accepts, self.kind(), "point")?;
        let crs = self.base.coordinate_reference_system.clone();
        self.base.layer = Some(FeatureCollection::new(features, crs));
        Ok(())
    }
}

impl Default for PointLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrbanLayer for PointLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "custom_points"
    }

    fn from_place(&mut self, place_name: &str, kwargs: &Kwargs) -> Result<()> {
        let source = self.place_source.as_ref().ok_or_else(|| {
            UrbanError::validation(
                "no place source configured; use with_place_source() or from_file()",
            )
        })?;
        let collection = source.fetch_place(place_name, kwargs)?;
        ensure_geometry_kind(collection.features(), Self::accepts, self.kind(), "point")?;
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
        let index = PointIndex::build(layer)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    #[test]
    fn test_set_layer_rejects_polygons() {
        use geo::polygon;
        let mut layer = PointLayer::new();
        let features = vec![LayerFeature::new(
            0,
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ]),
        )];
        assert!(layer.set_layer(features).unwrap_err().is_validation());
    }

    #[test]
    fn test_map_nearest_impl_reset_flag() {
        let layer = PointLayer::new();
        let collection = FeatureCollection::new(
            vec![
                LayerFeature::new(5, Geometry::Point(point!(x: 0.0, y: 0.0))),
                LayerFeature::new(9, Geometry::Point(point!(x: 10.0, y: 0.0))),
            ],
            "EPSG:4326",
        );

        let df = polars::df!["lon" => [1.0], "lat" => [0.0]].unwrap();
        let data = GeoFrame::from_coordinates(df, "lon", "lat", "EPSG:4326").unwrap();

        // without reset the ids must come back untouched
        let (updated, joined) = layer
            .map_nearest_impl(
                &collection,
                &data,
                "lon",
                "lat",
                "nearest",
                &JoinOptions::default(),
                false,
            )
            .unwrap();
        assert_eq!(updated.ids(), vec![5, 9]);
        let out = joined
            .data()
            .column("nearest")
            .unwrap()
            .as_materialized_series()
            .u64()
            .unwrap()
            .clone();
        assert_eq!(out.get(0), Some(5));

        // with reset the ids are renumbered 0..n
        let (updated, _) = layer
            .map_nearest_impl(
                &collection,
                &data,
                "lon",
                "lat",
                "nearest",
                &JoinOptions::default(),
                true,
            )
            .unwrap();
        assert_eq!(updated.ids(), vec![0, 1]);
    }
}
