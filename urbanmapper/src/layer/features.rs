use std::collections::BTreeMap;

use geo::{BoundingRect, Geometry};
use serde::{Deserialize, Serialize};

use crate::geo_core::BoundingBox;

/// One spatial feature of an urban layer: a geometry, an identifier and the
/// attributes carried over from the source file or provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFeature {
    pub id: u64,
    pub geometry: Geometry<f64>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl LayerFeature {
    pub fn new(id: u64, geometry: Geometry<f64>) -> Self {
        LayerFeature {
            id,
            geometry,
            properties: BTreeMap::new(),
        }
    }
}

/// Ordered collection of spatial features with a coordinate reference system.
///
/// Owned exclusively by one urban layer instance; mutated only by load
/// operations and by the mapping orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    features: Vec<LayerFeature>,
    crs: String,
}

impl FeatureCollection {
    pub fn new(features: Vec<LayerFeature>, crs: impl Into<String>) -> Self {
        FeatureCollection {
            features,
            crs: crs.into(),
        }
    }

    /// Builds a collection from bare geometries, assigning sequential ids.
    pub fn from_geometries(geometries: Vec<Geometry<f64>>, crs: impl Into<String>) -> Self {
        let features = geometries
            .into_iter()
            .enumerate()
            .map(|(i, geometry)| LayerFeature::new(i as u64, geometry))
            .collect();
        FeatureCollection::new(features, crs)
    }

    pub fn features(&self) -> &[LayerFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn ids(&self) -> Vec<u64> {
        self.features.iter().map(|f| f.id).collect()
    }

    /// Renumbers feature ids to `0..n` in the current order. Only the last
    /// join of a mapping run is permitted to call this.
    pub fn reset_index(&mut self) {
        for (i, feature) in self.features.iter_mut().enumerate() {
            feature.id = i as u64;
        }
    }

    /// Bounding box over all features, `None` when the collection is empty
    /// or no feature has an extent.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(BoundingBox::from)
            .reduce(|a, b| a.merge(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    #[test]
    fn test_from_geometries_assigns_sequential_ids() {
        let collection = FeatureCollection::from_geometries(
            vec![
                Geometry::Point(point!(x: 0.0, y: 0.0)),
                Geometry::Point(point!(x: 1.0, y: 1.0)),
            ],
            "EPSG:4326",
        );
        assert_eq!(collection.ids(), vec![0, 1]);
    }

    #[test]
    fn test_reset_index() {
        let mut features = vec![
            LayerFeature::new(7, Geometry::Point(point!(x: 0.0, y: 0.0))),
            LayerFeature::new(3, Geometry::Point(point!(x: 1.0, y: 1.0))),
        ];
        features[0].properties.insert("name".into(), "a".into());
        let mut collection = FeatureCollection::new(features, "EPSG:4326");

        collection.reset_index();
        assert_eq!(collection.ids(), vec![0, 1]);
        // attributes survive the renumbering
        assert_eq!(
            collection.features()[0].properties.get("name"),
            Some(&serde_json::Value::from("a"))
        );
    }

    #[test]
    fn test_bounding_box() {
        let collection = FeatureCollection::from_geometries(
            vec![
                Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 1.0)]),
                Geometry::Point(point!(x: -1.0, y: 3.0)),
            ],
            "EPSG:4326",
        );
        let bbox = collection.bounding_box().unwrap();
        assert_eq!(bbox.as_tuple(), (-1.0, 0.0, 2.0, 3.0));
    }

    #[test]
    fn test_bounding_box_empty() {
        let collection = FeatureCollection::new(Vec::new(), "EPSG:4326");
        assert!(collection.bounding_box().is_none());
    }
}
