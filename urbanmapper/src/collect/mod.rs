//! Retrieval of layer geometry from external sources: local GeoJSON files
//! and pluggable place-name providers.

use std::collections::BTreeMap;
use std::path::Path;

use geo::Geometry;
use geojson::GeoJson;

use crate::error::{Result, UrbanError};
use crate::layer::features::{FeatureCollection, LayerFeature};
use crate::layer::Kwargs;

/// Collaborator that resolves a place name to layer geometry.
///
/// The actual geocoding or network retrieval lives behind this seam; the
/// library only consumes the resulting features.
pub trait PlaceSource {
    fn fetch_place(&self, place_name: &str, kwargs: &Kwargs) -> Result<FeatureCollection>;
}

/// Reads a GeoJSON `FeatureCollection` from disk into layer features.
///
/// Feature ids are ordinal positions; GeoJSON properties are preserved as
/// feature attributes. An unreadable file is an I/O error, malformed GeoJSON
/// a validation error.
pub fn read_geojson_features(path: &Path) -> Result<Vec<LayerFeature>> {
    let raw = std::fs::read_to_string(path)?;
    let geojson: GeoJson = raw.parse().map_err(|e| {
        UrbanError::validation(format!("invalid GeoJSON in {}: {e}", path.display()))
    })?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(UrbanError::validation(format!(
                "{} does not contain a GeoJSON FeatureCollection",
                path.display()
            )))
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let geometry = feature.geometry.ok_or_else(|| {
            UrbanError::validation(format!("feature {i} has no geometry"))
        })?;
        let geometry: Geometry<f64> = geometry.value.try_into().map_err(|e| {
            UrbanError::validation(format!("feature {i} has an unsupported geometry: {e}"))
        })?;

        let properties: BTreeMap<String, serde_json::Value> = feature
            .properties
            .map(|props| props.into_iter().collect())
            .unwrap_or_default();

        features.push(LayerFeature {
            id: i as u64,
            geometry,
            properties,
        });
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_geojson_features() {
        let file = write_temp(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                        "properties": {"name": "a"}
                    },
                    {
                        "type": "Feature",
                        "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                        "properties": null
                    }
                ]
            }"#,
        );

        let features = read_geojson_features(file.path()).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, 0);
        assert_eq!(
            features[0].properties.get("name"),
            Some(&serde_json::Value::from("a"))
        );
        assert!(matches!(features[1].geometry, Geometry::LineString(_)));
    }

    #[test]
    fn test_read_geojson_rejects_non_collection() {
        let file = write_temp(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#);
        let err = read_geojson_features(file.path()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_read_geojson_missing_file_is_io_error() {
        let err = read_geojson_features(Path::new("/nonexistent/layer.geojson")).unwrap_err();
        assert!(matches!(err, UrbanError::Io(_)));
    }

    #[test]
    fn test_read_geojson_malformed_is_validation_error() {
        let file = write_temp("{not json");
        let err = read_geojson_features(file.path()).unwrap_err();
        assert!(err.is_validation());
    }
}
