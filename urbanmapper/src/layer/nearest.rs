//! Nearest-feature searches backing the per-kind joins.
//!
//! Each index answers "closest feature slot to this coordinate" together
//! with the distance in CRS units; the shared [`annotate_nearest`] routine
//! turns that into an output column on the dataset.

use geo::{EuclideanDistance, Geometry, Point};
use polars::prelude::*;
use rstar::primitives::{GeomWithData, Line as IndexLine, Rectangle};
use rstar::RTree;

use crate::error::{Result, UrbanError};
use crate::frame::GeoFrame;
use crate::layer::features::FeatureCollection;
use crate::layer::JoinOptions;

/// Nearest-feature query over a built spatial index. The returned `usize` is
/// the feature's slot in the collection, not its id.
pub(crate) trait NearestIndex {
    fn nearest(&self, point: [f64; 2]) -> Option<(usize, f64)>;
}

/// Segment index for line layers: every segment of every line geometry is
/// indexed with the slot of its owning feature.
pub(crate) struct SegmentIndex {
    tree: RTree<GeomWithData<IndexLine<[f64; 2]>, usize>>,
}

impl SegmentIndex {
    pub(crate) fn build(layer: &FeatureCollection) -> Result<Self> {
        let mut segments = Vec::new();
        for (slot, feature) in layer.features().iter().enumerate() {
            match &feature.geometry {
                Geometry::LineString(line) => push_segments(&mut segments, line, slot),
                Geometry::MultiLineString(lines) => {
                    for line in &lines.0 {
                        push_segments(&mut segments, line, slot);
                    }
                }
                _ => {
                    return Err(UrbanError::Geometry(format!(
                        "feature {} is not a line geometry",
                        feature.id
                    )))
                }
            }
        }
        Ok(SegmentIndex {
            tree: RTree::bulk_load(segments),
        })
    }
}

fn push_segments(
    segments: &mut Vec<GeomWithData<IndexLine<[f64; 2]>, usize>>,
    line: &geo::LineString<f64>,
    slot: usize,
) {
    for segment in line.lines() {
        segments.push(GeomWithData::new(
            IndexLine::new(
                [segment.start.x, segment.start.y],
                [segment.end.x, segment.end.y],
            ),
            slot,
        ));
    }
}

impl NearestIndex for SegmentIndex {
    fn nearest(&self, point: [f64; 2]) -> Option<(usize, f64)> {
        self.tree
            .nearest_neighbor_iter_with_distance_2(&point)
            .next()
            .map(|(segment, d2)| (segment.data, d2.sqrt()))
    }
}

/// Coordinate index for point layers.
pub(crate) struct PointIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl PointIndex {
    pub(crate) fn build(layer: &FeatureCollection) -> Result<Self> {
        let mut coords = Vec::new();
        for (slot, feature) in layer.features().iter().enumerate() {
            match &feature.geometry {
                Geometry::Point(p) => coords.push(GeomWithData::new([p.x(), p.y()], slot)),
                Geometry::MultiPoint(mp) => {
                    for p in &mp.0 {
                        coords.push(GeomWithData::new([p.x(), p.y()], slot));
                    }
                }
                _ => {
                    return Err(UrbanError::Geometry(format!(
                        "feature {} is not a point geometry",
                        feature.id
                    )))
                }
            }
        }
        Ok(PointIndex {
            tree: RTree::bulk_load(coords),
        })
    }
}

impl NearestIndex for PointIndex {
    fn nearest(&self, point: [f64; 2]) -> Option<(usize, f64)> {
        self.tree
            .nearest_neighbor_iter_with_distance_2(&point)
            .next()
            .map(|(coord, d2)| (coord.data, d2.sqrt()))
    }
}

/// Envelope index for polygon layers: rectangles prune candidates, the true
/// euclidean distance to the polygon decides. A point inside a polygon is at
/// distance zero, so containment always wins.
pub(crate) struct RegionIndex<'a> {
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
    layer: &'a FeatureCollection,
}

impl<'a> RegionIndex<'a> {
    pub(crate) fn build(layer: &'a FeatureCollection) -> Result<Self> {
        use geo::BoundingRect;

        let mut envelopes = Vec::new();
        for (slot, feature) in layer.features().iter().enumerate() {
            let rects: Vec<geo::Rect<f64>> = match &feature.geometry {
                Geometry::Polygon(p) => p.bounding_rect().into_iter().collect(),
                Geometry::MultiPolygon(mp) => {
                    mp.0.iter().filter_map(|p| p.bounding_rect()).collect()
                }
                _ => {
                    return Err(UrbanError::Geometry(format!(
                        "feature {} is not a polygon geometry",
                        feature.id
                    )))
                }
            };
            for rect in rects {
                envelopes.push(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    slot,
                ));
            }
        }
        Ok(RegionIndex {
            tree: RTree::bulk_load(envelopes),
            layer,
        })
    }

    fn distance_to_slot(&self, slot: usize, point: &Point<f64>) -> f64 {
        match &self.layer.features()[slot].geometry {
            Geometry::Polygon(p) => p.euclidean_distance(point),
            Geometry::MultiPolygon(mp) => mp.euclidean_distance(point),
            _ => f64::INFINITY,
        }
    }
}

impl NearestIndex for RegionIndex<'_> {
    fn nearest(&self, point: [f64; 2]) -> Option<(usize, f64)> {
        let query = Point::new(point[0], point[1]);
        let mut best: Option<(usize, f64)> = None;
        for (envelope, envelope_d2) in self.tree.nearest_neighbor_iter_with_distance_2(&point) {
            if let Some((_, best_dist)) = best {
                // envelope distance is a lower bound on the true distance
                if envelope_d2 > best_dist * best_dist {
                    break;
                }
            }
            let dist = self.distance_to_slot(envelope.data, &query);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((envelope.data, dist));
            }
        }
        best
    }
}

/// Shared join body: resolves the nearest feature id per row and writes the
/// output column. Rows without usable coordinates, and rows whose nearest
/// feature is beyond `threshold_distance`, get a null.
pub(crate) fn annotate_nearest(
    layer: &FeatureCollection,
    data: &GeoFrame,
    longitude_column: &str,
    latitude_column: &str,
    output_column: &str,
    options: &JoinOptions,
    index: &dyn NearestIndex,
) -> Result<GeoFrame> {
    let lon = numeric_column(data.data(), longitude_column)?;
    let lat = numeric_column(data.data(), latitude_column)?;
    let threshold = options.threshold_distance;

    let mut ids: Vec<Option<u64>> = Vec::with_capacity(data.height());
    for row in 0..data.height() {
        let id = match (lon.get(row), lat.get(row)) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => index
                .nearest([x, y])
                .filter(|(_, dist)| threshold.map_or(true, |t| *dist <= t))
                .map(|(slot, _)| layer.features()[slot].id),
            _ => None,
        };
        ids.push(id);
    }

    data.with_series(Series::new(output_column.into(), ids))
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df.column(name).map_err(|_| {
        UrbanError::validation(format!("column '{name}' not found in dataset"))
    })?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    fn line_layer() -> FeatureCollection {
        FeatureCollection::from_geometries(
            vec![
                Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
                Geometry::LineString(line_string![(x: 0.0, y: 5.0), (x: 10.0, y: 5.0)]),
            ],
            "EPSG:4326",
        )
    }

    #[test]
    fn test_segment_index_nearest() {
        let layer = line_layer();
        let index = SegmentIndex::build(&layer).unwrap();

        let (slot, dist) = index.nearest([5.0, 1.0]).unwrap();
        assert_eq!(slot, 0);
        assert!((dist - 1.0).abs() < 1e-12);

        let (slot, _) = index.nearest([5.0, 4.0]).unwrap();
        assert_eq!(slot, 1);
    }

    #[test]
    fn test_segment_index_rejects_points() {
        let layer = FeatureCollection::from_geometries(
            vec![Geometry::Point(point!(x: 0.0, y: 0.0))],
            "EPSG:4326",
        );
        assert!(SegmentIndex::build(&layer).is_err());
    }

    #[test]
    fn test_point_index_nearest() {
        let layer = FeatureCollection::from_geometries(
            vec![
                Geometry::Point(point!(x: 0.0, y: 0.0)),
                Geometry::Point(point!(x: 10.0, y: 0.0)),
            ],
            "EPSG:4326",
        );
        let index = PointIndex::build(&layer).unwrap();
        let (slot, dist) = index.nearest([9.0, 0.0]).unwrap();
        assert_eq!(slot, 1);
        assert!((dist - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_region_index_containment_wins() {
        // the query point sits inside the large polygon even though the small
        // polygon's envelope is closer to it
        let large = polygon![
            (x: 0.0, y: 0.0),
            (x: 20.0, y: 0.0),
            (x: 20.0, y: 20.0),
            (x: 0.0, y: 20.0),
            (x: 0.0, y: 0.0),
        ];
        let small = polygon![
            (x: 21.0, y: 9.0),
            (x: 22.0, y: 9.0),
            (x: 22.0, y: 11.0),
            (x: 21.0, y: 11.0),
            (x: 21.0, y: 9.0),
        ];
        let layer = FeatureCollection::from_geometries(
            vec![Geometry::Polygon(large), Geometry::Polygon(small)],
            "EPSG:4326",
        );
        let index = RegionIndex::build(&layer).unwrap();

        let (slot, dist) = index.nearest([19.5, 10.0]).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(dist, 0.0);

        // outside everything: nearest boundary decides
        let (slot, _) = index.nearest([23.0, 10.0]).unwrap();
        assert_eq!(slot, 1);
    }

    #[test]
    fn test_annotate_nearest_threshold_leaves_rows_unmapped() {
        let layer = line_layer();
        let index = SegmentIndex::build(&layer).unwrap();

        let df = polars::df![
            "lon" => [5.0, 5.0],
            "lat" => [0.5, 100.0],
        ]
        .unwrap();
        let data = GeoFrame::from_coordinates(df, "lon", "lat", "EPSG:4326").unwrap();

        let options = JoinOptions {
            threshold_distance: Some(2.0),
            extra: Default::default(),
        };
        let joined = annotate_nearest(&layer, &data, "lon", "lat", "nearest", &options, &index)
            .unwrap();

        assert_eq!(joined.height(), 2);
        let out = joined
            .data()
            .column("nearest")
            .unwrap()
            .as_materialized_series()
            .u64()
            .unwrap()
            .clone();
        assert_eq!(out.get(0), Some(0));
        assert_eq!(out.get(1), None);
    }

    #[test]
    fn test_annotate_nearest_missing_column() {
        let layer = line_layer();
        let index = SegmentIndex::build(&layer).unwrap();
        let df = polars::df!["lon" => [5.0]].unwrap();
        let data = GeoFrame::new(df, vec![None], "EPSG:4326").unwrap();

        let err = annotate_nearest(
            &layer,
            &data,
            "lon",
            "lat",
            "nearest",
            &JoinOptions::default(),
            &index,
        )
        .unwrap_err();
        assert!(err.is_validation());
    }
}
