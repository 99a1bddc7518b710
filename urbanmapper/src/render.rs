//! Thin static rendering of layer geometry as an SVG document.

use std::fmt::Write;

use geo::{Geometry, LineString, Polygon};

use crate::layer::features::FeatureCollection;

/// Renders the layer's features into an SVG document of the given pixel
/// size. An empty layer produces an empty document.
pub fn layer_svg(layer: &FeatureCollection, width: u32, height: u32) -> String {
    let header = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let Some(bbox) = layer.bounding_box() else {
        return format!("{header}</svg>");
    };

    // degenerate extents (a single point) get a unit span so the projection
    // stays finite
    let span_x = if bbox.width() > 0.0 { bbox.width() } else { 1.0 };
    let span_y = if bbox.height() > 0.0 { bbox.height() } else { 1.0 };
    let margin = 10.0;
    let scale_x = (f64::from(width) - 2.0 * margin) / span_x;
    let scale_y = (f64::from(height) - 2.0 * margin) / span_y;

    let project = |x: f64, y: f64| -> (f64, f64) {
        // y axis flipped: SVG grows downward
        (
            margin + (x - bbox.min_x) * scale_x,
            f64::from(height) - margin - (y - bbox.min_y) * scale_y,
        )
    };

    let mut svg = header;
    for feature in layer.features() {
        match &feature.geometry {
            Geometry::Point(p) => {
                let (x, y) = project(p.x(), p.y());
                let _ = write!(svg, r##"<circle cx="{x:.2}" cy="{y:.2}" r="2" fill="#1f77b4"/>"##);
            }
            Geometry::MultiPoint(mp) => {
                for p in &mp.0 {
                    let (x, y) = project(p.x(), p.y());
                    let _ =
                        write!(svg, r##"<circle cx="{x:.2}" cy="{y:.2}" r="2" fill="#1f77b4"/>"##);
                }
            }
            Geometry::LineString(line) => write_polyline(&mut svg, line, &project),
            Geometry::MultiLineString(lines) => {
                for line in &lines.0 {
                    write_polyline(&mut svg, line, &project);
                }
            }
            Geometry::Polygon(polygon) => write_polygon(&mut svg, polygon, &project),
            Geometry::MultiPolygon(polygons) => {
                for polygon in &polygons.0 {
                    write_polygon(&mut svg, polygon, &project);
                }
            }
            _ => {}
        }
    }
    svg.push_str("</svg>");
    svg
}

fn write_polyline(
    svg: &mut String,
    line: &LineString<f64>,
    project: &impl Fn(f64, f64) -> (f64, f64),
) {
    let points: Vec<String> = line
        .coords()
        .map(|c| {
            let (x, y) = project(c.x, c.y);
            format!("{x:.2},{y:.2}")
        })
        .collect();
    let _ = write!(
        svg,
        r##"<polyline points="{}" fill="none" stroke="#444" stroke-width="1"/>"##,
        points.join(" ")
    );
}

fn write_polygon(
    svg: &mut String,
    polygon: &Polygon<f64>,
    project: &impl Fn(f64, f64) -> (f64, f64),
) {
    let points: Vec<String> = polygon
        .exterior()
        .coords()
        .map(|c| {
            let (x, y) = project(c.x, c.y);
            format!("{x:.2},{y:.2}")
        })
        .collect();
    let _ = write!(
        svg,
        r##"<polygon points="{}" fill="#dddddd" stroke="#444" stroke-width="1"/>"##,
        points.join(" ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    #[test]
    fn test_empty_layer_renders_empty_document() {
        let layer = FeatureCollection::new(Vec::new(), "EPSG:4326");
        let svg = layer_svg(&layer, 100, 100);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("polyline"));
    }

    #[test]
    fn test_render_lines_and_points() {
        let layer = FeatureCollection::from_geometries(
            vec![
                Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
                Geometry::Point(point!(x: 0.5, y: 0.5)),
            ],
            "EPSG:4326",
        );
        let svg = layer_svg(&layer, 200, 200);
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn test_single_point_layer_stays_finite() {
        let layer = FeatureCollection::from_geometries(
            vec![Geometry::Point(point!(x: 2.0, y: 48.0))],
            "EPSG:4326",
        );
        let svg = layer_svg(&layer, 100, 100);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }
}
