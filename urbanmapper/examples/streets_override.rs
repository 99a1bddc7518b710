// Map taxi pickups to their nearest street with an override-mode call
use anyhow::Result;
use geo::{line_string, Geometry};
use polars::df;
use urbanmapper::layer::streets::StreetNetworkLayer;
use urbanmapper::{FeatureCollection, GeoFrame, Kwargs, UrbanLayer};

fn main() -> Result<()> {
    // Two streets: one along y=0, one along y=5
    let mut streets = StreetNetworkLayer::new();
    streets.base_mut().layer = Some(FeatureCollection::from_geometries(
        vec![
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
            Geometry::LineString(line_string![(x: 0.0, y: 5.0), (x: 10.0, y: 5.0)]),
        ],
        "EPSG:4326",
    ));

    // Pickup records with raw coordinate columns
    let df = df![
        "pickup_lng" => [2.0, 6.0, 9.0],
        "pickup_lat" => [0.4, 4.8, 2.6],
        "fare" => [12.5, 8.0, 30.1],
    ]?;
    let trips = GeoFrame::from_coordinates(df, "pickup_lng", "pickup_lat", "EPSG:4326")?;

    let (_, mapped) = streets.map_nearest_layer(
        &trips,
        Some("pickup_lng"),
        Some("pickup_lat"),
        Some("nearest_street"),
        None,
        &Kwargs::new(),
    )?;

    println!("{}", mapped.data());
    println!("\n{}", streets.preview("ascii")?.as_ascii().unwrap());
    Ok(())
}
