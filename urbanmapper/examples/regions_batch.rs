// Batch mode: two pending mappings processed in insertion order
use anyhow::Result;
use geo::{polygon, Geometry};
use polars::df;
use urbanmapper::layer::regions::RegionLayer;
use urbanmapper::{FeatureCollection, GeoFrame, Kwargs, MappingSpec, UrbanLayer};

fn main() -> Result<()> {
    let mut regions = RegionLayer::new();
    regions.base_mut().layer = Some(FeatureCollection::from_geometries(
        vec![
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0),
            ]),
            Geometry::Polygon(polygon![
                (x: 20.0, y: 0.0),
                (x: 30.0, y: 0.0),
                (x: 30.0, y: 10.0),
                (x: 20.0, y: 10.0),
                (x: 20.0, y: 0.0),
            ]),
        ],
        "EPSG:4326",
    ));

    // One spec per trip end; both columns land on the same output frame
    regions.add_mapping(MappingSpec::new("pickup_lng", "pickup_lat", "pickup_region"));
    regions.add_mapping(MappingSpec::new("dropoff_lng", "dropoff_lat", "dropoff_region"));

    let df = df![
        "pickup_lng" => [5.0, 25.0],
        "pickup_lat" => [5.0, 5.0],
        "dropoff_lng" => [25.0, 5.0],
        "dropoff_lat" => [5.0, 5.0],
    ]?;
    let trips = GeoFrame::from_coordinates(df, "pickup_lng", "pickup_lat", "EPSG:4326")?;

    let (_, mapped) = regions.map_nearest_layer(&trips, None, None, None, None, &Kwargs::new())?;
    println!("{}", mapped.data());
    Ok(())
}
