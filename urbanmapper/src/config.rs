/// Default coordinate reference system attached to every spatial dataset
/// unless the caller configures another one.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Default engine label reported by loaders in previews.
pub const DEFAULT_ENGINE: &str = "polars";
