pub mod collect;
pub mod config;
pub mod error;
pub mod frame;
pub mod geo_core;
pub mod layer;
pub mod loader;
pub mod preview;
pub mod render;

pub use error::{Result, UrbanError};
pub use frame::GeoFrame;
pub use geo_core::BoundingBox;
pub use layer::features::{FeatureCollection, LayerFeature};
pub use layer::{Kwargs, MappingSpec, UrbanLayer};
pub use preview::Preview;
