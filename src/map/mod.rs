mod atlas;
mod geometry;
mod projection;
mod renderer;
mod viewport;

pub use atlas::{Atlas, CountryShape};
pub use projection::{GeoPath, PathData, Projection};
pub use renderer::{MapLayers, MapRenderer, ScreenMapping};
pub use viewport::{ViewportController, ZoomTransform, BASE_STROKE_WIDTH};
