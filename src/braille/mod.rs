mod canvas;

pub use canvas::{BrailleCanvas, Ink};
