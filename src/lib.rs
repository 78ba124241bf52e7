//! Animated cyber attack map rendered with Braille Unicode in the terminal.
//!
//! The crate is split the same way the data flows: topology loading (`data`),
//! projection and viewport math (`map`), a retained scene with tweened
//! attributes (`scene`), cooperative timers (`timer`), the attack simulation
//! (`attack`), and the `panel` that wires them into one lifecycle.

pub mod app;
pub mod attack;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod feed;
pub mod geo;
pub mod hash;
pub mod logging;
pub mod map;
pub mod panel;
pub mod scene;
pub mod timer;
pub mod ui;

pub use config::MapConfig;
pub use error::MapError;
pub use panel::MapPanel;
