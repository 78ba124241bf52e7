use crate::feed::ThreatFeed;
use crate::panel::MapPanel;
use crate::scene::Millis;
use crate::ui;
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use glam::DVec2;
use ratatui::layout::Rect;

/// Pan distance of one arrow key press, in logical units
const PAN_STEP: f64 = 40.0;

/// Application state
pub struct App {
    pub panel: MapPanel,
    pub feed: Option<ThreatFeed>,
    pub should_quit: bool,
    /// Current mouse position for the cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Map area inside the border, in terminal cells
    map_area: Rect,
}

impl App {
    pub fn new(panel: MapPanel, feed: Option<ThreatFeed>, width: u16, height: u16) -> Self {
        Self {
            panel,
            feed,
            should_quit: false,
            mouse_pos: None,
            map_area: ui::map_inner(Rect::new(0, 0, width, height)),
        }
    }

    /// Update the map area when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner(Rect::new(0, 0, width, height));
    }

    pub fn map_area(&self) -> Rect {
        self.map_area
    }

    /// Advance the simulation and drain the feed
    pub fn update(&mut self, now: Millis) {
        self.panel.update(now);
        if let Some(feed) = &mut self.feed {
            feed.poll();
        }
    }

    /// Logical viewport point under a terminal cell, if it is on the map
    pub fn cell_to_logical(&self, col: u16, row: u16) -> Option<DVec2> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.right() || row >= area.bottom() {
            return None;
        }
        let mapping = self.panel.mapping(area.width, area.height);
        Some(mapping.cell_to_logical(col - area.x, row - area.y))
    }

    fn view_center(&self) -> DVec2 {
        let config = self.panel.config();
        DVec2::new(config.width / 2.0, config.height / 2.0)
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),

            KeyCode::Left => {
                self.panel.pan(PAN_STEP, 0.0);
            }
            KeyCode::Right => {
                self.panel.pan(-PAN_STEP, 0.0);
            }
            KeyCode::Up => {
                self.panel.pan(0.0, PAN_STEP);
            }
            KeyCode::Down => {
                self.panel.pan(0.0, -PAN_STEP);
            }

            KeyCode::Char('+') | KeyCode::Char('=') => {
                let center = self.view_center();
                self.panel.zoom_in_at(center);
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                let center = self.view_center();
                self.panel.zoom_out_at(center);
            }
            KeyCode::Char('r') | KeyCode::Char('0') => {
                self.panel.reset_view();
            }

            KeyCode::Char('l') => {
                self.panel.toggle_labels();
            }
            KeyCode::Char('c') => {
                self.panel.toggle_cities();
            }
            KeyCode::Char('f') => self.panel.toggle_speed(),
            KeyCode::Char('g') => self.panel.toggle_region(),
            KeyCode::Char('a') => {
                self.panel.toggle_ambient();
            }
            _ => {}
        }
    }

    /// Drag to pan, wheel to zoom at the pointer
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        self.mouse_pos = Some((mouse.column, mouse.row));
        let point = self.cell_to_logical(mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::ScrollUp => {
                if let Some(p) = point {
                    self.panel.zoom_in_at(p);
                }
            }
            MouseEventKind::ScrollDown => {
                if let Some(p) = point {
                    self.panel.zoom_out_at(p);
                }
            }
            MouseEventKind::ScrollLeft => {
                self.panel.pan(PAN_STEP / 2.0, 0.0);
            }
            MouseEventKind::ScrollRight => {
                self.panel.pan(-PAN_STEP / 2.0, 0.0);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(p) = point {
                    self.panel.begin_drag(p);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(p) = point {
                    self.panel.drag_to(p);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.panel.end_drag(),
            _ => {}
        }
    }

    /// Cursor cell relative to the map area
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (col, row) = self.mouse_pos?;
        let area = self.map_area;
        (col >= area.x && row >= area.y && col < area.right() && row < area.bottom())
            .then(|| (col - area.x, row - area.y))
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Current zoom against the configured ceiling, e.g. `1.5x/8x`
    pub fn zoom_level(&self) -> String {
        let viewport = self.panel.viewport();
        let (_, max_zoom) = viewport.scale_bounds();
        format!("{:.1}x/{max_zoom}x", viewport.scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MapConfig, Speed};
    use crate::data::testing::three_countries;
    use crate::data::WorldLoader;
    use crate::hash::testing::Scripted;
    use crossterm::event::KeyModifiers;

    fn app() -> App {
        let config = MapConfig {
            show_ambient_pulses: false,
            ..MapConfig::default()
        };
        let panel = MapPanel::with_rng(
            config,
            WorldLoader::ready(three_countries()),
            Box::new(Scripted::new(&[], 0.9)),
        );
        let mut app = App::new(panel, None, 122, 40);
        app.update(0.0);
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_keys_toggle_panel() {
        let mut app = app();
        app.handle_key(KeyCode::Char('l'));
        assert!(app.panel.config().show_labels);
        app.handle_key(KeyCode::Char('f'));
        assert_eq!(app.panel.config().speed, Speed::Fast);
        app.handle_key(KeyCode::Char('g'));
        assert_eq!(app.panel.config().region_filter.len(), 3);
        app.handle_key(KeyCode::Char('a'));
        assert!(app.panel.config().show_ambient_pulses);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_zoom_keys_and_reset() {
        let mut app = app();
        app.handle_key(KeyCode::Char('+'));
        assert_eq!(app.zoom_level(), "1.5x/8x");
        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.zoom_level(), "1.0x/8x");
        for _ in 0..10 {
            app.handle_key(KeyCode::Char('-'));
        }
        assert_eq!(app.zoom_level(), "1.0x/8x");
    }

    #[test]
    fn test_cells_outside_map_are_ignored() {
        let app = app();
        let area = app.map_area();
        assert!(app.cell_to_logical(0, 0).is_none());
        assert!(app.cell_to_logical(area.x, area.y).is_some());
        assert!(app.cell_to_logical(area.right(), area.y).is_none());
    }

    #[test]
    fn test_wheel_zooms_at_pointer() {
        let mut app = app();
        let area = app.map_area();
        let (col, row) = (area.x + area.width / 4, area.y + area.height / 4);
        let before = app.cell_to_logical(col, row).unwrap();
        let content = app.panel.viewport().transform().invert(before);

        app.handle_mouse(mouse(MouseEventKind::ScrollUp, col, row));
        assert_eq!(app.panel.viewport().scale(), 1.5);
        // Content under the pointer did not move
        let after = app.panel.viewport().transform().apply(content);
        assert!(after.distance(before) < 1e-9);
    }

    #[test]
    fn test_drag_pans() {
        let mut app = app();
        let area = app.map_area();
        let (col, row) = (area.x + 10, area.y + 10);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), col + 5, row));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), col + 5, row));
        let t = app.panel.viewport().transform();
        assert!(t.x > 0.0);
        assert_eq!(t.y, 0.0);
        assert!(!app.panel.viewport().is_dragging());
        assert_eq!(app.cursor_cell(), Some((15, 10)));
    }
}
