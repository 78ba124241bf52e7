use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::feed::FeedStatus;
use crate::map::MapLayers;
use crate::panel::PanelState;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Height of the stat card row
pub const CARD_ROWS: u16 = 3;

fn split(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(CARD_ROWS), // Stat cards
            Constraint::Min(3),            // Map
            Constraint::Length(1),         // Status bar
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Attack Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Map area inside its border for a terminal of size `area`
pub fn map_inner(area: Rect) -> Rect {
    map_block().inner(split(area)[1])
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let [cards, map, status] = split(frame.area());
    render_cards(frame, app, cards);
    render_map(frame, app, map);
    render_status_bar(frame, app, status);
}

fn card<'a>(title: &'a str, value: String, detail: String, color: Color) -> Paragraph<'a> {
    Paragraph::new(Line::from(vec![
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {detail}"), Style::default().fg(Color::DarkGray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title),
    )
}

fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    let stats = app.panel.stats();
    frame.render_widget(
        card(
            "Attacks",
            stats.launched.to_string(),
            format!("launched, {} dropped", stats.dropped),
            Color::Red,
        ),
        chunks[0],
    );

    let (value, detail, color) = match app.feed.as_ref().map(|f| f.status()) {
        None => ("-".to_string(), "feed off".to_string(), Color::DarkGray),
        Some(FeedStatus::Waiting) => ("…".to_string(), "waiting for backend".to_string(), Color::Yellow),
        Some(FeedStatus::Live(summary)) => (
            summary.total.to_string(),
            match &summary.latest {
                Some(t) => format!("threats, {} high, latest {} ({})", summary.high, t.ip_address, t.country),
                None => format!("threats, {} high", summary.high),
            },
            Color::LightRed,
        ),
        Some(FeedStatus::Unavailable { last, .. }) => (
            last.as_ref().map_or("-".to_string(), |s| s.total.to_string()),
            "backend unavailable".to_string(),
            Color::Yellow,
        ),
    };
    frame.render_widget(card("Threats", value, detail, color), chunks[1]);

    let scene = app.panel.scene();
    frame.render_widget(
        card(
            "Live",
            scene.len().to_string(),
            format!("elements, {} alerts", app.panel.ambient_markers()),
            Color::Cyan,
        ),
        chunks[2],
    );
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layers = app.panel.render(inner.width, inner.height);
    let map_widget = MapWidget {
        layers,
        cursor_pos: app.cursor_cell(),
        loading: app.panel.state() == PanelState::Loading,
    };
    frame.render_widget(map_widget, inner);
}

/// Braille map with coloured overlay and labels on top
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
    loading: bool,
}

impl MapWidget {
    /// Render a canvas; cells without ink use `color`
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        let rows = canvas.height().min(area.height as usize);
        let cols = canvas.width().min(area.width as usize);
        for cy in 0..rows {
            for cx in 0..cols {
                let Some((ch, ink)) = canvas.cell(cx, cy) else {
                    continue;
                };
                let fg = ink.map_or(color, |(r, g, b)| Color::Rgb(r, g, b));
                buf[(area.x + cx as u16, area.y + cy as u16)].set_char(ch).set_fg(fg);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.layers.countries, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.overlay, Color::Cyan, area, buf);

        let label_style = Style::default().fg(Color::Gray);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + lx + i as u16, area.y + ly)].set_char(ch).set_style(label_style);
            }
        }

        if self.loading && area.height > 0 {
            let text = "loading world geometry…";
            let x = area.x + area.width.saturating_sub(text.chars().count() as u16) / 2;
            let y = area.y + area.height / 2;
            for (i, ch) in text.chars().enumerate() {
                let px = x + i as u16;
                if px < area.right() {
                    buf[(px, y)].set_char(ch).set_fg(Color::DarkGray);
                }
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn toggle(on: bool, label_on: &'static str, label_off: &'static str) -> Span<'static> {
    Span::styled(
        if on { label_on } else { label_off },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let config = app.panel.config();
    let state = match app.panel.state() {
        PanelState::Loading => "loading",
        PanelState::Ready => "live",
        PanelState::TornDown => "stopped",
    };
    let region = if config.region_filter.is_empty() {
        "all".to_string()
    } else {
        config.region_filter.iter().cloned().collect::<Vec<_>>().join("+")
    };

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(format!(" {state} "), Style::default().fg(Color::Magenta)),
        toggle(config.show_labels, "[L]abels ", "[l]abels "),
        toggle(config.show_all_cities, "[C]ities ", "[c]ities "),
        toggle(config.show_ambient_pulses, "[A]lerts ", "[a]lerts "),
        Span::styled(format!("[f]{:?} ", config.speed), Style::default().fg(Color::Cyan)),
        Span::styled(format!("[g]{region} "), Style::default().fg(Color::Cyan)),
        Span::styled(
            "| drag/arrows:pan wheel/+/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_inner_leaves_room_for_cards_and_status() {
        let inner = map_inner(Rect::new(0, 0, 100, 30));
        assert_eq!(inner, Rect::new(1, CARD_ROWS + 1, 98, 30 - CARD_ROWS - 1 - 2));
    }

    #[test]
    fn test_ink_becomes_rgb() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel_ink(0, 0, (10, 20, 30));
        canvas.set_pixel(2, 0);
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        MapWidget::render_layer(&canvas, Color::Cyan, area, &mut buf);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(10, 20, 30));
        assert_eq!(buf[(1, 0)].fg, Color::Cyan);
    }
}
