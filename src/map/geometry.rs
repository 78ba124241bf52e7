use crate::braille::{BrailleCanvas, Ink};

#[inline(always)]
fn plot(canvas: &mut BrailleCanvas, x: i32, y: i32, ink: Option<Ink>) {
    match ink {
        Some(ink) => canvas.set_pixel_ink(x, y, ink),
        None => canvas.set_pixel_signed(x, y),
    }
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, ink: Option<Ink>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(canvas, x, y, ink);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a thicker line (strokes wider than one dot on screen)
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, ink: Option<Ink>) {
    draw_line(canvas, x0, y0, x1, y1, ink);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1, ink);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1, ink);
}

/// Draw a filled circle
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32, ink: Option<Ink>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                plot(canvas, cx + dx, cy + dy, ink);
            }
        }
    }
}

/// Draw a circle outline (midpoint algorithm)
pub fn draw_ring(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32, ink: Option<Ink>) {
    if radius <= 0 {
        plot(canvas, cx, cy, ink);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;

    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            plot(canvas, cx + px, cy + py, ink);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0, None);
        assert_eq!(canvas.dot_count(), 10);
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7, None);
        assert_eq!(canvas.dot_count(), 8);
    }

    #[test]
    fn test_ring_is_hollow() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_ring(&mut canvas, 10, 10, 6, Some((255, 0, 0)));
        let ring = canvas.dot_count();

        let mut filled = BrailleCanvas::new(10, 5);
        draw_circle(&mut filled, 10, 10, 6, None);
        assert!(ring > 0 && ring < filled.dot_count());
    }

    #[test]
    fn test_clipped_drawing_is_safe() {
        let mut canvas = BrailleCanvas::new(2, 2);
        draw_thick_line(&mut canvas, -50, -50, 50, 50, None);
        draw_circle(&mut canvas, -3, 0, 4, None);
        assert!(canvas.dot_count() > 0);
    }
}
