/// RGB colour stored per character cell
pub type Ink = (u8, u8, u8);

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// Unicode Braille patterns: U+2800 to U+28FF
///
/// Every cell also remembers the ink of the last dot written into it, so one
/// canvas can hold differently coloured overlays.
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<Vec<u8>>, // Bit patterns per char
    ink: Vec<Vec<Option<Ink>>>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![vec![0u8; width]; height],
            ink: vec![vec![None; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dot resolution (width * 2, height * 4)
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.width * 2, self.height * 4)
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        self.pixels[cy][cx] |= bit;
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Set a pixel and paint its cell with `ink`
    pub fn set_pixel_ink(&mut self, x: i32, y: i32, ink: Ink) {
        if x < 0 || y < 0 {
            return;
        }
        let (cx, cy) = (x as usize / 2, y as usize / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.set_pixel(x as usize, y as usize);
        self.ink[cy][cx] = Some(ink);
    }

    /// Braille glyph and ink of a cell; `None` for an empty cell
    pub fn cell(&self, cx: usize, cy: usize) -> Option<(char, Option<Ink>)> {
        let bits = *self.pixels.get(cy)?.get(cx)?;
        if bits == 0 {
            return None;
        }
        let ch = char::from_u32(0x2800 + bits as u32)?;
        Some((ch, self.ink[cy][cx]))
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.pixels
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of dots set across the canvas
    pub fn dot_count(&self) -> u32 {
        self.pixels
            .iter()
            .flatten()
            .map(|b| b.count_ones())
            .sum()
    }
}
