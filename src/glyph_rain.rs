//! Falling-glyph facade textures.
//!
//! Each building owns one of these: a small RGBA buffer redrawn at a
//! throttled cadence to look like columns of characters raining down the
//! face. Instead of clearing, every refresh fades the previous frame a step
//! toward the backdrop, which leaves trails behind the falling heads.

use crate::pixmap::Pixmap;
use crate::rng::Rng;

pub const RAIN_WIDTH: usize = 64;
pub const RAIN_HEIGHT: usize = 128;
pub const COLUMN_STRIDE: usize = 8;
pub const ROW_STRIDE: usize = 8;
pub const COLUMNS: usize = RAIN_WIDTH / COLUMN_STRIDE;

const BACKDROP: [u8; 3] = [10, 10, 18];
const GLYPH_CYAN: [u8; 4] = [0, 240, 255, 255];
const GLYPH_WHITE: [u8; 4] = [255, 255, 255, 255];
const TRAIL_CYAN: [u8; 4] = [0, 240, 255, 77];

/// Bright lead-character probability per drawn glyph.
const LEAD_CHANCE: f64 = 0.1;
/// Per-refresh reset probability for a column past the buffer bottom.
/// Deliberately small and rolled per column, so columns desynchronize
/// instead of looping in lockstep.
const RESET_CHANCE: f64 = 0.03;
/// Fade step toward the backdrop, out of 255.
const FADE_AMOUNT: u8 = 31;

/// 5x7 bitmasks, one row per byte, bit 4 = leftmost column.
/// Hex digits plus angular shapes in the spirit of half-width kana.
const GLYPHS: [[u8; 7]; 24] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
    [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
    [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
    [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
    [0b11111, 0b00001, 0b00010, 0b00110, 0b00100, 0b01100, 0b01000],
    [0b00001, 0b00010, 0b00100, 0b01100, 0b10100, 0b00100, 0b00100],
    [0b00100, 0b11111, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000],
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
    [0b00100, 0b00100, 0b11111, 0b00100, 0b00101, 0b00110, 0b00100],
    [0b10000, 0b10000, 0b10100, 0b11010, 0b10001, 0b10000, 0b10000],
    [0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b01000, 0b10000],
    [0b10010, 0b01001, 0b00000, 0b10010, 0b00010, 0b00100, 0b01000],
];

fn draw_glyph(map: &mut Pixmap, glyph: &[u8; 7], x: i32, y: i32, c: [u8; 4]) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..5 {
            if bits & (0b10000 >> col) != 0 {
                map.blend(x + col, y + row as i32, c);
            }
        }
    }
}

pub struct GlyphRain {
    map: Pixmap,
    drops: Vec<u32>,
}

impl GlyphRain {
    pub fn new(rng: &mut Rng) -> Self {
        let mut map = Pixmap::new(RAIN_WIDTH, RAIN_HEIGHT);
        map.clear([BACKDROP[0], BACKDROP[1], BACKDROP[2], 255]);
        // Start each column mid-fall so fresh facades don't rain in unison.
        let drops = (0..COLUMNS)
            .map(|_| (rng.next_f64() * (RAIN_HEIGHT / ROW_STRIDE) as f64) as u32)
            .collect();
        Self { map, drops }
    }

    /// One simulation tick: fade, draw a head (and a dim trail one row up)
    /// per column, advance the drop rows, probabilistically reset columns
    /// that have run off the bottom.
    pub fn refresh(&mut self, rng: &mut Rng) {
        self.map.fade_toward(BACKDROP, FADE_AMOUNT);

        for c in 0..COLUMNS {
            let x = (c * COLUMN_STRIDE) as i32 + 1;
            let row = self.drops[c];
            let y = (row * ROW_STRIDE as u32) as i32;

            let head = *rng.pick(&GLYPHS);
            let color = if rng.chance(LEAD_CHANCE) {
                GLYPH_WHITE
            } else {
                GLYPH_CYAN
            };
            draw_glyph(&mut self.map, &head, x, y, color);

            if row > 1 {
                let trail = *rng.pick(&GLYPHS);
                draw_glyph(&mut self.map, &trail, x, y - ROW_STRIDE as i32, TRAIL_CYAN);
            }

            if y > RAIN_HEIGHT as i32 && rng.chance(RESET_CHANCE) {
                self.drops[c] = 0;
            }
            self.drops[c] += 1;
        }
    }

    pub fn map(&self) -> &Pixmap {
        &self.map
    }

    pub fn drops(&self) -> &[u32] {
        &self.drops
    }
}
