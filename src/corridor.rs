//! The corridor context: every piece of simulation state behind the endless
//! city, owned by one struct and stepped by `advance`. The camera's depth
//! coordinate decreases forever; a fixed ring of buildings wraps forward by
//! exactly one corridor length as the camera passes, so unbounded travel
//! costs a bounded set of objects.

use crate::glyph_rain::GlyphRain;
use crate::pixmap::Pixmap;
use crate::rng::Rng;
use crate::signals::SignalPool;

/// Depth of the nearest building row at start-up.
const FIRST_ROW_DEPTH: f64 = 15.0;
const STAR_COUNT: usize = 300;
const CAMERA_HEIGHT: f64 = 6.0;
const BASE_PITCH: f64 = -0.15;

/// Backdrop sun placement, slaved to camera depth at paint time.
pub const SUN_DISTANCE: f64 = 180.0;
pub const SUN_HEIGHT: f64 = 18.0;
/// World-space edge length of the square sun sprite (disc plus glow halo).
pub const SUN_WORLD_SIZE: f64 = 120.0;

const SUN_SPRITE_SIZE: usize = 512;
const SUN_DISC_RADIUS: i32 = 128;

pub struct CorridorConfig {
    pub rows: usize,
    pub row_spacing: f64,
    pub camera_speed: f64,
    pub recycle_slack: f64,
    pub pool_capacity: usize,
    /// Seconds between glyph-rain refresh sweeps. An elapsed-time test, not
    /// a frame counter, so the cadence survives variable frame rates.
    pub texture_refresh_interval: f64,
    pub seed: u32,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            row_spacing: 15.0,
            camera_speed: 8.0,
            recycle_slack: 20.0,
            pool_capacity: 20,
            texture_refresh_interval: 0.08,
            seed: 1,
        }
    }
}

impl CorridorConfig {
    /// Total depth of the building ring; recycling teleports by exactly this.
    pub fn corridor_length(&self) -> f64 {
        self.rows as f64 * self.row_spacing
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Accent {
    Cyan,
    Pink,
}

pub struct Building {
    pub x: f64,
    /// Fixed at half-height so the base sits on the ground plane.
    pub y: f64,
    pub z: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub side: Side,
    pub row: usize,
    /// Index into the corridor's rain-texture table, immutable.
    pub texture: usize,
    pub accent: Accent,
    pub edge_opacity: f64,
}

pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
}

/// Sky point. Depth is stored relative to the camera so the shell travels
/// with it and the sky never empties as the camera outruns absolute space.
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

pub struct Corridor {
    pub config: CorridorConfig,
    pub camera: Camera,
    pub buildings: Vec<Building>,
    pub rain: Vec<GlyphRain>,
    pub signals: SignalPool,
    pub stars: Vec<Star>,
    pub sun: Pixmap,
    pub elapsed: f64,
    last_rain_refresh: f64,
    rng: Rng,
}

impl Corridor {
    pub fn new(config: CorridorConfig) -> Self {
        let mut rng = Rng::new(config.seed);

        let mut buildings = Vec::new();
        let mut rain = Vec::new();
        for row in 0..config.rows {
            let z = -FIRST_ROW_DEPTH - row as f64 * config.row_spacing;
            for side in [Side::Left, Side::Right] {
                let count = 2 + (rng.next_f64() * 2.0) as usize;
                for slot in 0..count {
                    let width = rng.range(4.0, 10.0);
                    let height = rng.range(8.0, 33.0);
                    let depth = rng.range(4.0, 10.0);
                    // Stagger lateral placement so rows never read as a grid.
                    let x = side.sign()
                        * (8.0 + slot as f64 * (width + 1.0) + rng.next_f64() * 2.0);
                    let texture = rain.len();
                    rain.push(GlyphRain::new(&mut rng));
                    buildings.push(Building {
                        x,
                        y: height / 2.0,
                        z,
                        width,
                        height,
                        depth,
                        side,
                        row,
                        texture,
                        accent: if rng.chance(0.5) {
                            Accent::Cyan
                        } else {
                            Accent::Pink
                        },
                        edge_opacity: rng.range(0.5, 0.8),
                    });
                }
            }
        }

        let stars = (0..STAR_COUNT)
            .map(|_| Star {
                x: (rng.next_f64() - 0.5) * 400.0,
                y: rng.next_f64() * 80.0 + 20.0,
                depth: (rng.next_f64() - 0.5) * 400.0 - 50.0,
            })
            .collect();

        let signals = SignalPool::new(config.pool_capacity);

        Self {
            camera: Camera {
                x: 0.0,
                y: CAMERA_HEIGHT,
                z: 0.0,
                yaw: 0.0,
                pitch: BASE_PITCH,
            },
            buildings,
            rain,
            signals,
            stars,
            sun: synthesize_sun(),
            elapsed: 0.0,
            last_rain_refresh: 0.0,
            rng,
            config,
        }
    }

    /// One simulation tick. `dt` is in seconds.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed += dt;

        // Drift: constant forward velocity; the depth coordinate never
        // resets. Sway runs off elapsed wall-clock time, not frame count.
        self.camera.z -= self.config.camera_speed * dt;
        self.camera.x = (self.elapsed * 0.2).sin() * 1.5;
        self.camera.yaw = (self.elapsed * 0.15).sin() * 0.02;
        self.camera.pitch = BASE_PITCH + (self.elapsed * 0.1).sin() * 0.01;

        // Recycle buildings that have fully fallen behind the camera. The
        // slack keeps the teleport outside the frustum, and the move is a
        // relative wrap, never an absolute placement.
        let length = self.config.corridor_length();
        let limit = self.camera.z + self.config.recycle_slack;
        for b in &mut self.buildings {
            if b.z > limit {
                b.z -= length;
            }
        }

        if self.elapsed - self.last_rain_refresh >= self.config.texture_refresh_interval {
            self.last_rain_refresh = self.elapsed;
            for r in &mut self.rain {
                r.refresh(&mut self.rng);
            }
        }

        self.signals.update(
            dt,
            self.camera.z,
            self.config.camera_speed,
            &mut self.rng,
        );
    }

    /// External stimulus from the host's input path: burst-spawn signals.
    /// Only flips pool state; the next tick's update consumes it.
    pub fn on_user_activity(&mut self) {
        self.signals.burst(&mut self.rng);
    }
}

/// Bake the segmented horizon sun once: gradient disc with dark cut bands
/// widening toward the bottom, over two concentric glow washes.
fn synthesize_sun() -> Pixmap {
    let mut sprite = Pixmap::new(SUN_SPRITE_SIZE, SUN_SPRITE_SIZE);
    let c = (SUN_SPRITE_SIZE / 2) as i32;

    sprite.fill_circle(c, c, SUN_DISC_RADIUS * 2, [255, 106, 0, 13]);
    sprite.fill_circle(c, c, (SUN_DISC_RADIUS as f64 * 1.4) as i32, [255, 45, 149, 28]);

    // Cut bands as fractions of the disc's bounding square, measured from
    // its top edge; the band past 0.957 clips the below-horizon rim.
    const CUTS: [(f64, f64); 7] = [
        (0.547, 0.016),
        (0.605, 0.023),
        (0.664, 0.031),
        (0.723, 0.039),
        (0.789, 0.055),
        (0.867, 0.070),
        (0.957, 0.043),
    ];
    const STOPS: [(f64, [u8; 3]); 4] = [
        (0.0, [255, 77, 170]),
        (0.4, [255, 140, 42]),
        (0.8, [255, 240, 51]),
        (1.0, [255, 240, 51]),
    ];

    let r = SUN_DISC_RADIUS;
    let r2 = (r * r) as f64;
    for dy in -r..=r {
        let t = (dy + r) as f64 / (2 * r) as f64;
        let in_cut = CUTS.iter().any(|&(start, h)| t >= start && t < start + h);
        let color = if in_cut {
            [10, 10, 18]
        } else {
            gradient(&STOPS, t)
        };
        let half = ((r2 - (dy * dy) as f64).sqrt()) as i32;
        for dx in -half..=half {
            sprite.put(c + dx, c + dy, [color[0], color[1], color[2], 255]);
        }
    }

    sprite
}

fn gradient(stops: &[(f64, [u8; 3])], t: f64) -> [u8; 3] {
    let mut prev = stops[0];
    for &stop in &stops[1..] {
        if t <= stop.0 {
            let span = (stop.0 - prev.0).max(1e-9);
            let k = ((t - prev.0) / span).clamp(0.0, 1.0);
            let mut out = [0u8; 3];
            for ch in 0..3 {
                out[ch] =
                    (prev.1[ch] as f64 + (stop.1[ch] as f64 - prev.1[ch] as f64) * k) as u8;
            }
            return out;
        }
        prev = stop;
    }
    prev.1
}
