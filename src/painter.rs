//! Scene composition. A small perspective projector plus painter's-algorithm
//! drawing of the corridor into the CPU framebuffer: stars, sun backdrop,
//! ground grid and road, textured building facades with neon wireframe
//! edges, then additive signal streaks. Exponential-squared depth fog fades
//! everything but the sky into the night backdrop.

use crate::corridor::{Accent, Building, Camera, Corridor, SUN_DISTANCE, SUN_HEIGHT, SUN_WORLD_SIZE};
use crate::pixmap::Pixmap;
use crate::signals::STREAK_LENGTH;

const NIGHT: [u8; 4] = [10, 10, 18, 255];
const NEON_CYAN: [u8; 3] = [0, 240, 255];
const NEON_PINK: [u8; 3] = [255, 45, 149];
const SIGNAL_GREEN: [u8; 3] = [57, 255, 20];
const STAR_WHITE: [u8; 4] = [255, 255, 255, 178];

const FOV_Y: f64 = 70.0 * std::f64::consts::PI / 180.0;
const NEAR: f64 = 0.1;
const FOG_DENSITY: f64 = 0.004;

const GRID_HALF: f64 = 400.0;
const GRID_STEP: f64 = 5.0;
const ROAD_HALF_WIDTH: f64 = 6.0;
const DASH_PERIOD: f64 = 8.0;
const DASH_LENGTH: f64 = 4.0;

/// Unlit-material tint for facade texels, exposure folded in.
const FACADE_TINT: [f64; 3] = [0.20, 0.41, 0.41];
const FACADE_OPACITY: f64 = 0.9;

pub struct Projector {
    cx: f64,
    cy: f64,
    focal: f64,
    cam: [f64; 3],
    sin_yaw: f64,
    cos_yaw: f64,
    sin_pitch: f64,
    cos_pitch: f64,
}

impl Projector {
    pub fn new(camera: &Camera, width: usize, height: usize) -> Self {
        Self {
            cx: width as f64 * 0.5,
            cy: height as f64 * 0.5,
            focal: (height as f64 * 0.5) / (FOV_Y * 0.5).tan(),
            cam: [camera.x, camera.y, camera.z],
            sin_yaw: camera.yaw.sin(),
            cos_yaw: camera.yaw.cos(),
            sin_pitch: camera.pitch.sin(),
            cos_pitch: camera.pitch.cos(),
        }
    }

    /// World point into view space. The camera looks along -z.
    pub fn view(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let dx = x - self.cam[0];
        let dy = y - self.cam[1];
        let dz = z - self.cam[2];
        let x1 = dx * self.cos_yaw - dz * self.sin_yaw;
        let z1 = dx * self.sin_yaw + dz * self.cos_yaw;
        let y2 = dy * self.cos_pitch + z1 * self.sin_pitch;
        let z2 = -dy * self.sin_pitch + z1 * self.cos_pitch;
        [x1, y2, z2]
    }

    /// View point onto the screen; `None` when on or behind the near plane.
    pub fn to_screen(&self, v: [f64; 3]) -> Option<[f64; 2]> {
        if v[2] > -NEAR {
            return None;
        }
        let scale = self.focal / -v[2];
        Some([self.cx + v[0] * scale, self.cy - v[1] * scale])
    }

    pub fn project(&self, x: f64, y: f64, z: f64) -> Option<([f64; 2], f64)> {
        let v = self.view(x, y, z);
        let p = self.to_screen(v)?;
        Some((p, -v[2]))
    }
}

/// Fraction of an object's color surviving fog at view depth `dist`
/// (FogExp2 with the scene's density).
pub fn fog_visibility(dist: f64) -> f64 {
    let d = FOG_DENSITY * dist;
    (-d * d).exp()
}

fn clip_near(a: [f64; 3], b: [f64; 3]) -> Option<([f64; 3], [f64; 3])> {
    let behind_a = a[2] > -NEAR;
    let behind_b = b[2] > -NEAR;
    if behind_a && behind_b {
        return None;
    }
    if !behind_a && !behind_b {
        return Some((a, b));
    }
    let t = (-NEAR - a[2]) / (b[2] - a[2]);
    let hit = [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        -NEAR,
    ];
    if behind_a {
        Some((hit, b))
    } else {
        Some((a, hit))
    }
}

/// World-space stroke with near clipping and per-endpoint fog attenuation.
fn stroke_world_line(
    frame: &mut Pixmap,
    proj: &Projector,
    a: [f64; 3],
    b: [f64; 3],
    color: [u8; 3],
    alpha: f64,
    additive: bool,
) {
    let va = proj.view(a[0], a[1], a[2]);
    let vb = proj.view(b[0], b[1], b[2]);
    let Some((va, vb)) = clip_near(va, vb) else {
        return;
    };
    let (Some(pa), Some(pb)) = (proj.to_screen(va), proj.to_screen(vb)) else {
        return;
    };
    let aa = alpha * fog_visibility(-va[2]);
    let ab = alpha * fog_visibility(-vb[2]);
    if aa < 0.004 && ab < 0.004 {
        return;
    }
    frame.stroke_line(pa[0], pa[1], pb[0], pb[1], color, aa, ab, additive);
}

pub fn paint_scene(frame: &mut Pixmap, scene: &Corridor) {
    frame.clear(NIGHT);
    let proj = Projector::new(&scene.camera, frame.width(), frame.height());
    let cam_z = scene.camera.z;

    // Sky: the star shell rides the camera's depth, above the fog.
    for star in &scene.stars {
        if let Some((p, _)) = proj.project(star.x, star.y, cam_z + star.depth) {
            frame.blend(p[0].round() as i32, p[1].round() as i32, STAR_WHITE);
        }
    }

    // Sun backdrop, slaved to a fixed distance ahead.
    let sun_view = proj.view(0.0, SUN_HEIGHT, cam_z - SUN_DISTANCE);
    if let Some(center) = proj.to_screen(sun_view) {
        let size = (SUN_WORLD_SIZE * proj.focal / -sun_view[2]) as i32;
        frame.blit_scaled(
            &scene.sun,
            center[0].round() as i32,
            center[1].round() as i32,
            size,
            size,
            fog_visibility(-sun_view[2]),
        );
    }

    paint_ground(frame, &proj, cam_z);

    // Facades far to near so closer blocks overpaint the ones behind.
    let mut order: Vec<usize> = (0..scene.buildings.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        scene.buildings[a]
            .z
            .partial_cmp(&scene.buildings[b].z)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for idx in order {
        let b = &scene.buildings[idx];
        paint_building(frame, &proj, b, scene.rain[b.texture].map());
    }

    // Signal streaks last: additive glow riding the road surface.
    for sig in scene.signals.slots() {
        if !sig.active || sig.opacity <= 0.0 {
            continue;
        }
        let half = STREAK_LENGTH * 0.5;
        stroke_world_line(
            frame,
            &proj,
            [sig.lane, 0.05, sig.z - half],
            [sig.lane, 0.05, sig.z + half],
            SIGNAL_GREEN,
            sig.opacity,
            true,
        );
    }
}

/// Grid, road surface, edge lines and center dashes. The whole group is
/// glued to the camera's depth, matching the slaved ground plane.
fn paint_ground(frame: &mut Pixmap, proj: &Projector, cam_z: f64) {
    let mut x = -GRID_HALF;
    while x <= GRID_HALF {
        stroke_world_line(
            frame,
            proj,
            [x, 0.0, cam_z - GRID_HALF],
            [x, 0.0, cam_z + GRID_HALF],
            NEON_CYAN,
            0.15,
            false,
        );
        x += GRID_STEP;
    }
    let mut off = GRID_STEP;
    while off <= GRID_HALF {
        stroke_world_line(
            frame,
            proj,
            [-GRID_HALF, 0.0, cam_z - off],
            [GRID_HALF, 0.0, cam_z - off],
            NEON_CYAN,
            0.15,
            false,
        );
        off += GRID_STEP;
    }

    // Road surface dims the grid beneath the lanes.
    let corners = [
        [-ROAD_HALF_WIDTH, 0.0, cam_z - GRID_HALF],
        [ROAD_HALF_WIDTH, 0.0, cam_z - GRID_HALF],
        [ROAD_HALF_WIDTH, 0.0, cam_z - 1.0],
        [-ROAD_HALF_WIDTH, 0.0, cam_z - 1.0],
    ];
    let projected: Vec<[f64; 2]> = corners
        .iter()
        .filter_map(|c| proj.project(c[0], c[1], c[2]).map(|(p, _)| p))
        .collect();
    if let [p0, p1, p2, p3] = projected[..] {
        frame.fill_triangle([p0, p1, p2], [NIGHT[0], NIGHT[1], NIGHT[2]], 0.8);
        frame.fill_triangle([p0, p2, p3], [NIGHT[0], NIGHT[1], NIGHT[2]], 0.8);
    }

    for x in [-ROAD_HALF_WIDTH, ROAD_HALF_WIDTH] {
        stroke_world_line(
            frame,
            proj,
            [x, 0.02, cam_z - GRID_HALF],
            [x, 0.02, cam_z + GRID_HALF],
            NEON_PINK,
            0.6,
            false,
        );
    }

    let mut z = cam_z - GRID_HALF;
    while z < cam_z {
        stroke_world_line(
            frame,
            proj,
            [0.0, 0.02, z],
            [0.0, 0.02, z + DASH_LENGTH],
            NEON_PINK,
            0.3,
            false,
        );
        z += DASH_PERIOD;
    }
}

fn paint_building(frame: &mut Pixmap, proj: &Projector, b: &Building, rain: &Pixmap) {
    let front_z = b.z + b.depth / 2.0;
    let back_z = b.z - b.depth / 2.0;
    let (xl, xr) = (b.x - b.width / 2.0, b.x + b.width / 2.0);

    let face_view = proj.view(b.x, b.y, front_z);
    if face_view[2] > -NEAR {
        return;
    }
    let visibility = fog_visibility(-face_view[2]);
    if visibility < 0.01 {
        return;
    }

    let accent = match b.accent {
        Accent::Cyan => NEON_CYAN,
        Accent::Pink => NEON_PINK,
    };
    let edge_alpha = b.edge_opacity * visibility;

    // Rear wireframe and the depth edges, mostly overdrawn by the facade.
    let front = [
        [xl, b.height, front_z],
        [xr, b.height, front_z],
        [xr, 0.0, front_z],
        [xl, 0.0, front_z],
    ];
    let back = [
        [xl, b.height, back_z],
        [xr, b.height, back_z],
        [xr, 0.0, back_z],
        [xl, 0.0, back_z],
    ];
    for i in 0..4 {
        stroke_world_line(frame, proj, back[i], back[(i + 1) % 4], accent, edge_alpha, false);
        stroke_world_line(frame, proj, front[i], back[i], accent, edge_alpha, false);
    }

    let screen: Option<Vec<[f64; 2]>> = front
        .iter()
        .map(|c| proj.project(c[0], c[1], c[2]).map(|(p, _)| p))
        .collect();
    let Some(screen) = screen else {
        return;
    };
    if let [tl, tr, br, bl] = screen[..] {
        let alpha = FACADE_OPACITY * visibility;
        frame.fill_triangle_textured(
            [tl, tr, br],
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            rain,
            FACADE_TINT,
            alpha,
        );
        frame.fill_triangle_textured(
            [tl, br, bl],
            [[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            rain,
            FACADE_TINT,
            alpha,
        );
    }

    for i in 0..4 {
        stroke_world_line(frame, proj, front[i], front[(i + 1) % 4], accent, edge_alpha, false);
    }
}
