//! Pooled "signal" streaks: neon pulses that overtake the camera down the
//! road lanes. All slots are allocated once; activation is a flag flip and
//! an exhausted pool drops spawn requests silently.

use crate::rng::Rng;

/// Lateral offsets a signal may travel in, either side of the road center.
pub const LANES: [f64; 6] = [-5.5, -3.5, -1.5, 1.5, 3.5, 5.5];
/// Spawn depth ahead of the camera, beyond the visible horizon.
pub const SPAWN_AHEAD: f64 = 150.0;
/// World length of the rendered streak ribbon.
pub const STREAK_LENGTH: f64 = 300.0;

const AMBIENT_CHANCE: f64 = 0.03;
const BURST_STAGGER: f64 = 0.05;
const SPEED_SPREAD: f64 = 12.0;
const LIFE_MIN: f64 = 4.0;
const LIFE_SPREAD: f64 = 4.0;
const FADE_IN_END: f64 = 0.1;
const FADE_OUT_START: f64 = 0.8;
const BASE_OPACITY: f64 = 0.7;
const FLICKER: f64 = 0.05;

#[derive(Clone)]
pub struct Signal {
    pub active: bool,
    pub lane: f64,
    pub z: f64,
    pub life: f64,
    pub max_life: f64,
    pub speed: f64,
    pub opacity: f64,
}

impl Signal {
    fn idle() -> Self {
        Self {
            active: false,
            lane: 0.0,
            z: 0.0,
            life: 0.0,
            max_life: 0.0,
            speed: 0.0,
            opacity: 0.0,
        }
    }
}

pub struct SignalPool {
    slots: Vec<Signal>,
    /// Countdown timers for staggered burst spawns, drained by `update`.
    pending: Vec<f64>,
}

impl SignalPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Signal::idle(); capacity],
            pending: Vec::new(),
        }
    }

    /// Claim the first inactive slot. A full pool is not an error; the
    /// request simply disappears.
    pub fn spawn(&mut self, camera_z: f64, camera_speed: f64, rng: &mut Rng) -> bool {
        let Some(sig) = self.slots.iter_mut().find(|s| !s.active) else {
            return false;
        };
        sig.lane = *rng.pick(&LANES);
        sig.z = camera_z - SPAWN_AHEAD;
        // Always faster than the camera, so the streak overtakes.
        sig.speed = camera_speed * 2.0 + rng.next_f64() * SPEED_SPREAD;
        sig.life = 0.0;
        sig.max_life = LIFE_MIN + rng.next_f64() * LIFE_SPREAD;
        sig.opacity = BASE_OPACITY + rng.next_f64() * 0.3;
        sig.active = true;
        true
    }

    /// User-activity hook: queue 2-4 spawns staggered a few frames apart so
    /// a burst doesn't land in a single frame. Safe to call at any rate.
    pub fn burst(&mut self, rng: &mut Rng) {
        let count = 2 + (rng.next_f64() * 3.0) as usize;
        for i in 0..count {
            self.pending.push(i as f64 * BURST_STAGGER);
        }
    }

    pub fn update(&mut self, dt: f64, camera_z: f64, camera_speed: f64, rng: &mut Rng) {
        let mut due = 0usize;
        self.pending.retain_mut(|timer| {
            *timer -= dt;
            if *timer <= 0.0 {
                due += 1;
                false
            } else {
                true
            }
        });
        for _ in 0..due {
            self.spawn(camera_z, camera_speed, rng);
        }

        for sig in &mut self.slots {
            if !sig.active {
                continue;
            }
            sig.life += dt;
            if sig.life >= sig.max_life {
                sig.active = false;
                sig.opacity = 0.0;
                continue;
            }

            // Toward the camera (z increases behind the travel direction).
            sig.z += sig.speed * dt;

            let ratio = sig.life / sig.max_life;
            let fade = if ratio < FADE_IN_END {
                ratio / FADE_IN_END
            } else if ratio > FADE_OUT_START {
                1.0 - (ratio - FADE_OUT_START) / (1.0 - FADE_OUT_START)
            } else {
                1.0
            };
            sig.opacity = fade * (BASE_OPACITY + rng.next_f64() * FLICKER);
        }

        // Ambient traffic: one independent low-probability roll per tick.
        if rng.chance(AMBIENT_CHANCE) {
            self.spawn(camera_z, camera_speed, rng);
        }
    }

    pub fn slots(&self) -> &[Signal] {
        &self.slots
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }
}
