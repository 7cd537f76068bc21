//! Celebration confetti shown when a menu is picked. Purely cosmetic.
//!
//! Positions are percentages of the wheel box so the renderer can scale them to
//! whatever canvas size is in use.

use rand::Rng;

use crate::scheduler::{Channel, TickScheduler, TickToken};

pub const CONFETTI_COLORS: [&str; 6] = ["#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40"];
/// Animation length in ticks (~2.5 s at 60 fps).
pub const CONFETTI_TICKS: u32 = 150;
pub const GRAVITY: f64 = 0.2;
/// Fraction of velocity applied to position each tick.
pub const VELOCITY_SCALE: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: &'static str,
    pub rotation: f64,
    pub vx: f64,
    pub vy: f64,
    pub spin: f64,
}

impl Particle {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Particle {
            x: 50.0 + rng.random::<f64>() * 50.0 - 25.0,
            y: 50.0 + rng.random::<f64>() * 10.0,
            size: rng.random::<f64>() * 8.0 + 4.0,
            color: CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())],
            rotation: rng.random::<f64>() * 360.0,
            vx: rng.random::<f64>() * 20.0 - 10.0,
            vy: -(rng.random::<f64>() * 10.0 + 5.0),
            spin: rng.random::<f64>() * 10.0 - 5.0,
        }
    }

    fn step(&mut self) {
        self.vy += GRAVITY;
        self.x += self.vx * VELOCITY_SCALE;
        self.y += self.vy * VELOCITY_SCALE;
        self.rotation = (self.rotation + self.spin).rem_euclid(360.0);
    }
}

/// Outcome of [`ConfettiSimulator::on_tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfettiTick {
    /// Not the tick the simulator is waiting for.
    Ignored,
    Running,
    /// Last tick of the window; the particles are gone.
    Finished,
}

#[derive(Debug, Default)]
pub struct ConfettiSimulator {
    particles: Vec<Particle>,
    frame: u32,
    token: Option<TickToken>,
}

impl ConfettiSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// Spawn a fresh batch of 30–49 particles, replacing any running burst.
    pub fn burst<R, S>(&mut self, rng: &mut R, sched: &mut S)
    where
        R: Rng + ?Sized,
        S: TickScheduler + ?Sized,
    {
        self.stop(sched);
        let count = rng.random_range(30..50);
        self.particles = (0..count).map(|_| Particle::random(rng)).collect();
        self.frame = 0;
        self.token = Some(sched.request_tick(Channel::Confetti));
    }

    /// Advance one tick.
    pub fn on_tick<S>(&mut self, token: TickToken, sched: &mut S) -> ConfettiTick
    where
        S: TickScheduler + ?Sized,
    {
        if self.token != Some(token) {
            return ConfettiTick::Ignored;
        }
        self.token = None;
        self.frame += 1;
        if self.frame < CONFETTI_TICKS {
            self.particles.iter_mut().for_each(Particle::step);
            self.token = Some(sched.request_tick(Channel::Confetti));
            ConfettiTick::Running
        } else {
            self.particles.clear();
            ConfettiTick::Finished
        }
    }

    /// Cancel the animation and clear every particle.
    pub fn stop<S>(&mut self, sched: &mut S)
    where
        S: TickScheduler + ?Sized,
    {
        if let Some(token) = self.token.take() {
            sched.cancel(token);
        }
        self.particles.clear();
        self.frame = 0;
    }
}
