//! Reference collaborators for pipeline validation and engine testing:
//!
//! - [`BallisticPusher`]: straight-line motion with nearest-grid-point deposit.
//! - [`NullSolver`]: leaves the field untouched, with an optional `max_dt`.
//! - [`UniformSource`]: adds a constant E and B to every owned cell.
//! - [`FailingPusher`]: fails deterministically after N calls.
//! - [`NanPusher`]: deposits a NaN into the current.

use std::sync::atomic::{AtomicUsize, Ordering};

use rowband_core::{KernelError, Vec3};
use rowband_engine::{FieldSolver, FieldSource, PushContext, SpeciesPusher};
use rowband_grid::{Current, Emf};

/// Moves every particle by `u * dt / dx` cells per timestep, ignoring the
/// field, and deposits `q * u` into the cell it lands in.
///
/// Columns wrap; rows are left for the pipeline to route. Deposits that
/// fall outside the region's guard band are dropped.
pub struct BallisticPusher {
    pub deposit: bool,
}

impl BallisticPusher {
    pub fn new() -> Self {
        Self { deposit: true }
    }

    /// A pusher that moves particles but deposits nothing.
    pub fn without_deposit() -> Self {
        Self { deposit: false }
    }
}

impl Default for BallisticPusher {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeciesPusher for BallisticPusher {
    fn name(&self) -> &str {
        "ballistic"
    }

    fn push(&self, ctx: PushContext<'_>) -> Result<(), KernelError> {
        let columns = ctx.grid[0] as i32;
        let [dx, dy] = ctx.params.dx;
        let dt = ctx.params.dt;
        let q = ctx.params.particle_charge();
        let gc = ctx.current.grid().gc();
        let rows = ctx.limits_y.len() as i32;
        let lowest = -(gc[1][0] as i32);
        let highest = rows + gc[1][1] as i32;

        for p in ctx.particles.iter_mut() {
            let x = p.ix as f32 + p.x + p.ux * dt / dx;
            let y = p.iy as f32 + p.y + p.uy * dt / dy;
            let (fx, fy) = (x.floor(), y.floor());
            p.ix = (fx as i32).rem_euclid(columns);
            p.x = x - fx;
            p.iy = fy as i32;
            p.y = y - fy;

            if self.deposit {
                let j = p.iy - ctx.limits_y.start as i32;
                if (lowest..highest).contains(&j) {
                    ctx.current.deposit(
                        p.ix as isize,
                        j as isize,
                        Vec3::new(q * p.ux, q * p.uy, q * p.uz),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Leaves the field untouched.
#[derive(Default)]
pub struct NullSolver {
    pub max_dt: Option<f32>,
}

impl NullSolver {
    pub fn new() -> Self {
        Self { max_dt: None }
    }

    /// A solver that claims stability only up to `max_dt`.
    pub fn with_max_dt(max_dt: f32) -> Self {
        Self {
            max_dt: Some(max_dt),
        }
    }
}

impl FieldSolver for NullSolver {
    fn name(&self) -> &str {
        "null"
    }

    fn max_dt(&self) -> Option<f32> {
        self.max_dt
    }

    fn advance(&self, _emf: &mut Emf, _current: &Current) -> Result<(), KernelError> {
        Ok(())
    }
}

/// Adds a constant E and B to every owned cell.
pub struct UniformSource {
    pub e: Vec3,
    pub b: Vec3,
}

impl UniformSource {
    pub fn new(e: Vec3, b: Vec3) -> Self {
        Self { e, b }
    }
}

impl FieldSource for UniformSource {
    fn name(&self) -> &str {
        "uniform"
    }

    fn apply(&self, emf: &mut Emf, _row_offset: usize) -> Result<(), KernelError> {
        let [nx0, nx1] = emf.e().nx();
        let (e, b) = emf.fields_mut();
        for j in 0..nx1 as isize {
            for i in 0..nx0 as isize {
                *e.get_mut(i, j) += self.e;
                *b.get_mut(i, j) += self.b;
            }
        }
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful
/// calls. Calls are counted across regions and species.
pub struct FailingPusher {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingPusher {
    /// Create a pusher that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `push()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl SpeciesPusher for FailingPusher {
    fn name(&self) -> &str {
        "failing"
    }

    fn push(&self, _ctx: PushContext<'_>) -> Result<(), KernelError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(KernelError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(())
    }
}

/// Deposits a NaN into the first owned cell of every region it runs in.
pub struct NanPusher;

impl SpeciesPusher for NanPusher {
    fn name(&self) -> &str {
        "nan"
    }

    fn push(&self, ctx: PushContext<'_>) -> Result<(), KernelError> {
        ctx.current
            .deposit(0, 0, Vec3::new(f32::NAN, 0.0, 0.0));
        Ok(())
    }
}
