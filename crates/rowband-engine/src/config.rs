//! Domain configuration, validation, and error types.
//!
//! [`DomainConfig`] is the input for constructing a
//! [`Domain`](crate::Domain). [`validate()`](DomainConfig::validate)
//! checks structural invariants at startup; ring construction calls it
//! before allocating anything.

use std::error::Error;
use std::fmt;

use rowband_core::{AllocError, Particle};
use rowband_grid::{partition_rows, GuardCells, Smoothing};
use rowband_task::Scheduler;

/// Guard cells used when none are configured: one low, two high, on both axes.
pub const DEFAULT_GUARD_CELLS: GuardCells = [[1, 2], [1, 2]];

// ── SpeciesTemplate ───────────────────────────────────────────────

/// Parameters and initial particles of one species, before bucketing.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesTemplate {
    /// Species name, used in logs and errors.
    pub name: String,
    /// Mass-to-charge ratio. Its sign is the sign of the charge.
    pub m_q: f32,
    /// Particles per cell along x and y.
    pub ppc: [usize; 2],
    /// Initial particles in global cell coordinates.
    pub particles: Vec<Particle>,
}

impl SpeciesTemplate {
    /// A species with no initial particles.
    pub fn new(name: impl Into<String>, m_q: f32, ppc: [usize; 2]) -> Self {
        Self {
            name: name.into(),
            m_q,
            ppc,
            particles: Vec::new(),
        }
    }

    /// Builder-style initial particles.
    pub fn with_particles(mut self, particles: Vec<Particle>) -> Self {
        self.particles = particles;
        self
    }
}

// ── SchedulerConfig ───────────────────────────────────────────────

/// Configuration of the per-timestep task scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Worker threads. `None` = auto-detect (`available_parallelism`,
    /// clamped to `[1, 16]`). `Some(1)` runs serially on the caller.
    pub workers: Option<usize>,
}

impl SchedulerConfig {
    /// Run every task on the calling thread.
    pub const SERIAL: Self = Self { workers: Some(1) };

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 16),
        }
    }

    /// The scheduler this configuration selects.
    pub fn scheduler(&self) -> Scheduler {
        match self.resolved_worker_count() {
            1 => Scheduler::Serial,
            workers => Scheduler::Threaded { workers },
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`DomainConfig`] or building the
/// region ring from it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `n_regions` is zero.
    NoRegions,
    /// Fewer grid rows than regions, so some region would own no rows.
    DegeneratePartition {
        /// Grid rows.
        rows: usize,
        /// Requested regions.
        regions: usize,
    },
    /// The grid has no columns.
    EmptyGrid,
    /// A row guard band is taller than the smallest region.
    GuardCellsExceedRegion {
        /// Which buffer (`"current"` or `"emf"`).
        buffer: &'static str,
        /// Rows of the smallest region.
        region_rows: usize,
        /// Guard band height (`gc[1][0] + gc[1][1]`).
        guard_rows: usize,
    },
    /// The column guard cells are wider than the grid.
    GuardCellsExceedColumns {
        /// Which buffer (`"current"` or `"emf"`).
        buffer: &'static str,
        /// Grid columns.
        columns: usize,
        /// Guard width (`gc[0][0] + gc[0][1]`).
        guard_columns: usize,
    },
    /// A kernel needs guard cells that are not configured.
    InvalidGuardCells {
        /// Which buffer (`"current"` or `"emf"`).
        buffer: &'static str,
        /// What is missing.
        reason: String,
    },
    /// Smoothing enabled with zero passes.
    InvalidSmoothing {
        /// The configured smoothing.
        smoothing: Smoothing,
    },
    /// dt is NaN, infinite, zero, or negative.
    InvalidDt {
        /// The invalid value.
        value: f32,
    },
    /// The configured dt exceeds a collaborator's `max_dt`.
    DtTooLarge {
        /// The dt that was requested.
        configured_dt: f32,
        /// The tightest `max_dt` constraint.
        max_supported: f32,
        /// Which collaborator constrains it.
        constraining: String,
    },
    /// A box dimension is NaN, infinite, zero, or negative.
    InvalidBox {
        /// The configured box.
        box_size: [f32; 2],
    },
    /// An initial particle lies outside the grid.
    ParticleOutsideGrid {
        /// Species name.
        species: String,
        /// The particle's global column.
        ix: i32,
        /// The particle's global row.
        iy: i32,
    },
    /// A particle buffer could not be allocated.
    Allocation(AllocError),
    /// The scheduler was configured with zero workers.
    NoWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRegions => write!(f, "n_regions must be at least 1"),
            Self::DegeneratePartition { rows, regions } => {
                write!(f, "cannot split {rows} rows across {regions} regions")
            }
            Self::EmptyGrid => write!(f, "grid has no columns"),
            Self::GuardCellsExceedRegion {
                buffer,
                region_rows,
                guard_rows,
            } => write!(
                f,
                "{buffer} guard band of {guard_rows} rows exceeds smallest region \
                 of {region_rows} rows"
            ),
            Self::GuardCellsExceedColumns {
                buffer,
                columns,
                guard_columns,
            } => write!(
                f,
                "{buffer} guard width of {guard_columns} columns exceeds grid of {columns} columns"
            ),
            Self::InvalidGuardCells { buffer, reason } => {
                write!(f, "invalid {buffer} guard cells: {reason}")
            }
            Self::InvalidSmoothing { smoothing } => write!(
                f,
                "smoothing {:?} needs at least one pass, got {}",
                smoothing.kind, smoothing.level
            ),
            Self::InvalidDt { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::DtTooLarge {
                configured_dt,
                max_supported,
                constraining,
            } => write!(
                f,
                "dt {configured_dt} exceeds max_dt {max_supported} \
                 (constrained by '{constraining}')"
            ),
            Self::InvalidBox { box_size } => write!(
                f,
                "box dimensions must be finite and positive, got [{}, {}]",
                box_size[0], box_size[1]
            ),
            Self::ParticleOutsideGrid { species, ix, iy } => write!(
                f,
                "species '{species}' has an initial particle outside the grid at cell ({ix}, {iy})"
            ),
            Self::Allocation(e) => write!(f, "{e}"),
            Self::NoWorkers => write!(f, "scheduler needs at least one worker"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Allocation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for ConfigError {
    fn from(e: AllocError) -> Self {
        Self::Allocation(e)
    }
}

// ── DomainConfig ───────────────────────────────────────────────────

/// Complete configuration of a region-decomposed domain.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainConfig {
    /// Number of row-band regions.
    pub n_regions: usize,
    /// Global grid size `[columns, rows]`.
    pub grid: [usize; 2],
    /// Physical box size `[x, y]`.
    pub box_size: [f32; 2],
    /// Timestep.
    pub dt: f32,
    /// Guard cells of every region's current.
    pub current_gc: GuardCells,
    /// Guard cells of every region's E and B.
    pub emf_gc: GuardCells,
    /// Current smoothing.
    pub smoothing: Smoothing,
    /// Start in moving-window mode (no column wrap-around).
    pub moving_window: bool,
    /// Task scheduler.
    pub scheduler: SchedulerConfig,
    /// Species, in index order.
    pub species: Vec<SpeciesTemplate>,
}

impl DomainConfig {
    /// A configuration with default guard cells, no smoothing, no species
    /// and an auto-sized scheduler.
    pub fn new(n_regions: usize, grid: [usize; 2], box_size: [f32; 2], dt: f32) -> Self {
        Self {
            n_regions,
            grid,
            box_size,
            dt,
            current_gc: DEFAULT_GUARD_CELLS,
            emf_gc: DEFAULT_GUARD_CELLS,
            smoothing: Smoothing::NONE,
            moving_window: false,
            scheduler: SchedulerConfig::default(),
            species: Vec::new(),
        }
    }

    /// Builder-style species registration.
    pub fn with_species(mut self, species: SpeciesTemplate) -> Self {
        self.species.push(species);
        self
    }

    /// Builder-style scheduler selection.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Builder-style smoothing selection.
    pub fn with_smoothing(mut self, smoothing: Smoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Rows of the smallest region under the even partition.
    pub fn min_region_rows(&self) -> usize {
        partition_rows(self.n_regions, self.grid[1])
            .iter()
            .map(|r| r.len())
            .min()
            .unwrap_or(0)
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Partition.
        if self.n_regions == 0 {
            return Err(ConfigError::NoRegions);
        }
        if self.grid[1] < self.n_regions {
            return Err(ConfigError::DegeneratePartition {
                rows: self.grid[1],
                regions: self.n_regions,
            });
        }
        if self.grid[0] == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        // 2. Physical extent and timestep.
        if self.box_size.iter().any(|&b| !b.is_finite() || b <= 0.0) {
            return Err(ConfigError::InvalidBox {
                box_size: self.box_size,
            });
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        // 3. Guard bands must fit inside every region and the row.
        let region_rows = self.min_region_rows();
        for (buffer, gc) in [("current", self.current_gc), ("emf", self.emf_gc)] {
            let guard_rows = gc[1][0] + gc[1][1];
            if guard_rows > region_rows {
                return Err(ConfigError::GuardCellsExceedRegion {
                    buffer,
                    region_rows,
                    guard_rows,
                });
            }
            let guard_columns = gc[0][0] + gc[0][1];
            if guard_columns > self.grid[0] {
                return Err(ConfigError::GuardCellsExceedColumns {
                    buffer,
                    columns: self.grid[0],
                    guard_columns,
                });
            }
        }
        // 4. Kernel stencils. Divergence correction reads one cell past
        //    every edge of E and B; smoothing reads one column each side.
        if self.emf_gc.iter().flatten().any(|&g| g == 0) {
            return Err(ConfigError::InvalidGuardCells {
                buffer: "emf",
                reason: "every side needs at least one guard cell".to_string(),
            });
        }
        if self.smoothing.is_enabled() {
            if self.smoothing.level == 0 {
                return Err(ConfigError::InvalidSmoothing {
                    smoothing: self.smoothing,
                });
            }
            if self.current_gc[0].contains(&0) {
                return Err(ConfigError::InvalidGuardCells {
                    buffer: "current",
                    reason: "smoothing needs a guard column on each side".to_string(),
                });
            }
        }
        // 5. Scheduler.
        if self.scheduler.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        // 6. Initial particles must lie on the grid.
        for species in &self.species {
            for p in &species.particles {
                let on_grid = p.ix >= 0
                    && (p.ix as usize) < self.grid[0]
                    && p.iy >= 0
                    && (p.iy as usize) < self.grid[1];
                if !on_grid {
                    return Err(ConfigError::ParticleOutsideGrid {
                        species: species.name.clone(),
                        ix: p.ix,
                        iy: p.iy,
                    });
                }
            }
        }
        Ok(())
    }
}
