//! The per-timestep task pipeline.
//!
//! [`Domain`] owns the region ring, the collaborators and the task graph.
//! The graph is built once: one task per region per stage, stages in
//! their fixed order, regions in ring-walk order, each task annotated
//! with its declared footprint. Every [`advance`](Domain::advance) hands
//! that graph to the configured scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rowband_core::{KernelError, Particle, RowRange, StepError, StepId};
use rowband_task::{Access, BufferKind, Scheduler, Stage, TaskGraph, TaskNode};
use tracing::{debug, debug_span, warn};

use crate::collab::{FieldSolver, PushContext, SpeciesPusher};
use crate::config::{ConfigError, DomainConfig};
use crate::footprint::{current_layout, declare_footprint, emf_layout};
use crate::linker::{link_boundaries, RingLinkage};
use crate::metrics::StepMetrics;
use crate::ring::RegionRing;
use crate::scope::{Extent, TaskScope};
use crate::species::{SpeciesStore, FROM_ABOVE, FROM_BELOW};

// ── Domain ────────────────────────────────────────────────────────

/// A region-decomposed simulation domain.
pub struct Domain {
    pub(crate) ring: RegionRing,
    pusher: Box<dyn SpeciesPusher>,
    solver: Box<dyn FieldSolver>,
    scheduler: Scheduler,
    graph: TaskGraph,
    critical_path: usize,
    smoothing: bool,
    dt: f32,
    step: StepId,
    disabled: bool,
    last_metrics: StepMetrics,
}

impl Domain {
    /// Build, link and validate a domain.
    ///
    /// Fails if the configuration is invalid or if `config.dt` exceeds the
    /// `max_dt` of either collaborator.
    pub fn new(
        config: DomainConfig,
        pusher: Box<dyn SpeciesPusher>,
        solver: Box<dyn FieldSolver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_dt(
            config.dt,
            &[
                (pusher.name(), pusher.max_dt()),
                (solver.name(), solver.max_dt()),
            ],
        )?;

        let mut ring = RegionRing::build(&config)?;
        link_boundaries(&mut ring);

        let smoothing = config.smoothing.is_enabled();
        let graph = build_graph(&ring, smoothing);
        let critical_path = graph.waves().len();
        let scheduler = config.scheduler.scheduler();
        debug!(
            regions = ring.len(),
            tasks = graph.len(),
            dependencies = graph.edge_count(),
            critical_path,
            workers = scheduler.worker_count(),
            "domain ready"
        );

        Ok(Self {
            ring,
            pusher,
            solver,
            scheduler,
            graph,
            critical_path,
            smoothing,
            dt: config.dt,
            step: StepId(0),
            disabled: false,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Advance every region by one timestep.
    ///
    /// On failure the ring is left mid-timestep and advancing is disabled
    /// until [`reset_failure`](Self::reset_failure) is called.
    pub fn advance(&mut self) -> Result<StepMetrics, StepError> {
        if self.disabled {
            return Err(StepError::Disabled);
        }
        let span = debug_span!("timestep", step = self.step.0);
        let _entered = span.enter();
        let start = Instant::now();

        let migrated = AtomicUsize::new(0);
        let stages = StageRunner {
            ring: &self.ring,
            pusher: &*self.pusher,
            solver: &*self.solver,
            migrated: &migrated,
        };
        let result = self.scheduler.run(&self.graph, |_, node| {
            stages.run(node).map_err(|reason| StepError::StageFailed {
                stage: node.stage.label(),
                region: node.region,
                reason,
            })
        });

        match result {
            Ok(report) => {
                let mut per_stage = [0u64; Stage::ALL.len()];
                for (node, us) in self.graph.nodes().iter().zip(&report.task_us) {
                    per_stage[node.stage.index()] += us;
                }
                let metrics = StepMetrics {
                    total_us: start.elapsed().as_micros() as u64,
                    task_count: report.tasks_run,
                    dependency_count: self.graph.edge_count(),
                    critical_path: self.critical_path,
                    stage_us: Stage::ALL
                        .iter()
                        .filter(|s| self.smoothing || !s.is_smoothing())
                        .map(|s| (s.label(), per_stage[s.index()]))
                        .collect(),
                    migrated_particles: migrated.load(Ordering::Relaxed),
                };
                self.step = StepId(self.step.0 + 1);
                self.last_metrics = metrics.clone();
                Ok(metrics)
            }
            Err(failure) => {
                self.disabled = true;
                warn!(
                    error = %failure.error,
                    task = failure.task,
                    "timestep failed; advancing disabled"
                );
                Err(failure.error)
            }
        }
    }

    /// Re-enable advancing after a failed timestep.
    ///
    /// Ring state is whatever the failed timestep left behind.
    pub fn reset_failure(&mut self) {
        self.disabled = false;
    }

    /// Whether advancing is disabled after a failure.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn disable(&mut self) {
        self.disabled = true;
    }

    /// Number of completed timesteps.
    pub fn step_id(&self) -> StepId {
        self.step
    }

    /// Timestep.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Metrics of the most recent successful timestep.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The region ring.
    pub fn ring(&self) -> &RegionRing {
        &self.ring
    }

    /// The per-timestep task graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// The scheduler executing the graph.
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    /// Snapshot of the boundary linkage.
    pub fn linkage(&self) -> RingLinkage {
        RingLinkage::capture(&self.ring)
    }

    /// Link boundaries again. Linking is idempotent, so this never
    /// changes a linked ring.
    pub fn relink(&mut self) {
        link_boundaries(&mut self.ring);
    }

    /// Switch every region to moving-window mode: column reductions and
    /// column ghost refreshes are skipped from now on.
    pub fn set_moving_window(&mut self) {
        let order: Vec<usize> = self.ring.walk().collect();
        for i in order {
            let region = self.ring.region_mut(i);
            region.current_mut().set_moving_window();
            region.emf_mut().set_moving_window();
            for species in region.species_mut() {
                species.set_moving_window();
            }
        }
        debug!("moving window enabled");
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("regions", &self.ring.len())
            .field("pusher", &self.pusher.name())
            .field("solver", &self.solver.name())
            .field("scheduler", &self.scheduler)
            .field("tasks", &self.graph.len())
            .field("step", &self.step)
            .field("disabled", &self.disabled)
            .finish()
    }
}

fn check_dt(dt: f32, limits: &[(&str, Option<f32>)]) -> Result<(), ConfigError> {
    let tightest = limits
        .iter()
        .filter_map(|&(name, max)| max.map(|m| (name, m)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((name, max_dt)) = tightest {
        if !max_dt.is_finite() || max_dt <= 0.0 {
            return Err(ConfigError::InvalidDt { value: max_dt });
        }
        if dt > max_dt {
            return Err(ConfigError::DtTooLarge {
                configured_dt: dt,
                max_supported: max_dt,
                constraining: name.to_string(),
            });
        }
    }
    Ok(())
}

/// One task per region per stage, stages in order, regions in walk order.
pub fn build_graph(ring: &RegionRing, smoothing: bool) -> TaskGraph {
    let mut nodes = Vec::new();
    for stage in Stage::ALL {
        if stage.is_smoothing() && !smoothing {
            continue;
        }
        for i in ring.walk() {
            nodes.push(TaskNode {
                stage,
                region: ring.region(i).id(),
                footprint: declare_footprint(stage, i, ring),
            });
        }
    }
    TaskGraph::build(nodes)
}

// ── Stage work ────────────────────────────────────────────────────

struct StageRunner<'a> {
    ring: &'a RegionRing,
    pusher: &'a dyn SpeciesPusher,
    solver: &'a dyn FieldSolver,
    migrated: &'a AtomicUsize,
}

impl StageRunner<'_> {
    fn run(&self, node: &TaskNode) -> Result<(), KernelError> {
        let i = node.region.index();
        let scope = TaskScope::new(self.ring, &node.footprint);
        match node.stage {
            Stage::SpecAdvance => self.spec_advance(i, &scope),
            Stage::SpecUpdate => self.spec_update(i, &scope),
            Stage::CurrentReductionY => self.current_rows(i, &scope, RowOp::Reduce),
            Stage::CurrentSmoothX => {
                let whole = Extent::new(0, current_layout(self.ring, i).total);
                scope.current(i, whole, Access::ReadWrite).smooth_x();
                Ok(())
            }
            Stage::CurrentUpdateGc => self.current_rows(i, &scope, RowOp::Refresh),
            Stage::EmfAdvance => self.emf_advance(i, &scope),
            Stage::EmfUpdateGc => self.emf_update_gc(i, &scope),
        }
    }

    fn spec_advance(&self, i: usize, scope: &TaskScope<'_>) -> Result<(), KernelError> {
        let ring = self.ring;
        let region = ring.region(i);
        let limits = region.limits_y();
        let rows = ring.grid()[1] as i32;

        let mut current = scope.current(
            i,
            Extent::new(0, current_layout(ring, i).total),
            Access::ReadWrite,
        );
        let emf = scope.emf(i, Extent::new(0, emf_layout(ring, i).total), Access::Read);
        current.zero();

        for (s, species) in region.species().iter().enumerate() {
            let routes = species.routes().ok_or_else(|| KernelError::ExecutionFailed {
                reason: format!("species '{}' has no migration routes", species.params().name),
            })?;
            let (up, down) = {
                let mut store = scope.main(i, s, Access::ReadWrite);
                let SpeciesStore {
                    particles,
                    departed,
                } = &mut *store;
                self.pusher.push(PushContext {
                    region: region.id(),
                    limits_y: limits,
                    grid: ring.grid(),
                    species: s,
                    params: species.params(),
                    particles: particles.as_mut_slice(),
                    emf: &emf,
                    current: &mut current,
                })?;
                route_leavers(particles.as_mut_slice(), departed, limits, rows)
            };
            self.deliver(scope, routes.up, s, FROM_BELOW, &up)?;
            self.deliver(scope, routes.down, s, FROM_ABOVE, &down)?;
            self.migrated
                .fetch_add(up.len() + down.len(), Ordering::Relaxed);
        }

        current.reduce_x();
        if let Some(idx) = current.grid().first_nan() {
            return Err(KernelError::NanDetected {
                buffer: "current",
                cell_index: Some(idx),
            });
        }
        Ok(())
    }

    /// Append `batch` to inbox `slot` of region `target`.
    fn deliver(
        &self,
        scope: &TaskScope<'_>,
        target: usize,
        species: usize,
        slot: usize,
        batch: &[Particle],
    ) -> Result<(), KernelError> {
        if batch.is_empty() {
            return Ok(());
        }
        let limits = self.ring.region(target).limits_y();
        if let Some(p) = batch.iter().find(|p| !limits.contains(p.iy)) {
            return Err(KernelError::ExecutionFailed {
                reason: format!(
                    "particle reached row {} which region {target} ({limits}) does not own; \
                     it moved further than one region in one timestep",
                    p.iy
                ),
            });
        }
        scope
            .inbox(target, species, slot, Access::Write)
            .extend_from_slice(batch)?;
        Ok(())
    }

    fn spec_update(&self, i: usize, scope: &TaskScope<'_>) -> Result<(), KernelError> {
        for s in 0..self.ring.region(i).n_species() {
            let mut store = scope.main(i, s, Access::ReadWrite);
            let SpeciesStore {
                particles,
                departed,
            } = &mut *store;
            particles.compact(departed);
            for slot in [FROM_BELOW, FROM_ABOVE] {
                let mut inbox = scope.inbox(i, s, slot, Access::ReadWrite);
                particles.extend_from_slice(inbox.as_slice())?;
                inbox.clear();
            }
        }
        Ok(())
    }

    fn current_rows(&self, i: usize, scope: &TaskScope<'_>, op: RowOp) -> Result<(), KernelError> {
        let prev = self.ring.prev(i);
        let local = current_layout(self.ring, i);
        let below = current_layout(self.ring, prev);
        let own = Extent::new(0, local.band);
        let mirror = Extent::new(below.mirror_offset(), local.band);

        if prev == i {
            scope.check(i, BufferKind::Current, mirror, Access::ReadWrite);
            let mut current = scope.current(i, own, Access::ReadWrite);
            match op {
                RowOp::Reduce => current.reduce_y(None)?,
                RowOp::Refresh => current.update_gc_y(None)?,
            }
        } else {
            let (mut current, mut upper) =
                scope.current_pair(i, own, prev, mirror, Access::ReadWrite);
            match op {
                RowOp::Reduce => current.reduce_y(Some(&mut *upper))?,
                RowOp::Refresh => current.update_gc_y(Some(&mut *upper))?,
            }
        }
        Ok(())
    }

    fn emf_advance(&self, i: usize, scope: &TaskScope<'_>) -> Result<(), KernelError> {
        let current = scope.current(
            i,
            Extent::new(0, current_layout(self.ring, i).total),
            Access::Read,
        );
        let mut emf = scope.emf(
            i,
            Extent::new(0, emf_layout(self.ring, i).total),
            Access::ReadWrite,
        );
        self.solver.advance(&mut emf, &current)?;
        // Columns first, so the rows EmfUpdateGc copies carry fresh guard
        // columns.
        emf.update_gc_x();
        emf.count_advance();
        if let Some((field, idx)) = emf.first_nan() {
            return Err(KernelError::NanDetected {
                buffer: field,
                cell_index: Some(idx),
            });
        }
        Ok(())
    }

    fn emf_update_gc(&self, i: usize, scope: &TaskScope<'_>) -> Result<(), KernelError> {
        let prev = self.ring.prev(i);
        let local = emf_layout(self.ring, i);
        let below = emf_layout(self.ring, prev);
        let own = Extent::new(0, local.band);
        let mirror = Extent::new(below.mirror_offset(), local.band);

        if prev == i {
            scope.check(i, BufferKind::EmfE, mirror, Access::ReadWrite);
            scope.check(i, BufferKind::EmfB, mirror, Access::ReadWrite);
            scope.emf(i, own, Access::ReadWrite).update_gc_y(None)?;
        } else {
            let (mut emf, mut upper) = scope.emf_pair(i, own, prev, mirror, Access::ReadWrite);
            emf.update_gc_y(Some(&mut *upper))?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum RowOp {
    Reduce,
    Refresh,
}

/// Move every particle whose row left `limits` out of `particles`.
///
/// Leavers get their row wrapped onto the grid, their index recorded in
/// `departed`, and a copy returned in `(upward, downward)`.
fn route_leavers(
    particles: &mut [Particle],
    departed: &mut Vec<usize>,
    limits: RowRange,
    rows: i32,
) -> (Vec<Particle>, Vec<Particle>) {
    let mut up = Vec::new();
    let mut down = Vec::new();
    for (idx, p) in particles.iter_mut().enumerate() {
        if limits.contains(p.iy) {
            continue;
        }
        let upward = i64::from(p.iy) >= limits.end as i64;
        p.iy = p.iy.rem_euclid(rows);
        departed.push(idx);
        if upward {
            up.push(*p);
        } else {
            down.push(*p);
        }
    }
    (up, down)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchedulerConfig, SpeciesTemplate};
    use rowband_core::Vec3;
    use rowband_grid::{Current, Emf};

    /// Moves every particle by a fixed row velocity, no deposit.
    struct Drift(f32);

    impl SpeciesPusher for Drift {
        fn name(&self) -> &str {
            "drift"
        }

        fn push(&self, ctx: PushContext<'_>) -> Result<(), KernelError> {
            for p in ctx.particles.iter_mut() {
                let y = p.iy as f32 + p.y + self.0;
                let iy = y.floor();
                p.iy = iy as i32;
                p.y = y - iy;
            }
            Ok(())
        }
    }

    struct Idle;

    impl FieldSolver for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn max_dt(&self) -> Option<f32> {
            Some(0.5)
        }

        fn advance(&self, _emf: &mut Emf, _current: &Current) -> Result<(), KernelError> {
            Ok(())
        }
    }

    struct Poison;

    impl FieldSolver for Poison {
        fn name(&self) -> &str {
            "poison"
        }

        fn advance(&self, emf: &mut Emf, _current: &Current) -> Result<(), KernelError> {
            emf.e_mut().set(0, 0, Vec3::new(f32::NAN, 0.0, 0.0));
            Ok(())
        }
    }

    fn config(particles: Vec<Particle>) -> DomainConfig {
        DomainConfig::new(4, [8, 100], [8.0, 100.0], 0.1)
            .with_scheduler(SchedulerConfig::SERIAL)
            .with_species(SpeciesTemplate::new("e", -1.0, [1, 1]).with_particles(particles))
    }

    #[test]
    fn route_leavers_wraps_and_splits() {
        let mut ps = vec![
            Particle::at(0.0, 10.0),
            Particle::at(0.0, 25.3),
            Particle::at(0.0, -0.5),
        ];
        let mut departed = Vec::new();
        let (up, down) = route_leavers(&mut ps, &mut departed, RowRange::new(0, 25), 100);
        assert_eq!(departed, vec![1, 2]);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].iy, 25);
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].iy, 99);
    }

    #[test]
    fn graph_has_one_task_per_region_per_stage() {
        let domain = Domain::new(config(Vec::new()), Box::new(Drift(0.0)), Box::new(Idle)).unwrap();
        assert_eq!(domain.graph().len(), 4 * 5);
        let smoothed = config(Vec::new()).with_smoothing(rowband_grid::Smoothing::binomial(1));
        let domain = Domain::new(smoothed, Box::new(Drift(0.0)), Box::new(Idle)).unwrap();
        assert_eq!(domain.graph().len(), 4 * 7);
    }

    #[test]
    fn field_refreshes_run_side_by_side() {
        let cfg = DomainConfig::new(8, [8, 96], [8.0, 96.0], 0.1)
            .with_species(SpeciesTemplate::new("e", -1.0, [1, 1]));
        let domain = Domain::new(cfg, Box::new(Drift(0.0)), Box::new(Idle)).unwrap();
        let graph = domain.graph();
        let at = |stage: Stage, r: usize| {
            graph
                .nodes()
                .iter()
                .position(|n| n.stage == stage && n.region.index() == r)
                .unwrap()
        };
        for r in 0..8 {
            let refresh = at(Stage::EmfUpdateGc, r);
            for other in 0..8 {
                let o = at(Stage::EmfUpdateGc, other);
                assert!(!graph.has_edge(refresh, o), "refresh {r} -> refresh {other}");
            }
            let prev = domain.ring().prev(r);
            assert!(graph.depends_on(refresh, at(Stage::EmfAdvance, r)));
            assert!(graph.depends_on(refresh, at(Stage::EmfAdvance, prev)));
        }
    }

    #[test]
    fn dt_above_solver_limit_rejected() {
        let mut cfg = config(Vec::new());
        cfg.dt = 0.6;
        match Domain::new(cfg, Box::new(Drift(0.0)), Box::new(Idle)) {
            Err(ConfigError::DtTooLarge { constraining, .. }) => assert_eq!(constraining, "idle"),
            other => panic!("expected DtTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn particle_crossing_boundary_changes_region() {
        let cfg = config(vec![Particle::at(1.5, 24.9)]);
        let mut domain = Domain::new(cfg, Box::new(Drift(0.4)), Box::new(Idle)).unwrap();
        let metrics = domain.advance().unwrap();
        assert_eq!(metrics.migrated_particles, 1);
        assert_eq!(domain.ring().region(0).particle_count(), 0);
        let moved = domain.ring().region(1).species()[0].particles();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].iy, 25);
        assert!((moved[0].row_position() - 25.3).abs() < 1e-4);
    }

    #[test]
    fn nan_in_field_disables_advancing() {
        let mut domain =
            Domain::new(config(Vec::new()), Box::new(Drift(0.0)), Box::new(Poison)).unwrap();
        match domain.advance() {
            Err(StepError::StageFailed { stage, reason, .. }) => {
                assert_eq!(stage, "EMF Advance");
                assert!(matches!(reason, KernelError::NanDetected { buffer: "E", .. }));
            }
            other => panic!("expected StageFailed, got {other:?}"),
        }
        assert!(domain.is_disabled());
        assert_eq!(domain.advance().unwrap_err(), StepError::Disabled);
        domain.reset_failure();
        assert!(!domain.is_disabled());
    }

    #[test]
    fn step_counter_and_metrics() {
        let mut domain =
            Domain::new(config(Vec::new()), Box::new(Drift(0.0)), Box::new(Idle)).unwrap();
        domain.advance().unwrap();
        domain.advance().unwrap();
        assert_eq!(domain.step_id(), StepId(2));
        let m = domain.last_metrics();
        assert_eq!(m.task_count, 20);
        assert_eq!(m.stage_us.len(), 5);
        assert_eq!(m.dependency_count, domain.graph().edge_count());
    }
}
