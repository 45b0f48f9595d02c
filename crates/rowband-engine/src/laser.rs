//! External field injection.
//!
//! Injection runs between timesteps with exclusive access to the ring, so
//! it bypasses the task graph and walks the ring directly.

use rowband_core::{KernelError, StepError};
use tracing::{debug, warn};

use crate::collab::FieldSource;
use crate::driver::Domain;
use crate::ring::RegionRing;

const APPLY: &str = "Add Laser";
const GUARD_REFRESH: &str = "Add Laser Guard Refresh";

impl Domain {
    /// Add `source` to every region's field, then restore guard cells and
    /// the column divergence of E and B.
    ///
    /// Three passes run after the source, each over the whole ring before
    /// the next starts: row guard refresh, column divergence correction,
    /// and a combined row and column guard refresh.
    pub fn add_laser(&mut self, source: &dyn FieldSource) -> Result<(), StepError> {
        if self.is_disabled() {
            return Err(StepError::Disabled);
        }
        let result = inject(&mut self.ring, source);
        if let Err(error) = &result {
            self.disable();
            warn!(%error, source = source.name(), "field injection failed; advancing disabled");
        }
        result
    }
}

fn inject(ring: &mut RegionRing, source: &dyn FieldSource) -> Result<(), StepError> {
    let order: Vec<usize> = ring.walk().collect();

    for &i in &order {
        let region = ring.region_mut(i);
        let id = region.id();
        let row_offset = region.limits_y().start;
        source
            .apply(region.emf_mut(), row_offset)
            .map_err(|reason| StepError::StageFailed {
                stage: APPLY,
                region: id,
                reason,
            })?;
    }
    debug!(source = source.name(), regions = order.len(), "source applied");

    refresh_rows(ring, &order)?;
    for &i in &order {
        ring.region_mut(i).emf_mut().div_corr_x();
    }
    refresh_rows(ring, &order)?;
    for &i in &order {
        ring.region_mut(i).emf_mut().update_gc_x();
    }
    debug!(source = source.name(), "guard cells and divergence restored");
    Ok(())
}

fn refresh_rows(ring: &mut RegionRing, order: &[usize]) -> Result<(), StepError> {
    for &i in order {
        let prev = ring.prev(i);
        let (local, below) = ring.pair_mut(i, prev);
        let id = local.id();
        local
            .emf_mut()
            .update_gc_y(below.map(|r| r.emf_mut()))
            .map_err(|e| StepError::StageFailed {
                stage: GUARD_REFRESH,
                region: id,
                reason: KernelError::from(e),
            })?;
    }
    Ok(())
}
