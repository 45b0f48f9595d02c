//! Current smoothing configuration.

/// Filter applied to the current after the row reduction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmoothKind {
    /// No smoothing; the smoothing stages are skipped entirely.
    #[default]
    None,
    /// `level` passes of the `[1/4, 1/2, 1/4]` binomial filter.
    Binomial,
    /// Binomial passes followed by one compensator pass that restores the
    /// long-wavelength response.
    Compensated,
}

/// Smoothing settings for a region's current.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Smoothing {
    /// Filter family.
    pub kind: SmoothKind,
    /// Number of binomial passes. Must be at least 1 unless `kind` is
    /// [`SmoothKind::None`].
    pub level: u32,
}

impl Smoothing {
    /// No smoothing.
    pub const NONE: Self = Self {
        kind: SmoothKind::None,
        level: 0,
    };

    /// `level` binomial passes.
    pub fn binomial(level: u32) -> Self {
        Self {
            kind: SmoothKind::Binomial,
            level,
        }
    }

    /// `level` binomial passes plus compensation.
    pub fn compensated(level: u32) -> Self {
        Self {
            kind: SmoothKind::Compensated,
            level,
        }
    }

    /// Whether any filtering happens.
    pub fn is_enabled(&self) -> bool {
        self.kind != SmoothKind::None
    }

    /// Stencil weights `(a, b)` of the compensator `[a, b, a]`.
    ///
    /// Chosen so that `level` binomial passes followed by this pass have
    /// unit gain and a flat response to second order.
    pub fn compensator(&self) -> (f32, f32) {
        let n = self.level.max(1) as f32;
        let a = -1.0;
        let b = (4.0 + 2.0 * n) / n;
        let total = 2.0 * a + b;
        (a / total, b / total)
    }
}
