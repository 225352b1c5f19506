//! Display-only progress estimate and the independent completion check.

use crate::modes::{IuouStage, Lifecycle, ModeKind};

/// Share of the bar covered by the bulk stage
const BULK_SHARE: f64 = 70.0;
/// Share covered by absorption, on top of bulk
const ABSORPTION_SHARE: f64 = 25.0;
/// CV taper is assumed to run from 5.0 A down to this (A)
const CV_TAPER_END: f64 = 0.5;
const CV_TAPER_SPAN: f64 = 4.5;
/// Trickle is maintenance and never "finishes"
const TRICKLE_PROGRESS: f64 = 50.0;

/// Estimate progress as a percentage, 0 to 100.
///
/// Pulse progress is elapsed time against the runaway limit, not against
/// the configured cycle count.
#[allow(clippy::too_many_arguments)]
pub fn estimate_progress(
    mode: ModeKind,
    stage: Option<IuouStage>,
    current: f64,
    voltage: f64,
    target_voltage: f64,
    absorption_current_threshold: f64,
    elapsed: f64,
    max_charging_duration: f64,
) -> f64 {
    match mode {
        ModeKind::Iuou => match stage {
            Some(IuouStage::Bulk) => {
                if target_voltage > 0.0 {
                    (voltage / target_voltage).min(1.0) * BULK_SHARE
                } else {
                    0.0
                }
            }
            Some(IuouStage::Absorption) => {
                if absorption_current_threshold > 0.0 {
                    let start_current = absorption_current_threshold * 10.0;
                    let taper = 1.0 - (current / start_current).min(1.0);
                    BULK_SHARE + taper * ABSORPTION_SHARE
                } else {
                    BULK_SHARE
                }
            }
            Some(IuouStage::Float) => 100.0,
            None => 0.0,
        },
        ModeKind::Cv => {
            if current > CV_TAPER_END {
                let taper = 1.0 - (current - CV_TAPER_END) / CV_TAPER_SPAN;
                (taper * 100.0).clamp(0.0, 100.0)
            } else {
                100.0
            }
        }
        ModeKind::Pulse => {
            if max_charging_duration > 0.0 {
                (elapsed / max_charging_duration * 100.0).min(100.0)
            } else {
                0.0
            }
        }
        ModeKind::Trickle => TRICKLE_PROGRESS,
        ModeKind::Cc | ModeKind::Conditioning => 0.0,
    }
}

/// Completion signal independent of the mode's own lifecycle and the plateau
/// detector: a completed mode, or a CV charge whose current has tapered.
pub fn is_charging_complete(
    mode: ModeKind,
    current: f64,
    state: Lifecycle,
    min_current: f64,
) -> bool {
    state == Lifecycle::Completed || (mode == ModeKind::Cv && current < min_current)
}
