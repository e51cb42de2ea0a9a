//! Applies one of the ~10 prediction rules to a freshly decoded residual,
//! turning it into an absolute field value (spec.md §4.3). Modeled as a
//! pure function taking explicit context rather than a method on a
//! stateful object, mirroring the teacher's `sign_extend`/`pgn_value_to_*`
//! free-function style in `infra/codec/engine/mod.rs`.
use crate::core::{PredictorTag, Signedness};
use crate::error::DecodeError;
use crate::protocol::header::Calibration;

/// Everything a predictor might need besides the residual itself.
pub struct PredictorContext<'a> {
    pub current: &'a [i32],
    pub previous: Option<&'a [i32]>,
    pub previous_previous: Option<&'a [i32]>,
    pub published_home: Option<[i32; 2]>,
    pub motor0_index: Option<usize>,
    /// Whether the navigation-home frame definition declared at least two
    /// fields, making `HOME_COORD`/`HOME_COORD_1` well-defined targets.
    /// Distinct from "home published yet" (a soft, runtime validity flag
    /// the frame-ready callback carries) — this is a header-time
    /// configuration check (spec.md §7's fatal "unresolved reference").
    pub home_fields_resolved: bool,
    pub calibration: &'a Calibration,
    /// Number of iterations the resync filter judged intentionally absent
    /// immediately before this frame (spec.md §4.5/§4.6), used by INCREMENT.
    pub skipped_iterations: u32,
    /// Raw mode treats every predictor as ZERO while still consuming the
    /// encoded residual (spec.md §4.3).
    pub raw: bool,
}

fn previous_value(previous: Option<&[i32]>, index: usize) -> i32 {
    previous.and_then(|p| p.get(index).copied()).unwrap_or(0)
}

/// Apply `predictor` to `residual` for field `index`, producing the
/// absolute value to store. All additions wrap in 32-bit arithmetic,
/// matching the wire format's wraparound semantics (spec.md §4.3).
pub fn apply(
    predictor: PredictorTag,
    residual: i32,
    index: usize,
    signedness: Signedness,
    ctx: &PredictorContext,
) -> Result<i32, DecodeError> {
    // INCREMENT bypasses the wire encoding entirely (spec.md §4.3): it never
    // had a residual to begin with, so raw mode has nothing to disable here.
    if ctx.raw && predictor != PredictorTag::Increment {
        return Ok(residual);
    }

    match predictor {
        PredictorTag::Zero => Ok(residual),
        PredictorTag::Previous => Ok(residual.wrapping_add(previous_value(ctx.previous, index))),
        PredictorTag::StraightLine => {
            let p = previous_value(ctx.previous, index);
            let pp = previous_value(ctx.previous_previous, index);
            let prediction = p.wrapping_mul(2).wrapping_sub(pp);
            Ok(residual.wrapping_add(prediction))
        }
        PredictorTag::Average2 => {
            let p = previous_value(ctx.previous, index);
            let pp = previous_value(ctx.previous_previous, index);
            // Sum wraps as a plain u32 *before* the signed cast, matching
            // the original's `uint32_t` accumulator: overflow changes which
            // value the division truncates toward.
            let sum = (p as u32).wrapping_add(pp as u32);
            let mean = match signedness {
                Signedness::Signed => (sum as i32) / 2,
                Signedness::Unsigned => (sum / 2) as i32,
            };
            Ok(residual.wrapping_add(mean))
        }
        PredictorTag::MinThrottle => Ok(residual.wrapping_add(ctx.calibration.min_throttle)),
        PredictorTag::Fixed1500 => Ok(residual.wrapping_add(1500)),
        PredictorTag::VbatRef => Ok(residual.wrapping_add(ctx.calibration.vbat_ref)),
        PredictorTag::Motor0 => {
            let Some(motor0) = ctx.motor0_index else {
                return Err(DecodeError::UnresolvedReference {
                    predictor: PredictorTag::Motor0,
                });
            };
            let motor0_value = ctx.current.get(motor0).copied().unwrap_or(0);
            Ok(residual.wrapping_add(motor0_value))
        }
        PredictorTag::HomeCoord => {
            if !ctx.home_fields_resolved {
                return Err(DecodeError::UnresolvedReference {
                    predictor: PredictorTag::HomeCoord,
                });
            }
            let home = ctx.published_home.unwrap_or([0, 0]);
            Ok(residual.wrapping_add(home[0]))
        }
        PredictorTag::HomeCoord1 => {
            if !ctx.home_fields_resolved {
                return Err(DecodeError::UnresolvedReference {
                    predictor: PredictorTag::HomeCoord1,
                });
            }
            let home = ctx.published_home.unwrap_or([0, 0]);
            Ok(residual.wrapping_add(home[1]))
        }
        PredictorTag::Increment => {
            let p = previous_value(ctx.previous, index);
            Ok(p
                .wrapping_add(1)
                .wrapping_add(ctx.skipped_iterations as i32))
        }
        PredictorTag::Unknown(_) => Err(DecodeError::UnknownPredictor(predictor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::Calibration;

    fn ctx(calibration: &Calibration) -> PredictorContext {
        PredictorContext {
            current: &[],
            previous: None,
            previous_previous: None,
            published_home: None,
            motor0_index: None,
            home_fields_resolved: false,
            calibration,
            skipped_iterations: 0,
            raw: false,
        }
    }

    #[test]
    fn previous_with_no_history_leaves_residual_unchanged() {
        let cal = Calibration::default();
        let out = apply(PredictorTag::Previous, 42, 0, Signedness::Signed, &ctx(&cal)).unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn straight_line_extrapolates_with_wrapping_arithmetic() {
        let cal = Calibration::default();
        let previous = [100i32];
        let previous_previous = [40i32];
        let mut c = ctx(&cal);
        c.previous = Some(&previous);
        c.previous_previous = Some(&previous_previous);
        // out = r + 2p - pp
        let out = apply(PredictorTag::StraightLine, 5, 0, Signedness::Signed, &c).unwrap();
        assert_eq!(out, 5 + 2 * 100 - 40);
    }

    #[test]
    fn increment_ignores_residual_and_adds_skipped_count() {
        let cal = Calibration::default();
        let previous = [10i32];
        let mut c = ctx(&cal);
        c.previous = Some(&previous);
        c.skipped_iterations = 3;
        let out = apply(PredictorTag::Increment, 9999, 0, Signedness::Unsigned, &c).unwrap();
        assert_eq!(out, 10 + 1 + 3);
    }

    #[test]
    fn motor0_without_resolved_index_is_fatal() {
        let cal = Calibration::default();
        let c = ctx(&cal);
        let err = apply(PredictorTag::Motor0, 0, 0, Signedness::Signed, &c).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnresolvedReference {
                predictor: PredictorTag::Motor0
            }
        ));
    }

    #[test]
    fn home_coord_without_resolved_fields_is_fatal() {
        let cal = Calibration::default();
        let c = ctx(&cal);
        let err = apply(PredictorTag::HomeCoord, 0, 0, Signedness::Signed, &c).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnresolvedReference {
                predictor: PredictorTag::HomeCoord
            }
        ));
    }

    #[test]
    fn raw_mode_treats_every_predictor_as_zero() {
        let cal = Calibration::default();
        let mut c = ctx(&cal);
        c.raw = true;
        let out = apply(PredictorTag::VbatRef, 7, 0, Signedness::Signed, &c).unwrap();
        assert_eq!(out, 7);
    }
}
