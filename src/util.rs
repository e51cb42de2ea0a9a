//! Small derived utilities exposed alongside the decoder (spec.md §6),
//! grounded on the original's `flightLogVbatToMillivolts` and
//! `flightLogEstimateNumCells`. Kept as free functions over `Calibration`
//! rather than methods, matching `protocol::predictor`'s pure-function style.
use crate::protocol::header::Calibration;

/// Convert a raw ADC battery-voltage reading into millivolts.
pub fn vbat_to_millivolts(vbat: i32, calibration: &Calibration) -> i32 {
    (i64::from(vbat) * 330 * i64::from(calibration.vbat_scale) / 4095) as i32
}

/// Estimate the number of battery cells from the calibrated reference
/// voltage: the smallest cell count whose full-charge voltage would
/// exceed the reference reading, capped at 7 for anything implausibly high.
pub fn estimate_num_cells(calibration: &Calibration) -> i32 {
    let reference_decivolts = vbat_to_millivolts(calibration.vbat_ref, calibration) / 100;
    for cells in 1..=6 {
        if reference_decivolts < cells * calibration.vbat_maxcell {
            return cells;
        }
    }
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vbat_conversion_matches_reference_formula() {
        let cal = Calibration::default();
        assert_eq!(vbat_to_millivolts(4095, &cal), 4095 * 330 * 110 / 4095);
    }

    #[test]
    fn single_cell_reference_estimates_one_cell() {
        let mut cal = Calibration::default();
        cal.vbat_ref = 127; // ~1023 mV at the default scale, well under one cell's max
        assert_eq!(estimate_num_cells(&cal), 1);
    }

    #[test]
    fn implausibly_high_reference_caps_at_seven_cells() {
        let mut cal = Calibration::default();
        cal.vbat_ref = i32::MAX / 1000;
        assert_eq!(estimate_num_cells(&cal), 7);
    }
}
