//! Line-oriented parser for the `H <key>:<value>\n` header block
//! (spec.md §6) and the `LogHeader` state it produces: calibration
//! constants, per-kind frame definitions, and named-field indices.
//! Malformed lines are dropped without failing the overall parse
//! (spec.md §7); the dispatcher logs them at `debug` and moves on.
use std::f32::consts::PI;

use crate::core::{EncodingTag, FirmwareFamily, PredictorTag, Signedness, FIELD_CAP};
use crate::error::HeaderError;

/// Calibration constants read from the header, defaulted per spec.md §9
/// so a session is usable even against a truncated or missing header.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub min_throttle: i32,
    pub max_throttle: i32,
    pub vbat_ref: i32,
    pub vbat_scale: i32,
    pub vbat_mincell: i32,
    pub vbat_warningcell: i32,
    pub vbat_maxcell: i32,
    pub gyro_scale: f32,
    pub acc_1g: i32,
    pub firmware: FirmwareFamily,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            min_throttle: 1150,
            max_throttle: 1850,
            vbat_ref: 4095,
            vbat_scale: 110,
            vbat_mincell: 33,
            vbat_warningcell: 35,
            vbat_maxcell: 43,
            gyro_scale: 0.0,
            acc_1g: 0,
            firmware: FirmwareFamily::Baseflight,
        }
    }
}

/// Per-field-position encoding/predictor table for a single frame kind
/// (spec.md §3). `names` doubles as the source for named-field index
/// resolution (`motor[0]`, `GPS_home[0/1]`).
#[derive(Debug, Default, Clone)]
pub struct FrameDefinition {
    pub names: Vec<String>,
    pub encodings: Vec<EncodingTag>,
    pub predictors: Vec<PredictorTag>,
}

impl FrameDefinition {
    pub fn field_count(&self) -> usize {
        self.names.len()
    }
}

/// I and P frames share field names and signedness (they describe the
/// same telemetry record) but declare separate encoding/predictor tables,
/// matching the header's distinct `Field I *` / `Field P *` keys.
#[derive(Debug, Default, Clone)]
pub struct MainFrameDefinition {
    pub names: Vec<String>,
    pub signedness: Vec<Signedness>,
    pub intra_encodings: Vec<EncodingTag>,
    pub intra_predictors: Vec<PredictorTag>,
    pub inter_encodings: Vec<EncodingTag>,
    pub inter_predictors: Vec<PredictorTag>,
}

impl MainFrameDefinition {
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    pub fn signedness_of(&self, index: usize) -> Signedness {
        self.signedness
            .get(index)
            .copied()
            .unwrap_or(Signedness::Unsigned)
    }
}

/// Frame-rate parameters controlling which iterations are expected to
/// appear in the log (spec.md §4.6).
#[derive(Debug, Clone, Copy)]
pub struct FrameRate {
    pub keyframe_interval: u32,
    pub p_num: u32,
    pub p_denom: u32,
}

impl Default for FrameRate {
    fn default() -> Self {
        Self {
            keyframe_interval: 32,
            p_num: 1,
            p_denom: 1,
        }
    }
}

/// Fully finalized header state, read-only for the rest of the data phase.
#[derive(Debug, Default, Clone)]
pub struct LogHeader {
    pub main: MainFrameDefinition,
    pub gps: FrameDefinition,
    pub gps_home: FrameDefinition,
    pub calibration: Calibration,
    pub frame_rate: FrameRate,
    pub data_version: u32,
    pub motor0_index: Option<usize>,
    /// Whether the navigation-home definition declares enough fields for
    /// `HOME_COORD`/`HOME_COORD_1` to have well-defined targets.
    pub home_fields_resolved: bool,
}

/// Accumulates header lines during the `HEADER` state and produces a
/// `LogHeader` on finalization (spec.md §4.4, §4.8).
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    main_names: Vec<String>,
    main_signed: Vec<Signedness>,
    intra_encodings: Vec<EncodingTag>,
    intra_predictors: Vec<PredictorTag>,
    inter_encodings: Vec<EncodingTag>,
    inter_predictors: Vec<PredictorTag>,
    gps_names: Vec<String>,
    gps_encodings: Vec<EncodingTag>,
    gps_predictors: Vec<PredictorTag>,
    gps_home_names: Vec<String>,
    gps_home_encodings: Vec<EncodingTag>,
    gps_home_predictors: Vec<PredictorTag>,
    frame_rate: FrameRate,
    data_version: u32,
    firmware: FirmwareFamily,
    calibration: Calibration,
    gyro_scale_bits: Option<u32>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self {
            frame_rate: FrameRate {
                keyframe_interval: 32,
                p_num: 1,
                p_denom: 1,
            },
            calibration: Calibration::default(),
            ..Default::default()
        }
    }

    /// Feed one header line's content (everything after `"H "`, without
    /// the trailing newline). Errors are soft: the caller should log and
    /// continue rather than abort the parse.
    pub fn feed_line(&mut self, content: &str) -> Result<(), HeaderError> {
        if content.len() > 1024 {
            return Err(HeaderError::LineTooLong);
        }
        let (key, value) = content.split_once(':').ok_or(HeaderError::MissingSeparator)?;
        match key {
            "Field I name" => self.main_names = split_names(value),
            "Field I signed" => {
                self.main_signed = value
                    .split(',')
                    .map(|s| {
                        if s.trim() == "1" {
                            Signedness::Signed
                        } else {
                            Signedness::Unsigned
                        }
                    })
                    .collect()
            }
            "Field I predictor" => self.intra_predictors = parse_predictor_list(key, value)?,
            "Field I encoding" => self.intra_encodings = parse_encoding_list(key, value)?,
            "Field P predictor" => self.inter_predictors = parse_predictor_list(key, value)?,
            "Field P encoding" => self.inter_encodings = parse_encoding_list(key, value)?,
            "Field G name" => self.gps_names = split_names(value),
            "Field G predictor" => self.gps_predictors = parse_predictor_list(key, value)?,
            "Field G encoding" => self.gps_encodings = parse_encoding_list(key, value)?,
            "Field H name" => self.gps_home_names = split_names(value),
            "Field H predictor" => self.gps_home_predictors = parse_predictor_list(key, value)?,
            "Field H encoding" => self.gps_home_encodings = parse_encoding_list(key, value)?,
            "I interval" => {
                self.frame_rate.keyframe_interval = parse_u32(key, value)?.max(1);
            }
            "P interval" => {
                let (num, denom) = value
                    .split_once('/')
                    .ok_or_else(|| malformed(key, value))?;
                self.frame_rate.p_num = parse_u32(key, num)?;
                self.frame_rate.p_denom = parse_u32(key, denom)?.max(1);
            }
            "Data version" => self.data_version = parse_u32(key, value)?,
            "Firmware type" => {
                self.firmware = if value.trim() == "Cleanflight" {
                    FirmwareFamily::Cleanflight
                } else {
                    FirmwareFamily::Baseflight
                };
            }
            "minthrottle" => self.calibration.min_throttle = parse_i32(key, value)?,
            "maxthrottle" => self.calibration.max_throttle = parse_i32(key, value)?,
            "rcRate" => { /* recognized, not yet consumed by any derived utility */ }
            "vbatscale" => self.calibration.vbat_scale = parse_i32(key, value)?,
            "vbatref" => self.calibration.vbat_ref = parse_i32(key, value)?,
            "vbatcellvoltage" => {
                let mut parts = value.split(',');
                let min = parts.next().ok_or_else(|| malformed(key, value))?;
                let warn = parts.next().ok_or_else(|| malformed(key, value))?;
                let max = parts.next().ok_or_else(|| malformed(key, value))?;
                self.calibration.vbat_mincell = parse_i32(key, min)?;
                self.calibration.vbat_warningcell = parse_i32(key, warn)?;
                self.calibration.vbat_maxcell = parse_i32(key, max)?;
            }
            "gyro.scale" => {
                let digits = value.trim().trim_start_matches("0x").trim_start_matches("0X");
                self.gyro_scale_bits =
                    Some(u32::from_str_radix(digits, 16).map_err(|_| malformed(key, value))?);
            }
            "acc_1G" => self.calibration.acc_1g = parse_i32(key, value)?,
            _ => {
                return Err(HeaderError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Finalize accumulated lines into a read-only `LogHeader`, performing
    /// the HOME_COORD/HOME_COORD_1 pair fix-up (spec.md §4.8) and gyro
    /// scale normalization (spec.md §6).
    pub fn finish(mut self) -> LogHeader {
        fixup_home_coord_pairs(&mut self.gps_predictors);

        let mut gyro_scale = self
            .gyro_scale_bits
            .map(f32::from_bits)
            .unwrap_or(0.0);
        if matches!(self.firmware, FirmwareFamily::Cleanflight) {
            gyro_scale *= PI / 180.0 * 1e-6;
        }
        self.calibration.gyro_scale = gyro_scale;
        self.calibration.firmware = self.firmware;

        let motor0_index = self.main_names.iter().position(|n| n == "motor[0]");
        let home_fields_resolved = self.gps_home_names.len() >= 2;

        LogHeader {
            main: MainFrameDefinition {
                names: self.main_names,
                signedness: self.main_signed,
                intra_encodings: self.intra_encodings,
                intra_predictors: self.intra_predictors,
                inter_encodings: self.inter_encodings,
                inter_predictors: self.inter_predictors,
            },
            gps: FrameDefinition {
                names: self.gps_names,
                encodings: self.gps_encodings,
                predictors: self.gps_predictors,
            },
            gps_home: FrameDefinition {
                names: self.gps_home_names,
                encodings: self.gps_home_encodings,
                predictors: self.gps_home_predictors,
            },
            calibration: self.calibration,
            frame_rate: self.frame_rate,
            data_version: self.data_version,
            motor0_index,
            home_fields_resolved,
        }
    }
}

/// Rewrite the second member of every adjacent `HOME_COORD` pair to
/// `HOME_COORD_1` (spec.md §4.8): the wire format assigns the same
/// predictor tag to both latitude and longitude, but decoding needs
/// distinct tags to pick the right home component.
fn fixup_home_coord_pairs(predictors: &mut [PredictorTag]) {
    let mut i = 0;
    while i + 1 < predictors.len() {
        if predictors[i] == PredictorTag::HomeCoord && predictors[i + 1] == PredictorTag::HomeCoord
        {
            predictors[i + 1] = PredictorTag::HomeCoord1;
            i += 2;
        } else {
            i += 1;
        }
    }
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .take(FIELD_CAP)
        .map(|s| s.trim().to_string())
        .collect()
}

fn malformed(key: &str, value: &str) -> HeaderError {
    HeaderError::MalformedValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, HeaderError> {
    value.trim().parse().map_err(|_| malformed(key, value))
}

fn parse_i32(key: &str, value: &str) -> Result<i32, HeaderError> {
    value.trim().parse().map_err(|_| malformed(key, value))
}

fn parse_encoding_list(key: &str, value: &str) -> Result<Vec<EncodingTag>, HeaderError> {
    value
        .split(',')
        .take(FIELD_CAP)
        .map(|s| {
            let tag: u32 = s.trim().parse().map_err(|_| malformed(key, value))?;
            Ok(EncodingTag::from_header_value(tag))
        })
        .collect()
}

fn parse_predictor_list(key: &str, value: &str) -> Result<Vec<PredictorTag>, HeaderError> {
    value
        .split(',')
        .take(FIELD_CAP)
        .map(|s| {
            let tag: u32 = s.trim().parse().map_err(|_| malformed(key, value))?;
            Ok(PredictorTag::from_header_value(tag))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_names_and_signedness() {
        let mut b = HeaderBuilder::new();
        b.feed_line("Field I name:loopIteration,time,motor[0]").unwrap();
        b.feed_line("Field I signed:0,0,1").unwrap();
        let header = b.finish();
        assert_eq!(header.main.names, vec!["loopIteration", "time", "motor[0]"]);
        assert_eq!(header.motor0_index, Some(2));
        assert_eq!(header.main.signedness_of(2), Signedness::Signed);
    }

    #[test]
    fn cleanflight_gyro_scale_is_normalized() {
        let mut b = HeaderBuilder::new();
        b.feed_line("Firmware type:Cleanflight").unwrap();
        b.feed_line("gyro.scale:0x3727c5ac").unwrap();
        let header = b.finish();
        let raw = f32::from_bits(0x3727c5ac);
        let expected = raw * PI / 180.0 * 1e-6;
        assert!((header.calibration.gyro_scale - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn baseflight_gyro_scale_is_unmodified() {
        let mut b = HeaderBuilder::new();
        b.feed_line("gyro.scale:0x3727c5ac").unwrap();
        let header = b.finish();
        assert_eq!(header.calibration.gyro_scale, f32::from_bits(0x3727c5ac));
    }

    #[test]
    fn home_coord_pair_fixup_rewrites_second_of_each_pair() {
        let mut predictors = vec![
            PredictorTag::HomeCoord,
            PredictorTag::HomeCoord,
            PredictorTag::Zero,
            PredictorTag::HomeCoord,
            PredictorTag::HomeCoord,
        ];
        fixup_home_coord_pairs(&mut predictors);
        assert_eq!(
            predictors,
            vec![
                PredictorTag::HomeCoord,
                PredictorTag::HomeCoord1,
                PredictorTag::Zero,
                PredictorTag::HomeCoord,
                PredictorTag::HomeCoord1,
            ]
        );
    }

    #[test]
    fn malformed_line_is_reported_but_does_not_panic() {
        let mut b = HeaderBuilder::new();
        assert!(b.feed_line("no separator here").is_err());
    }

    #[test]
    fn vbatcellvoltage_splits_three_fields() {
        let mut b = HeaderBuilder::new();
        b.feed_line("vbatcellvoltage:33,35,43").unwrap();
        let header = b.finish();
        assert_eq!(header.calibration.vbat_mincell, 33);
        assert_eq!(header.calibration.vbat_warningcell, 35);
        assert_eq!(header.calibration.vbat_maxcell, 43);
    }

    #[test]
    fn unrecognized_numeric_tag_is_carried_not_dropped() {
        let mut b = HeaderBuilder::new();
        // A well-formed line naming a real tag alongside one this decoder
        // doesn't implement must not be rejected outright — only decoding a
        // field against the unrecognized tag is fatal, not declaring it.
        b.feed_line("Field I name:loopIteration,weirdField").unwrap();
        b.feed_line("Field I signed:0,0").unwrap();
        b.feed_line("Field I encoding:1,99").unwrap();
        b.feed_line("Field I predictor:0,42").unwrap();
        let header = b.finish();
        assert_eq!(
            header.main.intra_encodings,
            vec![EncodingTag::UnsignedVb, EncodingTag::Unknown(99)]
        );
        assert_eq!(
            header.main.intra_predictors,
            vec![PredictorTag::Zero, PredictorTag::Unknown(42)]
        );
    }
}
