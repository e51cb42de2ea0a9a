//! Shared data-model types: frame kinds, encodings, predictors, and the
//! fixed-size limits that keep the decoder's state on the stack rather
//! than the heap.

/// Upper bound on the number of fields a single frame kind can declare.
/// Mirrors the original's `FLIGHT_LOG_MAX_FIELDS`; generous for any real
/// firmware header while keeping history-ring slots fixed-size arrays.
pub const FIELD_CAP: usize = 128;

/// Upper bound on the number of sessions enumerated from one input file.
pub const MAX_SESSIONS: usize = 64;

/// A frame longer than this is corrupt by definition (spec.md §4.4).
pub const MAX_FRAME_LENGTH: usize = 256;

/// Exact byte sequence that opens every session.
pub const LOG_START_MARKER: &[u8] =
    b"H Product:Blackbox flight data recorder by Nicholas Sherlock\n";

/// Single-byte frame-kind markers as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Keyframe: self-contained anchor record.
    Intra,
    /// Delta frame: residuals relative to prior records.
    Inter,
    /// Navigation update.
    Gps,
    /// Navigation home reference.
    GpsHome,
    /// Discrete event.
    Event,
}

impl FrameKind {
    /// Map a wire marker byte to its frame kind, if recognized.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'I' => Some(Self::Intra),
            b'P' => Some(Self::Inter),
            b'G' => Some(Self::Gps),
            b'H' => Some(Self::GpsHome),
            b'E' => Some(Self::Event),
            _ => None,
        }
    }

    /// The wire marker byte for this frame kind.
    pub fn marker(self) -> u8 {
        match self {
            Self::Intra => b'I',
            Self::Inter => b'P',
            Self::Gps => b'G',
            Self::GpsHome => b'H',
            Self::Event => b'E',
        }
    }
}

/// The seven field encodings a frame definition may name for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingTag {
    SignedVb,
    UnsignedVb,
    Neg14Bit,
    Tag8_4S16V1,
    Tag8_4S16V2,
    Tag2_3S32,
    Tag8_8Svb,
    Null,
    /// A numeric tag the header declared that this decoder doesn't
    /// implement. Carried through rather than rejected at header-parse
    /// time, since a frame definition naming it is still well-formed — it's
    /// only fatal once a field actually decodes against it (spec.md §7).
    Unknown(u32),
}

impl EncodingTag {
    /// Header-declared encoding identifiers, matching the original's
    /// `FLIGHT_LOG_FIELD_ENCODING_*` numeric tags. Infallible: an
    /// unrecognized tag becomes `Unknown` rather than failing the line.
    pub fn from_header_value(value: u32) -> Self {
        match value {
            0 => Self::SignedVb,
            1 => Self::UnsignedVb,
            3 => Self::Neg14Bit,
            6 => Self::Tag8_4S16V1,
            7 => Self::Tag2_3S32,
            8 => Self::Tag8_8Svb,
            9 => Self::Null,
            10 => Self::Tag8_4S16V2,
            other => Self::Unknown(other),
        }
    }

    /// Number of field positions this encoding consumes as a group.
    /// Scalar encodings report 1; grouped encodings report their natural
    /// group size (the parser still caps the run at however many adjacent
    /// positions actually share the tag).
    pub fn group_size(self) -> usize {
        match self {
            Self::Tag8_4S16V1 | Self::Tag8_4S16V2 => 4,
            Self::Tag2_3S32 => 3,
            Self::Tag8_8Svb => 8,
            _ => 1,
        }
    }
}

/// The ten prediction rules (plus the synthesized `HomeCoord1`) a frame
/// definition may name for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorTag {
    Zero,
    Previous,
    StraightLine,
    Average2,
    MinThrottle,
    Fixed1500,
    VbatRef,
    Motor0,
    HomeCoord,
    /// Synthesized during header finalization (spec.md §4.8); never present
    /// on the wire.
    HomeCoord1,
    Increment,
    /// A numeric tag the header declared that this decoder doesn't
    /// implement. See `EncodingTag::Unknown` for why this is carried
    /// through instead of rejected at header-parse time.
    Unknown(u32),
}

impl PredictorTag {
    /// Header-declared predictor identifiers, matching the original's
    /// `FLIGHT_LOG_FIELD_PREDICTOR_*` numeric tags. Infallible: an
    /// unrecognized tag becomes `Unknown` rather than failing the line.
    pub fn from_header_value(value: u32) -> Self {
        match value {
            0 => Self::Zero,
            1 => Self::Previous,
            2 => Self::StraightLine,
            3 => Self::Average2,
            4 => Self::MinThrottle,
            5 => Self::Motor0,
            6 => Self::Increment,
            7 => Self::HomeCoord,
            8 => Self::Fixed1500,
            9 => Self::VbatRef,
            other => Self::Unknown(other),
        }
    }
}

/// Whether a field's 32-bit storage should be interpreted signed or
/// unsigned for comparisons, statistics, and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Flight-controller firmware family; changes how some header values
/// (notably `gyro.scale`) are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareFamily {
    Cleanflight,
    #[default]
    Baseflight,
}
