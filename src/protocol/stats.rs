//! Per-field and per-frame-kind running statistics (spec.md §3, §4.7).
use crate::core::{FrameKind, Signedness, MAX_FRAME_LENGTH};

/// Running min/max for one field position, signed or unsigned per the
/// field's declared signedness.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStat {
    min: i32,
    max: i32,
    initialized: bool,
}

impl FieldStat {
    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Tighten min/max by signed or unsigned comparison (spec.md §4.7).
    /// The very first validated frame seeds both bounds.
    pub fn update(&mut self, value: i32, signedness: Signedness) {
        if !self.initialized {
            self.min = value;
            self.max = value;
            self.initialized = true;
            return;
        }
        let less_than = |a: i32, b: i32| match signedness {
            Signedness::Signed => a < b,
            Signedness::Unsigned => (a as u32) < (b as u32),
        };
        if less_than(value, self.min) {
            self.min = value;
        }
        if less_than(self.max, value) {
            self.max = value;
        }
    }
}

/// Per-frame-kind valid/corrupt/desync counts, cumulative bytes, and a
/// size histogram (spec.md §3).
#[derive(Debug, Clone)]
pub struct FrameKindStats {
    pub valid: u64,
    pub corrupt: u64,
    pub desync: u64,
    pub bytes: u64,
    size_histogram: Vec<u64>,
}

impl Default for FrameKindStats {
    fn default() -> Self {
        Self {
            valid: 0,
            corrupt: 0,
            desync: 0,
            bytes: 0,
            size_histogram: vec![0; MAX_FRAME_LENGTH + 1],
        }
    }
}

impl FrameKindStats {
    pub fn record_size(&mut self, len: usize) {
        if let Some(slot) = self.size_histogram.get_mut(len) {
            *slot += 1;
        }
    }

    pub fn size_histogram(&self) -> &[u64] {
        &self.size_histogram
    }
}

fn kind_index(kind: FrameKind) -> usize {
    match kind {
        FrameKind::Intra => 0,
        FrameKind::Inter => 1,
        FrameKind::Gps => 2,
        FrameKind::GpsHome => 3,
        FrameKind::Event => 4,
    }
}

/// Aggregate statistics for one session's decode run.
#[derive(Debug, Clone)]
pub struct Stats {
    field_stats: Vec<FieldStat>,
    kinds: [FrameKindStats; 5],
    pub total_bytes: u64,
    pub total_corrupt_frames: u64,
    pub intentionally_absent_iterations: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            field_stats: Vec::new(),
            kinds: [
                FrameKindStats::default(),
                FrameKindStats::default(),
                FrameKindStats::default(),
                FrameKindStats::default(),
                FrameKindStats::default(),
            ],
            total_bytes: 0,
            total_corrupt_frames: 0,
            intentionally_absent_iterations: 0,
        }
    }
}

impl Stats {
    pub fn for_kind(&self, kind: FrameKind) -> &FrameKindStats {
        &self.kinds[kind_index(kind)]
    }

    pub fn for_kind_mut(&mut self, kind: FrameKind) -> &mut FrameKindStats {
        &mut self.kinds[kind_index(kind)]
    }

    pub fn field(&self, index: usize) -> Option<&FieldStat> {
        self.field_stats.get(index)
    }

    /// Tighten per-field min/max against a validated main-stream record
    /// (spec.md §4.7). Invalid frames must never reach this call.
    pub fn update_fields(&mut self, values: &[i32], signedness: &[Signedness]) {
        if self.field_stats.len() < values.len() {
            self.field_stats.resize(values.len(), FieldStat::default());
        }
        for (i, &value) in values.iter().enumerate() {
            let sign = signedness.get(i).copied().unwrap_or(Signedness::Unsigned);
            self.field_stats[i].update(value, sign);
        }
    }

    pub fn record_corrupt_frame(&mut self, kind: FrameKind, len: usize) {
        let kind_stats = self.for_kind_mut(kind);
        kind_stats.corrupt += 1;
        kind_stats.bytes += len as u64;
        self.total_corrupt_frames += 1;
    }

    pub fn record_valid_frame(&mut self, kind: FrameKind, len: usize) {
        let kind_stats = self.for_kind_mut(kind);
        kind_stats.valid += 1;
        kind_stats.bytes += len as u64;
        kind_stats.record_size(len);
    }
}
