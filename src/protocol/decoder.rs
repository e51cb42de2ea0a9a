//! The frame dispatcher and resynchronization state machine (spec.md §4.4)
//! — the part of this crate the original specification calls out as "the
//! subject of this specification." Ported field-for-field from the
//! original's `flightLogParse`: a `HEADER`/`DATA` state machine that is
//! always one frame behind, validating a frame only once the byte that
//! follows it is known to be a recognized marker (or a clean end of
//! input). A corrupt frame is reported exactly once and the cursor
//! relocks onto the next good marker by scanning forward byte by byte
//! from just past the corrupt frame's start, mirroring the teacher's
//! `FastPacketAssembler` corruption-recovery style of resetting to a
//! known-good point rather than aborting.
use tracing::{debug, info, warn};

use crate::core::{EncodingTag, FrameKind, PredictorTag, Signedness, FIELD_CAP, MAX_FRAME_LENGTH};
use crate::error::DecodeError;
use crate::infra::codec::{
    read_neg_14bit, read_signed_vb, read_tag2_3s32, read_tag8_4s16_v1, read_tag8_4s16_v2,
    read_tag8_8svb, read_unsigned_vb,
};
use crate::infra::cursor::Cursor;
use crate::protocol::event::{parse_event, EventKind, EventSlot};
use crate::protocol::header::{Calibration, FrameRate, HeaderBuilder, LogHeader};
use crate::protocol::history::{FieldRecord, MainHistory, NavHistory, NavHomeHistory};
use crate::protocol::predictor::{self, PredictorContext};
use crate::protocol::stats::Stats;
use crate::sink::{FrameEvent, FrameSink};

/// Decode one session's worth of bytes, delivering callbacks to `sink` and
/// returning the finalized header plus accumulated statistics. The only
/// failures returned here are the two fatal classes from spec.md §7
/// (unresolved cross-field reference, unknown encoding/predictor tag);
/// everything else is folded into `Stats` and the sink's callbacks.
pub fn parse(data: &[u8], raw: bool, sink: &mut dyn FrameSink) -> Result<(LogHeader, Stats), DecodeError> {
    let mut decoder = Decoder::new(raw);
    decoder.run(data, sink)?;
    Ok((decoder.header, decoder.stats))
}

/// Bundles the context a field decode needs besides the residual and its
/// own index: history slices, cross-field references, and calibration.
/// Threaded explicitly rather than read off `self` so `decode_fields` can
/// stay a free function shared by the main/navigation/home parsers.
struct FieldContext<'a> {
    previous: Option<&'a [i32]>,
    previous_previous: Option<&'a [i32]>,
    published_home: Option<[i32; 2]>,
    motor0_index: Option<usize>,
    home_fields_resolved: bool,
    calibration: &'a Calibration,
    skipped_iterations: u32,
    raw: bool,
}

struct Decoder {
    header: LogHeader,
    main: MainHistory,
    nav_home: NavHomeHistory,
    nav: NavHistory,
    event: EventSlot,
    stats: Stats,
    max_iteration: Option<i32>,
    max_timestamp: Option<i32>,
    raw: bool,
}

impl Decoder {
    fn new(raw: bool) -> Self {
        Self {
            header: LogHeader::default(),
            main: MainHistory::default(),
            nav_home: NavHomeHistory::default(),
            nav: NavHistory::default(),
            event: EventSlot::default(),
            stats: Stats::default(),
            max_iteration: None,
            max_timestamp: None,
            raw,
        }
    }

    fn published_home(&self) -> Option<[i32; 2]> {
        if self.nav_home.valid {
            Some([
                self.nav_home.published.get(0).unwrap_or(0),
                self.nav_home.published.get(1).unwrap_or(0),
            ])
        } else {
            None
        }
    }

    fn run(&mut self, data: &[u8], sink: &mut dyn FrameSink) -> Result<(), DecodeError> {
        let mut cursor = Cursor::new(data);
        self.run_header(&mut cursor, sink);
        self.run_data(&mut cursor, sink)
    }

    /// HEADER state (spec.md §4.4): forward `"H "`-prefixed lines to the
    /// header parser, tolerate pre-stream garbage, and stop as soon as a
    /// byte matches a known frame-kind marker — including `'H'` itself
    /// when it is *not* followed by a space, since that is the
    /// navigation-home marker rather than a header line.
    fn run_header(&mut self, cursor: &mut Cursor, sink: &mut dyn FrameSink) {
        let mut builder = HeaderBuilder::new();
        let mut line = String::new();
        loop {
            let Some(b) = cursor.read_byte() else {
                self.finalize_header(builder, sink);
                return;
            };
            if b == b'H' {
                match cursor.read_byte() {
                    Some(b' ') => {
                        line.clear();
                        loop {
                            match cursor.read_byte() {
                                Some(b'\n') | None => break,
                                Some(c) => line.push(c as char),
                            }
                        }
                        if let Err(err) = builder.feed_line(&line) {
                            debug!(%err, line = %line, "dropping malformed header line");
                        }
                    }
                    Some(_) => {
                        cursor.unread_byte().ok();
                        cursor.unread_byte().ok();
                        self.finalize_header(builder, sink);
                        return;
                    }
                    None => {
                        self.finalize_header(builder, sink);
                        return;
                    }
                }
            } else if FrameKind::from_marker(b).is_some() {
                cursor.unread_byte().ok();
                self.finalize_header(builder, sink);
                return;
            }
        }
    }

    fn finalize_header(&mut self, builder: HeaderBuilder, sink: &mut dyn FrameSink) {
        self.header = builder.finish();
        info!(fields = self.header.main.field_count(), "header finalized");
        sink.on_metadata_ready(&self.header);
    }

    /// DATA state (spec.md §4.4): one frame behind. Each marker candidate
    /// first settles the previous frame's fate, then (if it is itself a
    /// known marker) starts the next one.
    fn run_data(&mut self, cursor: &mut Cursor, sink: &mut dyn FrameSink) -> Result<(), DecodeError> {
        let mut next_marker = cursor.read_byte();

        while let Some(marker) = next_marker {
            match FrameKind::from_marker(marker) {
                Some(kind) => {
                    let start = cursor.position() - 1;
                    self.parse_frame(kind, cursor)?;
                    let premature_eof = cursor.at_eof();
                    let length = cursor.position() - start;

                    let candidate = cursor.read_byte();
                    let marker_known = candidate.and_then(FrameKind::from_marker).is_some();
                    let clean_eof = candidate.is_none();
                    let well_formed =
                        !premature_eof && length <= MAX_FRAME_LENGTH && (marker_known || clean_eof);

                    if well_formed {
                        self.complete_frame(kind, start, length, sink);
                        next_marker = candidate;
                    } else {
                        self.corrupt_frame(Some(kind), start, length, sink);
                        next_marker = self.resync(cursor, start);
                    }
                }
                None => {
                    let start = cursor.position() - 1;
                    self.corrupt_frame(None, start, 1, sink);
                    next_marker = self.resync(cursor, start);
                }
            }
        }

        self.stats.total_bytes = cursor.position() as u64;
        Ok(())
    }

    /// Relock onto the next recognizable marker after a corrupt frame,
    /// scanning one byte at a time from just past the corrupt frame's own
    /// start so an embedded next-good marker is never skipped over.
    fn resync(&self, cursor: &mut Cursor, corrupt_start: usize) -> Option<u8> {
        cursor.seek(corrupt_start + 1);
        loop {
            let b = cursor.read_byte()?;
            if FrameKind::from_marker(b).is_some() {
                return Some(b);
            }
        }
    }

    fn parse_frame(&mut self, kind: FrameKind, cursor: &mut Cursor) -> Result<(), DecodeError> {
        match kind {
            FrameKind::Intra => self.parse_main(cursor, true),
            FrameKind::Inter => self.parse_main(cursor, false),
            FrameKind::Gps => self.parse_gps(cursor),
            FrameKind::GpsHome => self.parse_gps_home(cursor),
            FrameKind::Event => {
                self.event.kind = Some(parse_event(cursor));
                Ok(())
            }
        }
    }

    fn parse_main(&mut self, cursor: &mut Cursor, is_intra: bool) -> Result<(), DecodeError> {
        let field_count = self.header.main.field_count();
        let (encodings, predictors) = if is_intra {
            (&self.header.main.intra_encodings, &self.header.main.intra_predictors)
        } else {
            (&self.header.main.inter_encodings, &self.header.main.inter_predictors)
        };

        let previous_iteration = self.main.previous.get(0);
        let skipped = compute_skipped_iterations(previous_iteration, &self.header.frame_rate);
        self.stats.intentionally_absent_iterations += u64::from(skipped);

        let ctx = FieldContext {
            previous: Some(self.main.previous.as_slice()),
            previous_previous: Some(self.main.previous_previous.as_slice()),
            published_home: None,
            motor0_index: self.header.motor0_index,
            home_fields_resolved: self.header.home_fields_resolved,
            calibration: &self.header.calibration,
            skipped_iterations: skipped,
            raw: self.raw,
        };

        let signedness = &self.header.main.signedness;
        let values = decode_fields(cursor, field_count, encodings, predictors, &ctx, |i| {
            signedness.get(i).copied().unwrap_or(Signedness::Unsigned)
        })?;

        self.main.current = FieldRecord::from_slice(&values[..field_count]);
        Ok(())
    }

    fn parse_gps(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let field_count = self.header.gps.field_count();
        let encodings = &self.header.gps.encodings;
        let predictors = &self.header.gps.predictors;

        let ctx = FieldContext {
            previous: Some(self.nav.last.as_slice()),
            previous_previous: None,
            published_home: self.published_home(),
            motor0_index: self.header.motor0_index,
            home_fields_resolved: self.header.home_fields_resolved,
            calibration: &self.header.calibration,
            skipped_iterations: 0,
            raw: self.raw,
        };

        let values = decode_fields(cursor, field_count, encodings, predictors, &ctx, |_| {
            Signedness::Unsigned
        })?;

        self.nav.last = FieldRecord::from_slice(&values[..field_count]);
        Ok(())
    }

    fn parse_gps_home(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let field_count = self.header.gps_home.field_count();
        let encodings = &self.header.gps_home.encodings;
        let predictors = &self.header.gps_home.predictors;

        let ctx = FieldContext {
            previous: Some(self.nav_home.published.as_slice()),
            previous_previous: None,
            published_home: None,
            motor0_index: self.header.motor0_index,
            home_fields_resolved: self.header.home_fields_resolved,
            calibration: &self.header.calibration,
            skipped_iterations: 0,
            raw: self.raw,
        };

        let values = decode_fields(cursor, field_count, encodings, predictors, &ctx, |_| {
            Signedness::Unsigned
        })?;

        self.nav_home.unpublished = FieldRecord::from_slice(&values[..field_count]);
        Ok(())
    }

    fn complete_frame(&mut self, kind: FrameKind, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        match kind {
            FrameKind::Intra => self.complete_intra(offset, length, sink),
            FrameKind::Inter => self.complete_inter(offset, length, sink),
            FrameKind::Gps => self.complete_gps(offset, length, sink),
            FrameKind::GpsHome => self.complete_gps_home(offset, length, sink),
            FrameKind::Event => self.complete_event(offset, length, sink),
        }
    }

    /// spec.md §4.5 Keyframe completion: accept only if the iteration and
    /// timestamp are non-decreasing against the running maximum, update
    /// per-field statistics *before* rotating history (spec.md §9 pins
    /// this ordering), then collapse both history slots onto this frame.
    fn complete_intra(&mut self, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        let record = self.main.current;
        let values = record.as_slice();
        let iteration = values.first().copied().unwrap_or(0);
        let timestamp = values.get(1).copied().unwrap_or(0);
        let sign0 = self.header.main.signedness_of(0);
        let sign1 = self.header.main.signedness_of(1);
        let valid = self.raw
            || (meets_floor(iteration, self.max_iteration, sign0)
                && meets_floor(timestamp, self.max_timestamp, sign1));

        if valid {
            self.stats.update_fields(values, &self.header.main.signedness);
            self.max_iteration = Some(iteration);
            self.max_timestamp = Some(timestamp);
            self.main.valid = true;
        } else {
            warn!(iteration, timestamp, "keyframe regression, invalidating stream");
            self.main.invalidate();
        }

        self.stats.record_valid_frame(FrameKind::Intra, length);
        let event = FrameEvent {
            marker: FrameKind::Intra.marker(),
            kind: Some(FrameKind::Intra),
            valid,
            fields: Some(values),
            offset,
            length,
        };
        sink.on_frame_ready(&event);

        if valid {
            self.main.rotate_after_intra();
        }
    }

    /// spec.md §4.5 Delta-frame completion: never re-validates an already
    /// invalid stream.
    fn complete_inter(&mut self, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        let record = self.main.current;
        let values = record.as_slice();
        let valid = self.main.valid;

        if valid {
            self.stats.update_fields(values, &self.header.main.signedness);
        } else {
            self.stats.for_kind_mut(FrameKind::Inter).desync += 1;
        }

        self.stats.record_valid_frame(FrameKind::Inter, length);
        let event = FrameEvent {
            marker: FrameKind::Inter.marker(),
            kind: Some(FrameKind::Inter),
            valid,
            fields: Some(values),
            offset,
            length,
        };
        sink.on_frame_ready(&event);

        if valid {
            self.main.rotate_after_inter();
        }
    }

    fn complete_gps(&mut self, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        self.stats.record_valid_frame(FrameKind::Gps, length);
        let values = self.nav.last;
        let event = FrameEvent {
            marker: FrameKind::Gps.marker(),
            kind: Some(FrameKind::Gps),
            valid: self.nav_home.valid,
            fields: Some(values.as_slice()),
            offset,
            length,
        };
        sink.on_frame_ready(&event);
    }

    fn complete_gps_home(&mut self, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        self.nav_home.publish();
        self.stats.record_valid_frame(FrameKind::GpsHome, length);
        let values = self.nav_home.published;
        let event = FrameEvent {
            marker: FrameKind::GpsHome.marker(),
            kind: Some(FrameKind::GpsHome),
            valid: true,
            fields: Some(values.as_slice()),
            offset,
            length,
        };
        sink.on_frame_ready(&event);
    }

    fn complete_event(&mut self, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        self.stats.record_valid_frame(FrameKind::Event, length);
        if let Some(kind) = self.event.kind {
            if kind != EventKind::None {
                sink.on_event(&kind);
            }
        }
        let event = FrameEvent {
            marker: FrameKind::Event.marker(),
            kind: Some(FrameKind::Event),
            valid: true,
            fields: Some(&[]),
            offset,
            length,
        };
        sink.on_frame_ready(&event);
    }

    /// spec.md §4.4 step 4: one corrupt notification per corrupt span,
    /// regardless of which kind (or no kind, for a wholly unrecognized
    /// marker byte) the span carried.
    fn corrupt_frame(&mut self, kind: Option<FrameKind>, offset: usize, length: usize, sink: &mut dyn FrameSink) {
        self.main.invalidate();
        match kind {
            Some(k) => self.stats.record_corrupt_frame(k, length),
            None => self.stats.total_corrupt_frames += 1,
        }
        let marker = kind.map(FrameKind::marker).unwrap_or(0);
        warn!(marker, offset, length, "corrupt frame, resyncing");
        let event = FrameEvent {
            marker,
            kind,
            valid: false,
            fields: None,
            offset,
            length,
        };
        sink.on_frame_ready(&event);
    }
}

fn meets_floor(value: i32, floor: Option<i32>, signedness: Signedness) -> bool {
    let Some(floor) = floor else { return true };
    match signedness {
        Signedness::Signed => value >= floor,
        Signedness::Unsigned => (value as u32) >= (floor as u32),
    }
}

/// spec.md §4.6, corrected formulation: `(idx mod I + P_num − 1) mod
/// P_denom < P_num`. Computed in `i64` so `P_num == 0` never underflows a
/// `u32` subtraction.
pub fn should_have_frame(idx: i64, frame_rate: &FrameRate) -> bool {
    let interval = i64::from(frame_rate.keyframe_interval).max(1);
    let num = i64::from(frame_rate.p_num);
    let denom = i64::from(frame_rate.p_denom).max(1);
    (idx % interval + num - 1).rem_euclid(denom) < num
}

/// spec.md §4.5: count iterations starting at `previous + 1` that the
/// rate filter judges intentionally absent, stopping at the first one
/// that should be present. `bound` guards against the filter's
/// documented non-periodicity (spec.md §9) pathologically never
/// returning true for a malformed header.
fn compute_skipped_iterations(previous_iteration: Option<i32>, frame_rate: &FrameRate) -> u32 {
    let Some(prev) = previous_iteration else {
        return 0;
    };
    let bound = i64::from(frame_rate.keyframe_interval.max(frame_rate.p_denom)) * 2 + 64;
    let mut k = i64::from(prev) + 1;
    let mut skipped: u32 = 0;
    let mut steps = 0i64;
    while !should_have_frame(k, frame_rate) {
        skipped += 1;
        k += 1;
        steps += 1;
        if steps >= bound {
            break;
        }
    }
    skipped
}

/// spec.md §4.2 grouping: look ahead for a run of adjacent field
/// positions sharing a grouped encoding tag, capped at the tag's natural
/// group size, decode that run, and apply each lane's predictor in turn.
fn decode_fields(
    cursor: &mut Cursor,
    field_count: usize,
    encodings: &[EncodingTag],
    predictors: &[PredictorTag],
    ctx: &FieldContext,
    signedness_of: impl Fn(usize) -> Signedness,
) -> Result<[i32; FIELD_CAP], DecodeError> {
    let mut values = [0i32; FIELD_CAP];
    let mut i = 0;
    while i < field_count {
        // INCREMENT bypasses the encoder entirely (spec.md §4.3): the field
        // was never written to the wire, so it must never consume a byte,
        // encoded-group membership or not. Checked against the group's
        // anchor index only, matching the original's single-field-at-a-time
        // predictor check ahead of its encoding dispatch.
        if predictors.get(i).copied() == Some(PredictorTag::Increment) {
            let signedness = signedness_of(i);
            let field_ctx = PredictorContext {
                current: &values[..i],
                previous: ctx.previous,
                previous_previous: ctx.previous_previous,
                published_home: ctx.published_home,
                motor0_index: ctx.motor0_index,
                home_fields_resolved: ctx.home_fields_resolved,
                calibration: ctx.calibration,
                skipped_iterations: ctx.skipped_iterations,
                raw: ctx.raw,
            };
            values[i] = predictor::apply(PredictorTag::Increment, 0, i, signedness, &field_ctx)?;
            i += 1;
            continue;
        }

        let encoding = encodings.get(i).copied().unwrap_or(EncodingTag::Null);
        let natural = encoding.group_size();
        let mut run = 1;
        while natural > 1
            && run < natural
            && i + run < field_count
            && encodings.get(i + run).copied() == Some(encoding)
        {
            run += 1;
        }

        let residuals = decode_residuals(cursor, encoding, run)?;

        for (lane, &residual) in residuals.iter().enumerate().take(run) {
            let index = i + lane;
            let predictor = predictors.get(index).copied().unwrap_or(PredictorTag::Zero);
            let signedness = signedness_of(index);
            let field_ctx = PredictorContext {
                current: &values[..index],
                previous: ctx.previous,
                previous_previous: ctx.previous_previous,
                published_home: ctx.published_home,
                motor0_index: ctx.motor0_index,
                home_fields_resolved: ctx.home_fields_resolved,
                calibration: ctx.calibration,
                skipped_iterations: ctx.skipped_iterations,
                raw: ctx.raw,
            };
            values[index] = predictor::apply(predictor, residual, index, signedness, &field_ctx)?;
        }

        i += run;
    }
    Ok(values)
}

/// Read one group's worth of residuals from the wire. `TAG8_4S16`/
/// `TAG2_3S32` always decode their full natural-size group (their bit
/// layouts are fixed-width); `TAG8_8SVB` is told the actual run since its
/// header-byte layout is genuinely variable-width (spec.md §4.2).
fn decode_residuals(cursor: &mut Cursor, encoding: EncodingTag, run: usize) -> Result<[i32; 8], DecodeError> {
    let mut out = [0i32; 8];
    match encoding {
        EncodingTag::Null => {}
        EncodingTag::SignedVb => out[0] = read_signed_vb(cursor)?,
        EncodingTag::UnsignedVb => out[0] = read_unsigned_vb(cursor)? as i32,
        EncodingTag::Neg14Bit => out[0] = read_neg_14bit(cursor)?,
        EncodingTag::Tag8_4S16V1 => out[..4].copy_from_slice(&read_tag8_4s16_v1(cursor)?),
        EncodingTag::Tag8_4S16V2 => out[..4].copy_from_slice(&read_tag8_4s16_v2(cursor)?),
        EncodingTag::Tag2_3S32 => out[..3].copy_from_slice(&read_tag2_3s32(cursor)?),
        EncodingTag::Tag8_8Svb => out = read_tag8_8svb(cursor, run)?,
        EncodingTag::Unknown(_) => return Err(DecodeError::UnknownEncoding(encoding)),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_unsigned_vb(mut n: u32, out: &mut Vec<u8>) {
        loop {
            let mut byte = (n & 0x7F) as u8;
            n >>= 7;
            if n != 0 {
                byte |= 0x80;
                out.push(byte);
            } else {
                out.push(byte);
                break;
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        metadata_seen: bool,
        frames: Vec<(u8, bool, Vec<i32>)>,
    }

    impl FrameSink for RecordingSink {
        fn on_metadata_ready(&mut self, _header: &LogHeader) {
            self.metadata_seen = true;
        }

        fn on_frame_ready(&mut self, event: &FrameEvent) {
            self.frames.push((
                event.marker,
                event.valid,
                event.fields.map(|f| f.to_vec()).unwrap_or_default(),
            ));
        }
    }

    #[test]
    fn should_have_frame_is_always_true_at_unity_rate() {
        let rate = FrameRate { keyframe_interval: 32, p_num: 1, p_denom: 1 };
        for idx in 0..64 {
            assert!(should_have_frame(idx, &rate));
        }
    }

    #[test]
    fn should_have_frame_keeps_half_at_one_half_rate() {
        let rate = FrameRate { keyframe_interval: 32, p_num: 1, p_denom: 2 };
        let kept = (0..32).filter(|&idx| should_have_frame(idx, &rate)).count();
        assert_eq!(kept, 16);
    }

    #[test]
    fn skipped_iterations_is_zero_at_unity_rate() {
        let rate = FrameRate::default();
        assert_eq!(compute_skipped_iterations(Some(5), &rate), 0);
    }

    #[test]
    fn skipped_iterations_is_zero_with_no_previous() {
        let rate = FrameRate::default();
        assert_eq!(compute_skipped_iterations(None, &rate), 0);
    }

    fn header_lines() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"H Field I name:loopIteration,time\n");
        data.extend_from_slice(b"H Field I signed:0,0\n");
        data.extend_from_slice(b"H Field I predictor:0,0\n");
        data.extend_from_slice(b"H Field I encoding:1,1\n");
        data
    }

    #[test]
    fn single_keyframe_round_trips_through_zero_predictors() {
        let mut data = header_lines();
        data.push(b'I');
        encode_unsigned_vb(100, &mut data);
        encode_unsigned_vb(2000, &mut data);

        let mut sink = RecordingSink::default();
        let (header, stats) = parse(&data, false, &mut sink).unwrap();

        assert!(sink.metadata_seen);
        assert_eq!(header.main.field_count(), 2);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0], (b'I', true, vec![100, 2000]));
        assert_eq!(stats.for_kind(FrameKind::Intra).valid, 1);
        assert_eq!(stats.total_corrupt_frames, 0);
    }

    #[test]
    fn single_garbage_byte_produces_exactly_one_corrupt_notification() {
        let mut data = header_lines();
        data.push(b'I');
        encode_unsigned_vb(1, &mut data);
        encode_unsigned_vb(10, &mut data);
        data.push(0xFF);
        data.push(b'I');
        encode_unsigned_vb(2, &mut data);
        encode_unsigned_vb(20, &mut data);

        let mut sink = RecordingSink::default();
        let (_header, stats) = parse(&data, false, &mut sink).unwrap();

        assert_eq!(stats.total_corrupt_frames, 1);
    }

    #[test]
    fn truncated_trailing_frame_is_reported_corrupt() {
        let mut data = header_lines();
        data.push(b'I');
        encode_unsigned_vb(1, &mut data);
        // second field's varint is missing entirely: cursor hits EOF mid-frame.

        let mut sink = RecordingSink::default();
        let (_header, stats) = parse(&data, false, &mut sink).unwrap();

        assert_eq!(stats.total_corrupt_frames, 1);
        assert_eq!(stats.for_kind(FrameKind::Intra).valid, 0);
    }

    #[test]
    fn increment_field_never_reads_a_wire_byte() {
        let mut data = Vec::new();
        data.extend_from_slice(b"H Field I name:loopIteration,counter\n");
        data.extend_from_slice(b"H Field I signed:0,0\n");
        data.extend_from_slice(b"H Field I predictor:0,6\n");
        data.extend_from_slice(b"H Field I encoding:1,0\n");
        data.push(b'I');
        encode_unsigned_vb(7, &mut data); // only loopIteration is on the wire
        data.push(b'I');
        encode_unsigned_vb(8, &mut data);

        let mut sink = RecordingSink::default();
        let (_header, stats) = parse(&data, false, &mut sink).unwrap();

        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[0].2, vec![7, 1]);
        assert_eq!(sink.frames[1].2, vec![8, 2]);
        assert_eq!(stats.total_corrupt_frames, 0);
    }

    #[test]
    fn unrecognized_encoding_tag_fails_the_decode_not_the_header() {
        let mut data = Vec::new();
        data.extend_from_slice(b"H Field I name:loopIteration,weirdField\n");
        data.extend_from_slice(b"H Field I signed:0,0\n");
        data.extend_from_slice(b"H Field I predictor:0,0\n");
        // encoding 99 isn't one this decoder implements; the header still
        // accepts the line, it's only fatal once a frame decodes against it.
        data.extend_from_slice(b"H Field I encoding:1,99\n");
        data.push(b'I');
        encode_unsigned_vb(1, &mut data);
        encode_unsigned_vb(2, &mut data);

        let mut sink = RecordingSink::default();
        let err = parse(&data, false, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownEncoding(EncodingTag::Unknown(99))
        ));
    }

    #[test]
    fn unrecognized_predictor_tag_fails_the_decode_not_the_header() {
        let mut data = Vec::new();
        data.extend_from_slice(b"H Field I name:loopIteration,weirdField\n");
        data.extend_from_slice(b"H Field I signed:0,0\n");
        data.extend_from_slice(b"H Field I predictor:0,42\n");
        data.extend_from_slice(b"H Field I encoding:1,1\n");
        data.push(b'I');
        encode_unsigned_vb(1, &mut data);
        encode_unsigned_vb(2, &mut data);

        let mut sink = RecordingSink::default();
        let err = parse(&data, false, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownPredictor(PredictorTag::Unknown(42))
        ));
    }
}
