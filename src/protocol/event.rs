//! Event frame parsing (spec.md §4.5): one byte selects the event kind,
//! followed by a kind-dependent fixed-size body.
use crate::infra::cursor::Cursor;

/// A decoded event. Unknown wire kinds decode to `None`, and no event
/// callback fires for them (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    None,
    SyncBeep { time: u32 },
    AutotuneCycleStart { phase: u8, cycle: u8, p: u8, i: u8, d: u8 },
    AutotuneCycleResult { overshot: u8, p: u8, i: u8, d: u8 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventSlot {
    pub kind: Option<EventKind>,
}

const SYNC_BEEP: u8 = 0;
const AUTOTUNE_CYCLE_START: u8 = 10;
const AUTOTUNE_CYCLE_RESULT: u8 = 11;

/// Read one event frame's body. The event kind byte has already been
/// consumed by the caller in line with the other per-kind parsers, which
/// all begin by reading their marker.
pub fn parse_event(cursor: &mut Cursor) -> EventKind {
    use crate::infra::codec::read_unsigned_vb;

    let Some(kind_byte) = cursor.read_byte() else {
        return EventKind::None;
    };
    match kind_byte {
        SYNC_BEEP => {
            let time = read_unsigned_vb(cursor).unwrap_or(0);
            EventKind::SyncBeep { time }
        }
        AUTOTUNE_CYCLE_START => {
            let mut b = [0u8; 5];
            for slot in &mut b {
                *slot = cursor.read_byte().unwrap_or(0);
            }
            EventKind::AutotuneCycleStart {
                phase: b[0],
                cycle: b[1],
                p: b[2],
                i: b[3],
                d: b[4],
            }
        }
        AUTOTUNE_CYCLE_RESULT => {
            let mut b = [0u8; 4];
            for slot in &mut b {
                *slot = cursor.read_byte().unwrap_or(0);
            }
            EventKind::AutotuneCycleResult {
                overshot: b[0],
                p: b[1],
                i: b[2],
                d: b[3],
            }
        }
        _ => EventKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_beep_reads_varint_time() {
        let bytes = [SYNC_BEEP, 5];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(parse_event(&mut cursor), EventKind::SyncBeep { time: 5 });
    }

    #[test]
    fn autotune_cycle_start_reads_five_raw_bytes() {
        let bytes = [AUTOTUNE_CYCLE_START, 1, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(
            parse_event(&mut cursor),
            EventKind::AutotuneCycleStart {
                phase: 1,
                cycle: 2,
                p: 3,
                i: 4,
                d: 5
            }
        );
    }

    #[test]
    fn unknown_event_kind_yields_none() {
        let bytes = [0xFFu8];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(parse_event(&mut cursor), EventKind::None);
    }
}
