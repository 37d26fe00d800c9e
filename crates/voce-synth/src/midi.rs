//! MIDI event types and the pre-allocated event queue.
//!
//! Events carry an intra-block sample offset; the block processor fires each
//! event exactly at that offset, before the sample renders. The queue is
//! filled by the control thread between blocks and drained by the audio
//! thread - it never allocates after construction, and pushing into a full
//! queue drops the event rather than growing.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

/// Recognized MIDI event kinds.
///
/// Anything else coming off the wire is dropped at parse time - an unknown
/// status byte must not disturb rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiEventKind {
    /// Key down; `data1` = note, `data2` = velocity.
    NoteOn,
    /// Key up; `data1` = note.
    NoteOff,
    /// 14-bit pitch bend in `data1` (LSB) and `data2` (MSB).
    PitchBend,
    /// Controller change; `data1` = controller, `data2` = value.
    ControlChange,
}

/// One timestamped MIDI-like event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Event kind.
    pub kind: MidiEventKind,
    /// Channel 0-15. The engine is omni; the field is carried for hosts.
    pub channel: u8,
    /// First data byte.
    pub data1: u8,
    /// Second data byte.
    pub data2: u8,
    /// Offset in samples from the start of the host buffer.
    pub sample_offset: u32,
}

impl MidiEvent {
    /// Parse a raw status/data triple.
    ///
    /// Returns `None` for status bytes the engine does not understand
    /// (aftertouch, program change, system messages, ...). A note-on with
    /// velocity zero is normalized to a note-off, per MIDI convention.
    pub fn from_raw(status: u8, data1: u8, data2: u8, sample_offset: u32) -> Option<Self> {
        let channel = status & 0x0f;
        let kind = match status & 0xf0 {
            0x90 if data2 > 0 => MidiEventKind::NoteOn,
            0x90 | 0x80 => MidiEventKind::NoteOff,
            0xe0 => MidiEventKind::PitchBend,
            0xb0 => MidiEventKind::ControlChange,
            _ => return None,
        };
        Some(Self {
            kind,
            channel,
            data1: data1 & 0x7f,
            data2: data2 & 0x7f,
            sample_offset,
        })
    }

    /// Construct a note-on.
    pub fn note_on(note: u8, velocity: u8, sample_offset: u32) -> Self {
        Self {
            kind: MidiEventKind::NoteOn,
            channel: 0,
            data1: note & 0x7f,
            data2: velocity & 0x7f,
            sample_offset,
        }
    }

    /// Construct a note-off.
    pub fn note_off(note: u8, sample_offset: u32) -> Self {
        Self {
            kind: MidiEventKind::NoteOff,
            channel: 0,
            data1: note & 0x7f,
            data2: 0,
            sample_offset,
        }
    }

    /// Construct a pitch-bend from a normalized value in [-1, 1].
    pub fn pitch_bend(amount: f32, sample_offset: u32) -> Self {
        let raw = ((amount.clamp(-1.0, 1.0) + 1.0) * 8192.0) as u16;
        let raw = raw.min(16383);
        Self {
            kind: MidiEventKind::PitchBend,
            channel: 0,
            data1: (raw & 0x7f) as u8,
            data2: (raw >> 7) as u8,
            sample_offset,
        }
    }

    /// Construct a controller change.
    pub fn control_change(controller: u8, value: u8, sample_offset: u32) -> Self {
        Self {
            kind: MidiEventKind::ControlChange,
            channel: 0,
            data1: controller & 0x7f,
            data2: value & 0x7f,
            sample_offset,
        }
    }

    /// Decode a pitch-bend event to a normalized value in [-1, 1].
    pub fn bend_normalized(&self) -> f32 {
        let raw = u16::from(self.data1) | (u16::from(self.data2) << 7);
        (f32::from(raw) - 8192.0) / 8192.0
    }
}

/// Fixed-capacity event queue.
///
/// Capacity is reserved up front; [`push`](Self::push) never allocates.
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<MidiEvent>,
    capacity: usize,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events per block.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue an event. Returns `false` (and drops the event) when full.
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sort queued events by ascending sample offset (stable for equal
    /// offsets, preserving arrival order).
    pub fn sort_by_offset(&mut self) {
        // In-place merge sort on a pre-allocated Vec does allocate a scratch
        // buffer in the stdlib; insertion sort is allocation-free and the
        // queue is small and nearly sorted in practice.
        for i in 1..self.events.len() {
            let mut j = i;
            while j > 0 && self.events[j - 1].sample_offset > self.events[j].sample_offset {
                self.events.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    /// Queued events in their current order.
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Remove all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_note_on_and_off() {
        let on = MidiEvent::from_raw(0x90, 60, 100, 5).unwrap();
        assert_eq!(on.kind, MidiEventKind::NoteOn);
        assert_eq!(on.data1, 60);
        assert_eq!(on.data2, 100);
        assert_eq!(on.sample_offset, 5);

        let off = MidiEvent::from_raw(0x85, 60, 64, 0).unwrap();
        assert_eq!(off.kind, MidiEventKind::NoteOff);
        assert_eq!(off.channel, 5);
    }

    #[test]
    fn note_on_velocity_zero_is_note_off() {
        let ev = MidiEvent::from_raw(0x90, 60, 0, 0).unwrap();
        assert_eq!(ev.kind, MidiEventKind::NoteOff);
    }

    #[test]
    fn unrecognized_status_is_ignored() {
        assert!(MidiEvent::from_raw(0xc0, 10, 0, 0).is_none()); // program change
        assert!(MidiEvent::from_raw(0xf8, 0, 0, 0).is_none()); // clock
        assert!(MidiEvent::from_raw(0xa0, 60, 50, 0).is_none()); // poly AT
    }

    #[test]
    fn pitch_bend_round_trips() {
        for amount in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let ev = MidiEvent::pitch_bend(amount, 0);
            assert!(
                (ev.bend_normalized() - amount).abs() < 0.001,
                "bend {} -> {}",
                amount,
                ev.bend_normalized()
            );
        }
    }

    #[test]
    fn queue_sorts_by_offset_preserving_arrival_order() {
        let mut q = EventQueue::with_capacity(8);
        q.push(MidiEvent::note_on(64, 100, 32));
        q.push(MidiEvent::note_on(60, 100, 0));
        q.push(MidiEvent::note_off(60, 32));
        q.sort_by_offset();

        let ev = q.events();
        assert_eq!(ev[0].data1, 60);
        // Equal offsets keep arrival order: note-on 64 before note-off 60.
        assert_eq!(ev[1].kind, MidiEventKind::NoteOn);
        assert_eq!(ev[2].kind, MidiEventKind::NoteOff);
    }

    #[test]
    fn full_queue_drops_new_events() {
        let mut q = EventQueue::with_capacity(2);
        assert!(q.push(MidiEvent::note_on(60, 100, 0)));
        assert!(q.push(MidiEvent::note_on(61, 100, 0)));
        assert!(!q.push(MidiEvent::note_on(62, 100, 0)));
        assert_eq!(q.len(), 2);
    }
}
