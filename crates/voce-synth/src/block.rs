//! Block processor - the external-facing render driver.
//!
//! Hosts hand over buffers of arbitrary length; the engine renders
//! fixed-size blocks. The block processor sits between them:
//!
//! - slices the host buffer into engine-sized blocks, including the final
//!   partial block;
//! - splits further at queued event offsets, so every MIDI event fires
//!   exactly at its sample, before that sample renders;
//! - applies the pending parameter snapshot at engine-block boundaries only
//!   (the single-writer handoff point for the UI thread).
//!
//! The event queue and all engine buffers are pre-allocated; `process` never
//! allocates.

use voce_core::TransportInfo;

use crate::engine::SynthEngine;
use crate::midi::{EventQueue, MidiEvent, MidiEventKind};
use crate::params::EngineParams;

/// Queue capacity in events per host buffer.
const EVENT_CAPACITY: usize = 256;

/// Drives a [`SynthEngine`] from host-sized buffers and timestamped events.
pub struct BlockProcessor {
    engine: SynthEngine,
    queue: EventQueue,
    pending_params: Option<EngineParams>,
}

impl BlockProcessor {
    /// Wrap an engine.
    pub fn new(engine: SynthEngine) -> Self {
        Self {
            engine,
            queue: EventQueue::with_capacity(EVENT_CAPACITY),
            pending_params: None,
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut SynthEngine {
        &mut self.engine
    }

    /// Queue an event for the next `process` call. Returns `false` (event
    /// dropped) when the queue is full.
    pub fn queue_event(&mut self, event: MidiEvent) -> bool {
        self.queue.push(event)
    }

    /// Parse and queue a raw MIDI triple; unrecognized status bytes are
    /// ignored. Returns `false` only when the queue is full.
    pub fn queue_raw(&mut self, status: u8, data1: u8, data2: u8, sample_offset: u32) -> bool {
        match MidiEvent::from_raw(status, data1, data2, sample_offset) {
            Some(event) => self.queue.push(event),
            None => true,
        }
    }

    /// Store a parameter snapshot, applied at the next engine-block
    /// boundary. Replaces any snapshot not yet applied.
    pub fn set_parameters(&mut self, params: EngineParams) {
        self.pending_params = Some(params);
    }

    /// Render a host buffer of arbitrary length.
    ///
    /// `left` and `right` must be the same length. Events queued since the
    /// last call fire at their sample offsets (offsets past the end of the
    /// buffer fire at the final sample).
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], transport: &TransportInfo) {
        let total = left.len().min(right.len());
        let block_size = self.engine.block_size();

        if let Some(params) = self.pending_params.take() {
            self.engine.set_parameters(&params);
        }
        if total == 0 {
            return;
        }

        self.queue.sort_by_offset();
        let mut next_event = 0usize;
        let mut cursor = 0usize;

        while cursor < total {
            // Fire everything due at or before the cursor.
            while next_event < self.queue.len() {
                let event = self.queue.events()[next_event];
                if (event.sample_offset as usize).min(total - 1) > cursor {
                    break;
                }
                self.dispatch(event);
                next_event += 1;
            }

            // Render up to the next event or the next block boundary,
            // whichever is closer.
            let block_end = cursor + (block_size - cursor % block_size);
            let mut end = block_end.min(total);
            if next_event < self.queue.len() {
                let due = (self.queue.events()[next_event].sample_offset as usize).min(total - 1);
                end = end.min(due);
            }
            debug_assert!(end > cursor);

            let sub_transport = TransportInfo {
                sample_position: transport.sample_position + cursor as u64,
                ..*transport
            };
            self.engine.render(
                &mut left[cursor..end],
                &mut right[cursor..end],
                &sub_transport,
            );
            cursor = end;
        }

        // Anything still queued (offsets at/past the end) fires now so it is
        // not lost; it lands at the first sample of the next buffer.
        while next_event < self.queue.len() {
            let event = self.queue.events()[next_event];
            self.dispatch(event);
            next_event += 1;
        }
        self.queue.clear();
    }

    fn dispatch(&mut self, event: MidiEvent) {
        match event.kind {
            MidiEventKind::NoteOn => self.engine.note_on(event.data1, event.data2),
            MidiEventKind::NoteOff => self.engine.note_off(event.data1),
            MidiEventKind::PitchBend => self.engine.set_pitch_bend(event.bend_normalized()),
            MidiEventKind::ControlChange => self.engine.control_change(event.data1, event.data2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SynthEngine;

    const SR: f32 = 48000.0;

    fn processor() -> BlockProcessor {
        BlockProcessor::new(SynthEngine::new(
            voce_registry::CoreRegistry::with_builtins(),
            SR,
            64,
            8,
        ))
    }

    fn run(p: &mut BlockProcessor, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0f32; frames];
        let mut r = vec![0.0f32; frames];
        p.process(&mut l, &mut r, &TransportInfo::default());
        (l, r)
    }

    #[test]
    fn arbitrary_buffer_lengths_render() {
        let mut p = processor();
        p.queue_event(MidiEvent::note_on(60, 100, 0));
        // Not a multiple of the block size: 300 = 4 * 64 + 44.
        let (l, _) = run(&mut p, 300);
        assert!(l.iter().any(|&s| s != 0.0));

        // Shorter than one block.
        let (l2, _) = run(&mut p, 17);
        assert!(l2.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn note_starts_exactly_at_its_offset() {
        let mut p = processor();
        p.queue_event(MidiEvent::note_on(60, 127, 100));
        let (l, r) = run(&mut p, 256);

        // Everything before the offset is silent; the attack starts at 100.
        for (i, (&sl, &sr)) in l.iter().zip(r.iter()).enumerate().take(100) {
            assert_eq!(sl, 0.0, "left sample {} before the event", i);
            assert_eq!(sr, 0.0, "right sample {} before the event", i);
        }
        assert!(
            l[100..].iter().any(|&s| s != 0.0),
            "audio must start at the event offset"
        );
    }

    #[test]
    fn events_fire_in_offset_order_regardless_of_queue_order() {
        let mut p = processor();
        // Note-off queued first but offset later: note must still sound in
        // between.
        p.queue_event(MidiEvent::note_off(60, 200));
        p.queue_event(MidiEvent::note_on(60, 127, 10));
        let (l, _) = run(&mut p, 256);

        assert!(l[..10].iter().all(|&s| s == 0.0));
        assert!(l[10..200].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn offsets_past_the_buffer_are_not_lost() {
        let mut p = processor();
        p.queue_event(MidiEvent::note_on(60, 127, 10_000));
        let (l, _) = run(&mut p, 64);
        // Possibly silent within this short buffer, but the note must be
        // sounding afterwards.
        let _ = l;
        assert!(p.engine().active_voice_count() > 0);
    }

    #[test]
    fn pending_params_apply_at_block_start() {
        let mut p = processor();
        let mut params = EngineParams::default();
        params.master_volume_db = -60.0;
        p.set_parameters(params);

        p.queue_event(MidiEvent::note_on(60, 127, 0));
        // Long enough for the master-gain ramp to settle at -60 dB.
        let (l, _) = run(&mut p, 9600);
        assert_eq!(p.engine().params().master_volume_db, -60.0);
        let tail_peak = l[l.len() - 512..]
            .iter()
            .fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(tail_peak < 0.01, "-60 dB master, tail peak {}", tail_peak);
    }

    #[test]
    fn raw_midi_round_trip_through_processor() {
        let mut p = processor();
        assert!(p.queue_raw(0x90, 60, 100, 0)); // note on
        assert!(p.queue_raw(0xf0, 0, 0, 0), "sysex ignored, not an error");
        let (l, _) = run(&mut p, 128);
        assert!(l.iter().any(|&s| s != 0.0));

        assert!(p.queue_raw(0x80, 60, 0, 0)); // note off
        run(&mut p, 128);
        assert!(!p.engine().voices()[0].gate_on());
    }

    #[test]
    fn empty_process_is_silent_and_harmless() {
        let mut p = processor();
        let (l, r) = run(&mut p, 640);
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(r.iter().all(|&s| s == 0.0));
    }
}
