//! Voice allocator / engine: the pool, the modes, the mix bus.
//!
//! The engine owns a fixed pool of [`Voice`]s sized to the polyphony limit
//! at construction, applies the voice-mode policy (poly, mono, legato,
//! unison and its legato variant), steals voices when the pool is exhausted,
//! sums voice outputs into the stereo bus, runs the shared delay, and
//! applies the smoothed master volume.
//!
//! ## Stealing policy
//!
//! A note-on with no free voice steals the oldest *releasing* voice; if no
//! voice is releasing, the oldest *sounding* voice (note-on timestamp
//! order). A voice triggered at the same block instant is never stolen - if
//! every voice was just triggered, the note-on is ignored rather than
//! corrupting a fresh note.
//!
//! ## Real-time rules
//!
//! `render` takes no locks and allocates only when a parameter snapshot
//! actually swaps a DSP core (a user configuration change). Sample-rate
//! changes go through [`reset`](SynthEngine::reset), which may reallocate.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use libm::sqrtf;
use voce_core::{
    DEFAULT_BLOCK_FRAMES, MAX_BLOCK_FRAMES, SmoothedParam, TransportInfo, VoiceMode, db_to_linear,
};
use voce_cores::StereoDelay;
use voce_registry::CoreRegistry;

use crate::params::EngineParams;
use crate::voice::{Voice, VoiceRenderContext};

/// Hard upper bound on the voice pool.
pub const MAX_POLYPHONY: usize = 32;

/// Pool size used by [`SynthEngine::with_defaults`].
pub const DEFAULT_POLYPHONY: usize = 16;

/// Held-note memory for the mono/legato/unison modes.
///
/// Fixed capacity; overflowing drops the oldest entry. Releasing the
/// sounding note falls back to the most recently held one.
#[derive(Debug, Clone)]
struct NoteStack {
    notes: [(u8, u8); 16],
    len: usize,
}

impl NoteStack {
    fn new() -> Self {
        Self {
            notes: [(0, 0); 16],
            len: 0,
        }
    }

    fn push(&mut self, note: u8, velocity: u8) {
        // Re-pressing a held key moves it to the top.
        self.remove(note);
        if self.len == self.notes.len() {
            self.notes.copy_within(1.., 0);
            self.len -= 1;
        }
        self.notes[self.len] = (note, velocity);
        self.len += 1;
    }

    fn remove(&mut self, note: u8) {
        if let Some(pos) = self.notes[..self.len].iter().position(|&(n, _)| n == note) {
            self.notes.copy_within(pos + 1..self.len, pos);
            self.len -= 1;
        }
    }

    fn top(&self) -> Option<(u8, u8)> {
        if self.len == 0 {
            None
        } else {
            Some(self.notes[self.len - 1])
        }
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The polyphonic synthesis engine.
pub struct SynthEngine {
    registry: CoreRegistry,
    voices: Vec<Voice>,
    params: EngineParams,
    delay: StereoDelay,
    master_gain: SmoothedParam,

    pitch_bend_semitones: f32,
    mod_wheel: f32,
    sustain_pedal: bool,
    note_stack: NoteStack,

    timestamp_counter: u64,
    block_counter: u64,
    sample_rate: f32,
    block_size: usize,
}

impl SynthEngine {
    /// Create an engine with a fixed voice pool.
    ///
    /// The pool, all module cores, and the delay line are allocated here;
    /// rendering reuses them in place. `block_size` is clamped to
    /// [`MAX_BLOCK_FRAMES`], `polyphony` to [`MAX_POLYPHONY`].
    pub fn new(
        registry: CoreRegistry,
        sample_rate: f32,
        block_size: usize,
        polyphony: usize,
    ) -> Self {
        let block_size = block_size.clamp(1, MAX_BLOCK_FRAMES);
        let polyphony = polyphony.clamp(1, MAX_POLYPHONY);
        let voices = (0..polyphony)
            .map(|_| Voice::new(&registry, sample_rate))
            .collect();
        Self {
            registry,
            voices,
            params: EngineParams::default(),
            delay: StereoDelay::new(sample_rate),
            master_gain: SmoothedParam::with_config(1.0, sample_rate, 10.0),
            pitch_bend_semitones: 0.0,
            mod_wheel: 0.0,
            sustain_pedal: false,
            note_stack: NoteStack::new(),
            timestamp_counter: 0,
            block_counter: 0,
            sample_rate,
            block_size,
        }
    }

    /// Engine with built-in cores, the default block size, and the default
    /// pool.
    pub fn with_defaults(sample_rate: f32) -> Self {
        Self::new(
            CoreRegistry::with_builtins(),
            sample_rate,
            DEFAULT_BLOCK_FRAMES,
            DEFAULT_POLYPHONY,
        )
    }

    /// Store the latest configuration snapshot. No audio side effect until
    /// the next render; a voice-mode change releases held voices so no gate
    /// is stranded in the old policy.
    ///
    /// Core swaps requested by the snapshot happen here (and at note-on for
    /// voices whose envelopes were still sounding) - the only place the
    /// audio thread may allocate, and only on an actual configuration
    /// change, never in steady-state rendering.
    pub fn set_parameters(&mut self, params: &EngineParams) {
        if params.voice_mode != self.params.voice_mode {
            self.all_notes_off();
            self.note_stack.clear();
        }
        self.params = *params;

        let voice_params = self.params.voice;
        for voice in &mut self.voices {
            voice.apply_params(&voice_params, &self.registry);
        }
    }

    /// The current configuration snapshot.
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// The fixed render block size in frames.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The voice pool (inspection/tests).
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Number of voices currently contributing audio.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Handle a note-on at the current block instant.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let note = note & 0x7f;
        match self.params.voice_mode {
            VoiceMode::Poly => self.poly_note_on(note, velocity),
            VoiceMode::Mono => self.single_note_on(note, velocity, false),
            VoiceMode::Legato => self.single_note_on(note, velocity, true),
            VoiceMode::Unison => self.unison_note_on(note, velocity, false),
            VoiceMode::UnisonLegato => self.unison_note_on(note, velocity, true),
        }
    }

    /// Handle a note-off at the current block instant.
    pub fn note_off(&mut self, note: u8) {
        let note = note & 0x7f;
        match self.params.voice_mode {
            VoiceMode::Poly => self.poly_note_off(note),
            VoiceMode::Mono | VoiceMode::Legato => self.single_note_off(note, 1),
            VoiceMode::Unison | VoiceMode::UnisonLegato => {
                self.single_note_off(note, self.unison_count());
            }
        }
    }

    /// Release every gated voice (the release tails still sound).
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            if voice.gate_on() || voice.is_sustained() {
                voice.note_off();
            }
        }
        self.note_stack.clear();
    }

    /// Pitch bend from a normalized [-1, 1] value, scaled by the configured
    /// bend range.
    pub fn set_pitch_bend(&mut self, normalized: f32) {
        let range = self.params.pitch_bend_range.clamp(0.0, 24.0);
        self.pitch_bend_semitones = normalized.clamp(-1.0, 1.0) * range;
    }

    /// Controller change. CC 1 (mod wheel) opens LFO 1 depth; CC 64
    /// (sustain) defers note-offs while held; everything else is ignored.
    pub fn control_change(&mut self, controller: u8, value: u8) {
        match controller {
            1 => self.mod_wheel = f32::from(value.min(127)) / 127.0,
            64 => {
                let down = value >= 64;
                if self.sustain_pedal && !down {
                    // Pedal up: fire the deferred note-offs.
                    for voice in &mut self.voices {
                        if voice.is_sustained() {
                            voice.note_off();
                        }
                    }
                }
                self.sustain_pedal = down;
            }
            _ => {}
        }
    }

    /// Render one block into `left`/`right` (lengths must match, at most the
    /// engine block size). Zero active voices yield exact silence.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32], transport: &TransportInfo) {
        debug_assert_eq!(left.len(), right.len());
        let frames = left.len().min(right.len()).min(self.block_size);
        let left = &mut left[..frames];
        let right = &mut right[..frames];

        left.fill(0.0);
        right.fill(0.0);

        let voice_params = self.params.voice;
        let ctx = VoiceRenderContext {
            pitch_bend_semitones: self.pitch_bend_semitones,
            master_tune_cents: self.params.master_tune_cents.clamp(-100.0, 100.0),
            bpm: transport.bpm,
            mod_wheel: self.mod_wheel,
        };

        // Unison stacks several voices per note; scale so loudness does not
        // grow with the stack size.
        let scale = match self.params.voice_mode {
            VoiceMode::Unison | VoiceMode::UnisonLegato => {
                1.0 / sqrtf(self.unison_count() as f32)
            }
            _ => 1.0,
        };

        for voice in &mut self.voices {
            if !voice.is_active() {
                continue;
            }
            voice.render(&voice_params, &ctx, frames);
            for (acc, &s) in left.iter_mut().zip(voice.out_left(frames)) {
                *acc += s * scale;
            }
            for (acc, &s) in right.iter_mut().zip(voice.out_right(frames)) {
                *acc += s * scale;
            }
        }

        // Shared delay and smoothed master volume over the mix.
        self.delay.set_params(&self.params.delay, transport.bpm);
        self.master_gain
            .set_target(db_to_linear(self.params.master_volume_db.clamp(-60.0, 12.0)));
        for i in 0..frames {
            let (l, r) = self.delay.process(left[i], right[i]);
            let g = self.master_gain.advance();
            left[i] = l * g;
            right[i] = r * g;
        }

        self.block_counter += 1;
    }

    /// Full reset for a sample-rate (or block-size) change. Allowed to
    /// reallocate; never called from the render path.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.reset();
            voice.set_sample_rate(sample_rate);
        }
        self.delay.set_sample_rate(sample_rate);
        self.delay.reset();
        self.master_gain.set_sample_rate(sample_rate);
        self.master_gain.snap_to_target();
        self.pitch_bend_semitones = 0.0;
        self.mod_wheel = 0.0;
        self.sustain_pedal = false;
        self.note_stack.clear();
        self.timestamp_counter = 0;
        self.block_counter = 0;
    }

    /// The engine sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // ---- allocation policy ----

    fn unison_count(&self) -> usize {
        self.params.unison_voices.clamp(2, self.voices.len())
    }

    fn next_timestamp(&mut self) -> u64 {
        self.timestamp_counter += 1;
        self.timestamp_counter
    }

    fn poly_note_on(&mut self, note: u8, velocity: u8) {
        let ts = self.next_timestamp();
        let block = self.block_counter;
        let params = self.params.voice;

        if let Some(idx) = self.voices.iter().position(|v| !v.is_active()) {
            let voice = &mut self.voices[idx];
            // Snapshot before gating, so a freshly selected core (EG shape,
            // oscillator algorithm) applies to this very note.
            voice.apply_params(&params, &self.registry);
            voice.set_unison_offsets(0.0, 0.0);
            voice.note_on(note, velocity, &params, false, false, ts, block);
            return;
        }

        if let Some(idx) = self.find_steal_index() {
            self.voices[idx].set_unison_offsets(0.0, 0.0);
            self.voices[idx].steal_note(note, velocity, ts, block);
        }
        // No candidate means every voice was triggered at this instant;
        // the note-on is dropped rather than cutting a fresh note.
    }

    fn poly_note_off(&mut self, note: u8) {
        let sustain = self.sustain_pedal;
        for voice in &mut self.voices {
            // A note released before its steal handoff completed never
            // sounds - drop the handoff so the gate cannot stick.
            if voice.cancel_pending(note) {
                continue;
            }
            if voice.gate_on() && voice.note() == note {
                if sustain {
                    voice.set_sustained(true);
                } else {
                    voice.note_off();
                }
            }
        }
    }

    /// Mono and legato share one voice; `suppress_retrigger` is the legato
    /// behavior for overlapping notes.
    fn single_note_on(&mut self, note: u8, velocity: u8, suppress_retrigger: bool) {
        let ts = self.next_timestamp();
        let block = self.block_counter;
        let params = self.params.voice;

        let overlapping = self.voices[0].gate_on();
        self.note_stack.push(note, velocity);
        let legato = suppress_retrigger && overlapping;

        self.voices[0].apply_params(&params, &self.registry);
        self.voices[0].set_unison_offsets(0.0, 0.0);
        self.voices[0].note_on(note, velocity, &params, legato, true, ts, block);
    }

    fn single_note_off(&mut self, note: u8, voice_count: usize) {
        self.note_stack.remove(note);
        let sounding = self.voices[0].gate_on() && self.voices[0].note() == note;
        if !sounding {
            return;
        }

        if self.sustain_pedal && self.note_stack.is_empty() {
            for voice in self.voices[..voice_count].iter_mut() {
                voice.set_sustained(true);
            }
            return;
        }

        if let Some((prev_note, prev_velocity)) = self.note_stack.top() {
            // Fall back to the most recent held note, gliding; retrigger
            // behavior follows the mode.
            let suppress = matches!(
                self.params.voice_mode,
                VoiceMode::Legato | VoiceMode::UnisonLegato
            );
            let ts = self.next_timestamp();
            let block = self.block_counter;
            let params = self.params.voice;
            for voice in self.voices[..voice_count].iter_mut() {
                voice.note_on(prev_note, prev_velocity, &params, suppress, true, ts, block);
            }
        } else {
            for voice in self.voices[..voice_count].iter_mut() {
                voice.note_off();
            }
        }
    }

    fn unison_note_on(&mut self, note: u8, velocity: u8, suppress_retrigger: bool) {
        let ts = self.next_timestamp();
        let block = self.block_counter;
        let params = self.params.voice;
        let count = self.unison_count();

        let overlapping = self.voices[0].gate_on();
        self.note_stack.push(note, velocity);
        let legato = suppress_retrigger && overlapping;

        let spread = self.params.unison_detune_cents.max(0.0);
        let width = self.params.unison_stereo_spread.clamp(0.0, 1.0);
        let divisor = (count - 1) as f32;

        for (i, voice) in self.voices[..count].iter_mut().enumerate() {
            // Symmetric distribution across [-spread, +spread] and the
            // stereo field.
            let t = 2.0 * i as f32 / divisor - 1.0;
            voice.apply_params(&params, &self.registry);
            voice.set_unison_offsets(spread * t, width * t);
            voice.note_on(note, velocity, &params, legato, true, ts, block);
        }
    }

    /// Steal the oldest releasing voice, else the oldest sounding voice,
    /// never one triggered at this block instant.
    fn find_steal_index(&self) -> Option<usize> {
        let block = self.block_counter;
        let candidates = || {
            self.voices
                .iter()
                .enumerate()
                .filter(move |(_, v)| v.is_active() && v.trigger_block() != block)
        };

        candidates()
            .filter(|(_, v)| v.is_releasing())
            .min_by_key(|(_, v)| v.timestamp())
            .or_else(|| candidates().min_by_key(|(_, v)| v.timestamp()))
            .map(|(i, _)| i)
    }
}
