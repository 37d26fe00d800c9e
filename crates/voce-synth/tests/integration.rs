//! Integration tests for the voce-synth engine.
//!
//! Covers the engine-level contracts: silence idempotence, polyphony
//! limits, stealing order, envelope retrigger continuity, modulation-matrix
//! determinism, sample-accurate event timing, and the reference mono
//! attack-time scenario.

use proptest::prelude::*;
use voce_core::{TransportInfo, VoiceMode};
use voce_registry::CoreRegistry;
use voce_synth::{
    BlockProcessor, EngineParams, MidiEvent, ModDest, ModMatrix, ModMatrixParams, ModSource,
    SynthEngine, VoiceModValues,
};

const SR: f32 = 48000.0;

fn engine(polyphony: usize) -> SynthEngine {
    SynthEngine::new(CoreRegistry::with_builtins(), SR, 64, polyphony)
}

fn render(engine: &mut SynthEngine, blocks: usize) -> (Vec<f32>, Vec<f32>) {
    let transport = TransportInfo::default();
    let mut all_l = Vec::new();
    let mut all_r = Vec::new();
    for _ in 0..blocks {
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        engine.render(&mut l, &mut r, &transport);
        all_l.extend_from_slice(&l);
        all_r.extend_from_slice(&r);
    }
    (all_l, all_r)
}

// ---------------------------------------------------------------------------
// 1. Silence idempotence
// ---------------------------------------------------------------------------

#[test]
fn zero_voices_render_exact_silence_at_any_buffer_length() {
    let mut proc = BlockProcessor::new(engine(8));
    for frames in [1usize, 17, 64, 65, 300, 1024] {
        let mut l = vec![1.0f32; frames]; // pre-soiled buffers must be zeroed
        let mut r = vec![-1.0f32; frames];
        proc.process(&mut l, &mut r, &TransportInfo::default());
        assert!(
            l.iter().chain(r.iter()).all(|&s| s == 0.0),
            "non-zero sample with no voices at length {}",
            frames
        );
    }
}

#[test]
fn released_voices_return_to_exact_silence() {
    let mut e = engine(4);
    let mut params = EngineParams::default();
    params.voice.amp_eg.release_ms = 5.0;
    e.set_parameters(&params);

    e.note_on(60, 100);
    render(&mut e, 20);
    e.note_off(60);
    render(&mut e, 100); // far beyond the release tail

    let (l, r) = render(&mut e, 10);
    assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    assert_eq!(e.active_voice_count(), 0);
}

// ---------------------------------------------------------------------------
// 2. Output sanity: no NaN/Inf, bounded amplitude
// ---------------------------------------------------------------------------

#[test]
fn heavy_patch_stays_finite_and_bounded() {
    let mut e = engine(16);
    let mut params = EngineParams::default();
    for p in &mut params.voice.oscillators {
        p.enabled = true;
    }
    params.voice.filters[1].enabled = true;
    params.voice.filters[0].resonance = 10.0;
    params.voice.filters[0].drive = 1.0;
    params.delay.enabled = true;
    params.delay.feedback = 0.95;
    params
        .voice
        .matrix
        .route(ModSource::Lfo1, ModDest::Osc1Pitch, 1.0);
    params
        .voice
        .matrix
        .route(ModSource::FilterEg, ModDest::Filter1EgCutoff, 1.0);
    params
        .voice
        .matrix
        .route(ModSource::Lfo2, ModDest::Pan, 1.0);
    e.set_parameters(&params);

    for note in [24, 36, 48, 60, 72, 84, 96] {
        e.note_on(note, 127);
    }
    let (l, r) = render(&mut e, 300);
    for &s in l.iter().chain(r.iter()) {
        assert!(s.is_finite(), "NaN/Inf in output");
        assert!(s.abs() < 100.0, "unbounded amplitude: {}", s);
    }
}

// ---------------------------------------------------------------------------
// 3. Polyphony invariant
// ---------------------------------------------------------------------------

#[test]
fn active_voice_count_never_exceeds_polyphony() {
    let mut e = engine(4);
    for i in 0..64u8 {
        e.note_on(30 + (i % 40), 100);
        if i % 3 == 0 {
            e.note_off(30 + ((i / 2) % 40));
        }
        render(&mut e, 1);
        assert!(
            e.active_voice_count() <= 4,
            "polyphony exceeded at step {}",
            i
        );
    }
}

// ---------------------------------------------------------------------------
// 4. Stealing order
// ---------------------------------------------------------------------------

#[test]
fn releasing_voice_is_stolen_before_sustaining_voice() {
    let mut e = engine(2);

    e.note_on(60, 100); // older
    render(&mut e, 2);
    e.note_on(64, 100); // newer, will keep sustaining
    render(&mut e, 2);

    e.note_off(60); // 60 is now releasing (and older)
    render(&mut e, 1);

    e.note_on(72, 100);
    render(&mut e, 20);

    let notes: Vec<u8> = e
        .voices()
        .iter()
        .filter(|v| v.is_active())
        .map(|v| v.note())
        .collect();
    assert!(
        notes.contains(&64),
        "sustaining voice was stolen instead of the releasing one: {:?}",
        notes
    );
    assert!(notes.contains(&72), "new note missing: {:?}", notes);
}

#[test]
fn pool_of_two_third_note_steals_oldest_never_drops() {
    let mut e = engine(2);

    e.note_on(60, 100);
    render(&mut e, 1);
    e.note_on(64, 100);
    render(&mut e, 1);
    e.note_on(67, 100); // no free voice, nothing releasing
    render(&mut e, 30); // let the shutdown hand off to the pending note

    let notes: Vec<u8> = e
        .voices()
        .iter()
        .filter(|v| v.is_active())
        .map(|v| v.note())
        .collect();
    assert!(
        notes.contains(&67),
        "new note silently dropped: {:?}",
        notes
    );
    assert!(
        !notes.contains(&60),
        "oldest-active rule violated: {:?}",
        notes
    );
}

// ---------------------------------------------------------------------------
// 5. EG retrigger continuity
// ---------------------------------------------------------------------------

#[test]
fn retrigger_mid_release_enters_attack_without_discontinuity() {
    // Mono mode re-triggers the same voice directly (poly would steal and
    // shut down instead).
    let mut e = engine(1);
    let mut params = EngineParams::default();
    params.voice_mode = VoiceMode::Mono;
    params.voice.amp_eg.release_ms = 500.0;
    e.set_parameters(&params);

    e.note_on(60, 127);
    render(&mut e, 40);
    e.note_off(60);
    render(&mut e, 10); // partway into the release

    let level_before = e.voices()[0].mod_values().get(ModSource::AmpEg);
    assert!(level_before > 0.05, "release should still be audible");

    e.note_on(60, 127);
    let (_, _) = render(&mut e, 1);
    let level_after = e.voices()[0].mod_values().get(ModSource::AmpEg);

    // One 64-sample block later the envelope is rising from where release
    // left it, not restarting from zero.
    assert!(
        level_after >= level_before - 0.01,
        "retrigger dropped the level: {} -> {}",
        level_before,
        level_after
    );
    assert!(
        (level_after - level_before).abs() < 0.25,
        "retrigger jumped: {} -> {}",
        level_before,
        level_after
    );
}

// ---------------------------------------------------------------------------
// 6. Modulation matrix determinism
// ---------------------------------------------------------------------------

#[test]
fn repeated_matrix_evaluation_is_bit_identical() {
    let mut params = ModMatrixParams::new();
    params.route(ModSource::Lfo1, ModDest::Filter1Cutoff, 0.37);
    params.route(ModSource::Lfo2, ModDest::Filter1Cutoff, -0.82);
    params.route(ModSource::AuxEg, ModDest::Filter1Cutoff, 0.55);
    params.set_source_intensity(ModSource::Lfo2, 0.9);
    params.set_dest_intensity(ModDest::Filter1Cutoff, 0.71);

    let mut matrix = ModMatrix::new();
    matrix.set_parameters(&params);

    let mut values = VoiceModValues::new();
    values.set(ModSource::Lfo1, 0.123_456_7);
    values.set(ModSource::Lfo2, -0.765_432_1);
    values.set(ModSource::AuxEg, 0.999_999);

    let first = matrix.compute_destination(ModDest::Filter1Cutoff, &values);
    for _ in 0..1000 {
        let again = matrix.compute_destination(ModDest::Filter1Cutoff, &values);
        assert_eq!(first.to_bits(), again.to_bits());
    }
}

#[test]
fn zero_destination_intensity_yields_exact_zero() {
    let mut params = ModMatrixParams::new();
    for source in ModSource::ALL {
        for dest in ModDest::ALL {
            params.route(source, dest, 1.0);
        }
    }
    for dest in ModDest::ALL {
        params.set_dest_intensity(dest, 0.0);
    }

    let mut matrix = ModMatrix::new();
    matrix.set_parameters(&params);

    let mut values = VoiceModValues::new();
    for source in ModSource::ALL {
        values.set(source, 0.913);
    }
    for dest in ModDest::ALL {
        assert_eq!(matrix.compute_destination(dest, &values), 0.0);
    }
}

proptest! {
    /// The matrix is pure summation: its value equals the sum of the
    /// per-route products, whatever order the routes are added in.
    #[test]
    fn matrix_matches_reference_sum(
        enables in proptest::collection::vec(any::<bool>(), ModSource::COUNT),
        intensities in proptest::collection::vec(-1.0f32..1.0, ModSource::COUNT),
        source_values in proptest::collection::vec(-1.0f32..1.0, ModSource::COUNT),
        dest_intensity in -1.0f32..1.0,
    ) {
        let dest = ModDest::Filter1Cutoff;
        let mut params = ModMatrixParams::new();
        let mut values = VoiceModValues::new();

        for (i, source) in ModSource::ALL.iter().enumerate() {
            params.set_channel_enable(*source, dest, enables[i]);
            params.set_cell_intensity(*source, dest, intensities[i]);
            values.set(*source, source_values[i]);
        }
        params.set_dest_intensity(dest, dest_intensity);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);
        let computed = matrix.compute_destination(dest, &values);

        // Reference walks the sources in reverse order.
        let mut reference = 0.0f32;
        for (i, source) in ModSource::ALL.iter().enumerate().rev() {
            if enables[i] {
                reference += values.get(*source)
                    * params.cell_intensity(*source, dest)
                    * params.source_intensity(*source)
                    * params.dest_intensity(dest);
            }
        }

        prop_assert!(
            (computed - reference).abs() <= 1e-5,
            "order dependence: {} vs {}",
            computed,
            reference
        );
    }

    /// Disabling every cell annihilates all source activity.
    #[test]
    fn disabled_matrix_is_always_zero(
        source_values in proptest::collection::vec(-1.0f32..1.0, ModSource::COUNT),
    ) {
        let matrix = ModMatrix::new();
        let mut values = VoiceModValues::new();
        for (i, source) in ModSource::ALL.iter().enumerate() {
            values.set(*source, source_values[i]);
        }
        for dest in ModDest::ALL {
            prop_assert_eq!(matrix.compute_destination(dest, &values), 0.0);
        }
    }
}

// ---------------------------------------------------------------------------
// 7. Reference scenario: mono attack timing at 44.1 kHz
// ---------------------------------------------------------------------------

#[test]
fn mono_attack_envelope_peaks_in_the_expected_window() {
    // Note 60 at velocity 100, mono mode, amp EG 25 ms / 300 ms / 0.707 /
    // 1000 ms, 44.1 kHz, block size 64. The linear EG core reaches peak in
    // exactly 25 ms = 1102.5 samples ~ block 17; allow +-1 block on either
    // side of the boundary.
    let mut e = SynthEngine::new(CoreRegistry::with_builtins(), 44100.0, 64, 4);
    let mut params = EngineParams::default();
    params.voice_mode = VoiceMode::Mono;
    params.voice.amp_eg.core_index = 1; // linear segments
    params.voice.amp_eg.attack_ms = 25.0;
    params.voice.amp_eg.decay_ms = 300.0;
    params.voice.amp_eg.sustain = 0.707;
    params.voice.amp_eg.release_ms = 1000.0;
    params.voice.filters[0].cutoff_hz = 20000.0; // keep the filter out of the level
    e.set_parameters(&params);

    e.note_on(60, 100);

    // Track the amplitude envelope per block via the amp EG source value
    // (the per-block oscillator phase makes raw sample peaks too noisy for
    // a timing assertion).
    let transport = TransportInfo::default();
    let mut envelope = Vec::new();
    for _ in 0..80 {
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        e.render(&mut l, &mut r, &transport);
        envelope.push(e.voices()[0].mod_values().get(ModSource::AmpEg));
    }

    let peak = envelope.iter().cloned().fold(0.0f32, f32::max);
    assert!(peak > 0.9, "attack must reach its peak, got {}", peak);
    let first_peak_block = envelope
        .iter()
        .position(|&v| v >= 0.99 * peak)
        .expect("envelope must cross 0.99 of peak");

    let expected_block = (0.025f32 * 44100.0 / 64.0) as usize; // 17
    assert!(
        (first_peak_block as i64 - expected_block as i64).unsigned_abs() <= 2,
        "attack peaked at block {} (expected ~{})",
        first_peak_block,
        expected_block
    );
}

// ---------------------------------------------------------------------------
// 8. Sample-accurate events through the block processor
// ---------------------------------------------------------------------------

#[test]
fn note_on_offset_is_sample_accurate_across_block_boundaries() {
    let mut proc = BlockProcessor::new(engine(4));
    // Offset 130 sits inside the third 64-sample block.
    proc.queue_event(MidiEvent::note_on(60, 127, 130));

    let mut l = vec![0.0f32; 512];
    let mut r = vec![0.0f32; 512];
    proc.process(&mut l, &mut r, &TransportInfo::default());

    assert!(
        l[..130].iter().chain(r[..130].iter()).all(|&s| s == 0.0),
        "audio before the event offset"
    );
    assert!(l[130..].iter().any(|&s| s != 0.0), "no audio after onset");
}

#[test]
fn split_buffers_and_whole_buffers_render_identically() {
    // Rendering 512 samples in one call must equal two 256-sample calls -
    // block-size boundaries cannot change the output.
    let make = || {
        let mut p = BlockProcessor::new(engine(4));
        p.queue_event(MidiEvent::note_on(60, 100, 0));
        p
    };
    let transport = TransportInfo::default();

    let mut whole = make();
    let mut l1 = vec![0.0f32; 512];
    let mut r1 = vec![0.0f32; 512];
    whole.process(&mut l1, &mut r1, &transport);

    let mut split = make();
    let mut l2 = vec![0.0f32; 512];
    let mut r2 = vec![0.0f32; 512];
    {
        let (la, lb) = l2.split_at_mut(256);
        let (ra, rb) = r2.split_at_mut(256);
        split.process(la, ra, &transport);
        let shifted = TransportInfo {
            sample_position: 256,
            ..transport
        };
        split.process(lb, rb, &shifted);
    }

    for i in 0..512 {
        assert_eq!(
            l1[i].to_bits(),
            l2[i].to_bits(),
            "left sample {} differs between whole and split rendering",
            i
        );
        assert_eq!(r1[i].to_bits(), r2[i].to_bits(), "right sample {}", i);
    }
}

// ---------------------------------------------------------------------------
// 9. Mode semantics end to end
// ---------------------------------------------------------------------------

#[test]
fn unison_mode_is_not_louder_than_poly_mode() {
    let run_mode = |mode: VoiceMode| -> f32 {
        let mut e = engine(8);
        let mut params = EngineParams::default();
        params.voice_mode = mode;
        params.unison_voices = 4;
        params.unison_detune_cents = 0.0; // identical voices, worst case
        params.unison_stereo_spread = 0.0;
        e.set_parameters(&params);
        e.note_on(60, 100);
        let (l, _) = render(&mut e, 40);
        l.iter().fold(0.0f32, |m, &s| m.max(s.abs()))
    };

    let poly_peak = run_mode(VoiceMode::Poly);
    let unison_peak = run_mode(VoiceMode::Unison);
    assert!(
        unison_peak < poly_peak * 2.5,
        "unison loudness must be normalized: {} vs {}",
        unison_peak,
        poly_peak
    );
}

#[test]
fn legato_mode_glides_instead_of_retriggering() {
    let mut e = engine(4);
    let mut params = EngineParams::default();
    params.voice_mode = VoiceMode::Legato;
    params.voice.glide_time_ms = 50.0;
    params.voice.amp_eg.attack_ms = 1.0;
    params.voice.amp_eg.decay_ms = 2.0;
    e.set_parameters(&params);

    e.note_on(48, 100);
    render(&mut e, 30); // settle into sustain

    let sustain_level = e.voices()[0].mod_values().get(ModSource::AmpEg);
    e.note_on(60, 100); // overlapping: no retrigger, pitch glides
    render(&mut e, 2);
    let after = e.voices()[0].mod_values().get(ModSource::AmpEg);

    assert_eq!(e.active_voice_count(), 1);
    assert!(
        (after - sustain_level).abs() < 0.1,
        "legato restarted the envelope: {} -> {}",
        sustain_level,
        after
    );
}
