//! Criterion benchmarks for the voce-synth engine
//!
//! Run with: cargo bench -p voce-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use voce_core::TransportInfo;
use voce_registry::CoreRegistry;
use voce_synth::{
    BlockProcessor, EngineParams, MidiEvent, ModDest, ModMatrix, ModMatrixParams, ModSource,
    SynthEngine, VoiceModValues,
};

const SAMPLE_RATE: f32 = 48000.0;

// ============================================================================
// Engine render throughput
// ============================================================================

fn bench_engine_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine");

    for &voices in &[1usize, 4, 8, 16] {
        let mut engine = SynthEngine::new(CoreRegistry::with_builtins(), SAMPLE_RATE, 64, 16);
        engine.set_parameters(&EngineParams::default());
        for i in 0..voices {
            engine.note_on(48 + (i as u8 * 5), 100);
        }
        // Settle the attacks so the benchmark measures steady state.
        let transport = TransportInfo::default();
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        for _ in 0..100 {
            engine.render(&mut l, &mut r, &transport);
        }

        group.bench_with_input(
            BenchmarkId::new("render_64", voices),
            &voices,
            |b, _| {
                b.iter(|| {
                    engine.render(&mut l, &mut r, &transport);
                    black_box(l[0])
                })
            },
        );
    }

    group.finish();
}

fn bench_engine_with_full_matrix(c: &mut Criterion) {
    let mut engine = SynthEngine::new(CoreRegistry::with_builtins(), SAMPLE_RATE, 64, 16);
    let mut params = EngineParams::default();
    for p in &mut params.voice.oscillators {
        p.enabled = true;
    }
    params.voice.filters[1].enabled = true;
    for source in ModSource::ALL {
        for dest in ModDest::ALL {
            params.voice.matrix.route(source, dest, 0.1);
        }
    }
    engine.set_parameters(&params);
    for note in [48, 55, 60, 64, 67, 72, 76, 79] {
        engine.note_on(note, 100);
    }

    let transport = TransportInfo::default();
    let mut l = [0.0f32; 64];
    let mut r = [0.0f32; 64];

    c.bench_function("Engine/render_64_full_matrix_8_voices", |b| {
        b.iter(|| {
            engine.render(&mut l, &mut r, &transport);
            black_box(l[0])
        })
    });
}

// ============================================================================
// Block processor with event dispatch
// ============================================================================

fn bench_block_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("BlockProcessor");

    for &buffer_len in &[64usize, 256, 480, 1024] {
        let engine = SynthEngine::new(CoreRegistry::with_builtins(), SAMPLE_RATE, 64, 16);
        let mut proc = BlockProcessor::new(engine);
        proc.queue_event(MidiEvent::note_on(60, 100, 0));
        let transport = TransportInfo::default();
        let mut l = vec![0.0f32; buffer_len];
        let mut r = vec![0.0f32; buffer_len];
        proc.process(&mut l, &mut r, &transport);

        group.bench_with_input(
            BenchmarkId::new("process", buffer_len),
            &buffer_len,
            |b, _| {
                b.iter(|| {
                    // A pair of mid-buffer events exercises the splitting.
                    proc.queue_event(MidiEvent::note_on(64, 100, 10));
                    proc.queue_event(MidiEvent::note_off(64, (buffer_len / 2) as u32));
                    proc.process(&mut l, &mut r, &transport);
                    black_box(l[0])
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Modulation matrix evaluation
// ============================================================================

fn bench_mod_matrix(c: &mut Criterion) {
    let mut params = ModMatrixParams::new();
    for source in ModSource::ALL {
        for dest in ModDest::ALL {
            params.route(source, dest, 0.25);
        }
    }
    let mut matrix = ModMatrix::new();
    matrix.set_parameters(&params);

    let mut values = VoiceModValues::new();
    for (i, source) in ModSource::ALL.iter().enumerate() {
        values.set(*source, 0.1 * i as f32);
    }

    c.bench_function("ModMatrix/all_destinations", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for dest in ModDest::ALL {
                sum += matrix.compute_destination(dest, &values);
            }
            black_box(sum)
        })
    });
}

criterion_group!(
    benches,
    bench_engine_render,
    bench_engine_with_full_matrix,
    bench_block_processor,
    bench_mod_matrix
);
criterion_main!(benches);
