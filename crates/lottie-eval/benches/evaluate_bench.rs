use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lottie_data::model::{Keyframe, Property};
use lottie_eval::animatable::{PropertyOptions, ScalarProperty};
use lottie_eval::easing::EasingCache;
use lottie_eval::{Composition, EvalConfig, FrameContext};
use serde_json::json;

fn bench_scalar_property(c: &mut Criterion) {
    let mut group = c.benchmark_group("ScalarProperty::get_value");

    let count = 10_000;
    let keyframes: Vec<Keyframe<f32>> = (0..count)
        .map(|i| Keyframe::at(i as f32, i as f32))
        .collect();
    let property = Property::animated(keyframes);
    let mut cache = EasingCache::new(EvalConfig::default());
    let mut scalar =
        ScalarProperty::scalar(&property, 0.0, PropertyOptions::default(), &mut cache);

    // Sequential playback hits the cached index; scattered seeks rescan.
    group.bench_function("sequential", |b| {
        let mut epoch = 0;
        b.iter(|| {
            epoch += 1;
            let frame = (epoch % count) as f32 + 0.5;
            black_box(scalar.get_value(&FrameContext::new(frame, epoch, 30.0)))
        })
    });
    for &frame in &[100.0, 5000.0, 9990.0] {
        group.bench_with_input(BenchmarkId::new("seek", frame), &frame, |b, &f| {
            b.iter(|| black_box(scalar.value_at_frame(f)))
        });
    }

    group.finish();
}

fn bench_composition(c: &mut Criterion) {
    let shapes: Vec<_> = (0..20)
        .map(|i| {
            json!({
                "ty": "gr",
                "it": [
                    {
                        "ty": "sr",
                        "p": { "k": [i * 10, 0] },
                        "or": { "a": 1, "k": [{ "t": 0, "s": [20] }, { "t": 60, "s": [40] }] },
                        "ir": { "k": 10 },
                        "pt": { "k": 5 },
                        "sy": 1
                    },
                    {
                        "ty": "tm",
                        "s": { "k": 0 },
                        "e": { "a": 1, "k": [{ "t": 0, "s": [0] }, { "t": 60, "s": [100] }] },
                        "o": { "k": 0 }
                    },
                    { "ty": "rp", "c": { "k": 4 }, "tr": { "ty": "tr", "r": { "k": 30 } } },
                    {
                        "ty": "tr",
                        "r": { "a": 1, "k": [{ "t": 0, "s": [0] }, { "t": 60, "s": [360] }] }
                    }
                ]
            })
        })
        .collect();
    let doc = json!({
        "ip": 0, "op": 60, "fr": 30, "w": 512, "h": 512,
        "layers": [{ "ty": 4, "ind": 1, "ip": 0, "op": 60, "ks": {}, "shapes": shapes }]
    })
    .to_string();

    let mut comp = match Composition::from_json(&doc, EvalConfig::default()) {
        Ok(comp) => comp,
        Err(e) => panic!("bench document failed to load: {e}"),
    };
    let mut frame = 0.0;
    c.bench_function("Composition::evaluate", |b| {
        b.iter(|| {
            frame = (frame + 1.0) % 60.0;
            comp.evaluate(black_box(frame));
        })
    });
}

criterion_group!(benches, bench_scalar_property, bench_composition);
criterion_main!(benches);
