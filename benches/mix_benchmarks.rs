use std::io::Cursor;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use soundboard::{AudioFormat, Clip, MixingBus, Resampler, SampleProvider, WaveReader, WaveWriter};

fn wave_bytes(format: AudioFormat, secs: usize) -> Vec<u8> {
    let len = format.samples_per_second() as usize * secs;
    let samples: Vec<f32> = (0..len).map(|i| ((i % 200) as f32 / 100.0) - 1.0).collect();
    let mut writer = WaveWriter::new();
    writer.add_samples(&samples);
    writer.to_bytes(format)
}

fn looping_clip(bytes: &[u8], name: &str) -> Arc<Clip> {
    let reader = WaveReader::new(Cursor::new(bytes.to_vec())).unwrap();
    Arc::new(Clip::from_provider(name, Box::new(reader)))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let bytes = wave_bytes(AudioFormat::mono(48000), 10);

    c.bench_function("MixingBus::mix() 4 clips", |b| {
        let bus = MixingBus::new(AudioFormat::mono(48000));
        let clips: Vec<_> = (0..4).map(|i| looping_clip(&bytes, &format!("clip{i}"))).collect();
        let mut output = [0.0f32; 480];
        let mut loopback = [0.0f32; 480];

        b.iter(|| {
            for clip in &clips {
                if clip.is_finished() {
                    clip.restart().unwrap();
                }
                bus.register(Arc::clone(clip));
            }
            bus.mix(black_box(&mut output), black_box(&mut loopback));
        })
    });

    c.bench_function("Resampler::read() 44.1k stereo -> 48k mono", |b| {
        let stereo = wave_bytes(AudioFormat::stereo(44100), 10);
        let reader = WaveReader::new(Cursor::new(stereo)).unwrap();
        let mut resampler = Resampler::new(reader, AudioFormat::mono(48000), true);
        let mut block = [0.0f32; 1024];

        b.iter(|| {
            if resampler.read(black_box(&mut block)).unwrap() == 0 {
                resampler.set_sample_position(0).unwrap();
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
