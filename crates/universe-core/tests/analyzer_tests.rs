use std::f32::consts::TAU;

use universe_core::constants::DEFAULT_FFT_SIZE;
use universe_core::*;

const SR: u32 = 48_000;
const FFT: usize = 2048;

fn analyzer_with_sine(freq_hz: f32, amplitude: f32) -> AudioAnalyzer {
    let samples: Vec<f32> = (0..FFT * 2)
        .map(|i| amplitude * (TAU * freq_hz * i as f32 / SR as f32).sin())
        .collect();
    AudioAnalyzer::with_tap(AnalyserTap::from_samples(FFT, &samples), SR)
}

#[test]
fn silence_has_zero_bands() {
    let mut analyzer = AudioAnalyzer::with_tap(AnalyserTap::new(FFT), SR);
    assert_eq!(analyzer.frequency_bands(), FrequencyBands::default());
    assert_eq!(analyzer.rms(), 0.0);
}

#[test]
fn low_sine_is_bass_dominant() {
    let bands = analyzer_with_sine(100.0, 0.8).frequency_bands();
    assert!(bands.bass > bands.mid, "{bands:?}");
    assert!(bands.bass > 10.0 * bands.treble, "{bands:?}");
}

#[test]
fn high_sine_is_treble_dominant() {
    let bands = analyzer_with_sine(5000.0, 0.8).frequency_bands();
    assert!(bands.treble > bands.mid, "{bands:?}");
    assert!(bands.treble > 10.0 * bands.bass, "{bands:?}");
}

#[test]
fn bin_centred_sine_reads_its_amplitude() {
    let bin = 64;
    let freq = bin as f32 * SR as f32 / FFT as f32;
    let mut analyzer = analyzer_with_sine(freq, 1.0);
    assert_eq!(analyzer.bin_count(), FFT / 2 + 1);
    assert!((analyzer.bin_frequency(bin) - freq).abs() < 1e-3);
    let mut data = vec![0.0; analyzer.bin_count()];
    analyzer.frequency_data(&mut data);
    assert!((data[bin] - 1.0).abs() < 0.05, "peak {}", data[bin]);
    let peak = data
        .iter()
        .enumerate()
        .fold((0, 0.0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
    assert_eq!(peak.0, bin);
}

#[test]
fn rms_of_full_scale_sine() {
    let mut analyzer = analyzer_with_sine(1000.0, 1.0);
    let rms = analyzer.rms();
    assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01, "rms {rms}");
}

#[test]
fn bands_above_nyquist_read_zero() {
    // 8 kHz sample rate: Nyquist 4 kHz, treble band clipped to 2–4 kHz
    let tap = AnalyserTap::from_samples(256, &[0.5; 256]);
    let mut analyzer = AudioAnalyzer::with_tap(tap, 8000);
    assert!(analyzer.frequency_bands().treble.is_finite());

    // 2 kHz sample rate: Nyquist 1 kHz, treble band is empty
    let tap = AnalyserTap::from_samples(256, &[0.5; 256]);
    let mut analyzer = AudioAnalyzer::with_tap(tap, 2000);
    assert_eq!(analyzer.frequency_bands().treble, 0.0);
}

#[test]
fn analyzer_reads_graph_output_without_changing_it() {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = OfflineDevice::new();
    let mut graph = AudioSynthesisGraph::new(
        AudioContext::new(SR),
        Box::new(device.clone()),
        AudioConfig::default(),
    );
    graph.initialize().unwrap();
    let mut analyzer = AudioAnalyzer::new(&graph);
    assert_eq!(analyzer.fft_size(), DEFAULT_FFT_SIZE);
    assert_eq!(analyzer.rms(), 0.0);

    graph.trigger_note(&NoteEvent {
        frequency_hz: 220.0,
        velocity: 1.0,
        start_time_sec: 0.0,
        duration_sec: 0.5,
    });
    let out = device.render(FFT);
    let mut wave = vec![0.0; FFT];
    analyzer.waveform(&mut wave);
    assert_eq!(wave, out);
    for _ in 0..10 {
        analyzer.frequency_bands();
    }
    assert!(analyzer.rms() > 0.0);
    assert_eq!(graph.context().current_frame(), FFT as u64);
}
