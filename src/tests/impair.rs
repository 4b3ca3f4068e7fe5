use crate::priv_prelude::*;
use super::{frame, HOST_1, HOST_2};

/// Straight-line model of the pipeline: the same draws, in the same order.
fn reference(config: &Config, rng: &mut RandomSource, input: &[u8]) -> Option<Vec<u8>> {
    if config.drop_threshold.is_enabled() && config.drop_threshold.hit(rng.draw()) {
        return None;
    }
    let mut output = input.to_vec();
    if config.corrupt_max_bytes > 0
        && config.corrupt_threshold.is_enabled()
        && config.corrupt_threshold.hit(rng.draw())
    {
        let writes = rng.draw() % u64::from(config.corrupt_max_bytes);
        for _ in 0..writes {
            let offset = (rng.draw() % output.len() as u64) as usize;
            output[offset] = (rng.draw() % 256) as u8;
        }
    }
    let truncate_len = config.truncate_len as usize;
    if truncate_len > 0 && output.len() > truncate_len {
        output.truncate(truncate_len);
    }
    Some(output)
}

fn run(pipeline: &mut ImpairmentPipeline, config: &Config, input: &[u8]) -> (Verdict, Vec<u8>) {
    let mut buffer = BytesMut::from(input);
    let verdict = pipeline.apply(config, &mut buffer);
    (verdict, buffer.to_vec())
}

#[test]
fn passthrough_leaves_frames_alone() {
    let config = Config::default();
    let mut pipeline = ImpairmentPipeline::new(RandomSource::default());
    for tag in 0..100 {
        let input = frame(HOST_1, HOST_2, 64 + tag as usize, tag);
        let (verdict, output) = run(&mut pipeline, &config, &input);
        assert_eq!(verdict, Verdict::Keep { corrupt_writes: 0, truncated: false });
        assert_eq!(output, input);
    }
}

#[test]
fn drop_everything() {
    let config = Config {
        drop_threshold: Threshold::from_percent(100.0),
        ..Config::default()
    };
    assert_eq!(config.drop_threshold, Threshold::ALWAYS);
    let mut pipeline = ImpairmentPipeline::new(RandomSource::seed_from_u64(99));
    for i in 0..10_000 {
        let input = frame(HOST_1, HOST_2, 60, i as u8);
        assert_eq!(run(&mut pipeline, &config, &input).0, Verdict::Drop);
    }
}

#[test]
fn drop_rate_is_approx_correct() {
    const NUM_FRAMES: usize = 20_000;
    const DROP_PERCENT: f64 = 30.0;

    let config = Config {
        drop_threshold: Threshold::from_percent(DROP_PERCENT),
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::default());
    let input = frame(HOST_1, HOST_2, 60, 0);
    let dropped = (0..NUM_FRAMES)
        .filter(|_| run(&mut pipeline, &config, &input).0 == Verdict::Drop)
        .count();
    let drop_rate = (dropped as f64) / (NUM_FRAMES as f64);
    assert!(drop_rate < 0.3 * 1.1);
    assert!(0.3 < drop_rate * 1.1);
}

#[test]
fn truncate_to_sixty() {
    let config = Config {
        truncate_len: 60,
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::default());
    let input = frame(HOST_1, HOST_2, 100, 3);
    let (verdict, output) = run(&mut pipeline, &config, &input);
    assert_eq!(verdict, Verdict::Keep { corrupt_writes: 0, truncated: true });
    assert_eq!(output.len(), 60);
    assert_eq!(&output[..], &input[..60]);
}

#[test]
fn truncate_leaves_short_frames() {
    let config = Config {
        truncate_len: 60,
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::default());
    for len in [12, 59, 60] {
        let input = frame(HOST_1, HOST_2, len, 3);
        let (verdict, output) = run(&mut pipeline, &config, &input);
        assert_eq!(verdict, Verdict::Keep { corrupt_writes: 0, truncated: false });
        assert_eq!(output, input);
    }
}

#[test]
fn corruption_keeps_length_and_bounds_writes() {
    let config = Config {
        corrupt_threshold: Threshold::from_percent(100.0),
        corrupt_max_bytes: 5,
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::seed_from_u64(5));
    let mut saw_corruption = false;
    for tag in 0..500 {
        let input = frame(HOST_1, HOST_2, 100, tag as u8);
        let (verdict, output) = run(&mut pipeline, &config, &input);
        let corrupt_writes = match verdict {
            Verdict::Keep { corrupt_writes, truncated: false } => corrupt_writes,
            verdict => panic!("unexpected verdict {:?}", verdict),
        };
        assert!(corrupt_writes < 5);
        assert_eq!(output.len(), input.len());
        let changed = output.iter().zip(&input).filter(|(x, y)| x != y).count();
        assert!(changed <= corrupt_writes as usize);
        saw_corruption |= changed > 0;
    }
    assert!(saw_corruption);
}

#[test]
fn corruption_is_reproducible() {
    let config = Config {
        corrupt_threshold: Threshold::ALWAYS,
        corrupt_max_bytes: 5,
        ..Config::default()
    };
    let mut pipeline_0 = ImpairmentPipeline::new(RandomSource::new([1, 2, 3]));
    let mut pipeline_1 = ImpairmentPipeline::new(RandomSource::new([1, 2, 3]));
    for tag in 0..100 {
        let input = frame(HOST_1, HOST_2, 80, tag as u8);
        assert_eq!(
            run(&mut pipeline_0, &config, &input),
            run(&mut pipeline_1, &config, &input),
        );
    }
}

#[test]
fn corruption_needs_a_non_zero_byte_budget() {
    let config = Config {
        corrupt_threshold: Threshold::ALWAYS,
        corrupt_max_bytes: 0,
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::default());
    let input = frame(HOST_1, HOST_2, 80, 0);
    let (verdict, output) = run(&mut pipeline, &config, &input);
    assert_eq!(verdict, Verdict::Keep { corrupt_writes: 0, truncated: false });
    assert_eq!(output, input);
}

#[test]
fn stages_match_reference_model() {
    let configs = [
        Config {
            drop_threshold: Threshold::from_percent(25.0),
            corrupt_threshold: Threshold::from_percent(50.0),
            corrupt_max_bytes: 8,
            truncate_len: 70,
            ns_per_byte: 0,
        },
        Config {
            drop_threshold: Threshold::NEVER,
            corrupt_threshold: Threshold::ALWAYS,
            corrupt_max_bytes: 64,
            truncate_len: 20,
            ns_per_byte: 0,
        },
        Config {
            drop_threshold: Threshold::from_percent(90.0),
            corrupt_threshold: Threshold::NEVER,
            corrupt_max_bytes: 3,
            truncate_len: 0,
            ns_per_byte: 0,
        },
    ];
    for config in &configs {
        let mut pipeline = ImpairmentPipeline::new(RandomSource::seed_from_u64(17));
        let mut model_rng = RandomSource::seed_from_u64(17);
        for i in 0..2_000 {
            let input = frame(HOST_1, HOST_2, 14 + (i % 120), i as u8);
            let (verdict, output) = run(&mut pipeline, config, &input);
            let expected = reference(config, &mut model_rng, &input);
            match expected {
                None => assert_eq!(verdict, Verdict::Drop),
                Some(expected) => {
                    assert!(verdict.is_keep());
                    assert_eq!(output, expected);
                },
            }
        }
    }
}

#[test]
fn corruption_offsets_span_the_untruncated_frame() {
    // With truncation to 12 bytes, corruption still picks offsets across all 100 bytes, so the
    // bytes that survive are hit far less often than if offsets were chosen after truncation.
    let config = Config {
        corrupt_threshold: Threshold::ALWAYS,
        corrupt_max_bytes: 2,
        truncate_len: 12,
        ..Config::default()
    };
    let mut pipeline = ImpairmentPipeline::new(RandomSource::seed_from_u64(3));
    let mut total_writes = 0;
    let mut surviving_changes = 0;
    for tag in 0..2_000 {
        let input = frame(HOST_1, HOST_2, 100, tag as u8);
        let (verdict, output) = run(&mut pipeline, &config, &input);
        if let Verdict::Keep { corrupt_writes, truncated } = verdict {
            assert!(truncated);
            total_writes += corrupt_writes;
        }
        assert_eq!(output.len(), 12);
        surviving_changes += output.iter().zip(&input).filter(|(x, y)| x != y).count();
    }
    assert!(total_writes > 500);
    assert!((surviving_changes as f64) < (total_writes as f64) * 0.25);
}
