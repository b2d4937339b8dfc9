//! Pattern tests: synthetic images pushed through filter chains and compared
//! against direct computations on the full image.

use enough::Unstoppable;
use rgb::Rgba;
use zenstream::*;

fn checkerboard(w: usize, h: usize) -> Vec<Vec<u8>> {
    (0..h)
        .map(|y| {
            (0..w)
                .map(|x| if (x + y) % 2 == 0 { 200 } else { 10 })
                .collect()
        })
        .collect()
}

fn noise_pattern(w: usize, h: usize) -> Vec<Vec<u8>> {
    let mut state: u32 = 0xDEAD_BEEF;
    (0..h)
        .map(|_| {
            (0..w)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    state as u8
                })
                .collect()
        })
        .collect()
}

fn source_of(pixels: &[Vec<u8>]) -> Box<dyn Source> {
    let rows = pixels.iter().map(|r| PixelRow::from(r.clone())).collect();
    Box::new(MemorySource::new(rows).unwrap())
}

fn collect_gray(mut source: Box<dyn Source>) -> Vec<Vec<u8>> {
    let (w, h) = source.size();
    let mut sink = MemorySink::new(PixelEncoding::Gray8, w, h);
    pump(&mut source, &mut sink, &Unstoppable).unwrap();
    source.close();
    sink.rows()
        .iter()
        .map(|r| (0..r.width()).map(|x| r.get(x).map_or(0, Color::to_gray8)).collect())
        .collect()
}

// ── Coefficients ─────────────────────────────────────────────────────

#[test]
fn coefficient_scenarios() {
    let c = compute_coefficients(5, 1);
    assert_eq!(c.len(), 5);
    assert!(c.iter().all(|c| c.dest == 0 && (c.weight - 0.2).abs() < 1e-6));

    let c = compute_coefficients(1, 5);
    assert_eq!(c.len(), 5);
    for (i, c) in c.iter().enumerate() {
        assert_eq!((c.source, c.dest, c.weight), (0, i as u32, 1.0));
    }

    let c = compute_coefficients(2, 4);
    let expected = [
        (0, 0, 1.0),
        (0, 1, 0.667),
        (1, 1, 0.333),
        (0, 2, 0.333),
        (1, 2, 0.667),
        (1, 3, 1.0),
    ];
    assert_eq!(c.len(), expected.len());
    for (c, (s, d, w)) in c.iter().zip(expected) {
        assert_eq!((c.source, c.dest), (s, d));
        assert!((c.weight - w).abs() < 1e-3);
    }
}

// ── Scaling ──────────────────────────────────────────────────────────

#[test]
fn halving_noise_matches_box_average() {
    let img = noise_pattern(16, 10);
    let out = collect_gray(scale(source_of(&img), 8, 5).unwrap());
    for (y, row) in out.iter().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            let sum: u32 = [(0, 0), (1, 0), (0, 1), (1, 1)]
                .iter()
                .map(|&(dx, dy)| u32::from(img[2 * y + dy][2 * x + dx]))
                .sum();
            let expected = (sum as f32 / 4.0).round() as i32;
            assert!((i32::from(v) - expected).abs() <= 1, "({x},{y}): {v} vs {expected}");
        }
    }
}

#[test]
fn checkerboard_averages_to_mid_gray() {
    let img = checkerboard(8, 8);
    let out = collect_gray(scale(source_of(&img), 1, 1).unwrap());
    assert_eq!(out, vec![vec![105]]);
}

#[test]
fn scaling_color_keeps_alpha() {
    let px = Rgba::<u8> {
        r: 40,
        g: 80,
        b: 120,
        a: 100,
    };
    let rows = (0..6).map(|_| PixelRow::from(vec![px; 6])).collect();
    let mut scaled = scale(Box::new(MemorySource::new(rows).unwrap()), 4, 9).unwrap();
    let mut row = scaled.new_row();
    while scaled.read_row(&mut row).unwrap() == 1 {
        assert_eq!(row, PixelRow::from(vec![px; 4]));
    }
}

// ── Cropping ─────────────────────────────────────────────────────────

#[test]
fn crop_matches_direct_slicing() {
    let img = noise_pattern(20, 15);
    let rect = Rect::new(3, 4, 9, 7);
    let out = collect_gray(resize(source_of(&img), rect).unwrap());
    let expected: Vec<Vec<u8>> = img[4..11].iter().map(|r| r[3..12].to_vec()).collect();
    assert_eq!(out, expected);
}

#[test]
fn scale_then_crop_chain() {
    let img = checkerboard(10, 10);
    let scaled = scale(source_of(&img), 20, 20).unwrap();
    let cropped = resize(scaled, Rect::new(18, 18, 4, 4)).unwrap();
    let out = collect_gray(cropped);
    assert_eq!(out.len(), 4);
    assert_eq!(&out[0][2..], &[255, 255]);
    assert_eq!(out[3], vec![255; 4]);
    // Bottom-right source pixel sits exactly on the last output sample.
    assert_eq!(out[1][1], img[9][9]);
}

// ── Transformer and windowed access ──────────────────────────────────

#[test]
fn transformer_rotates_180_within_window() {
    let img = noise_pattern(7, 6);
    let config = StreamConfig::default().with_window_rows(6);
    let t = Transformer::new(source_of(&img), 7, 6, PixelEncoding::Gray8, &config, |src, dst, stop| {
        let (w, h) = src.size();
        for y in 0..h {
            stop.check()?;
            for x in 0..w {
                dst.set_pixel(w - 1 - x, h - 1 - y, src.pixel(x, y));
            }
        }
        Ok(())
    })
    .unwrap();
    let out = collect_gray(Box::new(t));
    let expected: Vec<Vec<u8>> = img
        .iter()
        .rev()
        .map(|r| r.iter().rev().copied().collect())
        .collect();
    assert_eq!(out, expected);
}

#[test]
fn transformer_feeds_scaler() {
    let img = checkerboard(6, 6);
    let inverted = Transformer::new(
        source_of(&img),
        6,
        6,
        PixelEncoding::Gray8,
        &StreamConfig::default(),
        |src, dst, _stop| {
            let (w, h) = src.size();
            for y in 0..h {
                for x in 0..w {
                    let v = src.pixel(x, y).to_gray8();
                    dst.set_pixel(x, y, Color::Gray8(255 - v));
                }
            }
            Ok(())
        },
    )
    .unwrap();
    let out = collect_gray(scale(Box::new(inverted), 3, 3).unwrap());
    // (55 + 245) / 2
    assert_eq!(out, vec![vec![150; 3]; 3]);
}

#[test]
fn windowed_source_backward_access_is_lossy() {
    let img = noise_pattern(4, 20);
    let mut view = WindowedSource::new(source_of(&img), &StreamConfig::default().with_window_rows(4));
    assert_eq!(view.pixel(1, 10), Color::Gray8(img[10][1]));
    assert_eq!(view.pixel(1, 7), Color::Gray8(img[7][1]));
    // Row 6 has left the window: documented fallback, not an error.
    assert_eq!(view.pixel(1, 6), PixelEncoding::Gray8.transparent());
    assert!(view.error().is_none());
}

// ── Loopback ─────────────────────────────────────────────────────────

#[test]
fn loopback_two_of_four_rows() {
    let (mut writer, mut reader) = loopback(3, 4, PixelEncoding::Gray8, DEFAULT_QUEUE_CAPACITY);
    writer.write_row(&PixelRow::from(vec![1u8; 3])).unwrap();
    writer.write_row(&PixelRow::from(vec![2u8; 3])).unwrap();
    writer.close().unwrap();

    let mut row = reader.new_row();
    assert_eq!(reader.read_row(&mut row).unwrap(), 1);
    assert_eq!(row, PixelRow::from(vec![1u8; 3]));
    assert_eq!(reader.read_row(&mut row).unwrap(), 1);
    assert_eq!(row, PixelRow::from(vec![2u8; 3]));
    assert!(matches!(reader.read_row(&mut row), Err(StreamError::UnexpectedEnd)));
    assert_eq!(reader.read_row(&mut row).unwrap(), 0);
    assert_eq!(reader.read_row(&mut row).unwrap(), 0);
}

#[test]
fn loopback_bridges_a_pipeline_across_threads() {
    let img = noise_pattern(32, 48);
    let (mut writer, reader) = loopback(16, 24, PixelEncoding::Gray8, 2);
    let mut scaled = scale(source_of(&img), 16, 24).unwrap();
    let producer = std::thread::spawn(move || {
        pump(&mut scaled, &mut writer, &Unstoppable).unwrap();
        writer.close().unwrap();
    });
    let out = collect_gray(Box::new(reader));
    producer.join().unwrap();
    assert_eq!(out, collect_gray(scale(source_of(&img), 16, 24).unwrap()));
}
