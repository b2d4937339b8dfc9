#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use zenstream::pnm::PnmSource;
use zenstream::{Limits, MemorySink, Rect, Source, pump, resize, scale};

fuzz_target!(|data: &[u8]| {
    // First four bytes pick the output geometry, the rest is the image
    let Some((geometry, image)) = data.split_first_chunk::<4>() else {
        return;
    };
    let limits = Limits {
        max_pixels: Some(1 << 16),
        ..Default::default()
    };
    let Ok(source) = PnmSource::with_limits(Cursor::new(image.to_vec()), Some(&limits)) else {
        return;
    };
    let w = u32::from(geometry[0]) + 1;
    let h = u32::from(geometry[1]) + 1;
    let Ok(scaled) = scale(Box::new(source), w, h) else {
        return;
    };
    let rect = Rect::new(i64::from(geometry[2] as i8), i64::from(geometry[3] as i8), w, h);
    let Ok(mut out) = resize(scaled, rect) else {
        return;
    };

    let mut sink = MemorySink::new(out.encoding(), w, h);
    let rows = pump(&mut out, &mut sink, &enough::Unstoppable);
    out.close();
    if rows.is_ok() {
        assert_eq!(sink.rows().len(), h as usize, "complete stream delivered a short image");
    }
});
