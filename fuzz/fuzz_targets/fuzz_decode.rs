#![no_main]
use libfuzzer_sys::fuzz_target;
use zenstream::pnm::PnmSource;
use zenstream::{Limits, MemorySink, Source, pump};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 20),
        ..Default::default()
    };
    // Header parsing and row decoding must never panic
    let Ok(mut source) = PnmSource::with_limits(data, Some(&limits)) else {
        return;
    };
    let (w, h) = source.size();
    let mut sink = MemorySink::new(source.encoding(), w, h);
    let _ = pump(&mut source, &mut sink, &enough::Unstoppable);
    source.close();
});
