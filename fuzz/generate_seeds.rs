#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn main() {
    use std::fs;
    let decode = "fuzz/corpus/fuzz_decode";
    let scale = "fuzz/corpus/fuzz_scale";
    fs::create_dir_all(decode).unwrap();
    fs::create_dir_all(scale).unwrap();

    let seeds: Vec<(&str, Vec<u8>)> = vec![
        // PPM 2x2
        ("ppm_2x2.ppm", b"P6\n2 2\n255\n\xff\x00\x00\x00\xff\x00\x00\x00\xff\x80\x80\x80".to_vec()),
        // PGM 3x2
        ("pgm_3x2.pgm", b"P5\n3 2\n255\n\x00\x40\x80\xc0\xff\x64".to_vec()),
        // PGM 16-bit 2x1
        ("pgm16_2x1.pgm", b"P5\n2 1\n65535\n\x00\x01\xff\xfe".to_vec()),
        // PGM with comments and odd maxval
        ("pgm_comment.pgm", b"P5\n# scanner\n2 1 # size\n15\n\x00\x0f".to_vec()),
        // PAM RGBA 1x1
        (
            "pam_rgba_1x1.pam",
            b"P7\nWIDTH 1\nHEIGHT 1\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n\xff\x00\x00\xff".to_vec(),
        ),
        // PAM gray+alpha 1x1
        (
            "pam_ga_1x1.pam",
            b"P7\nWIDTH 1\nHEIGHT 1\nDEPTH 2\nMAXVAL 255\nTUPLTYPE GRAYSCALE_ALPHA\nENDHDR\n\x80\x40".to_vec(),
        ),
        // Truncated/malformed seeds for edge coverage
        ("empty.bin", Vec::new()),
        ("just_p6.bin", b"P6".to_vec()),
        ("short_rows.pgm", b"P5\n4 4\n255\n\x01\x02\x03".to_vec()),
        ("p7_no_endhdr.bin", b"P7\nWIDTH 1\nHEIGHT 1\n".to_vec()),
    ];

    for (name, bytes) in &seeds {
        fs::write(format!("{decode}/{name}"), bytes).unwrap();
        // fuzz_scale reads four geometry bytes ahead of the image
        let mut prefixed = vec![3, 2, 0xFF, 1];
        prefixed.extend_from_slice(bytes);
        fs::write(format!("{scale}/{name}"), prefixed).unwrap();
    }

    println!("Generated seed corpus in {decode}/ and {scale}/");
}
