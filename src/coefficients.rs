//! Per-axis resampling weights.
//!
//! Downscaling (and 1:1) uses the area model: source sample `i` covers
//! `[i, i + 1)`, destination sample `d` covers `[d * S / D, (d + 1) * S / D)`,
//! and the weight of a pair is their overlap divided by the destination's
//! footprint. Overlaps are computed in integer units of `1 / D`, so the weights
//! of one destination sample always add up to 1.
//!
//! Upscaling interpolates linearly between the two nearest source samples,
//! with the first and last samples of both axes aligned.

/// Weight of one source sample in one destination sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleCoefficient {
    pub source: u32,
    pub dest: u32,
    pub weight: f32,
}

/// Weights mapping an axis of `source_len` samples onto `dest_len` samples.
///
/// Sorted by `dest`, then `source`. Empty when either length is zero.
///
/// ```
/// use zenstream::compute_coefficients;
///
/// let c = compute_coefficients(5, 1);
/// assert_eq!(c.len(), 5);
/// assert!(c.iter().all(|c| c.dest == 0 && (c.weight - 0.2).abs() < 1e-6));
/// ```
pub fn compute_coefficients(source_len: u32, dest_len: u32) -> Vec<ScaleCoefficient> {
    if source_len == 0 || dest_len == 0 {
        return Vec::new();
    }
    if source_len == 1 {
        return (0..dest_len)
            .map(|dest| ScaleCoefficient {
                source: 0,
                dest,
                weight: 1.0,
            })
            .collect();
    }
    if dest_len <= source_len {
        area_coefficients(source_len, dest_len)
    } else {
        interpolation_coefficients(source_len, dest_len)
    }
}

fn area_coefficients(source_len: u32, dest_len: u32) -> Vec<ScaleCoefficient> {
    let s = u64::from(source_len);
    let d = u64::from(dest_len);
    let mut out = Vec::with_capacity(source_len as usize + dest_len as usize);
    for dest in 0..d {
        let lo = dest * s;
        let hi = lo + s;
        let first = lo / d;
        let last = (hi - 1) / d;
        for source in first..=last {
            let overlap = hi.min((source + 1) * d) - lo.max(source * d);
            if overlap == 0 {
                continue;
            }
            out.push(ScaleCoefficient {
                source: source as u32,
                dest: dest as u32,
                weight: (overlap as f64 / s as f64) as f32,
            });
        }
    }
    out
}

fn interpolation_coefficients(source_len: u32, dest_len: u32) -> Vec<ScaleCoefficient> {
    let span = u64::from(source_len - 1);
    let den = u64::from(dest_len - 1);
    let mut out = Vec::with_capacity(dest_len as usize * 2);
    for dest in 0..u64::from(dest_len) {
        let pos = dest * span;
        let source = (pos / den) as u32;
        let rem = pos % den;
        if rem == 0 {
            out.push(ScaleCoefficient {
                source,
                dest: dest as u32,
                weight: 1.0,
            });
            continue;
        }
        out.push(ScaleCoefficient {
            source,
            dest: dest as u32,
            weight: ((den - rem) as f64 / den as f64) as f32,
        });
        out.push(ScaleCoefficient {
            source: source + 1,
            dest: dest as u32,
            weight: (rem as f64 / den as f64) as f32,
        });
    }
    out
}

/// Number of already consumed source samples, besides the newest one, that
/// must stay addressable to apply `coefficients` in order without re-reading.
///
/// Scanning in order, this is the largest gap between the highest source index
/// seen so far and the current coefficient's source index.
pub fn history_depth(coefficients: &[ScaleCoefficient]) -> usize {
    let mut highest = 0u32;
    let mut depth = 0u32;
    for c in coefficients {
        highest = highest.max(c.source);
        depth = depth.max(highest - c.source);
    }
    depth as usize
}
