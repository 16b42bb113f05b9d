//! Forward time windows over a track's elapsed-time axis.

use std::ops::Range;

/// Shape of a forward window anchored at a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpec {
    /// Up to (excluding) the sample nearest `t0 + lookahead_s`, which must
    /// be within `tolerance_s` of that target.
    Nearest { lookahead_s: i64, tolerance_s: i64 },
    /// Every sample with `t < t0 + horizon_s`.
    Horizon { horizon_s: i64 },
}

/// Index range of the window starting at sample `from`.
///
/// `times` must be non-decreasing. Returns `None` when `from` is out of
/// range or, for [`WindowSpec::Nearest`], no sample is close enough to the
/// target time.
pub fn forward_window(times: &[i64], from: usize, spec: WindowSpec) -> Option<Range<usize>> {
    let t0 = *times.get(from)?;

    match spec {
        WindowSpec::Nearest {
            lookahead_s,
            tolerance_s,
        } => {
            let target = t0 + lookahead_s;
            let mut best: Option<(usize, i64)> = None;
            for (i, &t) in times.iter().enumerate().skip(from) {
                let diff = (t - target).abs();
                if best.map_or(true, |(_, d)| diff < d) {
                    best = Some((i, diff));
                }
            }
            let (idx, diff) = best?;
            (diff <= tolerance_s).then_some(from..idx)
        }
        WindowSpec::Horizon { horizon_s } => {
            let limit = t0 + horizon_s;
            let len = times[from..].partition_point(|&t| t < limit);
            Some(from..from + len)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
