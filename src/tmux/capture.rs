//! Capture buffer sizing
//!
//! Hosts that routinely produce deep scrollback get proportionally larger
//! capture windows; shallow panes keep the platform baseline.

/// Upper bound for `history_lines`
pub const MAX_HISTORY_LINES: usize = 50_000;

/// Upper bound for `redraw_tail_lines`
pub const MAX_REDRAW_TAIL_LINES: usize = 1_000;

/// How much pane output to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Scrollback lines requested from the pane
    pub history_lines: usize,
    /// Trailing lines used when redrawing the latest output
    pub redraw_tail_lines: usize,
}

/// Platform baseline: linux hosts get a deeper default buffer
pub fn baseline(platform: &str) -> CaptureConfig {
    if platform.trim().eq_ignore_ascii_case("linux") {
        CaptureConfig {
            history_lines: 1200,
            redraw_tail_lines: 100,
        }
    } else {
        CaptureConfig {
            history_lines: 800,
            redraw_tail_lines: 80,
        }
    }
}

/// Recommend capture sizes for a pane that last showed `observed_lines` of
/// history on a host of the given platform
pub fn recommend(observed_lines: usize, platform: &str) -> CaptureConfig {
    recommend_with_baseline(observed_lines, platform, None)
}

/// Like [`recommend`], with an optional configured history baseline
/// replacing the platform's
pub fn recommend_with_baseline(
    observed_lines: usize,
    platform: &str,
    history_override: Option<usize>,
) -> CaptureConfig {
    let mut base = baseline(platform);
    if let Some(history) = history_override.filter(|h| *h > 0) {
        base.history_lines = history.min(MAX_HISTORY_LINES);
    }

    if observed_lines <= base.history_lines {
        return base;
    }

    // Grow in whole baseline steps; the tail grows by 40% of its baseline
    // per extra step.
    let steps = observed_lines.div_ceil(base.history_lines);
    let history_lines = base
        .history_lines
        .saturating_mul(steps)
        .min(MAX_HISTORY_LINES);
    let tail_growth = base
        .redraw_tail_lines
        .saturating_mul(2)
        .saturating_mul(steps - 1)
        / 5;
    let redraw_tail_lines = base
        .redraw_tail_lines
        .saturating_add(tail_growth)
        .min(MAX_REDRAW_TAIL_LINES);

    CaptureConfig {
        history_lines,
        redraw_tail_lines,
    }
}
