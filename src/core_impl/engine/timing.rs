use super::*;

const STATS_DECIMAL_DIGITS_COUNT: i32 = 4;

fn beautify(value: f64) -> f64 {
    let factor = 10f64.powi(STATS_DECIMAL_DIGITS_COUNT);
    (value * factor).round() / factor
}

/// Running statistics of a rule's apply durations, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingStats {
    pub applies_timings: Vec<f64>,
    pub applies_count: usize,
    pub timings_sum: f64,
    pub mean_timing: f64,
    squared_sum: f64,
    pub standard_deviation: f64,
}

impl TimingStats {
    pub(crate) fn push(&mut self, elapsed_ms: f64) {
        self.applies_timings.push(elapsed_ms);
        self.applies_count += 1;
        self.timings_sum += elapsed_ms;
        self.mean_timing = self.timings_sum / self.applies_count as f64;
        self.squared_sum += elapsed_ms * elapsed_ms;
        let variance = self.squared_sum / self.applies_count as f64 - self.mean_timing.powi(2);
        // rounding can push a zero variance slightly below zero
        self.standard_deviation = variance.max(0.0).sqrt();
    }

    /// Copy with every figure rounded to four decimals.
    pub fn beautified(&self) -> Self {
        Self {
            applies_timings: self.applies_timings.iter().copied().map(beautify).collect(),
            applies_count: self.applies_count,
            timings_sum: beautify(self.timings_sum),
            mean_timing: beautify(self.mean_timing),
            squared_sum: self.squared_sum,
            standard_deviation: beautify(self.standard_deviation),
        }
    }
}

/// Debug report entry of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTimings<N> {
    pub selector: String,
    pub timings: TimingStats,
    /// Removal rules report no style and no matched elements.
    pub removed: bool,
    pub style_applied: Option<Style>,
    pub matched_elements: Vec<N>,
}

/// Parsed rule plus the state the engine keeps for it.
#[derive(Debug, Clone)]
pub(crate) struct RuleState<N> {
    pub(crate) rule: Rule,
    pub(crate) timing_stats: Option<TimingStats>,
    pub(crate) matched_elements: Vec<N>,
}

impl<N: Clone> RuleState<N> {
    pub(crate) fn new(rule: Rule) -> Self {
        Self {
            rule,
            timing_stats: None,
            matched_elements: Vec::new(),
        }
    }

    pub(crate) fn record_timing(&mut self, elapsed_ms: f64) {
        self.timing_stats
            .get_or_insert_with(TimingStats::default)
            .push(elapsed_ms);
    }

    pub(crate) fn timings(&self) -> Option<RuleTimings<N>> {
        let stats = self.timing_stats.as_ref()?;
        let removed = self.rule.style.as_ref().is_some_and(Style::is_remove);
        Some(RuleTimings {
            selector: self.rule.selector.clone(),
            timings: stats.beautified(),
            removed,
            style_applied: if removed { None } else { self.rule.style.clone() },
            matched_elements: if removed {
                Vec::new()
            } else {
                self.matched_elements.clone()
            },
        })
    }
}
