//! Heuristic detection of repeated tool calls indicating agent stagnation.
//!
//! Keeps a bounded ring of the most recent tool calls and looks for three
//! patterns: the same call repeated, two calls oscillating, or one tool
//! dominating the window. None of these stop execution by themselves —
//! the loop decides whether to inject a nudge or terminate.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Size of the ring buffer of remembered calls.
const WINDOW: usize = 20;
/// How far back "recent" repetition detection looks.
const RECENT: usize = 5;
/// Minimum occurrences within `RECENT` to flag identical-call repetition.
const REPEAT_THRESHOLD: usize = 3;
/// Minimum window fill before saturation is considered (avoids false
/// positives on a freshly-started execution).
const SATURATION_MIN_WINDOW: usize = 10;
/// Fraction of the full window one tool must occupy to count as saturated.
const SATURATION_FRACTION: f64 = 0.8;

/// A remembered tool call: name plus a hash of its canonicalized arguments.
#[derive(Debug, Clone)]
struct CallRecord {
    tool_name: String,
    args_hash: u64,
}

/// A heuristic indication that the agent is stuck in a loop.
///
/// Detection order is repetition, then oscillation, then saturation — the
/// first matching pattern wins, since repetition is the strongest signal
/// and saturation the weakest (it can legitimately describe a long but
/// productive streak of calls to one tool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopSignal {
    /// The same (tool, canonicalized args) pair recurred `repeat_count`
    /// times within the last [`RECENT`] calls.
    Repetition {
        /// The tool name that repeated.
        tool_name: String,
        /// How many times it recurred.
        repeat_count: usize,
    },
    /// Two distinct tools are alternating call-for-call.
    Oscillation {
        /// The first tool in the oscillating pair.
        tool_a: String,
        /// The second tool in the oscillating pair.
        tool_b: String,
    },
    /// One tool accounts for most of the recent call window.
    Saturation {
        /// The dominant tool name.
        tool_name: String,
        /// How many of the window's calls belong to it.
        count: usize,
        /// The window size the count is measured against.
        window: usize,
    },
}

/// Bounded ring of recent tool calls with doom-loop detection.
#[derive(Debug, Default)]
pub struct LoopDetector {
    window: VecDeque<CallRecord>,
}

impl LoopDetector {
    /// Create an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW),
        }
    }

    /// Record a tool call and return any loop signal it produced.
    pub fn record(&mut self, tool_name: &str, args: &serde_json::Value) -> Option<LoopSignal> {
        let args_hash = hash_canonical(args);
        self.window.push_back(CallRecord {
            tool_name: tool_name.to_string(),
            args_hash,
        });
        while self.window.len() > WINDOW {
            self.window.pop_front();
        }
        self.detect_repetition()
            .or_else(|| self.detect_oscillation())
            .or_else(|| self.detect_saturation())
    }

    fn detect_repetition(&self) -> Option<LoopSignal> {
        let recent: Vec<&CallRecord> = self.window.iter().rev().take(RECENT).collect();
        if recent.len() < REPEAT_THRESHOLD {
            return None;
        }
        let mut counts: HashMap<(String, u64), usize> = HashMap::new();
        for r in &recent {
            *counts
                .entry((r.tool_name.clone(), r.args_hash))
                .or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count >= REPEAT_THRESHOLD)
            .max_by_key(|(_, count)| *count)
            .map(|((tool_name, _), repeat_count)| LoopSignal::Repetition {
                tool_name,
                repeat_count,
            })
    }

    fn detect_oscillation(&self) -> Option<LoopSignal> {
        if self.window.len() < 4 {
            return None;
        }
        let last4: Vec<&str> = self
            .window
            .iter()
            .rev()
            .take(4)
            .map(|r| r.tool_name.as_str())
            .collect();
        // last4 is [most recent, ..., 4th most recent]; an alternating
        // pattern reads a, b, a, b from oldest to newest in this slice.
        let (d, c, b, a) = (last4[3], last4[2], last4[1], last4[0]);
        if d == b && c == a && d != c {
            Some(LoopSignal::Oscillation {
                tool_a: d.to_string(),
                tool_b: c.to_string(),
            })
        } else {
            None
        }
    }

    fn detect_saturation(&self) -> Option<LoopSignal> {
        if self.window.len() < SATURATION_MIN_WINDOW {
            return None;
        }
        let window = self.window.len();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &self.window {
            *counts.entry(r.tool_name.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .filter(|(_, count)| *count as f64 / window as f64 >= SATURATION_FRACTION)
            .map(|(tool_name, count)| LoopSignal::Saturation {
                tool_name: tool_name.to_string(),
                count,
                window,
            })
    }
}

/// Canonicalize a JSON value so semantically identical calls hash equal:
/// object keys sorted, string whitespace normalized. Arrays and scalars
/// are otherwise left as-is (array order is significant to most tools).
#[must_use]
pub fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, serde_json::Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), canonicalize(v));
            }
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize).collect())
        }
        serde_json::Value::String(s) => {
            serde_json::Value::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        other => other.clone(),
    }
}

fn hash_canonical(value: &serde_json::Value) -> u64 {
    let canon = canonicalize(value);
    let text = serde_json::to_string(&canon).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
