//! Abstract audio filter graph handed to a render collaborator.
//!
//! A graph is an ordered list of operations. Any `Segment` operations come
//! first and cut the input into tempo-adjusted windows which a following
//! `Concat` joins; the remaining operations then apply in order to the
//! joined (or original) stream.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum FilterOp {
    /// Cut `[start, end)` from the input and play it at `tempo`.
    Segment { start: f64, end: f64, tempo: f64 },
    /// Join the preceding `inputs` segments in order.
    Concat { inputs: usize },
    Tempo { factor: f64 },
    /// Insert silence before the stream.
    Delay { seconds: f64 },
    /// Drop the first `seconds` of the stream.
    TrimStart { seconds: f64 },
    /// Cut the stream to at most `duration`.
    Trim { duration: f64 },
    /// Extend the stream with silence to at least `duration`.
    Pad { duration: f64 },
    FadeIn { duration: f64 },
    FadeOut { start: f64, duration: f64 },
}

impl FilterOp {
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Segment { .. } => "segment",
            FilterOp::Concat { .. } => "concat",
            FilterOp::Tempo { .. } => "tempo",
            FilterOp::Delay { .. } => "delay",
            FilterOp::TrimStart { .. } => "trim_start",
            FilterOp::Trim { .. } => "trim",
            FilterOp::Pad { .. } => "pad",
            FilterOp::FadeIn { .. } => "fade_in",
            FilterOp::FadeOut { .. } => "fade_out",
        }
    }

    /// Parameters as a JSON object, without the operation name.
    pub fn parameters(&self) -> Value {
        match *self {
            FilterOp::Segment { start, end, tempo } => {
                json!({ "start": start, "end": end, "tempo": tempo })
            }
            FilterOp::Concat { inputs } => json!({ "inputs": inputs }),
            FilterOp::Tempo { factor } => json!({ "factor": factor }),
            FilterOp::Delay { seconds } | FilterOp::TrimStart { seconds } => {
                json!({ "seconds": seconds })
            }
            FilterOp::Trim { duration } | FilterOp::Pad { duration } | FilterOp::FadeIn { duration } => {
                json!({ "duration": duration })
            }
            FilterOp::FadeOut { start, duration } => json!({ "start": start, "duration": duration }),
        }
    }

    pub fn is_tempo_change(&self) -> bool {
        match *self {
            FilterOp::Segment { tempo, .. } => (tempo - 1.0).abs() > f64::EPSILON,
            FilterOp::Tempo { factor } => (factor - 1.0).abs() > f64::EPSILON,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGraph {
    pub ops: Vec<FilterOp>,
    /// Duration the rendered stream is expected to have.
    pub target_duration: f64,
}

impl FilterGraph {
    pub fn new(target_duration: f64) -> Self {
        Self {
            ops: Vec::new(),
            target_duration,
        }
    }

    pub fn push(&mut self, op: FilterOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn segments(&self) -> impl Iterator<Item = &FilterOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, FilterOp::Segment { .. }))
    }

    /// Trim or pad to exactly `target_duration`, then fade both ends.
    pub fn finish(&mut self, fade: f64) -> &mut Self {
        let target = self.target_duration;
        self.push(FilterOp::Trim { duration: target });
        self.push(FilterOp::Pad { duration: target });
        if fade > 0.0 && target > 2.0 * fade {
            self.push(FilterOp::FadeIn { duration: fade });
            self.push(FilterOp::FadeOut {
                start: target - fade,
                duration: fade,
            });
        }
        self
    }

    /// Operations in the `{operation, parameters}` shape.
    pub fn describe(&self) -> Vec<Value> {
        self.ops
            .iter()
            .map(|op| json!({ "operation": op.name(), "parameters": op.parameters() }))
            .collect()
    }
}
