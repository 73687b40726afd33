//! Stack sources: where the samples feeding a call tree come from.
//!
//! A source is either the raw, address-level samples of a trace or a wrapper
//! around another source. Wrappers form a chain that `unwrap_to_raw` can walk
//! back down to the raw source.

use super::filter::FilteredStackSource;
use crate::trace::TraceLog;
use crate::utils::config::{MODULE_SEPARATOR, UNRESOLVED_SYMBOL};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// One frame of a raw sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Frame with a fixed name (process, thread, or already symbolized)
    Named(String),

    /// Code address inside a module, named through the trace's symbol table
    Code { module: String, rva: u64 },
}

impl Frame {
    pub fn named(name: impl Into<String>) -> Self {
        Frame::Named(name.into())
    }

    pub fn code(module: impl Into<String>, rva: u64) -> Self {
        Frame::Code {
            module: module.into(),
            rva,
        }
    }
}

/// A sampled call stack before symbolization
#[derive(Debug, Clone)]
pub struct RawSample {
    pub process_id: u32,

    /// Cost carried by the sample (sample count, bytes, ms...)
    pub metric: f64,

    /// Frames ordered from the outermost caller to the leaf
    pub frames: Vec<Frame>,
}

impl RawSample {
    pub fn new(process_id: u32, metric: f64, frames: Vec<Frame>) -> Self {
        Self {
            process_id,
            metric,
            frames,
        }
    }
}

/// A call stack with every frame rendered to its display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSample {
    pub process_id: u32,
    pub metric: f64,
    /// Frames ordered from the outermost caller to the leaf
    pub frames: Vec<String>,
}

impl StackSample {
    pub fn new(process_id: u32, metric: f64, frames: &[&str]) -> Self {
        Self {
            process_id,
            metric,
            frames: frames.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Address-level samples read from a trace
///
/// Frame names are rendered on every read, so symbols loaded into the
/// trace after construction show up the next time samples are requested.
#[derive(Debug)]
pub struct RawStackSource {
    trace: Rc<TraceLog>,
    samples: Vec<RawSample>,
}

impl RawStackSource {
    pub fn new(trace: Rc<TraceLog>) -> Self {
        Self {
            trace,
            samples: Vec::new(),
        }
    }

    pub fn with_samples(trace: Rc<TraceLog>, samples: Vec<RawSample>) -> Self {
        Self { trace, samples }
    }

    pub fn push(&mut self, sample: RawSample) {
        self.samples.push(sample);
    }

    /// The trace whose symbol table names this source's frames
    pub fn trace(&self) -> &Rc<TraceLog> {
        &self.trace
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Render a frame as `module!symbol`, or `module!?` while unresolved
    pub fn frame_name(&self, frame: &Frame) -> String {
        match frame {
            Frame::Named(name) => name.clone(),
            Frame::Code { module, rva } => {
                let symbol = self
                    .trace
                    .symbol_name(module, *rva)
                    .unwrap_or_else(|| UNRESOLVED_SYMBOL.to_string());
                format!("{}{}{}", module, MODULE_SEPARATOR, symbol)
            }
        }
    }

    pub fn samples(&self) -> Vec<StackSample> {
        self.samples
            .iter()
            .map(|sample| StackSample {
                process_id: sample.process_id,
                metric: sample.metric,
                frames: sample.frames.iter().map(|f| self.frame_name(f)).collect(),
            })
            .collect()
    }
}

/// A snapshot of another source's samples
#[derive(Debug)]
pub struct CopyStackSource {
    /// The source the samples were copied from; `None` when the samples
    /// were handed in directly and the copy is its own base
    source: Option<StackSource>,
    samples: Vec<StackSample>,
}

impl CopyStackSource {
    pub fn from_source(source: &StackSource) -> Self {
        Self {
            source: Some(source.clone()),
            samples: source.samples(),
        }
    }

    pub fn from_samples(samples: Vec<StackSample>) -> Self {
        Self {
            source: None,
            samples,
        }
    }

    pub fn source(&self) -> Option<&StackSource> {
        self.source.as_ref()
    }

    pub fn samples(&self) -> &[StackSample] {
        &self.samples
    }
}

/// Any source a view can aggregate
///
/// A closed set of layers: the raw source is terminal, the others each
/// point at most one layer further down.
#[derive(Debug, Clone)]
pub enum StackSource {
    Raw(Rc<RawStackSource>),
    Copy(Rc<CopyStackSource>),
    Filtered(Rc<FilteredStackSource>),
}

impl StackSource {
    /// Resolved samples as seen through every layer of this source
    pub fn samples(&self) -> Vec<StackSample> {
        match self {
            StackSource::Raw(raw) => raw.samples(),
            StackSource::Copy(copy) => copy.samples().to_vec(),
            StackSource::Filtered(filtered) => filtered.samples(),
        }
    }

    /// The next layer down, or `None` when this source is its own base
    pub fn base(&self) -> Option<&StackSource> {
        match self {
            StackSource::Raw(_) => None,
            StackSource::Copy(copy) => copy.source(),
            StackSource::Filtered(filtered) => Some(filtered.base()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StackSource::Raw(_) => "raw",
            StackSource::Copy(_) => "copy",
            StackSource::Filtered(_) => "filtered",
        }
    }
}

impl From<RawStackSource> for StackSource {
    fn from(source: RawStackSource) -> Self {
        StackSource::Raw(Rc::new(source))
    }
}

impl From<CopyStackSource> for StackSource {
    fn from(source: CopyStackSource) -> Self {
        StackSource::Copy(Rc::new(source))
    }
}

impl From<FilteredStackSource> for StackSource {
    fn from(source: FilteredStackSource) -> Self {
        StackSource::Filtered(Rc::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::SymbolEntry;

    #[test]
    fn test_frame_names_follow_symbol_table() {
        let trace = Rc::new(TraceLog::new());
        let raw = RawStackSource::with_samples(
            Rc::clone(&trace),
            vec![RawSample::new(
                1,
                1.0,
                vec![Frame::named("Thread (7)"), Frame::code("clr", 0x40)],
            )],
        );

        assert_eq!(raw.samples()[0].frames, vec!["Thread (7)", "clr!?"]);

        trace.add_symbols("clr", vec![SymbolEntry::new(0x40, 8, "Alloc")]);
        assert_eq!(raw.samples()[0].frames, vec!["Thread (7)", "clr!Alloc"]);
    }

    #[test]
    fn test_copy_keeps_snapshot() {
        let trace = Rc::new(TraceLog::new());
        let raw: StackSource = RawStackSource::with_samples(
            Rc::clone(&trace),
            vec![RawSample::new(1, 2.0, vec![Frame::code("clr", 0x40)])],
        )
        .into();
        let copy = CopyStackSource::from_source(&raw);

        trace.add_symbols("clr", vec![SymbolEntry::new(0x40, 8, "Alloc")]);

        assert_eq!(copy.samples()[0].frames, vec!["clr!?"]);
        assert!(copy.source().is_some());
    }

    #[test]
    fn test_base_links() {
        let copy: StackSource = CopyStackSource::from_samples(Vec::new()).into();
        assert!(copy.base().is_none());
        assert_eq!(copy.kind(), "copy");
    }
}
