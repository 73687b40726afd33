//! Filtering of stack sources before aggregation.
//!
//! The view never filters stacks itself; it calls a filter function that
//! turns the raw source plus a process scope into the source to aggregate.
//! `default_filter` is what a view uses when the caller supplies nothing.

use super::source::{StackSample, StackSource};
use crate::utils::error::FilterError;
use log::debug;
use regex::{Regex, RegexBuilder};

/// Turns the raw source and optional process id into the source to aggregate
pub type FilterFn = Box<dyn Fn(&StackSource, Option<u32>) -> anyhow::Result<StackSource>>;

/// Stack filter settings
///
/// Patterns are case-insensitive regular expressions matched anywhere in a
/// frame name.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Keep only samples from this process
    pub process_id: Option<u32>,

    /// Keep only samples with at least one matching frame
    pub include: Option<String>,

    /// Drop samples with any matching frame
    pub exclude: Option<String>,

    /// Remove matching frames, charging their cost to the caller
    pub fold: Option<String>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, process_id: Option<u32>) -> Self {
        self.process_id = process_id;
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    pub fn with_fold(mut self, pattern: impl Into<String>) -> Self {
        self.fold = Some(pattern.into());
        self
    }
}

/// A source that applies `FilterParams` to the samples of its base
#[derive(Debug)]
pub struct FilteredStackSource {
    base: StackSource,
    params: FilterParams,
    include: Option<Regex>,
    exclude: Option<Regex>,
    fold: Option<Regex>,
}

impl FilteredStackSource {
    pub fn new(base: StackSource, params: FilterParams) -> Result<Self, FilterError> {
        let include = compile_pattern(params.include.as_deref())?;
        let exclude = compile_pattern(params.exclude.as_deref())?;
        let fold = compile_pattern(params.fold.as_deref())?;

        Ok(Self {
            base,
            params,
            include,
            exclude,
            fold,
        })
    }

    pub fn base(&self) -> &StackSource {
        &self.base
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn samples(&self) -> Vec<StackSample> {
        let samples = self.base.samples();
        let total = samples.len();
        let kept: Vec<StackSample> = samples
            .into_iter()
            .filter_map(|sample| self.apply(sample))
            .collect();

        debug!("Filter kept {} of {} samples", kept.len(), total);
        kept
    }

    fn apply(&self, mut sample: StackSample) -> Option<StackSample> {
        if let Some(process_id) = self.params.process_id {
            if sample.process_id != process_id {
                return None;
            }
        }

        if let Some(include) = &self.include {
            if !sample.frames.iter().any(|f| include.is_match(f)) {
                return None;
            }
        }

        if let Some(exclude) = &self.exclude {
            if sample.frames.iter().any(|f| exclude.is_match(f)) {
                return None;
            }
        }

        if let Some(fold) = &self.fold {
            sample.frames.retain(|f| !fold.is_match(f));
        }

        Some(sample)
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>, FilterError> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Default filter: no patterns, restricted to the process scope if one is set
pub fn default_filter(
    source: &StackSource,
    process_id: Option<u32>,
) -> anyhow::Result<StackSource> {
    filter_source(source, FilterParams::new().with_process(process_id))
}

/// Build a filter function from fixed params
///
/// The view's process scope overrides `params.process_id` when it is set.
pub fn filter_with(params: FilterParams) -> FilterFn {
    Box::new(move |source: &StackSource, process_id: Option<u32>| {
        let mut params = params.clone();
        if process_id.is_some() {
            params.process_id = process_id;
        }
        filter_source(source, params)
    })
}

fn filter_source(source: &StackSource, params: FilterParams) -> anyhow::Result<StackSource> {
    let filtered = FilteredStackSource::new(source.clone(), params)?;
    Ok(StackSource::from(filtered))
}
