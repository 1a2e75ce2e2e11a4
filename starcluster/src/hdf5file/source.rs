//! Where step groups come from
//!
//! The decoder only needs two things from a file: the list of step groups
//! and the ability to read one dataset of a group as `f64`.

use std::collections::HashMap;

use crate::error::Result;

pub trait StepSource {
    /// Step group names in the order the file lists them
    fn step_keys(&self) -> Result<Vec<String>>;

    /// `Ok(None)` when the group has no such dataset
    fn read(&self, step: &str, dataset: &str) -> Result<Option<Vec<f64>>>;
}

/// In-memory step groups, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    steps: Vec<(String, HashMap<String, Vec<f64>>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one dataset, creating the step group on first use
    pub fn insert(&mut self, step: &str, dataset: &str, values: Vec<f64>) {
        let index = match self.steps.iter().position(|(key, _)| key == step) {
            Some(index) => index,
            None => {
                self.steps.push((step.to_string(), HashMap::new()));
                self.steps.len() - 1
            }
        };
        self.steps[index].1.insert(dataset.to_string(), values);
    }

    pub fn with(mut self, step: &str, dataset: &str, values: Vec<f64>) -> Self {
        self.insert(step, dataset, values);
        self
    }
}

impl StepSource for MemorySource {
    fn step_keys(&self) -> Result<Vec<String>> {
        Ok(self.steps.iter().map(|(key, _)| key.clone()).collect())
    }

    fn read(&self, step: &str, dataset: &str) -> Result<Option<Vec<f64>>> {
        Ok(self
            .steps
            .iter()
            .find(|(key, _)| key == step)
            .and_then(|(_, group)| group.get(dataset).cloned()))
    }
}
