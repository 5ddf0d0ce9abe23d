use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::ids::ParamId;

/// Contiguous storage for every scalar degree of freedom in a sketch.
///
/// Geometry holds [`ParamId`]s into this arena instead of owning values, so
/// the solver and every reader observe the same cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamArena {
    values: Vec<f64>,
}

impl ParamArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new cell holding `value`.
    pub fn alloc(&mut self, value: f64) -> ParamId {
        let id = ParamId(self.values.len());
        self.values.push(value);
        id
    }

    /// Current value of a cell. Panics if `id` was not issued by this arena.
    pub fn get(&self, id: ParamId) -> f64 {
        self.values[id.index()]
    }

    pub fn set(&mut self, id: ParamId, value: f64) {
        self.values[id.index()] = value;
    }

    pub fn contains(&self, id: ParamId) -> bool {
        id.index() < self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Copy out the values of `ids`, in order.
    pub fn capture(&self, ids: &[ParamId]) -> Vec<f64> {
        ids.iter().map(|id| self.get(*id)).collect()
    }

    /// Write back values previously taken with [`ParamArena::capture`].
    pub fn restore(&mut self, ids: &[ParamId], values: &[f64]) {
        for (id, value) in ids.iter().zip(values) {
            self.set(*id, *value);
        }
    }
}

impl Index<ParamId> for ParamArena {
    type Output = f64;

    fn index(&self, id: ParamId) -> &f64 {
        &self.values[id.index()]
    }
}
