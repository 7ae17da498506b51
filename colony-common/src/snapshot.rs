use serde::{Deserialize, Serialize};

/// Colony metrics recorded at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)] // Derive traits for easy saving/loading
pub struct Snapshot {
    /// Number of completed ticks when the snapshot was taken.
    pub tick: u64,
    pub alive_count: u32,
    /// Cells holding the remains of a starved bacterium.
    pub dead_count: u32,
    pub empty_count: u32,
    /// Sum of the nutrient field.
    pub total_nutrient: f64,
    pub mean_nutrient: f64,
    pub min_nutrient: f64,
    pub max_nutrient: f64,
    /// Optional: cell states (0 = empty, 1 = alive, 2 = dead), indexed `x + y * width`.
    /// Included only if `output.save_fields_in_snapshot` is true.
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "cells": null
    pub cells: Option<Vec<u8>>,
    /// Optional: the nutrient field, indexed `x + y * width`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<Vec<f64>>,
}
