//! WASM bindings for the cell-allocation model
//!
//! Instances are passed as plain JS objects with the same shape as the
//! JSON input files.

use wasm_bindgen::prelude::*;

use crate::builder::{Formulation, ModelBuilder};
use crate::instance::Instance;
use cellcap_solver::{BranchAndBound, SolverConfig};

/// Solve an instance and return the outcome as a JS object
#[wasm_bindgen]
pub fn solve(instance: JsValue, formulation: &str) -> Result<JsValue, JsValue> {
    let instance: Instance =
        serde_wasm_bindgen::from_value(instance).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let formulation: Formulation = formulation.parse().map_err(|e: crate::ConfigError| JsValue::from_str(&e.to_string()))?;

    let model = ModelBuilder::new(&instance)
        .formulation(formulation)
        .build()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let outcome = model
        .solve(&BranchAndBound::new(), &SolverConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = SolveResult {
        status: outcome.status().as_str().to_lowercase(),
        formulation: formulation.as_str().to_string(),
        num_variables: model.num_variables(),
        num_constraints: model.num_constraints(),
        objective_value: outcome.objective_value(),
        nodes: outcome.assignment().map(|a| a.stats.nodes).unwrap_or(0),
        cells: outcome
            .assignment()
            .map(|a| {
                a.iter()
                    .map(|((row, col), quantity)| CellResult { row, col, quantity })
                    .collect()
            })
            .unwrap_or_default(),
    };

    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate an instance and return a list of problems (empty when valid)
#[wasm_bindgen]
pub fn validate(instance: JsValue) -> JsValue {
    let diagnostics: Vec<String> = match serde_wasm_bindgen::from_value::<Instance>(instance) {
        Ok(instance) => instance.validate().err().map(|e| e.to_string()).into_iter().collect(),
        Err(e) => vec![e.to_string()],
    };
    serde_wasm_bindgen::to_value(&diagnostics).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct SolveResult {
    status: String,
    formulation: String,
    num_variables: usize,
    num_constraints: usize,
    objective_value: Option<f64>,
    nodes: usize,
    cells: Vec<CellResult>,
}

#[derive(serde::Serialize)]
struct CellResult {
    row: usize,
    col: usize,
    quantity: u64,
}
