//! Cutting plans for 1-dimensional stock-sheet cutting with remnant reuse.
//!
//! The engine is a pure function of its inputs: [`calculate_cuts`] takes the
//! ordered pieces and [`CutOptions`] and returns a [`CutPlan`], or the single
//! fatal [`CutError`].

pub mod anti;
pub mod config;
mod context;
pub mod donor;
pub mod normalize;
pub mod pattern;
pub mod pool;
pub mod render;
pub mod solver;
pub mod tail;
pub mod types;

pub use config::{AntiWaste, CutOptions};
pub use solver::{Solver, calculate_cuts, calculate_grouped};
pub use types::{CutError, CutPlan, Order, PlanResponse};
