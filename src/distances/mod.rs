//! Distance and similarity functions.
//!
//! This module provides:
//! - Scalar functions over a single pair (`iou`, `center_distance`, `embedding_distance`)
//! - Vectorized functions over many pairs (`iou_matrix`, `embedding_distances`)

mod functions;
mod vectorized;

pub use functions::*;
pub use vectorized::*;
