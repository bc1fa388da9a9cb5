/*!
A minimal dense `f32` tensor used on both sides of the engine boundary.
 */

use anyhow::{bail, Result};

/// A dense, row-major tensor of `f32` values with an explicit shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor from parts.
    ///
    /// # Errors
    ///
    /// Fails if the number of elements implied by `shape` differs from `data.len()`.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<f32>) -> Result<Self> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            bail!(
                "shape {:?} needs {} elements but {} were provided",
                shape,
                expected,
                data.len()
            );
        }

        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
