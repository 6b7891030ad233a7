//! Per-chunk compute kernels.
//!
//! A kernel sees only this rank's chunk of each scattered operand plus the
//! broadcast shared payload, and runs identically on every rank; root is
//! special only in who owns the data before and after the collectives.

use crate::DataType;
use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::{Add, Mul};

pub trait Kernel {
    /// Element type of the scattered operand arrays.
    type Elem: DataType;
    /// Payload broadcast whole to every rank; `()` when the kernel needs
    /// no shared data.
    type Shared: DataType;
    /// Element type of the per-rank result.
    type Out: DataType;

    /// Number of scattered operand arrays the kernel consumes.
    const ARITY: usize;

    /// Produce one output element per chunk element. `chunks` holds ARITY
    /// slices of equal length.
    fn compute(&self, chunks: &[Vec<Self::Elem>], shared: &Self::Shared) -> Vec<Self::Out>;
}

/// `out[i] = a[i] + b[i]` over two scattered arrays.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementwiseSum<T>(PhantomData<T>);

impl<T> ElementwiseSum<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Kernel for ElementwiseSum<T>
where
    T: DataType + Copy + Add<Output = T>,
{
    type Elem = T;
    type Shared = ();
    type Out = T;

    const ARITY: usize = 2;

    fn compute(&self, chunks: &[Vec<T>], _shared: &()) -> Vec<T> {
        chunks[0]
            .iter()
            .zip(&chunks[1])
            .map(|(a, b)| *a + *b)
            .collect()
    }
}

/// One dot product per scattered matrix row against a broadcast vector:
/// `out[row] = Σ_j row[j] * shared[j]`. Rows are row-major slices.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowDotVector<T>(PhantomData<T>);

impl<T> RowDotVector<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Kernel for RowDotVector<T>
where
    T: DataType + Copy + Mul<Output = T> + Sum,
{
    type Elem = Vec<T>;
    type Shared = Vec<T>;
    type Out = T;

    const ARITY: usize = 1;

    fn compute(&self, chunks: &[Vec<Vec<T>>], shared: &Vec<T>) -> Vec<T> {
        chunks[0]
            .iter()
            .map(|row| row.iter().zip(shared).map(|(a, x)| *a * *x).sum())
            .collect()
    }
}
