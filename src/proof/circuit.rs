//! Leveled arithmetic circuits over any [`RingElement`].
//!
//! `Circuit::layers()[0]` is the output layer; data flows from the last
//! layer to the first. Every layer reads the previous outputs plus one
//! implicit zero, addressed by a `None` operand.

use crate::errors::{HeError, HeResult};
use crate::math::modular::centered_reduce;
use crate::rings::RingElement;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOp {
    Add,
    Mult,
}

/// One gate. Operands index the previous layer's outputs; `None` reads the
/// implicit zero. Operands are normalized so a real operand is always on
/// the left and two real operands are ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Gate {
    op: GateOp,
    left: Option<usize>,
    right: Option<usize>,
}

impl Gate {
    pub fn new(op: GateOp, left: Option<usize>, right: Option<usize>) -> Self {
        let (left, right) = match (left, right) {
            (None, r) => (r, None),
            (Some(l), Some(r)) => (Some(l.min(r)), Some(l.max(r))),
            (l, None) => (l, None),
        };
        Self { op, left, right }
    }

    pub fn add(left: usize, right: usize) -> Self {
        Self::new(GateOp::Add, Some(left), Some(right))
    }

    pub fn mult(left: usize, right: usize) -> Self {
        Self::new(GateOp::Mult, Some(left), Some(right))
    }

    /// `data[index] + 0`.
    pub fn pass_through(index: usize) -> Self {
        Self::new(GateOp::Add, Some(index), None)
    }

    /// `0 + 0`, used to pad layers.
    pub fn padding() -> Self {
        Self::new(GateOp::Add, None, None)
    }

    pub fn op(&self) -> GateOp {
        self.op
    }

    pub fn left(&self) -> Option<usize> {
        self.left
    }

    pub fn right(&self) -> Option<usize> {
        self.right
    }

    /// Resolves an operand against `data`, `None` mapping to `zero`.
    pub fn operand<'a, T>(index: Option<usize>, data: &'a [T], zero: &'a T) -> HeResult<&'a T> {
        match index {
            None => Ok(zero),
            Some(i) => data.get(i).ok_or(HeError::OperandOutOfRange {
                index: i,
                len: data.len(),
            }),
        }
    }

    pub fn evaluate<T: RingElement>(&self, data: &[T], zero: &T) -> HeResult<T> {
        let l = Self::operand(self.left, data, zero)?;
        let r = Self::operand(self.right, data, zero)?;
        match self.op {
            GateOp::Add => l.ring_add(r),
            GateOp::Mult => l.ring_mul(r),
        }
    }

    pub fn compute_int(&self, modulus: u64, data: &[i64]) -> HeResult<i64> {
        let l = *Self::operand(self.left, data, &0)? as i128;
        let r = *Self::operand(self.right, data, &0)? as i128;
        let value = match self.op {
            GateOp::Add => l + r,
            GateOp::Mult => l * r,
        };
        Ok(centered_reduce(value, modulus))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    gates: Vec<Gate>,
}

impl Layer {
    /// Pads `gates` with `0 + 0` gates up to the smallest power of two
    /// strictly greater than `gates.len()`.
    pub fn new(mut gates: Vec<Gate>) -> Self {
        let width = (gates.len() + 1).next_power_of_two();
        gates.resize(width, Gate::padding());
        Self { gates }
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn width(&self) -> usize {
        self.gates.len()
    }

    /// Number of sum-check rounds over this layer.
    pub fn rounds(&self) -> usize {
        self.gates.len().trailing_zeros() as usize
    }

    pub fn evaluate<T: RingElement>(&self, data: &[T]) -> HeResult<Vec<T>> {
        self.evaluate_with(data, None)
    }

    /// Like [`Layer::evaluate`], but every ADD result is multiplied by `one`.
    pub fn evaluate_scaled<T: RingElement>(&self, data: &[T], one: &T) -> HeResult<Vec<T>> {
        self.evaluate_with(data, Some(one))
    }

    fn evaluate_with<T: RingElement>(&self, data: &[T], one: Option<&T>) -> HeResult<Vec<T>> {
        let zero = data
            .first()
            .ok_or_else(|| HeError::invalid("layer evaluated on empty input"))?
            .zero_like()?;
        self.gates
            .iter()
            .map(|gate| {
                let value = gate.evaluate(data, &zero)?;
                match (gate.op, one) {
                    (GateOp::Add, Some(one)) => value.ring_mul(one),
                    _ => Ok(value),
                }
            })
            .collect()
    }

    pub fn compute_int(&self, modulus: u64, data: &[i64]) -> HeResult<Vec<i64>> {
        self.gates
            .iter()
            .map(|gate| gate.compute_int(modulus, data))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Circuit {
    layers: Vec<Layer>,
}

impl Circuit {
    /// `layers[0]` is the output layer.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Index into [`Circuit::layers`] of the `step`-th layer evaluated.
    pub fn layer_index(&self, step: usize) -> usize {
        self.layers.len() - 1 - step
    }

    pub fn evaluate<T: RingElement>(&self, inputs: &[T]) -> HeResult<Vec<T>> {
        let mut trace = self.evaluate_trace(inputs, None)?;
        Ok(trace.pop().unwrap_or_default())
    }

    /// Evaluation where ADD gates of the `d`-th evaluated layer are
    /// multiplied by `one^(2^d)`, keeping ADD and MULT outputs at the same
    /// ciphertext size.
    pub fn evaluate_scaled<T: RingElement>(&self, inputs: &[T], one: &T) -> HeResult<Vec<T>> {
        let mut trace = self.evaluate_trace(inputs, Some(one))?;
        Ok(trace.pop().unwrap_or_default())
    }

    /// `one, one^2, one^4, ...`, one entry per layer in evaluation order.
    pub fn layer_ones<T: RingElement>(&self, one: &T) -> HeResult<Vec<T>> {
        let mut ones: Vec<T> = Vec::with_capacity(self.layers.len());
        for _ in 0..self.layers.len() {
            let next = match ones.last() {
                Some(prev) => prev.ring_mul(prev)?,
                None => one.clone(),
            };
            ones.push(next);
        }
        Ok(ones)
    }

    /// Every intermediate value list: `trace[0]` is `inputs`, `trace[k]`
    /// the outputs of the `k`-th evaluated layer.
    pub fn evaluate_trace<T: RingElement>(
        &self,
        inputs: &[T],
        one: Option<&T>,
    ) -> HeResult<Vec<Vec<T>>> {
        let ones = match one {
            Some(one) => Some(self.layer_ones(one)?),
            None => None,
        };
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(inputs.to_vec());
        for (step, layer) in self.layers.iter().rev().enumerate() {
            let data = &trace[step];
            let next = match &ones {
                Some(ones) => layer.evaluate_scaled(data, &ones[step])?,
                None => layer.evaluate(data)?,
            };
            trace.push(next);
        }
        Ok(trace)
    }

    pub fn compute_int(&self, modulus: u64, inputs: &[i64]) -> HeResult<Vec<i64>> {
        let mut data = inputs.to_vec();
        for layer in self.layers.iter().rev() {
            data = layer.compute_int(modulus, &data)?;
        }
        Ok(data)
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("ADD"),
            Self::Mult => f.write_str("MULT"),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |operand: Option<usize>| match operand {
            Some(i) => i.to_string(),
            None => "-".to_string(),
        };
        write!(f, "{} [{}], [{}]", self.op, show(self.left), show(self.right))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, gate) in self.gates.iter().enumerate() {
            writeln!(f, "{idx} gate : {gate}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, layer) in self.layers.iter().enumerate() {
            writeln!(f, "  ** Layer {idx} **")?;
            writeln!(f, "{layer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rings::{Form, Polynomial};

    const T: u64 = 97;

    fn constant(v: i64) -> Polynomial {
        Polynomial::new(T, 4, vec![v], Form::Coeff).unwrap()
    }

    #[test]
    fn gate_operands_are_normalized() {
        let g = Gate::new(GateOp::Add, None, Some(3));
        assert_eq!((g.left(), g.right()), (Some(3), None));
        let g = Gate::new(GateOp::Mult, Some(5), Some(2));
        assert_eq!((g.left(), g.right()), (Some(2), Some(5)));
        assert_eq!(Gate::padding().left(), None);
    }

    #[test]
    fn layers_pad_past_their_length() {
        assert_eq!(Layer::new(vec![Gate::add(0, 1)]).width(), 2);
        assert_eq!(Layer::new(vec![Gate::add(0, 1); 3]).width(), 4);
        assert_eq!(Layer::new(vec![Gate::add(0, 1); 4]).width(), 8);
        assert_eq!(Layer::new(vec![]).width(), 1);
        assert_eq!(Layer::new(vec![Gate::add(0, 1); 4]).rounds(), 3);
    }

    #[test]
    fn evaluates_from_last_layer_to_first() {
        // (x0 * x1) + x2
        let circuit = Circuit::new(vec![
            Layer::new(vec![Gate::add(0, 1)]),
            Layer::new(vec![Gate::mult(0, 1), Gate::pass_through(2)]),
        ]);
        let inputs = [constant(3), constant(4), constant(5)];
        let out = circuit.evaluate(&inputs).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], constant(17));
        assert!(out[1].is_zero());
        assert_eq!(circuit.compute_int(T, &[3, 4, 5]).unwrap(), vec![17, 0]);
    }

    #[test]
    fn scaled_evaluation_squares_one_per_layer() {
        let circuit = Circuit::new(vec![
            Layer::new(vec![Gate::add(0, 1)]),
            Layer::new(vec![Gate::add(0, 1), Gate::add(2, 3)]),
        ]);
        let inputs = [constant(1), constant(2), constant(3), constant(4)];
        let out = circuit.evaluate_scaled(&inputs, &constant(2)).unwrap();
        // ((1 + 2) * 2 + (3 + 4) * 2) * 4
        assert_eq!(out[0], constant(80));
        let ones = circuit.layer_ones(&constant(2)).unwrap();
        assert_eq!(ones, vec![constant(2), constant(4)]);
    }

    #[test]
    fn trace_records_every_layer() {
        let circuit = Circuit::new(vec![Layer::new(vec![Gate::mult(0, 1)])]);
        let trace = circuit
            .evaluate_trace(&[constant(6), constant(7)], None)
            .unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1][0], constant(42));
        assert_eq!(circuit.layer_index(0), 0);
    }

    #[test]
    fn out_of_range_operand() {
        let layer = Layer::new(vec![Gate::add(0, 5)]);
        assert!(matches!(
            layer.evaluate(&[constant(1)]),
            Err(HeError::OperandOutOfRange { index: 5, len: 1 })
        ));
        assert!(layer.compute_int(T, &[1]).is_err());
    }

    #[test]
    fn compute_int_centers() {
        let layer = Layer::new(vec![Gate::mult(0, 1)]);
        assert_eq!(layer.compute_int(T, &[10, 10]).unwrap(), vec![3, 0]);
        assert_eq!(layer.compute_int(T, &[48, 2]).unwrap(), vec![-1, 0]);
    }

    #[test]
    fn display_lists_layers() {
        let circuit = Circuit::new(vec![Layer::new(vec![Gate::mult(1, 0)])]);
        let text = circuit.to_string();
        assert!(text.contains("** Layer 0 **"));
        assert!(text.contains("0 gate : MULT [0], [1]"));
        assert!(text.contains("1 gate : ADD [-], [-]"));
    }
}
