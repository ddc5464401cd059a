//! Infix expression to leveled circuit.
//!
//! Grammar: non-negative integers name inputs, `+` and `*` are binary
//! operators (`*` binds tighter, both left-associative), parentheses group.
//! The expression becomes a DAG; every operator node lands in the layer
//! equal to its depth, and values still needed deeper are carried forward
//! by pass-through gates.

use super::circuit::{Circuit, Gate, GateOp, Layer};
use crate::errors::{HeError, HeResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Input(usize),
    Op(GateOp),
    Open,
    Close,
}

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    Input,
    Op(GateOp, usize, usize),
}

#[derive(Clone, Copy, Debug)]
struct Node {
    kind: NodeKind,
    depth: usize,
}

pub fn parse_circuit(expression: &str) -> HeResult<Circuit> {
    let tokens = tokenize(expression)?;
    let postfix = to_postfix(&tokens)?;

    let input_count = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Input(i) => Some(*i + 1),
            _ => None,
        })
        .max()
        .ok_or_else(|| HeError::Parse(format!("no inputs in '{expression}'")))?;

    // nodes[0..input_count] are the inputs, in index order
    let mut nodes: Vec<Node> = (0..input_count)
        .map(|_| Node {
            kind: NodeKind::Input,
            depth: 0,
        })
        .collect();
    let mut stack: Vec<usize> = Vec::new();
    for token in postfix {
        match token {
            Token::Input(i) => stack.push(i),
            Token::Op(op) => {
                let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                    return Err(HeError::Parse(format!(
                        "operator {op} is missing an operand"
                    )));
                };
                let depth = nodes[left].depth.max(nodes[right].depth) + 1;
                nodes.push(Node {
                    kind: NodeKind::Op(op, left, right),
                    depth,
                });
                stack.push(nodes.len() - 1);
            }
            Token::Open | Token::Close => {
                return Err(HeError::Parse("unbalanced parentheses".into()));
            }
        }
    }
    let output = match stack.as_slice() {
        [single] => *single,
        _ => {
            return Err(HeError::Parse(format!(
                "'{expression}' does not reduce to a single value"
            )));
        }
    };
    let max_depth = nodes[output].depth;

    // deepest layer that reads each node
    let mut used_until = vec![0usize; nodes.len()];
    for node in &nodes {
        if let NodeKind::Op(_, l, r) = node.kind {
            used_until[l] = used_until[l].max(node.depth);
            used_until[r] = used_until[r].max(node.depth);
        }
    }
    used_until[output] = used_until[output].max(max_depth);

    if max_depth == 0 {
        // a bare input still yields one layer so the output sits at index 0
        let layer = Layer::new(vec![Gate::pass_through(output)]);
        return Ok(Circuit::new(vec![layer]));
    }

    let mut layers = Vec::with_capacity(max_depth);
    let mut current: Vec<usize> = (0..input_count).collect();
    for d in 1..=max_depth {
        let position = |id: usize, current: &[usize]| {
            current.iter().position(|&n| n == id).ok_or_else(|| {
                HeError::Parse(format!("node {id} is not available at depth {d}"))
            })
        };

        let mut gates = Vec::new();
        let mut next = Vec::new();
        for (id, node) in nodes.iter().enumerate() {
            if let NodeKind::Op(op, l, r) = node.kind {
                if node.depth == d {
                    let left = position(l, &current)?;
                    let right = position(r, &current)?;
                    gates.push(Gate::new(op, Some(left), Some(right)));
                    next.push(id);
                }
            }
        }
        for (idx, &id) in current.iter().enumerate() {
            if used_until[id] > d {
                gates.push(Gate::pass_through(idx));
                next.push(id);
            }
        }
        layers.push(Layer::new(gates));
        current = next;
    }

    layers.reverse();
    Ok(Circuit::new(layers))
}

fn tokenize(expression: &str) -> HeResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '+' => tokens.push(Token::Op(GateOp::Add)),
            '*' => tokens.push(Token::Op(GateOp::Mult)),
            c if c.is_ascii_digit() => {
                let mut end = pos + 1;
                while let Some(&(next_pos, next)) = chars.peek() {
                    if !next.is_ascii_digit() {
                        break;
                    }
                    end = next_pos + 1;
                    chars.next();
                }
                let index = expression[pos..end].parse::<usize>().map_err(|e| {
                    HeError::Parse(format!("bad input index '{}': {e}", &expression[pos..end]))
                })?;
                tokens.push(Token::Input(index));
            }
            other => {
                return Err(HeError::Parse(format!(
                    "unexpected character '{other}' at {pos}"
                )));
            }
        }
    }
    Ok(tokens)
}

fn precedence(op: GateOp) -> u8 {
    match op {
        GateOp::Add => 1,
        GateOp::Mult => 2,
    }
}

/// Shunting-yard.
fn to_postfix(tokens: &[Token]) -> HeResult<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();
    for &token in tokens {
        match token {
            Token::Input(_) => output.push(token),
            Token::Open => operators.push(token),
            Token::Close => loop {
                match operators.pop() {
                    Some(Token::Open) => break,
                    Some(op) => output.push(op),
                    None => return Err(HeError::Parse("unmatched ')'".into())),
                }
            },
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = operators.last() {
                    if precedence(top) < precedence(op) {
                        break;
                    }
                    output.push(Token::Op(top));
                    operators.pop();
                }
                operators.push(token);
            }
        }
    }
    while let Some(op) = operators.pop() {
        if op == Token::Open {
            return Err(HeError::Parse("unmatched '('".into()));
        }
        output.push(op);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_000_003;

    #[test]
    fn product_plus_input() {
        let circuit = parse_circuit("0*1+2").unwrap();
        assert_eq!(circuit.depth(), 2);
        // evaluated first: x0*x1 and a pass-through for x2
        let bottom = &circuit.layers()[1];
        assert_eq!(bottom.gates()[0], Gate::mult(0, 1));
        assert_eq!(bottom.gates()[1], Gate::pass_through(2));
        assert_eq!(bottom.width(), 4);
        assert_eq!(circuit.layers()[0].gates()[0], Gate::add(0, 1));
        assert_eq!(circuit.compute_int(T, &[3, 4, 5]).unwrap()[0], 17);
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(
            parse_circuit("0+1*2").unwrap().compute_int(T, &[2, 3, 4]).unwrap()[0],
            14
        );
        assert_eq!(
            parse_circuit("(0+1)*2").unwrap().compute_int(T, &[2, 3, 4]).unwrap()[0],
            20
        );
    }

    #[test]
    fn deep_expression_matches_direct_evaluation() {
        let expr = "0*1+(2+3*4)+5*6";
        let x = [2i64, 3, 5, 7, 11, 13, 17];
        let expected = x[0] * x[1] + (x[2] + x[3] * x[4]) + x[5] * x[6];
        let circuit = parse_circuit(expr).unwrap();
        assert_eq!(circuit.compute_int(T, &x).unwrap()[0], expected);
        for layer in circuit.layers() {
            assert!(layer.width().is_power_of_two());
        }
    }

    #[test]
    fn repeated_inputs_and_multi_digit_indices() {
        let circuit = parse_circuit("10 * 10 + 0").unwrap();
        let mut x = vec![0i64; 11];
        x[0] = 1;
        x[10] = 9;
        assert_eq!(circuit.compute_int(T, &x).unwrap()[0], 82);
    }

    #[test]
    fn bare_input_is_passed_through() {
        let circuit = parse_circuit("1").unwrap();
        assert_eq!(circuit.compute_int(T, &[4, 6]).unwrap()[0], 6);
    }

    #[test]
    fn malformed_expressions() {
        for expr in ["", "0+", "(0+1", "0+1)", "0 1", "0-1", "*"] {
            assert!(
                matches!(parse_circuit(expr), Err(HeError::Parse(_))),
                "expected parse error for '{expr}'"
            );
        }
    }
}
