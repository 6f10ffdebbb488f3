// Symbolic differentiation of resolved expression trees.
//
// Derivatives are built with the folding constructors on `Node`, so a branch
// that does not depend on the target coordinate collapses to a constant 0 and
// disappears from products and sums.

use std::f64::consts::PI;

use crate::compiled::node::{Coordinate, Node};
use crate::error::ParseError;
use crate::expr::functions::Func;
use crate::tabulated::MAX_SPLINE_ORDER;

/// Returns d(node)/d(wrt).
pub fn differentiate(node: &Node, wrt: Coordinate) -> Result<Node, ParseError> {
    Ok(match node {
        Node::Constant(_) | Node::PerBond(_) | Node::Global(_) => Node::zero(),
        Node::Coordinate(c) => {
            if *c == wrt {
                Node::one()
            } else {
                Node::zero()
            }
        }
        Node::Neg(a) => Node::neg(differentiate(a, wrt)?),
        Node::Add(a, b) => Node::add(differentiate(a, wrt)?, differentiate(b, wrt)?),
        Node::Sub(a, b) => Node::sub(differentiate(a, wrt)?, differentiate(b, wrt)?),
        Node::Mul(a, b) => {
            // (uv)' = u'v + uv'
            let da = differentiate(a, wrt)?;
            let db = differentiate(b, wrt)?;
            Node::add(
                Node::mul(da, (**b).clone()),
                Node::mul((**a).clone(), db),
            )
        }
        Node::Div(a, b) => {
            // (u/v)' = u'/v - u v' / v^2
            let da = differentiate(a, wrt)?;
            let db = differentiate(b, wrt)?;
            Node::sub(
                Node::div(da, (**b).clone()),
                Node::div(
                    Node::mul((**a).clone(), db),
                    Node::pow((**b).clone(), Node::Constant(2.0)),
                ),
            )
        }
        Node::Pow(a, b) => differentiate_pow(a, b, wrt)?,
        Node::Call(func, args) => differentiate_call(*func, args, wrt)?,
        Node::Spline {
            function,
            order,
            arg,
        } => {
            let du = differentiate(arg, wrt)?;
            if du.is_zero() || *order >= MAX_SPLINE_ORDER {
                Node::zero()
            } else {
                Node::mul(
                    Node::Spline {
                        function: *function,
                        order: order + 1,
                        arg: arg.clone(),
                    },
                    du,
                )
            }
        }
        Node::Geometry { index, geometry } => {
            // Chain rule through the particle positions: the same particle may
            // appear in several argument slots.
            geometry
                .particles()
                .iter()
                .enumerate()
                .filter(|&(_, &particle)| particle == wrt.particle)
                .fold(Node::zero(), |acc, (slot, _)| {
                    Node::add(
                        acc,
                        Node::GeometryPartial {
                            index: *index,
                            geometry: *geometry,
                            slot,
                            axis: wrt.axis,
                        },
                    )
                })
        }
        Node::GeometryPartial { geometry, .. } => {
            return Err(ParseError::NotDifferentiable(format!(
                "the partial derivative of {}()",
                geometry.name()
            )));
        }
    })
}

fn differentiate_pow(base: &Node, exponent: &Node, wrt: Coordinate) -> Result<Node, ParseError> {
    let du = differentiate(base, wrt)?;
    let dv = differentiate(exponent, wrt)?;

    if dv.is_zero() {
        // (u^c)' = c u^(c-1) u'
        if du.is_zero() {
            return Ok(Node::zero());
        }
        let reduced = Node::sub(exponent.clone(), Node::one());
        return Ok(Node::mul(
            Node::mul(exponent.clone(), Node::pow(base.clone(), reduced)),
            du,
        ));
    }

    // (u^v)' = u^v (v' log(u) + v u' / u)
    let log_term = Node::mul(dv, Node::call1(Func::Log, base.clone()));
    let base_term = Node::div(Node::mul(exponent.clone(), du), base.clone());
    Ok(Node::mul(
        Node::pow(base.clone(), exponent.clone()),
        Node::add(log_term, base_term),
    ))
}

fn differentiate_call(func: Func, args: &[Node], wrt: Coordinate) -> Result<Node, ParseError> {
    if let Func::Min | Func::Max = func {
        let (a, b) = (&args[0], &args[1]);
        let da = differentiate(a, wrt)?;
        let db = differentiate(b, wrt)?;
        if da.is_zero() && db.is_zero() {
            return Ok(Node::zero());
        }
        // step(...) is 1 where the first argument is the selected one.
        let selector = match func {
            Func::Min => Node::sub(b.clone(), a.clone()),
            _ => Node::sub(a.clone(), b.clone()),
        };
        let first = Node::call1(Func::Step, selector);
        return Ok(Node::add(
            Node::mul(first.clone(), da),
            Node::mul(Node::sub(Node::one(), first), db),
        ));
    }

    let u = &args[0];
    let du = differentiate(u, wrt)?;
    if du.is_zero() {
        return Ok(Node::zero());
    }
    let call = |f: Func| Node::call1(f, u.clone());
    let square = |n: Node| Node::pow(n, Node::Constant(2.0));
    // 1 - u^2
    let one_minus_sq = || Node::sub(Node::one(), square(u.clone()));

    let outer = match func {
        Func::Sqrt => Node::div(Node::Constant(0.5), call(Func::Sqrt)),
        Func::Exp => call(Func::Exp),
        Func::Log => Node::div(Node::one(), u.clone()),
        Func::Sin => call(Func::Cos),
        Func::Cos => Node::neg(call(Func::Sin)),
        Func::Sec => Node::mul(call(Func::Sec), call(Func::Tan)),
        Func::Csc => Node::neg(Node::mul(call(Func::Csc), call(Func::Cot))),
        Func::Tan => square(call(Func::Sec)),
        Func::Cot => Node::neg(square(call(Func::Csc))),
        Func::Asin => Node::div(Node::one(), Node::call1(Func::Sqrt, one_minus_sq())),
        Func::Acos => Node::div(Node::Constant(-1.0), Node::call1(Func::Sqrt, one_minus_sq())),
        Func::Atan => Node::div(Node::one(), Node::add(Node::one(), square(u.clone()))),
        Func::Sinh => call(Func::Cosh),
        Func::Cosh => call(Func::Sinh),
        Func::Tanh => Node::sub(Node::one(), square(call(Func::Tanh))),
        Func::Erf | Func::Erfc => {
            let gauss = Node::call1(Func::Exp, Node::neg(square(u.clone())));
            let scale = 2.0 / PI.sqrt();
            let scale = if func == Func::Erf { scale } else { -scale };
            Node::mul(Node::Constant(scale), gauss)
        }
        // sign(u), with sign(0) = 0
        Func::Abs => Node::sub(
            call(Func::Step),
            Node::call1(Func::Step, Node::neg(u.clone())),
        ),
        Func::Step | Func::Delta => Node::zero(),
        Func::Min | Func::Max => unreachable!("handled above"),
    };
    Ok(Node::mul(outer, du))
}
