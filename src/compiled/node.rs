use std::collections::BTreeSet;
use std::fmt;

use glam::DVec3;

use crate::expr::functions::Func;
use crate::geometry::{Geometry, GeometryValue};
use crate::tabulated::NaturalSpline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn from_letter(letter: char) -> Option<Axis> {
        match letter {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    #[inline]
    pub fn component(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    #[inline]
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }
}

/// One Cartesian component of one bond-local particle position (`x1`, `z3`, ...).
///
/// `particle` is zero-based, so `x1` is `Coordinate { particle: 0, axis: Axis::X }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub particle: usize,
    pub axis: Axis,
}

impl Coordinate {
    pub fn new(particle: usize, axis: Axis) -> Self {
        Self { particle, axis }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.axis.letter(), self.particle + 1)
    }
}

/// Resolved expression tree. Every name has been bound to a slot, so evaluation
/// never looks anything up by string.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Constant(f64),
    Coordinate(Coordinate),
    PerBond(usize),
    Global(usize),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Pow(Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
    /// Tabulated function `function` (or its `order`-th derivative) applied to `arg`.
    Spline {
        function: usize,
        order: u8,
        arg: Box<Node>,
    },
    /// Geometry call; `index` is its slot in the per-bond geometry values.
    Geometry { index: usize, geometry: Geometry },
    /// d(geometry)/d(axis component of the particle in argument position `slot`).
    GeometryPartial {
        index: usize,
        geometry: Geometry,
        slot: usize,
        axis: Axis,
    },
}

/// Everything a node tree reads while being evaluated for one bond.
#[derive(Clone, Copy)]
pub struct EvalScope<'a> {
    pub positions: &'a [DVec3],
    pub per_bond: &'a [f64],
    pub globals: &'a [f64],
    pub splines: &'a [NaturalSpline],
    pub geometry: &'a [GeometryValue],
}

// Constructors fold constants and drop neutral elements, which keeps derivative
// trees from growing chains of `0 * ...` and `1 * ...`.
impl Node {
    pub fn zero() -> Node {
        Node::Constant(0.0)
    }

    pub fn one() -> Node {
        Node::Constant(1.0)
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Node::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    pub fn neg(a: Node) -> Node {
        match a {
            Node::Constant(c) => Node::Constant(-c),
            Node::Neg(inner) => *inner,
            other => Node::Neg(Box::new(other)),
        }
    }

    pub fn add(a: Node, b: Node) -> Node {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Node::Constant(x + y),
            (Some(x), _) if x == 0.0 => b,
            (_, Some(y)) if y == 0.0 => a,
            _ => Node::Add(Box::new(a), Box::new(b)),
        }
    }

    pub fn sub(a: Node, b: Node) -> Node {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Node::Constant(x - y),
            (Some(x), _) if x == 0.0 => Node::neg(b),
            (_, Some(y)) if y == 0.0 => a,
            _ => Node::Sub(Box::new(a), Box::new(b)),
        }
    }

    pub fn mul(a: Node, b: Node) -> Node {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Node::Constant(x * y),
            (Some(x), _) | (_, Some(x)) if x == 0.0 => Node::zero(),
            (Some(x), _) if x == 1.0 => b,
            (_, Some(y)) if y == 1.0 => a,
            (Some(x), _) if x == -1.0 => Node::neg(b),
            (_, Some(y)) if y == -1.0 => Node::neg(a),
            _ => Node::Mul(Box::new(a), Box::new(b)),
        }
    }

    pub fn div(a: Node, b: Node) -> Node {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Node::Constant(x / y),
            (Some(x), _) if x == 0.0 => Node::zero(),
            (_, Some(y)) if y == 1.0 => a,
            _ => Node::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn pow(a: Node, b: Node) -> Node {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Node::Constant(x.powf(y)),
            (_, Some(y)) if y == 0.0 => Node::one(),
            (_, Some(y)) if y == 1.0 => a,
            _ => Node::Pow(Box::new(a), Box::new(b)),
        }
    }

    pub fn call(func: Func, args: Vec<Node>) -> Node {
        let constants: Option<Vec<f64>> = args.iter().map(Node::as_constant).collect();
        match constants {
            Some(values) => Node::Constant(func.evaluate(&values)),
            None => Node::Call(func, args),
        }
    }

    pub fn call1(func: Func, arg: Node) -> Node {
        Node::call(func, vec![arg])
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + match self {
            Node::Constant(_)
            | Node::Coordinate(_)
            | Node::PerBond(_)
            | Node::Global(_)
            | Node::Geometry { .. }
            | Node::GeometryPartial { .. } => 0,
            Node::Neg(a) => a.size(),
            Node::Spline { arg, .. } => arg.size(),
            Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) | Node::Div(a, b) | Node::Pow(a, b) => {
                a.size() + b.size()
            }
            Node::Call(_, args) => args.iter().map(Node::size).sum(),
        }
    }

    /// Collects every coordinate the tree depends on, including those referenced
    /// implicitly through geometry calls.
    pub fn collect_coordinates(&self, out: &mut BTreeSet<Coordinate>) {
        match self {
            Node::Constant(_) | Node::PerBond(_) | Node::Global(_) => {}
            Node::Coordinate(c) => {
                out.insert(*c);
            }
            Node::Geometry { geometry, .. } | Node::GeometryPartial { geometry, .. } => {
                for &particle in geometry.particles() {
                    for axis in Axis::ALL {
                        out.insert(Coordinate::new(particle, axis));
                    }
                }
            }
            Node::Neg(a) => a.collect_coordinates(out),
            Node::Spline { arg, .. } => arg.collect_coordinates(out),
            Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) | Node::Div(a, b) | Node::Pow(a, b) => {
                a.collect_coordinates(out);
                b.collect_coordinates(out);
            }
            Node::Call(_, args) => {
                for arg in args {
                    arg.collect_coordinates(out);
                }
            }
        }
    }

    pub fn evaluate(&self, scope: &EvalScope) -> f64 {
        match self {
            Node::Constant(c) => *c,
            Node::Coordinate(c) => c.axis.component(scope.positions[c.particle]),
            Node::PerBond(i) => scope.per_bond[*i],
            Node::Global(i) => scope.globals[*i],
            Node::Neg(a) => -a.evaluate(scope),
            Node::Add(a, b) => a.evaluate(scope) + b.evaluate(scope),
            Node::Sub(a, b) => a.evaluate(scope) - b.evaluate(scope),
            Node::Mul(a, b) => a.evaluate(scope) * b.evaluate(scope),
            Node::Div(a, b) => a.evaluate(scope) / b.evaluate(scope),
            Node::Pow(a, b) => a.evaluate(scope).powf(b.evaluate(scope)),
            Node::Call(func, args) => {
                let mut values = [0.0; 2];
                for (value, arg) in values.iter_mut().zip(args) {
                    *value = arg.evaluate(scope);
                }
                func.evaluate(&values[..args.len()])
            }
            Node::Spline {
                function,
                order,
                arg,
            } => scope.splines[*function].evaluate(arg.evaluate(scope), *order),
            Node::Geometry { index, .. } => scope.geometry[*index].value,
            Node::GeometryPartial {
                index, slot, axis, ..
            } => axis.component(scope.geometry[*index].gradient[*slot]),
        }
    }
}

fn write_particles(f: &mut fmt::Formatter<'_>, name: &str, particles: &[usize]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, p) in particles.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "p{}", p + 1)?;
    }
    write!(f, ")")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Constant(c) => write!(f, "{}", c),
            Node::Coordinate(c) => write!(f, "{}", c),
            Node::PerBond(i) => write!(f, "bond[{}]", i),
            Node::Global(i) => write!(f, "global[{}]", i),
            Node::Neg(a) => write!(f, "-{}", a),
            Node::Add(a, b) => write!(f, "({} + {})", a, b),
            Node::Sub(a, b) => write!(f, "({} - {})", a, b),
            Node::Mul(a, b) => write!(f, "({} * {})", a, b),
            Node::Div(a, b) => write!(f, "({} / {})", a, b),
            Node::Pow(a, b) => write!(f, "({} ^ {})", a, b),
            Node::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Node::Spline {
                function,
                order,
                arg,
            } => {
                if *order == 0 {
                    write!(f, "table[{}]({})", function, arg)
                } else {
                    write!(f, "table[{}]'{}({})", function, order, arg)
                }
            }
            Node::Geometry { geometry, .. } => write_particles(f, geometry.name(), geometry.particles()),
            Node::GeometryPartial {
                geometry,
                slot,
                axis,
                ..
            } => {
                write!(f, "d{}{}:", axis.letter(), geometry.particles()[*slot] + 1)?;
                write_particles(f, geometry.name(), geometry.particles())
            }
        }
    }
}
