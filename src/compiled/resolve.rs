// Binds the names in a parsed expression to evaluation slots.
//
// Variables are looked up as: intermediate definition, position component
// (x1, y2, ...), per-bond parameter, global parameter. Calls are looked up as:
// derived geometry, built-in function, tabulated function.

use rustc_hash::FxHashMap;

use crate::compiled::node::{Axis, Coordinate, Node};
use crate::error::ParseError;
use crate::expr::expr::{BinOp, Expr, ParsedExpression, UnOp};
use crate::expr::functions::Func;
use crate::geometry::Geometry;

/// Names an expression is allowed to reference.
#[derive(Debug, Clone, Copy)]
pub struct Declarations<'a> {
    pub per_bond: &'a [String],
    pub globals: &'a [String],
    pub functions: &'a [String],
    pub particles_per_bond: usize,
}

struct Resolver<'a> {
    definitions: FxHashMap<&'a str, &'a Expr>,
    per_bond: FxHashMap<&'a str, usize>,
    globals: FxHashMap<&'a str, usize>,
    functions: FxHashMap<&'a str, usize>,
    particles_per_bond: usize,
    // Definitions currently being expanded, for cycle detection.
    expanding: Vec<&'a str>,
    resolved: FxHashMap<&'a str, Node>,
    geometries: Vec<Geometry>,
}

/// A resolved energy tree and the distinct geometry calls it indexes into.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub energy: Node,
    pub geometries: Vec<Geometry>,
}

/// Splits `x12` into its axis and one-based particle number.
pub fn parse_position_variable(name: &str) -> Option<(Axis, usize)> {
    let mut chars = name.chars();
    let axis = Axis::from_letter(chars.next()?)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|n| (axis, n))
}

/// Parses a particle label `pN` into a zero-based bond slot.
fn parse_particle_label(name: &str, particles_per_bond: usize) -> Option<usize> {
    let digits = name.strip_prefix('p')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let n: usize = digits.parse().ok()?;
    (1..=particles_per_bond).contains(&n).then(|| n - 1)
}

impl<'a> Resolver<'a> {
    fn new(parsed: &'a ParsedExpression, decls: &Declarations<'a>) -> Result<Self, ParseError> {
        let mut definitions = FxHashMap::default();
        for def in &parsed.definitions {
            if definitions.insert(def.name.as_str(), &def.expr).is_some() {
                return Err(ParseError::DuplicateDefinition(def.name.clone()));
            }
        }

        let index = |names: &'a [String]| -> FxHashMap<&'a str, usize> {
            names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect()
        };

        Ok(Self {
            definitions,
            per_bond: index(decls.per_bond),
            globals: index(decls.globals),
            functions: index(decls.functions),
            particles_per_bond: decls.particles_per_bond,
            expanding: Vec::new(),
            resolved: FxHashMap::default(),
            geometries: Vec::new(),
        })
    }

    fn resolve(&mut self, expr: &'a Expr) -> Result<Node, ParseError> {
        match expr {
            Expr::Number(n) => Ok(Node::Constant(*n)),
            Expr::Var(name) => self.resolve_var(name),
            Expr::Unary(UnOp::Pos, inner) => self.resolve(inner),
            Expr::Unary(UnOp::Neg, inner) => Ok(Node::neg(self.resolve(inner)?)),
            Expr::Binary(left, op, right) => {
                let a = self.resolve(left)?;
                let b = self.resolve(right)?;
                Ok(match op {
                    BinOp::Add => Node::add(a, b),
                    BinOp::Sub => Node::sub(a, b),
                    BinOp::Mul => Node::mul(a, b),
                    BinOp::Div => Node::div(a, b),
                    BinOp::Pow => Node::pow(a, b),
                })
            }
            Expr::Call(name, args) => self.resolve_call(name, args),
        }
    }

    fn resolve_var(&mut self, name: &'a str) -> Result<Node, ParseError> {
        if let Some(&definition) = self.definitions.get(name) {
            if let Some(node) = self.resolved.get(name) {
                return Ok(node.clone());
            }
            if self.expanding.contains(&name) {
                return Err(ParseError::RecursiveDefinition(name.to_string()));
            }
            self.expanding.push(name);
            let node = self.resolve(definition);
            self.expanding.pop();
            let node = node?;
            self.resolved.insert(name, node.clone());
            return Ok(node);
        }
        if let Some((axis, n)) = parse_position_variable(name) {
            if (1..=self.particles_per_bond).contains(&n) {
                return Ok(Node::Coordinate(Coordinate::new(n - 1, axis)));
            }
        }
        if let Some(&i) = self.per_bond.get(name) {
            return Ok(Node::PerBond(i));
        }
        if let Some(&i) = self.globals.get(name) {
            return Ok(Node::Global(i));
        }
        Err(ParseError::UnknownIdentifier(name.to_string()))
    }

    fn resolve_call(&mut self, name: &'a str, args: &'a [Expr]) -> Result<Node, ParseError> {
        let check_arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ParseError::WrongArity {
                    name: name.to_string(),
                    expected,
                    found: args.len(),
                })
            }
        };

        match name {
            "distance" => {
                check_arity(2)?;
                let p = self.particle_labels::<2>(name, args)?;
                return Ok(self.geometry_node(Geometry::Distance(p)));
            }
            "angle" => {
                check_arity(3)?;
                let p = self.particle_labels::<3>(name, args)?;
                return Ok(self.geometry_node(Geometry::Angle(p)));
            }
            "dihedral" => {
                check_arity(4)?;
                let p = self.particle_labels::<4>(name, args)?;
                return Ok(self.geometry_node(Geometry::Dihedral(p)));
            }
            _ => {}
        }

        if let Some(func) = Func::lookup(name) {
            check_arity(func.arity())?;
            let resolved = args
                .iter()
                .map(|arg| self.resolve(arg))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Node::call(func, resolved));
        }

        if let Some(&function) = self.functions.get(name) {
            check_arity(1)?;
            let arg = self.resolve(&args[0])?;
            return Ok(Node::Spline {
                function,
                order: 0,
                arg: Box::new(arg),
            });
        }

        Err(ParseError::UnknownFunction(name.to_string()))
    }

    // Identical calls share one slot, so each is computed once per bond.
    fn geometry_node(&mut self, geometry: Geometry) -> Node {
        let index = match self.geometries.iter().position(|g| *g == geometry) {
            Some(index) => index,
            None => {
                self.geometries.push(geometry);
                self.geometries.len() - 1
            }
        };
        Node::Geometry { index, geometry }
    }

    fn particle_labels<const N: usize>(
        &self,
        function: &str,
        args: &[Expr],
    ) -> Result<[usize; N], ParseError> {
        let mut slots = [0; N];
        for (slot, arg) in slots.iter_mut().zip(args) {
            let parsed = match arg {
                Expr::Var(label) => parse_particle_label(label, self.particles_per_bond),
                _ => None,
            };
            *slot = parsed.ok_or_else(|| ParseError::InvalidParticleLabel {
                function: function.to_string(),
                label: arg.to_string(),
                particles_per_bond: self.particles_per_bond,
            })?;
        }
        Ok(slots)
    }
}

/// Resolves the energy expression of `parsed` against the declared names.
///
/// Every definition is checked, including those the energy never uses.
pub fn resolve(parsed: &ParsedExpression, decls: &Declarations) -> Result<Resolved, ParseError> {
    let mut resolver = Resolver::new(parsed, decls)?;
    for def in &parsed.definitions {
        resolver.resolve_var(&def.name)?;
    }
    let energy = resolver.resolve(&parsed.energy)?;
    Ok(Resolved {
        energy,
        geometries: resolver.geometries,
    })
}
