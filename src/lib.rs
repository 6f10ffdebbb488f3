//! Multi-particle bonded interactions defined by algebraic energy expressions.
//!
//! A [`CompoundBondForce`] describes a potential acting on fixed-size tuples of
//! particles ("bonds") through an energy expression such as
//! `k*(distance(p1,p2)-r0)^2`. The expression is compiled once into a
//! [`CompiledExpression`] holding the energy tree and one analytic derivative
//! tree per coordinate. A [`BondContext`] binds the compiled expression to a
//! particle system and evaluates energy and forces over all bonds.

pub mod compiled;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod force;
pub mod force_field;
pub mod geometry;
pub mod kernel;
pub mod parameters;
pub mod tabulated;
pub mod topology;

pub use compiled::{BondEvaluation, CompiledExpression, compile};
pub use config::{Backend, EvaluatorConfig};
pub use context::BondContext;
pub use error::{BondForceError, BondForceResult, ParseError};
pub use force::{Bond, BondHandle, CompoundBondForce, GlobalParameter, PerBondParameter};
pub use force_field::ForceField;
pub use tabulated::{NaturalSpline, TabulatedFunction};
