//! Built-in arithmetic gates.
//!
//! These names are resolved before the subject when they head a call,
//! and lower straight to an instruction instead of a `call`.

use crate::ir::BinaryOp;

/// Metadata about a single builtin gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name of the gate at the Hoon level (e.g., `dec`).
    pub name: &'static str,

    /// Number of explicit samples the gate takes.
    pub arity: usize,

    /// Instruction the call lowers to.
    pub op: BinaryOp,

    /// Constant right operand for unary gates (`dec` subtracts 1).
    pub implicit_rhs: Option<i64>,
}

/// The complete list of builtins known to the generator.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "dec",
        arity: 1,
        op: BinaryOp::Sub,
        implicit_rhs: Some(1),
    },
    BuiltinDescriptor {
        name: "add",
        arity: 2,
        op: BinaryOp::Add,
        implicit_rhs: None,
    },
    BuiltinDescriptor {
        name: "sub",
        arity: 2,
        op: BinaryOp::Sub,
        implicit_rhs: None,
    },
    BuiltinDescriptor {
        name: "mul",
        arity: 2,
        op: BinaryOp::Mul,
        implicit_rhs: None,
    },
];

/// Look up a builtin by name.
///
/// The search is linear over `BUILTINS` because the table is small.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}
