//! Lowering of canonical trees into the SSA module.
//!
//! Every value is an atom of one configured width, except the `i1`
//! produced by `.=`. Loops and gates become private functions: whatever
//! data the subject holds at the `|-` or `|=` is passed in as parameters,
//! in sorted face order, so recursion never needs mutable state.

use crate::ast::{Node, NodeKind};
use crate::builtins::find_builtin;
use crate::error::CoreError;
use crate::ir::{BinaryOp, BlockId, FuncId, Function, Module, Param, Terminator, Ty, Value};
use crate::reduce::ANONYMOUS_SLOT;
use crate::span::Span;
use crate::subject::Subject;

/// Lower a canonical tree into a module whose entry function is `entry`.
pub fn generate_llvm_ir(node: &Node, atom: Ty, entry: &str) -> Result<Module, CoreError> {
    let mut generator = Generator::new(atom);
    generator.lower_entry(entry, node)?;
    let module = generator.finish();
    module.verify()?;
    Ok(module)
}

pub struct Generator {
    module: Module,
    atom: Ty,
}

impl Generator {
    pub fn new(atom: Ty) -> Self {
        Generator {
            module: Module::new(),
            atom,
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn lower_entry(&mut self, name: &str, node: &Node) -> Result<FuncId, CoreError> {
        let main = self.module.add_entry(name, self.atom);
        let entry = self.function(main)?.add_block();
        let result = self.generate(node, &Subject::new(), main, entry)?;
        self.maybe_ret(main, entry, result, node.span)?;
        Ok(main)
    }

    /// Lower `node` into `block` of `func`.
    ///
    /// Returns `None` when control already left the block (a conditional
    /// terminated it).
    pub fn generate(
        &mut self,
        node: &Node,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Option<Value>, CoreError> {
        let span = node.span;
        match &node.kind {
            NodeKind::Num(digits) => self.numeral(digits, span).map(Some),
            NodeKind::Face(name) => match subject.get(name) {
                Some(value) => Ok(Some(value.clone())),
                None => Err(CoreError::codegen(span, format!("unbound face {name}"))),
            },
            NodeKind::Buc => Ok(Some(Value::Func(func))),
            NodeKind::Rune { rune, args } => self.rune(rune, args, span, subject, func, block),
            NodeKind::Cell { .. } => Err(CoreError::codegen(
                span,
                format!("cell {node} has no atom representation"),
            )),
            // `^=` labels a value; the label has no runtime meaning.
            NodeKind::FacedValue { value, .. } => self.generate(value, subject, func, block),
            NodeKind::Pat | NodeKind::Dot => Err(
                CoreError::codegen(span, format!("cannot lower {node} as a value")),
            ),
        }
    }

    fn rune(
        &mut self,
        rune: &str,
        args: &[Node],
        span: Span,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Option<Value>, CoreError> {
        match (rune, args) {
            (".=", [lhs, rhs]) => {
                let lhs = self.atom_operand(lhs, subject, func, block)?;
                let rhs = self.atom_operand(rhs, subject, func, block)?;
                let atom = self.atom;
                self.function(func)?.icmp_eq(block, atom, lhs, rhs).map(Some)
            }
            (".+", [operand]) => {
                let operand = self.atom_operand(operand, subject, func, block)?;
                let one = self.constant(1);
                let atom = self.atom;
                self.function(func)?
                    .binary(block, BinaryOp::Add, atom, operand, one)
                    .map(Some)
            }
            ("=/", [name, value, body]) => {
                let Some(face) = name.as_face() else {
                    return Err(CoreError::codegen(
                        name.span,
                        format!("=/ expects a face, found {name}"),
                    ));
                };
                let value = self.operand(value, subject, func, block)?;
                let inner = subject.with(face, value);
                self.generate(body, &inner, func, block)
            }
            ("?:", [test, yes, no]) => {
                let cond = self.operand(test, subject, func, block)?;
                if cond.ty() != Some(Ty::Bool) {
                    return Err(CoreError::codegen(
                        test.span,
                        format!("?: expects a boolean test, found {test}"),
                    ));
                }
                let function = self.function(func)?;
                let then = function.add_block();
                let otherwise = function.add_block();
                function.terminate(
                    block,
                    Terminator::CondBr {
                        cond,
                        then,
                        otherwise,
                    },
                )?;
                let result = self.generate(yes, subject, func, then)?;
                self.maybe_ret(func, then, result, yes.span)?;
                let result = self.generate(no, subject, func, otherwise)?;
                self.maybe_ret(func, otherwise, result, no.span)?;
                Ok(None)
            }
            ("|-", [body]) => {
                let captured = captured_faces(subject, &[]);
                let names: Vec<String> = captured.iter().map(|(face, _)| face.clone()).collect();
                let trap = self.build_function(subject, &names, &[], body)?;
                let mut args = Vec::with_capacity(captured.len());
                for (_, value) in captured {
                    args.push(self.widen(value, func, block, span)?);
                }
                let atom = self.atom;
                self.function(func)?.call(block, trap, atom, args).map(Some)
            }
            ("|=", [sample, body]) => {
                // A gate is only a handle here; its captures are read from
                // the subject again at each call site.
                let samples = sample_faces(sample)?;
                let names: Vec<String> = captured_faces(subject, &samples)
                    .into_iter()
                    .map(|(face, _)| face)
                    .collect();
                let gate = self.build_function(subject, &names, &samples, body)?;
                Ok(Some(Value::Func(gate)))
            }
            ("%-", [target, rest @ ..]) => self.apply(target, rest, span, subject, func, block),
            ("%=", [target, pairs @ ..]) => {
                self.rewrite_call(target, pairs, span, subject, func, block)
            }
            ("=/" | ".=" | ".+" | "?:" | "|-" | "|=" | "%-" | "%=", _) => Err(CoreError::codegen(
                span,
                format!("rune {rune} applied to {} arguments", args.len()),
            )),
            _ => Err(CoreError::codegen(
                span,
                format!("unhandled rune {rune}; only reduced trees can be lowered"),
            )),
        }
    }

    /// `%-`: positional application.
    fn apply(
        &mut self,
        target: &Node,
        args: &[Node],
        span: Span,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Option<Value>, CoreError> {
        let callee = match &target.kind {
            NodeKind::Buc | NodeKind::Dot => func,
            NodeKind::Face(name) => {
                if let Some(builtin) = find_builtin(name) {
                    if args.len() != builtin.arity {
                        return Err(CoreError::codegen(
                            span,
                            format!(
                                "{name} expects {} arguments, found {}",
                                builtin.arity,
                                args.len()
                            ),
                        ));
                    }
                    let lhs = self.atom_operand(&args[0], subject, func, block)?;
                    let rhs = match builtin.implicit_rhs {
                        Some(value) => self.constant(value),
                        None => self.atom_operand(&args[1], subject, func, block)?,
                    };
                    let atom = self.atom;
                    return self
                        .function(func)?
                        .binary(block, builtin.op, atom, lhs, rhs)
                        .map(Some);
                }
                match subject.get(name) {
                    Some(Value::Func(id)) => *id,
                    Some(_) => {
                        return Err(CoreError::codegen(
                            target.span,
                            format!("{name} is not a gate"),
                        ));
                    }
                    None => {
                        return Err(CoreError::codegen(
                            target.span,
                            format!("unknown gate {name}"),
                        ));
                    }
                }
            }
            NodeKind::Rune { .. } => match self.operand(target, subject, func, block)? {
                Value::Func(id) => id,
                _ => {
                    return Err(CoreError::codegen(
                        target.span,
                        format!("{target} does not produce a gate"),
                    ));
                }
            },
            _ => {
                return Err(CoreError::codegen(
                    target.span,
                    format!("cannot call {target}"),
                ));
            }
        };

        let params = self.param_names(callee)?;
        if args.len() > params.len() {
            return Err(CoreError::codegen(
                span,
                format!(
                    "gate takes at most {} arguments, found {}",
                    params.len(),
                    args.len()
                ),
            ));
        }
        let defaulted = params.len() - args.len();
        let mut values = Vec::with_capacity(params.len());
        for name in &params[..defaulted] {
            values.push(self.subject_atom(name, subject, func, block, span)?);
        }
        for arg in args {
            values.push(self.atom_operand(arg, subject, func, block)?);
        }
        let atom = self.atom;
        self.function(func)?.call(block, callee, atom, values).map(Some)
    }

    /// `%=`: call with every parameter taken from the subject unless a
    /// pair of the same name overrides it.
    fn rewrite_call(
        &mut self,
        target: &Node,
        pairs: &[Node],
        span: Span,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Option<Value>, CoreError> {
        let callee = match &target.kind {
            NodeKind::Buc | NodeKind::Dot => func,
            NodeKind::Face(name) => match subject.get(name) {
                Some(Value::Func(id)) => *id,
                Some(_) => {
                    return Err(CoreError::codegen(
                        target.span,
                        format!("{name} is not a gate"),
                    ));
                }
                None => {
                    return Err(CoreError::codegen(
                        target.span,
                        format!("unknown gate {name}"),
                    ));
                }
            },
            _ => {
                return Err(CoreError::codegen(
                    target.span,
                    format!("unhandled %= target {target}"),
                ));
            }
        };
        if pairs.len() % 2 != 0 {
            return Err(CoreError::codegen(span, "%= needs name/value pairs"));
        }
        let mut overrides = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            let Some(name) = pair[0].as_face() else {
                return Err(CoreError::codegen(
                    pair[0].span,
                    format!("%= expects a face, found {}", pair[0]),
                ));
            };
            overrides.push((name, &pair[1]));
        }

        let params = self.param_names(callee)?;
        let mut values = Vec::with_capacity(params.len());
        for name in &params {
            let value = match overrides.iter().find(|(face, _)| *face == name.as_str()) {
                Some((_, node)) => self.atom_operand(node, subject, func, block)?,
                None => self.subject_atom(name, subject, func, block, span)?,
            };
            values.push(value);
        }
        let atom = self.atom;
        self.function(func)?.call(block, callee, atom, values).map(Some)
    }

    /// Create a private function taking `captured` then `samples`, and
    /// lower `body` into it.
    fn build_function(
        &mut self,
        outer: &Subject,
        captured: &[String],
        samples: &[String],
        body: &Node,
    ) -> Result<FuncId, CoreError> {
        let atom = self.atom;
        let params: Vec<Param> = captured
            .iter()
            .chain(samples)
            .cloned()
            .map(|name| Param { name, ty: atom })
            .collect();
        let id = self.module.add_private(params, atom);

        let mut inner = Subject::new();
        for (face, value) in outer.function_faces() {
            if !samples.iter().any(|sample| sample == face) {
                inner = inner.with(face, value.clone());
            }
        }
        let function = self.function(id)?;
        for index in 0..function.params.len() {
            if let Some(Value::Param { name, ty }) = function.param_value(index) {
                inner = inner.with(name.clone(), Value::Param { ty, name });
            }
        }

        let entry = self.function(id)?.add_block();
        let result = self.generate(body, &inner, id, entry)?;
        self.maybe_ret(id, entry, result, body.span)?;
        Ok(id)
    }

    fn maybe_ret(
        &mut self,
        func: FuncId,
        block: BlockId,
        result: Option<Value>,
        span: Span,
    ) -> Result<(), CoreError> {
        let Some(value) = result else {
            return Ok(());
        };
        let value = self.widen(value, func, block, span)?;
        self.function(func)?.terminate(block, Terminator::Ret(value))
    }

    /// Lower `node` where a value is required.
    fn operand(
        &mut self,
        node: &Node,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Value, CoreError> {
        self.generate(node, subject, func, block)?.ok_or_else(|| {
            CoreError::codegen(
                node.span,
                "a conditional is only supported in tail position",
            )
        })
    }

    fn atom_operand(
        &mut self,
        node: &Node,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
    ) -> Result<Value, CoreError> {
        let value = self.operand(node, subject, func, block)?;
        self.widen(value, func, block, node.span)
    }

    fn subject_atom(
        &mut self,
        name: &str,
        subject: &Subject,
        func: FuncId,
        block: BlockId,
        span: Span,
    ) -> Result<Value, CoreError> {
        let Some(value) = subject.get(name) else {
            return Err(CoreError::codegen(
                span,
                format!("no value for {name} in the subject"),
            ));
        };
        self.widen(value.clone(), func, block, span)
    }

    /// Booleans become atoms through `zext`; gates are rejected.
    fn widen(
        &mut self,
        value: Value,
        func: FuncId,
        block: BlockId,
        span: Span,
    ) -> Result<Value, CoreError> {
        match value.ty() {
            Some(Ty::Bool) => {
                let atom = self.atom;
                self.function(func)?.zext(block, value, atom)
            }
            Some(Ty::Int(_)) => Ok(value),
            None => Err(CoreError::codegen(span, "a gate cannot be used as data")),
        }
    }

    fn numeral(&self, digits: &str, span: Span) -> Result<Value, CoreError> {
        let Ty::Int(bits) = self.atom else {
            return Err(CoreError::codegen(span, "atoms must be integers"));
        };
        let cleaned: String = digits.chars().filter(|c| *c != '.').collect();
        let max = if bits >= 64 {
            i64::MAX
        } else {
            (1i64 << (bits - 1)) - 1
        };
        match cleaned.parse::<i64>() {
            Ok(value) if value <= max => Ok(self.constant(value)),
            _ => Err(CoreError::codegen(
                span,
                format!("numeral {digits} does not fit in i{bits}"),
            )),
        }
    }

    fn constant(&self, value: i64) -> Value {
        Value::Const {
            ty: self.atom,
            value,
        }
    }

    fn param_names(&self, id: FuncId) -> Result<Vec<String>, CoreError> {
        Ok(self
            .module
            .function(id)?
            .params
            .iter()
            .map(|param| param.name.clone())
            .collect())
    }

    fn function(&mut self, id: FuncId) -> Result<&mut Function, CoreError> {
        self.module.function_mut(id)
    }
}

/// Data faces a nested function takes as parameters, in sorted order.
/// Shadowed faces are left to the sample. Reserved slots are dropped:
/// user code cannot name them, so nothing past the rewrite that bound
/// them reads them again.
fn captured_faces(subject: &Subject, shadowed: &[String]) -> Vec<(String, Value)> {
    subject
        .data_faces()
        .filter(|(face, _)| !face.starts_with(ANONYMOUS_SLOT))
        .filter(|(face, _)| !shadowed.iter().any(|sample| sample == face))
        .map(|(face, value)| (face.to_string(), value.clone()))
        .collect()
}

/// Sample names declared by a gate's mold: `a=@`, or cells of them.
fn sample_faces(mold: &Node) -> Result<Vec<String>, CoreError> {
    let mut faces = Vec::new();
    collect_samples(mold, &mut faces)?;
    Ok(faces)
}

fn collect_samples(mold: &Node, faces: &mut Vec<String>) -> Result<(), CoreError> {
    match &mold.kind {
        NodeKind::FacedValue { face, value } => {
            if !matches!(value.kind, NodeKind::Pat) {
                return Err(CoreError::codegen(
                    value.span,
                    format!("unsupported sample type {value}"),
                ));
            }
            if faces.contains(face) {
                return Err(CoreError::codegen(
                    mold.span,
                    format!("duplicate sample {face}"),
                ));
            }
            faces.push(face.clone());
            Ok(())
        }
        NodeKind::Cell { head, tail } => {
            collect_samples(head, faces)?;
            collect_samples(tail, faces)
        }
        _ => Err(CoreError::codegen(
            mold.span,
            format!("unsupported sample mold {mold}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Inst, Linkage};
    use crate::parser::parse;
    use crate::reduce::reduce;

    const I32: Ty = Ty::Int(32);

    fn lower(source: &str) -> Result<Module, CoreError> {
        let node = reduce(parse(source).expect("parse")).expect("reduce");
        generate_llvm_ir(&node, I32, "main")
    }

    fn codegen_message(source: &str) -> String {
        match lower(source) {
            Err(CoreError::CodegenError { message, .. }) => message,
            other => panic!("expected a codegen error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn constant_program_has_one_block() {
        let module = lower("42").expect("lower");
        assert_eq!(module.functions.len(), 1);
        let main = &module.functions[0];
        assert_eq!(main.linkage, Linkage::Entry("main".to_string()));
        assert_eq!(main.blocks.len(), 1);
        assert_eq!(
            main.blocks[0].terminator,
            Some(Terminator::Ret(Value::Const { ty: I32, value: 42 }))
        );
    }

    #[test]
    fn conditional_makes_two_terminated_blocks() {
        let module = lower("?:(=(1 2) 3 4)").expect("lower");
        let main = &module.functions[0];
        assert_eq!(main.blocks.len(), 3);
        assert!(matches!(
            main.blocks[0].terminator,
            Some(Terminator::CondBr {
                then: BlockId(1),
                otherwise: BlockId(2),
                ..
            })
        ));
        for block in &main.blocks[1..] {
            assert!(matches!(block.terminator, Some(Terminator::Ret(_))));
        }
    }

    #[test]
    fn trap_captures_data_faces_in_sorted_order() {
        let module = lower("=/  b  1\n=/  a  2\n|-\n(add a b)").expect("lower");
        let trap = &module.functions[1];
        let names: Vec<_> = trap.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        let Inst::Call { args, .. } = &module.functions[0].blocks[0].insts[0] else {
            panic!("expected a call");
        };
        assert_eq!(
            args,
            &[
                Value::Const { ty: I32, value: 2 },
                Value::Const { ty: I32, value: 1 }
            ]
        );
    }

    #[test]
    fn gates_append_samples_after_captures() {
        let module = lower("=/  k  3\n=/  f  |=([a=@ b=@] (add k a))\n(f 1 2)").expect("lower");
        let gate = &module.functions[1];
        let names: Vec<_> = gate.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["k", "a", "b"]);
    }

    #[test]
    fn samples_shadow_captured_faces() {
        let module = lower("=/  a  3\n(|=(a=@ .+(a)) 4)").expect("lower");
        let gate = &module.functions[1];
        let names: Vec<_> = gate.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a"]);
    }

    #[test]
    fn gates_are_not_captured_as_data() {
        let module = lower("=/  f  |=(a=@ a)\n=/  n  2\n|-\n(f n)").expect("lower");
        let trap = &module.functions[2];
        let names: Vec<_> = trap.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["n"]);
    }

    #[test]
    fn gate_definitions_emit_no_code() {
        let module = lower("=/  c  =(1 1)\n=/  f  |=(b=@ b)\n(f 2)").expect("lower");
        let gate = &module.functions[1];
        let names: Vec<_> = gate.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["c", "b"]);
        // One zext, for the defaulted `c` at the call.
        let insts = &module.functions[0].blocks[0].insts;
        assert_eq!(insts.len(), 3);
        assert!(matches!(insts[0], Inst::ICmpEq { .. }));
        assert!(matches!(insts[1], Inst::Zext { .. }));
        assert!(matches!(insts[2], Inst::Call { .. }));
    }

    #[test]
    fn reserved_slots_are_not_captured() {
        let module = lower("=/(a 1 =/(b 2 =:(a b, b a |-((add a b)))))").expect("lower");
        let trap = &module.functions[1];
        let names: Vec<_> = trap.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let module = lower("=+(1 |-(2))").expect("lower");
        assert!(module.functions[1].params.is_empty());
    }

    #[test]
    fn labelled_values_lower_to_their_value() {
        let module = lower("=/(a ^=(b 1) a)").expect("lower");
        assert_eq!(
            module.functions[0].blocks[0].terminator,
            Some(Terminator::Ret(Value::Const { ty: I32, value: 1 }))
        );
    }

    #[test]
    fn booleans_widen_where_atoms_are_needed() {
        let module = lower("=(1 1)").expect("lower");
        let insts = &module.functions[0].blocks[0].insts;
        assert!(matches!(insts[0], Inst::ICmpEq { .. }));
        assert!(matches!(insts[1], Inst::Zext { to: Ty::Int(32), .. }));
    }

    #[test]
    fn centis_ignores_unknown_pairs() {
        let module = lower("=/  n  1\n|-\n?:  =(n 3)\n  n\n$(n +(n), zzz 9)").expect("lower");
        assert_eq!(module.functions[1].params.len(), 1);
    }

    #[test]
    fn rejects_unbound_faces() {
        assert_eq!(codegen_message("(add a 1)"), "unbound face a");
    }

    #[test]
    fn rejects_unknown_gates() {
        assert_eq!(codegen_message("(frob 1)"), "unknown gate frob");
        assert_eq!(codegen_message("=/  a  1\n(a 1)"), "a is not a gate");
    }

    #[test]
    fn rejects_too_many_arguments() {
        let message = codegen_message("=/  f  |=(a=@ a)\n(f 1 2)");
        assert!(message.contains("at most 1"), "{message}");
        assert!(codegen_message("(dec 1 2)").contains("expects 1 arguments"));
    }

    #[test]
    fn rejects_conditionals_in_operand_position() {
        let message = codegen_message(".+(?:(=(1 1) 2 3))");
        assert!(message.contains("tail position"), "{message}");
    }

    #[test]
    fn rejects_non_boolean_tests() {
        assert!(codegen_message("?:(1 2 3)").contains("boolean"));
    }

    #[test]
    fn rejects_out_of_range_numerals() {
        assert!(codegen_message("2.147.483.648").contains("does not fit in i32"));
        let node = parse("200").unwrap();
        assert!(generate_llvm_ir(&node, Ty::Int(8), "main").is_err());
        assert!(generate_llvm_ir(&node, Ty::Int(16), "main").is_ok());
    }

    #[test]
    fn rejects_returning_a_gate() {
        assert!(codegen_message("|=(a=@ a)").contains("cannot be used as data"));
    }

    #[test]
    fn rejects_unreduced_runes() {
        let node = parse(":-(1 2)").unwrap();
        let err = generate_llvm_ir(&node, I32, "main").unwrap_err();
        assert!(err.to_string().contains("unhandled rune :-"));
    }

    #[test]
    fn rejects_cells_as_values() {
        assert!(codegen_message("[1 2]").contains("no atom representation"));
    }
}
