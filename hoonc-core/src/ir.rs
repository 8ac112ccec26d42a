//! In-memory SSA module and its LLVM-flavoured text rendering.
//!
//! Values are numbered lazily: an instruction gets an [`InstId`] when it
//! is appended, and the `%N` names seen in the rendered text are assigned
//! only at render time, walking blocks in layout order. Block labels and
//! unnamed values share that counter, so blocks created for a branch
//! before the code that precedes them in layout still come out in order.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use crate::error::CoreError;

/// Value types. Atoms are `iN` for the configured width; booleans only
/// ever come out of an equality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    Int(u32),
    Bool,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int(bits) => write!(f, "i{bits}"),
            Ty::Bool => f.write_str("i1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Const { ty: Ty, value: i64 },
    Param { ty: Ty, name: String },
    Inst { ty: Ty, id: InstId },
    /// A function handle. Only valid as a call target.
    Func(FuncId),
}

impl Value {
    /// Runtime type, or `None` for function handles.
    pub fn ty(&self) -> Option<Ty> {
        match self {
            Value::Const { ty, .. } | Value::Param { ty, .. } | Value::Inst { ty, .. } => Some(*ty),
            Value::Func(_) => None,
        }
    }

    pub fn as_func(&self) -> Option<FuncId> {
        match self {
            Value::Func(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Binary {
        id: InstId,
        op: BinaryOp,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    },
    ICmpEq {
        id: InstId,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    },
    Zext {
        id: InstId,
        value: Value,
        to: Ty,
    },
    Call {
        id: InstId,
        func: FuncId,
        ret: Ty,
        args: Vec<Value>,
    },
}

impl Inst {
    pub fn id(&self) -> InstId {
        match self {
            Inst::Binary { id, .. }
            | Inst::ICmpEq { id, .. }
            | Inst::Zext { id, .. }
            | Inst::Call { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Ret(Value),
    CondBr {
        cond: Value,
        then: BlockId,
        otherwise: BlockId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    /// Exported under its own name.
    Entry(String),
    /// Module-private, rendered as `@N`.
    Private(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub linkage: Linkage,
    pub params: Vec<Param>,
    pub ret: Ty,
    pub blocks: Vec<Block>,
    next_inst: usize,
}

impl Function {
    pub fn new(linkage: Linkage, params: Vec<Param>, ret: Ty) -> Self {
        Function {
            linkage,
            params,
            ret,
            blocks: Vec::new(),
            next_inst: 0,
        }
    }

    pub fn symbol(&self) -> String {
        match &self.linkage {
            Linkage::Entry(name) => format!("@{}", quote_name(name)),
            Linkage::Private(id) => format!("@{id}"),
        }
    }

    pub fn param_value(&self, index: usize) -> Option<Value> {
        self.params.get(index).map(|param| Value::Param {
            ty: param.ty,
            name: param.name.clone(),
        })
    }

    pub fn add_block(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        BlockId(self.blocks.len() - 1)
    }

    fn fresh(&mut self) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst += 1;
        id
    }

    fn block_mut(&mut self, block: BlockId) -> Result<&mut Block, CoreError> {
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(block.0)
            .ok_or_else(|| CoreError::InvalidIr(format!("block {} out of {count}", block.0)))?;
        if block.terminator.is_some() {
            return Err(CoreError::InvalidIr(
                "instruction appended after terminator".to_string(),
            ));
        }
        Ok(block)
    }

    pub fn binary(
        &mut self,
        block: BlockId,
        op: BinaryOp,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, CoreError> {
        let id = self.fresh();
        self.block_mut(block)?.insts.push(Inst::Binary {
            id,
            op,
            ty,
            lhs,
            rhs,
        });
        Ok(Value::Inst { ty, id })
    }

    pub fn icmp_eq(
        &mut self,
        block: BlockId,
        ty: Ty,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, CoreError> {
        let id = self.fresh();
        self.block_mut(block)?
            .insts
            .push(Inst::ICmpEq { id, ty, lhs, rhs });
        Ok(Value::Inst { ty: Ty::Bool, id })
    }

    pub fn zext(&mut self, block: BlockId, value: Value, to: Ty) -> Result<Value, CoreError> {
        let id = self.fresh();
        self.block_mut(block)?
            .insts
            .push(Inst::Zext { id, value, to });
        Ok(Value::Inst { ty: to, id })
    }

    pub fn call(
        &mut self,
        block: BlockId,
        func: FuncId,
        ret: Ty,
        args: Vec<Value>,
    ) -> Result<Value, CoreError> {
        let id = self.fresh();
        self.block_mut(block)?.insts.push(Inst::Call {
            id,
            func,
            ret,
            args,
        });
        Ok(Value::Inst { ty: ret, id })
    }

    pub fn terminate(&mut self, block: BlockId, terminator: Terminator) -> Result<(), CoreError> {
        self.block_mut(block)?.terminator = Some(terminator);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub functions: Vec<Function>,
    private_count: usize,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn add_entry(&mut self, name: impl Into<String>, ret: Ty) -> FuncId {
        self.push(Function::new(Linkage::Entry(name.into()), Vec::new(), ret))
    }

    /// Private functions are numbered in creation order from 0.
    pub fn add_private(&mut self, params: Vec<Param>, ret: Ty) -> FuncId {
        let id = self.private_count;
        self.private_count += 1;
        self.push(Function::new(Linkage::Private(id), params, ret))
    }

    fn push(&mut self, function: Function) -> FuncId {
        self.functions.push(function);
        FuncId(self.functions.len() - 1)
    }

    pub fn function(&self, id: FuncId) -> Result<&Function, CoreError> {
        self.functions
            .get(id.0)
            .ok_or_else(|| CoreError::InvalidIr(format!("unknown function #{}", id.0)))
    }

    pub fn function_mut(&mut self, id: FuncId) -> Result<&mut Function, CoreError> {
        self.functions
            .get_mut(id.0)
            .ok_or_else(|| CoreError::InvalidIr(format!("unknown function #{}", id.0)))
    }

    /// Every block of every function must end in a terminator, and every
    /// call must name a function that exists.
    pub fn verify(&self) -> Result<(), CoreError> {
        for function in &self.functions {
            if function.blocks.is_empty() {
                return Err(CoreError::InvalidIr(format!(
                    "function {} has no blocks",
                    function.symbol()
                )));
            }
            for (index, block) in function.blocks.iter().enumerate() {
                match &block.terminator {
                    None => {
                        return Err(CoreError::InvalidIr(format!(
                            "block {index} of function {} has no terminator",
                            function.symbol()
                        )));
                    }
                    Some(Terminator::CondBr {
                        then, otherwise, ..
                    }) if then.0 >= function.blocks.len()
                        || otherwise.0 >= function.blocks.len() =>
                    {
                        return Err(CoreError::InvalidIr(format!(
                            "block {index} of function {} branches to a missing block",
                            function.symbol()
                        )));
                    }
                    Some(_) => {}
                }
                for inst in &block.insts {
                    if let Inst::Call { func, .. } = inst {
                        self.function(*func)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn render(&self) -> Result<String, CoreError> {
        self.verify()?;
        let mut out = String::new();
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            self.render_function(function, &mut out)
                .map_err(|err| CoreError::InvalidIr(err.to_string()))?;
        }
        Ok(out)
    }

    fn render_function(&self, function: &Function, out: &mut String) -> fmt::Result {
        let mut counter = 0usize;
        let mut labels = Vec::with_capacity(function.blocks.len());
        let mut names: HashMap<InstId, usize> = HashMap::new();
        for block in &function.blocks {
            labels.push(counter);
            counter += 1;
            for inst in &block.insts {
                names.insert(inst.id(), counter);
                counter += 1;
            }
        }
        let slot = |value: &Value| -> String {
            match value {
                Value::Const { value, .. } => value.to_string(),
                Value::Param { name, .. } => format!("%{}", quote_name(name)),
                Value::Inst { id, .. } => match names.get(id) {
                    Some(n) => format!("%{n}"),
                    None => "undef".to_string(),
                },
                Value::Func(id) => self
                    .functions
                    .get(id.0)
                    .map(Function::symbol)
                    .unwrap_or_else(|| "undef".to_string()),
            }
        };
        let typed = |value: &Value| -> String {
            match value.ty() {
                Some(ty) => format!("{ty} {}", slot(value)),
                None => format!("ptr {}", slot(value)),
            }
        };

        let private = matches!(function.linkage, Linkage::Private(_));
        write!(
            out,
            "define {}{} {}(",
            if private { "private " } else { "" },
            function.ret,
            function.symbol()
        )?;
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write!(out, "{} %{}", param.ty, quote_name(&param.name))?;
        }
        out.push_str(") {\n");

        for (index, block) in function.blocks.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            writeln!(out, "{}:", labels[index])?;
            for inst in &block.insts {
                let name = names.get(&inst.id()).copied().unwrap_or_default();
                match inst {
                    Inst::Binary {
                        op, ty, lhs, rhs, ..
                    } => writeln!(
                        out,
                        "\t%{name} = {} {ty} {}, {}",
                        op.mnemonic(),
                        slot(lhs),
                        slot(rhs)
                    )?,
                    Inst::ICmpEq { ty, lhs, rhs, .. } => writeln!(
                        out,
                        "\t%{name} = icmp eq {ty} {}, {}",
                        slot(lhs),
                        slot(rhs)
                    )?,
                    Inst::Zext { value, to, .. } => {
                        writeln!(out, "\t%{name} = zext {} to {to}", typed(value))?
                    }
                    Inst::Call {
                        func, ret, args, ..
                    } => {
                        let callee = self
                            .functions
                            .get(func.0)
                            .map(Function::symbol)
                            .unwrap_or_default();
                        let args: Vec<String> = args.iter().map(&typed).collect();
                        writeln!(
                            out,
                            "\t%{name} = call {ret} {callee}({})",
                            args.join(", ")
                        )?
                    }
                }
            }
            match &block.terminator {
                Some(Terminator::Ret(value)) => writeln!(out, "\tret {}", typed(value))?,
                Some(Terminator::CondBr {
                    cond,
                    then,
                    otherwise,
                }) => writeln!(
                    out,
                    "\tbr {}, label %{}, label %{}",
                    typed(cond),
                    labels[then.0],
                    labels[otherwise.0]
                )?,
                None => return Err(fmt::Error),
            }
        }
        out.push_str("}\n");
        Ok(())
    }
}

/// Quote an LLVM identifier unless it only uses `[A-Za-z0-9._-]` and
/// does not start with a digit.
fn quote_name(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if plain {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}
