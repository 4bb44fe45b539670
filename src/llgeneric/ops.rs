// Copyright (c) 2025 knix
// All rights reserved.

use ecow::EcoString;
use inkwell::values::FunctionValue;
use inkwell::{FloatPredicate, IntPredicate};

use crate::function::{BlockId, GenericFunctionId};
use crate::types::{GenericTypeRef, TypeExpr};
use crate::value::{Value, ValueId};
use crate::{SV4, SV8};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Add/Sub
    Add,
    FAdd,
    NswAdd,
    NuwAdd,
    Sub,
    FSub,
    NswSub,
    NuwSub,

    // Mul/Div/Rem
    Mul,
    FMul,
    NswMul,
    NuwMul,
    SDiv,
    UDiv,
    /// Promises the division is exact; a remainder is UB
    ExactSDiv,
    FDiv,
    SRem,
    URem,
    FRem,

    // Bitwise
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinaryOp {
    pub fn is_float(&self) -> bool {
        match self {
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem => {
                true
            }
            _ => false,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::FAdd => "fadd",
            BinaryOp::NswAdd => "add nsw",
            BinaryOp::NuwAdd => "add nuw",
            BinaryOp::Sub => "sub",
            BinaryOp::FSub => "fsub",
            BinaryOp::NswSub => "sub nsw",
            BinaryOp::NuwSub => "sub nuw",
            BinaryOp::Mul => "mul",
            BinaryOp::FMul => "fmul",
            BinaryOp::NswMul => "mul nsw",
            BinaryOp::NuwMul => "mul nuw",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::ExactSDiv => "sdiv exact",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::FRem => "frem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocSite {
    Stack,
    Heap,
}

#[derive(Debug, Clone)]
pub enum OpKind<'ctx> {
    Binary { op: BinaryOp, lhs: Value<'ctx>, rhs: Value<'ctx> },
    Not { value: Value<'ctx> },
    ICmp { predicate: IntPredicate, lhs: Value<'ctx>, rhs: Value<'ctx> },
    FCmp { predicate: FloatPredicate, lhs: Value<'ctx>, rhs: Value<'ctx> },

    Alloc { site: AllocSite, ty: TypeExpr<'ctx>, count: Option<Value<'ctx>> },
    Free { pointer: Value<'ctx> },
    Load { ty: TypeExpr<'ctx>, pointer: Value<'ctx> },
    Store { value: Value<'ctx>, pointer: Value<'ctx> },
    Gep { ty: TypeExpr<'ctx>, pointer: Value<'ctx>, indices: SV4<Value<'ctx>>, in_bounds: bool },
    StructGep { ty: TypeExpr<'ctx>, pointer: Value<'ctx>, index: u32 },

    StaticLoad { owner: GenericTypeRef<'ctx>, var: EcoString },
    StaticStore { owner: GenericTypeRef<'ctx>, var: EcoString, value: Value<'ctx> },

    Call { function: FunctionValue<'ctx>, args: SV8<Value<'ctx>> },
    GenericCall { callee: GenericFunctionId, type_args: SV4<TypeExpr<'ctx>>, args: SV8<Value<'ctx>> },
    VirtualCall { owner: TypeExpr<'ctx>, method: EcoString, args: SV8<Value<'ctx>> },
    VirtualGenericCall {
        owner: TypeExpr<'ctx>,
        method: EcoString,
        type_args: SV4<TypeExpr<'ctx>>,
        args: SV8<Value<'ctx>>,
    },

    Br { dest: BlockId },
    CondBr { cond: Value<'ctx>, then_block: BlockId, else_block: BlockId },
    IndirectBr { address: Value<'ctx>, destinations: SV4<BlockId> },
    Ret { value: Value<'ctx> },
    RetVoid,
    Switch { value: Value<'ctx>, default: BlockId, cases: Vec<(Value<'ctx>, BlockId)> },
    Unreachable,
}

impl<'ctx> OpKind<'ctx> {
    pub fn is_terminator(&self) -> bool {
        match self {
            OpKind::Br { .. }
            | OpKind::CondBr { .. }
            | OpKind::IndirectBr { .. }
            | OpKind::Ret { .. }
            | OpKind::RetVoid
            | OpKind::Switch { .. }
            | OpKind::Unreachable => true,
            _ => false,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpKind::Binary { op, .. } => op.mnemonic(),
            OpKind::Not { .. } => "not",
            OpKind::ICmp { .. } => "icmp",
            OpKind::FCmp { .. } => "fcmp",
            OpKind::Alloc { site: AllocSite::Stack, count: None, .. } => "alloca",
            OpKind::Alloc { site: AllocSite::Stack, count: Some(_), .. } => "array_alloca",
            OpKind::Alloc { site: AllocSite::Heap, count: None, .. } => "malloc",
            OpKind::Alloc { site: AllocSite::Heap, count: Some(_), .. } => "array_malloc",
            OpKind::Free { .. } => "free",
            OpKind::Load { .. } => "load",
            OpKind::Store { .. } => "store",
            OpKind::Gep { in_bounds: false, .. } => "gep",
            OpKind::Gep { in_bounds: true, .. } => "gep inbounds",
            OpKind::StructGep { .. } => "struct_gep",
            OpKind::StaticLoad { .. } => "static_load",
            OpKind::StaticStore { .. } => "static_store",
            OpKind::Call { .. } => "call",
            OpKind::GenericCall { .. } => "generic_call",
            OpKind::VirtualCall { .. } => "virtual_call",
            OpKind::VirtualGenericCall { .. } => "virtual_generic_call",
            OpKind::Br { .. } => "br",
            OpKind::CondBr { .. } => "cond_br",
            OpKind::IndirectBr { .. } => "indirectbr",
            OpKind::Ret { .. } => "ret",
            OpKind::RetVoid => "ret void",
            OpKind::Switch { .. } => "switch",
            OpKind::Unreachable => "unreachable",
        }
    }

    /// Every value operand, in no particular order
    pub fn operands(&self) -> SV8<Value<'ctx>> {
        let mut out = SV8::new();
        match self {
            OpKind::Binary { lhs, rhs, .. }
            | OpKind::ICmp { lhs, rhs, .. }
            | OpKind::FCmp { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            OpKind::Not { value } | OpKind::Ret { value } | OpKind::StaticStore { value, .. } => {
                out.push(*value)
            }
            OpKind::Alloc { count, .. } => out.extend(count.iter().copied()),
            OpKind::Free { pointer } | OpKind::Load { pointer, .. } => out.push(*pointer),
            OpKind::StructGep { pointer, .. } => out.push(*pointer),
            OpKind::Store { value, pointer } => {
                out.push(*value);
                out.push(*pointer);
            }
            OpKind::Gep { pointer, indices, .. } => {
                out.push(*pointer);
                out.extend(indices.iter().copied());
            }
            OpKind::Call { args, .. }
            | OpKind::GenericCall { args, .. }
            | OpKind::VirtualCall { args, .. }
            | OpKind::VirtualGenericCall { args, .. } => out.extend(args.iter().copied()),
            OpKind::CondBr { cond, .. } => out.push(*cond),
            OpKind::IndirectBr { address, .. } => out.push(*address),
            OpKind::Switch { value, cases, .. } => {
                out.push(*value);
                out.extend(cases.iter().map(|(v, _)| *v));
            }
            OpKind::StaticLoad { .. } | OpKind::Br { .. } | OpKind::RetVoid | OpKind::Unreachable => {}
        }
        out
    }
}

/// One recorded instruction. `result` indexes the owning function's value table.
#[derive(Debug, Clone)]
pub struct Operation<'ctx> {
    pub kind: OpKind<'ctx>,
    pub result: Option<ValueId>,
}
