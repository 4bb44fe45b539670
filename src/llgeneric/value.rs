// Copyright (c) 2025 knix
// All rights reserved.

use ecow::EcoString;
use inkwell::values::{BasicValue, BasicValueEnum};

use crate::function::{BlockId, GenericFunctionId, OpId};
use crate::nz_u32_id;

// Indexes a single function's value table; meaningless outside that function
nz_u32_id!(ValueId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalValue {
    pub func: GenericFunctionId,
    pub id: ValueId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub func: GenericFunctionId,
    pub block: BlockId,
}

/// An operand inside a generic function body.
///
/// Nothing here is materialized until the owning operation is replayed; `Const` and
/// `BlockAddress` are the exception and resolve without consulting the value map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'ctx> {
    Const(BasicValueEnum<'ctx>),
    Local(LocalValue),
    BlockAddress(BlockRef),
}

impl<'ctx> Value<'ctx> {
    pub fn constant(value: impl BasicValue<'ctx>) -> Value<'ctx> {
        Value::Const(value.as_basic_value_enum())
    }

    pub fn block_address(block: BlockRef) -> Value<'ctx> {
        Value::BlockAddress(block)
    }

    pub fn as_local(&self) -> Option<LocalValue> {
        match self {
            Value::Local(local) => Some(*local),
            _ => None,
        }
    }
}

impl<'ctx> From<BasicValueEnum<'ctx>> for Value<'ctx> {
    fn from(value: BasicValueEnum<'ctx>) -> Self {
        Value::Const(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    Param(u32),
    Op(OpId),
}

impl std::fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueOrigin::Param(index) => write!(f, "parameter {}", index),
            ValueOrigin::Op(op) => write!(f, "result of op {}", op),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueSlot {
    pub name: EcoString,
    pub origin: ValueOrigin,
}
