// Copyright (c) 2025 knix
// All rights reserved.

use ecow::EcoString;
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::error::{ErrorKind, GenericResult};
use crate::module::Definitions;
use crate::ops::{AllocSite, BinaryOp, OpKind, Operation};
use crate::pool::Pool;
use crate::types::{GenericTypeRef, TemplateId, TypeExpr};
use crate::value::{BlockRef, LocalValue, Value, ValueId, ValueOrigin, ValueSlot};
use crate::{SV4, SV8, fail, nz_u32_id};

nz_u32_id!(GenericFunctionId);
nz_u32_id!(BlockId);
nz_u32_id!(OpId);

#[derive(Debug)]
pub struct Block {
    pub name: EcoString,
    pub(crate) ops: Vec<OpId>,
    pub(crate) terminated: bool,
}

impl Block {
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }
}

/// Handle to a recorded `switch`; cases may be added until the function is instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchHandle {
    func: GenericFunctionId,
    op: OpId,
}

/// Handle to a recorded `indirectbr`; destinations may be added until instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectBrHandle {
    func: GenericFunctionId,
    op: OpId,
}

#[derive(Debug)]
pub struct GenericFunction<'ctx> {
    pub id: GenericFunctionId,
    pub name: EcoString,
    pub templates: SV4<TemplateId>,
    pub(crate) params: Vec<TypeExpr<'ctx>>,
    pub(crate) param_values: SV8<ValueId>,
    pub(crate) params_set: bool,
    pub(crate) return_type: Option<TypeExpr<'ctx>>,
    pub(crate) return_type_set: bool,
    pub(crate) blocks: Pool<Block, BlockId>,
    pub(crate) ops: Pool<Operation<'ctx>, OpId>,
    pub(crate) values: Pool<ValueSlot, ValueId>,
    pub(crate) current_block: Option<BlockId>,
}

impl<'ctx> GenericFunction<'ctx> {
    pub(crate) fn make(
        id: GenericFunctionId,
        name: EcoString,
        templates: SV4<TemplateId>,
    ) -> GenericFunction<'ctx> {
        GenericFunction {
            id,
            name,
            templates,
            params: Vec::new(),
            param_values: SV8::new(),
            params_set: false,
            return_type: None,
            return_type_set: false,
            blocks: Pool::new("blocks"),
            ops: Pool::new("ops"),
            values: Pool::new("values"),
            current_block: None,
        }
    }

    pub fn params(&self) -> &[TypeExpr<'ctx>] {
        &self.params
    }

    pub fn return_type(&self) -> Option<&TypeExpr<'ctx>> {
        self.return_type.as_ref()
    }

    pub fn param(&self, index: usize) -> Option<Value<'ctx>> {
        self.param_values
            .get(index)
            .map(|id| Value::Local(LocalValue { func: self.id, id: *id }))
    }

    pub fn block(&self, block: BlockRef) -> Option<&Block> {
        if block.func != self.id {
            return None;
        }
        self.blocks.get_checked(block.block)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockRef, &Block)> {
        self.blocks.iter_with_ids().map(|(id, b)| (BlockRef { func: self.id, block: id }, b))
    }

    pub fn value_name(&self, value: LocalValue) -> Option<&str> {
        if value.func != self.id {
            return None;
        }
        self.values.get_checked(value.id).map(|slot| slot.name.as_str())
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn operation(&self, id: OpId) -> &Operation<'ctx> {
        self.ops.get(id)
    }

    pub(crate) fn first_open_block(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| !b.terminated)
    }
}

/// Records operations into one generic function. Nothing touches LLVM here.
pub struct FunctionBuilder<'b, 'ctx> {
    pub(crate) defs: &'b mut Definitions<'ctx>,
    pub(crate) func: GenericFunctionId,
}

impl<'b, 'ctx> FunctionBuilder<'b, 'ctx> {
    pub fn id(&self) -> GenericFunctionId {
        self.func
    }

    fn function(&self) -> &GenericFunction<'ctx> {
        self.defs.functions.get(self.func)
    }

    fn function_mut(&mut self) -> &mut GenericFunction<'ctx> {
        self.defs.functions.get_mut(self.func)
    }

    pub fn template(&self, name: &str) -> GenericResult<TemplateId> {
        self.defs.template(self.func.into(), name)
    }

    /// Declares the parameter types; one deferred value is created per parameter.
    pub fn set_parameters(&mut self, params: Vec<TypeExpr<'ctx>>) -> GenericResult<()> {
        let func = self.function_mut();
        if func.params_set {
            return fail!(
                ErrorKind::ParametersAlreadySet,
                "parameters of '{}' are already set",
                func.name
            );
        }
        for index in 0..params.len() {
            let id = func
                .values
                .add(ValueSlot { name: "".into(), origin: ValueOrigin::Param(index as u32) });
            func.param_values.push(id);
        }
        func.params = params;
        func.params_set = true;
        Ok(())
    }

    /// `None` is void. Set at most once, before the first block is added.
    pub fn set_return_type(&mut self, return_type: Option<TypeExpr<'ctx>>) -> GenericResult<()> {
        let func = self.function_mut();
        if func.return_type_set {
            return fail!(
                ErrorKind::ReturnTypeAlreadySet,
                "return type of '{}' is already set",
                func.name
            );
        }
        if !func.blocks.is_empty() {
            return fail!(
                ErrorKind::ReturnTypeAlreadySet,
                "return type of '{}' must be set before its blocks are added",
                func.name
            );
        }
        func.return_type = return_type;
        func.return_type_set = true;
        Ok(())
    }

    pub fn param(&self, index: usize) -> Option<Value<'ctx>> {
        self.function().param(index)
    }

    pub fn add_block(&mut self, name: &str) -> BlockRef {
        let func = self.function_mut();
        let block = func.blocks.add(Block { name: name.into(), ops: Vec::new(), terminated: false });
        BlockRef { func: func.id, block }
    }

    pub fn position_at_end(&mut self, block: BlockRef) -> GenericResult<()> {
        let block = self.local_block(block)?;
        self.function_mut().current_block = Some(block);
        Ok(())
    }

    pub fn current_block(&self) -> Option<BlockRef> {
        let func = self.function();
        func.current_block.map(|block| BlockRef { func: func.id, block })
    }

    fn local_block(&self, block: BlockRef) -> GenericResult<BlockId> {
        let func = self.function();
        if block.func != func.id || func.blocks.get_checked(block.block).is_none() {
            return fail!(
                ErrorKind::ForeignBlock,
                "block does not belong to '{}'",
                func.name
            );
        }
        Ok(block.block)
    }

    fn check_value(&self, value: &Value<'ctx>) -> GenericResult<()> {
        let func = self.function();
        match value {
            Value::Const(_) => Ok(()),
            Value::Local(local) => {
                if local.func != func.id || func.values.get_checked(local.id).is_none() {
                    return fail!(
                        ErrorKind::ForeignValue,
                        "value does not belong to '{}'",
                        func.name
                    );
                }
                Ok(())
            }
            Value::BlockAddress(block) => self.local_block(*block).map(|_| ()),
        }
    }

    fn append(
        &mut self,
        kind: OpKind<'ctx>,
        result_name: Option<&str>,
    ) -> GenericResult<(OpId, Option<Value<'ctx>>)> {
        let func = self.function();
        let Some(block_id) = func.current_block else {
            return fail!(
                ErrorKind::NoCurrentBlock,
                "no current block selected in '{}' for '{}'",
                func.name,
                kind.mnemonic()
            );
        };
        let block = func.blocks.get(block_id);
        if block.terminated {
            return fail!(
                ErrorKind::BlockTerminated,
                "block '{}' of '{}' is already terminated; cannot append '{}'",
                block.name,
                func.name,
                kind.mnemonic()
            );
        }
        for operand in kind.operands() {
            self.check_value(&operand)?;
        }

        let func = self.function_mut();
        let is_terminator = kind.is_terminator();
        let op_id = func.ops.next_id();
        let result = result_name.map(|name| {
            func.values.add(ValueSlot { name: name.into(), origin: ValueOrigin::Op(op_id) })
        });
        func.ops.add(Operation { kind, result });
        let block = func.blocks.get_mut(block_id);
        block.ops.push(op_id);
        if is_terminator {
            block.terminated = true;
        }
        Ok((op_id, result.map(|id| Value::Local(LocalValue { func: func.id, id }))))
    }

    fn append_value(&mut self, kind: OpKind<'ctx>, name: &str) -> GenericResult<Value<'ctx>> {
        let (_, result) = self.append(kind, Some(name))?;
        let Some(value) = result else { unreachable!("operation with a result name has no result") };
        Ok(value)
    }

    fn append_void(&mut self, kind: OpKind<'ctx>) -> GenericResult<()> {
        self.append(kind, None).map(|_| ())
    }

    // ===== Arithmetic / bitwise =====

    pub fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Binary { op, lhs, rhs }, name)
    }

    pub fn build_add(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Add, lhs, rhs, name)
    }

    pub fn build_fadd(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::FAdd, lhs, rhs, name)
    }

    pub fn build_nsw_add(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NswAdd, lhs, rhs, name)
    }

    pub fn build_nuw_add(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NuwAdd, lhs, rhs, name)
    }

    pub fn build_sub(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Sub, lhs, rhs, name)
    }

    pub fn build_fsub(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::FSub, lhs, rhs, name)
    }

    pub fn build_nsw_sub(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NswSub, lhs, rhs, name)
    }

    pub fn build_nuw_sub(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NuwSub, lhs, rhs, name)
    }

    pub fn build_mul(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Mul, lhs, rhs, name)
    }

    pub fn build_fmul(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::FMul, lhs, rhs, name)
    }

    pub fn build_nsw_mul(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NswMul, lhs, rhs, name)
    }

    pub fn build_nuw_mul(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::NuwMul, lhs, rhs, name)
    }

    pub fn build_sdiv(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::SDiv, lhs, rhs, name)
    }

    pub fn build_udiv(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::UDiv, lhs, rhs, name)
    }

    pub fn build_exact_sdiv(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::ExactSDiv, lhs, rhs, name)
    }

    pub fn build_fdiv(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::FDiv, lhs, rhs, name)
    }

    pub fn build_srem(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::SRem, lhs, rhs, name)
    }

    pub fn build_urem(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::URem, lhs, rhs, name)
    }

    pub fn build_frem(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::FRem, lhs, rhs, name)
    }

    pub fn build_and(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::And, lhs, rhs, name)
    }

    pub fn build_or(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Or, lhs, rhs, name)
    }

    pub fn build_xor(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Xor, lhs, rhs, name)
    }

    pub fn build_shl(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::Shl, lhs, rhs, name)
    }

    pub fn build_lshr(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::LShr, lhs, rhs, name)
    }

    pub fn build_ashr(
        &mut self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.build_binary(BinaryOp::AShr, lhs, rhs, name)
    }

    /// Bitwise not, emitted as `xor` against all-ones of the operand's type
    pub fn build_not(&mut self, value: Value<'ctx>, name: &str) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Not { value }, name)
    }

    pub fn build_icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::ICmp { predicate, lhs, rhs }, name)
    }

    pub fn build_fcmp(
        &mut self,
        predicate: FloatPredicate,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::FCmp { predicate, lhs, rhs }, name)
    }

    // ===== Memory =====

    pub fn build_alloca(&mut self, ty: TypeExpr<'ctx>, name: &str) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Alloc { site: AllocSite::Stack, ty, count: None }, name)
    }

    pub fn build_array_alloca(
        &mut self,
        ty: TypeExpr<'ctx>,
        count: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Alloc { site: AllocSite::Stack, ty, count: Some(count) }, name)
    }

    pub fn build_malloc(&mut self, ty: TypeExpr<'ctx>, name: &str) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Alloc { site: AllocSite::Heap, ty, count: None }, name)
    }

    pub fn build_array_malloc(
        &mut self,
        ty: TypeExpr<'ctx>,
        count: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Alloc { site: AllocSite::Heap, ty, count: Some(count) }, name)
    }

    pub fn build_free(&mut self, pointer: Value<'ctx>) -> GenericResult<()> {
        self.append_void(OpKind::Free { pointer })
    }

    pub fn build_load(
        &mut self,
        ty: TypeExpr<'ctx>,
        pointer: Value<'ctx>,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Load { ty, pointer }, name)
    }

    pub fn build_store(&mut self, value: Value<'ctx>, pointer: Value<'ctx>) -> GenericResult<()> {
        self.append_void(OpKind::Store { value, pointer })
    }

    pub fn build_gep(
        &mut self,
        ty: TypeExpr<'ctx>,
        pointer: Value<'ctx>,
        indices: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        let indices = SV4::from_slice(indices);
        self.append_value(OpKind::Gep { ty, pointer, indices, in_bounds: false }, name)
    }

    pub fn build_in_bounds_gep(
        &mut self,
        ty: TypeExpr<'ctx>,
        pointer: Value<'ctx>,
        indices: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        let indices = SV4::from_slice(indices);
        self.append_value(OpKind::Gep { ty, pointer, indices, in_bounds: true }, name)
    }

    pub fn build_struct_gep(
        &mut self,
        ty: TypeExpr<'ctx>,
        pointer: Value<'ctx>,
        index: u32,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::StructGep { ty, pointer, index }, name)
    }

    // ===== Generic static storage =====

    fn check_static(&self, owner: &GenericTypeRef<'ctx>, var: &str) -> GenericResult<()> {
        let owner_defn = self.defs.type_defn(owner.generic)?;
        if owner_defn.static_variable(var).is_none() {
            return fail!(
                ErrorKind::UnknownStatic,
                "'{}' declares no static variable '{}'",
                owner_defn.name,
                var
            );
        }
        Ok(())
    }

    pub fn build_static_load(
        &mut self,
        owner: GenericTypeRef<'ctx>,
        var: &str,
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.check_static(&owner, var)?;
        self.append_value(OpKind::StaticLoad { owner, var: var.into() }, name)
    }

    pub fn build_static_store(
        &mut self,
        owner: GenericTypeRef<'ctx>,
        var: &str,
        value: Value<'ctx>,
    ) -> GenericResult<()> {
        self.check_static(&owner, var)?;
        self.append_void(OpKind::StaticStore { owner, var: var.into(), value })
    }

    // ===== Calls =====

    /// Call to an already concrete LLVM function
    pub fn build_call(
        &mut self,
        function: FunctionValue<'ctx>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        self.append_value(OpKind::Call { function, args: SV8::from_slice(args) }, name)
    }

    /// Call to another generic function; `type_args` bind the callee's templates in order and
    /// are resolved against the caller's substitution at instantiation time.
    pub fn build_generic_call(
        &mut self,
        callee: GenericFunctionId,
        type_args: Vec<TypeExpr<'ctx>>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        let callee_defn = self.defs.function_defn(callee)?;
        if callee_defn.templates.len() != type_args.len() {
            return fail!(
                ErrorKind::MalformedGeneric,
                "'{}' takes {} type arguments, got {}",
                callee_defn.name,
                callee_defn.templates.len(),
                type_args.len()
            );
        }
        let kind = OpKind::GenericCall {
            callee,
            type_args: type_args.into_iter().collect(),
            args: SV8::from_slice(args),
        };
        self.append_value(kind, name)
    }

    /// Method on `owner` looked up in the type registry when the body is replayed
    pub fn build_virtual_call(
        &mut self,
        owner: TypeExpr<'ctx>,
        method: &str,
        args: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        let kind = OpKind::VirtualCall { owner, method: method.into(), args: SV8::from_slice(args) };
        self.append_value(kind, name)
    }

    pub fn build_virtual_generic_call(
        &mut self,
        owner: TypeExpr<'ctx>,
        method: &str,
        type_args: Vec<TypeExpr<'ctx>>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> GenericResult<Value<'ctx>> {
        let kind = OpKind::VirtualGenericCall {
            owner,
            method: method.into(),
            type_args: type_args.into_iter().collect(),
            args: SV8::from_slice(args),
        };
        self.append_value(kind, name)
    }

    // ===== Control flow =====

    pub fn build_br(&mut self, dest: BlockRef) -> GenericResult<()> {
        let dest = self.local_block(dest)?;
        self.append_void(OpKind::Br { dest })
    }

    pub fn build_cond_br(
        &mut self,
        cond: Value<'ctx>,
        then_block: BlockRef,
        else_block: BlockRef,
    ) -> GenericResult<()> {
        let then_block = self.local_block(then_block)?;
        let else_block = self.local_block(else_block)?;
        self.append_void(OpKind::CondBr { cond, then_block, else_block })
    }

    pub fn build_indirect_br(&mut self, address: Value<'ctx>) -> GenericResult<IndirectBrHandle> {
        let (op, _) = self.append(OpKind::IndirectBr { address, destinations: SV4::new() }, None)?;
        Ok(IndirectBrHandle { func: self.func, op })
    }

    pub fn add_indirect_destination(
        &mut self,
        handle: IndirectBrHandle,
        block: BlockRef,
    ) -> GenericResult<()> {
        let block = self.local_block(block)?;
        if handle.func != self.func {
            return fail!(ErrorKind::ForeignValue, "indirectbr handle belongs to another function");
        }
        let op = self.function_mut().ops.get_mut(handle.op);
        let OpKind::IndirectBr { destinations, .. } = &mut op.kind else {
            unreachable!("IndirectBrHandle points at a non-indirectbr operation")
        };
        destinations.push(block);
        Ok(())
    }

    pub fn build_ret(&mut self, value: Value<'ctx>) -> GenericResult<()> {
        self.append_void(OpKind::Ret { value })
    }

    pub fn build_ret_void(&mut self) -> GenericResult<()> {
        self.append_void(OpKind::RetVoid)
    }

    pub fn build_switch(
        &mut self,
        value: Value<'ctx>,
        default: BlockRef,
    ) -> GenericResult<SwitchHandle> {
        let default = self.local_block(default)?;
        let (op, _) = self.append(OpKind::Switch { value, default, cases: Vec::new() }, None)?;
        Ok(SwitchHandle { func: self.func, op })
    }

    pub fn add_switch_case(
        &mut self,
        handle: SwitchHandle,
        value: Value<'ctx>,
        block: BlockRef,
    ) -> GenericResult<()> {
        let block = self.local_block(block)?;
        let is_const_int = matches!(value, Value::Const(BasicValueEnum::IntValue(i)) if i.is_const());
        if !is_const_int {
            return fail!(
                ErrorKind::NonConstantCase,
                "switch cases in '{}' must be integer constants",
                self.function().name
            );
        }
        if handle.func != self.func {
            return fail!(ErrorKind::ForeignValue, "switch handle belongs to another function");
        }
        let op = self.function_mut().ops.get_mut(handle.op);
        let OpKind::Switch { cases, .. } = &mut op.kind else {
            unreachable!("SwitchHandle points at a non-switch operation")
        };
        cases.push((value, block));
        Ok(())
    }

    pub fn build_unreachable(&mut self) -> GenericResult<()> {
        self.append_void(OpKind::Unreachable)
    }
}
