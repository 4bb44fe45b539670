// Copyright (c) 2025 knix
// All rights reserved.

use ahash::HashMapExt;
use ecow::EcoString;
use fxhash::FxHashMap;
use inkwell::AddressSpace;
use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module as LlvmModule;
use inkwell::types::{
    AnyType, AsTypeRef, BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType,
};
use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FloatValue, FunctionValue, GlobalValue, IntValue,
    PointerValue, ValueKind,
};
use llvm_sys::prelude::LLVMTypeRef;
use log::{debug, trace};

use crate::error::{ErrorKind, GenericResult};
use crate::function::{BlockId, GenericFunction, GenericFunctionId};
use crate::generic_type::TypeCache;
use crate::mangle::Mangler;
use crate::module::{Definitions, GenericModuleConfig, InstantiationStats};
use crate::ops::{AllocSite, BinaryOp, OpKind, Operation};
use crate::registry::{InstanceFunc, TypeRegistry};
use crate::types::{GenericTypeRef, Substitution, TemplateId, TypeExpr};
use crate::value::{LocalValue, Value};
use crate::{SV4, SV8, fail};

/// A generic function plus its concrete template arguments, in declaration order
pub(crate) type FunctionKey = (GenericFunctionId, SV4<Option<LLVMTypeRef>>);

/// Everything the module remembers across instantiation passes
#[derive(Debug, Default)]
pub(crate) struct Caches<'ctx> {
    pub types: TypeCache<'ctx>,
    /// Most recent concrete function per binding; consulted by generic calls only
    pub functions: FxHashMap<FunctionKey, FunctionValue<'ctx>>,
    /// Every write to `functions` with the entry it replaced, so a failed replay can be undone
    pub function_journal: Vec<(FunctionKey, Option<FunctionValue<'ctx>>)>,
    pub stats: InstantiationStats,
}

impl<'ctx> Caches<'ctx> {
    fn record_function(&mut self, key: FunctionKey, function: FunctionValue<'ctx>) {
        let previous = self.functions.insert(key.clone(), function);
        self.function_journal.push((key, previous));
    }

    /// Forgets every function cached since `mark`, restoring what they replaced
    fn unwind_functions(&mut self, mark: usize) {
        for (key, previous) in self.function_journal.drain(mark..).rev() {
            match previous {
                Some(function) => {
                    self.functions.insert(key, function);
                }
                None => {
                    self.functions.remove(&key);
                }
            }
        }
    }
}

fn function_key<'ctx>(
    func: &GenericFunction<'ctx>,
    substitution: &Substitution<'ctx>,
) -> FunctionKey {
    let args = func.templates.iter().map(|t| substitution.get(t).map(|c| c.as_type_ref())).collect();
    (func.id, args)
}

/// Transient state for replaying one generic function into one concrete function.
pub(crate) struct InstantiationContext<'s, 'ctx> {
    func: &'s GenericFunction<'ctx>,
    substitution: &'s Substitution<'ctx>,
    values: Vec<Option<BasicValueEnum<'ctx>>>,
    blocks: Vec<BasicBlock<'ctx>>,
}

impl<'s, 'ctx> InstantiationContext<'s, 'ctx> {
    fn new(
        func: &'s GenericFunction<'ctx>,
        substitution: &'s Substitution<'ctx>,
    ) -> InstantiationContext<'s, 'ctx> {
        InstantiationContext {
            func,
            substitution,
            values: vec![None; func.values.len()],
            blocks: Vec::with_capacity(func.blocks.len()),
        }
    }

    fn value(&self, value: &Value<'ctx>) -> GenericResult<BasicValueEnum<'ctx>> {
        match value {
            Value::Const(c) => Ok(*c),
            Value::Local(local) => self.local(*local),
            Value::BlockAddress(block_ref) => {
                if block_ref.func != self.func.id {
                    return fail!(ErrorKind::UnresolvedValue, "block address from another function");
                }
                let block = self.block(block_ref.block)?;
                // Safety: the block is attached to the function being emitted
                match unsafe { block.get_address() } {
                    Some(address) => Ok(address.into()),
                    None => fail!(ErrorKind::WrongKind, "the entry block has no address"),
                }
            }
        }
    }

    fn local(&self, local: LocalValue) -> GenericResult<BasicValueEnum<'ctx>> {
        if local.func != self.func.id {
            return fail!(
                ErrorKind::UnresolvedValue,
                "value %{} belongs to a different function",
                local.id
            );
        }
        match self.values.get(local.id.index()).copied().flatten() {
            Some(v) => Ok(v),
            None => {
                let origin = match self.func.values.get_checked(local.id) {
                    Some(slot) => slot.origin.to_string(),
                    None => "unknown origin".to_string(),
                };
                fail!(
                    ErrorKind::UnresolvedValue,
                    "value %{} ({}) is used before it is defined",
                    local.id,
                    origin
                )
            }
        }
    }

    fn block(&self, block: BlockId) -> GenericResult<BasicBlock<'ctx>> {
        match self.blocks.get(block.index()) {
            Some(bb) => Ok(*bb),
            None => fail!(ErrorKind::ForeignBlock, "block {} has no concrete counterpart", block),
        }
    }

    fn define(&mut self, op: &Operation<'ctx>, value: BasicValueEnum<'ctx>) {
        if let Some(id) = op.result {
            self.values[id.index()] = Some(value);
        }
    }

    fn int(&self, value: &Value<'ctx>, what: &str) -> GenericResult<IntValue<'ctx>> {
        match self.value(value)? {
            BasicValueEnum::IntValue(i) => Ok(i),
            other => fail!(
                ErrorKind::WrongKind,
                "{} expects an integer, got {}",
                what,
                type_name(other.get_type())
            ),
        }
    }

    fn float(&self, value: &Value<'ctx>, what: &str) -> GenericResult<FloatValue<'ctx>> {
        match self.value(value)? {
            BasicValueEnum::FloatValue(f) => Ok(f),
            other => fail!(
                ErrorKind::WrongKind,
                "{} expects a float, got {}",
                what,
                type_name(other.get_type())
            ),
        }
    }

    fn pointer(&self, value: &Value<'ctx>, what: &str) -> GenericResult<PointerValue<'ctx>> {
        match self.value(value)? {
            BasicValueEnum::PointerValue(p) => Ok(p),
            other => fail!(
                ErrorKind::WrongKind,
                "{} expects a pointer, got {}",
                what,
                type_name(other.get_type())
            ),
        }
    }

    fn args(&self, args: &[Value<'ctx>]) -> GenericResult<SV8<BasicMetadataValueEnum<'ctx>>> {
        args.iter().map(|a| self.value(a).map(BasicMetadataValueEnum::from)).collect()
    }
}

fn type_name<'ctx>(t: impl AnyType<'ctx>) -> String {
    t.print_to_string().to_string_lossy().into_owned()
}

pub(crate) struct Signature<'ctx> {
    params: SV8<BasicTypeEnum<'ctx>>,
    fn_type: FunctionType<'ctx>,
    symbol: EcoString,
}

/// Drives LLVM for one top-level instantiate call, including every nested instantiation it
/// triggers. Borrows the definitions immutably so replay never clones the recorded stream.
pub(crate) struct Instantiator<'a, 'ctx> {
    pub ctx: &'ctx Context,
    pub llvm_module: &'a LlvmModule<'ctx>,
    pub builder: &'a Builder<'ctx>,
    pub defs: &'a Definitions<'ctx>,
    pub caches: &'a mut Caches<'ctx>,
    pub mangler: &'a dyn Mangler,
    pub registry: &'a dyn TypeRegistry<'ctx>,
    pub config: &'a GenericModuleConfig,
}

impl<'a, 'ctx> Instantiator<'a, 'ctx> {
    pub(crate) fn resolve_type(
        &mut self,
        expr: &TypeExpr<'ctx>,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<BasicTypeEnum<'ctx>> {
        match expr {
            TypeExpr::Concrete(t) => Ok(*t),
            TypeExpr::Template(template) => match substitution.get(template) {
                Some(t) => Ok(*t),
                None => fail!(
                    ErrorKind::UnboundTemplate,
                    "template '{}' is not bound",
                    self.defs.template_name(*template)
                ),
            },
            TypeExpr::Pointer { pointee, address_space } => {
                // Pointers are opaque, but the pointee still has to resolve: it may be a
                // generic reference that needs materializing
                self.resolve_type(pointee, substitution)?;
                let address_space = AddressSpace::from(*address_space);
                Ok(self.ctx.ptr_type(address_space).as_basic_type_enum())
            }
            TypeExpr::Generic(type_ref) => {
                let instance = self.instantiate_type_ref(type_ref, substitution)?;
                Ok(instance.struct_type.as_basic_type_enum())
            }
        }
    }

    /// Zips `templates` with `type_args`, resolving each argument against `ambient`
    fn compose_substitution(
        &mut self,
        owner_name: &str,
        templates: &[TemplateId],
        type_args: &[TypeExpr<'ctx>],
        ambient: &Substitution<'ctx>,
    ) -> GenericResult<Substitution<'ctx>> {
        if templates.len() != type_args.len() {
            return fail!(
                ErrorKind::MalformedGeneric,
                "'{}' takes {} type arguments, got {}",
                owner_name,
                templates.len(),
                type_args.len()
            );
        }
        let mut composed = Substitution::with_capacity(templates.len());
        for (template, arg) in templates.iter().zip(type_args.iter()) {
            let concrete = self.resolve_type(arg, ambient)?;
            composed.insert(*template, concrete);
        }
        Ok(composed)
    }

    fn signature(
        &mut self,
        func: &GenericFunction<'ctx>,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<Signature<'ctx>> {
        let mut params: SV8<BasicTypeEnum<'ctx>> = SV8::with_capacity(func.params.len());
        for param in &func.params {
            params.push(self.resolve_type(param, substitution)?);
        }
        let metadata_params: SV8<BasicMetadataTypeEnum<'ctx>> =
            params.iter().map(|p| (*p).into()).collect();
        let fn_type = match &func.return_type {
            Some(return_type) => {
                self.resolve_type(return_type, substitution)?.fn_type(&metadata_params, false)
            }
            None => self.ctx.void_type().fn_type(&metadata_params, false),
        };
        let symbol = self.mangler.mangle_func(&func.name, &params).into();
        Ok(Signature { params, fn_type, symbol })
    }

    pub(crate) fn instantiate_function(
        &mut self,
        id: GenericFunctionId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<FunctionValue<'ctx>> {
        let defs = self.defs;
        let func = defs.functions.get(id);
        if let Some(open) = func.first_open_block() {
            return fail!(
                ErrorKind::UnterminatedBlock,
                "block '{}' of '{}' has no terminator",
                open.name,
                func.name
            );
        }

        // 1. Signature and a brand new LLVM function, cached before replay so recursion finds it
        let signature = self.signature(func, substitution)?;
        debug!(
            "instantiating function {} ({} params, {} blocks)",
            signature.symbol,
            signature.params.len(),
            func.blocks.len()
        );
        let function = self.llvm_module.add_function(&signature.symbol, signature.fn_type, None);
        let journal_mark = self.caches.function_journal.len();
        self.caches.record_function(function_key(func, substitution), function);
        self.caches.stats.functions_emitted += 1;

        if let Err(e) = self.emit_body(func, function, substitution, &signature.symbol) {
            debug!("replay of {} failed, uncaching its instances", signature.symbol);
            self.caches.unwind_functions(journal_mark);
            return Err(e);
        }
        Ok(function)
    }

    fn emit_body(
        &mut self,
        func: &GenericFunction<'ctx>,
        function: FunctionValue<'ctx>,
        substitution: &Substitution<'ctx>,
        symbol: &str,
    ) -> GenericResult<()> {
        // 2. Every concrete block exists before any body is emitted, so forward branches resolve
        let mut cx = InstantiationContext::new(func, substitution);
        for block in func.blocks.iter() {
            cx.blocks.push(self.ctx.append_basic_block(function, &block.name));
        }
        for (param_value, param) in func.param_values.iter().zip(function.get_param_iter()) {
            cx.values[param_value.index()] = Some(param);
        }

        // 3. Replay; nested instantiations move the builder, so put it back afterwards
        let builder = self.builder;
        let _restore = scopeguard::guard(builder.get_insert_block(), move |saved| match saved {
            Some(block) => builder.position_at_end(block),
            None => builder.clear_insertion_position(),
        });
        for (block_id, block) in func.blocks.iter_with_ids() {
            builder.position_at_end(cx.block(block_id)?);
            for op_id in &block.ops {
                let op = func.operation(*op_id);
                trace!("{}: replay {} in '{}'", symbol, op.kind.mnemonic(), block.name);
                self.replay(&mut cx, func, op)?;
            }
        }

        if self.config.verify_functions && !function.verify(false) {
            return fail!(ErrorKind::InvalidFunction, "LLVM rejected instantiated function {}", symbol);
        }
        Ok(())
    }

    /// Generic call targets go through the function cache when dedup is enabled, which also
    /// lets a generic function call itself with the same arguments.
    fn instantiate_callee(
        &mut self,
        callee: GenericFunctionId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<FunctionValue<'ctx>> {
        if self.config.dedup_generic_calls {
            let key = function_key(self.defs.functions.get(callee), substitution);
            if let Some(existing) = self.caches.functions.get(&key) {
                debug!("function cache hit {}", existing.get_name().to_string_lossy());
                return Ok(*existing);
            }
        }
        self.instantiate_function(callee, substitution)
    }

    fn static_global(
        &mut self,
        owner: &GenericTypeRef<'ctx>,
        var: &str,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<(GlobalValue<'ctx>, BasicTypeEnum<'ctx>)> {
        let defs = self.defs;
        let instance = self.instantiate_type_ref(owner, substitution)?;
        let owner_defn = defs.types.get(owner.generic);
        let Some(declared) = owner_defn.static_variable(var) else {
            return fail!(
                ErrorKind::UnknownStatic,
                "'{}' declares no static variable '{}'",
                owner_defn.name,
                var
            );
        };
        let ty = self.resolve_type(&declared.ty, &instance.own_substitution)?;
        let symbol = self.mangler.mangle_static_variable(&instance.mangled, var);
        match self.llvm_module.get_global(&symbol) {
            Some(global) => Ok((global, ty)),
            None => fail!(ErrorKind::MissingStaticGlobal, "no global named {}", symbol),
        }
    }

    fn emit_call(
        &mut self,
        cx: &mut InstantiationContext<'_, 'ctx>,
        op: &Operation<'ctx>,
        name: &str,
        function: FunctionValue<'ctx>,
        args: &[Value<'ctx>],
    ) -> GenericResult<()> {
        let args = cx.args(args)?;
        // LLVM refuses to name a void value
        let name = if function.get_type().get_return_type().is_some() { name } else { "" };
        let call = self.builder.build_call(function, &args, name)?;
        if let ValueKind::Basic(value) = call.try_as_basic_value() {
            cx.define(op, value);
        }
        Ok(())
    }

    fn registered_instance_func(
        &mut self,
        owner: &TypeExpr<'ctx>,
        method: &str,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<InstanceFunc<'ctx>> {
        let owner_type = self.resolve_type(owner, substitution)?;
        match self.registry.get_instance_func(owner_type, method) {
            Some(found) => Ok(found),
            None => fail!(
                ErrorKind::MissingInstanceFunc,
                "no instance function '{}' registered for {}",
                method,
                type_name(owner_type)
            ),
        }
    }

    fn replay(
        &mut self,
        cx: &mut InstantiationContext<'_, 'ctx>,
        func: &GenericFunction<'ctx>,
        op: &Operation<'ctx>,
    ) -> GenericResult<()> {
        let b = self.builder;
        let defs = self.defs;
        let name: &str = match op.result {
            Some(id) => &func.values.get(id).name,
            None => "",
        };
        let substitution = cx.substitution;

        match &op.kind {
            OpKind::Binary { op: bin_op, lhs, rhs } => {
                let what = bin_op.mnemonic();
                let result: BasicValueEnum<'ctx> = if bin_op.is_float() {
                    let (l, r) = (cx.float(lhs, what)?, cx.float(rhs, what)?);
                    let value = match bin_op {
                        BinaryOp::FAdd => b.build_float_add(l, r, name)?,
                        BinaryOp::FSub => b.build_float_sub(l, r, name)?,
                        BinaryOp::FMul => b.build_float_mul(l, r, name)?,
                        BinaryOp::FDiv => b.build_float_div(l, r, name)?,
                        BinaryOp::FRem => b.build_float_rem(l, r, name)?,
                        _ => unreachable!("{} is not a float op", what),
                    };
                    value.into()
                } else {
                    let (l, r) = (cx.int(lhs, what)?, cx.int(rhs, what)?);
                    let value = match bin_op {
                        BinaryOp::Add => b.build_int_add(l, r, name)?,
                        BinaryOp::NswAdd => b.build_int_nsw_add(l, r, name)?,
                        BinaryOp::NuwAdd => b.build_int_nuw_add(l, r, name)?,
                        BinaryOp::Sub => b.build_int_sub(l, r, name)?,
                        BinaryOp::NswSub => b.build_int_nsw_sub(l, r, name)?,
                        BinaryOp::NuwSub => b.build_int_nuw_sub(l, r, name)?,
                        BinaryOp::Mul => b.build_int_mul(l, r, name)?,
                        BinaryOp::NswMul => b.build_int_nsw_mul(l, r, name)?,
                        BinaryOp::NuwMul => b.build_int_nuw_mul(l, r, name)?,
                        BinaryOp::SDiv => b.build_int_signed_div(l, r, name)?,
                        BinaryOp::UDiv => b.build_int_unsigned_div(l, r, name)?,
                        BinaryOp::ExactSDiv => b.build_int_exact_signed_div(l, r, name)?,
                        BinaryOp::SRem => b.build_int_signed_rem(l, r, name)?,
                        BinaryOp::URem => b.build_int_unsigned_rem(l, r, name)?,
                        BinaryOp::And => b.build_and(l, r, name)?,
                        BinaryOp::Or => b.build_or(l, r, name)?,
                        BinaryOp::Xor => b.build_xor(l, r, name)?,
                        BinaryOp::Shl => b.build_left_shift(l, r, name)?,
                        BinaryOp::LShr => b.build_right_shift(l, r, false, name)?,
                        BinaryOp::AShr => b.build_right_shift(l, r, true, name)?,
                        BinaryOp::FAdd
                        | BinaryOp::FSub
                        | BinaryOp::FMul
                        | BinaryOp::FDiv
                        | BinaryOp::FRem => unreachable!("{} is a float op", what),
                    };
                    value.into()
                };
                cx.define(op, result);
            }
            OpKind::Not { value } => {
                let v = cx.int(value, "not")?;
                let all_ones = v.get_type().const_all_ones();
                let result = b.build_xor(v, all_ones, name)?;
                cx.define(op, result.into());
            }
            OpKind::ICmp { predicate, lhs, rhs } => {
                let (l, r) = (cx.int(lhs, "icmp")?, cx.int(rhs, "icmp")?);
                let result = b.build_int_compare(*predicate, l, r, name)?;
                cx.define(op, result.into());
            }
            OpKind::FCmp { predicate, lhs, rhs } => {
                let (l, r) = (cx.float(lhs, "fcmp")?, cx.float(rhs, "fcmp")?);
                let result = b.build_float_compare(*predicate, l, r, name)?;
                cx.define(op, result.into());
            }

            OpKind::Alloc { site, ty, count } => {
                let ty = self.resolve_type(ty, substitution)?;
                let count = match count {
                    Some(count) => Some(cx.int(count, op.kind.mnemonic())?),
                    None => None,
                };
                let pointer = match (site, count) {
                    (AllocSite::Stack, None) => b.build_alloca(ty, name)?,
                    (AllocSite::Stack, Some(n)) => b.build_array_alloca(ty, n, name)?,
                    (AllocSite::Heap, None) => b.build_malloc(ty, name)?,
                    (AllocSite::Heap, Some(n)) => b.build_array_malloc(ty, n, name)?,
                };
                cx.define(op, pointer.into());
            }
            OpKind::Free { pointer } => {
                b.build_free(cx.pointer(pointer, "free")?)?;
            }
            OpKind::Load { ty, pointer } => {
                let ty = self.resolve_type(ty, substitution)?;
                let result = b.build_load(ty, cx.pointer(pointer, "load")?, name)?;
                cx.define(op, result);
            }
            OpKind::Store { value, pointer } => {
                b.build_store(cx.pointer(pointer, "store")?, cx.value(value)?)?;
            }
            OpKind::Gep { ty, pointer, indices, in_bounds } => {
                let ty = self.resolve_type(ty, substitution)?;
                let pointer = cx.pointer(pointer, "gep")?;
                let indices: SV4<IntValue<'ctx>> =
                    indices.iter().map(|i| cx.int(i, "gep index")).collect::<GenericResult<_>>()?;
                // Safety: operand types are the definition's responsibility; LLVM's verifier
                // catches out-of-shape GEPs when verification is on
                let result = unsafe {
                    if *in_bounds {
                        b.build_in_bounds_gep(ty, pointer, &indices, name)?
                    } else {
                        b.build_gep(ty, pointer, &indices, name)?
                    }
                };
                cx.define(op, result.into());
            }
            OpKind::StructGep { ty, pointer, index } => {
                let ty = self.resolve_type(ty, substitution)?;
                let result = b.build_struct_gep(ty, cx.pointer(pointer, "struct_gep")?, *index, name)?;
                cx.define(op, result.into());
            }

            OpKind::StaticLoad { owner, var } => {
                let (global, ty) = self.static_global(owner, var, substitution)?;
                let result = b.build_load(ty, global.as_pointer_value(), name)?;
                cx.define(op, result);
            }
            OpKind::StaticStore { owner, var, value } => {
                let (global, _) = self.static_global(owner, var, substitution)?;
                b.build_store(global.as_pointer_value(), cx.value(value)?)?;
            }

            OpKind::Call { function, args } => {
                self.emit_call(cx, op, name, *function, args)?;
            }
            OpKind::GenericCall { callee, type_args, args } => {
                let callee_defn = defs.function_defn(*callee)?;
                let callee_substitution = self.compose_substitution(
                    &callee_defn.name,
                    &callee_defn.templates,
                    type_args,
                    substitution,
                )?;
                let function = self.instantiate_callee(*callee, &callee_substitution)?;
                self.emit_call(cx, op, name, function, args)?;
            }
            OpKind::VirtualCall { owner, method, args } => {
                match self.registered_instance_func(owner, method, substitution)? {
                    InstanceFunc::Concrete(function) => {
                        self.emit_call(cx, op, name, function, args)?;
                    }
                    other => {
                        return fail!(
                            ErrorKind::WrongKind,
                            "virtual call '{}' expected a concrete function, registry holds a {}",
                            method,
                            other.kind_name()
                        );
                    }
                }
            }
            OpKind::VirtualGenericCall { owner, method, type_args, args } => {
                let callee = match self.registered_instance_func(owner, method, substitution)? {
                    InstanceFunc::Generic(callee) => callee,
                    other => {
                        return fail!(
                            ErrorKind::WrongKind,
                            "virtual generic call '{}' expected a generic function, registry holds a {}",
                            method,
                            other.kind_name()
                        );
                    }
                };
                let callee_defn = defs.function_defn(callee)?;
                let callee_substitution = self.compose_substitution(
                    &callee_defn.name,
                    &callee_defn.templates,
                    type_args,
                    substitution,
                )?;
                let function = self.instantiate_callee(callee, &callee_substitution)?;
                self.emit_call(cx, op, name, function, args)?;
            }

            OpKind::Br { dest } => {
                b.build_unconditional_branch(cx.block(*dest)?)?;
            }
            OpKind::CondBr { cond, then_block, else_block } => {
                let cond = cx.int(cond, "cond_br")?;
                b.build_conditional_branch(cond, cx.block(*then_block)?, cx.block(*else_block)?)?;
            }
            OpKind::IndirectBr { address, destinations } => {
                let address = cx.value(address)?;
                let destinations: SV4<BasicBlock<'ctx>> =
                    destinations.iter().map(|d| cx.block(*d)).collect::<GenericResult<_>>()?;
                b.build_indirect_branch(address, &destinations)?;
            }
            OpKind::Ret { value } => {
                let value = cx.value(value)?;
                b.build_return(Some(&value))?;
            }
            OpKind::RetVoid => {
                b.build_return(None)?;
            }
            OpKind::Switch { value, default, cases } => {
                let value = cx.int(value, "switch")?;
                let cases: Vec<(IntValue<'ctx>, BasicBlock<'ctx>)> = cases
                    .iter()
                    .map(|(case, dest)| Ok((cx.int(case, "switch case")?, cx.block(*dest)?)))
                    .collect::<GenericResult<_>>()?;
                b.build_switch(value, cx.block(*default)?, &cases)?;
            }
            OpKind::Unreachable => {
                b.build_unreachable()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod instantiate_test;
