// Copyright (c) 2025 knix
// All rights reserved.

use ecow::EcoString;
use fxhash::FxHashMap;
use inkwell::types::{AsTypeRef, BasicTypeEnum};
use inkwell::values::FunctionValue;
use llvm_sys::prelude::LLVMTypeRef;

use crate::function::GenericFunctionId;
use crate::generic_type::{GenericTypeId, TypeCache};

/// What a registry hands back for a (owner type, method) lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFunc<'ctx> {
    Concrete(FunctionValue<'ctx>),
    Generic(GenericFunctionId),
}

impl InstanceFunc<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            InstanceFunc::Concrete(_) => "concrete function",
            InstanceFunc::Generic(_) => "generic function",
        }
    }
}

/// Resolves dynamically dispatched ("virtual") calls while a function body is replayed.
pub trait TypeRegistry<'ctx> {
    fn register_instance_func(
        &mut self,
        owner: BasicTypeEnum<'ctx>,
        method: &str,
        func: InstanceFunc<'ctx>,
    );

    fn get_instance_func(
        &self,
        owner: BasicTypeEnum<'ctx>,
        method: &str,
    ) -> Option<InstanceFunc<'ctx>>;

    /// Structural conformance of `concrete` to the generic definition `generic`. Not consulted
    /// during call resolution; exposed for callers layering checks on top.
    fn check_type(
        &self,
        instances: &TypeCache<'ctx>,
        generic: GenericTypeId,
        concrete: BasicTypeEnum<'ctx>,
    ) -> bool;
}

/// In-memory registry keyed by LLVM type identity.
#[derive(Debug, Default)]
pub struct InstanceRegistry<'ctx> {
    methods: FxHashMap<(LLVMTypeRef, EcoString), InstanceFunc<'ctx>>,
}

impl InstanceRegistry<'_> {
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<'ctx> TypeRegistry<'ctx> for InstanceRegistry<'ctx> {
    fn register_instance_func(
        &mut self,
        owner: BasicTypeEnum<'ctx>,
        method: &str,
        func: InstanceFunc<'ctx>,
    ) {
        self.methods.insert((owner.as_type_ref(), method.into()), func);
    }

    fn get_instance_func(
        &self,
        owner: BasicTypeEnum<'ctx>,
        method: &str,
    ) -> Option<InstanceFunc<'ctx>> {
        self.methods.get(&(owner.as_type_ref(), EcoString::from(method))).copied()
    }

    fn check_type(
        &self,
        instances: &TypeCache<'ctx>,
        generic: GenericTypeId,
        concrete: BasicTypeEnum<'ctx>,
    ) -> bool {
        instances.origin_of(concrete) == Some(generic)
    }
}
