// Copyright (c) 2025 knix
// All rights reserved.

use ecow::EcoString;
use fxhash::FxHashMap;
use inkwell::types::{BasicType, BasicTypeEnum};

use crate::function::GenericFunctionId;
use crate::generic_type::GenericTypeId;
use crate::{SV4, nz_u32_id};

nz_u32_id!(TemplateId);

/// Concrete binding for template parameters, keyed by template identity (never by name).
pub type Substitution<'ctx> = FxHashMap<TemplateId, BasicTypeEnum<'ctx>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    Type(GenericTypeId),
    Function(GenericFunctionId),
}

impl From<GenericTypeId> for GenericOwner {
    fn from(value: GenericTypeId) -> Self {
        GenericOwner::Type(value)
    }
}

impl From<GenericFunctionId> for GenericOwner {
    fn from(value: GenericFunctionId) -> Self {
        GenericOwner::Function(value)
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    pub name: EcoString,
    pub owner: GenericOwner,
}

/// A type as written inside a generic definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr<'ctx> {
    Concrete(BasicTypeEnum<'ctx>),
    Template(TemplateId),
    /// Address space is an opaque tag handed to LLVM as-is
    Pointer { pointee: Box<TypeExpr<'ctx>>, address_space: u16 },
    Generic(Box<GenericTypeRef<'ctx>>),
}

impl<'ctx> TypeExpr<'ctx> {
    pub fn concrete(t: impl BasicType<'ctx>) -> TypeExpr<'ctx> {
        TypeExpr::Concrete(t.as_basic_type_enum())
    }

    pub fn pointer(self) -> TypeExpr<'ctx> {
        self.pointer_in(0)
    }

    pub fn pointer_in(self, address_space: u16) -> TypeExpr<'ctx> {
        TypeExpr::Pointer { pointee: Box::new(self), address_space }
    }

    /// True when resolving this expression can never consult a substitution
    pub fn is_closed(&self) -> bool {
        match self {
            TypeExpr::Concrete(_) => true,
            TypeExpr::Template(_) => false,
            TypeExpr::Pointer { pointee, .. } => pointee.is_closed(),
            TypeExpr::Generic(r) => r.args.iter().all(|a| a.is_closed()),
        }
    }
}

impl<'ctx> From<BasicTypeEnum<'ctx>> for TypeExpr<'ctx> {
    fn from(value: BasicTypeEnum<'ctx>) -> Self {
        TypeExpr::Concrete(value)
    }
}

impl From<TemplateId> for TypeExpr<'_> {
    fn from(value: TemplateId) -> Self {
        TypeExpr::Template(value)
    }
}

impl<'ctx> From<GenericTypeRef<'ctx>> for TypeExpr<'ctx> {
    fn from(value: GenericTypeRef<'ctx>) -> Self {
        TypeExpr::Generic(Box::new(value))
    }
}

/// A generic type applied to arguments, e.g. `Pair<T>` or `Box<Pair<i32>>`.
///
/// Arguments line up positionally with the referenced type's templates; the count is checked
/// once, when the reference is made through [`crate::GenericModule::type_ref`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenericTypeRef<'ctx> {
    pub(crate) generic: GenericTypeId,
    pub(crate) args: SV4<TypeExpr<'ctx>>,
}

impl<'ctx> GenericTypeRef<'ctx> {
    pub fn generic(&self) -> GenericTypeId {
        self.generic
    }

    pub fn args(&self) -> &[TypeExpr<'ctx>] {
        &self.args
    }
}
