// Copyright (c) 2025 knix
// All rights reserved.

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module as LlvmModule};
use inkwell::types::{AnyType, BasicTypeEnum, StructType};
use inkwell::values::FunctionValue;
use itertools::Itertools;
use log::debug;

use crate::error::{ErrorKind, GenericResult};
use crate::function::{FunctionBuilder, GenericFunction, GenericFunctionId};
use crate::generic_type::{GenericType, GenericTypeId, TypeCache};
use crate::instantiate::{Caches, Instantiator};
use crate::mangle::{DefaultMangler, Mangler};
use crate::pool::Pool;
use crate::registry::{InstanceFunc, InstanceRegistry, TypeRegistry};
use crate::types::{GenericOwner, GenericTypeRef, Substitution, Template, TemplateId, TypeExpr};
use crate::{SV4, fail};

#[derive(Debug, Clone)]
pub struct GenericModuleConfig {
    /// Run LLVM's verifier on every instantiated function
    pub verify_functions: bool,
    pub static_linkage: Linkage,
    /// Generic and virtual-generic calls reuse an already emitted instance with the same symbol
    pub dedup_generic_calls: bool,
}

impl Default for GenericModuleConfig {
    fn default() -> Self {
        GenericModuleConfig {
            verify_functions: false,
            static_linkage: Linkage::Internal,
            dedup_generic_calls: true,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InstantiationStats {
    pub types_materialized: usize,
    pub type_cache_hits: usize,
    pub functions_emitted: usize,
}

/// Every generic definition recorded against a module
#[derive(Debug)]
pub struct Definitions<'ctx> {
    pub(crate) templates: Pool<Template, TemplateId>,
    pub(crate) types: Pool<GenericType<'ctx>, GenericTypeId>,
    pub(crate) functions: Pool<GenericFunction<'ctx>, GenericFunctionId>,
}

impl<'ctx> Definitions<'ctx> {
    fn new() -> Definitions<'ctx> {
        Definitions {
            templates: Pool::new("templates"),
            types: Pool::new("generic_types"),
            functions: Pool::new("generic_functions"),
        }
    }

    /// Ids are plain pool indices, so one minted by another module may not exist here
    pub(crate) fn type_defn(&self, id: GenericTypeId) -> GenericResult<&GenericType<'ctx>> {
        match self.types.get_checked(id) {
            Some(defn) => Ok(defn),
            None => fail!(ErrorKind::UnknownDefinition, "no generic type with id {} here", id),
        }
    }

    pub(crate) fn function_defn(
        &self,
        id: GenericFunctionId,
    ) -> GenericResult<&GenericFunction<'ctx>> {
        match self.functions.get_checked(id) {
            Some(defn) => Ok(defn),
            None => fail!(ErrorKind::UnknownDefinition, "no generic function with id {} here", id),
        }
    }

    fn check_owner(&self, owner: GenericOwner) -> GenericResult<()> {
        match owner {
            GenericOwner::Type(id) => self.type_defn(id).map(|_| ()),
            GenericOwner::Function(id) => self.function_defn(id).map(|_| ()),
        }
    }

    fn owner_name(&self, owner: GenericOwner) -> &str {
        match owner {
            GenericOwner::Type(id) => &self.types.get(id).name,
            GenericOwner::Function(id) => &self.functions.get(id).name,
        }
    }

    fn owner_templates(&self, owner: GenericOwner) -> &[TemplateId] {
        match owner {
            GenericOwner::Type(id) => &self.types.get(id).templates,
            GenericOwner::Function(id) => &self.functions.get(id).templates,
        }
    }

    pub fn try_find_template(&self, owner: GenericOwner, name: &str) -> Option<TemplateId> {
        self.owner_templates(owner).iter().copied().find(|t| self.templates.get(*t).name == name)
    }

    pub fn template(&self, owner: GenericOwner, name: &str) -> GenericResult<TemplateId> {
        match self.try_find_template(owner, name) {
            Some(t) => Ok(t),
            None => fail!(
                ErrorKind::MissingTemplate,
                "'{}' has no template named '{}'",
                self.owner_name(owner),
                name
            ),
        }
    }

    pub fn template_name(&self, template: TemplateId) -> &str {
        &self.templates.get(template).name
    }

    /// Declares fresh templates for `owner`, rejecting duplicate names
    fn declare_templates(
        &mut self,
        owner: GenericOwner,
        owner_name: &str,
        names: &[&str],
    ) -> GenericResult<SV4<TemplateId>> {
        if let Some(dup) = names.iter().duplicates().next() {
            return fail!(
                ErrorKind::DuplicateTemplate,
                "template '{}' is declared twice on '{}'",
                dup,
                owner_name
            );
        }
        Ok(names
            .iter()
            .map(|name| self.templates.add(Template { name: (*name).into(), owner }))
            .collect())
    }

    pub fn type_expr_to_string(&self, expr: &TypeExpr<'ctx>) -> String {
        match expr {
            TypeExpr::Concrete(t) => t.print_to_string().to_string_lossy().into_owned(),
            TypeExpr::Template(t) => self.template_name(*t).to_string(),
            TypeExpr::Pointer { pointee, address_space: 0 } => {
                format!("{}*", self.type_expr_to_string(pointee))
            }
            TypeExpr::Pointer { pointee, address_space } => {
                format!("{} addrspace({})*", self.type_expr_to_string(pointee), address_space)
            }
            TypeExpr::Generic(type_ref) => format!(
                "{}<{}>",
                self.types.get_checked(type_ref.generic).map_or("?", |t| t.name.as_str()),
                type_ref.args.iter().map(|a| self.type_expr_to_string(a)).join(",")
            ),
        }
    }
}

/// Owns generic definitions and instantiation caches, and emits into a caller-owned LLVM module.
pub struct GenericModule<'m, 'ctx> {
    ctx: &'ctx Context,
    llvm_module: &'m LlvmModule<'ctx>,
    builder: &'m Builder<'ctx>,
    mangler: Box<dyn Mangler + 'm>,
    registry: Box<dyn TypeRegistry<'ctx> + 'm>,
    config: GenericModuleConfig,
    defs: Definitions<'ctx>,
    caches: Caches<'ctx>,
}

impl<'m, 'ctx> GenericModule<'m, 'ctx> {
    pub fn new(
        ctx: &'ctx Context,
        llvm_module: &'m LlvmModule<'ctx>,
        builder: &'m Builder<'ctx>,
        mangler: impl Mangler + 'm,
        registry: impl TypeRegistry<'ctx> + 'm,
    ) -> GenericModule<'m, 'ctx> {
        GenericModule {
            ctx,
            llvm_module,
            builder,
            mangler: Box::new(mangler),
            registry: Box::new(registry),
            config: GenericModuleConfig::default(),
            defs: Definitions::new(),
            caches: Caches::default(),
        }
    }

    /// [`DefaultMangler`] and an empty [`InstanceRegistry`]
    pub fn with_defaults(
        ctx: &'ctx Context,
        llvm_module: &'m LlvmModule<'ctx>,
        builder: &'m Builder<'ctx>,
    ) -> GenericModule<'m, 'ctx> {
        GenericModule::new(ctx, llvm_module, builder, DefaultMangler, InstanceRegistry::default())
    }

    pub fn with_config(mut self, config: GenericModuleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GenericModuleConfig {
        &self.config
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn llvm_module(&self) -> &'m LlvmModule<'ctx> {
        self.llvm_module
    }

    pub fn stats(&self) -> InstantiationStats {
        self.caches.stats
    }

    pub fn type_cache(&self) -> &TypeCache<'ctx> {
        &self.caches.types
    }

    // ===== Definitions =====

    pub fn add_generic_type(
        &mut self,
        name: &str,
        templates: &[&str],
        packed: bool,
    ) -> GenericResult<GenericTypeId> {
        let id = self.defs.types.next_id();
        let templates = self.defs.declare_templates(id.into(), name, templates)?;
        debug!("generic type {} with {} templates", name, templates.len());
        Ok(self.defs.types.add(GenericType::make(id, name.into(), packed, templates)))
    }

    pub fn add_function(&mut self, name: &str, templates: &[&str]) -> GenericResult<GenericFunctionId> {
        let id = self.defs.functions.next_id();
        let templates = self.defs.declare_templates(id.into(), name, templates)?;
        debug!("generic function {} with {} templates", name, templates.len());
        Ok(self.defs.functions.add(GenericFunction::make(id, name.into(), templates)))
    }

    pub fn template(&self, owner: impl Into<GenericOwner>, name: &str) -> GenericResult<TemplateId> {
        let owner = owner.into();
        self.defs.check_owner(owner)?;
        self.defs.template(owner, name)
    }

    pub fn find_template(&self, owner: impl Into<GenericOwner>, name: &str) -> Option<TemplateId> {
        let owner = owner.into();
        self.defs.check_owner(owner).ok()?;
        self.defs.try_find_template(owner, name)
    }

    pub fn set_fields(
        &mut self,
        generic: GenericTypeId,
        fields: Vec<TypeExpr<'ctx>>,
    ) -> GenericResult<()> {
        self.defs.type_defn(generic)?;
        self.defs.types.get_mut(generic).set_fields(fields)
    }

    pub fn add_static_variable(
        &mut self,
        generic: GenericTypeId,
        name: &str,
        ty: TypeExpr<'ctx>,
    ) -> GenericResult<()> {
        self.defs.type_defn(generic)?;
        self.defs.types.get_mut(generic).add_static_variable(name, ty)
    }

    /// `generic` applied to `args`; the argument count must match its templates
    pub fn type_ref(
        &self,
        generic: GenericTypeId,
        args: Vec<TypeExpr<'ctx>>,
    ) -> GenericResult<GenericTypeRef<'ctx>> {
        let defn = self.defs.type_defn(generic)?;
        if defn.templates.len() != args.len() {
            return fail!(
                ErrorKind::MalformedGeneric,
                "'{}' takes {} type arguments, got {}",
                defn.name,
                defn.templates.len(),
                args.len()
            );
        }
        Ok(GenericTypeRef { generic, args: args.into_iter().collect() })
    }

    pub fn generic_type(&self, id: GenericTypeId) -> &GenericType<'ctx> {
        self.defs.types.get(id)
    }

    pub fn function(&self, id: GenericFunctionId) -> &GenericFunction<'ctx> {
        self.defs.functions.get(id)
    }

    pub fn function_builder(
        &mut self,
        id: GenericFunctionId,
    ) -> GenericResult<FunctionBuilder<'_, 'ctx>> {
        self.defs.function_defn(id)?;
        Ok(FunctionBuilder { defs: &mut self.defs, func: id })
    }

    pub fn type_expr_to_string(&self, expr: &TypeExpr<'ctx>) -> String {
        self.defs.type_expr_to_string(expr)
    }

    /// Positional substitution for `owner`'s templates
    pub fn bind(
        &self,
        owner: impl Into<GenericOwner>,
        types: &[BasicTypeEnum<'ctx>],
    ) -> GenericResult<Substitution<'ctx>> {
        let owner = owner.into();
        self.defs.check_owner(owner)?;
        let templates = self.defs.owner_templates(owner);
        if templates.len() != types.len() {
            return fail!(
                ErrorKind::MalformedGeneric,
                "'{}' takes {} type arguments, got {}",
                self.defs.owner_name(owner),
                templates.len(),
                types.len()
            );
        }
        Ok(templates.iter().copied().zip(types.iter().copied()).collect())
    }

    // ===== Registry =====

    pub fn registry(&self) -> &(dyn TypeRegistry<'ctx> + 'm) {
        &*self.registry
    }

    pub fn register_instance_func(
        &mut self,
        owner: BasicTypeEnum<'ctx>,
        method: &str,
        func: InstanceFunc<'ctx>,
    ) {
        self.registry.register_instance_func(owner, method, func)
    }

    pub fn check_type(&self, generic: GenericTypeId, concrete: BasicTypeEnum<'ctx>) -> bool {
        self.registry.check_type(&self.caches.types, generic, concrete)
    }

    // ===== Instantiation =====

    fn instantiator(&mut self) -> Instantiator<'_, 'ctx> {
        Instantiator {
            ctx: self.ctx,
            llvm_module: self.llvm_module,
            builder: self.builder,
            defs: &self.defs,
            caches: &mut self.caches,
            mangler: &*self.mangler,
            registry: &*self.registry,
            config: &self.config,
        }
    }

    pub fn instantiate_type(
        &mut self,
        generic: GenericTypeId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<StructType<'ctx>> {
        self.defs.type_defn(generic)?;
        self.instantiator().instantiate_type(generic, substitution)
    }

    /// Always emits a new LLVM function, even for a binding that was instantiated before
    pub fn instantiate_function(
        &mut self,
        func: GenericFunctionId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<FunctionValue<'ctx>> {
        self.defs.function_defn(func)?;
        let result = self.instantiator().instantiate_function(func, substitution);
        // Only a replay still in progress could need to undo these writes
        self.caches.function_journal.clear();
        result
    }
}
