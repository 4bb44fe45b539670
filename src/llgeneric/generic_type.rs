// Copyright (c) 2025 knix
// All rights reserved.

use std::cell::Cell;

use ahash::HashMapExt;
use ecow::EcoString;
use fxhash::FxHashMap;
use inkwell::types::{BasicType, BasicTypeEnum, StructType};
use log::debug;

use crate::error::{ErrorKind, GenericResult};
use crate::instantiate::Instantiator;
use crate::types::{GenericTypeRef, Substitution, TemplateId, TypeExpr};
use crate::{SV4, fail, nz_u32_id};

nz_u32_id!(GenericTypeId);

#[derive(Debug, Clone)]
pub struct StaticVariable<'ctx> {
    pub name: EcoString,
    pub ty: TypeExpr<'ctx>,
}

/// A struct-like definition parameterized over its templates.
#[derive(Debug)]
pub struct GenericType<'ctx> {
    pub id: GenericTypeId,
    pub name: EcoString,
    pub packed: bool,
    pub templates: SV4<TemplateId>,
    pub(crate) fields: Vec<TypeExpr<'ctx>>,
    pub(crate) statics: Vec<StaticVariable<'ctx>>,
    // Set on first instantiation; the definition is frozen from then on
    pub(crate) sealed: Cell<bool>,
}

impl<'ctx> GenericType<'ctx> {
    pub(crate) fn make(
        id: GenericTypeId,
        name: EcoString,
        packed: bool,
        templates: SV4<TemplateId>,
    ) -> GenericType<'ctx> {
        GenericType {
            id,
            name,
            packed,
            templates,
            fields: Vec::new(),
            statics: Vec::new(),
            sealed: Cell::new(false),
        }
    }

    pub fn fields(&self) -> &[TypeExpr<'ctx>] {
        &self.fields
    }

    pub fn statics(&self) -> &[StaticVariable<'ctx>] {
        &self.statics
    }

    pub fn static_variable(&self, name: &str) -> Option<&StaticVariable<'ctx>> {
        self.statics.iter().find(|s| s.name == name)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }

    pub(crate) fn set_fields(&mut self, fields: Vec<TypeExpr<'ctx>>) -> GenericResult<()> {
        if self.is_sealed() {
            return fail!(
                ErrorKind::DefinitionSealed,
                "cannot change fields of '{}' after it has been instantiated",
                self.name
            );
        }
        self.fields = fields;
        Ok(())
    }

    pub(crate) fn add_static_variable(
        &mut self,
        name: &str,
        ty: TypeExpr<'ctx>,
    ) -> GenericResult<()> {
        if self.is_sealed() {
            return fail!(
                ErrorKind::DefinitionSealed,
                "cannot declare static '{}' on '{}' after it has been instantiated",
                name,
                self.name
            );
        }
        if self.static_variable(name).is_some() {
            return fail!(
                ErrorKind::DuplicateStatic,
                "static '{}' is already declared on '{}'",
                name,
                self.name
            );
        }
        self.statics.push(StaticVariable { name: name.into(), ty });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CachedType<'ctx> {
    pub struct_type: StructType<'ctx>,
    pub origin: GenericTypeId,
    pub args: SV4<BasicTypeEnum<'ctx>>,
}

/// Mangled name -> concrete struct. One entry per distinct (generic type, argument tuple).
#[derive(Debug, Default)]
pub struct TypeCache<'ctx> {
    entries: FxHashMap<EcoString, CachedType<'ctx>>,
}

impl<'ctx> TypeCache<'ctx> {
    pub fn get(&self, mangled: &str) -> Option<&CachedType<'ctx>> {
        self.entries.get(mangled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Which generic definition produced `concrete`, if any
    pub fn origin_of(&self, concrete: BasicTypeEnum<'ctx>) -> Option<GenericTypeId> {
        let BasicTypeEnum::StructType(st) = concrete else { return None };
        self.entries.values().find(|c| c.struct_type == st).map(|c| c.origin)
    }

    pub fn instances_of(&self, generic: GenericTypeId) -> impl Iterator<Item = &CachedType<'ctx>> {
        self.entries.values().filter(move |c| c.origin == generic)
    }

    pub(crate) fn insert(&mut self, mangled: EcoString, entry: CachedType<'ctx>) {
        self.entries.insert(mangled, entry);
    }

    pub(crate) fn remove(&mut self, mangled: &str) {
        self.entries.remove(mangled);
    }
}

/// A concrete instantiation as seen from inside the engine
pub(crate) struct TypeInstance<'ctx> {
    pub struct_type: StructType<'ctx>,
    pub mangled: EcoString,
    pub own_substitution: Substitution<'ctx>,
}

impl<'a, 'ctx> Instantiator<'a, 'ctx> {
    pub(crate) fn instantiate_type(
        &mut self,
        id: GenericTypeId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<StructType<'ctx>> {
        Ok(self.instantiate_type_instance(id, substitution)?.struct_type)
    }

    /// Resolves a constructed reference: the arguments are resolved in the caller's context,
    /// the referenced type only ever sees its own templates.
    pub(crate) fn instantiate_type_ref(
        &mut self,
        type_ref: &GenericTypeRef<'ctx>,
        ambient: &Substitution<'ctx>,
    ) -> GenericResult<TypeInstance<'ctx>> {
        let defs = self.defs;
        let defn = defs.type_defn(type_ref.generic)?;
        if defn.templates.len() != type_ref.args.len() {
            return fail!(
                ErrorKind::MalformedGeneric,
                "'{}' takes {} type arguments, got {}",
                defn.name,
                defn.templates.len(),
                type_ref.args.len()
            );
        }
        let mut scoped = Substitution::with_capacity(defn.templates.len());
        for (template, arg) in defn.templates.iter().zip(type_ref.args.iter()) {
            let concrete = self.resolve_type(arg, ambient)?;
            scoped.insert(*template, concrete);
        }
        self.instantiate_type_instance(type_ref.generic, &scoped)
    }

    pub(crate) fn instantiate_type_instance(
        &mut self,
        id: GenericTypeId,
        substitution: &Substitution<'ctx>,
    ) -> GenericResult<TypeInstance<'ctx>> {
        let defs = self.defs;
        let defn = defs.types.get(id);

        let mut args: SV4<BasicTypeEnum<'ctx>> = SV4::with_capacity(defn.templates.len());
        for template in &defn.templates {
            let Some(concrete) = substitution.get(template) else {
                return fail!(
                    ErrorKind::UnboundTemplate,
                    "template '{}' of '{}' is not bound",
                    defs.template_name(*template),
                    defn.name
                );
            };
            args.push(*concrete);
        }
        let own_substitution: Substitution<'ctx> =
            defn.templates.iter().copied().zip(args.iter().copied()).collect();

        let mangled: EcoString = self.mangler.mangle_type(&defn.name, &args).into();
        if let Some(cached) = self.caches.types.get(&mangled) {
            debug!("type cache hit {mangled}");
            self.caches.stats.type_cache_hits += 1;
            return Ok(TypeInstance {
                struct_type: cached.struct_type,
                mangled,
                own_substitution,
            });
        }

        debug!("instantiating type {mangled}");
        defn.sealed.set(true);
        let struct_type = self.ctx.opaque_struct_type(&mangled);
        // In the cache before the fields resolve, so a field pointing back at this
        // instantiation finds it instead of recursing forever
        self.caches.types.insert(
            mangled.clone(),
            CachedType { struct_type, origin: id, args: args.clone() },
        );

        if let Err(e) = self.materialize_type(defn, struct_type, &mangled, &own_substitution) {
            self.caches.types.remove(&mangled);
            return Err(e);
        }
        self.caches.stats.types_materialized += 1;

        Ok(TypeInstance { struct_type, mangled, own_substitution })
    }

    fn materialize_type(
        &mut self,
        defn: &GenericType<'ctx>,
        struct_type: StructType<'ctx>,
        mangled: &str,
        own_substitution: &Substitution<'ctx>,
    ) -> GenericResult<()> {
        let mut fields: Vec<BasicTypeEnum<'ctx>> = Vec::with_capacity(defn.fields.len());
        for field in &defn.fields {
            fields.push(self.resolve_type(field, own_substitution)?);
        }
        struct_type.set_body(&fields, defn.packed);

        for var in &defn.statics {
            let ty = self.resolve_type(&var.ty, own_substitution)?;
            let symbol = self.mangler.mangle_static_variable(mangled, &var.name);
            debug!("materializing static {symbol}");
            let global = self.llvm_module.add_global(ty, None, &symbol);
            global.set_linkage(self.config.static_linkage);
            global.set_initializer(&ty.const_zero());
        }
        Ok(())
    }
}
