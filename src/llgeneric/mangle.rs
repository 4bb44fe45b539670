// Copyright (c) 2025 knix
// All rights reserved.

use inkwell::types::{AnyType, BasicTypeEnum};
use itertools::Itertools;

/// Turns a base name plus concrete type arguments into a symbol.
///
/// Implementations must be deterministic and must not map distinct argument tuples to the same
/// symbol; the instantiation cache trusts the result blindly.
pub trait Mangler {
    fn mangle_func(&self, func_name: &str, params: &[BasicTypeEnum<'_>]) -> String;
    fn mangle_type(&self, type_name: &str, args: &[BasicTypeEnum<'_>]) -> String;
    fn mangle_static_variable(&self, owner_name: &str, var_name: &str) -> String;
}

/// Readable mangling: `Pair<i32>`, `Add<i32,i32>`, `Counter<double>::count`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMangler;

impl DefaultMangler {
    fn render(t: &BasicTypeEnum<'_>) -> String {
        match t {
            BasicTypeEnum::StructType(s) => match s.get_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => s.print_to_string().to_string_lossy().into_owned(),
            },
            other => other.print_to_string().to_string_lossy().into_owned(),
        }
    }

    fn apply(base: &str, args: &[BasicTypeEnum<'_>]) -> String {
        format!("{}<{}>", base, args.iter().map(DefaultMangler::render).join(","))
    }
}

impl Mangler for DefaultMangler {
    fn mangle_func(&self, func_name: &str, params: &[BasicTypeEnum<'_>]) -> String {
        DefaultMangler::apply(func_name, params)
    }

    fn mangle_type(&self, type_name: &str, args: &[BasicTypeEnum<'_>]) -> String {
        DefaultMangler::apply(type_name, args)
    }

    fn mangle_static_variable(&self, owner_name: &str, var_name: &str) -> String {
        format!("{owner_name}::{var_name}")
    }
}

#[cfg(test)]
mod test {
    use inkwell::context::Context;
    use inkwell::types::BasicType;

    use super::{DefaultMangler, Mangler};

    #[test]
    fn scalar_arguments() {
        let ctx = Context::create();
        let args = [ctx.i32_type().as_basic_type_enum(), ctx.f64_type().as_basic_type_enum()];
        assert_eq!(DefaultMangler.mangle_type("Map", &args), "Map<i32,double>");
        assert_eq!(DefaultMangler.mangle_func("Add", &args[..1]), "Add<i32>");
    }

    #[test]
    fn named_struct_argument_uses_its_name() {
        let ctx = Context::create();
        let pair = ctx.opaque_struct_type("Pair<i32>");
        let args = [pair.as_basic_type_enum()];
        assert_eq!(DefaultMangler.mangle_type("Box", &args), "Box<Pair<i32>>");
    }

    #[test]
    fn static_variable() {
        assert_eq!(DefaultMangler.mangle_static_variable("Counter<i32>", "count"), "Counter<i32>::count");
    }
}
