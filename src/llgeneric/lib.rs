// Copyright (c) 2025 knix
// All rights reserved.

//! Monomorphization in front of LLVM.
//!
//! Generic struct types and functions are recorded once against a [`GenericModule`] as inert
//! descriptions: type expressions over template placeholders, and function bodies as a stream
//! of deferred operations. Instantiating a definition with a concrete binding replays that
//! description into real LLVM types, globals and instructions.

use smallvec::SmallVec;

pub mod error;
pub mod function;
pub mod generic_type;
mod instantiate;
pub mod mangle;
pub mod module;
pub mod ops;
mod pool;
pub mod registry;
pub mod types;
pub mod value;

pub use error::{ErrorKind, GenericError, GenericResult};
pub use function::{FunctionBuilder, GenericFunction, IndirectBrHandle, SwitchHandle};
pub use generic_type::GenericType;
pub use mangle::{DefaultMangler, Mangler};
pub use module::{GenericModule, GenericModuleConfig};
pub use registry::{InstanceFunc, InstanceRegistry, TypeRegistry};
pub use types::{GenericTypeRef, Substitution, TemplateId, TypeExpr};
pub use value::{BlockRef, Value};

pub type SV8<T> = SmallVec<[T; 8]>;
pub type SV4<T> = SmallVec<[T; 4]>;

#[macro_export]
macro_rules! nz_u32_id {
    ($name: ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(std::num::NonZeroU32);
        impl From<std::num::NonZeroU32> for $name {
            fn from(value: std::num::NonZeroU32) -> Self {
                $name(value)
            }
        }
        impl From<$name> for std::num::NonZeroU32 {
            fn from(val: $name) -> Self {
                val.0
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl $name {
            pub const fn as_u32(self) -> u32 {
                self.0.get()
            }

            /// Zero-based position of this id in its pool
            pub const fn index(self) -> usize {
                self.0.get() as usize - 1
            }

            pub const fn from_index(index: usize) -> Self {
                match std::num::NonZeroU32::new(index as u32 + 1) {
                    Some(nz) => $name(nz),
                    None => panic!("id index overflow"),
                }
            }
        }
    };
}
