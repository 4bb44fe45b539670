// Copyright (c) 2025 knix
// All rights reserved.

use std::error::Error;
use std::fmt::{Display, Formatter};

use inkwell::builder::BuilderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Definition time
    NoCurrentBlock,
    BlockTerminated,
    DuplicateTemplate,
    MissingTemplate,
    MalformedGeneric,
    ParametersAlreadySet,
    ReturnTypeAlreadySet,
    DefinitionSealed,
    UnknownDefinition,
    ForeignBlock,
    ForeignValue,
    UnknownStatic,
    DuplicateStatic,
    NonConstantCase,

    // Instantiation time
    UnterminatedBlock,
    UnboundTemplate,
    UnresolvedValue,
    WrongKind,
    MissingInstanceFunc,
    MissingStaticGlobal,
    InvalidFunction,
    Backend,
}

impl ErrorKind {
    pub fn is_definition_error(&self) -> bool {
        match self {
            ErrorKind::NoCurrentBlock
            | ErrorKind::BlockTerminated
            | ErrorKind::DuplicateTemplate
            | ErrorKind::MissingTemplate
            | ErrorKind::MalformedGeneric
            | ErrorKind::ParametersAlreadySet
            | ErrorKind::ReturnTypeAlreadySet
            | ErrorKind::DefinitionSealed
            | ErrorKind::UnknownDefinition
            | ErrorKind::ForeignBlock
            | ErrorKind::ForeignValue
            | ErrorKind::UnknownStatic
            | ErrorKind::DuplicateStatic
            | ErrorKind::NonConstantCase => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenericError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenericError {
    pub fn make(kind: ErrorKind, message: impl AsRef<str>) -> GenericError {
        GenericError { kind, message: message.as_ref().to_owned() }
    }
}

impl Display for GenericError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let phase = if self.kind.is_definition_error() { "definition" } else { "instantiation" };
        f.write_fmt(format_args!("{} error ({:?}): {}", phase, self.kind, self.message))
    }
}

impl Error for GenericError {}

impl From<BuilderError> for GenericError {
    fn from(value: BuilderError) -> Self {
        GenericError::make(ErrorKind::Backend, format!("llvm builder: {value}"))
    }
}

pub type GenericResult<A> = Result<A, GenericError>;

#[macro_export]
macro_rules! fail {
    ($kind:expr, $($format_args:expr),* $(,)?) => {
        {
            let s: String = format!($($format_args),*);
            Err($crate::error::GenericError::make($kind, s))
        }
    };
}
