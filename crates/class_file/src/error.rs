use std::io;

use thiserror::Error;

use crate::{constant_pool::CpInfo, visitor::Phase};

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(io::Error),
    #[error("Unexpected end of input")]
    Truncated,
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Wide constant at index {0} runs past the end of the constant pool")]
    WideConstantOverflow(u16),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Expected {0} at constant pool index {1}, found {2:?}")]
    UnexpectedConstantPoolEntry(&'static str, u16, CpInfo),
    #[error("Invalid method handle reference kind: {0}")]
    InvalidReferenceKind(u8),
    #[error("Invalid element value tag: {0:?}")]
    InvalidElementValueTag(char),
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Attribute payload has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("Malformed {name} attribute at offset {offset}: {source}")]
    MalformedAttribute {
        name: String,
        offset: u64,
        source: Box<ClassFileError>,
    },
    #[error("Missing bootstrap method {0}")]
    MissingBootstrapMethod(u16),
    #[error("Cyclic dynamic constant at constant pool index {0}")]
    CyclicConstant(u16),
    #[error("Visitor call out of order: {to:?} after {from:?}")]
    VisitOrder { from: Phase, to: Phase },
    #[error("Too many {0}: {1}")]
    TooLarge(&'static str, usize),
}

impl From<io::Error> for ClassFileError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => ClassFileError::Truncated,
            _ => ClassFileError::IOError(e),
        }
    }
}

/// Coarse classification of [`ClassFileError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Truncated,
    Index,
    Format,
    CyclicConstant,
    Io,
}

impl ClassFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassFileError::IOError(_) => ErrorKind::Io,
            ClassFileError::Truncated => ErrorKind::Truncated,
            ClassFileError::InvalidConstantPoolIndex(_)
            | ClassFileError::UnexpectedConstantPoolEntry(..) => ErrorKind::Index,
            ClassFileError::CyclicConstant(_) => ErrorKind::CyclicConstant,
            ClassFileError::InvalidMagicIdentifier(_)
            | ClassFileError::InvalidCpInfoTag(_)
            | ClassFileError::WideConstantOverflow(_)
            | ClassFileError::InvalidReferenceKind(_)
            | ClassFileError::InvalidElementValueTag(_)
            | ClassFileError::InvalidDescriptor(_)
            | ClassFileError::TrailingBytes(_)
            | ClassFileError::MalformedAttribute { .. }
            | ClassFileError::MissingBootstrapMethod(_)
            | ClassFileError::VisitOrder { .. }
            | ClassFileError::TooLarge(..) => ErrorKind::Format,
        }
    }

    /// The innermost error, looking through malformed attribute wrappers.
    pub fn root_cause(&self) -> &ClassFileError {
        match self {
            ClassFileError::MalformedAttribute { source, .. } => source.root_cause(),
            e => e,
        }
    }
}
