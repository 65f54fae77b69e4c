// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
mod constant_pool;
mod access_flags;
pub mod attributes;
mod class_file;
pub mod constant;
pub mod descriptor;
mod encoder;
mod error;
pub mod model;
mod parser;
mod reader;
mod resolver;
pub mod visitor;
mod writer;

use std::{borrow::Cow, fmt};

pub use self::class_file::{ClassFile, FieldInfo, MethodInfo};
pub use access_flags::AccessFlags;
pub use constant_pool::{ConstantPool, CpInfo};
pub use encoder::ClassEncoder;
pub use error::{ClassFileError, ErrorKind};
pub use parser::Parser;
pub use reader::{AttributeErrorPolicy, ClassReader, Diagnostic, ReaderOptions};
pub use resolver::{RawBootstrapMethod, Resolver, MAX_DYNAMIC_NESTING};
pub use writer::Writer;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

pub const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;

#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

/// Decode modified UTF-8 as stored in `CONSTANT_Utf8_info` structures.
pub(crate) fn decode_modified_utf8(bytes: &[u8]) -> String {
    match cesu8::from_java_cesu8(bytes) {
        Ok(s) => s.into_owned(),
        Err(_) => {
            log::warn!("Invalid modified UTF-8 sequence, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

pub(crate) fn encode_modified_utf8(s: &str) -> Cow<'_, [u8]> {
    cesu8::to_java_cesu8(s)
}
