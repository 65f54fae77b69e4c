use std::convert::TryFrom;

use crate::{Attribute, ClassFileError, Result};

use super::{reader::AttributeReader, writer::AttributeWriter, Attributes, OpaqueAttribute};

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` catches every exception.
    pub catch_type: Option<String>,
}

/// A method body. Instructions are kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<OpaqueAttribute>,
}

/// Read a `Code` payload. The nested attribute table is returned undecoded so
/// that each entry goes through the attribute decoder on its own.
pub(crate) fn read_code(r: &mut AttributeReader) -> Result<(CodeAttribute, Attributes)> {
    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let code_length = r.read_u32()?;
    let code = r.read_bytes(code_length as usize)?;
    let exception_table = r.list(|r| {
        Ok(ExceptionTableEntry {
            start_pc: r.read_u16()?,
            end_pc: r.read_u16()?,
            handler_pc: r.read_u16()?,
            catch_type: r.optional_class_name()?,
        })
    })?;
    let nested = r.list(|r| {
        let attribute_name_index = r.read_u16()?;
        let length = r.read_u32()?;
        Ok(Attribute {
            attribute_name_index,
            info: r.read_bytes(length as usize)?,
        })
    })?;

    let code = CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes: Vec::new(),
    };
    Ok((code, Attributes(nested)))
}

/// Write a `Code` payload. Undecoded `nested` entries follow the opaque ones
/// with their name indices unchanged.
pub(crate) fn write_code(
    w: &mut AttributeWriter,
    code: &CodeAttribute,
    nested: &Attributes,
) -> Result<()> {
    w.write_u16(code.max_stack)?;
    w.write_u16(code.max_locals)?;
    w.write_u32(byte_length(code.code.len())?)?;
    w.write_bytes(&code.code);
    w.list("exception handlers", &code.exception_table, |w, entry| {
        w.write_u16(entry.start_pc)?;
        w.write_u16(entry.end_pc)?;
        w.write_u16(entry.handler_pc)?;
        w.optional_class_name(entry.catch_type.as_deref())
    })?;
    w.write_count("code attributes", code.attributes.len() + nested.0.len())?;
    for OpaqueAttribute { name, info } in &code.attributes {
        w.utf8(name)?;
        w.write_u32(byte_length(info.len())?)?;
        w.write_bytes(info);
    }
    for attribute in &nested.0 {
        w.write_u16(attribute.attribute_name_index)?;
        w.write_u32(byte_length(attribute.info.len())?)?;
        w.write_bytes(&attribute.info);
    }
    Ok(())
}

fn byte_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ClassFileError::TooLarge("bytes", len))
}
