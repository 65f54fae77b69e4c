use std::{convert::TryFrom, io::Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attributes::Attributes,
    class_file::{FieldInfo, MethodInfo},
    constant_pool::*,
    *,
};

type Endian = BigEndian;

/// Serializes the raw structure of a class file. Every count and length is
/// taken from the records themselves.
pub struct Writer<W> {
    w: W,
}
impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write_class_file(&mut self, class_file: &ClassFile) -> Result<()> {
        self.write_u32(MAGIC_IDENTIFIER)?;
        self.write_u16(class_file.minor_version)?;
        self.write_u16(class_file.major_version)?;
        self.write_constant_pool(&class_file.constant_pool)?;
        self.write_u16(class_file.access_flags.bits())?;
        self.write_u16(class_file.this_class)?;
        self.write_u16(class_file.super_class)?;

        self.write_count("interfaces", class_file.interfaces.len())?;
        for &interface in &class_file.interfaces {
            self.write_u16(interface)?;
        }

        self.write_count("fields", class_file.fields.len())?;
        for field in &class_file.fields {
            self.write_field_info(field)?;
        }

        self.write_count("methods", class_file.methods.len())?;
        for method in &class_file.methods {
            self.write_method_info(method)?;
        }

        self.write_attributes(&class_file.attributes)?;
        self.w.flush()?;

        log::debug!(
            "Wrote class file v{}.{}: {} constant pool slots",
            class_file.major_version,
            class_file.minor_version,
            class_file.constant_pool.len()
        );
        Ok(())
    }

    fn write_constant_pool(&mut self, constant_pool: &ConstantPool) -> Result<()> {
        self.write_count("constant pool entries", constant_pool.count())?;
        for cp_info in constant_pool {
            self.write_cp_info(cp_info)?;
        }
        Ok(())
    }

    fn write_cp_info(&mut self, cp_info: &CpInfo) -> Result<()> {
        let tag = match cp_info.tag() {
            Some(tag) => tag,
            // The second slot of a Long or Double has no bytes of its own.
            None => return Ok(()),
        };
        self.write_u8(tag)?;

        match cp_info {
            CpInfo::Utf8(s) => {
                let bytes = encode_modified_utf8(s);
                self.write_count("bytes in a Utf8 constant", bytes.len())?;
                self.w.write_all(&bytes)?;
            }
            CpInfo::Integer(i) => self.w.write_i32::<Endian>(*i)?,
            CpInfo::Float(f) => self.w.write_f32::<Endian>(*f)?,
            CpInfo::Long(l) => self.w.write_i64::<Endian>(*l)?,
            CpInfo::Double(d) => self.w.write_f64::<Endian>(*d)?,
            CpInfo::Class(ClassInfo { name_index }) => self.write_u16(*name_index)?,
            CpInfo::String(StringInfo { string_index }) => self.write_u16(*string_index)?,
            CpInfo::FieldRef(ref_info)
            | CpInfo::MethodRef(ref_info)
            | CpInfo::InterfaceMethodRef(ref_info) => {
                self.write_u16(ref_info.class_index)?;
                self.write_u16(ref_info.name_and_type_index)?;
            }
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index,
                descriptor_index,
            }) => {
                self.write_u16(*name_index)?;
                self.write_u16(*descriptor_index)?;
            }
            CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind,
                reference_index,
            }) => {
                self.write_u8(*reference_kind)?;
                self.write_u16(*reference_index)?;
            }
            CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
                self.write_u16(*descriptor_index)?
            }
            CpInfo::Dynamic(dynamic) | CpInfo::InvokeDynamic(dynamic) => {
                self.write_u16(dynamic.bootstrap_method_attr_index)?;
                self.write_u16(dynamic.name_and_type_index)?;
            }
            CpInfo::Module(NamedInfo { name_index }) | CpInfo::Package(NamedInfo { name_index }) => {
                self.write_u16(*name_index)?
            }
            CpInfo::Unusable => {}
        }
        Ok(())
    }

    fn write_field_info(&mut self, field: &FieldInfo) -> Result<()> {
        self.write_u16(field.access_flags.bits())?;
        self.write_u16(field.name_index)?;
        self.write_u16(field.descriptor_index)?;
        self.write_attributes(&field.attributes)
    }

    fn write_method_info(&mut self, method: &MethodInfo) -> Result<()> {
        self.write_u16(method.access_flags.bits())?;
        self.write_u16(method.name_index)?;
        self.write_u16(method.descriptor_index)?;
        self.write_attributes(&method.attributes)
    }

    fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.write_count("attributes", attributes.0.len())?;
        for attribute in &attributes.0 {
            self.write_u16(attribute.attribute_name_index)?;
            let length = u32::try_from(attribute.info.len())
                .map_err(|_| ClassFileError::TooLarge("attribute bytes", attribute.info.len()))?;
            self.write_u32(length)?;
            self.w.write_all(&attribute.info)?;
        }
        Ok(())
    }

    fn write_count(&mut self, what: &'static str, len: usize) -> Result<()> {
        let count = u16::try_from(len).map_err(|_| ClassFileError::TooLarge(what, len))?;
        self.write_u16(count)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.w.write_u32::<Endian>(value)?)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.w.write_u16::<Endian>(value)?)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.w.write_u8(value)?)
    }
}
