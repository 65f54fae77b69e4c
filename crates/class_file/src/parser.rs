use std::io::{BufReader, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::Attributes,
    class_file::{FieldInfo, MethodInfo},
    constant_pool::{self, *},
    *,
};

type Endian = BigEndian;

/// Decodes the raw structure of a class file without following any
/// constant pool references.
pub struct Parser<R> {
    r: BufReader<R>,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self {
            r: BufReader::new(r),
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool = self.parse_constant_pool()?;
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;
        let interfaces_count = self.read_u16()?;

        let mut interfaces = vec![0u16; interfaces_count as usize];
        self.r.read_u16_into::<Endian>(&mut interfaces)?;

        let fields_count = self.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_field_info())
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| self.parse_method_info())
            .collect::<Result<Vec<_>>>()?;

        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count)?;

        log::debug!(
            "Parsed class file v{}.{}: {} constant pool slots, {} fields, {} methods, {} attributes",
            major_version,
            minor_version,
            constant_pool.len(),
            fields.len(),
            methods.len(),
            attributes.0.len()
        );

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_field_info(&mut self) -> Result<FieldInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count)?;

        Ok(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_method_info(&mut self) -> Result<MethodInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count)?;

        Ok(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            MAGIC_IDENTIFIER => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    pub(crate) fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;

        let mut count = (constant_pool_count as usize).saturating_sub(1);
        let mut res = Vec::with_capacity(count);
        while count > 0 {
            let cp_info = self.parse_cp_info()?;
            let slot_size = if cp_info.is_wide() { 2 } else { 1 };
            let index = res.len() + 1;
            if count < slot_size {
                return Err(ClassFileError::WideConstantOverflow(index as u16));
            }
            log::trace!("#{} = {:?}", index, cp_info);
            res.push(cp_info);
            (0..slot_size - 1).for_each(|_| res.push(CpInfo::Unusable));

            count -= slot_size;
        }
        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<CpInfo> {
        let tag = self.read_u8()?;
        let cp_info = match tag {
            TAG_UTF8 => self.parse_utf8()?,
            TAG_INTEGER => CpInfo::Integer(self.read_i32()?),
            TAG_FLOAT => CpInfo::Float(self.r.read_f32::<Endian>()?),
            TAG_LONG => CpInfo::Long(self.r.read_i64::<Endian>()?),
            TAG_DOUBLE => CpInfo::Double(self.r.read_f64::<Endian>()?),
            TAG_CLASS => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            TAG_STRING => CpInfo::String(StringInfo {
                string_index: self.read_u16()?,
            }),
            TAG_FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            TAG_METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            TAG_INTERFACE_METHOD_REF => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            TAG_NAME_AND_TYPE => self.parse_name_and_type_info()?,
            TAG_METHOD_HANDLE => self.parse_method_handle()?,
            TAG_METHOD_TYPE => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            TAG_DYNAMIC => CpInfo::Dynamic(self.parse_dynamic_info()?),
            TAG_INVOKE_DYNAMIC => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            TAG_MODULE => CpInfo::Module(NamedInfo {
                name_index: self.read_u16()?,
            }),
            TAG_PACKAGE => CpInfo::Package(NamedInfo {
                name_index: self.read_u16()?,
            }),
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        };

        Ok(cp_info)
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        Ok(CpInfo::Utf8(decode_modified_utf8(&bytes)))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(constant_pool::NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(constant_pool::MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_attribute(&mut self) -> Result<Attribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let mut info = Vec::new();
        (&mut self.r)
            .take(attribute_length as u64)
            .read_to_end(&mut info)?;
        if info.len() != attribute_length as usize {
            return Err(ClassFileError::Truncated);
        }

        Ok(Attribute {
            attribute_name_index,
            info,
        })
    }

    fn parse_attributes(&mut self, attributes_count: u16) -> Result<Attributes> {
        (0..attributes_count)
            .map(|_| self.parse_attribute())
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.r.read_i32::<Endian>()?)
    }
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::new(&[0xca, 0xfe, 0xba, 0xbe][..])
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xba][..]).parse_magic_identifier(),
            Err(ClassFileError::Truncated)
        ));
    }

    #[test]
    fn it_should_fail_before_reading_anything_else() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xba, 0xbf][..]).parse(),
            Err(ClassFileError::InvalidMagicIdentifier(0xCAFEBABF))
        ));
    }
}
