use std::convert::TryFrom;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    constant::{ConstantDynamic, ConstantValue, Handle, ReferenceKind},
    constant_pool::{
        CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NamedInfo, RefInfo, StringInfo,
    },
    Attribute, ClassFileError, ConstantPool, Result,
};

type Endian = BigEndian;

/// Builds one attribute payload, interning the constants it refers to.
pub(crate) struct AttributeWriter<'p> {
    pool: &'p mut ConstantPool,
    buf: Vec<u8>,
}

impl<'p> AttributeWriter<'p> {
    pub(crate) fn new(pool: &'p mut ConstantPool) -> Self {
        Self {
            pool,
            buf: Vec::new(),
        }
    }

    pub(crate) fn finish(self, name: &str) -> Result<Attribute> {
        Ok(Attribute {
            attribute_name_index: self.pool.add_utf8(name)?,
            info: self.buf,
        })
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.buf.write_u8(value)?)
    }

    pub(crate) fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.buf.write_u16::<Endian>(value)?)
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.buf.write_u32::<Endian>(value)?)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn write_count(&mut self, what: &'static str, len: usize) -> Result<()> {
        let count = u16::try_from(len).map_err(|_| ClassFileError::TooLarge(what, len))?;
        self.write_u16(count)
    }

    pub(crate) fn utf8(&mut self, s: &str) -> Result<()> {
        let index = self.pool.add_utf8(s)?;
        self.write_u16(index)
    }

    pub(crate) fn optional_utf8(&mut self, s: Option<&str>) -> Result<()> {
        match s {
            Some(s) => self.utf8(s),
            None => self.write_u16(0),
        }
    }

    pub(crate) fn class_name(&mut self, name: &str) -> Result<()> {
        let index = self.pool.add_class(name)?;
        self.write_u16(index)
    }

    pub(crate) fn optional_class_name(&mut self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => self.class_name(name),
            None => self.write_u16(0),
        }
    }

    pub(crate) fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<()> {
        let index = self.pool.add_name_and_type(name, descriptor)?;
        self.write_u16(index)
    }

    pub(crate) fn module_name(&mut self, name: &str) -> Result<()> {
        let name_index = self.pool.add_utf8(name)?;
        let index = self.pool.add(CpInfo::Module(NamedInfo { name_index }))?;
        self.write_u16(index)
    }

    pub(crate) fn package_name(&mut self, name: &str) -> Result<()> {
        let name_index = self.pool.add_utf8(name)?;
        let index = self.pool.add(CpInfo::Package(NamedInfo { name_index }))?;
        self.write_u16(index)
    }

    pub(crate) fn constant_value(&mut self, value: &ConstantValue) -> Result<()> {
        let index = intern_constant(&mut *self.pool, value)?;
        self.write_u16(index)
    }

    pub(crate) fn method_handle(&mut self, handle: &Handle) -> Result<()> {
        let index = intern_handle(&mut *self.pool, handle)?;
        self.write_u16(index)
    }

    /// Write a `u16` count followed by every item.
    pub(crate) fn list<T>(
        &mut self,
        what: &'static str,
        items: &[T],
        mut f: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_count(what, items.len())?;
        items.iter().try_for_each(|item| f(self, item))
    }
}

pub(crate) fn intern_constant(pool: &mut ConstantPool, value: &ConstantValue) -> Result<u16> {
    let cp_info = match value {
        ConstantValue::Utf8(s) => return pool.add_utf8(s),
        ConstantValue::Integer(i) => CpInfo::Integer(*i),
        ConstantValue::Float(f) => CpInfo::Float(*f),
        ConstantValue::Long(l) => CpInfo::Long(*l),
        ConstantValue::Double(d) => CpInfo::Double(*d),
        ConstantValue::Class(name) => return pool.add_class(name),
        ConstantValue::String(s) => CpInfo::String(StringInfo {
            string_index: pool.add_utf8(s)?,
        }),
        ConstantValue::MethodHandle(handle) => return intern_handle(pool, handle),
        ConstantValue::MethodType(descriptor) => CpInfo::MethodType(MethodTypeInfo {
            descriptor_index: pool.add_utf8(descriptor)?,
        }),
        ConstantValue::Dynamic(dynamic) => return intern_dynamic(pool, dynamic),
    };
    pool.add(cp_info)
}

fn intern_handle(pool: &mut ConstantPool, handle: &Handle) -> Result<u16> {
    let ref_info = RefInfo {
        class_index: pool.add_class(&handle.owner)?,
        name_and_type_index: pool.add_name_and_type(&handle.name, &handle.descriptor)?,
    };
    let reference = if handle.kind.is_field() {
        CpInfo::FieldRef(ref_info)
    } else if handle.is_interface || handle.kind == ReferenceKind::InvokeInterface {
        CpInfo::InterfaceMethodRef(ref_info)
    } else {
        CpInfo::MethodRef(ref_info)
    };
    let reference_index = pool.add(reference)?;

    pool.add(CpInfo::MethodHandle(MethodHandleInfo {
        reference_kind: handle.kind as u8,
        reference_index,
    }))
}

fn intern_dynamic(pool: &mut ConstantPool, dynamic: &ConstantDynamic) -> Result<u16> {
    let name_and_type_index = pool.add_name_and_type(&dynamic.name, &dynamic.descriptor)?;
    pool.add(CpInfo::Dynamic(DynamicInfo {
        bootstrap_method_attr_index: dynamic.bootstrap_method_index,
        name_and_type_index,
    }))
}
