use std::ops::Index;

use crate::{ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {{
        let index = $index;
        match $cp.get(index)? {
            $crate::constant_pool::CpInfo::$i(ref n) => Ok(n),
            c => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                index,
                c.clone(),
            )),
        }
    }};
}

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELD_REF: u8 = 9;
pub const TAG_METHOD_REF: u8 = 10;
pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

/// The constant pool table. Slots are stored 1:1 with their on-disk index,
/// so a `Long` or `Double` is followed by an [`CpInfo::Unusable`] slot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub const MAX_SLOTS: usize = 0xfffe;

    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// The value of the `constant_pool_count` item: the number of slots plus one.
    pub fn count(&self) -> usize {
        self.cp_infos.len() + 1
    }

    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        if index == 0 {
            return Err(ClassFileError::InvalidConstantPoolIndex(index));
        }
        match self.cp_infos.get(index as usize - 1) {
            Some(CpInfo::Unusable) | None => Err(ClassFileError::InvalidConstantPoolIndex(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(String::as_str)
    }

    pub fn class(&self, index: u16) -> Result<&ClassInfo> {
        matches_cp_info!(self, index, Class)
    }

    pub fn name_and_type(&self, index: u16) -> Result<&NameAndTypeInfo> {
        matches_cp_info!(self, index, NameAndType)
    }

    /// Ensure that `cp_info` is present in the pool, appending it when no
    /// equal entry exists. Returns its index.
    pub fn add(&mut self, cp_info: CpInfo) -> Result<u16> {
        if let Some(index) = self.index_of(&cp_info) {
            return Ok(index);
        }

        let is_wide = cp_info.is_wide();
        let needed = if is_wide { 2 } else { 1 };
        if self.cp_infos.len() + needed > Self::MAX_SLOTS {
            return Err(ClassFileError::TooLarge(
                "constant pool entries",
                self.cp_infos.len() + needed,
            ));
        }

        self.cp_infos.push(cp_info);
        let index = self.cp_infos.len() as u16;
        if is_wide {
            self.cp_infos.push(CpInfo::Unusable);
        }
        Ok(index)
    }

    pub fn add_utf8(&mut self, s: &str) -> Result<u16> {
        self.add(CpInfo::Utf8(s.to_owned()))
    }

    pub fn add_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.add_utf8(name)?;
        self.add(CpInfo::Class(ClassInfo { name_index }))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.add(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    /// The first index holding an entry equal to `cp_info`. Floating point
    /// entries compare by bit pattern so NaN constants are found again.
    fn index_of(&self, cp_info: &CpInfo) -> Option<u16> {
        if *cp_info == CpInfo::Unusable {
            return None;
        }
        self.cp_infos
            .iter()
            .position(|c| c.same_entry(cp_info))
            .map(|i| (i + 1) as u16)
    }
}
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        &self.cp_infos[index as usize - 1]
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String(StringInfo),
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module(NamedInfo),
    Package(NamedInfo),
    Unusable,
}
impl CpInfo {
    /// The on-disk tag byte, `None` for the phantom slot after a wide entry.
    pub fn tag(&self) -> Option<u8> {
        let tag = match self {
            CpInfo::Utf8(_) => TAG_UTF8,
            CpInfo::Integer(_) => TAG_INTEGER,
            CpInfo::Float(_) => TAG_FLOAT,
            CpInfo::Long(_) => TAG_LONG,
            CpInfo::Double(_) => TAG_DOUBLE,
            CpInfo::Class(_) => TAG_CLASS,
            CpInfo::String(_) => TAG_STRING,
            CpInfo::FieldRef(_) => TAG_FIELD_REF,
            CpInfo::MethodRef(_) => TAG_METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => TAG_INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => TAG_NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => TAG_METHOD_HANDLE,
            CpInfo::MethodType(_) => TAG_METHOD_TYPE,
            CpInfo::Dynamic(_) => TAG_DYNAMIC,
            CpInfo::InvokeDynamic(_) => TAG_INVOKE_DYNAMIC,
            CpInfo::Module(_) => TAG_MODULE,
            CpInfo::Package(_) => TAG_PACKAGE,
            CpInfo::Unusable => return None,
        };
        Some(tag)
    }

    /// `Long` and `Double` take up two constant pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }

    fn same_entry(&self, other: &CpInfo) -> bool {
        match (self, other) {
            (CpInfo::Float(a), CpInfo::Float(b)) => a.to_bits() == b.to_bits(),
            (CpInfo::Double(a), CpInfo::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StringInfo {
    pub string_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Shared by `CONSTANT_Dynamic` and `CONSTANT_InvokeDynamic`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

/// Shared by `CONSTANT_Module` and `CONSTANT_Package`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NamedInfo {
    pub name_index: u16,
}

#[cfg(test)]
mod constant_pool_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("Object".into()),
            CpInfo::Class(ClassInfo { name_index: 1 }),
            CpInfo::Long(7),
            CpInfo::Unusable,
        ])
    }

    #[test]
    fn it_should_reject_index_zero() {
        assert!(matches!(
            pool().get(0),
            Err(ClassFileError::InvalidConstantPoolIndex(0))
        ));
    }

    #[test]
    fn it_should_reject_out_of_range_indices() {
        assert!(pool().get(5).is_err());
    }

    #[test]
    fn it_should_reject_the_slot_after_a_long() {
        assert!(pool().get(4).is_err());
    }

    #[test]
    fn it_should_reject_a_wrong_tag() {
        assert!(matches!(
            pool().utf8(2),
            Err(ClassFileError::UnexpectedConstantPoolEntry("Utf8", 2, _))
        ));
    }

    #[test]
    fn it_should_reuse_existing_entries() {
        let mut pool = pool();
        assert_eq!(pool.add_class("Object").unwrap(), 2);
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn it_should_append_two_slots_for_wide_entries() {
        let mut pool = pool();
        assert_eq!(pool.add(CpInfo::Double(1.5)).unwrap(), 5);
        assert_eq!(pool.add_utf8("next").unwrap(), 7);
        assert_eq!(pool.count(), 8);
    }

    #[test]
    fn it_should_find_nan_floats_again() {
        let mut pool = ConstantPool::default();
        let first = pool.add(CpInfo::Float(f32::NAN)).unwrap();
        assert_eq!(pool.add(CpInfo::Float(f32::NAN)).unwrap(), first);
    }
}
