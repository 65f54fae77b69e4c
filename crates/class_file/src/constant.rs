//! Resolved constant pool values.

use std::convert::TryFrom;

use crate::ClassFileError;

/// The `reference_kind` item of a `CONSTANT_MethodHandle_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = ClassFileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferenceKind::GetField),
            2 => Ok(ReferenceKind::GetStatic),
            3 => Ok(ReferenceKind::PutField),
            4 => Ok(ReferenceKind::PutStatic),
            5 => Ok(ReferenceKind::InvokeVirtual),
            6 => Ok(ReferenceKind::InvokeStatic),
            7 => Ok(ReferenceKind::InvokeSpecial),
            8 => Ok(ReferenceKind::NewInvokeSpecial),
            9 => Ok(ReferenceKind::InvokeInterface),
            _ => Err(ClassFileError::InvalidReferenceKind(value)),
        }
    }
}

impl ReferenceKind {
    pub fn is_field(self) -> bool {
        matches!(
            self,
            ReferenceKind::GetField
                | ReferenceKind::GetStatic
                | ReferenceKind::PutField
                | ReferenceKind::PutStatic
        )
    }
}

/// Which kind of `CONSTANT_*ref_info` a [`ConstantReference`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstantReference {
    pub kind: RefKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    pub kind: ReferenceKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

/// A `CONSTANT_Dynamic` or `CONSTANT_InvokeDynamic` entry with its bootstrap
/// method resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDynamic {
    pub name: String,
    pub descriptor: String,
    pub bootstrap_method: Handle,
    pub bootstrap_arguments: Vec<ConstantValue>,
    /// Index into the `BootstrapMethods` table.
    pub bootstrap_method_index: u16,
}

/// A loadable constant.
#[derive(Debug, Clone)]
pub enum ConstantValue {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    /// A class literal, as an internal name or array descriptor.
    Class(String),
    String(String),
    MethodHandle(Handle),
    /// A method type, as a method descriptor.
    MethodType(String),
    Dynamic(Box<ConstantDynamic>),
}

impl PartialEq for ConstantValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstantValue::Utf8(a), ConstantValue::Utf8(b)) => a == b,
            (ConstantValue::Integer(a), ConstantValue::Integer(b)) => a == b,
            (ConstantValue::Float(a), ConstantValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::Long(a), ConstantValue::Long(b)) => a == b,
            (ConstantValue::Double(a), ConstantValue::Double(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::Class(a), ConstantValue::Class(b)) => a == b,
            (ConstantValue::String(a), ConstantValue::String(b)) => a == b,
            (ConstantValue::MethodHandle(a), ConstantValue::MethodHandle(b)) => a == b,
            (ConstantValue::MethodType(a), ConstantValue::MethodType(b)) => a == b,
            (ConstantValue::Dynamic(a), ConstantValue::Dynamic(b)) => a == b,
            _ => false,
        }
    }
}
