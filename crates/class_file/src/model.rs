//! The resolved view of a class: names instead of constant pool indices and
//! typed values instead of attribute payloads.

use crate::{
    attributes::{
        Annotation, BootstrapMethod, CodeAttribute, ElementValue, EnclosingMethod, InnerClass,
        MethodParameter, Module, OpaqueAttribute,
    },
    constant::ConstantValue,
    AccessFlags,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Class {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: AccessFlags,
    pub name: String,
    /// `None` only for the root of the class hierarchy and for `module-info`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    pub source_file: Option<String>,
    pub source_debug_extension: Option<String>,
    pub deprecated: bool,
    pub synthetic: bool,
    pub module: Option<Module>,
    pub nest_host: Option<String>,
    pub outer_class: Option<EnclosingMethod>,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
    pub nest_members: Vec<String>,
    pub permitted_subclasses: Vec<String>,
    pub inner_classes: Vec<InnerClass>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<OpaqueAttribute>,
}

impl Class {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.visible_annotations
            .iter()
            .chain(self.invisible_annotations.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    pub access_flags: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub constant_value: Option<ConstantValue>,
    pub deprecated: bool,
    pub synthetic: bool,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
    pub attributes: Vec<OpaqueAttribute>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Method {
    pub access_flags: AccessFlags,
    pub name: String,
    pub descriptor: String,
    /// Derived from `descriptor`. Empty when the descriptor is malformed.
    pub parameter_descriptors: Vec<String>,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub parameters: Vec<MethodParameter>,
    pub deprecated: bool,
    pub synthetic: bool,
    pub annotation_default: Option<ElementValue>,
    pub visible_annotations: Vec<Annotation>,
    pub invisible_annotations: Vec<Annotation>,
    pub visible_parameter_annotations: Vec<Vec<Annotation>>,
    pub invisible_parameter_annotations: Vec<Vec<Annotation>>,
    pub code: Option<CodeAttribute>,
    pub attributes: Vec<OpaqueAttribute>,
}

impl Method {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }
}
