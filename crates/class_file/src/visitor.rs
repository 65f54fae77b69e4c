//! Push traversal of a resolved [`Class`].
//!
//! Calls arrive in this order:
//!
//! ```text
//! visit [visit_source] [visit_module] [visit_nest_host] [visit_outer_class]
//! (visit_annotation | visit_attribute)*
//! (visit_nest_member | visit_permitted_subclass | visit_inner_class | visit_field | visit_method)*
//! visit_end
//! ```
//!
//! Sub-visitors are borrowed from their parent, so a parent can only be
//! called again once the child bracket has been closed with `visit_end`.

use crate::{
    attributes::{Annotation, CodeAttribute, ElementValue, InnerClass, Module, OpaqueAttribute},
    constant::ConstantValue,
    model::{Class, Field, Method},
    AccessFlags, ClassFileError, Result,
};

/// Where a class traversal currently is. Every call moves the traversal
/// forward; only annotations and members may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Start,
    Header,
    Source,
    Module,
    NestHost,
    OuterClass,
    Annotations,
    Members,
    End,
}

impl Phase {
    pub fn advance(&mut self, next: Phase) -> Result<()> {
        let allowed = match (*self, next) {
            (Phase::Start, next) => next == Phase::Header,
            (Phase::End, _) => false,
            (current, next) if current == next => {
                matches!(current, Phase::Annotations | Phase::Members)
            }
            (current, next) => next > current,
        };
        if !allowed {
            return Err(ClassFileError::VisitOrder {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassHeader<'a> {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: AccessFlags,
    pub name: &'a str,
    pub signature: Option<&'a str>,
    pub super_name: Option<&'a str>,
    pub interfaces: &'a [String],
    pub deprecated: bool,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldHeader<'a> {
    pub access_flags: AccessFlags,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub signature: Option<&'a str>,
    pub value: Option<&'a ConstantValue>,
    pub deprecated: bool,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MethodHeader<'a> {
    pub access_flags: AccessFlags,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub signature: Option<&'a str>,
    pub exceptions: &'a [String],
    pub deprecated: bool,
    pub synthetic: bool,
}

#[allow(unused_variables)]
pub trait ClassVisitor {
    fn visit(&mut self, header: &ClassHeader) {}

    fn visit_source(&mut self, source: Option<&str>, debug: Option<&str>) {}

    fn visit_module(
        &mut self,
        name: &str,
        access_flags: AccessFlags,
        version: Option<&str>,
    ) -> Option<&mut dyn ModuleVisitor> {
        None
    }

    fn visit_nest_host(&mut self, nest_host: &str) {}

    fn visit_outer_class(&mut self, owner: &str, name: Option<&str>, descriptor: Option<&str>) {}

    fn visit_annotation(
        &mut self,
        descriptor: &str,
        visible: bool,
    ) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_attribute(&mut self, attribute: &OpaqueAttribute) {}

    fn visit_nest_member(&mut self, nest_member: &str) {}

    fn visit_permitted_subclass(&mut self, permitted_subclass: &str) {}

    fn visit_inner_class(&mut self, inner_class: &InnerClass) {}

    fn visit_field(&mut self, header: &FieldHeader) -> Option<&mut dyn FieldVisitor> {
        None
    }

    fn visit_method(&mut self, header: &MethodHeader) -> Option<&mut dyn MethodVisitor> {
        None
    }

    fn visit_end(&mut self) {}
}

#[allow(unused_variables)]
pub trait ModuleVisitor {
    fn visit_main_class(&mut self, main_class: &str) {}

    fn visit_package(&mut self, package: &str) {}

    fn visit_require(&mut self, module: &str, access_flags: AccessFlags, version: Option<&str>) {}

    fn visit_export(&mut self, package: &str, access_flags: AccessFlags, modules: &[String]) {}

    fn visit_open(&mut self, package: &str, access_flags: AccessFlags, modules: &[String]) {}

    fn visit_use(&mut self, service: &str) {}

    fn visit_provide(&mut self, service: &str, providers: &[String]) {}

    fn visit_end(&mut self) {}
}

/// Receives the element values of one annotation or one array. `name` is
/// `None` for array elements and for an annotation default.
#[allow(unused_variables)]
pub trait AnnotationVisitor {
    /// A primitive, string or class literal value.
    fn visit(&mut self, name: Option<&str>, value: &ElementValue) {}

    fn visit_enum(&mut self, name: Option<&str>, descriptor: &str, value: &str) {}

    fn visit_annotation(
        &mut self,
        name: Option<&str>,
        descriptor: &str,
    ) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_array(&mut self, name: Option<&str>) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_end(&mut self) {}
}

#[allow(unused_variables)]
pub trait FieldVisitor {
    fn visit_annotation(
        &mut self,
        descriptor: &str,
        visible: bool,
    ) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_attribute(&mut self, attribute: &OpaqueAttribute) {}

    fn visit_end(&mut self) {}
}

#[allow(unused_variables)]
pub trait MethodVisitor {
    fn visit_parameter(&mut self, name: Option<&str>, access_flags: AccessFlags) {}

    fn visit_annotation_default(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_annotation(
        &mut self,
        descriptor: &str,
        visible: bool,
    ) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_parameter_annotation(
        &mut self,
        parameter: usize,
        descriptor: &str,
        visible: bool,
    ) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit_attribute(&mut self, attribute: &OpaqueAttribute) {}

    fn visit_code(&mut self, code: &CodeAttribute) {}

    fn visit_end(&mut self) {}
}

impl Class {
    /// Drive `visitor` through this class.
    pub fn accept(&self, visitor: &mut dyn ClassVisitor) -> Result<()> {
        let mut phase = Phase::Start;

        phase.advance(Phase::Header)?;
        visitor.visit(&ClassHeader {
            minor_version: self.minor_version,
            major_version: self.major_version,
            access_flags: self.access_flags,
            name: &self.name,
            signature: self.signature.as_deref(),
            super_name: self.super_name.as_deref(),
            interfaces: &self.interfaces,
            deprecated: self.deprecated,
            synthetic: self.synthetic,
        });

        if self.source_file.is_some() || self.source_debug_extension.is_some() {
            phase.advance(Phase::Source)?;
            visitor.visit_source(
                self.source_file.as_deref(),
                self.source_debug_extension.as_deref(),
            );
        }

        if let Some(module) = &self.module {
            phase.advance(Phase::Module)?;
            if let Some(module_visitor) =
                visitor.visit_module(&module.name, module.access_flags, module.version.as_deref())
            {
                accept_module(module, module_visitor);
            }
        }

        if let Some(nest_host) = &self.nest_host {
            phase.advance(Phase::NestHost)?;
            visitor.visit_nest_host(nest_host);
        }

        if let Some(outer_class) = &self.outer_class {
            phase.advance(Phase::OuterClass)?;
            let (name, descriptor) = match &outer_class.method {
                Some((name, descriptor)) => (Some(name.as_str()), Some(descriptor.as_str())),
                None => (None, None),
            };
            visitor.visit_outer_class(&outer_class.owner, name, descriptor);
        }

        for annotation in self.annotations() {
            phase.advance(Phase::Annotations)?;
            if let Some(annotation_visitor) =
                visitor.visit_annotation(&annotation.descriptor, annotation.visible)
            {
                accept_annotation(annotation, annotation_visitor);
            }
        }
        for attribute in &self.attributes {
            phase.advance(Phase::Annotations)?;
            visitor.visit_attribute(attribute);
        }

        for nest_member in &self.nest_members {
            phase.advance(Phase::Members)?;
            visitor.visit_nest_member(nest_member);
        }
        for permitted_subclass in &self.permitted_subclasses {
            phase.advance(Phase::Members)?;
            visitor.visit_permitted_subclass(permitted_subclass);
        }
        for inner_class in &self.inner_classes {
            phase.advance(Phase::Members)?;
            visitor.visit_inner_class(inner_class);
        }
        for field in &self.fields {
            phase.advance(Phase::Members)?;
            if let Some(field_visitor) = visitor.visit_field(&field.header()) {
                accept_field(field, field_visitor);
            }
        }
        for method in &self.methods {
            phase.advance(Phase::Members)?;
            if let Some(method_visitor) = visitor.visit_method(&method.header()) {
                accept_method(method, method_visitor);
            }
        }

        phase.advance(Phase::End)?;
        visitor.visit_end();
        Ok(())
    }
}

impl Field {
    pub fn header(&self) -> FieldHeader<'_> {
        FieldHeader {
            access_flags: self.access_flags,
            name: &self.name,
            descriptor: &self.descriptor,
            signature: self.signature.as_deref(),
            value: self.constant_value.as_ref(),
            deprecated: self.deprecated,
            synthetic: self.synthetic,
        }
    }
}

impl Method {
    pub fn header(&self) -> MethodHeader<'_> {
        MethodHeader {
            access_flags: self.access_flags,
            name: &self.name,
            descriptor: &self.descriptor,
            signature: self.signature.as_deref(),
            exceptions: &self.exceptions,
            deprecated: self.deprecated,
            synthetic: self.synthetic,
        }
    }
}

fn accept_module(module: &Module, visitor: &mut dyn ModuleVisitor) {
    if let Some(main_class) = &module.main_class {
        visitor.visit_main_class(main_class);
    }
    for package in &module.packages {
        visitor.visit_package(package);
    }
    for require in &module.requires {
        visitor.visit_require(&require.module, require.access_flags, require.version.as_deref());
    }
    for export in &module.exports {
        visitor.visit_export(&export.package, export.access_flags, &export.modules);
    }
    for open in &module.opens {
        visitor.visit_open(&open.package, open.access_flags, &open.modules);
    }
    for service in &module.uses {
        visitor.visit_use(service);
    }
    for provide in &module.provides {
        visitor.visit_provide(&provide.service, &provide.providers);
    }
    visitor.visit_end();
}

fn accept_field(field: &Field, visitor: &mut dyn FieldVisitor) {
    let annotations = field
        .visible_annotations
        .iter()
        .chain(field.invisible_annotations.iter());
    for annotation in annotations {
        if let Some(annotation_visitor) =
            visitor.visit_annotation(&annotation.descriptor, annotation.visible)
        {
            accept_annotation(annotation, annotation_visitor);
        }
    }
    for attribute in &field.attributes {
        visitor.visit_attribute(attribute);
    }
    visitor.visit_end();
}

fn accept_method(method: &Method, visitor: &mut dyn MethodVisitor) {
    for parameter in &method.parameters {
        visitor.visit_parameter(parameter.name.as_deref(), parameter.access_flags);
    }
    if let Some(default) = &method.annotation_default {
        if let Some(annotation_visitor) = visitor.visit_annotation_default() {
            accept_element_value(None, default, annotation_visitor);
            annotation_visitor.visit_end();
        }
    }

    let annotations = method
        .visible_annotations
        .iter()
        .chain(method.invisible_annotations.iter());
    for annotation in annotations {
        if let Some(annotation_visitor) =
            visitor.visit_annotation(&annotation.descriptor, annotation.visible)
        {
            accept_annotation(annotation, annotation_visitor);
        }
    }

    for (parameter, annotations) in method
        .visible_parameter_annotations
        .iter()
        .enumerate()
        .chain(method.invisible_parameter_annotations.iter().enumerate())
    {
        for annotation in annotations {
            if let Some(annotation_visitor) = visitor.visit_parameter_annotation(
                parameter,
                &annotation.descriptor,
                annotation.visible,
            ) {
                accept_annotation(annotation, annotation_visitor);
            }
        }
    }

    for attribute in &method.attributes {
        visitor.visit_attribute(attribute);
    }
    if let Some(code) = &method.code {
        visitor.visit_code(code);
    }
    visitor.visit_end();
}

fn accept_annotation(annotation: &Annotation, visitor: &mut dyn AnnotationVisitor) {
    for (name, value) in &annotation.values {
        accept_element_value(Some(name), value, visitor);
    }
    visitor.visit_end();
}

fn accept_element_value(name: Option<&str>, value: &ElementValue, visitor: &mut dyn AnnotationVisitor) {
    match value {
        ElementValue::Enum {
            descriptor,
            name: constant,
        } => visitor.visit_enum(name, descriptor, constant),
        ElementValue::Annotation(annotation) => {
            if let Some(nested) = visitor.visit_annotation(name, &annotation.descriptor) {
                accept_annotation(annotation, nested);
            }
        }
        ElementValue::Array(values) => {
            if let Some(array) = visitor.visit_array(name) {
                for value in values {
                    accept_element_value(None, value, array);
                }
                array.visit_end();
            }
        }
        _ => visitor.visit(name, value),
    }
}

#[cfg(test)]
mod phase_tests {
    use super::*;

    #[test]
    fn it_should_start_with_the_header() {
        let mut phase = Phase::Start;
        assert!(phase.advance(Phase::Source).is_err());
        assert!(phase.advance(Phase::Header).is_ok());
        assert_eq!(phase, Phase::Header);
    }

    #[test]
    fn it_should_allow_skipping_optional_phases() {
        let mut phase = Phase::Start;
        phase.advance(Phase::Header).unwrap();
        phase.advance(Phase::OuterClass).unwrap();
        phase.advance(Phase::End).unwrap();
    }

    #[test]
    fn it_should_only_repeat_annotations_and_members() {
        let mut phase = Phase::Start;
        phase.advance(Phase::Header).unwrap();
        assert!(phase.advance(Phase::Header).is_err());

        phase.advance(Phase::Annotations).unwrap();
        phase.advance(Phase::Annotations).unwrap();
        phase.advance(Phase::Members).unwrap();
        phase.advance(Phase::Members).unwrap();
    }

    #[test]
    fn it_should_reject_going_backwards() {
        let mut phase = Phase::Start;
        phase.advance(Phase::Header).unwrap();
        phase.advance(Phase::Members).unwrap();
        match phase.advance(Phase::Annotations) {
            Err(ClassFileError::VisitOrder { from, to }) => {
                assert_eq!(from, Phase::Members);
                assert_eq!(to, Phase::Annotations);
            }
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(phase, Phase::Members);
    }

    #[test]
    fn it_should_reject_everything_after_the_end() {
        let mut phase = Phase::Start;
        phase.advance(Phase::Header).unwrap();
        phase.advance(Phase::End).unwrap();
        assert!(phase.advance(Phase::End).is_err());
        assert!(phase.advance(Phase::Members).is_err());
    }
}

#[cfg(test)]
mod accept_tests {
    use super::*;
    use crate::attributes::{EnclosingMethod, ModuleRequire};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl ClassVisitor for Recorder {
        fn visit(&mut self, header: &ClassHeader) {
            self.calls.push(format!("visit {}", header.name));
        }

        fn visit_source(&mut self, source: Option<&str>, _debug: Option<&str>) {
            self.calls.push(format!("source {}", source.unwrap_or("-")));
        }

        fn visit_module(
            &mut self,
            name: &str,
            _access_flags: AccessFlags,
            _version: Option<&str>,
        ) -> Option<&mut dyn ModuleVisitor> {
            self.calls.push(format!("module {}", name));
            Some(self)
        }

        fn visit_nest_host(&mut self, nest_host: &str) {
            self.calls.push(format!("nest host {}", nest_host));
        }

        fn visit_outer_class(&mut self, owner: &str, _name: Option<&str>, _descriptor: Option<&str>) {
            self.calls.push(format!("outer class {}", owner));
        }

        fn visit_annotation(
            &mut self,
            descriptor: &str,
            _visible: bool,
        ) -> Option<&mut dyn AnnotationVisitor> {
            self.calls.push(format!("annotation {}", descriptor));
            Some(self)
        }

        fn visit_attribute(&mut self, attribute: &OpaqueAttribute) {
            self.calls.push(format!("attribute {}", attribute.name));
        }

        fn visit_nest_member(&mut self, nest_member: &str) {
            self.calls.push(format!("nest member {}", nest_member));
        }

        fn visit_field(&mut self, header: &FieldHeader) -> Option<&mut dyn FieldVisitor> {
            self.calls.push(format!("field {}", header.name));
            None
        }

        fn visit_method(&mut self, header: &MethodHeader) -> Option<&mut dyn MethodVisitor> {
            self.calls.push(format!("method {}", header.name));
            None
        }

        fn visit_end(&mut self) {
            self.calls.push("end".to_owned());
        }
    }

    impl ModuleVisitor for Recorder {
        fn visit_require(&mut self, module: &str, _access_flags: AccessFlags, _version: Option<&str>) {
            self.calls.push(format!("  require {}", module));
        }

        fn visit_end(&mut self) {
            self.calls.push("  module end".to_owned());
        }
    }

    impl AnnotationVisitor for Recorder {
        fn visit(&mut self, name: Option<&str>, value: &ElementValue) {
            self.calls
                .push(format!("  {}={:?}", name.unwrap_or("_"), value));
        }

        fn visit_array(&mut self, name: Option<&str>) -> Option<&mut dyn AnnotationVisitor> {
            self.calls.push(format!("  array {}", name.unwrap_or("_")));
            Some(self)
        }

        fn visit_end(&mut self) {
            self.calls.push("  annotation end".to_owned());
        }
    }

    fn class() -> Class {
        Class {
            name: "Outer$Inner".to_owned(),
            super_name: Some("java/lang/Object".to_owned()),
            source_file: Some("Outer.java".to_owned()),
            nest_host: Some("Outer".to_owned()),
            outer_class: Some(EnclosingMethod {
                owner: "Outer".to_owned(),
                method: None,
            }),
            visible_annotations: vec![Annotation {
                descriptor: "LMarker;".to_owned(),
                visible: true,
                values: vec![(
                    "value".to_owned(),
                    ElementValue::Array(vec![ElementValue::Int(1)]),
                )],
            }],
            attributes: vec![OpaqueAttribute {
                name: "Custom".to_owned(),
                info: vec![1, 2, 3],
            }],
            fields: vec![Field {
                name: "x".to_owned(),
                descriptor: "I".to_owned(),
                ..Field::default()
            }],
            methods: vec![Method {
                name: "<init>".to_owned(),
                descriptor: "()V".to_owned(),
                ..Method::default()
            }],
            ..Class::default()
        }
    }

    #[test]
    fn it_should_visit_in_order() {
        let mut recorder = Recorder::default();
        class().accept(&mut recorder).unwrap();
        assert_eq!(
            recorder.calls,
            vec![
                "visit Outer$Inner",
                "source Outer.java",
                "nest host Outer",
                "outer class Outer",
                "annotation LMarker;",
                "  array value",
                "  _=Int(1)",
                "  annotation end",
                "  annotation end",
                "attribute Custom",
                "field x",
                "method <init>",
                "end",
            ]
        );
    }

    #[test]
    fn it_should_bracket_the_module() {
        let mut class = Class {
            name: "module-info".to_owned(),
            module: Some(Module {
                name: "m".to_owned(),
                requires: vec![ModuleRequire {
                    module: "java.base".to_owned(),
                    access_flags: AccessFlags::MANDATED,
                    version: None,
                }],
                ..Module::default()
            }),
            ..Class::default()
        };
        class.nest_members.push("m/Nested".to_owned());

        let mut recorder = Recorder::default();
        class.accept(&mut recorder).unwrap();
        assert_eq!(
            recorder.calls,
            vec![
                "visit module-info",
                "module m",
                "  require java.base",
                "  module end",
                "nest member m/Nested",
                "end",
            ]
        );
    }
}
