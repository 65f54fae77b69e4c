use std::{collections::HashSet, io::Read};

use crate::{
    attributes::{self, AttributeKind, Attributes, DecodedAttribute, OpaqueAttribute},
    class_file::{FieldInfo, MethodInfo},
    descriptor,
    model::{Class, Field, Method},
    visitor::ClassVisitor,
    ClassEncoder, ClassFile, ClassFileError, RawBootstrapMethod, Resolver, Result,
};

/// What to do with an attribute whose payload cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeErrorPolicy {
    /// Fail the whole read.
    Strict,
    /// Keep the attribute as an [`OpaqueAttribute`] and record a diagnostic.
    Opaque,
    /// Leave the attribute out of the model and record a diagnostic holding
    /// its bytes.
    Collect,
}

impl Default for AttributeErrorPolicy {
    fn default() -> Self {
        AttributeErrorPolicy::Opaque
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    pub attribute_errors: AttributeErrorPolicy,
}

/// An attribute that could not be decoded.
#[derive(Debug)]
pub struct Diagnostic {
    /// `class`, `field <name> <descriptor>`, `method <name><descriptor>`, or
    /// `code of method <name><descriptor>` for attributes nested in `Code`.
    pub location: String,
    /// The attribute name, or `#<index>` when the name itself did not resolve.
    pub attribute: String,
    pub info: Vec<u8>,
    pub error: ClassFileError,
}

/// Reads a class file into a resolved [`Class`].
#[derive(Debug)]
pub struct ClassReader {
    class_file: ClassFile,
    bootstrap_methods: Vec<RawBootstrapMethod>,
    class: Class,
    diagnostics: Vec<Diagnostic>,
}

impl ClassReader {
    pub fn new(r: impl Read) -> Result<Self> {
        Self::with_options(r, ReaderOptions::default())
    }

    pub fn with_options(r: impl Read, options: ReaderOptions) -> Result<Self> {
        Self::from_class_file(ClassFile::parse(r)?, options)
    }

    pub fn from_class_file(class_file: ClassFile, options: ReaderOptions) -> Result<Self> {
        // Dynamic constants need the bootstrap method table before any
        // attribute that refers to them is decoded.
        let bootstrap_methods = match class_file
            .attributes
            .find_by_name(attributes::BOOTSTRAP_METHODS, &class_file.constant_pool)
        {
            Some(attribute) => match attributes::parse_raw_bootstrap_methods(&attribute.info) {
                Ok(methods) => methods,
                Err(e) => {
                    log::warn!("Unable to read the bootstrap method table: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let (class, diagnostics) = {
            let resolver = Resolver::new(&class_file.constant_pool)
                .with_bootstrap_methods(bootstrap_methods.clone());
            let mut decoder = Decoder {
                resolver,
                options,
                diagnostics: Vec::new(),
            };
            let class = decoder.class(&class_file)?;
            (class, decoder.diagnostics)
        };

        log::debug!(
            "Read class {} with {} fields, {} methods and {} diagnostics",
            class.name,
            class.fields.len(),
            class.methods.len(),
            diagnostics.len()
        );

        Ok(Self {
            class_file,
            bootstrap_methods,
            class,
            diagnostics,
        })
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn into_class(self) -> Class {
        self.class
    }

    pub fn raw(&self) -> &ClassFile {
        &self.class_file
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.class_file.constant_pool)
            .with_bootstrap_methods(self.bootstrap_methods.clone())
    }

    pub fn accept(&self, visitor: &mut dyn ClassVisitor) -> Result<()> {
        self.class.accept(visitor)
    }

    /// Lower the resolved class back to raw records, reusing the positions
    /// of the constant pool it was read from.
    pub fn encode(&self) -> Result<ClassFile> {
        ClassEncoder::with_constant_pool(self.class_file.constant_pool.clone()).encode(&self.class)
    }
}

struct Decoded<'b> {
    name: String,
    info: &'b [u8],
    value: DecodedAttribute,
}

impl Decoded<'_> {
    fn into_opaque(self) -> OpaqueAttribute {
        OpaqueAttribute {
            name: self.name,
            info: self.info.to_vec(),
        }
    }
}

struct Decoder<'a> {
    resolver: Resolver<'a>,
    options: ReaderOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Decoder<'a> {
    fn class(&mut self, class_file: &ClassFile) -> Result<Class> {
        let resolver = &self.resolver;
        let name = resolver.resolve_class_name(class_file.this_class)?.to_owned();
        let super_name = match class_file.super_class {
            0 => None,
            index => Some(resolver.resolve_class_name(index)?.to_owned()),
        };
        let interfaces = class_file
            .interfaces
            .iter()
            .map(|&index| Ok(resolver.resolve_class_name(index)?.to_owned()))
            .collect::<Result<Vec<_>>>()?;

        let mut class = Class {
            minor_version: class_file.minor_version,
            major_version: class_file.major_version,
            access_flags: class_file.access_flags,
            name,
            super_name,
            interfaces,
            ..Class::default()
        };

        let mut packages = None;
        let mut main_class = None;
        for decoded in self.attributes("class", &class_file.attributes)? {
            match decoded.value {
                DecodedAttribute::SourceFile(source_file) => class.source_file = Some(source_file),
                DecodedAttribute::SourceDebugExtension(debug) => {
                    class.source_debug_extension = Some(debug)
                }
                DecodedAttribute::Signature(signature) => class.signature = Some(signature),
                DecodedAttribute::Deprecated => class.deprecated = true,
                DecodedAttribute::Synthetic => class.synthetic = true,
                DecodedAttribute::Module(module) => class.module = Some(module),
                DecodedAttribute::ModulePackages(_) => packages = Some(decoded),
                DecodedAttribute::ModuleMainClass(_) => main_class = Some(decoded),
                DecodedAttribute::NestHost(nest_host) => class.nest_host = Some(nest_host),
                DecodedAttribute::NestMembers(nest_members) => class.nest_members = nest_members,
                DecodedAttribute::PermittedSubclasses(permitted_subclasses) => {
                    class.permitted_subclasses = permitted_subclasses
                }
                DecodedAttribute::InnerClasses(inner_classes) => {
                    class.inner_classes = inner_classes
                }
                DecodedAttribute::EnclosingMethod(outer_class) => {
                    class.outer_class = Some(outer_class)
                }
                DecodedAttribute::Annotations {
                    visible: true,
                    annotations,
                } => class.visible_annotations = annotations,
                DecodedAttribute::Annotations {
                    visible: false,
                    annotations,
                } => class.invisible_annotations = annotations,
                DecodedAttribute::BootstrapMethods(bootstrap_methods) => {
                    class.bootstrap_methods = bootstrap_methods
                }
                DecodedAttribute::Opaque(opaque) => class.attributes.push(opaque),
                _ => class.attributes.push(decoded.into_opaque()),
            }
        }

        // ModulePackages and ModuleMainClass only mean something next to a
        // Module attribute.
        for decoded in packages.into_iter().chain(main_class) {
            match (class.module.as_mut(), decoded.value) {
                (Some(module), DecodedAttribute::ModulePackages(packages)) => {
                    module.packages = packages
                }
                (Some(module), DecodedAttribute::ModuleMainClass(main_class)) => {
                    module.main_class = Some(main_class)
                }
                (_, value) => class.attributes.push(
                    Decoded {
                        value,
                        ..decoded
                    }
                    .into_opaque(),
                ),
            }
        }

        class.fields = class_file
            .fields
            .iter()
            .map(|field| self.field(field))
            .collect::<Result<_>>()?;
        class.methods = class_file
            .methods
            .iter()
            .map(|method| self.method(method))
            .collect::<Result<_>>()?;
        Ok(class)
    }

    fn field(&mut self, field_info: &FieldInfo) -> Result<Field> {
        let mut field = Field {
            access_flags: field_info.access_flags,
            name: self.resolver.resolve_utf8(field_info.name_index)?.to_owned(),
            descriptor: self
                .resolver
                .resolve_utf8(field_info.descriptor_index)?
                .to_owned(),
            ..Field::default()
        };

        if !descriptor::is_field_descriptor(&field.descriptor) {
            log::warn!("Field {}: invalid descriptor {}", field.name, field.descriptor);
        }

        let location = format!("field {} {}", field.name, field.descriptor);
        for decoded in self.attributes(&location, &field_info.attributes)? {
            match decoded.value {
                DecodedAttribute::ConstantValue(value) => field.constant_value = Some(value),
                DecodedAttribute::Signature(signature) => field.signature = Some(signature),
                DecodedAttribute::Deprecated => field.deprecated = true,
                DecodedAttribute::Synthetic => field.synthetic = true,
                DecodedAttribute::Annotations {
                    visible: true,
                    annotations,
                } => field.visible_annotations = annotations,
                DecodedAttribute::Annotations {
                    visible: false,
                    annotations,
                } => field.invisible_annotations = annotations,
                DecodedAttribute::Opaque(opaque) => field.attributes.push(opaque),
                _ => field.attributes.push(decoded.into_opaque()),
            }
        }
        Ok(field)
    }

    fn method(&mut self, method_info: &MethodInfo) -> Result<Method> {
        let name = self.resolver.resolve_utf8(method_info.name_index)?.to_owned();
        let descriptor = self
            .resolver
            .resolve_utf8(method_info.descriptor_index)?
            .to_owned();
        let parameter_descriptors = descriptor::parameter_descriptors(&descriptor)
            .unwrap_or_else(|e| {
                log::warn!("Method {}: {}", name, e);
                Vec::new()
            });
        let mut method = Method {
            access_flags: method_info.access_flags,
            name,
            descriptor,
            parameter_descriptors,
            ..Method::default()
        };

        let location = format!("method {}{}", method.name, method.descriptor);
        for decoded in self.attributes(&location, &method_info.attributes)? {
            match decoded.value {
                DecodedAttribute::Code {
                    mut code,
                    attributes,
                } => {
                    code.attributes = self
                        .attributes(&format!("code of {}", location), &attributes)?
                        .into_iter()
                        .map(Decoded::into_opaque)
                        .collect();
                    method.code = Some(code);
                }
                DecodedAttribute::Exceptions(exceptions) => method.exceptions = exceptions,
                DecodedAttribute::MethodParameters(parameters) => method.parameters = parameters,
                DecodedAttribute::Signature(signature) => method.signature = Some(signature),
                DecodedAttribute::Deprecated => method.deprecated = true,
                DecodedAttribute::Synthetic => method.synthetic = true,
                DecodedAttribute::AnnotationDefault(value) => {
                    method.annotation_default = Some(value)
                }
                DecodedAttribute::Annotations {
                    visible: true,
                    annotations,
                } => method.visible_annotations = annotations,
                DecodedAttribute::Annotations {
                    visible: false,
                    annotations,
                } => method.invisible_annotations = annotations,
                DecodedAttribute::ParameterAnnotations {
                    visible: true,
                    parameters,
                } => method.visible_parameter_annotations = parameters,
                DecodedAttribute::ParameterAnnotations {
                    visible: false,
                    parameters,
                } => method.invisible_parameter_annotations = parameters,
                DecodedAttribute::Opaque(opaque) => method.attributes.push(opaque),
                _ => method.attributes.push(decoded.into_opaque()),
            }
        }
        Ok(method)
    }

    /// Decode every attribute of one class, field or method. A repeated
    /// attribute name is only decoded the first time; the repeats are kept
    /// opaque.
    fn attributes<'b>(
        &mut self,
        location: &str,
        attributes: &'b Attributes,
    ) -> Result<Vec<Decoded<'b>>> {
        let mut seen = HashSet::new();
        let mut decoded = Vec::with_capacity(attributes.0.len());

        for attribute in &attributes.0 {
            let info = attribute.info.as_slice();
            let name = match self.resolver.resolve_utf8(attribute.attribute_name_index) {
                Ok(name) => name,
                Err(e) => {
                    let name = format!("#{}", attribute.attribute_name_index);
                    self.contain(location, &name, info, e)?;
                    continue;
                }
            };

            let kind = AttributeKind::from_name(name);
            let value = if kind.map_or(true, |kind| !seen.insert(kind)) {
                DecodedAttribute::Opaque(OpaqueAttribute {
                    name: name.to_owned(),
                    info: info.to_vec(),
                })
            } else {
                match attributes::decode(&self.resolver, name, info) {
                    Ok(value) => value,
                    Err(e) => {
                        if self.contain(location, name, info, e)? {
                            DecodedAttribute::Opaque(OpaqueAttribute {
                                name: name.to_owned(),
                                info: info.to_vec(),
                            })
                        } else {
                            continue;
                        }
                    }
                }
            };

            decoded.push(Decoded {
                name: name.to_owned(),
                info,
                value,
            });
        }
        Ok(decoded)
    }

    /// Apply the attribute error policy. Returns whether the attribute should
    /// be kept as an opaque attribute.
    fn contain(
        &mut self,
        location: &str,
        attribute: &str,
        info: &[u8],
        error: ClassFileError,
    ) -> Result<bool> {
        let policy = self.options.attribute_errors;
        if policy == AttributeErrorPolicy::Strict {
            return Err(error);
        }

        log::warn!("Skipping {} attribute of {}: {}", attribute, location, error);
        self.diagnostics.push(Diagnostic {
            location: location.to_owned(),
            attribute: attribute.to_owned(),
            info: info.to_vec(),
            error,
        });
        // An attribute whose name did not resolve cannot be written back.
        Ok(policy == AttributeErrorPolicy::Opaque && !attribute.starts_with('#'))
    }
}
