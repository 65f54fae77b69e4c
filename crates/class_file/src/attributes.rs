mod annotation;
mod bootstrap;
mod code;
mod module;
mod reader;
mod writer;

use std::convert::TryFrom;

use crate::{constant::ConstantValue, AccessFlags, Attribute, ClassFileError, ConstantPool, Resolver, Result};

pub use annotation::{Annotation, ElementValue, MAX_ANNOTATION_NESTING};
pub use bootstrap::BootstrapMethod;
pub use code::{CodeAttribute, ExceptionTableEntry};
pub use module::{Module, ModuleExport, ModuleProvide, ModuleRequire};

pub(crate) use bootstrap::parse_raw_bootstrap_methods;
use reader::AttributeReader;
use writer::AttributeWriter;

pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const CODE: &str = "Code";
pub const EXCEPTIONS: &str = "Exceptions";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const SYNTHETIC: &str = "Synthetic";
pub const SIGNATURE: &str = "Signature";
pub const SOURCE_FILE: &str = "SourceFile";
pub const SOURCE_DEBUG_EXTENSION: &str = "SourceDebugExtension";
pub const DEPRECATED: &str = "Deprecated";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
pub const METHOD_PARAMETERS: &str = "MethodParameters";
pub const MODULE: &str = "Module";
pub const MODULE_PACKAGES: &str = "ModulePackages";
pub const MODULE_MAIN_CLASS: &str = "ModuleMainClass";
pub const NEST_HOST: &str = "NestHost";
pub const NEST_MEMBERS: &str = "NestMembers";
pub const PERMITTED_SUBCLASSES: &str = "PermittedSubclasses";

/// The attributes this crate decodes into typed values. Any other name is
/// kept as an [`OpaqueAttribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    ConstantValue,
    Code,
    Exceptions,
    InnerClasses,
    EnclosingMethod,
    Synthetic,
    Signature,
    SourceFile,
    SourceDebugExtension,
    Deprecated,
    RuntimeVisibleAnnotations,
    RuntimeInvisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
    RuntimeInvisibleParameterAnnotations,
    AnnotationDefault,
    BootstrapMethods,
    MethodParameters,
    Module,
    ModulePackages,
    ModuleMainClass,
    NestHost,
    NestMembers,
    PermittedSubclasses,
}

impl AttributeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            CONSTANT_VALUE => AttributeKind::ConstantValue,
            CODE => AttributeKind::Code,
            EXCEPTIONS => AttributeKind::Exceptions,
            INNER_CLASSES => AttributeKind::InnerClasses,
            ENCLOSING_METHOD => AttributeKind::EnclosingMethod,
            SYNTHETIC => AttributeKind::Synthetic,
            SIGNATURE => AttributeKind::Signature,
            SOURCE_FILE => AttributeKind::SourceFile,
            SOURCE_DEBUG_EXTENSION => AttributeKind::SourceDebugExtension,
            DEPRECATED => AttributeKind::Deprecated,
            RUNTIME_VISIBLE_ANNOTATIONS => AttributeKind::RuntimeVisibleAnnotations,
            RUNTIME_INVISIBLE_ANNOTATIONS => AttributeKind::RuntimeInvisibleAnnotations,
            RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
                AttributeKind::RuntimeVisibleParameterAnnotations
            }
            RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                AttributeKind::RuntimeInvisibleParameterAnnotations
            }
            ANNOTATION_DEFAULT => AttributeKind::AnnotationDefault,
            BOOTSTRAP_METHODS => AttributeKind::BootstrapMethods,
            METHOD_PARAMETERS => AttributeKind::MethodParameters,
            MODULE => AttributeKind::Module,
            MODULE_PACKAGES => AttributeKind::ModulePackages,
            MODULE_MAIN_CLASS => AttributeKind::ModuleMainClass,
            NEST_HOST => AttributeKind::NestHost,
            NEST_MEMBERS => AttributeKind::NestMembers,
            PERMITTED_SUBCLASSES => AttributeKind::PermittedSubclasses,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| constant_pool.utf8(a.attribute_name_index).ok() == Some(name))
    }
}

/// An attribute kept as raw bytes, identified by its resolved name.
#[derive(Clone, PartialEq, Eq)]
pub struct OpaqueAttribute {
    pub name: String,
    pub info: Vec<u8>,
}
impl std::fmt::Debug for OpaqueAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaqueAttribute")
            .field("name", &self.name)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
    pub name: String,
    pub outer_name: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethod {
    pub owner: String,
    /// Name and descriptor of the enclosing method, if any.
    pub method: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
    pub name: Option<String>,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedAttribute {
    ConstantValue(ConstantValue),
    /// A method body with its own attribute table left undecoded.
    Code {
        code: CodeAttribute,
        attributes: Attributes,
    },
    Exceptions(Vec<String>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod(EnclosingMethod),
    Synthetic,
    Signature(String),
    SourceFile(String),
    SourceDebugExtension(String),
    Deprecated,
    Annotations {
        visible: bool,
        annotations: Vec<Annotation>,
    },
    ParameterAnnotations {
        visible: bool,
        parameters: Vec<Vec<Annotation>>,
    },
    AnnotationDefault(ElementValue),
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    Module(Module),
    ModulePackages(Vec<String>),
    ModuleMainClass(String),
    NestHost(String),
    NestMembers(Vec<String>),
    PermittedSubclasses(Vec<String>),
    Opaque(OpaqueAttribute),
}

/// Decode one attribute payload according to its name.
///
/// Any failure inside the payload is reported as
/// [`ClassFileError::MalformedAttribute`] with the offset where decoding
/// stopped.
pub fn decode(resolver: &Resolver, name: &str, info: &[u8]) -> Result<DecodedAttribute> {
    let kind = match AttributeKind::from_name(name) {
        Some(kind) => kind,
        None => {
            return Ok(DecodedAttribute::Opaque(OpaqueAttribute {
                name: name.to_owned(),
                info: info.to_vec(),
            }))
        }
    };

    log::trace!("Decoding {} attribute ({} bytes)", name, info.len());
    let mut r = AttributeReader::new(info, resolver);
    decode_kind(&mut r, kind)
        .and_then(|decoded| r.finish().map(|_| decoded))
        .map_err(|e| ClassFileError::MalformedAttribute {
            name: name.to_owned(),
            offset: r.position(),
            source: Box::new(e),
        })
}

fn decode_kind(r: &mut AttributeReader, kind: AttributeKind) -> Result<DecodedAttribute> {
    let decoded = match kind {
        AttributeKind::ConstantValue => DecodedAttribute::ConstantValue(r.constant_value()?),
        AttributeKind::Code => {
            let (code, attributes) = code::read_code(r)?;
            DecodedAttribute::Code { code, attributes }
        }
        AttributeKind::Exceptions => DecodedAttribute::Exceptions(r.list(|r| r.class_name())?),
        AttributeKind::InnerClasses => DecodedAttribute::InnerClasses(r.list(|r| {
            Ok(InnerClass {
                name: r.class_name()?,
                outer_name: r.optional_class_name()?,
                inner_name: r.optional_utf8()?,
                access_flags: AccessFlags::from_bits_truncate(r.read_u16()?),
            })
        })?),
        AttributeKind::EnclosingMethod => {
            let owner = r.class_name()?;
            let method = match r.read_u16()? {
                0 => None,
                index => {
                    let (name, descriptor) = r.resolver().resolve_name_and_type(index)?;
                    Some((name.to_owned(), descriptor.to_owned()))
                }
            };
            DecodedAttribute::EnclosingMethod(EnclosingMethod { owner, method })
        }
        AttributeKind::Synthetic => DecodedAttribute::Synthetic,
        AttributeKind::Signature => DecodedAttribute::Signature(r.utf8()?),
        AttributeKind::SourceFile => DecodedAttribute::SourceFile(r.utf8()?),
        AttributeKind::SourceDebugExtension => DecodedAttribute::SourceDebugExtension(
            crate::decode_modified_utf8(&r.read_rest()?),
        ),
        AttributeKind::Deprecated => DecodedAttribute::Deprecated,
        AttributeKind::RuntimeVisibleAnnotations
        | AttributeKind::RuntimeInvisibleAnnotations => {
            let visible = kind == AttributeKind::RuntimeVisibleAnnotations;
            DecodedAttribute::Annotations {
                visible,
                annotations: annotation::read_annotations(r, visible)?,
            }
        }
        AttributeKind::RuntimeVisibleParameterAnnotations
        | AttributeKind::RuntimeInvisibleParameterAnnotations => {
            let visible = kind == AttributeKind::RuntimeVisibleParameterAnnotations;
            DecodedAttribute::ParameterAnnotations {
                visible,
                parameters: annotation::read_parameter_annotations(r, visible)?,
            }
        }
        AttributeKind::AnnotationDefault => {
            DecodedAttribute::AnnotationDefault(annotation::read_element_value(r, true, 0)?)
        }
        AttributeKind::BootstrapMethods => {
            DecodedAttribute::BootstrapMethods(bootstrap::read_bootstrap_methods(r)?)
        }
        AttributeKind::MethodParameters => {
            let count = r.read_u8()?;
            let parameters = (0..count)
                .map(|_| -> Result<MethodParameter> {
                    Ok(MethodParameter {
                        name: r.optional_utf8()?,
                        access_flags: AccessFlags::from_bits_truncate(r.read_u16()?),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            DecodedAttribute::MethodParameters(parameters)
        }
        AttributeKind::Module => DecodedAttribute::Module(module::read_module(r)?),
        AttributeKind::ModulePackages => {
            DecodedAttribute::ModulePackages(module::read_module_packages(r)?)
        }
        AttributeKind::ModuleMainClass => DecodedAttribute::ModuleMainClass(r.class_name()?),
        AttributeKind::NestHost => DecodedAttribute::NestHost(r.class_name()?),
        AttributeKind::NestMembers => DecodedAttribute::NestMembers(r.list(|r| r.class_name())?),
        AttributeKind::PermittedSubclasses => {
            DecodedAttribute::PermittedSubclasses(r.list(|r| r.class_name())?)
        }
    };
    Ok(decoded)
}

/// Serialize a decoded attribute, interning every name and constant it refers
/// to into `pool`.
pub fn encode(pool: &mut ConstantPool, attribute: &DecodedAttribute) -> Result<Attribute> {
    let mut w = AttributeWriter::new(pool);
    let name = match attribute {
        DecodedAttribute::ConstantValue(value) => {
            w.constant_value(value)?;
            CONSTANT_VALUE
        }
        DecodedAttribute::Code { code, attributes } => {
            code::write_code(&mut w, code, attributes)?;
            CODE
        }
        DecodedAttribute::Exceptions(exceptions) => {
            w.list("exceptions", exceptions, |w, e| w.class_name(e))?;
            EXCEPTIONS
        }
        DecodedAttribute::InnerClasses(inner_classes) => {
            w.list("inner classes", inner_classes, |w, inner| {
                w.class_name(&inner.name)?;
                w.optional_class_name(inner.outer_name.as_deref())?;
                w.optional_utf8(inner.inner_name.as_deref())?;
                w.write_u16(inner.access_flags.bits())
            })?;
            INNER_CLASSES
        }
        DecodedAttribute::EnclosingMethod(enclosing) => {
            w.class_name(&enclosing.owner)?;
            match &enclosing.method {
                Some((name, descriptor)) => w.name_and_type(name, descriptor)?,
                None => w.write_u16(0)?,
            }
            ENCLOSING_METHOD
        }
        DecodedAttribute::Synthetic => SYNTHETIC,
        DecodedAttribute::Signature(signature) => {
            w.utf8(signature)?;
            SIGNATURE
        }
        DecodedAttribute::SourceFile(source_file) => {
            w.utf8(source_file)?;
            SOURCE_FILE
        }
        DecodedAttribute::SourceDebugExtension(debug) => {
            w.write_bytes(&crate::encode_modified_utf8(debug));
            SOURCE_DEBUG_EXTENSION
        }
        DecodedAttribute::Deprecated => DEPRECATED,
        DecodedAttribute::Annotations {
            visible,
            annotations,
        } => {
            annotation::write_annotations(&mut w, annotations)?;
            if *visible {
                RUNTIME_VISIBLE_ANNOTATIONS
            } else {
                RUNTIME_INVISIBLE_ANNOTATIONS
            }
        }
        DecodedAttribute::ParameterAnnotations {
            visible,
            parameters,
        } => {
            annotation::write_parameter_annotations(&mut w, parameters)?;
            if *visible {
                RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
            } else {
                RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS
            }
        }
        DecodedAttribute::AnnotationDefault(value) => {
            annotation::write_element_value(&mut w, value)?;
            ANNOTATION_DEFAULT
        }
        DecodedAttribute::BootstrapMethods(methods) => {
            bootstrap::write_bootstrap_methods(&mut w, methods)?;
            BOOTSTRAP_METHODS
        }
        DecodedAttribute::MethodParameters(parameters) => {
            let count = u8::try_from(parameters.len())
                .map_err(|_| ClassFileError::TooLarge("method parameters", parameters.len()))?;
            w.write_u8(count)?;
            for parameter in parameters {
                w.optional_utf8(parameter.name.as_deref())?;
                w.write_u16(parameter.access_flags.bits())?;
            }
            METHOD_PARAMETERS
        }
        DecodedAttribute::Module(module) => {
            module::write_module(&mut w, module)?;
            MODULE
        }
        DecodedAttribute::ModulePackages(packages) => {
            module::write_module_packages(&mut w, packages)?;
            MODULE_PACKAGES
        }
        DecodedAttribute::ModuleMainClass(main_class) => {
            w.class_name(main_class)?;
            MODULE_MAIN_CLASS
        }
        DecodedAttribute::NestHost(host) => {
            w.class_name(host)?;
            NEST_HOST
        }
        DecodedAttribute::NestMembers(members) => {
            w.list("nest members", members, |w, m| w.class_name(m))?;
            NEST_MEMBERS
        }
        DecodedAttribute::PermittedSubclasses(subclasses) => {
            w.list("permitted subclasses", subclasses, |w, s| w.class_name(s))?;
            PERMITTED_SUBCLASSES
        }
        DecodedAttribute::Opaque(opaque) => {
            w.write_bytes(&opaque.info);
            opaque.name.as_str()
        }
    };
    w.finish(name)
}
