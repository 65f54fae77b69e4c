use crate::{
    attributes::{self, Annotation, Attributes, DecodedAttribute, OpaqueAttribute},
    class_file::{FieldInfo, MethodInfo},
    model::{Class, Field, Method},
    Attribute, ClassFile, ConstantPool, Result,
};

/// Lowers a resolved [`Class`] back to raw records.
///
/// Entries are interned into the constant pool the encoder was created with;
/// an entry already present keeps its index.
#[derive(Debug, Default)]
pub struct ClassEncoder {
    constant_pool: ConstantPool,
}

impl ClassEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant_pool(constant_pool: ConstantPool) -> Self {
        Self { constant_pool }
    }

    pub fn encode(mut self, class: &Class) -> Result<ClassFile> {
        let pool = &mut self.constant_pool;

        let this_class = pool.add_class(&class.name)?;
        let super_class = match &class.super_name {
            Some(super_name) => pool.add_class(super_name)?,
            None => 0,
        };
        let interfaces = class
            .interfaces
            .iter()
            .map(|interface| pool.add_class(interface))
            .collect::<Result<Vec<_>>>()?;

        let fields = class
            .fields
            .iter()
            .map(|field| encode_field(pool, field))
            .collect::<Result<Vec<_>>>()?;
        let methods = class
            .methods
            .iter()
            .map(|method| encode_method(pool, method))
            .collect::<Result<Vec<_>>>()?;
        let attributes = encode_class_attributes(pool, class)?;

        log::debug!(
            "Encoded class {} into {} constant pool slots",
            class.name,
            self.constant_pool.len()
        );

        Ok(ClassFile {
            minor_version: class.minor_version,
            major_version: class.major_version,
            constant_pool: self.constant_pool,
            access_flags: class.access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

/// Collects the attributes of one class, field or method in a fixed order:
/// typed attributes first, opaque attributes last.
struct AttributeList<'p> {
    pool: &'p mut ConstantPool,
    attributes: Vec<Attribute>,
}

impl<'p> AttributeList<'p> {
    fn new(pool: &'p mut ConstantPool) -> Self {
        Self {
            pool,
            attributes: Vec::new(),
        }
    }

    fn push(&mut self, attribute: DecodedAttribute) -> Result<()> {
        let attribute = attributes::encode(&mut *self.pool, &attribute)?;
        self.attributes.push(attribute);
        Ok(())
    }

    fn push_if(&mut self, condition: bool, attribute: impl FnOnce() -> DecodedAttribute) -> Result<()> {
        if condition {
            self.push(attribute())?;
        }
        Ok(())
    }

    fn push_annotations(&mut self, visible: bool, annotations: &[Annotation]) -> Result<()> {
        self.push_if(!annotations.is_empty(), || DecodedAttribute::Annotations {
            visible,
            annotations: annotations.to_vec(),
        })
    }

    fn finish(mut self, opaque: &[OpaqueAttribute]) -> Result<Attributes> {
        for attribute in opaque {
            self.attributes.push(Attribute {
                attribute_name_index: self.pool.add_utf8(&attribute.name)?,
                info: attribute.info.clone(),
            });
        }
        Ok(Attributes(self.attributes))
    }
}

fn encode_class_attributes(pool: &mut ConstantPool, class: &Class) -> Result<Attributes> {
    let mut list = AttributeList::new(pool);

    if let Some(source_file) = &class.source_file {
        list.push(DecodedAttribute::SourceFile(source_file.clone()))?;
    }
    if let Some(debug) = &class.source_debug_extension {
        list.push(DecodedAttribute::SourceDebugExtension(debug.clone()))?;
    }
    if let Some(signature) = &class.signature {
        list.push(DecodedAttribute::Signature(signature.clone()))?;
    }
    list.push_if(class.deprecated, || DecodedAttribute::Deprecated)?;
    list.push_if(class.synthetic, || DecodedAttribute::Synthetic)?;

    if let Some(module) = &class.module {
        list.push(DecodedAttribute::Module(module.clone()))?;
        list.push_if(!module.packages.is_empty(), || {
            DecodedAttribute::ModulePackages(module.packages.clone())
        })?;
        if let Some(main_class) = &module.main_class {
            list.push(DecodedAttribute::ModuleMainClass(main_class.clone()))?;
        }
    }

    if let Some(nest_host) = &class.nest_host {
        list.push(DecodedAttribute::NestHost(nest_host.clone()))?;
    }
    list.push_if(!class.nest_members.is_empty(), || {
        DecodedAttribute::NestMembers(class.nest_members.clone())
    })?;
    list.push_if(!class.permitted_subclasses.is_empty(), || {
        DecodedAttribute::PermittedSubclasses(class.permitted_subclasses.clone())
    })?;
    list.push_if(!class.inner_classes.is_empty(), || {
        DecodedAttribute::InnerClasses(class.inner_classes.clone())
    })?;
    if let Some(outer_class) = &class.outer_class {
        list.push(DecodedAttribute::EnclosingMethod(outer_class.clone()))?;
    }

    list.push_annotations(true, &class.visible_annotations)?;
    list.push_annotations(false, &class.invisible_annotations)?;
    list.push_if(!class.bootstrap_methods.is_empty(), || {
        DecodedAttribute::BootstrapMethods(class.bootstrap_methods.clone())
    })?;

    list.finish(&class.attributes)
}

fn encode_field(pool: &mut ConstantPool, field: &Field) -> Result<FieldInfo> {
    let name_index = pool.add_utf8(&field.name)?;
    let descriptor_index = pool.add_utf8(&field.descriptor)?;

    let mut list = AttributeList::new(pool);
    if let Some(value) = &field.constant_value {
        list.push(DecodedAttribute::ConstantValue(value.clone()))?;
    }
    if let Some(signature) = &field.signature {
        list.push(DecodedAttribute::Signature(signature.clone()))?;
    }
    list.push_if(field.deprecated, || DecodedAttribute::Deprecated)?;
    list.push_if(field.synthetic, || DecodedAttribute::Synthetic)?;
    list.push_annotations(true, &field.visible_annotations)?;
    list.push_annotations(false, &field.invisible_annotations)?;

    Ok(FieldInfo {
        access_flags: field.access_flags,
        name_index,
        descriptor_index,
        attributes: list.finish(&field.attributes)?,
    })
}

fn encode_method(pool: &mut ConstantPool, method: &Method) -> Result<MethodInfo> {
    let name_index = pool.add_utf8(&method.name)?;
    let descriptor_index = pool.add_utf8(&method.descriptor)?;

    let mut list = AttributeList::new(pool);
    if let Some(code) = &method.code {
        list.push(DecodedAttribute::Code {
            code: code.clone(),
            attributes: Attributes(Vec::new()),
        })?;
    }
    list.push_if(!method.exceptions.is_empty(), || {
        DecodedAttribute::Exceptions(method.exceptions.clone())
    })?;
    list.push_if(!method.parameters.is_empty(), || {
        DecodedAttribute::MethodParameters(method.parameters.clone())
    })?;
    if let Some(signature) = &method.signature {
        list.push(DecodedAttribute::Signature(signature.clone()))?;
    }
    list.push_if(method.deprecated, || DecodedAttribute::Deprecated)?;
    list.push_if(method.synthetic, || DecodedAttribute::Synthetic)?;
    if let Some(default) = &method.annotation_default {
        list.push(DecodedAttribute::AnnotationDefault(default.clone()))?;
    }
    list.push_annotations(true, &method.visible_annotations)?;
    list.push_annotations(false, &method.invisible_annotations)?;
    list.push_if(!method.visible_parameter_annotations.is_empty(), || {
        DecodedAttribute::ParameterAnnotations {
            visible: true,
            parameters: method.visible_parameter_annotations.clone(),
        }
    })?;
    list.push_if(!method.invisible_parameter_annotations.is_empty(), || {
        DecodedAttribute::ParameterAnnotations {
            visible: false,
            parameters: method.invisible_parameter_annotations.clone(),
        }
    })?;

    Ok(MethodInfo {
        access_flags: method.access_flags,
        name_index,
        descriptor_index,
        attributes: list.finish(&method.attributes)?,
    })
}
