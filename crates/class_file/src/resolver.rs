use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    convert::TryFrom,
};

use crate::{
    constant::{ConstantDynamic, ConstantReference, ConstantValue, Handle, RefKind, ReferenceKind},
    constant_pool::{CpInfo, DynamicInfo, RefInfo},
    ClassFileError, ConstantPool, Result,
};

/// An entry of the `BootstrapMethods` attribute before any of its indices are
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

enum DynamicSlot {
    InProgress,
    Resolved(ConstantDynamic),
}

/// How many Dynamic constants may be nested through bootstrap arguments.
pub const MAX_DYNAMIC_NESTING: usize = 64;

/// Resolves constant pool indices into names and typed values.
///
/// Dynamic entries depend on the `BootstrapMethods` attribute, which is only
/// known after the whole class has been read, so they are resolved on demand
/// and memoized by pool index.
pub struct Resolver<'a> {
    constant_pool: &'a ConstantPool,
    bootstrap_methods: Option<Vec<RawBootstrapMethod>>,
    dynamic_cache: RefCell<HashMap<u16, DynamicSlot>>,
    dynamic_depth: Cell<usize>,
}

impl<'a> Resolver<'a> {
    pub fn new(constant_pool: &'a ConstantPool) -> Self {
        Self {
            constant_pool,
            bootstrap_methods: None,
            dynamic_cache: RefCell::new(HashMap::new()),
            dynamic_depth: Cell::new(0),
        }
    }

    pub fn with_bootstrap_methods(mut self, bootstrap_methods: Vec<RawBootstrapMethod>) -> Self {
        self.bootstrap_methods = Some(bootstrap_methods);
        self
    }

    pub fn constant_pool(&self) -> &'a ConstantPool {
        self.constant_pool
    }

    pub fn resolve_utf8(&self, index: u16) -> Result<&'a str> {
        self.constant_pool.utf8(index)
    }

    pub fn resolve_class_name(&self, index: u16) -> Result<&'a str> {
        let class = self.constant_pool.class(index)?;
        self.resolve_utf8(class.name_index)
    }

    pub fn resolve_string(&self, index: u16) -> Result<&'a str> {
        let string = matches_cp_info!(self.constant_pool, index, String)?;
        self.resolve_utf8(string.string_index)
    }

    pub fn resolve_module_name(&self, index: u16) -> Result<&'a str> {
        let module = matches_cp_info!(self.constant_pool, index, Module)?;
        self.resolve_utf8(module.name_index)
    }

    pub fn resolve_package_name(&self, index: u16) -> Result<&'a str> {
        let package = matches_cp_info!(self.constant_pool, index, Package)?;
        self.resolve_utf8(package.name_index)
    }

    pub fn resolve_name_and_type(&self, index: u16) -> Result<(&'a str, &'a str)> {
        let name_and_type = self.constant_pool.name_and_type(index)?;
        Ok((
            self.resolve_utf8(name_and_type.name_index)?,
            self.resolve_utf8(name_and_type.descriptor_index)?,
        ))
    }

    pub fn resolve_reference(&self, index: u16) -> Result<ConstantReference> {
        let (kind, RefInfo {
            class_index,
            name_and_type_index,
        }) = match self.constant_pool.get(index)? {
            CpInfo::FieldRef(r) => (RefKind::Field, *r),
            CpInfo::MethodRef(r) => (RefKind::Method, *r),
            CpInfo::InterfaceMethodRef(r) => (RefKind::InterfaceMethod, *r),
            c => {
                return Err(ClassFileError::UnexpectedConstantPoolEntry(
                    "reference",
                    index,
                    c.clone(),
                ))
            }
        };
        let (name, descriptor) = self.resolve_name_and_type(name_and_type_index)?;

        Ok(ConstantReference {
            kind,
            owner: self.resolve_class_name(class_index)?.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            is_interface: kind == RefKind::InterfaceMethod,
        })
    }

    pub fn resolve_method_handle(&self, index: u16) -> Result<Handle> {
        let handle = matches_cp_info!(self.constant_pool, index, MethodHandle)?;
        let kind = ReferenceKind::try_from(handle.reference_kind)?;
        let reference = self.resolve_reference(handle.reference_index)?;

        Ok(Handle {
            kind,
            owner: reference.owner,
            name: reference.name,
            descriptor: reference.descriptor,
            is_interface: reference.is_interface,
        })
    }

    pub fn resolve_constant_value(&self, index: u16) -> Result<ConstantValue> {
        let value = match self.constant_pool.get(index)? {
            CpInfo::Utf8(s) => ConstantValue::Utf8(s.clone()),
            CpInfo::Integer(i) => ConstantValue::Integer(*i),
            CpInfo::Float(f) => ConstantValue::Float(*f),
            CpInfo::Long(l) => ConstantValue::Long(*l),
            CpInfo::Double(d) => ConstantValue::Double(*d),
            CpInfo::Class(class) => ConstantValue::Class(self.resolve_utf8(class.name_index)?.into()),
            CpInfo::String(string) => {
                ConstantValue::String(self.resolve_utf8(string.string_index)?.into())
            }
            CpInfo::MethodHandle(_) => ConstantValue::MethodHandle(self.resolve_method_handle(index)?),
            CpInfo::MethodType(method_type) => {
                ConstantValue::MethodType(self.resolve_utf8(method_type.descriptor_index)?.into())
            }
            CpInfo::Dynamic(_) => ConstantValue::Dynamic(Box::new(self.resolve_dynamic(index)?)),
            c => {
                return Err(ClassFileError::UnexpectedConstantPoolEntry(
                    "loadable constant",
                    index,
                    c.clone(),
                ))
            }
        };
        Ok(value)
    }

    /// Resolve a `CONSTANT_Dynamic` or `CONSTANT_InvokeDynamic` entry through
    /// the bootstrap method table.
    pub fn resolve_dynamic(&self, index: u16) -> Result<ConstantDynamic> {
        let DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        } = match self.constant_pool.get(index)? {
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => *d,
            c => {
                return Err(ClassFileError::UnexpectedConstantPoolEntry(
                    "Dynamic",
                    index,
                    c.clone(),
                ))
            }
        };

        match self.dynamic_cache.borrow().get(&index) {
            Some(DynamicSlot::Resolved(resolved)) => return Ok(resolved.clone()),
            Some(DynamicSlot::InProgress) => return Err(ClassFileError::CyclicConstant(index)),
            None => {}
        }

        let depth = self.dynamic_depth.get();
        if depth >= MAX_DYNAMIC_NESTING {
            return Err(ClassFileError::TooLarge(
                "dynamic constant nesting levels",
                depth + 1,
            ));
        }

        self.dynamic_cache
            .borrow_mut()
            .insert(index, DynamicSlot::InProgress);
        self.dynamic_depth.set(depth + 1);
        let resolved =
            self.resolve_dynamic_uncached(bootstrap_method_attr_index, name_and_type_index);
        self.dynamic_depth.set(depth);

        let mut cache = self.dynamic_cache.borrow_mut();
        match resolved {
            Ok(resolved) => {
                cache.insert(index, DynamicSlot::Resolved(resolved.clone()));
                Ok(resolved)
            }
            Err(e) => {
                cache.remove(&index);
                Err(e)
            }
        }
    }

    fn resolve_dynamic_uncached(
        &self,
        bootstrap_method_index: u16,
        name_and_type_index: u16,
    ) -> Result<ConstantDynamic> {
        let raw = self
            .bootstrap_methods
            .as_ref()
            .and_then(|methods| methods.get(bootstrap_method_index as usize))
            .ok_or(ClassFileError::MissingBootstrapMethod(bootstrap_method_index))?;
        let (name, descriptor) = self.resolve_name_and_type(name_and_type_index)?;
        let (bootstrap_method, bootstrap_arguments) = self.resolve_bootstrap_method(raw)?;

        Ok(ConstantDynamic {
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            bootstrap_method,
            bootstrap_arguments,
            bootstrap_method_index,
        })
    }

    pub fn resolve_bootstrap_method(
        &self,
        raw: &RawBootstrapMethod,
    ) -> Result<(Handle, Vec<ConstantValue>)> {
        let handle = self.resolve_method_handle(raw.bootstrap_method_ref)?;
        let arguments = raw
            .bootstrap_arguments
            .iter()
            .map(|&argument| self.resolve_constant_value(argument))
            .collect::<Result<Vec<_>>>()?;
        Ok((handle, arguments))
    }
}

#[cfg(test)]
mod resolver_tests {
    use super::*;
    use crate::constant_pool::{
        ClassInfo, MethodHandleInfo, NameAndTypeInfo, NamedInfo, StringInfo,
    };

    // 1 Utf8 "Object"         2 Class #1
    // 3 Utf8 "hello"          4 String #3
    // 5 Utf8 "<init>"         6 Utf8 "()V"
    // 7 NameAndType #5 #6     8 MethodRef #2 #7
    // 9 MethodHandle 6 #8     10 Dynamic bsm 0, #7
    // 11 Long                 12 (unusable)
    // 13 Dynamic bsm 1, #7    14 Module #1
    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("Object".into()),
            CpInfo::Class(ClassInfo { name_index: 1 }),
            CpInfo::Utf8("hello".into()),
            CpInfo::String(StringInfo { string_index: 3 }),
            CpInfo::Utf8("<init>".into()),
            CpInfo::Utf8("()V".into()),
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index: 5,
                descriptor_index: 6,
            }),
            CpInfo::MethodRef(RefInfo {
                class_index: 2,
                name_and_type_index: 7,
            }),
            CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind: 6,
                reference_index: 8,
            }),
            CpInfo::Dynamic(DynamicInfo {
                bootstrap_method_attr_index: 0,
                name_and_type_index: 7,
            }),
            CpInfo::Long(42),
            CpInfo::Unusable,
            CpInfo::Dynamic(DynamicInfo {
                bootstrap_method_attr_index: 1,
                name_and_type_index: 7,
            }),
            CpInfo::Module(NamedInfo { name_index: 1 }),
        ])
    }

    fn bootstrap_methods(first_args: Vec<u16>) -> Vec<RawBootstrapMethod> {
        vec![
            RawBootstrapMethod {
                bootstrap_method_ref: 9,
                bootstrap_arguments: first_args,
            },
            RawBootstrapMethod {
                bootstrap_method_ref: 9,
                bootstrap_arguments: vec![10],
            },
        ]
    }

    #[test]
    fn it_should_resolve_names() {
        let pool = pool();
        let resolver = Resolver::new(&pool);
        assert_eq!(resolver.resolve_class_name(2).unwrap(), "Object");
        assert_eq!(resolver.resolve_string(4).unwrap(), "hello");
        assert_eq!(resolver.resolve_module_name(14).unwrap(), "Object");
        assert_eq!(resolver.resolve_name_and_type(7).unwrap(), ("<init>", "()V"));
    }

    #[test]
    fn it_should_only_resolve_utf8_on_utf8_slots() {
        let pool = pool();
        let resolver = Resolver::new(&pool);
        for index in 1..=14u16 {
            let is_utf8 = matches!(pool.get(index), Ok(CpInfo::Utf8(_)));
            assert_eq!(resolver.resolve_utf8(index).is_ok(), is_utf8, "index {}", index);
        }
    }

    #[test]
    fn it_should_resolve_a_reference() {
        let pool = pool();
        let reference = Resolver::new(&pool).resolve_reference(8).unwrap();
        assert_eq!(reference.kind, RefKind::Method);
        assert_eq!(reference.owner, "Object");
        assert!(!reference.is_interface);
    }

    #[test]
    fn it_should_resolve_typed_constant_values() {
        let pool = pool();
        let resolver = Resolver::new(&pool);
        assert_eq!(
            resolver.resolve_constant_value(2).unwrap(),
            ConstantValue::Class("Object".into())
        );
        assert_eq!(
            resolver.resolve_constant_value(11).unwrap(),
            ConstantValue::Long(42)
        );
        assert!(matches!(
            resolver.resolve_constant_value(9).unwrap(),
            ConstantValue::MethodHandle(Handle {
                kind: ReferenceKind::InvokeStatic,
                ..
            })
        ));
        assert!(resolver.resolve_constant_value(7).is_err());
    }

    #[test]
    fn it_should_fail_on_dynamic_without_bootstrap_methods() {
        let pool = pool();
        assert!(matches!(
            Resolver::new(&pool).resolve_dynamic(10),
            Err(ClassFileError::MissingBootstrapMethod(0))
        ));
    }

    #[test]
    fn it_should_resolve_nested_dynamic_constants() {
        let pool = pool();
        let resolver = Resolver::new(&pool).with_bootstrap_methods(bootstrap_methods(vec![4]));
        let dynamic = resolver.resolve_dynamic(13).unwrap();
        assert_eq!(dynamic.bootstrap_method_index, 1);
        let ConstantValue::Dynamic(ref inner) = dynamic.bootstrap_arguments[0] else {
            panic!("expected a dynamic argument");
        };
        assert_eq!(
            inner.bootstrap_arguments,
            vec![ConstantValue::String("hello".into())]
        );
        assert_eq!(resolver.resolve_dynamic(13).unwrap(), dynamic);
    }

    // 1..=6 as in `pool`, then `links` Dynamic entries from #7 on, where the
    // bootstrap method of each one takes the next entry as its argument.
    fn chain(links: u16) -> (ConstantPool, Vec<RawBootstrapMethod>) {
        let mut entries = vec![
            CpInfo::Utf8("Object".into()),
            CpInfo::Class(ClassInfo { name_index: 1 }),
            CpInfo::Utf8("<init>".into()),
            CpInfo::Utf8("()V".into()),
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index: 3,
                descriptor_index: 4,
            }),
            CpInfo::MethodRef(RefInfo {
                class_index: 2,
                name_and_type_index: 5,
            }),
            CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind: 6,
                reference_index: 6,
            }),
        ];
        let first = entries.len() as u16 + 1;
        let mut methods = Vec::new();
        for link in 0..links {
            entries.push(CpInfo::Dynamic(DynamicInfo {
                bootstrap_method_attr_index: link,
                name_and_type_index: 5,
            }));
            let next = first + link + 1;
            methods.push(RawBootstrapMethod {
                bootstrap_method_ref: 7,
                bootstrap_arguments: if link + 1 < links { vec![next] } else { vec![] },
            });
        }
        (ConstantPool::new(entries), methods)
    }

    #[test]
    fn it_should_resolve_a_chain_within_the_nesting_limit() {
        let (pool, methods) = chain(MAX_DYNAMIC_NESTING as u16);
        let resolver = Resolver::new(&pool).with_bootstrap_methods(methods);
        let dynamic = resolver.resolve_dynamic(8).unwrap();
        assert_eq!(dynamic.bootstrap_arguments.len(), 1);
    }

    #[test]
    fn it_should_reject_a_chain_past_the_nesting_limit() {
        let (pool, methods) = chain(5000);
        let resolver = Resolver::new(&pool).with_bootstrap_methods(methods);
        let err = resolver.resolve_dynamic(8).unwrap_err();
        assert!(matches!(
            err,
            ClassFileError::TooLarge("dynamic constant nesting levels", depth)
                if depth == MAX_DYNAMIC_NESTING + 1
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Format);

        // the counter unwinds, so a short tail of the chain still resolves
        let tail = 8 + 5000 - 3;
        assert!(resolver.resolve_dynamic(tail).is_ok());
    }

    #[test]
    fn it_should_detect_cycles() {
        let pool = pool();
        let resolver = Resolver::new(&pool).with_bootstrap_methods(bootstrap_methods(vec![13]));
        let err = resolver.resolve_dynamic(10).unwrap_err();
        assert!(matches!(err, ClassFileError::CyclicConstant(10)));
        // a failed resolution must not poison the cache
        assert!(matches!(
            resolver.resolve_dynamic(10),
            Err(ClassFileError::CyclicConstant(10))
        ));
    }
}
