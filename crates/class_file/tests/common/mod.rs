#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};

/// Big-endian byte buffer for hand-written fixtures.
#[derive(Default, Clone)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.0.write_u16::<BigEndian>(value).unwrap();
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.write_u32::<BigEndian>(value).unwrap();
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

/// Appends constant pool entries and hands out their indices.
pub struct PoolBuilder {
    bytes: Vec<u8>,
    next: u16,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
        }
    }
}

impl PoolBuilder {
    fn entry(&mut self, bytes: Bytes, slots: u16) -> u16 {
        let index = self.next;
        self.bytes.extend_from_slice(&bytes.0);
        self.next += slots;
        index
    }

    pub fn count(&self) -> u16 {
        self.next
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let entry = Bytes::new().u8(1).u16(s.len() as u16).bytes(s.as_bytes());
        self.entry(entry, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.entry(Bytes::new().u8(3).u32(value as u32), 1)
    }

    pub fn float(&mut self, bits: u32) -> u16 {
        self.entry(Bytes::new().u8(4).u32(bits), 1)
    }

    pub fn double(&mut self, bits: u64) -> u16 {
        let entry = Bytes::new()
            .u8(6)
            .u32((bits >> 32) as u32)
            .u32(bits as u32);
        self.entry(entry, 2)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let entry = Bytes::new()
            .u8(5)
            .u32((value >> 32) as u32)
            .u32(value as u32);
        self.entry(entry, 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.entry(Bytes::new().u8(7).u16(name_index), 1)
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string_index = self.utf8(s);
        self.entry(Bytes::new().u8(8).u16(string_index), 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.entry(Bytes::new().u8(12).u16(name_index).u16(descriptor_index), 1)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.entry(
            Bytes::new().u8(10).u16(class_index).u16(name_and_type_index),
            1,
        )
    }

    pub fn method_handle(&mut self, reference_kind: u8, reference_index: u16) -> u16 {
        self.entry(
            Bytes::new().u8(15).u8(reference_kind).u16(reference_index),
            1,
        )
    }

    pub fn dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.entry(
            Bytes::new()
                .u8(17)
                .u16(bootstrap_method)
                .u16(name_and_type_index),
            1,
        )
    }

    pub fn module(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.entry(Bytes::new().u8(19).u16(name_index), 1)
    }

    pub fn package(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.entry(Bytes::new().u8(20).u16(name_index), 1)
    }
}

/// Assembles a class file from raw parts.
#[derive(Default)]
pub struct ClassBuilder {
    pub pool: PoolBuilder,
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Vec<u8>>,
    pub methods: Vec<Vec<u8>>,
    pub attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = Self {
            major_version: 61,
            access_flags: 0x0021,
            ..Self::default()
        };
        builder.this_class = builder.pool.class(name);
        builder.super_class = super_name.map_or(0, |s| builder.pool.class(s));
        builder
    }

    /// A complete attribute record.
    pub fn attribute(&mut self, name: &str, info: &[u8]) -> Vec<u8> {
        let name_index = self.pool.utf8(name);
        Bytes::new()
            .u16(name_index)
            .u32(info.len() as u32)
            .bytes(info)
            .build()
    }

    pub fn class_attribute(&mut self, name: &str, info: &[u8]) {
        let attribute = self.attribute(name, info);
        self.attributes.push(attribute);
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.fields.push(member);
    }

    pub fn method(&mut self, access_flags: u16, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.methods.push(member);
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        let mut member = Bytes::new()
            .u16(access_flags)
            .u16(name_index)
            .u16(descriptor_index)
            .u16(attributes.len() as u16);
        for attribute in &attributes {
            member = member.bytes(attribute);
        }
        member.build()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Bytes::new()
            .u32(0xCAFEBABE)
            .u16(self.minor_version)
            .u16(self.major_version)
            .u16(self.pool.count())
            .bytes(&self.pool.bytes)
            .u16(self.access_flags)
            .u16(self.this_class)
            .u16(self.super_class)
            .u16(self.interfaces.len() as u16);
        for &interface in &self.interfaces {
            bytes = bytes.u16(interface);
        }
        for members in [&self.fields, &self.methods, &self.attributes] {
            bytes = bytes.u16(members.len() as u16);
            for member in members.iter() {
                bytes = bytes.bytes(member);
            }
        }
        bytes.build()
    }
}

/// The smallest valid class: one Utf8 constant and one Class constant used
/// as both this and super class.
pub fn minimal_class() -> Vec<u8> {
    let mut builder = ClassBuilder::default();
    let object = builder.pool.class("Object");
    builder.major_version = 52;
    builder.this_class = object;
    builder.super_class = object;
    builder.build()
}

fn module_attributes(builder: &mut ClassBuilder) {
    let module = builder.pool.module("demo.app");
    let version = builder.pool.utf8("1.0");
    let base = builder.pool.module("java.base");
    let base_version = builder.pool.utf8("17");
    let friend = builder.pool.module("demo.friend");
    let api = builder.pool.package("demo/api");
    let internal = builder.pool.package("demo/internal");
    let service = builder.pool.class("demo/api/Service");
    let provider = builder.pool.class("demo/internal/ServiceImpl");
    let main_class = builder.pool.class("demo/Main");

    let info = Bytes::new()
        .u16(module)
        .u16(0x0020)
        .u16(version)
        // requires
        .u16(1)
        .u16(base)
        .u16(0x8000)
        .u16(base_version)
        // exports
        .u16(1)
        .u16(api)
        .u16(0)
        .u16(0)
        // opens
        .u16(1)
        .u16(internal)
        .u16(0)
        .u16(1)
        .u16(friend)
        // uses
        .u16(1)
        .u16(service)
        // provides
        .u16(1)
        .u16(service)
        .u16(1)
        .u16(provider)
        .build();
    builder.class_attribute("Module", &info);
    builder.class_attribute(
        "ModulePackages",
        &Bytes::new().u16(2).u16(api).u16(internal).build(),
    );
    builder.class_attribute("ModuleMainClass", &Bytes::new().u16(main_class).build());
}

/// Every optional part of a class, with its attributes deliberately out of
/// traversal order.
pub fn rich_class(with_module: bool, with_nest_host: bool) -> Vec<u8> {
    let mut builder = ClassBuilder::new("demo/Outer$Inner", Some("java/lang/Object"));
    let this_class = builder.this_class;
    let outer = builder.pool.class("demo/Outer");

    let sibling = builder.pool.class("demo/Outer$Sibling");
    builder.class_attribute("NestMembers", &Bytes::new().u16(1).u16(sibling).build());
    builder.class_attribute("Custom", &[1, 2]);

    let marker = builder.pool.utf8("Ldemo/Marker;");
    let value = builder.pool.utf8("value");
    let level = builder.pool.utf8("level");
    let level_type = builder.pool.utf8("Ldemo/Level;");
    let high = builder.pool.utf8("HIGH");
    let nested = builder.pool.utf8("nested");
    let tag = builder.pool.utf8("Ldemo/Tag;");
    let one = builder.pool.integer(1);
    let annotations = Bytes::new()
        .u16(1)
        .u16(marker)
        .u16(3)
        .u16(value)
        .u8(b'[')
        .u16(2)
        .u8(b'I')
        .u16(one)
        .u8(b'I')
        .u16(one)
        .u16(level)
        .u8(b'e')
        .u16(level_type)
        .u16(high)
        .u16(nested)
        .u8(b'@')
        .u16(tag)
        .u16(0)
        .build();
    builder.class_attribute("RuntimeVisibleAnnotations", &annotations);

    let inner_name = builder.pool.utf8("Inner");
    builder.class_attribute(
        "InnerClasses",
        &Bytes::new()
            .u16(1)
            .u16(this_class)
            .u16(outer)
            .u16(inner_name)
            .u16(0x0008)
            .build(),
    );
    builder.class_attribute("EnclosingMethod", &Bytes::new().u16(outer).u16(0).build());
    if with_nest_host {
        builder.class_attribute("NestHost", &Bytes::new().u16(outer).build());
    }
    if with_module {
        module_attributes(&mut builder);
    }
    let source = builder.pool.utf8("Outer.java");
    builder.class_attribute("SourceFile", &Bytes::new().u16(source).build());

    let field_annotation = Bytes::new().u16(1).u16(tag).u16(0).build();
    let field_annotation = builder.attribute("RuntimeInvisibleAnnotations", &field_annotation);
    builder.field(0x0002, "count", "I", vec![field_annotation]);

    let code = Bytes::new()
        .u16(1)
        .u16(2)
        .u32(1)
        .u8(0xb1)
        .u16(0)
        .u16(0)
        .build();
    let code = builder.attribute("Code", &code);
    let parameter = builder.pool.utf8("amount");
    let parameters = builder.attribute(
        "MethodParameters",
        &Bytes::new().u8(1).u16(parameter).u16(0).build(),
    );
    let parameter_annotations = builder.attribute(
        "RuntimeVisibleParameterAnnotations",
        &Bytes::new().u8(1).u16(1).u16(tag).u16(0).build(),
    );
    let annotation_default = builder.attribute(
        "AnnotationDefault",
        &Bytes::new().u8(b'I').u16(one).build(),
    );
    builder.method(
        0x0001,
        "apply",
        "(I)V",
        vec![code, parameter_annotations, annotation_default, parameters],
    );
    builder.build()
}

/// A class whose `BootstrapMethods` attribute comes last, after a field
/// constant and another bootstrap argument that both refer to dynamic
/// constants. Returns the indices of both dynamic constants.
pub fn dynamic_class() -> (Vec<u8>, u16, u16) {
    let mut builder = ClassBuilder::new("demo/Dynamic", Some("java/lang/Object"));
    let bootstrap = builder.pool.method_ref(
        "demo/Bootstraps",
        "constant",
        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/Class;)Ljava/lang/Object;",
    );
    let handle = builder.pool.method_handle(6, bootstrap);
    let first = builder.pool.dynamic(0, "first", "I");
    let second = builder.pool.dynamic(1, "second", "J");

    let constant_value = builder.attribute("ConstantValue", &Bytes::new().u16(first).build());
    builder.field(0x0018, "FIRST", "I", vec![constant_value]);
    let source_file = builder.pool.utf8("Dynamic.java");
    builder.class_attribute("SourceFile", &Bytes::new().u16(source_file).build());
    builder.class_attribute("Custom", &[0xff]);

    let bootstrap_methods = Bytes::new()
        .u16(2)
        .u16(handle)
        .u16(0)
        .u16(handle)
        .u16(1)
        .u16(first)
        .build();
    builder.class_attribute("BootstrapMethods", &bootstrap_methods);
    (builder.build(), first, second)
}

/// `links` dynamic constants where the bootstrap method of each one takes
/// the next one as its only argument. Returns the index of the first link.
pub fn dynamic_chain_class(links: u16) -> (Vec<u8>, u16) {
    let mut builder = ClassBuilder::new("demo/Chain", Some("java/lang/Object"));
    let bootstrap = builder.pool.method_ref("demo/Chain", "link", "()V");
    let handle = builder.pool.method_handle(6, bootstrap);
    let chain = (0..links)
        .map(|link| builder.pool.dynamic(link, "link", "I"))
        .collect::<Vec<_>>();

    let mut table = Bytes::new().u16(links);
    for (link, _) in chain.iter().enumerate() {
        table = table.u16(handle);
        table = match chain.get(link + 1) {
            Some(&next) => table.u16(1).u16(next),
            None => table.u16(0),
        };
    }
    builder.class_attribute("BootstrapMethods", &table.build());
    builder.class_attribute("Custom", &[]);
    (builder.build(), chain[0])
}

/// Wide and floating point constants, including NaN payloads and negative
/// zero, as field constants and annotation values.
pub fn constants_class() -> Vec<u8> {
    let mut builder = ClassBuilder::new("demo/Constants", Some("java/lang/Object"));
    let long = builder.pool.long(-1 << 40);
    let float_nan = builder.pool.float(0x7fc0_0001);
    let double_nan = builder.pool.double(0x7ff8_0000_0000_0001);
    let negative_zero = builder.pool.double(0x8000_0000_0000_0000);
    let small = builder.pool.integer(-128);
    let letter = builder.pool.integer(0xffff);
    let yes = builder.pool.integer(1);

    for (name, descriptor, index) in [
        ("LONG", "J", long),
        ("FLOAT_NAN", "F", float_nan),
        ("DOUBLE_NAN", "D", double_nan),
        ("NEGATIVE_ZERO", "D", negative_zero),
    ] {
        let constant_value = builder.attribute("ConstantValue", &Bytes::new().u16(index).build());
        builder.field(0x0019, name, descriptor, vec![constant_value]);
    }

    let limits = builder.pool.utf8("Ldemo/Limits;");
    let mut annotation = Bytes::new().u16(1).u16(limits).u16(6);
    for (name, tag, index) in [
        ("f", b'F', float_nan),
        ("d", b'D', double_nan),
        ("j", b'J', long),
        ("b", b'B', small),
        ("c", b'C', letter),
        ("z", b'Z', yes),
    ] {
        let name = builder.pool.utf8(name);
        annotation = annotation.u16(name).u8(tag).u16(index);
    }
    builder.class_attribute("RuntimeVisibleAnnotations", &annotation.build());
    builder.build()
}
