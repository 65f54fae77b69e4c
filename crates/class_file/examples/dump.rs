use std::{env, fs::File, io::BufReader};

use clazz_class_file::{
    attributes::{InnerClass, OpaqueAttribute},
    visitor::{ClassHeader, ClassVisitor, FieldHeader, FieldVisitor, MethodHeader, MethodVisitor},
    ClassReader,
};

/// Prints an outline of a class, one line per visited element.
struct Outline;

impl ClassVisitor for Outline {
    fn visit(&mut self, header: &ClassHeader) {
        println!(
            "class {} (v{}.{}) {:?}",
            header.name, header.major_version, header.minor_version, header.access_flags
        );
        if let Some(super_name) = header.super_name {
            println!("    extends {}", super_name);
        }
        for interface in header.interfaces {
            println!("    implements {}", interface);
        }
    }

    fn visit_source(&mut self, source: Option<&str>, _debug: Option<&str>) {
        if let Some(source) = source {
            println!("    source {}", source);
        }
    }

    fn visit_nest_host(&mut self, nest_host: &str) {
        println!("    nest host {}", nest_host);
    }

    fn visit_attribute(&mut self, attribute: &OpaqueAttribute) {
        println!("    attribute {} ({} bytes)", attribute.name, attribute.info.len());
    }

    fn visit_inner_class(&mut self, inner_class: &InnerClass) {
        println!("    inner class {}", inner_class.name);
    }

    fn visit_field(&mut self, header: &FieldHeader) -> Option<&mut dyn FieldVisitor> {
        println!("    field {} {}", header.name, header.descriptor);
        None
    }

    fn visit_method(&mut self, header: &MethodHeader) -> Option<&mut dyn MethodVisitor> {
        println!("    method {}{}", header.name, header.descriptor);
        None
    }
}

fn main() {
    pretty_env_logger::init();

    let path = env::args().nth(1).expect("usage: dump <class file>");
    let file = BufReader::new(File::open(&path).unwrap());
    let reader = ClassReader::new(file).unwrap();

    for diagnostic in reader.diagnostics() {
        log::warn!(
            "{}: attribute {} kept undecoded: {}",
            diagnostic.location,
            diagnostic.attribute,
            diagnostic.error
        );
    }

    reader.accept(&mut Outline).unwrap();
}
