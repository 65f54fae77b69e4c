use crate::{AccessFlags, Result};

use super::{reader::AttributeReader, writer::AttributeWriter};

/// The contents of the `Module`, `ModulePackages` and `ModuleMainClass`
/// attributes of a `module-info` class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub access_flags: AccessFlags,
    pub version: Option<String>,
    pub main_class: Option<String>,
    pub packages: Vec<String>,
    pub requires: Vec<ModuleRequire>,
    pub exports: Vec<ModuleExport>,
    pub opens: Vec<ModuleExport>,
    pub uses: Vec<String>,
    pub provides: Vec<ModuleProvide>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRequire {
    pub module: String,
    pub access_flags: AccessFlags,
    pub version: Option<String>,
}

/// An `exports` or `opens` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExport {
    pub package: String,
    pub access_flags: AccessFlags,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleProvide {
    pub service: String,
    pub providers: Vec<String>,
}

pub(crate) fn read_module(r: &mut AttributeReader) -> Result<Module> {
    let name = r.module_name()?;
    let access_flags = AccessFlags::from_bits_truncate(r.read_u16()?);
    let version = r.optional_utf8()?;

    let requires = r.list(|r| {
        Ok(ModuleRequire {
            module: r.module_name()?,
            access_flags: AccessFlags::from_bits_truncate(r.read_u16()?),
            version: r.optional_utf8()?,
        })
    })?;
    let exports = r.list(read_export)?;
    let opens = r.list(read_export)?;
    let uses = r.list(|r| r.class_name())?;
    let provides = r.list(|r| {
        Ok(ModuleProvide {
            service: r.class_name()?,
            providers: r.list(|r| r.class_name())?,
        })
    })?;

    Ok(Module {
        name,
        access_flags,
        version,
        main_class: None,
        packages: Vec::new(),
        requires,
        exports,
        opens,
        uses,
        provides,
    })
}

fn read_export(r: &mut AttributeReader) -> Result<ModuleExport> {
    Ok(ModuleExport {
        package: r.package_name()?,
        access_flags: AccessFlags::from_bits_truncate(r.read_u16()?),
        modules: r.list(|r| r.module_name())?,
    })
}

pub(crate) fn read_module_packages(r: &mut AttributeReader) -> Result<Vec<String>> {
    r.list(|r| r.package_name())
}

pub(crate) fn write_module(w: &mut AttributeWriter, module: &Module) -> Result<()> {
    w.module_name(&module.name)?;
    w.write_u16(module.access_flags.bits())?;
    w.optional_utf8(module.version.as_deref())?;

    w.list("requires", &module.requires, |w, require| {
        w.module_name(&require.module)?;
        w.write_u16(require.access_flags.bits())?;
        w.optional_utf8(require.version.as_deref())
    })?;
    w.list("exports", &module.exports, write_export)?;
    w.list("opens", &module.opens, write_export)?;
    w.list("uses", &module.uses, |w, service| w.class_name(service))?;
    w.list("provides", &module.provides, |w, provide| {
        w.class_name(&provide.service)?;
        w.list("providers", &provide.providers, |w, provider| {
            w.class_name(provider)
        })
    })
}

fn write_export(w: &mut AttributeWriter, export: &ModuleExport) -> Result<()> {
    w.package_name(&export.package)?;
    w.write_u16(export.access_flags.bits())?;
    w.list("target modules", &export.modules, |w, module| {
        w.module_name(module)
    })
}

pub(crate) fn write_module_packages(w: &mut AttributeWriter, packages: &[String]) -> Result<()> {
    w.list("packages", packages, |w, package| w.package_name(package))
}
