use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    constant::{ConstantValue, Handle},
    ClassFileError, RawBootstrapMethod, Result,
};

use super::{reader::AttributeReader, writer::AttributeWriter};

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub handle: Handle,
    pub arguments: Vec<ConstantValue>,
}

/// Read the `BootstrapMethods` table without resolving any index, so that
/// dynamic constants can be resolved against it later.
pub(crate) fn parse_raw_bootstrap_methods(info: &[u8]) -> Result<Vec<RawBootstrapMethod>> {
    let mut r = Cursor::new(info);
    let count = r.read_u16::<BigEndian>()?;
    let methods = (0..count)
        .map(|_| -> Result<RawBootstrapMethod> {
            let bootstrap_method_ref = r.read_u16::<BigEndian>()?;
            let num_arguments = r.read_u16::<BigEndian>()?;
            let mut bootstrap_arguments = vec![0u16; num_arguments as usize];
            r.read_u16_into::<BigEndian>(&mut bootstrap_arguments)?;
            Ok(RawBootstrapMethod {
                bootstrap_method_ref,
                bootstrap_arguments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let remaining = (info.len() as u64).saturating_sub(r.position());
    if remaining != 0 {
        return Err(ClassFileError::TrailingBytes(remaining as usize));
    }
    Ok(methods)
}

pub(crate) fn read_bootstrap_methods(r: &mut AttributeReader) -> Result<Vec<BootstrapMethod>> {
    r.list(|r| {
        let raw = RawBootstrapMethod {
            bootstrap_method_ref: r.read_u16()?,
            bootstrap_arguments: r.list(|r| r.read_u16())?,
        };
        let (handle, arguments) = r.resolver().resolve_bootstrap_method(&raw)?;
        Ok(BootstrapMethod { handle, arguments })
    })
}

pub(crate) fn write_bootstrap_methods(
    w: &mut AttributeWriter,
    methods: &[BootstrapMethod],
) -> Result<()> {
    w.list("bootstrap methods", methods, |w, method| {
        w.method_handle(&method.handle)?;
        w.list("bootstrap arguments", &method.arguments, |w, argument| {
            w.constant_value(argument)
        })
    })
}
