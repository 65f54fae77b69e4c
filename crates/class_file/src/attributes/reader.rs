use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{constant::ConstantValue, ClassFileError, Resolver, Result};

type Endian = BigEndian;

/// A cursor over one attribute payload that resolves the constant pool
/// indices it reads.
pub(crate) struct AttributeReader<'a> {
    r: Cursor<&'a [u8]>,
    resolver: &'a Resolver<'a>,
}

impl<'a> AttributeReader<'a> {
    pub(crate) fn new(info: &'a [u8], resolver: &'a Resolver<'a>) -> Self {
        Self {
            r: Cursor::new(info),
            resolver,
        }
    }

    pub(crate) fn resolver(&self) -> &'a Resolver<'a> {
        self.resolver
    }

    pub(crate) fn position(&self) -> u64 {
        self.r.position()
    }

    /// Fails if the payload was not consumed completely.
    pub(crate) fn finish(&self) -> Result<()> {
        let len = self.r.get_ref().len() as u64;
        match len.saturating_sub(self.r.position()) {
            0 => Ok(()),
            remaining => Err(ClassFileError::TrailingBytes(remaining as usize)),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let remaining = self
            .r
            .get_ref()
            .len()
            .saturating_sub(self.r.position() as usize);
        if len > remaining {
            return Err(ClassFileError::Truncated);
        }
        let mut bytes = vec![0u8; len];
        self.r.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub(crate) fn read_rest(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.r.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub(crate) fn utf8(&mut self) -> Result<String> {
        let index = self.read_u16()?;
        Ok(self.resolver.resolve_utf8(index)?.to_owned())
    }

    /// A `CONSTANT_Utf8_info` index where zero means absent.
    pub(crate) fn optional_utf8(&mut self) -> Result<Option<String>> {
        match self.read_u16()? {
            0 => Ok(None),
            index => Ok(Some(self.resolver.resolve_utf8(index)?.to_owned())),
        }
    }

    pub(crate) fn class_name(&mut self) -> Result<String> {
        let index = self.read_u16()?;
        Ok(self.resolver.resolve_class_name(index)?.to_owned())
    }

    /// A `CONSTANT_Class_info` index where zero means absent.
    pub(crate) fn optional_class_name(&mut self) -> Result<Option<String>> {
        match self.read_u16()? {
            0 => Ok(None),
            index => Ok(Some(self.resolver.resolve_class_name(index)?.to_owned())),
        }
    }

    pub(crate) fn module_name(&mut self) -> Result<String> {
        let index = self.read_u16()?;
        Ok(self.resolver.resolve_module_name(index)?.to_owned())
    }

    pub(crate) fn package_name(&mut self) -> Result<String> {
        let index = self.read_u16()?;
        Ok(self.resolver.resolve_package_name(index)?.to_owned())
    }

    pub(crate) fn constant_value(&mut self) -> Result<ConstantValue> {
        let index = self.read_u16()?;
        self.resolver.resolve_constant_value(index)
    }

    /// Read a `u16` count followed by that many items.
    pub(crate) fn list<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.read_u16()?;
        (0..count).map(|_| f(self)).collect()
    }
}
