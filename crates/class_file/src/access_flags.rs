use bitflags::bitflags;

bitflags! {
    // Classes, fields, methods, inner classes, method parameters and module
    // directives share one flag space; several bits are reused with a meaning
    // that depends on where the flags appear.
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const OPEN = 0x0020;
        const TRANSITIVE = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const STATIC_PHASE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
        const MANDATED = 0x8000;
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        AccessFlags::empty()
    }
}

#[cfg(test)]
mod access_flags_tests {
    use super::*;

    #[test]
    fn it_should_keep_every_bit() {
        for bits in [0u16, 0x0001, 0x0821, 0xffff] {
            assert_eq!(AccessFlags::from_bits_truncate(bits).bits(), bits);
        }
    }
}
