use std::{iter::Peekable, str::Chars};

use crate::{ClassFileError, Result};

/// `'(' { FieldType } ')' ReturnType`, with every type kept as its descriptor
/// text, e.g. `I`, `[Ljava/lang/String;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<String>,
    pub return_type: String,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let invalid = || ClassFileError::InvalidDescriptor(descriptor.to_owned());

        let mut chars = descriptor.chars().peekable();
        if chars.next() != Some('(') {
            return Err(invalid());
        }

        let mut parameters = Vec::new();
        loop {
            match chars.peek() {
                Some(')') => break,
                Some(_) => parameters.push(field_type(&mut chars, false).ok_or_else(invalid)?),
                None => return Err(invalid()),
            }
        }
        // Skip )
        chars.next();

        let return_type = field_type(&mut chars, true).ok_or_else(invalid)?;
        if chars.next().is_some() {
            return Err(invalid());
        }

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

impl ToString for MethodDescriptor {
    fn to_string(&self) -> String {
        format!("({}){}", self.parameters.concat(), self.return_type)
    }
}

/// The descriptor of every parameter of a method descriptor.
pub fn parameter_descriptors(descriptor: &str) -> Result<Vec<String>> {
    MethodDescriptor::parse(descriptor).map(|d| d.parameters)
}

/// Whether `descriptor` is exactly one field type.
pub fn is_field_descriptor(descriptor: &str) -> bool {
    let mut chars = descriptor.chars().peekable();
    field_type(&mut chars, false).is_some() && chars.next().is_none()
}

fn field_type(chars: &mut Peekable<Chars>, allow_void: bool) -> Option<String> {
    let first = chars.next()?;
    let ty = match first {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => first.to_string(),
        'V' if allow_void => first.to_string(),
        '[' => format!("[{}", field_type(chars, false)?),
        'L' => {
            let mut class_name = String::new();
            loop {
                match chars.next()? {
                    ';' => break,
                    c => class_name.push(c),
                }
            }
            if class_name.is_empty() {
                return None;
            }
            format!("L{};", class_name)
        }
        _ => return None,
    };
    Some(ty)
}
