use std::convert::TryFrom;

use crate::{constant::ConstantValue, ClassFileError, Result};

use super::{reader::AttributeReader, writer::AttributeWriter};

/// Deeper element values are rejected instead of exhausting the stack.
pub const MAX_ANNOTATION_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub descriptor: String,
    pub visible: bool,
    pub values: Vec<(String, ElementValue)>,
}

#[derive(Debug, Clone)]
pub enum ElementValue {
    Boolean(bool),
    Byte(i8),
    /// A UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class literal, as a return descriptor such as `Ljava/lang/Object;` or `V`.
    Class(String),
    Enum {
        descriptor: String,
        name: String,
    },
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub fn tag(&self) -> char {
        match self {
            ElementValue::Boolean(_) => 'Z',
            ElementValue::Byte(_) => 'B',
            ElementValue::Char(_) => 'C',
            ElementValue::Short(_) => 'S',
            ElementValue::Int(_) => 'I',
            ElementValue::Long(_) => 'J',
            ElementValue::Float(_) => 'F',
            ElementValue::Double(_) => 'D',
            ElementValue::String(_) => 's',
            ElementValue::Class(_) => 'c',
            ElementValue::Enum { .. } => 'e',
            ElementValue::Annotation(_) => '@',
            ElementValue::Array(_) => '[',
        }
    }

    /// Nesting depth: 1 for a scalar, one more for every array or annotation level.
    pub fn depth(&self) -> usize {
        match self {
            ElementValue::Array(values) => 1 + values.iter().map(Self::depth).max().unwrap_or(0),
            ElementValue::Annotation(annotation) => {
                1 + annotation
                    .values
                    .iter()
                    .map(|(_, v)| v.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }
}

impl PartialEq for ElementValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ElementValue::Boolean(a), ElementValue::Boolean(b)) => a == b,
            (ElementValue::Byte(a), ElementValue::Byte(b)) => a == b,
            (ElementValue::Char(a), ElementValue::Char(b)) => a == b,
            (ElementValue::Short(a), ElementValue::Short(b)) => a == b,
            (ElementValue::Int(a), ElementValue::Int(b)) => a == b,
            (ElementValue::Long(a), ElementValue::Long(b)) => a == b,
            // NaN payloads are part of the value
            (ElementValue::Float(a), ElementValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ElementValue::Double(a), ElementValue::Double(b)) => a.to_bits() == b.to_bits(),
            (ElementValue::String(a), ElementValue::String(b)) => a == b,
            (ElementValue::Class(a), ElementValue::Class(b)) => a == b,
            (
                ElementValue::Enum {
                    descriptor: a_descriptor,
                    name: a_name,
                },
                ElementValue::Enum {
                    descriptor: b_descriptor,
                    name: b_name,
                },
            ) => a_descriptor == b_descriptor && a_name == b_name,
            (ElementValue::Annotation(a), ElementValue::Annotation(b)) => a == b,
            (ElementValue::Array(a), ElementValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn read_annotations(r: &mut AttributeReader, visible: bool) -> Result<Vec<Annotation>> {
    r.list(|r| read_annotation(r, visible, 0))
}

pub(crate) fn read_parameter_annotations(
    r: &mut AttributeReader,
    visible: bool,
) -> Result<Vec<Vec<Annotation>>> {
    let num_parameters = r.read_u8()?;
    (0..num_parameters)
        .map(|_| read_annotations(r, visible))
        .collect()
}

pub(crate) fn read_annotation(
    r: &mut AttributeReader,
    visible: bool,
    depth: usize,
) -> Result<Annotation> {
    let descriptor = r.utf8()?;
    let values = r.list(|r| {
        let name = r.utf8()?;
        let value = read_element_value(r, visible, depth)?;
        Ok((name, value))
    })?;

    Ok(Annotation {
        descriptor,
        visible,
        values,
    })
}

pub(crate) fn read_element_value(
    r: &mut AttributeReader,
    visible: bool,
    depth: usize,
) -> Result<ElementValue> {
    if depth >= MAX_ANNOTATION_NESTING {
        return Err(ClassFileError::TooLarge("annotation nesting levels", depth));
    }

    let tag = r.read_u8()? as char;
    let value = match tag {
        'B' => ElementValue::Byte(narrow(int_constant(r, tag)?, tag)?),
        'C' => ElementValue::Char(narrow(int_constant(r, tag)?, tag)?),
        'I' => ElementValue::Int(int_constant(r, tag)?),
        'S' => ElementValue::Short(narrow(int_constant(r, tag)?, tag)?),
        'Z' => match int_constant(r, tag)? {
            0 => ElementValue::Boolean(false),
            1 => ElementValue::Boolean(true),
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        },
        'J' => match r.constant_value()? {
            ConstantValue::Long(l) => ElementValue::Long(l),
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        },
        'F' => match r.constant_value()? {
            ConstantValue::Float(f) => ElementValue::Float(f),
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        },
        'D' => match r.constant_value()? {
            ConstantValue::Double(d) => ElementValue::Double(d),
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        },
        's' => ElementValue::String(r.utf8()?),
        'c' => ElementValue::Class(r.utf8()?),
        'e' => ElementValue::Enum {
            descriptor: r.utf8()?,
            name: r.utf8()?,
        },
        '@' => ElementValue::Annotation(Box::new(read_annotation(r, visible, depth + 1)?)),
        '[' => ElementValue::Array(r.list(|r| read_element_value(r, visible, depth + 1))?),
        _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
    };
    Ok(value)
}

fn int_constant(r: &mut AttributeReader, tag: char) -> Result<i32> {
    match r.constant_value()? {
        ConstantValue::Integer(i) => Ok(i),
        _ => Err(ClassFileError::InvalidElementValueTag(tag)),
    }
}

/// Integer constants behind `B`, `C` and `S` must fit the tagged type.
fn narrow<T: TryFrom<i32>>(value: i32, tag: char) -> Result<T> {
    T::try_from(value).map_err(|_| ClassFileError::InvalidElementValueTag(tag))
}

pub(crate) fn write_annotations(w: &mut AttributeWriter, annotations: &[Annotation]) -> Result<()> {
    w.list("annotations", annotations, write_annotation)
}

pub(crate) fn write_parameter_annotations(
    w: &mut AttributeWriter,
    parameters: &[Vec<Annotation>],
) -> Result<()> {
    let num_parameters = u8::try_from(parameters.len())
        .map_err(|_| ClassFileError::TooLarge("annotated parameters", parameters.len()))?;
    w.write_u8(num_parameters)?;
    parameters
        .iter()
        .try_for_each(|annotations| write_annotations(w, annotations))
}

pub(crate) fn write_annotation(w: &mut AttributeWriter, annotation: &Annotation) -> Result<()> {
    w.utf8(&annotation.descriptor)?;
    w.list("element value pairs", &annotation.values, |w, (name, value)| {
        w.utf8(name)?;
        write_element_value(w, value)
    })
}

pub(crate) fn write_element_value(w: &mut AttributeWriter, value: &ElementValue) -> Result<()> {
    w.write_u8(value.tag() as u8)?;
    match value {
        ElementValue::Boolean(b) => w.constant_value(&ConstantValue::Integer(*b as i32)),
        ElementValue::Byte(b) => w.constant_value(&ConstantValue::Integer(*b as i32)),
        ElementValue::Char(c) => w.constant_value(&ConstantValue::Integer(*c as i32)),
        ElementValue::Short(s) => w.constant_value(&ConstantValue::Integer(*s as i32)),
        ElementValue::Int(i) => w.constant_value(&ConstantValue::Integer(*i)),
        ElementValue::Long(l) => w.constant_value(&ConstantValue::Long(*l)),
        ElementValue::Float(f) => w.constant_value(&ConstantValue::Float(*f)),
        ElementValue::Double(d) => w.constant_value(&ConstantValue::Double(*d)),
        ElementValue::String(s) | ElementValue::Class(s) => w.utf8(s),
        ElementValue::Enum { descriptor, name } => {
            w.utf8(descriptor)?;
            w.utf8(name)
        }
        ElementValue::Annotation(annotation) => write_annotation(w, annotation),
        ElementValue::Array(values) => w.list("array elements", values, write_element_value),
    }
}
