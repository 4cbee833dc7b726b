//! Byte Size Module
//!
//! Deterministic weights used by the byte budget. Numbers weigh 8 bytes,
//! booleans 4, text 2 bytes per UTF-16 code unit and byte buffers their
//! length. Anything else weighs nothing unless it says otherwise.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

/// Weight of a numeric value.
pub const NUMBER_SIZE: usize = 8;

/// Weight of a boolean value.
pub const BOOL_SIZE: usize = 4;

/// Weight of one UTF-16 code unit of text.
pub const CODE_UNIT_SIZE: usize = 2;

// == Byte Size ==
/// Weight of a key or value for the byte budget.
///
/// The default weight is zero. Implement this for your own value types to
/// make them count against `max_bytes`, or pass an explicit `length` in the
/// entry metadata.
pub trait ByteSize {
    /// Returns the weight in bytes.
    fn byte_size(&self) -> usize {
        0
    }
}

/// Weight of a string slice: 2 bytes per UTF-16 code unit.
pub fn text_size(text: &str) -> usize {
    text.encode_utf16().count() * CODE_UNIT_SIZE
}

macro_rules! impl_number_size {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteSize for $ty {
                fn byte_size(&self) -> usize {
                    NUMBER_SIZE
                }
            }
        )*
    };
}

impl_number_size!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ByteSize for bool {
    fn byte_size(&self) -> usize {
        BOOL_SIZE
    }
}

impl ByteSize for char {
    fn byte_size(&self) -> usize {
        self.len_utf16() * CODE_UNIT_SIZE
    }
}

impl ByteSize for str {
    fn byte_size(&self) -> usize {
        text_size(self)
    }
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        text_size(self)
    }
}

impl ByteSize for Cow<'_, str> {
    fn byte_size(&self) -> usize {
        text_size(self)
    }
}

impl ByteSize for [u8] {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Vec<u8> {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for () {}

impl<T: ByteSize> ByteSize for Option<T> {
    fn byte_size(&self) -> usize {
        self.as_ref().map_or(0, ByteSize::byte_size)
    }
}

impl<T: ByteSize + ?Sized> ByteSize for &T {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Box<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Rc<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Arc<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

/// JSON values are weighed by kind; arrays and objects weigh nothing.
impl ByteSize for Value {
    fn byte_size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Bool(_) => BOOL_SIZE,
            Value::Number(_) => NUMBER_SIZE,
            Value::String(text) => text_size(text),
            Value::Array(_) | Value::Object(_) => 0,
        }
    }
}
