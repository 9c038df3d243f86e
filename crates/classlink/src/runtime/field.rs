//! Typed access to instance field blocks.
//!
//! An instance's fields live in a zeroed byte block whose first bytes are
//! its parent's block. Fields are read and written by byte offset with
//! bounds checks; [`View`] and [`ViewMut`] restrict access to the prefix
//! that belongs to one ancestor class.

use crate::error::{Error, Result};
use crate::runtime::Class;
use std::ops::Range;

mod sealed {
    pub trait Sealed {}
}

/// A plain value that can live in a field block.
///
/// Values are stored in native byte order with no alignment requirement.
/// Implemented for the primitive integers, floats and `bool` only.
pub trait Field: Copy + sealed::Sealed {
    /// Number of bytes the value occupies.
    const WIDTH: usize;

    /// Decodes the value from exactly [`Field::WIDTH`] bytes.
    fn read(bytes: &[u8]) -> Self;

    /// Encodes the value into exactly [`Field::WIDTH`] bytes.
    fn write(self, bytes: &mut [u8]);
}

macro_rules! impl_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Field for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn write(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_field!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

impl sealed::Sealed for bool {}

impl Field for bool {
    const WIDTH: usize = 1;

    fn read(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }
}

fn slot(size: usize, offset: usize, width: usize) -> Result<Range<usize>> {
    match offset.checked_add(width) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(Error::FieldOutOfBounds {
            offset,
            width,
            size,
        }),
    }
}

pub(crate) fn get<T: Field>(block: &[u8], offset: usize) -> Result<T> {
    let range = slot(block.len(), offset, T::WIDTH)?;
    Ok(T::read(&block[range]))
}

pub(crate) fn set<T: Field>(block: &mut [u8], offset: usize, value: T) -> Result<()> {
    let range = slot(block.len(), offset, T::WIDTH)?;
    value.write(&mut block[range]);
    Ok(())
}

/// Read-only view of an instance as one of its ancestors.
///
/// Only the ancestor's prefix of the field block is reachable.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    class: Class,
    fields: &'a [u8],
}

impl<'a> View<'a> {
    pub(crate) fn new(class: Class, fields: &'a [u8]) -> Self {
        View { class, fields }
    }

    /// Class this view presents the instance as.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Visible bytes.
    #[must_use]
    pub fn fields(&self) -> &'a [u8] {
        self.fields
    }

    /// Reads a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfBounds`] outside the visible prefix.
    pub fn get<T: Field>(&self, offset: usize) -> Result<T> {
        get(self.fields, offset)
    }
}

/// Mutable view of an instance as one of its ancestors.
#[derive(Debug)]
pub struct ViewMut<'a> {
    class: Class,
    fields: &'a mut [u8],
}

impl<'a> ViewMut<'a> {
    pub(crate) fn new(class: Class, fields: &'a mut [u8]) -> Self {
        ViewMut { class, fields }
    }

    /// Class this view presents the instance as.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Reads a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfBounds`] outside the visible prefix.
    pub fn get<T: Field>(&self, offset: usize) -> Result<T> {
        get(self.fields, offset)
    }

    /// Writes a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfBounds`] outside the visible prefix.
    pub fn set<T: Field>(&mut self, offset: usize, value: T) -> Result<()> {
        set(self.fields, offset, value)
    }
}
