#![allow(missing_docs)]

//! Parse binary data
//!
//! Every decoder in this crate is written against a [ReadScope], a window of bytes that
//! remembers its position in the containing blob, and a [ReadCtxt], a cursor over a scope.
//! Reads never go outside the scope they were started in.

use crate::binary::{I16Be, I32Be, I64Be, U16Be, U32Be, I8, U8};
use crate::error::ParseError;
use crate::size;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Copy, Clone)]
pub struct ReadEof {}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadScope<'a> {
    base: usize,
    data: &'a [u8],
}

#[derive(Clone)]
pub struct ReadCtxt<'a> {
    scope: ReadScope<'a>,
    offset: usize,
}

pub trait ReadBinary {
    type HostType<'a>: Sized; // default = Self

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError>;
}

pub trait ReadBinaryDep {
    type Args<'a>: Copy;
    type HostType<'a>: Sized; // default = Self

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        args: Self::Args<'a>,
    ) -> Result<Self::HostType<'a>, ParseError>;
}

/// A value that is decoded from exactly `SIZE` bytes.
pub trait ReadFixed {
    type HostType: Sized; // default = Self

    const SIZE: usize;

    /// Decode from a slice that is exactly `SIZE` bytes long.
    fn from_bytes(bytes: &[u8]) -> Self::HostType;
}

pub trait ReadFrom {
    type ReadType: ReadFixed;
    fn read_from(value: <Self::ReadType as ReadFixed>::HostType) -> Self;
}

impl<T> ReadFixed for T
where
    T: ReadFrom,
{
    type HostType = T;

    const SIZE: usize = T::ReadType::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        T::read_from(T::ReadType::from_bytes(bytes))
    }
}

impl<T> ReadBinary for T
where
    T: ReadFixed,
{
    type HostType<'a> = T::HostType;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let bytes = ctxt.read_slice(T::SIZE)?;
        Ok(T::from_bytes(bytes))
    }
}

impl<T> ReadBinaryDep for T
where
    T: ReadBinary,
{
    type Args<'a> = ();
    type HostType<'a> = T::HostType<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (): Self::Args<'_>,
    ) -> Result<Self::HostType<'a>, ParseError> {
        T::read(ctxt)
    }
}

/// A lazily decoded array of fixed size items.
#[derive(Clone)]
pub struct ReadArray<'a, T: ReadFixed> {
    scope: ReadScope<'a>,
    length: usize,
    phantom: PhantomData<T>,
}

pub struct ReadArrayIter<'a, T: ReadFixed> {
    scope: ReadScope<'a>,
    index: usize,
    length: usize,
    phantom: PhantomData<T>,
}

impl<'a> ReadScope<'a> {
    pub fn new(data: &'a [u8]) -> ReadScope<'a> {
        let base = 0;
        ReadScope { base, data }
    }

    /// A scope over `data` that is located at `base` in the containing blob.
    pub fn with_base(base: usize, data: &'a [u8]) -> ReadScope<'a> {
        ReadScope { base, data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn offset(&self, offset: usize) -> ReadScope<'a> {
        let base = self.base + offset;
        let data = self.data.get(offset..).unwrap_or(&[]);
        ReadScope { base, data }
    }

    pub fn offset_length(&self, offset: usize, length: usize) -> Result<ReadScope<'a>, ParseError> {
        if offset < self.data.len() || length == 0 {
            let data = self.data.get(offset..).unwrap_or(&[]);
            match data.get(..length) {
                Some(data) => Ok(ReadScope {
                    base: self.base + offset,
                    data,
                }),
                None => Err(ParseError::BadEof),
            }
        } else {
            Err(ParseError::BadOffset)
        }
    }

    pub fn ctxt(&self) -> ReadCtxt<'a> {
        ReadCtxt::new(*self)
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(&self) -> Result<T::HostType<'a>, ParseError> {
        self.ctxt().read::<T>()
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, ParseError> {
        self.ctxt().read_dep::<T>(args)
    }
}

impl<'a> ReadCtxt<'a> {
    /// ReadCtxt is constructed by calling `ReadScope::ctxt`.
    fn new(scope: ReadScope<'a>) -> ReadCtxt<'a> {
        ReadCtxt { scope, offset: 0 }
    }

    pub fn check(&self, cond: bool) -> Result<(), ParseError> {
        match cond {
            true => Ok(()),
            false => Err(ParseError::BadValue),
        }
    }

    /// Check a condition, returning `ParseError::BadVersion` if `false`.
    ///
    /// ```
    /// use sfnt_cid::binary::read::ReadScope;
    /// use sfnt_cid::error::ParseError;
    ///
    /// let scope = ReadScope::new(&[0, 2]);
    /// let mut ctxt = scope.ctxt();
    /// let major_version = ctxt.read_u16be().expect("unable to read version");
    ///
    /// assert!(ctxt.check_version(major_version == 2).is_ok());
    /// assert_eq!(ctxt.check_version(major_version == 1), Err(ParseError::BadVersion));
    /// ```
    pub fn check_version(&self, cond: bool) -> Result<(), ParseError> {
        match cond {
            true => Ok(()),
            false => Err(ParseError::BadVersion),
        }
    }

    pub fn scope(&self) -> ReadScope<'a> {
        self.scope.offset(self.offset)
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(&mut self) -> Result<T::HostType<'a>, ParseError> {
        T::read_dep(self, ())
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &mut self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, ParseError> {
        T::read_dep(self, args)
    }

    pub fn bytes_available(&self) -> bool {
        self.offset < self.scope.data.len()
    }

    /// Number of bytes left between the cursor and the end of the scope.
    pub fn remaining(&self) -> usize {
        self.scope.data.len().saturating_sub(self.offset)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ReadEof> {
        let end = self.offset.checked_add(N).ok_or(ReadEof {})?;
        let bytes = self.scope.data.get(self.offset..end).ok_or(ReadEof {})?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        self.offset = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadEof> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn read_u16be(&mut self) -> Result<u16, ReadEof> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    pub fn read_i16be(&mut self) -> Result<i16, ReadEof> {
        self.take::<2>().map(i16::from_be_bytes)
    }

    pub fn read_u32be(&mut self) -> Result<u32, ReadEof> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    pub fn skip(&mut self, length: usize) -> Result<(), ReadEof> {
        self.read_slice(length).map(|_| ())
    }

    pub fn read_array<T: ReadFixed>(
        &mut self,
        length: usize,
    ) -> Result<ReadArray<'a, T>, ParseError> {
        let byte_length = length
            .checked_mul(T::SIZE)
            .ok_or(ParseError::LimitExceeded)?;
        let scope = self.read_scope(byte_length)?;
        Ok(ReadArray {
            scope,
            length,
            phantom: PhantomData,
        })
    }

    /// Read as many items as fit, up to `length`.
    pub fn read_array_upto<T: ReadFixed>(
        &mut self,
        length: usize,
    ) -> Result<ReadArray<'a, T>, ParseError> {
        let max_length = self.remaining() / T::SIZE;
        self.read_array(length.min(max_length))
    }

    pub fn read_scope(&mut self, length: usize) -> Result<ReadScope<'a>, ReadEof> {
        if let Ok(scope) = self.scope.offset_length(self.offset, length) {
            self.offset += length;
            Ok(scope)
        } else {
            Err(ReadEof {})
        }
    }

    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], ReadEof> {
        let scope = self.read_scope(length)?;
        Ok(scope.data)
    }
}

impl<'a, T: ReadFixed> ReadArray<'a, T> {
    pub fn empty() -> ReadArray<'a, T> {
        ReadArray {
            scope: ReadScope::new(&[]),
            length: 0,
            phantom: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get_item(&self, index: usize) -> Option<T::HostType> {
        if index < self.length {
            let start = index * T::SIZE;
            let bytes = self.scope.data.get(start..start + T::SIZE)?;
            Some(T::from_bytes(bytes))
        } else {
            None
        }
    }

    pub fn read_item(&self, index: usize) -> Result<T::HostType, ParseError> {
        self.get_item(index).ok_or(ParseError::BadIndex)
    }

    pub fn last(&self) -> Option<T::HostType> {
        let index = self.length.checked_sub(1)?;
        self.get_item(index)
    }

    pub fn iter(&self) -> ReadArrayIter<'a, T> {
        ReadArrayIter {
            scope: self.scope,
            index: 0,
            length: self.length,
            phantom: PhantomData,
        }
    }

    pub fn to_vec(&self) -> Vec<T::HostType> {
        self.iter().collect()
    }

    // Derived from the function on slice in the standard library
    pub fn binary_search_by<F>(&self, mut f: F) -> Result<usize, usize>
    where
        F: FnMut(T::HostType) -> Ordering,
    {
        let mut left = 0;
        let mut right = self.length;
        while left < right {
            let mid = left + (right - left) / 2;
            let item = match self.get_item(mid) {
                Some(item) => item,
                None => return Err(left),
            };
            match f(item) {
                Ordering::Less => left = mid + 1,
                Ordering::Greater => right = mid,
                Ordering::Equal => return Ok(mid),
            }
        }

        Err(left)
    }
}

impl<'a, 'b, T: ReadFixed> IntoIterator for &'b ReadArray<'a, T> {
    type Item = T::HostType;
    type IntoIter = ReadArrayIter<'a, T>;
    fn into_iter(self) -> ReadArrayIter<'a, T> {
        self.iter()
    }
}

impl<'a, T: ReadFixed> Iterator for ReadArrayIter<'a, T> {
    type Item = T::HostType;

    fn next(&mut self) -> Option<T::HostType> {
        if self.index >= self.length {
            return None;
        }
        let start = self.index * T::SIZE;
        let bytes = self.scope.data.get(start..start + T::SIZE)?;
        self.index += 1;
        Some(T::from_bytes(bytes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.length - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, T: ReadFixed> ExactSizeIterator for ReadArrayIter<'a, T> {}

macro_rules! impl_read_fixed {
    ($ty:ty, $host:ty, $size:expr) => {
        impl ReadFixed for $ty {
            type HostType = $host;

            const SIZE: usize = $size;

            fn from_bytes(bytes: &[u8]) -> $host {
                let mut buf = [0; $size];
                buf.copy_from_slice(bytes);
                <$host>::from_be_bytes(buf)
            }
        }
    };
}

impl_read_fixed!(U8, u8, size::U8);
impl_read_fixed!(I8, i8, size::I8);
impl_read_fixed!(U16Be, u16, size::U16);
impl_read_fixed!(I16Be, i16, size::I16);
impl_read_fixed!(U32Be, u32, size::U32);
impl_read_fixed!(I32Be, i32, size::I32);
impl_read_fixed!(I64Be, i64, size::I64);

impl<T1, T2> ReadFixed for (T1, T2)
where
    T1: ReadFixed,
    T2: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        let (b1, b2) = bytes.split_at(T1::SIZE);
        (T1::from_bytes(b1), T2::from_bytes(b2))
    }
}

impl<T1, T2, T3> ReadFixed for (T1, T2, T3)
where
    T1: ReadFixed,
    T2: ReadFixed,
    T3: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType, T3::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE + T3::SIZE;

    fn from_bytes(bytes: &[u8]) -> Self::HostType {
        let (b1, rest) = bytes.split_at(T1::SIZE);
        let (b2, b3) = rest.split_at(T2::SIZE);
        (T1::from_bytes(b1), T2::from_bytes(b2), T3::from_bytes(b3))
    }
}

impl<'a, T> fmt::Debug for ReadArray<'a, T>
where
    T: ReadFixed,
    T::HostType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.iter()).finish()
    }
}
