//! Typed, resizable value cells
//!
//! A [`Datum`] holds a homogeneous array of one [`DatumType`]. The type is
//! fixed the first time it is set. Storage is either internal (the datum owns
//! and grows its buffer) or external (the datum is a view onto an
//! [`ExternalStorage`] buffer owned by a native field), in which case nothing
//! that would reallocate is allowed.

use crate::error::{Error, Result};
use crate::field::ExternalStorage;
use crate::{Handle, ScopeId};
use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Smallest capacity allocated when an internal datum first grows
const MIN_CAPACITY: usize = 4;

/// The element type of a datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DatumType {
    /// Not assigned yet
    #[default]
    Unknown,
    /// 32-bit signed integers
    Integer,
    /// 32-bit floats
    Float,
    /// Owned strings
    String,
    /// Four-component float vectors
    Vector4,
    /// 4x4 float matrices
    Matrix4,
    /// Polymorphic handles
    Pointer,
    /// Nested child scopes
    Table,
}

impl DatumType {
    /// Get the display name of this type
    pub fn name(&self) -> &'static str {
        match self {
            DatumType::Unknown => "unknown",
            DatumType::Integer => "integer",
            DatumType::Float => "float",
            DatumType::String => "string",
            DatumType::Vector4 => "vector4",
            DatumType::Matrix4 => "matrix4",
            DatumType::Pointer => "pointer",
            DatumType::Table => "table",
        }
    }

    /// Check if no type has been assigned
    pub fn is_unknown(&self) -> bool {
        matches!(self, DatumType::Unknown)
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A homogeneous element buffer tagged with its type
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Integer(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<String>),
    Vector4(Vec<Vec4>),
    Matrix4(Vec<Mat4>),
    Pointer(Vec<Handle>),
    Table(Vec<ScopeId>),
}

macro_rules! each_buffer {
    ($values:expr, $buf:ident => $body:expr) => {
        match $values {
            Values::Integer($buf) => $body,
            Values::Float($buf) => $body,
            Values::String($buf) => $body,
            Values::Vector4($buf) => $body,
            Values::Matrix4($buf) => $body,
            Values::Pointer($buf) => $body,
            Values::Table($buf) => $body,
        }
    };
}

macro_rules! map_buffer {
    ($values:expr, $buf:ident => $body:expr) => {
        match $values {
            Values::Integer($buf) => Values::Integer($body),
            Values::Float($buf) => Values::Float($body),
            Values::String($buf) => Values::String($body),
            Values::Vector4($buf) => Values::Vector4($body),
            Values::Matrix4($buf) => Values::Matrix4($body),
            Values::Pointer($buf) => Values::Pointer($body),
            Values::Table($buf) => Values::Table($body),
        }
    };
}

impl Values {
    /// Create an empty buffer for a type (`None` for `Unknown`)
    pub fn empty(kind: DatumType) -> Option<Self> {
        Self::zeroed(kind, 0)
    }

    /// Create a buffer of `len` zero values
    ///
    /// Tables cannot hold zero values, so a table buffer is always empty.
    pub fn zeroed(kind: DatumType, len: usize) -> Option<Self> {
        let values = match kind {
            DatumType::Unknown => return None,
            DatumType::Integer => Values::Integer(vec![0; len]),
            DatumType::Float => Values::Float(vec![0.0; len]),
            DatumType::String => Values::String(vec![String::new(); len]),
            DatumType::Vector4 => Values::Vector4(vec![Vec4::ZERO; len]),
            DatumType::Matrix4 => Values::Matrix4(vec![Mat4::ZERO; len]),
            DatumType::Pointer => Values::Pointer(vec![Handle::null(); len]),
            DatumType::Table => Values::Table(Vec::new()),
        };
        Some(values)
    }

    /// Get the element type
    pub fn kind(&self) -> DatumType {
        match self {
            Values::Integer(_) => DatumType::Integer,
            Values::Float(_) => DatumType::Float,
            Values::String(_) => DatumType::String,
            Values::Vector4(_) => DatumType::Vector4,
            Values::Matrix4(_) => DatumType::Matrix4,
            Values::Pointer(_) => DatumType::Pointer,
            Values::Table(_) => DatumType::Table,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        each_buffer!(self, buf => buf.len())
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reserve_exact(&mut self, additional: usize) {
        each_buffer!(self, buf => buf.reserve_exact(additional))
    }

    /// Resize, filling new slots with the type's zero value
    fn resize(&mut self, len: usize) {
        match self {
            Values::Integer(v) => v.resize(len, 0),
            Values::Float(v) => v.resize(len, 0.0),
            Values::String(v) => v.resize(len, String::new()),
            Values::Vector4(v) => v.resize(len, Vec4::ZERO),
            Values::Matrix4(v) => v.resize(len, Mat4::ZERO),
            Values::Pointer(v) => v.resize(len, Handle::null()),
            Values::Table(v) => v.truncate(len),
        }
    }

    /// Copy the first `len` elements into a new buffer
    fn prefix(&self, len: usize) -> Values {
        map_buffer!(self, buf => buf[..len.min(buf.len())].to_vec())
    }

    /// Overwrite the first `source.len()` elements with `source`
    fn overwrite_prefix(&mut self, source: &Values) -> Result<()> {
        fn copy<T: Clone>(dst: &mut [T], src: &[T]) -> Result<()> {
            let size = dst.len();
            let dst = dst.get_mut(..src.len()).ok_or(Error::IndexOutOfRange {
                index: src.len(),
                size,
            })?;
            dst.clone_from_slice(src);
            Ok(())
        }

        match (self, source) {
            (Values::Integer(dst), Values::Integer(src)) => copy(dst, src),
            (Values::Float(dst), Values::Float(src)) => copy(dst, src),
            (Values::String(dst), Values::String(src)) => copy(dst, src),
            (Values::Vector4(dst), Values::Vector4(src)) => copy(dst, src),
            (Values::Matrix4(dst), Values::Matrix4(src)) => copy(dst, src),
            (Values::Pointer(dst), Values::Pointer(src)) => copy(dst, src),
            (dst, src) => Err(Error::mismatch(dst.kind(), src.kind())),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Element types a datum can store directly
///
/// Implemented for `i32`, `f32`, `String`, `Vec4`, `Mat4` and [`Handle`].
/// Table elements are managed by the scope tree and are not a `DatumValue`.
pub trait DatumValue: Clone + PartialEq + Send + Sync + 'static + sealed::Sealed {
    /// The datum type this element maps to
    const TYPE: DatumType;

    /// Borrow the elements if the buffer has this type
    fn slice(values: &Values) -> Option<&[Self]>;

    /// Mutably borrow the elements if the buffer has this type
    fn slice_mut(values: &mut Values) -> Option<&mut Vec<Self>>;

    /// Wrap elements in a tagged buffer
    fn into_values(items: Vec<Self>) -> Values;
}

macro_rules! datum_value {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl DatumValue for $ty {
            const TYPE: DatumType = DatumType::$variant;

            fn slice(values: &Values) -> Option<&[Self]> {
                match values {
                    Values::$variant(items) => Some(items),
                    _ => None,
                }
            }

            fn slice_mut(values: &mut Values) -> Option<&mut Vec<Self>> {
                match values {
                    Values::$variant(items) => Some(items),
                    _ => None,
                }
            }

            fn into_values(items: Vec<Self>) -> Values {
                Values::$variant(items)
            }
        }
    };
}

datum_value!(i32, Integer);
datum_value!(f32, Float);
datum_value!(String, String);
datum_value!(Vec4, Vector4);
datum_value!(Mat4, Matrix4);
datum_value!(Handle, Pointer);

#[derive(Debug, Clone, Default)]
enum Storage {
    #[default]
    Unallocated,
    Internal(Values),
    External(ExternalStorage),
}

/// A typed, homogeneous, growable value cell
///
/// Cloning an external datum copies the view, not the viewed buffer.
#[derive(Debug, Clone, Default)]
pub struct Datum {
    kind: DatumType,
    size: usize,
    capacity: usize,
    storage: Storage,
}

impl Datum {
    /// Create an untyped, empty datum
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty datum of the given type
    pub fn with_type(kind: DatumType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Create an internal datum holding `items`
    pub fn from_values<T: DatumValue>(items: Vec<T>) -> Self {
        let size = items.len();
        Self {
            kind: T::TYPE,
            size,
            capacity: size,
            storage: Storage::Internal(T::into_values(items)),
        }
    }

    /// Create an external datum viewing `storage`
    pub fn external(storage: &ExternalStorage) -> Self {
        let mut datum = Self::new();
        datum.bind(storage);
        datum
    }

    /// Get the element type
    pub fn kind(&self) -> DatumType {
        self.kind
    }

    /// Get the number of live elements
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the number of elements that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if the datum has no live elements
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if the datum views external storage
    pub fn is_external(&self) -> bool {
        matches!(self.storage, Storage::External(_))
    }

    /// Get the viewed buffer of an external datum
    pub fn external_storage(&self) -> Option<&ExternalStorage> {
        match &self.storage {
            Storage::External(storage) => Some(storage),
            _ => None,
        }
    }

    /// Assign the element type
    ///
    /// Setting the current type again is a no-op; any other change fails.
    pub fn set_type(&mut self, kind: DatumType) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else if self.kind.is_unknown() {
            self.kind = kind;
            Ok(())
        } else {
            Err(Error::mismatch(self.kind, kind))
        }
    }

    /// Set the number of live elements
    ///
    /// Internal storage grows as needed and zero-fills new slots. External
    /// storage can only move within its fixed capacity.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        self.check_resizable()?;
        if let Storage::External(_) = self.storage {
            if size > self.capacity {
                return Err(Error::external("growing"));
            }
            self.size = size;
            return Ok(());
        }

        let capacity = self.capacity.max(size);
        let values = self.internal_mut()?;
        if size > values.len() {
            values.reserve_exact(capacity.saturating_sub(values.len()));
        }
        values.resize(size);
        self.capacity = capacity;
        self.size = size;
        Ok(())
    }

    /// Make room for `capacity` elements
    ///
    /// Fails if that would drop live elements, or if the storage is external
    /// and would have to grow.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if self.kind.is_unknown() {
            return Err(Error::InvalidState("cannot reserve for an untyped datum".into()));
        }
        if capacity < self.size {
            return Err(Error::InvalidState(format!(
                "reserving {} would truncate {} live elements",
                capacity, self.size
            )));
        }
        if capacity <= self.capacity {
            return Ok(());
        }
        if self.is_external() {
            return Err(Error::external("reserve"));
        }

        let values = self.internal_mut()?;
        let len = values.len();
        values.reserve_exact(capacity - len);
        self.capacity = capacity;
        Ok(())
    }

    /// Reset the size to zero
    ///
    /// Internal slots are cleared and the capacity is kept. External storage
    /// only resets the logical size.
    pub fn clear(&mut self) -> Result<()> {
        if self.kind == DatumType::Table {
            return Err(Error::UnsupportedOperation(
                "clearing a table datum; destroy its scopes through the tree".into(),
            ));
        }
        if let Storage::Internal(values) = &mut self.storage {
            values.resize(0);
        }
        self.size = 0;
        Ok(())
    }

    /// Read the element at `index`
    pub fn get<T: DatumValue>(&self, index: usize) -> Result<T> {
        self.check_access::<T>(index)?;
        let size = self.size;
        let read = |values: &Values| {
            T::slice(values)
                .and_then(|items| items.get(index))
                .cloned()
                .ok_or(Error::IndexOutOfRange { index, size })
        };
        match &self.storage {
            Storage::Unallocated => Err(Error::NullStorage),
            Storage::Internal(values) => read(values),
            Storage::External(storage) => read(&storage.read()),
        }
    }

    /// Overwrite the element at `index`
    pub fn set<T: DatumValue>(&mut self, value: T, index: usize) -> Result<()> {
        self.check_access::<T>(index)?;
        let size = self.size;
        let write = |values: &mut Values| -> Result<()> {
            let slot = T::slice_mut(values)
                .and_then(|items| items.get_mut(index))
                .ok_or(Error::IndexOutOfRange { index, size })?;
            *slot = value;
            Ok(())
        };
        match &mut self.storage {
            Storage::Unallocated => Err(Error::NullStorage),
            Storage::Internal(values) => write(values),
            Storage::External(storage) => write(&mut storage.write()),
        }
    }

    /// Append an element, assigning the type if it is still unknown
    pub fn push<T: DatumValue>(&mut self, value: T) -> Result<()> {
        self.set_type(T::TYPE)?;
        if self.is_external() {
            if self.size >= self.capacity {
                return Err(Error::external("growing"));
            }
            self.size += 1;
            return self.set(value, self.size - 1);
        }

        if self.size == self.capacity {
            self.reserve((self.capacity * 2).max(MIN_CAPACITY))?;
        }
        let values = self.internal_mut()?;
        let kind = values.kind();
        T::slice_mut(values)
            .ok_or(Error::mismatch(kind, T::TYPE))?
            .push(value);
        self.size += 1;
        Ok(())
    }

    /// Assign a single value to element 0, adopting the type if unknown
    pub fn assign<T: DatumValue>(&mut self, value: T) -> Result<()> {
        self.set_type(T::TYPE)?;
        if self.size == 0 {
            self.set_size(1)?;
        }
        self.set(value, 0)
    }

    /// Copy all live elements out
    pub fn to_vec<T: DatumValue>(&self) -> Result<Vec<T>> {
        if self.kind != T::TYPE {
            return Err(Error::mismatch(self.kind, T::TYPE));
        }
        let copy = |values: &Values| {
            T::slice(values)
                .map(|items| items[..self.size.min(items.len())].to_vec())
                .unwrap_or_default()
        };
        Ok(match &self.storage {
            Storage::Unallocated => Vec::new(),
            Storage::Internal(values) => copy(values),
            Storage::External(storage) => copy(&storage.read()),
        })
    }

    /// Switch to external storage viewing `storage`
    ///
    /// Fails if the datum already owns an internal buffer, which would
    /// otherwise be discarded silently.
    pub fn set_storage(&mut self, storage: &ExternalStorage) -> Result<()> {
        let kind = storage.kind();
        if !self.kind.is_unknown() && self.kind != kind {
            return Err(Error::mismatch(self.kind, kind));
        }
        if let Storage::Internal(_) = self.storage {
            return Err(Error::InvalidState(
                "datum already owns internal storage".into(),
            ));
        }
        self.bind(storage);
        Ok(())
    }

    /// Replace the contents with a copy of `source`
    ///
    /// The type is adopted if unknown. External storage is written in place
    /// and cannot grow.
    pub fn copy_from(&mut self, source: &Datum) -> Result<()> {
        if source.kind == DatumType::Table {
            return Err(Error::UnsupportedOperation(
                "copying a table datum; graft its scopes through the tree".into(),
            ));
        }
        if source.kind.is_unknown() {
            return Ok(());
        }
        self.set_type(source.kind)?;

        let Some(values) = source.snapshot() else {
            return self.clear();
        };
        match &mut self.storage {
            Storage::External(storage) => {
                if source.size > self.capacity {
                    return Err(Error::external("growing"));
                }
                storage.write().overwrite_prefix(&values)?;
            }
            storage => {
                *storage = Storage::Internal(values);
                self.capacity = source.size;
            }
        }
        self.size = source.size;
        Ok(())
    }

    /// Parse `input` and store it at `index`
    pub fn set_from_str(&mut self, input: &str, index: usize) -> Result<()> {
        let kind = self.kind;
        let parse_error = || Error::Parse {
            kind,
            input: input.to_string(),
        };
        match self.kind {
            DatumType::Integer => {
                let value: i32 = input.trim().parse().map_err(|_| parse_error())?;
                self.set(value, index)
            }
            DatumType::Float => {
                let value: f32 = input.trim().parse().map_err(|_| parse_error())?;
                self.set(value, index)
            }
            DatumType::String => self.set(input.to_string(), index),
            DatumType::Vector4 => {
                let [x, y, z, w] = parse_floats::<4>(input).ok_or_else(parse_error)?;
                self.set(Vec4::new(x, y, z, w), index)
            }
            DatumType::Matrix4 => {
                let cols = parse_floats::<16>(input).ok_or_else(parse_error)?;
                self.set(Mat4::from_cols_array(&cols), index)
            }
            DatumType::Unknown => Err(Error::InvalidState(
                "cannot parse into an untyped datum".into(),
            )),
            DatumType::Pointer | DatumType::Table => Err(Error::UnsupportedOperation(format!(
                "parsing a {} from text",
                self.kind
            ))),
        }
    }

    /// Render the element at `index` as text
    pub fn to_string_at(&self, index: usize) -> Result<String> {
        match self.kind {
            DatumType::Integer => Ok(self.get::<i32>(index)?.to_string()),
            DatumType::Float => Ok(self.get::<f32>(index)?.to_string()),
            DatumType::String => self.get::<String>(index),
            DatumType::Vector4 => Ok(join_floats(&self.get::<Vec4>(index)?.to_array())),
            DatumType::Matrix4 => Ok(join_floats(&self.get::<Mat4>(index)?.to_cols_array())),
            DatumType::Pointer => Ok(self.get::<Handle>(index)?.to_string()),
            DatumType::Unknown => Err(Error::NullStorage),
            DatumType::Table => Err(Error::UnsupportedOperation(
                "rendering a table datum as text".into(),
            )),
        }
    }

    /// Get the child scope ids of a table datum
    pub fn scopes(&self) -> Result<Vec<ScopeId>> {
        if self.kind != DatumType::Table {
            return Err(Error::mismatch(self.kind, DatumType::Table));
        }
        Ok(match &self.storage {
            Storage::Internal(Values::Table(ids)) => ids.clone(),
            _ => Vec::new(),
        })
    }

    /// Get the child scope at `index` of a table datum
    pub fn scope_at(&self, index: usize) -> Result<ScopeId> {
        let ids = self.scopes()?;
        ids.get(index).copied().ok_or(Error::IndexOutOfRange {
            index,
            size: ids.len(),
        })
    }

    pub(crate) fn push_scope(&mut self, id: ScopeId) -> Result<()> {
        self.set_type(DatumType::Table)?;
        let values = self.internal_mut()?;
        if let Values::Table(ids) = values {
            ids.push(id);
        }
        self.size += 1;
        self.capacity = self.capacity.max(self.size);
        Ok(())
    }

    pub(crate) fn remove_scope(&mut self, id: ScopeId) -> Option<usize> {
        let Storage::Internal(Values::Table(ids)) = &mut self.storage else {
            return None;
        };
        let index = ids.iter().position(|&child| child == id)?;
        ids.remove(index);
        self.size -= 1;
        Some(index)
    }

    pub(crate) fn replace_scopes(&mut self, replacement: Vec<ScopeId>) {
        self.size = replacement.len();
        self.capacity = self.capacity.max(self.size);
        self.storage = Storage::Internal(Values::Table(replacement));
    }

    fn bind(&mut self, storage: &ExternalStorage) {
        let len = storage.len();
        self.kind = storage.kind();
        self.size = len;
        self.capacity = len;
        self.storage = Storage::External(storage.clone());
    }

    fn check_resizable(&self) -> Result<()> {
        match self.kind {
            DatumType::Unknown => Err(Error::InvalidState(
                "cannot size an untyped datum".into(),
            )),
            DatumType::Table => Err(Error::UnsupportedOperation(
                "resizing a table datum; use the scope tree".into(),
            )),
            _ => Ok(()),
        }
    }

    fn check_access<T: DatumValue>(&self, index: usize) -> Result<()> {
        if self.kind != T::TYPE {
            return Err(Error::mismatch(self.kind, T::TYPE));
        }
        if let Storage::Unallocated = self.storage {
            return Err(Error::NullStorage);
        }
        if index >= self.size {
            return Err(Error::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    /// The internal buffer, allocating it on first use
    fn internal_mut(&mut self) -> Result<&mut Values> {
        if let Storage::Unallocated = self.storage {
            let values = Values::empty(self.kind).ok_or(Error::InvalidState(
                "cannot allocate storage for an untyped datum".into(),
            ))?;
            self.storage = Storage::Internal(values);
        }
        match &mut self.storage {
            Storage::Internal(values) => Ok(values),
            Storage::External(_) => Err(Error::external("reallocation")),
            Storage::Unallocated => Err(Error::NullStorage),
        }
    }

    /// Copy of the live elements, if any storage exists
    fn snapshot(&self) -> Option<Values> {
        match &self.storage {
            Storage::Unallocated => None,
            Storage::Internal(values) => Some(values.prefix(self.size)),
            Storage::External(storage) => Some(storage.read().prefix(self.size)),
        }
    }
}

/// Mutable access to one attribute of a scope
///
/// Only element operations are available: the attribute itself cannot be
/// replaced, and a prescribed attribute cannot be re-pointed at other storage.
/// Reads go through `Deref<Target = Datum>`.
///
/// ```compile_fail
/// use reflex_core::{Datum, Scope};
///
/// let mut scope = Scope::new();
/// *scope.append("Health") = Datum::from(10);
/// ```
pub struct DatumMut<'a> {
    datum: &'a mut Datum,
    prescribed: bool,
}

impl<'a> DatumMut<'a> {
    pub(crate) fn new(datum: &'a mut Datum, prescribed: bool) -> Self {
        Self { datum, prescribed }
    }

    pub(crate) fn into_inner(self) -> &'a mut Datum {
        self.datum
    }

    /// Check if the attribute is part of its scope's prescribed prefix
    pub fn is_prescribed(&self) -> bool {
        self.prescribed
    }

    /// See [`Datum::set_type`]
    pub fn set_type(&mut self, kind: DatumType) -> Result<()> {
        self.datum.set_type(kind)
    }

    /// See [`Datum::set_size`]
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        self.datum.set_size(size)
    }

    /// See [`Datum::reserve`]
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.datum.reserve(capacity)
    }

    /// See [`Datum::clear`]
    pub fn clear(&mut self) -> Result<()> {
        self.datum.clear()
    }

    /// See [`Datum::set`]
    pub fn set<T: DatumValue>(&mut self, value: T, index: usize) -> Result<()> {
        self.datum.set(value, index)
    }

    /// See [`Datum::push`]
    pub fn push<T: DatumValue>(&mut self, value: T) -> Result<()> {
        self.datum.push(value)
    }

    /// See [`Datum::assign`]
    pub fn assign<T: DatumValue>(&mut self, value: T) -> Result<()> {
        self.datum.assign(value)
    }

    /// See [`Datum::copy_from`]
    pub fn copy_from(&mut self, source: &Datum) -> Result<()> {
        self.datum.copy_from(source)
    }

    /// See [`Datum::set_from_str`]
    pub fn set_from_str(&mut self, input: &str, index: usize) -> Result<()> {
        self.datum.set_from_str(input, index)
    }

    /// See [`Datum::set_storage`]; prescribed attributes keep their binding
    pub fn set_storage(&mut self, storage: &ExternalStorage) -> Result<()> {
        if self.prescribed {
            return Err(Error::InvalidState(
                "cannot re-point a prescribed attribute".into(),
            ));
        }
        self.datum.set_storage(storage)
    }
}

impl Deref for DatumMut<'_> {
    type Target = Datum;

    fn deref(&self) -> &Datum {
        self.datum
    }
}

impl fmt::Debug for DatumMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatumMut")
            .field("datum", &*self.datum)
            .field("prescribed", &self.prescribed)
            .finish()
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind || self.size != other.size {
            return false;
        }
        if self.size == 0 {
            return true;
        }
        self.snapshot() == other.snapshot()
    }
}

impl<T: DatumValue> From<T> for Datum {
    fn from(value: T) -> Self {
        Datum::from_values(vec![value])
    }
}

fn parse_floats<const N: usize>(input: &str) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    let mut parts = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty());
    for slot in out.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    parts.next().is_none().then_some(out)
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
