//! Native field storage that datums can view
//!
//! An attributed object keeps its prescribed data in [`Field`]s. Each field
//! owns an [`ExternalStorage`] buffer; the object's scope holds external
//! datums viewing the same buffer, so writes through either side are seen by
//! the other. Cloning a field copies the buffer, which is why a cloned object
//! must be re-populated to re-point its datums.

use crate::datum::{DatumType, DatumValue, Values};
use crate::error::{Error, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A shared, fixed-length element buffer
#[derive(Clone)]
pub struct ExternalStorage {
    cell: Arc<RwLock<Values>>,
}

impl ExternalStorage {
    /// Wrap a buffer for sharing
    ///
    /// Table buffers are rejected: child scopes are owned by the tree.
    pub fn new(values: Values) -> Result<Self> {
        if values.kind() == DatumType::Table {
            return Err(Error::UnsupportedOperation(
                "external storage for a table".into(),
            ));
        }
        Ok(Self::wrap(values))
    }

    fn wrap(values: Values) -> Self {
        Self {
            cell: Arc::new(RwLock::new(values)),
        }
    }

    /// Get the element type
    pub fn kind(&self) -> DatumType {
        self.cell.read().kind()
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        self.cell.read().len()
    }

    /// Check if the buffer has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the buffer for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Values> {
        self.cell.read()
    }

    /// Lock the buffer for writing
    ///
    /// Callers must not change the buffer's length.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Values> {
        self.cell.write()
    }

    /// Check if two handles view the same buffer
    pub fn ptr_eq(&self, other: &ExternalStorage) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Copy the buffer into a new, unshared storage
    pub fn detach(&self) -> Self {
        Self::wrap(self.cell.read().clone())
    }
}

impl fmt::Debug for ExternalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExternalStorage")
            .field(&*self.cell.read())
            .finish()
    }
}

/// A typed native field backed by shareable storage
///
/// Cloning a field deep-copies its value.
pub struct Field<T: DatumValue> {
    storage: ExternalStorage,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DatumValue> Field<T> {
    /// Create a single-element field
    pub fn new(value: T) -> Self {
        Self::array(vec![value])
    }

    /// Create a fixed-length array field
    pub fn array(items: Vec<T>) -> Self {
        Self {
            storage: ExternalStorage::wrap(T::into_values(items)),
            _marker: PhantomData,
        }
    }

    /// Get element 0, or the default value for an empty array
    pub fn get(&self) -> T
    where
        T: Default,
    {
        self.get_at(0).unwrap_or_default()
    }

    /// Get the element at `index`
    pub fn get_at(&self, index: usize) -> Option<T> {
        T::slice(&self.storage.read()).and_then(|items| items.get(index).cloned())
    }

    /// Set element 0
    pub fn set(&self, value: T) {
        self.set_at(0, value);
    }

    /// Set the element at `index`, returning false if it is out of range
    pub fn set_at(&self, index: usize, value: T) -> bool {
        let mut values = self.storage.write();
        match T::slice_mut(&mut values).and_then(|items| items.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the field has no elements
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get the storage datums bind to
    pub fn storage(&self) -> &ExternalStorage {
        &self.storage
    }
}

impl<T: DatumValue> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.detach(),
            _marker: PhantomData,
        }
    }
}

impl<T: DatumValue + Default> Default for Field<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: DatumValue + fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match T::slice(&self.storage.read()) {
            Some([single]) => f.debug_tuple("Field").field(single).finish(),
            Some(items) => f.debug_tuple("Field").field(&items).finish(),
            None => f.write_str("Field(<invalid>)"),
        }
    }
}
