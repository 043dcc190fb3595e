//! Polymorphic handles stored in pointer datums

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A nullable, shared, type-erased reference
///
/// Two handles are equal when they point at the same allocation (or are both
/// null). The referenced value can be inspected with [`Handle::is`] and
/// [`Handle::downcast_ref`].
#[derive(Clone, Default)]
pub struct Handle(Option<Arc<dyn Any + Send + Sync>>);

impl Handle {
    /// Create a handle owning a new shared value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Create a handle from an existing shared value
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(Some(value))
    }

    /// The null handle
    pub fn null() -> Self {
        Self(None)
    }

    /// Check if this handle is null
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Check if the referenced value has type `T`
    pub fn is<T: Any>(&self) -> bool {
        self.0.as_ref().is_some_and(|value| value.is::<T>())
    }

    /// Borrow the referenced value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }

    fn address(&self) -> Option<*const ()> {
        self.0.as_ref().map(|value| Arc::as_ptr(value) as *const ())
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(ptr) => write!(f, "{:p}", ptr),
            None => write!(f, "null"),
        }
    }
}
