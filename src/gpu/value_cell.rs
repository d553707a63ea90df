//! Change-tracked value slot used to marshal uniform, texture and define
//! values to the GPU.

/// A single mutable value with a dirty flag.
///
/// Every write marks the cell dirty; the owner of the GPU-side copy clears
/// the flag once the value has been uploaded. [`ValueCell::update_if_changed`]
/// skips the write (and the upload it would cause) when the new value equals
/// the current one.
#[derive(Debug, Clone)]
pub struct ValueCell<T> {
    value: T,
    dirty: bool,
    version: u64,
}

impl<T> ValueCell<T> {
    /// Create a cell holding `value`. New cells start dirty so the first
    /// synchronization uploads them.
    pub fn new(value: T) -> Self {
        Self {
            value,
            dirty: true,
            version: 0,
        }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Unconditionally replace the value and mark the cell dirty.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
        self.version = self.version.wrapping_add(1);
    }

    /// Whether the value changed since the last [`ValueCell::clear`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of writes since construction.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Mark the current value as synchronized.
    pub fn clear(&mut self) {
        self.dirty = false;
    }
}

impl<T: PartialEq> ValueCell<T> {
    /// Replace the value only if it differs from the current one. Returns
    /// whether a write happened.
    pub fn update_if_changed(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.set(value);
        true
    }
}
