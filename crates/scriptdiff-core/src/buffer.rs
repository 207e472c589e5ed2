//! Growable byte buffers with a hard capacity.

use crate::error::FixtureError;

/// A byte buffer that refuses to grow past its declared capacity.
///
/// Every write path checks the capacity before storing, so a caller can
/// never push the buffer past `capacity()` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedBytes {
    bytes: Vec<u8>,
    capacity: usize,
}

impl BoundedBytes {
    /// Create an empty buffer with the given maximum.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
        }
    }

    /// Wrap existing bytes, failing if they already exceed `capacity`.
    pub fn from_vec(bytes: Vec<u8>, capacity: usize) -> Result<Self, FixtureError> {
        if bytes.len() > capacity {
            return Err(FixtureError::Capacity {
                capacity,
                attempted: bytes.len(),
            });
        }
        Ok(Self { bytes, capacity })
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) -> Result<(), FixtureError> {
        if self.is_full() {
            return Err(FixtureError::Capacity {
                capacity: self.capacity,
                attempted: self.bytes.len() + 1,
            });
        }
        self.bytes.push(byte);
        Ok(())
    }

    /// Append a slice, all or nothing.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), FixtureError> {
        let attempted = self.bytes.len().saturating_add(data.len());
        if attempted > self.capacity {
            return Err(FixtureError::Capacity {
                capacity: self.capacity,
                attempted,
            });
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for BoundedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
