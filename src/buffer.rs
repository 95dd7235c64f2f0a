//! Growable byte container used by the shape-synthesis paths.
//!
//! Allocations are rounded up to the next power of two and never fall below
//! the system page size, so repeated appends amortize to O(1).

use std::sync::OnceLock;

/// Round `value` up to the next power of two.
pub(crate) fn npot(value: usize) -> usize {
    value.next_power_of_two()
}

fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        #[cfg(unix)]
        {
            let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            if sz > 0 {
                return sz as usize;
            }
        }
        4096
    })
}

fn npot_page(value: usize) -> usize {
    let page = page_size();
    if value < page {
        page
    } else {
        npot(value)
    }
}

/// Growable byte buffer.  `len() <= allocated()`; `allocated()` is zero or a
/// power of two no smaller than a page.
#[derive(Debug, Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer { data: Vec::new() }
    }

    /// Create a buffer with at least `preallocated` bytes of backing storage.
    pub fn with_capacity(preallocated: usize) -> Buffer {
        let mut b = Buffer::new();
        if preallocated > 0 {
            b.ensure_allocation(preallocated);
        }
        b
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes of backing storage currently allocated.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.data.capacity()
    }

    fn ensure_allocation(&mut self, allocation: usize) {
        if allocation > self.data.capacity() {
            let target = npot_page(allocation);
            self.data.reserve_exact(target - self.data.len());
        }
    }

    /// Grow (zero-filling) or shrink the logical size.
    pub fn set_len(&mut self, len: usize) {
        if len > self.data.capacity() {
            self.ensure_allocation(len);
        }
        self.data.resize(len, 0);
    }

    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.ensure_allocation(self.data.len() + data.len());
        self.data.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.data = Vec::new();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the contents out, leaving the buffer empty.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Buffer {
        Buffer { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npot_rounds_up() {
        assert_eq!(npot(1), 1);
        assert_eq!(npot(3), 4);
        assert_eq!(npot(4096), 4096);
        assert_eq!(npot(4097), 8192);
    }

    #[test]
    fn allocation_is_power_of_two_at_least_a_page() {
        let mut b = Buffer::new();
        assert_eq!(b.allocated(), 0);
        b.append(b"x");
        assert!(b.allocated() >= 4096);
        assert!(b.allocated().is_power_of_two());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn append_accumulates() {
        let mut b = Buffer::new();
        b.append(b"hello ");
        b.append(b"world");
        assert_eq!(b.as_slice(), b"hello world");
        assert!(b.len() <= b.allocated());
    }

    #[test]
    fn set_len_zero_fills() {
        let mut b = Buffer::new();
        b.append(b"ab");
        b.set_len(4);
        assert_eq!(b.as_slice(), &[b'a', b'b', 0, 0]);
        b.set_len(1);
        assert_eq!(b.as_slice(), b"a");
    }

    #[test]
    fn clear_releases_storage() {
        let mut b = Buffer::new();
        b.append(&[0u8; 10000]);
        b.clear();
        assert_eq!(b.len(), 0);
        assert_eq!(b.allocated(), 0);
    }
}
