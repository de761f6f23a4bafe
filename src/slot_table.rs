//! Fixed-length table of owned buffers
//!
//! Each slot holds at most one heap buffer. The recorded size of a slot is
//! the length of the buffer it owns, so a slot can never disagree with its
//! own bookkeeping: empty slots have size 0.

use std::hint::black_box;

/// Stride between touched bytes; one write per cache line
pub const TOUCH_STRIDE: usize = 64;

/// Write a sparse pattern so every page backing `buf` is committed
///
/// Bytes at offsets `0, 64, 128, ...` receive `(i ^ (n >> 3)) & 0xFF` and the
/// last byte receives `(n ^ 0x5A) & 0xFF`, where `n` is the buffer length.
/// An empty buffer is left untouched.
///
/// # Example
/// ```
/// use churnbench::slot_table::touch;
///
/// let mut buf = vec![0u8; 128];
/// touch(&mut buf);
/// assert_eq!(buf[0], 16);
/// assert_eq!(buf[64], 64 ^ 16);
/// assert_eq!(buf[127], (128 ^ 0x5A) as u8);
/// ```
pub fn touch(buf: &mut [u8]) {
    let n = buf.len();
    if n == 0 {
        return;
    }
    for i in (0..n).step_by(TOUCH_STRIDE) {
        buf[i] = ((i ^ (n >> 3)) & 0xFF) as u8;
    }
    buf[n - 1] = ((n ^ 0x5A) & 0xFF) as u8;
}

/// Ordered slots, each exclusively owning an optional buffer
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Vec<Option<Box<[u8]>>>,
}

impl SlotTable {
    /// Create `len` empty slots
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Recorded size of slot `index` (0 when empty or out of range)
    pub fn size_of(&self, index: usize) -> usize {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .map_or(0, |buf| buf.len())
    }

    /// Contents of slot `index`, if it holds a buffer
    pub fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index).and_then(Option::as_deref)
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Number of slots currently holding a buffer
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Sum of the recorded sizes of all occupied slots
    pub fn live_bytes(&self) -> u64 {
        self.iter_sizes().map(|size| size as u64).sum()
    }

    /// Recorded size of every slot in index order
    pub fn iter_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().map_or(0, |buf| buf.len()))
    }

    /// Free the buffer in slot `index`, returning its size
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn release(&mut self, index: usize) -> Option<usize> {
        self.slots[index].take().map(|buf| buf.len())
    }

    /// Allocate a touched buffer of `size` bytes into an empty slot `index`
    ///
    /// The caller releases any previous occupant first so the freed size can
    /// be accounted before the new one. Returns the installed size.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the slot is still occupied.
    pub fn install(&mut self, index: usize, size: usize) -> usize {
        let slot = &mut self.slots[index];
        assert!(slot.is_none(), "slot {index} must be released before reuse");

        let mut buf = vec![0u8; size].into_boxed_slice();
        touch(&mut buf);
        *slot = Some(black_box(buf));
        size
    }
}
