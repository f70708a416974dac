//! Chip address window implementations

/// Byte-addressable view of the attached chip
///
/// Offsets passed to [`read`](ChipWindow::read) and
/// [`write`](ChipWindow::write) are always below [`size`](ChipWindow::size);
/// the programmer performs the bounds checks before touching the window.
pub trait ChipWindow {
    /// Number of addressable bytes
    fn size(&self) -> usize;

    /// Read the byte at `offset`
    fn read(&mut self, offset: usize) -> u8;

    /// Write `value` at `offset`
    fn write(&mut self, offset: usize, value: u8);

    /// Check if a range lies entirely inside the window
    fn contains(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size())
    }
}

impl<W: ChipWindow + ?Sized> ChipWindow for &mut W {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read(&mut self, offset: usize) -> u8 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u8) {
        (**self).write(offset, value)
    }
}

/// Chip mapped into the address space by an external memory bus
///
/// Every access is volatile: a write may be the start of a chip command
/// sequence and a read may observe the chip's toggle/polling bits.
pub struct MappedWindow {
    /// First byte of the mapped range
    base: *mut u8,
    /// Size of the mapped range
    size: usize,
}

impl MappedWindow {
    /// Wrap an externally mapped address range
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base..base + size` is mapped to the chip for the lifetime of the window
    /// - No other code accesses the same range while the window exists
    pub unsafe fn new(base: *mut u8, size: usize) -> Self {
        Self { base, size }
    }
}

impl ChipWindow for MappedWindow {
    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn read(&mut self, offset: usize) -> u8 {
        debug_assert!(offset < self.size);
        // SAFETY: offset is inside the range the constructor vouched for
        unsafe { core::ptr::read_volatile(self.base.add(offset)) }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u8) {
        debug_assert!(offset < self.size);
        // SAFETY: offset is inside the range the constructor vouched for
        unsafe { core::ptr::write_volatile(self.base.add(offset), value) }
    }
}

/// Window over plain memory
///
/// Useful for FRAM-like targets backed by RAM and for tests.
pub struct SliceWindow<'a> {
    data: &'a mut [u8],
}

impl<'a> SliceWindow<'a> {
    /// Create a window over `data`
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Get a reference to the window contents
    pub fn data(&self) -> &[u8] {
        self.data
    }
}

impl ChipWindow for SliceWindow<'_> {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, offset: usize) -> u8 {
        self.data[offset]
    }

    fn write(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }
}
