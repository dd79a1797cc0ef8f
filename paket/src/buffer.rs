//! The streaming decoder reads from a contiguous byte region that is appended to at the tail and
//! consumed from the head. Instead of shifting the remainder on every read, consumption just
//! advances a head index; the dead prefix is reclaimed in bulk the next time an append would
//! otherwise not fit. Appends therefore cost amortized linear time in the bytes fed, both for
//! copies and for reallocations.

use crate::error::DecodeError;

#[derive(Debug, Default)]
pub struct Buffer {
    buf: Vec<u8>,
    head: usize,
}

impl Buffer {

    pub fn new() -> Buffer {
        Buffer { buf: Vec::new(), head: 0 }
    }

    /// Number of unconsumed bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.buf.len()
    }

    /// Appends bytes at the tail. An empty buffer rewinds to the front first. If the tail room
    /// is exhausted but the live region plus the new bytes fit into the existing allocation, the
    /// live region is moved to the front instead of reallocating. Otherwise the backing store grows to at least twice its size. Growth is
    /// fallible and all-or-nothing: on `Allocation` the buffer is unchanged except for a possible
    /// compaction, which preserves every unconsumed byte.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        if self.head == self.buf.len() {
            self.buf.clear();
            self.head = 0;
        }
        if self.buf.len() + bytes.len() > self.buf.capacity() {
            self.buf.copy_within(self.head.., 0);
            let live = self.buf.len() - self.head;
            self.buf.truncate(live);
            self.head = 0;
            if live + bytes.len() > self.buf.capacity() {
                // Vec grows to max(2 * capacity, required), which is exactly the policy we need
                self.buf.try_reserve(bytes.len())?;
            }
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Consumes and returns the next `n` bytes, or `None` without consuming anything if fewer
    /// are available. The returned slice stays valid until the next `extend`.
    pub fn pull(&mut self, n: usize) -> Option<&[u8]> {
        if self.len() < n {
            None
        } else {
            self.head += n;
            Some(&self.buf[self.head - n..self.head])
        }
    }

    /// Discards the next `n` bytes. Panics if fewer are available.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len());
        self.head += n;
    }

}

#[cfg(test)]
mod tests {
    use super::Buffer;

    #[test]
    fn pull_in_feed_order() {
        let mut buf = Buffer::new();
        buf.extend(&[1, 2, 3]).unwrap();
        buf.extend(&[4, 5]).unwrap();
        assert_eq!(Some(&[1, 2][..]), buf.pull(2));
        assert_eq!(Some(&[3, 4, 5][..]), buf.pull(3));
        assert_eq!(0, buf.len());
        assert_eq!(None, buf.pull(1));
    }

    #[test]
    fn short_pull_consumes_nothing() {
        let mut buf = Buffer::new();
        buf.extend(&[1, 2, 3]).unwrap();
        assert_eq!(None, buf.pull(4));
        assert_eq!(3, buf.len());
        assert_eq!(Some(&[1, 2, 3][..]), buf.pull(3));
    }

    #[test]
    fn compaction_preserves_live_bytes() {
        let mut buf = Buffer::new();
        // leave a consumed prefix behind, then force appends past the tail
        buf.extend(&[0; 64]).unwrap();
        buf.consume(60);
        for round in 0u8..100 {
            buf.extend(&[round; 16]).unwrap();
        }
        assert_eq!(4 + 100 * 16, buf.len());
        assert_eq!(Some(&[0, 0, 0, 0][..]), buf.pull(4));
        for round in 0u8..100 {
            assert_eq!(Some(&[round; 16][..]), buf.pull(16));
        }
        assert!(buf.is_empty());
    }

}
