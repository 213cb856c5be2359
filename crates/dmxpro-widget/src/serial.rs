//! Serial port abstraction
//!
//! [`SerialPort`] is the byte-level seam between the processor and whatever
//! carries host traffic: a UART, a USB CDC device, or a socket buffered
//! through [`MemorySerial`].

use std::collections::VecDeque;

/// Non-blocking, byte-oriented serial link
pub trait SerialPort {
    /// Number of bytes that can be read without blocking
    fn available(&self) -> usize;

    /// Read one byte, if any is available
    fn read_byte(&mut self) -> Option<u8>;

    /// Read up to `buf.len()` bytes, returning how many were read
    fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.read_byte() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Queue bytes for the host
    fn write(&mut self, bytes: &[u8]);

    /// Queue a single byte for the host
    fn write_byte(&mut self, byte: u8) {
        self.write(&[byte]);
    }
}

impl<T: SerialPort + ?Sized> SerialPort for &mut T {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn read_into(&mut self, buf: &mut [u8]) -> usize {
        (**self).read_into(buf)
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes);
    }

    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte);
    }
}

/// In-memory serial link
///
/// Bytes passed to [`MemorySerial::feed`] become readable by the widget;
/// bytes the widget writes accumulate until [`MemorySerial::take_output`].
#[derive(Debug, Clone, Default)]
pub struct MemorySerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl MemorySerial {
    /// Create an empty link
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link with `bytes` already waiting to be read
    #[must_use]
    pub fn with_input(bytes: &[u8]) -> Self {
        let mut serial = Self::new();
        serial.feed(bytes);
        serial
    }

    /// Queue host-to-widget bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Widget-to-host bytes written so far
    #[inline]
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.tx
    }

    /// Drain widget-to-host bytes
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Drop any unread input
    pub fn clear_input(&mut self) {
        self.rx.clear();
    }
}

impl SerialPort for MemorySerial {
    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..count)) {
            *slot = byte;
        }
        count
    }

    fn write(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }

    fn write_byte(&mut self, byte: u8) {
        self.tx.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_then_read_in_order() {
        let mut serial = MemorySerial::with_input(&[1, 2, 3]);
        assert_eq!(serial.available(), 3);
        assert_eq!(serial.read_byte(), Some(1));

        let mut buf = [0u8; 4];
        assert_eq!(serial.read_into(&mut buf), 2);
        assert_eq!(&buf[..2], &[2, 3]);
        assert_eq!(serial.read_byte(), None);
    }

    #[test]
    fn output_accumulates_until_taken() {
        let mut serial = MemorySerial::new();
        serial.write(&[0x7E, 0x0A]);
        serial.write_byte(0xE7);
        assert_eq!(serial.output(), &[0x7E, 0x0A, 0xE7]);
        assert_eq!(serial.take_output(), vec![0x7E, 0x0A, 0xE7]);
        assert!(serial.output().is_empty());
    }

    #[test]
    fn mutable_reference_is_a_port() {
        fn drain(mut port: impl SerialPort) -> usize {
            let mut n = 0;
            while port.read_byte().is_some() {
                n += 1;
            }
            n
        }

        let mut serial = MemorySerial::with_input(&[9; 5]);
        assert_eq!(drain(&mut serial), 5);
        assert_eq!(serial.available(), 0);
    }
}
