use crate::scan::buffer::LineBuffer;
use bytes::Bytes;
use parking_lot::Mutex;

/// Shared scan head over an immutable line buffer.
///
/// Every session advances the same cursor, so all connected clients observe
/// a single moving scan position. The mutex confines cursor mutation to one
/// producer at a time; row retrieval itself is a zero-copy slice.
pub struct LineScanner {
    buffer: LineBuffer,
    cursor: Mutex<u32>,
}

impl LineScanner {
    pub fn new(buffer: LineBuffer) -> Self {
        Self {
            buffer,
            cursor: Mutex::new(0),
        }
    }

    /// Emit the row under the cursor and advance it by one, wrapping at the
    /// end of the buffer. Returns the row and the updated cursor position.
    pub fn next_row(&self) -> (Bytes, u32) {
        let mut cursor = self.cursor.lock();
        let row = self.buffer.row(*cursor);
        *cursor = (*cursor + 1) % self.buffer.height();
        (row, *cursor)
    }

    /// Pixels per emitted row
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Rows in one full scan cycle
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Current cursor position
    pub fn position(&self) -> u32 {
        *self.cursor.lock()
    }
}
