// Fixed-value patterns
//
// Zero and One need no state and live directly on `OverwritePattern`.
// Zero/One alternates: each block is first written with 0x00, then the
// stream is rewound and the same block is written with 0xFF.

/// Toggle driving the Zero/One pattern
#[derive(Debug, Clone, Default)]
pub struct ZeroOneToggle {
    one_next: bool,
}

impl ZeroOneToggle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the toggle and return the buffer for the pass it selected
    pub fn next_buffer(&mut self, count: usize) -> Vec<u8> {
        let fill = if self.one_next { 0xFF } else { 0x00 };
        self.one_next = !self.one_next;
        vec![fill; count]
    }

    /// True after a zero buffer, when the one buffer must overlap it
    pub fn expects_overlap(&self) -> bool {
        self.one_next
    }
}
