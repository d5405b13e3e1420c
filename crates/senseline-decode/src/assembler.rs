/// Reassembles newline-terminated lines from arbitrary serial chunks.
pub struct LineAssembler {
    buf: Vec<u8>,
    max_partial: usize,
    skip_to_newline: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::with_limit(1024)
    }

    /// A partial line longer than `max_partial` bytes is flushed as-is.
    pub fn with_limit(max_partial: usize) -> Self {
        Self { buf: Vec::new(), max_partial, skip_to_newline: false }
    }

    /// Feeds a chunk and returns every line it completed, terminator included.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Vec<u8>> {
        if self.skip_to_newline {
            match data.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    data = &data[pos + 1..];
                    self.skip_to_newline = false;
                }
                None => return Vec::new(),
            }
        }
        self.buf.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            lines.push(self.buf.drain(..=pos).collect());
        }

        if self.buf.len() > self.max_partial {
            lines.push(std::mem::take(&mut self.buf));
        }
        lines
    }

    /// Returns whatever partial line is buffered, e.g. after a read gap.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        (!self.buf.is_empty()).then(|| std::mem::take(&mut self.buf))
    }

    /// Drops any buffered bytes and everything up to the next `\n`. Use
    /// after attaching to a stream that is already running, where the first
    /// line is likely torn.
    pub fn resync(&mut self) {
        self.buf.clear();
        self.skip_to_newline = true;
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
