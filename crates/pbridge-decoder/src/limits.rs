/// Limits applied while decoding.
#[derive(Clone, Copy, Debug)]
pub struct DecodeLimits {
    /// Maximum submessage nesting (default: 64).
    pub(crate) max_depth: u32,
    /// Maximum bytes per string callback (default: unlimited).
    pub(crate) string_chunk: Option<usize>,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            string_chunk: None,
        }
    }
}

impl DecodeLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Deliver string contents in buffers of at most `bytes` bytes.
    pub fn string_chunk(mut self, bytes: usize) -> Self {
        self.string_chunk = Some(bytes.max(1));
        self
    }

    pub fn get_max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn get_string_chunk(&self) -> Option<usize> {
        self.string_chunk
    }
}
