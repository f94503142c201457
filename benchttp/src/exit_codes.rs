#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI input (bad flags, conflicting stop conditions, malformed URL or headers).
    InvalidInput = 30,

    /// Internal/runtime error (client setup failures, request task panics).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
