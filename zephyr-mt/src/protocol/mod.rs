//! Wire protocol: checksums, packet layouts and retry policy.

pub mod checksum;
pub mod packet;
pub mod retry;

// Re-export common types
pub use packet::{BootloaderPacket, ReportInfo, Token};
pub use retry::{RetryPolicy, retry, retry_if};
