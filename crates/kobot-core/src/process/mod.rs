mod handle;
pub mod provider;
mod reader;
pub mod region;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use handle::*;
pub use provider::{ProcessDirectory, ProcessInfo};
pub use reader::{MemoryReader, PointerWidth, ReadMemory};
pub use region::{MemoryRegion, Protection};

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockProcessInfo};
