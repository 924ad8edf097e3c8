/// Per-operator inbox bound in multi-threaded mode
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
/// Thread count when available parallelism cannot be determined
pub const FALLBACK_THREAD_COUNT: usize = 4;
/// Default `tracing` filter directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "streamdag=info";
