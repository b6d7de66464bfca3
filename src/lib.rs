//! Transport adapter: turns a raw duplex byte stream into a pair of
//! backpressured channels, plus an echo server that exercises it.

pub mod channel;
pub mod config;
pub mod duplex;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod server;

pub use channel::{channel, ChannelHandle, ChannelOptions, ChannelReader, ChannelWriter};
pub use config::schema::ServerConfig;
pub use duplex::{DisposeHandle, DuplexHalf, DuplexPipe, PipeOptions};
pub use error::{PipeError, Side};
pub use lifecycle::Shutdown;
pub use pipeline::{AdaptedPipeline, PipelineOptions};
pub use server::EchoServer;
