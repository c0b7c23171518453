pub mod aggregator;
pub mod cache;
mod client;
mod config;
mod context;
pub mod display;
mod error;
pub mod fetch;
mod request;
mod stream;
mod utils;


pub use aggregator::{merge_streams, StreamAggregator, CACHE_TTL_SECONDS};
pub use cache::{CacheConfig, CacheKey, CacheStats, MemoryCache, SharedCache, StreamCache};
pub use client::eztv::Eztv;
pub use client::torrent_galaxy::TorrentGalaxy;
pub use client::yts::Yts;
pub use client::{Provider, StreamScraper};
pub use config::ResolverConfig;
pub use context::{Context, ContextPointer};
pub use error::{Error, ErrorKind};
pub use fetch::{fetch_json, Fetch, FetchOptions, HttpFetcher};
pub use request::{ContentType, ParsedIdentifier, ScraperQuery};
pub use stream::{BehaviorHints, StreamCandidate, StreamResponse};
pub use utils::{extract_filename, parse_number, parse_size_to_bytes};
