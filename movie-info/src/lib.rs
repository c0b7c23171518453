mod index;
mod title_basics;

pub use index::{IndexError, TitleBasicsIndex};
pub use title_basics::TitleBasics;

use async_trait::async_trait;

/// Title metadata lookup keyed by a base identifier such as `tt0944947`.
///
/// Lookups never fail: an unknown id or an unreachable backend both answer `None`.
#[async_trait]
pub trait TitleMetadata: Send + Sync {
    async fn title_basics(&self, base_id: &str) -> Option<TitleBasics>;
}

/// Metadata source that knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

#[async_trait]
impl TitleMetadata for NoMetadata {
    async fn title_basics(&self, _base_id: &str) -> Option<TitleBasics> {
        None
    }
}
