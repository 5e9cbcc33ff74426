//! [`SearchIndex`] backends.
//!
//! | Kind | Type |
//! |------|------|
//! | `azure_search` | [`AzureSearchIndex`] |
//! | `memory` | [`MemoryIndex`] |

mod azure_search;
mod memory;

pub use azure_search::AzureSearchIndex;
pub use memory::MemoryIndex;

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::traits::SearchIndex;

/// Build the configured search index.
pub fn build_index(config: &IndexConfig) -> Result<Arc<dyn SearchIndex>> {
    let index: Arc<dyn SearchIndex> = match config.kind.as_str() {
        "azure_search" => Arc::new(AzureSearchIndex::from_config(config)?),
        "memory" => Arc::new(MemoryIndex::new()),
        other => bail!(
            "Unknown index kind: '{}'. Available: azure_search, memory",
            other
        ),
    };
    Ok(index)
}
