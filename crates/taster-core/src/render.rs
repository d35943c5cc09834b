//! The render collaborator boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::combinations::Combination;
use crate::taster::ProjectInfo;

/// Materialization of one combination failed.
///
/// Renderers convert every engine fault into this value; it is recorded on the
/// combination's run and never aborts the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a combination into a project on disk.
///
/// `index` is the combination's submission position. Implementations must
/// write each index to a disjoint location.
#[async_trait]
pub trait ProjectRenderer: Send + Sync {
    async fn render(&self, index: usize, combination: &Combination) -> Result<ProjectInfo, RenderError>;
}
