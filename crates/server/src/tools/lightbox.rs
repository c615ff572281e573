//! Lightbox tool implementations.
//!
//! The lightbox walks the page's image registry. Every call that shows an
//! image returns the full view so the client never has to track state.

use peekbox_client::{Direction, PageSession};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for lightbox_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LightboxOpenParams {
    /// 1-based registry index of the image to show.
    pub index: usize,
}

/// Which way to move. Mirrors [`Direction`], which carries no schema because
/// the client crate does not depend on schemars.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Next,
    Prev,
}

impl From<StepDirection> for Direction {
    fn from(direction: StepDirection) -> Self {
        match direction {
            StepDirection::Next => Direction::Next,
            StepDirection::Prev => Direction::Prev,
        }
    }
}

/// Input parameters for lightbox_step tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LightboxStepParams {
    pub direction: StepDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloseOutput {
    /// Whether the lightbox was open before the call.
    pub was_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JumpOutput {
    /// Page address anchored at the shown image's post.
    pub target: String,
}

/// Implementation of the lightbox_open tool.
pub async fn open_impl(session: &mut PageSession, params: LightboxOpenParams) -> Result<CallToolResult, McpError> {
    let view = session.open_lightbox(params.index).await?;
    json_result(&view)
}

/// Implementation of the lightbox_step tool.
///
/// Stepping past either end leaves the lightbox where it is.
pub async fn step_impl(session: &mut PageSession, params: LightboxStepParams) -> Result<CallToolResult, McpError> {
    let view = session.step(params.direction.into()).await?;
    json_result(&view)
}

/// Implementation of the lightbox_close tool.
pub fn close_impl(session: &mut PageSession) -> Result<CallToolResult, McpError> {
    json_result(&CloseOutput { was_open: session.close_lightbox() })
}

/// Implementation of the lightbox_jump tool.
pub fn jump_impl(session: &mut PageSession) -> Result<CallToolResult, McpError> {
    let target = session.jump_to_post()?;
    json_result(&JumpOutput { target })
}
