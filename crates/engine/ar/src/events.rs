//! Events the session reports to the UI layer

use crate::state::PermissionStep;
use renderer::MarkerId;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StepChanged(PermissionStep),
    /// Show the gesture-gated orientation prompt
    PromptRequested,
    /// Markers were placed; carries the count
    CoinsLoaded(usize),
    HoverChanged(Option<MarkerId>),
    Selected(MarkerId),
    /// Transient message that does not end the session
    Alert(String),
    /// A location was collected; carries its id
    Collected(String),
    /// Initialization failed with this message
    Error(String),
}
