//! Forward-navigation gating for the wizard.
//!
//! A step is reachable once the step before it has been completed. Requests for
//! anything further ahead are redirected to the latest step the candidate can
//! legally open, so nobody skips a page or gets parked behind completed work.

use std::collections::BTreeSet;

use serde::Serialize;

use super::steps::{position, Step};

/// Result of a guard check for a requested step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepAccess {
    Granted,
    Redirect { index: usize, path: &'static str },
}

impl StepAccess {
    pub fn is_granted(&self) -> bool {
        matches!(self, StepAccess::Granted)
    }
}

pub fn can_access(steps: &[Step], path: &str, completed: &BTreeSet<String>) -> bool {
    match position(steps, path) {
        Some(index) => accessible_at(steps, index, completed),
        None => false,
    }
}

/// Decide whether `path` can be rendered, computing a redirect target if not.
///
/// Unknown paths are sent to the first step.
pub fn check_access(
    steps: &'static [Step],
    path: &str,
    completed: &BTreeSet<String>,
) -> StepAccess {
    let Some(index) = position(steps, path) else {
        return redirect_to(steps, 0);
    };

    if accessible_at(steps, index, completed) {
        return StepAccess::Granted;
    }

    let target = (0..index)
        .rev()
        .find(|&candidate| accessible_at(steps, candidate, completed))
        .unwrap_or(0);

    tracing::debug!(requested = path, redirect = steps[target].path, "step locked");
    redirect_to(steps, target)
}

/// Latest step reachable from the start through an unbroken chain of completed steps.
pub fn furthest_accessible(steps: &'static [Step], completed: &BTreeSet<String>) -> &'static Step {
    let mut furthest = 0;
    for index in 1..steps.len() {
        if !accessible_at(steps, index, completed) {
            break;
        }
        furthest = index;
    }
    &steps[furthest]
}

fn accessible_at(steps: &[Step], index: usize, completed: &BTreeSet<String>) -> bool {
    index == 0 || completed.contains(steps[index - 1].path)
}

fn redirect_to(steps: &'static [Step], index: usize) -> StepAccess {
    StepAccess::Redirect {
        index,
        path: steps[index].path,
    }
}
