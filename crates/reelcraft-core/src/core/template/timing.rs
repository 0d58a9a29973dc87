//! Timing Resolution
//!
//! Resolves every element's start time and duration in one topological pass.
//!
//! Edges run from an element to what it needs first: a `relative` element
//! needs its anchor, a `fill_gap` element needs the next element on its
//! track. Nodes are processed with Kahn's algorithm (an explicit queue, no
//! recursion), so reference cycles surface as nodes that never become ready.

use std::collections::{HashMap, VecDeque};

use super::coords::relative_start;
use super::models::{ElementDuration, ElementTiming, Template, TemplateElement};
use crate::core::{CoreError, CoreResult, ElementId, TimeSec};

/// Resolved timing of one element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedTiming {
    pub start_time: TimeSec,
    pub duration: TimeSec,
    /// Start time is a stand-in for `dynamic` timing
    pub provisional: bool,
}

impl ResolvedTiming {
    pub fn end_time(&self) -> TimeSec {
        self.start_time + self.duration
    }
}

/// Resolved timings keyed by template element id
#[derive(Clone, Debug, Default)]
pub struct ResolvedTimings {
    timings: HashMap<ElementId, ResolvedTiming>,
}

impl ResolvedTimings {
    pub fn get(&self, element_id: &str) -> Option<&ResolvedTiming> {
        self.timings.get(element_id)
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Latest end time over all elements
    pub fn timeline_end(&self) -> TimeSec {
        self.timings
            .values()
            .map(ResolvedTiming::end_time)
            .fold(0.0, f64::max)
    }
}

struct Node<'a> {
    element: &'a TemplateElement,
    /// Next element on the same track, for `fill_gap`
    next: Option<usize>,
}

/// Resolves start times and durations for every element of a template.
///
/// `duration_of` supplies durations for `fixed`, `content` and `match_audio`
/// elements; `fill_gap` durations are computed here. A trailing `fill_gap`
/// runs to `timeline_duration`, or when that is unset, to the latest end
/// among the elements resolved before it.
pub fn resolve_timings<F>(
    template: &Template,
    timeline_duration: Option<TimeSec>,
    mut duration_of: F,
) -> CoreResult<ResolvedTimings>
where
    F: FnMut(&TemplateElement) -> CoreResult<TimeSec>,
{
    let mut nodes: Vec<Node<'_>> = Vec::with_capacity(template.element_count());
    for track in &template.tracks {
        let first = nodes.len();
        let count = track.elements.len();
        for (i, element) in track.elements.iter().enumerate() {
            nodes.push(Node {
                element,
                next: (i + 1 < count).then_some(first + i + 1),
            });
        }
    }

    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index_of.insert(node.element.id.as_str(), i).is_some() {
            return Err(CoreError::UnresolvedTimingReference {
                element_id: node.element.id.clone(),
                reason: "duplicate element id".to_string(),
            });
        }
    }

    // Edges: dependency -> dependents
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut pending: Vec<usize> = vec![0; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        if let Some(anchor) = node.element.timing.anchor_id() {
            let Some(&dep) = index_of.get(anchor) else {
                return Err(CoreError::UnresolvedTimingReference {
                    element_id: node.element.id.clone(),
                    reason: format!("relativeTo references unknown element '{}'", anchor),
                });
            };
            dependents[dep].push(i);
            pending[i] += 1;
        }
        if let (ElementDuration::FillGap { .. }, Some(next)) = (&node.element.duration, node.next) {
            dependents[next].push(i);
            pending[i] += 1;
        }
    }

    let is_trailing_gap = |node: &Node<'_>| {
        timeline_duration.is_none()
            && node.next.is_none()
            && matches!(node.element.duration, ElementDuration::FillGap { .. })
    };

    let mut ready: VecDeque<usize> = VecDeque::new();
    let mut deferred: VecDeque<usize> = VecDeque::new();
    for (i, node) in nodes.iter().enumerate() {
        if pending[i] == 0 {
            if is_trailing_gap(node) {
                deferred.push_back(i);
            } else {
                ready.push_back(i);
            }
        }
    }

    let mut resolved: Vec<Option<ResolvedTiming>> = vec![None; nodes.len()];
    let mut latest_end: TimeSec = 0.0;

    loop {
        let Some(i) = ready.pop_front().or_else(|| deferred.pop_front()) else {
            break;
        };
        let node = &nodes[i];
        let element = node.element;

        let (start_time, provisional) = match &element.timing {
            ElementTiming::Absolute { start_time } => (*start_time, false),
            ElementTiming::Relative { offset, anchor, .. } => {
                let anchor_timing = element
                    .timing
                    .anchor_id()
                    .and_then(|id| index_of.get(id))
                    .and_then(|&dep| resolved[dep])
                    .ok_or_else(|| unresolved(element, "anchor was not resolved"))?;
                (
                    relative_start(
                        anchor_timing.start_time,
                        anchor_timing.duration,
                        *anchor,
                        *offset,
                    ),
                    false,
                )
            }
            ElementTiming::Dynamic { .. } => (0.0, true),
        };

        let duration = match &element.duration {
            ElementDuration::FillGap { max_duration } => {
                let gap_end = match node.next {
                    Some(next) => resolved[next]
                        .map(|t| t.start_time)
                        .ok_or_else(|| unresolved(element, "next element was not resolved"))?,
                    None => timeline_duration.unwrap_or(latest_end),
                };
                let gap = (gap_end - start_time).max(0.0);
                max_duration.map_or(gap, |max| gap.min(max))
            }
            _ => duration_of(element)?,
        };

        let timing = ResolvedTiming {
            start_time,
            duration,
            provisional,
        };
        latest_end = latest_end.max(timing.end_time());
        resolved[i] = Some(timing);

        for &dependent in &dependents[i] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                if is_trailing_gap(&nodes[dependent]) {
                    deferred.push_back(dependent);
                } else {
                    ready.push_back(dependent);
                }
            }
        }
    }

    let mut timings = HashMap::with_capacity(nodes.len());
    for (node, timing) in nodes.iter().zip(resolved) {
        match timing {
            Some(timing) => {
                timings.insert(node.element.id.clone(), timing);
            }
            None => {
                return Err(unresolved(
                    node.element,
                    "circular timing dependency",
                ))
            }
        }
    }
    Ok(ResolvedTimings { timings })
}

fn unresolved(element: &TemplateElement, reason: &str) -> CoreError {
    CoreError::UnresolvedTimingReference {
        element_id: element.id.clone(),
        reason: reason.to_string(),
    }
}

/// Durations known without any inputs: `fixed` values and recorded hints
pub fn hinted_duration(element: &TemplateElement) -> TimeSec {
    match &element.duration {
        ElementDuration::Fixed { value } => *value,
        ElementDuration::Content { max_duration, hint } => {
            let d = hint.unwrap_or(0.0);
            max_duration.map_or(d, |max| d.min(max))
        }
        ElementDuration::MatchAudio { hint, .. } => hint.unwrap_or(0.0),
        ElementDuration::FillGap { .. } => 0.0,
    }
}
