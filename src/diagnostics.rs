//! Soft mismatches between the source and the target order

use crate::config::{NewlinesOption, SortOptions};
use crate::edits::{spacing_policy, Layout, TargetPartition};
use crate::groups;
use crate::item::{Item, TextRange};
use crate::text;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    UnexpectedOrder,
    UnexpectedGroupOrder,
    UnexpectedDependencyOrder,
    MissedSpacingBetween,
    ExtraSpacingBetween,
    MissedCommentAbove,
}

impl MessageId {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageId::UnexpectedOrder => "unexpectedOrder",
            MessageId::UnexpectedGroupOrder => "unexpectedGroupOrder",
            MessageId::UnexpectedDependencyOrder => "unexpectedDependencyOrder",
            MessageId::MissedSpacingBetween => "missedSpacingBetween",
            MessageId::ExtraSpacingBetween => "extraSpacingBetween",
            MessageId::MissedCommentAbove => "missedCommentAbove",
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reported mismatch, anchored on the right-hand item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message_id: MessageId,
    pub left: String,
    pub left_group: String,
    pub right: String,
    pub right_group: String,
    pub range: TextRange,
    /// Dependent name or expected comment text
    pub detail: Option<String>,
}

impl Diagnostic {
    fn between(message_id: MessageId, left: &Item, right: &Item) -> Self {
        Self {
            message_id,
            left: left.name.clone(),
            left_group: left.group_name().to_string(),
            right: right.name.clone(),
            right_group: right.group_name().to_string(),
            range: right.node_range,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn message(&self) -> String {
        match self.message_id {
            MessageId::UnexpectedOrder => {
                format!("Expected \"{}\" to come before \"{}\".", self.right, self.left)
            }
            MessageId::UnexpectedGroupOrder => format!(
                "Expected \"{}\" ({}) to come before \"{}\" ({}).",
                self.right, self.right_group, self.left, self.left_group
            ),
            MessageId::UnexpectedDependencyOrder => format!(
                "Expected dependency \"{}\" to come before \"{}\".",
                self.right,
                self.detail.as_deref().unwrap_or(&self.left)
            ),
            MessageId::MissedSpacingBetween => {
                format!("Missed spacing between \"{}\" and \"{}\" objects.", self.left, self.right)
            }
            MessageId::ExtraSpacingBetween => {
                format!("Extra spacing between \"{}\" and \"{}\" objects.", self.left, self.right)
            }
            MessageId::MissedCommentAbove => format!(
                "Missed comment \"{}\" above \"{}\".",
                self.detail.as_deref().unwrap_or_default(),
                self.right
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.message_id)
    }
}

/// Compare source order against the target and report every mismatch
pub fn collect(layout: &Layout, items: &[Item], target: &[TargetPartition], options: &SortOptions) -> Vec<Diagnostic> {
    let position: HashMap<usize, usize> = target
        .iter()
        .flat_map(|p| p.items.iter().copied())
        .enumerate()
        .map(|(position, index)| (index, position))
        .collect();
    let slot_of = |item: &Item| groups::group_index(&options.groups, item.group_name());

    let mut diagnostics = Vec::new();
    let mut out_of_order = vec![false; items.len()];
    for right_index in 1..items.len() {
        let left = &items[right_index - 1];
        let right = &items[right_index];
        let (Some(left_pos), Some(right_pos)) = (position.get(&(right_index - 1)), position.get(&right_index)) else {
            continue;
        };
        if left_pos < right_pos {
            continue;
        }
        out_of_order[right_index] = true;

        let (left_slot, right_slot) = (slot_of(left), slot_of(right));
        if left_slot > right_slot {
            diagnostics.push(Diagnostic::between(MessageId::UnexpectedGroupOrder, left, right));
            continue;
        }

        let dependent = items[..right_index].iter().enumerate().find(|(index, candidate)| {
            right.is_dependency_of(candidate) && position.get(index).is_some_and(|p| right_pos < p)
        });
        match dependent {
            Some((_, dependent)) => diagnostics.push(
                Diagnostic::between(MessageId::UnexpectedDependencyOrder, left, right).with_detail(&dependent.name),
            ),
            None => diagnostics.push(Diagnostic::between(MessageId::UnexpectedOrder, left, right)),
        }
    }

    for unit_index in 1..layout.units.len() {
        let unit = &layout.units[unit_index];
        let previous = &layout.units[unit_index - 1];
        let (Some(left_index), Some(right_index)) = (previous.items.last(), unit.items.first()) else {
            continue;
        };
        if unit.carried || out_of_order[*right_index] {
            continue;
        }
        let (left, right) = (&items[*left_index], &items[*right_index]);
        if let NewlinesOption::Count(expected) = spacing_policy(options, left, right) {
            let found = text::blank_line_count(layout.gap_text(unit_index));
            let expected = expected as usize;
            if found < expected {
                diagnostics.push(Diagnostic::between(MessageId::MissedSpacingBetween, left, right));
            } else if found > expected {
                diagnostics.push(Diagnostic::between(MessageId::ExtraSpacingBetween, left, right));
            }
        }
    }

    diagnostics.extend(missed_comments(layout, items, target, options));
    diagnostics
}

/// First item of each group whose required comment is absent
fn missed_comments(
    layout: &Layout,
    items: &[Item],
    target: &[TargetPartition],
    options: &SortOptions,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut previous: Option<&Item> = None;
    for index in target.iter().flat_map(|p| p.items.iter()) {
        let item = &items[*index];
        let group = item.group_name();
        if !seen.contains(&group) {
            seen.push(group);
            let slot = groups::group_index(&options.groups, group);
            if let Some(expected) = groups::comment_above(&options.groups, slot) {
                let gap = layout.gap_text(layout.unit_of(*index));
                let matches = |text: &str| text.trim().eq_ignore_ascii_case(expected.trim());
                let present = item.leading_comments.iter().any(|c| matches(&c.text))
                    || text::scan_comments(gap, 0).iter().any(|c| matches(&c.text));
                if !present {
                    let left = previous.unwrap_or(item);
                    diagnostics.push(
                        Diagnostic::between(MessageId::MissedCommentAbove, left, item).with_detail(expected),
                    );
                }
            }
        }
        previous = Some(item);
    }
    diagnostics
}
