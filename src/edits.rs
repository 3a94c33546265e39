//! Edit synthesis: turn a target order into minimal text replacements

use crate::config::{NewlinesOption, PartitionByComment, SortOptions};
use crate::error::{SortError, SortResult};
use crate::groups;
use crate::item::{Declaration, Item, TextRange};
use crate::partition::Partition;
use crate::text;
use log::debug;
use std::collections::HashMap;

/// Replace `range` of the source with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: TextRange,
    pub replacement: String,
}

impl Edit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }
}

/// A run of source text that moves as one piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Item indices, in source order
    pub items: Vec<usize>,
    /// Declaration the items were split from
    pub parent: Option<usize>,
    /// Text that moves, from the effective start to the end of the last item
    pub range: TextRange,
    /// Source text between the previous unit and this one
    pub gap: TextRange,
    /// The gap opens a section and travels with the partition
    pub carried: bool,
}

/// Units and gaps of one sorted scope
#[derive(Debug, Clone)]
pub struct Layout<'a> {
    pub source: &'a str,
    pub units: Vec<SourceUnit>,
    unit_of_item: Vec<usize>,
}

impl<'a> Layout<'a> {
    /// Cut the scope into units; `partitions` are the source-order partitions
    pub fn build(
        source: &'a str,
        items: &[Item],
        partitions: &[Partition],
        partition_comments: Option<&PartitionByComment>,
    ) -> Self {
        let mut section_starts = vec![false; items.len()];
        for partition in partitions {
            if partition.boundary.starts_section() {
                if let Some(first) = partition.items.first() {
                    section_starts[*first] = true;
                }
            }
        }

        let mut units: Vec<SourceUnit> = Vec::new();
        let mut unit_of_item = vec![0; items.len()];
        for (index, item) in items.iter().enumerate() {
            let parent = item.parent_declaration();
            if let Some(last) = units.last_mut() {
                if parent.is_some() && last.parent == parent {
                    last.items.push(index);
                    last.range = last.range.cover(&item.range);
                    unit_of_item[index] = units.len() - 1;
                    continue;
                }
            }

            let previous_end = units.last().map(|u| u.range.end);
            let carried = previous_end.is_some() && section_starts[index];
            let start = match previous_end {
                None => item.range.start,
                Some(previous_end) => {
                    let gap = TextRange::new(previous_end, item.range.start.max(previous_end));
                    if carried {
                        carried_start(source, item, previous_end, partition_comments)
                    } else {
                        text::scan_comments(gap.slice(source), gap.start)
                            .first()
                            .map_or(item.range.start, |comment| comment.range.start)
                    }
                }
            };
            let gap_start = previous_end.unwrap_or(start);
            unit_of_item[index] = units.len();
            units.push(SourceUnit {
                items: vec![index],
                parent,
                range: TextRange::new(start, item.range.end.max(start)),
                gap: TextRange::new(gap_start, start),
                carried,
            });
        }

        Self {
            source,
            units,
            unit_of_item,
        }
    }

    pub fn unit_of(&self, item: usize) -> usize {
        self.unit_of_item[item]
    }

    pub fn gap_text(&self, unit: usize) -> &'a str {
        self.units[unit].gap.slice(self.source)
    }

    pub fn unit_text(&self, unit: usize) -> &'a str {
        self.units[unit].range.slice(self.source)
    }

    /// Span from the first unit to the end of the last
    pub fn region(&self) -> TextRange {
        match (self.units.first(), self.units.last()) {
            (Some(first), Some(last)) => TextRange::new(first.range.start, last.range.end),
            _ => TextRange::default(),
        }
    }
}

/// Start of the moving text for a section-opening item: just past its partition comment
fn carried_start(
    source: &str,
    item: &Item,
    previous_end: usize,
    partition_comments: Option<&PartitionByComment>,
) -> usize {
    let Some(matcher) = partition_comments else {
        return item.range.start;
    };
    let before_node = TextRange::new(previous_end, item.node_range.start.max(previous_end));
    text::scan_comments(before_node.slice(source), before_node.start)
        .iter()
        .filter(|comment| matcher.matches(comment))
        .last()
        .map_or(item.range.start, |comment| {
            text::skip_whitespace(source, comment.range.end).min(item.node_range.start)
        })
        .max(item.range.start.min(item.node_range.start))
}

/// A partition in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPartition {
    /// Item indices in target order
    pub items: Vec<usize>,
    /// Source unit whose gap travels with this partition
    pub carried_unit: Option<usize>,
}

/// Blank lines the policy requires between two neighboring items
pub fn spacing_policy(options: &SortOptions, left: &Item, right: &Item) -> NewlinesOption {
    let left_slot = groups::group_index(&options.groups, left.group_name());
    let right_slot = groups::group_index(&options.groups, right.group_name());
    if left_slot == right_slot {
        // blank lines inside a partition would split it on the next pass
        match options.newlines_inside_for(right.group_name()) {
            NewlinesOption::Ignore if options.partitions.split_by_newlines() => NewlinesOption::Count(0),
            policy => policy,
        }
    } else {
        options.newlines_between_for(left_slot, right_slot)
    }
}

fn comment_matches(text: &str, expected: &str) -> bool {
    text.trim().eq_ignore_ascii_case(expected.trim())
}

struct TargetUnit {
    items: Vec<usize>,
    carried_unit: Option<usize>,
}

/// Build the replacement edits that turn the source into the target order
pub fn synthesize(
    layout: &Layout,
    items: &[Item],
    target: &[TargetPartition],
    declarations: &[Declaration],
    options: &SortOptions,
) -> Vec<Edit> {
    if layout.units.is_empty() {
        return Vec::new();
    }
    let source = layout.source;

    // Consecutive items of one declaration form a single target unit
    let mut target_units: Vec<TargetUnit> = Vec::new();
    for partition in target {
        let mut first_in_partition = true;
        for index in &partition.items {
            let parent = items[*index].parent_declaration();
            if let Some(last) = target_units.last_mut() {
                let same_parent =
                    parent.is_some() && items[last.items[last.items.len() - 1]].parent_declaration() == parent;
                if same_parent && !first_in_partition {
                    last.items.push(*index);
                    continue;
                }
            }
            target_units.push(TargetUnit {
                items: vec![*index],
                carried_unit: if first_in_partition { partition.carried_unit } else { None },
            });
            first_in_partition = false;
        }
    }

    let mut runs_per_parent: HashMap<usize, usize> = HashMap::new();
    for unit in &target_units {
        if let Some(parent) = items[unit.items[0]].parent_declaration() {
            *runs_per_parent.entry(parent).or_default() += 1;
        }
    }

    let region = layout.region();
    let region_indent = text::line_indent(source, region.start);
    let source_count = layout.units.len();

    // First target position of every group
    let mut first_of_group: HashMap<&str, usize> = HashMap::new();
    for (position, unit) in target_units.iter().enumerate() {
        first_of_group
            .entry(items[unit.items[0]].group_name())
            .or_insert(position);
    }
    let comment_texts: Vec<&str> = options
        .groups
        .iter()
        .filter_map(|slot| slot.overrides().and_then(|o| o.comment_above.as_deref()))
        .collect();

    let mut emitted_parent: HashMap<usize, bool> = HashMap::new();
    let mut texts: Vec<String> = Vec::with_capacity(target_units.len());
    let mut node_tail: Vec<Option<usize>> = Vec::with_capacity(target_units.len());
    for (position, unit) in target_units.iter().enumerate() {
        let first = &items[unit.items[0]];
        let source_unit = layout.unit_of(unit.items[0]);
        let unit_range = layout.units[source_unit].range;

        let (mut body, tail) = match first.parent_declaration() {
            Some(parent) if runs_per_parent.get(&parent) != Some(&1) => {
                let declaration = &declarations[parent];
                let specifiers: Vec<_> = unit
                    .items
                    .iter()
                    .filter_map(|i| items[*i].specifier.as_ref())
                    .collect();
                let first_run = !emitted_parent.contains_key(&parent);
                emitted_parent.insert(parent, true);
                let leading = if first_run { declaration.leading_text.as_str() } else { "" };
                (format!("{leading}{}", declaration.render(&specifiers)), None)
            }
            Some(_) => (layout.unit_text(source_unit).to_string(), None),
            None => (
                layout.unit_text(source_unit).to_string(),
                Some(unit_range.end.saturating_sub(first.node_range.end)),
            ),
        };

        let is_group_start = first_of_group.get(first.group_name()) == Some(&position);
        if !is_group_start && first.parent_declaration().is_none() {
            for comment in &first.leading_comments {
                let stale = comment_texts.iter().any(|t| comment_matches(&comment.text, t));
                if stale && unit_range.contains_range(&comment.range) {
                    let relative = TextRange::new(
                        comment.range.start - unit_range.start,
                        comment.range.end - unit_range.start,
                    );
                    body = text::remove_with_trailing_whitespace(&body, relative);
                    break;
                }
            }
        }
        texts.push(body);
        node_tail.push(tail);
    }

    // Separators before every target unit but the first
    let mut separators: Vec<String> = vec![String::new(); target_units.len()];
    for position in 1..target_units.len() {
        let unit = &target_units[position];
        let positional_gap = (position < source_count).then(|| layout.gap_text(position));
        let delimiter = positional_gap
            .map(text::leading_delimiter)
            .or_else(|| (source_count > 1).then(|| text::leading_delimiter(layout.gap_text(1))))
            .unwrap_or("");
        let indent = match positional_gap {
            Some(gap) if gap.contains('\n') => text::trailing_indent(gap),
            _ => region_indent,
        };

        let mut separator = if let Some(carried) = unit.carried_unit {
            let gap = layout.gap_text(carried);
            format!("{delimiter}{}", &gap[text::leading_delimiter(gap).len()..])
        } else {
            let left = &items[*target_units[position - 1].items.last().unwrap_or(&0)];
            let right = &items[unit.items[0]];
            match spacing_policy(options, left, right) {
                NewlinesOption::Count(n) => text::separator(delimiter, n, indent),
                NewlinesOption::Ignore => match positional_gap {
                    Some(gap) if !layout.units[position].carried => gap.to_string(),
                    _ => text::separator(delimiter, 0, indent),
                },
            }
        };

        if !separator.contains('\n') && text::ends_with_line_comment(&texts[position - 1]) {
            separator = text::separator(delimiter, 0, indent);
        }
        separators[position] = separator;
    }

    // Safety semicolons, comment-above insertion, carried text at the first slot
    for position in 0..target_units.len() {
        let unit = &target_units[position];
        let first = &items[unit.items[0]];

        if first.add_safety_semicolon {
            if let Some(tail) = node_tail[position] {
                let following = if position + 1 < target_units.len() {
                    format!("{}{}", separators[position + 1], texts[position + 1])
                } else {
                    source.get(region.end..).unwrap_or("").to_string()
                };
                let hazard = text::next_char_on_line(&following).is_some_and(|c| c != ';');
                let body = &mut texts[position];
                if hazard && tail <= body.len() {
                    let at = body.len() - tail;
                    body.insert(at, ';');
                }
            }
        }

        let group = first.group_name();
        let slot = groups::group_index(&options.groups, group);
        if first_of_group.get(group) == Some(&position) {
            if let Some(expected) = groups::comment_above(&options.groups, slot) {
                let before = if position == 0 {
                    unit.carried_unit.map_or("", |c| layout.gap_text(c))
                } else {
                    separators[position].as_str()
                };
                let present = first
                    .leading_comments
                    .iter()
                    .any(|c| comment_matches(&c.text, expected))
                    || text::scan_comments(before, 0)
                        .iter()
                        .any(|c| comment_matches(&c.text, expected));
                if !present {
                    let indent = text::line_indent(source, first.node_range.start);
                    texts[position] = format!("// {expected}\n{indent}{}", texts[position]);
                }
            }
        }

        if position == 0 {
            if let Some(carried) = unit.carried_unit {
                let gap = layout.gap_text(carried);
                let body = gap[text::leading_delimiter(gap).len()..].trim_start();
                texts[position] = format!("{body}{}", texts[position]);
            }
        }
    }

    let edits = if target_units.len() == source_count {
        let mut edits = Vec::new();
        for position in 0..source_count {
            let source_unit = &layout.units[position];
            if position > 0 && separators[position] != layout.gap_text(position) {
                edits.push(Edit::new(source_unit.gap, separators[position].clone()));
            }
            if texts[position] != layout.unit_text(position) {
                edits.push(Edit::new(source_unit.range, texts[position].clone()));
            }
        }
        coalesce_edits(edits)
    } else {
        let mut replacement = String::new();
        for (separator, body) in separators.iter().zip(texts.iter()) {
            replacement.push_str(separator);
            replacement.push_str(body);
        }
        minimal_edit(source, region, &replacement).into_iter().collect()
    };

    debug!("synthesized {} edit(s) for {} unit(s)", edits.len(), source_count);
    edits
}

/// Single edit covering only the changed middle of `range`
fn minimal_edit(source: &str, range: TextRange, replacement: &str) -> Option<Edit> {
    let original = range.slice(source);
    if original == replacement {
        return None;
    }
    let prefix = original
        .char_indices()
        .zip(replacement.chars())
        .take_while(|((_, a), b)| a == b)
        .last()
        .map_or(0, |((index, c), _)| index + c.len_utf8());
    let original_rest = &original[prefix..];
    let replacement_rest = &replacement[prefix..];
    let suffix: usize = original_rest
        .chars()
        .rev()
        .zip(replacement_rest.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    let suffix = suffix.min(original_rest.len()).min(replacement_rest.len());
    Some(Edit::new(
        TextRange::new(range.start + prefix, range.end - suffix),
        &replacement_rest[..replacement_rest.len() - suffix],
    ))
}

/// Merge touching or overlapping edits into one covering their union
pub fn coalesce_edits(mut edits: Vec<Edit>) -> Vec<Edit> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut merged: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        match merged.last_mut() {
            Some(last) if edit.range.start <= last.range.end => {
                // On overlap the earlier edit owns the shared span
                if edit.range.end > last.range.end {
                    last.replacement.push_str(&edit.replacement);
                    last.range.end = edit.range.end;
                }
            }
            _ => merged.push(edit),
        }
    }
    merged
}

/// Apply non-overlapping edits back to front
pub fn apply_edits(source: &str, edits: &[Edit]) -> SortResult<String> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.range.start, e.range.end));
    for pair in ordered.windows(2) {
        if pair[1].range.start < pair[0].range.end {
            return Err(SortError::unreachable(&format!(
                "overlapping edits at {} and {}",
                pair[0].range, pair[1].range
            )));
        }
    }
    let mut result = source.to_string();
    for edit in ordered.iter().rev() {
        if edit.range.end > result.len()
            || !result.is_char_boundary(edit.range.start)
            || !result.is_char_boundary(edit.range.end)
        {
            return Err(SortError::unreachable(&format!("edit out of bounds at {}", edit.range)));
        }
        result.replace_range(edit.range.start..edit.range.end, &edit.replacement);
    }
    Ok(result)
}
