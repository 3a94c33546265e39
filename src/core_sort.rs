use crate::compare::Comparator;
use crate::config::SortOptions;
use crate::dependency::order_by_dependencies;
use crate::diagnostics::{self, Diagnostic};
use crate::edits::{self, Edit, Layout, TargetPartition};
use crate::error::SortResult;
use crate::groups::{self, GroupSlot};
use crate::item::{Declaration, Item, ItemId, TextRange};
use crate::partition::{arrange_partitions, build_partitions, BoundarySignal, Partition};
use crate::resolve::{GroupCache, GroupResolver};
use crate::text;
use log::debug;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One scope of items to sort, in source order
#[derive(Debug, Clone, Default)]
pub struct SortRequest<'a> {
    pub source: &'a str,
    pub items: Vec<Item>,
    /// Templates for items split out of multi-specifier declarations
    pub declarations: Vec<Declaration>,
    /// Ranges covered by lint-disable directives
    pub disabled: Vec<TextRange>,
}

impl<'a> SortRequest<'a> {
    pub fn new(source: &'a str, items: Vec<Item>) -> Self {
        Self {
            source,
            items,
            declarations: Vec::new(),
            disabled: Vec::new(),
        }
    }

    pub fn with_declarations(mut self, declarations: Vec<Declaration>) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn with_disabled(mut self, disabled: Vec<TextRange>) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Everything computed for one scope
#[derive(Debug, Clone)]
pub struct SortOutcome {
    /// Items in source order with groups and partitions assigned
    pub items: Vec<Item>,
    /// Target order as item identities
    pub order: Vec<ItemId>,
    pub edits: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SortOutcome {
    pub fn is_sorted(&self) -> bool {
        self.edits.is_empty() && self.diagnostics.is_empty()
    }
}

/// Sort pipeline bound to one validated option set
pub struct CoreSort {
    options: SortOptions,
    cache: Arc<GroupCache>,
}

impl CoreSort {
    /// Validate options and use a private group cache
    pub fn new(options: SortOptions) -> SortResult<Self> {
        Self::with_cache(options, Arc::new(GroupCache::new()))
    }

    /// Validate options and share `cache` with other sorters
    pub fn with_cache(options: SortOptions, cache: Arc<GroupCache>) -> SortResult<Self> {
        options.validate()?;
        Ok(Self { options, cache })
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<GroupCache> {
        &self.cache
    }

    /// Group, partition, order, then synthesize edits and diagnostics
    pub fn run(&self, request: SortRequest) -> SortResult<SortOutcome> {
        let SortRequest {
            source,
            mut items,
            declarations,
            disabled,
        } = request;

        for item in items.iter_mut() {
            if disabled.iter().any(|range| range.intersects(&item.node_range)) {
                item.is_lint_disabled = true;
            }
        }
        self.resolve_groups(&mut items);

        let signals = self.boundary_signals(source, &items);
        let partitions = build_partitions(&mut items, &self.options.groups, &self.options.partitions, &signals);
        let layout = Layout::build(
            source,
            &items,
            &partitions,
            self.options.partitions.split_by_comments(),
        );
        let target = self.order_partitions(&items, partitions, &layout);

        let order: Vec<ItemId> = target
            .iter()
            .flat_map(|p| p.items.iter().map(|i| items[*i].id))
            .collect();
        let edits = edits::synthesize(&layout, &items, &target, &declarations, &self.options);
        let diagnostics = diagnostics::collect(&layout, &items, &target, &self.options);

        debug!(
            "sorted {} item(s): {} edit(s), {} diagnostic(s)",
            items.len(),
            edits.len(),
            diagnostics.len()
        );
        Ok(SortOutcome {
            items,
            order,
            edits,
            diagnostics,
        })
    }

    /// Target order for items without any source text
    pub fn compute_target_order(&self, mut items: Vec<Item>) -> Vec<Item> {
        self.resolve_groups(&mut items);
        let partitions = build_partitions(&mut items, &self.options.groups, &self.options.partitions, &[]);
        let arranged = arrange_partitions(partitions, &items, &self.options.partitions);
        let mut comparators = ComparatorSet::new(&self.options);
        let order: Vec<usize> = arranged
            .iter()
            .flat_map(|p| self.sort_partition(&p.items, &items, &mut comparators))
            .collect();
        let mut slots: Vec<Option<Item>> = items.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }

    fn resolve_groups(&self, items: &mut [Item]) {
        let resolver = GroupResolver::new(&self.options, &self.cache);
        for item in items.iter_mut().filter(|item| item.group.is_none()) {
            item.group = Some(resolver.resolve(item));
        }
    }

    /// Blank lines and partition comments between consecutive items
    fn boundary_signals(&self, source: &str, items: &[Item]) -> Vec<BoundarySignal> {
        let comments = self.options.partitions.split_by_comments();
        let mut signals = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index == 0 {
                signals.push(BoundarySignal::default());
                continue;
            }
            let previous = &items[index - 1];
            if item.parent_declaration().is_some() && item.parent_declaration() == previous.parent_declaration() {
                signals.push(BoundarySignal::default());
                continue;
            }
            let between = TextRange::new(previous.range.end, item.node_range.start.max(previous.range.end));
            let text = between.slice(source);
            signals.push(BoundarySignal {
                blank_line_before: text::blank_line_count(text) > 0,
                partition_comment_before: comments.is_some_and(|matcher| {
                    text::scan_comments(text, between.start)
                        .iter()
                        .any(|comment| matcher.matches(comment))
                }),
            });
        }
        signals
    }

    fn order_partitions(&self, items: &[Item], partitions: Vec<Partition>, layout: &Layout) -> Vec<TargetPartition> {
        let arranged = arrange_partitions(partitions, items, &self.options.partitions);
        // the section's opening gap leads whichever partition comes first in it
        let carried: HashMap<usize, usize> = arranged
            .iter()
            .filter(|partition| partition.boundary.starts_section())
            .filter_map(|partition| partition.items.first().map(|first| (partition.section, layout.unit_of(*first))))
            .collect();
        let mut opened: HashSet<usize> = HashSet::new();
        let mut comparators = ComparatorSet::new(&self.options);
        arranged
            .iter()
            .map(|partition| TargetPartition {
                items: self.sort_partition(&partition.items, items, &mut comparators),
                carried_unit: if opened.insert(partition.section) {
                    carried.get(&partition.section).copied()
                } else {
                    None
                },
            })
            .collect()
    }

    /// Order one partition: disabled items are barriers, ignored items keep their slot
    fn sort_partition(&self, indices: &[usize], items: &[Item], comparators: &mut ComparatorSet) -> Vec<usize> {
        for index in indices {
            comparators.prepare(items[*index].group_name());
        }

        let mut result = Vec::with_capacity(indices.len());
        for segment in indices.split_inclusive(|index| items[*index].is_lint_disabled) {
            let (body, barrier) = match segment.split_last() {
                Some((last, body)) if items[*last].is_lint_disabled => (body, Some(*last)),
                _ => (segment, None),
            };
            result.extend(self.sort_segment(body, items, comparators));
            result.extend(barrier);
        }
        result
    }

    fn sort_segment(&self, indices: &[usize], items: &[Item], comparators: &ComparatorSet) -> Vec<usize> {
        let mut free: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|index| !items[*index].is_ignored)
            .collect();

        free.sort_by(|a, b| comparators.compare(&items[*a], &items[*b]));

        let free_items: Vec<&Item> = free.iter().map(|index| &items[*index]).collect();
        let ordered = order_by_dependencies(&free_items);
        let position_of: HashMap<ItemId, usize> = indices.iter().map(|i| (items[*i].id, *i)).collect();
        let mut sorted_free = ordered
            .into_iter()
            .filter_map(|item| position_of.get(&item.id).copied());

        indices
            .iter()
            .filter_map(|index| {
                if items[*index].is_ignored {
                    Some(*index)
                } else {
                    sorted_free.next()
                }
            })
            .collect()
    }
}

/// Comparators per group, built on first use
struct ComparatorSet<'a> {
    options: &'a SortOptions,
    by_group: HashMap<String, (usize, usize, Comparator)>,
}

impl<'a> ComparatorSet<'a> {
    fn new(options: &'a SortOptions) -> Self {
        Self {
            options,
            by_group: HashMap::new(),
        }
    }

    fn prepare(&mut self, group: &str) {
        if self.by_group.contains_key(group) {
            return;
        }
        let slots: &[GroupSlot] = &self.options.groups;
        let slot = groups::group_index(slots, group);
        let subgroup = slots.get(slot).map(GroupSlot::names).unwrap_or(&[]);
        let position = slots
            .get(slot)
            .and_then(|s| s.subgroup_position(group))
            .unwrap_or(0);
        let comparator = Comparator::new(&self.options.settings_for(slot, group)).with_subgroup(subgroup);
        self.by_group
            .insert(group.to_string(), (slot, position, comparator));
    }

    /// Slot, then subgroup position, then the group's comparator
    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match (self.by_group.get(a.group_name()), self.by_group.get(b.group_name())) {
            (Some((slot_a, pos_a, comparator)), Some((slot_b, pos_b, _))) => slot_a
                .cmp(slot_b)
                .then(pos_a.cmp(pos_b))
                .then_with(|| {
                    if a.group_name() == b.group_name() {
                        comparator.compare(a, b)
                    } else {
                        Ordering::Equal
                    }
                }),
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NewlinesOption, PartitionPolicy, PartitionSettings, SortOptionsBuilder, SortType};
    use crate::edits::apply_edits;
    use crate::groups::GroupSlot;
    use crate::item::{Comment, CommentKind};

    /// Build one item per line of `source`, named by the text after `import `
    fn line_items(source: &str, groups: &[(&str, &str)]) -> Vec<Item> {
        let mut items = Vec::new();
        let mut offset = 0;
        for line in source.split_inclusive('\n') {
            let trimmed = line.trim_end_matches('\n');
            if let Some(name) = trimmed.strip_prefix("import ") {
                let range = TextRange::new(offset, offset + trimmed.len());
                let mut item = Item::new(items.len(), name, range);
                if let Some((_, group)) = groups.iter().find(|(n, _)| *n == name) {
                    item = item.with_group(*group);
                }
                items.push(item);
            } else if let Some(body) = trimmed.strip_prefix("//") {
                let range = TextRange::new(offset, offset + trimmed.len());
                // attached to the next item only when directly above it
                items.push(
                    Item::new(usize::MAX, "", range).with_leading_comments(vec![Comment::new(
                        range,
                        CommentKind::Line,
                        body,
                    )]),
                );
            }
            offset += line.len();
        }
        // fold comment placeholders into the following item
        let mut result: Vec<Item> = Vec::new();
        let mut pending: Vec<Comment> = Vec::new();
        for item in items {
            if item.id == usize::MAX {
                pending.extend(item.leading_comments);
                continue;
            }
            let mut item = item;
            item.id = result.len();
            if !pending.is_empty() {
                let start = pending[0].range.start;
                item.range = TextRange::new(start, item.range.end);
                item.leading_comments = std::mem::take(&mut pending);
            }
            result.push(item);
        }
        result
    }

    fn run(options: SortOptions, source: &str, groups: &[(&str, &str)]) -> (SortOutcome, String) {
        let sorter = CoreSort::new(options).expect("Failed to create sorter");
        let outcome = sorter
            .run(SortRequest::new(source, line_items(source, groups)))
            .expect("Failed to run sorter");
        let output = apply_edits(source, &outcome.edits).expect("Failed to apply edits");
        (outcome, output)
    }

    fn assert_idempotent(options: SortOptions, output: &str, groups: &[(&str, &str)]) {
        let (again, rerun) = run(options, output, groups);
        assert!(again.edits.is_empty(), "second pass produced edits: {:?}", again.edits);
        assert_eq!(rerun, output);
    }

    #[test]
    fn test_scenario_a_alphabetical_swap() {
        let source = "import b\nimport a\n";
        let groups = [("a", "x"), ("b", "x")];
        let (outcome, output) = run(SortOptions::new(), source, &groups);
        assert_eq!(outcome.order, vec![1, 0]);
        assert_eq!(output, "import a\nimport b\n");
        assert!(!outcome.is_sorted());
        assert_idempotent(SortOptions::new(), &output, &groups);
    }

    #[test]
    fn test_scenario_b_group_precedence() {
        let source = "import Foo\nimport Bar\n";
        let groups = [("Foo", "value"), ("Bar", "type")];
        let options = SortOptions::new().with_groups(vec![GroupSlot::name("type"), GroupSlot::name("value")]);
        let (outcome, output) = run(options.clone(), source, &groups);
        assert_eq!(outcome.order, vec![1, 0]);
        assert_eq!(output, "import Bar\nimport Foo\n");
        assert_idempotent(options, &output, &groups);
    }

    #[test]
    fn test_scenario_c_blank_line_partitions() {
        let source = "import b\n\nimport a\n";
        let groups = [("a", "x"), ("b", "x")];
        let options = SortOptions::new().with_partitions(PartitionPolicy::Split(PartitionSettings {
            split_by_newlines: true,
            ..PartitionSettings::default()
        }));
        let (outcome, output) = run(options, source, &groups);
        assert_ne!(outcome.items[0].partition_id, outcome.items[1].partition_id);
        assert_eq!(output, source);
    }

    #[test]
    fn test_scenario_d_custom_alphabet() {
        let source = "import a\nimport b\nimport c\n";
        let groups = [("a", "x"), ("b", "x"), ("c", "x")];
        let options = SortOptionsBuilder::new()
            .sort_type(SortType::Custom)
            .alphabet("cba")
            .build()
            .expect("Failed to build options");
        let (outcome, output) = run(options, source, &groups);
        assert_eq!(outcome.order, vec![2, 1, 0]);
        assert_eq!(output, "import c\nimport b\nimport a\n");
    }

    #[test]
    fn test_scenario_e_dependencies_already_ordered() {
        let source = "import a\nimport b\n";
        let sorter = CoreSort::new(SortOptions::new().with_type(SortType::Unsorted)).expect("Failed to create sorter");
        let items = vec![
            Item::new(0, "a", TextRange::new(0, 8)).with_dependency_names(["a"]),
            Item::new(1, "b", TextRange::new(9, 17)).with_dependencies(["a"]),
        ];
        let outcome = sorter.run(SortRequest::new(source, items)).expect("Failed to run sorter");
        assert!(outcome.edits.is_empty());
        assert_eq!(outcome.order, vec![0, 1]);
    }

    #[test]
    fn test_dependency_overrides_comparator() {
        let source = "import a\nimport b\n";
        let sorter = CoreSort::new(SortOptions::new()).expect("Failed to create sorter");
        let items = vec![
            Item::new(0, "a", TextRange::new(0, 8)).with_dependencies(["b"]),
            Item::new(1, "b", TextRange::new(9, 17)).with_dependency_names(["b"]),
        ];
        let outcome = sorter.run(SortRequest::new(source, items)).expect("Failed to run sorter");
        assert_eq!(outcome.order, vec![1, 0]);
    }

    #[test]
    fn test_newlines_between_groups() {
        let source = "import z\nimport a\n";
        let groups = [("a", "value"), ("z", "type")];
        let options = SortOptions::new()
            .with_groups(vec![GroupSlot::name("type"), GroupSlot::name("value")])
            .with_newlines_between(NewlinesOption::Count(1));
        let (_, output) = run(options.clone(), source, &groups);
        assert_eq!(output, "import z\n\nimport a\n");
        assert_idempotent(options, &output, &groups);
    }

    #[test]
    fn test_comment_moves_with_item() {
        let source = "import b\n// about a\nimport a\n";
        let groups = [("a", "x"), ("b", "x")];
        let (_, output) = run(SortOptions::new(), source, &groups);
        assert_eq!(output, "// about a\nimport a\nimport b\n");
        assert_idempotent(SortOptions::new(), &output, &groups);
    }

    #[test]
    fn test_partition_comment_stays_with_partition() {
        let source = "import d\nimport c\n// Part 2\nimport b\nimport a\n";
        let groups = [("a", "x"), ("b", "x"), ("c", "x"), ("d", "x")];
        let options = SortOptions::new().with_partitions(PartitionPolicy::Split(PartitionSettings {
            split_by_comments: crate::config::PartitionByComment::any(),
            ..PartitionSettings::default()
        }));
        let (_, output) = run(options.clone(), source, &groups);
        assert_eq!(output, "import c\nimport d\n// Part 2\nimport a\nimport b\n");
        assert_idempotent(options, &output, &groups);
    }

    #[test]
    fn test_groups_do_not_cross_partitions() {
        let groups = [("a", "x"), ("b", "y")];
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];

        let by_comment = SortOptions::new()
            .with_groups(slots.clone())
            .with_partitions(PartitionPolicy::Split(PartitionSettings {
                split_by_comments: crate::config::PartitionByComment::any(),
                ..PartitionSettings::default()
            }));
        let source = "import b\n// Part 2\nimport a\n";
        let (outcome, output) = run(by_comment.clone(), source, &groups);
        assert_eq!(outcome.order, vec![0, 1]);
        assert!(outcome.is_sorted());
        assert_eq!(output, source);

        // groups are still ordered inside each partition, under its comment
        let groups = [("a", "x"), ("b", "y"), ("c", "x"), ("d", "y")];
        let source = "import b\nimport a\n// Part 2\nimport d\nimport c\n";
        let (outcome, output) = run(by_comment.clone(), source, &groups);
        assert_eq!(outcome.order, vec![1, 0, 3, 2]);
        assert_eq!(output, "import a\nimport b\n// Part 2\nimport c\nimport d\n");
        assert_idempotent(by_comment, &output, &groups);
        let groups = [("a", "x"), ("b", "y")];

        let by_newline = SortOptions::new()
            .with_groups(slots)
            .with_partitions(PartitionPolicy::Split(PartitionSettings {
                split_by_newlines: true,
                ..PartitionSettings::default()
            }));
        let source = "import b\n\nimport a\n";
        let (outcome, output) = run(by_newline, source, &groups);
        assert_eq!(outcome.order, vec![0, 1]);
        assert_eq!(output, source);
    }

    #[test]
    fn test_ignored_item_is_anchored() {
        let source = "import c\nimport b\nimport a\n";
        let sorter = CoreSort::new(SortOptions::new()).expect("Failed to create sorter");
        let mut items = line_items(source, &[]);
        items[1].is_ignored = true;
        let outcome = sorter.run(SortRequest::new(source, items)).expect("Failed to run sorter");
        assert_eq!(outcome.order, vec![2, 1, 0]);
    }

    #[test]
    fn test_disabled_item_is_a_barrier() {
        let source = "import d\nimport c\nimport x\nimport b\nimport a\n";
        let sorter = CoreSort::new(SortOptions::new()).expect("Failed to create sorter");
        let items = line_items(source, &[]);
        let disabled = vec![items[2].node_range];
        let outcome = sorter
            .run(SortRequest::new(source, items).with_disabled(disabled))
            .expect("Failed to run sorter");
        assert_eq!(outcome.order, vec![1, 0, 2, 4, 3]);
    }

    #[test]
    fn test_unsorted_keeps_source_order() {
        let source = "import c\nimport a\nimport b\n";
        let (outcome, output) = run(SortOptions::new().with_type(SortType::Unsorted), source, &[]);
        assert_eq!(outcome.order, vec![0, 1, 2]);
        assert!(outcome.edits.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_target_order_is_permutation() {
        let sorter = CoreSort::new(SortOptions::new().with_groups(vec![
            GroupSlot::name("y"),
            GroupSlot::name("x"),
        ]))
        .expect("Failed to create sorter");
        let items: Vec<Item> = ["d", "b", "a", "c", "e"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Item::new(i, *name, TextRange::new(i * 2, i * 2 + 1)).with_group(if i % 2 == 0 { "x" } else { "y" })
            })
            .collect();
        let ordered = sorter.compute_target_order(items);
        let mut ids: Vec<usize> = ordered.iter().map(|i| i.id).collect();
        let names: Vec<&str> = ordered.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a", "d", "e"]);
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_subgroup_position_before_comparator() {
        let sorter = CoreSort::new(SortOptions::new().with_groups(vec![GroupSlot::subgroup(["builtin", "external"])]))
            .expect("Failed to create sorter");
        let items = vec![
            Item::new(0, "a", TextRange::new(0, 1)).with_group("external"),
            Item::new(1, "z", TextRange::new(2, 3)).with_group("builtin"),
        ];
        let names: Vec<String> = sorter.compute_target_order(items).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn test_configuration_error_fails_fast() {
        let options = SortOptions::new().with_type(SortType::Custom);
        assert!(CoreSort::new(options).is_err());
    }
}
