//! Partition building and partition-level ordering

use crate::config::{OrderBy, OrderStability, PartitionPolicy};
use crate::groups::{self, GroupSlot};
use crate::item::{Item, TextRange};
use log::debug;

/// Why a partition starts where it does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    First,
    GroupChange,
    /// A matching comment sits above the first item
    Comment,
    /// A blank line separates the first item from the previous one
    Newline,
    /// Chunk of an oversized partition
    Cap,
}

impl Boundary {
    /// Comment and newline boundaries open a new section; their gap travels with the partition
    pub fn starts_section(self) -> bool {
        matches!(self, Boundary::Comment | Boundary::Newline)
    }
}

/// Boundary evidence gathered from the text before an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundarySignal {
    pub blank_line_before: bool,
    pub partition_comment_before: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub id: usize,
    /// Indices into the item slice, in source order
    pub items: Vec<usize>,
    pub group_index: usize,
    /// Every item is type-only
    pub is_type_only: bool,
    pub range: TextRange,
    pub boundary: Boundary,
    /// Sections are delimited by comment and newline boundaries
    pub section: usize,
}

impl Partition {
    fn new(id: usize, first: usize, items: &[Item], group_index: usize, boundary: Boundary, section: usize) -> Self {
        Self {
            id,
            items: vec![first],
            group_index,
            is_type_only: items[first].is_type_only,
            range: items[first].range,
            boundary,
            section,
        }
    }

    fn push(&mut self, index: usize, items: &[Item]) {
        self.items.push(index);
        self.is_type_only &= items[index].is_type_only;
        self.range = self.range.cover(&items[index].range);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split items into contiguous partitions and stamp each item's `partition_id`
///
/// `signals[i]` describes the text between item `i - 1` and item `i`.
pub fn build_partitions(
    items: &mut [Item],
    slots: &[GroupSlot],
    policy: &PartitionPolicy,
    signals: &[BoundarySignal],
) -> Vec<Partition> {
    if items.is_empty() {
        return Vec::new();
    }

    let group_indices: Vec<usize> = items
        .iter()
        .map(|item| groups::group_index(slots, item.group_name()))
        .collect();

    let settings = match policy {
        PartitionPolicy::Merge => {
            let mut partition = Partition::new(0, 0, items, group_indices[0], Boundary::First, 0);
            for index in 1..items.len() {
                partition.push(index, items);
                partition.group_index = partition.group_index.min(group_indices[index]);
            }
            for item in items.iter_mut() {
                item.partition_id = 0;
            }
            return vec![partition];
        }
        PartitionPolicy::Split(settings) => settings,
    };

    let split_by_comments = settings.split_by_comments.is_enabled();
    let mut partitions: Vec<Partition> = Vec::new();
    let mut section = 0;

    for index in 0..items.len() {
        let signal = signals.get(index).copied().unwrap_or_default();
        let boundary = if index == 0 {
            Some(Boundary::First)
        } else if split_by_comments && signal.partition_comment_before {
            Some(Boundary::Comment)
        } else if settings.split_by_newlines && signal.blank_line_before {
            Some(Boundary::Newline)
        } else if group_indices[index] != group_indices[index - 1] {
            Some(Boundary::GroupChange)
        } else {
            settings
                .max_items
                .filter(|max| partitions.last().is_some_and(|p| p.len() >= *max))
                .map(|_| Boundary::Cap)
        };

        match boundary {
            None => {
                if let Some(current) = partitions.last_mut() {
                    current.push(index, items);
                }
            }
            Some(boundary) => {
                if boundary.starts_section() {
                    section += 1;
                }
                partitions.push(Partition::new(
                    partitions.len(),
                    index,
                    items,
                    group_indices[index],
                    boundary,
                    section,
                ));
            }
        }
    }

    for partition in &partitions {
        for index in &partition.items {
            items[*index].partition_id = partition.id;
        }
    }

    debug!(
        "built {} partition(s) in {} section(s) from {} item(s)",
        partitions.len(),
        section + 1,
        items.len()
    );
    partitions
}

/// Order partitions for output
///
/// A group-change partition joins the latest partition of the same group in
/// its section; joined partitions are re-chunked by the item cap. Groups are
/// ordered inside each section and sections keep their source order, except
/// that `type-first` moves type-only sections ahead.
pub fn arrange_partitions(partitions: Vec<Partition>, items: &[Item], policy: &PartitionPolicy) -> Vec<Partition> {
    let settings = match policy {
        PartitionPolicy::Merge => return partitions,
        PartitionPolicy::Split(settings) => settings,
    };

    let mut blocks: Vec<Partition> = Vec::new();
    for partition in partitions {
        let target = match partition.boundary {
            Boundary::Cap => blocks.len().checked_sub(1),
            Boundary::GroupChange => blocks.iter().rposition(|block| {
                block.section == partition.section && block.group_index == partition.group_index
            }),
            _ => None,
        };
        match target {
            Some(position) => {
                for index in partition.items {
                    blocks[position].push(index, items);
                }
            }
            None => blocks.push(partition),
        }
    }

    let mut arranged: Vec<Partition> = Vec::new();
    for block in blocks {
        match settings.max_items {
            Some(max) if block.len() > max => {
                for (chunk_index, chunk) in block.items.chunks(max).enumerate() {
                    let boundary = if chunk_index == 0 { block.boundary } else { Boundary::Cap };
                    let mut partition = Partition::new(
                        block.id,
                        chunk[0],
                        items,
                        block.group_index,
                        boundary,
                        block.section,
                    );
                    for index in &chunk[1..] {
                        partition.push(*index, items);
                    }
                    arranged.push(partition);
                }
            }
            _ => arranged.push(block),
        }
    }

    let rank = section_ranks(&arranged, settings.order_by, settings.order_stability);
    arranged.sort_by_key(|p| (rank[p.section], p.group_index));
    arranged
}

/// Output position of every section; type-only sections lead under `type-first`
fn section_ranks(partitions: &[Partition], order_by: OrderBy, stability: OrderStability) -> Vec<usize> {
    let count = partitions.iter().map(|p| p.section + 1).max().unwrap_or(0);
    let mut type_only = vec![true; count];
    for partition in partitions {
        type_only[partition.section] &= partition.is_type_only;
    }

    let mut sections: Vec<usize> = (0..count).collect();
    match (order_by, stability) {
        (OrderBy::Source, _) => {}
        (OrderBy::TypeFirst, OrderStability::Stable) => sections.sort_by_key(|s| !type_only[*s]),
        (OrderBy::TypeFirst, OrderStability::Unstable) => sections.sort_unstable_by_key(|s| !type_only[*s]),
    }

    let mut rank = vec![0; count];
    for (position, section) in sections.into_iter().enumerate() {
        rank[section] = position;
    }
    rank
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionSettings;

    fn items(specs: &[(&str, &str)]) -> Vec<Item> {
        specs
            .iter()
            .enumerate()
            .map(|(i, (name, group))| {
                Item::new(i, *name, TextRange::new(i * 10, i * 10 + 5)).with_group(*group)
            })
            .collect()
    }

    fn split(settings: PartitionSettings) -> PartitionPolicy {
        PartitionPolicy::Split(settings)
    }

    fn names(partition: &Partition, items: &[Item]) -> Vec<String> {
        partition.items.iter().map(|i| items[*i].name.clone()).collect()
    }

    #[test]
    fn test_blank_line_starts_partition() {
        let mut list = items(&[("a", "x"), ("b", "x")]);
        let slots = vec![GroupSlot::name("x")];
        let signals = [
            BoundarySignal::default(),
            BoundarySignal {
                blank_line_before: true,
                partition_comment_before: false,
            },
        ];
        let policy = split(PartitionSettings {
            split_by_newlines: true,
            ..PartitionSettings::default()
        });
        let partitions = build_partitions(&mut list, &slots, &policy, &signals);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[1].boundary, Boundary::Newline);
        assert_ne!(list[0].partition_id, list[1].partition_id);

        let mut list = items(&[("a", "x"), ("b", "x")]);
        let partitions = build_partitions(&mut list, &slots, &PartitionPolicy::default(), &signals);
        assert_eq!(partitions.len(), 1);
    }

    #[test]
    fn test_group_change_is_hard_boundary() {
        let mut list = items(&[("a", "x"), ("b", "y"), ("c", "y")]);
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];
        let partitions = build_partitions(&mut list, &slots, &PartitionPolicy::default(), &[]);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[1].boundary, Boundary::GroupChange);
        assert_eq!(names(&partitions[1], &list), vec!["b", "c"]);
    }

    #[test]
    fn test_merge_policy_single_partition() {
        let mut list = items(&[("a", "x"), ("b", "y")]);
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];
        let partitions = build_partitions(&mut list, &slots, &PartitionPolicy::Merge, &[]);
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].len(), 2);
    }

    #[test]
    fn test_cap_chunks_partition() {
        let mut list = items(&[("a", "x"), ("b", "x"), ("c", "x")]);
        let slots = vec![GroupSlot::name("x")];
        let policy = split(PartitionSettings {
            max_items: Some(2),
            ..PartitionSettings::default()
        });
        let partitions = build_partitions(&mut list, &slots, &policy, &[]);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[1].boundary, Boundary::Cap);
        assert_eq!(names(&partitions[1], &list), vec!["c"]);
    }

    #[test]
    fn test_arrange_merges_same_group_and_orders_groups() {
        let mut list = items(&[("a", "y"), ("b", "x"), ("c", "y")]);
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];
        let policy = PartitionPolicy::default();
        let partitions = build_partitions(&mut list, &slots, &policy, &[]);
        assert_eq!(partitions.len(), 3);

        let arranged = arrange_partitions(partitions, &list, &policy);
        assert_eq!(arranged.len(), 2);
        assert_eq!(names(&arranged[0], &list), vec!["b"]);
        assert_eq!(names(&arranged[1], &list), vec!["a", "c"]);
    }

    #[test]
    fn test_arrange_type_first() {
        let mut list = items(&[("v", "x"), ("t", "x")]);
        list[1].is_type_only = true;
        let slots = vec![GroupSlot::name("x")];
        let signals = [
            BoundarySignal::default(),
            BoundarySignal {
                blank_line_before: true,
                partition_comment_before: false,
            },
        ];
        let policy = split(PartitionSettings {
            split_by_newlines: true,
            order_by: OrderBy::TypeFirst,
            ..PartitionSettings::default()
        });
        let partitions = build_partitions(&mut list, &slots, &policy, &signals);
        let arranged = arrange_partitions(partitions, &list, &policy);
        assert_eq!(names(&arranged[0], &list), vec!["t"]);
        assert!(arranged[0].is_type_only);
        assert!(!arranged[1].is_type_only);
    }

    #[test]
    fn test_arrange_keeps_sections_in_source_order() {
        let mut list = items(&[("b", "y"), ("a", "x"), ("d", "y"), ("c", "x")]);
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];
        let signals = [
            BoundarySignal::default(),
            BoundarySignal::default(),
            BoundarySignal {
                blank_line_before: false,
                partition_comment_before: true,
            },
            BoundarySignal::default(),
        ];
        let policy = split(PartitionSettings {
            split_by_comments: crate::config::PartitionByComment::any(),
            ..PartitionSettings::default()
        });
        let partitions = build_partitions(&mut list, &slots, &policy, &signals);
        let arranged = arrange_partitions(partitions, &list, &policy);
        let order: Vec<Vec<String>> = arranged.iter().map(|p| names(p, &list)).collect();
        assert_eq!(order, vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]);
        assert_eq!(arranged[2].boundary, Boundary::GroupChange);
        assert_eq!(arranged[3].boundary, Boundary::Comment);
    }

    #[test]
    fn test_partitions_cover_all_items_in_order() {
        let mut list = items(&[("a", "x"), ("b", "y"), ("c", "x"), ("d", "x")]);
        let slots = vec![GroupSlot::name("x"), GroupSlot::name("y")];
        let policy = split(PartitionSettings {
            max_items: Some(1),
            ..PartitionSettings::default()
        });
        let partitions = build_partitions(&mut list, &slots, &policy, &[]);
        let flattened: Vec<usize> = partitions.iter().flat_map(|p| p.items.clone()).collect();
        assert_eq!(flattened, vec![0, 1, 2, 3]);
    }
}
