//! Dependency-aware reordering with cycle tolerance

use crate::item::{Item, ItemId};
use log::debug;
use std::collections::HashSet;

/// Items that can reach themselves through dependency edges
pub fn circular_items(items: &[&Item]) -> HashSet<ItemId> {
    let mut circular = HashSet::new();
    for (start, item) in items.iter().enumerate() {
        let mut stack: Vec<usize> = dependencies_of(items, start);
        let mut seen: HashSet<usize> = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == start {
                circular.insert(item.id);
                break;
            }
            if seen.insert(current) {
                stack.extend(dependencies_of(items, current));
            }
        }
    }
    circular
}

/// Indices of the items `items[index]` depends on, in base order
fn dependencies_of(items: &[&Item], index: usize) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.is_dependency_of(items[index]))
        .map(|(position, _)| position)
        .collect()
}

/// Move dependencies ahead of their dependents while keeping the base order elsewhere
///
/// Edges between two members of the same cycle are ignored; every other edge
/// is honored. Unresolved dependency names are skipped.
pub fn order_by_dependencies<'a>(items: &[&'a Item]) -> Vec<&'a Item> {
    if items.iter().all(|item| item.dependencies.is_empty()) {
        return items.to_vec();
    }

    let circular = circular_items(items);
    if !circular.is_empty() {
        debug!("{} item(s) take part in dependency cycles", circular.len());
    }

    let mut visited = vec![false; items.len()];
    let mut in_progress = vec![false; items.len()];
    let mut result = Vec::with_capacity(items.len());

    fn visit<'a>(
        index: usize,
        items: &[&'a Item],
        circular: &HashSet<ItemId>,
        visited: &mut [bool],
        in_progress: &mut [bool],
        result: &mut Vec<&'a Item>,
    ) {
        if visited[index] || in_progress[index] {
            return;
        }
        in_progress[index] = true;
        let in_cycle = circular.contains(&items[index].id);
        for dependency in dependencies_of(items, index) {
            if in_cycle && circular.contains(&items[dependency].id) {
                continue;
            }
            visit(dependency, items, circular, visited, in_progress, result);
        }
        in_progress[index] = false;
        visited[index] = true;
        result.push(items[index]);
    }

    for index in 0..items.len() {
        visit(index, items, &circular, &mut visited, &mut in_progress, &mut result);
    }
    result
}
