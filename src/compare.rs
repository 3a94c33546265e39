//! Item comparators: alphabetical, natural, custom alphabet, line length

use crate::config::{CasingKind, SortOrder, SortSettings, SortType, SpecialCharacters};
use crate::item::Item;
use crate::locale::Collator;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Apply the sort order to an ascending comparison
pub fn ordered(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || ('\u{C0}'..='\u{24F}').contains(&c)
        || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

/// Normalize a name before comparison
pub fn format_name(name: &str, ignore_case: bool, special_characters: SpecialCharacters) -> String {
    let name = if ignore_case {
        name.to_lowercase()
    } else {
        name.to_string()
    };
    let stripped: String = match special_characters {
        SpecialCharacters::Keep => name,
        SpecialCharacters::Trim => name.trim_start_matches(|c| !is_letter(c)).to_string(),
        SpecialCharacters::Remove => name.chars().filter(|c| is_letter(*c)).collect(),
    };
    stripped.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn compare_alphabetically(a: &str, b: &str, collator: &Collator) -> Ordering {
    collator.compare(a, b)
}

/// Split into alternating digit and non-digit runs
fn chunks(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut digit_run: Option<bool> = None;
    for (index, c) in text.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digit_run {
            Some(previous) if previous != is_digit => {
                result.push(&text[start..index]);
                start = index;
            }
            _ => {}
        }
        digit_run = Some(is_digit);
    }
    if start < text.len() {
        result.push(&text[start..]);
    }
    result
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Like alphabetical, but digit runs compare by numeric value
pub fn compare_naturally(a: &str, b: &str, collator: &Collator) -> Ordering {
    let a_chunks = chunks(a);
    let b_chunks = chunks(b);
    for (left, right) in a_chunks.iter().zip(b_chunks.iter()) {
        let both_numeric = left.starts_with(|c: char| c.is_ascii_digit())
            && right.starts_with(|c: char| c.is_ascii_digit());
        let ordering = if both_numeric {
            compare_numbers(left, right)
        } else {
            collator.compare(left, right)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a_chunks.len().cmp(&b_chunks.len())
}

/// Compare by position in the alphabet; characters outside it sort last
pub fn compare_by_alphabet(a: &str, b: &str, alphabet: &HashMap<char, usize>) -> Ordering {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    for (left, right) in a_chars.iter().zip(b_chars.iter()) {
        let left_index = alphabet.get(left).copied().unwrap_or(usize::MAX);
        let right_index = alphabet.get(right).copied().unwrap_or(usize::MAX);
        if left_index != right_index {
            return left_index.cmp(&right_index);
        }
    }
    a_chars.len().cmp(&b_chars.len())
}

pub fn compare_line_length(a: &Item, b: &Item) -> Ordering {
    a.size.cmp(&b.size)
}

/// Detected naming convention of a name, if any
pub fn detect_casing(name: &str) -> Option<CasingKind> {
    let lower_or_digit = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let upper_or_digit = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit();
    let separated = |separator: char, part: &dyn Fn(char) -> bool| {
        let parts: Vec<&str> = name.split(separator).collect();
        parts.len() > 1 && parts.iter().all(|p| !p.is_empty() && p.chars().all(part))
    };

    if separated('_', &lower_or_digit) {
        return Some(CasingKind::SnakeCase);
    }
    if separated('-', &lower_or_digit) {
        return Some(CasingKind::KebabCase);
    }
    let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = name.chars().any(|c| c.is_ascii_lowercase());
    if has_upper
        && name
            .split('_')
            .all(|p| !p.is_empty() && p.chars().all(upper_or_digit))
    {
        return Some(CasingKind::UpperCase);
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    let rest_alphanumeric = chars.all(|c| c.is_ascii_alphanumeric());
    if first.is_ascii_lowercase() && rest_alphanumeric && has_upper {
        return Some(CasingKind::CamelCase);
    }
    if first.is_ascii_uppercase() && rest_alphanumeric && has_lower {
        return Some(CasingKind::PascalCase);
    }
    None
}

/// Comparator built once per bucket from effective settings
#[derive(Debug, Clone)]
pub struct Comparator {
    settings: SortSettings,
    collator: Collator,
    alphabet: HashMap<char, usize>,
    /// Group names of the subgroup the bucket belongs to
    subgroup: Vec<String>,
    fallback: Option<Box<Comparator>>,
}

impl Comparator {
    pub fn new(settings: &SortSettings) -> Self {
        let alphabet = settings
            .alphabet
            .chars()
            .enumerate()
            .fold(HashMap::new(), |mut map, (index, c)| {
                map.entry(c).or_insert(index);
                map
            });
        let fallback = match settings.fallback_sort.sort_type {
            SortType::Unsorted => None,
            _ => Some(Box::new(Comparator::new(&settings.for_fallback()))),
        };
        Self {
            settings: settings.clone(),
            collator: Collator::for_locales(&settings.locales),
            alphabet,
            subgroup: Vec::new(),
            fallback,
        }
    }

    pub fn with_subgroup(mut self, names: &[String]) -> Self {
        self.subgroup = names.to_vec();
        if let Some(fallback) = self.fallback.take() {
            self.fallback = Some(Box::new(fallback.with_subgroup(names)));
        }
        self
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    pub fn is_unsorted(&self) -> bool {
        self.settings.sort_type == SortType::Unsorted && self.settings.casing_priority.is_empty()
    }

    fn format(&self, name: &str) -> String {
        format_name(name, self.settings.ignore_case, self.settings.special_characters)
    }

    fn casing_rank(&self, name: &str) -> usize {
        let priority = &self.settings.casing_priority;
        detect_casing(name)
            .and_then(|casing| priority.iter().position(|p| *p == casing))
            .unwrap_or(priority.len())
    }

    fn subgroup_position(&self, item: &Item) -> Option<usize> {
        self.subgroup.iter().position(|name| name == item.group_name())
    }

    fn primary(&self, a: &Item, b: &Item) -> Ordering {
        let ascending = match self.settings.sort_type {
            SortType::Unsorted => Ordering::Equal,
            SortType::Alphabetical => {
                compare_alphabetically(&self.format(&a.name), &self.format(&b.name), &self.collator)
            }
            SortType::Natural => {
                compare_naturally(&self.format(&a.name), &self.format(&b.name), &self.collator)
            }
            SortType::Custom => {
                compare_by_alphabet(&self.format(&a.name), &self.format(&b.name), &self.alphabet)
            }
            SortType::LineLength => compare_line_length(a, b),
            SortType::SubgroupOrder => match (self.subgroup_position(a), self.subgroup_position(b)) {
                (Some(left), Some(right)) => left.cmp(&right),
                _ => Ordering::Equal,
            },
            SortType::TypeImportFirst => match (a.is_type_only, b.is_type_only) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            },
        };
        ordered(ascending, self.settings.order)
    }

    /// Casing rank, then the configured comparator, then the fallback
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        if !self.settings.casing_priority.is_empty() {
            let rank = self.casing_rank(&a.name).cmp(&self.casing_rank(&b.name));
            if rank != Ordering::Equal {
                return rank;
            }
        }
        let primary = self.primary(a, b);
        if primary != Ordering::Equal {
            return primary;
        }
        self.fallback
            .as_ref()
            .map_or(Ordering::Equal, |fallback| fallback.compare(a, b))
    }
}
