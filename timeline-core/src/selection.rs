use std::cmp::Ordering;
use std::collections::BTreeSet;

use shared_types::{ReservableId, ReservableObject, ReservableType};

/// Reservables picked in the selector. An empty selection means "show all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    ids: BTreeSet<ReservableId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` if absent, removes it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, id: ReservableId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn contains(&self, id: ReservableId) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &BTreeSet<ReservableId> {
        &self.ids
    }
}

impl FromIterator<ReservableId> for Selection {
    fn from_iter<I: IntoIterator<Item = ReservableId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Rows the grid shows: the selected reservables, or the whole catalog when
/// nothing is selected. Catalog order is kept.
pub fn visible_reservables(
    catalog: &[ReservableObject],
    selection: &Selection,
) -> Vec<ReservableObject> {
    if selection.is_empty() {
        return catalog.to_vec();
    }
    catalog
        .iter()
        .filter(|object| selection.contains(object.id))
        .cloned()
        .collect()
}

pub fn ids_of(objects: &[ReservableObject]) -> BTreeSet<ReservableId> {
    objects.iter().map(|object| object.id).collect()
}

/// Case-insensitive match on the display name, name, slug or description.
pub fn matches_search(object: &ReservableObject, term: &str, kind: ReservableType) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    [
        Some(object.display_name(kind)),
        Some(object.name.as_str()),
        object.slug.as_deref(),
        object.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&term))
}

/// Classrooms in natural slug order (`P2` before `P10`), everything else by name.
pub fn sort_for_display(objects: &mut [ReservableObject], kind: ReservableType) {
    objects.sort_by(|a, b| match kind {
        ReservableType::Classroom => natural_cmp(
            a.slug.as_deref().unwrap_or_default(),
            b.slug.as_deref().unwrap_or_default(),
        ),
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// Compares digit runs by value and everything else case-insensitively.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_number(&mut a);
                let right = take_number(&mut b);
                let ordering = left
                    .trim_start_matches('0')
                    .len()
                    .cmp(&right.trim_start_matches('0').len())
                    .then_with(|| left.trim_start_matches('0').cmp(right.trim_start_matches('0')));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}
