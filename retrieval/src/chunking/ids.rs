use std::collections::HashMap;
use std::collections::HashSet;

/// Hands out batch-unique chunk ids.
///
/// A colliding id gets the smallest free `_N` suffix, so reruns over the
/// same input resolve collisions the same way.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `id`, or a suffixed variant if it is already taken.
    pub fn assign(&mut self, id: String) -> String {
        if self.taken.insert(id.clone()) {
            return id;
        }

        let counter = self.next_suffix.entry(id.clone()).or_insert(1);
        loop {
            let candidate = format!("{id}_{counter}");
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                tracing::warn!(
                    original = %id,
                    assigned = %candidate,
                    "Duplicate chunk id, appended suffix"
                );
                return candidate;
            }
        }
    }

    /// Number of ids handed out.
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

#[cfg(test)]
#[path = "ids.test.rs"]
mod tests;
