use hostaffinity_core::{LabelMatcher, Labels, Selector};
use std::fmt;

/// Logical AND of label selectors
///
/// The empty conjunction matches every label set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorConjunction {
    selectors: Vec<Selector>,
}

impl SelectorConjunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, selector: Selector) {
        self.selectors.push(selector);
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }
}

impl LabelMatcher for SelectorConjunction {
    fn matches(&self, labels: &Labels) -> bool {
        self.selectors.iter().all(|s| s.matches(labels))
    }
}

impl FromIterator<Selector> for SelectorConjunction {
    fn from_iter<I: IntoIterator<Item = Selector>>(iter: I) -> Self {
        Self {
            selectors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SelectorConjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selectors.is_empty() {
            return write!(f, "<everything>");
        }
        let parts: Vec<String> = self.selectors.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(" && "))
    }
}
