//! Style pool for deduplication

use super::Style;
use ahash::AHashMap;

/// Deduplicated styles of one worksheet
///
/// Index 0 is always the default style. Cells store indexes into the pool.
#[derive(Debug, Clone)]
pub struct StylePool {
    styles: Vec<Style>,
    index: AHashMap<Style, u32>,
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

impl StylePool {
    /// Create a pool holding only the default style
    pub fn new() -> Self {
        let mut index = AHashMap::with_capacity(16);
        index.insert(Style::default(), 0);
        Self {
            styles: vec![Style::default()],
            index,
        }
    }

    /// Index of `style`, adding it when not yet present
    pub fn get_or_insert(&mut self, style: &Style) -> u32 {
        if let Some(&idx) = self.index.get(style) {
            return idx;
        }
        let idx = self.styles.len() as u32;
        self.styles.push(style.clone());
        self.index.insert(style.clone(), idx);
        idx
    }

    /// Style at `index`
    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// Number of distinct styles, including the default
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always false: the default style is always present
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// All styles in index order
    pub fn iter(&self) -> impl Iterator<Item = &Style> {
        self.styles.iter()
    }
}
