use replay_core::{PropValue, Props};

/// Layered property overlays. The newest overlay shadows older ones key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyStore {
    layers: Vec<Props>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, props: Props) {
        self.layers.insert(0, props);
    }

    /// Removes the newest overlay equal to `props`.
    pub fn pop(&mut self, props: &Props) -> bool {
        match self.layers.iter().position(|layer| layer == props) {
            Some(i) => {
                self.layers.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&PropValue> {
        self.layers.iter().find_map(|layer| layer.get(name))
    }

    pub fn lookup_f64(&self, name: &str) -> Option<f64> {
        self.lookup(name).and_then(PropValue::as_f64)
    }

    pub fn lookup_str(&self, name: &str) -> Option<&str> {
        self.lookup(name).and_then(PropValue::as_str)
    }

    /// Merged view, newest value per key.
    pub fn props(&self) -> Props {
        let mut merged = Props::new();
        for layer in &self.layers {
            for (k, v) in layer {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        merged
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_core::props;

    #[test]
    fn newest_overlay_wins() {
        let mut store = PropertyStore::new();
        store.push(props([("color", "red"), ("label", "a")]));
        store.push(props([("color", "blue")]));

        assert_eq!(store.lookup_str("color"), Some("blue"));
        assert_eq!(store.lookup_str("label"), Some("a"));

        let merged = store.props();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["color"].as_str(), Some("blue"));
    }

    #[test]
    fn pop_removes_that_overlay_only() {
        let mut store = PropertyStore::new();
        let base = props([("weight", 1.0)]);
        let heavy = props([("weight", 4.0)]);
        store.push(base.clone());
        store.push(heavy.clone());

        assert!(store.pop(&base));
        assert_eq!(store.lookup_f64("weight"), Some(4.0));
        assert!(store.pop(&heavy));
        assert!(store.is_empty());
        assert!(!store.pop(&heavy));
    }

    #[test]
    fn integer_weights_read_as_doubles() {
        let mut store = PropertyStore::new();
        store.push(props([("weight", 3i64)]));
        assert_eq!(store.lookup_f64("weight"), Some(3.0));
        store.clear();
        assert_eq!(store.lookup("weight"), None);
    }
}
