use std::collections::HashSet;

/// The mutation engine's literal-ingestion interface.
///
/// Receives constant values (magic strings, tokens, numbers rendered as text) that the
/// mutation engine may splice into future inputs.
pub trait LiteralSink: Send + Sync {
    fn add_literals(&mut self, literals: &[String]);
}

impl LiteralSink for Vec<String> {
    fn add_literals(&mut self, literals: &[String]) {
        self.extend_from_slice(literals);
    }
}

/// Remembers every literal seen during a run and forwards only unseen ones.
#[derive(Debug, Default, Clone)]
pub struct LiteralRegistry {
    seen: HashSet<String>,
}

impl LiteralRegistry {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Records `candidates` and forwards the ones not seen before to `sink`.
    ///
    /// Order of the forwarded batch follows `candidates`; a literal repeated inside the
    /// batch is forwarded once. The sink is not called when nothing is new.
    ///
    /// # Returns
    /// The number of literals forwarded.
    pub fn forward<S: AsRef<str>>(
        &mut self,
        candidates: &[S],
        sink: &mut dyn LiteralSink,
    ) -> usize {
        let mut fresh = Vec::new();
        for candidate in candidates {
            let literal = candidate.as_ref();
            if self.seen.insert(literal.to_owned()) {
                fresh.push(literal.to_owned());
            }
        }

        if fresh.is_empty() {
            return 0;
        }
        log::debug!("Forwarding {} new literal(s) to the mutator", fresh.len());
        sink.add_literals(&fresh);
        fresh.len()
    }

    pub fn contains(&self, literal: &str) -> bool {
        self.seen.contains(literal)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.seen.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records each batch separately so tests can count sink calls.
    #[derive(Default)]
    struct BatchRecorder {
        batches: Vec<Vec<String>>,
    }

    impl LiteralSink for BatchRecorder {
        fn add_literals(&mut self, literals: &[String]) {
            self.batches.push(literals.to_vec());
        }
    }

    #[test]
    fn repeated_batch_forwards_nothing() {
        let mut registry = LiteralRegistry::new();
        let mut sink = BatchRecorder::default();

        assert_eq!(registry.forward(&["a", "b"], &mut sink), 2);
        assert_eq!(registry.forward(&["a", "b"], &mut sink), 0);

        assert_eq!(sink.batches, vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a") && registry.contains("b"));
    }

    #[test]
    fn only_new_literals_are_forwarded_in_order() {
        let mut registry = LiteralRegistry::new();
        let mut sink: Vec<String> = Vec::new();

        registry.forward(&["GET", "POST"], &mut sink);
        let forwarded = registry.forward(&["PUT", "GET", "DELETE", "PUT"], &mut sink);

        assert_eq!(forwarded, 2);
        assert_eq!(sink, vec!["GET", "POST", "PUT", "DELETE"]);
    }

    #[test]
    fn empty_batch_does_not_call_sink() {
        let mut registry = LiteralRegistry::new();
        let mut sink = BatchRecorder::default();
        let nothing: [&str; 0] = [];
        assert_eq!(registry.forward(&nothing, &mut sink), 0);
        assert!(sink.batches.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn accepts_owned_strings() {
        let mut registry = LiteralRegistry::new();
        let mut sink: Vec<String> = Vec::new();
        let owned = vec!["0xdeadbeef".to_string()];
        registry.forward(&owned, &mut sink);
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec!["0xdeadbeef"]);
    }
}
