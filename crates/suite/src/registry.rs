use std::collections::BTreeMap;
use std::sync::Arc;

use crate::builtin;
use crate::case::TestCase;

/// A named collection of independent test cases.
#[derive(Clone)]
pub struct TestSuite {
    pub name: String,
    pub description: String,
    pub cases: Vec<Arc<dyn TestCase>>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, case: impl TestCase + 'static) -> Self {
        self.cases.push(Arc::new(case));
        self
    }
}

impl std::fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("cases", &self.cases.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Suites keyed by registration name. Built before the engine starts and
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<String, TestSuite>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in suites whose keys appear in `enabled`.
    pub fn with_builtins(enabled: &[String]) -> Self {
        let mut registry = Self::new();
        for (key, suite) in builtin::all() {
            if enabled.iter().any(|e| e == key) {
                registry.register(key, suite);
            }
        }
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, suite: TestSuite) {
        self.suites.insert(key.into(), suite);
    }

    pub fn get(&self, key: &str) -> Option<&TestSuite> {
        self.suites.get(key)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
