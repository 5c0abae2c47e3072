//! Fixtures shared by the micro-context benchmarks.

/// Media types a typical API endpoint offers, in preference order
pub const OFFERED: [&str; 4] = ["application/json", "application/xml", "text/html", "text/plain"];

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    accept: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, accept: &'static str) -> Self {
        Self { name, group, accept }
    }

    pub fn small(name: &'static str, accept: &'static str) -> Self {
        Self::new(name, TestGroup::Small, accept)
    }

    pub fn normal(name: &'static str, accept: &'static str) -> Self {
        Self::new(name, TestGroup::Normal, accept)
    }

    pub fn large(name: &'static str, accept: &'static str) -> Self {
        Self::new(name, TestGroup::Large, accept)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    /// Value of the `Accept` header sent by the client
    pub fn accept(&self) -> &'static str {
        self.accept
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

/// `Accept` headers seen in the wild, from a bare API client to a browser sending every
/// image format it knows
pub fn accept_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("wildcard", "*/*"),
        TestCase::small("api_client", "application/json"),
        TestCase::normal("browser", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        TestCase::large(
            "browser_images",
            "image/avif,image/webp,image/apng,image/svg+xml,image/*;q=0.9,text/html;q=0.8,\
             application/xhtml+xml;q=0.8,application/xml;q=0.7,text/plain;q=0.5,*/*;q=0.1",
        ),
    ]
}
