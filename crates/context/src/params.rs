//! URL path parameters resolved by the router.

/// Ordered (name, value) pairs extracted from the request path.
///
/// For the route `/users/{id}` matched by `/users/42` this holds `("id", "42")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<(String, String)>,
}

impl Params {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value of the first parameter called `name`
    pub fn by_name(&self, name: &str) -> Option<&str> {
        self.inner.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
    }
}

impl From<matchit::Params<'_, '_>> for Params {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        params.iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::Params;

    #[test]
    fn lookup_keeps_first() {
        let params: Params = [("id", "42"), ("name", "micro"), ("id", "43")].into_iter().collect();

        assert_eq!(params.len(), 3);
        assert_eq!(params.by_name("id"), Some("42"));
        assert_eq!(params.by_name("name"), Some("micro"));
        assert_eq!(params.by_name("missing"), None);
    }

    #[test]
    fn from_matchit() {
        let mut router = matchit::Router::new();
        router.insert("/users/{id}/posts/{post}", ()).unwrap();

        let matched = router.at("/users/7/posts/hello").unwrap();
        let params = Params::from(matched.params);

        assert_eq!(params.iter().collect::<Vec<_>>(), [("id", "7"), ("post", "hello")]);
    }
}
