//! Case-insensitive, order-preserving header multimap.

/// Header and trailer storage for requests and responses.
///
/// Names compare case-insensitively (per
/// [RFC 9110](https://www.rfc-editor.org/rfc/rfc9110#section-5.1)) but
/// keep their original casing for emission. Multiple values per name
/// are allowed; insertion order is preserved so `get_all` and `iter`
/// walk values in the order they arrived.
///
/// Lookup is a linear scan with `eq_ignore_ascii_case` - header counts
/// are small and the scan never allocates.
///
/// # Examples
/// ```
/// use wharf::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.add("Accept", "text/html");
/// headers.add("ACCEPT", "application/json");
///
/// assert_eq!(headers.get("accept"), Some("text/html"));
/// assert_eq!(headers.get_all("Accept").count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// First value for `name`, case-insensitive.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a value, keeping any existing entries with the same name.
    #[inline]
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every entry named `name` with a single value.
    ///
    /// # Examples
    /// ```
    /// use wharf::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.add("X-Tag", "one");
    /// headers.add("x-tag", "two");
    /// headers.set("X-TAG", "three");
    /// assert_eq!(headers.get_all("x-tag").count(), 1);
    /// ```
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.unset(&name);
        self.entries.push((name, value.into()));
    }

    /// Deletes every entry named `name`. Returns whether any existed.
    pub fn unset(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before != self.entries.len()
    }

    /// Number of stored values (not distinct names).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order, original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
