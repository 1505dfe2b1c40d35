/// Switches for the stricter behaviors. The defaults keep the permissive
/// behavior templates have always had.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Fail when a path continues past a value that is not an object,
    /// instead of stopping at that value.
    pub strict_paths: bool,
    /// Reject a template with more than one top-level object, instead of
    /// merging their fields.
    pub single_root: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn strict_paths(mut self, strict: bool) -> Self {
        self.strict_paths = strict;
        self
    }

    #[must_use]
    pub fn single_root(mut self, single: bool) -> Self {
        self.single_root = single;
        self
    }

    /// Both strict behaviors on.
    pub fn strict() -> Self {
        Self {
            strict_paths: true,
            single_root: true,
        }
    }
}
