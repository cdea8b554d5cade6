//! Human-readable names for merged output.

/// Derives the output filename from the ordered input filenames.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    default_name: String,
}

impl OutputNamer {
    /// Create a namer that falls back to `default_name` for an empty list.
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
        }
    }

    /// Name for merging `filenames`, in order.
    ///
    /// | inputs              | name                                 |
    /// |---------------------|--------------------------------------|
    /// | none                | the default name                     |
    /// | `a`                 | `a_merged.pdf`                       |
    /// | `a`, `b`            | `a_and_b_merged.pdf`                 |
    /// | `a`, `b` + N others | `a_and_b_and_{N}_others_merged.pdf`  |
    pub fn name_for<S: AsRef<str>>(&self, filenames: &[S]) -> String {
        let stem = |i: usize| strip_extension(filenames[i].as_ref());

        match filenames.len() {
            0 => self.default_name.clone(),
            1 => format!("{}_merged.pdf", stem(0)),
            2 => format!("{}_and_{}_merged.pdf", stem(0), stem(1)),
            n => format!("{}_and_{}_and_{}_others_merged.pdf", stem(0), stem(1), n - 2),
        }
    }
}

impl Default for OutputNamer {
    fn default() -> Self {
        Self::new("merged.pdf")
    }
}

fn strip_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem)
}
