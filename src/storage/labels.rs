use std::fmt;

/// Reserved label holding the series' metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// A set of labels with unique names, kept in insertion order until
/// [`Labels::sort`] is called. Equality and hashing follow the stored order,
/// so label sets used as series identities must be sorted first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Adds a label. Returns false, leaving the set untouched, if a label
    /// with the same name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }

        self.0.push(Label {
            name,
            value: value.into(),
        });
        true
    }

    /// Upsert by name: `f` receives the current value of `name`, if any, and
    /// returns the value to store. A new label is appended at the end.
    pub fn upsert_with<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(Option<&str>) -> String,
    {
        match self.0.iter_mut().find(|l| l.name == name) {
            Some(label) => label.value = f(Some(label.value.as_str())),
            None => {
                let value = f(None);
                self.0.push(Label {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }

    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Labels {
    /// Later pairs overwrite earlier ones with the same name.
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut labels = Labels::default();
        for (name, value) in iter {
            let name = name.into();
            let value = value.into();
            labels.upsert_with(&name, |_| value);
        }
        labels
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", label.name, label.value)?;
        }
        write!(f, "}}")
    }
}
