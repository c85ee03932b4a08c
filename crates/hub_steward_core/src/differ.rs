//! Field-level comparison of a desired spec against an observed snapshot.
//!
//! Optional spec fields are `Option<T>`: `None` means the field is unmanaged and never
//! produces a change, it does *not* mean "clear the remote value". A [`FieldDiffer`] walks the
//! fields one by one and stages every managed field whose value differs into a change set,
//! remembering the field names so passes can log what they are about to send.

#[cfg(test)]
#[path = "differ_tests.rs"]
mod tests;

/// The outcome of comparing one record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff<C> {
    /// The partial update holding only the differing managed fields
    pub change_set: C,
    /// Names of the staged fields, in comparison order
    pub changed_fields: Vec<&'static str>,
}

impl<C> Diff<C> {
    /// Returns `true` if at least one field was staged.
    pub fn needs_update(&self) -> bool {
        !self.changed_fields.is_empty()
    }
}

/// Builds a [`Diff`] field by field.
///
/// Each comparison takes a `stage` closure that writes the desired value into the change set
/// when, and only when, the field differs.
///
/// # Examples
///
/// ```rust
/// use github_client::RepositorySettingsUpdate;
/// use hub_steward_core::FieldDiffer;
///
/// let desired_archived = Some(true);
/// let desired_homepage: Option<String> = None;
///
/// let mut differ = FieldDiffer::<RepositorySettingsUpdate>::new();
/// differ.optional("archived", &desired_archived, Some(&false), |c, v| c.archived = Some(v));
/// differ.optional("homepage", &desired_homepage, None, |c, v| c.homepage = Some(v));
/// let diff = differ.finish();
///
/// assert_eq!(diff.changed_fields, vec!["archived"]);
/// assert_eq!(diff.change_set.archived, Some(true));
/// assert_eq!(diff.change_set.homepage, None);
/// ```
#[derive(Debug, Default)]
pub struct FieldDiffer<C> {
    change_set: C,
    changed_fields: Vec<&'static str>,
}

impl<C: Default> FieldDiffer<C> {
    pub fn new() -> Self {
        Self {
            change_set: C::default(),
            changed_fields: Vec::new(),
        }
    }
}

impl<C> FieldDiffer<C> {
    /// Compares a mandatory field. It is always managed, so any difference is staged.
    pub fn required<T>(
        &mut self,
        field: &'static str,
        desired: &T,
        observed: &T,
        stage: impl FnOnce(&mut C, T),
    ) -> &mut Self
    where
        T: PartialEq + Clone,
    {
        if desired != observed {
            self.stage(field, desired.clone(), stage);
        }
        self
    }

    /// Compares an optional field by value (deep equality for lists).
    ///
    /// `observed` is `None` when the remote system does not report the field; a managed field
    /// is then always staged.
    pub fn optional<T>(
        &mut self,
        field: &'static str,
        desired: &Option<T>,
        observed: Option<&T>,
        stage: impl FnOnce(&mut C, T),
    ) -> &mut Self
    where
        T: PartialEq + Clone,
    {
        if let Some(value) = desired {
            if observed != Some(value) {
                self.stage(field, value.clone(), stage);
            }
        }
        self
    }

    /// Compares a count field numerically, treating an unreported observed count as zero.
    pub fn count(
        &mut self,
        field: &'static str,
        desired: Option<u32>,
        observed: Option<u32>,
        stage: impl FnOnce(&mut C, u32),
    ) -> &mut Self {
        if let Some(value) = desired {
            if value != observed.unwrap_or(0) {
                self.stage(field, value, stage);
            }
        }
        self
    }

    /// Stages a change decided elsewhere, e.g. after resolving names to IDs.
    pub fn mark(&mut self, field: &'static str, stage: impl FnOnce(&mut C)) -> &mut Self {
        stage(&mut self.change_set);
        self.changed_fields.push(field);
        self
    }

    pub fn finish(self) -> Diff<C> {
        Diff {
            change_set: self.change_set,
            changed_fields: self.changed_fields,
        }
    }

    fn stage<T>(&mut self, field: &'static str, value: T, stage: impl FnOnce(&mut C, T)) {
        stage(&mut self.change_set, value);
        self.changed_fields.push(field);
    }
}

/// Formats the staged field names for logging.
pub(crate) fn describe_fields<C>(diff: &Diff<C>) -> String {
    diff.changed_fields.join(",")
}
