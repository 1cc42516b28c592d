//! Header-to-role resolution

use crate::collate::fold;
use crate::config::{ColumnRole, ColumnSynonyms, Locale};
use crate::error::Diagnostic;
use serde::Serialize;

/// Maps raw header labels to semantic roles by synonym matching
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    synonyms: &'a ColumnSynonyms,
    locale: Locale,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(synonyms: &'a ColumnSynonyms, locale: Locale) -> Self {
        Self { synonyms, locale }
    }

    /// Index of the first header (left to right) matching any synonym of `role`
    pub fn find(&self, headers: &[String], role: ColumnRole) -> Option<usize> {
        let targets: Vec<String> = self
            .synonyms
            .for_role(role)
            .iter()
            .map(|s| fold(s, self.locale))
            .collect();

        headers
            .iter()
            .position(|h| targets.contains(&fold(h, self.locale)))
    }

    /// Like [`find`](Self::find), but records a diagnostic when nothing matches
    pub fn resolve(
        &self,
        headers: &[String],
        role: ColumnRole,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<usize> {
        let found = self.find(headers, role);
        if found.is_none() {
            let synonyms = self.synonyms.for_role(role).to_vec();
            tracing::warn!(
                role = %role,
                synonyms = ?synonyms,
                headers = ?headers,
                "column not found"
            );
            diagnostics.push(Diagnostic::ColumnNotFound {
                role,
                synonyms,
                headers: headers.to_vec(),
            });
        }
        found
    }

    /// Resolve every role at once
    pub fn resolve_all(
        &self,
        headers: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ResolvedColumns {
        ResolvedColumns {
            subject_id: self.resolve(headers, ColumnRole::SubjectId, diagnostics),
            person_name: self.find(headers, ColumnRole::PersonName),
            date: self.resolve(headers, ColumnRole::Date, diagnostics),
            action: self.resolve(headers, ColumnRole::Action, diagnostics),
            time: self.find(headers, ColumnRole::Time),
        }
    }
}

/// Column offsets per role for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub subject_id: Option<usize>,
    pub person_name: Option<usize>,
    pub date: Option<usize>,
    pub action: Option<usize>,
    pub time: Option<usize>,
}

impl ResolvedColumns {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::SubjectId => self.subject_id,
            ColumnRole::PersonName => self.person_name,
            ColumnRole::Date => self.date,
            ColumnRole::Action => self.action,
            ColumnRole::Time => self.time,
        }
    }

    /// Required roles that did not resolve
    pub fn missing_required(&self) -> Vec<ColumnRole> {
        ColumnRole::REQUIRED
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }
}
