//! Synonym, keyword and locale configuration
//!
//! Everything the resolver and the reconciliation engine match against lives
//! here as plain data, so callers (and tests) can supply their own sets.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Semantic role a header can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnRole {
    SubjectId,
    PersonName,
    Date,
    Action,
    Time,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 5] = [
        ColumnRole::SubjectId,
        ColumnRole::PersonName,
        ColumnRole::Date,
        ColumnRole::Action,
        ColumnRole::Time,
    ];

    /// Roles reconciliation cannot run without
    pub const REQUIRED: [ColumnRole; 3] =
        [ColumnRole::SubjectId, ColumnRole::Date, ColumnRole::Action];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::SubjectId => "subject-id",
            ColumnRole::PersonName => "person-name",
            ColumnRole::Date => "date",
            ColumnRole::Action => "action",
            ColumnRole::Time => "time",
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-folding rules applied before any comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// Dotted/dotless I handled the Turkish way
    #[default]
    Turkish,
    /// Plain Unicode lower-casing
    Invariant,
}

/// Accepted header labels per role, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSynonyms {
    pub subject_id: Vec<String>,
    pub person_name: Vec<String>,
    pub date: Vec<String>,
    pub action: Vec<String>,
    pub time: Vec<String>,
}

impl ColumnSynonyms {
    /// Synonym list for a role
    pub fn for_role(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::SubjectId => &self.subject_id,
            ColumnRole::PersonName => &self.person_name,
            ColumnRole::Date => &self.date,
            ColumnRole::Action => &self.action,
            ColumnRole::Time => &self.time,
        }
    }
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        Self {
            subject_id: strings(&[
                "tc kimlik no",
                "tckn",
                "kimlik no",
                "tc no",
                "tc",
                "vatandaşlık no",
                "t.c. kimlik no",
                "t.c kimlik no",
                "t.c. no",
                "tc kimlik numarası",
                "id number",
                "identifier",
                "id",
            ]),
            person_name: strings(&[
                "ad soyad",
                "adı soyadı",
                "isim soyisim",
                "adsoyad",
                "isim",
                "personel",
                "çalışan",
                "name",
                "full name",
                "employee",
            ]),
            date: strings(&[
                "tarih",
                "işlem tarihi",
                "kayıt tarihi",
                "gün",
                "date",
                "transaction date",
                "record date",
            ]),
            action: strings(&[
                "işlem",
                "açıklama",
                "işlem türü",
                "olay",
                "hareket tipi",
                "action",
                "description",
                "event type",
            ]),
            time: strings(&[
                "saat",
                "işlem saati",
                "zaman",
                "giriş saati",
                "çıkış saati",
                "time",
                "transaction time",
            ]),
        }
    }
}

/// Substrings that classify an action cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionKeywords {
    pub entry: Vec<String>,
    pub exit: Vec<String>,
    pub deletion: Vec<String>,
}

impl Default for ActionKeywords {
    fn default() -> Self {
        Self {
            entry: strings(&["giriş", "entry", "check-in", "registration"]),
            exit: strings(&["çıkış", "exit", "check-out"]),
            deletion: strings(&["silme", "silindi", "deletion", "delete"]),
        }
    }
}

/// Full configuration handed to the resolver, merger and engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: Locale,
    pub columns: ColumnSynonyms,
    pub actions: ActionKeywords,
}

impl Config {
    /// Load a configuration from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that could never resolve a required role
    pub fn validate(&self) -> Result<()> {
        for role in ColumnRole::REQUIRED {
            if self.columns.for_role(role).iter().all(|s| s.trim().is_empty()) {
                return Err(Error::InvalidConfig(format!(
                    "no synonyms configured for required role {}",
                    role
                )));
            }
        }
        if self.actions.entry.is_empty() || self.actions.deletion.is_empty() {
            return Err(Error::InvalidConfig(
                "entry and deletion keyword lists must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
