use anyhow::anyhow;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;

use crate::error::AuditError;
use crate::models::field::FieldKind;
use crate::policy::{AuditPolicy, SubjectFilter, DEFAULT_EXCLUDED_FIELD_KINDS, DEFAULT_EXCLUDED_SUBJECTS};

const DEFAULT_RETENTION_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub retention_days: i64,
    pub audit: AuditSettings,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/model_audit".to_string());

        let retention_days = match env::var("AUDIT_RETENTION_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| anyhow!("Invalid AUDIT_RETENTION_DAYS value: {}", raw))?,
            Err(_) => DEFAULT_RETENTION_DAYS,
        };
        if retention_days < 0 {
            return Err(anyhow!("AUDIT_RETENTION_DAYS must not be negative"));
        }

        let audit = AuditSettings::from_env()?;

        Ok(Config {
            database_url,
            retention_days,
            audit,
        })
    }
}

/// Raw `AUDIT_*` options. Lists are comma separated in the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditSettings {
    /// Only these subject types are audited.
    pub include: Option<Vec<String>>,
    /// Subject types skipped in addition to the built-in ones.
    pub exclude: Option<Vec<String>>,
    /// Replaces the default excluded field kinds when set.
    pub excluded_field_types: Option<Vec<String>>,
    /// Qualified `<subject_type>.<field>` names.
    #[serde(default)]
    pub excluded_field_names: Vec<String>,
}

impl AuditSettings {
    pub fn from_env() -> Result<Self, AuditError> {
        dotenvy::dotenv().ok();
        let source = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("AUDIT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("include")
                    .with_list_parse_key("exclude")
                    .with_list_parse_key("excluded_field_types")
                    .with_list_parse_key("excluded_field_names"),
            )
            .build()
            .map_err(|e| AuditError::Configuration(e.to_string()))?;
        Self::from_config(source)
    }

    pub fn from_config(source: config::Config) -> Result<Self, AuditError> {
        source
            .try_deserialize()
            .map_err(|e| AuditError::Configuration(e.to_string()))
    }

    /// Fails when both an include-list and an exclude-list are set.
    pub fn into_policy(self) -> Result<AuditPolicy, AuditError> {
        let subjects = match (self.include, self.exclude) {
            (Some(_), Some(_)) => {
                return Err(AuditError::Configuration(
                    "AUDIT_INCLUDE and AUDIT_EXCLUDE cannot both be set".to_string(),
                ))
            }
            (Some(include), None) => SubjectFilter::Include(clean(include).collect()),
            (None, exclude) => {
                let mut excluded: HashSet<String> =
                    DEFAULT_EXCLUDED_SUBJECTS.iter().map(|s| s.to_string()).collect();
                excluded.extend(clean(exclude.unwrap_or_default()));
                SubjectFilter::Exclude(excluded)
            }
        };

        let field_kinds = match self.excluded_field_types {
            Some(names) => clean(names)
                .map(|name| name.parse::<FieldKind>().map_err(AuditError::Configuration))
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_EXCLUDED_FIELD_KINDS.to_vec(),
        };

        Ok(AuditPolicy::new(
            subjects,
            field_kinds,
            clean(self.excluded_field_names),
        ))
    }
}

fn clean(values: Vec<String>) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
