use std::fmt;

use indexmap::IndexSet;
use lazy_static::lazy_static;

use crate::grant_id::GrantId;

pub const PRIVILEGE_OWNERSHIP: &str = "OWNERSHIP";
pub const PRIVILEGE_USAGE: &str = "USAGE";
pub const PRIVILEGE_SELECT: &str = "SELECT";
pub const PRIVILEGE_REFERENCES: &str = "REFERENCES";

lazy_static! {
    static ref SEQUENCE_PRIVILEGES: IndexSet<&'static str> = IndexSet::from([PRIVILEGE_OWNERSHIP, PRIVILEGE_USAGE]);
    static ref EXTERNAL_TABLE_PRIVILEGES: IndexSet<&'static str> =
        IndexSet::from([PRIVILEGE_OWNERSHIP, PRIVILEGE_SELECT, PRIVILEGE_REFERENCES]);
}

/// The kinds of schema objects this connector manages grants on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantObjectKind {
    Sequence,
    ExternalTable,
}

impl GrantObjectKind {
    pub fn object_type(&self) -> &'static str {
        match self {
            GrantObjectKind::Sequence => "SEQUENCE",
            GrantObjectKind::ExternalTable => "EXTERNAL TABLE",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            GrantObjectKind::Sequence => "SEQUENCES",
            GrantObjectKind::ExternalTable => "EXTERNAL TABLES",
        }
    }

    /// Name of the field holding the object name in a grant definition.
    pub fn name_field(&self) -> &'static str {
        match self {
            GrantObjectKind::Sequence => "sequence_name",
            GrantObjectKind::ExternalTable => "external_table_name",
        }
    }

    pub fn privileges(&self) -> &'static IndexSet<&'static str> {
        match self {
            GrantObjectKind::Sequence => &SEQUENCE_PRIVILEGES,
            GrantObjectKind::ExternalTable => &EXTERNAL_TABLE_PRIVILEGES,
        }
    }

    pub fn default_privilege(&self) -> &'static str {
        match self {
            GrantObjectKind::Sequence => PRIVILEGE_USAGE,
            GrantObjectKind::ExternalTable => PRIVILEGE_SELECT,
        }
    }

    /// Case-insensitive lookup in this kind's privilege set, returning the canonical spelling.
    pub fn canonical_privilege(&self, privilege: &str) -> Option<&'static str> {
        self.privileges()
            .iter()
            .find(|p| p.eq_ignore_ascii_case(privilege.trim()))
            .copied()
    }

    /// Whether a `granted_on` / `grant_on` column value names this kind.
    /// Snowflake reports multi-word types both with spaces and underscores.
    pub fn matches_granted_on(&self, granted_on: &str) -> bool {
        granted_on.replace('_', " ").eq_ignore_ascii_case(self.object_type())
    }
}

/// What a grant statement is scoped to: one named object, or every future
/// object of a kind in a schema (or in a whole database when schema is None).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantTarget {
    Object {
        kind: GrantObjectKind,
        database: String,
        schema: String,
        name: String,
    },
    Future {
        kind: GrantObjectKind,
        database: String,
        schema: Option<String>,
    },
}

impl GrantTarget {
    pub fn from_grant_id(kind: GrantObjectKind, id: &GrantId) -> Self {
        if id.is_future() {
            GrantTarget::Future {
                kind,
                database: id.database_name.clone(),
                schema: id.schema().map(str::to_string),
            }
        } else {
            GrantTarget::Object {
                kind,
                database: id.database_name.clone(),
                schema: id.schema_name.clone(),
                name: id.object_name.clone(),
            }
        }
    }

    pub fn kind(&self) -> GrantObjectKind {
        match self {
            GrantTarget::Object { kind, .. } => *kind,
            GrantTarget::Future { kind, .. } => *kind,
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, GrantTarget::Future { .. })
    }
}

impl fmt::Display for GrantTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantTarget::Object {
                kind,
                database,
                schema,
                name,
            } => write!(f, "{} `{}.{}.{}`", kind.object_type().to_lowercase(), database, schema, name),
            GrantTarget::Future {
                kind,
                database,
                schema: Some(schema),
            } => write!(f, "future {} in schema `{}.{}`", kind.plural().to_lowercase(), database, schema),
            GrantTarget::Future {
                kind,
                database,
                schema: None,
            } => write!(f, "future {} in database `{}`", kind.plural().to_lowercase(), database),
        }
    }
}

/// Common view over the grant resource definitions.
pub trait ObjectGrant: Clone {
    const KIND: GrantObjectKind;

    fn database_name(&self) -> &str;
    fn schema_name(&self) -> Option<&str>;
    fn object_name(&self) -> Option<&str>;
    fn privilege(&self) -> &str;
    fn on_future(&self) -> bool;
    fn with_grant_option(&self) -> bool;
    fn roles(&self) -> &IndexSet<String>;
    fn shares(&self) -> &IndexSet<String>;

    /// Rebuild a definition from its id and the grantees currently holding it.
    fn from_parts(id: &GrantId, roles: IndexSet<String>, shares: IndexSet<String>) -> Self;

    fn grant_id(&self) -> GrantId {
        GrantId {
            database_name: self.database_name().to_string(),
            schema_name: self.schema_name().unwrap_or_default().to_string(),
            object_name: self.object_name().unwrap_or_default().to_string(),
            privilege: self.privilege().to_string(),
            with_grant_option: self.with_grant_option(),
        }
    }

    fn target(&self) -> GrantTarget {
        GrantTarget::from_grant_id(Self::KIND, &self.grant_id())
    }

    /// The same grant restricted to a subset of grantees.
    fn with_grantees(&self, roles: IndexSet<String>, shares: IndexSet<String>) -> Self {
        Self::from_parts(&self.grant_id(), roles, shares)
    }
}

/// One row of `SHOW GRANTS ON ...` or `SHOW FUTURE GRANTS IN ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRow {
    pub privilege: String,
    pub granted_on: String,
    pub granted_to: String,
    pub grantee_name: String,
    pub grant_option: bool,
}

/// Roles and shares holding `privilege` on `target`, as reported by the rows
/// of the target's show statement.
pub fn collect_grantees(
    target: &GrantTarget,
    rows: &[GrantRow],
    privilege: &str,
    with_grant_option: bool,
) -> (IndexSet<String>, IndexSet<String>) {
    let mut roles = Vec::new();
    let mut shares = Vec::new();

    for row in rows {
        if row.privilege != privilege || row.grant_option != with_grant_option {
            continue;
        }
        if target.is_future() && !target.kind().matches_granted_on(&row.granted_on) {
            continue;
        }

        match row.granted_to.as_str() {
            "ROLE" => roles.push(row.grantee_name.clone()),
            "SHARE" => shares.push(strip_account_from_name(&row.grantee_name).to_string()),
            other => tracing::debug!("ignoring grant to {} {}", other, row.grantee_name),
        }
    }

    roles.sort();
    shares.sort();

    (IndexSet::from_iter(roles), IndexSet::from_iter(shares))
}

/// One id per distinct (privilege, grant option) held by a role or share on
/// `target`. Used to enumerate existing grants for import.
pub fn grant_ids_from_rows(target: &GrantTarget, rows: &[GrantRow]) -> Vec<GrantId> {
    let kind = target.kind();
    let mut ids = IndexSet::new();

    for row in rows {
        if row.granted_to != "ROLE" && row.granted_to != "SHARE" {
            continue;
        }
        if target.is_future() && !kind.matches_granted_on(&row.granted_on) {
            continue;
        }
        let Some(privilege) = kind.canonical_privilege(&row.privilege) else {
            continue;
        };

        let id = match target {
            GrantTarget::Object {
                database, schema, name, ..
            } => GrantId {
                database_name: database.clone(),
                schema_name: schema.clone(),
                object_name: name.clone(),
                privilege: privilege.to_string(),
                with_grant_option: row.grant_option,
            },
            GrantTarget::Future { database, schema, .. } => GrantId {
                database_name: database.clone(),
                schema_name: schema.clone().unwrap_or_default(),
                object_name: String::new(),
                privilege: privilege.to_string(),
                with_grant_option: row.grant_option,
            },
        };
        ids.insert(id);
    }

    ids.into_iter().collect()
}

/// Shares are reported as `ACCOUNT.SHARE`.
pub fn strip_account_from_name(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, share)| share).unwrap_or(name)
}
