use autoschematic_core::{
    connector::{Resource, ResourceAddress},
    util::RON,
};
use indexmap::IndexSet;
use lazy_static::lazy_static;
use autoschematic_core::util::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::{
    grant::{GrantObjectKind, ObjectGrant},
    grant_id::GrantId,
};

lazy_static! {
    // Sequences cannot be shared.
    static ref NO_SHARES: IndexSet<String> = IndexSet::new();
}

fn default_sequence_privilege() -> String {
    GrantObjectKind::Sequence.default_privilege().to_string()
}

fn default_external_table_privilege() -> String {
    GrantObjectKind::ExternalTable.default_privilege().to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// A privilege on one sequence, or on all future sequences in a schema or database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SequenceGrant {
    /// The database containing the current or future sequences.
    pub database_name: String,
    /// The schema containing the current or future sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// The sequence to grant on immediately (only valid if on_future is unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_name: Option<String>,
    #[serde(default = "default_sequence_privilege")]
    pub privilege: String,
    /// Grants privilege to these roles.
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub roles: IndexSet<String>,
    /// Apply to all future sequences in the schema, or in the database when no schema is given.
    #[serde(default)]
    pub on_future: bool,
    /// Allows the recipient roles to grant the privilege to other roles.
    #[serde(default)]
    pub with_grant_option: bool,
}

/// A privilege on one external table, or on all future external tables in a schema or database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExternalTableGrant {
    pub database_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_table_name: Option<String>,
    #[serde(default = "default_external_table_privilege")]
    pub privilege: String,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub roles: IndexSet<String>,
    /// Grants privilege to these shares. Not valid with on_future.
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub shares: IndexSet<String>,
    #[serde(default)]
    pub on_future: bool,
    #[serde(default)]
    pub with_grant_option: bool,
}

impl ObjectGrant for SequenceGrant {
    const KIND: GrantObjectKind = GrantObjectKind::Sequence;

    fn database_name(&self) -> &str {
        &self.database_name
    }

    fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref().filter(|s| !s.is_empty())
    }

    fn object_name(&self) -> Option<&str> {
        self.sequence_name.as_deref().filter(|s| !s.is_empty())
    }

    fn privilege(&self) -> &str {
        &self.privilege
    }

    fn on_future(&self) -> bool {
        self.on_future
    }

    fn with_grant_option(&self) -> bool {
        self.with_grant_option
    }

    fn roles(&self) -> &IndexSet<String> {
        &self.roles
    }

    fn shares(&self) -> &IndexSet<String> {
        &NO_SHARES
    }

    fn from_parts(id: &GrantId, roles: IndexSet<String>, _shares: IndexSet<String>) -> Self {
        SequenceGrant {
            database_name: id.database_name.clone(),
            schema_name: non_empty(&id.schema_name),
            sequence_name: non_empty(&id.object_name),
            privilege: id.privilege.clone(),
            roles,
            on_future: id.is_future(),
            with_grant_option: id.with_grant_option,
        }
    }
}

impl ObjectGrant for ExternalTableGrant {
    const KIND: GrantObjectKind = GrantObjectKind::ExternalTable;

    fn database_name(&self) -> &str {
        &self.database_name
    }

    fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref().filter(|s| !s.is_empty())
    }

    fn object_name(&self) -> Option<&str> {
        self.external_table_name.as_deref().filter(|s| !s.is_empty())
    }

    fn privilege(&self) -> &str {
        &self.privilege
    }

    fn on_future(&self) -> bool {
        self.on_future
    }

    fn with_grant_option(&self) -> bool {
        self.with_grant_option
    }

    fn roles(&self) -> &IndexSet<String> {
        &self.roles
    }

    fn shares(&self) -> &IndexSet<String> {
        &self.shares
    }

    fn from_parts(id: &GrantId, roles: IndexSet<String>, shares: IndexSet<String>) -> Self {
        ExternalTableGrant {
            database_name: id.database_name.clone(),
            schema_name: non_empty(&id.schema_name),
            external_table_name: non_empty(&id.object_name),
            privilege: id.privilege.clone(),
            roles,
            shares,
            on_future: id.is_future(),
            with_grant_option: id.with_grant_option,
        }
    }
}

impl Resource for SequenceGrant {
    fn to_bytes(&self) -> Result<Vec<u8>, anyhow::Error> {
        let pretty_config = PrettyConfig::default().struct_names(true);
        match RON.to_string_pretty(&self, pretty_config) {
            Ok(s) => Ok(s.into()),
            Err(e) => Err(e.into()),
        }
    }

    fn from_bytes(_addr: &impl ResourceAddress, s: &[u8]) -> Result<Self, anyhow::Error>
    where
        Self: Sized,
    {
        let s = str::from_utf8(s)?;
        Ok(RON.from_str(s)?)
    }
}

impl Resource for ExternalTableGrant {
    fn to_bytes(&self) -> Result<Vec<u8>, anyhow::Error> {
        let pretty_config = PrettyConfig::default().struct_names(true);
        match RON.to_string_pretty(&self, pretty_config) {
            Ok(s) => Ok(s.into()),
            Err(e) => Err(e.into()),
        }
    }

    fn from_bytes(_addr: &impl ResourceAddress, s: &[u8]) -> Result<Self, anyhow::Error>
    where
        Self: Sized,
    {
        let s = str::from_utf8(s)?;
        Ok(RON.from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::SnowflakeGrantAddress;

    fn addr() -> SnowflakeGrantAddress {
        SnowflakeGrantAddress::ExternalTableGrant {
            id: "DB|SCHEMA||SELECT|false".parse().unwrap(),
        }
    }

    #[test]
    fn privilege_defaults_per_kind() {
        let grant = ExternalTableGrant::from_bytes(
            &addr(),
            br#"ExternalTableGrant(database_name: "DB", schema_name: Some("SCHEMA"), roles: ["READER"], on_future: true)"#,
        )
        .unwrap();
        assert_eq!(grant.privilege, "SELECT");
        assert!(!grant.with_grant_option);
        assert!(grant.shares.is_empty());

        let grant = SequenceGrant::from_bytes(
            &addr(),
            br#"SequenceGrant(database_name: "DB", schema_name: Some("SCHEMA"), sequence_name: Some("SEQ"))"#,
        )
        .unwrap();
        assert_eq!(grant.privilege, "USAGE");
        assert!(grant.roles.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = SequenceGrant::from_bytes(&addr(), br#"SequenceGrant(database_name: "DB", table_name: Some("T"))"#);
        assert!(res.is_err());
    }

    #[test]
    fn future_grant_reads_back_from_its_id() {
        let id: GrantId = "DB|SCHEMA||SELECT|false".parse().unwrap();
        let grant = ExternalTableGrant::from_parts(&id, IndexSet::from(["READER".to_string()]), IndexSet::new());

        assert_eq!(grant.database_name, "DB");
        assert_eq!(grant.schema_name.as_deref(), Some("SCHEMA"));
        assert_eq!(grant.external_table_name, None);
        assert!(!grant.with_grant_option);
        assert!(grant.on_future);
        assert_eq!(grant.privilege, "SELECT");
        assert_eq!(grant.grant_id(), id);
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let grant = SequenceGrant {
            database_name: "DB".into(),
            schema_name: Some("".into()),
            sequence_name: Some("".into()),
            privilege: "USAGE".into(),
            roles: IndexSet::new(),
            on_future: true,
            with_grant_option: false,
        };
        assert_eq!(grant.schema_name(), None);
        assert_eq!(grant.object_name(), None);
        assert_eq!(grant.grant_id().to_string(), "DB|||USAGE|false");
    }

    #[test]
    fn definitions_survive_ron() {
        let grant = SequenceGrant {
            database_name: "DB".into(),
            schema_name: Some("SCHEMA".into()),
            sequence_name: Some("SEQ".into()),
            privilege: "USAGE".into(),
            roles: IndexSet::from(["A".to_string(), "B".to_string()]),
            on_future: false,
            with_grant_option: true,
        };
        let bytes = grant.to_bytes().unwrap();
        assert_eq!(SequenceGrant::from_bytes(&addr(), &bytes).unwrap(), grant);
    }
}
