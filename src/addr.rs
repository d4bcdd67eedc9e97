use std::path::{Path, PathBuf};

use autoschematic_core::{connector::ResourceAddress, error_util::invalid_addr_path};

use crate::{grant::GrantObjectKind, grant_id::GrantId};

/// Grants are addressed by their composite id:
/// `snowflake/grants/sequences/DB|SCHEMA|SEQ|USAGE|false.ron`
#[derive(Clone, Debug, PartialEq)]
pub enum SnowflakeGrantAddress {
    SequenceGrant { id: GrantId },
    ExternalTableGrant { id: GrantId },
}

impl SnowflakeGrantAddress {
    pub fn new(kind: GrantObjectKind, id: GrantId) -> Self {
        match kind {
            GrantObjectKind::Sequence => SnowflakeGrantAddress::SequenceGrant { id },
            GrantObjectKind::ExternalTable => SnowflakeGrantAddress::ExternalTableGrant { id },
        }
    }

    pub fn id(&self) -> &GrantId {
        match self {
            SnowflakeGrantAddress::SequenceGrant { id } => id,
            SnowflakeGrantAddress::ExternalTableGrant { id } => id,
        }
    }

    pub fn kind(&self) -> GrantObjectKind {
        match self {
            SnowflakeGrantAddress::SequenceGrant { .. } => GrantObjectKind::Sequence,
            SnowflakeGrantAddress::ExternalTableGrant { .. } => GrantObjectKind::ExternalTable,
        }
    }
}

fn parse_ron_stem(path: &Path, name: &str) -> Result<GrantId, anyhow::Error> {
    let Some(stem) = name.strip_suffix(".ron") else {
        return Err(invalid_addr_path(path));
    };
    Ok(stem.parse()?)
}

impl ResourceAddress for SnowflakeGrantAddress {
    fn to_path_buf(&self) -> std::path::PathBuf {
        match self {
            SnowflakeGrantAddress::SequenceGrant { id } => PathBuf::from(format!("snowflake/grants/sequences/{}.ron", id)),
            SnowflakeGrantAddress::ExternalTableGrant { id } => {
                PathBuf::from(format!("snowflake/grants/external_tables/{}.ron", id))
            }
        }
    }

    fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
        let Some(path_components) = path
            .components()
            .map(|s| s.as_os_str().to_str())
            .collect::<Option<Vec<&str>>>()
        else {
            return Err(invalid_addr_path(path));
        };

        match path_components[..] {
            ["snowflake", "grants", "sequences", name] => Ok(SnowflakeGrantAddress::SequenceGrant {
                id: parse_ron_stem(path, name)?,
            }),
            ["snowflake", "grants", "external_tables", name] => Ok(SnowflakeGrantAddress::ExternalTableGrant {
                id: parse_ron_stem(path, name)?,
            }),
            _ => Err(invalid_addr_path(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_grant_path() {
        let addr = SnowflakeGrantAddress::from_path(Path::new("snowflake/grants/sequences/DB|SCHEMA|SEQ|USAGE|false.ron"))
            .unwrap();
        assert_eq!(addr.kind(), GrantObjectKind::Sequence);
        assert_eq!(addr.id().object_name, "SEQ");
        assert_eq!(
            addr.to_path_buf(),
            PathBuf::from("snowflake/grants/sequences/DB|SCHEMA|SEQ|USAGE|false.ron")
        );
    }

    #[test]
    fn future_external_table_grant_path() {
        let addr =
            SnowflakeGrantAddress::from_path(Path::new("snowflake/grants/external_tables/DB|SCHEMA||SELECT|false.ron"))
                .unwrap();
        assert_eq!(addr.kind(), GrantObjectKind::ExternalTable);
        assert!(addr.id().is_future());
    }

    #[test]
    fn rejects_foreign_paths() {
        assert!(SnowflakeGrantAddress::from_path(Path::new("snowflake/roles/ADMIN.ron")).is_err());
        assert!(SnowflakeGrantAddress::from_path(Path::new("snowflake/grants/sequences/DB|S|SEQ|USAGE|false.sql")).is_err());
        assert!(SnowflakeGrantAddress::from_path(Path::new("snowflake/grants/sequences/DB|S.ron")).is_err());
        assert!(SnowflakeGrantAddress::from_path(Path::new("snowflake/grants/tables/DB|S|T|SELECT|false.ron")).is_err());
    }

    #[test]
    fn slashes_in_names_do_not_fit_in_a_path() {
        let id = GrantId {
            database_name: "DB".into(),
            schema_name: "S".into(),
            object_name: "a/b".into(),
            privilege: "USAGE".into(),
            with_grant_option: false,
        };
        assert!(!id.fits_in_path());

        let path = SnowflakeGrantAddress::new(GrantObjectKind::Sequence, id).to_path_buf();
        assert!(SnowflakeGrantAddress::from_path(&path).is_err());

        let id: GrantId = "DB|S|SEQ|USAGE|false".parse().unwrap();
        assert!(id.fits_in_path());
    }
}
