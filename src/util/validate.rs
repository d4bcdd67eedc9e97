use crate::{
    addr::SnowflakeGrantAddress,
    error::SnowflakeGrantError,
    grant::ObjectGrant,
};

fn check_identifier(field: &'static str, value: Option<&str>) -> Result<(), SnowflakeGrantError> {
    match value {
        Some(v) if v.contains('/') => Err(SnowflakeGrantError::InvalidIdentifier {
            field,
            value: v.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Check a grant definition's option combinations and return it with its
/// privilege in canonical form.
pub fn validate_grant<G: ObjectGrant>(grant: &G) -> Result<G, SnowflakeGrantError> {
    let kind = G::KIND;
    let name_field = kind.name_field();

    if grant.database_name().is_empty() {
        return Err(SnowflakeGrantError::MissingDatabaseName);
    }

    if grant.schema_name().is_none() && !grant.on_future() {
        return Err(SnowflakeGrantError::MissingSchemaName);
    }
    if grant.object_name().is_none() && !grant.on_future() {
        return Err(SnowflakeGrantError::MissingObjectName { field: name_field });
    }
    if grant.object_name().is_some() && grant.on_future() {
        return Err(SnowflakeGrantError::ObjectNameWithFuture { field: name_field });
    }

    if !grant.shares().is_empty() && grant.on_future() {
        return Err(SnowflakeGrantError::FutureGrantToShare);
    }

    if grant.roles().is_empty() && grant.shares().is_empty() {
        return Err(SnowflakeGrantError::NoGrantees);
    }

    check_identifier("database_name", Some(grant.database_name()))?;
    check_identifier("schema_name", grant.schema_name())?;
    check_identifier(name_field, grant.object_name())?;

    let Some(privilege) = kind.canonical_privilege(grant.privilege()) else {
        return Err(SnowflakeGrantError::InvalidPrivilege {
            privilege: grant.privilege().to_string(),
            object_type: kind.object_type(),
            valid: kind.privileges().iter().copied().collect::<Vec<_>>().join(", "),
        });
    };

    let mut id = grant.grant_id();
    id.privilege = privilege.to_string();

    Ok(G::from_parts(&id, grant.roles().clone(), grant.shares().clone()))
}

/// A grant definition must live at the address its own identity resolves to.
pub fn validate_grant_target<G: ObjectGrant>(addr: &SnowflakeGrantAddress, grant: &G) -> Result<(), SnowflakeGrantError> {
    let definition = SnowflakeGrantAddress::new(G::KIND, grant.grant_id());

    if &definition != addr {
        return Err(SnowflakeGrantError::AddressMismatch {
            definition: definition.id().to_string(),
            address: addr.id().to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;

    use super::*;
    use crate::resource::{ExternalTableGrant, SequenceGrant};

    fn sequence_grant() -> SequenceGrant {
        SequenceGrant {
            database_name: "DB".into(),
            schema_name: Some("SCHEMA".into()),
            sequence_name: Some("SEQ".into()),
            privilege: "usage".into(),
            roles: IndexSet::from(["READER".to_string()]),
            on_future: false,
            with_grant_option: false,
        }
    }

    fn future_external_table_grant() -> ExternalTableGrant {
        ExternalTableGrant {
            database_name: "DB".into(),
            schema_name: Some("SCHEMA".into()),
            external_table_name: None,
            privilege: "SELECT".into(),
            roles: IndexSet::from(["READER".to_string()]),
            shares: IndexSet::new(),
            on_future: true,
            with_grant_option: false,
        }
    }

    #[test]
    fn canonicalizes_privilege() {
        let grant = validate_grant(&sequence_grant()).unwrap();
        assert_eq!(grant.privilege, "USAGE");
        assert_eq!(grant.roles, sequence_grant().roles);
    }

    #[test]
    fn schema_required_unless_future() {
        let grant = SequenceGrant {
            schema_name: None,
            ..sequence_grant()
        };
        assert_eq!(validate_grant(&grant), Err(SnowflakeGrantError::MissingSchemaName));

        let grant = SequenceGrant {
            schema_name: None,
            sequence_name: None,
            on_future: true,
            ..sequence_grant()
        };
        assert!(validate_grant(&grant).is_ok());
    }

    #[test]
    fn object_name_required_unless_future() {
        let grant = SequenceGrant {
            sequence_name: Some("".into()),
            ..sequence_grant()
        };
        assert_eq!(
            validate_grant(&grant),
            Err(SnowflakeGrantError::MissingObjectName { field: "sequence_name" })
        );
    }

    #[test]
    fn object_name_forbidden_with_future() {
        let grant = ExternalTableGrant {
            external_table_name: Some("EVENTS".into()),
            ..future_external_table_grant()
        };
        let err = validate_grant(&grant).unwrap_err();
        assert_eq!(err.to_string(), "external_table_name must be empty if on_future is true.");
    }

    #[test]
    fn sequence_name_forbidden_with_future() {
        let grant = SequenceGrant {
            schema_name: None,
            on_future: true,
            ..sequence_grant()
        };
        assert_eq!(
            validate_grant(&grant),
            Err(SnowflakeGrantError::ObjectNameWithFuture { field: "sequence_name" })
        );
        assert_eq!(
            validate_grant(&grant).unwrap_err().to_string(),
            "sequence_name must be empty if on_future is true."
        );
    }

    #[test]
    fn schema_check_comes_first() {
        let grant = SequenceGrant {
            schema_name: None,
            sequence_name: None,
            ..sequence_grant()
        };
        assert_eq!(
            validate_grant(&grant).unwrap_err().to_string(),
            "schema_name must be set unless on_future is true."
        );
    }

    #[test]
    fn shares_cannot_receive_future_grants() {
        let grant = ExternalTableGrant {
            shares: IndexSet::from(["PARTNER".to_string()]),
            ..future_external_table_grant()
        };
        assert_eq!(validate_grant(&grant), Err(SnowflakeGrantError::FutureGrantToShare));
    }

    #[test]
    fn rejects_unknown_privilege() {
        let grant = SequenceGrant {
            privilege: "SELECT".into(),
            ..sequence_grant()
        };
        assert!(matches!(
            validate_grant(&grant),
            Err(SnowflakeGrantError::InvalidPrivilege { object_type: "SEQUENCE", .. })
        ));
    }

    #[test]
    fn requires_a_grantee() {
        let grant = SequenceGrant {
            roles: IndexSet::new(),
            ..sequence_grant()
        };
        assert_eq!(validate_grant(&grant), Err(SnowflakeGrantError::NoGrantees));
    }

    #[test]
    fn rejects_slashes_in_identifiers() {
        let grant = SequenceGrant {
            sequence_name: Some("a/b".into()),
            ..sequence_grant()
        };
        assert!(matches!(
            validate_grant(&grant),
            Err(SnowflakeGrantError::InvalidIdentifier { field: "sequence_name", .. })
        ));
    }

    #[test]
    fn definition_must_match_address() {
        let grant = validate_grant(&future_external_table_grant()).unwrap();
        let addr = SnowflakeGrantAddress::ExternalTableGrant {
            id: "DB|SCHEMA||SELECT|false".parse().unwrap(),
        };
        assert!(validate_grant_target(&addr, &grant).is_ok());

        let addr = SnowflakeGrantAddress::ExternalTableGrant {
            id: "DB|OTHER||SELECT|false".parse().unwrap(),
        };
        assert!(matches!(
            validate_grant_target(&addr, &grant),
            Err(SnowflakeGrantError::AddressMismatch { .. })
        ));

        let addr = SnowflakeGrantAddress::SequenceGrant {
            id: "DB|SCHEMA||SELECT|false".parse().unwrap(),
        };
        assert!(validate_grant_target(&addr, &grant).is_err());
    }
}
