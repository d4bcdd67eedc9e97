use indexmap::IndexSet;

use crate::{
    addr::SnowflakeGrantAddress,
    error::SnowflakeGrantError,
    grant::ObjectGrant,
    util::validate::{validate_grant, validate_grant_target},
};

/// A step towards the desired state of one grant.
/// Every field but the grantees is part of the grant's identity, so a change
/// is always expressed as granting to new grantees and revoking from old ones.
#[derive(Debug, Clone, PartialEq)]
pub enum GrantChange<G> {
    Create(G),
    Delete(G),
}

impl<G: ObjectGrant> GrantChange<G> {
    pub fn describe(&self) -> String {
        let (verb, preposition, grant) = match self {
            GrantChange::Create(grant) => ("Grant", "to", grant),
            GrantChange::Delete(grant) => ("Revoke", "from", grant),
        };

        let mut grantees: Vec<String> = grant.roles().iter().map(|r| format!("role `{}`", r)).collect();
        grantees.extend(grant.shares().iter().map(|s| format!("share `{}`", s)));

        let mut message = format!(
            "{} {} on {} {} {}",
            verb,
            grant.privilege(),
            grant.target(),
            preposition,
            grantees.join(", ")
        );
        if grant.with_grant_option() && matches!(self, GrantChange::Create(_)) {
            message.push_str(" with grant option");
        }
        message
    }
}

fn difference(a: &IndexSet<String>, b: &IndexSet<String>) -> IndexSet<String> {
    a.difference(b).cloned().collect()
}

/// Compare the current state of a grant (as read back from Snowflake) with its
/// desired definition.
pub fn plan_grant<G: ObjectGrant>(
    addr: &SnowflakeGrantAddress,
    current: Option<G>,
    desired: Option<G>,
) -> Result<Vec<GrantChange<G>>, SnowflakeGrantError> {
    let mut res = Vec::new();

    match (current, desired) {
        (None, None) => {}
        (None, Some(desired)) => {
            let desired = validate_grant(&desired)?;
            validate_grant_target(addr, &desired)?;
            res.push(GrantChange::Create(desired));
        }
        (Some(current), None) => {
            if !current.roles().is_empty() || !current.shares().is_empty() {
                res.push(GrantChange::Delete(current));
            }
        }
        (Some(current), Some(desired)) => {
            let desired = validate_grant(&desired)?;
            validate_grant_target(addr, &desired)?;

            let new_roles = difference(desired.roles(), current.roles());
            let new_shares = difference(desired.shares(), current.shares());
            let old_roles = difference(current.roles(), desired.roles());
            let old_shares = difference(current.shares(), desired.shares());

            if !new_roles.is_empty() || !new_shares.is_empty() {
                res.push(GrantChange::Create(desired.with_grantees(new_roles, new_shares)));
            }
            if !old_roles.is_empty() || !old_shares.is_empty() {
                res.push(GrantChange::Delete(current.with_grantees(old_roles, old_shares)));
            }
        }
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ExternalTableGrant, SequenceGrant};

    fn roles(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn sequence_addr() -> SnowflakeGrantAddress {
        SnowflakeGrantAddress::SequenceGrant {
            id: "DB|SCHEMA|SEQ|USAGE|false".parse().unwrap(),
        }
    }

    fn sequence_grant(grantees: &[&str]) -> SequenceGrant {
        SequenceGrant {
            database_name: "DB".into(),
            schema_name: Some("SCHEMA".into()),
            sequence_name: Some("SEQ".into()),
            privilege: "USAGE".into(),
            roles: roles(grantees),
            on_future: false,
            with_grant_option: false,
        }
    }

    #[test]
    fn creates_new_grant() {
        let desired = SequenceGrant {
            privilege: "usage".into(),
            ..sequence_grant(&["READER"])
        };
        let changes = plan_grant(&sequence_addr(), None, Some(desired)).unwrap();
        assert_eq!(changes, vec![GrantChange::Create(sequence_grant(&["READER"]))]);
        assert_eq!(
            changes[0].describe(),
            "Grant USAGE on sequence `DB.SCHEMA.SEQ` to role `READER`"
        );
    }

    #[test]
    fn deletes_removed_grant() {
        let changes = plan_grant(&sequence_addr(), Some(sequence_grant(&["A", "B"])), None).unwrap();
        assert_eq!(changes, vec![GrantChange::Delete(sequence_grant(&["A", "B"]))]);
        assert_eq!(
            changes[0].describe(),
            "Revoke USAGE on sequence `DB.SCHEMA.SEQ` from role `A`, role `B`"
        );
    }

    #[test]
    fn unchanged_grant_plans_nothing() {
        let changes = plan_grant(
            &sequence_addr(),
            Some(sequence_grant(&["A", "B"])),
            Some(sequence_grant(&["B", "A"])),
        )
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn grantee_changes_grant_then_revoke() {
        let changes = plan_grant(
            &sequence_addr(),
            Some(sequence_grant(&["A", "B"])),
            Some(sequence_grant(&["B", "C"])),
        )
        .unwrap();
        assert_eq!(
            changes,
            vec![
                GrantChange::Create(sequence_grant(&["C"])),
                GrantChange::Delete(sequence_grant(&["A"])),
            ]
        );
    }

    #[test]
    fn invalid_definitions_are_refused() {
        let desired = SequenceGrant {
            sequence_name: None,
            ..sequence_grant(&["READER"])
        };
        assert_eq!(
            plan_grant(&sequence_addr(), None, Some(desired)),
            Err(SnowflakeGrantError::MissingObjectName { field: "sequence_name" })
        );
    }

    #[test]
    fn definition_at_wrong_address_is_refused() {
        let desired = SequenceGrant {
            sequence_name: Some("OTHER".into()),
            ..sequence_grant(&["READER"])
        };
        assert!(matches!(
            plan_grant(&sequence_addr(), None, Some(desired)),
            Err(SnowflakeGrantError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn share_grants_describe_all_grantees() {
        let addr = SnowflakeGrantAddress::ExternalTableGrant {
            id: "DB|SCHEMA|EVENTS|SELECT|true".parse().unwrap(),
        };
        let desired = ExternalTableGrant {
            database_name: "DB".into(),
            schema_name: Some("SCHEMA".into()),
            external_table_name: Some("EVENTS".into()),
            privilege: "SELECT".into(),
            roles: roles(&["READER"]),
            shares: roles(&["PARTNER"]),
            on_future: false,
            with_grant_option: true,
        };
        let changes = plan_grant(&addr, None, Some(desired)).unwrap();
        assert_eq!(
            changes[0].describe(),
            "Grant SELECT on external table `DB.SCHEMA.EVENTS` to role `READER`, share `PARTNER` with grant option"
        );
    }
}
