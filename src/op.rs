use autoschematic_core::connector::ConnectorOp;
use serde::{Deserialize, Serialize};

use crate::{plan::GrantChange, resource::*};

/// Each op carries the grant restricted to the grantees it acts on.
#[derive(Debug, Serialize, Deserialize)]
pub enum SnowflakeGrantConnectorOp {
    CreateSequenceGrant(SequenceGrant),
    DeleteSequenceGrant(SequenceGrant),
    CreateExternalTableGrant(ExternalTableGrant),
    DeleteExternalTableGrant(ExternalTableGrant),
}

impl From<GrantChange<SequenceGrant>> for SnowflakeGrantConnectorOp {
    fn from(change: GrantChange<SequenceGrant>) -> Self {
        match change {
            GrantChange::Create(grant) => SnowflakeGrantConnectorOp::CreateSequenceGrant(grant),
            GrantChange::Delete(grant) => SnowflakeGrantConnectorOp::DeleteSequenceGrant(grant),
        }
    }
}

impl From<GrantChange<ExternalTableGrant>> for SnowflakeGrantConnectorOp {
    fn from(change: GrantChange<ExternalTableGrant>) -> Self {
        match change {
            GrantChange::Create(grant) => SnowflakeGrantConnectorOp::CreateExternalTableGrant(grant),
            GrantChange::Delete(grant) => SnowflakeGrantConnectorOp::DeleteExternalTableGrant(grant),
        }
    }
}

impl ConnectorOp for SnowflakeGrantConnectorOp {
    fn to_string(&self) -> Result<String, anyhow::Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn from_str(s: &str) -> Result<Self, anyhow::Error>
    where
        Self: Sized,
    {
        Ok(serde_json::from_str(s)?)
    }
}
