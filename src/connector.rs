use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use async_trait::async_trait;
use autoschematic_core::{
    connector::{
        Connector, ConnectorOp, ConnectorOutbox, FilterResponse, GetResourceResponse, OpExecResponse, PlanResponseElement,
        Resource, ResourceAddress,
    },
    connector_op,
    diag::{Diagnostic, DiagnosticPosition, DiagnosticResponse, DiagnosticSeverity, DiagnosticSpan},
    get_resource_response,
    util::{ron_check_eq, ron_check_syntax},
};
use snowflake_api::SnowflakeApi;
use tokio::sync::Mutex;

use crate::{
    addr::SnowflakeGrantAddress,
    config::SnowflakeConnectorConfig,
    grant::{GrantObjectKind, GrantRow, GrantTarget, ObjectGrant, grant_ids_from_rows},
    grant_id::GrantId,
    op::SnowflakeGrantConnectorOp,
    plan::{GrantChange, plan_grant},
    resource::*,
    util::{
        api::Grantees,
        sql,
        validate::{validate_grant, validate_grant_target},
    },
};

const GRANT_KINDS: [GrantObjectKind; 2] = [GrantObjectKind::Sequence, GrantObjectKind::ExternalTable];

pub struct SnowflakeGrantConnector {
    pub config: Mutex<Option<SnowflakeConnectorConfig>>,
    pub api: Mutex<Option<Arc<SnowflakeApi>>>,
}

impl SnowflakeGrantConnector {
    /// Addresses of every grant a role or share holds on each of `targets`.
    async fn list_grants(api: &SnowflakeApi, targets: &[GrantTarget]) -> Result<Vec<PathBuf>, anyhow::Error> {
        let mut results = Vec::new();
        // One SHOW FUTURE GRANTS result covers every kind in a schema or database.
        let mut future_rows: HashMap<String, Option<Vec<GrantRow>>> = HashMap::new();

        for target in targets {
            let query = sql::build_show_grants_sql(target);
            let rows = match future_rows.get(&query) {
                Some(rows) => rows.clone(),
                None => {
                    let rows = Self::show_grants(api, target).await?;
                    if target.is_future() {
                        future_rows.insert(query, rows.clone());
                    }
                    rows
                }
            };

            for id in grant_ids_from_rows(target, rows.as_deref().unwrap_or_default()) {
                if !id.fits_in_path() {
                    tracing::warn!("skipping grant {} on {}: names containing '/' cannot be addressed", id, target);
                    continue;
                }
                results.push(SnowflakeGrantAddress::new(target.kind(), id).to_path_buf());
            }
        }

        Ok(results)
    }

    async fn read_grant<G: ObjectGrant>(&self, id: &GrantId) -> Result<Option<G>, anyhow::Error> {
        let api = self.get_api().await?;
        let target = GrantTarget::from_grant_id(G::KIND, id);

        let Some(grantees) = Self::read_generic_grant(&api, &target, &id.privilege, id.with_grant_option).await? else {
            return Ok(None);
        };

        Ok(Some(G::from_parts(id, grantees.roles, grantees.shares)))
    }

    async fn get_grant<G: ObjectGrant + Resource>(&self, id: &GrantId) -> Result<Option<GetResourceResponse>, anyhow::Error> {
        if let Some(grant) = self.read_grant::<G>(id).await? {
            get_resource_response!(grant)
        } else {
            Ok(None)
        }
    }

    async fn create_grant<G: ObjectGrant>(&self, addr: &SnowflakeGrantAddress, grant: &G) -> Result<OpExecResponse, anyhow::Error> {
        let grant = validate_grant(grant)?;
        validate_grant_target(addr, &grant)?;

        let api = self.get_api().await?;
        let target = grant.target();
        let grantees = Grantees {
            roles: grant.roles().clone(),
            shares: grant.shares().clone(),
        };

        Self::create_generic_grant(&api, &target, grant.privilege(), grant.with_grant_option(), &grantees).await?;

        match self.read_grant::<G>(addr.id()).await? {
            Some(current) => tracing::debug!(
                "{} now held by {:?} {:?}",
                addr.id(),
                current.roles(),
                current.shares()
            ),
            None => tracing::warn!("grant {} not visible after creation", addr.id()),
        }

        Ok(OpExecResponse {
            outputs: Some(HashMap::new()),
            friendly_message: Some(GrantChange::Create(grant).describe()),
        })
    }

    async fn delete_grant<G: ObjectGrant>(&self, addr: &SnowflakeGrantAddress, grant: &G) -> Result<OpExecResponse, anyhow::Error> {
        validate_grant_target(addr, grant)?;

        let api = self.get_api().await?;
        let grantees = Grantees {
            roles: grant.roles().clone(),
            shares: grant.shares().clone(),
        };

        Self::delete_generic_grant(&api, &grant.target(), grant.privilege(), &grantees).await?;

        Ok(OpExecResponse {
            outputs: Some(HashMap::new()),
            friendly_message: Some(GrantChange::Delete(grant.clone()).describe()),
        })
    }

    async fn plan_grant_ops<G>(
        &self,
        addr: &SnowflakeGrantAddress,
        current: Option<Vec<u8>>,
        desired: Option<Vec<u8>>,
    ) -> Result<Vec<PlanResponseElement>, anyhow::Error>
    where
        G: ObjectGrant + Resource,
        SnowflakeGrantConnectorOp: From<GrantChange<G>>,
    {
        let current = current.map(|c| G::from_bytes(addr, &c)).transpose()?;
        let desired = desired.map(|d| G::from_bytes(addr, &d)).transpose()?;

        let mut res = Vec::new();
        for change in plan_grant(addr, current, desired)? {
            let message = change.describe();
            res.push(connector_op!(SnowflakeGrantConnectorOp::from(change), message));
        }
        Ok(res)
    }

    fn validation_diagnostics<G: ObjectGrant>(addr: &SnowflakeGrantAddress, grant: &G) -> DiagnosticResponse {
        let diagnostics = match validate_grant(grant).and_then(|grant| validate_grant_target(addr, &grant)) {
            Ok(()) => Vec::new(),
            Err(e) => vec![Diagnostic {
                severity: DiagnosticSeverity::ERROR as u8,
                span: DiagnosticSpan {
                    start: DiagnosticPosition { line: 1, col: 1 },
                    end: DiagnosticPosition { line: 1, col: 1 },
                },
                message: e.to_string(),
            }],
        };

        DiagnosticResponse { diagnostics }
    }
}

#[async_trait]
impl Connector for SnowflakeGrantConnector {
    async fn new(_name: &str, _prefix: &Path, _outbox: ConnectorOutbox) -> Result<Arc<dyn Connector>, anyhow::Error>
    where
        Self: Sized,
    {
        Ok(Arc::new(SnowflakeGrantConnector {
            config: Mutex::new(None),
            api: Mutex::new(None),
        }))
    }

    async fn init(&self) -> anyhow::Result<()> {
        let config = SnowflakeConnectorConfig::from_env()?;
        tracing::info!("Snowflake grant connector using account {} as {}", config.account, config.role);

        *self.config.lock().await = Some(config);
        *self.api.lock().await = None;
        Ok(())
    }

    async fn filter(&self, addr: &Path) -> Result<FilterResponse, anyhow::Error> {
        if let Ok(_addr) = SnowflakeGrantAddress::from_path(addr) {
            Ok(FilterResponse::Resource)
        } else {
            Ok(FilterResponse::None)
        }
    }

    async fn list(&self, _subpath: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
        let api = self.get_api().await?;
        let mut results = Vec::new();

        for database in SnowflakeGrantConnector::list_databases(&api).await? {
            if database == "SNOWFLAKE" {
                continue;
            }

            let database_futures: Vec<GrantTarget> = GRANT_KINDS
                .iter()
                .map(|kind| GrantTarget::Future {
                    kind: *kind,
                    database: database.clone(),
                    schema: None,
                })
                .collect();
            results.extend(Self::list_grants(&api, &database_futures).await?);

            for schema in SnowflakeGrantConnector::list_schemas(&api, &database).await? {
                if schema == "INFORMATION_SCHEMA" {
                    continue;
                }

                let mut targets: Vec<GrantTarget> = GRANT_KINDS
                    .iter()
                    .map(|kind| GrantTarget::Future {
                        kind: *kind,
                        database: database.clone(),
                        schema: Some(schema.clone()),
                    })
                    .collect();

                for kind in GRANT_KINDS {
                    for name in SnowflakeGrantConnector::list_objects(&api, kind, &database, &schema).await? {
                        targets.push(GrantTarget::Object {
                            kind,
                            database: database.clone(),
                            schema: schema.clone(),
                            name,
                        });
                    }
                }

                results.extend(Self::list_grants(&api, &targets).await?);
            }
        }

        Ok(results)
    }

    async fn get(&self, addr: &Path) -> Result<Option<GetResourceResponse>, anyhow::Error> {
        let addr = SnowflakeGrantAddress::from_path(addr)?;
        match &addr {
            SnowflakeGrantAddress::SequenceGrant { id } => self.get_grant::<SequenceGrant>(id).await,
            SnowflakeGrantAddress::ExternalTableGrant { id } => self.get_grant::<ExternalTableGrant>(id).await,
        }
    }

    async fn plan(
        &self,
        addr: &Path,
        current: Option<Vec<u8>>,
        desired: Option<Vec<u8>>,
    ) -> Result<Vec<PlanResponseElement>, anyhow::Error> {
        tracing::debug!("plan {:?}: {:?} -> {:?}", addr, current, desired);
        let addr = SnowflakeGrantAddress::from_path(addr)?;

        match &addr {
            SnowflakeGrantAddress::SequenceGrant { .. } => self.plan_grant_ops::<SequenceGrant>(&addr, current, desired).await,
            SnowflakeGrantAddress::ExternalTableGrant { .. } => {
                self.plan_grant_ops::<ExternalTableGrant>(&addr, current, desired).await
            }
        }
    }

    async fn op_exec(&self, addr: &Path, op: &str) -> Result<OpExecResponse, anyhow::Error> {
        let op = SnowflakeGrantConnectorOp::from_str(op)?;
        let addr = SnowflakeGrantAddress::from_path(addr)?;

        match (&addr, &op) {
            (SnowflakeGrantAddress::SequenceGrant { .. }, SnowflakeGrantConnectorOp::CreateSequenceGrant(grant)) => {
                self.create_grant(&addr, grant).await
            }
            (SnowflakeGrantAddress::SequenceGrant { .. }, SnowflakeGrantConnectorOp::DeleteSequenceGrant(grant)) => {
                self.delete_grant(&addr, grant).await
            }
            (SnowflakeGrantAddress::SequenceGrant { .. }, _) => bail!("Invalid operation for SequenceGrant address"),
            (
                SnowflakeGrantAddress::ExternalTableGrant { .. },
                SnowflakeGrantConnectorOp::CreateExternalTableGrant(grant),
            ) => self.create_grant(&addr, grant).await,
            (
                SnowflakeGrantAddress::ExternalTableGrant { .. },
                SnowflakeGrantConnectorOp::DeleteExternalTableGrant(grant),
            ) => self.delete_grant(&addr, grant).await,
            (SnowflakeGrantAddress::ExternalTableGrant { .. }, _) => {
                bail!("Invalid operation for ExternalTableGrant address")
            }
        }
    }

    async fn eq(&self, addr: &Path, a: &[u8], b: &[u8]) -> anyhow::Result<bool> {
        let parsed_addr = SnowflakeGrantAddress::from_path(addr)?;

        match parsed_addr {
            SnowflakeGrantAddress::SequenceGrant { .. } => ron_check_eq::<SequenceGrant>(a, b),
            SnowflakeGrantAddress::ExternalTableGrant { .. } => ron_check_eq::<ExternalTableGrant>(a, b),
        }
    }

    async fn diag(&self, addr: &Path, a: &[u8]) -> Result<Option<DiagnosticResponse>, anyhow::Error> {
        let parsed_addr = SnowflakeGrantAddress::from_path(addr)?;

        match parsed_addr {
            SnowflakeGrantAddress::SequenceGrant { .. } => {
                let Ok(grant) = SequenceGrant::from_bytes(&parsed_addr, a) else {
                    return ron_check_syntax::<SequenceGrant>(a);
                };
                Ok(Some(Self::validation_diagnostics(&parsed_addr, &grant)))
            }
            SnowflakeGrantAddress::ExternalTableGrant { .. } => {
                let Ok(grant) = ExternalTableGrant::from_bytes(&parsed_addr, a) else {
                    return ron_check_syntax::<ExternalTableGrant>(a);
                };
                Ok(Some(Self::validation_diagnostics(&parsed_addr, &grant)))
            }
        }
    }
}
