use std::sync::Arc;

use anyhow::bail;
use indexmap::IndexSet;
use snowflake_api::{JsonResult, QueryResult, SnowflakeApi};

use crate::{
    connector::SnowflakeGrantConnector,
    error::SnowflakeGrantError,
    grant::{GrantObjectKind, GrantRow, GrantTarget, collect_grantees},
    util::{
        record::{JsonResultExt, grant_rows_from_arrow, grant_rows_from_json},
        sql,
    },
};

/// Roles and shares currently holding a privilege on a grant target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grantees {
    pub roles: IndexSet<String>,
    pub shares: IndexSet<String>,
}

impl Grantees {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.shares.is_empty()
    }
}

impl SnowflakeGrantConnector {
    pub async fn get_api(&self) -> Result<Arc<SnowflakeApi>, anyhow::Error> {
        if let Some(api) = &*self.api.lock().await {
            return Ok(api.clone());
        }

        let Some(config) = self.config.lock().await.clone() else {
            bail!("SnowflakeGrantConnector: Uninitialized!");
        };

        let new_api = Arc::new(SnowflakeApi::with_certificate_auth(
            &config.account,
            Some(&config.warehouse),
            None,
            None,
            &config.user,
            Some(&config.role),
            &config.private_key,
        )?);

        *self.api.lock().await = Some(new_api.clone());

        Ok(new_api)
    }

    pub async fn execute_statement(api: &SnowflakeApi, statement: &str) -> Result<(), anyhow::Error> {
        tracing::info!("executing: {}", statement);
        api.exec(statement).await?;
        Ok(())
    }

    pub async fn describe_if_exists(api: &SnowflakeApi, query: &str) -> Result<Option<QueryResult>, anyhow::Error> {
        match api.exec(query).await {
            Ok(QueryResult::Empty) => Ok(None),
            Ok(res) => Ok(Some(res)),
            Err(e) => {
                let err_str = e.to_string();
                tracing::debug!("describe_if_exists: e: {err_str}");
                if err_str.contains("does not exist") {
                    return Ok(None);
                }
                Err(e.into())
            }
        }
    }

    /// Rows of the target's show statement, or None if the object is gone.
    pub async fn show_grants(api: &SnowflakeApi, target: &GrantTarget) -> Result<Option<Vec<GrantRow>>, anyhow::Error> {
        let query = sql::build_show_grants_sql(target);
        let Some(res) = Self::describe_if_exists(api, &query).await? else {
            return Ok(None);
        };

        let rows = match res {
            QueryResult::Json(json_result) => {
                tracing::debug!("{}: {}", query, json_result.value);
                grant_rows_from_json(&json_result)?
            }
            QueryResult::Arrow(batches) => grant_rows_from_arrow(&batches)?,
            QueryResult::Empty => Vec::new(),
        };

        Ok(Some(rows))
    }

    pub async fn create_generic_grant(
        api: &SnowflakeApi,
        target: &GrantTarget,
        privilege: &str,
        with_grant_option: bool,
        grantees: &Grantees,
    ) -> Result<(), anyhow::Error> {
        if !grantees.shares.is_empty() && target.is_future() {
            bail!(SnowflakeGrantError::FutureGrantToShare);
        }

        for role in &grantees.roles {
            let statement = sql::build_grant_to_role_sql(target, privilege, role, with_grant_option);
            Self::execute_statement(api, &statement).await?;
        }

        for share in &grantees.shares {
            let statement = sql::build_grant_to_share_sql(target, privilege, share);
            Self::execute_statement(api, &statement).await?;
        }

        Ok(())
    }

    pub async fn read_generic_grant(
        api: &SnowflakeApi,
        target: &GrantTarget,
        privilege: &str,
        with_grant_option: bool,
    ) -> Result<Option<Grantees>, anyhow::Error> {
        let Some(rows) = Self::show_grants(api, target).await? else {
            return Ok(None);
        };

        let (roles, shares) = collect_grantees(target, &rows, privilege, with_grant_option);
        let grantees = Grantees { roles, shares };

        if grantees.is_empty() {
            return Ok(None);
        }

        Ok(Some(grantees))
    }

    pub async fn delete_generic_grant(
        api: &SnowflakeApi,
        target: &GrantTarget,
        privilege: &str,
        grantees: &Grantees,
    ) -> Result<(), anyhow::Error> {
        for role in &grantees.roles {
            let statement = sql::build_revoke_from_role_sql(target, privilege, role);
            Self::execute_statement(api, &statement).await?;
        }

        for share in &grantees.shares {
            let statement = sql::build_revoke_from_share_sql(target, privilege, share);
            Self::execute_statement(api, &statement).await?;
        }

        Ok(())
    }

    async fn list_names(api: &SnowflakeApi, query: &str) -> Result<Vec<String>, anyhow::Error> {
        let mut names = Vec::new();
        match Self::describe_if_exists(api, query).await? {
            Some(QueryResult::Json(json_result)) => {
                tracing::debug!("{}: {}", query, json_result.value);
                names = Self::names_from_json(&json_result)?;
            }
            Some(QueryResult::Arrow(_)) => {
                bail!(SnowflakeGrantError::UnexpectedArrowResult)
            }
            Some(QueryResult::Empty) | None => {}
        }
        Ok(names)
    }

    fn names_from_json(json_result: &JsonResult) -> Result<Vec<String>, anyhow::Error> {
        let mut names = Vec::new();
        for row in json_result.iter_records()? {
            let row = row?;
            let name: String = row.require_as("name")?;
            names.push(name);
        }
        Ok(names)
    }

    pub async fn list_databases(api: &SnowflakeApi) -> Result<Vec<String>, anyhow::Error> {
        let res = api.exec("SHOW DATABASES;").await?;
        let mut databases = Vec::new();
        if let QueryResult::Json(json_result) = res {
            tracing::debug!("SHOW DATABASES: {}", json_result.value);
            for row in json_result.iter_records()? {
                let row = row?;
                let kind: Option<String> = row.get_as("kind")?;
                let name: String = row.require_as("name")?;
                // Shared databases can't carry grants of their own.
                if kind.is_none_or(|k| k == "STANDARD") {
                    databases.push(name);
                }
            }
        }

        Ok(databases)
    }

    pub async fn list_schemas(api: &SnowflakeApi, database_name: &str) -> Result<Vec<String>, anyhow::Error> {
        Self::list_names(
            api,
            &format!("SHOW SCHEMAS IN DATABASE {};", sql::quote_ident(database_name)),
        )
        .await
    }

    pub async fn list_objects(
        api: &SnowflakeApi,
        kind: GrantObjectKind,
        database_name: &str,
        schema_name: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        Self::list_names(
            api,
            &format!(
                "SHOW {} IN SCHEMA {}.{};",
                kind.plural(),
                sql::quote_ident(database_name),
                sql::quote_ident(schema_name)
            ),
        )
        .await
    }
}
