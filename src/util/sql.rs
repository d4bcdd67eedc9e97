use crate::grant::GrantTarget;

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified_name(parts: &[&str]) -> String {
    parts.iter().map(|p| quote_ident(p)).collect::<Vec<_>>().join(".")
}

/// The `ON ...` clause shared by every statement against a target.
fn on_clause(target: &GrantTarget) -> String {
    match target {
        GrantTarget::Object {
            kind,
            database,
            schema,
            name,
        } => format!("ON {} {}", kind.object_type(), qualified_name(&[database.as_str(), schema.as_str(), name.as_str()])),
        GrantTarget::Future { kind, database, schema } => match schema {
            Some(schema) => format!("ON FUTURE {} IN SCHEMA {}", kind.plural(), qualified_name(&[database.as_str(), schema.as_str()])),
            None => format!("ON FUTURE {} IN DATABASE {}", kind.plural(), quote_ident(database)),
        },
    }
}

pub fn build_grant_to_role_sql(target: &GrantTarget, privilege: &str, role: &str, with_grant_option: bool) -> String {
    let mut sql = format!("GRANT {} {} TO ROLE {}", privilege, on_clause(target), quote_ident(role));
    if with_grant_option {
        sql.push_str(" WITH GRANT OPTION");
    }
    sql.push(';');
    sql
}

pub fn build_revoke_from_role_sql(target: &GrantTarget, privilege: &str, role: &str) -> String {
    format!("REVOKE {} {} FROM ROLE {};", privilege, on_clause(target), quote_ident(role))
}

pub fn build_grant_to_share_sql(target: &GrantTarget, privilege: &str, share: &str) -> String {
    format!("GRANT {} {} TO SHARE {};", privilege, on_clause(target), quote_ident(share))
}

pub fn build_revoke_from_share_sql(target: &GrantTarget, privilege: &str, share: &str) -> String {
    format!("REVOKE {} {} FROM SHARE {};", privilege, on_clause(target), quote_ident(share))
}

pub fn build_show_grants_sql(target: &GrantTarget) -> String {
    match target {
        GrantTarget::Object {
            kind,
            database,
            schema,
            name,
        } => format!(
            "SHOW GRANTS ON {} {};",
            kind.object_type(),
            qualified_name(&[database.as_str(), schema.as_str(), name.as_str()])
        ),
        GrantTarget::Future { database, schema, .. } => match schema {
            Some(schema) => format!("SHOW FUTURE GRANTS IN SCHEMA {};", qualified_name(&[database.as_str(), schema.as_str()])),
            None => format!("SHOW FUTURE GRANTS IN DATABASE {};", quote_ident(database)),
        },
    }
}
