use std::{fmt, str::FromStr};

use crate::error::SnowflakeGrantError;

const GRANT_ID_DELIMITER: u8 = b'|';

/// The identity of a single grant, serialized as one `|`-delimited record:
/// `database|schema|object|privilege|with_grant_option`.
///
/// An empty object name means the grant applies to future objects, and an
/// empty schema on a future grant widens it to the whole database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantId {
    pub database_name: String,
    pub schema_name: String,
    pub object_name: String,
    pub privilege: String,
    pub with_grant_option: bool,
}

impl GrantId {
    pub fn is_future(&self) -> bool {
        self.object_name.is_empty()
    }

    pub fn schema(&self) -> Option<&str> {
        if self.schema_name.is_empty() {
            None
        } else {
            Some(&self.schema_name)
        }
    }

    /// Whether the id can be used as a file name. Names containing `/` would
    /// split the address into extra path components.
    pub fn fits_in_path(&self) -> bool {
        [&self.database_name, &self.schema_name, &self.object_name]
            .iter()
            .all(|name| !name.contains('/'))
    }

    fn to_record(&self) -> Result<String, anyhow::Error> {
        let grant_option = self.with_grant_option.to_string();
        write_record([
            self.database_name.as_str(),
            self.schema_name.as_str(),
            self.object_name.as_str(),
            self.privilege.as_str(),
            grant_option.as_str(),
        ])
    }
}

/// One `|`-delimited record without its line terminator. Surrounding
/// whitespace is part of the fields and is kept.
fn write_record<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<String, anyhow::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(GRANT_ID_DELIMITER)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(fields)?;

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(strip_line_ending(&String::from_utf8(bytes)?).to_string())
}

fn strip_line_ending(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n'])
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.to_record().map_err(|_| fmt::Error)?;
        f.write_str(&record)
    }
}

impl FromStr for GrantId {
    type Err = SnowflakeGrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(GRANT_ID_DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(s.as_bytes());

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SnowflakeGrantError::MalformedGrantId {
                id: s.to_string(),
                reason: e.to_string(),
            })?;

        let [record] = records.as_slice() else {
            return Err(SnowflakeGrantError::GrantIdLineCount);
        };

        if record.len() != 4 && record.len() != 5 {
            return Err(SnowflakeGrantError::GrantIdFieldCount);
        }

        // The reader tolerates stray quotes, so only accept ids that are
        // already written the way `to_string` would write their fields.
        let canonical = write_record(record.iter()).map_err(|e| SnowflakeGrantError::MalformedGrantId {
            id: s.to_string(),
            reason: e.to_string(),
        })?;
        if canonical != strip_line_ending(s) {
            return Err(SnowflakeGrantError::MalformedGrantId {
                id: s.to_string(),
                reason: format!("expected `{}`", canonical),
            });
        }

        let field = |i: usize| record.get(i).unwrap_or_default().to_string();

        Ok(GrantId {
            database_name: field(0),
            schema_name: field(1),
            object_name: field(2),
            privilege: field(3),
            with_grant_option: record.len() == 5 && record.get(4) == Some("true"),
        })
    }
}
