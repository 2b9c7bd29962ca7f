//! Bulk tenant import from header-less CSV.
//!
//! One tenant per line: `name,slug[,group name[,description]]`. Lines starting
//! with `#` are ignored. Every row is checked before anything is written.

use std::collections::{HashMap, HashSet};

use csv::{ReaderBuilder, StringRecord, Trim};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use models::errors::{FieldErrors, ModelError};
use models::tenant::{self, TenantFields};
use models::tenant_group;
use crate::errors::ServiceError;

/// Form field the import errors are reported under.
pub const CSV_FIELD: &str = "csv";

/// A parsed CSV line before group names are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRecord {
    pub line: u64,
    pub name: String,
    pub slug: String,
    pub group: Option<String>,
    pub description: String,
}

fn parse_line(line: &str) -> Result<Option<StringRecord>, csv::Error> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .transpose()
}

/// Split the input into records; shape errors are reported per line.
///
/// Each physical line is one record, so line numbers count comments and
/// blank lines too.
pub fn parse_records(input: &str) -> Result<Vec<ImportRecord>, FieldErrors> {
    let mut records = Vec::new();
    let mut errors = FieldErrors::new();
    for (idx, raw) in input.lines().enumerate() {
        let line = idx as u64 + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = match parse_line(raw) {
            Ok(Some(r)) => r,
            Ok(None) => continue,
            Err(e) => {
                errors.add(CSV_FIELD, format!("Line {}: {}", line, e));
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }
        if !(2..=4).contains(&record.len()) {
            errors.add(CSV_FIELD, format!("Line {}: expected 2 to 4 fields, found {}", line, record.len()));
            continue;
        }
        let get = |i: usize| record.get(i).unwrap_or_default().to_string();
        records.push(ImportRecord {
            line,
            name: get(0),
            slug: get(1),
            group: record.get(2).filter(|g| !g.is_empty()).map(str::to_string),
            description: get(3),
        });
    }
    if records.is_empty() && errors.is_empty() {
        errors.add(CSV_FIELD, "No tenants to import.");
    }
    if errors.is_empty() { Ok(records) } else { Err(errors) }
}

/// Validate every row, then insert all of them in one transaction.
#[instrument(skip(db, input), fields(bytes = input.len()))]
pub async fn import_tenants(db: &DatabaseConnection, input: &str) -> Result<Vec<tenant::Model>, ServiceError> {
    let records = parse_records(input).map_err(ServiceError::Invalid)?;

    let mut errors = FieldErrors::new();
    let mut groups: HashMap<String, Option<Uuid>> = HashMap::new();
    let mut names = HashSet::new();
    let mut slugs = HashSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for rec in &records {
        let mut report = |msg: String| errors.add(CSV_FIELD, format!("Line {}: {}", rec.line, msg));

        let group_id = match &rec.group {
            None => None,
            Some(name) => {
                if !groups.contains_key(name) {
                    let found = tenant_group::find_by_name(db, name).await?.map(|g| g.id);
                    groups.insert(name.clone(), found);
                }
                match groups.get(name).copied().flatten() {
                    Some(id) => Some(id),
                    None => {
                        report(format!("group: Tenant group {:?} not found.", name));
                        None
                    }
                }
            }
        };

        let fields = TenantFields {
            name: rec.name.clone(),
            slug: rec.slug.clone(),
            group_id,
            description: rec.description.clone(),
            comments: String::new(),
        };
        match fields.validate() {
            Ok(()) => {}
            Err(ModelError::Invalid(field_errors)) => {
                for (field, messages) in field_errors.iter() {
                    for m in messages {
                        report(format!("{}: {}", field, m));
                    }
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if !names.insert(rec.name.trim().to_string()) {
            report(format!("name: duplicate name {:?} in import.", rec.name));
        } else if tenant::find_by_name(db, rec.name.trim()).await?.is_some() {
            report("name: Tenant with this Name already exists.".to_string());
        }
        if !slugs.insert(rec.slug.clone()) {
            report(format!("slug: duplicate slug {:?} in import.", rec.slug));
        } else if tenant::find_by_slug(db, &rec.slug).await?.is_some() {
            report("slug: Tenant with this Slug already exists.".to_string());
        }
        rows.push(fields);
    }
    errors.into_result()?;

    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(rows.len());
    for fields in &rows {
        created.push(tenant::create(&txn, fields).await?);
    }
    txn.commit().await?;
    info!(count = created.len(), "tenants_imported");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant_service::{all_tenants, TenantFilter};
    use crate::test_support::{get_db, tenant_fields};
    use models::tenant_group::GroupFields;

    #[test]
    fn parses_optional_columns() {
        let recs = parse_records("Acme,acme\n# comment\nGlobex, globex ,Customers,Big one\n").expect("parsed");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].group, None);
        assert_eq!(recs[0].description, "");
        assert_eq!(recs[1].line, 3);
        assert_eq!(recs[1].slug, "globex");
        assert_eq!(recs[1].group.as_deref(), Some("Customers"));
        assert_eq!(recs[1].description, "Big one");
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let recs = parse_records("\"Acme, Inc.\",acme-inc,,\"Widgets, gadgets\"").expect("parsed");
        assert_eq!(recs[0].name, "Acme, Inc.");
        assert_eq!(recs[0].group, None);
        assert_eq!(recs[0].description, "Widgets, gadgets");
    }

    #[test]
    fn wrong_field_count_is_reported_with_line() {
        let errors = parse_records("Acme,acme\nonly-one\n").unwrap_err();
        assert_eq!(errors.get(CSV_FIELD), ["Line 2: expected 2 to 4 fields, found 1"]);
    }

    #[test]
    fn line_numbers_count_comments_and_blank_lines() {
        let recs = parse_records("# c1\n# c2\nA,a\n\nB,b\n").expect("parsed");
        assert_eq!(recs.iter().map(|r| r.line).collect::<Vec<_>>(), vec![3, 5]);
        let errors = parse_records("# name,slug\n# second comment\nBad\n").unwrap_err();
        assert_eq!(errors.get(CSV_FIELD), ["Line 3: expected 2 to 4 fields, found 1"]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(parse_records("  \n").is_err());
    }

    #[tokio::test]
    async fn imports_all_valid_rows() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        tenant_group::create(&db, &GroupFields { name: "Customers".into(), slug: "customers".into() }).await?;
        let created = import_tenants(&db, "Acme,acme\nGlobex,globex,Customers\nInitech,initech,Customers,Software\n").await?;
        assert_eq!(created.len(), 3);
        assert_eq!(all_tenants(&db, &TenantFilter::default()).await?.len(), 3);
        let grouped = TenantFilter { group: vec!["customers".into()], ..Default::default() };
        assert_eq!(all_tenants(&db, &grouped).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn errors_after_comments_name_the_physical_line() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        match import_tenants(&db, "# name,slug\n# second comment\nBad,not a slug\n").await {
            Err(ServiceError::Invalid(errors)) => {
                let msgs = errors.get(CSV_FIELD);
                assert!(!msgs.is_empty());
                assert!(msgs.iter().all(|m| m.starts_with("Line 3: slug:")));
            }
            other => panic!("expected errors, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn any_bad_row_writes_nothing() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        tenant::create(&db, &tenant_fields("Existing", "existing")).await?;
        let input = "Acme,acme\nBad,not a slug\nGhost,ghost,Nowhere\nExisting,existing-2\nAcme Two,acme\n";
        match import_tenants(&db, input).await {
            Err(ServiceError::Invalid(errors)) => {
                let msgs = errors.get(CSV_FIELD);
                assert!(msgs.iter().any(|m| m.starts_with("Line 2: slug:")));
                assert!(msgs.iter().any(|m| m.starts_with("Line 3: group:")));
                assert!(msgs.iter().any(|m| m.starts_with("Line 4: name:")));
                assert!(msgs.iter().any(|m| m.starts_with("Line 5: slug:")));
                assert!(!msgs.iter().any(|m| m.starts_with("Line 1:")));
            }
            other => panic!("expected errors, got {:?}", other),
        }
        assert_eq!(all_tenants(&db, &TenantFilter::default()).await?.len(), 1);
        Ok(())
    }
}
