//! CSV export of the list views.

use csv::Writer;

use crate::errors::ServiceError;
use crate::tenant_group_service::TenantGroupRow;
use crate::tenant_service::TenantRow;

fn export_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Export(e.to_string())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, ServiceError> {
    let bytes = writer.into_inner().map_err(export_err)?;
    String::from_utf8(bytes).map_err(export_err)
}

pub fn groups_csv(rows: &[TenantGroupRow]) -> Result<String, ServiceError> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(["name", "slug"]).map_err(export_err)?;
    for row in rows {
        w.write_record([row.name.as_str(), row.slug.as_str()]).map_err(export_err)?;
    }
    finish(w)
}

pub fn tenants_csv(rows: &[TenantRow]) -> Result<String, ServiceError> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(["name", "slug", "group", "description"]).map_err(export_err)?;
    for row in rows {
        let group = row.group.as_ref().map(|g| g.name.as_str()).unwrap_or_default();
        w.write_record([
            row.tenant.name.as_str(),
            row.tenant.slug.as_str(),
            group,
            row.tenant.description.as_str(),
        ])
        .map_err(export_err)?;
    }
    finish(w)
}
