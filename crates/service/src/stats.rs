//! Related-object counts shown on the tenant page.

use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use models::{circuit, device, ip_address, prefix, rack, site, vlan, vrf};
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TenantStats {
    pub site_count: u64,
    pub rack_count: u64,
    pub device_count: u64,
    pub vrf_count: u64,
    pub prefix_count: u64,
    pub ipaddress_count: u64,
    pub vlan_count: u64,
    pub circuit_count: u64,
}

impl TenantStats {
    /// Non-zero counts labelled by object type.
    pub fn non_zero(&self) -> Vec<(&'static str, u64)> {
        [
            ("sites", self.site_count),
            ("racks", self.rack_count),
            ("devices", self.device_count),
            ("VRFs", self.vrf_count),
            ("prefixes", self.prefix_count),
            ("IP addresses", self.ipaddress_count),
            ("VLANs", self.vlan_count),
            ("circuits", self.circuit_count),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    pub fn is_empty(&self) -> bool { self.non_zero().is_empty() }
}

macro_rules! direct {
    ($db:expr, $module:ident, $tenant_id:expr) => {
        $module::Entity::find()
            .filter($module::Column::TenantId.eq($tenant_id))
            .count($db)
            .await?
    };
}

/// Rows owned by the tenant directly, or with no tenant of their own inside
/// one of the tenant's VRFs.
fn owned_or_inherited<E>(tenant_col: E, tenant_id: Uuid) -> Condition
where
    E: ColumnTrait,
{
    Condition::any()
        .add(tenant_col.eq(tenant_id))
        .add(
            Condition::all()
                .add(tenant_col.is_null())
                .add(vrf::Column::TenantId.eq(tenant_id)),
        )
}

/// Counts for the tenant detail page.
pub async fn tenant_stats<C: ConnectionTrait>(db: &C, tenant_id: Uuid) -> Result<TenantStats, ServiceError> {
    let prefix_count = prefix::Entity::find()
        .left_join(vrf::Entity)
        .filter(owned_or_inherited(prefix::Column::TenantId, tenant_id))
        .count(db)
        .await?;
    let ipaddress_count = ip_address::Entity::find()
        .left_join(vrf::Entity)
        .filter(owned_or_inherited(ip_address::Column::TenantId, tenant_id))
        .count(db)
        .await?;
    Ok(TenantStats {
        site_count: direct!(db, site, tenant_id),
        rack_count: direct!(db, rack, tenant_id),
        device_count: direct!(db, device, tenant_id),
        vrf_count: direct!(db, vrf, tenant_id),
        prefix_count,
        ipaddress_count,
        vlan_count: direct!(db, vlan, tenant_id),
        circuit_count: direct!(db, circuit, tenant_id),
    })
}

/// Rows that reference the tenant through their own `tenant_id`; these block deletion.
pub async fn owned_objects<C: ConnectionTrait>(db: &C, tenant_id: Uuid) -> Result<TenantStats, ServiceError> {
    Ok(TenantStats {
        site_count: direct!(db, site, tenant_id),
        rack_count: direct!(db, rack, tenant_id),
        device_count: direct!(db, device, tenant_id),
        vrf_count: direct!(db, vrf, tenant_id),
        prefix_count: direct!(db, prefix, tenant_id),
        ipaddress_count: direct!(db, ip_address, tenant_id),
        vlan_count: direct!(db, vlan, tenant_id),
        circuit_count: direct!(db, circuit, tenant_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, tenant_fields};
    use models::tenant;

    #[tokio::test]
    async fn empty_tenant_has_zero_counts() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let t = tenant::create(&db, &tenant_fields("Acme", "acme")).await?;
        let stats = tenant_stats(&db, t.id).await?;
        assert_eq!(stats, TenantStats::default());
        assert!(stats.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn prefixes_and_addresses_inherit_through_vrf() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let acme = tenant::create(&db, &tenant_fields("Acme", "acme")).await?;
        let other = tenant::create(&db, &tenant_fields("Other", "other")).await?;
        let blue = vrf::create(&db, "Blue", "65000:1", Some(acme.id)).await?;
        let red = vrf::create(&db, "Red", "65000:2", Some(other.id)).await?;

        // direct, no VRF
        prefix::create(&db, "10.1.0.0/16", None, Some(acme.id)).await?;
        // direct and inside own VRF: counted once
        prefix::create(&db, "10.2.0.0/16", Some(blue.id), Some(acme.id)).await?;
        // inherited from VRF
        prefix::create(&db, "10.3.0.0/16", Some(blue.id), None).await?;
        // other tenant's own prefix inside acme's VRF: not acme's
        prefix::create(&db, "10.4.0.0/16", Some(blue.id), Some(other.id)).await?;
        // acme's prefix inside another tenant's VRF: acme's
        prefix::create(&db, "10.5.0.0/16", Some(red.id), Some(acme.id)).await?;
        // unowned, no VRF
        prefix::create(&db, "10.6.0.0/16", None, None).await?;

        ip_address::create(&db, "10.3.0.1/16", Some(blue.id), None).await?;
        ip_address::create(&db, "10.3.0.2/16", Some(red.id), None).await?;

        let stats = tenant_stats(&db, acme.id).await?;
        assert_eq!(stats.prefix_count, 4);
        assert_eq!(stats.ipaddress_count, 1);
        assert_eq!(stats.vrf_count, 1);

        let owned = owned_objects(&db, acme.id).await?;
        assert_eq!(owned.prefix_count, 3);
        assert_eq!(owned.ipaddress_count, 0);
        assert_eq!(owned.non_zero(), vec![("VRFs", 1), ("prefixes", 3)]);
        Ok(())
    }

    #[tokio::test]
    async fn direct_counts_cover_every_domain() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let t = tenant::create(&db, &tenant_fields("Acme", "acme")).await?;
        let s = site::create(&db, "DC1", "dc1", Some(t.id)).await?;
        site::create(&db, "DC2", "dc2", None).await?;
        rack::create(&db, "R1", s.id, Some(t.id)).await?;
        device::create(&db, Some("sw1"), s.id, Some(t.id)).await?;
        device::create(&db, None, s.id, Some(t.id)).await?;
        vlan::create(&db, 100, "users", Some(t.id)).await?;
        circuit::create(&db, "CID-1", Some(t.id)).await?;

        let stats = tenant_stats(&db, t.id).await?;
        assert_eq!(
            (stats.site_count, stats.rack_count, stats.device_count, stats.vlan_count, stats.circuit_count),
            (1, 1, 2, 1, 1)
        );
        Ok(())
    }
}
