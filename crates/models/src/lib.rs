pub mod errors;
pub mod validation;
pub mod db;
pub mod tenant_group;
pub mod tenant;
pub mod user;
pub mod user_credentials;
pub mod user_permission;
pub mod site;
pub mod rack;
pub mod device;
pub mod vrf;
pub mod prefix;
pub mod ip_address;
pub mod vlan;
pub mod circuit;

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{EntityTrait, ModelTrait, PaginatorTrait, TransactionTrait};

    use crate::{db, device, ip_address, prefix, rack, site, tenant, tenant_group, user, user_permission, vrf};

    async fn setup() -> sea_orm::DatabaseConnection {
        let db = db::connect_with_config(&db::in_memory_config()).await.expect("connect sqlite");
        migration::Migrator::up(&db, None).await.expect("migrate");
        db
    }

    #[tokio::test]
    async fn tenant_group_and_tenant_crud() {
        let db = setup().await;
        let group = tenant_group::create(&db, &tenant_group::GroupFields { name: "Customers".into(), slug: "customers".into() })
            .await
            .expect("create group");
        let t = tenant::create(&db, &tenant::TenantFields {
            name: "Acme".into(),
            slug: "acme".into(),
            group_id: Some(group.id),
            ..Default::default()
        })
        .await
        .expect("create tenant");

        let found = tenant::find_by_slug(&db, "acme").await.expect("lookup").expect("present");
        assert_eq!(found.id, t.id);
        let tenants = group.find_related(tenant::Entity).all(&db).await.expect("related");
        assert_eq!(tenants.len(), 1);

        let dup = tenant::create(&db, &tenant::TenantFields { name: "Acme".into(), slug: "acme-2".into(), ..Default::default() }).await;
        assert!(dup.is_err(), "tenant names are unique");

        // Deleting the group leaves the tenant ungrouped.
        tenant_group::Entity::delete_by_id(group.id).exec(&db).await.expect("delete group");
        let t = tenant::Entity::find_by_id(t.id).one(&db).await.expect("reload").expect("still there");
        assert_eq!(t.group_id, None);
    }

    #[tokio::test]
    async fn inventory_rows_reference_tenants() {
        let db = setup().await;
        let t = tenant::create(&db, &tenant::TenantFields { name: "Acme".into(), slug: "acme".into(), ..Default::default() })
            .await
            .expect("tenant");
        let txn = db.begin().await.expect("begin");
        let s = site::create(&txn, "DC1", "dc1", Some(t.id)).await.expect("site");
        rack::create(&txn, "R1", s.id, Some(t.id)).await.expect("rack");
        device::create(&txn, None, s.id, Some(t.id)).await.expect("device");
        let v = vrf::create(&txn, "Blue", "65000:1", Some(t.id)).await.expect("vrf");
        prefix::create(&txn, "10.0.0.0/16", Some(v.id), None).await.expect("prefix");
        ip_address::create(&txn, "10.0.0.1/16", Some(v.id), None).await.expect("ip");
        txn.commit().await.expect("commit");

        assert_eq!(site::Entity::find().count(&db).await.expect("count"), 1);
        assert!(prefix::create(&db, "10.0.0.0/99", None, None).await.is_err());

        // Restricted while the tenant still owns objects.
        let res = tenant::Entity::delete_by_id(t.id).exec(&db).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn permissions_are_granted_once() {
        let db = setup().await;
        let u = user::create(&db, "alice", false).await.expect("user");
        user_permission::grant(&db, u.id, "tenancy.change_tenant").await.expect("grant");
        user_permission::grant(&db, u.id, "tenancy.change_tenant").await.expect("grant again");
        let codes = user_permission::codenames_for(&db, u.id).await.expect("codenames");
        assert_eq!(codes, vec!["tenancy.change_tenant".to_string()]);
    }
}
