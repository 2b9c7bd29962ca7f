//! HTML templates compiled into the binary.

use minijinja::{Environment, Value};
use once_cell::sync::Lazy;

fn embedded(name: &str) -> Option<&'static str> {
    let source = match name {
        "base.html" => include_str!("../templates/base.html"),
        "macros.html" => include_str!("../templates/macros.html"),
        "error.html" => include_str!("../templates/error.html"),
        "login.html" => include_str!("../templates/login.html"),
        "tenantgroup_list.html" => include_str!("../templates/tenantgroup_list.html"),
        "tenantgroup_edit.html" => include_str!("../templates/tenantgroup_edit.html"),
        "tenant_list.html" => include_str!("../templates/tenant_list.html"),
        "tenant.html" => include_str!("../templates/tenant.html"),
        "tenant_edit.html" => include_str!("../templates/tenant_edit.html"),
        "tenant_import.html" => include_str!("../templates/tenant_import.html"),
        "tenant_bulk_edit.html" => include_str!("../templates/tenant_bulk_edit.html"),
        "bulk_delete.html" => include_str!("../templates/bulk_delete.html"),
        "object_delete.html" => include_str!("../templates/object_delete.html"),
        _ => return None,
    };
    Some(source)
}

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_loader(|name| Ok(embedded(name).map(str::to_string)));
    env
});

/// Render a template; `.html` names are auto-escaped.
pub fn render(name: &str, ctx: Value) -> Result<String, minijinja::Error> {
    ENV.get_template(name)?.render(ctx)
}
