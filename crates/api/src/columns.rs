//! Built-in column registry for the user table.

use tabula_access::Role;
use tabula_core::{ColumnRegistry, ColumnSpec, CoreError, FacetOption, Value};

use crate::User;

/// Facet annotation for role values: metadata display name and icon, else the
/// capitalized value.
fn role_option(value: &Value) -> FacetOption {
    match value.as_str().and_then(Role::from_code) {
        Some(role) => FacetOption {
            value: role.code().to_string(),
            label: role.display_name(),
            icon: Some(role.meta().icon.to_string()),
        },
        None => FacetOption::plain(value),
    }
}

pub fn user_columns() -> Result<ColumnRegistry<User>, CoreError> {
    let columns = vec![
        ColumnSpec::display("number", "No").hideable(false),
        ColumnSpec::accessor("Profile Picture", "Profile Picture", |u: &User| Value::from(u.image.clone())).sortable(false),
        ColumnSpec::accessor("email", "Email", |u: &User| Value::from(u.email.as_str())).text_filter().icon("mail"),
        ColumnSpec::accessor("name", "Name", |u: &User| Value::from(u.name.as_str())).text_filter().icon("user-round"),
        ColumnSpec::accessor("role", "Role", |u: &User| Value::from(u.role.clone()))
            .option_filter(role_option)
            .icon("circle-dot"),
        ColumnSpec::accessor("Updated At", "Updated At", |u: &User| Value::from(u.updated_at))
            .date_filter()
            .icon("calendar-clock"),
        ColumnSpec::accessor("Created At", "Created At", |u: &User| Value::from(u.created_at))
            .date_filter()
            .icon("calendar-check-2"),
    ];
    ColumnRegistry::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::FilterKind;

    #[test]
    fn layout() {
        let cols = user_columns().unwrap();
        let ids: Vec<&str> = cols.ids().collect();
        assert_eq!(ids, vec!["number", "Profile Picture", "email", "name", "role", "Updated At", "Created At"]);
        let number = cols.get("number").unwrap();
        assert!(!number.hideable && !number.sortable);
        assert_eq!(cols.get("role").unwrap().filter_kind(), Some(FilterKind::Option));
        assert_eq!(cols.get("Created At").unwrap().filter_kind(), Some(FilterKind::Date));
        assert!(!cols.get("Profile Picture").unwrap().sortable);
    }

    #[test]
    fn role_options_use_metadata() {
        let o = role_option(&Value::text("customRoleExample"));
        assert_eq!(o.label, "Custom Role Example");
        assert_eq!(o.icon.as_deref(), Some("flask-conical"));
        assert_eq!(role_option(&Value::text("admin")).label, "Admin");
        assert_eq!(role_option(&Value::text("guest user")).label, "Guest User");
    }
}
