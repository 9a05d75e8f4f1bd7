//! Dashboard navigation filtered by role.

use serde::Serialize;

use crate::route::RouteId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubMenu {
    pub label: &'static str,
    pub destructive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub route: RouteId,
    pub icon: Option<&'static str>,
    pub disabled: bool,
    pub sub_menu: Vec<SubMenu>,
}

impl MenuItem {
    fn new(route: RouteId, icon: &'static str) -> Self { Self { route, icon: Some(icon), disabled: false, sub_menu: Vec::new() } }

    pub fn label(&self) -> &'static str { self.route.meta().display_name }
    pub fn path(&self) -> &'static str { self.route.meta().path }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSection {
    pub section: &'static str,
    pub items: Vec<MenuItem>,
}

pub fn dashboard_menu() -> Vec<MenuSection> {
    let sub = |label| SubMenu { label, destructive: false };
    let mut profile = MenuItem::new(RouteId::Profile, "user-round");
    profile.sub_menu = vec![
        sub("Personal Information"),
        sub("Change Password"),
        sub("Active Session"),
        SubMenu { label: "Delete Account", destructive: true },
    ];
    vec![
        MenuSection {
            section: "General",
            items: vec![MenuItem::new(RouteId::Dashboard, "layout-dashboard"), MenuItem::new(RouteId::Account, "users-round")],
        },
        MenuSection { section: "Settings", items: vec![profile] },
    ]
}

/// Keep items whose route admits `role`; sections left empty are dropped.
pub fn menu_for_role(role: &str, menu: &[MenuSection]) -> Vec<MenuSection> {
    menu.iter()
        .filter_map(|s| {
            let items: Vec<MenuItem> = s
                .items
                .iter()
                .filter(|i| i.route.meta().access.is_some_and(|a| a.allows(role)))
                .cloned()
                .collect();
            (!items.is_empty()).then(|| MenuSection { section: s.section, items })
        })
        .collect()
}
