//! Menu catalog: the source of truth for item names and prices.

use chrono::Utc;
use diesel::{delete, insert_into, prelude::*, update};

use crate::errors::OrderError;
use crate::models::{MenuItem, MenuItemChanges, NewMenuItem};
use crate::money::euros_to_cents;
use crate::schema::menu_items;

pub const MAX_SPICY_LEVEL: i32 = 5;

/// Admin input for a new menu item. Prices are given in euros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemDraft {
    pub name_en: String,
    pub name_de: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Vec<String>,
    pub ingredients_de: Vec<String>,
    pub spicy_level: Option<i32>,
    pub price_euros: f64,
    pub images: Vec<String>,
    pub active: Option<bool>,
}

impl MenuItemDraft {
    pub fn into_new_item(self) -> Result<NewMenuItem, OrderError> {
        if self.name_en.trim().is_empty() {
            return Err(OrderError::validation("name_en must not be empty"));
        }
        if self.name_de.trim().is_empty() {
            return Err(OrderError::validation("name_de must not be empty"));
        }
        let spicy_level = self.spicy_level.unwrap_or(0);
        check_spicy_level(spicy_level)?;

        Ok(NewMenuItem {
            name_en: self.name_en,
            name_de: self.name_de,
            description_en: self.description_en,
            description_de: self.description_de,
            ingredients_en: self.ingredients_en,
            ingredients_de: self.ingredients_de,
            spicy_level,
            price_cents: euros_to_cents(self.price_euros)?,
            images: self.images,
            active: self.active.unwrap_or(true),
        })
    }
}

/// Partial admin update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name_en: Option<String>,
    pub name_de: Option<String>,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Option<Vec<String>>,
    pub ingredients_de: Option<Vec<String>>,
    pub spicy_level: Option<i32>,
    pub price_euros: Option<f64>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl MenuItemPatch {
    pub fn into_changes(self) -> Result<MenuItemChanges, OrderError> {
        if let Some(level) = self.spicy_level {
            check_spicy_level(level)?;
        }
        if matches!(&self.name_en, Some(name) if name.trim().is_empty()) {
            return Err(OrderError::validation("name_en must not be empty"));
        }
        if matches!(&self.name_de, Some(name) if name.trim().is_empty()) {
            return Err(OrderError::validation("name_de must not be empty"));
        }

        Ok(MenuItemChanges {
            name_en: self.name_en,
            name_de: self.name_de,
            description_en: self.description_en,
            description_de: self.description_de,
            ingredients_en: self.ingredients_en,
            ingredients_de: self.ingredients_de,
            spicy_level: self.spicy_level,
            price_cents: self.price_euros.map(euros_to_cents).transpose()?,
            images: self.images,
            active: self.active,
        })
    }
}

fn check_spicy_level(level: i32) -> Result<(), OrderError> {
    if (0..=MAX_SPICY_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(OrderError::validation(format!(
            "spicy_level must be between 0 and {MAX_SPICY_LEVEL}"
        )))
    }
}

pub fn list_active(conn: &mut PgConnection) -> QueryResult<Vec<MenuItem>> {
    menu_items::table
        .select(MenuItem::as_select())
        .filter(menu_items::active.eq(true))
        .order(menu_items::id.asc())
        .load(conn)
}

pub fn list_all(conn: &mut PgConnection) -> QueryResult<Vec<MenuItem>> {
    menu_items::table
        .select(MenuItem::as_select())
        .order(menu_items::id.asc())
        .load(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> Result<MenuItem, OrderError> {
    menu_items::table
        .select(MenuItem::as_select())
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| OrderError::NotFound(format!("menu item {id}")))
}

pub fn get_active(conn: &mut PgConnection, id: i32) -> Result<MenuItem, OrderError> {
    menu_items::table
        .select(MenuItem::as_select())
        .filter(menu_items::id.eq(id))
        .filter(menu_items::active.eq(true))
        .first(conn)
        .optional()?
        .ok_or_else(|| OrderError::NotFound(format!("menu item {id}")))
}

/// Active items among `ids`. Unknown and deactivated ids are dropped, which
/// is what keeps deactivated items out of new orders.
pub fn get_by_ids(conn: &mut PgConnection, ids: &[i32]) -> QueryResult<Vec<MenuItem>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    menu_items::table
        .select(MenuItem::as_select())
        .filter(menu_items::id.eq_any(ids))
        .filter(menu_items::active.eq(true))
        .order(menu_items::id.asc())
        .load(conn)
}

pub fn create(conn: &mut PgConnection, draft: MenuItemDraft) -> Result<MenuItem, OrderError> {
    let new_item = draft.into_new_item()?;
    let item = insert_into(menu_items::table)
        .values(&new_item)
        .returning(MenuItem::as_returning())
        .get_result(conn)?;
    Ok(item)
}

pub fn update_item(
    conn: &mut PgConnection,
    id: i32,
    patch: MenuItemPatch,
) -> Result<MenuItem, OrderError> {
    let changes = patch.into_changes()?;
    update(menu_items::table.find(id))
        .set((&changes, menu_items::updated_at.eq(Utc::now())))
        .returning(MenuItem::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| OrderError::NotFound(format!("menu item {id}")))
}

/// Hard delete. Historical orders keep their own snapshot of the item.
pub fn delete_item(conn: &mut PgConnection, id: i32) -> QueryResult<bool> {
    let deleted = delete(menu_items::table.find(id)).execute(conn)?;
    Ok(deleted > 0)
}
