//! Table difference calculator
//!
//! This module compares a live table definition with a desired one and
//! classifies columns into add, drop and modify sets.

use std::collections::HashSet;

use crate::schema::ddl::AlterClause;
use crate::schema::types::{ColumnDefinition, TableDefinition};

/// Whether two columns are identical.
///
/// Every attribute present on either side must be present on the other with
/// the same value. This is strict on purpose: any extra metadata reported by
/// introspection (see [`ColumnDefinition::extra`]) marks the column as
/// modified even when the database would treat both shapes the same.
pub fn columns_equal(a: &ColumnDefinition, b: &ColumnDefinition) -> bool {
    a.attributes() == b.attributes()
}

/// Column changes needed to bring a live table to its desired shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// In desired, not in current; desired declaration order
    pub to_add: Vec<String>,
    /// In current, not in desired; current declaration order
    pub to_drop: Vec<String>,
    /// In both but unequal; desired declaration order
    pub to_modify: Vec<String>,
}

impl SchemaDiff {
    /// Compare `current` with `desired`
    pub fn between(current: &TableDefinition, desired: &TableDefinition) -> Self {
        let desired_names: HashSet<&str> =
            desired.columns.iter().map(|c| c.name.as_str()).collect();

        let mut to_add = Vec::new();
        let mut to_modify = Vec::new();
        for column in &desired.columns {
            match current.column(&column.name) {
                None => to_add.push(column.name.clone()),
                Some(existing) if !columns_equal(existing, column) => {
                    to_modify.push(column.name.clone())
                }
                Some(_) => {}
            }
        }

        let to_drop = current
            .columns
            .iter()
            .filter(|c| !desired_names.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        Self {
            to_add,
            to_drop,
            to_modify,
        }
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_drop.is_empty() && self.to_modify.is_empty()
    }

    /// ALTER clauses in application order: every ADD, then every MODIFY,
    /// then every DROP. ADD and MODIFY render the desired column.
    pub fn clauses<'a>(&'a self, desired: &'a TableDefinition) -> Vec<AlterClause<'a>> {
        let adds = self
            .to_add
            .iter()
            .filter_map(|name| desired.column(name))
            .map(AlterClause::Add);
        let modifies = self
            .to_modify
            .iter()
            .filter_map(|name| desired.column(name))
            .map(AlterClause::Modify);
        let drops = self.to_drop.iter().map(|name| AlterClause::Drop(name.as_str()));

        adds.chain(modifies).chain(drops).collect()
    }
}
