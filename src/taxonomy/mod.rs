use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, ServiceError};
use crate::models::{ExpensePatch, ExpenseType, DEFAULT_TYPES};
use crate::service::{Column, DataService, Order, Query, ServiceResult};

/// The owner's type names, alphabetical.
pub(crate) fn list_types<D: DataService + ?Sized>(data: &D, owner: &str) -> ServiceResult<Vec<String>> {
    Ok(data
        .select_types(&Query::owned_by(owner).order(Column::Name, Order::Asc))?
        .into_iter()
        .map(|t| t.name)
        .collect())
}

/// Names matching `name` case-insensitively, optionally excluding one exact name.
fn clashes<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    name: &str,
    except: Option<&str>,
) -> ServiceResult<bool> {
    let mut query = Query::owned_by(owner).ilike(Column::Name, name);
    if let Some(except) = except {
        query = query.neq(Column::Name, except);
    }
    // LIKE wildcards in `name` can widen the match; keep exact hits only.
    Ok(data
        .select_types(&query)?
        .iter()
        .any(|t| t.name.to_lowercase() == name.to_lowercase()))
}

pub(crate) fn add_type<D: DataService + ?Sized>(data: &D, owner: &str, name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Please enter a type name."));
    }
    if clashes(data, owner, name, None)? {
        return Err(AppError::validation("This type already exists."));
    }
    data.insert_type(&ExpenseType::new(owner, name))?;
    info!(%name, "type added");
    Ok(name.to_string())
}

/// Rename a type and every expense that uses it.
///
/// The two writes are not atomic. When the expense cascade fails the type row
/// is renamed back; if that also fails, both errors are returned.
pub(crate) fn rename_type<D: DataService + ?Sized>(
    data: &D,
    owner: &str,
    old: &str,
    new: &str,
) -> AppResult<String> {
    let new = new.trim();
    if old.is_empty() {
        return Err(AppError::validation("Please select a type to edit."));
    }
    if new.is_empty() {
        return Err(AppError::validation("Please enter a new type name."));
    }
    if new == old {
        return Err(AppError::validation(
            "No changes found. Please modify the type name.",
        ));
    }
    if clashes(data, owner, new, Some(old))? {
        return Err(AppError::validation(
            "A type with this name already exists.",
        ));
    }

    let row = Query::owned_by(owner).eq(Column::Name, old);
    let renamed = data.rename_types(&row, new)?;
    if renamed == 0 {
        return Err(AppError::State(format!("Type '{old}' no longer exists")));
    }

    let uses = Query::owned_by(owner).eq(Column::Type, old);
    if let Err(cascade) = data.update_expenses(&uses, &ExpensePatch::rename_type(new)) {
        warn!(%old, %new, error = %cascade, "rename cascade failed, reverting type");
        let back = Query::owned_by(owner).eq(Column::Name, new);
        return match data.rename_types(&back, old) {
            Ok(_) => Err(AppError::Service(cascade)),
            Err(rollback) => {
                error!(%old, %new, error = %rollback, "type rename rollback failed");
                Err(AppError::RenameInconsistent {
                    old: old.to_string(),
                    cascade,
                    rollback,
                })
            }
        };
    }
    info!(%old, %new, "type renamed");
    Ok(new.to_string())
}

pub(crate) fn delete_type<D: DataService + ?Sized>(data: &D, owner: &str, name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("Please select a type to delete."));
    }
    let in_use = data.select_expenses(
        &Query::owned_by(owner)
            .eq(Column::Type, name)
            .limit(1),
    )?;
    if !in_use.is_empty() {
        return Err(AppError::validation(
            "Cannot delete type that is being used in expenses.",
        ));
    }
    let removed = data.delete_types(&Query::owned_by(owner).eq(Column::Name, name))?;
    if removed == 0 {
        return Err(AppError::State(format!("Type '{name}' no longer exists")));
    }
    info!(%name, "type deleted");
    Ok(())
}

/// Result of inserting the default types for a new account.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedReport {
    pub(crate) seeded: Vec<String>,
    pub(crate) failed: Vec<(String, ServiceError)>,
}

impl SeedReport {
    pub(crate) fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Insert the defaults one by one. Failures are collected, not rolled back.
pub(crate) fn seed_defaults<D: DataService + ?Sized>(data: &D, owner: &str) -> SeedReport {
    let mut report = SeedReport::default();
    for name in DEFAULT_TYPES {
        match data.insert_type(&ExpenseType::new(owner, name)) {
            Ok(()) => report.seeded.push(name.to_string()),
            Err(e) => {
                warn!(%name, error = %e, "default type not seeded");
                report.failed.push((name.to_string(), e));
            }
        }
    }
    info!(
        seeded = report.seeded.len(),
        failed = report.failed.len(),
        "default types seeded"
    );
    report
}
