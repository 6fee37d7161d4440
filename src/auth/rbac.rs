/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Admin roles form a closed set. Each gated route names the roles it admits;
 * there is no permission inheritance between roles.
 */

use tracing::warn;

use super::AuthError;
use crate::entities::admin::AdminRole;

/// Every admin role; used by back-office routes open to any signed-in admin.
pub const ALL_ROLES: &[AdminRole] = &[AdminRole::SuperAdmin, AdminRole::Admin, AdminRole::Manager];

/// Account management is reserved to super-admins.
pub const SUPER_ADMIN_ONLY: &[AdminRole] = &[AdminRole::SuperAdmin];

/// `super-admin`, `super-admin or admin`, ...
fn describe_roles(roles: &[AdminRole]) -> String {
    roles
        .iter()
        .map(AdminRole::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Fails with `Forbidden` unless `role` is one of `allowed`.
pub fn authorize(role: AdminRole, allowed: &[AdminRole]) -> Result<(), AuthError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        let required = describe_roles(allowed);
        warn!(role = %role, required = %required, "admin role denied access");
        Err(AuthError::Forbidden { role, required })
    }
}
