//! Authorization policy.
//!
//! A single pure decision function. Handlers resolve the actor from the
//! bearer token, describe what they are about to do and ask [`allow`].
//! The global admin role passes every check.

use jwt_pizza_core::UserId;

use crate::models::{Franchise, User};

/// Something an authenticated user wants to do.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// List every user.
    ListUsers,
    /// Hard-delete a user.
    DeleteUser,
    /// Change a user's name, email or password.
    UpdateUser(UserId),
    /// See which franchises a user administers.
    ViewUserFranchises(UserId),
    /// Create a franchise.
    CreateFranchise,
    /// Delete a franchise.
    DeleteFranchise,
    /// Open or close a store in a franchise.
    ManageStores(&'a Franchise),
    /// Add an item to the global menu.
    AddMenuItem,
    /// Place an order.
    PlaceOrder,
    /// See franchise admins and store revenue in listings.
    ViewFranchiseDetails,
}

/// Decide whether `actor` may perform `action`.
#[must_use]
pub fn allow(actor: &User, action: Action<'_>) -> bool {
    if actor.is_admin() {
        return true;
    }

    match action {
        Action::UpdateUser(target) | Action::ViewUserFranchises(target) => actor.id == target,
        Action::ManageStores(franchise) => franchise.is_admin(actor.id),
        Action::PlaceOrder => true,
        Action::ListUsers
        | Action::DeleteUser
        | Action::CreateFranchise
        | Action::DeleteFranchise
        | Action::AddMenuItem
        | Action::ViewFranchiseDetails => false,
    }
}
