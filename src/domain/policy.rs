//! Access policy.
//!
//! Every request the service answers maps to an [`Action`]. Each action
//! declares a [`Requirement`] and [`authorize`] checks the caller's identity
//! against it, together with the ownership of the resource being touched.
//! The table is an exhaustive `match`, so adding an action without deciding
//! who may perform it does not compile.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::Role;

/// Authenticated caller. The role is the one currently on record for the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self { Self { user_id, role } }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    // public
    CreateGuestOrder,
    ViewGuestOrders,
    ViewGuestInvoice,
    BrowseCatalog,
    ReadRatings,
    SubmitMessage,
    // any signed-in user
    CreateOrder,
    ViewOwnOrders,
    UseCart,
    RateProduct,
    UpdateProfile,
    // owner of the resource
    ViewOrder,
    RequestCancellation,
    // staff
    ListOrders,
    UpdateOrderStatus,
    ApproveCancellation,
    DeclineCancellation,
    ViewPendingCount,
    ViewOrderStats,
    ListUsers,
    // admin
    DeleteOrder,
    ChangeUserRole,
    ViewUserOrders,
    ManageCatalog,
    ViewProductStats,
    ManageMessages,
}

const STAFF: &[Role] = &[Role::Admin, Role::Moderator];
const ADMIN: &[Role] = &[Role::Admin];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// The caller must own the resource. With `staff_override` admins and
    /// moderators pass as well.
    Owner { staff_override: bool },
    Roles(&'static [Role]),
}

impl Action {
    pub const fn requirement(self) -> Requirement {
        use Action::*;
        match self {
            CreateGuestOrder | ViewGuestOrders | ViewGuestInvoice | BrowseCatalog | ReadRatings
            | SubmitMessage => Requirement::Public,
            CreateOrder | ViewOwnOrders | UseCart | RateProduct | UpdateProfile => Requirement::Authenticated,
            ViewOrder => Requirement::Owner { staff_override: true },
            RequestCancellation => Requirement::Owner { staff_override: false },
            ListOrders | UpdateOrderStatus | ApproveCancellation | DeclineCancellation
            | ViewPendingCount | ViewOrderStats | ListUsers => Requirement::Roles(STAFF),
            DeleteOrder | ChangeUserRole | ViewUserOrders | ManageCatalog | ViewProductStats | ManageMessages => {
                Requirement::Roles(ADMIN)
            }
        }
    }
}

/// Ownership of the resource an action targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Unowned,
    OwnedBy(Uuid),
    /// Guest orders belong to nobody.
    Guest,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthorized,
    #[error("{}", .0.message())]
    Forbidden(Action),
}

impl Action {
    fn message(self) -> &'static str {
        match self.requirement() {
            Requirement::Roles(roles) if roles == ADMIN => "Admin access only",
            Requirement::Roles(_) => "Admin or Moderator access only",
            _ => "Not allowed",
        }
    }
}

pub fn authorize(identity: Option<&Identity>, action: Action, resource: Resource) -> Result<(), AccessDenied> {
    let requirement = action.requirement();
    if requirement == Requirement::Public {
        return Ok(());
    }
    let identity = identity.ok_or(AccessDenied::Unauthorized)?;
    let allowed = match requirement {
        Requirement::Public | Requirement::Authenticated => true,
        Requirement::Owner { staff_override } => {
            resource == Resource::OwnedBy(identity.user_id) || (staff_override && identity.role.is_staff())
        }
        Requirement::Roles(roles) => roles.contains(&identity.role),
    };
    if allowed {
        Ok(())
    } else {
        tracing::debug!(user_id = %identity.user_id, role = %identity.role, ?action, "access denied");
        Err(AccessDenied::Forbidden(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> Identity { Identity::new(Uuid::new_v4(), role) }

    #[test]
    fn test_public_actions_ignore_identity() {
        for action in [Action::CreateGuestOrder, Action::ViewGuestOrders, Action::ViewGuestInvoice] {
            assert_eq!(authorize(None, action, Resource::Guest), Ok(()));
            assert_eq!(authorize(Some(&user(Role::User)), action, Resource::Guest), Ok(()));
        }
    }

    #[test]
    fn test_missing_identity_is_unauthorized() {
        assert_eq!(authorize(None, Action::CreateOrder, Resource::Unowned), Err(AccessDenied::Unauthorized));
        assert_eq!(authorize(None, Action::DeleteOrder, Resource::Unowned), Err(AccessDenied::Unauthorized));
        assert_eq!(authorize(None, Action::UpdateProfile, Resource::Unowned), Err(AccessDenied::Unauthorized));
        assert_eq!(authorize(Some(&user(Role::User)), Action::UpdateProfile, Resource::Unowned), Ok(()));
    }

    #[test]
    fn test_owner_actions() {
        let owner = user(Role::User);
        let stranger = user(Role::User);
        let moderator = user(Role::Moderator);
        let mine = Resource::OwnedBy(owner.user_id);

        assert_eq!(authorize(Some(&owner), Action::ViewOrder, mine), Ok(()));
        assert_eq!(authorize(Some(&stranger), Action::ViewOrder, mine), Err(AccessDenied::Forbidden(Action::ViewOrder)));
        assert_eq!(authorize(Some(&moderator), Action::ViewOrder, mine), Ok(()));
        assert_eq!(authorize(Some(&stranger), Action::ViewOrder, Resource::Guest), Err(AccessDenied::Forbidden(Action::ViewOrder)));

        assert_eq!(authorize(Some(&owner), Action::RequestCancellation, mine), Ok(()));
        assert!(authorize(Some(&user(Role::Admin)), Action::RequestCancellation, mine).is_err());
        assert!(authorize(Some(&owner), Action::RequestCancellation, Resource::Guest).is_err());
    }

    #[test]
    fn test_role_sets() {
        let admin = user(Role::Admin);
        let moderator = user(Role::Moderator);
        let plain = user(Role::User);

        for action in [Action::UpdateOrderStatus, Action::ApproveCancellation, Action::ViewOrderStats, Action::ListUsers] {
            assert!(authorize(Some(&admin), action, Resource::Unowned).is_ok());
            assert!(authorize(Some(&moderator), action, Resource::Unowned).is_ok());
            assert!(authorize(Some(&plain), action, Resource::Unowned).is_err());
        }
        for action in [Action::DeleteOrder, Action::ChangeUserRole, Action::ViewUserOrders, Action::ViewProductStats] {
            assert!(authorize(Some(&admin), action, Resource::Unowned).is_ok());
            assert_eq!(authorize(Some(&moderator), action, Resource::Unowned), Err(AccessDenied::Forbidden(action)));
        }
    }

    #[test]
    fn test_forbidden_messages() {
        assert_eq!(AccessDenied::Forbidden(Action::DeleteOrder).to_string(), "Admin access only");
        assert_eq!(AccessDenied::Forbidden(Action::ListOrders).to_string(), "Admin or Moderator access only");
        assert_eq!(AccessDenied::Forbidden(Action::ViewOrder).to_string(), "Not allowed");
    }
}
