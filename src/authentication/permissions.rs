use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageCatalog,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnCart,
    ManageOwnSubscriptions,

    ManageAllRecipes,
    ManageCatalog,
    ManageUsers,
}

impl ActionType {
    pub fn permitted(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("somebody"),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[test]
    fn regular_users_manage_only_their_own_data() {
        let user = session(UserRole::User);
        assert!(ActionType::CreateRecipes.permitted(&user));
        assert!(ActionType::ManageOwnRecipes.permitted(&user));
        assert!(!ActionType::ManageAllRecipes.permitted(&user));
        assert!(!ActionType::ManageCatalog.permitted(&user));
    }

    #[test]
    fn admins_manage_everything() {
        let admin = session(UserRole::Admin);
        assert!(ActionType::ManageAllRecipes.permitted(&admin));
        assert!(ActionType::ManageCatalog.permitted(&admin));
        assert!(ActionType::ManageUsers.permitted(&admin));
    }
}
