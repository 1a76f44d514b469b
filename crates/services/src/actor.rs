use bson::oid::ObjectId;
use leadflow_db::models::{Role, User};

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ObjectId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ObjectId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_self_or_admin(&self, user_id: ObjectId) -> bool {
        self.id == user_id || self.is_admin()
    }
}

impl TryFrom<&User> for Actor {
    type Error = crate::dao::base::DaoError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let id = user.id.ok_or(crate::dao::base::DaoError::NotFound)?;
        Ok(Self::new(id, user.role))
    }
}
