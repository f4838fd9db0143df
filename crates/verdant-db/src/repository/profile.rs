//! SurrealDB implementation of [`ProfileRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use verdant_core::error::VerdantResult;
use verdant_core::models::profile::{CreateProfile, Profile, Role, UpdateProfile};
use verdant_core::repository::ProfileRepository;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProfileRow {
    user_id: String,
    role: String,
    organization_name: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Profile row including the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    user_id: String,
    role: String,
    organization_name: Option<String>,
    phone_number: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    s.parse::<Role>()
        .map_err(|_| DbError::Decode(format!("unknown profile role: {s}")))
}

impl ProfileRow {
    fn into_profile(self, id: Uuid) -> Result<Profile, DbError> {
        Ok(Profile {
            id,
            user_id: self.user_id,
            role: parse_role(&self.role)?,
            organization_name: self.organization_name,
            phone_number: self.phone_number,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid profile UUID: {e}")))?;
        let role = parse_role(&self.role)?;
        Ok(Profile {
            id,
            user_id: self.user_id,
            role,
            organization_name: self.organization_name,
            phone_number: self.phone_number,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_PROFILE: &str = "SELECT meta::id(id) AS record_id, * FROM profile";

/// SurrealDB implementation of the Profile repository.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> VerdantResult<Profile> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('profile', $id) SET \
                 user_id = $user_id, role = $role, \
                 organization_name = $organization_name, \
                 phone_number = $phone_number, \
                 address = $address",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.clone()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("organization_name", input.organization_name))
            .bind(("phone_number", input.phone_number))
            .bind(("address", input.address))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("profile", &input.user_id, e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn get_by_user_id(&self, user_id: &str) -> VerdantResult<Profile> {
        let mut result = self
            .db
            .query(format!("{SELECT_PROFILE} WHERE user_id = $user_id"))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: user_id.to_string(),
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn update(&self, user_id: &str, input: UpdateProfile) -> VerdantResult<Profile> {
        let id = self.get_by_user_id(user_id).await?.id;
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.organization_name.is_some() {
            sets.push("organization_name = $organization_name");
        }
        if input.phone_number.is_some() {
            sets.push("phone_number = $phone_number");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('profile', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()));

        if let Some(organization_name) = input.organization_name {
            builder = builder.bind(("organization_name", organization_name));
        }
        if let Some(phone_number) = input.phone_number {
            builder = builder.bind(("phone_number", phone_number));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("profile", user_id, e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn list_by_role(&self, role: Role) -> VerdantResult<Vec<Profile>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_PROFILE} WHERE role = $role ORDER BY created_at ASC"
            ))
            .bind(("role", role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let profiles = rows
            .into_iter()
            .map(|r| r.try_into_profile())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(profiles)
    }
}
