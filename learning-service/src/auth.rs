//! Header-driven mock identity.
//!
//! Requests without an `Authorization` header are a student. With one present, the
//! `X-User-Role` header chooses the role. Development stand-in, not a security boundary.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::error::Error;

pub const MOCK_USER_ID: &str = "user123";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "instructor" => Role::Instructor,
            "admin" => Role::Admin,
            "student" => Role::Student,
            other => {
                debug!("role '{other}' is not recognised. Treating as student.");
                Role::Student
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_instructor(&self) -> bool {
        matches!(self.role, Role::Instructor | Role::Admin)
    }

    /// Gate for instructor/admin-only actions
    pub fn require_instructor(&self, message: &str) -> Result<(), Error> {
        if self.is_instructor() {
            Ok(())
        } else {
            Err(Error::Forbidden(message.to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = if parts.headers.contains_key(AUTHORIZATION) {
            parts
                .headers
                .get(ROLE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(Role::from)
                .unwrap_or(Role::Student)
        } else {
            Role::Student
        };

        Ok(CurrentUser {
            id: MOCK_USER_ID.to_string(),
            role,
        })
    }
}
