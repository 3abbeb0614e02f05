/// Database models
///
/// One repository per entity: a `sqlx::FromRow` struct with its CRUD
/// operations as async methods over `&PgPool`. The pool handle is passed
/// in by the caller; there is no global connection state.
///
/// # Models
///
/// - `user`: accounts (email + Argon2id hash + active flag)
/// - `task`: the TODO items, owner-scoped
/// - `label`: per-user tags referenced by tasks

pub mod user;
pub mod task;
pub mod label;
