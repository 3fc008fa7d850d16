//! CLI command implementations

pub(crate) mod common;
pub(crate) mod migrate;
pub(crate) mod new;
pub(crate) mod pending;
pub(crate) mod rollback;
pub(crate) mod status;
pub(crate) mod verify;
