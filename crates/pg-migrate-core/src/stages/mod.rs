//! Pipeline stages, one module per external tool interaction.

pub mod dump;
pub mod restore;
pub mod verify;
