// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod departments;
pub mod media;
pub mod messages;
pub mod senders;
pub mod tickets;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::database::Database;

    pub async fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }
}
