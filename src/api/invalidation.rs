//! Invalidation map
//!
//! Every mutating operation invalidates a fixed set of server cache keys,
//! always after the remote mutation has succeeded. Nothing is written back:
//! the next read refetches from Drive.

use crate::cache::{CacheKey, Principal};

/// Server-side operations that invalidate cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Upload,
    Rename,
    Delete,
    Login,
    Logout,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Upload => "upload",
            Mutation::Rename => "rename",
            Mutation::Delete => "delete",
            Mutation::Login => "login",
            Mutation::Logout => "logout",
        }
    }

    /// Keys made stale when `principal` performs this mutation on `folder_id`.
    ///
    /// Login leaves the identity entry alone because the login handler
    /// replaces it with the record it just fetched.
    pub fn keys(&self, principal: &Principal, folder_id: &str) -> Vec<CacheKey> {
        let listing = CacheKey::files_list(principal, folder_id);
        match self {
            Mutation::Upload | Mutation::Rename | Mutation::Delete | Mutation::Login => {
                vec![listing]
            }
            Mutation::Logout => vec![CacheKey::user_info(principal), listing],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mutations_drop_listing_only() {
        let p = Principal::from_credential("tok");
        for mutation in [Mutation::Upload, Mutation::Rename, Mutation::Delete] {
            assert_eq!(mutation.keys(&p, "folderX"), vec![CacheKey::files_list(&p, "folderX")]);
        }
    }

    #[test]
    fn test_logout_drops_identity_and_listing() {
        let p = Principal::from_credential("tok");
        let keys = Mutation::Logout.keys(&p, "folderX");
        assert!(keys.contains(&CacheKey::user_info(&p)));
        assert!(keys.contains(&CacheKey::files_list(&p, "folderX")));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_keys_scoped_to_principal() {
        let a = Principal::from_credential("a");
        let b = Principal::from_credential("b");
        let keys = Mutation::Delete.keys(&a, "root");
        assert!(!keys.contains(&CacheKey::files_list(&b, "root")));
    }
}
