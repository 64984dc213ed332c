//! Account registry
//!
//! Named Gmail accounts with at most one active at a time, persisted as a
//! pretty-printed JSON array that is rewritten on every mutation.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{clean_account_name, Account};

/// In-memory account list backed by a JSON record store
#[derive(Debug)]
pub struct AccountRegistry {
    path: PathBuf,
    accounts: Vec<Account>,
    /// Set when the active account was removed; suppresses the
    /// first-account fallback until another account is selected
    active_cleared: bool,
}

impl AccountRegistry {
    /// Load the registry; a missing or unreadable file yields an empty one
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let accounts = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<Account>>(&contents) {
                Ok(accounts) => {
                    info!("Loaded {} accounts from {:?}", accounts.len(), path);
                    accounts
                }
                Err(e) => {
                    warn!("Error loading accounts from {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No account file at {:?}", path);
                Vec::new()
            }
            Err(e) => {
                warn!("Error reading accounts from {:?}: {}", path, e);
                Vec::new()
            }
        };

        Self {
            path,
            accounts,
            active_cleared: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `accounts`, then make them the in-memory list. A failed write
    /// leaves the registry unchanged.
    fn commit(&mut self, accounts: Vec<Account>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&accounts)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved {} accounts to {:?}", accounts.len(), self.path);

        self.accounts = accounts;
        Ok(())
    }

    /// Add a new, inactive account
    pub fn add(
        &mut self,
        name: &str,
        client_id: &str,
        client_secret: &str,
        auth_uri: &str,
        token_uri: &str,
        redirect_uri: &str,
    ) -> Result<String> {
        let fields = [name, client_id, client_secret, auth_uri, token_uri, redirect_uri];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::MissingField("All fields are required"));
        }

        let name = name.trim();
        if self.get(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let mut accounts = self.accounts.clone();
        accounts.push(Account::new(
            name,
            client_id.trim(),
            client_secret.trim(),
            auth_uri.trim(),
            token_uri.trim(),
            redirect_uri.trim(),
        ));
        self.commit(accounts)?;

        info!("Added account {}", name);
        Ok(format!(
            "Account '{}' added successfully. Please select it in the Manage Accounts section to use it.",
            name
        ))
    }

    /// Make exactly one account active; returns the updated display list
    pub fn set_active(&mut self, name: &str) -> Result<Vec<String>> {
        let name = clean_account_name(name);
        if name.is_empty() {
            return Err(Error::MissingField("Please select an account"));
        }
        if self.get(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }

        let mut accounts = self.accounts.clone();
        for account in &mut accounts {
            account.is_active = account.name == name;
        }
        self.commit(accounts)?;
        self.active_cleared = false;

        info!("Switched to account: {}", name);
        Ok(self.display_names())
    }

    /// The flagged account, or the first account when none is flagged
    pub fn get_active(&self) -> Option<&Account> {
        self.accounts.iter().find(|a| a.is_active).or_else(|| {
            if self.active_cleared {
                None
            } else {
                self.accounts.first()
            }
        })
    }

    fn active_index(&self) -> Option<usize> {
        let name = self.get_active()?.name.clone();
        self.accounts.iter().position(|a| a.name == name)
    }

    /// Remove an account; removing the active one leaves none active
    pub fn remove(&mut self, name: &str) -> Result<String> {
        let name = clean_account_name(name);
        if name.is_empty() {
            return Err(Error::MissingField("Please select an account"));
        }
        let index = self
            .accounts
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let mut accounts = self.accounts.clone();
        let removed = accounts.remove(index);
        if removed.is_active {
            for account in &mut accounts {
                account.is_active = false;
            }
        }
        self.commit(accounts)?;
        if removed.is_active {
            self.active_cleared = true;
        }

        info!("Removed account {}", name);
        Ok(format!("Account '{}' removed", name))
    }

    /// Store the summary API key on the active account
    pub fn set_summary_api_key(&mut self, key: &str) -> Result<String> {
        let index = self.active_index().ok_or(Error::NoActiveAccount)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::MissingField(
                "Gemini API key is required for email summaries",
            ));
        }

        let mut accounts = self.accounts.clone();
        accounts[index].api_key_for_summaries = Some(key.to_string());
        self.commit(accounts)?;
        Ok(format!(
            "Gemini API key saved for {}",
            self.accounts[index].name
        ))
    }

    /// Remove the summary API key from the active account
    pub fn clear_summary_api_key(&mut self) -> Result<String> {
        let index = self.active_index().ok_or(Error::NoActiveAccount)?;
        let mut accounts = self.accounts.clone();
        accounts[index].api_key_for_summaries = None;
        self.commit(accounts)?;
        Ok(format!(
            "Gemini API key removed from {}",
            self.accounts[index].name
        ))
    }

    /// Store exported credentials on an account; unchanged material is not rewritten
    pub fn set_token_material(&mut self, name: &str, material: Option<String>) -> Result<()> {
        let index = self
            .accounts
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        if self.accounts[index].token_material == material {
            return Ok(());
        }
        let mut accounts = self.accounts.clone();
        accounts[index].token_material = material;
        self.commit(accounts)?;
        debug!("Updated token material for {}", name);
        Ok(())
    }

    pub fn list(&self) -> &[Account] {
        &self.accounts
    }

    /// Names with ` (Active)` appended to the active account
    pub fn display_names(&self) -> Vec<String> {
        self.accounts.iter().map(Account::display_name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dir: &tempfile::TempDir) -> AccountRegistry {
        AccountRegistry::load(dir.path().join("gmail_accounts.json"))
    }

    fn add(registry: &mut AccountRegistry, name: &str) -> Result<String> {
        registry.add(
            name,
            "id.apps.googleusercontent.com",
            "secret",
            "https://accounts.google.com/o/oauth2/auth",
            "https://oauth2.googleapis.com/token",
            "http://localhost",
        )
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "work").unwrap();
        add(&mut registry, "home").unwrap();
        registry.set_active("work").unwrap();

        // a directory in the temp file's place makes every write fail
        std::fs::create_dir(dir.path().join("gmail_accounts.json.tmp")).unwrap();

        assert!(add(&mut registry, "other").is_err());
        assert_eq!(registry.len(), 2);

        assert!(registry.set_active("home").is_err());
        assert_eq!(registry.get_active().unwrap().name, "work");

        assert!(registry.set_summary_api_key("gk-1").is_err());
        assert!(registry.get("work").unwrap().api_key_for_summaries.is_none());

        assert!(registry
            .set_token_material("work", Some("abcd".to_string()))
            .is_err());
        assert!(registry.get("work").unwrap().token_material.is_none());

        assert!(registry.remove("work").is_err());
        assert_eq!(registry.get_active().unwrap().name, "work");

        let reloaded = AccountRegistry::load(registry.path());
        assert_eq!(reloaded.get_active().unwrap().name, "work");
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_add_and_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);

        let message = add(&mut registry, "A").unwrap();
        assert!(message.starts_with("Account 'A' added successfully."));
        assert!(!registry.get("A").unwrap().is_active);

        let err = add(&mut registry, "A").unwrap_err();
        assert_eq!(err.to_string(), "Account with name 'A' already exists");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_fields_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "A").unwrap();

        let err = registry.add("A", "", "s", "a", "t", "r").unwrap_err();
        assert_eq!(
            err.status_pair(),
            ("Error", "All fields are required".to_string())
        );
    }

    #[test]
    fn test_switching_keeps_one_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "A").unwrap();
        add(&mut registry, "B").unwrap();

        registry.set_active("A").unwrap();
        let names = registry.set_active("B").unwrap();

        assert_eq!(names, vec!["A".to_string(), "B (Active)".to_string()]);
        assert_eq!(registry.get_active().unwrap().name, "B");
        assert_eq!(registry.list().iter().filter(|a| a.is_active).count(), 1);
    }

    #[test]
    fn test_set_active_strips_display_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "work").unwrap();
        registry.set_active("work (Active)").unwrap();
        assert_eq!(registry.get_active().unwrap().name, "work");

        assert!(matches!(registry.set_active("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_first_account_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        assert!(registry.get_active().is_none());

        add(&mut registry, "first").unwrap();
        add(&mut registry, "second").unwrap();
        assert_eq!(registry.get_active().unwrap().name, "first");
    }

    #[test]
    fn test_removing_active_leaves_none_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "A").unwrap();
        add(&mut registry, "B").unwrap();
        registry.set_active("A").unwrap();

        assert_eq!(registry.remove("A (Active)").unwrap(), "Account 'A' removed");
        assert!(registry.get_active().is_none());
        assert!(registry.list().iter().all(|a| !a.is_active));

        registry.set_active("B").unwrap();
        assert_eq!(registry.get_active().unwrap().name, "B");
    }

    #[test]
    fn test_persisted_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "A").unwrap();
        add(&mut registry, "B").unwrap();
        registry.set_active("B").unwrap();
        registry.set_summary_api_key("  key-1 ").unwrap();

        let reloaded = AccountRegistry::load(registry.path());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get_active().unwrap().name, "B");
        assert_eq!(reloaded.get("B").unwrap().summary_key(), Some("key-1"));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gmail_accounts.json");
        fs::write(&path, "{ not an array").unwrap();

        let registry = AccountRegistry::load(&path);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_summary_key_requires_active_account_and_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        assert!(matches!(
            registry.set_summary_api_key("k"),
            Err(Error::NoActiveAccount)
        ));

        add(&mut registry, "A").unwrap();
        registry.set_active("A").unwrap();
        assert_eq!(
            registry.set_summary_api_key("   ").unwrap_err().to_string(),
            "Gemini API key is required for email summaries"
        );

        registry.set_summary_api_key("k").unwrap();
        assert_eq!(
            registry.clear_summary_api_key().unwrap(),
            "Gemini API key removed from A"
        );
        assert_eq!(registry.get("A").unwrap().summary_key(), None);
    }

    #[test]
    fn test_set_token_material() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        add(&mut registry, "A").unwrap();

        registry
            .set_token_material("A", Some("abcd".to_string()))
            .unwrap();
        assert_eq!(registry.get("A").unwrap().token_material.as_deref(), Some("abcd"));
        assert!(matches!(
            registry.set_token_material("Z", None),
            Err(Error::NotFound(_))
        ));
    }
}
