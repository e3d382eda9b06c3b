//! Who is signed in, and the stored credentials they sign in against.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    salt: String,
    password_hash: String,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::Auth(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

impl Credentials {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        let salt = new_salt();
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(&salt, password),
            salt,
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && hash_password(&self.salt, password) == self.password_hash
    }

    pub fn change_password(&mut self, current: &str, new: &str) -> Result<()> {
        if hash_password(&self.salt, current) != self.password_hash {
            return Err(LedgerError::Auth("Current password is incorrect".to_string()));
        }
        self.reset_password(new)
    }

    /// Replace the password without knowing the old one. Callers gate this
    /// behind a verified PIN.
    pub fn reset_password(&mut self, new: &str) -> Result<()> {
        check_password_strength(new)?;
        self.salt = new_salt();
        self.password_hash = hash_password(&self.salt, new);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PIN reset
// ---------------------------------------------------------------------------

pub fn generate_pin() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

pub fn verify_pin(expected: &str, entered: &str) -> Result<()> {
    if expected == entered.trim() {
        Ok(())
    } else {
        Err(LedgerError::Auth("Invalid PIN code".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticating {
        username: String,
    },
    Authenticated {
        username: String,
        email: String,
    },
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    username: String,
    email: String,
}

fn session_path(dir: &Path) -> PathBuf {
    dir.join("session.json")
}

impl Session {
    pub fn begin(&mut self, username: &str) -> Result<()> {
        match self {
            Session::Anonymous => {
                *self = Session::Authenticating {
                    username: username.trim().to_string(),
                };
                Ok(())
            }
            Session::Authenticating { .. } => {
                Err(LedgerError::Auth("A sign-in is already in progress".to_string()))
            }
            Session::Authenticated { username, .. } => Err(LedgerError::Auth(format!(
                "Already signed in as {username}"
            ))),
        }
    }

    /// Finish a sign-in started with [`Session::begin`]. A wrong password
    /// drops back to `Anonymous`.
    pub fn complete(&mut self, password: &str, credentials: &Credentials) -> Result<()> {
        let Session::Authenticating { username } = self else {
            return Err(LedgerError::Auth("No sign-in in progress".to_string()));
        };
        if credentials.verify(username, password) {
            log::info!("signed in as {username}");
            *self = Session::Authenticated {
                username: credentials.username.clone(),
                email: credentials.email.clone(),
            };
            Ok(())
        } else {
            log::warn!("failed sign-in for {username}");
            *self = Session::Anonymous;
            Err(LedgerError::Auth("Invalid username or password".to_string()))
        }
    }

    pub fn logout(&mut self) {
        *self = Session::Anonymous;
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Session::Authenticated { username, .. } => Some(username),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn require(&self) -> Result<&str> {
        self.username()
            .ok_or_else(|| LedgerError::Auth("Not signed in. Run `smart-ledger login` first".to_string()))
    }

    /// Resume a persisted session. Only an authenticated session survives a
    /// restart, and only while it still matches the stored credentials.
    pub fn load(dir: &Path, credentials: Option<&Credentials>) -> Session {
        let Some(creds) = credentials else {
            return Session::Anonymous;
        };
        let Ok(content) = std::fs::read_to_string(session_path(dir)) else {
            return Session::Anonymous;
        };
        match serde_json::from_str::<SessionFile>(&content) {
            Ok(file) if file.username == creds.username => Session::Authenticated {
                username: file.username,
                email: file.email,
            },
            _ => Session::Anonymous,
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = session_path(dir);
        match self {
            Session::Authenticated { username, email } => {
                std::fs::create_dir_all(dir)?;
                let file = SessionFile {
                    username: username.clone(),
                    email: email.clone(),
                };
                let json = serde_json::to_string_pretty(&file)
                    .map_err(|e| LedgerError::Settings(e.to_string()))?;
                std::fs::write(path, format!("{json}\n"))?;
            }
            _ => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("asha", "asha@example.com", "s3cret!")
    }

    #[test]
    fn test_verify_password() {
        let c = creds();
        assert!(c.verify("asha", "s3cret!"));
        assert!(!c.verify("asha", "wrong"));
        assert!(!c.verify("Asha", "s3cret!"));
        assert_eq!(c.password_hash.len(), 64);
    }

    #[test]
    fn test_change_password() {
        let mut c = creds();
        assert!(matches!(c.change_password("nope", "newpass1"), Err(LedgerError::Auth(_))));
        assert!(c.change_password("s3cret!", "short").is_err());
        c.change_password("s3cret!", "newpass1").unwrap();
        assert!(c.verify("asha", "newpass1"));
        assert!(!c.verify("asha", "s3cret!"));
    }

    #[test]
    fn test_reset_password() {
        let mut c = creds();
        c.reset_password("another1").unwrap();
        assert!(c.verify("asha", "another1"));
    }

    #[test]
    fn test_pin() {
        for _ in 0..50 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 4);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
            verify_pin(&pin, &format!(" {pin}\n")).unwrap();
        }
        assert!(verify_pin("1234", "4321").is_err());
    }

    #[test]
    fn test_sign_in_transitions() {
        let c = creds();
        let mut s = Session::default();
        assert!(s.require().is_err());
        assert!(s.complete("s3cret!", &c).is_err());

        s.begin("asha").unwrap();
        assert_eq!(s, Session::Authenticating { username: "asha".to_string() });
        assert!(s.begin("asha").is_err());
        s.complete("s3cret!", &c).unwrap();
        assert_eq!(s.require().unwrap(), "asha");
        assert!(s.begin("asha").is_err());

        s.logout();
        assert_eq!(s, Session::Anonymous);
    }

    #[test]
    fn test_wrong_password_returns_to_anonymous() {
        let mut s = Session::default();
        s.begin("asha").unwrap();
        assert!(matches!(s.complete("bad", &creds()), Err(LedgerError::Auth(_))));
        assert_eq!(s, Session::Anonymous);
    }

    #[test]
    fn test_session_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let c = creds();
        let mut s = Session::default();
        s.begin("asha").unwrap();
        s.complete("s3cret!", &c).unwrap();
        s.save(dir.path()).unwrap();

        assert!(Session::load(dir.path(), Some(&c)).is_authenticated());
        assert!(!Session::load(dir.path(), None).is_authenticated());
        let other = Credentials::new("ravi", "ravi@example.com", "s3cret!");
        assert!(!Session::load(dir.path(), Some(&other)).is_authenticated());

        s.logout();
        s.save(dir.path()).unwrap();
        assert!(!dir.path().join("session.json").exists());
    }
}
