use std::path::PathBuf;

use zeroize::Zeroize;

use crate::cli::auth::read_secret;
use crate::db::SqliteStore;
use crate::error::{LedgerError, Result};
use crate::session::{check_password_strength, Credentials, Session};
use crate::settings::{
    config_dir, load_settings, save_settings, settings_file_exists, shellexpand_path,
};

pub fn run(data_dir: Option<String>, username: &str, email: &str, password_stdin: bool) -> Result<()> {
    let mut settings = load_settings();
    if settings_file_exists() && settings.credentials.is_some() {
        return Err(LedgerError::Settings(
            "Already initialized. Use `smart-ledger login` to sign in.".to_string(),
        ));
    }
    if username.trim().is_empty() {
        return Err(LedgerError::Validation("username is required".to_string()));
    }

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let data_path = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(data_path.join("exports"))?;

    let mut password = read_secret("Password: ", password_stdin)?;
    if let Err(e) = check_password_strength(&password) {
        password.zeroize();
        return Err(e);
    }
    let credentials = Credentials::new(username.trim(), email.trim(), &password);
    let mut session = Session::default();
    session.begin(&credentials.username)?;
    let signed_in = session.complete(&password, &credentials);
    password.zeroize();
    signed_in?;

    settings.credentials = Some(credentials.clone());
    save_settings(&settings)?;
    SqliteStore::open(&settings.db_path())?;
    session.save(&config_dir())?;

    println!("Data directory: {}", data_path.display());
    println!("Database: {}", settings.db_path().display());
    println!("Signed in as {}", credentials.username);
    Ok(())
}
