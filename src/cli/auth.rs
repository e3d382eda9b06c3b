use std::io::BufRead;

use colored::Colorize;
use zeroize::Zeroize;

use crate::error::{LedgerError, Result};
use crate::session::{generate_pin, verify_pin, Credentials, Session};
use crate::settings::{config_dir, load_settings, save_settings};

/// Read a secret from the terminal, or one line of stdin when piping.
pub(crate) fn read_secret(prompt: &str, from_stdin: bool) -> Result<String> {
    if !from_stdin {
        return Ok(rpassword::prompt_password(prompt)?);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(|c| c == '\r' || c == '\n').to_string();
    line.zeroize();
    Ok(secret)
}

fn stored_credentials() -> Result<Credentials> {
    load_settings().credentials.ok_or_else(|| {
        LedgerError::Auth("No account configured. Run `smart-ledger init` first.".to_string())
    })
}

pub fn login(username: &str, password_stdin: bool) -> Result<()> {
    let credentials = stored_credentials()?;
    let mut session = Session::load(&config_dir(), Some(&credentials));
    if session.is_authenticated() {
        session.logout();
    }
    session.begin(username)?;

    let mut password = read_secret("Password: ", password_stdin)?;
    let result = session.complete(&password, &credentials);
    password.zeroize();
    result?;

    session.save(&config_dir())?;
    println!("{} Signed in as {}", "\u{2713}".green(), credentials.username.bold());
    Ok(())
}

pub fn logout() -> Result<()> {
    let mut session = Session::load(&config_dir(), load_settings().credentials.as_ref());
    let was = session.username().map(str::to_string);
    session.logout();
    session.save(&config_dir())?;
    match was {
        Some(user) => println!("Signed out {user}"),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub fn passwd(password_stdin: bool) -> Result<()> {
    let mut settings = load_settings();
    let session = Session::load(&config_dir(), settings.credentials.as_ref());
    session.require()?;
    let Some(credentials) = settings.credentials.as_mut() else {
        return Err(LedgerError::Auth("No account configured".to_string()));
    };

    let mut current = read_secret("Current password: ", password_stdin)?;
    let mut new = read_secret("New password: ", password_stdin)?;
    let mut confirm = if password_stdin {
        new.clone()
    } else {
        read_secret("Confirm new password: ", false)?
    };
    let result = if new != confirm {
        Err(LedgerError::Auth("New passwords do not match".to_string()))
    } else {
        credentials.change_password(&current, &new)
    };
    current.zeroize();
    new.zeroize();
    confirm.zeroize();
    result?;

    save_settings(&settings)?;
    println!("{} Password updated successfully", "\u{2713}".green());
    Ok(())
}

/// PIN reset flow. There is no mail transport, so the PIN is shown on the
/// terminal in place of sending it to the account email.
pub fn reset_password() -> Result<()> {
    let mut settings = load_settings();
    let Some(credentials) = settings.credentials.as_mut() else {
        return Err(LedgerError::Auth("No account configured".to_string()));
    };

    let pin = generate_pin();
    println!(
        "A 4-digit PIN would be sent to {}. Your PIN is: {}",
        credentials.email,
        pin.bold()
    );
    let mut entered = read_secret("Enter PIN: ", false)?;
    let checked = verify_pin(&pin, &entered);
    entered.zeroize();
    checked?;

    let mut new = read_secret("New password: ", false)?;
    let mut confirm = read_secret("Confirm new password: ", false)?;
    let result = if new != confirm {
        Err(LedgerError::Auth("New passwords do not match".to_string()))
    } else {
        credentials.reset_password(&new)
    };
    new.zeroize();
    confirm.zeroize();
    result?;

    save_settings(&settings)?;
    Session::Anonymous.save(&config_dir())?;
    println!("{} Password reset. Sign in with `smart-ledger login`.", "\u{2713}".green());
    Ok(())
}
