mod cli;
mod db;
mod error;
mod exporter;
mod filter;
mod fmt;
mod importer;
mod ledger;
mod models;
mod palette;
#[cfg(feature = "pdf")]
mod pdf;
mod reports;
mod session;
mod settings;
mod store;

use clap::{CommandFactory, Parser};

use cli::{CategoriesCommands, Cli, Commands, ExportCommands, TxCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            username,
            email,
            password_stdin,
        } => cli::init::run(data_dir, &username, &email, password_stdin),
        Commands::Login {
            username,
            password_stdin,
        } => cli::auth::login(&username, password_stdin),
        Commands::Logout => cli::auth::logout(),
        Commands::Passwd { password_stdin } => cli::auth::passwd(password_stdin),
        Commands::ResetPassword => cli::auth::reset_password(),
        Commands::Tx { command } => match command {
            TxCommands::Add {
                amount,
                kind,
                category,
                details,
                sub_category,
                date,
            } => cli::tx::add(cli::tx::TxArgs {
                amount,
                kind,
                category,
                details,
                sub_category,
                date,
            }),
            TxCommands::Edit {
                id,
                amount,
                kind,
                category,
                details,
                sub_category,
                clear_sub_category,
                date,
            } => cli::tx::edit(
                id,
                cli::tx::TxEditArgs {
                    amount,
                    kind,
                    category,
                    details,
                    sub_category,
                    clear_sub_category,
                    date,
                },
            ),
            TxCommands::Delete { id } => cli::tx::delete(id),
            TxCommands::List { period } => cli::tx::list(&period),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add {
                name,
                kind,
                sub_category,
                notes,
            } => cli::categories::add(&name, &kind, sub_category, notes),
            CategoriesCommands::Edit {
                id,
                name,
                kind,
                sub_category,
                notes,
            } => cli::categories::edit(id, name, kind, sub_category, notes),
            CategoriesCommands::Delete { id } => cli::categories::delete(id),
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Import { file } => cli::import::run(&file),
        Commands::Template { output } => cli::export::template(output),
        Commands::Export { command } => match command {
            ExportCommands::Csv {
                period,
                title,
                output,
            } => cli::export::csv(&period, &title, output),
            #[cfg(feature = "pdf")]
            ExportCommands::Pdf {
                period,
                title,
                output,
            } => cli::export::pdf(&period, &title, output),
        },
        Commands::Summary { period } => cli::report::summary(&period),
        Commands::Charts { period } => cli::report::charts(&period),
        Commands::Logs { limit } => cli::logs::run(limit),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "smart-ledger", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
