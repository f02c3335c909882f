mod cli;
mod currency;
mod customers;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod outcomes;
mod reports;
mod settings;
mod transfers;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli, Commands, CustomerCommands, OutcomeCommands, ProfilesCommands, SummaryCommands, TransferCommands,
    TxCommands,
};
use models::Customer;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "kasa=info",
        _ => "kasa=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Load { path } => cli::load::run(&path),
        Commands::Status => cli::status::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Import { file, kind } => cli::import::run(&file, &kind),
        Commands::Tx { command } => match command {
            TxCommands::Add(fields) => cli::tx::add(fields),
            TxCommands::Edit { id, fields } => cli::tx::edit(id, fields),
            TxCommands::Delete { id } => cli::tx::delete(id),
            TxCommands::List {
                profile,
                date,
                all_dates,
            } => cli::tx::list(profile, date, all_dates),
        },
        Commands::Profiles { command } => match command {
            ProfilesCommands::List => cli::profiles::list(),
            ProfilesCommands::Show { name } => cli::profiles::show(&name),
            ProfilesCommands::Verify => cli::profiles::verify(),
            ProfilesCommands::Recompute => cli::profiles::recompute(),
        },
        Commands::Outcome { command } => match command {
            OutcomeCommands::Add {
                date,
                vehicle,
                items,
                notes,
            } => cli::outcome::add(&date, &vehicle, &items, notes),
            OutcomeCommands::List { month, year, vehicle } => cli::outcome::list(month, year, vehicle),
            OutcomeCommands::Delete { id } => cli::outcome::delete(id),
        },
        Commands::Transfer { command } => match command {
            TransferCommands::Add {
                date,
                counterpart,
                direction,
                amount,
                currency,
                commission,
                notes,
            } => cli::transfer::add(&date, &counterpart, &direction, amount, &currency, commission, notes),
            TransferCommands::List { month, counterpart } => cli::transfer::list(month, counterpart),
            TransferCommands::Totals { month, year } => cli::transfer::totals(month, year),
            TransferCommands::Delete { id } => cli::transfer::delete(id),
        },
        Commands::Customer { command } => match command {
            CustomerCommands::Add {
                id,
                name,
                phone,
                email,
                address,
                notes,
            } => cli::customer::add(Customer {
                id,
                name,
                phone,
                email,
                address,
                notes,
            }),
            CustomerCommands::List { search } => cli::customer::list(search),
            CustomerCommands::Show { id } => cli::customer::show(id),
            CustomerCommands::Delete { id } => cli::customer::delete(id),
        },
        Commands::Summary { command } => match command {
            SummaryCommands::Month { month, profile } => cli::summary::month(month, profile),
            SummaryCommands::Year { year, profile } => cli::summary::year(year, profile),
            SummaryCommands::Vehicles { month, year } => cli::summary::vehicles(month, year),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
