use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use tracing::info;

use rent_ledger::config::AppConfig;
use rent_ledger::telemetry::init_telemetry;
use rent_ledger::{
    count_rent_collections, count_tenants, import_tenants, list_tenants, load_tenants_csv,
    open_database,
};

const USAGE: &str = "usage: rent-ledger <import <tenants.csv> | tenants | summary>";

fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.log);

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let Some(csv_path) = args.get(2) else {
                bail!(USAGE);
            };
            run_import(&config, Path::new(csv_path))?;
        }
        Some("tenants") => run_tenants(&config)?,
        Some("summary") | None => run_summary(&config)?,
        Some(other) => bail!("unknown command `{}`\n{}", other, USAGE),
    }

    Ok(())
}

fn run_import(config: &AppConfig, csv_path: &Path) -> Result<()> {
    info!(csv = %csv_path.display(), "importing tenants");

    let tenants = load_tenants_csv(csv_path)
        .with_context(|| format!("Failed to read {}", csv_path.display()))?;
    let conn = open_database(&config.database.path).context("Failed to open database")?;

    let report = import_tenants(&conn, &tenants)?;

    println!("Read:       {} rows", tenants.len());
    println!("Inserted:   {}", report.inserted);
    println!("Duplicates: {}", report.duplicates);
    println!("Invalid:    {}", report.invalid);

    Ok(())
}

fn run_tenants(config: &AppConfig) -> Result<()> {
    let conn = open_database(&config.database.path).context("Failed to open database")?;

    println!("{:>5}  {:<30} {:<15} {:>10}  {}", "Sr.", "Name", "Mobile", "Rent", "Revisions");
    for tenant in list_tenants(&conn)? {
        println!(
            "{:>5}  {:<30} {:<15} {:>10.2}  {}",
            tenant.sr_no,
            tenant.name,
            tenant.mobile_number,
            tenant.rent_amount,
            tenant.history().len()
        );
    }

    Ok(())
}

fn run_summary(config: &AppConfig) -> Result<()> {
    let conn = open_database(&config.database.path).context("Failed to open database")?;

    println!("Rent Ledger v{}", rent_ledger::VERSION);
    println!("Database:         {}", config.database.path.display());
    println!("Tenants:          {}", count_tenants(&conn)?);
    println!("Rent collections: {}", count_rent_collections(&conn)?);
    println!("Range policy:     {}", config.ledger.range_policy.as_str());

    Ok(())
}
