use clap::Parser;
use colored::*;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fee_ledger::{
    cli::{Cli, Commands, OutputFormat},
    error::{self, FeeError},
    eligibility::EligibilityResult,
    ledger::{PaymentConfirmation, StudentFeeProfile},
    service::{FeeService, Identity, NewStudent, TransportUpdate},
    storage::{Database, LedgerStats},
    utils, Config,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fee_ledger=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, config).await {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> error::Result<()> {
    let format = cli.format;

    if let Commands::Init = cli.command {
        return initialize(&config);
    }

    let db = Database::new(&config.database.path)?;
    let service = FeeService::new(db, &config);

    match cli.command {
        Commands::Init => Ok(()),

        Commands::Enrol {
            usn,
            user,
            name,
            year,
            college_fee_due,
            transport_fee_due,
            last_sem_dues,
            transport_opted,
        } => {
            let profile = service
                .enrol(NewStudent {
                    usn,
                    user_id: user,
                    name,
                    current_year: year,
                    college_fee_due,
                    transport_fee_due,
                    last_sem_dues,
                    transport_opted,
                })
                .await?;
            println!("{}", format!("✓ Enrolled {}", profile.usn).green());
            show_profile(&profile, format)
        }

        Commands::Profile { user } => {
            let identity = Identity {
                user_id: user,
                name: String::new(),
            };
            let profile = service.profile(&identity).await?;
            show_profile(&profile, format)
        }

        Commands::Search { query } => {
            let profile = service.search(&query).await?;
            show_profile(&profile, format)
        }

        Commands::Transport { usn, opted, due } => {
            if opted.is_none() && due.is_none() {
                return Err(FeeError::InvalidArgument(
                    "nothing to update: pass --opted and/or --due".to_string(),
                ));
            }
            info!("Transport update for {}", usn);
            let profile = service
                .update_transport(
                    &usn,
                    TransportUpdate {
                        transport_opted: opted,
                        transport_fee_due: due,
                    },
                )
                .await?;
            show_profile(&profile, format)
        }

        Commands::College { usn, due } => {
            info!("College fee update for {}", usn);
            let profile = service.update_college_fee(&usn, due).await?;
            show_profile(&profile, format)
        }

        Commands::Pay {
            usn,
            category,
            semester,
            amount,
            mode,
            reference,
            yes,
        } => {
            let payment = PaymentConfirmation {
                semester,
                fee_type: category.into(),
                amount,
                mode,
                reference,
            };

            if !yes
                && !utils::confirm_action(&format!(
                    "Record {} payment of {} for {} semester {}?",
                    payment.fee_type,
                    utils::format_amount(payment.amount),
                    usn,
                    semester
                ))
            {
                println!("Cancelled");
                return Ok(());
            }

            let profile = service.confirm_payment(&usn, payment).await?;
            println!("{}", "✓ Payment recorded".green());
            show_profile(&profile, format)
        }

        Commands::Override { usn, value } => {
            let profile = service.set_override(&usn, value.into()).await?;
            show_profile(&profile, format)
        }

        Commands::LastSemDues { usn, amount } => {
            let profile = service.set_last_sem_dues(&usn, amount).await?;
            show_profile(&profile, format)
        }

        Commands::Status { usn, status } => {
            let profile = service.set_status(&usn, status.into()).await?;
            show_profile(&profile, format)
        }

        Commands::Eligibility { user, name, usn } => {
            let result = match (user, usn) {
                (Some(user_id), _) => {
                    let identity = Identity {
                        name: name.unwrap_or_else(|| user_id.clone()),
                        user_id,
                    };
                    service.check_eligibility(&identity).await?
                }
                (None, Some(usn)) => service.eligibility_of(&usn).await?,
                (None, None) => {
                    return Err(FeeError::InvalidArgument(
                        "pass --user or --usn".to_string(),
                    ))
                }
            };
            show_eligibility(&result, format)
        }

        Commands::History { usn } => {
            let profile = service.get(&usn).await?;
            show_history(&profile, format)
        }

        Commands::Stats => {
            let stats = service.stats().await?;
            show_stats(&stats, format)
        }
    }
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing fee ledger...".green());
    let _db = Database::new(&config.database.path)?;
    println!("{}", "✓ Database initialized".green());
    println!("{}", "✓ Configuration loaded".green());
    println!("\n{}", "Configuration:".cyan());
    println!("  Database:         {}", config.database.path);
    println!("  Odd sem needs:    {}%", config.eligibility.odd_sem_threshold);
    println!("  Even sem needs:   {}%", config.eligibility.even_sem_threshold);
    println!("  College dept:     {}", config.ledger.college_department);
    println!("  Transport dept:   {}", config.ledger.transport_department);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!(
        "  {} to enrol a student",
        "fee-ledger enrol 1AB21CS001 --user u1 --name Asha --year 2".yellow()
    );
    println!(
        "  {} to assign the year's college fee",
        "fee-ledger college 1AB21CS001 90000".yellow()
    );
    println!(
        "  {} to check eligibility",
        "fee-ledger eligibility --usn 1AB21CS001".yellow()
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_profile(profile: &StudentFeeProfile, format: OutputFormat) -> error::Result<()> {
    if format == OutputFormat::Json {
        return print_json(profile);
    }

    println!("\n{}", format!("=== {} ({}) ===", profile.name, profile.usn).cyan().bold());
    println!("Year:              {}", profile.current_year);
    println!("Status:            {}", profile.status);
    println!("Transport opted:   {}", utils::format_flag(profile.transport_opted));
    println!("College fee due:   {}", utils::format_amount(profile.college_fee_due));
    println!("Transport fee due: {}", utils::format_amount(profile.transport_fee_due));
    println!("Last sem dues:     {}", utils::format_amount(profile.last_sem_dues));
    println!(
        "Override:          {}",
        match profile.eligibility_override {
            Some(true) => "eligible".green().to_string(),
            Some(false) => "ineligible".red().to_string(),
            None => "none".to_string(),
        }
    );

    if !profile.fee_records.is_empty() {
        println!();
        utils::print_table_border(70);
        utils::print_table_row(
            &["Year", "Sem", "Category", "Due", "Paid", "Status"],
            &[6, 5, 11, 14, 14, 10],
        );
        utils::print_table_border(70);
        for record in &profile.fee_records {
            utils::print_table_row(
                &[
                    &record.year.to_string(),
                    &record.semester.to_string(),
                    record.fee_type.as_str(),
                    &utils::group_digits(record.amount_due),
                    &utils::group_digits(record.amount_paid),
                    &utils::format_status(record.status),
                ],
                &[6, 5, 11, 14, 14, 10],
            );
        }
        utils::print_table_border(70);
    }

    Ok(())
}

fn show_eligibility(result: &EligibilityResult, format: OutputFormat) -> error::Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }

    let student = &result.student;
    println!("\n{}", "=== Exam Eligibility ===".cyan().bold());
    println!("Student:           {} ({})", student.name, student.usn);
    println!("Paid this year:    {}", utils::format_percentage(result.percentage_paid));
    println!("Odd sem exams:     {}", utils::format_flag(result.eligible_for_odd_sem));
    println!("Even sem exams:    {}", utils::format_flag(result.eligible_for_even_sem));
    println!("Eligible:          {}", utils::format_flag(result.is_eligible));

    if !result.reasons.is_empty() {
        println!("\n{}", "Reasons:".yellow());
        for reason in &result.reasons {
            println!("  - {}", reason);
        }
    }

    Ok(())
}

fn show_history(profile: &StudentFeeProfile, format: OutputFormat) -> error::Result<()> {
    if format == OutputFormat::Json {
        return print_json(&profile.fee_records);
    }

    println!("\n{}", format!("=== Fee history for {} ===", profile.usn).cyan().bold());
    utils::print_table_border(100);
    utils::print_table_row(
        &["Date", "Sem", "Category", "Amount", "Mode", "Reference"],
        &[24, 5, 11, 12, 16, 30],
    );
    utils::print_table_border(100);

    for record in &profile.fee_records {
        for tx in &record.transactions {
            utils::print_table_row(
                &[
                    &utils::format_timestamp(&tx.date),
                    &record.semester.to_string(),
                    record.fee_type.as_str(),
                    &utils::group_digits(tx.amount),
                    &tx.mode,
                    &tx.reference,
                ],
                &[24, 5, 11, 12, 16, 30],
            );
        }
    }
    utils::print_table_border(100);

    Ok(())
}

fn show_stats(stats: &LedgerStats, format: OutputFormat) -> error::Result<()> {
    if format == OutputFormat::Json {
        return print_json(stats);
    }

    println!("{}", "=== Fee Collection Statistics ===".cyan().bold());
    println!("\nStudents:          {}", stats.total_students);
    println!("\nFee records:");
    println!("  Total:           {}", stats.total_records);
    println!("  Paid:            {}", stats.paid_records.to_string().green());
    println!("  Partial:         {}", stats.partial_records.to_string().yellow());
    println!("  Pending:         {}", stats.pending_records.to_string().red());
    println!("\nAmounts:");
    println!("  Assigned:        {}", utils::format_amount(stats.total_assigned));
    println!("  Collected:       {}", utils::format_amount(stats.total_collected));
    println!("  Collection rate: {}", utils::format_percentage(stats.collection_rate()));
    println!("  Last sem dues:   {}", utils::format_amount(stats.total_last_sem_dues));

    Ok(())
}
