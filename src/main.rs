use std::path::Path;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::error;

use auxct_mailer::config::EmailConfig;
use auxct_mailer::context::{normalize_template_context, Context, CourseCatalog};
use auxct_mailer::error::Result;
use auxct_mailer::logging;
use auxct_mailer::mailer::{self, recipient_email};
use auxct_mailer::mailer::sendgrid::SendGridSender;
use auxct_mailer::mailer::template::TemplateEngine;
use auxct_mailer::records::MemberDatabase;

#[derive(Parser)]
#[command(name = "auxct-mailer")]
#[command(about = "Send personalized training notifications to AUXCT members")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Path to CSV file with training/competency records
    #[arg(long)]
    training_csv: String,
    /// Path to CSV file with member emails
    #[arg(long)]
    email_csv: Option<String>,
    /// Path to CSV file with course information
    #[arg(long)]
    courses_csv: Option<String>,
    /// Path to CSV file with unit details
    #[arg(long)]
    units_csv: Option<String>,
    /// Date the training data was extracted (MM/DD/YYYY); defaults to today
    #[arg(long)]
    extraction_date: Option<String>,
    /// Filter members by column values (e.g. Status=Certified)
    #[arg(long, num_args = 1.., value_name = "COLUMN=VALUE")]
    filter: Option<Vec<String>>,
}

#[derive(Args)]
struct TemplateArgs {
    /// Name of the email template file (in the templates directory)
    #[arg(long)]
    template: String,
    /// Email subject line (may use {{ variables }})
    #[arg(long)]
    subject: String,
    /// Custom templates directory (default: templates)
    #[arg(long)]
    template_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render without sending; optionally save HTML copies
    Preview {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        templates: TemplateArgs,
        /// Directory to save rendered HTML files
        #[arg(long)]
        save_html: Option<String>,
    },
    /// Render and send via the configured email provider
    Send {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        templates: TemplateArgs,
    },
}

fn main() -> ExitCode {
    logging::init_logging();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Preview {
            sources,
            templates,
            save_html,
        } => run_preview(&sources, &templates, save_html.as_deref()),
        Commands::Send { sources, templates } => run_send(&sources, &templates),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_members(sources: &SourceArgs) -> Result<Vec<Context>> {
    println!("Loading training data from {}...", sources.training_csv);
    if let Some(email_csv) = &sources.email_csv {
        println!("Loading email data from {email_csv}...");
    }
    if let Some(units_csv) = &sources.units_csv {
        println!("Loading unit details from {units_csv}...");
    }

    let mut db = MemberDatabase::new(
        &sources.training_csv,
        sources.email_csv.as_deref(),
        sources.units_csv.as_deref(),
    );

    let members = if let Some(filters) = &sources.filter {
        let criteria = parse_filters(filters);
        let members = db.filter_members(&criteria)?;
        println!("Found {} members matching filter criteria", members.len());
        members
    } else {
        let members = db.get_all_members()?;
        println!("Found {} total members", members.len());
        members
    };

    Ok(members)
}

fn parse_filters(filters: &[String]) -> Vec<(String, String)> {
    filters
        .iter()
        .filter_map(|f| f.split_once('='))
        .map(|(column, value)| (column.to_string(), value.to_string()))
        .collect()
}

fn run_preview(
    sources: &SourceArgs,
    templates: &TemplateArgs,
    save_html: Option<&str>,
) -> Result<ExitCode> {
    let members = load_members(sources)?;
    if members.is_empty() {
        println!("No members to email");
        return Ok(ExitCode::SUCCESS);
    }

    let catalog = CourseCatalog::load_optional(sources.courses_csv.as_deref());
    let engine = TemplateEngine::new(templates.template_dir.as_deref());

    println!("\n=== DRY RUN MODE ===");
    println!("Would send to {} recipients", members.len());
    println!("Template: {}", templates.template);
    println!("Subject: {}", templates.subject);

    if let Some(dir) = save_html {
        let save_path = Path::new(dir);
        std::fs::create_dir_all(save_path)?;

        println!("\n=== GENERATING HTML FILES ===");
        println!("Saving to: {}", save_path.display());

        for (idx, member) in members.iter().enumerate() {
            let context = normalize_template_context(
                member,
                catalog.as_ref(),
                sources.extraction_date.as_deref(),
            );
            let body_html = engine.render_file(&templates.template, &context)?;
            let filename = html_filename(&context);
            std::fs::write(save_path.join(&filename), body_html)?;

            let email = recipient_email(&context).unwrap_or_else(|| "N/A".to_string());
            println!(
                "[{}/{}] Saved HTML for {} -> {}",
                idx + 1,
                members.len(),
                email,
                filename
            );
        }

        println!(
            "\nGenerated {} HTML files in {}/",
            members.len(),
            save_path.display()
        );
    } else {
        let example = normalize_template_context(
            &members[0],
            catalog.as_ref(),
            sources.extraction_date.as_deref(),
        );
        println!("\nExample for first recipient:");
        println!(
            "  To: {}",
            recipient_email(&example).unwrap_or_else(|| "N/A".to_string())
        );
        println!("  Subject: {}", engine.render_str(&templates.subject, &example));
        let body = engine.render_file(&templates.template, &example)?;
        let preview: String = body.chars().take(200).collect();
        println!("  Body preview: {preview}...");
    }

    Ok(ExitCode::SUCCESS)
}

fn run_send(sources: &SourceArgs, templates: &TemplateArgs) -> Result<ExitCode> {
    let config = EmailConfig::from_env()?;
    let members = load_members(sources)?;
    if members.is_empty() {
        println!("No members to email");
        return Ok(ExitCode::SUCCESS);
    }

    let catalog = CourseCatalog::load_optional(sources.courses_csv.as_deref());
    let engine = TemplateEngine::new(templates.template_dir.as_deref());

    println!("\nSending emails via SendGrid...");
    let sender = SendGridSender::from_config(&config);
    let report = mailer::send_bulk_emails(
        &sender,
        &members,
        &engine,
        &templates.template,
        &templates.subject,
        catalog.as_ref(),
        sources.extraction_date.as_deref(),
    )?;

    println!("\n=== SUMMARY ===");
    println!("Successfully sent: {}", report.success.len());
    println!("Failed: {}", report.failed.len());

    if !report.failed.is_empty() {
        println!("\nFailed recipients:");
        for email in &report.failed {
            println!("  - {email}");
        }
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn html_filename(context: &Context) -> String {
    let cell = |key: &str| -> &str { context.get(key).and_then(Value::as_str).unwrap_or("") };
    let member_num = match cell("member_num") {
        "" => "unknown",
        num => num,
    };
    format!(
        "{}_{}_{}.html",
        member_num,
        cell("first_name"),
        cell("last_name")
    )
    .replace(' ', "_")
}
