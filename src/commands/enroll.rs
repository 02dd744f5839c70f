//! The enroll command: build an envelope, run the enrollment job, stream
//! progress.
//!
//! The alias, card, and envelope are recorded durably before the browser
//! launches; a crash mid-run loses only browser progress, never an issued
//! alias or card.

use std::sync::Arc;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Config;
use crate::enroll::{CdpBackend, EnrollmentContext, EnrollmentMachine, FlavorRegistry, Step};
use crate::error::Result;
use crate::identity;
use crate::jobs::JobSupervisor;
use crate::providers::{AliasClient, AliasProvider, CardClient, CardProvider};
use crate::store::ContextStore;

pub struct EnrollArgs {
    pub url: String,
    pub context: Option<String>,
    pub seed: Option<String>,
    pub headed: bool,
}

pub async fn run(args: EnrollArgs, config: &Config, store: &ContextStore) -> Result<()> {
    let seed = args.seed.unwrap_or_else(identity::seed_phrase);
    let context_name = args.context.unwrap_or_else(|| seed.clone());
    let identity = identity::generate(Some(&seed));

    println!(
        "  Context {} as {} ({})",
        context_name.bold(),
        identity.full_name,
        seed.dimmed()
    );

    // Durable records first, browser second.
    let alias_client = AliasClient::new(&config.alias.base_url, &config.alias.api_key)?;
    let alias = alias_client.create(&context_name, &identity).await?;
    info!(email = %alias.email, "alias created");

    let card_client = CardClient::new(&config.card.base_url, &config.card.api_key)?;
    let card = card_client
        .create(&context_name, config.card.spend_limit_cents)
        .await?;
    info!(last_four = %card.last_four, "card issued");

    store.save(
        &context_name,
        identity.clone(),
        alias.clone(),
        card.clone(),
        Some(args.url.clone()),
    )?;

    let machine = Arc::new(EnrollmentMachine::new(
        Arc::new(CdpBackend::new(config.enroll.headless && !args.headed)),
        Arc::new(FlavorRegistry::new(config.overrides.clone())),
        config.enroll.settings(),
    ));
    let supervisor = JobSupervisor::new();
    let ctx = EnrollmentContext {
        identity,
        alias,
        card,
    };
    let job_id = supervisor.spawn_enrollment(machine, args.url.clone(), ctx);
    let mut subscription = supervisor.subscribe(&job_id)?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                bar.set_position(u64::from(event.percent_complete));
                bar.set_message(format!("{}: {}", event.step, event.message));
                if matches!(event.step, Step::Complete | Step::Error) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                bar.set_message("cancelling...".to_string());
                supervisor.cancel(&job_id)?;
            }
        }
    }
    // Drain anything emitted between the terminal event and the seal.
    while subscription.next().await.is_some() {}
    bar.finish_and_clear();

    let result = supervisor
        .result(&job_id)
        .unwrap_or_else(|| crate::enroll::EnrollmentResult::failed("job vanished", Vec::new()));

    if result.success {
        match &result.matched_signal {
            Some(signal) => println!(
                "  {} enrollment confirmed (matched \"{signal}\")",
                "✓".green().bold()
            ),
            None => println!(
                "  {} submitted; confirmation likely waiting in the alias inbox",
                "✓".yellow().bold()
            ),
        }
        if let Some(token) = &result.extracted_token {
            println!("  issued token: {}", token.bold());
        }
    } else {
        println!(
            "  {} enrollment failed: {}",
            "✗".red().bold(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    for shot in &result.screenshots {
        println!("  screenshot: {}", shot.dimmed());
    }

    Ok(())
}
