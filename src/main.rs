//! EventHub command-line client
//!
//! Main application entry point

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use EventHub::{
    config::Settings,
    engagement::{JoinOutcome, LeaveOutcome, ReviewDeletion},
    models::{CardDetails, ReviewDraft},
    services::{AutoConfirm, Confirmer, HistoryNavigator, Navigator, Route, ServiceFactory, TerminalConfirmer, TracingSink},
    utils::{errors::PaymentError, helpers::format_amount, logging},
    EventHubError,
};

#[derive(Debug, Parser)]
#[command(name = "eventhub", version, about = "Join, pay for, leave and review marketplace events")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show an event with your eligibility and its reviews
    Show { event_id: String },
    /// Join an event; paid events need card details
    Join {
        event_id: String,
        #[command(flatten)]
        card: CardArgs,
    },
    /// Leave an event
    Leave { event_id: String },
    /// Review an event (updates your existing review)
    Review {
        event_id: String,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Delete your review of an event
    DeleteReview { event_id: String },
    /// Delete an event you host (or any event, as an admin)
    DeleteEvent { event_id: String },
    /// Print the effective configuration
    PrintConfig,
}

#[derive(Debug, Args)]
struct CardArgs {
    #[arg(long)]
    card_number: Option<String>,
    #[arg(long)]
    exp_month: Option<u32>,
    #[arg(long)]
    exp_year: Option<i32>,
    #[arg(long)]
    cvc: Option<String>,
}

impl CardArgs {
    fn card(&self) -> Option<CardDetails> {
        match (&self.card_number, self.exp_month, self.exp_year, &self.cvc) {
            (Some(number), Some(month), Some(year), Some(cvc)) => {
                Some(CardDetails::new(number.clone(), month, year, cvc.clone()))
            }
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    settings.validate()?;

    if let Command::PrintConfig = cli.command {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;
    info!("Starting {}", EventHub::info());

    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(TerminalConfirmer)
    };
    let navigator = HistoryNavigator::starting_at(Route::Events);
    let services = ServiceFactory::new(settings, Arc::new(navigator.clone()), confirmer, Arc::new(TracingSink))?;

    if services.bootstrap_session().await?.is_none() {
        info!("No session token configured, continuing anonymously");
    }
    if services.session_needs_refresh() {
        info!("Session token expires soon; sign in again to refresh it");
    }

    let result = run(&services, cli.command).await;
    if let Some(Route::Login { return_to }) = navigator.current() {
        error!(return_to = ?return_to, "Session expired, please sign in again");
    }
    result
}

async fn run(services: &ServiceFactory, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show { event_id } => {
            let page = services.event_detail_page(event_id);
            let view = page.load().await?;
            let state = page.state();
            let event = &view.event;

            println!("{} [{}]", event.title, event.status);
            println!("  participants: {}/{}", event.current_participants, event.max_participants);
            if event.is_paid() {
                println!("  fee: {}", format_amount(event.joining_fee, &services.settings.payments.currency));
            }
            match state.reviews.average_rating {
                Some(avg) => println!("  rating: {:.1} ({} reviews)", avg, state.reviews.total_reviews),
                None => println!("  rating: no reviews yet"),
            }
            if view.can_join() {
                println!("  you can join this event");
            } else {
                for reason in &view.eligibility.reasons {
                    println!("  cannot join: {}", reason);
                }
            }
            if let Some(review) = &state.my_review {
                println!("  your review: {}/5", review.rating);
            }
        }
        Command::Join { event_id, card } => {
            let page = services.event_detail_page(event_id);
            page.load().await?;
            match page.join().await? {
                JoinOutcome::Joined(view) => {
                    println!("Joined {} ({} participants)", view.event.title, view.event.current_participants);
                }
                JoinOutcome::CheckoutRequired(request) => {
                    let Some(card) = card.card() else {
                        bail!(
                            "{} costs {}; pass --card-number, --exp-month, --exp-year and --cvc",
                            request.event_title(),
                            format_amount(request.amount(), &services.settings.payments.currency)
                        );
                    };
                    let checkout = services.checkout_page(request)?;
                    checkout.mount().await?;
                    match checkout.submit(&card).await {
                        Ok(outcome) => println!("Payment {} confirmed", outcome.record.payment_intent_id),
                        Err(e @ (EventHubError::Inconsistency { .. }
                        | EventHubError::Payment(PaymentError::GatewayUnavailable(_)))) => {
                            // one immediate retry with the same intent
                            error!(error = %e, "Retrying payment confirmation");
                            let outcome = checkout.retry_confirmation().await?;
                            println!("Payment {} confirmed", outcome.record.payment_intent_id);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
        Command::Leave { event_id } => {
            let page = services.event_detail_page(event_id);
            page.load().await?;
            match page.leave().await? {
                LeaveOutcome::Left(view) => println!("Left {}", view.event.title),
                LeaveOutcome::Cancelled => println!("Cancelled"),
            }
        }
        Command::Review { event_id, rating, comment } => {
            let page = services.event_detail_page(event_id);
            page.load().await?;
            let submission = page.submit_review(&ReviewDraft::new(rating, comment)).await?;
            println!("Review {:?}: {}/5", submission.action, submission.review.rating);
        }
        Command::DeleteReview { event_id } => {
            let page = services.event_detail_page(event_id);
            page.load().await?;
            match page.delete_review().await? {
                ReviewDeletion::Deleted { .. } => println!("Review deleted"),
                ReviewDeletion::Cancelled => println!("Cancelled"),
            }
        }
        Command::DeleteEvent { event_id } => {
            let page = services.event_detail_page(event_id);
            page.load().await?;
            if page.delete_event().await? {
                println!("Event deleted");
            } else {
                println!("Cancelled");
            }
        }
        Command::PrintConfig => print!("{}", services.settings.to_toml()?),
    }
    Ok(())
}
