use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ethers::types::Address;
use onclick_pay::{
    client::OnClickClient,
    config::Config,
    models::{from_minor_units, FlowState, Role},
    services::PageDraft,
};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "pay-agent", about = "Pay or publish OnClick pages from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pay a page in USDC, approving the contract first if needed
    Pay {
        handle: String,
        amount: Decimal,
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Show a page and its recent payments
    Page { handle: String },
    /// Create a page, or update it with --update
    Publish {
        handle: String,
        #[arg(long, default_value = "freelancer")]
        role: Role,
        /// Payout wallet, defaults to the signing wallet
        #[arg(long)]
        wallet: Option<Address>,
        /// Crowdfunding goal in USDC
        #[arg(long, default_value = "0")]
        goal: Decimal,
        /// Unix timestamp in seconds
        #[arg(long, default_value_t = 0)]
        deadline: u64,
        #[arg(long)]
        update: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = OnClickClient::connect(&config).await?;

    println!("OnClick Pay Agent");
    println!("=================");
    println!("Network: {}", client.network());
    println!("Wallet:  {:?}", client.session().owner);
    println!();

    match cli.command {
        Command::Pay {
            handle,
            amount,
            message,
        } => pay(&client, &handle, amount, &message).await,
        Command::Page { handle } => show_page(&client, &handle).await,
        Command::Publish {
            handle,
            role,
            wallet,
            goal,
            deadline,
            update,
        } => {
            let draft = PageDraft {
                handle,
                role,
                wallet_address: wallet.unwrap_or(client.session().owner),
                goal,
                deadline,
            };
            let tx = if update {
                client.publisher.update_page(&draft).await?
            } else {
                client.publisher.create_page(&draft).await?
            };
            println!("[OK] Page {} published", draft.handle);
            println!("   {}", client.network().tx_url(tx));
            Ok(())
        }
    }
}

async fn pay(client: &OnClickClient, handle: &str, amount: Decimal, message: &str) -> Result<()> {
    let mut transitions = client.flow.transitions();
    let network = client.network();

    let printer = tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(status) => {
                    match status.state {
                        FlowState::Idle => println!("Checking balance and allowance..."),
                        FlowState::Approving => println!("Step 1: Approving USDC spend..."),
                        FlowState::Paying => println!("Step 2: Sending payment..."),
                        FlowState::Success => {
                            if let Some(tx) = status.payment_tx {
                                println!("   [OK] Payment confirmed: {}", network.tx_url(tx));
                            }
                        }
                        FlowState::Error => {}
                    }
                    if matches!(status.state, FlowState::Success | FlowState::Error) {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = client.flow.start_payment(handle, amount, message).await?;
    let _ = printer.await;

    match state {
        FlowState::Success => {
            client.pages.invalidate(handle).await;
            println!("[SUCCESS] Paid {} USDC to {}", amount, handle);
            Ok(())
        }
        _ => {
            let reason = client
                .flow
                .error_message()
                .unwrap_or_else(|| "Payment did not complete".to_string());
            bail!("[FAILED] {}", reason)
        }
    }
}

async fn show_page(client: &OnClickClient, handle: &str) -> Result<()> {
    let Some(page) = client.pages.page(handle).await? else {
        bail!("No page registered for handle {}", handle);
    };

    println!("Page:      {} ({})", page.handle, page.role);
    println!("Payout:    {}", client.network().address_url(page.wallet_address));
    println!("Raised:    {} USDC from {} supporters", from_minor_units(page.total_raised), page.supporter_count);
    if page.has_goal() {
        let reached = client.pages.is_goal_reached(handle).await?;
        println!(
            "Goal:      {} USDC{}",
            from_minor_units(page.goal),
            if reached { " (reached)" } else { "" }
        );
    }

    let payments = client.pages.payments(handle).await?;
    println!();
    println!("Recent payments:");
    for payment in payments.iter().rev().take(10) {
        println!(
            "   {} USDC from {:?}{}",
            from_minor_units(payment.amount),
            payment.supporter,
            if payment.message.is_empty() {
                String::new()
            } else {
                format!(": \"{}\"", payment.message)
            }
        );
    }

    Ok(())
}
