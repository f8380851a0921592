//! Sends a test embed to a webhook so a new deployment can be verified
//! without waiting for forum activity. The webhook URL comes from the
//! first CLI argument or `DISCORD_WEBHOOK_URL`.

use threadwatch::notify::discord::DiscordNotifier;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let webhook = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DISCORD_WEBHOOK_URL").ok());
    let Some(webhook) = webhook else {
        eprintln!("usage: webhook_check <webhook-url>   (or set DISCORD_WEBHOOK_URL)");
        return std::process::ExitCode::FAILURE;
    };

    let notifier = DiscordNotifier::new(webhook);
    if notifier.check_webhook().await {
        println!("webhook ok");
        std::process::ExitCode::SUCCESS
    } else {
        eprintln!("webhook test failed");
        std::process::ExitCode::FAILURE
    }
}
