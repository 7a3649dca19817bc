use clap::Parser;
use dotenv::dotenv;
use relay_chat::cli::{ Args, Command };
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();

    let default_filter = match (&args.command, args.debug) {
        (_, true) => "debug",
        (Command::Serve(_), false) => "info",
        (Command::Chat(_), false) => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    relay_chat::run(args).await
}
