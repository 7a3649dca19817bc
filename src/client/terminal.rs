use std::error::Error;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };
use log::error;

use super::{ ChatSession, SubmitError };
use crate::models::chat::{ Message, Role };

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Quit,
    Clear,
    Blank,
    Turn(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    match line.trim() {
        "" => Input::Blank,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        _ => Input::Turn(line),
    }
}

pub fn render(message: &Message) -> String {
    let label = match message.role() {
        Role::User => "you",
        Role::Model => "model",
    };
    format!("{}> {}", label, message.content())
}

async fn prompt(stdout: &mut tokio::io::Stdout) -> std::io::Result<()> {
    stdout.write_all(b"> ").await?;
    stdout.flush().await
}

/// Line-oriented chat loop over stdin/stdout. Turns run one at a time, so
/// input typed while a reply is pending is read only after it arrives.
pub async fn run(session: ChatSession) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut stdout = tokio::io::stdout();
    for message in session.history().await {
        println!("{}", render(&message));
    }
    println!("Type a message, /clear to wipe history, /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&mut stdout).await?;
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Quit => {
                break;
            }
            Input::Blank => {}
            Input::Clear => {
                match session.clear().await {
                    Ok(()) => println!("History cleared."),
                    Err(e) => error!("Failed to clear history: {}", e),
                }
            }
            Input::Turn(text) => {
                match session.submit(text).await {
                    Ok(reply) => println!("{}", render(&reply)),
                    Err(SubmitError::EmptyInput) => {}
                    Err(e) => println!("({})", e),
                }
            }
        }
        prompt(&mut stdout).await?;
    }

    Ok(())
}
