//! Interactive travel-planning chat backed by Gemini.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; reads GEMINI_API_KEY or asks for it
//! travelbot
//!
//! # Use another model without Google Search grounding
//! travelbot --model gemini-2.5-pro --no-search
//!
//! # Disable colors (useful for piping output)
//! travelbot --no-color
//! ```
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/history` - Show the conversation so far
//! - `/stats` - Show session statistics
//! - `/config` - Show the current configuration
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use travelbot::{
    BotConfig, ChatCommand, ChatSession, CredentialResolver, MaskedPrompt, NoPrompt,
    PlainTextRenderer, Renderer, TravelArgs, help_text, parse_command,
};

const TITLE: &str = "🗺️ 您的專屬旅遊規劃機器人";
const INPUT_PROMPT: &str = "請輸入您的旅遊規劃需求... > ";
const THINKING: &str = "旅遊規劃師正在努力思考中...";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = TravelArgs::from_command_line_relaxed("travelbot [OPTIONS]");
    let config = BotConfig::try_from(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    renderer.print_banner(TITLE);

    let resolver = CredentialResolver::new();
    let credential = match MaskedPrompt::new() {
        Ok(mut prompt) => resolver.resolve(&mut prompt),
        Err(err) => {
            tracing::debug!(error = %err, "no terminal for the key prompt");
            resolver.resolve(&mut NoPrompt)
        }
    };

    let mut session = match ChatSession::connect(credential, config) {
        Ok(session) => session,
        Err(err) if err.is_missing_credential() => {
            renderer.print_info("請先輸入您的 API 金鑰以繼續。");
            return Ok(());
        }
        Err(err) => {
            renderer.print_error(&format!("初始化 Gemini 失敗：{err}"));
            renderer.print_info("請檢查您的 API 金鑰和網路連線。");
            return Ok(());
        }
    };

    renderer.print_info(&format!(
        "Model: {}. Type /help for commands, /quit to exit.\n",
        session.model()
    ));

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline(INPUT_PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("再見！");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::History => {
                            if session.message_count() == 0 {
                                renderer.print_info("(no messages yet)");
                            } else {
                                session.render_history(&mut renderer);
                            }
                        }
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::ShowConfig => print_config(&session),
                        ChatCommand::Invalid(message) => renderer.print_error(&message),
                    }
                    continue;
                }

                renderer.print_status(THINKING);
                if let Err(e) = session.send_streaming(line, &mut renderer).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\n再見！");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} completed / {} failed",
        stats.completed_turns, stats.failed_turns
    );
}

fn print_config(session: &ChatSession) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Max output tokens: {}", stats.max_output_tokens);
    println!("      Temperature: {:.2}", stats.temperature);
    println!(
        "      Google Search: {}",
        if stats.search_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    match stats.system_instruction.as_deref() {
        Some(instruction) => println!("      System instruction: {instruction}"),
        None => println!("      System instruction: (none)"),
    }
}
