//! Terminal rendering for agents, conversations and transcripts.

use agent_chat::{Author, Transcript, TranscriptEntry};
use agent_chat_client::{Agent, ChatMessage, Conversation};
use colored::Colorize;
use console::style;

pub fn banner(title: &str) {
    println!("{}", "╔════════════════════════════════════════╗".bright_cyan());
    println!("{}", format!("║  {:<38}║", title).bright_cyan());
    println!("{}", "╚════════════════════════════════════════╝".bright_cyan());
    println!();
}

pub fn agent_row(agent: &Agent) {
    let default = if agent.is_default { " (default)" } else { "" };
    println!(
        "  {} {} {}{}",
        style(format!("[{}]", agent.avatar)).cyan().bold(),
        agent.name.bold(),
        style(&agent.role).dim(),
        style(default).dim()
    );
    println!("      {}  {}", style(&agent.id).dim(), agent.description);
}

pub fn conversation_row(conversation: &Conversation) {
    println!(
        "  {}  {}  {}",
        style(&conversation.id).dim(),
        conversation.title.bold(),
        style(conversation.updated_at.format("%Y-%m-%d %H:%M")).dim()
    );
}

pub fn transcript(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("{}", style("No messages yet.").dim());
        return;
    }
    for entry in transcript.entries() {
        transcript_entry(entry);
    }
}

pub fn transcript_entry(entry: &TranscriptEntry) {
    let speaker = match &entry.author {
        Author::User => "You".bright_green().bold(),
        Author::Agent(agent) => agent.name.bright_blue().bold(),
        Author::Dangling { .. } => "Unknown agent".yellow().bold(),
    };
    message(&speaker.to_string(), &entry.message);
}

pub fn reply(agent: &Agent, reply: &ChatMessage) {
    message(&agent.name.bright_blue().bold().to_string(), reply);
}

fn message(speaker: &str, message: &ChatMessage) {
    println!(
        "{} {} {}",
        style(message.created_at.format("%H:%M")).dim(),
        speaker,
        message.content
    );
}

pub fn notice(text: &str) {
    println!("{}", style(text).dim());
}

pub fn warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn failure(text: &str) {
    println!("{}", text.red());
}
