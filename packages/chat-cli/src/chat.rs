//! Interactive chat loop.

use agent_chat::{ChatConfig, ChatSession, MockResponder, SendOutcome, SkipReason, Transcript};
use agent_chat_client::ChatStore;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};

use crate::render;
use crate::Backend;

type Session = ChatSession<Backend, MockResponder>;

const HELP: &str = "/agent <id>  switch agent   /agents  list agents   /new  new conversation\n\
                    /clear  delete all messages   /history  show transcript   /quit  leave";

enum Line {
    Message(String),
    Agent(Option<String>),
    Agents,
    New,
    Clear,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Line {
    fn parse(input: &str) -> Self {
        let input = input.trim();
        let Some(command) = input.strip_prefix('/') else {
            return Line::Message(input.to_string());
        };

        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match name {
            "agent" => Line::Agent(arg.map(str::to_string)),
            "agents" => Line::Agents,
            "new" => Line::New,
            "clear" => Line::Clear,
            "history" => Line::History,
            "help" => Line::Help,
            "quit" | "exit" => Line::Quit,
            other => Line::Unknown(other.to_string()),
        }
    }
}

pub async fn run(
    store: Backend,
    config: ChatConfig,
    agent_id: Option<String>,
    conversation_id: Option<String>,
) -> Result<()> {
    let session = ChatSession::new(store, MockResponder::new(), config.session);

    let agents = session
        .store()
        .list_agents()
        .await
        .context("Failed to load agents")?;

    match agent_id {
        Some(id) => match agents.into_iter().find(|a| a.id == id) {
            Some(agent) => session.select_agent(agent),
            None => bail!("Unknown agent: {id}"),
        },
        None => {
            if !session.adopt_default_agent(&agents) {
                render::warning("No agents available. Add one with `agent-chat add-agent`.");
            }
        }
    }

    match conversation_id {
        Some(id) => {
            session.open_conversation(id.clone());
            render_history(&session, &id).await;
        }
        None => {
            session
                .ensure_conversation()
                .await
                .context("Failed to start a conversation")?;
        }
    }

    render::banner("Agent Chat");
    print_status(&session);
    render::notice(HELP);
    println!();

    loop {
        let prompt = match session.current_agent() {
            Some(agent) => format!("You → {}", agent.name),
            None => "You".to_string(),
        };

        let input = tokio::task::spawn_blocking(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await??;

        match Line::parse(&input) {
            Line::Message(text) => send(&session, &text).await,
            Line::Agent(Some(id)) => switch_agent(&session, &id).await,
            Line::Agent(None) | Line::Agents => list_agents(&session).await,
            Line::New => match session.start_new_conversation(None).await {
                Ok(conversation) => {
                    println!("{} {}", "✓ Started".green(), conversation.title.bold());
                }
                Err(error) => render::failure(&format!("Could not start a conversation: {error}")),
            },
            Line::Clear => match session.clear_current_conversation().await {
                Ok(true) => println!("{}", "✓ Conversation cleared".green()),
                Ok(false) => render::warning("No conversation to clear."),
                Err(error) => render::failure(&format!("Could not clear: {error}")),
            },
            Line::History => match session.current_conversation_id() {
                Some(id) => render_history(&session, &id).await,
                None => render::warning("No conversation open."),
            },
            Line::Help => render::notice(HELP),
            Line::Quit => break,
            Line::Unknown(name) => render::warning(&format!("Unknown command /{name}. Try /help.")),
        }
    }

    session.shutdown();
    println!("{}", "👋 Goodbye!".bright_blue());
    Ok(())
}

async fn send(session: &Session, text: &str) {
    // The reply comes from whoever is selected at send time
    let agent = session.current_agent();

    let outcome = match session.send_user_message(text).await {
        Ok(outcome) => outcome,
        Err(error) => {
            render::failure(&format!("Message not sent: {error}"));
            return;
        }
    };

    let reply = match outcome {
        SendOutcome::Sent { reply, .. } => reply,
        SendOutcome::Skipped(SkipReason::EmptyMessage) => return,
        SendOutcome::Skipped(SkipReason::NoAgent) => {
            render::warning("Select an agent first with /agent <id>.");
            return;
        }
        SendOutcome::Skipped(SkipReason::NoConversation) => {
            render::warning("No conversation open. Start one with /new.");
            return;
        }
    };

    let Some(agent) = agent else {
        return;
    };

    render::notice(&format!("{} is typing…", agent.name));
    match reply.wait().await {
        Ok(Some(message)) => render::reply(&agent, &message),
        Ok(None) => render::notice("Reply cancelled."),
        Err(error) => render::failure(&format!("{} could not reply: {error}", agent.name)),
    }
}

async fn switch_agent(session: &Session, id: &str) {
    match session.store().list_agents().await {
        Ok(agents) => match agents.into_iter().find(|a| a.id == id) {
            Some(agent) => {
                println!("{} {}", "✓ Now talking to".green(), agent.name.bold());
                session.select_agent(agent);
            }
            None => render::warning(&format!("Unknown agent: {id}")),
        },
        Err(error) => render::failure(&format!("Could not load agents: {error}")),
    }
}

async fn list_agents(session: &Session) {
    match session.store().list_agents().await {
        Ok(agents) => agents.iter().for_each(render::agent_row),
        Err(error) => render::failure(&format!("Could not load agents: {error}")),
    }
}

async fn render_history(session: &Session, conversation_id: &str) {
    match Transcript::fetch(session.store(), conversation_id).await {
        Ok(transcript) => render::transcript(&transcript),
        Err(error) => render::failure(&format!("Could not load history: {error}")),
    }
}

fn print_status(session: &Session) {
    let agent = session
        .current_agent()
        .map(|a| a.name)
        .unwrap_or_else(|| "none".to_string());
    let conversation = session
        .current_conversation_id()
        .unwrap_or_else(|| "none".to_string());
    render::notice(&format!("Agent: {agent}   Conversation: {conversation}"));
}
