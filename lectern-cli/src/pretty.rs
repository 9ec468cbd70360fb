use anyhow::Result;
use lectern::types::{Conversation, HistoryResponse, MessageKind, TutorChatReply};
use lectern::Session;
use std::io::Write;
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout() -> StandardStream {
    StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

pub fn pp_status(api_url: &str, state_dir: &Path, session: &Session) -> Result<()> {
    let mut stdout = stdout();
    stdout.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(&mut stdout, "Configuration")?;
    stdout.reset()?;
    writeln!(&mut stdout, "  LECTERN_API_URL: {}", api_url)?;
    writeln!(&mut stdout, "  LECTERN_STATE_DIR: {}", state_dir.display())?;

    stdout.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(&mut stdout, "Session")?;
    stdout.reset()?;
    if session.is_authenticated {
        write!(&mut stdout, "  logged in as ")?;
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        writeln!(&mut stdout, "{}", session.display_name().unwrap_or("<unnamed>"))?;
        stdout.reset()?;
        if session.token().is_some() {
            writeln!(&mut stdout, "  token: <configured>")?;
        } else {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(&mut stdout, "  token: <missing>")?;
            stdout.reset()?;
        }
    } else {
        stdout.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(&mut stdout, "  not logged in")?;
        stdout.reset()?;
    }
    Ok(())
}

pub fn pp_tutor_reply(reply: &TutorChatReply) -> Result<()> {
    let mut stdout = stdout();
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(&mut stdout, "{:<54}", "tutor")?;
    stdout.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(&mut stdout, "{}", reply.timestamp)?;
    stdout.reset()?;
    writeln!(&mut stdout, "{}", reply.message)?;
    Ok(())
}

pub fn pp_history(history: &HistoryResponse) -> Result<()> {
    let mut stdout = stdout();
    for conv in history.history.iter() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        write!(&mut stdout, "{:<16}", conv.id)?;
        stdout.reset()?;
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(&mut stdout, "{:<40.40}", conv.title)?;
        stdout.reset()?;
        stdout.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(
            &mut stdout,
            " {} messages, {}",
            conv.messageCount, conv.timestamp
        )?;
        stdout.reset()?;
        writeln!(&mut stdout, "  {:<70.70}", conv.preview)?;
    }
    stdout.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(&mut stdout, "{} conversations", history.total)?;
    stdout.reset()?;
    Ok(())
}

pub fn pp_conversation(conv: &Conversation) -> Result<()> {
    let mut stdout = stdout();
    stdout.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(&mut stdout, "{}", conv.title)?;
    stdout.reset()?;
    stdout.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(&mut stdout, "last updated {}\n", conv.lastUpdated)?;
    stdout.reset()?;

    for msg in conv.messages.iter() {
        let (label, color) = match msg.kind {
            MessageKind::System => ("system", Color::Magenta),
            MessageKind::User => ("you", Color::Yellow),
            MessageKind::Ai => ("tutor", Color::Cyan),
        };
        stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(&mut stdout, "{:<54}", label)?;
        stdout.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(&mut stdout, "{}", msg.timestamp.as_deref().unwrap_or(""))?;
        stdout.reset()?;
        writeln!(&mut stdout, "{}\n", msg.content)?;
    }
    Ok(())
}
