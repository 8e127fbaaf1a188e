//! Huddle terminal application
//!
//! Runs the meeting and chat room on a `huddle-runtime` instance and prints
//! what happens: roster changes with tile state, messages, typing, the
//! meeting clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use huddle_core::conversation::AttachmentUpload;
use huddle_core::types::{ParticipantId, Timestamp, UserId};
use huddle_core::{ConversationSnapshot, SessionSnapshot, SyntheticMediaDevices};
use huddle_runtime::{
    AppEvent, Command, ConversationCommand, DemoScript, RuntimeBuilder,
    RuntimeHandle, SessionCommand, CURRENT_USER_ID,
};

use crate::config::CliAppConfig;
use crate::error::{CliError, Result};
use crate::stage::Stage;
use crate::terminal::{describe_event, render_message, render_session_header};

/// Print the meeting header every this many seconds
const HEADER_EVERY_SECS: u64 = 10;

// ----------------------------------------------------------------------------
// Attachments
// ----------------------------------------------------------------------------

/// Parse `NAME:MIME:BYTES` into an upload
pub fn parse_attachment(arg: &str) -> Result<AttachmentUpload> {
    let mut parts = arg.rsplitn(3, ':');
    let (Some(size), Some(mime), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CliError::Runtime(format!(
            "Attachment '{}' is not NAME:MIME:BYTES",
            arg
        )));
    };
    let size = size
        .parse::<u64>()
        .map_err(|_| CliError::Runtime(format!("Attachment size '{}' is not a number", size)))?;
    Ok(AttachmentUpload::new(name, mime, size))
}

// ----------------------------------------------------------------------------
// Interactive Input
// ----------------------------------------------------------------------------

/// One line typed in interactive mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Command(Command),
    PictureInPicture(ParticipantId),
    Roster,
    Help,
    Quit,
    Say(String),
    Empty,
}

impl InputLine {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(if line.is_empty() {
                InputLine::Empty
            } else {
                InputLine::Say(line.to_string())
            });
        };

        let mut words = rest.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let argument = words.next();
        let parsed = match (verb, argument) {
            ("mute", _) => InputLine::Command(SessionCommand::ToggleAudio.into()),
            ("video", _) => InputLine::Command(SessionCommand::ToggleVideo.into()),
            ("share", _) => InputLine::Command(SessionCommand::ToggleScreenShare.into()),
            ("end", _) => InputLine::Command(SessionCommand::EndMeeting.into()),
            ("join", _) => InputLine::Command(SessionCommand::Initialize.into()),
            ("read", _) => InputLine::Command(ConversationCommand::MarkMessagesAsRead.into()),
            ("spotlight", Some(id)) => InputLine::Command(
                SessionCommand::ToggleSpotlight {
                    participant_id: ParticipantId::from(id),
                }
                .into(),
            ),
            ("pip", Some(id)) => InputLine::PictureInPicture(ParticipantId::from(id)),
            ("roster", _) => InputLine::Roster,
            ("help", _) => InputLine::Help,
            ("quit", _) | ("exit", _) => InputLine::Quit,
            _ => return Err(CliError::Runtime(format!("Unknown command '{}'", line))),
        };
        Ok(parsed)
    }
}

const HELP: &str = "\
/mute /video /share      toggle microphone, camera, screen sharing
/spotlight <id>          spotlight a participant (again to clear)
/pip <id>                toggle picture-in-picture for a tile
/roster                  show the participants
/read                    mark all messages read
/join /end               join or leave the meeting
/quit                    exit
anything else            send it as a chat message";

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

pub struct HuddleApp {
    config: CliAppConfig,
    runtime: RuntimeHandle,
    stage: Stage,
    current_user: UserId,
}

impl HuddleApp {
    pub async fn new(config: CliAppConfig, deny_media: bool) -> Result<Self> {
        let devices = Arc::new(SyntheticMediaDevices::new());
        devices.set_user_media_denied(deny_media);

        let history = if config.cli.load_history {
            DemoScript::history(Timestamp::now())
        } else {
            Vec::new()
        };

        let runtime = RuntimeBuilder::new()
            .with_config(config.huddle_config())
            .with_devices(devices)
            .with_history(history)
            .with_simulation(config.simulation_config())
            .build_and_start()
            .await?;

        Ok(Self {
            stage: Stage::new(config.cli.picture_in_picture),
            config,
            runtime,
            current_user: UserId::from(CURRENT_USER_ID),
        })
    }

    fn session(&self) -> SessionSnapshot {
        self.runtime.session_state().borrow().clone()
    }

    fn conversation(&self) -> ConversationSnapshot {
        self.runtime.conversation_state().borrow().clone()
    }

    /// Join the meeting and follow it until it ends, `duration` passes or
    /// Ctrl-C is pressed
    pub async fn run_meeting(&mut self, duration: Option<u64>, share_screen: bool) -> Result<()> {
        let mut events = self.runtime.subscribe();
        self.runtime.send_command(SessionCommand::Initialize).await?;
        if share_screen {
            self.runtime
                .send_command(SessionCommand::ToggleScreenShare)
                .await?;
        }

        let mut deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        // a failed join leaves nothing to wait for
                        let finished = match event {
                            AppEvent::SessionEnded => true,
                            AppEvent::SessionError { .. } => !self.session().active,
                            _ => false,
                        };
                        self.on_event(&event).await?;
                        if finished {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => warn!("Missed {} app events", missed),
                    Err(RecvError::Closed) => break,
                },
                _ = until(deadline) => {
                    info!("Meeting time is up, leaving");
                    deadline = None;
                    self.runtime.send_command(SessionCommand::EndMeeting).await?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, leaving the meeting");
                    self.runtime.send_command(SessionCommand::EndMeeting).await?;
                }
            }
        }
        Ok(())
    }

    /// Send `messages` one after another, then listen for `wait` seconds
    pub async fn run_chat(
        &mut self,
        messages: Vec<String>,
        mut uploads: Vec<AttachmentUpload>,
        wait: u64,
    ) -> Result<()> {
        let mut events = self.runtime.subscribe();
        self.print_transcript();

        for content in messages {
            self.say(content, std::mem::take(&mut uploads)).await?;
        }
        if !uploads.is_empty() {
            self.say(String::new(), uploads).await?;
        }

        let deadline = Instant::now() + Duration::from_secs(wait);
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.on_event(&event).await?,
                    Err(RecvError::Lagged(missed)) => warn!("Missed {} app events", missed),
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until(deadline) => break,
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        let unread = self.conversation().unread;
        if unread > 0 {
            println!("{} unread message(s), marking them read", unread);
            self.runtime
                .send_command(ConversationCommand::MarkMessagesAsRead)
                .await?;
        }
        Ok(())
    }

    /// Join the meeting and take commands and messages from stdin
    pub async fn run_interactive(&mut self) -> Result<()> {
        let mut events = self.runtime.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{}", HELP);
        self.print_transcript();
        self.runtime.send_command(SessionCommand::Initialize).await?;

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.on_event(&event).await?,
                    Err(RecvError::Lagged(missed)) => warn!("Missed {} app events", missed),
                    Err(RecvError::Closed) => break,
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match InputLine::parse(&line) {
                        Ok(InputLine::Quit) => break,
                        Ok(input) => self.on_input(input).await?,
                        Err(e) => println!("{}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }

    async fn on_input(&mut self, input: InputLine) -> Result<()> {
        match input {
            InputLine::Command(command) => self.runtime.send_command(command).await?,
            InputLine::PictureInPicture(participant_id) => {
                if !self.stage.toggle_picture_in_picture(&participant_id).await {
                    println!("No tile for {}", participant_id);
                }
            }
            InputLine::Roster => self.print_roster(),
            InputLine::Help => println!("{}", HELP),
            InputLine::Say(content) => self.say(content, Vec::new()).await?,
            InputLine::Quit | InputLine::Empty => {}
        }
        Ok(())
    }

    /// Type, send, stop typing
    async fn say(&self, content: String, attachments: Vec<AttachmentUpload>) -> Result<()> {
        self.runtime
            .send_command(ConversationCommand::SetUserTyping { is_typing: true })
            .await?;
        self.runtime
            .send_command(ConversationCommand::SendMessage {
                content,
                attachments,
            })
            .await?;
        self.runtime
            .send_command(ConversationCommand::SetUserTyping { is_typing: false })
            .await?;
        Ok(())
    }

    async fn on_event(&mut self, event: &AppEvent) -> Result<()> {
        let session = self.session();
        if matches!(
            event,
            AppEvent::SessionStarted { .. }
                | AppEvent::SessionEnded
                | AppEvent::RosterChanged { .. }
                | AppEvent::ParticipantUpdated { .. }
                | AppEvent::LocalMediaChanged { .. }
        ) {
            self.stage.sync(&session).await;
        }

        if self.config.cli.json_events {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        match event {
            AppEvent::MessageSent { message_id } | AppEvent::MessageReceived { message_id, .. } => {
                if let Some(message) = self
                    .conversation()
                    .messages
                    .iter()
                    .find(|m| &m.id == message_id)
                {
                    println!("{}", render_message(message, &self.current_user));
                }
            }
            AppEvent::MeetingClock { elapsed_secs } if elapsed_secs % HEADER_EVERY_SECS == 0 => {
                println!("{}", render_session_header(&session));
            }
            AppEvent::SpeakerChanged {
                participant_id: Some(id),
            } => {
                if let Some(speaker) = session.participants.iter().find(|p| &p.id == id) {
                    println!("* {} is speaking", speaker.name);
                }
            }
            AppEvent::RosterChanged { .. }
            | AppEvent::ParticipantUpdated { .. }
            | AppEvent::SpotlightChanged { .. } => {
                if let Some(text) = describe_event(event) {
                    println!("* {}", text);
                }
                self.print_roster();
            }
            other => match describe_event(other) {
                Some(text) => println!("* {}", text),
                None => debug!("App event: {:?}", other),
            },
        }
        Ok(())
    }

    fn print_roster(&self) {
        let session = self.session();
        if !session.active {
            println!("Not in a meeting");
            return;
        }
        println!("{}", render_session_header(&session));
        for line in self.stage.roster(&session) {
            println!("  {}", line);
        }
    }

    fn print_transcript(&self) {
        let conversation = self.conversation();
        for message in &conversation.messages {
            println!("{}", render_message(message, &self.current_user));
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.runtime.shutdown().await?;
        Ok(())
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attachment() {
        let upload = parse_attachment("slides.pdf:application/pdf:20480").unwrap();
        assert_eq!(upload, AttachmentUpload::new("slides.pdf", "application/pdf", 20_480));

        assert!(parse_attachment("slides.pdf").is_err());
        assert!(parse_attachment("a.png:image/png:big").is_err());
    }

    #[test]
    fn test_parse_input_lines() {
        assert_eq!(
            InputLine::parse("hello there").unwrap(),
            InputLine::Say("hello there".to_string())
        );
        assert_eq!(InputLine::parse("   ").unwrap(), InputLine::Empty);
        assert!(matches!(
            InputLine::parse("/mute").unwrap(),
            InputLine::Command(Command::Session(SessionCommand::ToggleAudio))
        ));
        assert_eq!(
            InputLine::parse("/pip local-user").unwrap(),
            InputLine::PictureInPicture(ParticipantId::local())
        );
        assert!(InputLine::parse("/spotlight").is_err());
        assert!(InputLine::parse("/dance").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_app_runs_short_meeting() {
        let mut config = CliAppConfig::default();
        config.simulation.seed = Some(3);
        config.cli.json_events = true;

        let mut app = HuddleApp::new(config, false).await.unwrap();
        app.run_meeting(Some(2), false).await.unwrap();

        let session = app.session();
        assert!(!session.active);
        assert!(app.stage.tile(&ParticipantId::local()).is_none());
        app.shutdown().await.unwrap();
    }
}
