//! Text rendering of the meeting and chat state

use huddle_core::conversation::{AttachmentKind, Message};
use huddle_core::session::format_duration;
use huddle_core::types::{Timestamp, UserId};
use huddle_core::{AppEvent, DisplayState, Participant, SessionSnapshot};

/// One roster line, e.g. `[J] Jane Smith  speaking ||| 80%`
pub fn render_participant(participant: &Participant, display: DisplayState) -> String {
    let initial = participant.avatar_initial().unwrap_or('?');
    let mut line = format!("[{}] {}", initial, participant.name);
    if participant.is_local() {
        line.push_str(" (you)");
    }

    let status = match display {
        DisplayState::Loading => "loading",
        DisplayState::VideoActive if participant.screen_sharing => "sharing screen",
        DisplayState::VideoActive => "video",
        DisplayState::VideoOff => "video off",
        DisplayState::Error => "video error",
    };
    line.push_str("  ");
    line.push_str(status);

    if participant.muted {
        line.push_str(", muted");
    } else if participant.is_audibly_speaking() {
        line.push_str(&format!(", speaking {}%", participant.audio_level_percent()));
    }
    if participant.spotlighted {
        line.push_str(", spotlight");
    }

    let bars = participant.network_bars();
    if bars > 0 {
        line.push_str(&format!("  {}{}", "|".repeat(bars as usize), ".".repeat(3 - bars as usize)));
    }
    line
}

/// Header with the meeting clock and grid size
pub fn render_session_header(snapshot: &SessionSnapshot) -> String {
    let layout = snapshot.grid_layout();
    let mut flags = Vec::new();
    if snapshot.audio_muted {
        flags.push("mic off");
    }
    if snapshot.video_off {
        flags.push("camera off");
    }
    if snapshot.screen_sharing {
        flags.push("sharing");
    }

    let mut header = format!(
        "{}  {} participant(s), {}x grid",
        format_duration(snapshot.duration_secs),
        snapshot.participants.len(),
        layout.wide_columns
    );
    if !flags.is_empty() {
        header.push_str(&format!("  [{}]", flags.join(", ")));
    }
    header
}

/// `HH:MM` of the timestamp in UTC
pub fn format_clock(timestamp: Timestamp) -> String {
    let minutes = timestamp.as_millis() / 60_000;
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

pub fn render_message(message: &Message, current_user: &UserId) -> String {
    let sender = if message.is_from(current_user) {
        "You"
    } else {
        message.sender.name.as_str()
    };
    let mut line = format!("{} {}: {}", format_clock(message.timestamp), sender, message.content);

    for attachment in &message.attachments {
        let icon = match attachment.kind {
            AttachmentKind::Image => "image",
            AttachmentKind::Document => "file",
            AttachmentKind::Other => "attachment",
        };
        line.push_str(&format!("\n    [{}] {}", icon, attachment.name));
        if let Some(size) = attachment.size_label() {
            line.push(' ');
            line.push_str(&size);
        }
    }
    line
}

/// Short description of an app event, or `None` for ones shown elsewhere
pub fn describe_event(event: &AppEvent) -> Option<String> {
    let text = match event {
        AppEvent::SessionStarted { .. } => "Joined the meeting".to_string(),
        AppEvent::SessionError { message } => format!("Error: {}", message),
        AppEvent::SessionEnded => "Meeting ended".to_string(),
        AppEvent::RosterChanged { participant_count } => {
            format!("{} participant(s) in the meeting", participant_count)
        }
        AppEvent::LocalMediaChanged {
            audio_muted,
            video_off,
            screen_sharing,
        } => format!(
            "Microphone {}, camera {}{}",
            if *audio_muted { "off" } else { "on" },
            if *video_off { "off" } else { "on" },
            if *screen_sharing { ", sharing screen" } else { "" }
        ),
        AppEvent::SpotlightChanged {
            participant_id: Some(id),
        } => format!("Spotlight on {}", id),
        AppEvent::SpotlightChanged {
            participant_id: None,
        } => "Spotlight cleared".to_string(),
        AppEvent::UnreadCountChanged { unread } if *unread > 0 => {
            format!("{} unread message(s)", unread)
        }
        AppEvent::TypingChanged {
            summary: Some(summary),
        } => summary.clone(),
        _ => return None,
    };
    Some(text)
}
