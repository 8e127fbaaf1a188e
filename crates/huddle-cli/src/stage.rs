//! Video tiles of the meeting
//!
//! The terminal has nothing to draw video on, so tiles are bound to a
//! headless playback backend. Binding still follows the roster: a tile per
//! participant, rebinding when a participant's stream changes, detaching
//! and giving up picture-in-picture when the participant leaves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use huddle_core::types::{ParticipantId, SurfaceId};
use huddle_core::{
    DisplayState, HeadlessPlayback, Participant, PictureInPicture, SessionSnapshot, VideoTile,
};

use crate::terminal::render_participant;

pub struct Stage {
    backend: Arc<HeadlessPlayback>,
    tiles: HashMap<ParticipantId, VideoTile>,
    pip: PictureInPicture<Arc<HeadlessPlayback>>,
}

impl Stage {
    pub fn new(picture_in_picture: bool) -> Self {
        let backend = Arc::new(if picture_in_picture {
            HeadlessPlayback::with_picture_in_picture()
        } else {
            HeadlessPlayback::new()
        });
        Self {
            pip: PictureInPicture::new(backend.clone()),
            backend,
            tiles: HashMap::new(),
        }
    }

    /// Bring the tiles in line with the roster
    pub async fn sync(&mut self, snapshot: &SessionSnapshot) {
        let present: HashSet<&ParticipantId> = snapshot.participants.iter().map(|p| &p.id).collect();
        let departed: Vec<ParticipantId> = self
            .tiles
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();

        for id in departed {
            if let Some(mut tile) = self.tiles.remove(&id) {
                tile.detach(&*self.backend);
                self.pip.release(tile.surface()).await;
            }
        }

        for participant in &snapshot.participants {
            let tile = self
                .tiles
                .entry(participant.id.clone())
                .or_insert_with(|| VideoTile::new(format!("tile-{}", participant.id), participant));
            if tile.sync(participant) {
                tile.bind(&*self.backend, participant.stream.as_ref()).await;
            }
        }
    }

    pub fn display_state(&self, participant: &Participant) -> DisplayState {
        self.tiles
            .get(&participant.id)
            .map(|tile| tile.display_state(participant))
            .unwrap_or(participant.display)
    }

    /// Toggle picture-in-picture for a participant's tile. Returns `false`
    /// when the participant has no tile.
    pub async fn toggle_picture_in_picture(&mut self, participant_id: &ParticipantId) -> bool {
        let Some(surface) = self.tiles.get(participant_id).map(|t| t.surface().clone()) else {
            return false;
        };
        self.pip.toggle(&surface).await;
        true
    }

    pub fn picture_in_picture(&self) -> Option<&SurfaceId> {
        self.pip.active()
    }

    pub fn tile(&self, participant_id: &ParticipantId) -> Option<&VideoTile> {
        self.tiles.get(participant_id)
    }

    /// Roster lines in roster order
    pub fn roster(&self, snapshot: &SessionSnapshot) -> Vec<String> {
        snapshot
            .participants
            .iter()
            .map(|p| {
                let mut line = render_participant(p, self.display_state(p));
                if let Some(tile) = self.tiles.get(&p.id) {
                    if self.pip.is_active(tile.surface()) {
                        line.push_str("  (pip)");
                    }
                }
                line
            })
            .collect()
    }
}
