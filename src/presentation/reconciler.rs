use super::view::{
    PresentationMode, View, STATUS_LIVE_SPEAKING, STATUS_READY, STATUS_SPEAKING,
    STATUS_STREAM_STOPPED,
};
use std::time::Duration;
use tracing::{debug, info};

const SECONDS_PER_WORD: f64 = 0.5;
const MAX_SPEAKING: Duration = Duration::from_secs(30);

/// Rough time the avatar needs to speak `text`
pub fn speaking_estimate(text: &str) -> Duration {
    let words = text.split_whitespace().count() as f64;
    Duration::from_secs_f64(words * SECONDS_PER_WORD).min(MAX_SPEAKING)
}

/// A change of presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PresentationMode,
    pub to: PresentationMode,
}

/// How an exchange's reply should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The live avatar speaks it
    LiveVideo,
    /// Decode and play the response audio
    PlayAudio,
    /// Show the text only
    TextOnly,
}

/// Owns the presentation mode and the view artifacts that go with it
///
/// Entering a mode always starts from a cleared view, so nothing from the
/// previous mode survives the switch.
#[derive(Debug, Default)]
pub struct Reconciler {
    view: View,
    /// Identity owning the attached avatar video track
    avatar_track: Option<String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PresentationMode {
        self.view.mode
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn avatar_track(&self) -> Option<&str> {
        self.avatar_track.as_deref()
    }

    /// Decide how to present a completed exchange
    ///
    /// `live_connected` tells whether the live connection is up; the avatar
    /// video must also be attached for the reply to go to video.
    pub fn exchange_received(
        &mut self,
        has_audio: bool,
        live_connected: bool,
    ) -> (Delivery, Option<Transition>) {
        if live_connected && self.avatar_track.is_some() {
            let transition = self.enter(PresentationMode::LiveVideo);
            return (Delivery::LiveVideo, transition);
        }

        if has_audio {
            let transition = self.enter(PresentationMode::AudioPlayback);
            return (Delivery::PlayAudio, transition);
        }

        let transition = self.enter(PresentationMode::Idle);
        self.view.status = STATUS_READY.to_string();
        (Delivery::TextOnly, transition)
    }

    /// The avatar would not take the reply; deliver it locally instead
    pub fn relay_failed(&mut self, has_audio: bool) -> (Delivery, Option<Transition>) {
        if has_audio {
            let transition = self.enter(PresentationMode::AudioPlayback);
            return (Delivery::PlayAudio, transition);
        }
        let transition = self.enter(PresentationMode::Idle);
        self.view.status = STATUS_READY.to_string();
        (Delivery::TextOnly, transition)
    }

    /// The avatar has had time to speak the reply; the video stays up
    pub fn live_reply_spoken(&mut self) {
        if self.view.mode == PresentationMode::LiveVideo {
            self.view.status = STATUS_READY.to_string();
        }
    }

    /// The agent's video track is ready; it is used from the next exchange on
    pub fn avatar_attached(&mut self, identity: &str) {
        debug!("Avatar video attached from {}", identity);
        self.avatar_track = Some(identity.to_string());
    }

    /// The agent's video track ended
    pub fn avatar_detached(&mut self, identity: &str) -> Option<Transition> {
        match self.avatar_track.as_deref() {
            Some(owner) if owner == identity => {}
            _ => return None,
        }
        self.avatar_track = None;
        self.leave_live_video(STATUS_READY)
    }

    /// The live connection dropped
    pub fn connection_lost(&mut self) -> Option<Transition> {
        self.avatar_track = None;
        self.leave_live_video(STATUS_READY)
    }

    /// The user tore the live connection down
    pub fn user_disconnected(&mut self) -> Option<Transition> {
        self.avatar_track = None;
        self.leave_live_video(STATUS_STREAM_STOPPED)
    }

    /// Response audio finished (or failed)
    pub fn playback_finished(&mut self) -> Option<Transition> {
        if self.view.mode != PresentationMode::AudioPlayback {
            return None;
        }
        let transition = self.enter(PresentationMode::Idle);
        self.view.status = STATUS_READY.to_string();
        transition
    }

    fn leave_live_video(&mut self, status: &str) -> Option<Transition> {
        if self.view.mode != PresentationMode::LiveVideo {
            return None;
        }
        let transition = self.enter(PresentationMode::Idle);
        self.view.status = status.to_string();
        transition
    }

    fn enter(&mut self, mode: PresentationMode) -> Option<Transition> {
        let from = self.view.mode;
        self.view.clear_artifacts();
        self.view.mode = mode;

        match mode {
            PresentationMode::Idle => {}
            PresentationMode::AudioPlayback => {
                self.view.speaking_indicator = true;
                self.view.status = STATUS_SPEAKING.to_string();
            }
            PresentationMode::LiveVideo => {
                self.view.video_visible = true;
                self.view.image_visible = false;
                self.view.stop_control_visible = true;
                self.view.status = STATUS_LIVE_SPEAKING.to_string();
            }
        }

        if from == mode {
            return None;
        }
        info!("Presentation {} -> {}", from, mode);
        Some(Transition { from, to: mode })
    }
}
