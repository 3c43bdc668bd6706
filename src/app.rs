use crate::settings::{Settings, SettingsField};
use crate::speedtest::sequencer::PhaseSequencer;
use crate::speedtest::session::Session;
use crate::speedtest::transport::Transport;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Main,
    Settings,
}

pub struct App {
    pub session: Session,
    pub should_quit: bool,

    pub view: AppView,

    pub settings: Settings,
    pub selected_setting: SettingsField,

    sequencer: PhaseSequencer,
}

impl App {
    pub fn new(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            session: Session::with_chart_capacity(settings.chart_capacity),
            should_quit: false,
            view: AppView::Main,
            settings,
            selected_setting: SettingsField::PingCount,
            sequencer: PhaseSequencer::new(transport),
        }
    }

    pub fn is_testing(&self) -> bool {
        self.session.phase().is_running()
    }

    pub fn handle_key_event(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match self.view {
            AppView::Main => self.handle_main_key(key),
            AppView::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_main_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Char('s') => {
                if !self.is_testing() {
                    self.view = AppView::Settings;
                }
                None
            }
            KeyCode::Enter => (!self.is_testing()).then_some(AppAction::StartTest),
            KeyCode::Char('r') => Some(AppAction::StartTest),
            KeyCode::Esc => self.is_testing().then_some(AppAction::CancelTest),
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.view = AppView::Main;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_setting = self.selected_setting.prev();
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected_setting = self.selected_setting.next();
            }
            KeyCode::Left | KeyCode::Char('h') => self.settings.decrease(self.selected_setting),
            KeyCode::Right | KeyCode::Char('l') => self.settings.increase(self.selected_setting),
            _ => {}
        }
        None
    }

    pub fn start_test(&mut self) {
        self.sequencer
            .start(&mut self.session, self.settings.clone());
    }

    pub fn cancel_test(&mut self) {
        if self.sequencer.is_running() {
            self.sequencer.cancel(&mut self.session);
        }
    }

    /// Pull in whatever the running test has reported since the last frame.
    pub fn pump(&mut self) {
        self.sequencer.pump(&mut self.session);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    StartTest,
    CancelTest,
}

pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
