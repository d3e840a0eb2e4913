//! Latest-value combine of every store into one view state.
//!
//! A single task waits on all change streams. Each wake-up absorbs every
//! source that moved, recomputes the view state and summary once, emits the
//! state, then persists the summary if it changed.

use std::sync::Arc;

use chrono::{Local, Timelike};
use dayahead_calendar::CalendarSnapshot;
use dayahead_core::{PreferencesStore, UserPreferences};
use dayahead_news::Article;
use dayahead_weather::WeatherSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::steps::StepsReading;
use crate::summary::{compose, SummaryInputs};

/// A source that has not emitted yet is `Loading`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Loading,
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Loading => None,
            Self::Ready(value) => Some(value),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub weather: Loadable<Option<WeatherSnapshot>>,
    /// Headlines of the selected category
    pub headlines: Loadable<Vec<Article>>,
    pub calendar: Loadable<CalendarSnapshot>,
    pub fun_fact: Option<String>,
    /// `None` until the first step count read
    pub steps: Option<StepsReading>,
    pub location_name: Option<String>,
    pub preferences: Loadable<UserPreferences>,
    pub summary: Option<String>,
}

impl ViewState {
    pub fn headline(&self) -> Option<&str> {
        self.headlines
            .ready()
            .and_then(|articles| articles.first())
            .map(|a| a.title.as_str())
    }
}

/// Change streams the aggregator combines.
pub struct AggregatorInputs {
    pub weather: watch::Receiver<Option<WeatherSnapshot>>,
    pub articles: watch::Receiver<Vec<Article>>,
    pub calendar: watch::Receiver<CalendarSnapshot>,
    pub fun_fact: watch::Receiver<Option<String>>,
    pub steps: watch::Receiver<Option<StepsReading>>,
    pub location_name: watch::Receiver<Option<String>>,
    pub preferences: watch::Receiver<UserPreferences>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Weather,
    Articles,
    Calendar,
    FunFact,
    Steps,
    LocationName,
    Preferences,
}

fn local_hour() -> u32 {
    Local::now().hour()
}

pub struct Aggregator {
    inputs: AggregatorInputs,
    store: Arc<PreferencesStore>,
    category: String,
    clock: fn() -> u32,
}

impl Aggregator {
    pub fn new(inputs: AggregatorInputs, store: Arc<PreferencesStore>, category: &str) -> Self {
        Self {
            inputs,
            store,
            category: category.to_string(),
            clock: local_hour,
        }
    }

    /// Override the hour-of-day source used for the greeting.
    pub fn with_clock(mut self, clock: fn() -> u32) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(self, cancel: CancellationToken) -> AggregatorHandle {
        let (tx, rx) = watch::channel(ViewState::default());
        let task = tokio::spawn(self.run(tx, cancel));
        AggregatorHandle { rx, task }
    }

    async fn run(mut self, tx: watch::Sender<ViewState>, cancel: CancellationToken) {
        let mut state = ViewState::default();

        loop {
            let inputs = &mut self.inputs;
            let fired = tokio::select! {
                _ = cancel.cancelled() => break,
                r = inputs.weather.changed() => r.map(|_| Input::Weather),
                r = inputs.articles.changed() => r.map(|_| Input::Articles),
                r = inputs.calendar.changed() => r.map(|_| Input::Calendar),
                r = inputs.fun_fact.changed() => r.map(|_| Input::FunFact),
                r = inputs.steps.changed() => r.map(|_| Input::Steps),
                r = inputs.location_name.changed() => r.map(|_| Input::LocationName),
                r = inputs.preferences.changed() => r.map(|_| Input::Preferences),
            };

            let Ok(fired) = fired else {
                tracing::debug!("A source store was dropped, stopping aggregator");
                break;
            };

            self.absorb(fired, &mut state);
            self.publish(&tx, &mut state);
        }
    }

    /// Take the latest value of the source that fired and of any other
    /// source with an unseen value.
    fn absorb(&mut self, fired: Input, state: &mut ViewState) {
        fn moved<T>(fired: bool, rx: &mut watch::Receiver<T>) -> bool {
            fired || rx.has_changed().unwrap_or(false)
        }

        let inputs = &mut self.inputs;

        if moved(fired == Input::Weather, &mut inputs.weather) {
            state.weather = Loadable::Ready(inputs.weather.borrow_and_update().clone());
        }
        if moved(fired == Input::Articles, &mut inputs.articles) {
            let category = &self.category;
            let headlines: Vec<Article> = inputs
                .articles
                .borrow_and_update()
                .iter()
                .filter(|a| &a.category == category)
                .cloned()
                .collect();
            state.headlines = Loadable::Ready(headlines);
        }
        if moved(fired == Input::Calendar, &mut inputs.calendar) {
            state.calendar = Loadable::Ready(inputs.calendar.borrow_and_update().clone());
        }
        if moved(fired == Input::FunFact, &mut inputs.fun_fact) {
            state.fun_fact = inputs.fun_fact.borrow_and_update().clone();
        }
        if moved(fired == Input::Steps, &mut inputs.steps) {
            state.steps = *inputs.steps.borrow_and_update();
        }
        if moved(fired == Input::LocationName, &mut inputs.location_name) {
            state.location_name = inputs.location_name.borrow_and_update().clone();
        }
        if moved(fired == Input::Preferences, &mut inputs.preferences) {
            state.preferences = Loadable::Ready(inputs.preferences.borrow_and_update().clone());
        }
    }

    fn publish(&self, tx: &watch::Sender<ViewState>, state: &mut ViewState) {
        let user_name = state
            .preferences
            .ready()
            .map(|p| p.user_name.as_str())
            .unwrap_or(dayahead_core::preferences::DEFAULT_USER_NAME);

        let summary = compose(&SummaryInputs {
            weather: state.weather.ready().and_then(Option::as_ref),
            calendar: state.calendar.ready(),
            headline: state.headline(),
            user_name,
            hour: (self.clock)(),
        });
        state.summary = summary;

        tx.send_if_modified(|current| {
            if *current == *state {
                false
            } else {
                *current = state.clone();
                true
            }
        });

        if let Some(summary) = &state.summary {
            if let Err(e) = self.store.save_summary(summary) {
                tracing::warn!("Failed to persist summary: {}", e);
            }
        }
    }
}

pub struct AggregatorHandle {
    rx: watch::Receiver<ViewState>,
    task: JoinHandle<()>,
}

impl AggregatorHandle {
    /// Subscribe to the combined state; the current state is delivered first.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        let mut rx = self.rx.clone();
        rx.mark_changed();
        rx
    }

    pub fn current(&self) -> ViewState {
        self.rx.borrow().clone()
    }

    /// Wait for the task to stop after its cancel token fired.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!("Aggregator task ended abnormally: {}", e);
        }
    }
}
