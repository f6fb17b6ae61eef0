//! Relationship chooser
//!
//! A [`Chooser`] owns the ordered, limited selection of one join field and
//! keeps its rendered form in step with it. Mutations are synchronous;
//! rendering happens on a background task and is coalesced, so a burst of
//! mutations costs at most one render in flight plus one catch-up render.
//!
//! State machine:
//!
//! ```text
//! uninitialized --load--> idle <--> refreshing
//! ```
//!
//! [`Chooser::get`] suspends until the chooser is idle, so callers never
//! observe a selection halfway through a render.

pub mod error;
pub mod hooks;
pub mod types;

pub use error::{ChooserError, Result};
pub use hooks::{
    AutocompleteSource, ChooserHooks, ChooserRenderer, MinimumChoices, NoChooserHooks, TemplateChooserRenderer,
};
pub use types::{ChangeEvent, ChooserArgs, ChooserOptions, ChooserOverrides, Choice, Direction, Suggestion};

use crate::schema::Field;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

type Observer = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Handle to one chooser
///
/// Not `Clone`: [`Chooser::clone_with`] makes an independent copy, and
/// shared ownership goes through `Arc<Chooser>`.
pub struct Chooser {
    inner: Arc<Inner>,
}

struct Inner {
    options: ChooserOptions,
    renderer: Arc<dyn ChooserRenderer>,
    hooks: Arc<dyn ChooserHooks>,
    source: Option<Arc<dyn AutocompleteSource>>,
    state: Mutex<State>,
    /// `true` while no refresh is outstanding
    idle: watch::Sender<bool>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_observer: AtomicU64,
}

#[derive(Default)]
struct State {
    choices: Vec<Choice>,
    full: bool,
    /// Set by `load`; refreshes are spawned here
    runtime: Option<Handle>,
    fragment: Option<String>,
    rendered: Option<String>,
    /// Outstanding refresh requests; above one means a catch-up is owed
    refreshing: usize,
    last_serialized: Option<String>,
}

/// Builder for a [`Chooser`]
pub struct ChooserBuilder {
    options: ChooserOptions,
    renderer: Arc<dyn ChooserRenderer>,
    hooks: Arc<dyn ChooserHooks>,
    source: Option<Arc<dyn AutocompleteSource>>,
}

impl ChooserBuilder {
    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn ChooserHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn autocomplete(mut self, source: Arc<dyn AutocompleteSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn build(self) -> Chooser {
        Chooser::from_parts(self.options, self.renderer, self.hooks, self.source, Vec::new())
    }
}

impl Chooser {
    pub fn builder(options: ChooserOptions, renderer: Arc<dyn ChooserRenderer>) -> ChooserBuilder {
        ChooserBuilder {
            options,
            renderer,
            hooks: Arc::new(NoChooserHooks),
            source: None,
        }
    }

    fn from_parts(
        options: ChooserOptions,
        renderer: Arc<dyn ChooserRenderer>,
        hooks: Arc<dyn ChooserHooks>,
        source: Option<Arc<dyn AutocompleteSource>>,
        choices: Vec<Choice>,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        let inner = Arc::new(Inner {
            options,
            renderer,
            hooks,
            source,
            state: Mutex::new(State::default()),
            idle,
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(0),
        });
        {
            let mut state = inner.state.lock();
            state.choices = choices;
            inner.update_full(&mut state);
        }
        Self { inner }
    }

    #[must_use]
    pub fn options(&self) -> &ChooserOptions {
        &self.inner.options
    }

    #[must_use]
    pub fn field(&self) -> &Field {
        &self.inner.options.field
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.inner.options.limit()
    }

    /// Whether the selection has reached its limit
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.state.lock().full
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().choices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.state.lock().choices.iter().any(|choice| choice.value == id)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.state.lock().runtime.is_some()
    }

    /// The chooser shell rendered by `load`
    #[must_use]
    pub fn fragment(&self) -> Option<String> {
        self.inner.state.lock().fragment.clone()
    }

    /// The most recent successful render of the selection
    #[must_use]
    pub fn rendered(&self) -> Option<String> {
        self.inner.state.lock().rendered.clone()
    }

    /// Render the chooser shell and start refreshing; later calls are no-ops
    ///
    /// # Errors
    ///
    /// Returns `ChooserError::Render` if the shell fails to render and
    /// `ChooserError::Runtime` outside a tokio runtime.
    pub async fn load(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|e| ChooserError::Runtime(e.to_string()))?;
        let args = ChooserArgs {
            browse: self.inner.options.browse,
            autocomplete: self.inner.options.autocomplete,
        };
        let fragment = self.inner.renderer.render_chooser(args, self.field()).await?;
        {
            let mut state = self.inner.state.lock();
            state.fragment = Some(fragment);
            state.runtime = Some(runtime);
            state.last_serialized = serde_json::to_string(&state.choices).ok();
        }
        debug!(field = %self.field().name, browse = args.browse, "chooser loaded");
        self.inner.request_refresh();
        Ok(())
    }

    /// Append a choice; `false` if the selection is already at its limit
    pub fn add(&self, id: &str) -> bool {
        {
            let mut state = self.inner.state.lock();
            if self.inner.options.limit().is_some_and(|limit| state.choices.len() >= limit) {
                debug!(field = %self.field().name, id, "choice rejected, selection is full");
                return false;
            }
            if state.choices.iter().any(|choice| choice.value == id) {
                return true;
            }
            state.choices.push(Choice::new(id));
            self.inner.update_full(&mut state);
        }
        self.inner.request_refresh();
        true
    }

    /// Remove a choice; absent ids are a successful no-op
    pub fn remove(&self, id: &str) -> bool {
        {
            let mut state = self.inner.state.lock();
            state.choices.retain(|choice| choice.value != id);
            self.inner.update_full(&mut state);
        }
        self.inner.request_refresh();
        true
    }

    /// Swap a choice with its neighbour; `false` at the boundary or for an
    /// unknown id
    pub fn reorder(&self, id: &str, direction: Direction) -> bool {
        let moved = {
            let mut state = self.inner.state.lock();
            let Some(index) = state.choices.iter().position(|choice| choice.value == id) else {
                return false;
            };
            let neighbour = match direction {
                Direction::Raise => index.checked_sub(1),
                Direction::Lower => Some(index + 1).filter(|next| *next < state.choices.len()),
            };
            match neighbour {
                Some(neighbour) => {
                    state.choices.swap(index, neighbour);
                    true
                }
                None => false,
            }
        };
        self.inner.request_refresh();
        moved
    }

    /// Replace the whole selection, ignoring the limit
    pub fn set(&self, choices: Vec<Choice>) {
        {
            let mut state = self.inner.state.lock();
            state.choices = choices;
            self.inner.update_full(&mut state);
        }
        self.inner.request_refresh();
    }

    /// Attach relationship data to a choice
    ///
    /// `false` if the field declares no relationship or the id is not
    /// selected.
    pub fn relate(&self, id: &str, data: Map<String, Value>) -> bool {
        if self.field().relationship.is_empty() {
            return false;
        }
        {
            let mut state = self.inner.state.lock();
            let Some(choice) = state.choices.iter_mut().find(|choice| choice.value == id) else {
                return false;
            };
            choice.relationship = Some(data);
        }
        self.inner.request_refresh();
        true
    }

    /// The settled selection, waiting out any refresh in flight
    pub async fn get(&self) -> Vec<Choice> {
        let mut idle = self.inner.idle.subscribe();
        // the sender lives in `inner`, which `self` keeps alive
        let _ = idle.wait_for(|idle| *idle).await;
        self.inner.state.lock().choices.clone()
    }

    /// Run the finalize rules, then return the settled selection
    ///
    /// # Errors
    ///
    /// Returns whatever the finalize hook rejects the selection with.
    pub async fn get_final(&self) -> Result<Vec<Choice>> {
        self.inner.hooks.finalize(self).await?;
        Ok(self.get().await)
    }

    /// An independent chooser with the same collaborators, the overrides
    /// applied and a copy of the current selection. It starts unloaded.
    #[must_use]
    pub fn clone_with(&self, overrides: &ChooserOverrides) -> Self {
        let choices = self.inner.state.lock().choices.clone();
        Self::from_parts(
            self.inner.options.merged(overrides),
            Arc::clone(&self.inner.renderer),
            Arc::clone(&self.inner.hooks),
            self.inner.source.clone(),
            choices,
        )
    }

    /// Observe settled changes until the returned subscription is dropped
    pub fn subscribe(&self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_observer.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Suggestions for `term`, minus pieces already selected
    ///
    /// Empty for a blank term, a full selection, or when autocomplete is
    /// off or has no source.
    ///
    /// # Errors
    ///
    /// Returns `ChooserError::Autocomplete` if the source fails.
    pub async fn autocomplete(&self, term: &str) -> Result<Vec<Suggestion>> {
        let term = term.trim();
        if term.is_empty() || !self.inner.options.autocomplete || self.is_full() {
            return Ok(Vec::new());
        }
        let Some(source) = &self.inner.source else {
            return Ok(Vec::new());
        };
        let suggestions = source.suggest(term, self.field()).await?;
        let state = self.inner.state.lock();
        Ok(suggestions
            .into_iter()
            .filter(|suggestion| !state.choices.iter().any(|choice| choice.value == suggestion.value))
            .collect())
    }

    pub fn select_suggestion(&self, suggestion: &Suggestion) -> bool {
        self.add(&suggestion.value)
    }

    pub async fn after_manager_save(&self) {
        self.inner.hooks.after_manager_save(self).await;
    }

    pub async fn after_manager_cancel(&self) {
        self.inner.hooks.after_manager_cancel(self).await;
    }
}

impl Inner {
    fn update_full(&self, state: &mut State) {
        let full = self.options.limit().is_some_and(|limit| state.choices.len() >= limit);
        if full != state.full {
            debug!(field = %self.options.field.name, full, "selection fullness changed");
            state.full = full;
        }
    }

    fn request_refresh(self: &Arc<Self>) {
        let mut state = self.state.lock();
        let Some(runtime) = state.runtime.clone() else {
            trace!(field = %self.options.field.name, "refresh skipped before load");
            return;
        };
        state.refreshing += 1;
        if state.refreshing > 1 {
            trace!(field = %self.options.field.name, pending = state.refreshing - 1, "refresh recorded");
            return;
        }
        self.idle.send_replace(false);
        drop(state);

        let inner = Arc::clone(self);
        runtime.spawn(async move { inner.run_refresh().await });
    }

    async fn run_refresh(self: Arc<Self>) {
        loop {
            let choices = self.state.lock().choices.clone();
            let rendered = self.renderer.render_choices(&choices, &self.options.field).await;

            let mut state = self.state.lock();
            let succeeded = match rendered {
                Ok(html) => {
                    state.rendered = Some(html);
                    true
                }
                Err(e) => {
                    warn!(field = %self.options.field.name, error = %e, "failed to render choices");
                    false
                }
            };
            if state.refreshing > 1 {
                trace!(field = %self.options.field.name, coalesced = state.refreshing - 1, "catch-up refresh");
                state.refreshing = 1;
                continue;
            }
            state.refreshing = 0;
            let event = if succeeded { Self::detect_change(&mut state) } else { None };
            self.idle.send_replace(true);
            drop(state);

            if let Some(event) = event {
                self.notify(&event);
            }
            return;
        }
    }

    fn detect_change(state: &mut State) -> Option<ChangeEvent> {
        let serialized = serde_json::to_string(&state.choices).ok()?;
        if state.last_serialized.as_deref() == Some(serialized.as_str()) {
            return None;
        }
        state.last_serialized = Some(serialized);
        Some(ChangeEvent {
            choices: state.choices.clone(),
            full: state.full,
        })
    }

    fn notify(&self, event: &ChangeEvent) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(event);
        }
    }
}

/// Keeps a change observer registered while alive
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
