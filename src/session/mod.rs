//! Interactive session: pick a chat, browse it, download a selection.
//!
//! The session walks a fixed sequence of states:
//!
//! ```text
//! AwaitingResource -> Listing -> Presenting -> AwaitingSelection -> Downloading -> Done
//! ```
//!
//! Invalid input re-prompts in place. A failed or empty listing, a `Q`
//! selection, closed input and an exhausted prompt budget all go straight
//! to `Done`. Nothing in a session is fatal.

mod console;

use tracing::{debug, info, instrument};

pub use console::{Console, ScriptedConsole, StdConsole};

use crate::download::{DownloadReport, ProgressSink, RetryingDownloader};
use crate::listing::{ListedItem, Listing, MessageLister};
use crate::parser::{ResourceReference, Selection, parse_selection};

/// Prompt asking for the chat reference.
pub const RESOURCE_PROMPT: &str = "Enter the link or identifier of the chat: ";

/// Prompt asking for the selection expression.
pub const SELECTION_PROMPT: &str = "Enter message numbers, ranges or lists of ranges \
(e.g. 10,15,18-30), 'T' for all, 'Q' to quit: ";

/// Notice shown when the chat yields nothing.
pub const NOTHING_FOUND: &str = "No messages found.";

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// A download phase ran.
    Completed(DownloadReport),
    /// The chat could not be listed or had no messages.
    NothingFound,
    /// The operator entered `Q`.
    Quit,
    /// Input ended while prompting.
    InputClosed,
    /// Too many invalid answers to one prompt.
    PromptLimitReached,
}

/// Session knobs, mostly pre-supplied answers for non-interactive use.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Chat reference to use instead of prompting.
    pub resource: Option<String>,
    /// Selection expression to use instead of prompting.
    pub selection: Option<String>,
    /// Maximum answers accepted per prompt; `None` prompts forever.
    pub max_prompt_attempts: Option<usize>,
    /// Print each message while the history is fetched.
    pub echo_listing: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            resource: None,
            selection: None,
            max_prompt_attempts: None,
            echo_listing: true,
        }
    }
}

enum State {
    AwaitingResource,
    Listing(ResourceReference),
    Presenting(Listing),
    AwaitingSelection(Listing),
    Downloading(Listing, Vec<i64>),
    Done(SessionEnd),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingResource => "awaiting_resource",
            Self::Listing(_) => "listing",
            Self::Presenting(_) => "presenting",
            Self::AwaitingSelection(_) => "awaiting_selection",
            Self::Downloading(..) => "downloading",
            Self::Done(_) => "done",
        }
    }
}

/// Outcome of asking for one answer.
enum Answer<T> {
    Value(T),
    End(SessionEnd),
}

/// Drives one pass from chat reference to downloaded files.
#[derive(Debug)]
pub struct Session {
    lister: MessageLister,
    downloader: RetryingDownloader,
    options: SessionOptions,
}

impl Session {
    /// Creates a session.
    #[must_use]
    pub fn new(lister: MessageLister, downloader: RetryingDownloader, options: SessionOptions) -> Self {
        Self {
            lister,
            downloader,
            options,
        }
    }

    /// Runs the session to completion.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        console: &mut dyn Console,
        progress: &mut dyn ProgressSink,
    ) -> SessionEnd {
        let mut state = State::AwaitingResource;
        loop {
            debug!(state = state.name(), "session state");
            state = match state {
                State::AwaitingResource => match self.read_resource(console) {
                    Answer::Value(reference) => State::Listing(reference),
                    Answer::End(end) => State::Done(end),
                },
                State::Listing(reference) => self.list(&reference, console).await,
                State::Presenting(listing) => {
                    for item in &listing.items {
                        console.print(&item.to_string());
                    }
                    State::AwaitingSelection(listing)
                }
                State::AwaitingSelection(listing) => match self.read_selection(&listing, console) {
                    Answer::Value(ids) => State::Downloading(listing, ids),
                    Answer::End(end) => State::Done(end),
                },
                State::Downloading(listing, ids) => {
                    State::Done(self.download(&listing, &ids, console, progress).await)
                }
                State::Done(end) => {
                    info!(?end, "session finished");
                    return end;
                }
            };
        }
    }

    fn read_resource(&self, console: &mut dyn Console) -> Answer<ResourceReference> {
        if let Some(raw) = &self.options.resource {
            match ResourceReference::parse(raw) {
                Ok(reference) => return Answer::Value(reference),
                Err(error) => console.print(&format!("Invalid chat reference: {error}")),
            }
        }

        let mut attempts = 0;
        loop {
            if self.prompt_budget_spent(attempts) {
                console.print("Too many invalid answers, giving up.");
                return Answer::End(SessionEnd::PromptLimitReached);
            }
            let Some(raw) = console.prompt(RESOURCE_PROMPT) else {
                return Answer::End(SessionEnd::InputClosed);
            };
            attempts += 1;
            match ResourceReference::parse(&raw) {
                Ok(reference) => return Answer::Value(reference),
                Err(error) => console.print(&format!("Invalid chat reference: {error}")),
            }
        }
    }

    async fn list(&self, reference: &ResourceReference, console: &mut dyn Console) -> State {
        console.print(&format!("Fetching messages from {reference}..."));
        let echo = self.options.echo_listing;
        let mut observer = |item: &ListedItem| {
            if echo {
                console.print(&format!("[{}] {item}", item.id));
            }
        };

        match self.lister.list_with(reference, &mut observer).await {
            Ok(listing) if listing.is_empty() => {
                console.print(NOTHING_FOUND);
                State::Done(SessionEnd::NothingFound)
            }
            Ok(listing) => {
                if let Some(wait) = listing.rate_limited {
                    console.print(&format!(
                        "Rate limited after {} messages (waited {}s); showing what was fetched.",
                        listing.len(),
                        wait.as_secs()
                    ));
                }
                State::Presenting(listing)
            }
            Err(error) => {
                console.print(&format!("Error: {error}"));
                console.print(NOTHING_FOUND);
                State::Done(SessionEnd::NothingFound)
            }
        }
    }

    fn read_selection(&self, listing: &Listing, console: &mut dyn Console) -> Answer<Vec<i64>> {
        if let Some(expr) = &self.options.selection {
            match self.check_selection(expr, listing, console) {
                Some(answer) => return answer,
                None => debug!("pre-supplied selection rejected, prompting"),
            }
        }

        let mut attempts = 0;
        loop {
            if self.prompt_budget_spent(attempts) {
                console.print("Too many invalid answers, giving up.");
                return Answer::End(SessionEnd::PromptLimitReached);
            }
            let Some(expr) = console.prompt(SELECTION_PROMPT) else {
                return Answer::End(SessionEnd::InputClosed);
            };
            attempts += 1;
            if let Some(answer) = self.check_selection(&expr, listing, console) {
                return answer;
            }
        }
    }

    /// `None` means the expression was rejected and the operator should be
    /// asked again.
    fn check_selection(
        &self,
        expr: &str,
        listing: &Listing,
        console: &mut dyn Console,
    ) -> Option<Answer<Vec<i64>>> {
        match parse_selection(expr, listing.len()) {
            Ok(Selection::Quit) => {
                console.print("Exiting.");
                Some(Answer::End(SessionEnd::Quit))
            }
            Ok(selection) if selection.is_empty() => {
                console.print("Selection matches no listed message, try again.");
                None
            }
            Ok(selection) => Some(Answer::Value(selection.resolve_ids(&listing.items))),
            Err(error) => {
                console.print(&format!("Invalid selection: {error}"));
                None
            }
        }
    }

    async fn download(
        &self,
        listing: &Listing,
        ids: &[i64],
        console: &mut dyn Console,
        progress: &mut dyn ProgressSink,
    ) -> SessionEnd {
        console.print(&format!(
            "Downloading {} message(s) into {}...",
            ids.len(),
            self.downloader.root().display()
        ));
        let report = self.downloader.download(&listing.entity, ids, progress).await;
        for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
            console.print(&outcome.to_string());
        }
        console.print(&format!("Done: {report}."));
        SessionEnd::Completed(report)
    }

    fn prompt_budget_spent(&self, attempts: usize) -> bool {
        self.options
            .max_prompt_attempts
            .is_some_and(|max| attempts >= max)
    }
}
