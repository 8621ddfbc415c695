//! Lazily loaded, paginated model lists
//!
//! A [`List`] is an ordered, index-addressable collection of model records.
//! Where its elements come from is fixed at construction by its
//! [`ListSource`]:
//!
//! - `InMemory`: elements were supplied directly and are always loaded.
//! - `Remote`: elements came from one page of a GraphQL list query; the page
//!   remembers the cursor, document and variables needed to fetch the next
//!   page.
//! - `Associated`: elements belong to an owning record and are queried from
//!   the local store on first access.
//!
//! Accessors that may trigger a deferred load take `&mut self`, so a list
//! cannot be loaded from two threads at once without an external lock.

pub mod associated;
pub mod registry;
pub mod remote;

use serde::{Serialize, Serializer};
use skylist_domain::{JsonValue, Model, Result, SkylistError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;
use tracing::warn;

pub use associated::{reference_payload, AssociatedListDecoder, AssociatedRecords};
pub use registry::{DecodedList, ListDecoder, ListDecoderRegistry};
pub use remote::{ListPayload, RemoteListDecoder, RemotePage};

/// Load status of a list's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Elements have not been fetched yet.
    Pending,
    /// Elements reflect the last successful fetch.
    Loaded,
}

/// Where a list's elements come from.
#[derive(Debug, Clone, Default)]
pub enum ListSource {
    /// Elements were supplied directly.
    #[default]
    InMemory,
    /// One page of a remote list query.
    Remote(RemotePage),
    /// Records owned by another record, read from the local store.
    Associated(AssociatedRecords),
}

impl ListSource {
    async fn next_page<M: Model>(&self) -> Result<List<M>> {
        match self {
            Self::Remote(page) => page.next_page::<M>().await,
            Self::InMemory | Self::Associated(_) => {
                Err(SkylistError::Unsupported("list has no pagination metadata".into()))
            }
        }
    }
}

/// Ordered collection of `M` records.
#[derive(Debug, Clone)]
pub struct List<M: Model> {
    elements: Vec<M>,
    state: LoadState,
    source: ListSource,
}

impl<M: Model> List<M> {
    /// Loaded list over `elements`.
    pub fn new(elements: Vec<M>) -> Self {
        Self { elements, state: LoadState::Loaded, source: ListSource::InMemory }
    }

    /// Convert decoder output into typed records.
    ///
    /// If any item fails to decode into `M` the result is an empty in-memory
    /// list. The failure is logged and never returned.
    pub fn from_decoded(decoded: DecodedList) -> Self {
        let DecodedList { items, state, source } = decoded;
        match decode_items::<M>(&items) {
            Ok(elements) => Self { elements, state, source },
            Err(err) => {
                warn!(
                    model = %M::schema().name,
                    error = %err,
                    "List items failed to decode; treating payload as an empty list"
                );
                Self::default()
            }
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Where the elements come from.
    pub fn source(&self) -> &ListSource {
        &self.source
    }

    /// Elements currently held, without triggering a load.
    pub fn loaded(&self) -> &[M] {
        &self.elements
    }

    /// Number of elements currently held, without triggering a load.
    pub fn loaded_len(&self) -> usize {
        self.elements.len()
    }

    /// Fetch deferred elements if the list is pending.
    ///
    /// # Errors
    /// Returns the local store's error, or `SkylistError::Decode` if stored
    /// records do not decode into `M`. The list stays pending on error.
    pub fn load(&mut self) -> Result<()> {
        if self.state == LoadState::Loaded {
            return Ok(());
        }
        if let ListSource::Associated(records) = &self.source {
            let raw = records.fetch(&M::schema())?;
            self.elements = decode_items::<M>(&raw)?;
        }
        self.state = LoadState::Loaded;
        Ok(())
    }

    fn load_if_needed(&mut self) {
        if let Err(err) = self.load() {
            warn!(
                model = %M::schema().name,
                error = %err,
                "Deferred list load failed; list stays pending"
            );
        }
    }

    /// Element count, loading first if needed.
    ///
    /// A failed load is logged and counts as zero; the list stays pending.
    pub fn len(&mut self) -> usize {
        self.load_if_needed();
        self.elements.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, loading first if needed.
    ///
    /// # Errors
    /// Returns `SkylistError::IndexOutOfRange` when `index >= len`.
    pub fn get(&mut self, index: usize) -> Result<&M> {
        self.load_if_needed();
        let len = self.elements.len();
        self.elements.get(index).ok_or(SkylistError::IndexOutOfRange { index, len })
    }

    /// Iterate the elements, loading first if needed.
    ///
    /// Iterating again does not re-fetch unless [`List::limit`] re-armed the
    /// list in between.
    pub fn iter(&mut self) -> std::slice::Iter<'_, M> {
        self.load_if_needed();
        self.elements.iter()
    }

    /// Consume the list into its elements, loading first if needed.
    pub fn into_vec(mut self) -> Vec<M> {
        self.load_if_needed();
        self.elements
    }

    /// Change how many associated records the next load fetches.
    ///
    /// Re-arms an associated list so the next access queries again. No-op for
    /// other sources.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        if let ListSource::Associated(records) = &mut self.source {
            records.set_limit(limit);
            self.state = LoadState::Pending;
        }
        self
    }

    /// Whether a following remote page can be requested.
    pub fn has_next_page(&self) -> bool {
        matches!(&self.source, ListSource::Remote(page) if page.has_next_page())
    }

    /// Opaque cursor for the following page, if any.
    pub fn next_token(&self) -> Option<&str> {
        match &self.source {
            ListSource::Remote(page) => page.next_token(),
            ListSource::InMemory | ListSource::Associated(_) => None,
        }
    }

    /// Fetch the page after this one.
    ///
    /// Issues exactly one transport request.
    ///
    /// # Errors
    /// - `Unsupported` if this list carries no pagination metadata
    /// - `MissingContinuation` if this is the last page
    /// - `InvalidFilter` if the stored filter cannot be re-encoded
    /// - any transport error, unchanged
    pub async fn next_page(&self) -> Result<List<M>> {
        self.source.next_page::<M>().await
    }

    /// Blocking form of [`List::next_page`].
    ///
    /// Runs the fetch on `runtime` and parks the calling thread until the
    /// single result arrives. There is no timeout and no cancellation.
    /// `runtime` must be a multi-thread runtime: a current-thread runtime
    /// has no worker to drive the fetch while the caller is parked.
    ///
    /// # Errors
    /// - `Unsupported` if `runtime` is a current-thread runtime
    /// - `Internal` if the fetch task ends without a result
    /// - otherwise as [`List::next_page`]
    ///
    /// # Panics
    /// Panics if called from within an async execution context, where
    /// blocking would stall the thread the fetch needs.
    pub fn next_page_blocking(&self, runtime: &Handle) -> Result<List<M>> {
        if runtime.runtime_flavor() == RuntimeFlavor::CurrentThread {
            return Err(SkylistError::Unsupported(
                "blocking pagination needs a multi-thread runtime".into(),
            ));
        }
        let source = self.source.clone();
        let (sender, receiver) = oneshot::channel();
        runtime.spawn(async move {
            let _ = sender.send(source.next_page::<M>().await);
        });
        receiver.blocking_recv().map_err(|_| {
            SkylistError::Internal("next page task ended without producing a result".into())
        })?
    }

    /// Gather this page and every following page into one vector.
    ///
    /// # Errors
    /// Stops at the first failing load or page fetch.
    pub async fn collect_pages(mut self) -> Result<Vec<M>> {
        self.load()?;
        let mut collected = Vec::new();
        loop {
            let next = if self.has_next_page() { Some(self.next_page().await?) } else { None };
            collected.append(&mut self.elements);
            match next {
                Some(page) => self = page,
                None => return Ok(collected),
            }
        }
    }
}

fn decode_items<M: Model>(items: &[JsonValue]) -> Result<Vec<M>> {
    items.iter().map(|item| Ok(serde_json::from_value(item.to_serde()?)?)).collect()
}

impl<M: Model> Default for List<M> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<M: Model> From<Vec<M>> for List<M> {
    fn from(elements: Vec<M>) -> Self {
        Self::new(elements)
    }
}

impl<M: Model> FromIterator<M> for List<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<M: Model> IntoIterator for List<M> {
    type Item = M;
    type IntoIter = std::vec::IntoIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<'a, M: Model> IntoIterator for &'a mut List<M> {
    type Item = &'a M;
    type IntoIter = std::slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Writes the elements currently held as a JSON array; never loads.
impl<M: Model> Serialize for List<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.elements.serialize(serializer)
    }
}
