//! Lazy list traversal
//!
//! [`CursorPaginator`] turns a [`ListRequest`] into a [`Traversal`], a pull-based
//! sequence of records. Every call to [`Traversal::next`] either returns an
//! already fetched record or performs exactly the next network step:
//!
//! 1. probe the first page (with total count),
//! 2. when the set is larger than one page, probe the last record in reversed
//!    order to learn the key range,
//! 3. fetch the remaining key range as page-sized windows through grouped calls.
//!
//! Nothing is fetched ahead of demand, so dropping a traversal is enough to
//! cancel it. `next` is cancel-safe: the phase only moves once a network step
//! has completed, so a `next` future dropped mid-call leaves the step to be
//! repeated by the following call.

use super::types::{ListRequest, Strategy, TraversalSession, TraversalStats};
use super::windows::{split_windows, IdWindow};
use crate::batch::{CommandMultiplexer, CommandOutcome};
use crate::error::{CommandError, Error, Result};
use crate::query::{Direction, Select};
use crate::remote::{PageResult, RemoteCaller};
use crate::types::{Params, MAX_BATCH_COMMANDS, NO_COUNT_START, PAGE_SIZE};
use futures::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for list traversals
#[derive(Clone)]
pub struct CursorPaginator {
    caller: Arc<dyn RemoteCaller>,
    parallel: bool,
}

impl CursorPaginator {
    /// Create a paginator over a remote caller
    pub fn new(caller: Arc<dyn RemoteCaller>) -> Self {
        Self {
            caller,
            parallel: false,
        }
    }

    /// Ask the remote side to run window commands concurrently
    #[must_use]
    pub fn with_parallel_hint(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Start a traversal.
    ///
    /// The request is validated here; no call is made until the first
    /// [`Traversal::next`].
    pub fn traverse(&self, request: ListRequest) -> Result<Traversal> {
        let session = TraversalSession::from_request(request)?;
        Ok(Traversal {
            mux: CommandMultiplexer::new(Arc::clone(&self.caller)),
            session,
            parallel: self.parallel,
            phase: Phase::Probe,
            records: VecDeque::new(),
            outcomes: VecDeque::new(),
            stats: TraversalStats::default(),
        })
    }
}

impl std::fmt::Debug for CursorPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorPaginator")
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

/// Next network step of a traversal
#[derive(Debug)]
enum Phase {
    /// First page not fetched yet
    Probe,
    /// First page fetched, last record's key unknown
    ReverseProbe { first_page_last_id: u64 },
    /// Windows not registered yet, in emission order
    Windows { pending: VecDeque<IdWindow> },
    /// Degraded paging past the last seen key
    Sequential { last_id: u64, direction: Direction },
    /// Nothing left to fetch
    Exhausted,
}

/// Lazy sequence of records of one list request
#[derive(Debug)]
pub struct Traversal {
    mux: CommandMultiplexer,
    session: TraversalSession,
    parallel: bool,
    phase: Phase,
    records: VecDeque<Value>,
    outcomes: VecDeque<CommandOutcome>,
    stats: TraversalStats,
}

impl Traversal {
    /// Next record, `None` once the set (or the limit) is exhausted.
    ///
    /// After an error the traversal is finished and returns `None`.
    pub async fn next(&mut self) -> Option<Result<Value>> {
        loop {
            if self.session.limit_reached() {
                self.finish();
                return None;
            }

            if let Some(record) = self.records.pop_front() {
                self.session.emitted += 1;
                self.stats.emitted = self.session.emitted;
                return Some(Ok(record));
            }

            if let Some(outcome) = self.outcomes.pop_front() {
                match self.page_records(outcome) {
                    Ok(records) => self.records.extend(records),
                    Err(err) => {
                        self.finish();
                        return Some(Err(err));
                    }
                }
                continue;
            }

            match self.advance().await {
                Ok(true) => {}
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(err) => {
                    self.finish();
                    return Some(Err(err));
                }
            }
        }
    }

    /// Drain the traversal into a vector, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record?);
        }
        Ok(records)
    }

    /// Adapt the traversal into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + Send {
        futures::stream::unfold(self, |mut traversal| async move {
            traversal
                .next()
                .await
                .map(|item| (item, traversal))
        })
    }

    /// Counters so far
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Records yielded so far
    pub fn emitted(&self) -> usize {
        self.session.emitted
    }

    /// Perform the next network step. `Ok(false)` means nothing is left.
    ///
    /// Each step leaves `self.phase` untouched until its call has returned.
    async fn advance(&mut self) -> Result<bool> {
        match &self.phase {
            Phase::Probe => self.probe().await?,
            &Phase::ReverseProbe { first_page_last_id } => {
                self.reverse_probe(first_page_last_id).await?;
            }
            Phase::Windows { pending } => {
                if pending.is_empty() {
                    return Ok(false);
                }
                self.fetch_windows().await;
            }
            &Phase::Sequential { last_id, direction } => {
                self.fetch_sequential(last_id, direction).await?;
            }
            Phase::Exhausted => return Ok(false),
        }
        Ok(true)
    }

    async fn probe(&mut self) -> Result<()> {
        let params = self.session.params(
            &self.session.order,
            &self.session.filter,
            &self.session.select,
            0,
        );
        let page = self.execute_single(params).await?;
        let total = page.pagination.total;
        let records = self.session.shape.records(page.payload)?;

        let large =
            records.len() >= PAGE_SIZE && total.map_or(true, |total| total > PAGE_SIZE as u64);

        match records.last() {
            Some(last) if large => {
                let first_page_last_id = self.session.key_of(last)?;
                debug!(
                    "{}: {} records in set, first page ends at {}={first_page_last_id}",
                    self.session.method,
                    total.map_or_else(|| "unknown".to_string(), |t| t.to_string()),
                    self.session.key_field
                );
                self.stats.strategy = Some(if self.session.reverse_probe {
                    Strategy::Windowed
                } else {
                    Strategy::Sequential
                });
                self.phase = Phase::ReverseProbe { first_page_last_id };
            }
            _ => {
                debug!(
                    "{}: single page with {} records",
                    self.session.method,
                    records.len()
                );
                self.stats.strategy = Some(Strategy::SinglePage);
                self.phase = Phase::Exhausted;
            }
        }

        self.records.extend(records);
        Ok(())
    }

    async fn reverse_probe(&mut self, first_page_last_id: u64) -> Result<()> {
        if !self.session.reverse_probe {
            warn!(
                "{} cannot be probed in reversed order, paging sequentially past {}={first_page_last_id}",
                self.session.method, self.session.key_field
            );
            self.phase = Phase::Sequential {
                last_id: first_page_last_id,
                direction: self.session.key_direction,
            };
            return Ok(());
        }

        let order = self.session.order.reversed();
        let select = Select::fields([self.session.key_field.clone()]);
        let params = self
            .session
            .params(&order, &self.session.filter, &select, NO_COUNT_START);
        let page = self.execute_single(params).await?;
        let records = self.session.shape.records(page.payload)?;

        let Some(edge) = records.first() else {
            debug!("{}: reverse probe returned no records", self.session.method);
            self.phase = Phase::Exhausted;
            return Ok(());
        };
        let last_element_id = self.session.key_of(edge)?;

        let (direction, windows) = split_windows(first_page_last_id, last_element_id, PAGE_SIZE);
        if direction != self.session.key_direction {
            warn!(
                "{}: key range runs {direction} although {} was requested {}",
                self.session.method, self.session.key_field, self.session.key_direction
            );
        }
        debug!(
            "{}: {} windows between {}={first_page_last_id} and {}={last_element_id}",
            self.session.method,
            windows.len(),
            self.session.key_field,
            self.session.key_field
        );

        self.stats.windows_planned = windows.len();
        self.phase = Phase::Windows {
            pending: windows.into(),
        };
        Ok(())
    }

    /// Register and execute as many windows as current demand can use
    async fn fetch_windows(&mut self) {
        let Phase::Windows { pending } = &self.phase else {
            return;
        };
        let wanted = self
            .session
            .remaining()
            .map_or(MAX_BATCH_COMMANDS, |remaining| remaining.div_ceil(PAGE_SIZE));
        let count = wanted.clamp(1, MAX_BATCH_COMMANDS).min(pending.len());
        let windows: Vec<IdWindow> = pending.iter().take(count).copied().collect();

        // Leftovers of a cancelled step must not ride along
        self.mux.clear();
        for window in windows {
            let filter = window.apply(&self.session.filter, &self.session.key_field);
            let params = self.session.params(
                &self.session.order,
                &filter,
                &self.session.select,
                NO_COUNT_START,
            );
            self.mux.register(self.session.method.clone(), params);
        }

        let outcomes = self.mux.execute(self.parallel).await;

        self.stats.commands += count;
        self.stats.grouped_calls += count.div_ceil(MAX_BATCH_COMMANDS);
        self.outcomes
            .extend(outcomes.into_iter().map(|(_, outcome)| outcome));
        if let Phase::Windows { pending } = &mut self.phase {
            pending.drain(..count);
        }
    }

    async fn fetch_sequential(&mut self, last_id: u64, direction: Direction) -> Result<()> {
        let key = &self.session.key_field;
        let mut filter = self.session.filter.clone();
        match direction {
            Direction::Asc => filter.set(format!(">{key}"), last_id),
            Direction::Desc => filter.set(format!("<{key}"), last_id),
        }

        let params = self.session.params(
            &self.session.order,
            &filter,
            &self.session.select,
            NO_COUNT_START,
        );
        let page = self.execute_single(params).await?;
        let records = self.session.shape.records(page.payload)?;

        self.phase = match records.last() {
            Some(last) if records.len() >= PAGE_SIZE => Phase::Sequential {
                last_id: self.session.key_of(last)?,
                direction,
            },
            _ => Phase::Exhausted,
        };

        self.records.extend(records);
        Ok(())
    }

    /// Run one command through the multiplexer
    async fn execute_single(&mut self, params: Params) -> Result<PageResult> {
        self.mux.clear();
        let key = self.mux.register(self.session.method.clone(), params);
        let outcome = self.mux.execute(self.parallel).await.pop();
        self.stats.commands += 1;
        self.stats.grouped_calls += 1;

        match outcome {
            Some((_, outcome)) => outcome.map_err(Error::from),
            None => Err(CommandError::api(
                "MISSING_RESULT",
                format!("no outcome for command {key}"),
            )
            .into()),
        }
    }

    fn page_records(&self, outcome: CommandOutcome) -> Result<Vec<Value>> {
        let page = outcome.map_err(Error::from)?;
        self.session.shape.records(page.payload)
    }

    fn finish(&mut self) {
        self.phase = Phase::Exhausted;
        self.records.clear();
        self.outcomes.clear();
        self.mux.clear();
    }
}
