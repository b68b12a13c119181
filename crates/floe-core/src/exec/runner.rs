use crate::{
    error::InternalError,
    exec::{
        AggregateGuard, CompiledQuery, ExecParams, RowBound,
        expand::expand_parameters,
        shaper::{ExecContext, QueryOutput},
        store::{AsyncDocumentStore, DocumentStore, QueryText, RowIter, RowStream, StoreError},
    },
    plan::SqlFunction,
    render,
    value::Value,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

///
/// QueryRunner
///
/// Lazy materializer for one compiled query and one set of parameter
/// values. Nothing touches the store until the first pull; the plan is
/// rendered at that moment, so callers can keep composing beforehand
/// without cost. Both iterator variants share expansion, shaping, and
/// the single error-interception point.
///

pub struct QueryRunner {
    query: CompiledQuery,
    params: ExecParams,
}

impl QueryRunner {
    #[must_use]
    pub const fn new(query: CompiledQuery, params: ExecParams) -> Self {
        Self { query, params }
    }

    #[must_use]
    pub const fn query(&self) -> &CompiledQuery {
        &self.query
    }

    /// Synchronous pull iterator over shaped results.
    #[must_use]
    pub fn iter<'a>(&'a self, store: &'a dyn DocumentStore) -> RunnerIter<'a> {
        RunnerIter {
            runner: self,
            store,
            ctx: self.context(),
            state: IterState::Pending,
            rows_seen: 0,
        }
    }

    /// Cancellable asynchronous stream with semantics identical to
    /// [`Self::iter`]. Cancellation is cooperative, checked at the one
    /// suspend point (pulling the next raw row).
    #[must_use]
    pub fn stream<'a>(
        &'a self,
        store: Arc<dyn AsyncDocumentStore>,
        cancel: CancellationToken,
    ) -> RunnerStream<'a> {
        RunnerStream {
            runner: self,
            store,
            cancel,
            ctx: self.context(),
            state: StreamState::Pending,
            rows_seen: 0,
        }
    }

    /// Drain the synchronous iterator into a vector.
    pub fn fetch_all(&self, store: &dyn DocumentStore) -> Result<Vec<QueryOutput>, InternalError> {
        self.iter(store).collect()
    }

    /// Consume a first/single-bounded query, enforcing its cardinality.
    pub fn fetch_one(
        &self,
        store: &dyn DocumentStore,
    ) -> Result<Option<QueryOutput>, InternalError> {
        let mut first = None;
        for item in self.iter(store) {
            let output = item?;
            if first.is_none() {
                first = Some(output);
            }
        }

        Ok(first)
    }

    /// Consume an aggregate-bounded query down to its scalar value.
    pub fn fetch_scalar(&self, store: &dyn DocumentStore) -> Result<Value, InternalError> {
        if !matches!(self.query.bound(), RowBound::Aggregate(_)) {
            return Err(InternalError::executor_invariant(
                "fetch_scalar requires an aggregate-bounded query",
            ));
        }

        for item in self.iter(store) {
            match item? {
                QueryOutput::Scalar(value) => return Ok(value),
                other => {
                    return Err(InternalError::executor_invariant(format!(
                        "aggregate query produced a non-scalar output: {other:?}"
                    )));
                }
            }
        }

        Err(InternalError::no_elements())
    }

    // ------------------------------------------------------------------
    // Shared execution mechanics
    // ------------------------------------------------------------------

    fn context(&self) -> ExecContext {
        ExecContext {
            parameters: self.params.clone(),
        }
    }

    fn container(&self) -> &str {
        &self.query.plan().source().container
    }

    // Expansion and rendering run once per execution, at first pull.
    fn prepare(&self) -> Result<QueryText, InternalError> {
        let expanded = expand_parameters(self.query.plan(), &self.params)?;
        let text = render::generate(&expanded, &self.params)?;

        tracing::debug!(
            entity = %self.query.entity(),
            container = %self.container(),
            query = %text.text,
            "document query rendered"
        );

        Ok(text)
    }

    // The single interception point for store/iteration failures: log
    // with the owning context's identity, re-raise unchanged.
    fn intercept(&self, err: StoreError) -> InternalError {
        tracing::error!(
            entity = %self.query.entity(),
            container = %self.container(),
            error = %err,
            "document store query failed"
        );

        InternalError::from(err)
    }

    fn admit_row(&self, rows_seen: usize) -> Result<(), InternalError> {
        if matches!(self.query.bound(), RowBound::Single) && rows_seen >= 1 {
            return Err(InternalError::more_than_one_element());
        }

        Ok(())
    }

    fn guard_output(&self, output: QueryOutput) -> Result<QueryOutput, InternalError> {
        let RowBound::Aggregate(guard) = self.query.bound() else {
            return Ok(output);
        };
        match output {
            QueryOutput::Scalar(value) => guard_aggregate(guard, value),
            other => Err(InternalError::executor_invariant(format!(
                "aggregate query produced a non-scalar output: {other:?}"
            ))),
        }
    }

    // An aggregate over zero rows behaves exactly like a null result.
    fn finish_empty(&self) -> Option<Result<QueryOutput, InternalError>> {
        match self.query.bound() {
            RowBound::Aggregate(guard) => Some(guard_aggregate(guard, Value::Null)),
            _ => None,
        }
    }
}

/// Apply the empty-sequence guard to an aggregate value. Raised only
/// here, at consumption time, never at compile time.
fn guard_aggregate(guard: &AggregateGuard, value: Value) -> Result<QueryOutput, InternalError> {
    if !value.is_null() {
        return Ok(QueryOutput::Scalar(value));
    }

    match guard.function {
        SqlFunction::Count | SqlFunction::Sum => Value::zero(&guard.ty.kind)
            .map(QueryOutput::Scalar)
            .ok_or_else(|| {
                InternalError::executor_invariant(format!(
                    "aggregate result kind {:?} has no zero value",
                    guard.ty.kind
                ))
            }),
        SqlFunction::Avg | SqlFunction::Min | SqlFunction::Max => {
            if guard.ty.nullable {
                Ok(QueryOutput::Scalar(Value::Null))
            } else {
                Err(InternalError::no_elements())
            }
        }
        other => Err(InternalError::executor_invariant(format!(
            "function {other} is not an aggregate"
        ))),
    }
}

enum IterState {
    Pending,
    Active(RowIter),
    Done,
}

///
/// RunnerIter
///
/// Synchronous pull iterator. Prior yielded rows stay valid when an
/// iteration failure aborts the remainder.
///

pub struct RunnerIter<'a> {
    runner: &'a QueryRunner,
    store: &'a dyn DocumentStore,
    ctx: ExecContext,
    state: IterState,
    rows_seen: usize,
}

impl Iterator for RunnerIter<'_> {
    type Item = Result<QueryOutput, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, IterState::Done) {
                IterState::Done => return None,
                IterState::Pending => {
                    let text = match self.runner.prepare() {
                        Ok(text) => text,
                        Err(err) => return Some(Err(err)),
                    };
                    match self.store.query(self.runner.container(), &text) {
                        Ok(rows) => self.state = IterState::Active(rows),
                        Err(err) => return Some(Err(self.runner.intercept(err))),
                    }
                }
                IterState::Active(mut rows) => match rows.next() {
                    Some(Ok(row)) => {
                        if let Err(err) = self.runner.admit_row(self.rows_seen) {
                            return Some(Err(err));
                        }
                        self.rows_seen += 1;

                        let result = self
                            .runner
                            .query
                            .shaper()
                            .shape(&self.ctx, &row)
                            .and_then(|output| self.runner.guard_output(output));

                        // Aggregates are single-row by construction.
                        let keep_pulling = result.is_ok()
                            && !matches!(self.runner.query.bound(), RowBound::Aggregate(_));
                        if keep_pulling {
                            self.state = IterState::Active(rows);
                        }

                        return Some(result);
                    }
                    Some(Err(err)) => return Some(Err(self.runner.intercept(err))),
                    None => {
                        if self.rows_seen == 0 {
                            return self.runner.finish_empty();
                        }
                        return None;
                    }
                },
            }
        }
    }
}

enum StreamState {
    Pending,
    Active(RowStream),
    Done,
}

///
/// RunnerStream
///
/// Asynchronous variant of [`RunnerIter`] with a future-returning
/// `next`. The only suspend point is the raw-row pull; lowering and
/// shaping never suspend. A cancelled token yields the cancellation
/// condition once, then the stream is exhausted; the plan and shaper
/// are immutable throughout.
///

pub struct RunnerStream<'a> {
    runner: &'a QueryRunner,
    store: Arc<dyn AsyncDocumentStore>,
    cancel: CancellationToken,
    ctx: ExecContext,
    state: StreamState,
    rows_seen: usize,
}

impl RunnerStream<'_> {
    pub async fn next(&mut self) -> Option<Result<QueryOutput, InternalError>> {
        loop {
            match std::mem::replace(&mut self.state, StreamState::Done) {
                StreamState::Done => return None,
                StreamState::Pending => {
                    if self.cancel.is_cancelled() {
                        return Some(Err(InternalError::cancelled()));
                    }
                    let text = match self.runner.prepare() {
                        Ok(text) => text,
                        Err(err) => return Some(Err(err)),
                    };
                    match self.store.query(self.runner.container(), &text).await {
                        Ok(rows) => self.state = StreamState::Active(rows),
                        Err(err) => return Some(Err(self.runner.intercept(err))),
                    }
                }
                StreamState::Active(mut rows) => {
                    if self.cancel.is_cancelled() {
                        return Some(Err(InternalError::cancelled()));
                    }
                    match rows.next().await {
                        Some(Ok(row)) => {
                            if let Err(err) = self.runner.admit_row(self.rows_seen) {
                                return Some(Err(err));
                            }
                            self.rows_seen += 1;

                            let result = self
                                .runner
                                .query
                                .shaper()
                                .shape(&self.ctx, &row)
                                .and_then(|output| self.runner.guard_output(output));

                            let keep_pulling = result.is_ok()
                                && !matches!(self.runner.query.bound(), RowBound::Aggregate(_));
                            if keep_pulling {
                                self.state = StreamState::Active(rows);
                            }

                            return Some(result);
                        }
                        Some(Err(err)) => return Some(Err(self.runner.intercept(err))),
                        None => {
                            if self.rows_seen == 0 {
                                return self.runner.finish_empty();
                            }
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// Drain the stream into a vector, stopping at the first failure.
    pub async fn try_collect(mut self) -> Result<Vec<QueryOutput>, InternalError> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?);
        }

        Ok(out)
    }
}
