//! Two-phase lazy-load interception.
//!
//! # State Machine (per request)
//! ```text
//! Idle ──BEFORE──▶ Buffering ──AFTER(ok)────▶ Rewriting ──▶ Idle
//!                            └─AFTER(failed)─▶ Discarding ─▶ Idle
//! ```
//!
//! BEFORE swaps the host's output sink for a capture buffer and registers a
//! `FinalizeRecord` under the request's key. AFTER recomputes the key, takes
//! the record and finalizes: the original sink is restored and, unless the
//! pipeline failed, the captured markup is rewritten and written to it.

use std::error::Error;
use std::time::Instant;

use crate::config::LazyLoadConfig;
use crate::html::{HtmlRewriter, MarkupRewriter};
use crate::interceptor::bots::CrawlerBots;
use crate::interceptor::pending::{FinalizeRecord, PendingFinalize};
use crate::interceptor::sink::{CaptureBuffer, OutputSink};
use crate::keys::{CacheKey, KeyGenerator, PrefixKeyBuilder, RouteKeyGenerator};
use crate::observability::metrics;
use crate::routing::RouteData;

/// What the host pipeline exposes to the interceptor for one request.
pub trait ActionContext {
    /// Routing result, `None` if the request was not routed.
    fn route_data(&self) -> Option<&RouteData>;

    /// True for nested/partial sub-renders, which are never intercepted.
    fn is_child_action(&self) -> bool;

    fn user_agent(&self) -> Option<&str>;

    /// The active output sink.
    fn output(&mut self) -> &mut dyn OutputSink;

    /// Install `sink` as the active output sink and return the previous one.
    fn replace_output(&mut self, sink: Box<dyn OutputSink>) -> Box<dyn OutputSink>;

    /// Request-scoped registry of pending finalize records.
    fn pending(&mut self) -> &mut PendingFinalize;
}

/// Why BEFORE left the request alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ChildAction,
    Crawler,
    NoKey,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ChildAction => "child",
            SkipReason::Crawler => "crawler",
            SkipReason::NoKey => "no_key",
        }
    }
}

/// Result of the BEFORE phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Before {
    Buffering(CacheKey),
    Skipped(SkipReason),
}

/// Result of the AFTER phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum After {
    /// Captured markup was rewritten and written out.
    Rewritten,
    /// Nothing was captured; nothing was written.
    Empty,
    /// The pipeline failed; the capture was dropped.
    Discarded,
    /// No pending record for this request.
    NotPending,
    /// Child action.
    Skipped,
}

impl After {
    pub fn as_str(&self) -> &'static str {
        match self {
            After::Rewritten => "rewritten",
            After::Empty => "empty",
            After::Discarded => "discarded",
            After::NotPending => "passthrough",
            After::Skipped => "skipped",
        }
    }
}

/// The response interceptor.
#[derive(Debug, Clone)]
pub struct LazyLoadFilter<G = RouteKeyGenerator, R = HtmlRewriter> {
    key_generator: G,
    rewriter: R,
    crawler_bots: CrawlerBots,
}

impl LazyLoadFilter {
    pub fn from_config(config: &LazyLoadConfig) -> Self {
        Self::new(
            RouteKeyGenerator::new(PrefixKeyBuilder::with_prefix(config.key_prefix.clone())),
            HtmlRewriter::new(config.media_prefix.clone(), config.webp_query.clone()),
            CrawlerBots::new(config.crawler_bots.entries()),
        )
    }
}

impl<G: KeyGenerator, R: MarkupRewriter> LazyLoadFilter<G, R> {
    pub fn new(key_generator: G, rewriter: R, crawler_bots: CrawlerBots) -> Self {
        Self {
            key_generator,
            rewriter,
            crawler_bots,
        }
    }

    pub fn crawler_bots(&self) -> &CrawlerBots {
        &self.crawler_bots
    }

    fn key_for<C: ActionContext + ?Sized>(&self, ctx: &C) -> Option<CacheKey> {
        ctx.route_data()
            .and_then(|route| self.key_generator.generate_key(route))
    }

    /// Phase BEFORE: start capturing the page output.
    pub fn on_action_executing<C: ActionContext + ?Sized>(&self, ctx: &mut C) -> Before {
        if ctx.is_child_action() {
            return Before::Skipped(SkipReason::ChildAction);
        }
        if self.crawler_bots.matches(ctx.user_agent()) {
            tracing::debug!(user_agent = ?ctx.user_agent(), "Crawler request, markup left untouched");
            return Before::Skipped(SkipReason::Crawler);
        }
        let Some(key) = self.key_for(ctx) else {
            tracing::trace!("Request has no route key, not intercepted");
            return Before::Skipped(SkipReason::NoKey);
        };

        let buffer = CaptureBuffer::new();
        let original = ctx.replace_output(Box::new(buffer.clone()));
        let mut record = FinalizeRecord { original, buffer };
        if let Some(stale) = ctx.pending().take(&key) {
            // BEFORE ran twice: finalize must restore the outermost sink.
            tracing::warn!(key = %key, "Replacing an unfinished capture");
            record.original = stale.original;
        }
        ctx.pending().register(key.clone(), record);

        tracing::trace!(key = %key, "Capturing output");
        Before::Buffering(key)
    }

    /// Phase AFTER: finalize the capture started in BEFORE, if any.
    ///
    /// `failure` is the error propagating through the pipeline, if any.
    pub fn on_result_executed<C: ActionContext + ?Sized>(
        &self,
        ctx: &mut C,
        failure: Option<&(dyn Error + 'static)>,
    ) -> After {
        if ctx.is_child_action() {
            return After::Skipped;
        }
        let Some(key) = self.key_for(ctx) else {
            return After::NotPending;
        };
        let Some(record) = ctx.pending().take(&key) else {
            return After::NotPending;
        };

        if let Some(error) = failure {
            tracing::debug!(key = %key, error = %error, "Pipeline failed, discarding captured output");
        }
        self.finalize(ctx, &key, record, failure.is_some())
    }

    /// Restore the original sink and, absent errors, write the rewritten capture to it.
    pub fn finalize<C: ActionContext + ?Sized>(
        &self,
        ctx: &mut C,
        key: &CacheKey,
        record: FinalizeRecord,
        has_errors: bool,
    ) -> After {
        let FinalizeRecord { original, buffer } = record;
        drop(ctx.replace_output(original));

        if has_errors {
            return After::Discarded;
        }

        let markup = buffer.take();
        if markup.is_empty() {
            return After::Empty;
        }

        let start = Instant::now();
        let rewritten = self.rewriter.rewrite(&markup);
        metrics::record_rewrite_duration(start);
        tracing::debug!(
            key = %key,
            input_bytes = markup.len(),
            output_bytes = rewritten.len(),
            elapsed = ?start.elapsed(),
            "Replacing images"
        );

        ctx.output().write_str(&rewritten);
        After::Rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Host stand-in: the "client" sink is a capture buffer we can inspect.
    struct TestContext {
        route: Option<RouteData>,
        child: bool,
        user_agent: Option<String>,
        client: CaptureBuffer,
        output: Box<dyn OutputSink>,
        pending: PendingFinalize,
    }

    impl TestContext {
        fn new(route: Option<RouteData>) -> Self {
            let client = CaptureBuffer::new();
            Self {
                route,
                child: false,
                user_agent: Some("Mozilla/5.0 Firefox/128.0".into()),
                output: Box::new(client.clone()),
                client,
                pending: PendingFinalize::new(),
            }
        }

        fn page() -> Self {
            Self::new(Some(RouteData::new("Home", "Index")))
        }

        fn render(&mut self, markup: &str) {
            self.output.write_str(markup);
        }
    }

    impl ActionContext for TestContext {
        fn route_data(&self) -> Option<&RouteData> {
            self.route.as_ref()
        }
        fn is_child_action(&self) -> bool {
            self.child
        }
        fn user_agent(&self) -> Option<&str> {
            self.user_agent.as_deref()
        }
        fn output(&mut self) -> &mut dyn OutputSink {
            self.output.as_mut()
        }
        fn replace_output(&mut self, sink: Box<dyn OutputSink>) -> Box<dyn OutputSink> {
            std::mem::replace(&mut self.output, sink)
        }
        fn pending(&mut self) -> &mut PendingFinalize {
            &mut self.pending
        }
    }

    #[derive(Clone, Default)]
    struct CountingRewriter {
        calls: Arc<AtomicUsize>,
    }

    impl MarkupRewriter for CountingRewriter {
        fn rewrite(&self, markup: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            markup.to_uppercase()
        }
    }

    fn counting_filter() -> (LazyLoadFilter<RouteKeyGenerator, CountingRewriter>, Arc<AtomicUsize>) {
        let rewriter = CountingRewriter::default();
        let calls = rewriter.calls.clone();
        let filter = LazyLoadFilter::new(RouteKeyGenerator::default(), rewriter, CrawlerBots::default());
        (filter, calls)
    }

    #[derive(Debug)]
    struct RenderFailed;

    impl std::fmt::Display for RenderFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("render failed")
        }
    }

    impl Error for RenderFailed {}

    #[test]
    fn test_capture_and_rewrite() {
        let filter = LazyLoadFilter::from_config(&LazyLoadConfig::default());
        let mut ctx = TestContext::page();

        let before = filter.on_action_executing(&mut ctx);
        assert!(matches!(before, Before::Buffering(_)));
        ctx.render(r#"<p><img src="/static/b.png"></p>"#);
        assert!(ctx.client.is_empty(), "output must be captured, not sent");
        assert_eq!(ctx.pending.len(), 1);

        assert_eq!(filter.on_result_executed(&mut ctx, None), After::Rewritten);
        assert_eq!(ctx.client.contents(), r#"<p><img data-src="/static/b.png" class="lazyload"></p>"#);
        assert!(ctx.pending.is_empty());

        // The original sink is active again.
        ctx.render("!");
        assert!(ctx.client.contents().ends_with('!'));
    }

    #[test]
    fn test_crawler_sees_unmodified_markup() {
        let (filter, calls) = counting_filter();
        let mut ctx = TestContext::page();
        ctx.user_agent = Some("Mozilla/5.0 (compatible; Googlebot/2.1)".into());
        let markup = r#"<img src="/media/a.png">"#;

        assert_eq!(filter.on_action_executing(&mut ctx), Before::Skipped(SkipReason::Crawler));
        ctx.render(markup);
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::NotPending);

        assert_eq!(ctx.client.contents(), markup);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_discards_capture() {
        let (filter, calls) = counting_filter();
        let mut ctx = TestContext::page();

        filter.on_action_executing(&mut ctx);
        ctx.render("<html><body><img src=\"/media/half");
        let after = filter.on_result_executed(&mut ctx, Some(&RenderFailed));

        assert_eq!(after, After::Discarded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.client.is_empty());

        // Error content written by the unwinding pipeline reaches the client.
        ctx.render("error page");
        assert_eq!(ctx.client.contents(), "error page");
    }

    #[test]
    fn test_no_key_means_no_interception() {
        let (filter, calls) = counting_filter();
        let mut route = RouteData::default();
        route.values.insert("controller", "Home");
        let mut ctx = TestContext::new(Some(route));

        assert_eq!(filter.on_action_executing(&mut ctx), Before::Skipped(SkipReason::NoKey));
        assert!(ctx.pending.is_empty());
        ctx.render("<p>direct</p>");
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::NotPending);
        assert_eq!(ctx.client.contents(), "<p>direct</p>");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut unrouted = TestContext::new(None);
        assert_eq!(filter.on_action_executing(&mut unrouted), Before::Skipped(SkipReason::NoKey));
    }

    #[test]
    fn test_child_actions_are_skipped() {
        let (filter, _) = counting_filter();
        let mut ctx = TestContext::page();
        ctx.child = true;

        assert_eq!(filter.on_action_executing(&mut ctx), Before::Skipped(SkipReason::ChildAction));
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::Skipped);
        assert!(ctx.pending.is_empty());
    }

    #[test]
    fn test_empty_capture_writes_nothing() {
        let (filter, calls) = counting_filter();
        let mut ctx = TestContext::page();

        filter.on_action_executing(&mut ctx);
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::Empty);
        assert!(ctx.client.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_after_runs_finalize_once() {
        let (filter, calls) = counting_filter();
        let mut ctx = TestContext::page();

        filter.on_action_executing(&mut ctx);
        ctx.render("abc");
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::Rewritten);
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::NotPending);
        assert_eq!(ctx.client.contents(), "ABC");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_before_keeps_client_sink() {
        let (filter, _) = counting_filter();
        let mut ctx = TestContext::page();

        filter.on_action_executing(&mut ctx);
        ctx.render("lost");
        filter.on_action_executing(&mut ctx);
        ctx.render("kept");
        assert_eq!(filter.on_result_executed(&mut ctx, None), After::Rewritten);
        assert_eq!(ctx.client.contents(), "KEPT");

        ctx.render("!");
        assert_eq!(ctx.client.contents(), "KEPT!");
    }
}
