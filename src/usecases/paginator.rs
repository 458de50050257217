//! Multi-page history retrieval.
//!
//! Drives `MessageSource::fetch_page` with an advancing id cursor until one of the stop
//! conditions holds, merging the per-page name tables into one result.

use crate::domain::{DomainError, FetchOptions, FetchResult, PageProgress, PartialFetch};
use crate::ports::MessageSource;
use crate::shared::Tuning;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-page progress callback. Must return quickly; it runs on the fetch path.
pub type PageCallback<'a> = &'a mut (dyn FnMut(PageProgress) + Send);

/// The platform returns messages strictly before `offset_date`; this pushes the first
/// cursor past the end of the `max_date` day.
const OFFSET_DATE_BUFFER_HOURS: i64 = 24;

pub struct Paginator {
    source: Arc<dyn MessageSource>,
    tuning: Tuning,
}

impl Paginator {
    pub fn new(source: Arc<dyn MessageSource>, tuning: Tuning) -> Self {
        Self { source, tuning }
    }

    pub async fn chat_name(&self, chat_id: i64) -> Result<Option<String>, DomainError> {
        self.source.chat_name(chat_id).await
    }

    /// Fetch every message matching `opts`, newest first.
    ///
    /// Stops on: an empty page without a further cursor, a message older than `min_date` (only messages at or after it
    /// are kept), `max_count` reached (truncated to the limit), or the platform reporting no
    /// further pages. Cancellation is checked before each page.
    ///
    /// On failure the messages collected before the failing page come back in `PartialFetch`.
    pub async fn fetch_all(
        &self,
        chat_id: i64,
        opts: &FetchOptions,
        mut on_batch: Option<PageCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, PartialFetch> {
        let mut result = FetchResult::empty(chat_id);

        let mut page_opts = FetchOptions {
            limit: if opts.limit > 0 {
                opts.limit
            } else {
                self.tuning.export_page_size
            },
            unread_only: opts.unread_only,
            offset_date: opts
                .max_date
                .map(|d| d + ChronoDuration::hours(OFFSET_DATE_BUFFER_HOURS)),
            ..FetchOptions::default()
        };

        let mut page_no = 0usize;
        loop {
            page_no += 1;
            if cancel.is_cancelled() {
                info!(chat_id, collected = result.messages.len(), "fetch cancelled");
                return Err(partial(
                    result,
                    DomainError::cancelled(format!("fetching page {}", page_no)),
                ));
            }

            let page = match self.source.fetch_page(chat_id, &page_opts).await {
                Ok(page) => page,
                Err(e) => {
                    return Err(partial(result, e.context(format!("fetching page {}", page_no))));
                }
            };

            let earliest = page.earliest_date();
            result.users.extend(page.users);
            result.chats.extend(page.chats);

            if page.messages.is_empty() {
                notify(&mut on_batch, page_no, result.messages.len(), None);
                // A page of service records decodes empty but still carries a cursor.
                match page.next_id.filter(|_| page.has_more) {
                    Some(next) => {
                        page_opts.offset_id = next;
                        page_opts.offset_date = None;
                        continue;
                    }
                    None => break,
                }
            }

            let mut reached_min_date = false;
            for msg in page.messages {
                if opts.min_date.is_some_and(|min| msg.date < min) {
                    reached_min_date = true;
                    break;
                }
                result.messages.push(msg);

                if opts.max_count > 0 && result.messages.len() >= opts.max_count {
                    notify(&mut on_batch, page_no, result.messages.len(), earliest);
                    debug!(chat_id, pages = page_no, "max count reached");
                    return Ok(finish(result));
                }
            }

            notify(&mut on_batch, page_no, result.messages.len(), earliest);

            if reached_min_date || !page.has_more {
                break;
            }
            match page.next_id {
                Some(next) => page_opts.offset_id = next,
                None => break,
            }
            // Only the first page is positioned by date.
            page_opts.offset_date = None;
        }

        info!(chat_id, pages = page_no, collected = result.messages.len(), "fetch complete");
        Ok(finish(result))
    }
}

fn notify(
    on_batch: &mut Option<PageCallback<'_>>,
    page: usize,
    collected: usize,
    earliest: Option<chrono::DateTime<chrono::Utc>>,
) {
    if let Some(cb) = on_batch.as_deref_mut() {
        cb(PageProgress {
            page,
            collected,
            earliest,
        });
    }
}

fn finish(mut result: FetchResult) -> FetchResult {
    result.count = result.messages.len();
    result.total = result.messages.len();
    result.has_more = false;
    result.next_id = None;
    result
}

fn partial(result: FetchResult, error: DomainError) -> PartialFetch {
    PartialFetch {
        partial: finish(result),
        error,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::format::tests::msg;
    use crate::domain::Message;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves pre-built pages in order and records the options of each request.
    pub(crate) struct ScriptedSource {
        pages: Mutex<VecDeque<Result<FetchResult, DomainError>>>,
        pub(crate) requests: Mutex<Vec<FetchOptions>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(pages: Vec<Result<FetchResult, DomainError>>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl MessageSource for ScriptedSource {
        async fn fetch_page(
            &self,
            chat_id: i64,
            opts: &FetchOptions,
        ) -> Result<FetchResult, DomainError> {
            self.requests.lock().unwrap().push(opts.clone());
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(FetchResult::empty(chat_id)))
        }

        async fn chat_name(&self, _chat_id: i64) -> Result<Option<String>, DomainError> {
            Ok(Some("Test Chat".into()))
        }
    }

    /// A page of messages (newest first) with a cursor, as the Telegram adapter builds it.
    pub(crate) fn page(messages: Vec<Message>, has_more: bool) -> Result<FetchResult, DomainError> {
        let mut p = FetchResult::empty(1);
        p.next_id = messages.last().map(|m| m.id);
        p.count = messages.len();
        p.has_more = has_more;
        p.messages = messages;
        Ok(p)
    }

    fn ids(r: &FetchResult) -> Vec<i32> {
        r.messages.iter().map(|m| m.id).collect()
    }

    fn paginator(source: Arc<ScriptedSource>) -> Paginator {
        Paginator::new(source, Tuning::default())
    }

    #[tokio::test]
    async fn test_walks_pages_until_no_more() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(6, 600, 1, "f"), msg(5, 500, 1, "e")], true),
            page(vec![msg(4, 400, 1, "d"), msg(3, 300, 1, "c")], true),
            page(vec![msg(2, 200, 1, "b")], false),
        ]);
        let result = paginator(source.clone())
            .fetch_all(1, &FetchOptions::default(), None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![6, 5, 4, 3, 2]);
        assert_eq!(result.count, 5);
        assert_eq!(result.total, 5);

        let reqs = source.requests.lock().unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].offset_id, 0);
        assert_eq!(reqs[0].limit, 50);
        assert_eq!(reqs[1].offset_id, 5);
        assert_eq!(reqs[2].offset_id, 3);
    }

    #[tokio::test]
    async fn test_min_date_boundary_stops_and_filters() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(6, 600, 1, "f"), msg(5, 500, 1, "e")], true),
            page(vec![msg(4, 400, 1, "d"), msg(3, 300, 1, "c"), msg(2, 200, 1, "b")], true),
            page(vec![msg(1, 100, 1, "a")], false),
        ]);
        let opts = FetchOptions {
            min_date: Some(Utc.timestamp_opt(400, 0).unwrap()),
            ..FetchOptions::default()
        };
        let result = paginator(source.clone())
            .fetch_all(1, &opts, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![6, 5, 4]);
        assert!(result.messages.iter().all(|m| m.date >= opts.min_date.unwrap()));
        assert_eq!(source.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_max_count_truncates_mid_page() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(6, 600, 1, "f"), msg(5, 500, 1, "e")], true),
            page(vec![msg(4, 400, 1, "d"), msg(3, 300, 1, "c")], true),
        ]);
        let opts = FetchOptions {
            max_count: 3,
            ..FetchOptions::default()
        };
        let mut progress = Vec::new();
        let mut cb = |p: PageProgress| progress.push(p);
        let result = paginator(source)
            .fetch_all(1, &opts, Some(&mut cb), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![6, 5, 4]);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].collected, 3);
        assert_eq!(progress[1].earliest, Some(Utc.timestamp_opt(300, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_empty_page_reports_and_stops() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(2, 200, 1, "b")], true),
            page(vec![], true),
        ]);
        let mut progress = Vec::new();
        let mut cb = |p: PageProgress| progress.push(p);
        let result = paginator(source)
            .fetch_all(1, &FetchOptions::default(), Some(&mut cb), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![2]);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[1].page, 2);
        assert_eq!(progress[1].earliest, None);
    }

    #[tokio::test]
    async fn test_skipped_records_page_keeps_walking() {
        let mut service_only = FetchResult::empty(1);
        service_only.has_more = true;
        service_only.next_id = Some(4);
        let source = ScriptedSource::new(vec![
            page(vec![msg(6, 600, 1, "f")], true),
            Ok(service_only),
            page(vec![msg(3, 300, 1, "c")], false),
        ]);
        let result = paginator(source.clone())
            .fetch_all(1, &FetchOptions::default(), None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![6, 3]);
        let reqs = source.requests.lock().unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[2].offset_id, 4);
    }

    #[tokio::test]
    async fn test_max_date_buffer_only_on_first_page() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(9, 900, 1, "x")], true),
            page(vec![msg(8, 800, 1, "y")], false),
        ]);
        let max: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let opts = FetchOptions {
            max_date: Some(max),
            limit: 20,
            ..FetchOptions::default()
        };
        paginator(source.clone())
            .fetch_all(1, &opts, None, &CancellationToken::new())
            .await
            .unwrap();

        let reqs = source.requests.lock().unwrap();
        assert_eq!(
            reqs[0].offset_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(reqs[0].limit, 20);
        assert_eq!(reqs[1].offset_date, None);
        assert_eq!(reqs[1].offset_id, 9);
    }

    #[tokio::test]
    async fn test_page_error_returns_partial() {
        let source = ScriptedSource::new(vec![
            page(vec![msg(3, 300, 1, "c")], true),
            Err(DomainError::upstream("getting messages", "RPC error 500")),
        ]);
        let err = paginator(source)
            .fetch_all(1, &FetchOptions::default(), None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(ids(&err.partial), vec![3]);
        assert!(matches!(err.error, DomainError::Upstream { .. }));
        assert_eq!(
            err.to_string(),
            "fetching page 2: getting messages: RPC error 500"
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let source = ScriptedSource::new(vec![page(vec![msg(1, 100, 1, "a")], false)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = paginator(source.clone())
            .fetch_all(1, &FetchOptions::default(), None, &cancel)
            .await
            .unwrap_err();

        assert!(err.error.is_cancelled());
        assert!(err.partial.messages.is_empty());
        assert!(source.requests.lock().unwrap().is_empty());
    }
}
