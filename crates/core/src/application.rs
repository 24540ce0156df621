use crate::activity;
use crate::date_text::DateTextParser;
use crate::domain::{
    ChannelRecord, ChannelSnapshot, ClearOutcome, ExportOutcome, PageSnapshot, PutOutcome,
    NOT_FOUND,
};
use crate::ports::{ConfirmationGate, PageSource, RecordExporter, Result};
use crate::store::SnapshotStore;
use crate::utils::channel_key_from_url;

/// Application service behind the operator commands
pub struct ExtractionServiceImpl {
    store: SnapshotStore,
    exporter: Box<dyn RecordExporter>,
    gate: Box<dyn ConfirmationGate>,
    parser: DateTextParser,
}

impl ExtractionServiceImpl {
    /// Creates a new ExtractionServiceImpl with the given dependencies
    pub fn new(
        store: SnapshotStore,
        exporter: Box<dyn RecordExporter>,
        gate: Box<dyn ConfirmationGate>,
    ) -> Self {
        Self::with_parser(store, exporter, gate, DateTextParser::current_year())
    }

    pub fn with_parser(
        store: SnapshotStore,
        exporter: Box<dyn RecordExporter>,
        gate: Box<dyn ConfirmationGate>,
        parser: DateTextParser,
    ) -> Self {
        Self {
            store,
            exporter,
            gate,
            parser,
        }
    }

    /// Builds the channel snapshot for one page without storing it
    pub fn build_snapshot(&self, page: &PageSnapshot) -> ChannelSnapshot {
        let average_posts_per_7_days = match &page.post_date_texts {
            Some(texts) => {
                let instants = self.parser.parse_all(texts.iter().map(String::as_str));
                activity::estimate(&instants).to_string()
            }
            None => {
                tracing::warn!("posts list not found on page");
                NOT_FOUND.to_string()
            }
        };

        ChannelSnapshot {
            telegram_link: channel_key_from_url(&page.page_url),
            channel_url: page.page_url.clone(),
            title: page.title.clone().unwrap_or_else(|| NOT_FOUND.to_string()),
            subscribers: page
                .subscribers
                .clone()
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            average_posts_per_7_days,
        }
    }

    /// Extracts one channel page and saves it through the store protocol
    pub fn extract_and_save(&self, page: &dyn PageSource) -> Result<(ChannelSnapshot, PutOutcome)> {
        let page = page.snapshot()?;
        let snapshot = self.build_snapshot(&page);
        tracing::info!(
            key = %snapshot.telegram_link,
            subscribers = %snapshot.subscribers,
            rate = %snapshot.average_posts_per_7_days,
            "channel page extracted"
        );
        let outcome = self.store.put(snapshot.clone(), self.gate.as_ref())?;
        Ok((snapshot, outcome))
    }

    pub fn clear_all(&self) -> Result<ClearOutcome> {
        self.store.clear(self.gate.as_ref())
    }

    /// Exports every stored record, in store order
    pub fn export_all(&self) -> Result<ExportOutcome> {
        let records = self.store.list_all()?;
        self.exporter.export(&records)
    }

    pub fn show(&self, telegram_link: &str) -> Result<Option<ChannelRecord>> {
        self.store.get(telegram_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, NO_POST_DATA};
    use crate::error::CoreError;
    use crate::ports::FixedGate;
    use crate::store::tests::{MemoryRepository, SteppingClock};
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StaticPage(PageSnapshot);

    impl PageSource for StaticPage {
        fn snapshot(&self) -> Result<PageSnapshot> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPage;

    impl PageSource for BrokenPage {
        fn snapshot(&self) -> Result<PageSnapshot> {
            Err(CoreError::Page("no document".to_string()))
        }
    }

    /// Exporter that keeps what it was handed
    #[derive(Clone, Default)]
    struct CapturingExporter {
        exported: Rc<RefCell<Vec<ChannelRecord>>>,
    }

    impl RecordExporter for CapturingExporter {
        fn export(&self, records: &[ChannelRecord]) -> Result<ExportOutcome> {
            if records.is_empty() {
                return Ok(ExportOutcome::NothingToExport);
            }
            self.exported.borrow_mut().extend_from_slice(records);
            Ok(ExportOutcome::Written("export.csv".into()))
        }
    }

    fn service(
        repo: &MemoryRepository,
        exporter: &CapturingExporter,
        decision: Decision,
    ) -> ExtractionServiceImpl {
        let store = SnapshotStore::with_clock(
            Box::new(repo.clone()),
            Box::new(SteppingClock::starting_at(
                Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            )),
        );
        ExtractionServiceImpl::with_parser(
            store,
            Box::new(exporter.clone()),
            Box::new(FixedGate(decision)),
            DateTextParser::with_year(2025),
        )
    }

    fn channel_page(dates: Option<Vec<&str>>) -> PageSnapshot {
        PageSnapshot {
            title: Some("Rust News".to_string()),
            page_url: "https://tgstat.ru/channel/@rustnews".to_string(),
            subscribers: Some("12.3k".to_string()),
            post_date_texts: dates.map(|d| d.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_build_snapshot_assembles_fields() {
        let svc = service(&MemoryRepository::default(), &CapturingExporter::default(), Decision::Accept);
        let page = channel_page(Some(vec!["12 апр, 10:00", "11 apr 10:00", "10 apr 10:00"]));

        let snapshot = svc.build_snapshot(&page);

        assert_eq!(snapshot.telegram_link, "https://t.me/rustnews");
        assert_eq!(snapshot.channel_url, "https://tgstat.ru/channel/@rustnews");
        assert_eq!(snapshot.title, "Rust News");
        assert_eq!(snapshot.subscribers, "12.3k");
        assert_eq!(snapshot.average_posts_per_7_days, "10.50");
    }

    #[test]
    fn test_build_snapshot_skips_unparseable_dates() {
        let svc = service(&MemoryRepository::default(), &CapturingExporter::default(), Decision::Accept);
        let page = channel_page(Some(vec!["вчера", "5 jan 08:00", "not a date"]));

        assert_eq!(svc.build_snapshot(&page).average_posts_per_7_days, "1.00");
    }

    #[test]
    fn test_build_snapshot_without_any_date_reports_no_data() {
        let svc = service(&MemoryRepository::default(), &CapturingExporter::default(), Decision::Accept);

        let snapshot = svc.build_snapshot(&channel_page(Some(vec!["вчера"])));
        assert_eq!(snapshot.average_posts_per_7_days, NO_POST_DATA);

        let snapshot = svc.build_snapshot(&channel_page(Some(vec![])));
        assert_eq!(snapshot.average_posts_per_7_days, NO_POST_DATA);
    }

    #[test]
    fn test_build_snapshot_missing_fields_use_placeholder() {
        let svc = service(&MemoryRepository::default(), &CapturingExporter::default(), Decision::Accept);
        let page = PageSnapshot {
            page_url: "https://tgstat.ru/search".to_string(),
            ..PageSnapshot::default()
        };

        let snapshot = svc.build_snapshot(&page);

        assert_eq!(snapshot.telegram_link, NOT_FOUND);
        assert_eq!(snapshot.title, NOT_FOUND);
        assert_eq!(snapshot.subscribers, NOT_FOUND);
        assert_eq!(snapshot.average_posts_per_7_days, NOT_FOUND);
    }

    #[test]
    fn test_build_snapshot_keeps_blank_fields_blank() {
        let svc = service(&MemoryRepository::default(), &CapturingExporter::default(), Decision::Accept);
        let mut page = channel_page(None);
        page.title = Some(String::new());
        page.subscribers = Some(String::new());

        let snapshot = svc.build_snapshot(&page);

        assert_eq!(snapshot.title, "");
        assert_eq!(snapshot.subscribers, "");
    }

    #[test]
    fn test_extract_and_save_inserts_then_updates() {
        let repo = MemoryRepository::default();
        let svc = service(&repo, &CapturingExporter::default(), Decision::Accept);

        let (_, first) = svc
            .extract_and_save(&StaticPage(channel_page(Some(vec!["5 jan"]))))
            .unwrap();
        let (snapshot, second) = svc
            .extract_and_save(&StaticPage(channel_page(Some(vec!["5 jan", "5 jan"]))))
            .unwrap();

        assert_eq!(first, PutOutcome::Inserted);
        assert_eq!(second, PutOutcome::Updated);
        let stored = svc.show("https://t.me/rustnews").unwrap().unwrap();
        assert_eq!(stored.snapshot(), snapshot);
        assert_eq!(stored.average_posts_per_7_days, "2.00");
    }

    #[test]
    fn test_extract_and_save_declined_keeps_first_values() {
        let repo = MemoryRepository::default();
        let accepting = service(&repo, &CapturingExporter::default(), Decision::Accept);
        accepting
            .extract_and_save(&StaticPage(channel_page(Some(vec!["5 jan"]))))
            .unwrap();

        let declining = service(&repo, &CapturingExporter::default(), Decision::Decline);
        let (_, outcome) = declining
            .extract_and_save(&StaticPage(channel_page(Some(vec!["5 jan", "5 jan"]))))
            .unwrap();

        assert_eq!(outcome, PutOutcome::Declined);
        let stored = declining.show("https://t.me/rustnews").unwrap().unwrap();
        assert_eq!(stored.average_posts_per_7_days, "1.00");
    }

    #[test]
    fn test_pages_without_handle_share_one_record() {
        let repo = MemoryRepository::default();
        let svc = service(&repo, &CapturingExporter::default(), Decision::Accept);
        let mut page = channel_page(None);
        page.page_url = "https://tgstat.ru/".to_string();

        svc.extract_and_save(&StaticPage(page.clone())).unwrap();
        page.title = Some("Other".to_string());
        let (_, outcome) = svc.extract_and_save(&StaticPage(page)).unwrap();

        assert_eq!(outcome, PutOutcome::Updated);
        assert_eq!(repo.records.borrow().len(), 1);
    }

    #[test]
    fn test_extract_and_save_page_error_propagates() {
        let repo = MemoryRepository::default();
        let svc = service(&repo, &CapturingExporter::default(), Decision::Accept);

        assert!(matches!(svc.extract_and_save(&BrokenPage), Err(CoreError::Page(_))));
        assert!(repo.records.borrow().is_empty());
    }

    #[test]
    fn test_export_all_hands_records_in_store_order() {
        let repo = MemoryRepository::default();
        let exporter = CapturingExporter::default();
        let svc = service(&repo, &exporter, Decision::Accept);

        assert_eq!(svc.export_all().unwrap(), ExportOutcome::NothingToExport);

        let mut page = channel_page(None);
        page.page_url = "https://tgstat.ru/channel/@zeta".to_string();
        svc.extract_and_save(&StaticPage(page.clone())).unwrap();
        page.page_url = "https://tgstat.ru/channel/@alpha".to_string();
        svc.extract_and_save(&StaticPage(page)).unwrap();

        assert!(matches!(svc.export_all().unwrap(), ExportOutcome::Written(_)));
        let keys: Vec<String> = exporter
            .exported
            .borrow()
            .iter()
            .map(|r| r.telegram_link.clone())
            .collect();
        assert_eq!(keys, vec!["https://t.me/alpha", "https://t.me/zeta"]);
    }

    #[test]
    fn test_clear_all_uses_gate() {
        let repo = MemoryRepository::default();
        let svc = service(&repo, &CapturingExporter::default(), Decision::Accept);
        svc.extract_and_save(&StaticPage(channel_page(None))).unwrap();

        assert_eq!(svc.clear_all().unwrap(), ClearOutcome::Cleared(1));

        let declining = service(&repo, &CapturingExporter::default(), Decision::Decline);
        declining.extract_and_save(&StaticPage(channel_page(None))).unwrap();
        assert_eq!(declining.clear_all().unwrap(), ClearOutcome::Declined);
        assert_eq!(repo.records.borrow().len(), 1);
    }
}
