//! Message routing through the background worker.

use std::sync::Arc;
use std::time::Duration;

use keepalive::protocol::{MessageSender, OpenAndClose, RuntimeMessage, TabId, TabInfo, TabStatus, WindowId};
use keepalive::{Background, Dispatch, HostCall, InMemoryBrowser, LoadPlan, OrchestratorConfig, Outcome, RequestError};

fn setup() -> (InMemoryBrowser, Background<InMemoryBrowser>) {
	let browser = InMemoryBrowser::new();
	browser.add_tab(TabId(7), WindowId(1), "https://x");
	browser.add_tab(TabId(9), WindowId(1), "https://y");
	browser.set_load_plan(LoadPlan::complete_immediately());
	let background = Background::new(Arc::new(browser.clone()), OrchestratorConfig::default());
	(browser, background)
}

fn sender(browser: &InMemoryBrowser, id: u32) -> MessageSender {
	MessageSender::from_tab(browser.tab(TabId(id)).expect("sender tab exists"))
}

#[tokio::test(start_paused = true)]
async fn activity_ping_resets_sender_without_refresh() {
	let (browser, background) = setup();

	let dispatch = background.handle(RuntimeMessage::ActivityPing, &sender(&browser, 9)).await;

	assert!(matches!(dispatch, Dispatch::Pinged { tab: TabId(9), delivered: true }));
	assert_eq!(browser.messages_to(TabId(9)), vec![RuntimeMessage::ResetFromBg]);
	assert!(!browser.calls().iter().any(|c| matches!(c.call, HostCall::Create { .. })));
}

#[tokio::test(start_paused = true)]
async fn page_request_runs_full_refresh() {
	let (browser, background) = setup();

	let dispatch = background.handle(RuntimeMessage::open_and_close("https://x"), &sender(&browser, 7)).await;

	let Dispatch::Started { origin, session } = dispatch else {
		panic!("expected a started session");
	};
	assert_eq!(origin, TabId(7));
	assert!(background.is_refreshing(TabId(7)));

	let report = session.await.unwrap();
	assert_eq!(report.outcome, Outcome::Loaded);
	assert_eq!(browser.messages_to(TabId(7)), vec![RuntimeMessage::ResetFromBg]);
	assert!(!background.is_refreshing(TabId(7)));

	let create = browser.calls().into_iter().find(|c| matches!(c.call, HostCall::Create { .. })).unwrap();
	assert!(matches!(create.call, HostCall::Create { index: Some(1), active: true, .. }));
}

#[tokio::test(start_paused = true)]
async fn second_request_for_same_origin_is_busy() {
	let (browser, background) = setup();
	let from = sender(&browser, 7);

	let first = background.handle(RuntimeMessage::open_and_close("https://x"), &from).await;
	let second = background.handle(RuntimeMessage::open_and_close("https://x"), &from).await;

	assert!(matches!(second, Dispatch::Busy { origin: TabId(7) }));
	let Dispatch::Started { session, .. } = first else {
		panic!("first request should start");
	};
	session.await.unwrap();

	let creates = browser.calls().iter().filter(|c| matches!(c.call, HostCall::Create { .. })).count();
	assert_eq!(creates, 1);

	let third = background.handle(RuntimeMessage::open_and_close("https://x"), &from).await;
	assert!(matches!(third, Dispatch::Started { .. }), "slot is released after completion");
}

#[tokio::test(start_paused = true)]
async fn different_origins_refresh_independently() {
	let (browser, background) = setup();

	let a = background.handle(RuntimeMessage::open_and_close("https://x"), &sender(&browser, 7)).await;
	let b = background.handle(RuntimeMessage::open_and_close("https://y"), &sender(&browser, 9)).await;

	let (Dispatch::Started { session: a, .. }, Dispatch::Started { session: b, .. }) = (a, b) else {
		panic!("both requests should start");
	};
	let (a, b) = (a.await.unwrap(), b.await.unwrap());

	assert_ne!(a.new_tab, b.new_tab);
	assert_eq!(a.outcome, Outcome::Loaded);
	assert_eq!(b.outcome, Outcome::Loaded);
	assert_eq!(browser.messages_to(TabId(7)), vec![RuntimeMessage::ResetFromBg]);
	assert_eq!(browser.messages_to(TabId(9)), vec![RuntimeMessage::ResetFromBg]);
	assert_eq!(browser.tab_ids(WindowId(1)), vec![TabId(7), TabId(9)]);
}

#[tokio::test(start_paused = true)]
async fn request_without_origin_creates_nothing() {
	let (browser, background) = setup();

	let dispatch = background.handle(RuntimeMessage::open_and_close("https://x"), &MessageSender::default()).await;

	assert!(matches!(
		dispatch,
		Dispatch::Rejected {
			error: RequestError::MissingOriginTab,
			notified: false
		}
	));
	assert!(browser.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn request_without_url_only_notifies_origin() {
	let (browser, background) = setup();
	let sender = MessageSender::from_tab(TabInfo {
		id: TabId(7),
		window_id: WindowId(1),
		index: 0,
		url: String::new(),
		status: TabStatus::Complete,
	});

	let dispatch = background.handle(RuntimeMessage::OpenAndCloseSameUrl(OpenAndClose::default()), &sender).await;

	assert!(matches!(
		dispatch,
		Dispatch::Rejected {
			error: RequestError::MissingUrl,
			notified: true
		}
	));
	let calls = browser.calls();
	assert_eq!(calls.len(), 1);
	assert!(matches!(calls[0].call, HostCall::SendMessage { tab: TabId(7), .. }));
}

#[tokio::test(start_paused = true)]
async fn aborted_session_releases_origin() {
	let (browser, background) = setup();
	browser.set_load_plan(LoadPlan::never());

	let Dispatch::Started { session, .. } = background.handle(RuntimeMessage::open_and_close("https://x"), &sender(&browser, 7)).await else {
		panic!("request should start");
	};
	tokio::time::sleep(Duration::from_millis(10)).await;
	session.abort();
	let _ = session.await;

	assert!(!background.is_refreshing(TabId(7)));
	assert_eq!(browser.subscriber_count(), 0);
}
