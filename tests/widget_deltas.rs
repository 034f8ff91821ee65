use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use laqp_site::comment_feed::spawn_provider;
use laqp_site::comment_service::{CommentService, ServiceError};
use laqp_site::comments::{
    AuthPhase, Comment, Delta, MAX_COMMENT_LEN, UserProfile, WidgetCommand, WidgetState,
    apply_delta, comment_html, render_list,
};
use laqp_site::demo_service::DemoCommentService;

const POLL: Duration = Duration::from_millis(50);
const DEADLINE: Duration = Duration::from_secs(5);

/// Apply incoming deltas until the predicate holds or the deadline passes.
fn wait_for(
    rx: &Receiver<Delta>,
    state: &mut WidgetState,
    what: &str,
    pred: impl Fn(&WidgetState) -> bool,
) {
    let deadline = Instant::now() + DEADLINE;
    while !pred(state) {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_else(|| panic!("timed out waiting for {what}"));
        match rx.recv_timeout(remaining) {
            Ok(delta) => apply_delta(state, delta),
            Err(err) => panic!("waiting for {what}: {err}"),
        }
    }
}

#[test]
fn sign_in_post_and_delete_round_trip() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let subscription = spawn_provider(
        Box::new(DemoCommentService::new()),
        "index".to_string(),
        POLL,
        tx,
        cmd_rx,
    );
    let mut state = WidgetState::new("index");

    // First delivery: the empty page invites the first comment.
    match rx.recv_timeout(DEADLINE).expect("initial snapshot") {
        delta @ Delta::SetComments(_) => apply_delta(&mut state, delta),
        other => panic!("unexpected first delta: {other:?}"),
    }
    assert!(state.comments.is_empty());
    assert!(render_list(&state).contains("Sé el primero en comentar"));

    cmd_tx.send(WidgetCommand::SignIn).unwrap();
    wait_for(&rx, &mut state, "sign-in", |s| s.current_user().is_some());

    // A maximum-length comment is accepted and lands at the head of the
    // next delivery.
    let text = "x".repeat(MAX_COMMENT_LEN);
    state.draft = text.clone();
    assert!(state.can_post());
    state.posting = true;
    cmd_tx.send(WidgetCommand::Post { text: text.clone() }).unwrap();
    wait_for(&rx, &mut state, "posted comment", |s| {
        !s.posting && s.comments.first().is_some_and(|c| c.text == text)
    });
    assert!(state.draft.is_empty());
    assert!(state.alert.is_none());
    let posted_id = state.comments[0].id.clone();

    // Second post lands above the first: newest first.
    state.draft = "segundo".to_string();
    state.posting = true;
    cmd_tx.send(WidgetCommand::Post { text: "segundo".to_string() }).unwrap();
    wait_for(&rx, &mut state, "second comment", |s| {
        !s.posting && s.comments.len() == 2
    });
    assert_eq!(state.comments[0].text, "segundo");
    assert_eq!(state.comments[1].id, posted_id);

    // The author deletes their own comment; the list shrinks on the next
    // delivery rather than by manual patching.
    state.deleting = Some(posted_id.clone());
    cmd_tx.send(WidgetCommand::Delete { id: posted_id }).unwrap();
    wait_for(&rx, &mut state, "deletion", |s| {
        s.deleting.is_none() && s.comments.len() == 1
    });
    assert!(state.alert.is_none());

    subscription.close();
}

#[test]
fn over_length_draft_never_leaves_the_client() {
    let mut state = WidgetState::new("index");
    state.auth = AuthPhase::Authenticated(UserProfile {
        id: "u1".to_string(),
        name: "Tano".to_string(),
        photo: String::new(),
    });
    state.draft = "y".repeat(MAX_COMMENT_LEN + 1);
    assert!(!state.can_post());

    // And the service itself refuses, mirroring the store's rules.
    let mut service = DemoCommentService::new();
    service.sign_in().unwrap();
    let err = service
        .add_comment("index", &"y".repeat(MAX_COMMENT_LEN + 1))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Write(_)));
}

#[test]
fn non_owner_sees_no_delete_control_and_cannot_delete() {
    let mut service = DemoCommentService::seeded("index");
    let visitor = service.sign_in().unwrap();

    let comments = service.list_comments("index").unwrap();
    assert_eq!(comments.len(), 2);
    let foreign = &comments[0];
    assert_ne!(foreign.user_id, visitor.id);

    // No delete markup for someone else's comment, delete markup for one's
    // own.
    let html = comment_html(foreign, Some(&visitor));
    assert!(!html.contains("class=\"delete\""), "{html}");
    let own = service.add_comment("index", "hola").unwrap();
    let html = comment_html(&own, Some(&visitor));
    assert!(html.contains("class=\"delete\""), "{html}");

    // The store refuses a non-owner delete outright.
    let err = service.delete_comment("index", &foreign.id).unwrap_err();
    assert!(matches!(err, ServiceError::Write(_)));
    assert_eq!(service.list_comments("index").unwrap().len(), 3);
}

/// Service whose list queries fail a fixed number of times before
/// recovering, to drive the subscription-error path.
struct FlakyListService {
    inner: DemoCommentService,
    failures_left: Arc<AtomicUsize>,
}

impl CommentService for FlakyListService {
    fn sign_in(&mut self) -> Result<UserProfile, ServiceError> {
        self.inner.sign_in()
    }
    fn sign_out(&mut self) -> Result<(), ServiceError> {
        self.inner.sign_out()
    }
    fn current_user(&self) -> Option<&UserProfile> {
        self.inner.current_user()
    }
    fn list_comments(&self, page_key: &str) -> Result<Vec<Comment>, ServiceError> {
        if self.failures_left.load(Ordering::Relaxed) > 0 {
            self.failures_left.fetch_sub(1, Ordering::Relaxed);
            return Err(ServiceError::Subscribe("lista no disponible".to_string()));
        }
        self.inner.list_comments(page_key)
    }
    fn add_comment(&mut self, page_key: &str, text: &str) -> Result<Comment, ServiceError> {
        self.inner.add_comment(page_key, text)
    }
    fn delete_comment(&mut self, page_key: &str, comment_id: &str) -> Result<(), ServiceError> {
        self.inner.delete_comment(page_key, comment_id)
    }
}

#[test]
fn subscription_error_shows_placeholder_then_recovers() {
    let failures = Arc::new(AtomicUsize::new(2));
    let service = FlakyListService {
        inner: DemoCommentService::seeded("index"),
        failures_left: Arc::clone(&failures),
    };

    let (tx, rx) = mpsc::channel();
    let (_cmd_tx, cmd_rx) = mpsc::channel();
    let subscription = spawn_provider(Box::new(service), "index".to_string(), POLL, tx, cmd_rx);
    let mut state = WidgetState::new("index");

    wait_for(&rx, &mut state, "subscription error", |s| s.list_error.is_some());
    assert!(render_list(&state).contains("comments-error"));

    // A later successful delivery clears the placeholder; the widget never
    // needed a restart.
    wait_for(&rx, &mut state, "recovery", |s| {
        s.list_error.is_none() && s.comments.len() == 2
    });

    subscription.close();
}

#[test]
fn resubscribe_switches_page_key() {
    let mut service = DemoCommentService::seeded("pagina-a");
    service.sign_in().unwrap();
    service.add_comment("pagina-b", "solo en b").unwrap();
    service.sign_out().unwrap();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let subscription = spawn_provider(Box::new(service), "pagina-a".to_string(), POLL, tx, cmd_rx);
    let mut state = WidgetState::new("pagina-a");

    wait_for(&rx, &mut state, "page a snapshot", |s| s.comments.len() == 2);

    cmd_tx
        .send(WidgetCommand::Resubscribe {
            page_key: "pagina-b".to_string(),
        })
        .unwrap();
    wait_for(&rx, &mut state, "page b snapshot", |s| {
        s.comments.len() == 1 && s.comments[0].text == "solo en b"
    });

    subscription.close();
}

#[test]
fn closing_the_subscription_stops_the_provider() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let subscription = spawn_provider(
        Box::new(DemoCommentService::new()),
        "index".to_string(),
        POLL,
        tx,
        cmd_rx,
    );
    let mut state = WidgetState::new("index");
    let first = rx.recv_timeout(DEADLINE).expect("first snapshot");
    apply_delta(&mut state, first);

    subscription.close();
    subscription.close(); // idempotent
    assert!(subscription.is_closed());

    // The provider thread exits and drops its sender; once the in-flight
    // deltas drain, the channel reports disconnection.
    let deadline = Instant::now() + DEADLINE;
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(_) if Instant::now() < deadline => continue,
            Ok(_) => panic!("provider kept delivering after close"),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) if Instant::now() < deadline => continue,
            Err(RecvTimeoutError::Timeout) => panic!("provider never shut down"),
        }
    }

    // Commands into a closed subscription go nowhere but do not panic.
    let _ = cmd_tx.send(WidgetCommand::SignIn);
}
